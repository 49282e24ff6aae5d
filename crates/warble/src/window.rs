//! Fixed-length sliding window over the most recent symbols of a chain.
//!
//! Stored as a ring: `head` points at the oldest slot, and pushing a new
//! symbol overwrites that slot and advances `head`. The length never changes
//! after construction.

use rand::Rng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    slots: Vec<usize>,
    head: usize,
}

impl ContextWindow {
    /// Window of `len` symbols drawn uniformly from `0..alphabet`.
    ///
    /// Callers guarantee `len >= 1` and `alphabet >= 1`.
    pub fn random<R: Rng + ?Sized>(len: usize, alphabet: usize, rng: &mut R) -> Self {
        let slots = (0..len).map(|_| rng.random_range(0..alphabet)).collect();
        Self { slots, head: 0 }
    }

    /// Window holding `symbols`, oldest first.
    pub fn from_symbols(symbols: &[usize]) -> Self {
        Self {
            slots: symbols.to_vec(),
            head: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Symbol at `position`, where 0 is the oldest.
    pub fn get(&self, position: usize) -> Option<usize> {
        if position >= self.slots.len() {
            return None;
        }
        Some(self.slots[(self.head + position) % self.slots.len()])
    }

    pub fn oldest(&self) -> Option<usize> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<usize> {
        self.len().checked_sub(1).and_then(|last| self.get(last))
    }

    /// Symbols oldest first.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let (tail, front) = self.slots.split_at(self.head);
        front.iter().chain(tail.iter()).copied()
    }

    /// The newest `len - 1` symbols: the context a table row is addressed by.
    pub fn conditioning(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter().skip(1)
    }

    /// Slide the window: drop the oldest symbol and append `symbol`.
    pub fn push(&mut self, symbol: usize) {
        if self.slots.is_empty() {
            return;
        }
        self.slots[self.head] = symbol;
        self.head = (self.head + 1) % self.slots.len();
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}
