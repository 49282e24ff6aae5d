//! A single fixed-order Markov chain over a finite alphabet.
//!
//! The table is dense and flat: a chain of order `N` over alphabet `A` holds
//! `A^N` weights, addressed by a mixed-radix index over the context window
//! (radix `A`, oldest symbol most significant). The newest `N - 1` window
//! symbols select a row of `A` contiguous cells, one per candidate next
//! symbol.
//!
//! Rows start out as small random positive weights. The first `observe` that
//! touches a row renormalizes it, and every later touch keeps it summing to 1.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use tracing::trace;

use crate::error::{ChainKind, ModelError};
use crate::window::ContextWindow;

/// Upper bound on `alphabet^order`; larger reconfigurations are rejected.
pub const MAX_TABLE_CELLS: usize = 1 << 24;

#[derive(Debug, Clone)]
pub struct MarkovChain {
    kind: ChainKind,
    alphabet: usize,
    order: usize,
    learn_rate: f64,
    init_scale: f64,
    table: Vec<f64>,
    window: ContextWindow,
}

impl MarkovChain {
    /// Allocate a freshly seeded chain.
    pub fn new<R: Rng + ?Sized>(
        kind: ChainKind,
        alphabet: usize,
        order: usize,
        learn_rate: f64,
        init_scale: f64,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        check_learn_rate(kind, learn_rate)?;
        check_init_scale(init_scale)?;
        let cells = table_cells(kind, alphabet, order)?;
        let mut chain = Self {
            kind,
            alphabet,
            order,
            learn_rate,
            init_scale,
            table: vec![0.0; cells],
            window: ContextWindow::random(order, alphabet, rng),
        };
        chain.seed_table(rng);
        Ok(chain)
    }

    pub fn kind(&self) -> ChainKind {
        self.kind
    }

    pub fn alphabet(&self) -> usize {
        self.alphabet
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn learn_rate(&self) -> f64 {
        self.learn_rate
    }

    pub fn table(&self) -> &[f64] {
        &self.table
    }

    pub fn window(&self) -> &ContextWindow {
        &self.window
    }

    /// Reject `symbol` unless it belongs to this chain's alphabet.
    pub fn check_symbol(&self, symbol: usize) -> Result<(), ModelError> {
        if symbol < self.alphabet {
            Ok(())
        } else {
            Err(ModelError::SymbolOutOfRange {
                chain: self.kind,
                symbol,
                alphabet: self.alphabet,
            })
        }
    }

    pub fn set_learn_rate(&mut self, rate: f64) -> Result<(), ModelError> {
        check_learn_rate(self.kind, rate)?;
        self.learn_rate = rate;
        Ok(())
    }

    /// Reinforce the transition from the current conditioning context to
    /// `symbol`, renormalize that row, then slide `symbol` into the window.
    pub fn observe(&mut self, symbol: usize) -> Result<(), ModelError> {
        self.check_symbol(symbol)?;
        self.reinforce(symbol);
        Ok(())
    }

    /// `observe` without the range check; `symbol` must already be valid.
    pub(crate) fn reinforce(&mut self, symbol: usize) {
        // The conditioning context picks the row; appending `symbol` to it
        // picks the cell.
        let row_start = self.row_start();
        let cell = row_start + symbol;
        self.table[cell] += self.learn_rate;

        let row = &mut self.table[row_start..row_start + self.alphabet];
        let total: f64 = row.iter().sum();
        if total > 0.0 && total.is_finite() {
            row.iter_mut().for_each(|w| *w /= total);
        }

        self.window.push(symbol);
        trace!(chain = %self.kind, symbol, cell, "reinforced transition");
    }

    /// Draw the next symbol from the row for the current conditioning
    /// context and slide it into the window. The table is left untouched.
    pub fn sample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize, ModelError> {
        // WeightedIndex normalizes by the row total, so drift in a row that
        // no longer sums exactly to 1 does not bias the draw.
        let dist = WeightedIndex::new(self.row()).map_err(|e| ModelError::DegenerateRow {
            chain: self.kind,
            reason: e.to_string(),
        })?;
        let symbol = dist.sample(rng);
        self.window.push(symbol);
        Ok(symbol)
    }

    /// Row addressed by the current conditioning context.
    pub fn row(&self) -> &[f64] {
        let start = self.row_start();
        &self.table[start..start + self.alphabet]
    }

    /// Row addressed by an explicit conditioning context of `order - 1`
    /// symbols, oldest first.
    pub fn row_for(&self, context: &[usize]) -> Option<&[f64]> {
        if context.len() + 1 != self.order || context.iter().any(|&s| s >= self.alphabet) {
            return None;
        }
        let start = mixed_radix(context.iter().copied(), self.alphabet) * self.alphabet;
        Some(&self.table[start..start + self.alphabet])
    }

    /// Replace the window contents, keeping the table.
    pub fn prime(&mut self, symbols: &[usize]) -> Result<(), ModelError> {
        if symbols.len() != self.order {
            return Err(ModelError::ContextLength {
                chain: self.kind,
                expected: self.order,
                actual: symbols.len(),
            });
        }
        for &symbol in symbols {
            self.check_symbol(symbol)?;
        }
        self.window = ContextWindow::from_symbols(symbols);
        Ok(())
    }

    /// Reseed the table and window in place, keeping the current shape.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.seed_table(rng);
        self.window = ContextWindow::random(self.order, self.alphabet, rng);
    }

    /// Reallocate for a new alphabet size and order and reseed everything.
    /// Validation happens before anything is replaced.
    pub fn reshape<R: Rng + ?Sized>(
        &mut self,
        alphabet: usize,
        order: usize,
        rng: &mut R,
    ) -> Result<(), ModelError> {
        let cells = table_cells(self.kind, alphabet, order)?;
        self.alphabet = alphabet;
        self.order = order;
        self.table = vec![0.0; cells];
        self.reset(rng);
        Ok(())
    }

    fn seed_table<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        // `1 - u` for u in [0, 1) lands in (0, 1], keeping every cell strictly
        // positive.
        let scale = self.init_scale;
        for weight in &mut self.table {
            *weight = (1.0 - rng.random::<f64>()) * scale;
        }
    }

    fn row_start(&self) -> usize {
        mixed_radix(self.window.conditioning(), self.alphabet) * self.alphabet
    }
}

fn mixed_radix(digits: impl Iterator<Item = usize>, radix: usize) -> usize {
    digits.fold(0, |acc, digit| acc * radix + digit)
}

pub(crate) fn check_init_scale(scale: f64) -> Result<(), ModelError> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidInitScale(scale))
    }
}

pub(crate) fn check_learn_rate(kind: ChainKind, rate: f64) -> Result<(), ModelError> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidLearnRate { chain: kind, rate })
    }
}

pub(crate) fn table_cells(kind: ChainKind, alphabet: usize, order: usize) -> Result<usize, ModelError> {
    if order == 0 {
        return Err(ModelError::InvalidOrder { chain: kind, order });
    }
    if alphabet == 0 {
        return Err(ModelError::InvalidDivisions(alphabet));
    }
    let too_large = ModelError::TableTooLarge {
        chain: kind,
        alphabet,
        order,
        limit: MAX_TABLE_CELLS,
    };
    let exponent = u32::try_from(order).map_err(|_| too_large.clone())?;
    match alphabet.checked_pow(exponent) {
        Some(cells) if cells <= MAX_TABLE_CELLS => Ok(cells),
        _ => Err(too_large),
    }
}
