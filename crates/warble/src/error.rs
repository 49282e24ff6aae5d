//! Errors raised by the sequence model.

use std::fmt;

use thiserror::Error;

/// Which of the two parallel chains an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainKind {
    Note,
    Time,
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKind::Note => write!(f, "note"),
            ChainKind::Time => write!(f, "time"),
        }
    }
}

/// Every variant is raised before any state is touched, except
/// `DegenerateRow`, which only ever aborts a read.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("{chain} symbol {symbol} outside alphabet of size {alphabet}")]
    SymbolOutOfRange {
        chain: ChainKind,
        symbol: usize,
        alphabet: usize,
    },

    #[error("{chain} order must be at least 1, got {order}")]
    InvalidOrder { chain: ChainKind, order: usize },

    #[error("time divisions must be at least 1, got {0}")]
    InvalidDivisions(usize),

    #[error("max duration must be a positive number of seconds, got {0}")]
    InvalidMaxDuration(f64),

    #[error("{chain} learn rate must be finite and non-negative, got {rate}")]
    InvalidLearnRate { chain: ChainKind, rate: f64 },

    #[error("init scale must be finite and positive, got {0}")]
    InvalidInitScale(f64),

    #[error("{chain} table of {alphabet}^{order} cells exceeds the {limit} cell limit")]
    TableTooLarge {
        chain: ChainKind,
        alphabet: usize,
        order: usize,
        limit: usize,
    },

    #[error("{chain} context must hold {expected} symbols, got {actual}")]
    ContextLength {
        chain: ChainKind,
        expected: usize,
        actual: usize,
    },

    #[error("{chain} row cannot be sampled: {reason}")]
    DegenerateRow { chain: ChainKind, reason: String },
}
