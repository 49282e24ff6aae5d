//! Warble: an adaptive Markov model over musical events.
//!
//! Observes (pitch class, duration bucket) pairs, reinforces the matching
//! transitions in two fixed-order Markov chains, and samples new events from
//! what it has learned.
//!
//! - window.rs: Fixed-length ring of recent symbols
//! - chain.rs: One dense Markov chain (table, update rule, sampling)
//! - model.rs: SequenceModel pairing a note chain with a duration chain
//! - error.rs: ModelError and ChainKind
//!
//! ```rust
//! use warble::{ModelParams, SequenceModel};
//!
//! let mut model = SequenceModel::with_seed(ModelParams::default(), 7)?;
//! model.observe(3, 4)?;
//! let note = model.generate_note()?;
//! let seconds = model.generate_duration()?;
//! assert!(note < warble::NOTE_ALPHABET);
//! assert!(seconds >= 0.0);
//! # Ok::<(), warble::ModelError>(())
//! ```

pub mod chain;
pub mod error;
pub mod model;
pub mod window;

pub use chain::{MarkovChain, MAX_TABLE_CELLS};
pub use error::{ChainKind, ModelError};
pub use model::{ModelParams, SequenceModel, DEFAULT_INIT_SCALE, NOTE_ALPHABET};
pub use window::ContextWindow;
