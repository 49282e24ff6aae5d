//! SequenceModel: paired note and duration chains.
//!
//! The two chains share one code path but never share state. Notes live in a
//! fixed alphabet of [`NOTE_ALPHABET`] pitch classes; durations are quantized
//! into `divisions` buckets of `max_duration / divisions` seconds each.
//!
//! The model is a plain mutable value with no interior locking. Callers that
//! share it between threads must serialize every call behind one exclusive
//! lock.

use rand::distr::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Normal;
use tracing::{debug, trace};

use crate::chain::{check_init_scale, check_learn_rate, table_cells, MarkovChain};
use crate::error::{ChainKind, ModelError};

/// Number of pitch classes the note chain ranges over.
pub const NOTE_ALPHABET: usize = 5;

/// Scale applied to fresh table weights, keeping new rows near zero.
pub const DEFAULT_INIT_SCALE: f64 = 1.0 / 1000.0;

/// Hyperparameters fixed at construction; all but `init_scale` can be
/// changed later through the setters on [`SequenceModel`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    /// Seconds spanned by the full duration alphabet.
    pub max_duration: f64,
    pub note_order: usize,
    pub time_order: usize,
    /// Size of the duration alphabet.
    pub divisions: usize,
    pub note_learn_rate: f64,
    pub time_learn_rate: f64,
    pub init_scale: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            max_duration: 2.0,
            note_order: 3,
            time_order: 3,
            divisions: 15,
            note_learn_rate: 0.1,
            time_learn_rate: 0.1,
            init_scale: DEFAULT_INIT_SCALE,
        }
    }
}

impl ModelParams {
    /// Check every value a [`SequenceModel`] would reject.
    pub fn validate(&self) -> Result<(), ModelError> {
        check_max_duration(self.max_duration)?;
        if self.divisions == 0 {
            return Err(ModelError::InvalidDivisions(self.divisions));
        }
        table_cells(ChainKind::Note, NOTE_ALPHABET, self.note_order)?;
        table_cells(ChainKind::Time, self.divisions, self.time_order)?;
        check_learn_rate(ChainKind::Note, self.note_learn_rate)?;
        check_learn_rate(ChainKind::Time, self.time_learn_rate)?;
        check_init_scale(self.init_scale)?;
        Ok(())
    }
}

/// Adaptive model over (pitch, duration) event sequences.
#[derive(Debug, Clone)]
pub struct SequenceModel {
    notes: MarkovChain,
    times: MarkovChain,
    max_duration: f64,
    rng: StdRng,
}

impl SequenceModel {
    /// Model seeded from OS entropy.
    pub fn new(params: ModelParams) -> Result<Self, ModelError> {
        Self::with_rng(params, StdRng::from_os_rng())
    }

    /// Model whose tables, windows and draws are reproducible from `seed`.
    pub fn with_seed(params: ModelParams, seed: u64) -> Result<Self, ModelError> {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: ModelParams, mut rng: StdRng) -> Result<Self, ModelError> {
        params.validate()?;
        let notes = MarkovChain::new(
            ChainKind::Note,
            NOTE_ALPHABET,
            params.note_order,
            params.note_learn_rate,
            params.init_scale,
            &mut rng,
        )?;
        let times = MarkovChain::new(
            ChainKind::Time,
            params.divisions,
            params.time_order,
            params.time_learn_rate,
            params.init_scale,
            &mut rng,
        )?;
        debug!(
            note_order = params.note_order,
            time_order = params.time_order,
            divisions = params.divisions,
            max_duration = params.max_duration,
            "sequence model allocated"
        );
        Ok(Self {
            notes,
            times,
            max_duration: params.max_duration,
            rng,
        })
    }

    // === Learning ===

    /// Record one completed event. Both symbols are range-checked before
    /// either chain is touched.
    pub fn observe(&mut self, note: usize, bucket: usize) -> Result<(), ModelError> {
        self.notes.check_symbol(note)?;
        self.times.check_symbol(bucket)?;
        self.notes.reinforce(note);
        self.times.reinforce(bucket);
        trace!(note, bucket, "observed event");
        Ok(())
    }

    // === Generation ===

    /// Next pitch class, in `0..NOTE_ALPHABET`.
    pub fn generate_note(&mut self) -> Result<usize, ModelError> {
        self.notes.sample(&mut self.rng)
    }

    /// Next discrete duration bucket, in `0..divisions`.
    pub fn generate_bucket(&mut self) -> Result<usize, ModelError> {
        self.times.sample(&mut self.rng)
    }

    /// Next duration in seconds.
    ///
    /// Draws a bucket `b`, then returns `|N(b * unit, unit / 2)|` where `unit`
    /// is [`duration_unit`](Self::duration_unit). Folding at zero skews bucket 0
    /// upward.
    pub fn generate_duration(&mut self) -> Result<f64, ModelError> {
        let bucket = self.generate_bucket()?;
        let unit = self.duration_unit();
        let normal =
            Normal::new(bucket as f64 * unit, unit / 2.0).map_err(|e| ModelError::DegenerateRow {
                chain: ChainKind::Time,
                reason: e.to_string(),
            })?;
        Ok(normal.sample(&mut self.rng).abs())
    }

    // === Reconfiguration ===

    /// Reseed both tables and both windows, keeping every size and rate.
    pub fn clear(&mut self) {
        self.notes.reset(&mut self.rng);
        self.times.reset(&mut self.rng);
        debug!("sequence model cleared");
    }

    pub fn set_note_order(&mut self, order: usize) -> Result<(), ModelError> {
        self.notes.reshape(NOTE_ALPHABET, order, &mut self.rng)?;
        debug!(order, "note order changed");
        Ok(())
    }

    pub fn set_time_order(&mut self, order: usize) -> Result<(), ModelError> {
        let divisions = self.times.alphabet();
        self.times.reshape(divisions, order, &mut self.rng)?;
        debug!(order, "time order changed");
        Ok(())
    }

    /// Resize the duration alphabet. Recomputes the duration unit and
    /// discards everything the duration chain had learned.
    pub fn set_time_divisions(&mut self, divisions: usize) -> Result<(), ModelError> {
        if divisions == 0 {
            return Err(ModelError::InvalidDivisions(divisions));
        }
        let order = self.times.order();
        self.times.reshape(divisions, order, &mut self.rng)?;
        debug!(divisions, unit = self.duration_unit(), "time divisions changed");
        Ok(())
    }

    pub fn set_note_learn_rate(&mut self, rate: f64) -> Result<(), ModelError> {
        self.notes.set_learn_rate(rate)
    }

    pub fn set_time_learn_rate(&mut self, rate: f64) -> Result<(), ModelError> {
        self.times.set_learn_rate(rate)
    }

    pub fn set_max_duration(&mut self, seconds: f64) -> Result<(), ModelError> {
        check_max_duration(seconds)?;
        self.max_duration = seconds;
        debug!(seconds, unit = self.duration_unit(), "max duration changed");
        Ok(())
    }

    /// Overwrite the note window, oldest first. The table is kept.
    pub fn prime_note_context(&mut self, symbols: &[usize]) -> Result<(), ModelError> {
        self.notes.prime(symbols)
    }

    /// Overwrite the duration window, oldest first. The table is kept.
    pub fn prime_time_context(&mut self, buckets: &[usize]) -> Result<(), ModelError> {
        self.times.prime(buckets)
    }

    // === Inspection ===

    pub fn notes(&self) -> &MarkovChain {
        &self.notes
    }

    pub fn times(&self) -> &MarkovChain {
        &self.times
    }

    pub fn note_context(&self) -> Vec<usize> {
        self.notes.window().to_vec()
    }

    pub fn time_context(&self) -> Vec<usize> {
        self.times.window().to_vec()
    }

    pub fn divisions(&self) -> usize {
        self.times.alphabet()
    }

    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    /// Seconds covered by one duration bucket.
    pub fn duration_unit(&self) -> f64 {
        self.max_duration / self.times.alphabet() as f64
    }
}

fn check_max_duration(seconds: f64) -> Result<(), ModelError> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidMaxDuration(seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> SequenceModel {
        SequenceModel::with_seed(ModelParams::default(), 11).unwrap()
    }

    #[test]
    fn test_default_shapes() {
        let model = model();
        assert_eq!(model.notes().table().len(), 125);
        assert_eq!(model.times().table().len(), 15 * 15 * 15);
        assert_eq!(model.note_context().len(), 3);
        assert_eq!(model.time_context().len(), 3);
        assert!((model.duration_unit() - 2.0 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_observe_is_all_or_nothing() {
        let mut model = model();
        let notes_before = model.notes().table().to_vec();
        let context_before = model.note_context();

        let err = model.observe(2, 15).unwrap_err();
        assert!(matches!(
            err,
            ModelError::SymbolOutOfRange {
                chain: ChainKind::Time,
                symbol: 15,
                ..
            }
        ));
        assert_eq!(model.notes().table(), notes_before.as_slice());
        assert_eq!(model.note_context(), context_before);
    }

    #[test]
    fn test_generate_duration_non_negative() {
        let mut model = model();
        for _ in 0..500 {
            let seconds = model.generate_duration().unwrap();
            assert!(seconds >= 0.0 && seconds.is_finite());
        }
    }

    #[test]
    fn test_duration_tracks_learned_bucket() {
        let params = ModelParams {
            time_order: 1,
            divisions: 4,
            max_duration: 2.0,
            time_learn_rate: 1.0,
            ..ModelParams::default()
        };
        let mut model = SequenceModel::with_seed(params, 3).unwrap();
        for _ in 0..30 {
            model.observe(0, 2).unwrap();
        }
        // Bucket 2 of 0.5 s units centres draws on 1.0 s with sd 0.25.
        let mean: f64 = (0..400).map(|_| model.generate_duration().unwrap()).sum::<f64>() / 400.0;
        assert!((mean - 1.0).abs() < 0.1, "mean duration {mean}");
    }

    #[test]
    fn test_set_max_duration_recomputes_unit() {
        let mut model = model();
        model.set_max_duration(3.0).unwrap();
        assert!((model.duration_unit() - 0.2).abs() < 1e-12);
        assert_eq!(
            model.set_max_duration(0.0),
            Err(ModelError::InvalidMaxDuration(0.0))
        );
        assert_eq!(model.max_duration(), 3.0);
    }

    #[test]
    fn test_set_time_divisions_reshapes_time_chain_only() {
        let mut model = model();
        let notes_before = model.notes().table().to_vec();
        model.set_time_divisions(4).unwrap();
        assert_eq!(model.divisions(), 4);
        assert_eq!(model.times().table().len(), 64);
        assert!(model.time_context().iter().all(|&b| b < 4));
        assert!((model.duration_unit() - 0.5).abs() < 1e-12);
        assert_eq!(model.notes().table(), notes_before.as_slice());
        assert_eq!(
            model.set_time_divisions(0),
            Err(ModelError::InvalidDivisions(0))
        );
    }

    #[test]
    fn test_set_time_order() {
        let mut model = model();
        model.set_time_order(2).unwrap();
        assert_eq!(model.times().order(), 2);
        assert_eq!(model.times().table().len(), 225);
        assert_eq!(model.time_context().len(), 2);
    }

    #[test]
    fn test_rate_setters() {
        let mut model = model();
        model.set_note_learn_rate(0.5).unwrap();
        model.set_time_learn_rate(0.25).unwrap();
        assert_eq!(model.notes().learn_rate(), 0.5);
        assert_eq!(model.times().learn_rate(), 0.25);
        assert!(model.set_note_learn_rate(f64::INFINITY).is_err());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let bad = ModelParams {
            divisions: 0,
            ..ModelParams::default()
        };
        assert_eq!(bad.validate(), Err(ModelError::InvalidDivisions(0)));
        assert!(SequenceModel::with_seed(bad, 1).is_err());

        let bad = ModelParams {
            note_order: 0,
            ..ModelParams::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ModelError::InvalidOrder {
                chain: ChainKind::Note,
                ..
            })
        ));

        assert!(ModelParams::default().validate().is_ok());
    }

    #[test]
    fn test_same_seed_same_output() {
        let mut a = model();
        let mut b = model();
        for _ in 0..20 {
            assert_eq!(a.generate_note().unwrap(), b.generate_note().unwrap());
            assert_eq!(a.generate_duration().unwrap(), b.generate_duration().unwrap());
        }
    }
}
