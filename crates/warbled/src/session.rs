//! Session - the shared state one daemon drives.
//!
//! Owns the sequence model behind a single async mutex, plus the generation
//! state (running / evolving) and the onset clock for live notes. Every model
//! call takes the lock for exactly that call; nothing holds it across a
//! network send or a pacing sleep.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use warble::{ModelError, ModelParams, SequenceModel, NOTE_ALPHABET};
use warbleconf::ModelConfig;

use crate::generator;
use crate::quantize::quantize_for;
use crate::sink::NoteSink;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("live note {0} is not a pitch class in 0..{max}", max = NOTE_ALPHABET)]
    InvalidNote(f64),

    #[error("control value {value} for {param} does not map to a positive count")]
    InvalidControl { param: &'static str, value: f64 },
}

/// Whether the generation loop is running and whether it trains on its
/// own output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationState {
    pub running: bool,
    pub evolving: bool,
}

#[derive(Default)]
struct Control {
    state: GenerationState,
    /// Id and cancellation token of the loop currently running, if any.
    active: Option<(u64, CancellationToken)>,
    next_id: u64,
}

pub struct Session {
    model: Mutex<SequenceModel>,
    control: Mutex<Control>,
    last_onset: Mutex<Instant>,
    sink: Arc<dyn NoteSink>,
}

/// Translate bootstrap config into model parameters.
pub fn model_params(config: &ModelConfig) -> ModelParams {
    ModelParams {
        max_duration: config.max_duration,
        note_order: config.note_order,
        time_order: config.time_order,
        divisions: config.divisions,
        note_learn_rate: config.note_rate,
        time_learn_rate: config.time_rate,
        ..ModelParams::default()
    }
}

/// Build a model from bootstrap config, seeded when the config pins a seed.
pub fn model_from_config(config: &ModelConfig) -> Result<SequenceModel, ModelError> {
    let params = model_params(config);
    match config.seed {
        Some(seed) => SequenceModel::with_seed(params, seed),
        None => SequenceModel::new(params),
    }
}

impl Session {
    pub fn new(model: SequenceModel, sink: Arc<dyn NoteSink>) -> Arc<Self> {
        Arc::new(Self {
            model: Mutex::new(model),
            control: Mutex::new(Control::default()),
            last_onset: Mutex::new(Instant::now()),
            sink,
        })
    }

    pub fn sink(&self) -> &Arc<dyn NoteSink> {
        &self.sink
    }

    /// Run `f` against the model under the session lock.
    pub async fn with_model<T>(&self, f: impl FnOnce(&mut SequenceModel) -> T) -> T {
        let mut model = self.model.lock().await;
        f(&mut model)
    }

    pub async fn generation_state(&self) -> GenerationState {
        self.control.lock().await.state
    }

    pub async fn is_evolving(&self) -> bool {
        self.control.lock().await.state.evolving
    }

    // === Live input ===

    /// Handle a live note: stop generation, echo the note, and train on it
    /// with the interval since the previous live note as its duration.
    pub async fn live_note(&self, value: f64) -> Result<usize, SessionError> {
        let note = pitch_class(value)?;
        self.stop_generation().await;

        let elapsed = {
            let mut last_onset = self.last_onset.lock().await;
            let now = Instant::now();
            let elapsed = now.duration_since(*last_onset).as_secs_f64();
            *last_onset = now;
            elapsed
        };

        if let Err(e) = self.sink.send_note(note).await {
            warn!("Failed to echo live note {}: {}", note, e);
        }

        let bucket = {
            let mut model = self.model.lock().await;
            let bucket = quantize_for(&model, elapsed);
            model.observe(note, bucket)?;
            bucket
        };
        debug!(note, bucket, elapsed, "live note observed");
        Ok(bucket)
    }

    // === Generation control ===

    /// Spawn the generation loop unless one is already running.
    ///
    /// Returns the loop's handle when a new loop was spawned.
    pub async fn start_generation(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut control = self.control.lock().await;
        if control.active.is_some() {
            debug!("generation already running");
            return None;
        }
        let id = control.next_id;
        control.next_id += 1;
        let cancel = CancellationToken::new();
        control.active = Some((id, cancel.clone()));
        control.state.running = true;
        drop(control);

        info!("Generation started");
        Some(tokio::spawn(generator::run(Arc::clone(self), id, cancel)))
    }

    /// Cancel the running loop, if any. Returns whether one was running.
    pub async fn stop_generation(&self) -> bool {
        let mut control = self.control.lock().await;
        control.state.running = false;
        match control.active.take() {
            Some((_, cancel)) => {
                cancel.cancel();
                info!("Generation stopped");
                true
            }
            None => false,
        }
    }

    pub async fn set_evolving(&self, evolving: bool) {
        let mut control = self.control.lock().await;
        if control.state.evolving != evolving {
            info!(evolving, "Evolve mode changed");
        }
        control.state.evolving = evolving;
    }

    /// Called by a loop as it exits so a loop that stopped on its own is not
    /// reported as running.
    pub(crate) async fn generation_finished(&self, id: u64) {
        let mut control = self.control.lock().await;
        if matches!(control.active, Some((active, _)) if active == id) {
            control.active = None;
            control.state.running = false;
        }
    }
}

fn pitch_class(value: f64) -> Result<usize, SessionError> {
    if value.fract() == 0.0 && value >= 0.0 && value < NOTE_ALPHABET as f64 {
        Ok(value as usize)
    } else {
        Err(SessionError::InvalidNote(value))
    }
}
