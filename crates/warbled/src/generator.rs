//! The generation loop.
//!
//! Each pass draws a note and a duration, sends the note, then sleeps for
//! the duration. Cancellation is checked at the top of every pass and also
//! races the pacing sleep, so a stop takes effect without waiting out the
//! current note. In evolve mode the drawn pair is fed back into the model
//! once its sleep completes.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::quantize::quantize_for;
use crate::session::Session;

pub async fn run(session: Arc<Session>, id: u64, cancel: CancellationToken) {
    let mut notes_played: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let drawn = session
            .with_model(|model| {
                let note = model.generate_note()?;
                let seconds = model.generate_duration()?;
                Ok::<_, warble::ModelError>((note, seconds))
            })
            .await;
        let (note, seconds) = match drawn {
            Ok(pair) => pair,
            Err(e) => {
                error!("Generation aborted: {}", e);
                break;
            }
        };

        if let Err(e) = session.sink().send_note(note).await {
            warn!("Failed to send generated note {}: {}", note, e);
        }
        notes_played += 1;
        debug!(note, seconds, "generated note");

        let pace = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pace) => {}
        }

        if session.is_evolving().await {
            let result = session
                .with_model(|model| {
                    let bucket = quantize_for(model, seconds);
                    model.observe(note, bucket)
                })
                .await;
            if let Err(e) = result {
                warn!("Evolve mode could not observe note {}: {}", note, e);
            }
        }
    }

    session.generation_finished(id).await;
    info!(notes_played, "Generation loop exited");
}
