//! Routes decoded control commands onto the session.
//!
//! Control surfaces send normalized or zero-based values, so a few commands
//! are rescaled here before reaching the model:
//!
//! | command          | model call                           |
//! |------------------|--------------------------------------|
//! | `/note_depth d`  | `set_note_order(trunc(d) + 1)`       |
//! | `/time_depth d`  | `set_time_order(trunc(d) + 1)`       |
//! | `/time_divisions d` | `set_time_divisions(trunc(d) + 1)` |
//! | `/max_duration v`| `set_max_duration(v * 4.9 + 0.1)`    |

use std::sync::Arc;

use tracing::{debug, info};

use crate::osc::Command;
use crate::session::{Session, SessionError};

/// Control value 0..1 spans 0.1..5.0 seconds.
pub fn max_duration_from_control(value: f64) -> f64 {
    value * 4.9 + 0.1
}

/// Zero-based control value to a one-based count.
pub fn count_from_control(param: &'static str, value: f64) -> Result<usize, SessionError> {
    let whole = value.trunc();
    // Counts this large overflow any table long before usize does.
    if !(whole.is_finite() && whole > -1.0 && whole < u32::MAX as f64) {
        return Err(SessionError::InvalidControl { param, value });
    }
    Ok(whole.max(0.0) as usize + 1)
}

fn is_on(value: f64) -> bool {
    value == 1.0
}

#[derive(Clone)]
pub struct Dispatcher {
    session: Arc<Session>,
}

impl Dispatcher {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn dispatch(&self, command: Command) -> Result<(), SessionError> {
        debug!(?command, "dispatching");
        match command {
            Command::Note(value) => {
                self.session.live_note(value).await?;
            }
            Command::Generate(state) => {
                if is_on(state) {
                    // The loop runs detached; its handle is not needed here.
                    let _ = self.session.start_generation().await;
                } else {
                    self.session.stop_generation().await;
                }
            }
            Command::Evolve(state) => {
                self.session.set_evolving(is_on(state)).await;
            }
            Command::Clear => {
                self.session.with_model(|m| m.clear()).await;
                info!("Model cleared");
            }
            Command::NoteDepth(value) => {
                let order = count_from_control("note_depth", value)?;
                self.session.with_model(|m| m.set_note_order(order)).await?;
                info!(order, "Note order set");
            }
            Command::TimeDepth(value) => {
                let order = count_from_control("time_depth", value)?;
                self.session.with_model(|m| m.set_time_order(order)).await?;
                info!(order, "Time order set");
            }
            Command::NoteRate(rate) => {
                self.session.with_model(|m| m.set_note_learn_rate(rate)).await?;
                info!(rate, "Note learn rate set");
            }
            Command::TimeRate(rate) => {
                self.session.with_model(|m| m.set_time_learn_rate(rate)).await?;
                info!(rate, "Time learn rate set");
            }
            Command::MaxDuration(value) => {
                let seconds = max_duration_from_control(value);
                self.session
                    .with_model(|m| m.set_max_duration(seconds))
                    .await?;
                info!(seconds, "Max duration set");
            }
            Command::TimeDivisions(value) => {
                let divisions = count_from_control("time_divisions", value)?;
                self.session
                    .with_model(|m| m.set_time_divisions(divisions))
                    .await?;
                info!(divisions, "Time divisions set");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_from_control_is_one_based() {
        assert_eq!(count_from_control("x", 0.0).unwrap(), 1);
        assert_eq!(count_from_control("x", 2.0).unwrap(), 3);
        assert_eq!(count_from_control("x", 2.9).unwrap(), 3);
        assert_eq!(count_from_control("x", -0.5).unwrap(), 1);
    }

    #[test]
    fn test_count_from_control_rejects_nonsense() {
        assert!(count_from_control("x", -1.0).is_err());
        assert!(count_from_control("x", f64::NAN).is_err());
        assert!(count_from_control("x", f64::INFINITY).is_err());
    }

    #[test]
    fn test_max_duration_scaling() {
        assert!((max_duration_from_control(0.0) - 0.1).abs() < 1e-12);
        assert!((max_duration_from_control(1.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_is_on_only_for_one() {
        assert!(is_on(1.0));
        assert!(!is_on(0.0));
        assert!(!is_on(2.0));
    }
}
