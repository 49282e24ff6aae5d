//! Generation loop behavior against an in-memory sink.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use warble::{ModelParams, SequenceModel};
use warbled::{NoteSink, Session, SinkError};

#[derive(Default)]
struct RecordingSink {
    notes: Mutex<Vec<usize>>,
}

impl RecordingSink {
    fn notes(&self) -> Vec<usize> {
        self.notes.lock().unwrap().clone()
    }
}

#[async_trait]
impl NoteSink for RecordingSink {
    async fn send_note(&self, note: usize) -> Result<(), SinkError> {
        self.notes.lock().unwrap().push(note);
        Ok(())
    }
}

fn session_with(max_duration: f64) -> (Arc<Session>, Arc<RecordingSink>) {
    let params = ModelParams {
        max_duration,
        note_order: 2,
        time_order: 2,
        divisions: 4,
        ..ModelParams::default()
    };
    let model = SequenceModel::with_seed(params, 42).unwrap();
    let sink = Arc::new(RecordingSink::default());
    let session = Session::new(model, sink.clone());
    (session, sink)
}

async fn wait_for_notes(sink: &RecordingSink, count: usize) {
    timeout(Duration::from_secs(5), async {
        while sink.notes().len() < count {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("generator produced no notes");
}

#[tokio::test]
async fn test_start_produces_notes() {
    let (session, sink) = session_with(0.02);

    let handle = session.start_generation().await.expect("loop should spawn");
    assert!(session.generation_state().await.running);
    wait_for_notes(&sink, 3).await;

    assert!(session.stop_generation().await);
    timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop did not exit")
        .unwrap();

    assert!(!session.generation_state().await.running);
    assert!(sink.notes().iter().all(|&n| n < warble::NOTE_ALPHABET));
}

#[tokio::test]
async fn test_second_start_is_noop() {
    let (session, _sink) = session_with(0.02);

    let first = session.start_generation().await;
    assert!(first.is_some());
    assert!(session.start_generation().await.is_none());

    session.stop_generation().await;
    first.unwrap().await.unwrap();

    // Once stopped, a fresh start spawns again.
    let again = session.start_generation().await;
    assert!(again.is_some());
    session.stop_generation().await;
    again.unwrap().await.unwrap();
}

#[tokio::test]
async fn test_stop_interrupts_pacing_sleep() {
    // Durations up to several seconds; stop must not wait them out.
    let (session, sink) = session_with(5.0);

    let handle = session.start_generation().await.unwrap();
    wait_for_notes(&sink, 1).await;
    session.stop_generation().await;

    timeout(Duration::from_millis(250), handle)
        .await
        .expect("stop waited for the pacing sleep")
        .unwrap();
}

#[tokio::test]
async fn test_stop_without_loop_reports_false() {
    let (session, _sink) = session_with(0.02);
    assert!(!session.stop_generation().await);
}

#[tokio::test]
async fn test_evolve_mode_trains_on_output() {
    let (session, sink) = session_with(0.02);
    let before = session.with_model(|m| m.notes().table().to_vec()).await;

    session.set_evolving(true).await;
    let handle = session.start_generation().await.unwrap();
    wait_for_notes(&sink, 5).await;
    session.stop_generation().await;
    handle.await.unwrap();

    let after = session.with_model(|m| m.notes().table().to_vec()).await;
    assert_ne!(before, after);
}

#[tokio::test]
async fn test_without_evolve_tables_are_untouched() {
    let (session, sink) = session_with(0.02);
    let before = session.with_model(|m| m.notes().table().to_vec()).await;

    let handle = session.start_generation().await.unwrap();
    wait_for_notes(&sink, 5).await;
    session.stop_generation().await;
    handle.await.unwrap();

    let after = session.with_model(|m| m.notes().table().to_vec()).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_live_note_stops_generation() {
    let (session, sink) = session_with(0.02);

    let handle = session.start_generation().await.unwrap();
    wait_for_notes(&sink, 1).await;

    session.live_note(2.0).await.unwrap();
    assert!(!session.generation_state().await.running);
    timeout(Duration::from_secs(1), handle)
        .await
        .expect("live note did not stop the loop")
        .unwrap();

    assert!(sink.notes().contains(&2));
    let context = session.with_model(|m| m.note_context()).await;
    assert_eq!(context.last(), Some(&2));
}

#[tokio::test]
async fn test_invalid_live_note_leaves_generation_running() {
    let (session, sink) = session_with(0.02);

    let handle = session.start_generation().await.unwrap();
    assert!(session.live_note(7.0).await.is_err());
    assert!(session.generation_state().await.running);

    wait_for_notes(&sink, 1).await;
    session.stop_generation().await;
    handle.await.unwrap();
}
