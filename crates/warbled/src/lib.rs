//! warbled: OSC control daemon for a Warble sequence model.
//!
//! Receives live notes and control messages over UDP, trains the model on
//! live playing, and plays generated notes back to a peer.
//!
//! - osc.rs: wire format and [`Command`] parsing
//! - dispatch.rs: control value mapping onto the model
//! - session.rs: shared model, generation state, live-note handling
//! - generator.rs: the cancellable generation loop
//! - quantize.rs: inter-onset interval to duration bucket
//! - sink.rs: where outgoing notes go
//! - server.rs: UDP receive loop
//! - telemetry.rs: tracing subscriber setup

pub mod dispatch;
pub mod generator;
pub mod osc;
pub mod quantize;
pub mod server;
pub mod session;
pub mod sink;
pub mod telemetry;

pub use dispatch::Dispatcher;
pub use osc::{Command, OscError};
pub use server::OscServer;
pub use session::{model_from_config, GenerationState, Session, SessionError};
pub use sink::{NoteSink, SinkError, UdpNoteSink};
