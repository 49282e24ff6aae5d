//! OSC wire format for the control surface.
//!
//! Inbound packets decode into [`Command`]s (bundles are flattened in
//! order). Outbound traffic is a single message shape, `/note <int>`.

use rosc::{OscMessage, OscPacket, OscType};
use thiserror::Error;

/// Address used for both live input notes and outgoing notes.
pub const NOTE_ADDR: &str = "/note";

#[derive(Debug, Error, PartialEq)]
pub enum OscError {
    #[error("malformed OSC packet: {0}")]
    Decode(String),

    #[error("failed to encode OSC message: {0}")]
    Encode(String),

    #[error("unknown OSC address {0}")]
    UnknownAddress(String),

    #[error("{addr} expects a numeric argument")]
    MissingArgument { addr: String },
}

/// One control-surface request, with its raw numeric argument.
///
/// Control values are mapped to model parameters by the dispatcher, not here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Live note from a performer.
    Note(f64),
    /// 1 starts the generation loop, anything else stops it.
    Generate(f64),
    /// 1 enables evolve mode, anything else disables it.
    Evolve(f64),
    Clear,
    NoteDepth(f64),
    TimeDepth(f64),
    NoteRate(f64),
    TimeRate(f64),
    MaxDuration(f64),
    TimeDivisions(f64),
}

impl Command {
    /// Parse one OSC message.
    pub fn from_message(msg: &OscMessage) -> Result<Self, OscError> {
        let arg = || {
            msg.args
                .first()
                .and_then(numeric)
                .ok_or_else(|| OscError::MissingArgument {
                    addr: msg.addr.clone(),
                })
        };

        let command = match msg.addr.as_str() {
            NOTE_ADDR => Command::Note(arg()?),
            "/generate" => Command::Generate(arg()?),
            "/evolve" => Command::Evolve(arg()?),
            // The argument carries no meaning; any trigger value clears.
            "/clear" => Command::Clear,
            "/note_depth" => Command::NoteDepth(arg()?),
            "/time_depth" => Command::TimeDepth(arg()?),
            "/note_rate" => Command::NoteRate(arg()?),
            "/time_rate" => Command::TimeRate(arg()?),
            "/max_duration" => Command::MaxDuration(arg()?),
            "/time_divisions" => Command::TimeDivisions(arg()?),
            other => return Err(OscError::UnknownAddress(other.to_string())),
        };
        Ok(command)
    }
}

fn numeric(arg: &OscType) -> Option<f64> {
    match arg {
        OscType::Int(v) => Some(f64::from(*v)),
        OscType::Long(v) => Some(*v as f64),
        OscType::Float(v) => Some(f64::from(*v)),
        OscType::Double(v) => Some(*v),
        OscType::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Decode a datagram into its messages, flattening nested bundles.
pub fn decode_messages(datagram: &[u8]) -> Result<Vec<OscMessage>, OscError> {
    let (_rest, packet) =
        rosc::decoder::decode_udp(datagram).map_err(|e| OscError::Decode(format!("{e:?}")))?;

    let mut messages = Vec::new();
    let mut pending = vec![packet];
    while let Some(packet) = pending.pop() {
        match packet {
            OscPacket::Message(msg) => messages.push(msg),
            // Reversed so the stack pops bundle contents in their sent order.
            OscPacket::Bundle(bundle) => pending.extend(bundle.content.into_iter().rev()),
        }
    }
    Ok(messages)
}

/// Encode an outgoing `/note <int>` message.
pub fn encode_note(note: usize) -> Result<Vec<u8>, OscError> {
    let value = i32::try_from(note).map_err(|_| OscError::Encode(format!("note {note} too large")))?;
    let packet = OscPacket::Message(OscMessage {
        addr: NOTE_ADDR.to_string(),
        args: vec![OscType::Int(value)],
    });
    rosc::encoder::encode(&packet).map_err(|e| OscError::Encode(format!("{e:?}")))
}
