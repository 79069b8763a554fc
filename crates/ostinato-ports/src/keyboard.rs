use crate::types::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A keyboard-shaped event, already stripped of MIDI channel/status details.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyboardEvent {
    NoteOn {
        key: u8,
        velocity: u8,
    },
    NoteOff {
        key: u8,
    },
    /// CC64 mapped to a boolean: pedal is down when value >= 64.
    SustainPedal {
        down: bool,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum MidiError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// MIDI input stream handle: drop closes it.
pub trait MidiInputStream: Send {
    fn close(self: Box<Self>);
}

pub type KeyboardEventCallback = Arc<dyn Fn(KeyboardEvent) + Send + Sync + 'static>;

pub trait MidiInputPort: Send + Sync {
    fn list_inputs(&self) -> Result<Vec<MidiInputDevice>, MidiError>;

    /// Open input stream: implementation invokes cb from a background thread/callback.
    fn open_input(
        &self,
        device_id: &DeviceId,
        cb: KeyboardEventCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError>;
}
