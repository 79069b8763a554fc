use crate::tuning::MIDI_NOTES;

/// Sustain pedal state machine: which keys are physically held, and which
/// were released while the pedal was down and are sounding only because of
/// it. A key is never both down and sustaining.
#[derive(Clone, Debug)]
pub struct SustainPedalLogic {
    keys_down: [bool; MIDI_NOTES],
    keys_sustaining: [bool; MIDI_NOTES],
    pedal_is_down: bool,
}

impl Default for SustainPedalLogic {
    fn default() -> Self {
        Self {
            keys_down: [false; MIDI_NOTES],
            keys_sustaining: [false; MIDI_NOTES],
            pedal_is_down: false,
        }
    }
}

impl SustainPedalLogic {
    pub fn key_down(&mut self, key: u8) {
        let key = key as usize & 0x7F;
        self.keys_sustaining[key] = false;
        self.keys_down[key] = true;
    }

    /// Returns true when the note must actually stop; false when the pedal
    /// takes over and the note keeps sounding.
    pub fn key_up(&mut self, key: u8) -> bool {
        let key = key as usize & 0x7F;
        self.keys_down[key] = false;
        if self.pedal_is_down {
            self.keys_sustaining[key] = true;
            return false;
        }
        true
    }

    pub fn pedal_down(&mut self) {
        self.pedal_is_down = true;
    }

    /// Lower the pedal and clear every sustaining flag. Callers that need to
    /// stop the pedal-held notes scan `is_note_sustaining` first; this stays
    /// allocation-free so the render path can apply pedal events directly.
    pub fn pedal_up(&mut self) {
        self.keys_sustaining = [false; MIDI_NOTES];
        self.pedal_is_down = false;
    }

    pub fn is_pedal_down(&self) -> bool {
        self.pedal_is_down
    }

    pub fn is_any_key_down(&self) -> bool {
        self.keys_down.iter().any(|&down| down)
    }

    pub fn is_note_sustaining(&self, key: u8) -> bool {
        self.keys_sustaining[key as usize & 0x7F]
    }

    pub fn first_key_down(&self) -> Option<u8> {
        self.keys_down
            .iter()
            .position(|&down| down)
            .map(|key| key as u8)
    }
}
