pub const MIDI_NOTES: usize = 128;

/// 12-tone equal temperament pitch of a MIDI note, A4 = 440 Hz.
pub fn note_to_hz(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Per-key frequency table. Defaults to 12-TET; individual keys can be
/// retuned without affecting the rest of the table.
#[derive(Clone, Debug)]
pub struct TuningTable {
    freq: [f32; MIDI_NOTES],
}

impl Default for TuningTable {
    fn default() -> Self {
        Self {
            freq: std::array::from_fn(|note| note_to_hz(note as u8)),
        }
    }
}

impl TuningTable {
    pub fn frequency(&self, note: u8) -> f32 {
        self.freq[note as usize & 0x7F]
    }

    pub fn set_frequency(&mut self, note: u8, hz: f32) {
        if hz > 0.0 {
            self.freq[note as usize & 0x7F] = hz;
        }
    }
}
