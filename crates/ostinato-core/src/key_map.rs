use crate::sample::SampleBuffer;
use crate::tuning::{note_to_hz, TuningTable, MIDI_NOTES};
use std::sync::Arc;

/// Index from MIDI key to candidate sample buffers. Buckets keep bank
/// insertion order; lookups are deterministic for a fixed bank and map.
pub struct KeyMap {
    buckets: [Vec<Arc<SampleBuffer>>; MIDI_NOTES],
    valid: bool,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            buckets: std::array::from_fn(|_| Vec::new()),
            valid: false,
        }
    }
}

impl KeyMap {
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Any bank mutation calls this; note events are dropped until a rebuild.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
        self.valid = false;
    }

    /// Map every key to the bank buffers whose root note is closest in pitch.
    ///
    /// Distance is measured against the 12-TET pitch of each buffer's root
    /// note, not the buffer's stored root frequency and not the tuning table;
    /// this keeps the map independent of per-key retuning. Exact ties keep
    /// all tied buffers, in insertion order.
    pub fn build_simple(&mut self, bank: &[Arc<SampleBuffer>], tuning: &TuningTable) {
        self.clear();

        for key in 0..MIDI_NOTES {
            let key_freq = tuning.frequency(key as u8);

            let mut min_distance = f32::MAX;
            for buffer in bank {
                let distance = (note_to_hz(buffer.root_note_number) - key_freq).abs();
                if distance < min_distance {
                    min_distance = distance;
                }
            }

            for buffer in bank {
                let distance = (note_to_hz(buffer.root_note_number) - key_freq).abs();
                if distance == min_distance {
                    self.buckets[key].push(Arc::clone(buffer));
                }
            }
        }

        self.valid = true;
    }

    /// Map every key to the bank buffers whose declared key range covers it,
    /// compared in frequency space, in insertion order.
    pub fn build_range(&mut self, bank: &[Arc<SampleBuffer>], tuning: &TuningTable) {
        self.clear();

        for key in 0..MIDI_NOTES {
            let key_freq = tuning.frequency(key as u8);
            for buffer in bank {
                let min_freq = note_to_hz(buffer.min_key);
                let max_freq = note_to_hz(buffer.max_key);
                if min_freq <= key_freq && key_freq <= max_freq {
                    self.buckets[key].push(Arc::clone(buffer));
                }
            }
        }

        self.valid = true;
    }

    /// Pick the buffer for a (key, velocity) pair.
    ///
    /// A single-entry bucket wins outright. Otherwise the first buffer in
    /// insertion order that is velocity-agnostic or whose range contains the
    /// velocity wins; no match drops the note.
    pub fn lookup(&self, key: u8, velocity: u8) -> Option<Arc<SampleBuffer>> {
        let bucket = &self.buckets[key as usize & 0x7F];
        if bucket.len() == 1 {
            return Some(Arc::clone(&bucket[0]));
        }

        for buffer in bucket {
            if buffer.is_velocity_agnostic() || buffer.matches_velocity(velocity) {
                return Some(Arc::clone(buffer));
            }
        }

        None
    }

    pub fn bucket(&self, key: u8) -> &[Arc<SampleBuffer>] {
        &self.buckets[key as usize & 0x7F]
    }
}
