use crate::params::SamplerParams;
use crate::sampler::Sampler;
use ostinato_ports::audio::AudioRenderCallback;
use ostinato_ports::keyboard::KeyboardEvent;
use ostinato_ports::types::SampleTime;
use parking_lot::Mutex;
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Monotonic audio-thread sample clock, readable from any thread.
pub struct AudioClock {
    sample_time: AtomicU64,
}

impl AudioClock {
    pub fn new() -> Self {
        Self {
            sample_time: AtomicU64::new(0),
        }
    }

    pub fn set(&self, sample_time: SampleTime) {
        self.sample_time.store(sample_time, Ordering::Relaxed);
    }

    pub fn get(&self) -> SampleTime {
        self.sample_time.load(Ordering::Relaxed)
    }
}

impl Default for AudioClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the SPSC queue that carries keyboard events from input threads to
/// the audio callback.
pub fn keyboard_queue(capacity: usize) -> (Producer<KeyboardEvent>, Consumer<KeyboardEvent>) {
    RingBuffer::new(capacity)
}

/// Render callback gluing the event queue to the sampler: every block it
/// zeroes the output, drains the queued keyboard events, then sweeps the
/// voice pool, all under one try-lock of the engine state. Contention (a
/// control-thread load or rebuild in progress) yields one silent block;
/// queued events survive to the next block.
pub struct AudioGraph {
    sampler: Arc<Sampler>,
    clock: Arc<AudioClock>,
    events: Mutex<Consumer<KeyboardEvent>>,
}

impl AudioGraph {
    pub fn new(
        sampler: Arc<Sampler>,
        events: Consumer<KeyboardEvent>,
        clock: Arc<AudioClock>,
    ) -> Self {
        Self {
            sampler,
            clock,
            events: Mutex::new(events),
        }
    }
}

impl AudioRenderCallback for AudioGraph {
    fn render(&self, sample_time_start: SampleTime, out_l: &mut [f32], out_r: &mut [f32]) {
        // Voices add into the buffers, so whatever the driver left there
        // must go first; the early-return paths below then yield silence.
        out_l.fill(0.0);
        out_r.fill(0.0);

        let frames = out_l.len().min(out_r.len());
        let sample_time_end = sample_time_start.saturating_add(frames as u64);

        // Only the audio thread takes these locks; try_lock keeps the
        // callback wait-free even so.
        let Some(mut events) = self.events.try_lock() else {
            self.clock.set(sample_time_end);
            return;
        };
        let Some(mut state) = self.sampler.try_lock_state() else {
            self.clock.set(sample_time_end);
            return;
        };

        let params: &SamplerParams = self.sampler.params();
        while let Ok(event) = events.pop() {
            match event {
                KeyboardEvent::NoteOn { key, velocity } => state.note_on(params, key, velocity),
                KeyboardEvent::NoteOff { key } => state.stop_note(params, key, false),
                KeyboardEvent::SustainPedal { down } => state.sustain(params, down),
            }
        }

        state.render_block(params, frames, out_l, out_r);
        self.sampler.publish_active_count(&state);
        self.clock.set(sample_time_end);
    }
}
