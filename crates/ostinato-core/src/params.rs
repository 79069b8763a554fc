use ostinato_ports::storage::SettingsDto;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

/// Scalar engine parameters, control-thread-writable and render-thread-
/// readable. f32 values are stored as bits in `AtomicU32` with relaxed
/// ordering; `stopping_all_voices` is a publish-once flag and uses
/// release/acquire so the render sweep observes it within one block.
#[derive(Debug)]
pub struct SamplerParams {
    master_volume: AtomicU32,
    pitch_offset_semitones: AtomicU32,
    vibrato_depth_semitones: AtomicU32,
    vibrato_rate_hz: AtomicU32,
    glide_rate_sec_per_octave: AtomicU32,
    cutoff_multiple: AtomicU32,
    key_tracking: AtomicU32,
    cutoff_envelope_strength: AtomicU32,
    filter_envelope_velocity_scaling: AtomicU32,
    linear_resonance: AtomicU32,
    monophonic: AtomicBool,
    legato: AtomicBool,
    filter_enabled: AtomicBool,
    loop_thru_release: AtomicBool,
    stopping_all_voices: AtomicBool,
    last_played_note_number: AtomicI32,
}

fn f32_atomic(value: f32) -> AtomicU32 {
    AtomicU32::new(value.to_bits())
}

impl SamplerParams {
    pub fn new(settings: &SettingsDto) -> Self {
        Self {
            master_volume: f32_atomic(settings.master_volume.get()),
            pitch_offset_semitones: f32_atomic(0.0),
            vibrato_depth_semitones: f32_atomic(0.0),
            vibrato_rate_hz: f32_atomic(settings.vibrato_rate_hz),
            glide_rate_sec_per_octave: f32_atomic(0.0),
            cutoff_multiple: f32_atomic(4.0),
            key_tracking: f32_atomic(1.0),
            cutoff_envelope_strength: f32_atomic(20.0),
            filter_envelope_velocity_scaling: f32_atomic(0.0),
            linear_resonance: f32_atomic(0.5),
            monophonic: AtomicBool::new(false),
            legato: AtomicBool::new(false),
            filter_enabled: AtomicBool::new(false),
            loop_thru_release: AtomicBool::new(false),
            stopping_all_voices: AtomicBool::new(false),
            last_played_note_number: AtomicI32::new(-1),
        }
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.master_volume
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn master_volume(&self) -> f32 {
        f32::from_bits(self.master_volume.load(Ordering::Relaxed))
    }

    pub fn set_pitch_offset_semitones(&self, semitones: f32) {
        self.pitch_offset_semitones
            .store(semitones.to_bits(), Ordering::Relaxed);
    }

    pub fn pitch_offset_semitones(&self) -> f32 {
        f32::from_bits(self.pitch_offset_semitones.load(Ordering::Relaxed))
    }

    pub fn set_vibrato_depth_semitones(&self, semitones: f32) {
        self.vibrato_depth_semitones
            .store(semitones.to_bits(), Ordering::Relaxed);
    }

    pub fn vibrato_depth_semitones(&self) -> f32 {
        f32::from_bits(self.vibrato_depth_semitones.load(Ordering::Relaxed))
    }

    pub fn set_vibrato_rate_hz(&self, hz: f32) {
        self.vibrato_rate_hz
            .store(hz.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn vibrato_rate_hz(&self) -> f32 {
        f32::from_bits(self.vibrato_rate_hz.load(Ordering::Relaxed))
    }

    /// Seconds per octave; 0 disables glide.
    pub fn set_glide_rate(&self, sec_per_octave: f32) {
        self.glide_rate_sec_per_octave
            .store(sec_per_octave.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn glide_rate(&self) -> f32 {
        f32::from_bits(self.glide_rate_sec_per_octave.load(Ordering::Relaxed))
    }

    pub fn set_cutoff_multiple(&self, multiple: f32) {
        self.cutoff_multiple
            .store(multiple.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn cutoff_multiple(&self) -> f32 {
        f32::from_bits(self.cutoff_multiple.load(Ordering::Relaxed))
    }

    pub fn set_key_tracking(&self, tracking: f32) {
        self.key_tracking
            .store(tracking.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn key_tracking(&self) -> f32 {
        f32::from_bits(self.key_tracking.load(Ordering::Relaxed))
    }

    pub fn set_cutoff_envelope_strength(&self, strength: f32) {
        self.cutoff_envelope_strength
            .store(strength.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn cutoff_envelope_strength(&self) -> f32 {
        f32::from_bits(self.cutoff_envelope_strength.load(Ordering::Relaxed))
    }

    pub fn set_filter_envelope_velocity_scaling(&self, scaling: f32) {
        self.filter_envelope_velocity_scaling
            .store(scaling.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn filter_envelope_velocity_scaling(&self) -> f32 {
        f32::from_bits(self.filter_envelope_velocity_scaling.load(Ordering::Relaxed))
    }

    pub fn set_linear_resonance(&self, resonance: f32) {
        self.linear_resonance
            .store(resonance.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn linear_resonance(&self) -> f32 {
        f32::from_bits(self.linear_resonance.load(Ordering::Relaxed))
    }

    pub fn set_monophonic(&self, monophonic: bool) {
        self.monophonic.store(monophonic, Ordering::Relaxed);
    }

    pub fn is_monophonic(&self) -> bool {
        self.monophonic.load(Ordering::Relaxed)
    }

    pub fn set_legato(&self, legato: bool) {
        self.legato.store(legato, Ordering::Relaxed);
    }

    pub fn is_legato(&self) -> bool {
        self.legato.load(Ordering::Relaxed)
    }

    pub fn set_filter_enabled(&self, enabled: bool) {
        self.filter_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_filter_enabled(&self) -> bool {
        self.filter_enabled.load(Ordering::Relaxed)
    }

    pub fn set_loop_thru_release(&self, enabled: bool) {
        self.loop_thru_release.store(enabled, Ordering::Relaxed);
    }

    pub fn loop_thru_release(&self) -> bool {
        self.loop_thru_release.load(Ordering::Relaxed)
    }

    pub fn set_stopping_all_voices(&self, stopping: bool) {
        self.stopping_all_voices.store(stopping, Ordering::Release);
    }

    pub fn is_stopping_all_voices(&self) -> bool {
        self.stopping_all_voices.load(Ordering::Acquire)
    }

    pub fn set_last_played_note_number(&self, note: i32) {
        self.last_played_note_number.store(note, Ordering::Relaxed);
    }

    pub fn last_played_note_number(&self) -> i32 {
        self.last_played_note_number.load(Ordering::Relaxed)
    }
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self::new(&SettingsDto::default())
    }
}
