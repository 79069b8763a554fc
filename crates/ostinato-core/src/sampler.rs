use crate::envelope::AdsrParameters;
use crate::key_map::KeyMap;
use crate::lfo::VibratoLfo;
use crate::params::SamplerParams;
use crate::pedal::SustainPedalLogic;
use crate::sample::SampleBuffer;
use crate::tuning::TuningTable;
use crate::voice::{BlockParams, Voice};
use ostinato_ports::sampler::{SampleDescriptor, SamplerError};
use ostinato_ports::storage::{AdsrDto, SettingsDto};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

pub const MAX_POLYPHONY: usize = 64;

/// Thread model:
/// - sample loads, key-map builds, note/pedal events, and parameter setters
///   are control-thread calls and may lock internally
/// - `render` is the realtime entry point: it only ever try-locks, never
///   allocates, and outputs a silent block when the lock is contended
///
/// Bank and key-map mutations require a quiesced engine: call
/// `stop_all_voices`, mutate, then `restart_voices`.
pub struct Sampler {
    params: Arc<SamplerParams>,
    active_voices: AtomicUsize,
    state: Mutex<SamplerState>,
}

pub(crate) struct SamplerState {
    output_sample_rate_hz: f32,
    bank: Vec<Arc<SampleBuffer>>,
    key_map: KeyMap,
    tuning: TuningTable,
    pedal: SustainPedalLogic,
    amp_envelope_parameters: AdsrParameters,
    filter_envelope_parameters: AdsrParameters,
    vibrato_lfo: VibratoLfo,
    voices: Vec<Voice>,
}

impl Sampler {
    pub fn new(sample_rate_hz: f32) -> Self {
        Self::with_settings(sample_rate_hz, &SettingsDto::default())
    }

    pub fn with_settings(sample_rate_hz: f32, settings: &SettingsDto) -> Self {
        let amp_envelope_parameters = adsr_from_dto(sample_rate_hz, &settings.amp_envelope);
        let filter_envelope_parameters = adsr_from_dto(sample_rate_hz, &settings.filter_envelope);

        let mut voices = Vec::with_capacity(MAX_POLYPHONY);
        for _ in 0..MAX_POLYPHONY {
            voices.push(Voice::new(
                sample_rate_hz,
                &amp_envelope_parameters,
                &filter_envelope_parameters,
            ));
        }

        Self {
            params: Arc::new(SamplerParams::new(settings)),
            active_voices: AtomicUsize::new(0),
            state: Mutex::new(SamplerState {
                output_sample_rate_hz: sample_rate_hz,
                bank: Vec::new(),
                key_map: KeyMap::default(),
                tuning: TuningTable::default(),
                pedal: SustainPedalLogic::default(),
                amp_envelope_parameters,
                filter_envelope_parameters,
                vibrato_lfo: VibratoLfo::default(),
                voices,
            }),
        }
    }

    /// Scalar parameter record; shared with hosts for direct get/set.
    pub fn params(&self) -> &Arc<SamplerParams> {
        &self.params
    }

    pub fn set_sample_rate(&self, sample_rate_hz: f32) {
        let mut state = self.state.lock();
        state.output_sample_rate_hz = sample_rate_hz;
        state
            .amp_envelope_parameters
            .set_sample_rate(sample_rate_hz);
        state
            .filter_envelope_parameters
            .set_sample_rate(sample_rate_hz);
        let amp = state.amp_envelope_parameters;
        let filter = state.filter_envelope_parameters;
        for voice in state.voices.iter_mut() {
            voice.set_output_sample_rate(sample_rate_hz);
            voice.update_amp_adsr_parameters(&amp);
            voice.update_filter_adsr_parameters(&filter);
        }
    }

    /// Validate, de-interleave, and append one sample to the bank. The key
    /// map becomes invalid until the next build; note events are dropped in
    /// the meantime. Call with the engine quiesced.
    pub fn load_sample(&self, descriptor: SampleDescriptor) -> Result<(), SamplerError> {
        let buffer = SampleBuffer::from_descriptor(descriptor)?;
        let mut state = self.state.lock();
        debug!(
            root_note = buffer.root_note_number,
            frames = buffer.sample_count(),
            channels = buffer.channel_count(),
            "sample loaded"
        );
        state.bank.push(Arc::new(buffer));
        state.key_map.invalidate();
        Ok(())
    }

    /// Empty the bank and the key map. Call with the engine quiesced.
    pub fn clear_samples(&self) {
        let mut state = self.state.lock();
        state.bank.clear();
        state.key_map.clear();
        debug!("sample bank cleared");
    }

    pub fn sample_count(&self) -> usize {
        self.state.lock().bank.len()
    }

    /// Rebuild the key map so every key plays the bank buffer(s) closest in
    /// root pitch.
    pub fn build_simple_key_map(&self) {
        let mut state = self.state.lock();
        let SamplerState {
            key_map,
            bank,
            tuning,
            ..
        } = &mut *state;
        key_map.build_simple(bank, tuning);
        debug!(bank_size = bank.len(), "simple key map built");
    }

    /// Rebuild the key map from each buffer's declared key range.
    pub fn build_key_map(&self) {
        let mut state = self.state.lock();
        let SamplerState {
            key_map,
            bank,
            tuning,
            ..
        } = &mut *state;
        key_map.build_range(bank, tuning);
        debug!(bank_size = bank.len(), "range key map built");
    }

    pub fn is_key_map_valid(&self) -> bool {
        self.state.lock().key_map.is_valid()
    }

    pub fn set_note_frequency(&self, key: u8, hz: f32) {
        self.state.lock().tuning.set_frequency(key, hz);
    }

    pub fn note_frequency(&self, key: u8) -> f32 {
        self.state.lock().tuning.frequency(key)
    }

    pub fn play_note(&self, key: u8, velocity: u8) {
        let mut state = self.state.lock();
        state.note_on(&self.params, key, velocity);
        self.publish_active_count(&state);
    }

    pub fn stop_note(&self, key: u8, immediate: bool) {
        let mut state = self.state.lock();
        state.stop_note(&self.params, key, immediate);
        self.publish_active_count(&state);
    }

    pub fn sustain_pedal(&self, down: bool) {
        let mut state = self.state.lock();
        state.sustain(&self.params, down);
        self.publish_active_count(&state);
    }

    /// Lock out new notes and busy-wait until the render thread has retired
    /// every active voice. Control-thread primitive: the wait never touches
    /// the state lock, so render passes keep draining unimpeded.
    pub fn stop_all_voices(&self) {
        self.params.set_stopping_all_voices(true);
        debug!("stopping all voices");
        while self.active_voices.load(Ordering::Acquire) != 0 {
            std::thread::yield_now();
        }
    }

    /// Allow starting new notes again.
    pub fn restart_voices(&self) {
        self.params.set_stopping_all_voices(false);
    }

    /// Realtime entry point: sweep the voice pool and add one block into the
    /// pre-zeroed output buffers. Contention on the state lock yields one
    /// silent block, never a stall.
    pub fn render(&self, frames: usize, out_l: &mut [f32], out_r: &mut [f32]) {
        let Some(mut state) = self.state.try_lock() else {
            return;
        };
        state.render_block(&self.params, frames, out_l, out_r);
        self.publish_active_count(&state);
    }

    /// True while `key` sounds only because the pedal is holding it.
    pub fn is_note_sustaining(&self, key: u8) -> bool {
        self.state.lock().pedal.is_note_sustaining(key)
    }

    /// MIDI key the given voice is sounding, or -1 when idle.
    pub fn voice_note(&self, index: usize) -> i32 {
        self.state
            .lock()
            .voices
            .get(index)
            .map(|voice| voice.note_number())
            .unwrap_or(-1)
    }

    pub fn active_voice_count(&self) -> usize {
        self.active_voices.load(Ordering::Acquire)
    }

    pub fn last_played_note_number(&self) -> i32 {
        self.params.last_played_note_number()
    }

    pub fn set_amp_attack_seconds(&self, seconds: f32) {
        self.update_amp_envelope(|p| p.set_attack_seconds(seconds));
    }

    pub fn amp_attack_seconds(&self) -> f32 {
        self.state.lock().amp_envelope_parameters.attack_seconds()
    }

    pub fn set_amp_decay_seconds(&self, seconds: f32) {
        self.update_amp_envelope(|p| p.set_decay_seconds(seconds));
    }

    pub fn amp_decay_seconds(&self) -> f32 {
        self.state.lock().amp_envelope_parameters.decay_seconds()
    }

    pub fn set_amp_sustain_fraction(&self, fraction: f32) {
        self.update_amp_envelope(|p| p.sustain_fraction = fraction.clamp(0.0, 1.0));
    }

    pub fn amp_sustain_fraction(&self) -> f32 {
        self.state.lock().amp_envelope_parameters.sustain_fraction
    }

    pub fn set_amp_release_seconds(&self, seconds: f32) {
        self.update_amp_envelope(|p| p.set_release_seconds(seconds));
    }

    pub fn amp_release_seconds(&self) -> f32 {
        self.state.lock().amp_envelope_parameters.release_seconds()
    }

    pub fn set_filter_attack_seconds(&self, seconds: f32) {
        self.update_filter_envelope(|p| p.set_attack_seconds(seconds));
    }

    pub fn filter_attack_seconds(&self) -> f32 {
        self.state.lock().filter_envelope_parameters.attack_seconds()
    }

    pub fn set_filter_decay_seconds(&self, seconds: f32) {
        self.update_filter_envelope(|p| p.set_decay_seconds(seconds));
    }

    pub fn filter_decay_seconds(&self) -> f32 {
        self.state.lock().filter_envelope_parameters.decay_seconds()
    }

    pub fn set_filter_sustain_fraction(&self, fraction: f32) {
        self.update_filter_envelope(|p| p.sustain_fraction = fraction.clamp(0.0, 1.0));
    }

    pub fn filter_sustain_fraction(&self) -> f32 {
        self.state.lock().filter_envelope_parameters.sustain_fraction
    }

    pub fn set_filter_release_seconds(&self, seconds: f32) {
        self.update_filter_envelope(|p| p.set_release_seconds(seconds));
    }

    pub fn filter_release_seconds(&self) -> f32 {
        self.state.lock().filter_envelope_parameters.release_seconds()
    }

    fn update_amp_envelope(&self, mutate: impl FnOnce(&mut AdsrParameters)) {
        let mut state = self.state.lock();
        mutate(&mut state.amp_envelope_parameters);
        let parameters = state.amp_envelope_parameters;
        for voice in state.voices.iter_mut() {
            voice.update_amp_adsr_parameters(&parameters);
        }
    }

    fn update_filter_envelope(&self, mutate: impl FnOnce(&mut AdsrParameters)) {
        let mut state = self.state.lock();
        mutate(&mut state.filter_envelope_parameters);
        let parameters = state.filter_envelope_parameters;
        for voice in state.voices.iter_mut() {
            voice.update_filter_adsr_parameters(&parameters);
        }
    }

    pub(crate) fn try_lock_state(&self) -> Option<parking_lot::MutexGuard<'_, SamplerState>> {
        self.state.try_lock()
    }

    pub(crate) fn publish_active_count(&self, state: &SamplerState) {
        self.active_voices
            .store(state.active_count(), Ordering::Release);
    }
}

impl SamplerState {
    fn voice_index_playing(&self, key: u8) -> Option<usize> {
        self.voices
            .iter()
            .position(|voice| voice.note_number() == key as i32)
    }

    fn active_count(&self) -> usize {
        self.voices.iter().filter(|voice| !voice.is_idle()).count()
    }

    pub(crate) fn note_on(&mut self, params: &SamplerParams, key: u8, velocity: u8) {
        let other_was_down = self.pedal.is_any_key_down();
        self.pedal.key_down(key);
        self.play(params, key, velocity, other_was_down);
    }

    pub(crate) fn sustain(&mut self, params: &SamplerParams, down: bool) {
        if down {
            self.pedal.pedal_down();
        } else {
            for key in 0..=127u8 {
                if self.pedal.is_note_sustaining(key) {
                    self.stop(params, key, false);
                }
            }
            self.pedal.pedal_up();
        }
    }

    fn play(&mut self, params: &SamplerParams, key: u8, velocity: u8, other_was_down: bool) {
        if params.is_stopping_all_voices() {
            return;
        }
        if !self.key_map.is_valid() || self.bank.is_empty() {
            return;
        }

        let frequency = self.tuning.frequency(key);
        let velocity_norm = velocity as f32 / 127.0;
        let sample_rate = self.output_sample_rate_hz;

        if params.is_monophonic() {
            if params.is_legato() && other_was_down {
                if self.voices[0].note_number() >= 0 {
                    self.voices[0].restart_new_note_legato(key, sample_rate, frequency);
                } else {
                    let Some(buffer) = self.key_map.lookup(key, velocity) else {
                        return;
                    };
                    self.voices[0].start(key, sample_rate, frequency, velocity_norm, buffer);
                }
            } else {
                // Monophonic but not legato: always trigger a fresh note.
                let Some(buffer) = self.key_map.lookup(key, velocity) else {
                    return;
                };
                if self.voices[0].note_number() >= 0 {
                    self.voices[0].restart_new_note(
                        key,
                        sample_rate,
                        frequency,
                        velocity_norm,
                        buffer,
                    );
                } else {
                    self.voices[0].start(key, sample_rate, frequency, velocity_norm, buffer);
                }
            }
            params.set_last_played_note_number(key as i32);
            return;
        }

        // Polyphonic: a voice already sounding this key is retriggered in
        // place rather than doubled.
        if let Some(index) = self.voice_index_playing(key) {
            let buffer = self.key_map.lookup(key, velocity);
            self.voices[index].restart_same_note(velocity_norm, buffer);
            params.set_last_played_note_number(key as i32);
            return;
        }

        if let Some(free) = self.voices.iter().position(|voice| voice.is_idle()) {
            let Some(buffer) = self.key_map.lookup(key, velocity) else {
                return;
            };
            self.voices[free].start(key, sample_rate, frequency, velocity_norm, buffer);
            params.set_last_played_note_number(key as i32);
        }
        // Pool exhausted: drop the note silently.
    }

    pub(crate) fn stop_note(&mut self, params: &SamplerParams, key: u8, immediate: bool) {
        // Short-circuit: an immediate stop bypasses the pedal bookkeeping.
        if immediate || self.pedal.key_up(key) {
            self.stop(params, key, immediate);
        }
    }

    fn stop(&mut self, params: &SamplerParams, key: u8, immediate: bool) {
        let Some(index) = self.voice_index_playing(key) else {
            return;
        };

        if immediate {
            self.voices[index].stop();
            return;
        }

        if params.is_monophonic() {
            match self.pedal.first_key_down() {
                None => self.voices[index].release(params.loop_thru_release()),
                Some(held_key) => {
                    let frequency = self.tuning.frequency(held_key);
                    let sample_rate = self.output_sample_rate_hz;
                    if params.is_legato() {
                        self.voices[index].restart_new_note_legato(
                            held_key,
                            sample_rate,
                            frequency,
                        );
                    } else {
                        // The original press velocity is gone at this point;
                        // the retargeted key re-looks-up at a fixed 100.
                        let velocity: u8 = 100;
                        let Some(buffer) = self.key_map.lookup(held_key, velocity) else {
                            return;
                        };
                        let velocity_norm = velocity as f32 / 127.0;
                        if self.voices[index].note_number() >= 0 {
                            self.voices[index].restart_new_note(
                                held_key,
                                sample_rate,
                                frequency,
                                velocity_norm,
                                buffer,
                            );
                        } else {
                            self.voices[index].start(
                                held_key,
                                sample_rate,
                                frequency,
                                velocity_norm,
                                buffer,
                            );
                        }
                    }
                }
            }
        } else {
            self.voices[index].release(params.loop_thru_release());
        }
    }

    pub(crate) fn render_block(
        &mut self,
        params: &SamplerParams,
        frames: usize,
        out_l: &mut [f32],
        out_r: &mut [f32],
    ) {
        let frames = frames.min(out_l.len()).min(out_r.len());
        if frames == 0 {
            return;
        }

        let block_seconds = frames as f32 / self.output_sample_rate_hz;
        let vibrato = self
            .vibrato_lfo
            .next_sample(params.vibrato_rate_hz(), block_seconds);
        let block = BlockParams {
            master_volume: params.master_volume(),
            pitch_deviation_semitones: params.pitch_offset_semitones()
                + params.vibrato_depth_semitones() * vibrato,
            glide_rate_sec_per_octave: params.glide_rate(),
            cutoff_multiple: params
                .is_filter_enabled()
                .then(|| params.cutoff_multiple()),
            key_tracking: params.key_tracking(),
            cutoff_envelope_strength: params.cutoff_envelope_strength(),
            filter_envelope_velocity_scaling: params.filter_envelope_velocity_scaling(),
            linear_resonance: params.linear_resonance(),
        };

        // A legato monophonic voice must survive its sample running out so
        // the next retarget still has a voice to bend.
        let allow_runout = !(params.is_monophonic() && params.is_legato());
        let stopping = params.is_stopping_all_voices();

        for index in 0..self.voices.len() {
            let note = self.voices[index].note_number();
            if note < 0 {
                continue;
            }
            let key = note as u8;

            if stopping || self.voices[index].prep_to_get_samples(frames, &block) {
                self.stop_note(params, key, true);
                continue;
            }
            if self.voices[index].get_samples(frames, out_l, out_r) && allow_runout {
                self.stop_note(params, key, true);
            }
        }
    }
}

fn adsr_from_dto(sample_rate_hz: f32, dto: &AdsrDto) -> AdsrParameters {
    let mut parameters = AdsrParameters::new(sample_rate_hz);
    parameters.set_attack_seconds(dto.attack_seconds);
    parameters.set_decay_seconds(dto.decay_seconds);
    parameters.sustain_fraction = dto.sustain_fraction.clamp(0.0, 1.0);
    parameters.set_release_seconds(dto.release_seconds);
    parameters
}
