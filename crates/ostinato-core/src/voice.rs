use crate::envelope::{AdsrEnvelope, AdsrParameters};
use crate::oscillator::SampleOscillator;
use crate::sample::SampleBuffer;
use biquad::{Biquad, Coefficients, DirectForm1, ToHertz, Type};
use std::f32::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

/// Per-block control values handed to every voice before it renders.
/// One struct instead of a long positional list; built once per block by the
/// engine from the atomic parameter record.
#[derive(Clone, Copy, Debug)]
pub struct BlockParams {
    pub master_volume: f32,
    /// Pitch deviation in semitones: static offset plus vibrato.
    pub pitch_deviation_semitones: f32,
    pub glide_rate_sec_per_octave: f32,
    /// `None` bypasses the filter entirely.
    pub cutoff_multiple: Option<f32>,
    pub key_tracking: f32,
    pub cutoff_envelope_strength: f32,
    pub filter_envelope_velocity_scaling: f32,
    pub linear_resonance: f32,
}

/// Per-voice resonant low-pass. State is discarded (not filtered through)
/// whenever a new note starts, so a reused voice never rings with the
/// previous note's tail.
#[derive(Default)]
struct VoiceFilter {
    biquad: Option<DirectForm1<f32>>,
}

impl VoiceFilter {
    fn clear(&mut self) {
        self.biquad = None;
    }

    fn set_params(&mut self, sample_rate_hz: f32, cutoff_hz: f32, linear_resonance: f32) {
        let sample_rate = sample_rate_hz.max(1_000.0);
        let cutoff = cutoff_hz.clamp(10.0, sample_rate * 0.45);
        let q = FRAC_1_SQRT_2 / linear_resonance.clamp(0.05, 10.0);
        if let Ok(coefficients) =
            Coefficients::<f32>::from_params(Type::LowPass, sample_rate.hz(), cutoff.hz(), q)
        {
            match &mut self.biquad {
                Some(biquad) => biquad.update_coefficients(coefficients),
                None => self.biquad = Some(DirectForm1::<f32>::new(coefficients)),
            }
        }
    }

    fn run(&mut self, input: f32) -> f32 {
        match &mut self.biquad {
            Some(biquad) => biquad.run(input),
            None => input,
        }
    }
}

/// One polyphonic playback slot. Idle is `note_number < 0`; the pool never
/// reallocates, so a voice going idle is just this marker flipping.
pub struct Voice {
    note_number: i32,
    current_frequency_hz: f32,
    target_frequency_hz: f32,
    velocity_norm: f32,
    output_sample_rate_hz: f32,

    sample: Option<Arc<SampleBuffer>>,
    oscillator: SampleOscillator,
    amp_envelope: AdsrEnvelope,
    filter_envelope: AdsrEnvelope,
    filter_left: VoiceFilter,
    filter_right: VoiceFilter,

    // Block-boundary gains for intra-block ramping.
    gain: f32,
    gain_target: f32,
    filter_active: bool,
}

impl Voice {
    pub fn new(
        output_sample_rate_hz: f32,
        amp_parameters: &AdsrParameters,
        filter_parameters: &AdsrParameters,
    ) -> Self {
        Self {
            note_number: -1,
            current_frequency_hz: 0.0,
            target_frequency_hz: 0.0,
            velocity_norm: 0.0,
            output_sample_rate_hz,
            sample: None,
            oscillator: SampleOscillator::default(),
            amp_envelope: AdsrEnvelope::new(amp_parameters),
            filter_envelope: AdsrEnvelope::new(filter_parameters),
            filter_left: VoiceFilter::default(),
            filter_right: VoiceFilter::default(),
            gain: 0.0,
            gain_target: 0.0,
            filter_active: false,
        }
    }

    /// Currently sounding MIDI key, or -1 when idle.
    pub fn note_number(&self) -> i32 {
        self.note_number
    }

    pub fn is_idle(&self) -> bool {
        self.note_number < 0
    }

    pub fn set_output_sample_rate(&mut self, sample_rate_hz: f32) {
        self.output_sample_rate_hz = sample_rate_hz;
    }

    /// Begin playback from idle.
    pub fn start(
        &mut self,
        key: u8,
        output_sample_rate_hz: f32,
        note_frequency_hz: f32,
        velocity_norm: f32,
        buffer: Arc<SampleBuffer>,
    ) {
        self.note_number = key as i32;
        self.output_sample_rate_hz = output_sample_rate_hz;
        self.current_frequency_hz = note_frequency_hz;
        self.target_frequency_hz = note_frequency_hz;
        self.velocity_norm = velocity_norm;
        self.oscillator.start(&buffer);
        self.sample = Some(buffer);
        self.amp_envelope.start();
        self.filter_envelope.start();
        self.filter_left.clear();
        self.filter_right.clear();
        self.gain = 0.0;
        self.gain_target = 0.0;
    }

    /// Retrigger the envelopes without touching pitch bookkeeping. A `None`
    /// lookup keeps the buffer already playing.
    pub fn restart_same_note(&mut self, velocity_norm: f32, buffer: Option<Arc<SampleBuffer>>) {
        if let Some(buffer) = buffer {
            self.oscillator.start(&buffer);
            self.sample = Some(buffer);
        } else if let Some(current) = &self.sample {
            self.oscillator.start(current);
        }
        self.velocity_norm = velocity_norm;
        self.amp_envelope.start();
        self.filter_envelope.start();
    }

    /// Full retrigger with a new pitch and sample.
    pub fn restart_new_note(
        &mut self,
        key: u8,
        output_sample_rate_hz: f32,
        note_frequency_hz: f32,
        velocity_norm: f32,
        buffer: Arc<SampleBuffer>,
    ) {
        self.note_number = key as i32;
        self.output_sample_rate_hz = output_sample_rate_hz;
        self.current_frequency_hz = note_frequency_hz;
        self.target_frequency_hz = note_frequency_hz;
        self.velocity_norm = velocity_norm;
        self.oscillator.start(&buffer);
        self.sample = Some(buffer);
        self.amp_envelope.start();
        self.filter_envelope.start();
        self.filter_left.clear();
        self.filter_right.clear();
    }

    /// Legato transition: retarget the pitch, keep the envelopes running and
    /// the current sample playing. Glide (when enabled) sweeps toward the
    /// new frequency over the following blocks.
    pub fn restart_new_note_legato(
        &mut self,
        key: u8,
        output_sample_rate_hz: f32,
        note_frequency_hz: f32,
    ) {
        self.note_number = key as i32;
        self.output_sample_rate_hz = output_sample_rate_hz;
        self.target_frequency_hz = note_frequency_hz;
    }

    pub fn release(&mut self, loop_thru_release: bool) {
        self.amp_envelope.release();
        self.filter_envelope.release();
        if !loop_thru_release {
            self.oscillator.set_looping(false);
        }
    }

    /// Force the voice idle immediately.
    pub fn stop(&mut self) {
        self.note_number = -1;
        self.sample = None;
        self.oscillator.reset();
        self.amp_envelope.reset();
        self.filter_envelope.reset();
        self.gain = 0.0;
        self.gain_target = 0.0;
        self.filter_active = false;
    }

    pub fn update_amp_adsr_parameters(&mut self, parameters: &AdsrParameters) {
        self.amp_envelope.update_parameters(parameters);
    }

    pub fn update_filter_adsr_parameters(&mut self, parameters: &AdsrParameters) {
        self.filter_envelope.update_parameters(parameters);
    }

    /// Compute per-block coefficients: glide, pitch increment, envelope
    /// levels, filter cutoff. Returns true when the voice ended (amp
    /// envelope finished its release) and must be retired.
    pub fn prep_to_get_samples(&mut self, block_size: usize, params: &BlockParams) -> bool {
        let Some(buffer) = self.sample.clone() else {
            return true;
        };
        let block_seconds = block_size as f32 / self.output_sample_rate_hz;

        self.advance_glide(block_seconds, params.glide_rate_sec_per_octave);

        let amp_level = self.amp_envelope.advance(block_size);
        if self.amp_envelope.is_idle() {
            return true;
        }
        self.gain_target = params.master_volume * self.velocity_norm * amp_level;

        let pitch_ratio = 2.0_f32.powf(params.pitch_deviation_semitones / 12.0);
        let increment = (self.current_frequency_hz / buffer.root_frequency_hz) as f64
            * pitch_ratio as f64
            * (buffer.sample_rate_hz() / self.output_sample_rate_hz as f64);
        self.oscillator.set_increment(increment);

        let filter_level = self.filter_envelope.advance(block_size);
        match params.cutoff_multiple {
            Some(multiple) => {
                let strength = params.cutoff_envelope_strength
                    * (1.0 - params.filter_envelope_velocity_scaling * (1.0 - self.velocity_norm));
                let cutoff_hz = self.current_frequency_hz
                    * params.key_tracking
                    * (1.0 + multiple + strength * filter_level);
                self.filter_left
                    .set_params(self.output_sample_rate_hz, cutoff_hz, params.linear_resonance);
                self.filter_right
                    .set_params(self.output_sample_rate_hz, cutoff_hz, params.linear_resonance);
                self.filter_active = true;
            }
            None => self.filter_active = false,
        }

        false
    }

    /// Add one block into the output buffers. Returns true when the sample
    /// ran out (non-looping end reached).
    pub fn get_samples(&mut self, block_size: usize, out_l: &mut [f32], out_r: &mut [f32]) -> bool {
        let Some(buffer) = self.sample.clone() else {
            return true;
        };
        let gain_start = self.gain;
        let gain_span = self.gain_target - gain_start;
        let step = 1.0 / block_size.max(1) as f32;

        let mut ran_out = false;
        for i in 0..block_size.min(out_l.len()).min(out_r.len()) {
            let Some((left, right)) = self.oscillator.next_frame(&buffer) else {
                ran_out = true;
                break;
            };
            let gain = gain_start + gain_span * ((i + 1) as f32 * step);
            let (left, right) = if self.filter_active {
                (self.filter_left.run(left), self.filter_right.run(right))
            } else {
                (left, right)
            };
            out_l[i] += left * gain;
            out_r[i] += right * gain;
        }

        self.gain = self.gain_target;
        ran_out
    }

    fn advance_glide(&mut self, block_seconds: f32, glide_rate_sec_per_octave: f32) {
        if self.current_frequency_hz == self.target_frequency_hz {
            return;
        }
        if glide_rate_sec_per_octave <= 0.0
            || self.current_frequency_hz <= 0.0
            || self.target_frequency_hz <= 0.0
        {
            self.current_frequency_hz = self.target_frequency_hz;
            return;
        }

        let max_octaves = block_seconds / glide_rate_sec_per_octave;
        let diff_octaves = (self.target_frequency_hz / self.current_frequency_hz).log2();
        if diff_octaves.abs() <= max_octaves {
            self.current_frequency_hz = self.target_frequency_hz;
        } else {
            let step = max_octaves.copysign(diff_octaves);
            self.current_frequency_hz *= 2.0_f32.powf(step);
        }
    }
}
