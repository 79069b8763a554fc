/// Shared ADSR coefficients. One record each for the amp and filter
/// envelopes; every voice caches what it derives from here and is notified
/// explicitly when a value changes.
#[derive(Clone, Copy, Debug)]
pub struct AdsrParameters {
    attack_seconds: f32,
    decay_seconds: f32,
    pub sustain_fraction: f32,
    release_seconds: f32,
    sample_rate_hz: f32,
}

impl AdsrParameters {
    pub fn new(sample_rate_hz: f32) -> Self {
        Self {
            attack_seconds: 0.0,
            decay_seconds: 0.0,
            sustain_fraction: 1.0,
            release_seconds: 0.0,
            sample_rate_hz: sample_rate_hz.max(1.0),
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate_hz: f32) {
        self.sample_rate_hz = sample_rate_hz.max(1.0);
    }

    pub fn set_attack_seconds(&mut self, seconds: f32) {
        self.attack_seconds = seconds.max(0.0);
    }

    pub fn attack_seconds(&self) -> f32 {
        self.attack_seconds
    }

    pub fn set_decay_seconds(&mut self, seconds: f32) {
        self.decay_seconds = seconds.max(0.0);
    }

    pub fn decay_seconds(&self) -> f32 {
        self.decay_seconds
    }

    pub fn set_release_seconds(&mut self, seconds: f32) {
        self.release_seconds = seconds.max(0.0);
    }

    pub fn release_seconds(&self) -> f32 {
        self.release_seconds
    }

    pub fn attack_samples(&self) -> f32 {
        self.attack_seconds * self.sample_rate_hz
    }

    pub fn decay_samples(&self) -> f32 {
        self.decay_seconds * self.sample_rate_hz
    }

    pub fn release_samples(&self) -> f32 {
        self.release_seconds * self.sample_rate_hz
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AdsrStage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Per-voice ADSR generator with linear segments, advanced once per render
/// block. Retriggers ramp from the current level instead of snapping to
/// zero. Zero-length segments complete on the next advance.
#[derive(Clone, Copy, Debug)]
pub struct AdsrEnvelope {
    stage: AdsrStage,
    level: f32,
    target: f32,
    remaining: f32, // samples left in the current ramp segment

    attack_samples: f32,
    decay_samples: f32,
    sustain_fraction: f32,
    release_samples: f32,
}

impl AdsrEnvelope {
    pub fn new(parameters: &AdsrParameters) -> Self {
        Self {
            stage: AdsrStage::Idle,
            level: 0.0,
            target: 0.0,
            remaining: 0.0,
            attack_samples: parameters.attack_samples(),
            decay_samples: parameters.decay_samples(),
            sustain_fraction: parameters.sustain_fraction,
            release_samples: parameters.release_samples(),
        }
    }

    /// Refresh the cached segment lengths from the shared record.
    pub fn update_parameters(&mut self, parameters: &AdsrParameters) {
        self.attack_samples = parameters.attack_samples();
        self.decay_samples = parameters.decay_samples();
        self.sustain_fraction = parameters.sustain_fraction;
        self.release_samples = parameters.release_samples();
        match self.stage {
            AdsrStage::Decay => self.target = self.sustain_fraction,
            AdsrStage::Sustain => self.level = self.sustain_fraction,
            _ => {}
        }
    }

    pub fn start(&mut self) {
        self.stage = AdsrStage::Attack;
        self.target = 1.0;
        self.remaining = self.attack_samples;
    }

    pub fn release(&mut self) {
        self.stage = AdsrStage::Release;
        self.target = 0.0;
        self.remaining = self.release_samples;
    }

    pub fn reset(&mut self) {
        self.stage = AdsrStage::Idle;
        self.level = 0.0;
        self.target = 0.0;
        self.remaining = 0.0;
    }

    pub fn is_idle(&self) -> bool {
        self.stage == AdsrStage::Idle
    }

    pub fn is_releasing(&self) -> bool {
        self.stage == AdsrStage::Release
    }

    pub fn value(&self) -> f32 {
        self.level
    }

    /// Move the envelope forward by `n_samples` and return the new level.
    pub fn advance(&mut self, n_samples: usize) -> f32 {
        let mut n = n_samples as f32;
        loop {
            match self.stage {
                AdsrStage::Idle => {
                    self.level = 0.0;
                    break;
                }
                AdsrStage::Sustain => {
                    self.level = self.sustain_fraction;
                    break;
                }
                AdsrStage::Attack | AdsrStage::Decay | AdsrStage::Release => {
                    if self.remaining <= 0.0 {
                        self.level = self.target;
                        self.next_stage();
                        continue;
                    }
                    if n < self.remaining {
                        // Slope stays (target - level) / remaining along a
                        // linear ramp, so this partial step is exact.
                        self.level += (self.target - self.level) * (n / self.remaining);
                        self.remaining -= n;
                        break;
                    }
                    n -= self.remaining;
                    self.level = self.target;
                    self.next_stage();
                }
            }
        }
        self.level
    }

    fn next_stage(&mut self) {
        match self.stage {
            AdsrStage::Attack => {
                self.stage = AdsrStage::Decay;
                self.target = self.sustain_fraction;
                self.remaining = self.decay_samples;
            }
            AdsrStage::Decay => {
                self.stage = AdsrStage::Sustain;
            }
            AdsrStage::Release => {
                self.stage = AdsrStage::Idle;
            }
            AdsrStage::Idle | AdsrStage::Sustain => {}
        }
    }
}
