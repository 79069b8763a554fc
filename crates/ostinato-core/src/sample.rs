use ostinato_ports::sampler::{SampleDescriptor, SamplerError};

/// One loaded PCM sample plus its key/velocity mapping metadata.
/// Immutable after load; the key map and playing voices hold `Arc`s to it.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    channel_count: u32,
    sample_rate_hz: f64,
    sample_count: u32,
    data: Vec<f32>, // planar: channel 0 samples, then channel 1

    pub root_note_number: u8,
    pub root_frequency_hz: f32,
    pub min_key: u8,
    pub max_key: u8,
    pub min_velocity: i16,
    pub max_velocity: i16,

    pub start_point: f32,
    pub end_point: f32,
    pub is_looping: bool,
    pub loop_start_point: f32,
    pub loop_end_point: f32,
}

impl SampleBuffer {
    /// Validate a descriptor and build the planar buffer. On any violation
    /// the bank is left untouched by the caller (nothing is appended).
    pub fn from_descriptor(sdd: SampleDescriptor) -> Result<Self, SamplerError> {
        if sdd.sample_count == 0 {
            return Err(SamplerError::InvalidSample("sample_count is zero".into()));
        }
        if sdd.channel_count != 1 && sdd.channel_count != 2 {
            return Err(SamplerError::InvalidSample(format!(
                "channel_count {} not in {{1, 2}}",
                sdd.channel_count
            )));
        }
        if sdd.sample_rate_hz <= 0.0 {
            return Err(SamplerError::InvalidSample("sample_rate_hz <= 0".into()));
        }
        let expected = (sdd.channel_count * sdd.sample_count) as usize;
        if sdd.data.len() < expected {
            return Err(SamplerError::InvalidSample(format!(
                "data holds {} samples, need {}",
                sdd.data.len(),
                expected
            )));
        }
        if sdd.root_frequency_hz <= 0.0 {
            return Err(SamplerError::InvalidSample("root_frequency_hz <= 0".into()));
        }
        let velocity_agnostic = sdd.min_velocity < 0 && sdd.max_velocity < 0;
        let velocity_ranged = (0..=127).contains(&sdd.min_velocity)
            && (0..=127).contains(&sdd.max_velocity)
            && sdd.min_velocity <= sdd.max_velocity;
        if !velocity_agnostic && !velocity_ranged {
            return Err(SamplerError::InvalidSample(format!(
                "velocity bounds {}..{} must both be in 0..=127 or both negative",
                sdd.min_velocity, sdd.max_velocity
            )));
        }

        let sample_count = sdd.sample_count;
        let channel_count = sdd.channel_count;
        let data = if sdd.is_interleaved && channel_count == 2 {
            let mut planar = vec![0.0_f32; expected];
            for i in 0..sample_count as usize {
                planar[i] = sdd.data[2 * i];
                planar[sample_count as usize + i] = sdd.data[2 * i + 1];
            }
            planar
        } else {
            sdd.data[..expected].to_vec()
        };

        let start_point = sdd.start_point.unwrap_or(0.0);
        let end_point = sdd.end_point.unwrap_or(sample_count as f32);
        if !(0.0 <= start_point && start_point < end_point && end_point <= sample_count as f32) {
            return Err(SamplerError::InvalidSample(format!(
                "start/end points {start_point}..{end_point} out of range"
            )));
        }

        // Loop point values > 1.0 are absolute sample indices; values in
        // 0.0..=1.0 are fractions of the end point. Omitted points span the
        // playable region.
        let resolve = |point: f32| if point > 1.0 { point } else { end_point * point };
        let loop_start_point = sdd.loop_start_point.map(resolve).unwrap_or(start_point);
        let loop_end_point = sdd.loop_end_point.map(resolve).unwrap_or(end_point);
        if sdd.is_looping
            && !(start_point <= loop_start_point
                && loop_start_point < loop_end_point
                && loop_end_point <= end_point)
        {
            return Err(SamplerError::InvalidSample(format!(
                "loop points {loop_start_point}..{loop_end_point} outside {start_point}..{end_point}"
            )));
        }

        Ok(Self {
            channel_count,
            sample_rate_hz: sdd.sample_rate_hz,
            sample_count,
            data,
            root_note_number: sdd.root_note_number & 0x7F,
            root_frequency_hz: sdd.root_frequency_hz,
            min_key: sdd.min_key & 0x7F,
            max_key: sdd.max_key & 0x7F,
            min_velocity: sdd.min_velocity,
            max_velocity: sdd.max_velocity,
            start_point,
            end_point,
            is_looping: sdd.is_looping,
            loop_start_point,
            loop_end_point,
        })
    }

    pub fn channel_count(&self) -> u32 {
        self.channel_count
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn is_velocity_agnostic(&self) -> bool {
        self.min_velocity < 0 || self.max_velocity < 0
    }

    pub fn matches_velocity(&self, velocity: u8) -> bool {
        let v = velocity as i16;
        self.min_velocity <= v && v <= self.max_velocity
    }

    /// Linear-interpolated read of one frame at a fractional position.
    /// Mono buffers return the same value for both channels.
    pub fn read_interpolated(&self, position: f64) -> (f32, f32) {
        let count = self.sample_count as usize;
        let index = (position.floor() as usize).min(count - 1);
        let next = (index + 1).min(count - 1);
        let frac = (position - index as f64) as f32;

        let left = self.data[index] + (self.data[next] - self.data[index]) * frac;
        if self.channel_count == 2 {
            let base = count;
            let right =
                self.data[base + index] + (self.data[base + next] - self.data[base + index]) * frac;
            (left, right)
        } else {
            (left, left)
        }
    }
}
