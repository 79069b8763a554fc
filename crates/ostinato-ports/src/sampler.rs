#[derive(thiserror::Error, Debug)]
pub enum SamplerError {
    #[error("invalid sample: {0}")]
    InvalidSample(String),
}

/// In-memory description of one PCM sample to be loaded into the engine.
///
/// `data` is either interleaved (L R L R ...) or planar (all of channel 0,
/// then all of channel 1) depending on `is_interleaved`; the loader always
/// stores planar. Velocity bounds are a pair: both in 0..=127, or both
/// negative for "matches any velocity".
#[derive(Clone, Debug)]
pub struct SampleDescriptor {
    pub data: Vec<f32>,
    pub channel_count: u32,
    pub sample_count: u32,
    pub sample_rate_hz: f64,
    pub is_interleaved: bool,

    pub root_note_number: u8,
    pub root_frequency_hz: f32,

    pub min_key: u8,
    pub max_key: u8,
    pub min_velocity: i16,
    pub max_velocity: i16,

    /// Fractional sample indices; `None` means start/end of the buffer.
    pub start_point: Option<f32>,
    pub end_point: Option<f32>,
    pub is_looping: bool,
    /// Values > 1.0 are absolute sample indices, values in 0.0..=1.0 are
    /// fractions of the end point.
    pub loop_start_point: Option<f32>,
    pub loop_end_point: Option<f32>,
}

impl SampleDescriptor {
    /// A descriptor with the given PCM and mapping, everything else defaulted:
    /// velocity-agnostic, full key range, not looping.
    pub fn new(
        data: Vec<f32>,
        channel_count: u32,
        sample_count: u32,
        sample_rate_hz: f64,
        root_note_number: u8,
    ) -> Self {
        Self {
            data,
            channel_count,
            sample_count,
            sample_rate_hz,
            is_interleaved: false,
            root_note_number,
            root_frequency_hz: 440.0 * 2.0_f32.powf((root_note_number as f32 - 69.0) / 12.0),
            min_key: 0,
            max_key: 127,
            min_velocity: -1,
            max_velocity: -1,
            start_point: None,
            end_point: None,
            is_looping: false,
            loop_start_point: None,
            loop_end_point: None,
        }
    }
}
