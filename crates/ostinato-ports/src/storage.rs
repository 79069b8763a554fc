use crate::types::*;
use serde::{Deserialize, Serialize};

fn default_master_volume() -> Volume01 {
    Volume01::new(1.0)
}

fn default_vibrato_rate_hz() -> f32 {
    5.0
}

fn default_sustain_fraction() -> f32 {
    1.0
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsrDto {
    pub attack_seconds: f32,
    pub decay_seconds: f32,
    #[serde(default = "default_sustain_fraction")]
    pub sustain_fraction: f32,
    pub release_seconds: f32,
}

impl Default for AdsrDto {
    fn default() -> Self {
        Self {
            attack_seconds: 0.0,
            decay_seconds: 0.0,
            sustain_fraction: 1.0,
            release_seconds: 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsDto {
    pub selected_midi_in: Option<DeviceId>,
    pub selected_audio_out: Option<DeviceId>,
    pub audio_buffer_size_frames: Option<u32>,
    #[serde(default = "default_master_volume")]
    pub master_volume: Volume01,
    #[serde(default = "default_vibrato_rate_hz")]
    pub vibrato_rate_hz: f32,
    pub amp_envelope: AdsrDto,
    pub filter_envelope: AdsrDto,
}

impl Default for SettingsDto {
    fn default() -> Self {
        Self {
            selected_midi_in: None,
            selected_audio_out: None,
            audio_buffer_size_frames: None,
            master_volume: Volume01::new(1.0),
            vibrato_rate_hz: 5.0,
            amp_envelope: AdsrDto::default(),
            filter_envelope: AdsrDto::default(),
        }
    }
}

pub trait StoragePort: Send + Sync {
    fn load_settings(&self) -> Result<SettingsDto, StorageError>;
    fn save_settings(&self, s: &SettingsDto) -> Result<(), StorageError>;
}
