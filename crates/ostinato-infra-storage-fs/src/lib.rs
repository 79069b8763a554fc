use ostinato_ports::storage::{SettingsDto, StorageError, StoragePort};
use ostinato_ports::types::Volume01;
use std::fs;
use std::io;
use std::path::PathBuf;

const SETTINGS_FILE: &str = "settings.json";
const SETTINGS_TMP: &str = "settings.json.tmp";

/// Sampler settings persisted as JSON. Saves go through a temp file and a
/// rename so a crash mid-write never leaves a torn settings file; loads pull
/// hand-edited values back into the ranges the engine accepts.
pub struct FsStorage {
    base_dir: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// `<config_dir>/ostinato`, e.g. `~/.config/ostinato` on Linux.
    pub fn in_config_dir() -> Result<Self, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("no config directory on this platform".to_string()))?;
        Ok(Self::new(base.join("ostinato")))
    }

    fn io_err(e: io::Error) -> StorageError {
        StorageError::Io(e.to_string())
    }
}

/// Serde fills `Volume01` and the envelope fields with whatever the file
/// says, bypassing the constructors that normally clamp them. Out-of-range
/// values are corrected here instead of rejecting the whole file.
fn sanitize(mut settings: SettingsDto) -> SettingsDto {
    settings.master_volume = Volume01::new(settings.master_volume.get());
    settings.vibrato_rate_hz = settings.vibrato_rate_hz.max(0.0);
    for envelope in [&mut settings.amp_envelope, &mut settings.filter_envelope] {
        envelope.attack_seconds = envelope.attack_seconds.max(0.0);
        envelope.decay_seconds = envelope.decay_seconds.max(0.0);
        envelope.sustain_fraction = envelope.sustain_fraction.clamp(0.0, 1.0);
        envelope.release_seconds = envelope.release_seconds.max(0.0);
    }
    settings
}

impl StoragePort for FsStorage {
    fn load_settings(&self) -> Result<SettingsDto, StorageError> {
        let data = match fs::read(self.base_dir.join(SETTINGS_FILE)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SettingsDto::default()),
            Err(e) => return Err(Self::io_err(e)),
        };
        let settings =
            serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))?;
        Ok(sanitize(settings))
    }

    fn save_settings(&self, settings: &SettingsDto) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_dir).map_err(Self::io_err)?;
        let data =
            serde_json::to_vec_pretty(settings).map_err(|e| StorageError::Serde(e.to_string()))?;

        let tmp = self.base_dir.join(SETTINGS_TMP);
        fs::write(&tmp, data).map_err(Self::io_err)?;
        fs::rename(&tmp, self.base_dir.join(SETTINGS_FILE)).map_err(Self::io_err)
    }
}
