use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use ostinato_ports::audio::{AudioError, AudioOutputPort, AudioRenderCallback, AudioStreamHandle};
use ostinato_ports::types::{AudioConfig, AudioOutputDevice, DeviceId};
use std::sync::{mpsc, Arc};
use std::thread;
use tracing::warn;

/// cpal-backed output for the engine's fixed f32 stereo format. A cpal
/// stream is not `Send`, so each opened stream is built and parked on its
/// own thread; the returned handle signals that thread to shut down.
pub struct CpalAudioOutput {
    host: cpal::Host,
}

struct ResolvedDevice {
    device: cpal::Device,
    name: String,
}

impl CpalAudioOutput {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    fn device_id(index: usize, name: &str) -> DeviceId {
        DeviceId(format!("cpal-out:{index}:{name}"))
    }

    fn find_device(host: &cpal::Host, wanted: &DeviceId) -> Result<ResolvedDevice, AudioError> {
        let devices = host
            .output_devices()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        for (index, device) in devices.enumerate() {
            let name = output_name(&device);
            if &Self::device_id(index, &name) == wanted {
                return Ok(ResolvedDevice { device, name });
            }
        }
        Err(AudioError::DeviceNotFound(wanted.to_string()))
    }

    /// Pick an f32 stereo config at the requested rate. The engine does no
    /// sample-rate conversion, so a device that cannot run at that rate is
    /// an error rather than a silent fallback.
    fn pick_stereo_config(
        device: &cpal::Device,
        requested: AudioConfig,
    ) -> Result<StreamConfig, AudioError> {
        let mut ranges = device
            .supported_output_configs()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        let rate = SampleRate(requested.sample_rate_hz);
        let usable = ranges.find(|range| {
            range.channels() == 2
                && range.sample_format() == SampleFormat::F32
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        });

        match usable {
            Some(range) => {
                let mut config = range.with_sample_rate(rate).config();
                config.buffer_size = match requested.buffer_size_frames {
                    Some(frames) => BufferSize::Fixed(frames),
                    None => BufferSize::Default,
                };
                Ok(config)
            }
            None => Err(AudioError::UnsupportedConfig(format!(
                "no f32 stereo config at {} Hz",
                requested.sample_rate_hz
            ))),
        }
    }
}

impl Default for CpalAudioOutput {
    fn default() -> Self {
        Self::new()
    }
}

fn output_name(device: &cpal::Device) -> String {
    device
        .name()
        .unwrap_or_else(|_| "Unknown Output".to_string())
}

pub struct CpalStreamHandle {
    shutdown: mpsc::Sender<()>,
    worker: Option<thread::JoinHandle<()>>,
}

impl AudioStreamHandle for CpalStreamHandle {
    fn close(mut self: Box<Self>) {
        let _ = self.shutdown.send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Runs on the stream thread: resolve the device, open the stream, report
/// the outcome once, then park until the handle signals shutdown.
fn stream_worker(
    wanted: DeviceId,
    requested: AudioConfig,
    cb: Arc<dyn AudioRenderCallback>,
    outcome: mpsc::SyncSender<Result<(), AudioError>>,
    shutdown: mpsc::Receiver<()>,
) {
    let host = cpal::default_host();
    let resolved = match CpalAudioOutput::find_device(&host, &wanted) {
        Ok(resolved) => resolved,
        Err(err) => {
            let _ = outcome.send(Err(err));
            return;
        }
    };
    let config = match CpalAudioOutput::pick_stereo_config(&resolved.device, requested) {
        Ok(config) => config,
        Err(err) => {
            let _ = outcome.send(Err(err));
            return;
        }
    };

    // The render callback fills these planar scratch buffers; the closure
    // interleaves them into cpal's L R L R frame layout. Sized lazily since
    // the driver may renegotiate the frame count between callbacks.
    let mut planar_l: Vec<f32> = Vec::new();
    let mut planar_r: Vec<f32> = Vec::new();
    let mut sample_time: u64 = 0;
    let device_name = resolved.name;

    let stream = resolved.device.build_output_stream(
        &config,
        move |frames: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let frame_count = frames.len() / 2;
            if planar_l.len() != frame_count {
                planar_l.resize(frame_count, 0.0);
                planar_r.resize(frame_count, 0.0);
            }

            cb.render(sample_time, &mut planar_l, &mut planar_r);

            for (frame, (&left, &right)) in frames
                .chunks_exact_mut(2)
                .zip(planar_l.iter().zip(planar_r.iter()))
            {
                frame[0] = left;
                frame[1] = right;
            }

            sample_time = sample_time.saturating_add(frame_count as u64);
        },
        move |err| {
            warn!(device = %device_name, "output stream error: {err}");
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(err) => {
            let _ = outcome.send(Err(AudioError::Backend(err.to_string())));
            return;
        }
    };
    if let Err(err) = stream.play() {
        let _ = outcome.send(Err(AudioError::Backend(err.to_string())));
        return;
    }

    let _ = outcome.send(Ok(()));
    let _ = shutdown.recv();
    drop(stream);
}

impl AudioOutputPort for CpalAudioOutput {
    fn list_outputs(&self) -> Result<Vec<AudioOutputDevice>, AudioError> {
        let devices = self
            .host
            .output_devices()
            .map_err(|e| AudioError::Backend(e.to_string()))?;

        let mut outputs = Vec::new();
        for (index, device) in devices.enumerate() {
            let name = output_name(&device);
            let default_config = device
                .default_output_config()
                .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

            outputs.push(AudioOutputDevice {
                id: Self::device_id(index, &name),
                name,
                default_config: AudioConfig {
                    sample_rate_hz: default_config.sample_rate().0,
                    channels: default_config.channels(),
                    buffer_size_frames: None,
                },
            });
        }
        Ok(outputs)
    }

    fn open_output(
        &self,
        device_id: &DeviceId,
        config: AudioConfig,
        cb: Arc<dyn AudioRenderCallback>,
    ) -> Result<Box<dyn AudioStreamHandle>, AudioError> {
        if config.channels != 2 {
            return Err(AudioError::UnsupportedConfig(
                "the engine renders stereo only".to_string(),
            ));
        }

        let (outcome_tx, outcome_rx) = mpsc::sync_channel(1);
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let wanted = device_id.clone();
        let worker =
            thread::spawn(move || stream_worker(wanted, config, cb, outcome_tx, shutdown_rx));

        outcome_rx
            .recv()
            .map_err(|e| AudioError::Backend(e.to_string()))??;

        Ok(Box::new(CpalStreamHandle {
            shutdown: shutdown_tx,
            worker: Some(worker),
        }))
    }
}
