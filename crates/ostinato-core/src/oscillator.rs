use crate::sample::SampleBuffer;

/// Playback cursor into a sample buffer: fractional position, per-output-
/// sample increment, loop-region wrap. The increment is recomputed once per
/// block by the owning voice; within a block the pitch is constant.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleOscillator {
    position: f64,
    increment: f64,
    looping: bool,
}

impl SampleOscillator {
    pub fn start(&mut self, buffer: &SampleBuffer) {
        self.position = buffer.start_point as f64;
        self.increment = 1.0;
        self.looping = buffer.is_looping;
    }

    pub fn set_increment(&mut self, increment: f64) {
        self.increment = increment.max(0.0);
    }

    /// Release with loop-thru-release disabled calls this so the sample
    /// plays through to its end point and runs out.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
        self.increment = 0.0;
        self.looping = false;
    }

    /// Read the frame under the cursor and advance. `None` means the cursor
    /// passed the end point with looping off: the sample ran out.
    pub fn next_frame(&mut self, buffer: &SampleBuffer) -> Option<(f32, f32)> {
        if self.position >= buffer.end_point as f64 {
            return None;
        }
        let frame = buffer.read_interpolated(self.position);

        self.position += self.increment;
        if self.looping && self.position >= buffer.loop_end_point as f64 {
            self.position -= (buffer.loop_end_point - buffer.loop_start_point) as f64;
        }
        Some(frame)
    }
}
