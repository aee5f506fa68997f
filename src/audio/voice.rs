use super::effect::Effect;
use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::sample_id::SampleId;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// One playing (or about to play) sample. Fire-and-forget: it deactivates
/// itself once the trimmed region has been read.
pub struct Voice {
    pub sample_id: SampleId,
    pub active: bool,
    pub age: u64, // trigger order, used for stealing
    pos: f64,
    pitch: f64,
    gain: f32,
    pan: f32,
    delay: usize, // frames of silence before the sample starts
    trim_start: usize,
    length: usize,
    effects: Vec<Box<dyn Effect>>,
}

pub struct VoiceParams {
    pub trim_start: usize,
    pub length: usize,
    pub pitch: f32,
    pub gain: f32,
    pub pan: f32,
    pub delay: usize,
}

impl Voice {
    pub fn new(
        sample_id: SampleId,
        age: u64,
        p: VoiceParams,
        effects: Vec<Box<dyn Effect>>,
    ) -> Self {
        Self {
            sample_id,
            active: true,
            age,
            pos: 0.0,
            pitch: p.pitch.max(0.01) as f64,
            gain: p.gain,
            pan: p.pan,
            delay: p.delay,
            trim_start: p.trim_start,
            length: p.length,
            effects,
        }
    }

    /// Mix this voice into `out`, using `scratch` (same length) as the dry
    /// buffer the effect chain runs over.
    pub fn render_into(
        &mut self,
        buffer: &SampleBuffer,
        scratch: &mut [StereoFrame],
        out: &mut [StereoFrame],
    ) {
        if !self.active {
            return;
        }
        let available = buffer.len().saturating_sub(self.trim_start);
        // length 0 means "to the end of the buffer"
        let length = if self.length == 0 { available } else { self.length.min(available) };
        if length == 0 {
            self.active = false;
            return;
        }

        let n = out.len().min(scratch.len());
        let scratch = &mut scratch[..n];
        scratch.fill(StereoFrame::zero());

        let skip = self.delay.min(n);
        self.delay -= skip;

        let data = &buffer.data;
        let mut written = skip;
        for frame in scratch[skip..].iter_mut() {
            if self.pos >= length as f64 {
                break;
            }
            let i = self.pos as usize;
            let frac = (self.pos - i as f64) as f32;
            let idx = self.trim_start + i;
            let s0 = data[idx];
            let s1 = if i + 1 < length { data[idx + 1] } else { s0 };
            *frame = StereoFrame {
                left: lerp(s0.left, s1.left, frac),
                right: lerp(s0.right, s1.right, frac),
            };
            self.pos += self.pitch;
            written += 1;
        }

        for effect in self.effects.iter_mut() {
            effect.process(&mut scratch[..written]);
        }
        for (o, s) in out.iter_mut().zip(scratch[..written].iter()) {
            let f = s.panned(self.pan).scaled(self.gain);
            o.left += f.left;
            o.right += f.right;
        }

        if self.delay == 0 && self.pos >= length as f64 {
            self.active = false;
        }
    }
}
