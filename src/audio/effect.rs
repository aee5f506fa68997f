use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use super::frame::StereoFrame;

// Per-voice effects. Specs are plain data so they can cross the command
// channel; the engine builds the stateful effect when the voice starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectSpec {
    Bitcrusher { levels: u32 },
    Distortion { amount: f32 },
    LowPass { cutoff: f32 },
}

impl EffectSpec {
    pub fn to_effect(&self, sample_rate: f32) -> Box<dyn Effect> {
        match self {
            EffectSpec::Bitcrusher { levels } => Box::new(Bitcrusher::new(*levels)),
            EffectSpec::Distortion { amount } => Box::new(Distortion::new(*amount)),
            EffectSpec::LowPass { cutoff } => Box::new(LowPass::new(*cutoff, sample_rate)),
        }
    }
}

pub trait Effect: Send {
    fn process(&mut self, buf: &mut [StereoFrame]);
}

//bitcrusher
pub struct Bitcrusher {
    levels: f32,
}

impl Bitcrusher {
    pub fn new(levels: u32) -> Self {
        Self {
            levels: levels.clamp(2, 65536) as f32,
        }
    }
}

impl Effect for Bitcrusher {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        let scale = (self.levels - 1.0) * 0.5;
        let inv = 1.0 / scale;
        for f in buf.iter_mut() {
            f.left = (f.left.clamp(-1.0, 1.0) * scale).round() * inv;
            f.right = (f.right.clamp(-1.0, 1.0) * scale).round() * inv;
        }
    }
}

//distortion: classic wave-shaper curve, amount 0 is a straight line
pub struct Distortion {
    amount: f32,
}

impl Distortion {
    pub fn new(amount: f32) -> Self {
        Self {
            amount: amount.clamp(0.0, 1000.0),
        }
    }

    #[inline]
    fn shape(&self, x: f32) -> f32 {
        let x = x.clamp(-1.0, 1.0);
        (PI + self.amount) * x / (PI + self.amount * x.abs())
    }
}

impl Effect for Distortion {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            f.left = self.shape(f.left);
            f.right = self.shape(f.right);
        }
    }
}

//one-pole lowpass
pub struct LowPass {
    coeff: f32,
    state: StereoFrame,
}

impl LowPass {
    pub fn new(cutoff: f32, sample_rate: f32) -> Self {
        let cutoff = cutoff.clamp(10.0, sample_rate * 0.49);
        Self {
            coeff: 1.0 - (-TAU * cutoff / sample_rate).exp(),
            state: StereoFrame::zero(),
        }
    }
}

impl Effect for LowPass {
    fn process(&mut self, buf: &mut [StereoFrame]) {
        for f in buf.iter_mut() {
            self.state.left += self.coeff * (f.left - self.state.left);
            self.state.right += self.coeff * (f.right - self.state.right);
            *f = self.state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distortion_keeps_extremes_and_boosts_quiet_input() {
        let mut d = Distortion::new(400.0);
        let mut buf = [StereoFrame::mono(1.0), StereoFrame::mono(-1.0), StereoFrame::mono(0.1)];
        d.process(&mut buf);
        assert!((buf[0].left - 1.0).abs() < 1e-5);
        assert!((buf[1].right + 1.0).abs() < 1e-5);
        assert!(buf[2].left > 0.5);
    }

    #[test]
    fn bitcrusher_quantizes() {
        let mut b = Bitcrusher::new(3);
        let mut buf = [StereoFrame::mono(0.4), StereoFrame::mono(0.6)];
        b.process(&mut buf);
        assert_eq!(buf[0].left, 0.0);
        assert_eq!(buf[1].left, 1.0);
    }

    #[test]
    fn lowpass_settles_on_dc() {
        let mut lp = LowPass::new(1000.0, 44100.0);
        let mut buf = vec![StereoFrame::mono(1.0); 4410];
        lp.process(&mut buf);
        let last = buf[buf.len() - 1];
        assert!((last.left - 1.0).abs() < 1e-3);
        assert!(buf[0].left < 0.5);
    }
}
