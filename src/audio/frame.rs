use std::f32::consts::FRAC_PI_2;

// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self { // just giving `default` a better name for clarity
        Self::default()
    }

    pub fn mono(x: f32) -> Self {
        Self { left: x, right: x }
    }

    pub fn scaled(self, gain: f32) -> Self {
        Self {
            left: self.left * gain,
            right: self.right * gain,
        }
    }

    /// Stereo panner law: pan 0 leaves both channels untouched, -1/1 folds
    /// everything into one side with equal power.
    pub fn panned(self, pan: f32) -> Self {
        let pan = pan.clamp(-1.0, 1.0);
        if pan == 0.0 {
            return self;
        }
        if pan < 0.0 {
            let x = (pan + 1.0) * FRAC_PI_2;
            Self {
                left: self.left + self.right * x.cos(),
                right: self.right * x.sin(),
            }
        } else {
            let x = pan * FRAC_PI_2;
            Self {
                left: self.left * x.cos(),
                right: self.right + self.left * x.sin(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_pan_is_unity() {
        let f = StereoFrame { left: 0.3, right: -0.2 }.panned(0.0);
        assert!((f.left - 0.3).abs() < 1e-6);
        assert!((f.right + 0.2).abs() < 1e-6);
    }

    #[test]
    fn hard_pan_moves_everything_to_one_side() {
        let left = StereoFrame::mono(0.5).panned(-1.0);
        assert!((left.left - 1.0).abs() < 1e-6);
        assert!(left.right.abs() < 1e-6);

        let right = StereoFrame::mono(0.5).panned(1.0);
        assert!(right.left.abs() < 1e-6);
        assert!((right.right - 1.0).abs() < 1e-6);
    }
}
