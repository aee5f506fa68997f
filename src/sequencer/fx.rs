// Probabilistic per-hit effects. Each one is rolled independently every time
// a track fires; the musical mappings (hard pans, 400 drive, 16-level crush,
// 32nd stutter, 64th ratchet) are taste, not contract.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DISTORTION_AMOUNT: f32 = 400.0;
pub const CRUSH_LEVELS: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FxKind {
    Autopan,
    Distortion,
    Crush,
    Stutter,
    Ratchet,
}

impl FxKind {
    pub const ALL: [FxKind; 5] = [
        FxKind::Autopan,
        FxKind::Distortion,
        FxKind::Crush,
        FxKind::Stutter,
        FxKind::Ratchet,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FxKind::Autopan => "PAN",
            FxKind::Distortion => "DIST",
            FxKind::Crush => "CRUSH",
            FxKind::Stutter => "STUT",
            FxKind::Ratchet => "RATCH",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxSetting {
    pub active: bool,
    pub probability: u8,
}

impl Default for FxSetting {
    fn default() -> Self {
        Self { active: false, probability: 50 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepFx {
    pub autopan: FxSetting,
    pub distortion: FxSetting,
    pub crush: FxSetting,
    pub stutter: FxSetting,
    pub ratchet: FxSetting,
}

/// One sample start produced by a fired step. The default is a plain hit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Hit {
    pub offset: f64, // seconds after the step time
    pub pan: Option<f32>,
    pub distort: bool,
    pub crush: bool,
}

/// Percent roll; 100 always passes, 0 never does.
pub fn roll<R: Rng>(rng: &mut R, probability: u8) -> bool {
    probability >= 100 || (probability > 0 && rng.random_range(0..100u8) < probability)
}

impl StepFx {
    pub fn get(&self, kind: FxKind) -> FxSetting {
        match kind {
            FxKind::Autopan => self.autopan,
            FxKind::Distortion => self.distortion,
            FxKind::Crush => self.crush,
            FxKind::Stutter => self.stutter,
            FxKind::Ratchet => self.ratchet,
        }
    }

    fn get_mut(&mut self, kind: FxKind) -> &mut FxSetting {
        match kind {
            FxKind::Autopan => &mut self.autopan,
            FxKind::Distortion => &mut self.distortion,
            FxKind::Crush => &mut self.crush,
            FxKind::Stutter => &mut self.stutter,
            FxKind::Ratchet => &mut self.ratchet,
        }
    }

    /// Stutter and ratchet exclude each other.
    pub fn toggle(&mut self, kind: FxKind) {
        let fx = self.get_mut(kind);
        fx.active = !fx.active;
        if !fx.active {
            return;
        }
        match kind {
            FxKind::Stutter => self.ratchet.active = false,
            FxKind::Ratchet => self.stutter.active = false,
            _ => {}
        }
    }

    /// 25 → 50 → 75 → 100 → 25
    pub fn cycle_probability(&mut self, kind: FxKind) {
        let fx = self.get_mut(kind);
        fx.probability = match fx.probability {
            p if p < 25 => 25,
            p if p >= 100 => 25,
            p => ((p / 25) + 1).min(4) * 25,
        };
    }

    pub fn any_active(&self) -> bool {
        FxKind::ALL.iter().any(|&k| self.get(k).active)
    }

    fn fires<R: Rng>(&self, kind: FxKind, rng: &mut R) -> bool {
        let fx = self.get(kind);
        fx.active && roll(rng, fx.probability)
    }

    /// Expand one fired step into the sample starts it produces.
    pub fn expand<R: Rng>(&self, rng: &mut R, step_seconds: f64) -> Vec<Hit> {
        let autopan = self.fires(FxKind::Autopan, rng);
        let distort = self.fires(FxKind::Distortion, rng);
        let crush = self.fires(FxKind::Crush, rng);
        let stutter = self.fires(FxKind::Stutter, rng);
        let ratchet = self.fires(FxKind::Ratchet, rng);

        let (count, spacing) = if ratchet {
            (4, step_seconds / 4.0)
        } else if stutter {
            (2, step_seconds / 2.0)
        } else {
            (1, 0.0)
        };

        (0..count)
            .map(|i| Hit {
                offset: i as f64 * spacing,
                pan: autopan.then(|| if rng.random_bool(0.5) { -1.0 } else { 1.0 }),
                distort,
                crush,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(7)
    }

    fn always(active: bool) -> FxSetting {
        FxSetting { active, probability: 100 }
    }

    #[test]
    fn no_fx_is_one_plain_hit() {
        let hits = StepFx::default().expand(&mut rng(), 0.125);
        assert_eq!(hits, vec![Hit::default()]);
    }

    #[test]
    fn crush_marks_every_hit_of_a_ratchet() {
        let fx = StepFx { crush: always(true), ratchet: always(true), ..Default::default() };
        let hits = fx.expand(&mut rng(), 0.2);
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().all(|h| h.crush && !h.distort));
    }

    #[test]
    fn ratchet_is_four_quarter_step_hits() {
        let fx = StepFx { ratchet: always(true), ..Default::default() };
        let hits = fx.expand(&mut rng(), 0.2);
        assert_eq!(hits.len(), 4);
        for (i, h) in hits.iter().enumerate() {
            assert!((h.offset - 0.05 * i as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn stutter_is_two_half_step_hits() {
        let fx = StepFx { stutter: always(true), distortion: always(true), ..Default::default() };
        let hits = fx.expand(&mut rng(), 0.125);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].offset, 0.0625);
        assert!(hits.iter().all(|h| h.distort));
    }

    #[test]
    fn autopan_pans_hard() {
        let fx = StepFx { autopan: always(true), ..Default::default() };
        let mut r = rng();
        for _ in 0..20 {
            let pan = fx.expand(&mut r, 0.1)[0].pan;
            assert!(matches!(pan, Some(p) if p == -1.0 || p == 1.0));
        }
    }

    #[test]
    fn stutter_and_ratchet_exclude_each_other() {
        let mut fx = StepFx::default();
        fx.toggle(FxKind::Stutter);
        assert!(fx.stutter.active);
        fx.toggle(FxKind::Ratchet);
        assert!(fx.ratchet.active);
        assert!(!fx.stutter.active);
        fx.toggle(FxKind::Distortion);
        assert!(fx.ratchet.active);
        fx.toggle(FxKind::Ratchet);
        assert!(!fx.ratchet.active);
        assert!(fx.distortion.active);
        fx.toggle(FxKind::Distortion);
        assert!(!fx.any_active());
    }

    #[test]
    fn probability_cycles_in_quarters() {
        let mut fx = StepFx::default();
        let seen: Vec<u8> = (0..5)
            .map(|_| {
                fx.cycle_probability(FxKind::Autopan);
                fx.autopan.probability
            })
            .collect();
        assert_eq!(seen, vec![75, 100, 25, 50, 75]);
    }

    #[test]
    fn roll_respects_extremes_and_rate() {
        let mut r = rng();
        assert!((0..1000).all(|_| roll(&mut r, 100)));
        assert!((0..1000).all(|_| !roll(&mut r, 0)));
        let hits = (0..10_000).filter(|_| roll(&mut r, 30)).count();
        assert!((2500..3500).contains(&hits), "{hits}");
    }
}
