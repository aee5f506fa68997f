use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_BPM: f64 = 30.0;
pub const MAX_BPM: f64 = 400.0;
pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_SUBDIVISIONS: u32 = 4; // sixteenth notes
pub const MAX_SUBDIVISIONS: u32 = 16;
pub const MAX_STEPS: usize = 64;

/// A bar of `beats` notes of value `1/unit`, played as sixteenth-note steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u32,
    pub unit: u32,
}

/// Meters the UI cycles through, common time first.
pub const TIME_SIGNATURES: [TimeSignature; 15] = [
    TimeSignature::new(4, 4),
    TimeSignature::new(3, 2),
    TimeSignature::new(5, 2),
    TimeSignature::new(5, 4),
    TimeSignature::new(7, 2),
    TimeSignature::new(7, 4),
    TimeSignature::new(5, 8),
    TimeSignature::new(7, 8),
    TimeSignature::new(11, 8),
    TimeSignature::new(13, 8),
    TimeSignature::new(15, 8),
    TimeSignature::new(17, 16),
    TimeSignature::new(19, 8),
    TimeSignature::new(23, 16),
    TimeSignature::new(25, 16),
];

impl TimeSignature {
    pub const fn new(beats: u32, unit: u32) -> Self {
        Self { beats, unit }
    }

    /// Steps in one bar: `beats * 16 / unit`, at least 1 and at most `MAX_STEPS`.
    pub fn steps(self) -> usize {
        let steps = self.beats as usize * 16 / self.unit.max(1) as usize;
        steps.clamp(1, MAX_STEPS)
    }

    /// The meter after this one in `TIME_SIGNATURES`, wrapping around.
    /// Meters outside the list continue from common time.
    pub fn next(self) -> Self {
        match TIME_SIGNATURES.iter().position(|&ts| ts == self) {
            Some(i) => TIME_SIGNATURES[(i + 1) % TIME_SIGNATURES.len()],
            None => TIME_SIGNATURES[0],
        }
    }

    /// Parse `"7/8"`. The unit must be a power of two up to 16.
    pub fn parse(text: &str) -> Option<Self> {
        let (beats, unit) = text.trim().split_once('/')?;
        let beats: u32 = beats.trim().parse().ok()?;
        let unit: u32 = unit.trim().parse().ok()?;
        Some(Self { beats, unit }).filter(|ts| ts.is_playable())
    }

    /// A hand-edited meter that can't be played falls back to common time.
    pub fn normalized(self) -> Self {
        if self.is_playable() { self } else { Self::default() }
    }

    fn is_playable(self) -> bool {
        self.beats > 0 && self.unit.is_power_of_two() && self.unit <= 16
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TIME_SIGNATURES[0]
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.unit)
    }
}

pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        DEFAULT_BPM
    }
}

/// Seconds between two ticks: `60 / bpm / subdivisions`.
pub fn step_seconds(bpm: f64, subdivisions: u32) -> f64 {
    60.0 / clamp_bpm(bpm) / subdivisions.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixteenths_at_120_are_125ms() {
        assert_eq!(step_seconds(120.0, 4), 0.125);
    }

    #[test]
    fn interval_matches_formula_across_range() {
        for bpm in (30..=400).step_by(7) {
            for subdivisions in [1, 2, 4] {
                let expected_ms = 60000.0 / bpm as f64 / subdivisions as f64;
                let got_ms = step_seconds(bpm as f64, subdivisions) * 1000.0;
                assert!((got_ms - expected_ms).abs() < 1e-6, "bpm {bpm} sub {subdivisions}");
            }
        }
    }

    #[test]
    fn bpm_is_clamped() {
        assert_eq!(clamp_bpm(5.0), MIN_BPM);
        assert_eq!(clamp_bpm(1000.0), MAX_BPM);
        assert_eq!(clamp_bpm(f64::NAN), DEFAULT_BPM);
    }

    #[test]
    fn meter_sets_sixteenth_steps() {
        let steps: Vec<usize> = TIME_SIGNATURES.iter().map(|ts| ts.steps()).collect();
        assert_eq!(steps, vec![16, 24, 40, 20, 56, 28, 10, 14, 22, 26, 30, 17, 38, 23, 25]);
        assert_eq!(TimeSignature::new(100, 1).steps(), MAX_STEPS);
    }

    #[test]
    fn meters_cycle_and_wrap() {
        assert_eq!(TimeSignature::default().next(), TimeSignature::new(3, 2));
        assert_eq!(TimeSignature::new(25, 16).next(), TimeSignature::new(4, 4));
        assert_eq!(TimeSignature::new(6, 8).next(), TimeSignature::new(4, 4));
        assert_eq!(TimeSignature::new(7, 8).to_string(), "7/8");
    }

    #[test]
    fn meter_parsing() {
        assert_eq!(TimeSignature::parse("7/8"), Some(TimeSignature::new(7, 8)));
        assert_eq!(TimeSignature::parse(" 5 / 4 "), Some(TimeSignature::new(5, 4)));
        assert_eq!(TimeSignature::parse("7/6"), None);
        assert_eq!(TimeSignature::parse("0/4"), None);
        assert_eq!(TimeSignature::parse("seven"), None);
        assert_eq!(TimeSignature::new(3, 0).normalized(), TimeSignature::default());
    }
}
