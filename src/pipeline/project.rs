// Everything the middle layer mutates and persists: the kit, the grid and the
// transport settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio::SampleId;
use crate::audio_api::{EffectSpec, TriggerParams};
use crate::sequencer::clock::{
    clamp_bpm, TimeSignature, DEFAULT_BPM, DEFAULT_SUBDIVISIONS, MAX_STEPS, MAX_SUBDIVISIONS,
};
use crate::sequencer::fx::{Hit, CRUSH_LEVELS, DISTORTION_AMOUNT};
use crate::sequencer::patterns::{IntegerSequence, DEBRUIJN_OFFSETS};
use crate::sequencer::{Direction, SchedulerMode, StepFx, StepGrid};
use crate::shared::DEFAULT_STEPS;

pub const MIN_GAIN: f32 = 0.0;
pub const MAX_GAIN: f32 = 1.5;
pub const MIN_PITCH: f32 = 0.25;
pub const MAX_PITCH: f32 = 4.0;
pub const MIN_CUTOFF: f32 = 40.0;
pub const MAX_CUTOFF: f32 = 20000.0; // at the top the filter is bypassed
pub const MAX_MASTER_GAIN: f32 = 2.0;

// One track of the kit; TriggerParams are built from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundSlot {
    pub name: String,
    pub sample_path: String,

    // runtime only; a fresh id is minted when the sample is loaded again
    #[serde(skip)]
    pub sample_id: Option<SampleId>,

    pub trim_start: usize,
    pub length: usize, // 0 = to the end
    pub gain: f32,
    pub pitch: f32,
    pub pan: f32,
    pub filter_cutoff: f32,
    pub debruijn_offset: usize,
    pub number_sequence: usize, // index into IntegerSequence::ALL
}

impl Default for SoundSlot {
    fn default() -> Self {
        Self {
            name: String::new(),
            sample_path: String::new(),
            sample_id: None,
            trim_start: 0,
            length: 0,
            gain: 0.8,
            pitch: 1.0,
            pan: 0.0,
            filter_cutoff: MAX_CUTOFF,
            debruijn_offset: 0,
            number_sequence: 0,
        }
    }
}

impl SoundSlot {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            sample_path: path.to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.sample_id.is_some()
    }

    pub fn adjust_gain(&mut self, delta: f32) {
        self.gain = (self.gain + delta).clamp(MIN_GAIN, MAX_GAIN);
    }

    pub fn adjust_pitch(&mut self, delta: f32) {
        self.pitch = (self.pitch + delta).clamp(MIN_PITCH, MAX_PITCH);
    }

    pub fn adjust_pan(&mut self, delta: f32) {
        self.pan = (self.pan + delta).clamp(-1.0, 1.0);
    }

    // exponential so the knob feels even across the audible range
    pub fn adjust_cutoff(&mut self, delta: f32) {
        let cutoff = self.filter_cutoff * 2f32.powf(delta * 10.0);
        self.filter_cutoff = cutoff.clamp(MIN_CUTOFF, MAX_CUTOFF);
    }

    // pull hand-edited values back into the ranges the knobs produce
    fn clamp_params(&mut self) {
        self.gain = finite_or(self.gain, 0.8).clamp(MIN_GAIN, MAX_GAIN);
        self.pitch = finite_or(self.pitch, 1.0).clamp(MIN_PITCH, MAX_PITCH);
        self.pan = finite_or(self.pan, 0.0).clamp(-1.0, 1.0);
        self.filter_cutoff =
            finite_or(self.filter_cutoff, MAX_CUTOFF).clamp(MIN_CUTOFF, MAX_CUTOFF);
        self.debruijn_offset %= DEBRUIJN_OFFSETS;
        self.number_sequence %= IntegerSequence::ALL.len();
    }

    /// Trigger for one hit of this slot, or None when no buffer is loaded.
    pub fn trigger(&self, start_time: Option<f64>, hit: &Hit) -> Option<TriggerParams> {
        let sample_id = self.sample_id?;
        let mut effect_chain = Vec::new();
        if hit.distort {
            effect_chain.push(EffectSpec::Distortion { amount: DISTORTION_AMOUNT });
        }
        if hit.crush {
            effect_chain.push(EffectSpec::Bitcrusher { levels: CRUSH_LEVELS });
        }
        if self.filter_cutoff < MAX_CUTOFF {
            effect_chain.push(EffectSpec::LowPass { cutoff: self.filter_cutoff });
        }
        Some(TriggerParams {
            sample_id,
            trim_start: self.trim_start,
            length: self.length,
            gain: self.gain,
            pitch: self.pitch,
            pan: hit.pan.unwrap_or(self.pan),
            start_time,
            effect_chain,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectState {
    pub sounds: Vec<SoundSlot>,
    pub grid: StepGrid,
    pub bpm: f64,
    pub subdivisions: u32,
    pub direction: Direction,
    pub time_signature: TimeSignature,
    pub mode: SchedulerMode,
    pub fx: StepFx,
    pub master_gain: f32,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            sounds: Vec::new(),
            grid: StepGrid::new(0, DEFAULT_STEPS),
            bpm: DEFAULT_BPM,
            subdivisions: DEFAULT_SUBDIVISIONS,
            direction: Direction::Forward,
            time_signature: TimeSignature::default(),
            mode: SchedulerMode::Interval,
            fx: StepFx::default(),
            master_gain: 1.0,
        }
    }
}

impl ProjectState {
    pub fn track_names(&self) -> Vec<String> {
        self.sounds.iter().map(|s| s.name.clone()).collect()
    }

    /// Rebuild the kit from `paths`. A slot whose file is still there keeps
    /// its parameters and its grid row; new files get a fresh slot. Returns
    /// the engine ids of loaded slots whose file is gone.
    pub fn sync_kit(&mut self, paths: &[PathBuf]) -> Vec<SampleId> {
        let saved = std::mem::take(&mut self.sounds);
        let steps = self.grid.steps();
        let old_grid = std::mem::replace(&mut self.grid, StepGrid::new(0, steps));
        for path in paths {
            let key = path.to_string_lossy();
            let track = self.grid.add_track();
            match saved.iter().position(|s| s.sample_path == key) {
                Some(old) => {
                    self.sounds.push(saved[old].clone());
                    for step in 0..steps {
                        if let Some(cell) = old_grid.cell(old, step) {
                            self.grid.set_active(track, step, cell.active);
                            self.grid.set_probability(track, step, cell.probability);
                        }
                    }
                }
                None => self.sounds.push(SoundSlot::from_path(path)),
            }
        }
        saved
            .iter()
            .filter(|old| !self.sounds.iter().any(|s| s.sample_path == old.sample_path))
            .filter_map(|old| old.sample_id)
            .collect()
    }

    /// Repair a loaded project: one grid row of `1..=MAX_STEPS` cells per
    /// sound slot, and every setting back inside the range the UI allows.
    pub fn normalize(&mut self) {
        self.bpm = clamp_bpm(self.bpm);
        self.subdivisions = self.subdivisions.clamp(1, MAX_SUBDIVISIONS);
        self.mode = self.mode.clamped();
        self.time_signature = self.time_signature.normalized();
        self.master_gain = finite_or(self.master_gain, 1.0).clamp(0.0, MAX_MASTER_GAIN);
        self.grid.resize_steps(self.grid.steps().clamp(1, MAX_STEPS));
        self.grid.set_tracks(self.sounds.len());
        for slot in &mut self.sounds {
            slot.clamp_params();
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unloaded_slot_has_no_trigger() {
        let slot = SoundSlot::default();
        assert!(!slot.is_loaded());
        assert_eq!(slot.trigger(None, &Hit::default()), None);
    }

    #[test]
    fn trigger_carries_slot_params_and_overrides() {
        let slot = SoundSlot {
            sample_id: Some(SampleId(3)),
            gain: 0.5,
            pan: 0.25,
            filter_cutoff: 800.0,
            ..SoundSlot::default()
        };
        let hit = Hit { pan: Some(-1.0), distort: true, crush: true, ..Hit::default() };
        let t = slot.trigger(Some(1.5), &hit).unwrap();
        assert_eq!(t.sample_id, SampleId(3));
        assert_eq!(t.gain, 0.5);
        assert_eq!(t.pan, -1.0);
        assert_eq!(t.start_time, Some(1.5));
        assert_eq!(
            t.effect_chain,
            vec![
                EffectSpec::Distortion { amount: DISTORTION_AMOUNT },
                EffectSpec::Bitcrusher { levels: CRUSH_LEVELS },
                EffectSpec::LowPass { cutoff: 800.0 }
            ]
        );
        assert_eq!(slot.trigger(None, &Hit::default()).unwrap().pan, 0.25);
    }

    #[test]
    fn params_stay_in_range() {
        let mut slot = SoundSlot::default();
        slot.adjust_gain(10.0);
        slot.adjust_pitch(-10.0);
        slot.adjust_pan(3.0);
        slot.adjust_cutoff(-5.0);
        assert_eq!(slot.gain, MAX_GAIN);
        assert_eq!(slot.pitch, MIN_PITCH);
        assert_eq!(slot.pan, 1.0);
        assert_eq!(slot.filter_cutoff, MIN_CUTOFF);
        slot.adjust_cutoff(5.0);
        assert_eq!(slot.filter_cutoff, MAX_CUTOFF);
    }

    #[test]
    fn slot_name_comes_from_file_stem() {
        let slot = SoundSlot::from_path(Path::new("/kits/808/Kick Hard.wav"));
        assert_eq!(slot.name, "Kick Hard");
        assert_eq!(slot.sample_path, "/kits/808/Kick Hard.wav");
    }

    #[test]
    fn sync_kit_keeps_surviving_tracks() {
        let mut state = ProjectState {
            sounds: vec![
                SoundSlot::from_path(Path::new("a.wav")),
                SoundSlot::from_path(Path::new("b.wav")),
            ],
            ..ProjectState::default()
        };
        state.normalize();
        state.sounds[0].sample_id = Some(SampleId(7));
        state.sounds[1].gain = 0.3;
        state.grid.toggle(1, 2);
        state.grid.set_probability(1, 2, 60);

        let dropped = state.sync_kit(&[PathBuf::from("b.wav"), PathBuf::from("c.wav")]);

        assert_eq!(dropped, vec![SampleId(7)]);
        assert_eq!(state.track_names(), vec!["b", "c"]);
        assert_eq!(state.sounds[0].gain, 0.3);
        let kept = crate::sequencer::Cell { active: true, probability: 60 };
        assert_eq!(state.grid.cell(0, 2), Some(kept));
        assert_eq!(state.grid.row(1), vec![false; DEFAULT_STEPS]);
    }

    #[test]
    fn normalize_matches_grid_to_kit() {
        let mut state = ProjectState {
            sounds: vec![SoundSlot::default(); 3],
            ..ProjectState::default()
        };
        state.normalize();
        assert_eq!(state.grid.tracks(), 3);
        assert_eq!(state.grid.steps(), DEFAULT_STEPS);
    }

    #[test]
    fn normalize_pulls_settings_back_into_range() {
        let mut state = ProjectState {
            sounds: vec![SoundSlot {
                gain: 9.0,
                pitch: f32::NAN,
                pan: -4.0,
                filter_cutoff: 1.0,
                debruijn_offset: 300,
                ..SoundSlot::default()
            }],
            grid: StepGrid::new(1, 500),
            bpm: 5.0,
            subdivisions: 0,
            mode: SchedulerMode::Lookahead { schedule_ahead: 1000.0 },
            master_gain: -1.0,
            ..ProjectState::default()
        };
        state.normalize();
        assert_eq!(state.bpm, 30.0);
        assert_eq!(state.subdivisions, 1);
        assert_eq!(state.mode, SchedulerMode::Lookahead { schedule_ahead: 1.0 });
        assert_eq!(state.master_gain, 0.0);
        assert_eq!(state.grid.steps(), MAX_STEPS);
        assert_eq!(state.grid.row(0).len(), MAX_STEPS);
        let slot = &state.sounds[0];
        assert_eq!((slot.gain, slot.pitch, slot.pan), (MAX_GAIN, 1.0, -1.0));
        assert_eq!(slot.filter_cutoff, MIN_CUTOFF);
        assert_eq!(slot.debruijn_offset, 300 - DEBRUIJN_OFFSETS);
    }
}
