// The middle layer owns all sequencer state. The TUI feeds it InputEvents and
// draws whatever display_state() returns; the audio thread only ever sees the
// AudioCommands it produces.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::audio_api::AudioCommand;
use crate::pipeline::project::ProjectState;
use crate::sequencer::clock::clamp_bpm;
use crate::sequencer::fx::{roll, Hit};
use crate::sequencer::patterns::{
    binary_row, debruijn_row, random_row, row_value, sequence_row, IntegerSequence,
    DEBRUIJN_OFFSETS,
};
use crate::sequencer::scheduler::{Tick, DUE_EPSILON};
use crate::sequencer::{Direction, FxKind, Scheduler, SchedulerMode};
use crate::shared::{DisplayState, FxView, InputEvent, ParamPage, TrackView};

const RANDOM_DENSITY: f64 = 0.3;

pub struct Middle {
    pub state: ProjectState,
    scheduler: Scheduler,
    rng: Xoshiro256PlusPlus,
    cursor: (usize, usize), // (track, step)
    param_page: ParamPage,
    scheduled: VecDeque<Tick>, // sent to the engine, not yet audible
    last_step: Option<usize>,
    display_text: String,
}

impl Middle {
    pub fn with_state(state: ProjectState) -> Self {
        Self::with_rng(state, Xoshiro256PlusPlus::from_rng(&mut rand::rng()))
    }

    pub fn with_rng(state: ProjectState, rng: Xoshiro256PlusPlus) -> Self {
        let mut scheduler = Scheduler::new(state.grid.steps()).with_mode(state.mode);
        scheduler.set_bpm(state.bpm, 0.0);
        scheduler.set_subdivisions(state.subdivisions);
        scheduler.set_direction(state.direction);
        Self {
            state,
            scheduler,
            rng,
            cursor: (0, 0),
            param_page: ParamPage::Tone,
            scheduled: VecDeque::new(),
            last_step: None,
            display_text: String::new(),
        }
    }

    /// Commands that bring a fresh engine in line with the loaded project.
    pub fn startup_commands(&self) -> Vec<AudioCommand> {
        vec![AudioCommand::SetMasterGain(self.state.master_gain)]
    }

    pub fn set_display_text(&mut self, text: impl Into<String>) {
        self.display_text = text.into();
    }

    /// Call after `state.sounds` was re-read from disk.
    pub fn kit_reloaded(&mut self) {
        let tracks = self.state.grid.tracks();
        self.cursor.0 = self.cursor.0.min(tracks.saturating_sub(1));
        self.display_text = format!("KIT {tracks} TRACKS");
    }

    // `now` is the audio clock in seconds
    pub fn handle_input(&mut self, event: InputEvent, now: f64) -> Vec<AudioCommand> {
        let (track, step) = self.cursor;
        match event {
            InputEvent::MoveCursor { dtrack, dstep } => {
                let tracks = self.state.grid.tracks().max(1);
                let steps = self.state.grid.steps();
                self.cursor = (wrap(track, dtrack, tracks), wrap(step, dstep, steps));
            }
            InputEvent::ToggleStep => {
                self.state.grid.toggle(track, step);
            }
            InputEvent::NudgeProbability(delta) => {
                self.state.grid.nudge_probability(track, step, delta);
                if let Some(cell) = self.state.grid.cell(track, step) {
                    self.display_text = format!("PROB {}%", cell.probability);
                }
            }

            InputEvent::PlayPress => {
                if self.scheduler.is_playing() {
                    self.stop_transport();
                    self.display_text = "STOP".into();
                } else {
                    self.scheduler.start(now);
                    self.display_text = "PLAY".into();
                }
            }
            InputEvent::NudgeBpm(delta) => {
                self.state.bpm = clamp_bpm(self.state.bpm + delta);
                self.scheduler.set_bpm(self.state.bpm, now);
                self.display_text = format!("{:.0} BPM", self.state.bpm);
            }
            InputEvent::ToggleDirection => {
                self.state.direction = self.state.direction.flipped();
                self.scheduler.set_direction(self.state.direction);
            }
            InputEvent::ToggleMode => {
                self.state.mode = self.state.mode.toggled();
                self.scheduler.set_mode(self.state.mode, now);
                self.display_text = self.state.mode.label().into();
            }
            InputEvent::CycleTimeSignature => {
                let meter = self.state.time_signature.next();
                self.state.time_signature = meter;
                self.set_loop_steps(meter.steps());
                self.display_text = format!("{meter} ({} STEPS)", meter.steps());
            }
            InputEvent::NextParamPage => {
                self.param_page = self.param_page.next();
            }

            InputEvent::AuditionTrack => {
                return self
                    .state
                    .sounds
                    .get(track)
                    .and_then(|slot| slot.trigger(None, &Hit::default()))
                    .map(AudioCommand::Trigger)
                    .into_iter()
                    .collect();
            }
            InputEvent::ClearTrack => {
                self.state.grid.clear_track(track);
            }
            InputEvent::RandomizeTrack => {
                let row = random_row(&mut self.rng, self.state.grid.steps(), RANDOM_DENSITY);
                self.state.grid.set_row(track, &row);
            }
            InputEvent::DeBruijn(delta) => {
                if let Some(slot) = self.state.sounds.get_mut(track) {
                    let offset = wrap(slot.debruijn_offset, delta, DEBRUIJN_OFFSETS);
                    slot.debruijn_offset = offset;
                    let row = debruijn_row(offset, self.state.grid.steps());
                    self.state.grid.set_row(track, &row);
                    self.display_text = format!("DEBRUIJN {offset}");
                }
            }
            InputEvent::BinaryCount(delta) => {
                let width = self.state.grid.steps();
                let modulus = 1i64 << width.min(32);
                let value = row_value(&self.state.grid.row(track)) as i64 + delta as i64;
                let value = value.rem_euclid(modulus);
                self.state.grid.set_row(track, &binary_row(value as u32, width));
                self.display_text = format!("BIN {value}");
            }
            InputEvent::NumberSequence(delta) => {
                if let Some(slot) = self.state.sounds.get_mut(track) {
                    let index = wrap(slot.number_sequence, delta, IntegerSequence::ALL.len());
                    slot.number_sequence = index;
                    let sequence = IntegerSequence::ALL[index];
                    let row = sequence_row(sequence, self.state.grid.steps());
                    self.state.grid.set_row(track, &row);
                    self.display_text = sequence.label().into();
                }
            }

            InputEvent::ToggleFx(kind) => {
                self.state.fx.toggle(kind);
            }
            InputEvent::CycleFxProbability(kind) => {
                self.state.fx.cycle_probability(kind);
                let probability = self.state.fx.get(kind).probability;
                self.display_text = format!("{} {probability}%", kind.label());
            }
            InputEvent::Panic => {
                self.stop_transport();
                self.display_text = "ALL SOUND OFF".into();
                return vec![AudioCommand::StopAll];
            }

            InputEvent::AdjustPitch(delta) => {
                if let Some(slot) = self.state.sounds.get_mut(track) {
                    slot.adjust_pitch(delta);
                }
            }
            InputEvent::AdjustGain(delta) => {
                if let Some(slot) = self.state.sounds.get_mut(track) {
                    slot.adjust_gain(delta);
                }
            }
            InputEvent::AdjustPan(delta) => {
                if let Some(slot) = self.state.sounds.get_mut(track) {
                    slot.adjust_pan(delta);
                }
            }
            InputEvent::AdjustCutoff(delta) => {
                if let Some(slot) = self.state.sounds.get_mut(track) {
                    slot.adjust_cutoff(delta);
                }
            }

            // handled by the main loop, which knows the project dir
            InputEvent::Save | InputEvent::ReloadKit | InputEvent::Quit => {}
        }
        vec![]
    }

    /// Poll the scheduler against the audio clock and turn every fired step
    /// into triggers. Steps whose track has no loaded sample are skipped.
    pub fn tick(&mut self, now: f64) -> Vec<AudioCommand> {
        let ticks = self.scheduler.poll(now);
        let step_seconds = self.scheduler.step_seconds();
        let lookahead = matches!(self.scheduler.mode(), SchedulerMode::Lookahead { .. });

        let mut cmds = Vec::new();
        for tick in ticks {
            self.scheduled.push_back(tick);
            let fired: Vec<_> = self.state.grid.active_tracks_at(tick.step).collect();
            for (track, cell) in fired {
                if !roll(&mut self.rng, cell.probability) {
                    continue;
                }
                let Some(slot) = self.state.sounds.get(track).filter(|s| s.is_loaded()) else {
                    continue;
                };
                for hit in self.state.fx.expand(&mut self.rng, step_seconds) {
                    let start_time = if lookahead {
                        Some(tick.time + hit.offset)
                    } else if hit.offset > 0.0 {
                        Some(now + hit.offset)
                    } else {
                        None
                    };
                    if let Some(params) = slot.trigger(start_time, &hit) {
                        cmds.push(AudioCommand::Trigger(params));
                    }
                }
            }
        }

        // the playhead shows the last step whose time has come
        while let Some(due) =
            self.scheduled.front().copied().filter(|t| t.time < now + DUE_EPSILON)
        {
            self.last_step = Some(due.step);
            self.scheduled.pop_front();
        }
        cmds
    }

    fn stop_transport(&mut self) {
        self.scheduler.stop();
        self.scheduled.clear();
        self.last_step = None;
    }

    fn set_loop_steps(&mut self, steps: usize) {
        self.state.grid.rescale_steps(steps);
        self.scheduler.set_steps(steps);
        self.cursor.1 = self.cursor.1.min(steps.saturating_sub(1));
        self.scheduled.retain(|t| t.step < steps);
        self.last_step = self.last_step.filter(|&s| s < steps);
    }

    pub fn display_state(&self) -> DisplayState {
        let slot = self.state.sounds.get(self.cursor.0);
        let (knob_a_label, knob_b_label) = self.param_page.knob_labels();
        let (knob_a_value, knob_b_value) = match (self.param_page, slot) {
            (ParamPage::Tone, Some(s)) => (s.pitch, s.gain),
            (ParamPage::Mix, Some(s)) => (s.pan, s.filter_cutoff),
            (_, None) => (0.0, 0.0),
        };
        let tracks = self
            .state
            .sounds
            .iter()
            .enumerate()
            .map(|(t, s)| TrackView {
                name: s.name.clone(),
                loaded: s.is_loaded(),
                cells: (0..self.state.grid.steps())
                    .map(|i| self.state.grid.cell(t, i).unwrap_or_default())
                    .collect(),
            })
            .collect();
        let fx = FxKind::ALL
            .iter()
            .map(|&kind| {
                let s = self.state.fx.get(kind);
                FxView { kind, active: s.active, probability: s.probability }
            })
            .collect();

        let meter = self.state.time_signature;
        DisplayState {
            tracks,
            steps: self.state.grid.steps(),
            time_signature: (meter.steps() == self.state.grid.steps()).then_some(meter),
            cursor: self.cursor,
            playing_step: self.last_step,
            playing: self.scheduler.is_playing(),
            bpm: self.state.bpm,
            mode_label: self.state.mode.label(),
            reverse: self.state.direction == Direction::Reverse,
            param_page: self.param_page,
            knob_a_label,
            knob_b_label,
            knob_a_value,
            knob_b_value,
            fx,
            display_text: self.display_text.clone(),
        }
    }
}

fn wrap(pos: usize, delta: i32, len: usize) -> usize {
    (pos as i64 + delta as i64).rem_euclid(len.max(1) as i64) as usize
}
