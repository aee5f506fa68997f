use serde::{Deserialize, Serialize};

use super::clock::{clamp_bpm, step_seconds, DEFAULT_BPM, DEFAULT_SUBDIVISIONS};

// a deadline this close to `now` counts as due
pub const DUE_EPSILON: f64 = 1e-9;

pub const DEFAULT_SCHEDULE_AHEAD: f64 = 0.1;
pub const MIN_SCHEDULE_AHEAD: f64 = 0.005;
pub const MAX_SCHEDULE_AHEAD: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SchedulerMode {
    /// Ticks fire when due and their sounds start immediately.
    Interval,
    /// Ticks are emitted up to `schedule_ahead` seconds early with their exact
    /// due time, for the engine to start sample-accurately.
    Lookahead { schedule_ahead: f64 },
}

impl SchedulerMode {
    pub fn label(self) -> &'static str {
        match self {
            SchedulerMode::Interval => "INTERVAL",
            SchedulerMode::Lookahead { .. } => "LOOKAHEAD",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SchedulerMode::Interval => SchedulerMode::Lookahead {
                schedule_ahead: DEFAULT_SCHEDULE_AHEAD,
            },
            SchedulerMode::Lookahead { .. } => SchedulerMode::Interval,
        }
    }

    /// The same mode with `schedule_ahead` pulled into
    /// `MIN_SCHEDULE_AHEAD..=MAX_SCHEDULE_AHEAD`.
    pub fn clamped(self) -> Self {
        match self {
            SchedulerMode::Interval => SchedulerMode::Interval,
            SchedulerMode::Lookahead { schedule_ahead } if schedule_ahead.is_finite() => {
                SchedulerMode::Lookahead {
                    schedule_ahead: schedule_ahead.clamp(MIN_SCHEDULE_AHEAD, MAX_SCHEDULE_AHEAD),
                }
            }
            SchedulerMode::Lookahead { .. } => SchedulerMode::Lookahead {
                schedule_ahead: DEFAULT_SCHEDULE_AHEAD,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// One scheduler tick: which step to play and when (audio-clock seconds).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub step: usize,
    pub time: f64,
}

/// The playback state of one sequencer. `start` and `stop` are the only
/// transport mutators, and there is exactly one pending deadline, so a tempo
/// change can never leave a second timer running.
#[derive(Clone, Debug)]
pub struct Scheduler {
    steps: usize,
    bpm: f64,
    subdivisions: u32,
    mode: SchedulerMode,
    direction: Direction,
    current_step: usize,
    next_tick: Option<f64>, // None while stopped
    ticks: u64,
}

impl Scheduler {
    pub fn new(steps: usize) -> Self {
        Self {
            steps: steps.max(1),
            bpm: DEFAULT_BPM,
            subdivisions: DEFAULT_SUBDIVISIONS,
            mode: SchedulerMode::Interval,
            direction: Direction::Forward,
            current_step: 0,
            next_tick: None,
            ticks: 0,
        }
    }

    pub fn with_mode(mut self, mode: SchedulerMode) -> Self {
        self.mode = mode.clamped();
        self
    }

    pub fn is_playing(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Next step to be played. Always in `0..steps`.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn mode(&self) -> SchedulerMode {
        self.mode
    }

    pub fn step_seconds(&self) -> f64 {
        step_seconds(self.bpm, self.subdivisions)
    }

    pub fn start(&mut self, now: f64) {
        if self.is_playing() {
            return;
        }
        self.current_step = self.first_step();
        self.ticks = 0;
        let first = match self.mode {
            SchedulerMode::Interval => now + self.step_seconds(),
            SchedulerMode::Lookahead { .. } => now,
        };
        self.next_tick = Some(first);
        log::debug!("scheduler started at {:.3}s ({} mode)", now, self.mode.label());
    }

    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            log::debug!("scheduler stopped after {} ticks", self.ticks);
        }
    }

    pub fn set_bpm(&mut self, bpm: f64, now: f64) {
        self.bpm = clamp_bpm(bpm);
        if let (Some(_), SchedulerMode::Interval) = (self.next_tick, self.mode) {
            // cancel and re-arm, like clearing and re-creating the interval
            self.next_tick = Some(now + self.step_seconds());
        }
    }

    pub fn set_subdivisions(&mut self, subdivisions: u32) {
        self.subdivisions = subdivisions.max(1);
    }

    pub fn set_steps(&mut self, steps: usize) {
        self.steps = steps.max(1);
        self.current_step %= self.steps;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Switching mode while playing restarts the transport in the new mode.
    pub fn set_mode(&mut self, mode: SchedulerMode, now: f64) {
        let was_playing = self.is_playing();
        self.stop();
        self.mode = mode.clamped();
        if was_playing {
            self.start(now);
        }
    }

    /// Emit every tick that is due at `now` (interval mode) or inside the
    /// scheduling horizon (lookahead mode), advancing the step index once per
    /// tick. Deadlines accumulate from the previous one, so polling jitter
    /// never turns into tempo drift. One poll never emits more than `steps`
    /// ticks.
    pub fn poll(&mut self, now: f64) -> Vec<Tick> {
        let mut out = Vec::new();
        let Some(mut next) = self.next_tick else {
            return out;
        };
        let interval = self.step_seconds();
        let loop_seconds = interval * self.steps as f64;
        let horizon = match self.mode {
            SchedulerMode::Interval => now + DUE_EPSILON,
            // never look further ahead than one loop
            SchedulerMode::Lookahead { schedule_ahead } => {
                now + schedule_ahead.min(loop_seconds).max(0.0)
            }
        };

        // more than a whole loop behind: resync instead of bursting
        if horizon - next > loop_seconds {
            log::debug!("scheduler fell {:.3}s behind, resyncing", horizon - next);
            next = now;
        }

        while next < horizon && out.len() < self.steps {
            out.push(Tick { step: self.current_step, time: next });
            self.advance();
            next += interval;
        }
        self.next_tick = Some(next);
        out
    }

    fn first_step(&self) -> usize {
        match self.direction {
            Direction::Forward => 0,
            Direction::Reverse => self.steps - 1,
        }
    }

    fn advance(&mut self) {
        self.ticks += 1;
        self.current_step = match self.direction {
            Direction::Forward => (self.current_step + 1) % self.steps,
            Direction::Reverse => (self.current_step + self.steps - 1) % self.steps,
        };
    }
}
