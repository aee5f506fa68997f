use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use log::LevelFilter;

use crate::pipeline::persistence::state_dir;
use crate::pipeline::project::ProjectState;
use crate::sequencer::clock::{clamp_bpm, TimeSignature, MAX_STEPS};
use crate::sequencer::patterns::parse_phonetic;
use crate::sequencer::scheduler::DEFAULT_SCHEDULE_AHEAD;
use crate::sequencer::SchedulerMode;

const LOG_ENV: &str = "DRUMTOYS_LOG";
const LOG_FILE: &str = "drumtoys.log";

pub const USAGE: &str = "usage: drumtoys [PROJECT_DIR] [--steps N] [--meter B/U] [--bpm N] \
                         [--lookahead] [--pattern TEXT] [--log FILE] [--verbose]";

// Command line settings. Anything left as None keeps the saved project's value.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub project_dir: PathBuf,
    pub steps: Option<usize>,
    pub meter: Option<TimeSignature>,
    pub bpm: Option<f64>,
    pub lookahead: bool,
    pub pattern: Option<String>,
    pub log_file: Option<PathBuf>,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_args(std::env::args().skip(1), std::env::var(LOG_ENV).ok())
    }

    // `args` excludes the program name. `env_level` is the value of DRUMTOYS_LOG.
    pub fn from_args<I>(args: I, env_level: Option<String>) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut project_dir = None;
        let mut steps = None;
        let mut meter = None;
        let mut bpm = None;
        let mut lookahead = false;
        let mut pattern = None;
        let mut log_file = None;
        let mut verbose = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--steps" => {
                    let n: usize = parse_value(&arg, args.next())?;
                    if !(1..=MAX_STEPS).contains(&n) {
                        bail!("--steps must be between 1 and {MAX_STEPS}, got {n}");
                    }
                    steps = Some(n);
                }
                "--meter" => {
                    let text = args.next().ok_or_else(|| anyhow!("--meter needs a value"))?;
                    let ts = TimeSignature::parse(&text)
                        .ok_or_else(|| anyhow!("invalid meter '{text}', expected e.g. 7/8"))?;
                    meter = Some(ts);
                }
                "--bpm" => {
                    let b: f64 = parse_value(&arg, args.next())?;
                    if !b.is_finite() {
                        bail!("--bpm must be a number");
                    }
                    bpm = Some(clamp_bpm(b));
                }
                "--lookahead" => lookahead = true,
                "--pattern" => {
                    pattern = Some(args.next().ok_or_else(|| anyhow!("--pattern needs a value"))?);
                }
                "--log" => {
                    let file = args.next().ok_or_else(|| anyhow!("--log needs a value"))?;
                    log_file = Some(PathBuf::from(file));
                }
                "--verbose" | "-v" => verbose = true,
                flag if flag.starts_with('-') => bail!("unknown option '{flag}'\n{USAGE}"),
                dir => {
                    if project_dir.is_some() {
                        bail!("unexpected argument '{dir}'\n{USAGE}");
                    }
                    project_dir = Some(PathBuf::from(dir));
                }
            }
        }

        let mut log_level = match env_level.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => LevelFilter::from_str(s)
                .with_context(|| format!("invalid {LOG_ENV} level '{s}'"))?,
            None => LevelFilter::Info,
        };
        if verbose {
            log_level = log_level.max(LevelFilter::Debug);
        }

        let project_dir = match project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("no current directory")?,
        };

        Ok(Self { project_dir, steps, meter, bpm, lookahead, pattern, log_file, log_level })
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| state_dir(&self.project_dir).join(LOG_FILE))
    }

    /// Explicit flags override whatever was loaded from disk. `--steps` wins
    /// over the length of `--meter`. A pattern replaces the grid and, without
    /// either, sets the loop length; otherwise a new length rescales the grid.
    pub fn apply(&self, state: &mut ProjectState) {
        if let Some(bpm) = self.bpm {
            state.bpm = bpm;
        }
        if self.lookahead {
            state.mode = SchedulerMode::Lookahead { schedule_ahead: DEFAULT_SCHEDULE_AHEAD };
        }
        if let Some(meter) = self.meter {
            state.time_signature = meter;
        }
        let loop_steps = self.steps.or(self.meter.map(TimeSignature::steps));
        if let Some(text) = &self.pattern {
            let hits = parse_phonetic(text, &state.track_names());
            let steps = loop_steps.unwrap_or(hits.len().clamp(1, MAX_STEPS));
            state.grid.resize_steps(steps);
            for track in 0..state.grid.tracks() {
                state.grid.clear_track(track);
            }
            for (step, hit) in hits.iter().enumerate().take(steps) {
                if let Some(track) = *hit {
                    state.grid.set_active(track, step, true);
                }
            }
            log::info!("pattern '{text}' written over {steps} steps");
        } else if let Some(steps) = loop_steps {
            state.grid.rescale_steps(steps);
        }
    }
}

fn parse_value<T>(flag: &str, value: Option<String>) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.ok_or_else(|| anyhow!("{flag} needs a value"))?;
    value
        .parse()
        .with_context(|| format!("invalid value '{value}' for {flag}"))
}
