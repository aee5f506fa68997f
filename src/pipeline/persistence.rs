// Called on startup and quit; saves the project so it can be reloaded later.
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::pipeline::project::ProjectState;

pub const STATE_DIR: &str = ".drumtoys";
const PROJECT_FILE: &str = "project.json";

// <project_dir>/.drumtoys/
pub fn state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR)
}

// <project_dir>/.drumtoys/project.json
fn project_file_path(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(PROJECT_FILE)
}

/// None when there is no saved project. A file that exists but can't be
/// parsed is logged and ignored.
pub fn load_project(project_dir: &Path) -> Option<ProjectState> {
    let path = project_file_path(project_dir);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<ProjectState>(&data) {
        Ok(mut state) => {
            state.normalize();
            log::info!("loaded project from '{}'", path.display());
            Some(state)
        }
        Err(e) => {
            log::warn!("ignoring unreadable project file '{}': {e}", path.display());
            None
        }
    }
}

// Save the project state to disk, making the files if they don't exist already
pub fn save_project(project_dir: &Path, state: &ProjectState) -> anyhow::Result<()> {
    let path = project_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(&path, json).with_context(|| format!("failed to write '{}'", path.display()))?;
    log::info!("saved project to '{}'", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleId;
    use crate::pipeline::project::{SoundSlot, MAX_GAIN};
    use crate::sequencer::clock::{TimeSignature, MAX_STEPS};
    use crate::sequencer::{Direction, FxKind, SchedulerMode};
    use pretty_assertions::assert_eq;

    fn temp_project(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("drumtoys-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn save_then_load_restores_pattern_and_settings() {
        let dir = temp_project("persist");
        let mut state = ProjectState {
            sounds: vec![
                SoundSlot::from_path(Path::new("kick.wav")),
                SoundSlot::from_path(Path::new("hat.wav")),
            ],
            bpm: 97.0,
            direction: Direction::Reverse,
            mode: SchedulerMode::Lookahead { schedule_ahead: 0.1 },
            ..ProjectState::default()
        };
        state.normalize();
        state.grid.toggle(1, 5);
        state.grid.set_probability(1, 5, 40);
        state.fx.toggle(FxKind::Ratchet);
        state.sounds[0].sample_id = Some(SampleId(42));

        save_project(&dir, &state).unwrap();
        let loaded = load_project(&dir).unwrap();

        // runtime ids never hit the disk
        assert_eq!(loaded.sounds[0].sample_id, None);
        state.sounds[0].sample_id = None;
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_or_corrupt_file_loads_nothing() {
        let dir = temp_project("corrupt");
        assert_eq!(load_project(&dir), None);
        std::fs::create_dir_all(state_dir(&dir)).unwrap();
        std::fs::write(project_file_path(&dir), "{ not json").unwrap();
        assert_eq!(load_project(&dir), None);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = temp_project("partial");
        std::fs::create_dir_all(state_dir(&dir)).unwrap();
        std::fs::write(project_file_path(&dir), r#"{ "bpm": 140.0 }"#).unwrap();
        let loaded = load_project(&dir).unwrap();
        assert_eq!(loaded.bpm, 140.0);
        assert_eq!(loaded.grid.steps(), crate::shared::DEFAULT_STEPS);
        assert!(loaded.sounds.is_empty());
    }

    #[test]
    fn out_of_range_values_are_clamped_on_load() {
        let dir = temp_project("range");
        std::fs::create_dir_all(state_dir(&dir)).unwrap();
        let json = r#"{
            "bpm": 5.0,
            "subdivisions": 0,
            "mode": { "Lookahead": { "schedule_ahead": 1000.0 } },
            "time_signature": { "beats": 7, "unit": 6 },
            "grid": { "steps": 1000, "rows": [] },
            "sounds": [{ "name": "kick", "gain": 40.0 }]
        }"#;
        std::fs::write(project_file_path(&dir), json).unwrap();
        let loaded = load_project(&dir).unwrap();
        assert_eq!(loaded.bpm, 30.0);
        assert_eq!(loaded.subdivisions, 1);
        assert_eq!(loaded.mode, SchedulerMode::Lookahead { schedule_ahead: 1.0 });
        assert_eq!(loaded.time_signature, TimeSignature::new(4, 4));
        assert_eq!(loaded.grid.steps(), MAX_STEPS);
        assert_eq!(loaded.grid.row(0), vec![false; MAX_STEPS]);
        assert_eq!(loaded.sounds[0].gain, MAX_GAIN);
    }
}
