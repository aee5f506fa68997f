mod audio;
mod audio_api;
mod config;
mod loader;
mod middle;
mod pipeline;
mod sequencer;
mod shared;
mod tui;

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use audio::{AudioHandle, SampleId};
use audio_api::AudioCommand;
use config::Config;
use loader::sample_loader;
use middle::Middle;
use pipeline::persistence;
use pipeline::project::ProjectState;
use shared::InputEvent;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_logging(&config)?;
    log::info!("starting in '{}'", config.project_dir.display());

    let audio = audio::start_audio()?;
    let sample_rate = audio.sample_rate();

    let mut state = persistence::load_project(&config.project_dir).unwrap_or_default();
    refresh_kit(&mut state, &config.project_dir);
    config.apply(&mut state);
    for cmd in sample_loader::load_kit(&mut state.sounds, sample_rate) {
        audio.send(cmd);
    }

    let mut middle = Middle::with_state(state);
    for cmd in middle.startup_commands() {
        audio.send(cmd);
    }

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope
    crossterm::execute!(std::io::stdout(), terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let ds = middle.display_state();
        tui_state.param_page = ds.param_page;

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        let events = tui::input::poll_input(tick_rate, &tui_state)?;
        for event in events {
            match event {
                InputEvent::Quit => {
                    // save before quitting
                    if let Err(e) = persistence::save_project(&config.project_dir, &middle.state)
                    {
                        log::error!("save on quit failed: {e:#}");
                    }
                    log::info!("bye");
                    return Ok(());
                }
                InputEvent::Save => {
                    match persistence::save_project(&config.project_dir, &middle.state) {
                        Ok(()) => middle.set_display_text("SAVED"),
                        Err(e) => {
                            log::error!("save failed: {e:#}");
                            middle.set_display_text("SAVE FAILED");
                        }
                    }
                }
                InputEvent::ReloadKit => reload_kit(&mut middle, &config.project_dir, &audio),
                event => {
                    for cmd in middle.handle_input(event, audio.clock_seconds()) {
                        audio.send(cmd);
                    }
                }
            }
        }

        // the audio clock is the only time base, so scheduled triggers line up
        // with what the engine has actually rendered
        for cmd in middle.tick(audio.clock_seconds()) {
            audio.send(cmd);
        }
    }
}

// the terminal belongs to the tui, so logs go to a file
fn init_logging(config: &Config) -> anyhow::Result<()> {
    let path = config.log_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create '{}'", parent.display()))?;
    }
    let file = File::create(&path)
        .with_context(|| format!("failed to open log '{}'", path.display()))?;
    let log_config = simplelog::ConfigBuilder::default().build();
    simplelog::WriteLogger::init(config.log_level, log_config, file)
        .context("failed to init logger")?;
    Ok(())
}

// re-read the kit directory: dropped files free their buffers, surviving
// and new files are (re)loaded
fn reload_kit(middle: &mut Middle, project_dir: &Path, audio: &AudioHandle) {
    let dropped = refresh_kit(&mut middle.state, project_dir);
    for id in dropped {
        audio.send(AudioCommand::UnregisterSample(id));
    }
    for cmd in sample_loader::load_kit(&mut middle.state.sounds, audio.sample_rate()) {
        audio.send(cmd);
    }
    middle.kit_reloaded();
}

fn refresh_kit(state: &mut ProjectState, project_dir: &Path) -> Vec<SampleId> {
    let paths = match sample_loader::index_wav_in_dir(project_dir) {
        Ok(paths) => paths,
        Err(e) => {
            log::warn!("no kit: {e:#}");
            Vec::new()
        }
    };
    if paths.len() > shared::MAX_TRACKS {
        log::warn!("only the first {} of {} samples are used", shared::MAX_TRACKS, paths.len());
    }
    let dropped = state.sync_kit(&paths[..paths.len().min(shared::MAX_TRACKS)]);
    log::info!("kit has {} tracks", state.sounds.len());
    dropped
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(std::io::stdout(), terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
