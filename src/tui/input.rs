use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use super::mode::TuiState;
use crate::sequencer::FxKind;
use crate::shared::{InputEvent, ParamPage};

const KNOB_STEP: f32 = 0.05;
const BPM_STEP: f64 = 1.0;
const PROBABILITY_STEP: i16 = 10;

// poll for input from the terminal and resolve key presses into
// semantic input events for the middle layer
pub fn poll_input(timeout: Duration, ts: &TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, ts: &TuiState) -> Vec<InputEvent> {
    let event = match code {
        KeyCode::Esc | KeyCode::Char('q') => InputEvent::Quit,
        KeyCode::Char(' ') => InputEvent::PlayPress,

        // cursor
        KeyCode::Up | KeyCode::Char('k') => InputEvent::MoveCursor { dtrack: -1, dstep: 0 },
        KeyCode::Down | KeyCode::Char('j') => InputEvent::MoveCursor { dtrack: 1, dstep: 0 },
        KeyCode::Left | KeyCode::Char('h') => InputEvent::MoveCursor { dtrack: 0, dstep: -1 },
        KeyCode::Right | KeyCode::Char('l') => InputEvent::MoveCursor { dtrack: 0, dstep: 1 },
        KeyCode::Enter | KeyCode::Char('x') => InputEvent::ToggleStep,
        KeyCode::Char('p') => InputEvent::NudgeProbability(-PROBABILITY_STEP),
        KeyCode::Char('P') => InputEvent::NudgeProbability(PROBABILITY_STEP),

        // transport
        KeyCode::Char(',') => InputEvent::NudgeBpm(-BPM_STEP),
        KeyCode::Char('.') => InputEvent::NudgeBpm(BPM_STEP),
        KeyCode::Char('v') => InputEvent::ToggleDirection,
        KeyCode::Char('m') => InputEvent::ToggleMode,
        KeyCode::Char('t') => InputEvent::CycleTimeSignature,
        KeyCode::Backspace => InputEvent::Panic,
        KeyCode::Tab => InputEvent::NextParamPage,

        // track tools
        KeyCode::Char('a') => InputEvent::AuditionTrack,
        KeyCode::Char('c') => InputEvent::ClearTrack,
        KeyCode::Char('r') => InputEvent::RandomizeTrack,
        KeyCode::Char('d') => InputEvent::DeBruijn(1),
        KeyCode::Char('D') => InputEvent::DeBruijn(-1),
        KeyCode::Char('n') => InputEvent::BinaryCount(1),
        KeyCode::Char('N') => InputEvent::BinaryCount(-1),
        KeyCode::Char('i') => InputEvent::NumberSequence(1),
        KeyCode::Char('I') => InputEvent::NumberSequence(-1),

        // step fx, digit toggles and its shifted symbol re-weights
        KeyCode::Char(c @ '1'..='5') => InputEvent::ToggleFx(fx_for(c)),
        KeyCode::Char(c @ ('!' | '@' | '#' | '$' | '%')) => {
            InputEvent::CycleFxProbability(fx_for(c))
        }

        // knobs
        KeyCode::Char('[') => resolve_knob_a(-KNOB_STEP, ts),
        KeyCode::Char(']') => resolve_knob_a(KNOB_STEP, ts),
        KeyCode::Char('-') => resolve_knob_b(-KNOB_STEP, ts),
        KeyCode::Char('=') => resolve_knob_b(KNOB_STEP, ts),

        KeyCode::Char('R') => InputEvent::ReloadKit,
        KeyCode::Char('s') => InputEvent::Save,
        _ => return vec![],
    };
    vec![event]
}

// knob a: pitch on the tone page, pan on the mix page
fn resolve_knob_a(delta: f32, ts: &TuiState) -> InputEvent {
    match ts.param_page {
        ParamPage::Tone => InputEvent::AdjustPitch(delta),
        ParamPage::Mix => InputEvent::AdjustPan(delta),
    }
}

// knob b: gain on the tone page, cutoff on the mix page
fn resolve_knob_b(delta: f32, ts: &TuiState) -> InputEvent {
    match ts.param_page {
        ParamPage::Tone => InputEvent::AdjustGain(delta),
        ParamPage::Mix => InputEvent::AdjustCutoff(delta),
    }
}

fn fx_for(c: char) -> FxKind {
    match c {
        '1' | '!' => FxKind::Autopan,
        '2' | '@' => FxKind::Distortion,
        '3' | '#' => FxKind::Crush,
        '4' | '$' => FxKind::Stutter,
        _ => FxKind::Ratchet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knobs_resolve_by_page() {
        let mut ts = TuiState::default();
        assert_eq!(handle_key(KeyCode::Char(']'), &ts), vec![InputEvent::AdjustPitch(0.05)]);
        assert_eq!(handle_key(KeyCode::Char('-'), &ts), vec![InputEvent::AdjustGain(-0.05)]);
        ts.param_page = ParamPage::Mix;
        assert_eq!(handle_key(KeyCode::Char('['), &ts), vec![InputEvent::AdjustPan(-0.05)]);
        assert_eq!(handle_key(KeyCode::Char('='), &ts), vec![InputEvent::AdjustCutoff(0.05)]);
    }

    #[test]
    fn fx_keys() {
        let ts = TuiState::default();
        let key = |c| handle_key(KeyCode::Char(c), &ts);
        assert_eq!(key('3'), vec![InputEvent::ToggleFx(FxKind::Crush)]);
        assert_eq!(key('4'), vec![InputEvent::ToggleFx(FxKind::Stutter)]);
        assert_eq!(key('%'), vec![InputEvent::CycleFxProbability(FxKind::Ratchet)]);
        assert!(key('6').is_empty());
    }

    #[test]
    fn cursor_and_unbound_keys() {
        let ts = TuiState::default();
        let left = InputEvent::MoveCursor { dtrack: 0, dstep: -1 };
        assert_eq!(handle_key(KeyCode::Left, &ts), vec![left]);
        let down = InputEvent::MoveCursor { dtrack: 1, dstep: 0 };
        assert_eq!(handle_key(KeyCode::Char('j'), &ts), vec![down]);
        assert!(handle_key(KeyCode::Char('z'), &ts).is_empty());
        assert_eq!(handle_key(KeyCode::Esc, &ts), vec![InputEvent::Quit]);
    }

    #[test]
    fn pattern_and_transport_keys() {
        let ts = TuiState::default();
        assert_eq!(handle_key(KeyCode::Char('t'), &ts), vec![InputEvent::CycleTimeSignature]);
        assert_eq!(handle_key(KeyCode::Char('I'), &ts), vec![InputEvent::NumberSequence(-1)]);
        assert_eq!(handle_key(KeyCode::Backspace, &ts), vec![InputEvent::Panic]);
        assert_eq!(handle_key(KeyCode::Char('R'), &ts), vec![InputEvent::ReloadKit]);
    }
}
