// Types shared between the TUI and the middle layer.
//
// Keys (see tui/input.rs):
//   arrows / h j k l   //  MoveCursor
//   Enter / x          //  ToggleStep (at the cursor)
//   p / P              //  NudgeProbability(-/+)
//   Space              //  PlayPress
//   , / .              //  NudgeBpm(-/+)
//   v                  //  ToggleDirection
//   m                  //  ToggleMode (interval / lookahead)
//   t                  //  CycleTimeSignature
//   Backspace          //  Panic (stop and silence everything)
//   Tab                //  NextParamPage
//   a                  //  AuditionTrack
//   c / r              //  ClearTrack / RandomizeTrack
//   d / D              //  DeBruijn(+1 / -1)
//   n / N              //  BinaryCount(+1 / -1)
//   i / I              //  NumberSequence(+1 / -1)
//   1 2 3 4 5          //  ToggleFx(autopan, distortion, crush, stutter, ratchet)
//   ! @ # $ %          //  CycleFxProbability(same order)
//   [ / ]              //  KnobA (pitch or pan)
//   - / =              //  KnobB (gain or cutoff)
//   R                  //  ReloadKit
//   s                  //  Save
//   Esc / q            //  Quit
//
// Rendering: each frame the TUI asks `middle.display_state()` for a
// `DisplayState` and draws it as is. All sequencer state lives in the middle.

use crate::sequencer::clock::TimeSignature;
use crate::sequencer::{Cell, FxKind};

pub const DEFAULT_STEPS: usize = 16;
pub const MAX_TRACKS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    MoveCursor { dtrack: i32, dstep: i32 },
    ToggleStep,
    NudgeProbability(i16),

    PlayPress,
    NudgeBpm(f64),
    ToggleDirection,
    ToggleMode,
    CycleTimeSignature,
    Panic,
    NextParamPage,

    // track tools, all act on the cursor's track
    AuditionTrack,
    ClearTrack,
    RandomizeTrack,
    DeBruijn(i32),
    BinaryCount(i32),
    NumberSequence(i32),

    ToggleFx(FxKind),
    CycleFxProbability(FxKind),

    // semantic knob events, resolved by the tui from the param page
    AdjustPitch(f32),
    AdjustGain(f32),
    AdjustPan(f32),
    AdjustCutoff(f32),

    // handled by the main loop
    Save,
    ReloadKit,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ParamPage {
    #[default]
    Tone,
    Mix,
}

impl ParamPage {
    pub fn next(self) -> Self {
        match self {
            ParamPage::Tone => ParamPage::Mix,
            ParamPage::Mix => ParamPage::Tone,
        }
    }

    pub fn knob_labels(self) -> (&'static str, &'static str) {
        match self {
            ParamPage::Tone => ("PITCH", "GAIN"),
            ParamPage::Mix => ("PAN", "CUTOFF"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackView {
    pub name: String,
    pub loaded: bool,
    pub cells: Vec<Cell>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FxView {
    pub kind: FxKind,
    pub active: bool,
    pub probability: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplayState {
    pub tracks: Vec<TrackView>,
    pub steps: usize,
    pub time_signature: Option<TimeSignature>, // None when the loop is not one whole bar
    pub cursor: (usize, usize), // (track, step)
    pub playing_step: Option<usize>, // last step that fired while playing
    pub playing: bool,
    pub bpm: f64,
    pub mode_label: &'static str,
    pub reverse: bool,
    pub param_page: ParamPage,
    pub knob_a_label: &'static str,
    pub knob_b_label: &'static str,
    pub knob_a_value: f32,
    pub knob_b_value: f32,
    pub fx: Vec<FxView>,
    pub display_text: String, // last action, shown in the footer
}
