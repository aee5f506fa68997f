use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

use crate::sequencer::Cell;
use crate::shared::{DisplayState, TrackView};

const NAME_WIDTH: usize = 10;
const BEAT: usize = 4;

// one row per track, one column per step, plus a ruler marking the playhead
pub fn draw_step_grid(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut lines = Vec::with_capacity(state.tracks.len() + 1);
    lines.push(ruler(state));
    for (t, track) in state.tracks.iter().enumerate() {
        let mut spans = vec![track_label(track, t == state.cursor.0)];
        for (s, cell) in track.cells.iter().enumerate() {
            let at_cursor = (t, s) == state.cursor;
            let playing = state.playing_step == Some(s);
            spans.push(cell_span(*cell, at_cursor, playing));
        }
        lines.push(Line::from(spans));
    }
    if state.tracks.is_empty() {
        lines.push(Line::styled(
            "no .wav files found in the project directory",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let block = Block::bordered().title(" steps ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn ruler(state: &DisplayState) -> Line<'static> {
    let mut spans = vec![Span::raw(" ".repeat(NAME_WIDTH + 1))];
    for s in 0..state.steps {
        let span = if state.playing_step == Some(s) {
            Span::styled("▼ ", Style::default().fg(Color::LightMagenta))
        } else if s % BEAT == 0 {
            Span::styled(format!("{:<2}", s + 1), Style::default().fg(Color::DarkGray))
        } else {
            Span::raw("  ")
        };
        spans.push(span);
    }
    Line::from(spans)
}

fn track_label(track: &TrackView, selected: bool) -> Span<'static> {
    let name: String = track.name.chars().take(NAME_WIDTH).collect();
    let mut style = Style::default();
    if !track.loaded {
        // failed to load, steps on this track stay silent
        style = style.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
    }
    if selected {
        style = style.add_modifier(Modifier::BOLD);
    }
    Span::styled(format!("{name:<width$} ", width = NAME_WIDTH), style)
}

fn cell_span(cell: Cell, at_cursor: bool, playing: bool) -> Span<'static> {
    let glyph = match (cell.active, cell.probability) {
        (false, _) => "·",
        (true, 100) => "■",
        (true, _) => "▪", // fires sometimes
    };
    let mut style = if cell.active {
        Style::default().fg(Color::LightMagenta)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    if playing {
        style = style.bg(Color::Magenta);
    }
    if at_cursor {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("{glyph} "), style)
}
