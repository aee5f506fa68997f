use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

use super::grid::draw_step_grid;
use crate::shared::DisplayState;

const HELP: &str = "spc play  ←→↑↓ move  x step  p/P prob  ,/. bpm  v dir  m mode  t meter  \
                    a audition  c/r/d/n/i fill  1-5 fx  tab page  R reload  bksp panic  \
                    s save  q quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // transport, knobs and fx
            Constraint::Min(4),    // step grid
            Constraint::Length(3), // message + help
        ])
        .split(area);

    draw_screen(frame, sections[0], state);
    draw_step_grid(frame, sections[1], state);
    draw_footer(frame, sections[2], state);
}

fn draw_screen(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let lit = Style::default().fg(Color::LightMagenta).add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);

    let direction = if state.reverse { "REV" } else { "FWD" };
    let length = match state.time_signature {
        Some(meter) => format!("{meter} {} steps", state.steps),
        None => format!("{} steps", state.steps),
    };
    let knobs = format!(
        "   {} {:.2}  {} {:.2}",
        state.knob_a_label, state.knob_a_value, state.knob_b_label, state.knob_b_value
    );

    let transport = Line::from(vec![
        if state.playing {
            Span::styled("▶ PLAY ", lit)
        } else {
            Span::styled("■ STOP ", dim)
        },
        Span::raw(format!(" {:.0} BPM  {}  {direction}  {length}", state.bpm, state.mode_label)),
        Span::styled(knobs, Style::default().fg(Color::Cyan)),
    ]);

    let mut fx = vec![Span::raw("fx ")];
    for (i, f) in state.fx.iter().enumerate() {
        let style = if f.active { lit } else { dim };
        let label = format!("{}:{} {}%  ", i + 1, f.kind.label(), f.probability);
        fx.push(Span::styled(label, style));
    }

    let block = Block::bordered().title(" drumtoys ");
    frame.render_widget(Paragraph::new(vec![transport, Line::from(fx)]).block(block), area);
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let lines = vec![
        Line::styled(state.display_text.clone(), Style::default().fg(Color::Yellow)),
        Line::styled(HELP, Style::default().fg(Color::DarkGray)),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}
