use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, Control},
    round::RoundPhase,
    stats::KeyValueStore,
};

const HORIZONTAL_MARGIN: u16 = 2;
const MIN_SLOT_WIDTH: usize = 3;

impl<S: KeyValueStore> Widget for &App<S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(3),                              // title + stats
                Constraint::Length(Control::ALL.len() as u16 + 2), // controls
                Constraint::Length(3),                              // sequence
                Constraint::Length(3),                              // answers
                Constraint::Length(1),                              // time remaining
                Constraint::Length(1),                              // score
                Constraint::Length(1),                              // status
                Constraint::Min(1),                                 // legend
            ])
            .split(area);

        render_header(self, chunks[0], buf);
        render_controls(self, chunks[1], buf);
        render_sequence(self, chunks[2], buf);
        render_answers(self, chunks[3], buf);
        render_time_left(self, chunks[4], buf);
        render_score(self, chunks[5], buf);
        render_status(self, chunks[6], buf);
        render_legend(self, chunks[7], buf);
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn render_header<S: KeyValueStore>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    let summary = app.machine.summary();
    let lines = vec![
        Line::from(Span::styled(
            "SEQUENCE MEMORY",
            bold().fg(Color::Cyan),
        )),
        Line::from(Span::raw(summary.headline())),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM))
        .render(area, buf);
}

fn control_value<S: KeyValueStore>(app: &App<S>, control: Control) -> String {
    let s = &app.settings;
    let on_off = |b: bool| (if b { "on" } else { "off" }).to_string();
    match control {
        Control::Length => format!("{} numbers", s.sequence_length),
        Control::MemorizeTime => format!("{} secs", s.memorize_secs),
        Control::SpeechRate => format!("{:.1}", s.speech_rate),
        Control::Range => {
            if s.range.is_empty() {
                "_".to_string()
            } else {
                s.range.clone()
            }
        }
        Control::Backwards => on_off(s.backwards),
        Control::Display => on_off(s.display),
        Control::Speak => on_off(s.speak),
    }
}

fn render_controls<S: KeyValueStore>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    let editable = app.machine.can_configure();
    let lines: Vec<Line> = Control::ALL
        .iter()
        .map(|control| {
            let focused = editable && *control == app.focus;
            let locked = !editable
                || (*control == Control::Backwards && app.machine.is_backwards_locked());
            let marker = if focused { "> " } else { "  " };
            let value_style = if locked {
                dim()
            } else if focused {
                bold().fg(Color::Yellow)
            } else {
                bold()
            };
            Line::from(vec![
                Span::raw(marker),
                Span::raw(format!("{control}: ")),
                Span::styled(control_value(app, *control), value_style),
            ])
        })
        .collect();

    let title = if editable { "Settings" } else { "Settings (locked)" };
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .render(area, buf);
}

fn render_sequence<S: KeyValueStore>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    let text = if app.machine.is_sequence_visible() {
        app.machine.sequence().display_text()
    } else {
        String::new()
    };
    Paragraph::new(Span::styled(text, bold().fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Sequence"))
        .render(area, buf);
}

fn render_answers<S: KeyValueStore>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    let machine = &app.machine;
    let block = Block::default().borders(Borders::ALL).title("Answers");
    if !machine.is_answer_visible() {
        block.render(area, buf);
        return;
    }

    let revealed = machine.is_answer_disabled();
    let mut spans = Vec::with_capacity(machine.answers().len() * 2);
    for (idx, answer) in machine.answers().iter().enumerate() {
        let text = answer.as_deref().unwrap_or("");
        let width = text.width().max(MIN_SLOT_WIDTH);
        let cell = format!("[{text:^width$}]");

        // cells are only judged once the round is revealed
        let style = if revealed {
            if machine.is_correct_at(idx) {
                bold().fg(Color::Green)
            } else {
                bold().fg(Color::Red)
            }
        } else if idx == app.answer_cursor {
            bold().add_modifier(Modifier::UNDERLINED)
        } else {
            Style::default()
        };

        spans.push(Span::styled(cell, style));
        spans.push(Span::raw(" "));
    }

    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block)
        .render(area, buf);
}

fn render_time_left<S: KeyValueStore>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    if !app.shows_time_left() {
        return;
    }
    Paragraph::new(Span::styled(
        format!("Time remaining: {}", app.machine.seconds_left()),
        dim(),
    ))
    .alignment(Alignment::Center)
    .render(area, buf);
}

fn render_score<S: KeyValueStore>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    let machine = &app.machine;
    if machine.phase() == RoundPhase::Idle {
        return;
    }
    Paragraph::new(Span::styled(
        format!(
            "({} out of {})",
            machine.last_score(),
            machine.sequence().len()
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(area, buf);
}

fn render_status<S: KeyValueStore>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    let line = if app.confirm_reset {
        Span::styled(
            "Do you really want to reset your usage statistics? (y/n)",
            bold().fg(Color::Red),
        )
    } else if let Some(status) = &app.status {
        Span::styled(status.clone(), Style::default().fg(Color::Yellow))
    } else {
        Span::raw("")
    };
    Paragraph::new(line)
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_legend<S: KeyValueStore>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    let text = match app.machine.phase() {
        RoundPhase::Idle | RoundPhase::Revealed => {
            "(↑/↓) select (←/→/space) change (enter) generate (x) reset stats (esc) quit"
        }
        RoundPhase::Memorizing => "memorize! (n) new sequence (x) reset stats (esc) quit",
        RoundPhase::AwaitingAnswer => {
            "(0-9) answer (←/→/tab) move (enter) reveal (n) new sequence (esc) quit"
        }
    };
    Paragraph::new(Span::styled(
        text,
        Style::default().add_modifier(Modifier::ITALIC).fg(Color::Gray),
    ))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .render(area, buf);
}
