use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::Config;
use crate::round::{RoundPhase, RoundStateMachine};
use crate::runtime::SeqEvent;
use crate::stats::KeyValueStore;

const MAX_ANSWER_CHARS: usize = 9;

/// Entries of the controls panel, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Control {
    #[strum(serialize = "Sequence length")]
    Length,
    #[strum(serialize = "Memorisation time")]
    MemorizeTime,
    #[strum(serialize = "Voice speed")]
    SpeechRate,
    #[strum(serialize = "Numbers range: 0 to")]
    Range,
    #[strum(serialize = "Answer backwards")]
    Backwards,
    #[strum(serialize = "Display")]
    Display,
    #[strum(serialize = "Speak")]
    Speak,
}

impl Control {
    pub const ALL: [Control; 7] = [
        Control::Length,
        Control::MemorizeTime,
        Control::SpeechRate,
        Control::Range,
        Control::Backwards,
        Control::Display,
        Control::Speak,
    ];

    fn position(&self) -> usize {
        Control::ALL.iter().position(|c| c == self).unwrap_or(0)
    }

    pub fn next(&self) -> Control {
        Control::ALL[(self.position() + 1) % Control::ALL.len()]
    }

    pub fn prev(&self) -> Control {
        Control::ALL[(self.position() + Control::ALL.len() - 1) % Control::ALL.len()]
    }
}

#[derive(Debug)]
pub struct App<S: KeyValueStore> {
    pub machine: RoundStateMachine<S>,
    pub settings: Config,
    pub focus: Control,
    pub answer_cursor: usize,
    pub confirm_reset: bool,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(settings: Config, machine: RoundStateMachine<S>) -> Self {
        let mut app = Self {
            machine,
            settings,
            focus: Control::Length,
            answer_cursor: 0,
            confirm_reset: false,
            status: None,
            should_quit: false,
        };
        app.sync_config();
        app
    }

    pub fn handle_event(&mut self, event: SeqEvent) {
        match event {
            SeqEvent::Key(key) => self.handle_key(key),
            SeqEvent::Tick => self.machine.on_tick(),
            SeqEvent::SpeechDone(round) => self.machine.on_speech_finished(round),
            SeqEvent::Resize => {}
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.confirm_reset {
            self.confirm_reset = false;
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                self.reset_stats();
            } else {
                self.status = Some("Reset cancelled".to_string());
            }
            return;
        }

        if key.code == KeyCode::Esc {
            self.should_quit = true;
            return;
        }

        match self.machine.phase() {
            RoundPhase::Idle | RoundPhase::Revealed => self.handle_settings_key(key),
            RoundPhase::Memorizing => self.handle_memorizing_key(key),
            RoundPhase::AwaitingAnswer => self.handle_answer_key(key),
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Char('n') | KeyCode::Char('g') => self.start_round(),
            KeyCode::Char('x') => self.confirm_reset = true,
            KeyCode::Up | KeyCode::BackTab => self.focus = self.focus.prev(),
            KeyCode::Down | KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::Left => self.adjust_focused(-1),
            KeyCode::Right | KeyCode::Char(' ') => self.adjust_focused(1),
            KeyCode::Backspace if self.focus == Control::Range => {
                self.settings.pop_range_char();
                self.sync_config();
            }
            KeyCode::Char(c) if self.focus == Control::Range && c.is_ascii_digit() => {
                self.settings.push_range_char(c);
                self.sync_config();
            }
            _ => {}
        }
    }

    fn handle_memorizing_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('n') => self.start_round(),
            KeyCode::Char('x') => self.confirm_reset = true,
            _ => {}
        }
    }

    fn handle_answer_key(&mut self, key: KeyEvent) {
        let slots = self.machine.answers().len();
        match key.code {
            KeyCode::Enter => self.reveal(),
            KeyCode::Char('n') => self.start_round(),
            KeyCode::Char('x') => self.confirm_reset = true,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char(' ') if slots > 0 => {
                self.answer_cursor = (self.answer_cursor + 1) % slots;
            }
            KeyCode::BackTab | KeyCode::Left if slots > 0 => {
                self.answer_cursor = (self.answer_cursor + slots - 1) % slots;
            }
            KeyCode::Backspace => self.edit_answer(|text| {
                text.pop();
            }),
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => {
                self.edit_answer(|text| {
                    if text.chars().count() < MAX_ANSWER_CHARS {
                        text.push(c);
                    }
                })
            }
            _ => {}
        }
    }

    fn edit_answer<F: FnOnce(&mut String)>(&mut self, edit: F) {
        if !self.machine.is_answer_visible() {
            return;
        }
        let index = self.answer_cursor;
        let mut text = self
            .machine
            .answers()
            .get(index)
            .cloned()
            .flatten()
            .unwrap_or_default();
        edit(&mut text);
        if let Err(err) = self.machine.record_answer(index, text) {
            tracing::debug!(error = %err, "answer edit rejected");
        }
    }

    fn adjust_focused(&mut self, steps: i32) {
        match self.focus {
            Control::Length => self.settings.adjust_length(steps),
            Control::MemorizeTime => self.settings.adjust_memorize_secs(steps),
            Control::SpeechRate => self.settings.adjust_speech_rate(steps),
            Control::Range => {}
            Control::Backwards => {
                if !self.machine.is_backwards_locked() {
                    self.settings.backwards = !self.settings.backwards;
                }
            }
            Control::Display => self.settings.display = !self.settings.display,
            Control::Speak => self.settings.speak = !self.settings.speak,
        }
        self.sync_config();
    }

    /// Push the edited settings to the machine when it accepts them
    pub fn sync_config(&mut self) {
        if self.machine.can_configure() {
            if let Err(err) = self.machine.configure(self.settings.round_config()) {
                tracing::debug!(error = %err, "configuration rejected");
            }
        }
    }

    pub fn start_round(&mut self) {
        self.sync_config();
        match self.machine.start_round() {
            Ok(_) => {
                self.answer_cursor = 0;
                self.status = None;
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    pub fn reveal(&mut self) {
        match self.machine.reveal() {
            Ok(result) => {
                self.status = Some(format!("({} out of {})", result.correct, result.total));
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn reset_stats(&mut self) {
        match self.machine.reset_stats() {
            Ok(()) => self.status = Some("Statistics cleared".to_string()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to persist cleared stats");
                self.status = Some(format!("Could not save cleared statistics: {err}"));
            }
        }
    }

    /// Whether the countdown line is shown; follows the running round when there is one
    pub fn shows_time_left(&self) -> bool {
        match self.machine.phase() {
            RoundPhase::Idle => self.settings.display,
            _ => self
                .machine
                .active_config()
                .map(|c| c.display_enabled)
                .unwrap_or(self.settings.display),
        }
    }
}
