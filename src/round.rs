//! Round lifecycle: sequence generation, memorize countdown, answer capture and scoring.

use std::fmt;

use crate::config::RoundConfig;
use crate::error::{RoundError, StoreError};
use crate::generator::{Sequence, SequenceGenerator, SequenceSource};
use crate::speech::{SpeechAnnouncer, SpeechRequest};
use crate::stats::{KeyValueStore, RunResult, StatsStore, StatsSummary};
use crate::timer::{RoundTimer, TimerEvent};
use crate::util::parse_leading_int;

/// Generation counter identifying a round. Timer and speech notifications
/// carry the id they were issued for so stale ones can be dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoundId(u64);

impl RoundId {
    pub fn next(self) -> Self {
        RoundId(self.0 + 1)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RoundPhase {
    Idle,
    Memorizing,
    AwaitingAnswer,
    Revealed,
}

/// Owns the round configuration, the current sequence and answers, the
/// visibility flags the presentation layer renders from, and the run history.
pub struct RoundStateMachine<S: KeyValueStore> {
    pending: RoundConfig,
    active: Option<RoundConfig>,
    round: RoundId,
    phase: RoundPhase,
    sequence: Sequence,
    answers: Vec<Option<String>>,
    seconds_left: u32,
    sequence_visible: bool,
    answer_visible: bool,
    answer_disabled: bool,
    reveal_enabled: bool,
    last_score: u32,
    timer: RoundTimer,
    source: Box<dyn SequenceSource>,
    announcer: Box<dyn SpeechAnnouncer>,
    stats: StatsStore<S>,
}

impl<S: KeyValueStore> RoundStateMachine<S> {
    pub fn new(
        config: RoundConfig,
        stats: StatsStore<S>,
        announcer: Box<dyn SpeechAnnouncer>,
    ) -> Self {
        Self {
            pending: config,
            active: None,
            round: RoundId::default(),
            phase: RoundPhase::Idle,
            sequence: Sequence::default(),
            answers: vec![],
            seconds_left: 0,
            sequence_visible: false,
            answer_visible: false,
            answer_disabled: false,
            reveal_enabled: false,
            last_score: 0,
            timer: RoundTimer::new(),
            source: Box::new(SequenceGenerator::new()),
            announcer,
            stats,
        }
    }

    pub fn with_source(mut self, source: Box<dyn SequenceSource>) -> Self {
        self.source = source;
        self
    }

    pub fn with_timer(mut self, timer: RoundTimer) -> Self {
        self.timer = timer;
        self
    }

    pub fn can_configure(&self) -> bool {
        matches!(self.phase, RoundPhase::Idle | RoundPhase::Revealed)
    }

    pub fn can_start(&self) -> bool {
        self.pending.is_playable()
    }

    pub fn can_reveal(&self) -> bool {
        self.phase == RoundPhase::AwaitingAnswer && self.reveal_enabled
    }

    pub fn can_edit_answers(&self) -> bool {
        matches!(
            self.phase,
            RoundPhase::Memorizing | RoundPhase::AwaitingAnswer
        ) && !self.answer_disabled
    }

    /// The backwards switch stays put while a round is running
    pub fn is_backwards_locked(&self) -> bool {
        matches!(
            self.phase,
            RoundPhase::Memorizing | RoundPhase::AwaitingAnswer
        )
    }

    /// Store settings for the next round. The running round keeps its snapshot.
    pub fn configure(&mut self, config: RoundConfig) -> Result<(), RoundError> {
        if !self.can_configure() {
            return Err(RoundError::ConfigLocked(self.phase));
        }
        self.pending = config;
        Ok(())
    }

    pub fn start_round(&mut self) -> Result<RoundId, RoundError> {
        if !self.can_start() {
            return Err(RoundError::NoPresentation);
        }

        let config = self.pending;
        self.round = self.round.next();
        self.sequence = self
            .source
            .generate(config.sequence_length, config.number_range_exclusive_max);
        self.answers = vec![None; self.sequence.len()];
        self.active = Some(config);
        self.phase = RoundPhase::Memorizing;
        self.sequence_visible = config.display_enabled;
        self.answer_visible = false;
        self.answer_disabled = false;
        self.reveal_enabled = false;
        self.last_score = 0;

        tracing::info!(
            round = %self.round,
            length = self.sequence.len(),
            range = config.number_range_exclusive_max,
            backwards = config.backwards,
            display = config.display_enabled,
            speak = config.speak_enabled,
            "round started"
        );

        let events = self.timer.start(config.memorize_secs, self.round);
        self.apply_timer_events(events);

        if config.speak_enabled {
            self.announcer.speak(SpeechRequest {
                round: self.round,
                text: self.sequence.speech_text(),
                rate: config.speech_rate,
            });
        }

        Ok(self.round)
    }

    /// Advance the countdown by one runtime tick
    pub fn on_tick(&mut self) {
        let events = self.timer.on_tick();
        self.apply_timer_events(events);
    }

    pub fn apply_timer_events(&mut self, events: Vec<TimerEvent>) {
        for event in events {
            self.on_timer_event(event);
        }
    }

    pub fn on_timer_event(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick { round, remaining } if round == self.round => {
                self.seconds_left = remaining;
            }
            TimerEvent::Expired { round } if round == self.round => self.on_expired(),
            stale => tracing::debug!(?stale, current = %self.round, "dropping stale timer event"),
        }
    }

    fn on_expired(&mut self) {
        if !matches!(
            self.phase,
            RoundPhase::Memorizing | RoundPhase::AwaitingAnswer
        ) {
            return;
        }
        tracing::debug!(round = %self.round, "memorize time over");
        self.phase = RoundPhase::AwaitingAnswer;
        self.sequence_visible = false;
        self.answer_visible = true;
        self.reveal_enabled = true;
    }

    /// Narration for `round` has finished playing. In speech-only rounds this
    /// opens the answers without waiting for the countdown.
    pub fn on_speech_finished(&mut self, round: RoundId) {
        if round != self.round {
            tracing::debug!(%round, current = %self.round, "dropping stale speech completion");
            return;
        }
        let display_enabled = self.active.map(|c| c.display_enabled).unwrap_or(true);
        if display_enabled
            || !matches!(
                self.phase,
                RoundPhase::Memorizing | RoundPhase::AwaitingAnswer
            )
        {
            return;
        }
        self.phase = RoundPhase::AwaitingAnswer;
        self.answer_visible = true;
        self.reveal_enabled = true;
    }

    /// Store the typed text for a slot verbatim; it is only interpreted when scored
    pub fn record_answer(
        &mut self,
        index: usize,
        raw: impl Into<String>,
    ) -> Result<(), RoundError> {
        if !self.can_edit_answers() {
            return Err(RoundError::AnswersLocked(self.phase));
        }
        let len = self.answers.len();
        let slot = self
            .answers
            .get_mut(index)
            .ok_or(RoundError::AnswerOutOfRange { index, len })?;
        *slot = Some(raw.into());
        Ok(())
    }

    pub fn expected_at(&self, index: usize) -> Option<u32> {
        let backwards = self.active?.backwards;
        self.sequence.expected_at(index, backwards)
    }

    /// Per-slot correctness: exact match against the decimal form of the
    /// expected value, so `"07"` does not match `7`.
    pub fn is_correct_at(&self, index: usize) -> bool {
        match (self.expected_at(index), self.answers.get(index)) {
            (Some(expected), Some(Some(answer))) => expected.to_string() == *answer,
            _ => false,
        }
    }

    /// Round score: answers are parsed as integers, so `"07"` counts for `7`.
    pub fn count_correct(&self) -> u32 {
        (0..self.answers.len())
            .filter(|&index| {
                let parsed = self.answers[index].as_deref().and_then(parse_leading_int);
                match (self.expected_at(index), parsed) {
                    (Some(expected), Some(answer)) => expected as i64 == answer,
                    _ => false,
                }
            })
            .count() as u32
    }

    pub fn reveal(&mut self) -> Result<RunResult, RoundError> {
        if !self.can_reveal() {
            return Err(RoundError::RevealUnavailable(self.phase));
        }

        self.timer.cancel();
        self.phase = RoundPhase::Revealed;
        self.sequence_visible = true;
        self.answer_disabled = true;
        self.reveal_enabled = false;

        let correct = self.count_correct();
        self.last_score = correct;
        let result = RunResult::new(self.sequence.len() as u32, correct);

        if let Err(err) = self.stats.append(result) {
            tracing::warn!(error = %err, "failed to persist run result");
        }
        tracing::info!(
            round = %self.round,
            total = result.total,
            correct = result.correct,
            "round revealed"
        );

        Ok(result)
    }

    /// Drop every stored run. Confirmation is the caller's job.
    pub fn reset_stats(&mut self) -> Result<(), StoreError> {
        tracing::info!(runs = self.stats.history().len(), "resetting stats");
        self.stats.clear()
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn answers(&self) -> &[Option<String>] {
        &self.answers
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    pub fn is_sequence_visible(&self) -> bool {
        self.sequence_visible
    }

    pub fn is_answer_visible(&self) -> bool {
        self.answer_visible
    }

    pub fn is_answer_disabled(&self) -> bool {
        self.answer_disabled
    }

    pub fn is_reveal_enabled(&self) -> bool {
        self.reveal_enabled
    }

    pub fn last_score(&self) -> u32 {
        self.last_score
    }

    pub fn pending_config(&self) -> &RoundConfig {
        &self.pending
    }

    pub fn active_config(&self) -> Option<&RoundConfig> {
        self.active.as_ref()
    }

    pub fn stats(&self) -> &StatsStore<S> {
        &self.stats
    }

    pub fn summary(&self) -> StatsSummary {
        self.stats.summary()
    }
}

impl<S: KeyValueStore> fmt::Debug for RoundStateMachine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundStateMachine")
            .field("round", &self.round)
            .field("phase", &self.phase)
            .field("sequence", &self.sequence)
            .field("answers", &self.answers)
            .field("seconds_left", &self.seconds_left)
            .finish_non_exhaustive()
    }
}
