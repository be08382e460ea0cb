use std::io;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::round::RoundId;

/// Words per minute at a speech rate of 1.0
pub const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const ENGLISH_VOICE: &str = "en-us";
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Text to be read aloud for a round
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub round: RoundId,
    pub text: String,
    pub rate: f32,
}

/// Fire-and-forget narration. Implementations must report completion of each
/// request exactly once, tagged with the request's round.
pub trait SpeechAnnouncer {
    fn speak(&mut self, request: SpeechRequest);
}

/// Callback receiving the round whose narration finished
pub type SpeechNotifier = Arc<dyn Fn(RoundId) + Send + Sync>;

/// Produces no audio and reports completion straight away
pub struct SilentAnnouncer {
    notify: SpeechNotifier,
}

impl SilentAnnouncer {
    pub fn new(notify: SpeechNotifier) -> Self {
        Self { notify }
    }
}

impl SpeechAnnouncer for SilentAnnouncer {
    fn speak(&mut self, request: SpeechRequest) {
        tracing::debug!(round = %request.round, "speech disabled, completing immediately");
        (self.notify)(request.round);
    }
}

/// Test double that keeps every request and never completes on its own
#[derive(Debug, Clone, Default)]
pub struct RecordingAnnouncer {
    requests: Arc<Mutex<Vec<SpeechRequest>>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl SpeechAnnouncer for RecordingAnnouncer {
    fn speak(&mut self, request: SpeechRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
    }
}

/// Platform speech program
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SpeechEngine {
    #[strum(serialize = "say")]
    Say,
    #[strum(serialize = "espeak-ng")]
    EspeakNg,
    #[strum(serialize = "espeak")]
    Espeak,
}

impl SpeechEngine {
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            SpeechEngine::Say
        } else {
            SpeechEngine::EspeakNg
        }
    }

    /// Arguments for one utterance, optionally pinned to an English voice
    pub fn args(&self, text: &str, rate: f32, english_voice: bool) -> Vec<String> {
        let wpm = words_per_minute(rate).to_string();
        let mut args = vec![];

        match self {
            SpeechEngine::Say => {
                if english_voice {
                    args.extend(["-v".to_string(), "Samantha".to_string()]);
                }
                args.extend(["-r".to_string(), wpm]);
            }
            SpeechEngine::EspeakNg | SpeechEngine::Espeak => {
                if english_voice {
                    args.extend(["-v".to_string(), ENGLISH_VOICE.to_string()]);
                }
                args.extend(["-s".to_string(), wpm]);
            }
        }

        args.push(text.to_string());
        args
    }

    fn fallback(&self) -> Option<SpeechEngine> {
        match self {
            SpeechEngine::EspeakNg => Some(SpeechEngine::Espeak),
            _ => None,
        }
    }
}

pub fn words_per_minute(rate: f32) -> u32 {
    (BASE_WORDS_PER_MINUTE * rate).round().max(1.0) as u32
}

/// Speaks through an external program on a worker thread.
/// A newer request stops the narration of an older one.
pub struct CommandAnnouncer {
    engine: SpeechEngine,
    notify: SpeechNotifier,
    latest: Arc<AtomicU64>,
}

impl CommandAnnouncer {
    pub fn new(notify: SpeechNotifier) -> Self {
        Self::with_engine(SpeechEngine::platform_default(), notify)
    }

    pub fn with_engine(engine: SpeechEngine, notify: SpeechNotifier) -> Self {
        Self {
            engine,
            notify,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl SpeechAnnouncer for CommandAnnouncer {
    fn speak(&mut self, request: SpeechRequest) {
        let engine = self.engine;
        let notify = Arc::clone(&self.notify);
        let latest = Arc::clone(&self.latest);
        latest.store(request.round.value(), Ordering::SeqCst);

        thread::spawn(move || {
            let round = request.round.value();
            let still_current = || latest.load(Ordering::SeqCst) == round;

            match play(engine, &request, &still_current) {
                Playback::Spoken => {}
                Playback::Superseded => {
                    tracing::debug!(round = %request.round, "narration superseded")
                }
                Playback::Failed => {
                    tracing::warn!(round = %request.round, %engine, "speech playback failed")
                }
            }
            notify(request.round);
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    Spoken,
    Superseded,
    Failed,
}

fn play(
    engine: SpeechEngine,
    request: &SpeechRequest,
    still_current: &dyn Fn() -> bool,
) -> Playback {
    let mut current = Some(engine);

    while let Some(engine) = current {
        for english_voice in [true, false] {
            if !still_current() {
                return Playback::Superseded;
            }

            let child = Command::new(engine.to_string())
                .args(engine.args(&request.text, request.rate, english_voice))
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();

            let child = match child {
                Ok(child) => child,
                Err(err) => {
                    tracing::debug!(%engine, error = %err, "speech program unavailable");
                    break;
                }
            };

            match wait_while_current(child, still_current) {
                Ok(Some(status)) if status.success() => return Playback::Spoken,
                Ok(Some(status)) => {
                    tracing::debug!(%engine, english_voice, ?status, "speech program failed");
                }
                Ok(None) => return Playback::Superseded,
                Err(err) => {
                    tracing::debug!(%engine, error = %err, "lost track of speech program");
                    return Playback::Failed;
                }
            }
        }
        current = engine.fallback();
    }

    Playback::Failed
}

/// Wait for `child` to exit, killing it once `still_current` turns false.
/// Returns `None` when the child was killed.
fn wait_while_current(
    mut child: Child,
    still_current: &dyn Fn() -> bool,
) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if !still_current() {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
