use std::sync::{mpsc, Arc};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use seqmem::app::App;
use seqmem::config::Config;
use seqmem::generator::ScriptedSequences;
use seqmem::round::{RoundPhase, RoundStateMachine};
use seqmem::runtime::{FixedTicker, Runner, SeqEvent, TestEventSource};
use seqmem::speech::{SilentAnnouncer, SpeechNotifier};
use seqmem::stats::{MemoryStore, RunResult, StatsStore};
use seqmem::timer::RoundTimer;

// Headless integration using the internal runtime + App without a TTY.
// Speech completions travel through the same channel as key events, the way
// the binary wires them.

fn key(c: char) -> SeqEvent {
    SeqEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn build_app(
    settings: Config,
    sequence: Vec<u32>,
    tx: mpsc::Sender<SeqEvent>,
) -> App<MemoryStore> {
    let notify: SpeechNotifier = Arc::new(move |round| {
        let _ = tx.send(SeqEvent::SpeechDone(round));
    });
    let machine = RoundStateMachine::new(
        settings.round_config(),
        StatsStore::open(MemoryStore::new()),
        Box::new(SilentAnnouncer::new(notify)),
    )
    .with_source(Box::new(ScriptedSequences::new([sequence])))
    .with_timer(RoundTimer::with_ticks_per_second(2));
    App::new(settings, machine)
}

#[test]
fn headless_display_round_completes_by_countdown() {
    let (tx, rx) = mpsc::channel();
    let mut app = build_app(
        Config {
            sequence_length: 3,
            ..Config::default()
        },
        vec![5, 0, 9],
        tx.clone(),
    );
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    );

    tx.send(key('g')).unwrap();

    // 5 seconds at 2 ticks per second, plus slack
    for _ in 0..2000u32 {
        app.handle_event(runner.step());
        if app.machine.phase() == RoundPhase::AwaitingAnswer {
            break;
        }
    }
    assert_eq!(app.machine.phase(), RoundPhase::AwaitingAnswer);
    assert!(!app.machine.is_sequence_visible());

    for ev in [key('5'), key(' '), key('0'), key(' '), key('9')] {
        app.handle_event(ev);
    }
    app.handle_event(SeqEvent::Key(KeyEvent::new(
        KeyCode::Enter,
        KeyModifiers::NONE,
    )));

    assert_eq!(app.machine.phase(), RoundPhase::Revealed);
    assert_eq!(app.machine.stats().history(), &[RunResult::new(3, 3)]);
}

#[test]
fn headless_speech_only_round_opens_answers_before_countdown() {
    let (tx, rx) = mpsc::channel();
    let settings = Config {
        sequence_length: 2,
        memorize_secs: 60,
        display: false,
        speak: true,
        backwards: true,
        ..Config::default()
    };
    let mut app = build_app(settings, vec![1, 2], tx.clone());
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_secs(60)),
    );

    app.start_round();
    assert_eq!(app.machine.phase(), RoundPhase::Memorizing);

    // the silent announcer has already queued its completion
    match runner.step() {
        ev @ SeqEvent::SpeechDone(_) => app.handle_event(ev),
        other => panic!("expected speech completion, got {other:?}"),
    }
    assert_eq!(app.machine.phase(), RoundPhase::AwaitingAnswer);
    assert!(app.machine.seconds_left() > 50);

    // backwards: expected order is 2, 1
    for ev in [key('2'), key(' '), key('1')] {
        app.handle_event(ev);
    }
    app.reveal();
    assert_eq!(app.machine.stats().history(), &[RunResult::new(2, 2)]);
}

#[test]
fn headless_stale_speech_does_not_leak_into_next_round() {
    let (tx, rx) = mpsc::channel();
    let settings = Config {
        display: false,
        speak: true,
        ..Config::default()
    };
    let mut app = build_app(settings, vec![4], tx);
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_secs(60)),
    );

    app.start_round();
    app.start_round();

    let first = runner.step();
    app.handle_event(first);
    assert_eq!(app.machine.phase(), RoundPhase::Memorizing);

    let second = runner.step();
    app.handle_event(second);
    assert_eq!(app.machine.phase(), RoundPhase::AwaitingAnswer);
}
