use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use seqmem::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    round::{RoundPhase, RoundStateMachine},
    runtime::{CrosstermEventSource, EventSource, FixedTicker, Runner, SeqEvent, Ticker},
    speech::{CommandAnnouncer, SpeechNotifier},
    stats::{FileStore, KeyValueStore, StatsStore},
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
};

/// sequence memory trainer: memorize the numbers, then type them back
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Shows (and optionally speaks) a random sequence of numbers, hides it after a countdown, and asks you to type it back, optionally in reverse. Every round is scored and kept in your history."
)]
pub struct Cli {
    /// how many numbers to memorize (1-14)
    #[clap(short = 'l', long)]
    length: Option<usize>,

    /// seconds the sequence stays visible (5-60, step 5)
    #[clap(short = 't', long = "memorize-secs")]
    memorize_secs: Option<u32>,

    /// numbers are drawn from 0 up to, but excluding, this bound
    #[clap(short = 'r', long)]
    range: Option<u32>,

    /// answer the sequence in reverse order
    #[clap(short = 'b', long)]
    backwards: bool,

    /// read the sequence aloud
    #[clap(short = 's', long)]
    speak: bool,

    /// do not show the sequence on screen (requires --speak to play)
    #[clap(long)]
    no_display: bool,

    /// speech rate multiplier (0.1-3.0)
    #[clap(long)]
    rate: Option<f32>,

    /// directory holding the run history
    #[clap(long)]
    stats_dir: Option<PathBuf>,

    /// print the statistics summary and exit
    #[clap(long)]
    summary: bool,

    /// clear the run history and exit
    #[clap(long, requires = "yes")]
    reset_stats: bool,

    /// confirm destructive actions such as --reset-stats
    #[clap(short = 'y', long)]
    yes: bool,
}

impl Cli {
    /// Layer command line overrides on top of the saved settings
    fn apply(&self, mut config: Config) -> Config {
        if let Some(length) = self.length {
            config.sequence_length = length;
        }
        if let Some(secs) = self.memorize_secs {
            config.memorize_secs = secs;
        }
        if let Some(range) = self.range {
            config.range = range.to_string();
        }
        if let Some(rate) = self.rate {
            config.speech_rate = rate;
        }
        if self.backwards {
            config.backwards = true;
        }
        if self.speak {
            config.speak = true;
        }
        if self.no_display {
            config.display = false;
        }
        config.normalized()
    }

    fn stats_backend(&self) -> FileStore {
        let dir = self
            .stats_dir
            .clone()
            .or_else(AppDirs::state_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        FileStore::new(dir)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // the game still runs when the log directory is unusable
    let _log_guard = logging::init(&AppDirs::log_dir()).ok();

    let mut stats = StatsStore::open(cli.stats_backend());

    if cli.summary {
        println!("{}", stats.summary().headline());
        return Ok(());
    }

    if cli.reset_stats {
        stats.clear()?;
        println!("Statistics cleared");
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config_store = FileConfigStore::new();
    let settings = cli.apply(config_store.load());

    let events = CrosstermEventSource::new();
    let speech_tx = events.sender();
    let notify: SpeechNotifier = Arc::new(move |round| {
        let _ = speech_tx.send(SeqEvent::SpeechDone(round));
    });

    let machine = RoundStateMachine::new(
        settings.round_config(),
        stats,
        Box::new(CommandAnnouncer::new(notify)),
    );
    let mut app = App::new(settings, machine);
    let runner = Runner::new(events, FixedTicker::default());

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Err(err) = config_store.save(&app.settings) {
        tracing::warn!(path = %config_store.path().display(), error = %err, "failed to save settings");
    }
    tracing::info!("exiting");

    result
}

fn start_tui<B: Backend, S: KeyValueStore, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    while !app.should_quit {
        let event = runner.step();
        // idle ticks change nothing on screen
        let redraw = !(event == SeqEvent::Tick
            && matches!(app.machine.phase(), RoundPhase::Idle | RoundPhase::Revealed));

        app.handle_event(event);

        if redraw {
            terminal.draw(|f| ui(app, f))?;
        }
    }

    Ok(())
}

fn ui<S: KeyValueStore>(app: &App<S>, f: &mut Frame) {
    f.render_widget(app, f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use seqmem::{
        generator::ScriptedSequences,
        runtime::TestEventSource,
        speech::RecordingAnnouncer,
        stats::{MemoryStore, RunResult},
        timer::RoundTimer,
    };
    use std::sync::mpsc;
    use std::time::Duration;

    fn key(code: KeyCode) -> SeqEvent {
        SeqEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["seqmem"]);

        assert_eq!(cli.length, None);
        assert_eq!(cli.memorize_secs, None);
        assert_eq!(cli.range, None);
        assert!(!cli.backwards);
        assert!(!cli.speak);
        assert!(!cli.no_display);
        assert!(!cli.summary);
        assert!(!cli.reset_stats);
    }

    #[test]
    fn test_cli_short_and_long_flags() {
        let cli = Cli::parse_from(["seqmem", "-l", "9", "-t", "20", "-r", "100", "-b", "-s"]);
        assert_eq!(cli.length, Some(9));
        assert_eq!(cli.memorize_secs, Some(20));
        assert_eq!(cli.range, Some(100));
        assert!(cli.backwards);
        assert!(cli.speak);

        let cli = Cli::parse_from(["seqmem", "--memorize-secs", "45", "--no-display", "--rate", "1.5"]);
        assert_eq!(cli.memorize_secs, Some(45));
        assert!(cli.no_display);
        assert_eq!(cli.rate, Some(1.5));
    }

    #[test]
    fn test_cli_reset_requires_confirmation() {
        let err = Cli::try_parse_from(["seqmem", "--reset-stats"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let cli = Cli::parse_from(["seqmem", "--reset-stats", "--yes"]);
        assert!(cli.reset_stats && cli.yes);
    }

    #[test]
    fn test_cli_overrides_saved_settings() {
        let saved = Config {
            sequence_length: 4,
            speak: false,
            ..Config::default()
        };
        let cli = Cli::parse_from(["seqmem", "-l", "40", "-r", "50", "--speak", "--rate", "9"]);
        let merged = cli.apply(saved);

        assert_eq!(merged.sequence_length, 14);
        assert_eq!(merged.range, "50");
        assert!(merged.speak);
        assert!(merged.display);
        assert!((merged.speech_rate - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_cli_stats_dir_override() {
        let cli = Cli::parse_from(["seqmem", "--stats-dir", "/tmp/seqmem-test"]);
        assert_eq!(
            cli.stats_backend().path_for("stats"),
            PathBuf::from("/tmp/seqmem-test/stats.json")
        );
    }

    #[test]
    fn test_start_tui_plays_a_round() {
        let settings = Config {
            sequence_length: 2,
            ..Config::default()
        };
        let machine = RoundStateMachine::new(
            settings.round_config(),
            StatsStore::open(MemoryStore::new()),
            Box::new(RecordingAnnouncer::new()),
        )
        .with_source(Box::new(ScriptedSequences::new([vec![6, 2]])))
        .with_timer(RoundTimer::with_ticks_per_second(1));
        let mut app = App::new(settings, machine);

        let (tx, rx) = mpsc::channel();
        tx.send(key(KeyCode::Enter)).unwrap();
        for _ in 0..5 {
            tx.send(SeqEvent::Tick).unwrap();
        }
        for ev in [
            key(KeyCode::Char('6')),
            key(KeyCode::Tab),
            key(KeyCode::Char('3')),
            key(KeyCode::Enter),
            key(KeyCode::Esc),
        ] {
            tx.send(ev).unwrap();
        }

        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_secs(60)),
        );
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        start_tui(&mut terminal, &mut app, &runner).unwrap();

        assert!(app.should_quit);
        assert_eq!(app.machine.phase(), RoundPhase::Revealed);
        assert_eq!(app.machine.stats().history(), &[RunResult::new(2, 1)]);
    }
}
