mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use cubik::{
    app_dirs::AppDirs,
    clock::ClockError,
    config::{Config, ConfigError, ConfigStore, FileConfigStore},
    format::FieldFormat,
    logging::LoggingSystem,
    runtime::{CrosstermEventSource, CubeEvent, CubeEventSource},
    scheduler::{Scheduler, ThreadScheduler},
    session::Session,
    time::{MonotonicTimeSource, TimeSource},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    sync::mpsc::Sender,
};

/// speedcubing timer tui with scrambles and trimmed averages
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A speedcubing timer for the terminal. Hold and release space to start, press space to stop. Shows a fresh scramble for every attempt and keeps session statistics including a trimmed mean."
)]
pub struct Cli {
    /// milliseconds between stopwatch display updates
    #[clap(short = 'i', long)]
    interval_ms: Option<u64>,

    /// number of moves in each scramble
    #[clap(short = 'n', long)]
    scramble_length: Option<usize>,

    /// minimum width of the millisecond field before trimming
    #[clap(long)]
    ms_digits: Option<usize>,

    /// characters cut from the end of the millisecond field (1 shows hundredths)
    #[clap(long)]
    ms_trim: Option<usize>,

    /// read settings from this file instead of the default config location
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Layer command line flags over the loaded config
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(interval_ms) = self.interval_ms {
            cfg.interval_ms = interval_ms;
        }
        if let Some(scramble_length) = self.scramble_length {
            cfg.scramble_length = scramble_length;
        }
        if self.ms_digits.is_some() || self.ms_trim.is_some() {
            let current = cfg.time_format().ms;
            cfg.time_format.ms = Some(FieldFormat::new(
                self.ms_digits.unwrap_or(current.digits),
                self.ms_trim.unwrap_or(current.trim),
            ));
        }
        cfg
    }

    fn config_store(&self) -> FileConfigStore {
        self.config
            .as_ref()
            .map(FileConfigStore::with_path)
            .unwrap_or_default()
    }

    /// Config file plus flags, saved back when `--save-config` is given
    fn settle_config<C: ConfigStore>(&self, store: &C) -> Result<Config, ConfigError> {
        let config = self.apply(store.load()?);
        config.validate()?;
        if self.save_config {
            store.save(&config)?;
            tracing::info!(?config, "config saved");
        }
        Ok(config)
    }
}

pub struct App<T: TimeSource = MonotonicTimeSource, S: Scheduler = ThreadScheduler> {
    pub session: Session<T, S>,
    /// whether the terminal delivers key release events
    pub reports_release: bool,
}

impl App {
    pub fn new(config: &Config, ticks: Sender<CubeEvent>, reports_release: bool) -> Self {
        Self::with_collaborators(
            config,
            MonotonicTimeSource::new(),
            ThreadScheduler::new(),
            ticks,
            reports_release,
        )
    }
}

impl<T: TimeSource, S: Scheduler> App<T, S> {
    pub fn with_collaborators(
        config: &Config,
        time: T,
        scheduler: S,
        ticks: Sender<CubeEvent>,
        reports_release: bool,
    ) -> Self {
        Self {
            session: Session::from_config(&config.session_config(), time, scheduler, ticks),
            reports_release,
        }
    }

    /// Returns `false` once the user asked to quit
    pub fn handle_event(&mut self, event: CubeEvent) -> Result<bool, ClockError> {
        match event {
            CubeEvent::Tick(elapsed) => {
                self.session.on_tick(elapsed);
                Ok(true)
            }
            CubeEvent::Resize => Ok(true),
            CubeEvent::Key(key) => self.handle_key(key),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool, ClockError> {
        let pressed = key.kind == KeyEventKind::Press;

        if pressed
            && (key.code == KeyCode::Esc
                // ctrl+c to quit
                || (key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')))
        {
            return Ok(false);
        }

        match key.code {
            KeyCode::Char(' ') => match (self.reports_release, key.kind) {
                (true, KeyEventKind::Press) => self.session.key_down(),
                (true, KeyEventKind::Release) => {
                    self.session.key_up()?;
                }
                (false, KeyEventKind::Press) => {
                    self.session.press()?;
                }
                _ => {}
            },
            KeyCode::Char('n') if pressed => self.session.new_scramble(),
            _ => {}
        }
        Ok(true)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(dir) = AppDirs::state_dir() {
        if let Err(e) = LoggingSystem::from_env(dir).apply() {
            eprintln!("logging disabled: {e}");
        }
    }

    let config = cli.settle_config(&cli.config_store())?;

    enable_raw_mode()?;
    let reports_release = supports_keyboard_enhancement().unwrap_or(false);

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if reports_release {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = CrosstermEventSource::new();
    let mut app = App::new(&config, events.sender(), reports_release);
    tracing::info!(?config, reports_release, "session started");
    let result = start_tui(&mut terminal, &mut app, &events);

    if reports_release {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: CubeEventSource, T: TimeSource, S: Scheduler>(
    terminal: &mut Terminal<B>,
    app: &mut App<T, S>,
    events: &E,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    while app.handle_event(events.recv()?)? {
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui<T: TimeSource, S: Scheduler>(app: &App<T, S>, f: &mut Frame) {
    f.render_widget(app, f.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use cubik::{
        runtime::TestEventSource, scheduler::ManualScheduler, session::Phase,
        time::ManualTimeSource,
    };
    use std::time::Duration;

    struct Fixture {
        app: App<ManualTimeSource, ManualScheduler>,
        time: ManualTimeSource,
        events: TestEventSource,
    }

    fn fixture(reports_release: bool) -> Fixture {
        let time = ManualTimeSource::new(0);
        let events = TestEventSource::new();
        let app = App::with_collaborators(
            &Config::default(),
            time.clone(),
            ManualScheduler::new(),
            events.sender(),
            reports_release,
        );
        Fixture { app, time, events }
    }

    fn key(code: KeyCode, kind: KeyEventKind) -> CubeEvent {
        CubeEvent::Key(KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind))
    }

    fn space(kind: KeyEventKind) -> CubeEvent {
        key(KeyCode::Char(' '), kind)
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["cubik"]);

        assert_eq!(cli.interval_ms, None);
        assert_eq!(cli.scramble_length, None);
        assert_eq!(cli.ms_digits, None);
        assert_eq!(cli.ms_trim, None);
        assert_eq!(cli.config, None);
        assert!(!cli.save_config);
        assert_eq!(cli.apply(Config::default()), Config::default());
    }

    #[test]
    fn test_cli_interval_and_scramble_length() {
        let cli = Cli::parse_from(["cubik", "-i", "10", "-n", "20"]);
        assert_eq!(cli.interval_ms, Some(10));
        assert_eq!(cli.scramble_length, Some(20));

        let cli = Cli::parse_from(["cubik", "--interval-ms", "100", "--scramble-length", "30"]);
        let cfg = cli.apply(Config::default());
        assert_eq!(cfg.interval_ms, 100);
        assert_eq!(cfg.scramble_length, 30);
    }

    #[test]
    fn test_cli_ms_flags_override_one_part_each() {
        let cli = Cli::parse_from(["cubik", "--ms-trim", "0"]);
        let cfg = cli.apply(Config::default());
        assert_eq!(cfg.time_format.ms, Some(FieldFormat::new(3, 0)));

        let cli = Cli::parse_from(["cubik", "--ms-digits", "4", "--ms-trim", "2"]);
        let cfg = cli.apply(Config::default());
        assert_eq!(cfg.time_format.ms, Some(FieldFormat::new(4, 2)));
        assert_eq!(cfg.time_format.sec, None);
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::parse_from(["cubik", "-c", "/tmp/cubik.json"]);
        assert_eq!(
            cli.config_store().path(),
            std::path::Path::new("/tmp/cubik.json")
        );
    }

    #[test]
    fn test_save_config_writes_effective_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);

        let cli = Cli::parse_from(["cubik", "-n", "12", "--ms-trim", "0"]);
        let cfg = cli.settle_config(&store).unwrap();
        assert_eq!(cfg.scramble_length, 12);
        assert!(!path.exists());

        let cli = Cli::parse_from(["cubik", "-n", "12", "--ms-trim", "0", "--save-config"]);
        cli.settle_config(&store).unwrap();

        let saved = store.load().unwrap();
        assert_eq!(saved.scramble_length, 12);
        assert_eq!(saved.time_format.ms, Some(FieldFormat::new(3, 0)));
        // flags are not needed once saved
        let cfg = Cli::parse_from(["cubik"]).settle_config(&store).unwrap();
        assert_eq!(cfg, saved);
    }

    #[test]
    fn test_settle_config_rejects_zero_interval() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cli = Cli::parse_from(["cubik", "-i", "0", "--save-config"]);

        assert!(matches!(
            cli.settle_config(&store),
            Err(ConfigError::InvalidInterval)
        ));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_cli_flags_beat_config_file() {
        let cli = Cli::parse_from(["cubik", "-n", "5"]);
        let file_cfg = Config {
            scramble_length: 40,
            interval_ms: 20,
            ..Default::default()
        };

        let cfg = cli.apply(file_cfg);
        assert_eq!(cfg.scramble_length, 5);
        assert_eq!(cfg.interval_ms, 20);
    }

    #[test]
    fn test_app_new_uses_config() {
        let cfg = Config {
            scramble_length: 12,
            ..Default::default()
        };
        let events = TestEventSource::new();
        let app = App::new(&cfg, events.sender(), false);

        assert_eq!(app.session.scramble().len(), 12);
        assert_eq!(app.session.phase(), Phase::Idle);
        assert!(!app.reports_release);
    }

    #[test]
    fn test_press_toggles_without_release_events() {
        let mut f = fixture(false);

        assert!(f.app.handle_event(space(KeyEventKind::Press)).unwrap());
        assert_eq!(f.app.session.phase(), Phase::Running);

        f.time.advance(Duration::from_millis(8_765));
        assert!(f.app.handle_event(space(KeyEventKind::Press)).unwrap());

        assert_eq!(f.app.session.phase(), Phase::Idle);
        assert_eq!(f.app.session.log().runs(), &[8_765]);
    }

    #[test]
    fn test_hold_and_release_with_release_events() {
        let mut f = fixture(true);

        f.app.handle_event(space(KeyEventKind::Press)).unwrap();
        assert_eq!(f.app.session.phase(), Phase::Armed);
        f.app.handle_event(space(KeyEventKind::Repeat)).unwrap();
        assert_eq!(f.app.session.phase(), Phase::Armed);
        f.app.handle_event(space(KeyEventKind::Release)).unwrap();
        assert_eq!(f.app.session.phase(), Phase::Running);

        f.time.advance(Duration::from_millis(3_000));
        f.app.handle_event(space(KeyEventKind::Press)).unwrap();
        assert_eq!(f.app.session.phase(), Phase::Running);
        f.app.handle_event(space(KeyEventKind::Release)).unwrap();

        assert_eq!(f.app.session.phase(), Phase::Idle);
        assert_eq!(f.app.session.log().runs(), &[3_000]);
    }

    #[test]
    fn test_ticks_update_display() {
        let mut f = fixture(false);

        f.app.handle_event(space(KeyEventKind::Press)).unwrap();
        f.app.handle_event(CubeEvent::Tick(1_290)).unwrap();

        assert_eq!(f.app.session.display().to_string(), "0:01.29");
    }

    #[test]
    fn test_quit_keys() {
        let mut f = fixture(false);

        assert!(!f
            .app
            .handle_event(key(KeyCode::Esc, KeyEventKind::Press))
            .unwrap());
        assert!(!f
            .app
            .handle_event(CubeEvent::Key(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            )))
            .unwrap());
        // a release of esc is not a quit request
        assert!(f
            .app
            .handle_event(key(KeyCode::Esc, KeyEventKind::Release))
            .unwrap());
    }

    #[test]
    fn test_n_refreshes_scramble() {
        let mut f = fixture(false);
        let before = f.app.session.scramble().clone();

        f.app
            .handle_event(key(KeyCode::Char('n'), KeyEventKind::Press))
            .unwrap();

        assert_ne!(f.app.session.scramble(), &before);
    }

    #[test]
    fn test_start_tui_runs_until_escape() {
        use ratatui::backend::TestBackend;

        let mut f = fixture(false);
        let tx = f.events.sender();
        tx.send(space(KeyEventKind::Press)).unwrap();
        tx.send(CubeEvent::Tick(43)).unwrap();
        tx.send(space(KeyEventKind::Press)).unwrap();
        tx.send(CubeEvent::Resize).unwrap();
        tx.send(key(KeyCode::Esc, KeyEventKind::Press)).unwrap();

        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        start_tui(&mut terminal, &mut f.app, &f.events).unwrap();

        assert_eq!(f.app.session.log().count(), 1);
        let content: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(content.contains("0:00.00"));
    }

    #[test]
    fn test_ui_function_renders_scramble() {
        use ratatui::backend::TestBackend;

        let f = fixture(false);
        let first_move = f.app.session.scramble().moves()[0].to_string();
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();

        terminal.draw(|frame| ui(&f.app, frame)).unwrap();

        let content: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(content.contains(&first_move));
        assert!(content.contains("0:00.00"));
    }
}
