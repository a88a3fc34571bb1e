pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use memobit::{
    config::{Config, ConfigStore, FileConfigStore},
    round::{Phase, RoundEngine, RoundOutcome},
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    TICK_RATE_MS,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use serde_json::{json, Value};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use webbrowser::Browser;

const CONFIG_POLL_MS: u64 = 500;

/// sleek memory-training tui
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A sleek memory-training TUI: a random sequence appears for a configurable moment, then you retype it from memory before the clock runs out. Win streaks build your score; your best streak is kept across sessions."
)]
pub struct Cli {
    /// directory holding the configuration and high-score documents
    #[clap(short = 'c', long)]
    config_dir: Option<PathBuf>,

    /// print the resolved configuration file path and exit
    #[clap(long)]
    show_config_path: bool,

    /// persist a new sequence length before starting
    #[clap(short = 'l', long)]
    length: Option<u64>,

    /// persist a new memorize duration in milliseconds before starting
    #[clap(short = 'm', long)]
    time_to_memorize: Option<u64>,

    /// persist a new input timeout in seconds before starting; zero or
    /// negative disables the countdown
    #[clap(short = 't', long, allow_negative_numbers = true)]
    timeout: Option<i64>,

    /// persist the digits 0-9 policy instead of only 0/1
    #[clap(long)]
    digits: bool,

    /// persist a custom character set to draw sequences from
    #[clap(long)]
    custom_chars: Option<String>,
}

impl Cli {
    /// Configuration fields supplied on the command line, as a merge-save
    /// overlay for the store.
    fn config_overlay(&self) -> serde_json::Map<String, Value> {
        let mut overlay = serde_json::Map::new();
        if let Some(length) = self.length {
            overlay.insert("length".to_string(), json!(length));
        }
        if let Some(ms) = self.time_to_memorize {
            overlay.insert("timeToMemorize".to_string(), json!(ms));
        }
        if let Some(secs) = self.timeout {
            overlay.insert("timeout".to_string(), json!(secs));
        }
        if self.digits {
            overlay.insert("allowNonBinaryDigits".to_string(), json!(true));
        }
        if let Some(ref chars) = self.custom_chars {
            overlay.insert("useCustomChars".to_string(), json!(true));
            overlay.insert("customChars".to_string(), json!(chars));
        }
        overlay
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppScreen {
    Game,
    Settings,
    Help,
    ConfirmReset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Banner {
    Won,
    Lost,
    Info(String),
    Error(String),
}

/// Settings rows in display order: configuration field key and label.
pub const SETTINGS_ROWS: [(&str, &str); 6] = [
    ("timeToMemorize", "Memorize time (ms)"),
    ("timeout", "Input timeout (s)"),
    ("length", "Sequence length"),
    ("allowNonBinaryDigits", "Digits 0-9"),
    ("useCustomChars", "Use custom characters"),
    ("customChars", "Custom characters"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsStatus {
    Saved,
    Error(String),
}

#[derive(Debug, Default)]
pub struct SettingsState {
    pub selected: usize,
    /// edit buffer for the selected row, present while editing
    pub editing: Option<String>,
    pub status: Option<SettingsStatus>,
}

#[derive(Debug)]
pub struct App {
    pub store: FileConfigStore,
    pub config: Config,
    pub engine: RoundEngine,
    pub screen: AppScreen,
    pub input: String,
    pub banner: Option<Banner>,
    pub settings: SettingsState,
}

fn partial(field: &str, value: Value) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(field.to_string(), value);
    Value::Object(map)
}

impl App {
    pub fn new(store: FileConfigStore) -> Result<Self, memobit::config::ConfigError> {
        let config = store.load()?;
        let high_score = store.high_score();
        Ok(Self {
            store,
            config,
            engine: RoundEngine::new(high_score),
            screen: AppScreen::Game,
            input: String::new(),
            banner: None,
            settings: SettingsState::default(),
        })
    }

    pub fn on_tick(&mut self) {
        if let Some(outcome) = self.engine.on_tick() {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: RoundOutcome) {
        self.input.clear();
        self.banner = Some(if outcome.won { Banner::Won } else { Banner::Lost });

        if outcome.high_score_beaten {
            if let Err(err) = self.store.set_high_score(outcome.high_score) {
                // the in-memory high score stays authoritative; a later
                // win retries the write
                log::error!("failed to persist high score: {err}");
                self.banner = Some(Banner::Error(format!("high score not saved: {err}")));
            }
        }
    }

    /// Replaces the configuration snapshot after the document changed on
    /// storage. A running round keeps the snapshot it started with.
    pub fn reload_config(&mut self) -> Result<(), memobit::config::ConfigError> {
        self.config = self.store.load()?;
        self.banner = Some(if self.engine.phase() == Phase::Idle {
            Banner::Info("configuration reloaded".to_string())
        } else {
            Banner::Info("configuration reloaded, applies next round".to_string())
        });
        Ok(())
    }

    fn start_round(&mut self) {
        self.banner = None;
        self.input.clear();
        self.engine.start_round(&self.config, &mut rand::thread_rng());
    }

    fn open_config_externally(&mut self) {
        let url = format!("file://{}", self.store.config_path().display());
        if !Browser::is_available() || webbrowser::open(&url).is_err() {
            self.banner = Some(Banner::Error(
                "could not open the configuration file".to_string(),
            ));
        }
    }

    /// Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        match self.screen {
            AppScreen::Game => self.handle_game_key(key),
            AppScreen::Settings => self.handle_settings_key(key),
            AppScreen::Help => {
                self.screen = AppScreen::Game;
                false
            }
            AppScreen::ConfirmReset => self.handle_confirm_reset_key(key),
        }
    }

    fn handle_game_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Enter => match self.engine.phase() {
                Phase::Idle => self.start_round(),
                Phase::AwaitingInput => {
                    if let Some(outcome) = self.engine.submit(&self.input) {
                        self.apply_outcome(outcome);
                    }
                }
                Phase::Memorizing => {}
            },
            KeyCode::Backspace => {
                if self.engine.phase() == Phase::AwaitingInput {
                    self.input.pop();
                }
            }
            KeyCode::Char(c) => match self.engine.phase() {
                Phase::AwaitingInput => self.input.push(c),
                Phase::Idle => match c {
                    'n' => self.start_round(),
                    's' => {
                        self.settings = SettingsState::default();
                        self.screen = AppScreen::Settings;
                    }
                    'h' | '?' => self.screen = AppScreen::Help,
                    'e' => self.open_config_externally(),
                    _ => {}
                },
                // input is disabled while the answer is visible
                Phase::Memorizing => {}
            },
            _ => {}
        }
        false
    }

    fn handle_settings_key(&mut self, key: KeyEvent) -> bool {
        if self.settings.editing.is_some() {
            match key.code {
                KeyCode::Esc => self.settings.editing = None,
                KeyCode::Enter => self.commit_edit(),
                KeyCode::Backspace => {
                    if let Some(buffer) = self.settings.editing.as_mut() {
                        buffer.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(buffer) = self.settings.editing.as_mut() {
                        buffer.push(c);
                    }
                }
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Esc => self.screen = AppScreen::Game,
            KeyCode::Up => self.settings.selected = self.settings.selected.saturating_sub(1),
            KeyCode::Down => {
                self.settings.selected = (self.settings.selected + 1).min(SETTINGS_ROWS.len() - 1);
            }
            KeyCode::Enter => self.activate_row(),
            KeyCode::Char('d') => self.screen = AppScreen::ConfirmReset,
            KeyCode::Char('e') => self.open_config_externally(),
            _ => {}
        }
        false
    }

    fn handle_confirm_reset_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('y') {
            match self.store.reset_to_default() {
                Ok(config) => {
                    self.config = config;
                    self.settings.status = Some(SettingsStatus::Saved);
                }
                Err(err) => self.settings.status = Some(SettingsStatus::Error(err.to_string())),
            }
        }
        self.screen = AppScreen::Settings;
        false
    }

    fn activate_row(&mut self) {
        let (field, _) = SETTINGS_ROWS[self.settings.selected];
        match field {
            "allowNonBinaryDigits" => {
                self.save_partial(partial(field, json!(!self.config.allow_non_binary_digits)));
            }
            "useCustomChars" => {
                self.save_partial(partial(field, json!(!self.config.use_custom_chars)));
            }
            _ => self.settings.editing = Some(self.current_value_text(field)),
        }
    }

    fn current_value_text(&self, field: &str) -> String {
        match field {
            "timeToMemorize" => self.config.time_to_memorize.to_string(),
            "timeout" => self.config.timeout.to_string(),
            "length" => self.config.length.to_string(),
            "customChars" => self.config.custom_chars.clone(),
            _ => String::new(),
        }
    }

    fn commit_edit(&mut self) {
        let buffer = match self.settings.editing.take() {
            Some(buffer) => buffer,
            None => return,
        };
        let (field, label) = SETTINGS_ROWS[self.settings.selected];

        let value = if field == "customChars" {
            json!(buffer)
        } else {
            match buffer.trim().parse::<i64>() {
                Ok(n) => json!(n),
                Err(_) => {
                    self.settings.status =
                        Some(SettingsStatus::Error(format!("{label}: expected an integer")));
                    return;
                }
            }
        };

        self.save_partial(partial(field, value));
    }

    fn save_partial(&mut self, update: Value) {
        match self.store.save(&update) {
            Ok(config) => {
                self.config = config;
                self.settings.status = Some(SettingsStatus::Saved);
            }
            // surfaced in the status line; the persisted document is
            // untouched on validation failure
            Err(err) => self.settings.status = Some(SettingsStatus::Error(err.to_string())),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let store = match cli.config_dir.as_ref() {
        Some(dir) => FileConfigStore::in_dir(dir),
        None => FileConfigStore::new(),
    };

    if cli.show_config_path {
        println!("{}", store.config_path().display());
        return Ok(());
    }

    let overlay = cli.config_overlay();
    if !overlay.is_empty() {
        if let Err(err) = store.save(&Value::Object(overlay)) {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, err.to_string()).exit();
        }
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(store)?;
    let res = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    res
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    let source = CrosstermEventSource::new();

    // watcher notifications ride the same serialized queue as key events
    let config_tx = source.sender();
    let _watch = app
        .store
        .subscribe(Duration::from_millis(CONFIG_POLL_MS), move || {
            let _ = config_tx.send(AppEvent::ConfigChanged);
        });

    let runner = Runner::new(source, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    loop {
        terminal.draw(|f| ui(app, f))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::ConfigChanged => app.reload_config()?,
            AppEvent::Key(key) => {
                if app.handle_key(key) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    f.render_widget(&*app, f.area());
}
