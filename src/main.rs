mod ui;

use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use keypace::{
    clock::{Clock, SystemClock},
    config::{ConfigStore, FileConfigStore},
    highlight::KeyboardHighlight,
    runtime::{AppEvent, CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    script::is_base_letter,
    Dispatch, EngineConfig, EngineListener, KeyboardLayoutMap, LayoutId, RawKeyEvent, SessionStatus,
    TypingEngine, TypingStats,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

const DEFAULT_PROMPT: &str = "the quick brown fox jumps over the lazy dog";

/// terminal typing practice on top of the keypace engine
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// text to practice
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// allow correcting mistakes with backspace
    #[clap(long, overrides_with = "no_allow_backspace")]
    allow_backspace: bool,

    /// forbid backspace even if the saved options allow it
    #[clap(long, overrides_with = "allow_backspace")]
    no_allow_backspace: bool,

    /// treat upper and lower case as different characters
    #[clap(long, overrides_with = "no_case_sensitive")]
    case_sensitive: bool,

    /// fold case even if the saved options are case sensitive
    #[clap(long, overrides_with = "case_sensitive")]
    no_case_sensitive: bool,

    /// keyboard layout the text is written for (en-qwerty, he-standard)
    #[clap(short = 'l', long)]
    layout: Option<LayoutId>,

    /// keep appending the prompt so the session never ends
    #[clap(long)]
    endless: bool,

    /// show currently held keys (needs a terminal that reports key releases)
    #[clap(long)]
    track_keys: bool,

    /// persist the effective engine options as the new defaults
    #[clap(long)]
    save_config: bool,

    /// write logs here instead of discarding them
    #[clap(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// CLI flags win over stored options
    fn engine_config(&self, stored: EngineConfig) -> EngineConfig {
        EngineConfig {
            allow_backspace: toggle(
                self.allow_backspace,
                self.no_allow_backspace,
                stored.allow_backspace,
            ),
            case_sensitive: toggle(
                self.case_sensitive,
                self.no_case_sensitive,
                stored.case_sensitive,
            ),
            expected_layout: self.layout.or(stored.expected_layout),
        }
    }
}

fn toggle(on: bool, off: bool, stored: bool) -> bool {
    match (on, off) {
        (true, _) => true,
        (_, true) => false,
        _ => stored,
    }
}

/// Held keys can only be shown when the terminal reports releases
fn key_tracking(requested: bool, releases_reported: bool) -> bool {
    if requested && !releases_reported {
        log::warn!("terminal does not report key releases, not tracking held keys");
        return false;
    }
    requested
}

/// Collects engine callbacks for the render loop
#[derive(Debug, Default)]
pub struct HarnessListener {
    pub last_mismatch: Option<LayoutId>,
    pub reset_requested: bool,
    pub completed: Option<TypingStats>,
}

impl EngineListener for HarnessListener {
    fn on_character_typed(&mut self, _typed: char, _correct: bool) {
        self.last_mismatch = None;
    }

    fn on_complete(&mut self, stats: &TypingStats) {
        self.completed = Some(stats.clone());
    }

    fn on_layout_mismatch(&mut self, detected: LayoutId) {
        self.last_mismatch = Some(detected);
    }

    fn on_reset(&mut self) {
        self.reset_requested = true;
    }
}

pub struct App {
    pub engine: TypingEngine<HarnessListener>,
    pub highlight: KeyboardHighlight,
    pub prompt: String,
    pub endless: bool,
}

impl App {
    fn new(cli: &Cli, config: EngineConfig, track_keys: bool) -> Result<Self, Box<dyn Error>> {
        let layouts = Arc::new(KeyboardLayoutMap::builtin()?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let prompt = cli.prompt.clone().unwrap_or_else(|| DEFAULT_PROMPT.to_string());

        let guide_layout = config
            .expected_layout
            .or_else(|| {
                prompt
                    .chars()
                    .find(|c| is_base_letter(*c))
                    .and_then(|c| layouts.detect_layout(c))
            })
            .unwrap_or(LayoutId::EnglishQwerty);

        let mut highlight = KeyboardHighlight::new(layouts.clone(), guide_layout, clock.clone());
        highlight.set_tracking(track_keys);

        let mut engine = TypingEngine::new(config, layouts, clock, HarnessListener::default());
        engine.set_target_text(&prompt);

        Ok(Self {
            engine,
            highlight,
            prompt,
            endless: cli.endless,
        })
    }

    fn restart(&mut self) {
        self.engine.reset(Some(&self.prompt));
        *self.engine.listener_mut() = HarnessListener::default();
        self.highlight.clear();
    }

    fn on_key(&mut self, raw: &RawKeyEvent) -> bool {
        self.highlight.observe(raw);
        if raw.modifiers.ctrl && raw.key == "c" {
            return false;
        }

        match self.engine.handle_key(raw) {
            Dispatch::Escape => return false,
            Dispatch::Typed {
                typed,
                expected,
                correct,
            } => {
                if correct {
                    self.highlight.flash_correct(&expected.to_string());
                } else {
                    self.highlight.flash_wrong(&typed.to_string());
                }
            }
            Dispatch::Enter if self.engine.status() == SessionStatus::Complete => self.restart(),
            _ => {}
        }

        if std::mem::take(&mut self.engine.listener_mut().reset_requested) {
            self.restart();
        }
        true
    }

    fn top_up_endless(&mut self) {
        if !self.endless {
            return;
        }
        let session = self.engine.session();
        let remaining = session.len() - session.cursor();
        if remaining <= self.prompt.chars().count() / 2 {
            let more = format!(" {}", self.prompt);
            self.engine.append_text(&more);
        }
    }
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let env = env_logger::Env::default();
    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)?;
            env_logger::Builder::from_env(env.default_filter_or("debug"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
        }
        // stderr would scribble over the alternate screen
        None => env_logger::Builder::from_env(env.default_filter_or("off")).init(),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let config = cli.engine_config(store.load());
    if cli.save_config {
        store.save(&config)?;
    }

    let enhanced = cli.track_keys && supports_keyboard_enhancement().unwrap_or(false);
    let mut app = App::new(&cli, config, key_tracking(cli.track_keys, enhanced))?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let result = start_tui(&mut terminal, &mut app, &runner);

    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        // completion reported by the previous event is finalized here
        app.engine.run_deferred();
        app.top_up_endless();
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            AppEvent::Tick => {
                app.engine.on_tick();
                app.highlight.on_tick();
            }
            AppEvent::Resize => {}
            AppEvent::Key(raw) => {
                if !app.on_key(&raw) {
                    break;
                }
            }
        }
    }
    Ok(())
}
