use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::DefaultTerminal;

use taskdeck_core::config::{config_path, ViewerConfig, CONFIG_FILE};
use taskdeck_core::migrate::{migrate_legacy, parse_shape, FileShape, DEFAULT_SESSION};
use taskdeck_core::store::{BACKUP_FILE, TASKS_FILE};
use taskdeck_core::task::Task;

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner cadence doubles as the redraw tick.
const TICK: Duration = Duration::from_millis(80);
/// How long a transient error stays on screen.
const ERROR_TTL: Duration = Duration::from_secs(3);

struct ErrorNotice {
    message: String,
    raised_at: Instant,
}

/// Read-only projection of one session's tasks.
///
/// The app never writes task data; the single exception is the defensive
/// legacy-array migration, mirroring the store's own (the store's locked
/// migration is authoritative if both race). Raw-content caches let a
/// refresh skip re-parsing when the watcher fires without a byte change.
pub struct App {
    dir: PathBuf,
    session_id: String,
    pub tasks: Vec<Task>,
    pub config: ViewerConfig,
    tasks_cache: Option<String>,
    config_cache: Option<String>,
    pub spinner_frame: usize,
    error: Option<ErrorNotice>,
    should_quit: bool,
}

impl App {
    pub fn new(dir: PathBuf, session_id: String) -> Self {
        let mut app = App {
            dir,
            session_id,
            tasks: Vec::new(),
            config: ViewerConfig::default(),
            tasks_cache: None,
            config_cache: None,
            spinner_frame: 0,
            error: None,
            should_quit: false,
        };
        app.refresh_config();
        app.refresh_tasks();
        app
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|notice| notice.message.as_str())
    }

    fn tasks_path(&self) -> PathBuf {
        self.dir.join(TASKS_FILE)
    }

    fn show_error(&mut self, message: String) {
        self.error = Some(ErrorNotice {
            message,
            raised_at: Instant::now(),
        });
    }

    /// Re-read `tasks.json`, keeping the last-known-good list on any
    /// failure. Returns true when the rendered task list changed.
    pub fn refresh_tasks(&mut self) -> bool {
        let path = self.tasks_path();
        if !path.exists() {
            if self.tasks_cache.as_deref() == Some("") {
                return false;
            }
            self.tasks.clear();
            self.tasks_cache = Some(String::new());
            return true;
        }

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            // Transient read failures happen mid-rename; keep what we have.
            Err(_) => return false,
        };
        if self.tasks_cache.as_deref() == Some(raw.as_str()) {
            return false;
        }

        match parse_shape(&raw) {
            Ok(FileShape::Sessions(sessions)) => {
                self.tasks = sessions.get(&self.session_id).cloned().unwrap_or_default();
                self.tasks_cache = Some(raw);
                true
            }
            Ok(FileShape::Legacy(legacy)) => {
                // Best-effort mirror of the store's migration; display works
                // either way, from the parsed array.
                match migrate_legacy(&raw, legacy.clone(), &path, &self.dir.join(BACKUP_FILE)) {
                    Ok(sessions) => {
                        self.tasks_cache =
                            serde_json::to_string_pretty(&sessions).ok();
                    }
                    Err(err) => {
                        self.tasks_cache = Some(raw);
                        self.show_error(format!("Migration failed: {err}"));
                    }
                }
                self.tasks = if self.session_id == DEFAULT_SESSION {
                    legacy
                } else {
                    Vec::new()
                };
                true
            }
            Err(err) => {
                // Corrupt or half-written content: keep last-known-good.
                self.show_error(format!("Task file error: {err}"));
                false
            }
        }
    }

    /// Re-read `config.json`; missing or unparsable config falls back to
    /// the built-in defaults.
    pub fn refresh_config(&mut self) {
        let path = config_path(&self.dir);
        if !path.is_file() {
            if self.config_cache.is_some() {
                self.config = ViewerConfig::default();
                self.config_cache = None;
            }
            return;
        }
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return,
        };
        if self.config_cache.as_deref() == Some(raw.as_str()) {
            return;
        }
        match serde_json::from_str::<ViewerConfig>(&raw) {
            Ok(config) => {
                self.config = config;
                self.config_cache = Some(raw);
            }
            Err(err) => {
                self.config = ViewerConfig::default();
                self.config_cache = Some(raw);
                self.show_error(format!("Config error: {err}"));
            }
        }
    }

    /// Advance the spinner and expire a stale error notice.
    pub fn tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        if let Some(notice) = &self.error {
            if notice.raised_at.elapsed() > ERROR_TTL {
                self.error = None;
            }
        }
    }

    fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match (key.code, key.modifiers) {
            (KeyCode::Char('q') | KeyCode::Esc, _)
            | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn is_watched(&self, event_path: &Path) -> bool {
        event_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == TASKS_FILE || name == CONFIG_FILE)
            .unwrap_or(false)
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let (tx, rx) = mpsc::channel::<notify::Event>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if let Ok(event) = res {
                    let _ = tx.send(event);
                }
            },
            notify::Config::default(),
        )?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;

        loop {
            terminal.draw(|frame| crate::ui::draw(frame, self))?;

            if event::poll(TICK)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }

            let mut touched = false;
            while let Ok(event) = rx.try_recv() {
                touched |= event.paths.iter().any(|path| self.is_watched(path));
            }
            if touched {
                self.refresh_config();
                self.refresh_tasks();
            }

            self.tick();
            if self.should_quit {
                return Ok(());
            }
        }
    }
}
