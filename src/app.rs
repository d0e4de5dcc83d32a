//! App: terminal init, scenes, main loop and key handling.

use crate::game::{GameState, SceneSignal};
use crate::highscores::{self, HighScoreStore};
use crate::input::{Action, InputState};
use crate::theme::Theme;
use crate::ui::{self, LineFlash, View};
use crate::{Args, GameConfig};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEvent};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Longest frame delta fed to the game; longer stalls are dropped.
const MAX_FRAME_DT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    Paused,
    GameOver { new_high_score: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    Start,
    Quit,
}

impl MenuOption {
    fn toggle(self) -> Self {
        match self {
            Self::Start => Self::Quit,
            Self::Quit => Self::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOption {
    Resume,
    MainMenu,
    Quit,
}

impl PauseOption {
    fn next(self) -> Self {
        match self {
            Self::Resume => Self::MainMenu,
            Self::MainMenu => Self::Quit,
            Self::Quit => Self::Resume,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Resume => Self::Quit,
            Self::MainMenu => Self::Resume,
            Self::Quit => Self::MainMenu,
        }
    }
}

pub struct App {
    args: Args,
    theme: Theme,
    store: HighScoreStore,
    /// Best score on disk.
    best: u32,
    state: GameState,
    screen: Screen,
    input: InputState,
    flash: LineFlash,
    menu_selected: MenuOption,
    pause_selected: PauseOption,
    last_frame: Instant,
}

impl App {
    pub fn new(args: Args, config: &GameConfig, theme: Theme) -> Self {
        let store = HighScoreStore::new(
            args.highscore_file
                .clone()
                .unwrap_or_else(highscores::default_path),
        );
        let best = store.load();
        log::info!("high score {} from {}", best, store.path().display());
        let state = GameState::new(config, best);
        let screen = if args.no_menu { Screen::Playing } else { Screen::Menu };
        Self {
            args,
            theme,
            store,
            best,
            state,
            screen,
            input: InputState::new(false),
            flash: LineFlash::default(),
            menu_selected: MenuOption::Start,
            pause_selected: PauseOption::Resume,
            last_frame: Instant::now(),
        }
    }

    fn reset_game(&mut self) {
        self.state.reset(self.best);
        self.screen = Screen::Playing;
        self.flash.clear();
        self.input.clear();
        self.last_frame = Instant::now();
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events make held keys exact; without them holds time out.
        let releases = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);
        if releases {
            let _ = execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            );
        }
        log::info!("keyboard release events: {}", releases);
        self.input = InputState::new(releases);

        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;
        let result = self.run_loop(&mut terminal);

        if releases {
            let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        }
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_rate = if self.args.frame_rate.is_finite() && self.args.frame_rate > 0.0 {
            self.args.frame_rate
        } else {
            30.0
        };
        let frame_duration = Duration::from_secs_f64(1.0 / frame_rate);
        self.last_frame = Instant::now();

        loop {
            let now = Instant::now();
            let view = View {
                screen: self.screen,
                theme: &self.theme,
                menu_selected: self.menu_selected,
                pause_selected: self.pause_selected,
                best: self.best,
            };
            terminal.draw(|f| ui::draw(f, &view, &self.state, &mut self.flash, self.args.no_animation))?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key) {
                            return Ok(());
                        }
                    }
                }
            }

            let frame_start = Instant::now();
            let dt = frame_start.saturating_duration_since(self.last_frame).min(MAX_FRAME_DT);
            self.last_frame = frame_start;

            if self.screen == Screen::Playing {
                let snapshot = self.input.snapshot(frame_start);
                let signal = self
                    .state
                    .update(dt, &snapshot)
                    .context("grid event failed")?;
                let cleared = self.state.take_cleared_rows();
                if !cleared.is_empty() {
                    self.flash.start(cleared);
                }
                self.handle_signal(signal);
            }
        }
    }

    fn handle_signal(&mut self, signal: SceneSignal) {
        match signal {
            SceneSignal::Continue => {}
            SceneSignal::Pause => {
                self.screen = Screen::Paused;
                self.pause_selected = PauseOption::Resume;
                self.input.clear();
            }
            SceneSignal::GameOver { score, new_high_score } => {
                if let Err(e) = self.store.save_if_higher(score) {
                    log::error!("{}", e);
                }
                self.best = self.best.max(score);
                self.screen = Screen::GameOver { new_high_score };
                self.input.clear();
            }
        }
    }

    /// Routes one key event to the current screen. Returns true to quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let action = self.input.handle_key(key, Instant::now());
        if action == Action::None {
            return false;
        }
        match self.screen {
            Screen::Menu => match action {
                Action::HardDrop | Action::SoftDrop | Action::MoveLeft | Action::MoveRight => {
                    self.menu_selected = self.menu_selected.toggle();
                }
                Action::Confirm => match self.menu_selected {
                    MenuOption::Start => self.reset_game(),
                    MenuOption::Quit => return true,
                },
                Action::Quit | Action::Cancel => return true,
                _ => {}
            },
            // Moves and pause reach the game through the next snapshot.
            Screen::Playing => {
                if action == Action::Quit {
                    self.screen = Screen::Paused;
                    self.pause_selected = PauseOption::Quit;
                    self.input.clear();
                }
            }
            Screen::Paused => match action {
                Action::SoftDrop | Action::MoveRight => self.pause_selected = self.pause_selected.next(),
                Action::HardDrop | Action::MoveLeft => self.pause_selected = self.pause_selected.prev(),
                Action::Confirm => match self.pause_selected {
                    PauseOption::Resume => self.resume(),
                    PauseOption::MainMenu => {
                        self.screen = Screen::Menu;
                        self.menu_selected = MenuOption::Start;
                    }
                    PauseOption::Quit => return true,
                },
                Action::Cancel => self.resume(),
                Action::Quit => return true,
                _ => {}
            },
            Screen::GameOver { .. } => match action {
                Action::Restart | Action::Confirm => self.reset_game(),
                Action::Cancel => {
                    self.screen = Screen::Menu;
                    self.menu_selected = MenuOption::Start;
                }
                Action::Quit => return true,
                _ => {}
            },
        }
        false
    }

    fn resume(&mut self) {
        self.screen = Screen::Playing;
        self.input.clear();
        self.last_frame = Instant::now();
    }
}
