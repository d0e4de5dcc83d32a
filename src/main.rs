//! Warptris — falling-block puzzle game in the terminal where the grid inverts and scrolls under you.

mod app;
mod block;
mod events;
mod game;
mod grid;
mod highscores;
mod input;
mod loot;
mod shapes;
mod theme;
mod tile;
mod timers;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Options derived from CLI that affect game behaviour (grid size, timing, events).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: u16,
    pub height: u16,
    pub tick_rate: f64,
    /// Ticks between gravity steps.
    pub gravity: f64,
    /// Ticks between repeated moves while a key is held.
    pub repeat_interval: u32,
    /// Ticks before a held key starts repeating.
    pub repeat_delay: u32,
    /// Ticks a landed block waits before locking.
    pub lock_delay: u32,
    /// Locks before the first grid event.
    pub event_interval: f64,
    /// Blocks waiting behind the active one.
    pub queue_len: usize,
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 20,
            tick_rate: 20.0,
            gravity: 15.0,
            repeat_interval: 4,
            repeat_delay: 10,
            lock_delay: 22,
            event_interval: 15.0,
            queue_len: 3,
            seed: None,
        }
    }
}

impl From<&Args> for GameConfig {
    fn from(args: &Args) -> Self {
        Self {
            width: args.width.max(4),
            height: args.height.max(4),
            tick_rate: args.tick_rate,
            gravity: args.gravity,
            repeat_interval: args.repeat_interval.max(1),
            repeat_delay: args.repeat_delay.max(1),
            lock_delay: args.lock_delay,
            event_interval: args.event_interval,
            queue_len: args.queue_len.max(1),
            seed: args.seed,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        log::warn!("theme: {}, using defaults", e);
        theme::Theme::default()
    });
    let config = GameConfig::from(&args);
    let mut app = App::new(args, &config, theme);
    app.run()?;
    Ok(())
}

/// The terminal is in raw alternate-screen mode while playing, so logs only go to a file.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("could not open log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    log::info!("warptris {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}

/// Falling-block puzzle game in the terminal where the grid inverts and scrolls under you.
#[derive(Debug, Parser)]
#[command(
    name = "warptris",
    version,
    about = "Falling-block puzzle in the terminal. Every few locks the grid inverts, scrolls, or speeds up.",
    long_about = "Warptris is a terminal falling-block puzzle game.\n\n\
        Steer falling blocks into full rows to clear them. Every few locks a grid event fires: \
        the stack flips upside down, scrolls sideways, the queue grows or shrinks, or gravity \
        speeds up. The next event and its countdown are shown beside the board.\n\n\
        CONTROLS:\n  Left/Right, A/D, H/L  Move      Down, S, J   Soft drop\n  \
        Up, W, K, Space      Hard drop Esc / P      Pause\n  Enter                Select    Q            Quit\n\n\
        Hold a movement key to keep the block moving. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Playfield width in columns.
    #[arg(long, default_value = "10", value_name = "COLS")]
    pub width: u16,

    /// Playfield height in rows.
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub height: u16,

    /// Game logic ticks per second.
    #[arg(long, default_value = "20.0", value_name = "RATE")]
    pub tick_rate: f64,

    /// Starting gravity: ticks between one-row drops.
    #[arg(long, default_value = "15.0", value_name = "TICKS")]
    pub gravity: f64,

    /// Ticks between repeated moves while a movement key is held.
    #[arg(long, default_value = "4", value_name = "TICKS")]
    pub repeat_interval: u32,

    /// Ticks after the first press before a held key starts repeating.
    #[arg(long, default_value = "10", value_name = "TICKS")]
    pub repeat_delay: u32,

    /// Ticks a landed block waits before it locks.
    #[arg(long, default_value = "22", value_name = "TICKS")]
    pub lock_delay: u32,

    /// Locks before the first grid event; shrinks by 10% after every event.
    #[arg(long, default_value = "15.0", value_name = "LOCKS")]
    pub event_interval: f64,

    /// Number of upcoming blocks shown in the queue.
    #[arg(long, default_value = "3", value_name = "N")]
    pub queue_len: usize,

    /// Seed for the block and event generator (random if not set).
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// High score file. Defaults to $XDG_CONFIG_HOME/warptris/highscore.
    #[arg(long, value_name = "FILE")]
    pub highscore_file: Option<PathBuf>,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Skip main menu and start game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Write logs to this file (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_match_game_defaults() {
        let args = Args::try_parse_from(["warptris"]).unwrap();
        let config = GameConfig::from(&args);
        let defaults = GameConfig::default();
        assert_eq!((config.width, config.height), (defaults.width, defaults.height));
        assert_eq!(config.lock_delay, defaults.lock_delay);
        assert_eq!(config.repeat_delay, defaults.repeat_delay);
        assert_eq!(config.repeat_interval, defaults.repeat_interval);
        assert_eq!(config.queue_len, defaults.queue_len);
        assert!((config.gravity - defaults.gravity).abs() < f64::EPSILON);
        assert!((config.event_interval - defaults.event_interval).abs() < f64::EPSILON);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::try_parse_from([
            "warptris",
            "--width",
            "2",
            "--seed",
            "9",
            "--palette",
            "contrast",
            "--queue-len",
            "0",
        ])
        .unwrap();
        assert_eq!(args.palette, Palette::HighContrast);
        let config = GameConfig::from(&args);
        assert_eq!(config.width, 4);
        assert_eq!(config.queue_len, 1);
        assert_eq!(config.seed, Some(9));
    }
}
