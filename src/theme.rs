//! Board colours, optionally read from a btop-style theme file.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colours, indexed by `Block::colour`.
    pub blocks: [Color; 6],
    /// Board and popup background.
    pub board: Color,
    /// Borders and empty-cell dots.
    pub border: Color,
    pub text: Color,
    /// Panel titles, labels and the selected menu entry.
    pub accent: Color,
    pub dim: Color,
    /// Spawn-buffer strip above row 0.
    pub danger: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex colour: {0}")]
    InvalidHex(String),
}

const ONEDARK_BLOCKS: [Color; 6] = [
    Color::Rgb(0x98, 0xC3, 0x79), // green
    Color::Rgb(0xE5, 0xC0, 0x7B), // yellow
    Color::Rgb(0xE0, 0x6C, 0x75), // red
    Color::Rgb(0x61, 0xAF, 0xEF), // blue
    Color::Rgb(0xC6, 0x78, 0xDD), // magenta
    Color::Rgb(0x56, 0xB6, 0xC2), // cyan
];
const ONEDARK_BOARD: Color = Color::Rgb(0x31, 0x35, 0x3F);
const ONEDARK_BORDER: Color = Color::Rgb(0x3F, 0x44, 0x4F);
const ONEDARK_TEXT: Color = Color::Rgb(0xAB, 0xB2, 0xBF);
const ONEDARK_ACCENT: Color = Color::Rgb(0xE5, 0xC0, 0x7B);
const ONEDARK_DIM: Color = Color::Rgb(0x5C, 0x63, 0x70);
const ONEDARK_DANGER: Color = Color::Rgb(0x4B, 0x2A, 0x30);

/// Theme keys tried in order for each block colour.
const BLOCK_KEYS: [&[&str]; 6] = [
    &["mem_box", "cpu_start"],
    &["title", "cpu_mid"],
    &["cpu_end", "temp_end"],
    &["cpu_box"],
    &["net_box"],
    &["hi_fg", "proc_misc"],
];

impl Default for Theme {
    fn default() -> Self {
        Self {
            blocks: ONEDARK_BLOCKS,
            board: ONEDARK_BOARD,
            border: ONEDARK_BORDER,
            text: ONEDARK_TEXT,
            accent: ONEDARK_ACCENT,
            dim: ONEDARK_DIM,
            danger: ONEDARK_DANGER,
        }
    }
}

impl Theme {
    /// Reads `theme[key]="value"` lines from `path`; unknown or malformed keys
    /// keep their One Dark colour. A missing file gives the default theme.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let map = parse_theme_file(&std::fs::read_to_string(p)?);
                log::info!("loaded theme {} ({} keys)", p.display(), map.len());
                Self::from_map(&map)
            }
            Some(p) => {
                log::warn!("theme file {} not found, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Swaps in fixed block colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.blocks = [
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0x00, 0xFF, 0xFF),
                ];
                self.danger = Color::Rgb(0x66, 0x00, 0x00);
            }
            crate::Palette::Colorblind => {
                // Paul Tol's bright scheme
                self.blocks = [
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0xEE, 0x77, 0x33),
                    Color::Rgb(0x00, 0x99, 0x88),
                    Color::Rgb(0xCC, 0x33, 0x11),
                    Color::Rgb(0xEE, 0x33, 0x77),
                    Color::Rgb(0xBB, 0xBB, 0x00),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        let mut theme = Self::default();
        for (slot, keys) in theme.blocks.iter_mut().zip(BLOCK_KEYS) {
            if let Some(c) = keys.iter().find_map(|k| get(*k)) {
                *slot = c;
            }
        }
        let fields = [
            (&mut theme.board, "meter_bg"),
            (&mut theme.border, "div_line"),
            (&mut theme.text, "main_fg"),
            (&mut theme.accent, "title"),
            (&mut theme.dim, "inactive_fg"),
            (&mut theme.danger, "selected_bg"),
        ];
        for (field, key) in fields {
            if let Some(c) = get(key) {
                *field = c;
            }
        }
        theme
    }

    #[inline]
    pub fn block_color(&self, index: u8) -> Color {
        self.blocks[usize::from(index) % self.blocks.len()]
    }
}

/// `theme[key]="value"` (or single-quoted) lines into a key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.strip_prefix("theme[")?.split_once(']')?;
            let value = value.trim().strip_prefix('=')?.trim();
            let value = value.trim_matches(['"', '\'']);
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// "#RRGGBB" or "#RGB".
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Palette;

    #[test]
    fn test_hex_long_and_short_forms() {
        assert_eq!(parse_hex("#E06C75").unwrap(), Color::Rgb(0xE0, 0x6C, 0x75));
        assert_eq!(parse_hex(" a0f ").unwrap(), Color::Rgb(0xAA, 0x00, 0xFF));
    }

    #[test]
    fn test_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
        assert!(parse_hex("").is_err());
    }

    #[test]
    fn test_theme_file_lines() {
        let map = parse_theme_file(
            "# comment\ntheme[div_line] = \"#3F444F\"\ntheme[title]=''\nnot a theme line\n",
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("div_line").map(String::as_str), Some("#3F444F"));
    }

    #[test]
    fn test_theme_from_file_overrides_and_falls_back() {
        let map = parse_theme_file(
            "theme[main_fg]='#010203'\ntheme[cpu_box]=\"bogus\"\ntheme[cpu_mid]=\"#FFF\"\n",
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.text, Color::Rgb(1, 2, 3));
        assert_eq!(theme.blocks[1], Color::Rgb(255, 255, 255));
        assert_eq!(theme.blocks[3], ONEDARK_BLOCKS[3]);
        assert_eq!(theme.board, ONEDARK_BOARD);
    }

    #[test]
    fn test_palette_and_block_color_wraps() {
        let mut theme = Theme::default();
        theme.apply_palette(Palette::HighContrast);
        assert_eq!(theme.block_color(2), Color::Rgb(0xFF, 0x00, 0x00));
        assert_eq!(theme.block_color(8), theme.block_color(2));
        let missing = Theme::load(Some(Path::new("/nonexistent/warptris.theme")), Palette::Normal).unwrap();
        assert_eq!(missing.text, ONEDARK_TEXT);
    }
}
