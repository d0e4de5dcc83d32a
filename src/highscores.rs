//! Persist the high score to disk (XDG config or ~/.config/warptris).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILENAME: &str = "highscore";

#[derive(Debug, Error)]
pub enum HighScoreError {
    #[error("could not write high score to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Returns the default high score path (config dir / warptris / highscore).
pub fn default_path() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("warptris").join(FILENAME)
}

/// Single non-negative integer stored as plain text.
#[derive(Debug, Clone)]
pub struct HighScoreStore {
    path: PathBuf,
}

impl HighScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored score. Missing or malformed content counts as 0 and
    /// the file is rewritten with `0`.
    pub fn load(&self) -> u32 {
        match fs::read_to_string(&self.path) {
            Ok(s) => match s.trim().parse::<u32>() {
                Ok(n) => return n,
                Err(e) => log::warn!("malformed high score in {}: {}", self.path.display(), e),
            },
            Err(e) => log::warn!("no high score at {}: {}", self.path.display(), e),
        }
        if let Err(e) = self.save(0) {
            log::warn!("{}", e);
        }
        0
    }

    /// Writes `score`, creating the config directory if needed.
    pub fn save(&self, score: u32) -> Result<(), HighScoreError> {
        let write = || -> io::Result<()> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.path, score.to_string())
        };
        write().map_err(|source| HighScoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Saves only when `score` beats what is on disk. Returns whether it did.
    pub fn save_if_higher(&self, score: u32) -> Result<bool, HighScoreError> {
        if score <= self.load() {
            return Ok(false);
        }
        self.save(score)?;
        log::info!("new high score {} saved to {}", score, self.path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> HighScoreStore {
        let dir = std::env::temp_dir().join(format!("warptris-test-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        HighScoreStore::new(dir.join("nested").join(FILENAME))
    }

    #[test]
    fn test_missing_file_is_recreated_with_zero() {
        let store = temp_store("missing");
        assert_eq!(store.load(), 0);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "0");
    }

    #[test]
    fn test_malformed_file_recovers() {
        let store = temp_store("malformed");
        store.save(3).unwrap();
        fs::write(store.path(), "not a number").unwrap();
        assert_eq!(store.load(), 0);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "0");
    }

    #[test]
    fn test_save_only_when_beaten() {
        let store = temp_store("beaten");
        store.save(10).unwrap();
        assert!(!store.save_if_higher(7).unwrap());
        assert!(!store.save_if_higher(10).unwrap());
        assert_eq!(store.load(), 10);
        assert!(store.save_if_higher(12).unwrap());
        assert_eq!(store.load(), 12);
    }

    #[test]
    fn test_trailing_newline_is_accepted() {
        let store = temp_store("newline");
        store.save(0).unwrap();
        fs::write(store.path(), "25\n").unwrap();
        assert_eq!(store.load(), 25);
    }
}
