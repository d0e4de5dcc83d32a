//! Key bindings and per-frame input snapshots (held / just pressed).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

/// Without release events a held key is assumed released after this long
/// without a press or repeat.
const HOLD_TIMEOUT: Duration = Duration::from_millis(120);
/// A press this soon after an expired hold was last seen is the terminal's
/// first auto-repeat, not a new press. Covers common OS repeat delays.
const FIRST_REPEAT_WINDOW: Duration = Duration::from_millis(650);

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDrop,
    HardDrop,
    Cancel,
    Confirm,
    Restart,
    Quit,
    None,
}

impl Action {
    const fn bit(self) -> u16 {
        match self {
            Self::MoveLeft => 1 << 0,
            Self::MoveRight => 1 << 1,
            Self::SoftDrop => 1 << 2,
            Self::HardDrop => 1 << 3,
            Self::Cancel => 1 << 4,
            Self::Confirm => 1 << 5,
            Self::Restart => 1 << 6,
            Self::Quit => 1 << 7,
            Self::None => 0,
        }
    }
}

/// Map key event to game action. Arrows, WASD and vim keys all move the block.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Left | KeyCode::Char('a' | 'h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('d' | 'l') => Action::MoveRight,
        KeyCode::Down | KeyCode::Char('s' | 'j') => Action::SoftDrop,
        KeyCode::Up | KeyCode::Char('w' | 'k' | ' ') => Action::HardDrop,
        KeyCode::Esc | KeyCode::Char('p') => Action::Cancel,
        KeyCode::Enter => Action::Confirm,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Char('q') => Action::Quit,
        _ => Action::None,
    }
}

/// Input as seen by one game update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    held: u16,
    pressed: u16,
}

impl InputSnapshot {
    pub fn held(&self, action: Action) -> bool {
        self.held & action.bit() != 0
    }

    /// Pressed since the previous snapshot. A just-pressed action also counts as held.
    pub fn just_pressed(&self, action: Action) -> bool {
        self.pressed & action.bit() != 0
    }
}

#[cfg(test)]
impl InputSnapshot {
    pub(crate) fn with_held(mut self, action: Action) -> Self {
        self.held |= action.bit();
        self
    }

    pub(crate) fn with_pressed(mut self, action: Action) -> Self {
        self.pressed |= action.bit();
        self.held |= action.bit();
        self
    }
}

/// Accumulates key events between frames.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Held actions and the last time each was seen pressed or repeating.
    held: Vec<(Action, Instant)>,
    /// Holds dropped by the timeout and when they were last seen.
    expired: Vec<(Action, Instant)>,
    pressed: u16,
    /// Terminal reports key release (keyboard enhancement active).
    releases: bool,
}

impl InputState {
    pub fn new(releases: bool) -> Self {
        Self {
            held: Vec::new(),
            expired: Vec::new(),
            pressed: 0,
            releases,
        }
    }

    /// Records a key event. Returns the action for a fresh press, `Action::None` otherwise.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        let action = key_to_action(key);
        if action == Action::None {
            return Action::None;
        }
        let slot = self.held.iter().position(|(a, _)| *a == action);
        match (key.kind, slot) {
            (KeyEventKind::Release, Some(i)) => {
                self.held.swap_remove(i);
                Action::None
            }
            (KeyEventKind::Release, None) => Action::None,
            // Without release reporting, auto-repeat arrives as more presses.
            (KeyEventKind::Press | KeyEventKind::Repeat, Some(i)) => {
                self.held[i].1 = now;
                Action::None
            }
            (KeyEventKind::Repeat, None) => {
                self.held.push((action, now));
                Action::None
            }
            (KeyEventKind::Press, None) if self.resumes_expired_hold(action, now) => {
                self.held.push((action, now));
                Action::None
            }
            (KeyEventKind::Press, None) => {
                self.held.push((action, now));
                self.pressed |= action.bit();
                action
            }
        }
    }

    fn resumes_expired_hold(&mut self, action: Action, now: Instant) -> bool {
        let Some(i) = self.expired.iter().position(|(a, _)| *a == action) else {
            return false;
        };
        let (_, seen) = self.expired.swap_remove(i);
        now.saturating_duration_since(seen) < FIRST_REPEAT_WINDOW
    }

    /// Builds the snapshot for this frame and resets the just-pressed set.
    pub fn snapshot(&mut self, now: Instant) -> InputSnapshot {
        if !self.releases {
            let (live, stale): (Vec<_>, Vec<_>) = self
                .held
                .drain(..)
                .partition(|(_, seen)| now.saturating_duration_since(*seen) < HOLD_TIMEOUT);
            self.held = live;
            for (action, seen) in stale {
                self.expired.retain(|(a, _)| *a != action);
                self.expired.push((action, seen));
            }
        }
        let held = self.held.iter().fold(self.pressed, |acc, (a, _)| acc | a.bit());
        let snapshot = InputSnapshot {
            held,
            pressed: self.pressed,
        };
        self.pressed = 0;
        snapshot
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.expired.clear();
        self.pressed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn release(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Release)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Char('d'))), Action::MoveRight);
        assert_eq!(key_to_action(press(KeyCode::Down)), Action::SoftDrop);
        assert_eq!(key_to_action(press(KeyCode::Up)), Action::HardDrop);
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::HardDrop);
        assert_eq!(key_to_action(press(KeyCode::Esc)), Action::Cancel);
        assert_eq!(key_to_action(press(KeyCode::Enter)), Action::Confirm);
        assert_eq!(key_to_action(press(KeyCode::Char('x'))), Action::None);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
        let alt_left = KeyEvent::new(KeyCode::Left, KeyModifiers::ALT);
        assert_eq!(key_to_action(alt_left), Action::None);
    }

    #[test]
    fn test_press_is_edge_triggered() {
        let mut input = InputState::new(true);
        let now = Instant::now();
        assert_eq!(input.handle_key(press(KeyCode::Left), now), Action::MoveLeft);
        let snap = input.snapshot(now);
        assert!(snap.just_pressed(Action::MoveLeft));
        assert!(snap.held(Action::MoveLeft));

        let snap = input.snapshot(now + Duration::from_secs(1));
        assert!(!snap.just_pressed(Action::MoveLeft));
        assert!(snap.held(Action::MoveLeft), "held until released");

        input.handle_key(release(KeyCode::Left), now);
        assert!(!input.snapshot(now).held(Action::MoveLeft));
    }

    #[test]
    fn test_repeat_presses_do_not_retrigger() {
        let mut input = InputState::new(false);
        let now = Instant::now();
        input.handle_key(press(KeyCode::Right), now);
        input.snapshot(now);
        assert_eq!(input.handle_key(press(KeyCode::Right), now), Action::None);
        assert!(!input.snapshot(now).just_pressed(Action::MoveRight));
    }

    #[test]
    fn test_stale_hold_expires_without_release_events() {
        let mut input = InputState::new(false);
        let now = Instant::now();
        input.handle_key(press(KeyCode::Down), now);
        input.snapshot(now);
        assert!(input.snapshot(now + Duration::from_millis(50)).held(Action::SoftDrop));
        assert!(!input.snapshot(now + Duration::from_millis(500)).held(Action::SoftDrop));
    }

    #[test]
    fn test_first_auto_repeat_continues_the_hold() {
        let mut input = InputState::new(false);
        let start = Instant::now();
        assert_eq!(input.handle_key(press(KeyCode::Left), start), Action::MoveLeft);
        assert!(input.snapshot(start).just_pressed(Action::MoveLeft));

        // the hold times out before the OS starts repeating
        let gap = start + Duration::from_millis(200);
        assert!(!input.snapshot(gap).held(Action::MoveLeft));

        let repeat = start + Duration::from_millis(500);
        assert_eq!(input.handle_key(press(KeyCode::Left), repeat), Action::None);
        let snap = input.snapshot(repeat);
        assert!(!snap.just_pressed(Action::MoveLeft));
        assert!(snap.held(Action::MoveLeft));
    }

    #[test]
    fn test_press_long_after_expiry_is_fresh() {
        let mut input = InputState::new(false);
        let start = Instant::now();
        input.handle_key(press(KeyCode::Left), start);
        input.snapshot(start);
        input.snapshot(start + Duration::from_millis(200));

        let later = start + Duration::from_secs(2);
        assert_eq!(input.handle_key(press(KeyCode::Left), later), Action::MoveLeft);
        assert!(input.snapshot(later).just_pressed(Action::MoveLeft));
    }

    #[test]
    fn test_tap_between_frames_is_still_seen() {
        let mut input = InputState::new(true);
        let now = Instant::now();
        input.handle_key(press(KeyCode::Up), now);
        input.handle_key(release(KeyCode::Up), now);
        let snap = input.snapshot(now);
        assert!(snap.just_pressed(Action::HardDrop));
    }
}
