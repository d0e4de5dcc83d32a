//! Scheduled grid events and the countdown that fires them.

use crate::loot::LootTable;
use rand::Rng;
use std::fmt;

/// Gravity interval is divided by this on `GravityUp`.
pub const GRAVITY_UP_FACTOR: f64 = 1.4;
/// Applied to the event interval every time an event fires.
pub const INTERVAL_DECAY: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEvent {
    Invert,
    ScrollLeft,
    ScrollRight,
    ExtendQueue,
    ShortenQueue,
    GravityUp,
}

impl GridEvent {
    pub const ALL: [Self; 6] = [
        Self::Invert,
        Self::ScrollLeft,
        Self::ScrollRight,
        Self::ExtendQueue,
        Self::ShortenQueue,
        Self::GravityUp,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Self::Invert => 10.0,
            Self::ScrollLeft | Self::ScrollRight => 20.0,
            Self::ExtendQueue | Self::ShortenQueue => 2.0,
            Self::GravityUp => 5.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Invert => "Invert",
            Self::ScrollLeft => "Scroll left",
            Self::ScrollRight => "Scroll right",
            Self::ExtendQueue => "Queue +1",
            Self::ShortenQueue => "Queue -1",
            Self::GravityUp => "Gravity up",
        }
    }
}

impl fmt::Display for GridEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct EventSelector {
    countdown: u32,
    interval: f64,
    pending: GridEvent,
    table: LootTable<GridEvent>,
}

impl EventSelector {
    pub fn new<R: Rng + ?Sized>(interval: f64, rng: &mut R) -> Self {
        let interval = if interval.is_finite() { interval.max(1.0) } else { 15.0 };
        let table: LootTable<GridEvent> = GridEvent::ALL.iter().map(|&e| (e, e.weight())).collect();
        let pending = table.pick(rng).copied().unwrap_or(GridEvent::Invert);
        Self {
            countdown: interval.round() as u32,
            interval,
            pending,
            table,
        }
    }

    /// Event that fires when the countdown runs out.
    pub fn pending(&self) -> GridEvent {
        self.pending
    }

    /// Locks left before `pending` fires.
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Counts one lock. When the countdown runs out the interval shrinks, the
    /// countdown restarts, and the event that was pending is returned for the
    /// caller to apply. A fresh event is drawn to replace it.
    pub fn on_lock<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<GridEvent> {
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown >= 1 {
            return None;
        }
        self.interval = (self.interval * INTERVAL_DECAY).max(1.0);
        self.countdown = (self.interval.round() as u32).max(1);
        let fired = self.pending;
        if let Some(&next) = self.table.pick(rng) {
            self.pending = next;
        }
        log::info!(
            "event {} fired, next {} in {} locks",
            fired,
            self.pending,
            self.countdown
        );
        Some(fired)
    }
}
