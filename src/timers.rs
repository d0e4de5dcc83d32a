//! Tick-driven timers: fixed-step clock, countdowns, and the lock-delay timer.

use std::time::Duration;

/// Fixed-rate tick accumulator fed with frame deltas.
#[derive(Debug, Clone)]
pub struct FixedStep {
    period: Duration,
    acc: Duration,
}

impl FixedStep {
    pub fn new(ticks_per_second: f64) -> Self {
        let rate = if ticks_per_second.is_finite() && ticks_per_second > 0.0 {
            ticks_per_second
        } else {
            20.0
        };
        Self {
            period: Duration::from_secs_f64(1.0 / rate),
            acc: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Adds `dt`; returns true when a tick is due. At most one tick per call,
    /// and backlog beyond one period is dropped so a stall never causes a burst.
    pub fn advance(&mut self, dt: Duration) -> bool {
        self.acc += dt;
        if self.acc < self.period {
            return false;
        }
        self.acc = (self.acc - self.period).min(self.period);
        true
    }
}

/// Countdown in ticks. Fractional so intervals like gravity can shrink smoothly.
#[derive(Debug, Clone, Copy)]
pub struct TickTimer {
    remaining: f64,
}

impl TickTimer {
    pub fn new(ticks: f64) -> Self {
        Self { remaining: ticks }
    }

    pub fn reset(&mut self, ticks: f64) {
        self.remaining = ticks;
    }

    /// One tick elapsed; true once the countdown has run out.
    pub fn tick(&mut self) -> bool {
        self.remaining -= 1.0;
        self.remaining <= 0.0
    }
}

/// What a block move asks of the lock-delay timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockSignal {
    #[default]
    None,
    /// Start, or restart, the countdown.
    Arm,
    Cancel,
}

/// Deferred lock: armed for a number of ticks, polled once per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockTimer {
    remaining: Option<u32>,
}

impl LockTimer {
    pub fn arm(&mut self, ticks: u32) {
        self.remaining = Some(ticks.max(1));
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn apply(&mut self, signal: LockSignal, ticks: u32) {
        match signal {
            LockSignal::None => {}
            LockSignal::Arm => self.arm(ticks),
            LockSignal::Cancel => self.cancel(),
        }
    }

    /// Returns true exactly once, on the tick the delay expires.
    pub fn tick(&mut self) -> bool {
        match self.remaining {
            Some(n) if n <= 1 => {
                self.remaining = None;
                true
            }
            Some(n) => {
                self.remaining = Some(n - 1);
                false
            }
            None => false,
        }
    }
}
