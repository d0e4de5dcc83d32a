//! Game state: grid, active block, queue, timers, locking, scoring and grid events.

use crate::GameConfig;
use crate::block::Block;
use crate::events::{EventSelector, GRAVITY_UP_FACTOR, GridEvent};
use crate::grid::{CellState, Grid};
use crate::input::{Action, InputSnapshot};
use crate::loot::LootTable;
use crate::shapes::{self, Shape};
use crate::tile::Tile;
use crate::timers::{FixedStep, LockTimer, TickTimer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

/// Number of block colours; see `Theme::block_color`.
pub const PALETTE_LEN: u8 = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue resize amount must be non-negative, got {0}")]
    NegativeAmount(i32),
}

/// What the scene driving the game should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneSignal {
    Continue,
    Pause,
    GameOver { score: u32, new_high_score: bool },
}

pub struct GameState {
    config: GameConfig,
    grid: Grid,
    /// Tiles of every locked block still on the grid.
    settled: Vec<Tile>,
    current: Option<Block>,
    queue: VecDeque<Block>,
    shapes: LootTable<Shape>,
    events: EventSelector,
    rng: StdRng,
    clock: FixedStep,
    /// Gravity interval in ticks.
    gravity: f64,
    gravity_timer: TickTimer,
    repeat_timer: TickTimer,
    lock: LockTimer,
    hard_dropped: bool,
    lock_pending: bool,
    score: u32,
    high_score: u32,
    /// Rows cleared by the last lock, until the renderer takes them.
    cleared_rows: Vec<usize>,
    last_event: Option<GridEvent>,
    over: bool,
}

impl GameState {
    pub fn new(config: &GameConfig, high_score: u32) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let events = EventSelector::new(config.event_interval, &mut rng);
        let mut state = Self {
            config: config.clone(),
            grid: Grid::new(config.width, config.height),
            settled: Vec::new(),
            current: None,
            queue: VecDeque::new(),
            shapes: shapes::catalogue(),
            events,
            rng,
            clock: FixedStep::new(config.tick_rate),
            gravity: 1.0,
            gravity_timer: TickTimer::new(1.0),
            repeat_timer: TickTimer::new(1.0),
            lock: LockTimer::default(),
            hard_dropped: false,
            lock_pending: false,
            score: 0,
            high_score,
            cleared_rows: Vec::new(),
            last_event: None,
            over: false,
        };
        state.reset(high_score);
        state
    }

    /// Starts a new round on the same grid and generator.
    pub fn reset(&mut self, high_score: u32) {
        let config = &self.config;
        self.grid.reset();
        self.settled.clear();
        self.current = None;
        self.queue.clear();
        self.events = EventSelector::new(config.event_interval, &mut self.rng);
        self.clock = FixedStep::new(config.tick_rate);
        self.gravity = config.gravity.max(1.0);
        self.gravity_timer = TickTimer::new(self.gravity);
        self.repeat_timer = TickTimer::new(f64::from(config.repeat_interval));
        self.lock = LockTimer::default();
        self.hard_dropped = false;
        self.lock_pending = false;
        self.score = 0;
        self.high_score = high_score;
        self.cleared_rows.clear();
        self.last_event = None;
        self.over = false;

        for _ in 0..=self.config.queue_len.max(1) {
            let block = self.generate_block();
            self.queue.push_back(block);
        }
        self.current = self.queue.pop_front();
        log::info!(
            "new game {}x{}, tick {:?}, gravity {}",
            self.grid.width,
            self.grid.height,
            self.clock.period(),
            self.gravity
        );
    }

    /// One frame of game logic.
    ///
    /// Order: a lock flagged by the previous update, then pause, then
    /// just-pressed moves, then at most one fixed tick, then the staged move
    /// is validated and applied.
    pub fn update(&mut self, dt: Duration, input: &InputSnapshot) -> Result<SceneSignal, QueueError> {
        if self.over {
            return Ok(SceneSignal::Continue);
        }
        if self.lock_pending || self.hard_dropped {
            if let Some(signal) = self.lock_current()? {
                return Ok(signal);
            }
        }

        if input.just_pressed(Action::Cancel) {
            return Ok(SceneSignal::Pause);
        }

        if self.current.is_some() && !self.hard_dropped {
            let repeat_delay = f64::from(self.config.repeat_delay);
            if input.just_pressed(Action::MoveLeft) {
                self.repeat_timer.reset(repeat_delay);
                self.request(-1, 0);
            }
            if input.just_pressed(Action::MoveRight) {
                self.repeat_timer.reset(repeat_delay);
                self.request(1, 0);
            }
            if input.just_pressed(Action::SoftDrop) {
                self.repeat_timer.reset(repeat_delay);
                self.request(0, 1);
            }
            if input.just_pressed(Action::HardDrop) {
                self.hard_drop();
            }
        }

        if self.clock.advance(dt) {
            self.tick(input);
        }

        self.apply_pending();
        Ok(SceneSignal::Continue)
    }

    fn tick(&mut self, input: &InputSnapshot) {
        if self.lock.tick() {
            self.lock_pending = true;
            return;
        }
        if self.hard_dropped {
            return;
        }
        if self.gravity_timer.tick() {
            self.gravity_timer.reset(self.gravity);
            self.request(0, 1);
        }
        if self.repeat_timer.tick() {
            self.repeat_timer.reset(f64::from(self.config.repeat_interval));
            if input.held(Action::MoveLeft) {
                self.request(-1, 0);
            }
            if input.held(Action::MoveRight) {
                self.request(1, 0);
            }
            if input.held(Action::SoftDrop) {
                self.request(0, 1);
            }
        }
    }

    /// Stages a one-step move. A step on an axis that already has one staged
    /// applies the staged move first, so each applied step is a single cell.
    fn request(&mut self, dx: i32, dy: i32) {
        if self.current.as_ref().is_some_and(|b| b.pending_overlaps(dx, dy)) {
            self.apply_pending();
        }
        if let Some(block) = self.current.as_mut() {
            block.nudge(dx, dy);
        }
    }

    fn apply_pending(&mut self) {
        if let Some(block) = self.current.as_mut() {
            let outcome = block.apply_pending_move(&mut self.grid);
            self.lock.apply(outcome.lock, self.config.lock_delay);
            // A move on the expiry tick supersedes the lock it was about to take.
            if outcome.moved() {
                self.lock_pending = false;
            }
        }
    }

    /// Drops the block until it lands and flags it to lock on the next update.
    fn hard_drop(&mut self) {
        self.apply_pending();
        let Some(block) = self.current.as_mut() else {
            return;
        };
        let max_steps = self.grid.height + block.height() + 1;
        for _ in 0..max_steps {
            if !block.is_falling() {
                break;
            }
            let outcome = block.move_by(0, 1, &mut self.grid);
            self.lock.apply(outcome.lock, self.config.lock_delay);
        }
        self.hard_dropped = true;
    }

    /// Freezes the active block into the stack. Returns the game-over signal
    /// when the block locked while still poking into the spawn buffer.
    fn lock_current(&mut self) -> Result<Option<SceneSignal>, QueueError> {
        self.lock_pending = false;
        self.hard_dropped = false;
        self.lock.cancel();
        let Some(block) = self.current.take() else {
            return Ok(None);
        };

        if block.anchor().row <= -1 {
            self.over = true;
            let new_high_score = self.score > self.high_score;
            if new_high_score {
                self.high_score = self.score;
            }
            log::info!("game over: score {}, new best {}", self.score, new_high_score);
            self.current = Some(block);
            return Ok(Some(SceneSignal::GameOver {
                score: self.score,
                new_high_score,
            }));
        }

        let start = block.anchor().row;
        let rows = block.height();
        log::debug!("lock {} at {:?}", block.shape().name(), block.anchor());
        for mut tile in block.into_tiles() {
            tile.falling = false;
            self.grid.set_cell(tile.position, CellState::Settled);
            self.settled.push(tile);
        }

        let cleared = self.grid.clear_full_rows(&mut self.settled, start, rows);
        self.score += cleared.len() as u32;
        if !cleared.is_empty() {
            log::info!("cleared {} rows, score {}", cleared.len(), self.score);
        }
        self.cleared_rows = cleared;

        if let Some(event) = self.events.on_lock(&mut self.rng) {
            self.fire_event(event)?;
        }
        self.spawn_next();
        Ok(None)
    }

    fn fire_event(&mut self, event: GridEvent) -> Result<(), QueueError> {
        self.last_event = Some(event);
        match event {
            GridEvent::Invert => {
                self.grid.invert(&mut self.settled);
            }
            GridEvent::ScrollLeft => {
                self.grid.scroll(&mut self.settled, Some(-1), &mut self.rng);
            }
            GridEvent::ScrollRight => {
                self.grid.scroll(&mut self.settled, Some(1), &mut self.rng);
            }
            GridEvent::ExtendQueue => self.extend_queue(1)?,
            GridEvent::ShortenQueue => self.shorten_queue(1)?,
            GridEvent::GravityUp => self.gravity_up(GRAVITY_UP_FACTOR),
        }
        Ok(())
    }

    pub fn extend_queue(&mut self, amount: i32) -> Result<(), QueueError> {
        if amount < 0 {
            return Err(QueueError::NegativeAmount(amount));
        }
        for _ in 0..amount {
            let block = self.generate_block();
            self.queue.push_back(block);
        }
        Ok(())
    }

    /// Drops blocks from the back of the queue, always keeping at least one.
    pub fn shorten_queue(&mut self, amount: i32) -> Result<(), QueueError> {
        if amount < 0 {
            return Err(QueueError::NegativeAmount(amount));
        }
        for _ in 0..amount {
            if self.queue.len() <= 1 {
                break;
            }
            self.queue.pop_back();
        }
        Ok(())
    }

    pub fn gravity_up(&mut self, factor: f64) {
        self.gravity = (self.gravity / factor).max(1.0);
        log::debug!("gravity now every {:.2} ticks", self.gravity);
    }

    fn spawn_next(&mut self) {
        let next = match self.queue.pop_front() {
            Some(block) => block,
            None => self.generate_block(),
        };
        let fresh = self.generate_block();
        self.queue.push_back(fresh);
        self.current = Some(next);
    }

    fn generate_block(&mut self) -> Block {
        let shape = self.shapes.pick(&mut self.rng).cloned().unwrap_or_else(Shape::dot);
        let colour = self.rng.gen_range(0..PALETTE_LEN);
        Block::spawn(shape, colour, self.grid.width)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn settled(&self) -> &[Tile] {
        &self.settled
    }

    pub fn current(&self) -> Option<&Block> {
        self.current.as_ref()
    }

    pub fn queue(&self) -> impl Iterator<Item = &Block> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn pending_event(&self) -> GridEvent {
        self.events.pending()
    }

    pub fn event_countdown(&self) -> u32 {
        self.events.countdown()
    }

    pub fn last_event(&self) -> Option<GridEvent> {
        self.last_event
    }

    /// Ticks left before the landed block locks, if it has landed.
    pub fn lock_remaining(&self) -> Option<u32> {
        self.lock.remaining()
    }

    pub fn take_cleared_rows(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.cleared_rows)
    }
}
