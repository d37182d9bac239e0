//! One game: the logical grid, the visual tiles, their animations and the clock, plus the
//! per-frame pump that keeps them in step.

use crate::GameConfig;
use crate::animation::{AnimationManager, AnimationTimings, FrameClock};
use crate::engine::{Direction, GridEngine, GridError, MoveOutcome, Spawned};
use crate::tiles::{TileError, TileId, TileManager};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Tile(#[from] TileError),
}

/// What to draw for one tile at the current instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileView {
    pub id: TileId,
    pub value: u32,
    /// (row, col) in cells; fractional while shifting.
    pub position: (f64, f64),
    pub scale: f64,
}

#[derive(Debug)]
pub struct Session<R = StdRng> {
    pub engine: GridEngine<R>,
    pub tiles: TileManager,
    pub animations: AnimationManager,
    clock: FrameClock,
    /// A move was animated; merges are detected once its shifts have drained.
    awaiting_merges: bool,
    /// Visual tiles may have drifted; reconcile once everything is idle.
    needs_reconcile: bool,
}

impl Session<StdRng> {
    /// Fresh empty board from config; seeded when `config.seed` is set.
    pub fn from_config(config: &GameConfig) -> Result<Self, SessionError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self::new(GridEngine::new(config.size, rng)?, config.timings)?)
    }
}

impl<R: Rng> Session<R> {
    /// Wrap an engine; any tiles already on its grid are shown at rest.
    pub fn new(engine: GridEngine<R>, timings: AnimationTimings) -> Result<Self, TileError> {
        let mut session = Self {
            tiles: TileManager::new(engine.size(), timings),
            engine,
            animations: AnimationManager::new(),
            clock: FrameClock::new(),
            awaiting_merges: false,
            needs_reconcile: false,
        };
        // Reconciling against an empty tile list only ever adds tiles.
        session.tiles.reconcile(session.engine.rows())?;
        Ok(session)
    }

    /// Move the grid and, when it changed, queue the shifts for the visual tiles.
    pub fn apply_move(&mut self, direction: Direction) -> Result<MoveOutcome, TileError> {
        let outcome = self.engine.apply(direction);
        if outcome.changed {
            self.tiles
                .append_new_move(&outcome.bias, direction, &mut self.animations)?;
            self.awaiting_merges = true;
            self.needs_reconcile = true;
            debug!(
                "moved {:?}: {} merge(s), score {}",
                direction,
                outcome.merges.iter().flatten().filter(|&&m| m).count(),
                self.engine.score()
            );
        }
        Ok(outcome)
    }

    /// Insert a random tile into the grid and give it an Appear animation.
    /// `None` when the grid is full.
    pub fn spawn_tile(&mut self) -> Result<Option<Spawned>, TileError> {
        if !self.engine.has_empty_cell() {
            return Ok(None);
        }
        let Ok(spawned) = self.engine.insert_random_tile() else {
            return Ok(None);
        };
        self.tiles
            .append_new_tile(spawned.value, spawned.row, spawned.col, &mut self.animations)?;
        self.needs_reconcile = true;
        debug!(
            "spawned {} at ({}, {})",
            spawned.value, spawned.row, spawned.col
        );
        Ok(Some(spawned))
    }

    /// Start the next animation phase (Shift, then Merge, then Appear).
    pub fn start_next_phase(&mut self) {
        self.animations.start(self.clock.now());
    }

    /// Per-frame pump: advance the clock, retire finished animations, resolve merges once
    /// the shifts are done, and reconcile visual tiles with the grid once nothing is running.
    pub fn advance(&mut self, dt_ms: u64) -> Result<(), TileError> {
        let now = self.clock.advance(dt_ms);
        self.animations.cleanup(now);

        if self.animations.has_shift_animations() {
            return Ok(());
        }
        if self.awaiting_merges {
            self.awaiting_merges = false;
            self.tiles.detect_merges(&mut self.animations)?;
        }
        if self.needs_reconcile && !self.animations.has_any() {
            self.needs_reconcile = false;
            let corrected = self.tiles.reconcile(self.engine.rows())?;
            if corrected > 0 {
                warn!("reconcile corrected {corrected} cell(s)");
            }
        }
        Ok(())
    }

    /// True while any animation is queued or running.
    pub fn is_animating(&self) -> bool {
        self.animations.has_any()
    }

    /// Tiles as they should look right now. Tiles whose appear has not begun are hidden.
    pub fn tile_views(&self) -> Vec<TileView> {
        let now = self.clock.now();
        self.tiles
            .tiles()
            .iter()
            .filter_map(|tile| {
                let rest = (tile.row as f64, tile.col as f64);
                let (position, scale) = match self.animations.next(tile.id) {
                    Some(anim) => {
                        let pose = anim.evaluate(now);
                        (pose.position.unwrap_or(rest), pose.scale)
                    }
                    None => (rest, tile.scale),
                };
                (scale > 0.0).then_some(TileView {
                    id: tile.id,
                    value: tile.value,
                    position,
                    scale,
                })
            })
            .collect()
    }
}
