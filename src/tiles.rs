//! Visual tiles: identity, position and value, kept apart from the logical grid and
//! reconciled with it once animations settle.

use crate::animation::{Animation, AnimationError, AnimationManager, AnimationTimings};
use crate::engine::Direction;
use std::fmt;
use thiserror::Error;

/// Process-unique tile identity. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub u64);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TileError {
    #[error("tile value {0} is not a power of two >= 2")]
    InvalidValue(u32),
    #[error("tile scale {0} must be finite and non-negative")]
    InvalidScale(f64),
    #[error("bias {bias} at ({row}, {col}) but no tile is there")]
    MissingSource { row: usize, col: usize, bias: i32 },
    #[error("bias at ({row}, {col}) but {count} tiles are there")]
    DuplicateSource { row: usize, col: usize, count: usize },
    #[error("{count} tiles coincide at ({row}, {col}); at most two may")]
    Overcrowded { row: usize, col: usize, count: usize },
    #[error("coincident tiles at ({row}, {col}) disagree: {a} vs {b}")]
    ValueMismatch { row: usize, col: usize, a: u32, b: u32 },
    #[error("merging two {value} tiles at ({row}, {col}) overflows a cell")]
    ValueOverflow { row: usize, col: usize, value: u32 },
    #[error("bias matrix is {found} wide, board is {expected}")]
    BiasShape { expected: usize, found: usize },
    #[error(transparent)]
    Animation(#[from] AnimationError),
}

impl TileError {
    /// True for errors that mean the move/merge bookkeeping went wrong.
    pub fn is_consistency_failure(&self) -> bool {
        !matches!(self, Self::InvalidValue(_) | Self::InvalidScale(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub value: u32,
    pub row: usize,
    pub col: usize,
    pub id: TileId,
    pub scale: f64,
}

impl Tile {
    pub fn new(value: u32, row: usize, col: usize, id: TileId) -> Result<Self, TileError> {
        Self::with_scale(value, row, col, id, 1.0)
    }

    pub fn with_scale(
        value: u32,
        row: usize,
        col: usize,
        id: TileId,
        scale: f64,
    ) -> Result<Self, TileError> {
        if value < 2 || !value.is_power_of_two() {
            return Err(TileError::InvalidValue(value));
        }
        if !scale.is_finite() || scale < 0.0 {
            return Err(TileError::InvalidScale(scale));
        }
        Ok(Self {
            value,
            row,
            col,
            id,
            scale,
        })
    }

    #[inline]
    fn is_at(&self, row: usize, col: usize) -> bool {
        self.row == row && self.col == col
    }
}

#[derive(Debug, Clone)]
pub struct TileManager {
    size: usize,
    tiles: Vec<Tile>,
    next_id: u64,
    timings: AnimationTimings,
}

impl TileManager {
    pub fn new(size: usize, timings: AnimationTimings) -> Self {
        Self {
            size,
            tiles: Vec::new(),
            next_id: 0,
            timings,
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_at(&self, row: usize, col: usize) -> Vec<&Tile> {
        self.tiles.iter().filter(|t| t.is_at(row, col)).collect()
    }

    fn new_id(&mut self) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a freshly inserted tile with an Appear animation.
    pub fn append_new_tile(
        &mut self,
        value: u32,
        row: usize,
        col: usize,
        animations: &mut AnimationManager,
    ) -> Result<TileId, TileError> {
        let id = self.new_id();
        let tile = Tile::new(value, row, col, id)?;
        animations.add(id, Animation::appear(self.timings.appear_ms)?);
        self.tiles.push(tile);
        Ok(id)
    }

    /// Relocate every biased tile to its destination and queue a Shift for it.
    /// A biased cell must hold exactly one tile.
    pub fn append_new_move(
        &mut self,
        bias: &[Vec<i32>],
        direction: Direction,
        animations: &mut AnimationManager,
    ) -> Result<(), TileError> {
        if bias.len() != self.size {
            return Err(TileError::BiasShape {
                expected: self.size,
                found: bias.len(),
            });
        }
        let (dr, dc) = direction.offset();

        // Resolve against the pre-move positions before touching any tile.
        let mut moves = Vec::new();
        for (r, bias_row) in bias.iter().enumerate() {
            if bias_row.len() != self.size {
                return Err(TileError::BiasShape {
                    expected: self.size,
                    found: bias_row.len(),
                });
            }
            for (c, &b) in bias_row.iter().enumerate() {
                if b == 0 {
                    continue;
                }
                let mut here = self
                    .tiles
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.is_at(r, c))
                    .map(|(i, _)| i);
                let index = match (here.next(), here.next()) {
                    (Some(i), None) => i,
                    (None, _) => return Err(TileError::MissingSource { row: r, col: c, bias: b }),
                    (Some(_), Some(_)) => {
                        return Err(TileError::DuplicateSource {
                            row: r,
                            col: c,
                            count: self.tiles_at(r, c).len(),
                        });
                    }
                };
                let to = (r as i32 + dr * b, c as i32 + dc * b);
                let shift = Animation::shift((r as i32, c as i32), to, self.timings.shift_ms)?;
                moves.push((index, to, shift));
            }
        }

        for (index, (row, col), shift) in moves {
            let tile = &mut self.tiles[index];
            tile.row = row as usize;
            tile.col = col as usize;
            animations.add(tile.id, shift);
        }
        Ok(())
    }

    /// Collapse each pair of coincident equal tiles into one new tile of double value
    /// with a Merge animation. Returns the number of merges.
    pub fn detect_merges(&mut self, animations: &mut AnimationManager) -> Result<usize, TileError> {
        let mut merged = 0;
        for row in 0..self.size {
            for col in 0..self.size {
                let here: Vec<(TileId, u32)> = self
                    .tiles
                    .iter()
                    .filter(|t| t.is_at(row, col))
                    .map(|t| (t.id, t.value))
                    .collect();
                match here.as_slice() {
                    [] | [_] => {}
                    [(a_id, a), (b_id, b)] => {
                        if a != b {
                            return Err(TileError::ValueMismatch { row, col, a: *a, b: *b });
                        }
                        let value = a
                            .checked_mul(2)
                            .ok_or(TileError::ValueOverflow { row, col, value: *a })?;
                        self.tiles.retain(|t| t.id != *a_id && t.id != *b_id);
                        let id = self.new_id();
                        self.tiles.push(Tile::new(value, row, col, id)?);
                        animations.add(id, Animation::merge(self.timings.merge_ms)?);
                        merged += 1;
                    }
                    many => {
                        return Err(TileError::Overcrowded {
                            row,
                            col,
                            count: many.len(),
                        });
                    }
                }
            }
        }
        Ok(merged)
    }

    /// Re-derive the visual tiles from the logical grid. A cell whose single tile already
    /// shows the grid value keeps it; anything else is replaced by a fresh tile or removed.
    /// Returns the number of cells that had to be corrected.
    pub fn reconcile(&mut self, grid: &[Vec<u32>]) -> Result<usize, TileError> {
        let mut corrected = 0;
        for (row, cells) in grid.iter().enumerate() {
            for (col, &value) in cells.iter().enumerate() {
                let here: Vec<u32> = self
                    .tiles
                    .iter()
                    .filter(|t| t.is_at(row, col))
                    .map(|t| t.value)
                    .collect();
                let in_sync = match (value, here.as_slice()) {
                    (0, []) => true,
                    (v, [shown]) => v == *shown,
                    _ => false,
                };
                if in_sync {
                    continue;
                }
                self.tiles.retain(|t| !t.is_at(row, col));
                if value != 0 {
                    let id = self.new_id();
                    self.tiles.push(Tile::new(value, row, col, id)?);
                }
                corrected += 1;
            }
        }
        // Anything outside the grid cannot be shown.
        let size = grid.len();
        let before = self.tiles.len();
        self.tiles.retain(|t| t.row < size && t.col < size);
        corrected += before - self.tiles.len();
        Ok(corrected)
    }
}
