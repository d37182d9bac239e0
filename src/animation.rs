//! Tile animations (appear, shift, merge), the frame clock and the phase-sequencing manager.

use crate::tiles::TileId;
use std::collections::{BTreeMap, VecDeque};
use thiserror::Error;

pub const DEFAULT_APPEAR_MS: u64 = 120;
pub const DEFAULT_SHIFT_MS: u64 = 150;
pub const DEFAULT_MERGE_MS: u64 = 150;

/// Peak scale of the merge bump.
const MERGE_PEAK_SCALE: f64 = 1.1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnimationError {
    #[error("animation duration must be greater than zero")]
    ZeroDuration,
    #[error("shift endpoint ({row}, {col}) has a negative coordinate")]
    NegativeCoordinate { row: i32, col: i32 },
}

/// Durations (ms) for each animation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationTimings {
    pub appear_ms: u64,
    pub shift_ms: u64,
    pub merge_ms: u64,
}

impl AnimationTimings {
    pub fn new(appear_ms: u64, shift_ms: u64, merge_ms: u64) -> Result<Self, AnimationError> {
        if appear_ms == 0 || shift_ms == 0 || merge_ms == 0 {
            return Err(AnimationError::ZeroDuration);
        }
        Ok(Self {
            appear_ms,
            shift_ms,
            merge_ms,
        })
    }
}

impl Default for AnimationTimings {
    fn default() -> Self {
        Self {
            appear_ms: DEFAULT_APPEAR_MS,
            shift_ms: DEFAULT_SHIFT_MS,
            merge_ms: DEFAULT_MERGE_MS,
        }
    }
}

/// Animation kinds in activation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AnimationKind {
    Shift,
    Merge,
    Appear,
}

impl AnimationKind {
    pub const PHASE_ORDER: [Self; 3] = [Self::Shift, Self::Merge, Self::Appear];
}

/// What an animation does to its tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Scale 0 -> 1.
    Appear,
    /// Slide between two cells, (row, col).
    Shift { from: (usize, usize), to: (usize, usize) },
    /// Scale bump 1.0 -> 1.1 -> 1.0.
    Merge,
}

/// Visual state of a tile at some instant. `position` is (row, col) in cells, fractional mid-shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Option<(f64, f64)>,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    motion: Motion,
    duration_ms: u64,
    started_at: Option<u64>,
}

impl Animation {
    fn with_motion(motion: Motion, duration_ms: u64) -> Result<Self, AnimationError> {
        if duration_ms == 0 {
            return Err(AnimationError::ZeroDuration);
        }
        Ok(Self {
            motion,
            duration_ms,
            started_at: None,
        })
    }

    pub fn appear(duration_ms: u64) -> Result<Self, AnimationError> {
        Self::with_motion(Motion::Appear, duration_ms)
    }

    pub fn merge(duration_ms: u64) -> Result<Self, AnimationError> {
        Self::with_motion(Motion::Merge, duration_ms)
    }

    /// Shift between two cells; both endpoints must be non-negative.
    pub fn shift(from: (i32, i32), to: (i32, i32), duration_ms: u64) -> Result<Self, AnimationError> {
        let cell = |(row, col): (i32, i32)| {
            if row < 0 || col < 0 {
                Err(AnimationError::NegativeCoordinate { row, col })
            } else {
                Ok((row as usize, col as usize))
            }
        };
        let motion = Motion::Shift {
            from: cell(from)?,
            to: cell(to)?,
        };
        Self::with_motion(motion, duration_ms)
    }

    #[inline]
    pub fn kind(&self) -> AnimationKind {
        match self.motion {
            Motion::Appear => AnimationKind::Appear,
            Motion::Shift { .. } => AnimationKind::Shift,
            Motion::Merge => AnimationKind::Merge,
        }
    }

    #[inline]
    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn start(&mut self, now: u64) {
        self.started_at = Some(now);
    }

    /// Fraction of the duration elapsed, capped at 1.0. Negative before the start time, 0 if never started.
    pub fn progress(&self, now: u64) -> f64 {
        match self.started_at {
            None => 0.0,
            Some(start) => ((now as f64 - start as f64) / self.duration_ms as f64).min(1.0),
        }
    }

    pub fn is_finished(&self, now: u64) -> bool {
        self.is_started() && self.progress(now) >= 1.0
    }

    pub fn evaluate(&self, now: u64) -> Pose {
        match self.motion {
            Motion::Appear => Pose {
                position: None,
                scale: self.progress(now).max(0.0),
            },
            Motion::Shift { from, to } => {
                let p = self.progress(now);
                let lerp = |a: usize, b: usize| a as f64 + (b as f64 - a as f64) * p;
                Pose {
                    position: Some((lerp(from.0, to.0), lerp(from.1, to.1))),
                    scale: 1.0,
                }
            }
            Motion::Merge => Pose {
                position: None,
                scale: self.merge_scale(now),
            },
        }
    }

    fn merge_scale(&self, now: u64) -> f64 {
        let Some(start) = self.started_at else {
            return 1.0;
        };
        if now < start {
            return 1.0;
        }
        let dt = (now - start) as f64;
        let duration = self.duration_ms as f64;
        let peak = (self.duration_ms / 2) as f64;
        let bump = MERGE_PEAK_SCALE - 1.0;
        if dt < peak {
            1.0 + bump * (dt / peak)
        } else if dt < duration {
            MERGE_PEAK_SCALE - bump * ((dt - peak) / (duration - peak))
        } else {
            1.0
        }
    }
}

/// Accumulates per-frame deltas into the elapsed time that drives every animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameClock {
    now_ms: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt_ms: u64) -> u64 {
        self.now_ms = self.now_ms.saturating_add(dt_ms);
        self.now_ms
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.now_ms
    }
}

/// Per-tile animation queues. Only one kind runs at a time across the board:
/// all shifts, then all merges, then all appears.
#[derive(Debug, Clone, Default)]
pub struct AnimationManager {
    queues: BTreeMap<TileId, VecDeque<Animation>>,
}

impl AnimationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `animation` after any already queued for `tile`.
    pub fn add(&mut self, tile: TileId, animation: Animation) {
        self.queues.entry(tile).or_default().push_back(animation);
    }

    /// The animation that currently drives `tile`, if any.
    pub fn next(&self, tile: TileId) -> Option<&Animation> {
        self.queues.get(&tile).and_then(VecDeque::front)
    }

    /// The kind that should be live now: the first of Shift, Merge, Appear present anywhere.
    pub fn current_phase(&self) -> Option<AnimationKind> {
        AnimationKind::PHASE_ORDER
            .into_iter()
            .find(|&kind| self.iter().any(|a| a.kind() == kind))
    }

    /// Start every unstarted animation of the current phase. Returns the phase, if any.
    pub fn start(&mut self, now: u64) -> Option<AnimationKind> {
        let phase = self.current_phase()?;
        for anim in self.queues.values_mut().flatten() {
            if anim.kind() == phase && !anim.is_started() {
                anim.start(now);
            }
        }
        Some(phase)
    }

    /// Drop finished animations; unstarted ones stay queued. Tiles with empty queues are forgotten.
    pub fn cleanup(&mut self, now: u64) {
        self.queues.retain(|_, queue| {
            queue.retain(|a| !a.is_finished(now));
            !queue.is_empty()
        });
    }

    pub fn has_shift_animations(&self) -> bool {
        self.iter().any(|a| a.kind() == AnimationKind::Shift)
    }

    pub fn has_any(&self) -> bool {
        !self.queues.is_empty()
    }

    /// Total queued animations.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    #[cfg(test)]
    pub fn clear(&mut self) {
        self.queues.clear();
    }

    fn iter(&self) -> impl Iterator<Item = &Animation> {
        self.queues.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_zero_duration_rejected() {
        assert_eq!(Animation::appear(0), Err(AnimationError::ZeroDuration));
        assert_eq!(Animation::merge(0), Err(AnimationError::ZeroDuration));
        assert_eq!(
            Animation::shift((0, 0), (0, 1), 0),
            Err(AnimationError::ZeroDuration)
        );
        assert_eq!(AnimationTimings::new(120, 0, 150), Err(AnimationError::ZeroDuration));
    }

    #[test]
    fn test_shift_rejects_negative_coordinates() {
        assert_eq!(
            Animation::shift((0, 0), (0, -1), 150),
            Err(AnimationError::NegativeCoordinate { row: 0, col: -1 })
        );
        assert_eq!(
            Animation::shift((-2, 1), (0, 1), 150),
            Err(AnimationError::NegativeCoordinate { row: -2, col: 1 })
        );
    }

    #[test]
    fn test_progress() {
        let mut a = Animation::appear(100).unwrap();
        assert_eq!(a.progress(500), 0.0);
        a.start(200);
        assert!((a.progress(250) - 0.5).abs() < EPS);
        assert!((a.progress(100) + 1.0).abs() < EPS);
        assert_eq!(a.progress(10_000), 1.0);
        assert!(a.is_finished(300));
        assert!(!a.is_finished(299));
    }

    #[test]
    fn test_started_at_zero_counts_as_started() {
        let mut a = Animation::appear(100).unwrap();
        a.start(0);
        assert!(a.is_started());
        assert!(a.is_finished(100));
    }

    #[test]
    fn test_appear_scale() {
        let mut a = Animation::appear(120).unwrap();
        assert_eq!(a.evaluate(50).scale, 0.0);
        a.start(0);
        assert!((a.evaluate(60).scale - 0.5).abs() < EPS);
        assert_eq!(a.evaluate(500).scale, 1.0);
        assert_eq!(a.evaluate(60).position, None);
    }

    #[test]
    fn test_shift_position() {
        let mut a = Animation::shift((0, 3), (0, 0), 150).unwrap();
        assert_eq!(a.evaluate(10).position, Some((0.0, 3.0)));
        a.start(100);
        let (r, c) = a.evaluate(175).position.unwrap();
        assert!(r.abs() < EPS);
        assert!((c - 1.5).abs() < EPS);
        assert_eq!(a.evaluate(400).position, Some((0.0, 0.0)));
        assert_eq!(a.evaluate(175).scale, 1.0);
    }

    #[test]
    fn test_merge_scale_curve() {
        let mut a = Animation::merge(150).unwrap();
        assert_eq!(a.evaluate(40).scale, 1.0);
        a.start(100);
        assert_eq!(a.evaluate(50).scale, 1.0);
        assert!((a.evaluate(100).scale - 1.0).abs() < EPS);
        assert!((a.evaluate(175).scale - 1.1).abs() < EPS);
        let falling = a.evaluate(212).scale;
        assert!(falling > 1.0 && falling < 1.1);
        assert_eq!(a.evaluate(250).scale, 1.0);
        assert_eq!(a.evaluate(900).scale, 1.0);
    }

    #[test]
    fn test_frame_clock_accumulates() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(16), 16);
        assert_eq!(clock.advance(17), 33);
        assert_eq!(clock.now(), 33);
    }

    #[test]
    fn test_shift_runs_before_appear() {
        let mut m = AnimationManager::new();
        m.add(TileId(0), Animation::shift((0, 2), (0, 0), 150).unwrap());
        m.add(TileId(1), Animation::appear(120).unwrap());

        assert_eq!(m.start(10), Some(AnimationKind::Shift));
        assert_eq!(m.next(TileId(0)).unwrap().started_at(), Some(10));
        assert_eq!(m.next(TileId(1)).unwrap().started_at(), None);

        // A second pump while the shift runs does not touch the appear.
        assert_eq!(m.start(50), Some(AnimationKind::Shift));
        assert_eq!(m.next(TileId(0)).unwrap().started_at(), Some(10));
        assert_eq!(m.next(TileId(1)).unwrap().started_at(), None);

        m.cleanup(160);
        assert!(!m.has_shift_animations());
        assert_eq!(m.len(), 1);
        assert_eq!(m.start(170), Some(AnimationKind::Appear));
        assert_eq!(m.next(TileId(1)).unwrap().started_at(), Some(170));
    }

    #[test]
    fn test_merge_precedes_appear() {
        let mut m = AnimationManager::new();
        m.add(TileId(4), Animation::appear(120).unwrap());
        m.add(TileId(5), Animation::merge(150).unwrap());
        assert_eq!(m.current_phase(), Some(AnimationKind::Merge));
        m.start(0);
        assert!(m.next(TileId(5)).unwrap().is_started());
        assert!(!m.next(TileId(4)).unwrap().is_started());
    }

    #[test]
    fn test_cleanup_keeps_unstarted_and_queue_order() {
        let mut m = AnimationManager::new();
        let id = TileId(3);
        m.add(id, Animation::shift((1, 0), (1, 2), 100).unwrap());
        m.add(id, Animation::merge(100).unwrap());
        m.start(0);
        m.cleanup(50);
        assert_eq!(m.next(id).unwrap().kind(), AnimationKind::Shift);
        m.cleanup(100);
        assert_eq!(m.next(id).unwrap().kind(), AnimationKind::Merge);
        assert!(!m.next(id).unwrap().is_started());
        m.start(100);
        m.cleanup(200);
        assert!(m.next(id).is_none());
        assert!(!m.has_any());
        assert!(m.is_empty());
    }

    #[test]
    fn test_empty_manager() {
        let mut m = AnimationManager::new();
        assert_eq!(m.start(0), None);
        assert!(!m.has_any());
        assert!(!m.has_shift_animations());
        m.add(TileId(1), Animation::appear(10).unwrap());
        m.clear();
        assert!(!m.has_any());
    }
}
