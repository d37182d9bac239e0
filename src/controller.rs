//! Turn state machine: input -> move -> animation -> merge detection -> win/loss.

use crate::engine::Direction;
use crate::session::Session;
use crate::tiles::TileError;
use log::info;
use rand::Rng;
use ratatui::layout::{Position, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Playing,
    Victory,
    GameOver,
    /// The session loop should throw this game away and start a new one.
    Restarting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Escape,
    Enter,
    Space,
    R,
}

impl Key {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Left => Some(Direction::Left),
            Self::Right => Some(Direction::Right),
            Self::Up => Some(Direction::Up),
            Self::Down => Some(Direction::Down),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(Key),
    PointerDown {
        button: PointerButton,
        column: u16,
        row: u16,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Controller {
    /// Screen region of the "New Game" button.
    new_game_region: Rect,
    pending_victory: bool,
    pending_game_over: bool,
}

impl Controller {
    /// Start a game: places the first tile.
    pub fn new<R: Rng>(session: &mut Session<R>) -> Result<Self, TileError> {
        session.spawn_tile()?;
        Ok(Self::default())
    }

    pub fn set_new_game_region(&mut self, region: Rect) {
        self.new_game_region = region;
    }

    /// One input tick. `None` is the per-frame tick that keeps the animation phases moving.
    pub fn process_event<R: Rng>(
        &mut self,
        session: &mut Session<R>,
        event: Option<&InputEvent>,
    ) -> Result<GameState, TileError> {
        // Input waits while anything is animating.
        if session.is_animating() {
            session.start_next_phase();
            return Ok(GameState::Playing);
        }

        if self.pending_victory {
            self.pending_victory = false;
            info!("victory with {}", session.engine.score());
            return Ok(GameState::Victory);
        }
        if self.pending_game_over {
            self.pending_game_over = false;
            info!("game over with {}", session.engine.score());
            return Ok(GameState::GameOver);
        }

        match event {
            Some(InputEvent::PointerDown {
                button: PointerButton::Primary,
                column,
                row,
            }) if self.new_game_region.contains(Position::new(*column, *row)) => {
                Ok(GameState::Restarting)
            }
            Some(InputEvent::Key(key)) => match key.direction() {
                Some(direction) => self.play(session, direction),
                None => Ok(GameState::Playing),
            },
            _ => Ok(GameState::Playing),
        }
    }

    fn play<R: Rng>(
        &mut self,
        session: &mut Session<R>,
        direction: Direction,
    ) -> Result<GameState, TileError> {
        let outcome = session.apply_move(direction)?;
        if !outcome.changed {
            return Ok(GameState::Playing);
        }
        // Victory is only declared once the animations have played out.
        if session.engine.check_victory() {
            self.pending_victory = true;
            return Ok(GameState::Playing);
        }
        session.spawn_tile()?;
        if !session.engine.can_move() {
            self.pending_game_over = true;
        }
        Ok(GameState::Playing)
    }

    #[cfg(test)]
    pub fn is_pending_victory(&self) -> bool {
        self.pending_victory
    }

    #[cfg(test)]
    pub fn is_pending_game_over(&self) -> bool {
        self.pending_game_over
    }
}
