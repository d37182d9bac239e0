//! App: terminal init, frame loop, restart and overlay handling.

use crate::GameConfig;
use crate::controller::{Controller, GameState, InputEvent, Key};
use crate::input;
use crate::session::Session;
use crate::theme::Theme;
use crate::ui;
use anyhow::Result;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use log::{error, info};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    Victory,
    GameOver,
}

/// What an overlay key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OverlayChoice {
    Restart,
    Quit,
}

fn overlay_choice(event: &InputEvent) -> Option<OverlayChoice> {
    match event {
        InputEvent::Key(Key::Enter | Key::Space | Key::R) => Some(OverlayChoice::Restart),
        InputEvent::Key(Key::Escape) => Some(OverlayChoice::Quit),
        _ => None,
    }
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    session: Session,
    controller: Controller,
    screen: Screen,
    /// Highest tile seen this run, across restarts.
    best: u32,
    games: u32,
    /// TachyonFX fade for the victory / game-over card (created when the overlay first shows).
    overlay_effect: Option<Effect>,
    /// Last time we processed the overlay effect (for delta).
    overlay_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let mut session = Session::from_config(&config)?;
        let controller = Controller::new(&mut session)?;
        info!(
            "new game: {}x{} seed {:?}",
            config.size, config.size, config.seed
        );
        Ok(Self {
            config,
            theme,
            session,
            controller,
            screen: Screen::Playing,
            best: 0,
            games: 1,
            overlay_effect: None,
            overlay_process_time: None,
        })
    }

    /// Throw the current game away. A fixed seed is offset per game so restarts differ.
    fn reset_game(&mut self) -> Result<()> {
        let mut config = self.config.clone();
        config.seed = self.config.seed.map(|s| s.wrapping_add(u64::from(self.games)));
        self.session = Session::from_config(&config)?;
        self.controller = Controller::new(&mut self.session)?;
        self.screen = Screen::Playing;
        self.overlay_effect = None;
        self.overlay_process_time = None;
        self.games += 1;
        info!("restart (game {}, best {})", self.games, self.best);
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        if let Err(e) = &result {
            error!("session ended: {e:#}");
        }
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate.max(1.0));
        let mut last_frame = Instant::now();
        loop {
            let now = Instant::now();
            let dt = now.saturating_duration_since(last_frame);
            last_frame = now;
            let dt_ms = dt.as_millis().min(u64::MAX as u128) as u64;

            if self.screen == Screen::Playing {
                // Phase activation tick; no input.
                let state = self.controller.process_event(&mut self.session, None)?;
                if self.handle_state(state)? {
                    continue;
                }
            }

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Some(input) = input::translate(&event::read()?) else {
                        continue;
                    };
                    if self.screen == Screen::Playing {
                        if input == InputEvent::Key(Key::Escape) {
                            return Ok(());
                        }
                        let state = self
                            .controller
                            .process_event(&mut self.session, Some(&input))?;
                        if self.handle_state(state)? {
                            break;
                        }
                    } else {
                        match overlay_choice(&input) {
                            Some(OverlayChoice::Restart) => {
                                self.reset_game()?;
                                break;
                            }
                            Some(OverlayChoice::Quit) => return Ok(()),
                            None => {}
                        }
                    }
                }
            }

            if let Err(e) = self.session.advance(dt_ms) {
                if e.is_consistency_failure() {
                    error!("tiles diverged from the grid: {e}");
                }
                return Err(e.into());
            }
            self.best = self.best.max(self.session.engine.score());

            let views = self.session.tile_views();
            let mut new_game_region = None;
            terminal.draw(|f| {
                let regions = ui::draw(
                    f,
                    self.screen,
                    &self.theme,
                    self.config.size,
                    &views,
                    self.session.engine.score(),
                    self.best,
                    &mut self.overlay_effect,
                    &mut self.overlay_process_time,
                    now,
                    self.config.no_animation,
                );
                new_game_region = Some(regions.new_game);
            })?;
            if let Some(region) = new_game_region {
                self.controller.set_new_game_region(region);
            }
        }
    }

    /// Apply a controller result. Returns true when the game was replaced.
    fn handle_state(&mut self, state: GameState) -> Result<bool> {
        match state {
            GameState::Playing => {}
            GameState::Victory => self.screen = Screen::Victory,
            GameState::GameOver => self.screen = Screen::GameOver,
            GameState::Restarting => {
                self.reset_game()?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
