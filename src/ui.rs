//! Layout and drawing: header (new game, score, best), board, tiles, win/lose overlay.

use crate::app::Screen;
use crate::session::TileView;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// One grid cell in terminal cells.
const CELL_WIDTH: u16 = 7;
const CELL_HEIGHT: u16 = 3;
/// Gap between cells (and around the edge) in terminal cells.
const GAP_X: u16 = 1;
const GAP_Y: u16 = 1;

const HEADER_HEIGHT: u16 = 3;
const FOOTER_HEIGHT: u16 = 1;
const NEW_GAME_WIDTH: u16 = 12;
const SCORE_BOX_WIDTH: u16 = 9;

/// Overlay fade-in in ms.
const OVERLAY_FADE_MS: u32 = 400;
const OVERLAY_HINT: &str = " Enter/Space/R: New game  Q: Quit ";
/// Wide enough for the hint plus borders.
const OVERLAY_WIDTH: u16 = 36;
const OVERLAY_HEIGHT: u16 = 8;

/// Screen regions for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardLayout {
    pub new_game: Rect,
    pub score: Rect,
    pub best: Rect,
    pub board: Rect,
    pub footer: Rect,
}

fn board_extent(size: usize, cell: u16, gap: u16) -> u16 {
    size as u16 * cell + (size as u16 + 1) * gap
}

/// Centre the header, board and footer in `area` for an N×N board.
pub fn layout(area: Rect, size: usize) -> BoardLayout {
    let board_w = board_extent(size, CELL_WIDTH, GAP_X);
    let board_h = board_extent(size, CELL_HEIGHT, GAP_Y);
    let header_w = NEW_GAME_WIDTH + 1 + SCORE_BOX_WIDTH * 2 + 1;
    let total_w = board_w.max(header_w);
    let total_h = HEADER_HEIGHT + 1 + board_h + 1 + FOOTER_HEIGHT;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let column = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_h),
            Constraint::Fill(1),
        ])
        .split(horiz[1])[1];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Length(1),
            Constraint::Length(board_h),
            Constraint::Length(1),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(column);

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(NEW_GAME_WIDTH),
            Constraint::Fill(1),
            Constraint::Length(SCORE_BOX_WIDTH),
            Constraint::Length(1),
            Constraint::Length(SCORE_BOX_WIDTH),
        ])
        .split(rows[0]);

    let board = Rect {
        x: rows[2].x + rows[2].width.saturating_sub(board_w) / 2,
        y: rows[2].y,
        width: board_w.min(rows[2].width),
        height: rows[2].height,
    };

    BoardLayout {
        new_game: header[0],
        score: header[2],
        best: header[4],
        board,
        footer: rows[4],
    }
}

/// Draw one frame and return its layout (the caller needs the New Game region).
/// On Victory/GameOver the overlay fades in unless `no_animation`; `overlay_effect` and
/// `overlay_process_time` carry the TachyonFX state between frames.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    theme: &Theme,
    size: usize,
    tiles: &[TileView],
    score: u32,
    best: u32,
    overlay_effect: &mut Option<Effect>,
    overlay_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) -> BoardLayout {
    let area = frame.area();
    fill(frame.buffer_mut(), area, theme.bg);

    let regions = layout(area, size);
    draw_header(frame, theme, &regions, score, best);
    draw_board(frame.buffer_mut(), regions.board, theme, size, tiles);
    draw_footer(frame, theme, regions.footer);

    match screen {
        Screen::Playing => {}
        Screen::Victory | Screen::GameOver => {
            let card = draw_overlay(frame, theme, regions.board, screen, score);
            if !no_animation {
                apply_overlay_effect(
                    frame,
                    theme,
                    card,
                    overlay_effect,
                    overlay_process_time,
                    now,
                );
            }
        }
    }
    regions
}

fn fill(buf: &mut Buffer, rect: Rect, color: Color) {
    let rect = rect.intersection(*buf.area());
    let style = Style::default().bg(color);
    for y in rect.top()..rect.bottom() {
        for x in rect.left()..rect.right() {
            buf[(x, y)].set_symbol(" ").set_style(style);
        }
    }
}

fn draw_header(frame: &mut Frame, theme: &Theme, regions: &BoardLayout, score: u32, best: u32) {
    let bold = Modifier::BOLD;
    let button = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "NEW GAME",
            Style::default().fg(theme.new_game_fg).add_modifier(bold),
        )),
    ])
    .alignment(Alignment::Center)
    .style(Style::default().bg(theme.new_game_bg));
    frame.render_widget(button, regions.new_game);

    for (rect, title, value) in [(regions.score, "SCORE", score), (regions.best, "BEST", best)] {
        let panel = Paragraph::new(vec![
            Line::from(Span::styled(title, Style::default().fg(theme.empty_cell))),
            Line::from(Span::styled(
                value.to_string(),
                Style::default().fg(theme.score_fg).add_modifier(bold),
            )),
        ])
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.score_bg));
        frame.render_widget(panel, rect);
    }
}

fn draw_footer(frame: &mut Frame, theme: &Theme, area: Rect) {
    let hint = Paragraph::new(Line::from(Span::styled(
        "←↑↓→ hjkl wasd move · click NEW GAME to restart · q quit",
        Style::default().fg(theme.hint_fg),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(hint, area);
}

/// Top-left corner of grid cell (row, col); fractional positions interpolate.
fn cell_origin(board: Rect, position: (f64, f64)) -> (f64, f64) {
    let (row, col) = position;
    let x = board.x as f64 + GAP_X as f64 + col * (CELL_WIDTH + GAP_X) as f64;
    let y = board.y as f64 + GAP_Y as f64 + row * (CELL_HEIGHT + GAP_Y) as f64;
    (x, y)
}

/// Screen rect of a tile at `position`, scaled around the cell centre and clipped to the board.
fn tile_rect(board: Rect, position: (f64, f64), scale: f64) -> Rect {
    let (x, y) = cell_origin(board, position);
    let cx = x + CELL_WIDTH as f64 / 2.0;
    let cy = y + CELL_HEIGHT as f64 / 2.0;
    let w = (CELL_WIDTH as f64 * scale).round().max(1.0);
    let h = (CELL_HEIGHT as f64 * scale).round().max(1.0);
    let left = (cx - w / 2.0).round().max(0.0);
    let top = (cy - h / 2.0).round().max(0.0);
    Rect::new(left as u16, top as u16, w as u16, h as u16).intersection(board)
}

/// Board background, empty cells, then tiles in arena order.
fn draw_board(buf: &mut Buffer, board: Rect, theme: &Theme, size: usize, tiles: &[TileView]) {
    fill(buf, board, theme.grid_bg);
    for row in 0..size {
        for col in 0..size {
            fill(buf, tile_rect(board, (row as f64, col as f64), 1.0), theme.empty_cell);
        }
    }
    for tile in tiles {
        draw_tile(buf, board, theme, tile);
    }
}

fn draw_tile(buf: &mut Buffer, board: Rect, theme: &Theme, tile: &TileView) {
    let rect = tile_rect(board, tile.position, tile.scale);
    if rect.is_empty() {
        return;
    }
    let bg = theme.tile_color(tile.value);
    fill(buf, rect, bg);

    let label = tile.value.to_string();
    let len = label.len() as u16;
    if len <= rect.width {
        let style = Style::default()
            .fg(theme.text_color(tile.value))
            .bg(bg)
            .add_modifier(Modifier::BOLD);
        let x = rect.x + (rect.width - len) / 2;
        let y = rect.y + rect.height / 2;
        buf.set_string(x, y, label, style);
    }
}

/// Victory / game-over card centred on the board. Returns the card rect.
fn draw_overlay(frame: &mut Frame, theme: &Theme, board: Rect, screen: Screen, score: u32) -> Rect {
    let card = overlay_rect(frame.area(), board);
    frame.render_widget(Clear, card);
    frame.render_widget(overlay_paragraph(theme, screen, score), card);
    card
}

/// Card centred on the board; it may spill past a small board but stays inside `area`.
fn overlay_rect(area: Rect, board: Rect) -> Rect {
    let width = OVERLAY_WIDTH.min(area.width);
    let height = OVERLAY_HEIGHT.min(area.height);
    let centre_x = board.x + board.width / 2;
    let centre_y = board.y + board.height / 2;
    let x = centre_x
        .saturating_sub(width / 2)
        .clamp(area.x, area.right().saturating_sub(width));
    let y = centre_y
        .saturating_sub(height / 2)
        .clamp(area.y, area.bottom().saturating_sub(height));
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn overlay_paragraph(theme: &Theme, screen: Screen, score: u32) -> Paragraph<'static> {
    let (title, bg, fg) = if screen == Screen::Victory {
        (" You win! ", theme.victory_card, theme.victory_fg)
    } else {
        (" Game over! ", theme.game_over_card, theme.game_over_fg)
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default().fg(fg).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", score), Style::default().fg(fg))),
        Line::from(""),
        Line::from(Span::styled(OVERLAY_HINT, Style::default().fg(fg))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(fg).bg(bg))
                .style(Style::default().bg(bg)),
        )
}

/// Create the overlay fade on first use and advance it by the time since the last frame.
fn apply_overlay_effect(
    frame: &mut Frame,
    theme: &Theme,
    card: Rect,
    overlay_effect: &mut Option<Effect>,
    overlay_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = overlay_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *overlay_process_time = Some(now);

    if overlay_effect.is_none() {
        let effect = fx::fade_from(theme.bg, theme.bg, (OVERLAY_FADE_MS, Interpolation::Linear))
            .with_area(card);
        *overlay_effect = Some(effect);
    }
    if let Some(effect) = overlay_effect {
        frame.render_effect(effect, card, TfxDuration::from_millis(delta_ms));
    }
}
