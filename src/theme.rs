//! Classic 2048 colours: hex table → ratatui Color.

use ratatui::style::Color;
use thiserror::Error;

/// Tile backgrounds for 2, 4, 8, ... 2048.
const TILE_HEX: [&str; 11] = [
    "#EEE4DA", "#EDE0C8", "#F2B179", "#F59563", "#F67C5F", "#F65E3B", "#EDCF72", "#EDCC61",
    "#EDC850", "#EDC53F", "#EDC22E",
];

/// Tiles above 2048.
const SUPER_TILE_HEX: &str = "#3C3A32";

/// Colours for the board, tiles and panels.
#[derive(Debug, Clone)]
pub struct Theme {
    pub tiles: [Color; 11],
    pub super_tile: Color,
    /// Screen background.
    pub bg: Color,
    /// Board frame, also the gaps between cells.
    pub grid_bg: Color,
    pub empty_cell: Color,
    /// Text on 2 and 4.
    pub text_dark: Color,
    /// Text on everything from 8 up.
    pub text_light: Color,
    pub score_bg: Color,
    pub score_fg: Color,
    pub new_game_bg: Color,
    pub new_game_fg: Color,
    pub victory_card: Color,
    pub victory_fg: Color,
    pub game_over_card: Color,
    pub game_over_fg: Color,
    /// Footer hints.
    pub hint_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Theme {
    pub fn classic() -> Result<Self, ThemeError> {
        let mut tiles = [Color::Reset; 11];
        for (slot, hex) in tiles.iter_mut().zip(TILE_HEX) {
            *slot = parse_hex(hex)?;
        }
        Ok(Self {
            tiles,
            super_tile: parse_hex(SUPER_TILE_HEX)?,
            bg: parse_hex("#FAF8EF")?,
            grid_bg: parse_hex("#BBADA0")?,
            empty_cell: parse_hex("#CDC1B4")?,
            text_dark: parse_hex("#776E65")?,
            text_light: parse_hex("#F9F6F2")?,
            score_bg: parse_hex("#BBADA0")?,
            score_fg: parse_hex("#FFFFFF")?,
            new_game_bg: parse_hex("#8F7A66")?,
            new_game_fg: parse_hex("#F9F6F2")?,
            victory_card: parse_hex("#EDC22E")?,
            victory_fg: parse_hex("#F9F6F2")?,
            game_over_card: parse_hex("#EEE4DA")?,
            game_over_fg: parse_hex("#776E65")?,
            hint_fg: parse_hex("#776E65")?,
        })
    }

    /// Background for a tile value.
    pub fn tile_color(&self, value: u32) -> Color {
        if value < 2 || !value.is_power_of_two() {
            return self.empty_cell;
        }
        let index = value.trailing_zeros() as usize - 1;
        self.tiles.get(index).copied().unwrap_or(self.super_tile)
    }

    #[inline]
    pub fn text_color(&self, value: u32) -> Color {
        if value <= 4 {
            self.text_dark
        } else {
            self.text_light
        }
    }
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
    let (r, g, b) = if !s.is_ascii() {
        return Err(invalid());
    } else if s.len() == 6 {
        (channel(&s[0..2])?, channel(&s[2..4])?, channel(&s[4..6])?)
    } else if s.len() == 3 {
        (
            channel(&s[0..1])? * 17,
            channel(&s[1..2])? * 17,
            channel(&s[2..3])? * 17,
        )
    } else {
        return Err(invalid());
    };
    Ok(Color::Rgb(r, g, b))
}
