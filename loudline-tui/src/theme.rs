//! Broadcast meter colour palette for the terminal UI.

use loudline_core::meter_state::LoudnessColor;
use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the UI.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub fg: Color,
    pub fg_dim: Color,
    pub bg: Color,
    pub highlight: Color,
    /// Loudness-within-target colour (§4.8 green band).
    pub green: Color,
    /// Loudness-below-target colour (§4.8 cyan band).
    pub cyan: Color,
    /// Loudness-moderately-over colour (§4.8 amber band).
    pub amber: Color,
    /// Loudness-far-over / peak-over colour (§4.8 red band).
    pub red: Color,
    pub left: Color,
    pub right: Color,
}

impl Theme {
    pub fn normal(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.fg_dim).bg(self.bg)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.highlight).add_modifier(Modifier::BOLD)
    }

    pub fn left_style(&self) -> Style {
        Style::default().fg(self.left)
    }

    pub fn right_style(&self) -> Style {
        Style::default().fg(self.right)
    }

    /// Style for a loudness value judged against target (§4.8).
    pub fn loudness_style(&self, color: LoudnessColor) -> Style {
        let fg = match color {
            LoudnessColor::Green => self.green,
            LoudnessColor::Cyan => self.cyan,
            LoudnessColor::Amber => self.amber,
            LoudnessColor::Red => self.red,
        };
        Style::default().fg(fg)
    }

    /// Style for a PPM/True-Peak bar segment at `db` against `limit_db`.
    pub fn peak_style(&self, db: f32, limit_db: f32) -> Style {
        if db >= limit_db {
            Style::default().fg(self.red)
        } else if db >= limit_db - 6.0 {
            Style::default().fg(self.amber)
        } else {
            Style::default().fg(self.green)
        }
    }
}

/// Phosphor-green alignment desk palette: the default for dim control
/// rooms.
pub const PHOSPHOR_GREEN: Theme = Theme {
    name: "phosphor-green",
    fg: Color::Rgb(200, 255, 200),
    fg_dim: Color::Rgb(60, 110, 60),
    bg: Color::Rgb(5, 15, 5),
    highlight: Color::Rgb(255, 255, 255),
    green: Color::Rgb(51, 255, 51),
    cyan: Color::Rgb(51, 220, 255),
    amber: Color::Rgb(255, 190, 40),
    red: Color::Rgb(255, 60, 60),
    left: Color::Rgb(100, 220, 255),
    right: Color::Rgb(255, 150, 100),
};

/// Neutral daylight palette for brightly lit apparatus rooms.
pub const DAYLIGHT: Theme = Theme {
    name: "daylight",
    fg: Color::Rgb(20, 20, 20),
    fg_dim: Color::Rgb(120, 120, 120),
    bg: Color::Rgb(245, 245, 245),
    highlight: Color::Rgb(0, 0, 0),
    green: Color::Rgb(0, 150, 0),
    cyan: Color::Rgb(0, 130, 170),
    amber: Color::Rgb(200, 130, 0),
    red: Color::Rgb(200, 0, 0),
    left: Color::Rgb(0, 90, 200),
    right: Color::Rgb(200, 90, 0),
};
