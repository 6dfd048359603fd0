//! Numeric LUFS readout with display-delay gating (§4.8) and
//! loudness-colour mapping.

use crate::theme::Theme;
use crate::traits::{Resizable, ScalarWidget};
use loudline_core::meter_state::LoudnessColor;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::Span,
    widgets::{Block, Borders, Paragraph, Widget},
};

pub struct LufsReadoutWidget<'a> {
    theme: &'a Theme,
    label: &'static str,
    value: Option<f32>,
    color: Option<LoudnessColor>,
    width: u16,
    height: u16,
}

impl<'a> LufsReadoutWidget<'a> {
    pub fn new(theme: &'a Theme, label: &'static str) -> Self {
        Self { theme, label, value: None, color: None, width: 0, height: 0 }
    }

    pub fn color(mut self, color: Option<LoudnessColor>) -> Self {
        self.color = color;
        self
    }
}

impl Resizable for LufsReadoutWidget<'_> {
    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }
}

/// `None` renders the silence sentinel "--.-" (§4.8, §6 "Silence
/// sentinel") — used both for below-floor and not-yet-gated readings.
impl ScalarWidget for LufsReadoutWidget<'_> {
    fn draw_value(&mut self, metric: Option<f32>) {
        self.value = metric;
    }
}

impl Widget for &LufsReadoutWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(format!(" {} ", self.label), self.theme.title()));

        let text = match self.value {
            Some(v) => format!("{:>6.1} LUFS", v),
            None => "  --.- LUFS".to_string(),
        };
        let style = match self.color {
            Some(c) => self.theme.loudness_style(c),
            None => self.theme.dim(),
        };

        Paragraph::new(Span::styled(text, style)).block(block).render(area, buf);
    }
}
