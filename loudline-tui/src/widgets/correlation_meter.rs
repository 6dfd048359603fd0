//! Horizontal stereo correlation meter, [-1, +1].

use crate::theme::Theme;
use crate::traits::{Resizable, ScalarWidget};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Span,
    widgets::{Block, Borders, Widget},
};

pub struct CorrelationMeterWidget<'a> {
    theme: &'a Theme,
    correlation: Option<f32>,
    width: u16,
    height: u16,
}

impl<'a> CorrelationMeterWidget<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme, correlation: None, width: 0, height: 0 }
    }
}

impl Resizable for CorrelationMeterWidget<'_> {
    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }
}

impl ScalarWidget for CorrelationMeterWidget<'_> {
    fn draw_value(&mut self, metric: Option<f32>) {
        self.correlation = metric.filter(|v| v.is_finite());
    }
}

impl Widget for &CorrelationMeterWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border())
            .title(Span::styled(" PHASE ", self.theme.title()));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width < 5 || inner.height < 1 {
            return;
        }

        let track_width = inner.width as usize;
        let y = inner.y + inner.height / 2;
        let center = track_width / 2;

        let Some(corr) = self.correlation else {
            let msg = "-- no signal --";
            let x_start = inner.x + (track_width.saturating_sub(msg.len())) as u16 / 2;
            for (i, ch) in msg.chars().enumerate() {
                buf[(x_start + i as u16, y)].set_char(ch).set_style(self.theme.dim());
            }
            return;
        };

        let normalized = ((corr + 1.0) / 2.0).clamp(0.0, 1.0);
        let marker_pos = (normalized * (track_width.saturating_sub(1)) as f32).round() as usize;

        let marker_style = if corr < -0.5 {
            Style::default().fg(self.theme.red)
        } else if corr < 0.2 {
            Style::default().fg(self.theme.amber)
        } else {
            Style::default().fg(self.theme.green)
        };

        for i in 0..track_width {
            let ch = if i == marker_pos {
                '●'
            } else if i == center {
                '┼'
            } else if i == 0 || i == track_width - 1 {
                '│'
            } else {
                '─'
            };
            let style = if i == marker_pos {
                marker_style
            } else if i == center {
                self.theme.dim()
            } else {
                self.theme.normal()
            };
            buf[(inner.x + i as u16, y)].set_char(ch).set_style(style);
        }
    }
}
