//! Dual-channel Nordic PPM bar widget with peak-over highlight.

use crate::theme::Theme;
use crate::traits::{Resizable, TimeDomainWidget};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Span,
    widgets::{Block, Borders, Widget},
};

const MIN_DB: f32 = -42.0;
const MAX_DB: f32 = 6.0;

fn db_to_position(db: f32) -> f32 {
    ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0)
}

/// Vertical PPM bars for L/R with hold markers and a red over-limit row.
pub struct PpmBarWidget<'a> {
    theme: &'a Theme,
    ppm_dbfs: [f32; 2],
    hold_dbfs: [f32; 2],
    limit_dbtp: f32,
    peak_over: bool,
    width: u16,
    height: u16,
}

impl<'a> PpmBarWidget<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self {
            theme,
            ppm_dbfs: [f32::NEG_INFINITY; 2],
            hold_dbfs: [f32::NEG_INFINITY; 2],
            limit_dbtp: -1.0,
            peak_over: false,
            width: 0,
            height: 0,
        }
    }

    pub fn limit_dbtp(mut self, limit_dbtp: f32) -> Self {
        self.limit_dbtp = limit_dbtp;
        self
    }

    fn set(&mut self, ppm_dbfs: [f32; 2], hold_dbfs: [f32; 2]) {
        self.ppm_dbfs = ppm_dbfs;
        self.hold_dbfs = hold_dbfs;
    }

    /// Peak-over is latch state owned by RenderState, not a per-tick
    /// buffer value, so it arrives through its own setter rather than
    /// through [`TimeDomainWidget::draw`].
    pub fn set_peak_over(&mut self, peak_over: bool) {
        self.peak_over = peak_over;
    }
}

impl Resizable for PpmBarWidget<'_> {
    fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }
}

/// The "L/R buffers" here are pre-reduced PPM readings, not raw
/// samples; RenderState already ran the ballistics (§4.9). Each slice
/// carries `[current, hold]` for its channel.
impl TimeDomainWidget for PpmBarWidget<'_> {
    fn draw(&mut self, buf_l: &[f32], buf_r: &[f32], should_render: bool) {
        if !should_render {
            return;
        }
        let l = buf_l.first().copied().unwrap_or(f32::NEG_INFINITY);
        let r = buf_r.first().copied().unwrap_or(f32::NEG_INFINITY);
        let hold_l = buf_l.get(1).copied().unwrap_or(f32::NEG_INFINITY);
        let hold_r = buf_r.get(1).copied().unwrap_or(f32::NEG_INFINITY);
        self.set([l, r], [hold_l, hold_r]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_to_position_clamps_to_unit_range() {
        assert_eq!(db_to_position(MIN_DB - 10.0), 0.0);
        assert_eq!(db_to_position(MAX_DB + 10.0), 1.0);
        assert!(db_to_position(MIN_DB) < db_to_position(MAX_DB));
    }

    #[test]
    fn draw_extracts_current_and_hold_from_each_slice() {
        let mut widget = PpmBarWidget::new(&crate::theme::PHOSPHOR_GREEN);
        widget.draw(&[-6.0, -3.0], &[-9.0, -4.0], true);
        assert_eq!(widget.ppm_dbfs, [-6.0, -9.0]);
        assert_eq!(widget.hold_dbfs, [-3.0, -4.0]);
    }

    #[test]
    fn draw_skips_update_when_should_render_is_false() {
        let mut widget = PpmBarWidget::new(&crate::theme::PHOSPHOR_GREEN);
        widget.draw(&[-6.0, -9.0], &[-3.0, -4.0], true);
        widget.draw(&[-1.0, -1.0], &[-1.0, -1.0], false);
        assert_eq!(widget.ppm_dbfs, [-6.0, -9.0]);
    }
}

impl Widget for &PpmBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let title = if self.peak_over { " PPM ! " } else { " PPM " };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(if self.peak_over {
                Style::default().fg(self.theme.red)
            } else {
                self.theme.border()
            })
            .title(Span::styled(title, self.theme.title()));

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width < 7 || inner.height < 3 {
            return;
        }

        let height = inner.height as usize;
        for (channel, x_offset) in [(0usize, 0u16), (1usize, 3u16)] {
            let fill = db_to_position(self.ppm_dbfs[channel]);
            let hold = db_to_position(self.hold_dbfs[channel]);
            let hold_row = ((1.0 - hold) * (height - 1) as f32).round() as usize;

            for row in 0..height {
                let row_ratio = 1.0 - row as f32 / (height - 1).max(1) as f32;
                let row_db = MIN_DB + row_ratio * (MAX_DB - MIN_DB);
                let filled = fill >= row_ratio;
                let style = if filled {
                    self.theme.peak_style(row_db, self.limit_dbtp)
                } else {
                    self.theme.dim()
                };
                let ch = if row == hold_row { '▓' } else if filled { '█' } else { ' ' };
                let x = inner.x + x_offset;
                let y = inner.y + row as u16;
                buf[(x, y)].set_char(ch).set_style(style);
            }
        }
    }
}
