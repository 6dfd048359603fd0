//! Terminal layout: arranges the meter widgets against the current
//! [`App`] state and draws one frame (§6 "Widget interface").

use ratatui::{
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use loudline_core::engine::SourceMode;
use loudline_input::Mode;
use loudline_remote::ConnectionState;
use loudline_tui::widgets::{CorrelationMeterWidget, LufsReadoutWidget, PpmBarWidget};
use loudline_tui::{Resizable, ScalarWidget, Theme, TimeDomainWidget};

use crate::app::App;

fn source_label(mode: SourceMode) -> &'static str {
    match mode {
        SourceMode::None => "NONE",
        SourceMode::CaptureA => "CAPTURE A",
        SourceMode::CaptureB => "CAPTURE B",
        SourceMode::Generator => "GENERATOR",
        SourceMode::Remote => "REMOTE",
    }
}

pub fn draw(frame: &mut Frame, app: &mut App, theme: &'static Theme) {
    let root = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, app, theme, root[0]);
    draw_meters(frame, app, theme, root[1]);
    draw_status(frame, app, theme, root[2]);
}

fn connection_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Connecting => "connecting",
        ConnectionState::Connected => "connected",
        ConnectionState::Reconnecting => "reconnecting",
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Error => "error",
    }
}

fn draw_header(frame: &mut Frame, app: &App, theme: &'static Theme, area: Rect) {
    let block = Block::default().borders(Borders::ALL).border_style(theme.border());
    let source = source_label(app.source.active());
    let focus = source_label(app.input.focused_source());
    let mut spans = vec![
        Span::styled(" loudline ", theme.title()),
        Span::styled(format!("source:{source} "), theme.normal()),
        Span::styled(format!("focus:{focus} "), theme.dim()),
        Span::styled(format!("target:{:.1}LUFS ", app.state.target_lufs()), theme.dim()),
        Span::styled(format!("limit:{:.1}dBTP ", app.state.true_peak_limit_dbtp()), theme.dim()),
    ];
    if app.source.active() == SourceMode::Remote {
        spans.push(Span::styled(
            format!("broker:{} ", connection_label(app.connection_state())),
            theme.dim(),
        ));
    }
    spans.push(Span::styled(format!("[{}]", app.input.mode().display_name()), theme.title()));
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_meters(frame: &mut Frame, app: &mut App, theme: &'static Theme, area: Rect) {
    let cols = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(30), Constraint::Percentage(30)])
        .split(area);

    let lufs_rows = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([Constraint::Length(3); 3])
        .split(cols[0]);

    let should_render = app.guard.should_render(std::time::Instant::now());

    let mut momentary = LufsReadoutWidget::new(theme, "MOMENTARY").color(app.meter.slow.color);
    momentary.resize(lufs_rows[0].width, lufs_rows[0].height);
    momentary.draw_value(app.meter.slow.momentary_lufs);
    frame.render_widget(&momentary, lufs_rows[0]);

    let mut short_term = LufsReadoutWidget::new(theme, "SHORT-TERM").color(app.meter.slow.color);
    short_term.resize(lufs_rows[1].width, lufs_rows[1].height);
    short_term.draw_value(app.meter.slow.short_term_lufs);
    frame.render_widget(&short_term, lufs_rows[1]);

    let mut integrated = LufsReadoutWidget::new(theme, "INTEGRATED").color(app.meter.slow.color);
    integrated.resize(lufs_rows[2].width, lufs_rows[2].height);
    integrated.draw_value(app.meter.slow.integrated_lufs);
    frame.render_widget(&integrated, lufs_rows[2]);

    let mut ppm = PpmBarWidget::new(theme).limit_dbtp(app.state.true_peak_limit_dbtp());
    ppm.resize(cols[1].width, cols[1].height);
    ppm.draw(
        &[app.meter.fast.ppm_dbfs[0], app.meter.fast.ppm_hold_dbfs[0]],
        &[app.meter.fast.ppm_dbfs[1], app.meter.fast.ppm_hold_dbfs[1]],
        should_render,
    );
    ppm.set_peak_over(app.meter.fast.peak_over);
    frame.render_widget(&ppm, cols[1]);

    let mut correlation = CorrelationMeterWidget::new(theme);
    correlation.resize(cols[2].width, cols[2].height);
    correlation.draw_value(Some(app.meter.fast.stereo.correlation));
    frame.render_widget(&correlation, cols[2]);
}

fn draw_status(frame: &mut Frame, app: &App, theme: &'static Theme, area: Rect) {
    let block = Block::default().borders(Borders::ALL).border_style(theme.border());
    let text = match app.input.mode() {
        Mode::Command => format!(":{}", app.input.command_buffer()),
        _ => app.status_line.clone(),
    };
    frame.render_widget(Paragraph::new(Span::styled(text, Style::default())).block(block), area);
}
