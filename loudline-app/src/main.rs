//! loudline - terminal stereo loudness, true-peak, PPM and stereo-field
//! meter suite.
//!
//! Wires the real-time audio engine (`loudline-core::AudioEngine`) to
//! a single-threaded control plane (§5) that runs the 20 Hz measure
//! tick and 60 Hz render tick, drives the remote broker client, and
//! renders the result to a terminal.

mod app;
mod ui;

use std::io::Stdout;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use app::App;

const SAMPLE_RATE: f32 = 48_000.0;
const POLL_INTERVAL: Duration = Duration::from_millis(8);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let mut terminal = setup_terminal()?;
    let mut app = App::new(SAMPLE_RATE)?;
    app.apply_persisted_settings();

    let result = run(&mut terminal, &mut app);

    app.shutdown();
    restore_terminal(&mut terminal)?;

    result.map_err(|e| anyhow::anyhow!("loudline exited with error: {e}"))
}

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> anyhow::Result<()> {
    let theme = &loudline_tui::PHOSPHOR_GREEN;

    while !app.should_quit {
        let now = Instant::now();
        app.tick(now);

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(cmd) = app.input.handle_key(key) {
                        app.handle_command(cmd);
                    }
                }
            }
        }

        terminal.draw(|frame| ui::draw(frame, app, theme))?;
    }

    Ok(())
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(terminal.show_cursor()?)
}
