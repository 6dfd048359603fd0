//! Control-plane state for the `loudline` binary (§5 "single-threaded
//! cooperative at the control plane"). Owns the audio engine handle,
//! source routing, persisted settings, the two metering loops, the
//! remote ingest client, and keyboard input translation. Nothing here
//! touches a terminal directly — see `ui.rs` for that.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use loudline_core::engine::SourceMode;
use loudline_core::generator::{Routing, SignalKind, SignalPreset};
use loudline_core::meter_state::{loudness_color, MeterState};
use loudline_core::{AudioEngine, MeasureLoop, RenderState, SourceController, TransitionGuard};
use loudline_input::{Command, Direction, InputHandler};
use loudline_remote::{ConnectionState, MetricsFrame, RemoteIngest};
use loudline_state::{AppState, StateChange};

const MEASURE_INTERVAL: Duration = Duration::from_millis(50);
const RENDER_INTERVAL: Duration = Duration::from_micros(16_667);

const SOURCE_RING: [SourceMode; 4] = [
    SourceMode::CaptureA,
    SourceMode::CaptureB,
    SourceMode::Generator,
    SourceMode::Remote,
];

const GENERATOR_KIND_RING: [SignalKind; 8] = [
    SignalKind::Sine,
    SignalKind::Pink,
    SignalKind::White,
    SignalKind::Brown,
    SignalKind::Sweep,
    SignalKind::Glits,
    SignalKind::Lissajous,
    SignalKind::VectorText,
];

const ROUTING_RING: [Routing; 6] = [
    Routing::Stereo,
    Routing::StereoUncorrelated,
    Routing::Mono,
    Routing::LeftOnly,
    Routing::RightOnly,
    Routing::AntiPhase,
];

fn cycle<T: PartialEq + Copy>(ring: &[T], current: T, dir: Direction) -> T {
    let pos = ring.iter().position(|v| *v == current).unwrap_or(0);
    let len = ring.len();
    let next = match dir {
        Direction::Forward => (pos + 1) % len,
        Direction::Backward => (pos + len - 1) % len,
    };
    ring[next]
}

pub struct App {
    pub engine: AudioEngine,
    audio_thread: Option<JoinHandle<()>>,
    pub source: SourceController,
    pub state: AppState,
    state_rx: crossbeam_channel::Receiver<StateChange>,
    pub render: RenderState,
    pub measure: MeasureLoop,
    pub meter: MeterState,
    pub guard: TransitionGuard,
    pub remote: RemoteIngest,
    remote_rt: tokio::runtime::Runtime,
    frame_rx: tokio::sync::broadcast::Receiver<MetricsFrame>,
    pub input: InputHandler,
    last_measure_tick: Instant,
    last_render_tick: Instant,
    pub status_line: String,
    pub should_quit: bool,
}

impl App {
    pub fn new(sample_rate: f32) -> anyhow::Result<Self> {
        let now = Instant::now();
        let (engine, audio_thread) = AudioEngine::spawn(sample_rate);
        let mut state = AppState::load(now);
        let state_rx = state.subscribe();

        let remote_rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        let remote = RemoteIngest::new();
        let frame_rx = remote.subscribe_frames();

        let mut measure = MeasureLoop::new(sample_rate as f64, state.radar_window_s(), now);
        measure.set_radar_window_seconds(state.radar_window_s());

        Ok(Self {
            engine,
            audio_thread: Some(audio_thread),
            source: SourceController::new(),
            state,
            state_rx,
            render: RenderState::new(sample_rate),
            measure,
            meter: MeterState::default(),
            guard: TransitionGuard::new(),
            remote,
            remote_rt,
            frame_rx,
            input: InputHandler::new(),
            last_measure_tick: now,
            last_render_tick: now,
            status_line: "loudline | press ? for help, : for command mode".to_string(),
            should_quit: false,
        })
    }

    /// Applies the persisted generator preset / trims / target once at
    /// startup, after the source controller and engine both exist.
    pub fn apply_persisted_settings(&mut self) {
        for mode in [SourceMode::CaptureA, SourceMode::CaptureB, SourceMode::Generator] {
            self.source.set_trim_db(mode, self.state.trim_db(mode), &self.engine);
            self.source.set_monitor_gain(mode, self.state.monitor_gain(mode), &self.engine);
            self.source
                .set_monitor_muted(mode, self.state.monitor_muted(mode), &self.engine);
        }
        self.source.set_generator_preset(self.state.generator_preset(), &self.engine);
    }

    /// Drains engine events and setting-change notifications, then
    /// runs whichever of the two metering ticks are due. Call once per
    /// loop iteration from `main`.
    pub fn tick(&mut self, now: Instant) {
        self.source.poll_events(&self.engine);
        self.state
            .set_active_mode(self.source.active(), self.source.capture_metadata().cloned());
        self.drain_state_changes(now);

        if self.source.active() == SourceMode::Remote {
            self.tick_remote(now);
            return;
        }

        if now.duration_since(self.last_render_tick) >= RENDER_INTERVAL {
            let limit = self.state.true_peak_limit_dbtp();
            self.meter.fast = self.render.tick(&self.engine.window(), limit, now);
            self.last_render_tick = now;
        }

        if now.duration_since(self.last_measure_tick) >= MEASURE_INTERVAL {
            let dt_s = now.duration_since(self.last_measure_tick).as_secs_f32();
            let fast_snapshot = loudline_core::measure_loop::FastSnapshot {
                true_peak_dbtp: self.meter.fast.true_peak_dbtp,
                ppm_dbfs: self.meter.fast.ppm_dbfs,
            };
            let preset = self.state.generator_preset();
            let pulse_requested = self.source.active() == SourceMode::Generator && preset.pulsed_stereo_id;
            let (slow, pulse_gain) = self.measure.tick(
                self.render.window(),
                &fast_snapshot,
                self.source.active() != SourceMode::None,
                pulse_requested,
                self.state.target_lufs(),
                &self.guard,
                now,
                dt_s,
            );
            self.meter.slow = slow;
            self.engine.send(loudline_core::AudioCommand::SetPulseGainL(pulse_gain));
            self.last_measure_tick = now;
        }
    }

    /// Remote-fed tick (§4.10): frames replace both loops' outputs
    /// directly rather than being re-derived from a sample window.
    fn tick_remote(&mut self, now: Instant) {
        match self.frame_rx.try_recv() {
            Ok(frame) => {
                self.meter.fast = self.remote.apply_frame(&frame, now);
                let target = self.state.target_lufs();
                self.meter.slow = loudline_core::meter_state::SlowMetrics {
                    momentary_lufs: finite(frame.lufs.m),
                    short_term_lufs: finite(frame.lufs.s),
                    integrated_lufs: finite(frame.lufs.i),
                    loudness_range_lu: finite(frame.lufs.lra),
                    crest_db: Some(
                        self.meter.fast.true_peak_dbtp[0].max(self.meter.fast.true_peak_dbtp[1])
                            - self.meter.fast.ppm_dbfs[0].max(self.meter.fast.ppm_dbfs[1]),
                    ),
                    tp_max_cumulative_dbtp: self.meter.slow.tp_max_cumulative_dbtp.max(
                        self.meter.fast.true_peak_dbtp[0].max(self.meter.fast.true_peak_dbtp[1]),
                    ),
                    elapsed_s: self.meter.slow.elapsed_s,
                    color: finite(frame.lufs.m).map(|m| loudness_color(m, target)),
                };
            }
            Err(tokio::sync::broadcast::error::TryRecvError::Empty) => {}
            Err(tokio::sync::broadcast::error::TryRecvError::Closed)
            | Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => {
                self.frame_rx = self.remote.subscribe_frames();
            }
        }
    }

    fn drain_state_changes(&mut self, now: Instant) {
        while let Ok(change) = self.state_rx.try_recv() {
            match change {
                StateChange::TargetLufs(_) | StateChange::TruePeakLimitDbtp(_) => {
                    self.measure.reset(now);
                    self.render.reset();
                }
                StateChange::RadarWindowS(seconds) => self.measure.set_radar_window_seconds(seconds),
                _ => {}
            }
        }
    }

    pub fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SwitchSource(mode) => self.source.switch_source(mode, &self.engine),
            Command::CycleSource(dir) => {
                let next = cycle(&SOURCE_RING, self.source.selected(), dir);
                self.source.switch_source(next, &self.engine);
            }
            Command::CycleGeneratorKind(dir) => {
                let mut preset = self.state.generator_preset();
                preset.kind = cycle(&GENERATOR_KIND_RING, preset.kind, dir);
                self.apply_generator_preset(preset);
            }
            Command::CycleRouting => {
                let mut preset = self.state.generator_preset();
                preset.routing = cycle(&ROUTING_RING, preset.routing, Direction::Forward);
                self.apply_generator_preset(preset);
            }
            Command::AdjustGeneratorLevel(delta) => {
                let mut preset = self.state.generator_preset();
                preset.level_dbfs = (preset.level_dbfs + delta).clamp(-60.0, 0.0);
                self.apply_generator_preset(preset);
            }
            Command::AdjustGeneratorFreq(delta) => {
                let mut preset = self.state.generator_preset();
                preset.freq_hz = (preset.freq_hz + delta).clamp(20.0, 20_000.0);
                self.apply_generator_preset(preset);
            }
            Command::ToggleStereoIdPulse => {
                let mut preset = self.state.generator_preset();
                preset.pulsed_stereo_id = !preset.pulsed_stereo_id;
                self.apply_generator_preset(preset);
            }
            Command::AdjustTrim(mode, delta) => {
                let db = (self.state.trim_db(mode) + delta).clamp(-24.0, 24.0);
                self.source.set_trim_db(mode, db, &self.engine);
                self.state.set_trim_db(mode, db);
            }
            Command::AdjustMonitorGain(mode, delta) => {
                let gain = (self.state.monitor_gain(mode) + delta).clamp(0.0, 1.0);
                self.source.set_monitor_gain(mode, gain, &self.engine);
                self.state.set_monitor_gain(mode, gain);
            }
            Command::ToggleMonitorMute(mode) => {
                let muted = !self.state.monitor_muted(mode);
                self.source.set_monitor_muted(mode, muted, &self.engine);
                self.state.set_monitor_muted(mode, muted);
            }
            Command::AdjustTargetLufs(delta) => {
                self.state.set_target_lufs(self.state.target_lufs() + delta);
            }
            Command::AdjustTruePeakLimit(delta) => {
                self.state
                    .set_true_peak_limit_dbtp(self.state.true_peak_limit_dbtp() + delta);
            }
            Command::AdjustRadarWindow(delta) => {
                let seconds = (self.state.radar_window_s() + delta).clamp(10.0, 300.0);
                self.state.set_radar_window_s(seconds);
            }
            Command::ResetMeters => {
                self.measure.reset(Instant::now());
                self.render.reset();
            }
            Command::ExecuteCommand(text) => self.execute_typed_command(&text),
            Command::Quit => self.should_quit = true,
            Command::CycleFocus
            | Command::EnterCommandMode
            | Command::EnterNormalMode
            | Command::ToggleHelp
            | Command::Cancel
            | Command::HelpScrollUp
            | Command::HelpScrollDown => {}
        }
    }

    fn apply_generator_preset(&mut self, preset: SignalPreset) {
        self.source.set_generator_preset(preset, &self.engine);
        self.state.set_generator_preset(preset);
    }

    /// `:`-prefixed command-mode input (§6 external interfaces): a
    /// small vocabulary for remote-broker control that has no natural
    /// single-keystroke binding.
    fn execute_typed_command(&mut self, text: &str) {
        let mut parts = text.split_whitespace();
        match parts.next() {
            Some("quit") | Some("q") => self.should_quit = true,
            Some("connect") => {
                if let Some(url) = parts.next() {
                    let url = url.to_string();
                    let result = self.remote_rt.block_on(self.remote.connect(&url));
                    self.status_line = match result {
                        Ok(()) => format!("connected to {url}"),
                        Err(e) => format!("connect failed: {e}"),
                    };
                }
            }
            Some("subscribe") => {
                if let Some(probe_id) = parts.next() {
                    let probe_id = probe_id.to_string();
                    let result = self.remote_rt.block_on(self.remote.subscribe(&probe_id));
                    self.status_line = match result {
                        Ok(()) => format!("subscribed to {probe_id}"),
                        Err(e) => format!("subscribe failed: {e}"),
                    };
                }
            }
            Some("refresh") => {
                let result = self.remote_rt.block_on(self.remote.refresh_probe_list());
                if let Err(e) = result {
                    self.status_line = format!("refresh failed: {e}");
                }
            }
            Some(other) => self.status_line = format!("unknown command: {other}"),
            None => {}
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.remote_rt.block_on(self.remote.state())
    }

    pub fn shutdown(&mut self) {
        self.engine.shutdown();
        if let Some(handle) = self.audio_thread.take() {
            let _ = handle.join();
        }
        let _ = self.state.save();
    }
}

fn finite(v: f32) -> Option<f32> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}
