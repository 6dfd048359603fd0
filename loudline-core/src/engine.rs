//! Real-time audio thread: owns the cpal device(s), the source graph
//! (capture or generator → trim → analysis bus → monitor output), and
//! the single producer side of the shared [`SampleWindow`].
//!
//! Structured after the teacher's command/event channel split (one
//! `Sender<AudioCommand>` into the audio thread, one `Receiver<AudioEvent>`
//! out of it) so the control plane never blocks on the real-time thread
//! and the real-time thread never blocks on the control plane.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;

use crate::error::CaptureError;
use crate::generator::{SignalGenerator, SignalPreset};
use crate::sample_window::{SampleWindow, WINDOW_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceMode {
    None,
    CaptureA,
    CaptureB,
    Generator,
    Remote,
}

#[derive(Debug, Clone)]
pub enum AudioCommand {
    SwitchSource(SourceMode),
    SetCaptureDevice { mode: SourceMode, device_name: Option<String> },
    SetTrimDb(SourceMode, f32),
    SetMonitorGain(SourceMode, f32),
    SetMonitorMute(SourceMode, bool),
    SetGeneratorPreset(SignalPreset),
    /// L-channel gain override driven by the EBU stereo-ID pulse state
    /// machine (§4.6); bypassed when no pulsed preset is active.
    SetPulseGainL(f32),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum AudioEvent {
    CaptureStarted {
        mode: SourceMode,
        channel_count: u16,
        sample_rate: u32,
        device_label: String,
    },
    CaptureFailed {
        mode: SourceMode,
        message: String,
    },
    CaptureEnded {
        mode: SourceMode,
    },
    Error(String),
}

const RING_CAPACITY_FRAMES: usize = 8192;

/// `cpal::Stream` carries a `PhantomData<*mut ()>` marker that makes it
/// `!Send` on every platform, even though the stream itself is only ever
/// touched from the thread that owns it (the real-time audio thread) and
/// is otherwise inert — it just needs to live as long as the stream it
/// guards. Wrapping it lets `EngineState`/`CaptureSource` live inside the
/// `Arc<Mutex<_>>` the cpal output callback closure must be `Send` to capture.
struct StreamHandle(cpal::Stream);
unsafe impl Send for StreamHandle {}
unsafe impl Sync for StreamHandle {}

/// One capture device's input ring-buffer consumer, fed by its own
/// cpal input stream running concurrently with the monitor output
/// stream.
struct CaptureSource {
    consumer: ringbuf::HeapCons<(f32, f32)>,
    _stream: StreamHandle,
    channel_count: u16,
    sample_rate: u32,
    device_label: String,
}

impl CaptureSource {
    fn next_pair(&mut self) -> (f32, f32) {
        self.consumer.try_pop().unwrap_or((0.0, 0.0))
    }
}

fn open_capture(device: &cpal::Device) -> Result<(CaptureSource, cpal::StreamConfig), CaptureError> {
    let config = device
        .default_input_config()
        .map_err(|e| CaptureError::StreamBuildFailed(e.to_string()))?;
    let stream_config: cpal::StreamConfig = config.clone().into();
    let channel_count = stream_config.channels;
    let sample_rate = stream_config.sample_rate.0;
    let device_label = device.name().unwrap_or_else(|_| "unknown device".to_string());

    let ring = HeapRb::<(f32, f32)>::new(RING_CAPACITY_FRAMES);
    let (mut producer, consumer) = ring.split();

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if channel_count >= 2 {
                    for frame in data.chunks(channel_count as usize) {
                        let _ = producer.try_push((frame[0], frame[1]));
                    }
                } else {
                    for &sample in data {
                        let _ = producer.try_push((sample, sample));
                    }
                }
            },
            |err| {
                tracing::warn!(error = %err, "capture input stream error");
            },
            None,
        )
        .map_err(|e| CaptureError::StreamBuildFailed(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CaptureError::StreamBuildFailed(e.to_string()))?;

    Ok((
        CaptureSource {
            consumer,
            _stream: StreamHandle(stream),
            channel_count,
            sample_rate,
            device_label,
        },
        stream_config,
    ))
}

/// The real-time-thread-owned graph state: current source, per-source
/// trim/monitor settings, the generator, and the window producer.
struct EngineState {
    sample_rate: f32,
    active: SourceMode,
    trims_db: [f32; 3],
    monitor_gains: [f32; 3],
    monitor_muted: [bool; 3],
    capture_a: Option<CaptureSource>,
    capture_b: Option<CaptureSource>,
    generator: SignalGenerator,
    pulse_gain_l: f32,
    window: Arc<SampleWindow>,
    block_left: Box<[f32; WINDOW_SIZE]>,
    block_right: Box<[f32; WINDOW_SIZE]>,
    block_pos: usize,
}

fn mode_index(mode: SourceMode) -> Option<usize> {
    match mode {
        SourceMode::CaptureA => Some(0),
        SourceMode::CaptureB => Some(1),
        SourceMode::Generator => Some(2),
        SourceMode::None | SourceMode::Remote => None,
    }
}

impl EngineState {
    fn new(sample_rate: f32, window: Arc<SampleWindow>) -> Self {
        Self {
            sample_rate,
            active: SourceMode::None,
            trims_db: [0.0; 3],
            monitor_gains: [1.0; 3],
            monitor_muted: [false; 3],
            capture_a: None,
            capture_b: None,
            generator: SignalGenerator::new(sample_rate, SignalPreset::default()),
            pulse_gain_l: 1.0,
            window,
            block_left: Box::new([0.0; WINDOW_SIZE]),
            block_right: Box::new([0.0; WINDOW_SIZE]),
            block_pos: 0,
        }
    }

    fn trim_linear(&self, mode: SourceMode) -> f32 {
        mode_index(mode)
            .map(|i| 10f32.powf(self.trims_db[i] / 20.0))
            .unwrap_or(1.0)
    }

    fn monitor_linear(&self, mode: SourceMode) -> f32 {
        match mode_index(mode) {
            Some(i) if !self.monitor_muted[i] => self.monitor_gains[i],
            _ => 0.0,
        }
    }

    fn next_source_pair(&mut self) -> (f32, f32) {
        match self.active {
            SourceMode::CaptureA => self.capture_a.as_mut().map(CaptureSource::next_pair).unwrap_or((0.0, 0.0)),
            SourceMode::CaptureB => self.capture_b.as_mut().map(CaptureSource::next_pair).unwrap_or((0.0, 0.0)),
            SourceMode::Generator => {
                let mut l = [0.0f32; 1];
                let mut r = [0.0f32; 1];
                self.generator.render(&mut l, &mut r);
                (l[0], r[0])
            }
            SourceMode::None | SourceMode::Remote => (0.0, 0.0),
        }
    }

    /// Called once per output frame from the cpal callback: advances
    /// the source, applies trim, writes to both the analysis bus
    /// (publishing full windows as they fill) and the monitor output.
    fn process_frame(&mut self) -> (f32, f32) {
        let (raw_l, raw_r) = self.next_source_pair();
        let trim = self.trim_linear(self.active);
        let mut analysis_l = raw_l * trim;
        let analysis_r = raw_r * trim;

        if matches!(self.active, SourceMode::Generator) && self.generator.is_pulsed() {
            analysis_l *= self.pulse_gain_l;
        }

        self.block_left[self.block_pos] = analysis_l;
        self.block_right[self.block_pos] = analysis_r;
        self.block_pos += 1;
        if self.block_pos >= WINDOW_SIZE {
            self.window.publish(*self.block_left, *self.block_right);
            self.block_pos = 0;
        }

        let monitor_gain = self.monitor_linear(self.active);
        (analysis_l * monitor_gain, analysis_r * monitor_gain)
    }

    fn handle_command(&mut self, cmd: AudioCommand, host: &cpal::Host, evt_tx: &Sender<AudioEvent>) {
        match cmd {
            AudioCommand::SwitchSource(mode) => self.switch_source(mode, host, evt_tx),
            AudioCommand::SetCaptureDevice { .. } => {
                // Device re-selection re-enters switch_source with the
                // already-active capture mode to rebuild the stream.
                let active = self.active;
                self.switch_source(active, host, evt_tx);
            }
            AudioCommand::SetTrimDb(mode, db) => {
                if let Some(i) = mode_index(mode) {
                    self.trims_db[i] = db;
                }
            }
            AudioCommand::SetMonitorGain(mode, gain) => {
                if let Some(i) = mode_index(mode) {
                    self.monitor_gains[i] = gain.clamp(0.0, 1.0);
                }
            }
            AudioCommand::SetMonitorMute(mode, muted) => {
                if let Some(i) = mode_index(mode) {
                    self.monitor_muted[i] = muted;
                }
            }
            AudioCommand::SetGeneratorPreset(preset) => {
                self.generator.switch_preset(preset);
            }
            AudioCommand::SetPulseGainL(gain) => {
                self.pulse_gain_l = gain;
            }
            AudioCommand::Shutdown => {}
        }
    }

    /// Switch semantics (§4.7): no-op if unchanged; otherwise tear
    /// down the outgoing capture synchronously, then bring up the new
    /// source before resuming.
    fn switch_source(&mut self, mode: SourceMode, host: &cpal::Host, evt_tx: &Sender<AudioEvent>) {
        if mode == self.active {
            return;
        }

        match self.active {
            SourceMode::CaptureA => self.capture_a = None,
            SourceMode::CaptureB => self.capture_b = None,
            _ => {}
        }

        match mode {
            SourceMode::CaptureA | SourceMode::CaptureB => {
                let device = match host.default_input_device() {
                    Some(d) => d,
                    None => {
                        let _ = evt_tx.send(AudioEvent::CaptureFailed {
                            mode,
                            message: "no audio input device found".into(),
                        });
                        self.active = SourceMode::None;
                        return;
                    }
                };
                match open_capture(&device) {
                    Ok((source, _config)) => {
                        let _ = evt_tx.send(AudioEvent::CaptureStarted {
                            mode,
                            channel_count: source.channel_count,
                            sample_rate: source.sample_rate,
                            device_label: source.device_label.clone(),
                        });
                        match mode {
                            SourceMode::CaptureA => self.capture_a = Some(source),
                            SourceMode::CaptureB => self.capture_b = Some(source),
                            _ => unreachable!(),
                        }
                        self.active = mode;
                    }
                    Err(e) => {
                        let _ = evt_tx.send(AudioEvent::CaptureFailed {
                            mode,
                            message: e.to_string(),
                        });
                        self.active = SourceMode::None;
                    }
                }
            }
            SourceMode::Generator | SourceMode::Remote | SourceMode::None => {
                self.active = mode;
            }
        }
    }
}

/// Handle held by the control plane to talk to the real-time thread.
pub struct AudioEngine {
    pub command_tx: Sender<AudioCommand>,
    pub event_rx: Receiver<AudioEvent>,
    shutdown: Arc<AtomicBool>,
    window: Arc<SampleWindow>,
}

impl AudioEngine {
    pub fn create_channels() -> (Sender<AudioCommand>, Receiver<AudioCommand>, Sender<AudioEvent>, Receiver<AudioEvent>) {
        let (cmd_tx, cmd_rx) = bounded(256);
        let (evt_tx, evt_rx) = bounded(256);
        (cmd_tx, cmd_rx, evt_tx, evt_rx)
    }

    /// Spawns the real-time thread and returns a handle plus the
    /// shared sample window the control plane reads from.
    pub fn spawn(sample_rate: f32) -> (Self, thread::JoinHandle<()>) {
        let (cmd_tx, cmd_rx, evt_tx, evt_rx) = Self::create_channels();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let window = Arc::new(SampleWindow::new());
        let window_thread = window.clone();

        let handle = thread::spawn(move || {
            run_audio_thread(sample_rate, window_thread, cmd_rx, evt_tx, shutdown_thread);
        });

        (
            Self {
                command_tx: cmd_tx,
                event_rx: evt_rx,
                shutdown,
                window,
            },
            handle,
        )
    }

    pub fn send(&self, cmd: AudioCommand) {
        let _ = self.command_tx.try_send(cmd);
    }

    pub fn window(&self) -> Arc<SampleWindow> {
        self.window.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.command_tx.try_send(AudioCommand::Shutdown);
    }
}

fn run_audio_thread(
    sample_rate: f32,
    window: Arc<SampleWindow>,
    cmd_rx: Receiver<AudioCommand>,
    evt_tx: Sender<AudioEvent>,
    shutdown: Arc<AtomicBool>,
) {
    let host = cpal::default_host();
    let device = match host.default_output_device() {
        Some(d) => d,
        None => {
            let _ = evt_tx.send(AudioEvent::Error("no audio output device found".into()));
            return;
        }
    };

    let config = match device.default_output_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = evt_tx.send(AudioEvent::Error(format!("failed to get output config: {e}")));
            return;
        }
    };
    let channels = config.channels() as usize;
    let stream_config: cpal::StreamConfig = config.into();

    let state = Arc::new(parking_lot::Mutex::new(EngineState::new(
        sample_rate,
        window,
    )));
    let state_callback = state.clone();

    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let mut engine = state_callback.lock();
            for frame in data.chunks_mut(channels) {
                let (l, r) = engine.process_frame();
                frame[0] = l;
                if frame.len() > 1 {
                    frame[1] = r;
                }
                for sample in frame.iter_mut().skip(2) {
                    *sample = 0.0;
                }
            }
        },
        |err| {
            tracing::warn!(error = %err, "monitor output stream error");
        },
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = evt_tx.send(AudioEvent::Error(format!("failed to build output stream: {e}")));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = evt_tx.send(AudioEvent::Error(format!("failed to start monitor output: {e}")));
        return;
    }

    while !shutdown.load(Ordering::Acquire) {
        match cmd_rx.recv_timeout(Duration::from_millis(10)) {
            Ok(AudioCommand::Shutdown) => break,
            Ok(cmd) => {
                let mut engine = state.lock();
                engine.handle_command(cmd, &host, &evt_tx);
            }
            Err(_) => {}
        }
    }
}
