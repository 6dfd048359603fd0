//! Remote probe ingest (§4.10, §6). A WebSocket client that subscribes
//! to one probe at a time and substitutes its frames into RenderState
//! in place of local capture, running its own peak-hold ballistics so
//! the 3s hold keeps working against a source that is otherwise
//! stateless between frames.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use loudline_core::goniometer::GoniometerPoint as CoreGoniometerPoint;
use loudline_core::meter_state::FastMetrics;
use loudline_core::peak_hold::PeakHold;
use loudline_core::stereo::StereoReading;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::RemoteError;
use crate::frame::{ClientMessage, MetricsFrame, ProbeInfo, ServerMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    Error,
}

fn linear_to_db(v: f32) -> f32 {
    if v > 1e-9 {
        20.0 * v.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Peak-hold continuation across frames, independent of the local
/// True Peak / PPM meters (§4.10).
struct RemotePeakHolds {
    true_peak: [PeakHold; 2],
    ppm: [PeakHold; 2],
}

impl RemotePeakHolds {
    fn new() -> Self {
        Self {
            true_peak: [PeakHold::default(), PeakHold::default()],
            ppm: [PeakHold::default(), PeakHold::default()],
        }
    }

    fn apply(&mut self, frame: &MetricsFrame, now: Instant) -> FastMetrics {
        let tp = [linear_to_db(frame.true_peak.l), linear_to_db(frame.true_peak.r)];
        let ppm = [linear_to_db(frame.ppm.l), linear_to_db(frame.ppm.r)];
        for ch in 0..2 {
            self.true_peak[ch].update(tp[ch], now);
            self.ppm[ch].update(ppm[ch], now);
        }

        let goniometer = frame
            .visualization
            .goniometer_points
            .iter()
            .map(|p| CoreGoniometerPoint { m: p.m, s: p.s })
            .collect();

        FastMetrics {
            true_peak_dbtp: tp,
            true_peak_hold_dbtp: [self.true_peak[0].hold_db(), self.true_peak[1].hold_db()],
            ppm_dbfs: ppm,
            ppm_hold_dbfs: [self.ppm[0].hold_db(), self.ppm[1].hold_db()],
            ppm_dbu: [None, None],
            stereo: StereoReading {
                correlation: frame.stereo.corr,
                balance_db: frame.stereo.bal,
                width: frame.stereo.width,
                width_peak: frame.stereo.width_peak,
                mid_db: frame.stereo.mid,
                side_db: frame.stereo.side,
                rotation: frame.stereo.rot,
            },
            goniometer,
            peak_over: false,
        }
    }

    fn reset(&mut self) {
        for h in self.true_peak.iter_mut().chain(self.ppm.iter_mut()) {
            h.reset();
        }
    }
}

pub struct RemoteIngest {
    state: Arc<RwLock<ConnectionState>>,
    command_tx: mpsc::Sender<ClientMessage>,
    command_rx: Arc<RwLock<Option<mpsc::Receiver<ClientMessage>>>>,
    probe_list_tx: broadcast::Sender<Vec<ProbeInfo>>,
    frame_tx: broadcast::Sender<MetricsFrame>,
    holds: Arc<parking_lot::Mutex<RemotePeakHolds>>,
    subscribed_probe: Arc<RwLock<Option<String>>>,
}

impl RemoteIngest {
    pub fn new() -> Self {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (probe_list_tx, _) = broadcast::channel(16);
        let (frame_tx, _) = broadcast::channel(256);
        Self {
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            command_tx,
            command_rx: Arc::new(RwLock::new(Some(command_rx))),
            probe_list_tx,
            frame_tx,
            holds: Arc::new(parking_lot::Mutex::new(RemotePeakHolds::new())),
            subscribed_probe: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub fn subscribe_frames(&self) -> broadcast::Receiver<MetricsFrame> {
        self.frame_tx.subscribe()
    }

    pub fn subscribe_probe_list(&self) -> broadcast::Receiver<Vec<ProbeInfo>> {
        self.probe_list_tx.subscribe()
    }

    /// Converts a received frame into the shared fast-metrics shape,
    /// updating this ingest's own peak-hold state (§4.10).
    pub fn apply_frame(&self, frame: &MetricsFrame, now: Instant) -> FastMetrics {
        self.holds.lock().apply(frame, now)
    }

    /// The subscribed probe went offline: display/peak-hold state
    /// falls back to idle (§4.10), but the subscription itself is
    /// kept so values resume without a re-subscribe once the probe
    /// comes back online (spec.md S6).
    pub async fn clear(&self) {
        self.holds.lock().reset();
    }

    pub async fn connect(&self, url: &str) -> Result<(), RemoteError> {
        url::Url::parse(url).map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        *self.state.write().await = ConnectionState::Connecting;

        let timeout = Duration::from_secs(5);
        let ws_stream = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| RemoteError::Timeout)?
            .map_err(|e| RemoteError::ConnectionFailed(e.to_string()))?
            .0;

        let (mut write, mut read) = ws_stream.split();

        let command_rx = self.command_rx.write().await.take();
        let mut command_rx = command_rx.ok_or_else(|| {
            RemoteError::ConnectionFailed("ingest already connected".to_string())
        })?;

        let state = Arc::clone(&self.state);
        let frame_tx = self.frame_tx.clone();
        let probe_list_tx = self.probe_list_tx.clone();
        let subscribed_probe = Arc::clone(&self.subscribed_probe);
        let holds = Arc::clone(&self.holds);

        *self.state.write().await = ConnectionState::Connected;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = read.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                handle_server_message(&text, &frame_tx, &probe_list_tx, &subscribed_probe, &holds).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                *state.write().await = ConnectionState::Disconnected;
                                break;
                            }
                            Some(Err(e)) => {
                                tracing::warn!(error = %e, "remote ingest websocket error");
                                *state.write().await = ConnectionState::Error;
                                break;
                            }
                            _ => {}
                        }
                    }
                    cmd = command_rx.recv() => {
                        match cmd {
                            Some(cmd) => {
                                if let Ok(json) = serde_json::to_string(&cmd) {
                                    if write.send(Message::Text(json)).await.is_err() {
                                        *state.write().await = ConnectionState::Error;
                                        break;
                                    }
                                }
                            }
                            None => {
                                let _ = write.send(Message::Close(None)).await;
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(())
    }

    pub async fn subscribe(&self, probe_id: &str) -> Result<(), RemoteError> {
        *self.subscribed_probe.write().await = Some(probe_id.to_string());
        self.send(ClientMessage::Subscribe { probe_id: probe_id.to_string() }).await
    }

    pub async fn unsubscribe(&self, probe_id: &str) -> Result<(), RemoteError> {
        *self.subscribed_probe.write().await = None;
        self.send(ClientMessage::Unsubscribe { probe_id: probe_id.to_string() }).await
    }

    pub async fn refresh_probe_list(&self) -> Result<(), RemoteError> {
        self.send(ClientMessage::RefreshProbeList).await
    }

    async fn send(&self, message: ClientMessage) -> Result<(), RemoteError> {
        self.command_tx.send(message).await.map_err(|_| RemoteError::SendFailed)
    }
}

impl Default for RemoteIngest {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies one parsed broker message. Metrics frames are dropped
/// unless their `probe_id` matches the current subscription (§4.10:
/// "when the frame's probe matches the subscribed probe"); a probe
/// list that reports the subscribed probe offline resets the
/// display/peak-hold state without forgetting the subscription
/// (spec.md S6).
async fn handle_server_message(
    text: &str,
    frame_tx: &broadcast::Sender<MetricsFrame>,
    probe_list_tx: &broadcast::Sender<Vec<ProbeInfo>>,
    subscribed_probe: &RwLock<Option<String>>,
    holds: &parking_lot::Mutex<RemotePeakHolds>,
) {
    let Ok(message) = serde_json::from_str::<ServerMessage>(text) else {
        tracing::warn!(%text, "unparseable broker message");
        return;
    };
    match message {
        ServerMessage::Metrics { probe_id, frame } => {
            if subscribed_probe.read().await.as_deref() == Some(probe_id.as_str()) {
                let _ = frame_tx.send(frame);
            }
        }
        ServerMessage::ProbeList { probes } => {
            if let Some(active) = subscribed_probe.read().await.as_deref() {
                if let Some(probe) = probes.iter().find(|p| p.id == active) {
                    if !probe.is_online {
                        holds.lock().reset();
                    }
                }
            }
            let _ = probe_list_tx.send(probes);
        }
        ServerMessage::Status { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_ingest_starts_disconnected() {
        let ingest = RemoteIngest::new();
        assert_eq!(ingest.state().await, ConnectionState::Disconnected);
    }

    #[test]
    fn apply_frame_converts_linear_to_db_and_holds_peak() {
        let ingest = RemoteIngest::new();
        let frame = MetricsFrame {
            probe_id: "probe-1".to_string(),
            lufs: crate::frame::LufsFields::default(),
            true_peak: crate::frame::StereoPair { l: 0.5, r: 0.25 },
            ppm: crate::frame::StereoPair::default(),
            rms: crate::frame::StereoPair::default(),
            stereo: crate::frame::StereoFields::default(),
            visualization: crate::frame::VisualizationFields::default(),
            latency_ms: 12.0,
        };
        let t0 = Instant::now();
        let fast = ingest.apply_frame(&frame, t0);
        assert!((fast.true_peak_dbtp[0] - 20.0 * 0.5f32.log10()).abs() < 1e-4);
        assert!(fast.true_peak_hold_dbtp[0] >= fast.true_peak_dbtp[0]);
    }

    fn frame_with_peak(probe_id: &str, peak: f32) -> MetricsFrame {
        MetricsFrame {
            probe_id: probe_id.to_string(),
            lufs: crate::frame::LufsFields::default(),
            true_peak: crate::frame::StereoPair { l: peak, r: peak },
            ppm: crate::frame::StereoPair::default(),
            rms: crate::frame::StereoPair::default(),
            stereo: crate::frame::StereoFields::default(),
            visualization: crate::frame::VisualizationFields::default(),
            latency_ms: 12.0,
        }
    }

    #[tokio::test]
    async fn clear_resets_holds_but_keeps_subscription() {
        let ingest = RemoteIngest::new();
        *ingest.subscribed_probe.write().await = Some("probe-1".to_string());
        ingest.apply_frame(&frame_with_peak("probe-1", 0.9), Instant::now());

        ingest.clear().await;

        assert_eq!(ingest.subscribed_probe.read().await.as_deref(), Some("probe-1"));
        let fast = ingest.apply_frame(&frame_with_peak("probe-1", 0.1), Instant::now());
        assert!(
            (fast.true_peak_hold_dbtp[0] - fast.true_peak_dbtp[0]).abs() < 1e-4,
            "hold should have dropped to the new low peak instead of keeping the pre-clear high one"
        );
    }

    #[tokio::test]
    async fn offline_probe_in_probe_list_resets_display_state() {
        let ingest = RemoteIngest::new();
        *ingest.subscribed_probe.write().await = Some("probe-1".to_string());
        ingest.apply_frame(&frame_with_peak("probe-1", 0.9), Instant::now());

        let probes = vec![ProbeInfo { id: "probe-1".to_string(), name: "Probe 1".to_string(), is_online: false }];
        let text = serde_json::to_string(&ServerMessage::ProbeList { probes }).unwrap();
        handle_server_message(&text, &ingest.frame_tx, &ingest.probe_list_tx, &ingest.subscribed_probe, &ingest.holds)
            .await;

        assert_eq!(ingest.subscribed_probe.read().await.as_deref(), Some("probe-1"));
        let fast = ingest.apply_frame(&frame_with_peak("probe-1", 0.1), Instant::now());
        assert!(
            (fast.true_peak_hold_dbtp[0] - fast.true_peak_dbtp[0]).abs() < 1e-4,
            "hold should have dropped after the probe-list marked the probe offline"
        );
    }

    #[tokio::test]
    async fn metrics_frame_for_unsubscribed_probe_is_dropped() {
        let ingest = RemoteIngest::new();
        *ingest.subscribed_probe.write().await = Some("probe-1".to_string());
        let mut frame_rx = ingest.subscribe_frames();

        let frame = MetricsFrame {
            probe_id: "probe-2".to_string(),
            lufs: crate::frame::LufsFields::default(),
            true_peak: crate::frame::StereoPair::default(),
            ppm: crate::frame::StereoPair::default(),
            rms: crate::frame::StereoPair::default(),
            stereo: crate::frame::StereoFields::default(),
            visualization: crate::frame::VisualizationFields::default(),
            latency_ms: 0.0,
        };
        let text = serde_json::to_string(&ServerMessage::Metrics {
            probe_id: "probe-2".to_string(),
            frame,
        })
        .unwrap();
        handle_server_message(&text, &ingest.frame_tx, &ingest.probe_list_tx, &ingest.subscribed_probe, &ingest.holds)
            .await;

        assert!(frame_rx.try_recv().is_err());
    }
}
