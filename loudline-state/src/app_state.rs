//! Process-wide settings with change notification (§3, §4.12). Holds
//! the fields that persist across restarts (target LUFS, true-peak
//! limit, radar window, per-source trims/monitor levels, generator
//! selection) plus runtime-only fields that are never written to disk
//! (active mode, capture metadata, uptime).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use loudline_core::engine::SourceMode;
use loudline_core::generator::SignalPreset;
use loudline_core::source::CaptureMetadata;
use serde::{Deserialize, Serialize};

use crate::error::StateError;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SOURCE_SLOTS: usize = 3;

fn mode_index(mode: SourceMode) -> Option<usize> {
    match mode {
        SourceMode::CaptureA => Some(0),
        SourceMode::CaptureB => Some(1),
        SourceMode::Generator => Some(2),
        SourceMode::None | SourceMode::Remote => None,
    }
}

/// The subset of [`AppState`] that survives a restart (§6 "Persistence
/// layout"). A versioned key-value record; `schema_version` gates
/// [`migrate`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistentState {
    pub schema_version: u32,
    pub target_lufs: f32,
    pub true_peak_limit_dbtp: f32,
    pub radar_window_s: f32,
    pub trims_db: [f32; SOURCE_SLOTS],
    pub monitor_gains: [f32; SOURCE_SLOTS],
    pub monitor_muted: [bool; SOURCE_SLOTS],
    pub generator_preset: SignalPreset,
}

impl Default for PersistentState {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            target_lufs: -23.0,
            true_peak_limit_dbtp: -1.0,
            radar_window_s: 60.0,
            trims_db: [0.0; SOURCE_SLOTS],
            monitor_gains: [1.0; SOURCE_SLOTS],
            monitor_muted: [false; SOURCE_SLOTS],
            generator_preset: SignalPreset::default(),
        }
    }
}

/// Migrates a raw on-disk record forward to [`CURRENT_SCHEMA_VERSION`].
/// There is exactly one schema so far; this still runs through the
/// version match rather than trusting the file, so the next migration
/// has a seam to land in.
fn migrate(raw: serde_json::Value) -> Result<PersistentState, StateError> {
    let version = raw.get("schema_version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    match version {
        CURRENT_SCHEMA_VERSION => serde_json::from_value(raw)
            .map_err(|e| StateError::Parse(e.to_string())),
        0 => Err(StateError::Parse("missing schema_version".to_string())),
        other => Err(StateError::UnknownSchemaVersion(other, CURRENT_SCHEMA_VERSION)),
    }
}

/// Fields that exist only for the life of the process (§3 "Runtime-
/// only").
#[derive(Debug, Clone)]
pub struct RuntimeState {
    pub active_mode: SourceMode,
    pub capture_metadata: Option<CaptureMetadata>,
    started_at: Instant,
}

impl RuntimeState {
    fn new(now: Instant) -> Self {
        Self {
            active_mode: SourceMode::None,
            capture_metadata: None,
            started_at: now,
        }
    }

    pub fn uptime(&self, now: Instant) -> Duration {
        now.duration_since(self.started_at)
    }
}

/// One change dispatched by key (§4.11 design note: "small pub-sub
/// type for AppState changes"). The metering core subscribes and
/// resets LUFS / the peak-over latch on [`StateChange::TargetLufs`]
/// and [`StateChange::TruePeakLimitDbtp`] (§4.12).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateChange {
    TargetLufs(f32),
    TruePeakLimitDbtp(f32),
    RadarWindowS(f32),
    TrimDb { index: usize, db: f32 },
    MonitorGain { index: usize, gain: f32 },
    MonitorMuted { index: usize, muted: bool },
    GeneratorPreset(SignalPreset),
}

pub struct AppState {
    persistent: PersistentState,
    runtime: RuntimeState,
    subscribers: Vec<Sender<StateChange>>,
}

impl AppState {
    pub fn new(now: Instant) -> Self {
        Self {
            persistent: PersistentState::default(),
            runtime: RuntimeState::new(now),
            subscribers: Vec::new(),
        }
    }

    fn from_persistent(persistent: PersistentState, now: Instant) -> Self {
        Self {
            persistent,
            runtime: RuntimeState::new(now),
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<StateChange> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, change: StateChange) {
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }

    pub fn target_lufs(&self) -> f32 {
        self.persistent.target_lufs
    }

    pub fn set_target_lufs(&mut self, value: f32) {
        self.persistent.target_lufs = value;
        self.notify(StateChange::TargetLufs(value));
    }

    pub fn true_peak_limit_dbtp(&self) -> f32 {
        self.persistent.true_peak_limit_dbtp
    }

    pub fn set_true_peak_limit_dbtp(&mut self, value: f32) {
        self.persistent.true_peak_limit_dbtp = value;
        self.notify(StateChange::TruePeakLimitDbtp(value));
    }

    pub fn radar_window_s(&self) -> f32 {
        self.persistent.radar_window_s
    }

    pub fn set_radar_window_s(&mut self, value: f32) {
        self.persistent.radar_window_s = value;
        self.notify(StateChange::RadarWindowS(value));
    }

    pub fn trim_db(&self, mode: SourceMode) -> f32 {
        mode_index(mode).map(|i| self.persistent.trims_db[i]).unwrap_or(0.0)
    }

    pub fn set_trim_db(&mut self, mode: SourceMode, db: f32) {
        if let Some(i) = mode_index(mode) {
            self.persistent.trims_db[i] = db;
            self.notify(StateChange::TrimDb { index: i, db });
        }
    }

    pub fn monitor_gain(&self, mode: SourceMode) -> f32 {
        mode_index(mode).map(|i| self.persistent.monitor_gains[i]).unwrap_or(0.0)
    }

    pub fn set_monitor_gain(&mut self, mode: SourceMode, gain: f32) {
        if let Some(i) = mode_index(mode) {
            let clamped = gain.clamp(0.0, 1.0);
            self.persistent.monitor_gains[i] = clamped;
            self.notify(StateChange::MonitorGain { index: i, gain: clamped });
        }
    }

    pub fn monitor_muted(&self, mode: SourceMode) -> bool {
        mode_index(mode).map(|i| self.persistent.monitor_muted[i]).unwrap_or(false)
    }

    pub fn set_monitor_muted(&mut self, mode: SourceMode, muted: bool) {
        if let Some(i) = mode_index(mode) {
            self.persistent.monitor_muted[i] = muted;
            self.notify(StateChange::MonitorMuted { index: i, muted });
        }
    }

    pub fn generator_preset(&self) -> SignalPreset {
        self.persistent.generator_preset
    }

    pub fn set_generator_preset(&mut self, preset: SignalPreset) {
        self.persistent.generator_preset = preset;
        self.notify(StateChange::GeneratorPreset(preset));
    }

    pub fn active_mode(&self) -> SourceMode {
        self.runtime.active_mode
    }

    pub fn set_active_mode(&mut self, mode: SourceMode, metadata: Option<CaptureMetadata>) {
        self.runtime.active_mode = mode;
        self.runtime.capture_metadata = metadata;
    }

    pub fn capture_metadata(&self) -> Option<&CaptureMetadata> {
        self.runtime.capture_metadata.as_ref()
    }

    pub fn uptime(&self, now: Instant) -> Duration {
        self.runtime.uptime(now)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("loudline")
            .join("state.json")
    }

    pub fn load(now: Instant) -> Self {
        Self::load_from(&Self::config_path(), now).unwrap_or_else(|_| Self::new(now))
    }

    pub fn load_from(path: &Path, now: Instant) -> Result<Self, StateError> {
        let content = std::fs::read_to_string(path).map_err(|e| StateError::Read(e.to_string()))?;
        let raw: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| StateError::Parse(e.to_string()))?;
        let persistent = migrate(raw)?;
        Ok(Self::from_persistent(persistent, now))
    }

    pub fn save(&self) -> Result<(), StateError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), StateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StateError::Write(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.persistent)
            .map_err(|e| StateError::Write(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| StateError::Write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("loudline-state-test-{}-{}.json", tag, std::process::id()))
    }

    #[test]
    fn defaults_match_spec_values() {
        let state = AppState::new(Instant::now());
        assert_eq!(state.target_lufs(), -23.0);
        assert_eq!(state.true_peak_limit_dbtp(), -1.0);
        assert_eq!(state.radar_window_s(), 60.0);
        assert_eq!(state.monitor_gain(SourceMode::CaptureA), 1.0);
        assert!(!state.monitor_muted(SourceMode::CaptureA));
    }

    #[test]
    fn set_target_lufs_notifies_subscribers() {
        let mut state = AppState::new(Instant::now());
        let rx = state.subscribe();
        state.set_target_lufs(-16.0);
        assert_eq!(rx.try_recv().unwrap(), StateChange::TargetLufs(-16.0));
    }

    #[test]
    fn trim_and_monitor_are_scoped_per_source() {
        let mut state = AppState::new(Instant::now());
        state.set_trim_db(SourceMode::CaptureA, 3.0);
        state.set_trim_db(SourceMode::CaptureB, -6.0);
        assert_eq!(state.trim_db(SourceMode::CaptureA), 3.0);
        assert_eq!(state.trim_db(SourceMode::CaptureB), -6.0);
        assert_eq!(state.trim_db(SourceMode::Generator), 0.0);
    }

    #[test]
    fn save_then_load_round_trips_persistent_fields() {
        let path = temp_path("roundtrip");
        let mut state = AppState::new(Instant::now());
        state.set_target_lufs(-18.0);
        state.set_true_peak_limit_dbtp(-2.0);
        state.save_to(&path).unwrap();

        let loaded = AppState::load_from(&path, Instant::now()).unwrap();
        assert_eq!(loaded.target_lufs(), -18.0);
        assert_eq!(loaded.true_peak_limit_dbtp(), -2.0);
        assert_eq!(loaded.active_mode(), SourceMode::None);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unknown_future_schema_version_is_rejected() {
        let path = temp_path("future-schema");
        std::fs::write(&path, r#"{"schema_version": 99}"#).unwrap();
        let result = AppState::load_from(&path, Instant::now());
        assert!(matches!(result, Err(StateError::UnknownSchemaVersion(99, CURRENT_SCHEMA_VERSION))));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn runtime_fields_are_not_persisted() {
        let path = temp_path("runtime-not-persisted");
        let mut state = AppState::new(Instant::now());
        state.set_active_mode(SourceMode::Generator, None);
        state.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("active_mode"));
        let _ = std::fs::remove_file(&path);
    }
}
