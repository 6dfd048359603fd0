//! Persistent, observable application state (§3 "AppState", §4.12,
//! §6 "Persistence layout"). A single versioned record plus a
//! pub-sub dispatcher so the metering core can react to settings
//! changes without polling.

mod app_state;
mod error;

pub use app_state::{AppState, PersistentState, RuntimeState, StateChange, CURRENT_SCHEMA_VERSION};
pub use error::StateError;
