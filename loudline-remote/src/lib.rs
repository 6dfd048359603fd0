//! Remote probe ingest: broker protocol client for the "Remote" source
//! mode (§4.10, §6). No UI; callers drive [`RemoteIngest`] and fold its
//! frames into whatever render loop they run.

mod client;
mod error;
mod frame;

pub use client::{ConnectionState, RemoteIngest};
pub use error::RemoteError;
pub use frame::{
    ClientMessage, GoniometerPoint, LufsFields, MetricsFrame, ProbeInfo, ServerMessage,
    StereoFields, StereoPair, VisualizationFields,
};
