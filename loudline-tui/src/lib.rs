//! Terminal UI for the Loudline meter suite - widgets, theme, and the
//! interface contract the core draws against (§6).
//!
//! Out of scope here (§1): goniometer rasterization and radar polar
//! plotting are pure functions of exported state that a full build
//! would add as further [`traits::PointsWidget`] implementors; this
//! crate ships the scalar and PPM-bar displays that exercise the
//! contract end to end.

mod theme;
pub mod traits;
pub mod widgets;

pub use theme::{Theme, DAYLIGHT, PHOSPHOR_GREEN};
pub use traits::{BandsWidget, PointsWidget, Resizable, ScalarWidget, TimeDomainWidget};
