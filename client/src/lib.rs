//! Interactive listing map engine: groups geo-tagged listings into markers and keeps markers,
//! sidebar cards and floating popups in sync under hover, click and drag input.

pub mod camera;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod fetch;
pub mod grouping;
pub mod highlight;
pub mod markers;
pub mod popup;
pub mod provider;
pub mod surface;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{MapConfig, ProviderKind};
pub use coordinator::{FetchRequest, ViewCoordinator, ViewPhase};
pub use error::{ConfigError, FetchError};
pub use events::{EventQueue, UiEvent};
pub use highlight::HighlightState;
