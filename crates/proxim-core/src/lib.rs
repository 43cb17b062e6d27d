//! # proxim-core
//!
//! Core types, events, and error primitives for the Proxim collaborative
//! positioning mesh. This crate defines the shared vocabulary used by every
//! other crate in the workspace.

pub mod error;
pub mod event;
pub mod types;

pub use error::{ProximError, Result};
pub use event::{Event, EventBus};
pub use types::{Position, Report, Role, SatelliteMeasurement};
