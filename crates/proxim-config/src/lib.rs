//! # proxim-config
//!
//! Configuration system for the Proxim mesh. Reads from `proxim.toml`,
//! environment variables, and CLI overrides — in that precedence order.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{ConfigWarning, ProximConfig};
