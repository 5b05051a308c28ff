//! Configuration loading and schema definitions
//!
//! TOML configuration for the scheduler, route source and logging.

mod loader;
mod schema;

pub use loader::{Config, ENV_LOG_LEVEL, ENV_TICK_MS};
pub use schema::*;
