//! Core utilities for the World-View simulation
//!
//! This crate provides shared functionality used across the simulation crates:
//!
//! - **Error handling**: Errors with codes, context, recovery suggestions and
//!   the transport status each code maps to
//! - **Configuration**: TOML-based configuration with environment overrides
//!   and validation
//!
//! # Example
//!
//! ```rust,no_run
//! use worldview_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid configuration");
//! println!("tick every {} ms", config.schema.scheduler.tick_interval_ms);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema, SchedulerConfig, SchedulerMode};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
}
