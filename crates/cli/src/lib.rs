//! Terminal helpers for the World-View simulator
//!
//! Provides shared CLI functionality:
//! - Status messages and value formatting
//! - Live journey progress bars

#![warn(missing_docs)]

pub mod output;
pub mod progress;

pub use output::Status;
pub use progress::JourneyBoard;
