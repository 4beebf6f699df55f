//! Optional stderr logger for hosts and tests.
//!
//! Nothing in the renderer installs a logger on its own; it emits through
//! `log` and stays silent until [`init_logging`] (or any other logger) runs.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
