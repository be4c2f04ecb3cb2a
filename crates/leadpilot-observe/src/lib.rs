//! Logging and trace export for the Leadpilot binary.

pub mod tracing_setup;

pub use tracing_setup::{DEFAULT_FILTER, TracingError, init_tracing, shutdown_tracing};
