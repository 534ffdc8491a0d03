//! Shared utilities for the stock crew
//!
//! Binaries call [`init_tracing`] once at startup; libraries only emit
//! `tracing` events.

pub mod logging;

pub use logging::{LogFormat, init_tracing, init_tracing_with};
