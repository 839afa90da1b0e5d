//! uapub publisher library entry.
//!
//! Wires config, writer-group runtimes, data sources, transports, metrics and
//! the ops endpoints into a publishing daemon. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod publisher;
pub mod router;
pub mod transport;
pub mod writer;
