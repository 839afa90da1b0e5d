//! uapub core: OPC UA PubSub JSON message encoding.
//!
//! This crate turns published values into PubSub JSON network messages (and
//! back) according to the three content masks negotiated between publisher
//! and subscriber. It carries no transport or runtime dependencies so the
//! publisher daemon, tests, and embedders can share it.
//!
//! Layers, leaf to root:
//! - [`json::field`]: one value as a variant or a DataValue object
//! - [`message::dataset`]: one dataset message (header + payload)
//! - [`message::network`]: the envelope and the document shape
//! - [`json::writer`]: the container-stack writer all of the above drive
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Writer misuse and
//! bad caller input surface as [`PubSubError`]; a failed encode never yields
//! a partial document.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod error;
pub mod json;
pub mod mask;
pub mod message;
pub mod types;

/// Shared result type.
pub use error::{ErrorCode, PubSubError, Result};
pub use mask::{DataSetFieldContentMask, DataSetMessageContentMask, NetworkMessageContentMask};
pub use message::{DataSetMessage, DataSetMessageType, DataSetPayload, NetworkMessage, ReaderSettings};
pub use types::{ConfigurationVersion, DataValue, DateTime, StatusCode, Variant, VariantType};
