//! PubSub message model and its JSON encoders/decoders.
//!
//! - [`dataset`]: one dataset message (header fields + payload)
//! - [`network`]: the envelope and the document shape

pub mod dataset;
pub mod network;

pub use dataset::{DataSetMessage, DataSetMessageType, DataSetPayload, HeaderField, HeaderSlot};
pub use network::{Layout, NetworkMessage, ReaderSettings, Root, MESSAGE_TYPE_DATA};
