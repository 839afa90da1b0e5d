//! JSON encoding primitives.
//!
//! - `writer`: the container-stack writer and the [`JsonEncodable`] seam
//! - `field`: the per-field decision table (variant / raw / DataValue)
//! - `decode`: the reader-side inverse of both

pub mod decode;
pub mod field;
pub mod writer;

pub use field::{write_field, FieldEncoding};
pub use writer::{Container, JsonEncodable, JsonWriter, WriterStats};
