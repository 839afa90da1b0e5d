//! Built-in OPC UA value types carried by PubSub messages.
//!
//! Only the subset the JSON message mapping needs: scalar variants and
//! one-dimensional arrays, status codes, timestamps, and DataValue.

mod data_value;
mod date_time;
mod status_code;
mod variant;

pub use data_value::DataValue;
pub use date_time::DateTime;
pub use status_code::StatusCode;
pub use variant::{Variant, VariantType};

/// Metadata version of a dataset (`ConfigurationVersionDataType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConfigurationVersion {
    pub major: u32,
    pub minor: u32,
}

impl ConfigurationVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}
