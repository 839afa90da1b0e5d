//! Content masks for the three encoding layers.
//!
//! Bit values follow the OPC UA JSON message mapping so masks read from a
//! configuration or a management call can be used as-is. Each mask also
//! parses from (and displays as) its PascalCase flag names, which is what the
//! publisher config uses.

use std::fmt;
use std::str::FromStr;

use crate::error::{PubSubError, Result};

bitflags::bitflags! {
    /// Network-level flags: envelope fields and document shape.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NetworkMessageContentMask: u32 {
        const NETWORK_MESSAGE_HEADER = 0x01;
        const DATA_SET_MESSAGE_HEADER = 0x02;
        const SINGLE_DATA_SET_MESSAGE = 0x04;
        const PUBLISHER_ID = 0x08;
        const DATA_SET_CLASS_ID = 0x10;
        const REPLY_TO = 0x20;
    }
}

bitflags::bitflags! {
    /// Dataset-level flags: which header fields carry real values.
    ///
    /// `DATA_SET_WRITER_ID` is accepted for wire compatibility; the writer id
    /// is always emitted on the header path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DataSetMessageContentMask: u32 {
        const DATA_SET_WRITER_ID = 0x01;
        const META_DATA_VERSION = 0x02;
        const SEQUENCE_NUMBER = 0x04;
        const TIMESTAMP = 0x08;
        const STATUS = 0x10;
        const MESSAGE_TYPE = 0x20;
        const DATA_SET_WRITER_NAME = 0x40;
    }
}

bitflags::bitflags! {
    /// Field-level flags: how each payload value is rendered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DataSetFieldContentMask: u32 {
        const STATUS_CODE = 0x01;
        const SOURCE_TIMESTAMP = 0x02;
        const SERVER_TIMESTAMP = 0x04;
        const SOURCE_PICO_SECONDS = 0x08;
        const SERVER_PICO_SECONDS = 0x10;
        const RAW_DATA = 0x20;
        const REVERSIBLE = 0x40;
    }
}

/// Flag name tables, in bit order.
const NETWORK_NAMES: &[(&str, NetworkMessageContentMask)] = &[
    ("NetworkMessageHeader", NetworkMessageContentMask::NETWORK_MESSAGE_HEADER),
    ("DataSetMessageHeader", NetworkMessageContentMask::DATA_SET_MESSAGE_HEADER),
    ("SingleDataSetMessage", NetworkMessageContentMask::SINGLE_DATA_SET_MESSAGE),
    ("PublisherId", NetworkMessageContentMask::PUBLISHER_ID),
    ("DataSetClassId", NetworkMessageContentMask::DATA_SET_CLASS_ID),
    ("ReplyTo", NetworkMessageContentMask::REPLY_TO),
];

const DATA_SET_NAMES: &[(&str, DataSetMessageContentMask)] = &[
    ("DataSetWriterId", DataSetMessageContentMask::DATA_SET_WRITER_ID),
    ("MetaDataVersion", DataSetMessageContentMask::META_DATA_VERSION),
    ("SequenceNumber", DataSetMessageContentMask::SEQUENCE_NUMBER),
    ("Timestamp", DataSetMessageContentMask::TIMESTAMP),
    ("Status", DataSetMessageContentMask::STATUS),
    ("MessageType", DataSetMessageContentMask::MESSAGE_TYPE),
    ("DataSetWriterName", DataSetMessageContentMask::DATA_SET_WRITER_NAME),
];

const FIELD_NAMES: &[(&str, DataSetFieldContentMask)] = &[
    ("StatusCode", DataSetFieldContentMask::STATUS_CODE),
    ("SourceTimestamp", DataSetFieldContentMask::SOURCE_TIMESTAMP),
    ("ServerTimestamp", DataSetFieldContentMask::SERVER_TIMESTAMP),
    ("SourcePicoSeconds", DataSetFieldContentMask::SOURCE_PICO_SECONDS),
    ("ServerPicoSeconds", DataSetFieldContentMask::SERVER_PICO_SECONDS),
    ("RawData", DataSetFieldContentMask::RAW_DATA),
    ("Reversible", DataSetFieldContentMask::REVERSIBLE),
];

/// Implements name parsing and display for one mask type.
macro_rules! named_mask {
    ($mask:ty, $table:ident, $what:literal) => {
        impl $mask {
            /// Combine a list of flag names into one mask.
            pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
                names
                    .iter()
                    .try_fold(Self::empty(), |acc, n| Ok(acc | n.as_ref().parse::<Self>()?))
            }

            /// Flag names set in this mask, in bit order.
            pub fn names(&self) -> Vec<&'static str> {
                $table
                    .iter()
                    .filter(|(_, f)| self.contains(*f))
                    .map(|(n, _)| *n)
                    .collect()
            }
        }

        impl FromStr for $mask {
            type Err = PubSubError;

            /// Parse a single flag name (case-insensitive).
            fn from_str(s: &str) -> Result<Self> {
                let s = s.trim();
                $table
                    .iter()
                    .find(|(n, _)| n.eq_ignore_ascii_case(s))
                    .map(|(_, f)| *f)
                    .ok_or_else(|| PubSubError::BadConfig(format!("unknown {} flag: {s}", $what)))
            }
        }

        impl fmt::Display for $mask {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.is_empty() {
                    return f.write_str("None");
                }
                f.write_str(&self.names().join("|"))
            }
        }
    };
}

named_mask!(NetworkMessageContentMask, NETWORK_NAMES, "network content mask");
named_mask!(DataSetMessageContentMask, DATA_SET_NAMES, "dataset content mask");
named_mask!(DataSetFieldContentMask, FIELD_NAMES, "field content mask");
