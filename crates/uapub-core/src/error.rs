//! Error type shared by the encoder, decoder, and publisher crates.

use thiserror::Error;

/// Stable error codes (used in logs, metric labels, and test vectors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Writer contract violated (unbalanced containers, misplaced names).
    WriterMisuse,
    /// Payload already holds a field with this name.
    DuplicateField,
    /// Single dataset message mode with more than one message.
    SingleMessageCount,
    /// A value cannot be represented (mixed array, bad conversion).
    InvalidValue,
    /// Malformed or mismatched JSON on the reader side.
    Decode,
    /// Invalid configuration.
    BadConfig,
    /// Unsupported configuration schema version.
    UnsupportedVersion,
    /// Transport failed to ship a frame.
    Transport,
    /// Internal failure (I/O, serializer).
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and vectors.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::WriterMisuse => "WRITER_MISUSE",
            ErrorCode::DuplicateField => "DUPLICATE_FIELD",
            ErrorCode::SingleMessageCount => "SINGLE_MESSAGE_COUNT",
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::Decode => "DECODE",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PubSubError>;

/// Unified error type used by core and publisher.
#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("json writer misuse: {0}")]
    Writer(String),
    #[error("duplicate payload field: {0}")]
    DuplicateField(String),
    #[error("single dataset message mode requires at most one message, got {0}")]
    SingleMessageCount(usize),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("transport: {0}")]
    Transport(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PubSubError {
    /// Map to the stable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PubSubError::Writer(_) => ErrorCode::WriterMisuse,
            PubSubError::DuplicateField(_) => ErrorCode::DuplicateField,
            PubSubError::SingleMessageCount(_) => ErrorCode::SingleMessageCount,
            PubSubError::InvalidValue(_) => ErrorCode::InvalidValue,
            PubSubError::Decode(_) => ErrorCode::Decode,
            PubSubError::BadConfig(_) => ErrorCode::BadConfig,
            PubSubError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            PubSubError::Transport(_) => ErrorCode::Transport,
            PubSubError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Shorthand used by the decoder.
    pub(crate) fn decode(msg: impl Into<String>) -> Self {
        PubSubError::Decode(msg.into())
    }
}
