use thiserror::Error;

use crate::chains::bitcoin::SessionState;
use crate::messages::FailureType;

/// Malformed caller input, reported before any device I/O
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid hex in {field}: {source}")]
    Hex {
        field: &'static str,
        source: hex::FromHexError,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("Framing error: {0}")]
    Framing(String),

    #[error("Device link already closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum SigningError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Unknown script type: {0}")]
    UnknownScriptType(String),

    #[error("Invalid {field} count for tx {hash}: declared {declared}, found {actual}")]
    CountMismatch {
        hash: String,
        field: &'static str,
        declared: u32,
        actual: usize,
    },

    #[error("Could not retrieve prev_tx: {0}")]
    MissingPreviousTransaction(String),

    #[error("Invalid prev_tx hash {hash:?}: expected {expected} bytes, found {actual}")]
    InvalidPreviousHash {
        hash: String,
        expected: usize,
        actual: usize,
    },

    #[error("prev_tx {0} described more than once")]
    DuplicatePreviousTransaction(String),

    #[error("{what} index {index} out of range (length {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: u64,
        len: usize,
    },

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Unexpected message: {kind}")]
    UnexpectedMessage { kind: String },

    #[error("Signature for index {0} already filled")]
    DuplicateSignature(u32),

    #[error("Signing failed: {message}")]
    DeviceRejected {
        code: Option<FailureType>,
        message: String,
    },

    #[error("Signature for input {0} is missing")]
    IncompleteSignatures(usize),

    #[error("Signing session is {0:?}")]
    InvalidSessionState(SessionState),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, SigningError>;
