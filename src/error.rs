//! Error types. Structural/programmer errors are typed and propagated;
//! transient link/protocol failures are ordinary `Option::None` values
//! handled at the call site (see `poll.rs` / `push.rs`).

use thiserror::Error;

/// Errors from the Frame Codec (C1). All are "bad argument" or
/// "structurally invalid frame" -- fail-fast, never silently absorbed
/// by the codec itself.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("address {0} out of range, must be 1-247")]
    InvalidAddress(u8),
    #[error("frame too short: {len} bytes, minimum is 6")]
    TooShort { len: usize },
    #[error("bad START byte: expected 0x01, got 0x{0:02X}")]
    BadStart(u8),
    #[error("length mismatch: LEN says {payload_len} payload bytes, frame is {actual} bytes, expected {expected}")]
    LengthMismatch {
        payload_len: u8,
        actual: usize,
        expected: usize,
    },
    #[error("CRC mismatch: received 0x{received:04X}, computed 0x{computed:04X}")]
    BadCrc { received: u16, computed: u16 },
    #[error("addr out of range: {0} (must be 1-247)")]
    AddrOutOfRange(u8),
    #[error("REPLY payload must be 8 bytes, got {0}")]
    BadPayloadLength(usize),
    #[error("payload too long: {0} bytes, LEN field is a single byte (max 255)")]
    PayloadTooLong(usize),
}

/// Errors from the Store (C4). `BadChannelCount` is a programmer error;
/// the rest are fatal I/O/database failures that the supervisor
/// propagates and exits non-zero on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("temps must have 4 elements, got {0}")]
    BadChannelCount(usize),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from configuration loading/validation (fatal at startup).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required key: {0}")]
    MissingKey(&'static str),
    #[error("{key} must be {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },
    #[error("devices must not be empty")]
    EmptyDevices,
    #[error("device address {0} must be 1-247")]
    DeviceOutOfRange(i64),
    #[error("transport must be 'rs485' or 'udp', got '{0}'")]
    BadTransport(String),
    #[error("--transport override ({cli}) conflicts with config transport ({config})")]
    TransportMismatch { cli: String, config: String },
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),
}
