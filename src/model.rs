//! Core data types shared by the codec, links, store, and engines.

use std::fmt;

/// Wire sentinel for "no reading on this channel".
pub const TEMP_INVALID: i16 = 0x7FFF;

/// Command byte values (`CMD` field of a [`crate::codec::Frame`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Poll,
    Reply,
    /// Any value other than `POLL`/`REPLY`; preserved for round-tripping.
    Other(u8),
}

impl Command {
    pub const POLL: u8 = 0x01;
    pub const REPLY: u8 = 0x02;

    pub fn from_byte(b: u8) -> Self {
        match b {
            Self::POLL => Command::Poll,
            Self::REPLY => Command::Reply,
            other => Command::Other(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Command::Poll => Self::POLL,
            Command::Reply => Self::REPLY,
            Command::Other(b) => b,
        }
    }
}

/// One thermal channel reading: present with a value, tenths of a degree
/// Celsius, or absent (the wire carried the invalid sentinel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Present(i16),
    Absent,
}

impl Sample {
    pub fn from_wire(raw: i16) -> Self {
        if raw == TEMP_INVALID {
            Sample::Absent
        } else {
            Sample::Present(raw)
        }
    }

    pub fn to_wire(self) -> i16 {
        match self {
            Sample::Present(v) => v,
            Sample::Absent => TEMP_INVALID,
        }
    }

    pub fn as_db_value(self) -> Option<i64> {
        match self {
            Sample::Present(v) => Some(v as i64),
            Sample::Absent => None,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Present(v) => write!(f, "{:.1}", *v as f32 / 10.0),
            Sample::Absent => write!(f, "--.-"),
        }
    }
}

/// A validated, in-memory record constructed from one REPLY frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub addr: u8,
    pub channels: [Sample; 4],
}

impl Reading {
    pub fn new(addr: u8, channels: [Sample; 4]) -> Self {
        Reading { addr, channels }
    }

    /// Formats a single channel for a log line (`"23.5"` / `"--.-"`).
    pub fn fmt_channel(&self, idx: usize) -> String {
        self.channels[idx].to_string()
    }
}

/// One persisted row as returned by [`crate::store::Store::fetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredRow {
    pub id: i64,
    pub ts: i64,
    pub addr: i64,
    pub temps: [Option<i64>; 4],
}

/// Validates a MODBUS-style device address (1..247 inclusive).
pub fn validate_addr(addr: u8) -> bool {
    (1..=247).contains(&addr)
}
