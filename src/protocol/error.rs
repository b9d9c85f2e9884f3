//! Protocol error types

use thiserror::Error;

/// Errors raised while building or validating packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Too many parameter bytes for the one-byte length field
    #[error("invalid argument: {count} parameter bytes (max {max})")]
    InvalidArgument {
        /// Number of parameter bytes supplied
        count: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Sync write entries carry data blocks of different widths
    #[error("sync write entry for id {id} carries {found} bytes, expected {expected}")]
    RaggedSyncWrite {
        /// Offending actuator id
        id: u8,
        /// Width set by the first entry
        expected: usize,
        /// Width of this entry
        found: usize,
    },

    /// Sync write with nothing to write
    #[error("sync write needs at least one entry with at least one data byte")]
    EmptySyncWrite,

    /// Id outside the addressable range
    #[error("invalid actuator id: {id:#04x}")]
    InvalidId {
        /// Rejected id byte
        id: u8,
    },

    /// Register span that is not 1 or 2 bytes, or runs past the table
    #[error("invalid register span: address {address}, length {length}")]
    InvalidSpan {
        /// Start address
        address: u8,
        /// Requested width in bytes
        length: u8,
    },

    /// Received fewer bytes than the smallest legal packet
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Sync bytes missing
    #[error("bad header: expected FF FF, got {found:02X?}")]
    BadHeader {
        /// The two bytes found where the header should be
        found: [u8; 2],
    },

    /// Reply came from another actuator
    #[error("id mismatch: expected {expected}, got {found}")]
    IdMismatch {
        /// Id the request was addressed to
        expected: u8,
        /// Id carried by the reply
        found: u8,
    },

    /// Declared length disagrees with the bytes actually received
    #[error("length mismatch: header declares {declared}, packet carries {actual}")]
    LengthMismatch {
        /// Value of the length field
        declared: usize,
        /// `received bytes - 4`
        actual: usize,
    },

    /// Checksum mismatch
    #[error("checksum mismatch: expected {expected:#04x}, got {found:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes
        expected: u8,
        /// Checksum byte carried by the packet
        found: u8,
    },
}

impl ProtocolError {
    /// Whether the error describes a damaged or foreign packet rather than a caller mistake.
    ///
    /// Framing errors are what bus noise and collisions look like, so the link retries them.
    #[must_use]
    pub const fn is_framing(&self) -> bool {
        matches!(
            self,
            Self::BufferTooSmall { .. }
                | Self::BadHeader { .. }
                | Self::IdMismatch { .. }
                | Self::LengthMismatch { .. }
                | Self::ChecksumMismatch { .. }
        )
    }
}
