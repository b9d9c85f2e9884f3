//! Link error types

use std::fmt;

use thiserror::Error;

use super::ChannelError;
use crate::protocol::{ErrorFlags, ProtocolError, Register};

/// Where in an attempt a fault happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Writing the instruction packet
    Sending,
    /// Reading back our own transmission
    AwaitingEcho,
    /// Reading the 5-byte status prefix
    AwaitingHeader,
    /// Reading parameters and checksum
    AwaitingBody,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sending => "sending",
            Self::AwaitingEcho => "awaiting echo",
            Self::AwaitingHeader => "awaiting header",
            Self::AwaitingBody => "awaiting body",
        };
        write!(f, "{name}")
    }
}

/// A transient failure of one attempt. The link retries these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The channel gave up waiting for bytes
    #[error("timeout while {phase}: expected {expected} bytes, received {received}")]
    Timeout {
        /// Phase the read belonged to
        phase: Phase,
        /// Bytes requested
        expected: usize,
        /// Bytes that arrived before the deadline
        received: usize,
    },

    /// The channel returned fewer bytes than asked for
    #[error("short read while {phase}: expected {expected} bytes, got {got}")]
    ShortRead {
        /// Phase the read belonged to
        phase: Phase,
        /// Bytes requested
        expected: usize,
        /// Bytes returned
        got: usize,
    },

    /// The channel accepted only part of the instruction packet
    #[error("partial write: {written} of {expected} bytes")]
    PartialWrite {
        /// Bytes accepted
        written: usize,
        /// Packet size
        expected: usize,
    },

    /// Read-back of our own transmission did not match what was sent
    #[error("echo mismatch")]
    EchoMismatch,

    /// The reply failed validation
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl Fault {
    /// Check if this fault is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Terminal failure of a link operation.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Caller supplied something that can never be encoded; never retried
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ProtocolError),

    /// The channel failed in a way another attempt cannot fix
    #[error("channel failure: {0}")]
    Channel(#[source] ChannelError),

    /// Every allowed attempt hit a transient fault
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
        /// Fault of the final attempt
        last: Fault,
    },

    /// The caller's deadline passed before an attempt succeeded
    #[error("deadline exceeded after {attempts} attempts")]
    DeadlineExceeded {
        /// Attempts made
        attempts: u32,
        /// Fault of the final attempt, if any was started
        last: Option<Fault>,
    },

    /// The actuator answered with a valid status packet carrying error flags
    #[error("actuator reported {0}")]
    ActuatorError(ErrorFlags),

    /// Reply parameters do not match the requested register width
    #[error("unexpected reply length: expected {expected} bytes, got {got}")]
    UnexpectedReplyLength {
        /// Bytes requested
        expected: usize,
        /// Bytes returned
        got: usize,
    },

    /// A value was needed but the actuator is configured not to answer
    #[error("no status packet expected for this request")]
    NoReply,

    /// Attempted to write a register the actuator only reports
    #[error("register {} is read-only", .0.name())]
    ReadOnlyRegister(Register),

    /// Value does not fit the register
    #[error("value {value} does not fit register {}", .register.name())]
    ValueOutOfRange {
        /// Target register
        register: Register,
        /// Rejected value
        value: u16,
    },
}

impl LinkError {
    /// The flags the actuator reported, if that is why the call failed
    #[must_use]
    pub const fn actuator_flags(&self) -> Option<ErrorFlags> {
        match self {
            Self::ActuatorError(flags) => Some(*flags),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ActuatorCondition;

    #[test]
    fn test_fault_display() {
        let fault = Fault::Timeout {
            phase: Phase::AwaitingHeader,
            expected: 5,
            received: 0,
        };
        assert_eq!(
            fault.to_string(),
            "timeout while awaiting header: expected 5 bytes, received 0"
        );
        assert!(fault.is_timeout());

        let fault = Fault::from(ProtocolError::ChecksumMismatch {
            expected: 0xE5,
            found: 0xE6,
        });
        assert_eq!(fault.to_string(), "checksum mismatch: expected 0xe5, got 0xe6");
    }

    #[test]
    fn test_link_error_display() {
        let err = LinkError::ActuatorError(ActuatorCondition::Overheat.into());
        assert_eq!(err.to_string(), "actuator reported OVERHEAT");
        assert_eq!(err.actuator_flags().map(ErrorFlags::bits), Some(0x04));

        let err = LinkError::ReadOnlyRegister(Register::PresentPosition);
        assert_eq!(err.to_string(), "register PresentPosition is read-only");
    }
}
