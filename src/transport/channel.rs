//! Byte channel abstraction over the half-duplex bus

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failures reported by a [`Channel`].
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Fewer bytes than requested arrived before the timeout
    #[error("timed out: expected {expected} bytes, received {received}")]
    Timeout {
        /// Bytes requested
        expected: usize,
        /// Bytes that arrived and were discarded
        received: usize,
    },

    /// The device is gone
    #[error("channel closed")]
    Closed,

    /// Any other device failure
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ChannelError {
    /// Whether another attempt on the same channel could succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A half-duplex serial line.
///
/// Implementations never retry and never interpret bytes. A [`Link`](super::Link) owns the
/// channel for the duration of each exchange.
pub trait Channel {
    /// Write bytes, returning how many were accepted.
    ///
    /// A short count is not an error at this level; the link treats it as a retryable fault.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, ChannelError>;

    /// Read exactly `count` bytes or fail with [`ChannelError::Timeout`].
    ///
    /// Bytes that arrived before the timeout are consumed and dropped.
    fn read_exact(&mut self, count: usize, timeout: Duration) -> Result<Vec<u8>, ChannelError>;

    /// Discard anything waiting in the input buffer.
    fn flush_input(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, ChannelError> {
        (**self).write(bytes)
    }

    fn read_exact(&mut self, count: usize, timeout: Duration) -> Result<Vec<u8>, ChannelError> {
        (**self).read_exact(count, timeout)
    }

    fn flush_input(&mut self) -> Result<(), ChannelError> {
        (**self).flush_input()
    }
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, ChannelError> {
        (**self).write(bytes)
    }

    fn read_exact(&mut self, count: usize, timeout: Duration) -> Result<Vec<u8>, ChannelError> {
        (**self).read_exact(count, timeout)
    }

    fn flush_input(&mut self) -> Result<(), ChannelError> {
        (**self).flush_input()
    }
}
