//! [`Channel`] over an operating-system serial port

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use super::{Channel, ChannelError};

/// Poll interval handed to the OS while accumulating a read.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A serial port opened through the `serialport` crate.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    baud_rate: u32,
}

impl SerialChannel {
    /// Open `path` at `baud_rate`, 8N1.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, ChannelError> {
        let port = serialport::new(path, baud_rate)
            .timeout(POLL_INTERVAL)
            .open()
            .map_err(io::Error::from)?;
        debug!(path, baud_rate, "serial port opened");
        Ok(Self::from_port(port, baud_rate))
    }

    /// Wrap an already opened port.
    #[must_use]
    pub fn from_port(port: Box<dyn SerialPort>, baud_rate: u32) -> Self {
        Self { port, baud_rate }
    }

    /// Current line speed
    #[must_use]
    pub const fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Reconfigure the line speed
    pub fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), ChannelError> {
        self.port
            .set_baud_rate(baud_rate)
            .map_err(io::Error::from)?;
        self.baud_rate = baud_rate;
        Ok(())
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("port", &self.port.name())
            .field("baud_rate", &self.baud_rate)
            .finish()
    }
}

impl Channel for SerialChannel {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, ChannelError> {
        self.port
            .write_all(bytes)
            .and_then(|()| self.port.flush())
            .map_err(|err| match err.kind() {
                io::ErrorKind::TimedOut => ChannelError::Timeout {
                    expected: bytes.len(),
                    received: 0,
                },
                _ => classify(err),
            })?;
        Ok(bytes.len())
    }

    fn read_exact(&mut self, count: usize, timeout: Duration) -> Result<Vec<u8>, ChannelError> {
        let deadline = Instant::now() + timeout;
        let mut buffer = vec![0u8; count];
        let mut filled = 0;

        while filled < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                // Partial bytes are dropped with the buffer.
                return Err(ChannelError::Timeout {
                    expected: count,
                    received: filled,
                });
            }
            self.port
                .set_timeout(remaining.min(POLL_INTERVAL))
                .map_err(io::Error::from)?;

            match self.port.read(&mut buffer[filled..]) {
                Ok(n) => filled += n,
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(err) => return Err(classify(err)),
            }
        }

        Ok(buffer)
    }

    fn flush_input(&mut self) -> Result<(), ChannelError> {
        self.port
            .clear(ClearBuffer::Input)
            .map_err(io::Error::from)?;
        Ok(())
    }
}

fn classify(err: io::Error) -> ChannelError {
    match err.kind() {
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::UnexpectedEof => {
            ChannelError::Closed
        }
        _ => ChannelError::Io(err),
    }
}
