//! dxlink - Dynamixel protocol 1.0 over a half-duplex serial bus
//!
//! Two layers:
//!
//! - [`protocol`]: pure packet codec. Builds instruction packets and validates status
//!   packets (header, id, length, checksum) without touching any I/O.
//! - [`transport`]: the [`Link`], which turns one request into a validated reply over
//!   any [`Channel`], retrying a bounded number of times on timeouts and framing errors.
//!
//! # Quick Start
//!
//! ```rust
//! use dxlink::{ActuatorId, Instruction, decode_status, encode_instruction};
//!
//! // Read two bytes at 36 (present position) from actuator 1
//! let packet = encode_instruction(ActuatorId::Unicast(1), Instruction::Read, &[36, 2])?;
//! assert_eq!(packet, [0xFF, 0xFF, 0x01, 0x04, 0x02, 0x24, 0x02, 0xD2]);
//!
//! // Validate the reply
//! let status = decode_status(&[0xFF, 0xFF, 0x01, 0x04, 0x00, 0x12, 0x03, 0xE5], 1)?;
//! assert!(status.is_ok());
//! assert_eq!(&status.parameters()[..], &[0x12, 0x03]);
//! # Ok::<(), dxlink::ProtocolError>(())
//! ```
//!
//! Driving a real bus needs the `serial` feature:
//!
//! ```rust,ignore
//! use dxlink::{ActuatorId, Link, Register, SerialChannel};
//!
//! let channel = SerialChannel::open("/dev/ttyUSB0", 1_000_000)?;
//! let mut link = Link::new(channel, ActuatorId::Unicast(1));
//! let position = link.read(Register::PresentPosition)?;
//! ```
//!
//! # Features
//!
//! - `serial` - [`SerialChannel`] backed by the `serialport` crate
//! - `serde` - `Serialize`/`Deserialize` for [`LinkConfig`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;
pub mod transport;

pub use protocol::{
    ActuatorCondition, ActuatorId, BROADCAST_ID, ErrorFlags, Instruction, InstructionPacket,
    Model, ProtocolError, Register, RegisterSpan, StatusPacket, checksum, decode_status,
    encode_instruction, encode_sync_write,
};
#[cfg(feature = "serial")]
pub use transport::SerialChannel;
pub use transport::{
    Channel, ChannelError, Fault, Link, LinkConfig, LinkError, LinkStats, StatusReturnLevel,
};

/// Result alias for link operations
pub type Result<T> = std::result::Result<T, LinkError>;

/// Protocol revision spoken on the wire
pub const PROTOCOL_VERSION: &str = "1.0";
