//! Dynamixel protocol 1.0 core implementation
//!
//! This module provides the wire format, packet types, and codec. Nothing in here
//! performs I/O; it is the trust boundary between raw bytes and validated packets.

pub(crate) mod codec;
mod control_table;
mod error;
mod model;
mod packet;
mod types;

pub use codec::{checksum, decode_status, encode_instruction, encode_sync_write};
pub use control_table::{Access, Register, RegisterSpan};
pub use error::ProtocolError;
pub use model::Model;
pub use packet::{InstructionPacket, StatusPacket};
pub use types::{ActuatorCondition, ActuatorId, ErrorFlags, Instruction};

/// Two sync bytes that open every packet.
pub const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Id addressing every actuator on the bus at once. Never answered.
pub const BROADCAST_ID: u8 = 0xFE;

/// Highest id an individual actuator may carry.
pub const MAX_ACTUATOR_ID: u8 = 0xFD;

/// Largest parameter block that still lets `Length` fit in one byte.
pub const MAX_PARAMETERS: usize = 253;

/// Header, id, length and instruction/error byte.
pub const PREFIX_SIZE: usize = 5;

/// Smallest possible packet: prefix plus checksum, no parameters.
pub const MIN_PACKET_SIZE: usize = PREFIX_SIZE + 1;

/// Byte offsets shared by instruction and status packets.
pub mod idx {
    /// Actuator id.
    pub const ID: usize = 2;
    /// Declared length (parameter count + 2).
    pub const LENGTH: usize = 3;
    /// Instruction opcode (instruction packets) or error flags (status packets).
    pub const INSTRUCTION: usize = 4;
    /// Error flags in a status packet.
    pub const ERROR: usize = 4;
    /// First parameter byte.
    pub const PARAM_0: usize = 5;
}
