//! Instruction and status packets
//!
//! # Wire Format
//!
//! ```text
//! Instruction packet: FF FF <id> <len> <instr> <param>* <checksum>
//! Status packet:      FF FF <id> <len> <err>   <param>* <checksum>
//!
//! len      = 2 + param count
//! checksum = !(id + len + instr/err + params) truncated to 8 bits
//! ```

use bytes::Bytes;

use super::{ActuatorId, ErrorFlags, Instruction, ProtocolError, codec};

/// A request on its way to the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionPacket {
    id: ActuatorId,
    instruction: Instruction,
    parameters: Vec<u8>,
}

impl InstructionPacket {
    /// Create a packet, rejecting parameter blocks that overflow the length byte
    pub fn new(
        id: ActuatorId,
        instruction: Instruction,
        parameters: impl Into<Vec<u8>>,
    ) -> Result<Self, ProtocolError> {
        let parameters = parameters.into();
        let id = id.validate()?;
        codec::check_parameter_count(parameters.len())?;
        Ok(Self {
            id,
            instruction,
            parameters,
        })
    }

    /// Addressee
    #[must_use]
    pub const fn id(&self) -> ActuatorId {
        self.id
    }

    /// Opcode
    #[must_use]
    pub const fn instruction(&self) -> Instruction {
        self.instruction
    }

    /// Parameter bytes
    #[must_use]
    pub fn parameters(&self) -> &[u8] {
        &self.parameters
    }

    /// Encode to wire bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        codec::write_packet(self.id.as_u8(), self.instruction.as_u8(), &self.parameters)
    }
}

/// A validated reply.
///
/// Only [`codec::decode_status`] builds one, so holding a `StatusPacket` means header,
/// id, length and checksum all checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    id: u8,
    error: ErrorFlags,
    parameters: Bytes,
}

impl StatusPacket {
    pub(crate) fn from_parts(id: u8, error: ErrorFlags, parameters: Bytes) -> Self {
        Self {
            id,
            error,
            parameters,
        }
    }

    /// Id of the actuator that answered
    #[must_use]
    pub const fn id(&self) -> u8 {
        self.id
    }

    /// Error flags reported by the actuator
    #[must_use]
    pub const fn error(&self) -> ErrorFlags {
        self.error
    }

    /// Parameter bytes, with prefix and checksum stripped
    #[must_use]
    pub fn parameters(&self) -> &Bytes {
        &self.parameters
    }

    /// Check if the actuator reported no error
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_empty()
    }

    /// Encode back to wire bytes
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        codec::write_packet(self.id, self.error.bits(), &self.parameters)
    }
}
