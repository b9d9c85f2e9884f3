//! Actuator ids, instruction opcodes and error flags

use std::fmt;

use super::{BROADCAST_ID, MAX_ACTUATOR_ID, ProtocolError};

/// Address of a packet on the bus.
///
/// Broadcast is its own variant because nothing ever answers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorId {
    /// A single actuator, id in `0..=253`
    Unicast(u8),
    /// Every actuator on the bus (id 254)
    Broadcast,
}

impl ActuatorId {
    /// Create from a raw id byte. 254 maps to [`ActuatorId::Broadcast`], 255 is rejected.
    pub const fn new(id: u8) -> Result<Self, ProtocolError> {
        match id {
            BROADCAST_ID => Ok(Self::Broadcast),
            id if id <= MAX_ACTUATOR_ID => Ok(Self::Unicast(id)),
            id => Err(ProtocolError::InvalidId { id }),
        }
    }

    /// Reject a `Unicast` id outside `0..=253`.
    ///
    /// The variant is public, so `Unicast(254)` can be built directly; it would reach the
    /// wire as a broadcast.
    pub const fn validate(self) -> Result<Self, ProtocolError> {
        match self {
            Self::Unicast(id) if id > MAX_ACTUATOR_ID => Err(ProtocolError::InvalidId { id }),
            id => Ok(id),
        }
    }

    /// Convert to the wire byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Unicast(id) => id,
            Self::Broadcast => BROADCAST_ID,
        }
    }

    /// Check if this is the broadcast address
    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        matches!(self, Self::Broadcast)
    }
}

impl TryFrom<u8> for ActuatorId {
    type Error = ProtocolError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicast(id) => write!(f, "{id}"),
            Self::Broadcast => write!(f, "broadcast"),
        }
    }
}

/// Protocol 1.0 instruction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Instruction {
    /// Ask for a bare status packet
    Ping = 0x01,
    /// Read `[address, length]` from the control table
    Read = 0x02,
    /// Write `[address, data..]` to the control table
    Write = 0x03,
    /// Stage a write until [`Instruction::Action`]
    RegWrite = 0x04,
    /// Apply staged writes
    Action = 0x05,
    /// Restore factory settings
    Reset = 0x06,
    /// Write the same region on several actuators; broadcast only
    SyncWrite = 0x83,
}

impl Instruction {
    /// Convert from byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Ping),
            0x02 => Some(Self::Read),
            0x03 => Some(Self::Write),
            0x04 => Some(Self::RegWrite),
            0x05 => Some(Self::Action),
            0x06 => Some(Self::Reset),
            0x83 => Some(Self::SyncWrite),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ping => "Ping",
            Self::Read => "Read",
            Self::Write => "Write",
            Self::RegWrite => "RegWrite",
            Self::Action => "Action",
            Self::Reset => "Reset",
            Self::SyncWrite => "SyncWrite",
        };
        write!(f, "{name}")
    }
}

/// One condition an actuator can report in its status packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ActuatorCondition {
    /// Supply voltage outside the configured window
    InputVoltage = 1 << 0,
    /// Goal position outside the CW/CCW angle limits
    AngleLimit = 1 << 1,
    /// Internal temperature above the limit
    Overheat = 1 << 2,
    /// Command value out of range
    Range = 1 << 3,
    /// The instruction packet we sent failed the actuator's checksum
    Checksum = 1 << 4,
    /// Load cannot be held with the configured torque
    Overload = 1 << 5,
    /// Unknown instruction, or Action without a staged RegWrite
    Instruction = 1 << 6,
}

impl ActuatorCondition {
    /// Every condition, lowest bit first
    pub const ALL: [Self; 7] = [
        Self::InputVoltage,
        Self::AngleLimit,
        Self::Overheat,
        Self::Range,
        Self::Checksum,
        Self::Overload,
        Self::Instruction,
    ];

    /// Bit this condition occupies in [`ErrorFlags`]
    #[must_use]
    pub const fn bit(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ActuatorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InputVoltage => "INPUT_VOLTAGE",
            Self::AngleLimit => "ANGLE_LIMIT",
            Self::Overheat => "OVERHEAT",
            Self::Range => "RANGE",
            Self::Checksum => "CHECKSUM",
            Self::Overload => "OVERLOAD",
            Self::Instruction => "INSTRUCTION",
        };
        write!(f, "{name}")
    }
}

/// Error byte of a status packet. Zero means success.
///
/// Bits are independent; any combination may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ErrorFlags(u8);

impl ErrorFlags {
    /// Bit 7 carries no meaning in protocol 1.0
    pub const RESERVED: u8 = 1 << 7;

    /// Create empty flags
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Create from byte, keeping every bit
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Convert to byte
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Set a condition
    #[must_use]
    pub const fn with(mut self, condition: ActuatorCondition) -> Self {
        self.0 |= condition.bit();
        self
    }

    /// Check if a condition is set
    #[must_use]
    pub const fn contains(self, condition: ActuatorCondition) -> bool {
        (self.0 & condition.bit()) != 0
    }

    /// Check if no bit at all is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if the unused top bit is set
    #[must_use]
    pub const fn has_reserved(self) -> bool {
        (self.0 & Self::RESERVED) != 0
    }

    /// Decode into the set of named conditions, lowest bit first.
    #[must_use]
    pub fn conditions(self) -> Vec<ActuatorCondition> {
        ActuatorCondition::ALL
            .into_iter()
            .filter(|condition| self.contains(*condition))
            .collect()
    }
}

impl From<ActuatorCondition> for ErrorFlags {
    fn from(condition: ActuatorCondition) -> Self {
        Self(condition.bit())
    }
}

impl FromIterator<ActuatorCondition> for ErrorFlags {
    fn from_iter<I: IntoIterator<Item = ActuatorCondition>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.conditions().iter().map(ToString::to_string).collect();
        if self.has_reserved() {
            parts.push("RESERVED".to_owned());
        }
        if parts.is_empty() {
            write!(f, "NONE")
        } else {
            write!(f, "{}", parts.join(" | "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actuator_id_ranges() {
        assert_eq!(ActuatorId::new(0).unwrap(), ActuatorId::Unicast(0));
        assert_eq!(ActuatorId::new(253).unwrap(), ActuatorId::Unicast(253));
        assert_eq!(ActuatorId::new(254).unwrap(), ActuatorId::Broadcast);
        assert!(matches!(
            ActuatorId::new(255),
            Err(ProtocolError::InvalidId { id: 255 })
        ));
        assert_eq!(ActuatorId::Broadcast.as_u8(), 0xFE);
    }

    #[test]
    fn test_validate_rejects_out_of_range_unicast() {
        assert_eq!(
            ActuatorId::Unicast(254).validate(),
            Err(ProtocolError::InvalidId { id: 254 })
        );
        assert_eq!(
            ActuatorId::Unicast(255).validate(),
            Err(ProtocolError::InvalidId { id: 255 })
        );
        assert_eq!(ActuatorId::Unicast(253).validate(), Ok(ActuatorId::Unicast(253)));
        assert_eq!(ActuatorId::Broadcast.validate(), Ok(ActuatorId::Broadcast));
    }

    #[test]
    fn test_instruction_roundtrip() {
        for instruction in [
            Instruction::Ping,
            Instruction::Read,
            Instruction::Write,
            Instruction::RegWrite,
            Instruction::Action,
            Instruction::Reset,
            Instruction::SyncWrite,
        ] {
            assert_eq!(Instruction::from_u8(instruction.as_u8()), Some(instruction));
        }
        assert_eq!(Instruction::from_u8(0x53), None);
    }

    #[test]
    fn test_flags_decode_independent_bits() {
        let flags = ErrorFlags::from_bits(0b0010_0010);
        assert_eq!(
            flags.conditions(),
            vec![ActuatorCondition::AngleLimit, ActuatorCondition::Overload]
        );

        let flags = ErrorFlags::from_bits(0b0000_0110);
        assert_eq!(
            flags.conditions(),
            vec![ActuatorCondition::AngleLimit, ActuatorCondition::Overheat]
        );
        assert!(!flags.contains(ActuatorCondition::Range));
    }

    #[test]
    fn test_flags_zero_is_empty() {
        let flags = ErrorFlags::from_bits(0);
        assert!(flags.is_empty());
        assert!(flags.conditions().is_empty());
        assert_eq!(flags.to_string(), "NONE");
    }

    #[test]
    fn test_flags_reserved_bit() {
        let flags = ErrorFlags::from_bits(0x80 | 0x04);
        assert!(flags.has_reserved());
        assert_eq!(flags.conditions(), vec![ActuatorCondition::Overheat]);
        assert_eq!(flags.to_string(), "OVERHEAT | RESERVED");
    }

    #[test]
    fn test_flags_collect() {
        let flags: ErrorFlags = [ActuatorCondition::Overheat, ActuatorCondition::Instruction]
            .into_iter()
            .collect();
        assert_eq!(flags.bits(), 0x44);
    }
}
