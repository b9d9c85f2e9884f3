//! AX/MX protocol 1.0 control table
//!
//! Symbolic register names resolve to fixed spans at compile time.

use super::ProtocolError;

/// Contiguous control-table region, 1 or 2 bytes wide.
///
/// Two-byte spans are little-endian: the low byte sits at `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterSpan {
    address: u8,
    length: u8,
}

impl RegisterSpan {
    /// Create a span, rejecting widths other than 1 or 2 and spans that run past 255.
    pub const fn new(address: u8, length: u8) -> Result<Self, ProtocolError> {
        if !matches!(length, 1 | 2) || address.checked_add(length - 1).is_none() {
            return Err(ProtocolError::InvalidSpan { address, length });
        }
        Ok(Self { address, length })
    }

    /// Start address
    #[must_use]
    pub const fn address(self) -> u8 {
        self.address
    }

    /// Width in bytes
    #[must_use]
    pub const fn length(self) -> u8 {
        self.length
    }

    /// Interpret register bytes as an unsigned value.
    ///
    /// Returns `None` if `bytes` is not exactly as wide as the span.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<u16> {
        match (self.length, bytes) {
            (1, &[value]) => Some(u16::from(value)),
            (2, &[lo, hi]) => Some(u16::from_le_bytes([lo, hi])),
            _ => None,
        }
    }

    /// Lay a value out as register bytes.
    ///
    /// Returns `None` if the value does not fit a one-byte span.
    #[must_use]
    pub fn encode(self, value: u16) -> Option<Vec<u8>> {
        match self.length {
            1 => u8::try_from(value).ok().map(|byte| vec![byte]),
            _ => Some(value.to_le_bytes().to_vec()),
        }
    }
}

/// Whether a register accepts writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reported by the actuator only
    ReadOnly,
    /// Writable by the host
    ReadWrite,
}

macro_rules! control_table {
    ($($(#[$doc:meta])* $name:ident = ($address:literal, $length:literal, $access:ident),)*) => {
        /// Named control-table registers
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Register {
            $($(#[$doc])* $name,)*
        }

        impl Register {
            /// Every register, in address order
            pub const ALL: &'static [Self] = &[$(Self::$name,)*];

            /// Address and width of the register
            #[must_use]
            pub const fn span(self) -> RegisterSpan {
                match self {
                    $(Self::$name => RegisterSpan { address: $address, length: $length },)*
                }
            }

            /// Whether the host may write the register
            #[must_use]
            pub const fn access(self) -> Access {
                match self {
                    $(Self::$name => Access::$access,)*
                }
            }

            /// Human-readable name
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name),)*
                }
            }
        }
    };
}

control_table! {
    /// Model number (EEPROM)
    ModelNumber = (0, 2, ReadOnly),
    /// Firmware version (EEPROM)
    FirmwareVersion = (2, 1, ReadOnly),
    /// Bus id (EEPROM)
    Id = (3, 1, ReadWrite),
    /// Baud rate divisor (EEPROM)
    BaudRate = (4, 1, ReadWrite),
    /// Delay before the status packet, in 2 µs units (EEPROM)
    ReturnDelayTime = (5, 1, ReadWrite),
    /// Clockwise angle limit (EEPROM)
    CwAngleLimit = (6, 2, ReadWrite),
    /// Counter-clockwise angle limit (EEPROM)
    CcwAngleLimit = (8, 2, ReadWrite),
    /// Temperature limit in °C (EEPROM)
    HighestLimitTemperature = (11, 1, ReadWrite),
    /// Lower voltage limit in 0.1 V (EEPROM)
    LowestLimitVoltage = (12, 1, ReadWrite),
    /// Upper voltage limit in 0.1 V (EEPROM)
    HighestLimitVoltage = (13, 1, ReadWrite),
    /// Torque limit copied to RAM at power-on (EEPROM)
    MaxTorque = (14, 2, ReadWrite),
    /// Which instructions get a status packet (EEPROM)
    StatusReturnLevel = (16, 1, ReadWrite),
    /// Conditions that light the LED (EEPROM)
    AlarmLed = (17, 1, ReadWrite),
    /// Conditions that cut torque (EEPROM)
    AlarmShutdown = (18, 1, ReadWrite),
    /// Potentiometer calibration, low end (EEPROM)
    DownCalibration = (20, 2, ReadOnly),
    /// Potentiometer calibration, high end (EEPROM)
    UpCalibration = (22, 2, ReadOnly),
    /// Non-zero powers the motor
    TorqueEnable = (24, 1, ReadWrite),
    /// Status LED
    Led = (25, 1, ReadWrite),
    /// Clockwise dead band around the goal
    CwComplianceMargin = (26, 1, ReadWrite),
    /// Counter-clockwise dead band around the goal
    CcwComplianceMargin = (27, 1, ReadWrite),
    /// Clockwise torque ramp near the goal
    CwComplianceSlope = (28, 1, ReadWrite),
    /// Counter-clockwise torque ramp near the goal
    CcwComplianceSlope = (29, 1, ReadWrite),
    /// Target position in model units
    GoalPosition = (30, 2, ReadWrite),
    /// Speed toward the goal position
    MovingSpeed = (32, 2, ReadWrite),
    /// Torque ceiling in RAM
    TorqueLimit = (34, 2, ReadWrite),
    /// Current position in model units
    PresentPosition = (36, 2, ReadOnly),
    /// Current speed
    PresentSpeed = (38, 2, ReadOnly),
    /// Bit 10 is the direction; bits 0-9 the magnitude
    PresentLoad = (40, 2, ReadOnly),
    /// In 0.1 V
    PresentVoltage = (42, 1, ReadOnly),
    /// In °C
    PresentTemperature = (43, 1, ReadOnly),
    /// 1 while a RegWrite is staged
    RegisteredInstruction = (44, 1, ReadOnly),
    /// 1 while travelling toward the goal
    Moving = (46, 1, ReadOnly),
    /// Once set, EEPROM stays locked until power-off
    Lock = (47, 1, ReadWrite),
    /// Minimum current applied while moving
    Punch = (48, 2, ReadWrite),
}
