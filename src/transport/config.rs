//! Link configuration

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::protocol::Instruction;

/// Mirror of the actuator's `StatusReturnLevel` register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum StatusReturnLevel {
    /// Only `Ping` is answered
    Never = 0,
    /// `Ping` and `Read` are answered
    ReadOnly = 1,
    /// Every unicast instruction is answered
    #[default]
    All = 2,
}

impl StatusReturnLevel {
    /// Convert from the register value
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Never),
            1 => Some(Self::ReadOnly),
            2 => Some(Self::All),
            _ => None,
        }
    }

    /// Whether a unicast `instruction` gets a status packet at this level.
    ///
    /// Broadcast packets are never answered regardless of level.
    #[must_use]
    pub const fn expects_reply(self, instruction: Instruction) -> bool {
        match instruction {
            Instruction::Ping => true,
            Instruction::Read => !matches!(self, Self::Never),
            _ => matches!(self, Self::All),
        }
    }
}

/// Settings for a [`Link`](super::Link).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkConfig {
    /// Line speed in bits per second; applied by channels that own a real port.
    pub baud_rate: u32,
    /// Upper bound for each individual read.
    #[cfg_attr(feature = "serde", serde(with = "duration_millis"))]
    pub read_timeout: Duration,
    /// Extra attempts after the first one, used by the instruction helpers.
    pub max_retries: u32,
    /// Reply behaviour configured on the actuator.
    pub status_return_level: StatusReturnLevel,
    /// Discard pending input before each attempt.
    pub flush_before_send: bool,
    /// Read back and verify our own transmission before waiting for the reply.
    pub echo_suppression: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: 1_000_000,
            read_timeout: Duration::from_millis(100),
            max_retries: 3,
            status_return_level: StatusReturnLevel::All,
            flush_before_send: true,
            echo_suppression: false,
        }
    }
}

impl LinkConfig {
    /// Set the baud rate
    #[must_use]
    pub const fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the per-read timeout
    #[must_use]
    pub const fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Set the retry bound used by the helpers
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the actuator's status return level
    #[must_use]
    pub const fn with_status_return_level(mut self, level: StatusReturnLevel) -> Self {
        self.status_return_level = level;
        self
    }

    /// Enable or disable the input flush before each attempt
    #[must_use]
    pub const fn with_flush_before_send(mut self, enabled: bool) -> Self {
        self.flush_before_send = enabled;
        self
    }

    /// Enable or disable echo suppression
    #[must_use]
    pub const fn with_echo_suppression(mut self, enabled: bool) -> Self {
        self.echo_suppression = enabled;
        self
    }
}

#[cfg(feature = "serde")]
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.baud_rate, 1_000_000);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.status_return_level, StatusReturnLevel::All);
        assert!(config.flush_before_send);
        assert!(!config.echo_suppression);
    }

    #[test]
    fn test_builder() {
        let config = LinkConfig::default()
            .with_baud_rate(57_600)
            .with_max_retries(0)
            .with_echo_suppression(true);
        assert_eq!(config.baud_rate, 57_600);
        assert_eq!(config.max_retries, 0);
        assert!(config.echo_suppression);
    }

    #[test]
    fn test_status_return_level() {
        use Instruction::{Action, Ping, Read, Write};

        assert!(StatusReturnLevel::Never.expects_reply(Ping));
        assert!(!StatusReturnLevel::Never.expects_reply(Read));
        assert!(StatusReturnLevel::ReadOnly.expects_reply(Read));
        assert!(!StatusReturnLevel::ReadOnly.expects_reply(Write));
        assert!(StatusReturnLevel::All.expects_reply(Action));
        assert_eq!(StatusReturnLevel::from_u8(1), Some(StatusReturnLevel::ReadOnly));
        assert_eq!(StatusReturnLevel::from_u8(3), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serde_roundtrip() {
        let config = LinkConfig::default()
            .with_read_timeout(Duration::from_millis(250))
            .with_status_return_level(StatusReturnLevel::ReadOnly);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"read_timeout\":250"));
        assert!(json.contains("\"read_only\""));
        let decoded: LinkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, config);

        let partial: LinkConfig = serde_json::from_str(r#"{"max_retries":1}"#).unwrap();
        assert_eq!(partial.max_retries, 1);
        assert_eq!(partial.baud_rate, 1_000_000);
    }
}
