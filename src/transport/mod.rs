//! Byte channels and the retrying link built on them

mod channel;
mod config;
mod error;
mod link;
#[cfg(feature = "serial")]
mod serial;
mod stats;

pub use channel::{Channel, ChannelError};
pub use config::{LinkConfig, StatusReturnLevel};
pub use error::{Fault, LinkError, Phase};
pub use link::{DirectionHook, Link};
#[cfg(feature = "serial")]
pub use serial::SerialChannel;
pub use stats::LinkStats;
