//! Request/reply exchange with one actuator
//!
//! # Attempt
//!
//! ```text
//! flush input -> [tx on] write [tx off] -> echo? -> read 5 -> check header, id
//!             -> read len-1 -> validate -> reply
//! ```
//!
//! Timeouts, short reads, partial writes and framing errors restart the attempt from the
//! top, up to the retry bound. Channel errors other than timeouts end the call at once.

use std::fmt;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::{debug, instrument, trace, warn};

use super::{Channel, ChannelError, Fault, LinkConfig, LinkError, LinkStats, Phase};
use crate::protocol::{
    Access, ActuatorId, ErrorFlags, HEADER, Instruction, PREFIX_SIZE, ProtocolError, Register,
    RegisterSpan, StatusPacket, codec, idx,
};

/// Callback driving the transmit-enable line: `true` before a write, `false` after.
pub type DirectionHook = Box<dyn FnMut(bool) + Send>;

/// Keeps the line driver in transmit mode for exactly as long as it lives.
struct TransmitGuard<'a> {
    hook: Option<&'a mut DirectionHook>,
}

impl<'a> TransmitGuard<'a> {
    fn engage(mut hook: Option<&'a mut DirectionHook>) -> Self {
        if let Some(hook) = hook.as_deref_mut() {
            hook(true);
        }
        Self { hook }
    }
}

impl Drop for TransmitGuard<'_> {
    fn drop(&mut self) {
        if let Some(hook) = self.hook.as_deref_mut() {
            hook(false);
        }
    }
}

enum AttemptError {
    Retry(Fault),
    Fatal(ChannelError),
}

impl From<Fault> for AttemptError {
    fn from(fault: Fault) -> Self {
        Self::Retry(fault)
    }
}

impl From<ProtocolError> for AttemptError {
    fn from(err: ProtocolError) -> Self {
        Self::Retry(Fault::Protocol(err))
    }
}

/// Reliable request/reply with a single actuator over a [`Channel`].
///
/// # Bus sharing
///
/// A half-duplex bus carries one request at a time. When several links share one
/// physical line, the caller must serialize their calls; a link does no cross-link
/// locking of its own.
pub struct Link<C> {
    id: ActuatorId,
    channel: C,
    config: LinkConfig,
    hook: Option<DirectionHook>,
    stats: LinkStats,
}

impl<C: Channel> Link<C> {
    /// Create a link to `id` with the default configuration.
    pub fn new(channel: C, id: ActuatorId) -> Self {
        Self::with_config(channel, id, LinkConfig::default())
    }

    /// Create a link with explicit settings.
    pub fn with_config(channel: C, id: ActuatorId, config: LinkConfig) -> Self {
        Self {
            id,
            channel,
            config,
            hook: None,
            stats: LinkStats::default(),
        }
    }

    /// Install a transmit-enable callback, builder style.
    #[must_use]
    pub fn with_direction_hook(mut self, hook: impl FnMut(bool) + Send + 'static) -> Self {
        self.set_direction_hook(hook);
        self
    }

    /// Install or replace the transmit-enable callback.
    pub fn set_direction_hook(&mut self, hook: impl FnMut(bool) + Send + 'static) {
        self.hook = Some(Box::new(hook));
    }

    /// Remove the transmit-enable callback.
    pub fn clear_direction_hook(&mut self) {
        self.hook = None;
    }

    /// Actuator this link talks to
    pub const fn id(&self) -> ActuatorId {
        self.id
    }

    /// Current settings
    pub const fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Mutable settings; changes apply from the next call
    pub const fn config_mut(&mut self) -> &mut LinkConfig {
        &mut self.config
    }

    /// Snapshot of the counters
    pub const fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Zero the counters
    pub fn reset_stats(&mut self) {
        self.stats = LinkStats::default();
    }

    /// Borrow the underlying channel
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// Borrow the underlying channel mutably
    pub const fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Release the channel
    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Send an instruction and wait for its validated reply.
    ///
    /// Returns `Ok(None)` when no status packet is expected: the link is broadcast or the
    /// configured status return level suppresses the reply. A reply carrying error flags
    /// is returned as-is and never retried; inspect [`StatusPacket::error`].
    ///
    /// At most `max_retries + 1` attempts are made.
    pub fn send(
        &mut self,
        instruction: Instruction,
        parameters: &[u8],
        max_retries: u32,
    ) -> Result<Option<StatusPacket>, LinkError> {
        self.exchange(instruction, parameters, max_retries, None)
    }

    /// Like [`send`](Self::send), but gives up once `deadline` passes.
    ///
    /// Each read waits at most until the deadline.
    pub fn send_with_deadline(
        &mut self,
        instruction: Instruction,
        parameters: &[u8],
        max_retries: u32,
        deadline: Instant,
    ) -> Result<Option<StatusPacket>, LinkError> {
        self.exchange(instruction, parameters, max_retries, Some(deadline))
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(id = %self.id, instruction = %instruction, max_retries = max_retries)
    )]
    fn exchange(
        &mut self,
        instruction: Instruction,
        parameters: &[u8],
        max_retries: u32,
        deadline: Option<Instant>,
    ) -> Result<Option<StatusPacket>, LinkError> {
        let packet = codec::encode_instruction(self.id, instruction, parameters)?;
        let expects_reply =
            !self.id.is_broadcast() && self.config.status_return_level.expects_reply(instruction);
        self.run(&packet, expects_reply, max_retries, deadline)
    }

    fn run(
        &mut self,
        packet: &[u8],
        expects_reply: bool,
        max_retries: u32,
        deadline: Option<Instant>,
    ) -> Result<Option<StatusPacket>, LinkError> {
        let started = Instant::now();

        let mut attempt: u32 = 0;
        let mut last: Option<Fault> = None;
        loop {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                self.stats.exhausted += 1;
                warn!(attempts = attempt, "deadline exceeded");
                return Err(LinkError::DeadlineExceeded {
                    attempts: attempt,
                    last,
                });
            }

            attempt += 1;
            self.stats.attempts += 1;
            if attempt == 1 {
                self.stats.exchanges += 1;
            } else {
                self.stats.retries += 1;
            }

            let fault = match self.attempt(packet, expects_reply, deadline) {
                Ok(reply) => {
                    self.stats.record_completed(started.elapsed());
                    if let Some(status) = reply.as_ref().filter(|status| !status.is_ok()) {
                        self.stats.actuator_errors += 1;
                        debug!(flags = %status.error(), "actuator reported error");
                    }
                    return Ok(reply);
                }
                Err(AttemptError::Fatal(err)) => {
                    self.stats.fatal_errors += 1;
                    warn!(attempt, error = %err, "channel failure");
                    return Err(LinkError::Channel(err));
                }
                Err(AttemptError::Retry(fault)) => fault,
            };

            self.stats.record_fault(&fault);
            if attempt > max_retries {
                self.stats.exhausted += 1;
                warn!(attempts = attempt, %fault, "retries exhausted");
                return Err(LinkError::RetriesExhausted {
                    attempts: attempt,
                    last: fault,
                });
            }
            debug!(attempt, %fault, "retrying");
            last = Some(fault);
        }
    }

    fn attempt(
        &mut self,
        packet: &[u8],
        expects_reply: bool,
        deadline: Option<Instant>,
    ) -> Result<Option<StatusPacket>, AttemptError> {
        if self.config.flush_before_send {
            self.channel.flush_input().map_err(AttemptError::Fatal)?;
        }

        trace!(bytes = ?packet, "tx");
        let written = {
            let _tx = TransmitGuard::engage(self.hook.as_mut());
            self.channel.write(packet)
        };
        let written = classify(written, Phase::Sending, packet.len())?;
        if written != packet.len() {
            return Err(Fault::PartialWrite {
                written,
                expected: packet.len(),
            }
            .into());
        }

        if self.config.echo_suppression {
            let echo = self.receive(packet.len(), Phase::AwaitingEcho, deadline)?;
            if echo != packet {
                return Err(Fault::EchoMismatch.into());
            }
        }

        if !expects_reply {
            return Ok(None);
        }

        let prefix = self.receive(PREFIX_SIZE, Phase::AwaitingHeader, deadline)?;
        if prefix[..2] != HEADER {
            return Err(ProtocolError::BadHeader {
                found: [prefix[0], prefix[1]],
            }
            .into());
        }
        let expected_id = self.id.as_u8();
        if prefix[idx::ID] != expected_id {
            return Err(ProtocolError::IdMismatch {
                expected: expected_id,
                found: prefix[idx::ID],
            }
            .into());
        }

        // Error byte is already in the prefix; parameters and checksum remain.
        let remaining = usize::from(prefix[idx::LENGTH]).saturating_sub(1);
        let mut reply = BytesMut::with_capacity(PREFIX_SIZE + remaining);
        reply.extend_from_slice(&prefix);
        if remaining > 0 {
            let body = self.receive(remaining, Phase::AwaitingBody, deadline)?;
            reply.extend_from_slice(&body);
        }
        trace!(bytes = ?&reply[..], "rx");

        let status = codec::decode_status_owned(reply.freeze(), expected_id)?;
        Ok(Some(status))
    }

    fn receive(
        &mut self,
        count: usize,
        phase: Phase,
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>, AttemptError> {
        let timeout = self.read_timeout(deadline);
        let bytes = classify(self.channel.read_exact(count, timeout), phase, count)?;
        if bytes.len() != count {
            return Err(Fault::ShortRead {
                phase,
                expected: count,
                got: bytes.len(),
            }
            .into());
        }
        Ok(bytes)
    }

    fn read_timeout(&self, deadline: Option<Instant>) -> Duration {
        match deadline {
            Some(deadline) => self
                .config
                .read_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.config.read_timeout,
        }
    }

    /// Ping the actuator and return the flags it reports.
    ///
    /// Flags come back as data, never as [`LinkError::ActuatorError`].
    pub fn ping(&mut self) -> Result<ErrorFlags, LinkError> {
        self.send(Instruction::Ping, &[], self.config.max_retries)?
            .map(|status| status.error())
            .ok_or(LinkError::NoReply)
    }

    /// Read a 1- or 2-byte register as an unsigned value.
    pub fn read_register(&mut self, address: u8, length: u8) -> Result<u16, LinkError> {
        let span = RegisterSpan::new(address, length)?;
        let status = self
            .request(Instruction::Read, &[address, length])?
            .ok_or(LinkError::NoReply)?;
        let parameters = status.parameters();
        span.decode(parameters)
            .ok_or(LinkError::UnexpectedReplyLength {
                expected: usize::from(length),
                got: parameters.len(),
            })
    }

    /// Write `data` starting at `address`.
    pub fn write_register(&mut self, address: u8, data: &[u8]) -> Result<(), LinkError> {
        self.request_with_address(Instruction::Write, address, data)
    }

    /// Stage a write that takes effect on [`action`](Self::action).
    pub fn reg_write_register(&mut self, address: u8, data: &[u8]) -> Result<(), LinkError> {
        self.request_with_address(Instruction::RegWrite, address, data)
    }

    /// Apply staged writes.
    pub fn action(&mut self) -> Result<(), LinkError> {
        self.request(Instruction::Action, &[]).map(drop)
    }

    /// Restore factory settings, including the id.
    pub fn reset(&mut self) -> Result<(), LinkError> {
        self.request(Instruction::Reset, &[]).map(drop)
    }

    /// Broadcast one data block per actuator at `address`.
    ///
    /// Always addressed to the broadcast id, whatever this link's id is; nothing answers.
    pub fn sync_write(&mut self, address: u8, entries: &[(u8, &[u8])]) -> Result<(), LinkError> {
        let packet = codec::encode_sync_write(address, entries)?;
        debug!(address, actuators = entries.len(), "sync write");
        self.run(&packet, false, self.config.max_retries, None)
            .map(drop)
    }

    /// Read a named register.
    pub fn read(&mut self, register: Register) -> Result<u16, LinkError> {
        let span = register.span();
        self.read_register(span.address(), span.length())
    }

    /// Write a named register, refusing read-only ones.
    pub fn write(&mut self, register: Register, value: u16) -> Result<(), LinkError> {
        if register.access() == Access::ReadOnly {
            return Err(LinkError::ReadOnlyRegister(register));
        }
        let span = register.span();
        let data = span
            .encode(value)
            .ok_or(LinkError::ValueOutOfRange { register, value })?;
        self.write_register(span.address(), &data)
    }

    fn request_with_address(
        &mut self,
        instruction: Instruction,
        address: u8,
        data: &[u8],
    ) -> Result<(), LinkError> {
        let mut parameters = Vec::with_capacity(1 + data.len());
        parameters.push(address);
        parameters.extend_from_slice(data);
        self.request(instruction, &parameters).map(drop)
    }

    /// Send with the configured retry bound and turn error flags into [`LinkError::ActuatorError`].
    fn request(
        &mut self,
        instruction: Instruction,
        parameters: &[u8],
    ) -> Result<Option<StatusPacket>, LinkError> {
        match self.send(instruction, parameters, self.config.max_retries)? {
            Some(status) if !status.is_ok() => Err(LinkError::ActuatorError(status.error())),
            reply => Ok(reply),
        }
    }
}

impl<C> fmt::Debug for Link<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("direction_hook", &self.hook.is_some())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn classify<T>(
    result: Result<T, ChannelError>,
    phase: Phase,
    expected: usize,
) -> Result<T, AttemptError> {
    result.map_err(|err| {
        if !err.is_transient() {
            return AttemptError::Fatal(err);
        }
        let received = match err {
            ChannelError::Timeout { received, .. } => received,
            _ => 0,
        };
        AttemptError::Retry(Fault::Timeout {
            phase,
            expected,
            received,
        })
    })
}
