//! Console sender pump.
//!
//! Drains the outbound queue into the console link, one packet per call.
//! A packet is consumed only after the link accepted it, so a failed send is
//! retried on the next call.

use core::future::Future;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};

use crate::context::AdapterContext;

/// Error type for console link operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// USB I/O error.
    Io,
    /// Not configured by the console yet.
    NotReady,
    /// Endpoint busy with the previous packet.
    Busy,
}

/// Async trait for the console-facing transport.
pub trait ConsoleLink {
    /// Transmit one packet.
    ///
    /// May wait until the previous packet has been sent.
    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), LinkError>>;

    /// Check if the link can take a packet now.
    fn is_ready(&self) -> bool;
}

/// Error type for [`PacketPump::service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PumpError {
    /// The link refused the packet; it stays queued.
    Link(LinkError),
    /// A bus reset happened while the packet was in flight. The queue was
    /// cleared under it and is left alone.
    Reset,
}

impl From<LinkError> for PumpError {
    fn from(e: LinkError) -> Self {
        PumpError::Link(e)
    }
}

pub struct PacketPump<'a, M: RawMutex> {
    ctx: &'a AdapterContext<M>,
    on_delay: Duration,
    sent: u32,
}

impl<'a, M: RawMutex> PacketPump<'a, M> {
    pub fn new(ctx: &'a AdapterContext<M>, on_delay: Duration) -> Self {
        Self { ctx, on_delay, sent: 0 }
    }

    /// Packets handed to the link so far.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// Send the oldest queued packet if it is due and the link is ready.
    ///
    /// Returns `Ok(true)` if a packet was sent and consumed, `Ok(false)` if
    /// there was nothing to do.
    pub async fn service<L: ConsoleLink>(
        &mut self,
        link: &mut L,
        now: Instant,
    ) -> Result<bool, PumpError> {
        let epoch = self.ctx.epoch();
        let Some(pkt) = self.ctx.queue().peek() else {
            return Ok(false);
        };
        if now.saturating_duration_since(pkt.created_at()) < self.on_delay {
            return Ok(false);
        }
        if !link.is_ready() {
            return Ok(false);
        }

        if let Err(e) = link.send(pkt.as_bytes()).await {
            debug!("console send failed: {:?}", e);
            return Err(e.into());
        }
        // No await between this check and the advance.
        if self.ctx.epoch() != epoch {
            return Err(PumpError::Reset);
        }
        self.ctx.queue().advance();
        self.sent = self.sent.wrapping_add(1);
        Ok(true)
    }
}
