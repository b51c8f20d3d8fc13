//! Shared adapter context.
//!
//! Everything that more than one execution context touches lives here: the
//! session state, the instrument flags, the outbound queue and a couple of
//! counters. The firmware keeps one instance in a `static` and hands out
//! shared references.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use portable_atomic::{AtomicU32, Ordering};
use wla_proto::{command_name, PacketError, WirePacket};

use crate::host::{host_data, HostData};
use crate::instruments::{InstrumentManager, InstrumentRegistry};
use crate::queue::{OutboundQueue, PacketQueue, QueueFull};
use crate::state::{SessionCell, SessionState};

/// Console packet tagged with the bus generation it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConsoleFrame {
    epoch: u32,
    data: HostData,
}

impl ConsoleFrame {
    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

pub struct AdapterContext<M: RawMutex = CriticalSectionRawMutex> {
    session: SessionCell,
    instruments: InstrumentRegistry<M>,
    queue: OutboundQueue<M>,
    dropped: AtomicU32,
    /// Bumped on every bus reset.
    epoch: AtomicU32,
}

impl<M: RawMutex> AdapterContext<M> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session: SessionCell::new(),
            instruments: InstrumentRegistry::new(),
            queue: PacketQueue::new(),
            dropped: AtomicU32::new(0),
            epoch: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn session(&self) -> &SessionCell {
        &self.session
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.session.get()
    }

    #[inline]
    pub fn instruments(&self) -> &InstrumentRegistry<M> {
        &self.instruments
    }

    #[inline]
    pub fn instrument_manager(&self) -> InstrumentManager<'_, M> {
        InstrumentManager::new(self)
    }

    #[inline]
    pub fn queue(&self) -> &OutboundQueue<M> {
        &self.queue
    }

    /// Queue a packet for the console.
    ///
    /// A full queue drops the packet; the drop is logged and counted.
    pub fn enqueue(&self, pkt: &WirePacket) -> Result<(), QueueFull> {
        self.queue.write(pkt).inspect_err(|_| {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            let cmd = pkt.as_bytes().first().copied().unwrap_or(0);
            warn!("outbound queue full, dropped {} ({} total)", command_name(cmd), total);
        })
    }

    /// Packets dropped on a full queue since boot.
    #[inline]
    pub fn dropped_packets(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Bus reset generation, used by the sender to discard in-flight work.
    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Copy a packet read from the console, stamped with the current epoch.
    pub fn console_frame(&self, bytes: &[u8]) -> Result<ConsoleFrame, PacketError> {
        Ok(ConsoleFrame {
            epoch: self.epoch(),
            data: host_data(bytes)?,
        })
    }

    /// Wipe everything the link carried.
    ///
    /// The queue is emptied and every instrument flag cleared without
    /// sending drop notifications.
    pub(crate) fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.queue.clear();
        self.instruments.clear();
    }
}

impl<M: RawMutex> Default for AdapterContext<M> {
    fn default() -> Self {
        Self::new()
    }
}
