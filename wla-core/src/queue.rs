//! Bounded FIFO shared between producers and the console sender.
//!
//! Slots hold elements by value in a [`heapless::Deque`]. Producers are
//! serialized among themselves by the write-side lock; the slots sit behind
//! the read-side lock, which either side holds only for the copy in or out.
//! A full queue rejects the write and keeps what it has.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;
use heapless::Deque;
use wla_proto::WirePacket;

/// Capacity of the outbound packet queue.
pub const OUTBOUND_QUEUE_DEPTH: usize = 16;

/// Outbound queue shared between execution contexts.
pub type OutboundQueue<M = CriticalSectionRawMutex> =
    PacketQueue<M, M, WirePacket, OUTBOUND_QUEUE_DEPTH>;

/// Returned by a rejected write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

/// Fixed-capacity FIFO with a write-side and a read-side lock.
///
/// `W` serializes producers, `R` guards the slots. The queue is only `Sync`
/// when both are, so a queue built with `NoopRawMutex` stays confined to one
/// context.
pub struct PacketQueue<W: RawMutex, R: RawMutex, T: Copy, const N: usize> {
    write_lock: Mutex<W, ()>,
    slots: Mutex<R, RefCell<Deque<T, N>>>,
}

impl<W: RawMutex, R: RawMutex, T: Copy, const N: usize> PacketQueue<W, R, T, N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            write_lock: Mutex::new(()),
            slots: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of queued elements.
    #[inline]
    pub fn count(&self) -> usize {
        self.slots.lock(|slots| slots.borrow().len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count() >= N
    }

    /// Copy `item` into the next free slot. A full queue fails the write and
    /// keeps its contents.
    pub fn write(&self, item: &T) -> Result<(), QueueFull> {
        self.write_lock.lock(|_| {
            self.slots
                .lock(|slots| slots.borrow_mut().push_back(*item).map_err(|_| QueueFull))
        })
    }

    /// Copy out the oldest element without consuming it.
    pub fn peek(&self) -> Option<T> {
        self.slots.lock(|slots| slots.borrow().front().copied())
    }

    /// Consume the oldest element. Returns `false` if the queue was empty.
    ///
    /// Writes never displace queued elements, so after a [`peek`](Self::peek)
    /// this consumes exactly the element that was peeked.
    pub fn advance(&self) -> bool {
        self.slots.lock(|slots| slots.borrow_mut().pop_front().is_some())
    }

    /// Copy out and consume the oldest element.
    pub fn read(&self) -> Option<T> {
        self.slots.lock(|slots| slots.borrow_mut().pop_front())
    }

    /// Drop every queued element.
    pub fn clear(&self) {
        self.write_lock.lock(|_| self.slots.lock(|slots| slots.borrow_mut().clear()));
    }
}

impl<W: RawMutex, R: RawMutex, T: Copy, const N: usize> Default for PacketQueue<W, R, T, N> {
    fn default() -> Self {
        Self::new()
    }
}
