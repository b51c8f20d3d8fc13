//! Instrument slots and their connect/disconnect notifications.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Instant;
use wla_proto::template_packet;

use crate::context::AdapterContext;

/// Console-side instrument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Instrument {
    GuitarOne = 0,
    GuitarTwo = 1,
    Drums = 2,
}

/// Number of instrument slots.
pub const INSTRUMENT_COUNT: usize = 3;

const ANNOUNCE_GUITAR_ONE: [u8; 22] = [
    0x22, 0x00, 0x00, 0x12, 0x00, 0x01, 0x14, 0x30, 0x00, 0x87, 0x67, 0x00, 0x75, 0x00, 0x69, 0x00,
    0x74, 0x00, 0x61, 0x00, 0x72, 0x00,
];
const ANNOUNCE_GUITAR_TWO: [u8; 22] = [
    0x22, 0x00, 0x00, 0x12, 0x01, 0x01, 0x14, 0x30, 0x00, 0x87, 0x67, 0x00, 0x75, 0x00, 0x69, 0x00,
    0x74, 0x00, 0x61, 0x00, 0x72, 0x00,
];
const ANNOUNCE_DRUMS: [u8; 22] = [
    0x22, 0x00, 0x00, 0x12, 0x02, 0x01, 0x1b, 0xad, 0x00, 0x88, 0x64, 0x00, 0x72, 0x00, 0x75, 0x00,
    0x6d, 0x00, 0x73, 0x00, 0x00, 0x00,
];

const DROP_GUITAR_ONE: [u8; 7] = [0x23, 0x00, 0x00, 0x01, 0x00, 0xff, 0x05];
const DROP_GUITAR_TWO: [u8; 7] = [0x23, 0x00, 0x00, 0x01, 0x01, 0xff, 0x05];
const DROP_DRUMS: [u8; 7] = [0x23, 0x00, 0x00, 0x01, 0x02, 0xff, 0x05];

impl Instrument {
    pub const ALL: [Instrument; INSTRUMENT_COUNT] =
        [Instrument::GuitarOne, Instrument::GuitarTwo, Instrument::Drums];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Instrument::GuitarOne),
            1 => Some(Instrument::GuitarTwo),
            2 => Some(Instrument::Drums),
            _ => None,
        }
    }

    /// Player id carried in this instrument's input reports.
    #[inline]
    #[must_use]
    pub const fn player_id(self) -> u8 {
        self as u8
    }

    /// Packet announcing the instrument to the console.
    #[must_use]
    pub const fn announce_template(self) -> &'static [u8] {
        match self {
            Instrument::GuitarOne => &ANNOUNCE_GUITAR_ONE,
            Instrument::GuitarTwo => &ANNOUNCE_GUITAR_TWO,
            Instrument::Drums => &ANNOUNCE_DRUMS,
        }
    }

    /// Packet telling the console the instrument went away.
    #[must_use]
    pub const fn drop_template(self) -> &'static [u8] {
        match self {
            Instrument::GuitarOne => &DROP_GUITAR_ONE,
            Instrument::GuitarTwo => &DROP_GUITAR_TWO,
            Instrument::Drums => &DROP_DRUMS,
        }
    }
}

/// Connected flags of every instrument slot.
///
/// Check-and-set happens under one lock so two contexts connecting the same
/// instrument cannot both see it as newly connected.
pub struct InstrumentRegistry<M: RawMutex> {
    connected: Mutex<M, Cell<[bool; INSTRUMENT_COUNT]>>,
}

impl<M: RawMutex> InstrumentRegistry<M> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connected: Mutex::new(Cell::new([false; INSTRUMENT_COUNT])),
        }
    }

    pub fn is_connected(&self, instrument: Instrument) -> bool {
        self.connected.lock(|c| c.get()[instrument.index()])
    }

    /// Set the flag; returns `true` if it changed.
    pub fn set(&self, instrument: Instrument, connected: bool) -> bool {
        self.connected.lock(|c| {
            let mut flags = c.get();
            let changed = flags[instrument.index()] != connected;
            flags[instrument.index()] = connected;
            c.set(flags);
            changed
        })
    }

    pub fn snapshot(&self) -> [bool; INSTRUMENT_COUNT] {
        self.connected.lock(Cell::get)
    }

    pub fn clear(&self) {
        self.connected.lock(|c| c.set([false; INSTRUMENT_COUNT]));
    }
}

impl<M: RawMutex> Default for InstrumentRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Emits announce/drop notifications as instruments come and go.
pub struct InstrumentManager<'a, M: RawMutex> {
    ctx: &'a AdapterContext<M>,
}

impl<'a, M: RawMutex> InstrumentManager<'a, M> {
    pub fn new(ctx: &'a AdapterContext<M>) -> Self {
        Self { ctx }
    }

    /// Mark `instrument` connected.
    ///
    /// Repeated connects are no-ops. The announce is only queued while the
    /// session is running; otherwise it is replayed when the session gets
    /// there. Returns `true` if the instrument was newly connected.
    pub fn connect(&self, instrument: Instrument, now: Instant) -> bool {
        if !self.ctx.instruments().set(instrument, true) {
            return false;
        }
        info!("instrument connected: {:?}", instrument);
        if self.ctx.session().is_running() {
            self.send(instrument.announce_template(), now);
        }
        true
    }

    /// Mark `instrument` disconnected. Symmetric to [`connect`](Self::connect).
    pub fn disconnect(&self, instrument: Instrument, now: Instant) -> bool {
        if !self.ctx.instruments().set(instrument, false) {
            return false;
        }
        info!("instrument disconnected: {:?}", instrument);
        if self.ctx.session().is_running() {
            self.send(instrument.drop_template(), now);
        }
        true
    }

    /// Announce every connected instrument.
    pub fn notify_all(&self, now: Instant) {
        debug!("announcing all connected instruments");
        let connected = self.ctx.instruments().snapshot();
        for instrument in Instrument::ALL {
            if connected[instrument.index()] {
                self.send(instrument.announce_template(), now);
            }
        }
    }

    /// Announce the instrument at `index` whether or not it is connected.
    /// Unknown indices are ignored.
    pub fn notify_single(&self, index: u8, now: Instant) {
        match Instrument::from_index(index) {
            Some(instrument) => self.send(instrument.announce_template(), now),
            None => debug!("ignoring instrument query for index {}", index),
        }
    }

    fn send(&self, template: &[u8], now: Instant) {
        match template_packet(template, now) {
            Ok(pkt) => {
                // enqueue logs and counts a drop
                self.ctx.enqueue(&pkt).ok();
            }
            Err(e) => error!("bad instrument template: {:?}", e),
        }
    }
}
