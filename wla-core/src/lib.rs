//! Platform-agnostic engine for the wireless legacy adapter.
//!
//! This crate contains the console session and everything that feeds it,
//! with no hardware dependencies:
//!
//! - [`session`]: console handshake state machine
//! - [`queue`]: bounded packet FIFO shared between execution contexts
//! - [`instruments`]: instrument slots and their notifications
//! - [`drums`], [`midi`]: MIDI drum kit translation
//! - [`guitar`]: HID guitar slots
//! - [`controller`]: genuine controller passthrough
//! - [`host`]: messages from and to the USB host-role context
//! - [`sender`]: rate-limited console sender
//! - [`adapter`]: everything above behind one facade
//!
//! Time is always passed in as an [`embassy_time::Instant`], so the engine
//! runs unchanged in host tests.
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt (for embedded logging)
//! - **`log`**: Log through the `log` facade

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
mod fmt;

pub mod adapter;
pub mod config;
pub mod context;
pub mod controller;
pub mod drums;
pub mod guitar;
pub mod host;
pub mod instruments;
pub mod midi;
pub mod queue;
pub mod sender;
pub mod session;
pub mod state;

#[cfg(test)]
mod test_util;

pub use adapter::Adapter;
pub use config::{AdapterConfig, DEFAULT_CONFIG, MIDI_BAUD_RATE};
pub use context::{AdapterContext, ConsoleFrame};
pub use controller::{is_supported_controller, ControllerHandle, ControllerSlot};
pub use drums::{DrumMapper, DrumOutput, NoteMap, DEFAULT_NOTE_MAP};
pub use guitar::{is_supported_guitar, GuitarSlots};
pub use host::{
    host_data, ControllerWriter, HostData, HostEvent, HostEventChannel, MountError, RelayChannel,
    RelayPacket,
};
pub use instruments::{Instrument, InstrumentManager, InstrumentRegistry};
pub use midi::{NoteOn, SerialMidiEvent, SerialMidiInput};
pub use queue::{OutboundQueue, PacketQueue, QueueFull, OUTBOUND_QUEUE_DEPTH};
pub use sender::{ConsoleLink, LinkError, PacketPump, PumpError};
pub use session::{is_auth_success, ControllerRelay, IdentityTable, RelayError, Session};
pub use state::{SessionCell, SessionState};
