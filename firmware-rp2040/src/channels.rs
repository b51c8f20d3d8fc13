//! Shared state and inter-task channels.
//!
//! ```text
//! ┌──────────────┐  HostEvent    ┌──────────────┐  AdapterContext  ┌──────────────┐
//! │  Host role   │──────────────▶│ Adapter task │─────────────────▶│ Sender task  │
//! │  (external)  │◀──────────────│              │   (queue)        │              │
//! └──────────────┘  RelayPacket  └──────────────┘                  └──────────────┘
//!                                   ▲        ▲
//!                      CONSOLE_RX ──┘        └── MIDI_BYTES
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use wla_core::{AdapterContext, ConsoleFrame, HostEventChannel, RelayChannel};

/// Session state, instrument flags and the outbound queue.
pub static CONTEXT: AdapterContext = AdapterContext::new();

/// Peripheral events from the USB host role.
pub static HOST_EVENTS: HostEventChannel = Channel::new();

/// Bytes for the genuine controller, drained by the USB host role.
pub static CONTROLLER_RELAY: RelayChannel = Channel::new();

/// Packets read from the console OUT endpoint, tagged with the bus epoch.
pub static CONSOLE_RX: Channel<CriticalSectionRawMutex, ConsoleFrame, 4> = Channel::new();

/// Raw bytes from the serial MIDI port.
pub static MIDI_BYTES: Channel<CriticalSectionRawMutex, u8, 32> = Channel::new();
