//! Wireless legacy adapter firmware for RP2040.
//!
//! The adapter presents itself to the console as a wireless legacy
//! instrument adapter and turns drum kits, guitars and a genuine controller
//! into console instrument input.
//!
//! # Hardware Configuration
//!
//! | Function | GPIO | Description |
//! |----------|------|-------------|
//! | UART1 TX | 8    | Unused |
//! | UART1 RX | 9    | Serial MIDI in (31250 baud) |
//! | LED      | 25   | On-board LED (lit while the session runs) |
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime with these tasks:
//!
//! - **USB Task**: Manages the USB device stack, raises [`console::BUS_RESET`]
//! - **Console RX Task**: Reads console packets into [`channels::CONSOLE_RX`]
//! - **Serial MIDI Task**: Moves UART bytes into [`channels::MIDI_BYTES`]
//! - **Adapter Task**: Owns the [`Adapter`] and applies every input to it
//! - **Sender Task**: Drains the outbound queue into the console IN endpoint
//!
//! The USB host role publishes [`HostEvent`](wla_core::HostEvent)s into
//! [`channels::HOST_EVENTS`] and drains [`channels::CONTROLLER_RELAY`].
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)

#![no_std]

pub use wla_core::{Adapter, AdapterContext, PacketPump, SessionState, DEFAULT_CONFIG};

pub mod channels;
pub mod console;
pub mod identity;
pub mod serial_midi;

pub use console::{configure_console, ConsoleHandler, ConsoleReader, UsbConsoleLink};
pub use serial_midi::{midi_uart_config, SerialMidiPort};
