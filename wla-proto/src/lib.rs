//! Wire format for the wireless legacy adapter protocol.
//!
//! This crate contains everything needed to read and write the packets
//! exchanged with the console, with no I/O and no platform dependencies:
//!
//! - [`frame`]: 4-byte frame header, command set, frame types
//! - [`reports`]: bit-exact controller, drum, guitar and HID guitar layouts
//! - [`packet`]: [`WirePacket`], a 64-byte buffer tagged with its layout
//! - [`builder`]: packet builders and [`init_packet`]
//! - [`sequence`]: the shared 8-bit sequence counter
//!
//! # Example
//!
//! ```rust
//! use embassy_time::Instant;
//! use wla_proto::{build_guitar_input, HidGuitarReport, Dpad};
//!
//! // green held, strum up
//! let report = HidGuitarReport::decode(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]).unwrap();
//! let pkt = build_guitar_input(&report, 0, Instant::from_ticks(0)).unwrap();
//! assert_eq!(pkt.len(), 20);
//! assert_eq!(pkt.guitar_input().unwrap().dpad, Dpad::UP);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod builder;
pub mod error;
pub mod frame;
pub mod packet;
pub mod reports;
pub mod sequence;

pub use builder::{
    build_drum_input, build_guitar_input, drum_packet, init_packet, power_on_request,
    template_packet, CONTROLLER_INIT_REPORT,
};
pub use error::PacketError;
pub use frame::{
    command_name, Command, Frame, FrameType, LedMode, PowerMode, FRAME_SIZE, MAX_PACKET_SIZE,
};
pub use packet::{PacketKind, WirePacket};
pub use reports::{
    ColoredButtons, ControllerInput, Dpad, DrumInput, DrumPads, GuitarInput, HidGuitarReport,
    LegacyHeader, Strum, LEGACY_HEADER_MARKER,
};
pub use sequence::{next_sequence, SequenceCounter};
