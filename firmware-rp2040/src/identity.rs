//! Identity of the impersonated wireless legacy adapter.
//!
//! The engine treats these packets as opaque and replays them byte for byte
//! (with a fresh sequence number). They are the adapter's announce packet
//! and its descriptor, split the way the console requests it.

use wla_core::IdentityTable;

/// ANNOUNCE: MAC address, VID 0x0738, PID 0x4164, firmware and hardware
/// versions.
static ANNOUNCE: [u8; 32] = [
    0x02, 0x20, 0x00, 0x1c, 0x7e, 0xed, 0x8b, 0x11, 0x2d, 0x36, 0x00, 0x00, 0x38, 0x07, 0x64, 0x41,
    0x01, 0x00, 0x00, 0x00, 0x1b, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
];

/// Descriptor, first chunk: header and supported command lists.
static DESCRIPTOR_0: [u8; 36] = [
    0x04, 0xf0, 0x00, 0x3a, 0x00, 0x10, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00,
];

/// Descriptor, second chunk: interface GUIDs.
static DESCRIPTOR_1: [u8; 36] = [
    0x04, 0xa0, 0x00, 0xba, 0x00, 0x3a, 0x1b, 0xad, 0x00, 0x01, 0x01, 0x23, 0x24, 0x21, 0x22, 0x06,
    0x20, 0x07, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x1e, 0x02, 0x20, 0x21, 0x01, 0x01, 0x03, 0x01, 0x17,
    0x00, 0x00, 0x00, 0x00,
];

/// Descriptor, terminating chunk.
static DESCRIPTOR_END: [u8; 6] = [0x04, 0xa0, 0x00, 0x02, 0x00, 0xba];

static SEQUENCE: [&[u8]; 3] = [&DESCRIPTOR_0, &DESCRIPTOR_1, &DESCRIPTOR_END];

pub static IDENTITY: IdentityTable = IdentityTable {
    announce: &ANNOUNCE,
    sequence: &SEQUENCE,
};
