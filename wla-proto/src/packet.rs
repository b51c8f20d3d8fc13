//! Fixed-capacity wire packet.
//!
//! A [`WirePacket`] owns a 64-byte buffer, the number of valid bytes in it,
//! and a tag telling which layout the bytes follow. Typed views are decoded
//! on demand from the buffer, so the bytes stay the single source of truth.

use embassy_time::Instant;

use crate::error::PacketError;
use crate::frame::{Frame, FRAME_SIZE, MAX_PACKET_SIZE};
use crate::reports::{ControllerInput, DrumInput, GuitarInput, LegacyHeader};

/// Layout of the bytes held by a [`WirePacket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketKind {
    /// Frame header followed by opaque data.
    Raw,
    LegacyHeader,
    ControllerInput,
    DrumInput,
    GuitarInput,
}

/// One wire packet plus the metadata that never goes on the wire.
#[derive(Clone, Copy)]
pub struct WirePacket {
    buffer: [u8; MAX_PACKET_SIZE],
    length: u8,
    kind: PacketKind,
    created_at: Instant,
}

impl WirePacket {
    /// Empty raw packet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0; MAX_PACKET_SIZE],
            length: 0,
            kind: PacketKind::Raw,
            created_at: Instant::from_ticks(0),
        }
    }

    /// Copy received bytes into a raw packet.
    ///
    /// Fails if the bytes cannot hold a frame header or do not fit the
    /// endpoint size.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() > MAX_PACKET_SIZE {
            return Err(PacketError::TooLarge { size: bytes.len() });
        }
        if bytes.len() < FRAME_SIZE {
            return Err(PacketError::TooShort {
                needed: FRAME_SIZE,
                actual: bytes.len(),
            });
        }

        let mut pkt = Self::new();
        pkt.buffer[..bytes.len()].copy_from_slice(bytes);
        pkt.length = bytes.len() as u8;
        Ok(pkt)
    }

    /// Valid bytes, as they go on the wire.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.length as usize]
    }

    /// Whole backing buffer, for builders.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut [u8; MAX_PACKET_SIZE] {
        &mut self.buffer
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.length as usize
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Set the number of valid bytes.
    pub fn set_len(&mut self, length: usize) -> Result<(), PacketError> {
        if length > MAX_PACKET_SIZE {
            return Err(PacketError::TooLarge { size: length });
        }
        self.length = length as u8;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    #[inline]
    pub fn set_kind(&mut self, kind: PacketKind) {
        self.kind = kind;
    }

    #[inline]
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    #[inline]
    pub fn set_created_at(&mut self, at: Instant) {
        self.created_at = at;
    }

    /// Frame header of the packet.
    pub fn frame(&self) -> Result<Frame, PacketError> {
        Frame::decode(self.as_bytes())
    }

    /// Stamp a new sequence number into the header byte.
    #[inline]
    pub fn set_sequence(&mut self, sequence: u8) {
        self.buffer[2] = sequence;
    }

    pub fn legacy_header(&self) -> Result<LegacyHeader, PacketError> {
        LegacyHeader::decode(self.as_bytes())
    }

    pub fn controller_input(&self) -> Result<ControllerInput, PacketError> {
        ControllerInput::decode(self.as_bytes())
    }

    pub fn drum_input(&self) -> Result<DrumInput, PacketError> {
        DrumInput::decode(self.as_bytes())
    }

    pub fn guitar_input(&self) -> Result<GuitarInput, PacketError> {
        GuitarInput::decode(self.as_bytes())
    }
}

impl Default for WirePacket {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for WirePacket {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WirePacket")
            .field("kind", &self.kind)
            .field("bytes", &self.as_bytes())
            .field("created_at", &self.created_at.as_millis())
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for WirePacket {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "WirePacket {{ kind: {}, bytes: {=[u8]:x} }}",
            self.kind,
            self.as_bytes()
        );
    }
}
