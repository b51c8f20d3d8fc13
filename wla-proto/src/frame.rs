//! Frame header shared by every wire packet.
//!
//! ```text
//! byte 0   command
//! byte 1   bits 0..3 device id, bits 4..7 frame type
//! byte 2   sequence
//! byte 3   payload length
//! ```

use crate::error::PacketError;

/// Size of the frame header in bytes.
pub const FRAME_SIZE: usize = 4;

/// Maximum size of any wire packet (USB full-speed interrupt endpoint).
pub const MAX_PACKET_SIZE: usize = 64;

/// Frame command byte.
///
/// Unrecognized values are preserved in [`Command::Other`] so that decoding
/// a header never fails on the command alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Acknowledge,
    Announce,
    Status,
    Identify,
    PowerMode,
    Authenticate,
    GuideButton,
    AudioConfig,
    Rumble,
    LedMode,
    SerialNumber,
    Input,
    ListInstrument,
    AddPlayer,
    DropPlayer,
    ListConnectedInstruments,
    AudioSamples,
    Other(u8),
}

impl Command {
    /// Raw command byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Command::Acknowledge => 0x01,
            Command::Announce => 0x02,
            Command::Status => 0x03,
            Command::Identify => 0x04,
            Command::PowerMode => 0x05,
            Command::Authenticate => 0x06,
            Command::GuideButton => 0x07,
            Command::AudioConfig => 0x08,
            Command::Rumble => 0x09,
            Command::LedMode => 0x0a,
            Command::SerialNumber => 0x1e,
            Command::Input => 0x20,
            Command::ListInstrument => 0x21,
            Command::AddPlayer => 0x22,
            Command::DropPlayer => 0x23,
            Command::ListConnectedInstruments => 0x24,
            Command::AudioSamples => 0x60,
            Command::Other(raw) => raw,
        }
    }

    /// Decode a raw command byte.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            0x01 => Command::Acknowledge,
            0x02 => Command::Announce,
            0x03 => Command::Status,
            0x04 => Command::Identify,
            0x05 => Command::PowerMode,
            0x06 => Command::Authenticate,
            0x07 => Command::GuideButton,
            0x08 => Command::AudioConfig,
            0x09 => Command::Rumble,
            0x0a => Command::LedMode,
            0x1e => Command::SerialNumber,
            0x20 => Command::Input,
            0x21 => Command::ListInstrument,
            0x22 => Command::AddPlayer,
            0x23 => Command::DropPlayer,
            0x24 => Command::ListConnectedInstruments,
            0x60 => Command::AudioSamples,
            other => Command::Other(other),
        }
    }

    /// Human-readable name, for diagnostics only.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Command::Acknowledge => "CMD_ACK",
            Command::Announce => "CMD_ANNOUNCE",
            Command::Status => "CMD_STATUS",
            Command::Identify => "CMD_IDENTIFY",
            Command::PowerMode => "CMD_POWER_MODE",
            Command::Authenticate => "CMD_AUTHENTICATE",
            Command::GuideButton => "CMD_GUIDE_BTN",
            Command::AudioConfig => "CMD_AUDIO_CONFIG",
            Command::Rumble => "CMD_RUMBLE",
            Command::LedMode => "CMD_LED_MODE",
            Command::SerialNumber => "CMD_SERIAL_NUM",
            Command::Input => "CMD_INPUT",
            Command::ListInstrument => "CMD_LIST_INSTRUMENT",
            Command::AddPlayer => "CMD_ADD_PLAYER",
            Command::DropPlayer => "CMD_DROP_PLAYER",
            Command::ListConnectedInstruments => "CMD_LIST_CONNECTED_INSTRUMENTS",
            Command::AudioSamples => "CMD_AUDIO_SAMPLES",
            Command::Other(_) => "Unknown CMD",
        }
    }
}

impl From<u8> for Command {
    fn from(raw: u8) -> Self {
        Command::from_u8(raw)
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> Self {
        cmd.to_u8()
    }
}

/// Diagnostic name for a raw command byte.
#[inline]
#[must_use]
pub const fn command_name(cmd: u8) -> &'static str {
    Command::from_u8(cmd).name()
}

/// Frame type nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameType {
    Command,
    Ack,
    Request,
    /// Any other 4-bit value.
    Other(u8),
}

impl FrameType {
    #[must_use]
    pub const fn to_nibble(self) -> u8 {
        match self {
            FrameType::Command => 0x00,
            FrameType::Ack => 0x01,
            FrameType::Request => 0x02,
            FrameType::Other(raw) => raw & 0x0f,
        }
    }

    #[must_use]
    pub const fn from_nibble(raw: u8) -> Self {
        match raw & 0x0f {
            0x00 => FrameType::Command,
            0x01 => FrameType::Ack,
            0x02 => FrameType::Request,
            other => FrameType::Other(other),
        }
    }
}

/// Power mode payload of a `POWER_MODE` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PowerMode {
    On = 0x00,
    Sleep = 0x01,
    Off = 0x04,
}

/// LED mode payload of an `LED_MODE` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LedMode {
    Off = 0x00,
    On = 0x01,
    BlinkFast = 0x02,
    BlinkMedium = 0x03,
    BlinkSlow = 0x04,
    FadeSlow = 0x08,
    FadeFast = 0x09,
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    pub command: Command,
    /// Only the low 4 bits are encoded.
    pub device_id: u8,
    pub frame_type: FrameType,
    pub sequence: u8,
    /// Number of payload bytes following the header.
    pub length: u8,
}

impl Frame {
    /// Create a header with sequence 0; the sequence is stamped later by
    /// [`init_packet`](crate::init_packet).
    #[must_use]
    pub const fn new(command: Command, frame_type: FrameType, length: u8) -> Self {
        Self {
            command,
            device_id: 0,
            frame_type,
            sequence: 0,
            length,
        }
    }

    /// Encode the header into its 4 wire bytes.
    #[must_use]
    pub const fn encode(&self) -> [u8; FRAME_SIZE] {
        [
            self.command.to_u8(),
            (self.device_id & 0x0f) | (self.frame_type.to_nibble() << 4),
            self.sequence,
            self.length,
        ]
    }

    /// Write the header into the first 4 bytes of `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `buf.len() < FRAME_SIZE`.
    #[inline]
    pub fn write_to(&self, buf: &mut [u8]) {
        buf[..FRAME_SIZE].copy_from_slice(&self.encode());
    }

    /// Decode a header from the start of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.len() < FRAME_SIZE {
            return Err(PacketError::TooShort {
                needed: FRAME_SIZE,
                actual: buf.len(),
            });
        }

        Ok(Self {
            command: Command::from_u8(buf[0]),
            device_id: buf[1] & 0x0f,
            frame_type: FrameType::from_nibble(buf[1] >> 4),
            sequence: buf[2],
            length: buf[3],
        })
    }
}
