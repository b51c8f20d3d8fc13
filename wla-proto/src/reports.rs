//! Typed views of the packed report layouts.
//!
//! Each report decodes from and encodes to the exact wire bytes, bit by bit.
//! Bit numbers below count from the least significant bit of each byte.
//!
//! ```text
//! Controller input (18 bytes)
//!   0..4   frame
//!   4      2 start, 3 select, 4..7 colored (A/green, B/red, X/blue, Y/yellow)
//!   5      0..3 d-pad, 4 left bumper, 5 right bumper, 6 left stick, 7 right stick
//!   6..10  left trigger, right trigger (u16 LE)
//!   10..18 left X, left Y, right X, right Y (i16 LE)
//!
//! Legacy header (8 bytes)
//!   0..4   frame
//!   4      2 start, 3 select, 4..7 colored
//!   5      0..3 d-pad, 4 left bumper, 5 right bumper
//!   6      player id
//!   7      marker
//!
//! Drum input (20 bytes) = legacy header +
//!   8      2 start, 3 select, 4..7 colored
//!   9      0..3 d-pad, 4 kick, 5 double kick
//!   10     3 yellow pad, 7 red pad
//!   11     3 green pad, 7 blue pad
//!   12     3 blue cymbal, 7 yellow cymbal
//!   13     7 green cymbal
//!   14..20 zero
//!
//! Guitar input (20 bytes) = legacy header +
//!   8      2 start, 3 select, 4..7 colored
//!   9      0..3 d-pad (strum), 4 orange
//!   10     whammy
//!   11..20 zero
//! ```

use core::ops::{BitAnd, BitOr, BitOrAssign};

use crate::error::PacketError;
use crate::frame::{Frame, FRAME_SIZE};

/// Marker byte carried in the last byte of every emitted legacy header.
pub const LEGACY_HEADER_MARKER: u8 = 0x01;

macro_rules! flag_set {
    ($(#[$meta:meta])* $name:ident($repr:ty) { $($(#[$cmeta:meta])* $flag:ident = $bit:expr;)* }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub struct $name(pub $repr);

        impl $name {
            $($(#[$cmeta])* pub const $flag: Self = Self(1 << $bit);)*

            /// Nothing set.
            pub const NONE: Self = Self(0);

            /// Check if all of `other` is set.
            #[inline]
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            /// Set or clear `other`.
            #[inline]
            pub fn set(&mut self, other: Self, on: bool) {
                if on {
                    self.0 |= other.0;
                } else {
                    self.0 &= !other.0;
                }
            }

            #[inline]
            #[must_use]
            pub const fn raw(self) -> $repr {
                self.0
            }

            #[inline]
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl BitOr for $name {
            type Output = Self;

            #[inline]
            fn bitor(self, rhs: Self) -> Self::Output {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            #[inline]
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;

            #[inline]
            fn bitand(self, rhs: Self) -> Self::Output {
                Self(self.0 & rhs.0)
            }
        }
    };
}

flag_set! {
    /// The four colored face buttons, as a 4-bit nibble.
    ColoredButtons(u8) {
        /// A on a controller.
        GREEN = 0;
        /// B on a controller.
        RED = 1;
        /// X on a controller.
        BLUE = 2;
        /// Y on a controller.
        YELLOW = 3;
    }
}

flag_set! {
    /// D-pad directions, as a 4-bit nibble.
    Dpad(u8) {
        UP = 0;
        DOWN = 1;
        LEFT = 2;
        RIGHT = 3;
    }
}

flag_set! {
    /// Drum kit outputs carried by a drum input report.
    DrumPads(u16) {
        KICK = 0;
        DOUBLE_KICK = 1;
        PAD_RED = 2;
        PAD_YELLOW = 3;
        PAD_BLUE = 4;
        PAD_GREEN = 5;
        CYMBAL_YELLOW = 6;
        CYMBAL_BLUE = 7;
        CYMBAL_GREEN = 8;
    }
}

#[inline]
const fn bit(byte: u8, n: u8) -> bool {
    byte & (1 << n) != 0
}

#[inline]
const fn flag(on: bool, n: u8) -> u8 {
    (on as u8) << n
}

/// Start/select/colored byte used by every layout.
#[inline]
const fn pack_face(start: bool, select: bool, colored: ColoredButtons) -> u8 {
    flag(start, 2) | flag(select, 3) | ((colored.0 & 0x0f) << 4)
}

#[inline]
const fn unpack_face(byte: u8) -> (bool, bool, ColoredButtons) {
    (bit(byte, 2), bit(byte, 3), ColoredButtons(byte >> 4))
}

fn require(buf: &[u8], needed: usize) -> Result<(), PacketError> {
    if buf.len() < needed {
        return Err(PacketError::TooShort {
            needed,
            actual: buf.len(),
        });
    }
    Ok(())
}

/// Input report of a genuine console controller (`INPUT` command).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerInput {
    pub start: bool,
    pub select: bool,
    pub colored: ColoredButtons,
    pub dpad: Dpad,
    pub bumper_left: bool,
    pub bumper_right: bool,
    pub stick_left_press: bool,
    pub stick_right_press: bool,
    pub trigger_left: u16,
    pub trigger_right: u16,
    pub stick_left_x: i16,
    pub stick_left_y: i16,
    pub stick_right_x: i16,
    pub stick_right_y: i16,
}

impl ControllerInput {
    /// Encoded size including the frame header.
    pub const SIZE: usize = 18;

    /// Decode the report body; the frame header in `buf[..4]` is skipped.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        require(buf, Self::SIZE)?;

        let (start, select, colored) = unpack_face(buf[4]);
        let b5 = buf[5];
        let u16_at = |i: usize| u16::from_le_bytes([buf[i], buf[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([buf[i], buf[i + 1]]);

        Ok(Self {
            start,
            select,
            colored,
            dpad: Dpad(b5 & 0x0f),
            bumper_left: bit(b5, 4),
            bumper_right: bit(b5, 5),
            stick_left_press: bit(b5, 6),
            stick_right_press: bit(b5, 7),
            trigger_left: u16_at(6),
            trigger_right: u16_at(8),
            stick_left_x: i16_at(10),
            stick_left_y: i16_at(12),
            stick_right_x: i16_at(14),
            stick_right_y: i16_at(16),
        })
    }

    /// Encode the report body into `buf[4..18]`, leaving the frame untouched.
    ///
    /// # Panics
    ///
    /// Panics if `buf.len() < Self::SIZE`.
    pub fn encode_body(&self, buf: &mut [u8]) {
        buf[4] = pack_face(self.start, self.select, self.colored);
        buf[5] = (self.dpad.0 & 0x0f)
            | flag(self.bumper_left, 4)
            | flag(self.bumper_right, 5)
            | flag(self.stick_left_press, 6)
            | flag(self.stick_right_press, 7);
        buf[6..8].copy_from_slice(&self.trigger_left.to_le_bytes());
        buf[8..10].copy_from_slice(&self.trigger_right.to_le_bytes());
        buf[10..12].copy_from_slice(&self.stick_left_x.to_le_bytes());
        buf[12..14].copy_from_slice(&self.stick_left_y.to_le_bytes());
        buf[14..16].copy_from_slice(&self.stick_right_x.to_le_bytes());
        buf[16..18].copy_from_slice(&self.stick_right_y.to_le_bytes());
    }
}

/// Extended header shared by the drum and guitar layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LegacyHeader {
    pub frame: Frame,
    pub start: bool,
    pub select: bool,
    pub colored: ColoredButtons,
    pub dpad: Dpad,
    pub bumper_left: bool,
    pub bumper_right: bool,
    pub player_id: u8,
    pub marker: u8,
}

impl LegacyHeader {
    /// Encoded size including the frame header.
    pub const SIZE: usize = 8;

    /// Header with no buttons pressed.
    #[must_use]
    pub const fn new(frame: Frame, player_id: u8) -> Self {
        Self {
            frame,
            start: false,
            select: false,
            colored: ColoredButtons::NONE,
            dpad: Dpad::NONE,
            bumper_left: false,
            bumper_right: false,
            player_id,
            marker: LEGACY_HEADER_MARKER,
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        require(buf, Self::SIZE)?;

        let (start, select, colored) = unpack_face(buf[4]);
        Ok(Self {
            frame: Frame::decode(buf)?,
            start,
            select,
            colored,
            dpad: Dpad(buf[5] & 0x0f),
            bumper_left: bit(buf[5], 4),
            bumper_right: bit(buf[5], 5),
            player_id: buf[6],
            marker: buf[7],
        })
    }

    /// # Panics
    ///
    /// Panics if `buf.len() < Self::SIZE`.
    pub fn encode(&self, buf: &mut [u8]) {
        self.frame.write_to(buf);
        buf[4] = pack_face(self.start, self.select, self.colored);
        buf[5] = (self.dpad.0 & 0x0f) | flag(self.bumper_left, 4) | flag(self.bumper_right, 5);
        buf[6] = self.player_id;
        buf[7] = self.marker;
    }
}

/// Drum kit input, as the console expects it from a legacy adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DrumInput {
    pub header: LegacyHeader,
    pub start: bool,
    pub select: bool,
    pub colored: ColoredButtons,
    pub dpad: Dpad,
    pub pads: DrumPads,
}

impl DrumInput {
    /// Encoded size including the legacy header.
    pub const SIZE: usize = 20;

    /// Frame payload length of a drum report.
    pub const PAYLOAD_LENGTH: u8 = (Self::SIZE - FRAME_SIZE) as u8;

    #[must_use]
    pub const fn new(header: LegacyHeader) -> Self {
        Self {
            header,
            start: false,
            select: false,
            colored: ColoredButtons::NONE,
            dpad: Dpad::NONE,
            pads: DrumPads::NONE,
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        require(buf, Self::SIZE)?;

        let (start, select, colored) = unpack_face(buf[8]);
        let mut pads = DrumPads::NONE;
        pads.set(DrumPads::KICK, bit(buf[9], 4));
        pads.set(DrumPads::DOUBLE_KICK, bit(buf[9], 5));
        pads.set(DrumPads::PAD_YELLOW, bit(buf[10], 3));
        pads.set(DrumPads::PAD_RED, bit(buf[10], 7));
        pads.set(DrumPads::PAD_GREEN, bit(buf[11], 3));
        pads.set(DrumPads::PAD_BLUE, bit(buf[11], 7));
        pads.set(DrumPads::CYMBAL_BLUE, bit(buf[12], 3));
        pads.set(DrumPads::CYMBAL_YELLOW, bit(buf[12], 7));
        pads.set(DrumPads::CYMBAL_GREEN, bit(buf[13], 7));

        Ok(Self {
            header: LegacyHeader::decode(buf)?,
            start,
            select,
            colored,
            dpad: Dpad(buf[9] & 0x0f),
            pads,
        })
    }

    /// Encode the full 20-byte report, zeroing the reserved tail.
    ///
    /// # Panics
    ///
    /// Panics if `buf.len() < Self::SIZE`.
    pub fn encode(&self, buf: &mut [u8]) {
        let p = self.pads;
        self.header.encode(buf);
        buf[8] = pack_face(self.start, self.select, self.colored);
        buf[9] = (self.dpad.0 & 0x0f)
            | flag(p.contains(DrumPads::KICK), 4)
            | flag(p.contains(DrumPads::DOUBLE_KICK), 5);
        buf[10] =
            flag(p.contains(DrumPads::PAD_YELLOW), 3) | flag(p.contains(DrumPads::PAD_RED), 7);
        buf[11] =
            flag(p.contains(DrumPads::PAD_GREEN), 3) | flag(p.contains(DrumPads::PAD_BLUE), 7);
        buf[12] = flag(p.contains(DrumPads::CYMBAL_BLUE), 3)
            | flag(p.contains(DrumPads::CYMBAL_YELLOW), 7);
        buf[13] = flag(p.contains(DrumPads::CYMBAL_GREEN), 7);
        buf[14..Self::SIZE].fill(0);
    }
}

/// Guitar input, as the console expects it from a legacy adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GuitarInput {
    pub header: LegacyHeader,
    pub start: bool,
    pub select: bool,
    pub colored: ColoredButtons,
    pub dpad: Dpad,
    pub orange: bool,
    pub whammy: u8,
}

impl GuitarInput {
    /// Encoded size including the legacy header.
    pub const SIZE: usize = 20;

    /// Frame payload length of a guitar report.
    pub const PAYLOAD_LENGTH: u8 = (Self::SIZE - FRAME_SIZE) as u8;

    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        require(buf, Self::SIZE)?;

        let (start, select, colored) = unpack_face(buf[8]);
        Ok(Self {
            header: LegacyHeader::decode(buf)?,
            start,
            select,
            colored,
            dpad: Dpad(buf[9] & 0x0f),
            orange: bit(buf[9], 4),
            whammy: buf[10],
        })
    }

    /// Encode the full 20-byte report, zeroing the reserved tail.
    ///
    /// # Panics
    ///
    /// Panics if `buf.len() < Self::SIZE`.
    pub fn encode(&self, buf: &mut [u8]) {
        self.header.encode(buf);
        buf[8] = pack_face(self.start, self.select, self.colored);
        buf[9] = (self.dpad.0 & 0x0f) | flag(self.orange, 4);
        buf[10] = self.whammy;
        buf[11..Self::SIZE].fill(0);
    }
}

/// Strum bar position reported by a HID guitar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Strum {
    Up,
    Down,
    Center,
}

impl Strum {
    /// Raw value the guitar reports while the bar is at rest.
    pub const CENTER_RAW: u8 = 0x08;

    /// Classify the raw strum byte. Exact matches only; the axis is not
    /// proportional.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        if raw == Self::CENTER_RAW {
            Strum::Center
        } else if raw == 0x00 {
            Strum::Up
        } else if raw & 0x04 != 0 {
            Strum::Down
        } else {
            Strum::Center
        }
    }

    /// D-pad nibble the console reads strumming from.
    #[must_use]
    pub const fn to_dpad(self) -> Dpad {
        match self {
            Strum::Up => Dpad::UP,
            Strum::Down => Dpad::DOWN,
            Strum::Center => Dpad::NONE,
        }
    }
}

/// Report of a supported USB HID guitar.
///
/// ```text
/// 0  report id
/// 1  0 green, 1 red, 2 yellow, 3 blue, 4 orange, 6 select, 7 start
/// 2  d-pad
/// 3  strum (0x00 up, 0x04 down, 0x08 center)
/// 4  whammy
/// 5  unused
/// 6  tilt
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidGuitarReport {
    pub green: bool,
    pub red: bool,
    pub yellow: bool,
    pub blue: bool,
    pub orange: bool,
    pub select: bool,
    pub start: bool,
    pub dpad: u8,
    pub strum: u8,
    pub whammy: u8,
    pub tilt: u8,
}

impl HidGuitarReport {
    /// Minimum report length.
    pub const SIZE: usize = 7;

    /// Tilt values above this count as the select (star power) button.
    pub const TILT_THRESHOLD: u8 = 128;

    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        require(buf, Self::SIZE)?;

        let b = buf[1];
        Ok(Self {
            green: bit(b, 0),
            red: bit(b, 1),
            yellow: bit(b, 2),
            blue: bit(b, 3),
            orange: bit(b, 4),
            select: bit(b, 6),
            start: bit(b, 7),
            dpad: buf[2],
            strum: buf[3],
            whammy: buf[4],
            tilt: buf[6],
        })
    }

    /// Colored buttons in console order.
    #[must_use]
    pub fn colored(&self) -> ColoredButtons {
        let mut colored = ColoredButtons::NONE;
        colored.set(ColoredButtons::GREEN, self.green);
        colored.set(ColoredButtons::RED, self.red);
        colored.set(ColoredButtons::BLUE, self.blue);
        colored.set(ColoredButtons::YELLOW, self.yellow);
        colored
    }

    #[inline]
    #[must_use]
    pub const fn strum(&self) -> Strum {
        Strum::from_raw(self.strum)
    }

    /// Select button, or the guitar tilted past the threshold.
    #[inline]
    #[must_use]
    pub const fn select_or_tilt(&self) -> bool {
        self.select || self.tilt > Self::TILT_THRESHOLD
    }
}
