//! Codec error type.

/// Error returned when bytes cannot be interpreted as a wire packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Fewer bytes than the layout requires.
    TooShort { needed: usize, actual: usize },
    /// More bytes than fit in one endpoint transfer.
    TooLarge { size: usize },
}

impl core::fmt::Display for PacketError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PacketError::TooShort { needed, actual } => {
                write!(f, "packet too short: needed {needed} bytes, got {actual}")
            }
            PacketError::TooLarge { size } => {
                write!(f, "packet too large: {size} bytes (max {})", crate::MAX_PACKET_SIZE)
            }
        }
    }
}
