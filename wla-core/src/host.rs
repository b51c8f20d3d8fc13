//! Messages exchanged with the USB host-role context.
//!
//! The host role enumerates peripherals and completes transfers in its own
//! execution context. It never touches adapter state directly: every mount,
//! unmount and data event becomes a [`HostEvent`] on a bounded channel that
//! the device-role loop drains. Bytes for the genuine controller travel the
//! other way as [`RelayPacket`]s.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::channel::{Channel, Sender};
use heapless::Vec;
use wla_proto::{PacketError, MAX_PACKET_SIZE};

use crate::session::RelayError;

/// Payload of a host-role transfer.
pub type HostData = Vec<u8, MAX_PACKET_SIZE>;

/// Copy a transfer into a [`HostData`]. Anything above 64 bytes is rejected.
pub fn host_data(bytes: &[u8]) -> Result<HostData, PacketError> {
    Vec::from_slice(bytes).map_err(|_| PacketError::TooLarge { size: bytes.len() })
}

/// Event raised by the host-role context.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostEvent {
    ControllerMounted {
        address: u8,
        instance: u8,
        vid: u16,
        pid: u16,
    },
    ControllerUnmounted {
        address: u8,
        instance: u8,
    },
    /// Packet received from a genuine controller.
    ControllerData {
        address: u8,
        instance: u8,
        data: HostData,
    },
    MidiMounted {
        address: u8,
    },
    MidiUnmounted {
        address: u8,
    },
    /// USB-MIDI event packets, 4 bytes each.
    MidiData {
        address: u8,
        data: HostData,
    },
    HidMounted {
        address: u8,
        instance: u8,
        vid: u16,
        pid: u16,
    },
    HidUnmounted {
        address: u8,
        instance: u8,
    },
    HidReport {
        address: u8,
        instance: u8,
        data: HostData,
    },
}

/// Depth of the host event channel.
pub const HOST_EVENT_DEPTH: usize = 8;

/// Host role → device role.
pub type HostEventChannel<M = CriticalSectionRawMutex> = Channel<M, HostEvent, HOST_EVENT_DEPTH>;

/// Bytes to write to the genuine controller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RelayPacket {
    pub address: u8,
    pub instance: u8,
    pub data: HostData,
}

/// Depth of the controller relay channel.
pub const RELAY_DEPTH: usize = 4;

/// Device role → host role.
pub type RelayChannel<M = CriticalSectionRawMutex> = Channel<M, RelayPacket, RELAY_DEPTH>;

/// Write path to a controller on the host bus.
pub trait ControllerWriter {
    fn write(&mut self, address: u8, instance: u8, bytes: &[u8]) -> Result<(), RelayError>;
}

impl<M: RawMutex, const N: usize> ControllerWriter for Sender<'_, M, RelayPacket, N> {
    fn write(&mut self, address: u8, instance: u8, bytes: &[u8]) -> Result<(), RelayError> {
        let data = host_data(bytes).map_err(|_| RelayError::Busy)?;
        self.try_send(RelayPacket {
            address,
            instance,
            data,
        })
        .map_err(|_| RelayError::Busy)
    }
}

/// Why a peripheral was not taken into service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MountError {
    /// VID/PID not on the supported list.
    Unsupported,
    /// Every slot of this kind is taken.
    NoFreeSlot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn test_host_data_limit() {
        assert_eq!(host_data(&[1, 2, 3]).unwrap().as_slice(), &[1, 2, 3]);
        assert!(host_data(&[0u8; 64]).is_ok());
        assert_eq!(host_data(&[0u8; 65]), Err(PacketError::TooLarge { size: 65 }));
    }

    #[test]
    fn test_relay_sender_reports_full_channel() {
        let channel: Channel<NoopRawMutex, RelayPacket, 1> = Channel::new();
        let mut sender = channel.sender();

        assert_eq!(sender.write(3, 0, &[0x05, 0x20, 0x00, 0x01, 0x00]), Ok(()));
        assert_eq!(sender.write(3, 0, &[0x05]), Err(RelayError::Busy));

        let pkt = channel.try_receive().unwrap();
        assert_eq!(pkt.address, 3);
        assert_eq!(pkt.data.len(), 5);
    }

    #[test]
    fn test_event_channel_is_bounded() {
        let channel: HostEventChannel<NoopRawMutex> = Channel::new();
        for address in 0..HOST_EVENT_DEPTH as u8 {
            channel.try_send(HostEvent::MidiMounted { address }).unwrap();
        }
        assert!(channel.try_send(HostEvent::MidiUnmounted { address: 0 }).is_err());
        assert_eq!(channel.try_receive(), Ok(HostEvent::MidiMounted { address: 0 }));
    }
}
