//! Packet builders.
//!
//! Every packet that goes into the outbound queue is finished by
//! [`init_packet`], which takes a fresh sequence number. Builders start from
//! a zeroed buffer so no bytes of a previous packet leak into reserved
//! fields.

use embassy_time::Instant;

use crate::error::PacketError;
use crate::frame::{Command, Frame, FrameType, PowerMode};
use crate::packet::{PacketKind, WirePacket};
use crate::reports::{DrumInput, GuitarInput, HidGuitarReport, LegacyHeader};
use crate::sequence::next_sequence;

/// Extra init report needed by some controller models after power-on.
pub const CONTROLLER_INIT_REPORT: [u8; 5] = [0x05, 0x20, 0x00, 0x0f, 0x06];

/// Finish a packet for the wire.
///
/// Stamps the next sequence number into the frame header, records the
/// creation time and sets the number of valid bytes to `length`. The length
/// is checked before the sequence is consumed.
pub fn init_packet(
    pkt: &mut WirePacket,
    timestamp: Instant,
    length: usize,
) -> Result<(), PacketError> {
    pkt.set_len(length)?;
    pkt.set_sequence(next_sequence());
    pkt.set_created_at(timestamp);
    Ok(())
}

/// Raw packet copied from a byte template and stamped with a new sequence.
pub fn template_packet(template: &[u8], timestamp: Instant) -> Result<WirePacket, PacketError> {
    let mut pkt = WirePacket::from_bytes(template)?;
    init_packet(&mut pkt, timestamp, template.len())?;
    Ok(pkt)
}

/// Encode a drum report into a fresh packet.
pub fn drum_packet(drums: &DrumInput, timestamp: Instant) -> Result<WirePacket, PacketError> {
    let mut pkt = WirePacket::new();
    drums.encode(pkt.buffer_mut());
    pkt.set_kind(PacketKind::DrumInput);
    init_packet(&mut pkt, timestamp, DrumInput::SIZE)?;
    Ok(pkt)
}

/// Input frame header used by drum and guitar reports.
const fn legacy_input_frame(device_id: u8, length: u8) -> Frame {
    Frame {
        command: Command::Input,
        device_id: device_id & 0x0f,
        frame_type: FrameType::Command,
        sequence: 0,
        length,
    }
}

/// Translate a controller input packet into a drum input packet.
///
/// D-pad, colored buttons, select and start are copied into both the legacy
/// header and the drum section; pads stay released. The packet is timestamped
/// at zero so the sender never holds it back.
pub fn build_drum_input(controller: &WirePacket, player_id: u8) -> Result<WirePacket, PacketError> {
    let frame = controller.frame()?;
    let input = controller.controller_input()?;

    let mut header = LegacyHeader::new(
        legacy_input_frame(frame.device_id, DrumInput::PAYLOAD_LENGTH),
        player_id,
    );
    header.start = input.start;
    header.select = input.select;
    header.colored = input.colored;
    header.dpad = input.dpad;

    let mut drums = DrumInput::new(header);
    drums.start = input.start;
    drums.select = input.select;
    drums.colored = input.colored;
    drums.dpad = input.dpad;

    drum_packet(&drums, Instant::from_ticks(0))
}

/// Translate a HID guitar report into a guitar input packet.
pub fn build_guitar_input(
    report: &HidGuitarReport,
    player_id: u8,
    timestamp: Instant,
) -> Result<WirePacket, PacketError> {
    let colored = report.colored();
    let dpad = report.strum().to_dpad();

    let frame = legacy_input_frame(0, GuitarInput::PAYLOAD_LENGTH);
    let mut header = LegacyHeader::new(frame, player_id);
    header.colored = colored;
    header.dpad = dpad;

    let guitar = GuitarInput {
        header,
        start: report.start,
        select: report.select_or_tilt(),
        colored,
        dpad,
        orange: report.orange,
        whammy: report.whammy,
    };

    let mut pkt = WirePacket::new();
    guitar.encode(pkt.buffer_mut());
    pkt.set_kind(PacketKind::GuitarInput);
    init_packet(&mut pkt, timestamp, GuitarInput::SIZE)?;
    Ok(pkt)
}

/// Power-on request sent to a freshly mounted controller.
#[must_use]
pub const fn power_on_request() -> [u8; 5] {
    let frame = Frame::new(Command::PowerMode, FrameType::Request, 1).encode();
    [frame[0], frame[1], frame[2], frame[3], PowerMode::On as u8]
}
