//! MIDI input parsing.
//!
//! Two byte sources feed the drum mapper: a serial port (31250 baud, with
//! running status) and USB-MIDI event packets. Both end up as [`NoteOn`].

use embassy_time::{Duration, Instant};
use heapless::Vec;

/// Message type of a MIDI status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MidiType {
    /// Data byte or undefined status.
    Invalid,
    NoteOff,
    NoteOn,
    AfterTouchPoly,
    ControlChange,
    ProgramChange,
    AfterTouchChannel,
    PitchBend,
    SystemExclusive,
    TimeCodeQuarterFrame,
    SongPosition,
    SongSelect,
    TuneRequest,
    SystemExclusiveEnd,
    Clock,
    Tick,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    SystemReset,
}

impl MidiType {
    /// Classify a status byte. Channel messages ignore the channel nibble.
    #[must_use]
    pub const fn from_status(status: u8) -> Self {
        if status < 0xf0 {
            return match status & 0xf0 {
                0x80 => MidiType::NoteOff,
                0x90 => MidiType::NoteOn,
                0xa0 => MidiType::AfterTouchPoly,
                0xb0 => MidiType::ControlChange,
                0xc0 => MidiType::ProgramChange,
                0xd0 => MidiType::AfterTouchChannel,
                0xe0 => MidiType::PitchBend,
                _ => MidiType::Invalid,
            };
        }
        match status {
            0xf0 => MidiType::SystemExclusive,
            0xf1 => MidiType::TimeCodeQuarterFrame,
            0xf2 => MidiType::SongPosition,
            0xf3 => MidiType::SongSelect,
            0xf6 => MidiType::TuneRequest,
            0xf7 => MidiType::SystemExclusiveEnd,
            0xf8 => MidiType::Clock,
            0xf9 => MidiType::Tick,
            0xfa => MidiType::Start,
            0xfb => MidiType::Continue,
            0xfc => MidiType::Stop,
            0xfe => MidiType::ActiveSensing,
            0xff => MidiType::SystemReset,
            // 0xf4, 0xf5, 0xfd
            _ => MidiType::Invalid,
        }
    }
}

/// Real-time bytes may appear anywhere, even between the data bytes of
/// another message.
#[inline]
#[must_use]
pub const fn is_realtime(byte: u8) -> bool {
    byte >= 0xf8
}

/// A complete Note-On message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NoteOn {
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
}

/// Output of [`SerialMidiInput::feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialMidiEvent {
    /// A status byte arrived: the kit is alive.
    Activity,
    NoteOn(NoteOn),
}

/// Serial MIDI byte stream decoder.
///
/// Only Note-On messages are assembled; running status is honored so a
/// kit may send the status byte once and then data pairs. Every status byte
/// counts as link activity; once activity stops for longer than the
/// timeout the link is reported lost.
pub struct SerialMidiInput {
    /// Running Note-On status, if any.
    running: Option<u8>,
    data: Vec<u8, 2>,
    last_activity: Option<Instant>,
    active_sense: bool,
    active_sense_timeout: Duration,
    idle_timeout: Duration,
}

impl SerialMidiInput {
    #[must_use]
    pub const fn new(active_sense_timeout: Duration, idle_timeout: Duration) -> Self {
        Self {
            running: None,
            data: Vec::new(),
            last_activity: None,
            active_sense: false,
            active_sense_timeout,
            idle_timeout,
        }
    }

    /// Whether a status byte was seen and the link has not timed out since.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.last_activity.is_some()
    }

    /// Timeout currently in force.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        if self.active_sense {
            self.active_sense_timeout
        } else {
            self.idle_timeout
        }
    }

    /// Feed one received byte.
    pub fn feed(&mut self, byte: u8, now: Instant) -> Option<SerialMidiEvent> {
        if byte < 0x80 {
            return self.feed_data(byte);
        }

        self.last_activity = Some(now);
        match MidiType::from_status(byte) {
            MidiType::NoteOn => {
                self.running = Some(byte);
                self.data.clear();
            }
            MidiType::ActiveSensing => {
                if !self.active_sense {
                    debug!("serial kit sends active sensing");
                }
                self.active_sense = true;
            }
            _ if is_realtime(byte) => {}
            _ => {
                self.running = None;
                self.data.clear();
            }
        }
        Some(SerialMidiEvent::Activity)
    }

    fn feed_data(&mut self, byte: u8) -> Option<SerialMidiEvent> {
        let status = self.running?;
        // Capacity is 2 and the buffer is drained on the second byte.
        let _ = self.data.push(byte);
        if !self.data.is_full() {
            return None;
        }

        let note_on = NoteOn {
            channel: status & 0x0f,
            note: self.data[0],
            velocity: self.data[1],
        };
        self.data.clear();
        Some(SerialMidiEvent::NoteOn(note_on))
    }

    /// Check the link timeout. Returns `true` once when the link is lost.
    pub fn poll_timeout(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_activity else {
            return false;
        };
        if now.saturating_duration_since(last) <= self.timeout() {
            return false;
        }

        info!("serial kit silent for {} ms", self.timeout().as_millis());
        self.last_activity = None;
        self.active_sense = false;
        self.running = None;
        self.data.clear();
        true
    }
}

/// Code index number of a USB-MIDI Note-On event packet.
pub const USB_MIDI_CIN_NOTE_ON: u8 = 0x9;

/// Decode one 4-byte USB-MIDI event packet.
#[must_use]
pub fn decode_usb_midi_event(event: &[u8; 4]) -> Option<NoteOn> {
    let cin = event[0] & 0x0f;
    if cin != USB_MIDI_CIN_NOTE_ON || MidiType::from_status(event[1]) != MidiType::NoteOn {
        return None;
    }
    Some(NoteOn {
        channel: event[1] & 0x0f,
        note: event[2] & 0x7f,
        velocity: event[3] & 0x7f,
    })
}

/// Note-On messages contained in a buffer of USB-MIDI event packets.
/// A trailing partial packet is ignored.
pub fn usb_midi_note_ons(buf: &[u8]) -> impl Iterator<Item = NoteOn> + '_ {
    buf.chunks_exact(4).filter_map(|chunk| {
        let event: &[u8; 4] = chunk.try_into().ok()?;
        decode_usb_midi_event(event)
    })
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::vec::Vec as StdVec;

    fn t(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn input() -> SerialMidiInput {
        SerialMidiInput::new(Duration::from_secs(1), Duration::from_millis(90_000))
    }

    fn note_ons(input: &mut SerialMidiInput, bytes: &[u8]) -> StdVec<NoteOn> {
        bytes
            .iter()
            .filter_map(|&b| match input.feed(b, t(0)) {
                Some(SerialMidiEvent::NoteOn(n)) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(MidiType::from_status(0x99), MidiType::NoteOn);
        assert_eq!(MidiType::from_status(0x80), MidiType::NoteOff);
        assert_eq!(MidiType::from_status(0xb3), MidiType::ControlChange);
        assert_eq!(MidiType::from_status(0xfe), MidiType::ActiveSensing);
        assert_eq!(MidiType::from_status(0xf4), MidiType::Invalid);
        assert_eq!(MidiType::from_status(0xfd), MidiType::Invalid);
        assert_eq!(MidiType::from_status(0x40), MidiType::Invalid);
    }

    #[test]
    fn test_running_status() {
        let mut midi = input();
        let notes = note_ons(&mut midi, &[0x99, 36, 100, 38, 90, 42, 0]);
        assert_eq!(
            notes,
            [
                NoteOn { channel: 9, note: 36, velocity: 100 },
                NoteOn { channel: 9, note: 38, velocity: 90 },
                NoteOn { channel: 9, note: 42, velocity: 0 },
            ]
        );
    }

    #[test]
    fn test_realtime_does_not_break_running_status() {
        let mut midi = input();
        let notes = note_ons(&mut midi, &[0x99, 36, 0xf8, 100, 0xfe, 38, 0xfa, 90]);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].velocity, 100);
        assert_eq!(notes[1].note, 38);
    }

    #[test]
    fn test_other_status_cancels_running_status() {
        let mut midi = input();
        let notes = note_ons(&mut midi, &[0x99, 36, 0xb9, 4, 64, 38, 90]);
        assert!(notes.is_empty());

        // sysex data is not mistaken for note data
        let notes = note_ons(&mut midi, &[0xf0, 0x43, 0x10, 0x7f, 0xf7]);
        assert!(notes.is_empty());
    }

    #[test]
    fn test_data_without_status_ignored() {
        let mut midi = input();
        assert_eq!(midi.feed(36, t(0)), None);
        assert_eq!(midi.feed(100, t(0)), None);
        assert!(!midi.is_active());
    }

    #[test]
    fn test_activity_on_every_status_byte() {
        let mut midi = input();
        assert_eq!(midi.feed(0xf8, t(0)), Some(SerialMidiEvent::Activity));
        assert_eq!(midi.feed(0x99, t(0)), Some(SerialMidiEvent::Activity));
        assert_eq!(midi.feed(36, t(0)), None);
        assert!(midi.is_active());
    }

    #[test]
    fn test_idle_timeout() {
        let mut midi = input();
        assert!(!midi.poll_timeout(t(1_000_000)));

        midi.feed(0x99, t(100));
        assert!(!midi.poll_timeout(t(5_000)));
        assert!(!midi.poll_timeout(t(90_100)));
        assert!(midi.poll_timeout(t(90_101)));
        assert!(!midi.is_active());
        assert!(!midi.poll_timeout(t(200_000)));
    }

    #[test]
    fn test_active_sense_shortens_timeout() {
        let mut midi = input();
        midi.feed(0xfe, t(0));
        assert_eq!(midi.timeout(), Duration::from_secs(1));
        midi.feed(0xfe, t(300));
        assert!(!midi.poll_timeout(t(1_300)));
        assert!(midi.poll_timeout(t(1_301)));

        // the next kit starts from the long timeout again
        midi.feed(0x99, t(2_000));
        assert_eq!(midi.timeout(), Duration::from_millis(90_000));
    }

    #[test]
    fn test_usb_midi_decode() {
        assert_eq!(
            decode_usb_midi_event(&[0x09, 0x99, 38, 127]),
            Some(NoteOn { channel: 9, note: 38, velocity: 127 })
        );
        // note off
        assert_eq!(decode_usb_midi_event(&[0x08, 0x89, 38, 0]), None);
        // CIN and status disagree
        assert_eq!(decode_usb_midi_event(&[0x0b, 0x99, 38, 127]), None);

        let buf = [0x09, 0x99, 36, 80, 0x0f, 0xf8, 0, 0, 0x19, 0x90, 49, 60, 0x09, 0x99];
        let notes: StdVec<NoteOn> = usb_midi_note_ons(&buf).collect();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1], NoteOn { channel: 0, note: 49, velocity: 60 });
    }
}
