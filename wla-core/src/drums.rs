//! MIDI drum kit to drum input translation.
//!
//! Hits set a pad, which stays pressed for the hold time and is then
//! released by [`DrumMapper::sweep`]. Changes are batched: at most one drum
//! packet goes out per output interval, carrying every pad pressed at that
//! moment.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};
use wla_proto::{drum_packet, Command, DrumInput, DrumPads, Frame, FrameType, LegacyHeader};

use crate::config::AdapterConfig;
use crate::context::AdapterContext;
use crate::instruments::Instrument;
use crate::midi::NoteOn;

/// Logical drum kit output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DrumOutput {
    Kick = 0,
    PadRed,
    PadYellow,
    PadBlue,
    PadGreen,
    CymbalYellow,
    CymbalBlue,
    CymbalGreen,
}

/// Number of drum outputs.
pub const DRUM_OUTPUT_COUNT: usize = 8;

impl DrumOutput {
    pub const ALL: [DrumOutput; DRUM_OUTPUT_COUNT] = [
        DrumOutput::Kick,
        DrumOutput::PadRed,
        DrumOutput::PadYellow,
        DrumOutput::PadBlue,
        DrumOutput::PadGreen,
        DrumOutput::CymbalYellow,
        DrumOutput::CymbalBlue,
        DrumOutput::CymbalGreen,
    ];

    /// Bit in the drum report.
    #[must_use]
    pub const fn pad(self) -> DrumPads {
        match self {
            DrumOutput::Kick => DrumPads::KICK,
            DrumOutput::PadRed => DrumPads::PAD_RED,
            DrumOutput::PadYellow => DrumPads::PAD_YELLOW,
            DrumOutput::PadBlue => DrumPads::PAD_BLUE,
            DrumOutput::PadGreen => DrumPads::PAD_GREEN,
            DrumOutput::CymbalYellow => DrumPads::CYMBAL_YELLOW,
            DrumOutput::CymbalBlue => DrumPads::CYMBAL_BLUE,
            DrumOutput::CymbalGreen => DrumPads::CYMBAL_GREEN,
        }
    }
}

/// Note number to drum output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteMap {
    outputs: [Option<DrumOutput>; 128],
}

impl NoteMap {
    /// Map with no notes assigned.
    #[must_use]
    pub const fn empty() -> Self {
        Self { outputs: [None; 128] }
    }

    /// Assign `note` to `output`. Notes above 127 are ignored.
    #[must_use]
    pub const fn with(mut self, note: u8, output: DrumOutput) -> Self {
        if (note as usize) < self.outputs.len() {
            self.outputs[note as usize] = Some(output);
        }
        self
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, note: u8) -> Option<DrumOutput> {
        if (note as usize) < self.outputs.len() {
            self.outputs[note as usize]
        } else {
            None
        }
    }
}

/// General MIDI percussion layout.
///
/// - 35, 36 kick
/// - 37, 38, 40 snare → red pad
/// - 48, 50 high toms → yellow pad
/// - 45, 47 mid toms → blue pad
/// - 41, 43 floor toms → green pad
/// - 42, 44, 46 hi-hat → yellow cymbal
/// - 51, 53, 59 ride → blue cymbal
/// - 49, 52, 55, 57 crash/china/splash → green cymbal
pub const DEFAULT_NOTE_MAP: NoteMap = NoteMap::empty()
    .with(35, DrumOutput::Kick)
    .with(36, DrumOutput::Kick)
    .with(37, DrumOutput::PadRed)
    .with(38, DrumOutput::PadRed)
    .with(40, DrumOutput::PadRed)
    .with(48, DrumOutput::PadYellow)
    .with(50, DrumOutput::PadYellow)
    .with(45, DrumOutput::PadBlue)
    .with(47, DrumOutput::PadBlue)
    .with(41, DrumOutput::PadGreen)
    .with(43, DrumOutput::PadGreen)
    .with(42, DrumOutput::CymbalYellow)
    .with(44, DrumOutput::CymbalYellow)
    .with(46, DrumOutput::CymbalYellow)
    .with(51, DrumOutput::CymbalBlue)
    .with(53, DrumOutput::CymbalBlue)
    .with(59, DrumOutput::CymbalBlue)
    .with(49, DrumOutput::CymbalGreen)
    .with(52, DrumOutput::CymbalGreen)
    .with(55, DrumOutput::CymbalGreen)
    .with(57, DrumOutput::CymbalGreen);

#[derive(Debug, Clone, Copy, Default)]
struct OutputState {
    triggered: bool,
    triggered_at: Option<Instant>,
}

/// Aggregated drum kit state and its output rate limiter.
pub struct DrumMapper {
    map: NoteMap,
    velocity_threshold: u8,
    trigger_hold: Duration,
    output_interval: Duration,
    outputs: [OutputState; DRUM_OUTPUT_COUNT],
    pads: DrumPads,
    dirty: bool,
    last_sent: Option<Instant>,
}

impl DrumMapper {
    #[must_use]
    pub fn new(map: NoteMap, config: &AdapterConfig) -> Self {
        Self {
            map,
            velocity_threshold: config.velocity_threshold,
            trigger_hold: config.trigger_hold,
            output_interval: config.output_interval,
            outputs: [OutputState::default(); DRUM_OUTPUT_COUNT],
            pads: DrumPads::NONE,
            dirty: false,
            last_sent: None,
        }
    }

    /// Pads currently pressed.
    #[inline]
    #[must_use]
    pub fn pads(&self) -> DrumPads {
        self.pads
    }

    /// Whether a change is waiting to be sent.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Apply a Note-On. Returns `true` if a pad was newly pressed.
    ///
    /// Velocities at or below the threshold (including the velocity 0
    /// note-off form) are ignored, as are hits on a pad still held.
    pub fn note_on(&mut self, msg: NoteOn, now: Instant) -> bool {
        if msg.velocity <= self.velocity_threshold {
            return false;
        }
        let Some(output) = self.map.get(msg.note) else {
            trace!("unmapped note {}", msg.note);
            return false;
        };

        let state = &mut self.outputs[output as usize];
        if state.triggered {
            return false;
        }
        state.triggered = true;
        state.triggered_at = Some(now);
        self.pads |= output.pad();
        self.dirty = true;
        trace!("hit {:?} (note {}, velocity {})", output, msg.note, msg.velocity);
        true
    }

    /// Release every pad held for longer than the hold time.
    pub fn sweep(&mut self, now: Instant) {
        for output in DrumOutput::ALL {
            let state = &mut self.outputs[output as usize];
            if !state.triggered {
                continue;
            }
            let held = state
                .triggered_at
                .map_or(Duration::MAX, |at| now.saturating_duration_since(at));
            if held > self.trigger_hold {
                state.triggered = false;
                state.triggered_at = None;
                self.pads.set(output.pad(), false);
                self.dirty = true;
            }
        }
    }

    /// Queue a drum packet if something changed, the session is running and
    /// the output interval has passed since the last one.
    ///
    /// Returns `true` if a packet was queued.
    pub fn flush<M: RawMutex>(&mut self, ctx: &AdapterContext<M>, now: Instant) -> bool {
        if !self.dirty || !ctx.session().is_running() {
            return false;
        }
        if let Some(last) = self.last_sent {
            if now.saturating_duration_since(last) <= self.output_interval {
                return false;
            }
        }

        let frame = Frame::new(Command::Input, FrameType::Command, DrumInput::PAYLOAD_LENGTH);
        let mut drums = DrumInput::new(LegacyHeader::new(frame, Instrument::Drums.player_id()));
        drums.pads = self.pads;

        match drum_packet(&drums, now) {
            Ok(pkt) => {
                // A full queue still consumes the change; the next hit or
                // release produces a fresh snapshot.
                ctx.enqueue(&pkt).ok();
            }
            Err(e) => error!("drum packet: {:?}", e),
        }
        self.dirty = false;
        self.last_sent = Some(now);
        true
    }

    /// Release everything without sending.
    pub fn reset(&mut self) {
        self.outputs = [OutputState::default(); DRUM_OUTPUT_COUNT];
        self.pads = DrumPads::NONE;
        self.dirty = false;
        self.last_sent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONFIG;
    use crate::state::SessionState;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    fn t(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn hit(note: u8, velocity: u8) -> NoteOn {
        NoteOn {
            channel: 9,
            note,
            velocity,
        }
    }

    fn running_ctx() -> AdapterContext<NoopRawMutex> {
        let ctx = AdapterContext::new();
        ctx.session().set(SessionState::Running);
        ctx
    }

    fn mapper() -> DrumMapper {
        DrumMapper::new(DEFAULT_NOTE_MAP, &DEFAULT_CONFIG)
    }

    fn next_pads(ctx: &AdapterContext<NoopRawMutex>) -> DrumPads {
        ctx.queue().read().unwrap().drum_input().unwrap().pads
    }

    #[test]
    fn test_default_map() {
        assert_eq!(DEFAULT_NOTE_MAP.get(36), Some(DrumOutput::Kick));
        assert_eq!(DEFAULT_NOTE_MAP.get(38), Some(DrumOutput::PadRed));
        assert_eq!(DEFAULT_NOTE_MAP.get(49), Some(DrumOutput::CymbalGreen));
        assert_eq!(DEFAULT_NOTE_MAP.get(60), None);
        assert_eq!(DEFAULT_NOTE_MAP.get(200), None);
    }

    #[test]
    fn test_kick_sets_kick_bit() {
        let ctx = running_ctx();
        let mut drums = mapper();

        assert!(drums.note_on(hit(36, 100), t(0)));
        assert!(drums.flush(&ctx, t(0)));

        let pkt = ctx.queue().read().unwrap();
        let input = pkt.drum_input().unwrap();
        assert_eq!(input.pads, DrumPads::KICK);
        assert_eq!(input.header.player_id, 2);
        assert_eq!(input.header.frame.command, Command::Input);
        assert_eq!(pkt.as_bytes()[9], 0x10);
    }

    #[test]
    fn test_velocity_at_threshold_ignored() {
        let ctx = running_ctx();
        let mut drums = mapper();

        assert!(!drums.note_on(hit(36, DEFAULT_CONFIG.velocity_threshold), t(0)));
        assert!(!drums.note_on(hit(36, 0), t(0)));
        assert!(!drums.is_dirty());
        assert!(!drums.flush(&ctx, t(0)));
        assert!(ctx.queue().is_empty());

        assert!(drums.note_on(hit(36, DEFAULT_CONFIG.velocity_threshold + 1), t(0)));
    }

    #[test]
    fn test_unmapped_note_ignored() {
        let mut drums = mapper();
        assert!(!drums.note_on(hit(60, 127), t(0)));
        assert_eq!(drums.pads(), DrumPads::NONE);
    }

    #[test]
    fn test_hold_then_release() {
        let ctx = running_ctx();
        let mut drums = mapper();
        let hold = DEFAULT_CONFIG.trigger_hold.as_millis();

        drums.note_on(hit(38, 90), t(0));
        drums.sweep(t(0));
        drums.flush(&ctx, t(0));
        assert_eq!(next_pads(&ctx), DrumPads::PAD_RED);

        // a second hit while held changes nothing
        assert!(!drums.note_on(hit(38, 127), t(hold / 2)));

        // another pad while red is still held
        drums.note_on(hit(42, 90), t(hold / 2));
        drums.sweep(t(hold / 2));
        drums.flush(&ctx, t(hold / 2));
        assert_eq!(next_pads(&ctx), DrumPads::PAD_RED | DrumPads::CYMBAL_YELLOW);

        // exactly at the hold time: still held
        drums.sweep(t(hold));
        assert!(!drums.is_dirty());

        // first packet after the hold time has red released
        drums.sweep(t(hold + 1));
        drums.flush(&ctx, t(hold + 1));
        assert_eq!(next_pads(&ctx), DrumPads::CYMBAL_YELLOW);

        // red can be hit again
        assert!(drums.note_on(hit(38, 90), t(hold + 2)));
    }

    #[test]
    fn test_output_interval_batches_hits() {
        let ctx = running_ctx();
        let mut drums = mapper();
        let interval = DEFAULT_CONFIG.output_interval.as_millis();

        drums.note_on(hit(36, 100), t(100));
        assert!(drums.flush(&ctx, t(100)));

        drums.note_on(hit(38, 100), t(101));
        drums.note_on(hit(49, 100), t(102));
        assert!(!drums.flush(&ctx, t(100 + interval)));
        assert!(drums.flush(&ctx, t(101 + interval)));

        assert_eq!(ctx.queue().count(), 2);
        assert_eq!(next_pads(&ctx), DrumPads::KICK);
        assert_eq!(
            next_pads(&ctx),
            DrumPads::KICK | DrumPads::PAD_RED | DrumPads::CYMBAL_GREEN
        );
    }

    #[test]
    fn test_no_flush_until_running() {
        let ctx: AdapterContext<NoopRawMutex> = AdapterContext::new();
        ctx.session().set(SessionState::Authenticating);
        let mut drums = mapper();

        drums.note_on(hit(36, 100), t(0));
        assert!(!drums.flush(&ctx, t(0)));
        assert!(drums.is_dirty());

        ctx.session().set(SessionState::Running);
        assert!(drums.flush(&ctx, t(1)));
        assert!(!drums.is_dirty());
    }

    #[test]
    fn test_packets_use_fresh_sequences() {
        let ctx = running_ctx();
        let mut drums = mapper();
        drums.note_on(hit(36, 100), t(0));
        drums.flush(&ctx, t(0));
        drums.sweep(t(100));
        drums.flush(&ctx, t(100));

        let a = ctx.queue().read().unwrap();
        let b = ctx.queue().read().unwrap();
        assert_ne!(a.frame().unwrap().sequence, b.frame().unwrap().sequence);
        assert_eq!(b.drum_input().unwrap().pads, DrumPads::NONE);
    }

    #[test]
    fn test_reset_releases_everything() {
        let mut drums = mapper();
        drums.note_on(hit(36, 100), t(0));
        drums.reset();
        assert_eq!(drums.pads(), DrumPads::NONE);
        assert!(!drums.is_dirty());
        assert!(drums.note_on(hit(36, 100), t(1)));
    }
}
