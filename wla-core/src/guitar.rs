//! HID guitar slots.
//!
//! Up to two guitars are served, each bound to one USB device address. The
//! first guitar takes GUITAR_ONE, the second GUITAR_TWO; a third is refused.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Instant;
use wla_proto::{build_guitar_input, HidGuitarReport, PacketError};

use crate::context::AdapterContext;
use crate::host::MountError;
use crate::instruments::Instrument;

/// Supported HID guitars as (VID, PID).
pub const SUPPORTED_GUITARS: [(u16, u16); 1] = [(0x1209, 0x2882)];

#[must_use]
pub fn is_supported_guitar(vid: u16, pid: u16) -> bool {
    SUPPORTED_GUITARS.contains(&(vid, pid))
}

const SLOTS: [Instrument; 2] = [Instrument::GuitarOne, Instrument::GuitarTwo];

/// First-free allocator over the two guitar instruments.
#[derive(Debug, Default)]
pub struct GuitarSlots {
    addresses: [Option<u8>; 2],
}

impl GuitarSlots {
    #[must_use]
    pub const fn new() -> Self {
        Self { addresses: [None; 2] }
    }

    /// Instrument bound to `address`.
    #[must_use]
    pub fn instrument_for(&self, address: u8) -> Option<Instrument> {
        self.addresses
            .iter()
            .position(|a| *a == Some(address))
            .map(|i| SLOTS[i])
    }

    /// Take a mounted HID device into service.
    pub fn mount<M: RawMutex>(
        &mut self,
        ctx: &AdapterContext<M>,
        address: u8,
        vid: u16,
        pid: u16,
        now: Instant,
    ) -> Result<Instrument, MountError> {
        if !is_supported_guitar(vid, pid) {
            debug!("HID {:?}:{:?} is not a supported guitar", vid, pid);
            return Err(MountError::Unsupported);
        }
        if let Some(instrument) = self.instrument_for(address) {
            return Ok(instrument);
        }

        let Some(free) = self.addresses.iter().position(Option::is_none) else {
            warn!("two guitars already connected, refusing address {}", address);
            return Err(MountError::NoFreeSlot);
        };
        self.addresses[free] = Some(address);
        let instrument = SLOTS[free];
        ctx.instrument_manager().connect(instrument, now);
        Ok(instrument)
    }

    /// Release the slot bound to `address`, if any.
    pub fn unmount<M: RawMutex>(
        &mut self,
        ctx: &AdapterContext<M>,
        address: u8,
        now: Instant,
    ) -> Option<Instrument> {
        let instrument = self.instrument_for(address)?;
        self.addresses[instrument.index()] = None;
        ctx.instrument_manager().disconnect(instrument, now);
        Some(instrument)
    }

    /// Translate one HID report and queue it.
    ///
    /// Reports from unknown addresses, and any report while the session is
    /// not running, are ignored. Returns `true` if a packet was queued.
    pub fn handle_report<M: RawMutex>(
        &self,
        ctx: &AdapterContext<M>,
        address: u8,
        report: &[u8],
        now: Instant,
    ) -> Result<bool, PacketError> {
        let Some(instrument) = self.instrument_for(address) else {
            return Ok(false);
        };
        if !ctx.session().is_running() {
            return Ok(false);
        }

        // A bus reset cleared the flag while the guitar stayed plugged in.
        ctx.instrument_manager().connect(instrument, now);

        let report = HidGuitarReport::decode(report)?;
        let pkt = build_guitar_input(&report, instrument.player_id(), now)?;
        Ok(ctx.enqueue(&pkt).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionState;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use wla_proto::{ColoredButtons, Command, Dpad};

    const VID: u16 = 0x1209;
    const PID: u16 = 0x2882;

    fn now() -> Instant {
        Instant::from_ticks(0)
    }

    fn running_ctx() -> AdapterContext<NoopRawMutex> {
        let ctx = AdapterContext::new();
        ctx.session().set(SessionState::Running);
        ctx
    }

    #[test]
    fn test_first_free_slot() {
        let ctx = running_ctx();
        let mut slots = GuitarSlots::new();

        assert_eq!(slots.mount(&ctx, 5, VID, PID, now()), Ok(Instrument::GuitarOne));
        assert_eq!(slots.mount(&ctx, 6, VID, PID, now()), Ok(Instrument::GuitarTwo));
        assert_eq!(ctx.queue().count(), 2);

        // third guitar: refused, nothing sent
        assert_eq!(slots.mount(&ctx, 7, VID, PID, now()), Err(MountError::NoFreeSlot));
        assert_eq!(ctx.queue().count(), 2);

        // freeing the first slot lets the next guitar take it
        assert_eq!(slots.unmount(&ctx, 5, now()), Some(Instrument::GuitarOne));
        assert_eq!(slots.mount(&ctx, 7, VID, PID, now()), Ok(Instrument::GuitarOne));
        assert_eq!(slots.instrument_for(6), Some(Instrument::GuitarTwo));
    }

    #[test]
    fn test_unsupported_refused() {
        let ctx = running_ctx();
        let mut slots = GuitarSlots::new();
        assert_eq!(slots.mount(&ctx, 5, 0x046d, 0xc216, now()), Err(MountError::Unsupported));
        assert_eq!(slots.instrument_for(5), None);
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn test_unmount_unknown_address() {
        let ctx = running_ctx();
        let mut slots = GuitarSlots::new();
        assert_eq!(slots.unmount(&ctx, 9, now()), None);
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn test_report_translated_with_slot_player_id() {
        let ctx = running_ctx();
        let mut slots = GuitarSlots::new();
        slots.mount(&ctx, 5, VID, PID, now()).unwrap();
        slots.mount(&ctx, 6, VID, PID, now()).unwrap();
        while ctx.queue().read().is_some() {}

        // red + start, strum down, whammy 0x40
        let report = [0x00, 0x82, 0x00, 0x04, 0x40, 0x00, 0x00];
        assert_eq!(slots.handle_report(&ctx, 6, &report, now()), Ok(true));

        let pkt = ctx.queue().read().unwrap();
        assert_eq!(pkt.frame().unwrap().command, Command::Input);
        let guitar = pkt.guitar_input().unwrap();
        assert_eq!(guitar.header.player_id, 1);
        assert_eq!(guitar.colored, ColoredButtons::RED);
        assert_eq!(guitar.dpad, Dpad::DOWN);
        assert!(guitar.start);
        assert_eq!(guitar.whammy, 0x40);
    }

    #[test]
    fn test_report_ignored_unless_running() {
        let ctx: AdapterContext<NoopRawMutex> = AdapterContext::new();
        ctx.session().set(SessionState::Authenticating);
        let mut slots = GuitarSlots::new();
        slots.mount(&ctx, 5, VID, PID, now()).unwrap();

        let report = [0x00, 0x01, 0x00, 0x08, 0x00, 0x00, 0x00];
        assert_eq!(slots.handle_report(&ctx, 5, &report, now()), Ok(false));
        assert_eq!(slots.handle_report(&ctx, 9, &report, now()), Ok(false));
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn test_short_report_rejected() {
        let ctx = running_ctx();
        let mut slots = GuitarSlots::new();
        slots.mount(&ctx, 5, VID, PID, now()).unwrap();
        assert!(slots.handle_report(&ctx, 5, &[0x00, 0x01], now()).is_err());
    }
}
