//! Genuine controller on the host bus.
//!
//! The controller serves two purposes: it answers the console's
//! authentication challenges (relayed through it verbatim), and once the
//! session runs its buttons stand in for a drum kit.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::Instant;
use wla_proto::{
    build_drum_input, power_on_request, Command, PacketError, WirePacket, CONTROLLER_INIT_REPORT,
};

use crate::context::AdapterContext;
use crate::host::{ControllerWriter, MountError};
use crate::instruments::Instrument;
use crate::session::{ControllerRelay, RelayError};
use crate::state::SessionState;

pub const MICROSOFT_VID: u16 = 0x045e;

/// Product ids of supported controllers (Microsoft VID).
pub const SUPPORTED_CONTROLLER_PIDS: [u16; 6] = [0x02d1, 0x02dd, 0x02e3, 0x02ea, 0x0b0a, 0x0b12];

/// Models that need [`CONTROLLER_INIT_REPORT`] after power-on.
const INIT_REPORT_PIDS: [u16; 3] = [0x02ea, 0x0b00, 0x0b12];

#[must_use]
pub fn is_supported_controller(vid: u16, pid: u16) -> bool {
    vid == MICROSOFT_VID && SUPPORTED_CONTROLLER_PIDS.contains(&pid)
}

#[must_use]
pub fn needs_init_report(pid: u16) -> bool {
    INIT_REPORT_PIDS.contains(&pid)
}

/// Host bus handle of the controller in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerHandle {
    pub address: u8,
    pub instance: u8,
}

/// The one controller the adapter talks to. Later controllers are ignored
/// until it goes away.
#[derive(Debug, Default)]
pub struct ControllerSlot {
    handle: Option<ControllerHandle>,
}

impl ControllerSlot {
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<ControllerHandle> {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.handle.is_some()
    }

    /// Take a freshly mounted controller into service and power it on.
    pub fn mount<W: ControllerWriter>(
        &mut self,
        address: u8,
        instance: u8,
        vid: u16,
        pid: u16,
        writer: &mut W,
    ) -> Result<ControllerHandle, MountError> {
        if !is_supported_controller(vid, pid) {
            return Err(MountError::Unsupported);
        }
        if self.handle.is_some() {
            debug!("controller {} ignored, one is already in use", instance);
            return Err(MountError::NoFreeSlot);
        }

        let handle = ControllerHandle { address, instance };
        self.handle = Some(handle);
        info!("controller connected (address {}, instance {})", address, instance);

        if let Err(e) = writer.write(address, instance, &power_on_request()) {
            warn!("controller power-on failed: {:?}", e);
        }
        if needs_init_report(pid) {
            if let Err(e) = writer.write(address, instance, &CONTROLLER_INIT_REPORT) {
                warn!("controller init report failed: {:?}", e);
            }
        }
        Ok(handle)
    }

    /// Returns `true` if the controller in use went away.
    pub fn unmount(&mut self, address: u8, instance: u8) -> bool {
        if self.handle != Some(ControllerHandle { address, instance }) {
            return false;
        }
        info!("controller disconnected");
        self.handle = None;
        true
    }

    /// Route one packet received from the controller.
    ///
    /// While authenticating everything goes to the console untouched. While
    /// running, the guide button is forwarded and input reports are turned
    /// into drum input; the first input report only connects the drums.
    pub fn handle_packet<M: RawMutex>(
        &self,
        ctx: &AdapterContext<M>,
        address: u8,
        instance: u8,
        bytes: &[u8],
        now: Instant,
    ) -> Result<(), PacketError> {
        if self.handle != Some(ControllerHandle { address, instance }) {
            return Ok(());
        }
        let mut pkt = WirePacket::from_bytes(bytes)?;
        let command = pkt.frame()?.command;
        trace!("controller -> {}", command.name());

        match ctx.state() {
            SessionState::Authenticating => {
                pkt.set_created_at(now);
                ctx.enqueue(&pkt).ok();
            }
            SessionState::Running => match command {
                Command::GuideButton => {
                    pkt.set_created_at(now);
                    ctx.enqueue(&pkt).ok();
                }
                Command::Input => {
                    let manager = ctx.instrument_manager();
                    if !ctx.instruments().is_connected(Instrument::Drums) {
                        manager.connect(Instrument::Drums, now);
                    } else {
                        let drums = build_drum_input(&pkt, Instrument::Drums.player_id())?;
                        ctx.enqueue(&drums).ok();
                    }
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    /// Relay path to this controller for the session.
    pub fn relay<'w, W: ControllerWriter>(&self, writer: &'w mut W) -> ControllerRelayPath<'w, W> {
        ControllerRelayPath {
            handle: self.handle,
            writer,
        }
    }
}

/// [`ControllerRelay`] bound to the controller in use.
pub struct ControllerRelayPath<'w, W: ControllerWriter> {
    handle: Option<ControllerHandle>,
    writer: &'w mut W,
}

impl<W: ControllerWriter> ControllerRelay for ControllerRelayPath<'_, W> {
    fn relay(&mut self, bytes: &[u8]) -> Result<(), RelayError> {
        let handle = self.handle.ok_or(RelayError::NoController)?;
        self.writer.write(handle.address, handle.instance, bytes)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::test_util::MockWriter;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use wla_proto::{ColoredButtons, ControllerInput, Dpad, DrumPads};

    fn now() -> Instant {
        Instant::from_millis(7)
    }

    fn ctx_in(state: SessionState) -> AdapterContext<NoopRawMutex> {
        let ctx = AdapterContext::new();
        ctx.session().set(state);
        ctx
    }

    fn mounted() -> ControllerSlot {
        let mut slot = ControllerSlot::new();
        slot.mount(1, 0, MICROSOFT_VID, 0x02d1, &mut MockWriter::default()).unwrap();
        slot
    }

    fn input_report() -> [u8; ControllerInput::SIZE] {
        let input = ControllerInput {
            start: true,
            colored: ColoredButtons::GREEN | ColoredButtons::YELLOW,
            dpad: Dpad::LEFT,
            trigger_left: 0x3ff,
            ..Default::default()
        };
        let mut bytes = [0u8; ControllerInput::SIZE];
        bytes[..4].copy_from_slice(&[0x20, 0x00, 0x31, 0x0e]);
        input.encode_body(&mut bytes);
        bytes
    }

    #[test]
    fn test_supported_list() {
        assert!(is_supported_controller(0x045e, 0x0b12));
        assert!(!is_supported_controller(0x045e, 0x028e));
        assert!(!is_supported_controller(0x1209, 0x02d1));
        assert!(needs_init_report(0x02ea));
        assert!(!needs_init_report(0x02d1));
    }

    #[test]
    fn test_mount_powers_on() {
        let mut writer = MockWriter::default();
        let mut slot = ControllerSlot::new();
        slot.mount(2, 0, MICROSOFT_VID, 0x0b12, &mut writer).unwrap();

        assert_eq!(writer.written.len(), 2);
        assert_eq!(writer.written[0].2, power_on_request().to_vec());
        assert_eq!(writer.written[1].2, CONTROLLER_INIT_REPORT.to_vec());
        assert_eq!(writer.written[1].0, 2);
    }

    #[test]
    fn test_first_controller_kept() {
        let mut writer = MockWriter::default();
        let mut slot = ControllerSlot::new();
        slot.mount(1, 0, MICROSOFT_VID, 0x02d1, &mut writer).unwrap();
        assert_eq!(
            slot.mount(1, 1, MICROSOFT_VID, 0x02d1, &mut writer),
            Err(MountError::NoFreeSlot)
        );
        assert_eq!(writer.written.len(), 1);
        assert_eq!(slot.handle(), Some(ControllerHandle { address: 1, instance: 0 }));

        assert!(!slot.unmount(1, 1));
        assert!(slot.unmount(1, 0));
        assert!(!slot.is_mounted());
    }

    #[test]
    fn test_authenticating_forwards_verbatim() {
        let ctx = ctx_in(SessionState::Authenticating);
        let slot = mounted();
        let bytes = [0x06, 0x30, 0x11, 0x03, 0xaa, 0xbb, 0xcc];

        slot.handle_packet(&ctx, 1, 0, &bytes, now()).unwrap();
        let pkt = ctx.queue().read().unwrap();
        assert_eq!(pkt.as_bytes(), &bytes);
        assert_eq!(pkt.created_at(), now());
    }

    #[test]
    fn test_other_instance_ignored() {
        let ctx = ctx_in(SessionState::Authenticating);
        let slot = mounted();
        slot.handle_packet(&ctx, 1, 1, &[0x06, 0x30, 0x11, 0x00], now()).unwrap();
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn test_short_packet_rejected() {
        let ctx = ctx_in(SessionState::Running);
        let slot = mounted();
        assert_eq!(
            slot.handle_packet(&ctx, 1, 0, &[0x20, 0x00], now()),
            Err(PacketError::TooShort { needed: 4, actual: 2 })
        );
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn test_first_input_connects_drums() {
        let ctx = ctx_in(SessionState::Running);
        let slot = mounted();
        let report = input_report();

        slot.handle_packet(&ctx, 1, 0, &report, now()).unwrap();
        assert!(ctx.instruments().is_connected(Instrument::Drums));
        let announce = ctx.queue().read().unwrap();
        assert_eq!(announce.frame().unwrap().command, Command::AddPlayer);
        assert!(ctx.queue().is_empty());

        slot.handle_packet(&ctx, 1, 0, &report, now()).unwrap();
        let drums = ctx.queue().read().unwrap().drum_input().unwrap();
        assert_eq!(drums.header.player_id, Instrument::Drums.player_id());
        assert!(drums.start);
        assert_eq!(drums.colored, ColoredButtons::GREEN | ColoredButtons::YELLOW);
        assert_eq!(drums.dpad, Dpad::LEFT);
        assert_eq!(drums.pads, DrumPads::NONE);
    }

    #[test]
    fn test_running_forwards_guide_only() {
        let ctx = ctx_in(SessionState::Running);
        let slot = mounted();

        slot.handle_packet(&ctx, 1, 0, &[0x07, 0x20, 0x05, 0x02, 0x01, 0x5b], now()).unwrap();
        slot.handle_packet(&ctx, 1, 0, &[0x03, 0x20, 0x06, 0x04, 0x80, 0, 0, 0], now()).unwrap();
        assert_eq!(ctx.queue().count(), 1);
        assert_eq!(ctx.queue().read().unwrap().as_bytes()[0], 0x07);
    }

    #[test]
    fn test_ignored_before_authentication() {
        let ctx = ctx_in(SessionState::Identifying);
        let slot = mounted();
        slot.handle_packet(&ctx, 1, 0, &input_report(), now()).unwrap();
        assert!(ctx.queue().is_empty());
        assert!(!ctx.instruments().is_connected(Instrument::Drums));
    }

    #[test]
    fn test_relay_path() {
        let mut writer = MockWriter::default();
        assert_eq!(
            ControllerSlot::new().relay(&mut writer).relay(&[0x06, 0x20, 0x00, 0x00]),
            Err(RelayError::NoController)
        );

        let slot = mounted();
        slot.relay(&mut writer).relay(&[0x06, 0x20, 0x00, 0x00]).unwrap();
        assert_eq!(writer.written, [(1, 0, std::vec![0x06, 0x20, 0x00, 0x00])]);
    }
}
