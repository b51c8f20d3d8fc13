//! Adapter: the device-role dispatch loop's view of the whole engine.
//!
//! One [`Adapter`] owns the session, the translators and the peripheral
//! slots, all sharing one [`AdapterContext`]. The firmware feeds it console
//! packets, host events, serial MIDI bytes and periodic polls; the sender
//! pump drains what it queues.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_time::Instant;
use wla_proto::PacketError;

use crate::config::AdapterConfig;
use crate::context::{AdapterContext, ConsoleFrame};
use crate::controller::ControllerSlot;
use crate::drums::{DrumMapper, NoteMap, DEFAULT_NOTE_MAP};
use crate::guitar::GuitarSlots;
use crate::host::{ControllerWriter, HostEvent};
use crate::instruments::Instrument;
use crate::midi::{usb_midi_note_ons, SerialMidiEvent, SerialMidiInput};
use crate::session::{IdentityTable, Session};
use crate::state::SessionState;

pub struct Adapter<'a, M: RawMutex = CriticalSectionRawMutex> {
    ctx: &'a AdapterContext<M>,
    config: AdapterConfig,
    session: Session<'a, M>,
    drums: DrumMapper,
    guitars: GuitarSlots,
    controller: ControllerSlot,
    /// Address of the USB-MIDI device in use. Only one is served.
    usb_midi: Option<u8>,
    serial_midi: SerialMidiInput,
}

impl<'a, M: RawMutex> Adapter<'a, M> {
    pub fn new(ctx: &'a AdapterContext<M>, identity: IdentityTable, config: AdapterConfig) -> Self {
        Self::with_note_map(ctx, identity, config, DEFAULT_NOTE_MAP)
    }

    pub fn with_note_map(
        ctx: &'a AdapterContext<M>,
        identity: IdentityTable,
        config: AdapterConfig,
        note_map: NoteMap,
    ) -> Self {
        Self {
            ctx,
            config,
            session: Session::new(ctx, identity),
            drums: DrumMapper::new(note_map, &config),
            guitars: GuitarSlots::new(),
            controller: ControllerSlot::new(),
            usb_midi: None,
            serial_midi: SerialMidiInput::new(config.active_sense_timeout, config.idle_timeout),
        }
    }

    #[inline]
    pub fn context(&self) -> &'a AdapterContext<M> {
        self.ctx
    }

    #[inline]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// System bring-up.
    pub fn start(&mut self) {
        self.session.start();
    }

    /// Packet received from the console. Authentication traffic is relayed
    /// to the controller through `writer`.
    pub fn on_console_packet<W: ControllerWriter>(
        &mut self,
        bytes: &[u8],
        now: Instant,
        writer: &mut W,
    ) -> Result<SessionState, PacketError> {
        let mut relay = self.controller.relay(writer);
        self.session.handle_console_packet(bytes, now, &mut relay)
    }

    /// Packet read from the console by another task. Packets read before
    /// the last bus reset belong to the old link and are dropped.
    pub fn on_console_frame<W: ControllerWriter>(
        &mut self,
        frame: &ConsoleFrame,
        now: Instant,
        writer: &mut W,
    ) -> Result<SessionState, PacketError> {
        if frame.epoch() != self.ctx.epoch() {
            debug!("dropped console packet from before the bus reset");
            return Ok(self.state());
        }
        self.on_console_packet(frame.as_bytes(), now, writer)
    }

    /// Device bus reset: back to INIT with nothing queued and no instrument
    /// connected. Peripherals still plugged in reconnect on their next data.
    pub fn on_bus_reset(&mut self) {
        self.session.bus_reset();
        self.drums.reset();
    }

    /// Apply one event from the host-role context.
    pub fn on_host_event<W: ControllerWriter>(
        &mut self,
        event: HostEvent,
        now: Instant,
        writer: &mut W,
    ) -> Result<(), PacketError> {
        let manager = self.ctx.instrument_manager();
        match event {
            HostEvent::ControllerMounted {
                address,
                instance,
                vid,
                pid,
            } => {
                if let Err(e) = self.controller.mount(address, instance, vid, pid, writer) {
                    debug!("controller {:?}:{:?} not used: {:?}", vid, pid, e);
                }
            }
            HostEvent::ControllerUnmounted { address, instance } => {
                self.controller.unmount(address, instance);
            }
            HostEvent::ControllerData {
                address,
                instance,
                data,
            } => {
                self.controller.handle_packet(self.ctx, address, instance, &data, now)?;
            }
            HostEvent::MidiMounted { address } => {
                if self.usb_midi.is_some() {
                    warn!("USB-MIDI device {} refused, one is already in use", address);
                } else {
                    info!("USB-MIDI device {} connected", address);
                    self.usb_midi = Some(address);
                    manager.connect(Instrument::Drums, now);
                }
            }
            HostEvent::MidiUnmounted { address } => {
                if self.usb_midi == Some(address) {
                    info!("USB-MIDI device {} disconnected", address);
                    self.usb_midi = None;
                    manager.disconnect(Instrument::Drums, now);
                }
            }
            HostEvent::MidiData { address, data } => {
                if self.usb_midi == Some(address) {
                    manager.connect(Instrument::Drums, now);
                    for note in usb_midi_note_ons(&data) {
                        self.drums.note_on(note, now);
                    }
                }
            }
            HostEvent::HidMounted {
                address, vid, pid, ..
            } => {
                if let Err(e) = self.guitars.mount(self.ctx, address, vid, pid, now) {
                    debug!("HID device {} not used: {:?}", address, e);
                }
            }
            HostEvent::HidUnmounted { address, .. } => {
                self.guitars.unmount(self.ctx, address, now);
            }
            HostEvent::HidReport { address, data, .. } => {
                self.guitars.handle_report(self.ctx, address, &data, now)?;
            }
        }
        Ok(())
    }

    /// One byte from the serial MIDI port.
    pub fn on_serial_midi_byte(&mut self, byte: u8, now: Instant) {
        match self.serial_midi.feed(byte, now) {
            Some(SerialMidiEvent::Activity) => {
                self.ctx.instrument_manager().connect(Instrument::Drums, now);
            }
            Some(SerialMidiEvent::NoteOn(note)) => {
                self.drums.note_on(note, now);
            }
            None => {}
        }
    }

    /// Periodic work: link timeouts, the INIT announce, drum release and
    /// drum output.
    pub fn poll(&mut self, now: Instant) {
        // A USB kit keeps the drums connected on its own.
        if self.serial_midi.poll_timeout(now) && self.usb_midi.is_none() {
            self.ctx.instrument_manager().disconnect(Instrument::Drums, now);
        }

        self.session
            .poll(now, self.controller.is_mounted(), self.config.announce_interval);
        self.drums.sweep(now);
        self.drums.flush(self.ctx, now);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::config::DEFAULT_CONFIG;
    use crate::controller::MICROSOFT_VID;
    use crate::host::host_data;
    use crate::test_util::MockWriter;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use std::vec::Vec;
    use wla_proto::{Command, DrumPads};

    const ANNOUNCE: [u8; 6] = [0x02, 0x20, 0x00, 0x02, 0xaa, 0xbb];
    const ID_0: [u8; 5] = [0x04, 0x30, 0x00, 0x01, 0x10];
    const ID_1: [u8; 5] = [0x04, 0x30, 0x00, 0x01, 0x11];
    const SEQUENCE: [&[u8]; 2] = [&ID_0, &ID_1];
    const IDENTITY: IdentityTable = IdentityTable {
        announce: &ANNOUNCE,
        sequence: &SEQUENCE,
    };

    const IDENTIFY: [u8; 4] = [0x04, 0x20, 0x01, 0x00];
    const AUTH_STEP: [u8; 6] = [0x06, 0x20, 0x02, 0x02, 0x07, 0x08];
    const AUTH_DONE: [u8; 6] = [0x06, 0x20, 0x03, 0x02, 0x01, 0x00];

    fn t(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Queued packets with their sequence byte zeroed.
    fn drain(ctx: &AdapterContext<NoopRawMutex>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(mut pkt) = ctx.queue().read() {
            pkt.set_sequence(0);
            out.push(pkt.as_bytes().to_vec());
        }
        out
    }

    fn mount_controller(adapter: &mut Adapter<'_, NoopRawMutex>, writer: &mut MockWriter) {
        let event = HostEvent::ControllerMounted {
            address: 1,
            instance: 0,
            vid: MICROSOFT_VID,
            pid: 0x02d1,
        };
        adapter.on_host_event(event, t(0), writer).unwrap();
    }

    fn authenticate(adapter: &mut Adapter<'_, NoopRawMutex>, writer: &mut MockWriter) {
        adapter.on_console_packet(&IDENTIFY, t(0), writer).unwrap();
        adapter.on_console_packet(&AUTH_STEP, t(0), writer).unwrap();
        adapter.on_console_packet(&AUTH_DONE, t(0), writer).unwrap();
        assert_eq!(adapter.state(), SessionState::Running);
    }

    #[test]
    fn test_handshake_relays_auth_to_controller() {
        let ctx: AdapterContext<NoopRawMutex> = AdapterContext::new();
        let mut adapter = Adapter::new(&ctx, IDENTITY, DEFAULT_CONFIG);
        let mut writer = MockWriter::default();
        adapter.start();
        mount_controller(&mut adapter, &mut writer);
        writer.written.clear();

        // INIT announce while the controller is there
        adapter.poll(t(0));
        assert_eq!(drain(&ctx), [ANNOUNCE.to_vec()]);

        authenticate(&mut adapter, &mut writer);
        let relayed: Vec<Vec<u8>> = writer.written.iter().map(|w| w.2.clone()).collect();
        assert_eq!(relayed, [AUTH_STEP.to_vec(), AUTH_DONE.to_vec()]);
        assert_eq!(writer.written[0].0, 1);
    }

    #[test]
    fn test_no_announce_without_controller() {
        let ctx: AdapterContext<NoopRawMutex> = AdapterContext::new();
        let mut adapter = Adapter::new(&ctx, IDENTITY, DEFAULT_CONFIG);
        adapter.start();
        adapter.poll(t(0));
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn test_serial_kit_end_to_end() {
        let ctx: AdapterContext<NoopRawMutex> = AdapterContext::new();
        let mut adapter = Adapter::new(&ctx, IDENTITY, DEFAULT_CONFIG);
        let mut writer = MockWriter::default();
        adapter.start();

        // kit plugged in before the console finished: connected silently
        adapter.on_serial_midi_byte(0xfe, t(0));
        assert!(ctx.instruments().is_connected(Instrument::Drums));
        assert!(ctx.queue().is_empty());

        mount_controller(&mut adapter, &mut writer);
        authenticate(&mut adapter, &mut writer);
        let queued = drain(&ctx);
        // identity reply, then the drums announce on entering RUNNING
        assert_eq!(queued.last().map(|p| (p[0], p[4])), Some((0x22, 0x02)));

        for byte in [0x99, 36, 120] {
            adapter.on_serial_midi_byte(byte, t(10));
        }
        adapter.poll(t(10));
        let pkt = ctx.queue().read().unwrap();
        assert_eq!(pkt.drum_input().unwrap().pads, DrumPads::KICK);

        // kit goes quiet past the active sensing timeout
        adapter.poll(t(1_011));
        let queued = drain(&ctx);
        assert_eq!(queued[0], Instrument::Drums.drop_template());
        assert_eq!(queued.len(), 2);
        assert!(!ctx.instruments().is_connected(Instrument::Drums));
    }

    #[test]
    fn test_usb_midi_single_device() {
        let ctx: AdapterContext<NoopRawMutex> = AdapterContext::new();
        ctx.session().set(SessionState::Running);
        let mut adapter = Adapter::new(&ctx, IDENTITY, DEFAULT_CONFIG);
        let mut writer = MockWriter::default();

        adapter.on_host_event(HostEvent::MidiMounted { address: 4 }, t(0), &mut writer).unwrap();
        adapter.on_host_event(HostEvent::MidiMounted { address: 5 }, t(0), &mut writer).unwrap();
        assert_eq!(drain(&ctx).len(), 1);

        // the refused device is not listened to
        let data = host_data(&[0x09, 0x99, 38, 100]).unwrap();
        let refused = HostEvent::MidiData {
            address: 5,
            data: data.clone(),
        };
        adapter.on_host_event(refused, t(1), &mut writer).unwrap();
        adapter.poll(t(1));
        assert!(ctx.queue().is_empty());

        adapter.on_host_event(HostEvent::MidiData { address: 4, data }, t(2), &mut writer).unwrap();
        adapter.poll(t(2));
        assert_eq!(ctx.queue().read().unwrap().drum_input().unwrap().pads, DrumPads::PAD_RED);

        adapter.on_host_event(HostEvent::MidiUnmounted { address: 5 }, t(3), &mut writer).unwrap();
        assert!(ctx.instruments().is_connected(Instrument::Drums));
        adapter.on_host_event(HostEvent::MidiUnmounted { address: 4 }, t(3), &mut writer).unwrap();
        assert!(!ctx.instruments().is_connected(Instrument::Drums));
    }

    #[test]
    fn test_bus_reset() {
        let ctx: AdapterContext<NoopRawMutex> = AdapterContext::new();
        let mut adapter = Adapter::new(&ctx, IDENTITY, DEFAULT_CONFIG);
        let mut writer = MockWriter::default();
        adapter.start();
        mount_controller(&mut adapter, &mut writer);
        authenticate(&mut adapter, &mut writer);
        adapter.on_host_event(HostEvent::MidiMounted { address: 4 }, t(0), &mut writer).unwrap();
        assert!(!ctx.queue().is_empty());

        adapter.on_bus_reset();
        assert_eq!(ctx.queue().count(), 0);
        assert_eq!(ctx.instruments().snapshot(), [false; 3]);
        assert_eq!(adapter.state(), SessionState::Init);

        // the controller is still mounted on the host side
        adapter.poll(t(2_000));
        assert_eq!(drain(&ctx), [ANNOUNCE.to_vec()]);
    }

    #[test]
    fn test_console_frame_from_before_bus_reset_is_dropped() {
        let ctx: AdapterContext<NoopRawMutex> = AdapterContext::new();
        let mut adapter = Adapter::new(&ctx, IDENTITY, DEFAULT_CONFIG);
        let mut writer = MockWriter::default();
        adapter.start();

        // read off the old link, handled after the reset
        let stale = ctx.console_frame(&IDENTIFY).unwrap();
        adapter.on_bus_reset();
        assert_eq!(
            adapter.on_console_frame(&stale, t(0), &mut writer),
            Ok(SessionState::Init)
        );
        assert!(ctx.queue().is_empty());

        let fresh = ctx.console_frame(&IDENTIFY).unwrap();
        assert_eq!(
            adapter.on_console_frame(&fresh, t(1), &mut writer),
            Ok(SessionState::Identifying)
        );
        assert_eq!(drain(&ctx), [ID_0.to_vec()]);
    }

    #[test]
    fn test_guitar_events() {
        let ctx: AdapterContext<NoopRawMutex> = AdapterContext::new();
        ctx.session().set(SessionState::Running);
        let mut adapter = Adapter::new(&ctx, IDENTITY, DEFAULT_CONFIG);
        let mut writer = MockWriter::default();

        let mounted = HostEvent::HidMounted {
            address: 6,
            instance: 0,
            vid: 0x1209,
            pid: 0x2882,
        };
        adapter.on_host_event(mounted, t(0), &mut writer).unwrap();
        let report = HostEvent::HidReport {
            address: 6,
            instance: 0,
            data: host_data(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0xff]).unwrap(),
        };
        adapter.on_host_event(report, t(1), &mut writer).unwrap();
        adapter
            .on_host_event(HostEvent::HidUnmounted { address: 6, instance: 0 }, t(2), &mut writer)
            .unwrap();

        let cmds: Vec<u8> = drain(&ctx).iter().map(|p| p[0]).collect();
        assert_eq!(
            cmds,
            [
                Command::AddPlayer.to_u8(),
                Command::Input.to_u8(),
                Command::DropPlayer.to_u8()
            ]
        );
    }
}
