//! Console handshake state machine.
//!
//! ```text
//! NONE ──start/bus reset──▶ INIT ──IDENTIFY──▶ IDENTIFYING ──AUTHENTICATE──▶ AUTHENTICATING
//!                                               ▲   │ IDENTIFY/ACK:               │ success marker
//!                                               └───┘ next identity packet        ▼
//!                                                                              RUNNING
//! ```
//!
//! Inbound packets drive every transition. Commands a state does not expect
//! are ignored.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Instant};
use wla_proto::{template_packet, Command, PacketError, WirePacket, FRAME_SIZE};

use crate::context::AdapterContext;
use crate::state::SessionState;

/// Payload signature of the console's final authentication packet.
pub const AUTH_SUCCESS_MARKER: [u8; 3] = [0x02, 0x01, 0x00];

/// Frame length of the final authentication packet.
pub const AUTH_SUCCESS_LENGTH: u8 = 2;

/// Opaque identification data of the impersonated adapter.
///
/// The packets are replayed byte for byte, with a fresh sequence number.
#[derive(Debug, Clone, Copy)]
pub struct IdentityTable {
    /// Broadcast in INIT until the console starts identifying.
    pub announce: &'static [u8],
    /// Replies to IDENTIFY/ACKNOWLEDGE, in order, wrapping at the end.
    pub sequence: &'static [&'static [u8]],
}

/// Error returned by a [`ControllerRelay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayError {
    /// No controller is mounted.
    NoController,
    /// The relay path cannot take more data right now.
    Busy,
}

/// Path to the genuine controller, used during authentication.
pub trait ControllerRelay {
    /// Forward bytes to the controller verbatim.
    fn relay(&mut self, bytes: &[u8]) -> Result<(), RelayError>;
}

/// Session state machine.
pub struct Session<'a, M: RawMutex> {
    ctx: &'a AdapterContext<M>,
    identity: IdentityTable,
    identify_index: usize,
    last_announce: Option<Instant>,
}

impl<'a, M: RawMutex> Session<'a, M> {
    pub fn new(ctx: &'a AdapterContext<M>, identity: IdentityTable) -> Self {
        Self {
            ctx,
            identity,
            identify_index: 0,
            last_announce: None,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.ctx.state()
    }

    /// System bring-up: NONE → INIT.
    pub fn start(&mut self) {
        if self.state() == SessionState::None {
            info!("session starting");
            self.ctx.session().set(SessionState::Init);
        }
    }

    /// Device bus reset: wipe the queue and instrument flags and start over
    /// at INIT. No drop notifications are sent since the link is gone.
    pub fn bus_reset(&mut self) {
        warn!("bus reset");
        self.ctx.session().set(SessionState::None);
        self.ctx.reset();
        self.identify_index = 0;
        self.last_announce = None;
        self.ctx.session().set(SessionState::Init);
    }

    /// Handle one packet received from the console.
    ///
    /// Packets shorter than a frame header are rejected without reply.
    /// Returns the state after handling.
    pub fn handle_console_packet<C: ControllerRelay>(
        &mut self,
        bytes: &[u8],
        now: Instant,
        relay: &mut C,
    ) -> Result<SessionState, PacketError> {
        let pkt = WirePacket::from_bytes(bytes)?;
        let command = pkt.frame()?.command;
        trace!("console -> {} ({:?})", command.name(), self.state());

        match self.state() {
            SessionState::Init => self.handle_init(&pkt, command, now, relay),
            SessionState::Identifying => self.handle_identify(&pkt, command, now, relay),
            SessionState::Authenticating => self.handle_auth(&pkt, now, relay),
            SessionState::Running => self.handle_running(&pkt, command, now, relay),
            SessionState::None | SessionState::PowerOff => {}
        }

        Ok(self.state())
    }

    fn handle_init<C: ControllerRelay>(
        &mut self,
        pkt: &WirePacket,
        command: Command,
        now: Instant,
        relay: &mut C,
    ) {
        if command == Command::Identify {
            info!("console identifying");
            self.ctx.session().set(SessionState::Identifying);
            self.handle_identify(pkt, command, now, relay);
        }
    }

    fn handle_identify<C: ControllerRelay>(
        &mut self,
        pkt: &WirePacket,
        command: Command,
        now: Instant,
        relay: &mut C,
    ) {
        match command {
            Command::Identify | Command::Acknowledge => self.send_next_identity(now),
            Command::Authenticate => {
                info!("console authenticating");
                self.ctx.session().set(SessionState::Authenticating);
                self.handle_auth(pkt, now, relay);
            }
            _ => {}
        }
    }

    fn send_next_identity(&mut self, now: Instant) {
        let table = self.identity.sequence;
        if table.is_empty() {
            return;
        }
        if self.identify_index >= table.len() {
            debug!("identify sequence wrapped");
            self.identify_index = 0;
        }

        match template_packet(table[self.identify_index], now) {
            Ok(reply) => {
                self.ctx.enqueue(&reply).ok();
            }
            Err(e) => error!("bad identity packet {}: {:?}", self.identify_index, e),
        }
        self.identify_index += 1;
    }

    /// Every packet goes to the controller; only the success marker is
    /// looked at.
    fn handle_auth<C: ControllerRelay>(&mut self, pkt: &WirePacket, now: Instant, relay: &mut C) {
        if is_auth_success(pkt.as_bytes()) {
            info!("authenticated");
            self.ctx.session().set(SessionState::Running);
            self.ctx.instrument_manager().notify_all(now);
        }
        self.relay(pkt, relay);
    }

    fn handle_running<C: ControllerRelay>(
        &mut self,
        pkt: &WirePacket,
        command: Command,
        now: Instant,
        relay: &mut C,
    ) {
        match command {
            Command::PowerMode => debug!("power mode request ignored"),
            Command::Acknowledge => self.relay(pkt, relay),
            Command::ListConnectedInstruments => self.ctx.instrument_manager().notify_all(now),
            Command::ListInstrument => match pkt.as_bytes().get(FRAME_SIZE) {
                Some(&index) => self.ctx.instrument_manager().notify_single(index, now),
                None => debug!("instrument query without index"),
            },
            _ => {}
        }
    }

    fn relay<C: ControllerRelay>(&self, pkt: &WirePacket, relay: &mut C) {
        if let Err(e) = relay.relay(pkt.as_bytes()) {
            warn!("controller relay failed: {:?}", e);
        }
    }

    /// Periodic work: announce the adapter while in INIT.
    ///
    /// The announce only goes out while a genuine controller is mounted,
    /// at most once per `interval`.
    pub fn poll(&mut self, now: Instant, controller_mounted: bool, interval: Duration) {
        if self.state() != SessionState::Init || !controller_mounted {
            return;
        }
        let due = match self.last_announce {
            None => true,
            Some(last) => now.saturating_duration_since(last) > interval,
        };
        if !due {
            return;
        }

        debug!("announcing");
        match template_packet(self.identity.announce, now) {
            Ok(pkt) => {
                self.ctx.enqueue(&pkt).ok();
            }
            Err(e) => error!("bad announce packet: {:?}", e),
        }
        self.last_announce = Some(now);
    }
}

/// Check for the authentication-success marker.
#[must_use]
pub fn is_auth_success(bytes: &[u8]) -> bool {
    bytes.len() >= FRAME_SIZE
        && Command::from_u8(bytes[0]) == Command::Authenticate
        && bytes[3] == AUTH_SUCCESS_LENGTH
        && bytes.get(3..6) == Some(&AUTH_SUCCESS_MARKER[..])
}
