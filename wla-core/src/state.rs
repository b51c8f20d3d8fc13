//! Session state and its shared cell.

use portable_atomic::{AtomicU8, Ordering};

/// Console handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SessionState {
    /// Before bring-up, or in the middle of a bus reset.
    None = 0,
    /// Announcing, waiting for the console to ask for identification.
    Init = 1,
    Identifying = 2,
    /// Authentication traffic is relayed to the controller.
    Authenticating = 3,
    Running = 4,
    /// Defined for deep-sleep support; no transition enters it yet.
    PowerOff = 5,
}

impl SessionState {
    #[must_use]
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SessionState::Init,
            2 => SessionState::Identifying,
            3 => SessionState::Authenticating,
            4 => SessionState::Running,
            5 => SessionState::PowerOff,
            _ => SessionState::None,
        }
    }
}

/// Session state readable from any context.
///
/// Only the session state machine writes it; translators and the instrument
/// manager read it to gate their side effects.
pub struct SessionCell {
    state: AtomicU8,
}

impl SessionCell {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::None as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.get() == SessionState::Running
    }
}

impl Default for SessionCell {
    fn default() -> Self {
        Self::new()
    }
}
