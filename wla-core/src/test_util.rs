//! Helpers shared by the unit tests.

extern crate std;

use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, Waker};
use std::vec::Vec;

use crate::host::ControllerWriter;
use crate::session::RelayError;

/// Poll a future that never waits. The mocks complete immediately, so a
/// `Pending` means the code under test blocked on something it should not.
pub fn block_on<F: Future>(f: F) -> F::Output {
    let mut f = pin!(f);
    let mut cx = Context::from_waker(Waker::noop());
    match f.as_mut().poll(&mut cx) {
        Poll::Ready(output) => output,
        Poll::Pending => panic!("future blocked"),
    }
}

/// Records every write as `(address, instance, bytes)`.
#[derive(Default)]
pub struct MockWriter {
    pub written: Vec<(u8, u8, Vec<u8>)>,
}

impl ControllerWriter for MockWriter {
    fn write(&mut self, address: u8, instance: u8, bytes: &[u8]) -> Result<(), RelayError> {
        self.written.push((address, instance, bytes.to_vec()));
        Ok(())
    }
}
