//! Console-facing USB interface.
//!
//! One vendor-specific interface (class 0xFF, subclass 0x47, protocol 0xD0)
//! with a 64-byte interrupt endpoint pair. The IN endpoint carries the
//! outbound queue, the OUT endpoint delivers console packets.

use defmt::{info, warn};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_usb::driver::{Endpoint, EndpointError, EndpointIn, EndpointOut};
use embassy_usb::{Builder, Handler};
use portable_atomic::{AtomicBool, Ordering};
use wla_core::{ConsoleLink, LinkError};
use wla_proto::MAX_PACKET_SIZE;

pub const INTERFACE_CLASS: u8 = 0xff;
pub const INTERFACE_SUBCLASS: u8 = 0x47;
pub const INTERFACE_PROTOCOL: u8 = 0xd0;

type UsbDriver<'d> = Driver<'d, USB>;
type ConsoleIn<'d> = <UsbDriver<'d> as embassy_usb::driver::Driver<'d>>::EndpointIn;
type ConsoleOut<'d> = <UsbDriver<'d> as embassy_usb::driver::Driver<'d>>::EndpointOut;

/// Raised by the USB stack on every bus reset.
pub static BUS_RESET: Signal<CriticalSectionRawMutex, ()> = Signal::new();

static CONFIGURED: AtomicBool = AtomicBool::new(false);

/// USB device state handler.
pub struct ConsoleHandler;

impl Handler for ConsoleHandler {
    fn reset(&mut self) {
        warn!("USB bus reset");
        CONFIGURED.store(false, Ordering::Release);
        BUS_RESET.signal(());
    }

    fn configured(&mut self, configured: bool) {
        info!("USB configured: {}", configured);
        CONFIGURED.store(configured, Ordering::Release);
    }
}

/// Add the console interface to the USB builder.
pub fn configure_console<'d>(
    builder: &mut Builder<'d, UsbDriver<'d>>,
) -> (UsbConsoleLink<'d>, ConsoleReader<'d>) {
    let mut function = builder.function(INTERFACE_CLASS, INTERFACE_SUBCLASS, INTERFACE_PROTOCOL);
    let mut interface = function.interface();
    let mut alt =
        interface.alt_setting(INTERFACE_CLASS, INTERFACE_SUBCLASS, INTERFACE_PROTOCOL, None);
    let ep_in = alt.endpoint_interrupt_in(None, MAX_PACKET_SIZE as u16, 1);
    let ep_out = alt.endpoint_interrupt_out(None, MAX_PACKET_SIZE as u16, 1);

    (UsbConsoleLink { ep: ep_in }, ConsoleReader { ep: ep_out })
}

/// Console link over the IN endpoint.
pub struct UsbConsoleLink<'d> {
    ep: ConsoleIn<'d>,
}

impl ConsoleLink for UsbConsoleLink<'_> {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.ep.write(bytes).await.map_err(link_error)
    }

    fn is_ready(&self) -> bool {
        CONFIGURED.load(Ordering::Acquire)
    }
}

/// Console packets from the OUT endpoint.
pub struct ConsoleReader<'d> {
    ep: ConsoleOut<'d>,
}

impl ConsoleReader<'_> {
    /// Read the next packet into `buf`, waiting for the interface to come up.
    pub async fn read(&mut self, buf: &mut [u8; MAX_PACKET_SIZE]) -> Result<usize, LinkError> {
        self.ep.wait_enabled().await;
        self.ep.read(buf).await.map_err(link_error)
    }
}

fn link_error(e: EndpointError) -> LinkError {
    match e {
        EndpointError::Disabled => LinkError::NotReady,
        EndpointError::BufferOverflow => LinkError::Io,
    }
}
