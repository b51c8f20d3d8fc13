//! Serial MIDI input (5-pin DIN through an opto-isolator).

use embassy_rp::uart::{Async, Config as UartConfig, Error as UartError, UartRx};
use wla_core::MIDI_BAUD_RATE;

/// UART settings for MIDI: 31250 baud, 8N1.
#[must_use]
pub fn midi_uart_config() -> UartConfig {
    let mut config = UartConfig::default();
    config.baudrate = MIDI_BAUD_RATE;
    config
}

/// Raw byte reader on the MIDI UART.
///
/// Running status and message assembly happen in the engine; this only
/// moves bytes.
///
/// # Pins
///
/// Uses UART1:
/// - GPIO 9: RX (MIDI in)
pub struct SerialMidiPort<'d> {
    rx: UartRx<'d, Async>,
}

impl<'d> SerialMidiPort<'d> {
    pub fn new(rx: UartRx<'d, Async>) -> Self {
        Self { rx }
    }

    pub async fn read_byte(&mut self) -> Result<u8, UartError> {
        let mut byte = [0u8; 1];
        self.rx.read(&mut byte).await?;
        Ok(byte[0])
    }
}
