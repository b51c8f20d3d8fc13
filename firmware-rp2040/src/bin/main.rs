#![no_std]
#![no_main]

use defmt::{debug, error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, select4, Either, Either4};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{UART1, USB};
use embassy_rp::uart::Uart;
use embassy_rp::usb::Driver;
use embassy_time::{Duration, Instant, Ticker, Timer};
use embassy_usb::{Builder, Config as UsbConfig};
use static_cell::StaticCell;
use wla_proto::MAX_PACKET_SIZE;
use wla_rp2040::channels::{CONSOLE_RX, CONTEXT, CONTROLLER_RELAY, HOST_EVENTS, MIDI_BYTES};
use wla_rp2040::console::BUS_RESET;
use wla_rp2040::identity::IDENTITY;
use wla_rp2040::{
    configure_console, midi_uart_config, Adapter, ConsoleHandler, ConsoleReader, PacketPump,
    SerialMidiPort, SessionState, UsbConsoleLink, DEFAULT_CONFIG,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// Adapter poll period (INIT announce, drum release and output, link timeouts).
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Sender back-off when there is nothing to send.
const SENDER_IDLE: Duration = Duration::from_millis(1);

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

static HANDLER: StaticCell<ConsoleHandler> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Wireless legacy adapter starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Serial MIDI Setup ---
    let uart = Uart::new(
        p.UART1,
        p.PIN_8, // TX
        p.PIN_9, // RX
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        midi_uart_config(),
    );
    let (_tx, rx) = uart.split();
    let midi_port = SerialMidiPort::new(rx);

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(0x0738, 0x4164);
    usb_config.manufacturer = Some("Mad Catz");
    usb_config.product = Some("Wireless Legacy Adapter");
    usb_config.serial_number = Some("001");
    usb_config.max_power = 500;
    usb_config.max_packet_size_0 = 64;
    usb_config.device_class = 0xff;
    usb_config.device_sub_class = 0x47;
    usb_config.device_protocol = 0xd0;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );
    builder.handler(HANDLER.init(ConsoleHandler));

    let (link, reader) = configure_console(&mut builder);

    // Build the USB device
    let usb_device = builder.build();

    // On-board LED: lit while the session runs
    let led = Output::new(p.PIN_25, Level::Low);

    // Spawn tasks (unwrap the SpawnToken, then spawn)
    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(console_rx_task(reader).unwrap());
    spawner.spawn(serial_midi_task(midi_port).unwrap());
    spawner.spawn(adapter_task(led).unwrap());
    spawner.spawn(sender_task(link).unwrap());

    info!("Wireless legacy adapter initialized, waiting for the console...");
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) {
    device.run().await;
}

/// Console RX task - forwards console packets to the adapter task.
#[embassy_executor::task]
async fn console_rx_task(mut reader: ConsoleReader<'static>) {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(n) => match CONTEXT.console_frame(&buf[..n]) {
                Ok(frame) => CONSOLE_RX.send(frame).await,
                Err(e) => warn!("console packet: {:?}", e),
            },
            Err(e) => debug!("console read: {:?}", e),
        }
    }
}

/// Serial MIDI task - moves UART bytes to the adapter task.
#[embassy_executor::task]
async fn serial_midi_task(mut port: SerialMidiPort<'static>) {
    loop {
        match port.read_byte().await {
            Ok(byte) => MIDI_BYTES.send(byte).await,
            Err(e) => error!("MIDI UART error: {:?}", e),
        }
    }
}

/// Adapter task - owns the engine and applies every input to it.
#[embassy_executor::task]
async fn adapter_task(mut led: Output<'static>) {
    let mut adapter = Adapter::new(&CONTEXT, IDENTITY, DEFAULT_CONFIG);
    let mut relay = CONTROLLER_RELAY.sender();
    let mut ticker = Ticker::every(POLL_INTERVAL);

    adapter.start();

    loop {
        let input = select(
            BUS_RESET.wait(),
            select4(
                CONSOLE_RX.receive(),
                HOST_EVENTS.receive(),
                MIDI_BYTES.receive(),
                ticker.next(),
            ),
        )
        .await;
        let now = Instant::now();

        match input {
            Either::First(()) => adapter.on_bus_reset(),
            // frames read before a bus reset are dropped by their epoch
            Either::Second(Either4::First(frame)) => {
                if let Err(e) = adapter.on_console_frame(&frame, now, &mut relay) {
                    debug!("console packet rejected: {:?}", e);
                }
            }
            Either::Second(Either4::Second(event)) => {
                if let Err(e) = adapter.on_host_event(event, now, &mut relay) {
                    debug!("host event rejected: {:?}", e);
                }
            }
            Either::Second(Either4::Third(byte)) => adapter.on_serial_midi_byte(byte, now),
            Either::Second(Either4::Fourth(())) => adapter.poll(now),
        }

        let running = adapter.state() == SessionState::Running;
        led.set_level(if running { Level::High } else { Level::Low });
    }
}

/// Sender task - drains the outbound queue into the console.
#[embassy_executor::task]
async fn sender_task(mut link: UsbConsoleLink<'static>) {
    let mut pump = PacketPump::new(&CONTEXT, DEFAULT_CONFIG.on_delay);

    loop {
        match pump.service(&mut link, Instant::now()).await {
            Ok(true) => {}
            Ok(false) => Timer::after(SENDER_IDLE).await,
            Err(e) => {
                debug!("send failed: {:?}", e);
                Timer::after(SENDER_IDLE).await;
            }
        }
    }
}
