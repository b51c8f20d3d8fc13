//! Compile-time adapter configuration.
//!
//! Customize by creating your own const and passing it to
//! [`Adapter::new`](crate::Adapter::new).

use embassy_time::Duration;

/// Timing and threshold parameters of the input translators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Note-on velocities at or below this value are ignored.
    pub velocity_threshold: u8,
    /// How long a drum output stays pressed after a hit.
    pub trigger_hold: Duration,
    /// Minimum time between two drum input packets.
    pub output_interval: Duration,
    /// Minimum age of a queued packet before the sender may transmit it.
    pub on_delay: Duration,
    /// Announce period while waiting for the console in INIT.
    pub announce_interval: Duration,
    /// Serial kit silence after which it counts as unplugged, once it has
    /// been seen sending Active Sensing.
    pub active_sense_timeout: Duration,
    /// Serial kit silence after which it counts as unplugged otherwise.
    pub idle_timeout: Duration,
}

/// Default configuration.
///
/// - velocity threshold: 10
/// - trigger hold: 40 ms
/// - output interval: 5 ms
/// - on-delay: none
/// - announce interval: 1 s
/// - active sense timeout: 1 s
/// - idle timeout: 90 s
pub const DEFAULT_CONFIG: AdapterConfig = AdapterConfig {
    velocity_threshold: 10,
    trigger_hold: Duration::from_millis(40),
    output_interval: Duration::from_millis(5),
    on_delay: Duration::from_millis(0),
    announce_interval: Duration::from_millis(1000),
    active_sense_timeout: Duration::from_secs(1),
    idle_timeout: Duration::from_millis(90_000),
};

impl Default for AdapterConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

/// Serial MIDI baud rate.
pub const MIDI_BAUD_RATE: u32 = 31_250;
