//! Driver configuration.

use crate::bus::BusSettings;
use crate::codec::Volume;
use crate::constants::{DEFAULT_CLOCKF, DEFAULT_VOLUME, RESET_SETTLE_MS};

/// Tunables for [`Vs1053`](crate::codec::Vs1053).
///
/// The defaults reproduce the Adafruit Music Maker setup on a Teensy 4.1:
/// 250 kHz SCI, 8 MHz SDI, 3.0x clock multiplier and -20 dB on both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Bus settings for SCI (register) transactions.
    pub control: BusSettings,
    /// Bus settings for SDI (payload) transactions.
    pub data: BusSettings,
    /// Value written to SCI_CLOCKF during [`reset`](crate::codec::Vs1053::reset).
    pub clock_multiplier: u16,
    /// Volume written during reset.
    pub volume: Volume,
    /// Delay after each reset step, in milliseconds.
    pub reset_settle_ms: u32,
    /// Upper bound on the DREQ wait when starting background playback.
    pub ready_timeout_us: u32,
    /// Poll interval of that wait.
    pub ready_poll_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            control: BusSettings::CONTROL,
            data: BusSettings::DATA,
            clock_multiplier: DEFAULT_CLOCKF,
            volume: Volume::both(DEFAULT_VOLUME),
            reset_settle_ms: RESET_SETTLE_MS,
            ready_timeout_us: 1_000_000,
            ready_poll_us: 100,
        }
    }
}

impl Config {
    /// Number of DREQ polls that fit in the ready timeout (at least one).
    pub fn ready_polls(&self) -> u32 {
        if self.ready_poll_us == 0 {
            return 1;
        }
        (self.ready_timeout_us / self.ready_poll_us).max(1)
    }
}
