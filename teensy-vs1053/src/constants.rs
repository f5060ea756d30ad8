/// Number of payload bytes moved per SDI write (size of the chip's DREQ window).
pub const CHUNK_SIZE: usize = 32;

/// SCI (control channel) SPI clock in Hz.
pub const CONTROL_SPI_HZ: u32 = 250_000;

/// SDI (data channel) SPI clock in Hz.
pub const DATA_SPI_HZ: u32 = 8_000_000;

/// Minimum gap between the address and data phases of an SCI read.
pub const READ_SETTLE_US: u32 = 10;

/// Settle time after a hardware or soft reset.
pub const RESET_SETTLE_MS: u32 = 100;

/// SCI_CLOCKF value written after reset (SC_MULT = 3.0x).
pub const DEFAULT_CLOCKF: u16 = 0x6000;

/// Default per-channel attenuation written after reset (0.5 dB steps, 20 dB).
pub const DEFAULT_VOLUME: u8 = 40;
