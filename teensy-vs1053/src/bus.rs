//! SPI transaction settings and the bus seam used by the codec.
//!
//! The VS1053 shares one SPI bus between two channels that want different
//! clock rates: SCI register access is limited to CLKI/7 before the clock
//! multiplier is set, while SDI payload writes run much faster. Every access
//! therefore opens a transaction with its own [`BusSettings`], the same way
//! the Arduino `SPI.beginTransaction()` API works on the Teensy.

use embedded_hal::spi::{ErrorType, Mode, SpiBus, MODE_0};

use crate::constants::{CONTROL_SPI_HZ, DATA_SPI_HZ};

/// Bit order on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first (the only order the VS1053 accepts).
    MsbFirst,
    /// Least significant bit first.
    LsbFirst,
}

/// Clock rate, bit order and mode for one bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSettings {
    /// SCK frequency in Hz.
    pub frequency: u32,
    /// Clock polarity / phase.
    pub mode: Mode,
    /// Bit order.
    pub bit_order: BitOrder,
}

impl BusSettings {
    /// SCI (register) transactions.
    pub const CONTROL: BusSettings = BusSettings {
        frequency: CONTROL_SPI_HZ,
        mode: MODE_0,
        bit_order: BitOrder::MsbFirst,
    };

    /// SDI (payload) transactions.
    pub const DATA: BusSettings = BusSettings {
        frequency: DATA_SPI_HZ,
        mode: MODE_0,
        bit_order: BitOrder::MsbFirst,
    };
}

/// An SPI bus that can be reconfigured per transaction.
///
/// `begin_transaction` applies `settings` and claims the bus;
/// `end_transaction` releases it. The codec brackets every register access
/// and every payload chunk with this pair and drives its own chip selects
/// inside the bracket.
pub trait SpiTransactions: SpiBus<u8> {
    /// Apply `settings` and claim the bus.
    fn begin_transaction(&mut self, settings: &BusSettings) -> Result<(), Self::Error>;

    /// Release the bus.
    fn end_transaction(&mut self) -> Result<(), Self::Error>;
}

/// Adapter for a bus whose clock is configured once by the platform.
///
/// Transactions become no-ops; everything else is delegated. Useful when the
/// board support crate hands out an [`SpiBus`] already fixed at a rate both
/// channels can live with (e.g. 2 MHz after the clock multiplier is set).
#[derive(Debug)]
pub struct FixedClock<SPI>(pub SPI);

impl<SPI> FixedClock<SPI> {
    /// Release the wrapped bus.
    pub fn into_inner(self) -> SPI {
        self.0
    }
}

impl<SPI: ErrorType> ErrorType for FixedClock<SPI> {
    type Error = SPI::Error;
}

impl<SPI: SpiBus<u8>> SpiBus<u8> for FixedClock<SPI> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.0.read(words)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.0.write(words)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.0.transfer(read, write)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.0.transfer_in_place(words)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()
    }
}

impl<SPI: SpiBus<u8>> SpiTransactions for FixedClock<SPI> {
    fn begin_transaction(&mut self, _settings: &BusSettings) -> Result<(), Self::Error> {
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
