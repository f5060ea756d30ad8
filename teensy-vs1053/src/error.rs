//! Error types.
//!
//! Device-level operations (register access, payload writes, reset) fail with
//! [`BusError`]. Playback operations add the track-related and scheduling
//! failures in [`Error`].

use embedded_hal::{digital, spi};

/// Failure of an SPI transfer or a GPIO line.
///
/// HAL errors are reduced to their [`ErrorKind`](spi::ErrorKind) so a single
/// type covers chip selects, reset, DREQ and the bus regardless of their
/// concrete HAL types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The SPI bus failed to complete a transfer.
    #[error("SPI error: {0:?}")]
    Spi(spi::ErrorKind),
    /// A chip-select, reset or DREQ line could not be driven or read.
    #[error("GPIO error: {0:?}")]
    Pin(digital::ErrorKind),
}

impl BusError {
    pub(crate) fn spi<E: spi::Error>(err: E) -> Self {
        BusError::Spi(err.kind())
    }

    pub(crate) fn pin<E: digital::Error>(err: E) -> Self {
        BusError::Pin(err.kind())
    }
}

/// Playback error, generic over the track's I/O error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<TE> {
    /// Bus or GPIO failure while talking to the chip.
    #[error(transparent)]
    Bus(#[from] BusError),
    /// The track handle handed to `play` is not open.
    #[error("track is not open")]
    TrackUnavailable,
    /// The track source failed to open or read the track.
    #[error("track I/O error: {0:?}")]
    Track(TE),
    /// DREQ never went high within the configured timeout.
    #[error("decoder not ready for data")]
    NotReady,
    /// Another execution context currently holds the player.
    #[error("player is busy in another context")]
    Busy,
    /// A player is already bound to the DREQ interrupt.
    #[error("DREQ interrupt already bound")]
    AlreadyBound,
}
