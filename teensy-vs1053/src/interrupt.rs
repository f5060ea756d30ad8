//! DREQ interrupt adapter.
//!
//! The platform addresses interrupt handlers by GPIO line, not by object, so
//! the player that should be fed is recorded in a process-wide binding. One
//! player can be bound, once; there is no rebinding.
//!
//! The board's GPIO ISR for the DREQ pin acknowledges the pin's status flag
//! and then calls [`on_data_request`]:
//!
//! ```ignore
//! #[interrupt]
//! fn GPIO1_COMBINED_16_31() {
//!     dreq_pin.clear_triggered();
//!     teensy_vs1053::interrupt::on_data_request();
//! }
//! ```

use core::cell::Cell;

use critical_section::Mutex;

use crate::error::Error;
use crate::playback::{StreamSink, Track, Vs1053Player};

/// Something to notify when DREQ changes level.
pub trait DataRequestHandler: Sync {
    /// Called from interrupt context. Must not block.
    fn on_data_request(&self);
}

impl<C, T> DataRequestHandler for Vs1053Player<C, T>
where
    C: StreamSink + Send,
    T: Track + Send,
{
    fn on_data_request(&self) {
        if self.feed().is_err() {
            // Nobody to report to from an ISR; the next edge or foreground
            // call sees the resulting state.
            #[cfg(feature = "defmt")]
            defmt::warn!("feed from DREQ interrupt failed");
        }
    }
}

static BINDING: Mutex<Cell<Option<&'static dyn DataRequestHandler>>> = Mutex::new(Cell::new(None));

/// Bind `player` to the DREQ interrupt.
///
/// Arms the decoder's DREQ input for either-edge interrupts, makes every
/// subsequent bus transaction mask that interrupt while it runs, and switches
/// [`Vs1053Player::play`] to background mode.
///
/// Fails with [`Error::AlreadyBound`] if a player is already bound, or with
/// the error from arming the pin (the binding is then released again).
pub fn bind<C, T>(player: &'static Vs1053Player<C, T>) -> Result<(), Error<T::Error>>
where
    C: StreamSink + Send + 'static,
    T: Track + Send + 'static,
{
    let claimed = critical_section::with(|cs| {
        let slot = BINDING.borrow(cs);
        if slot.get().is_some() {
            return false;
        }
        slot.set(Some(player));
        true
    });
    if !claimed {
        return Err(Error::AlreadyBound);
    }

    if let Err(e) = player.attach_interrupt() {
        critical_section::with(|cs| BINDING.borrow(cs).set(None));
        return Err(e);
    }

    #[cfg(feature = "defmt")]
    defmt::info!("DREQ interrupt bound");
    Ok(())
}

/// Whether a player is bound.
pub fn is_bound() -> bool {
    critical_section::with(|cs| BINDING.borrow(cs).get().is_some())
}

/// Entry point for the DREQ GPIO interrupt: feed the bound player.
///
/// Does nothing when no player is bound. The feed itself runs outside the
/// critical section.
pub fn on_data_request() {
    let handler = critical_section::with(|cs| BINDING.borrow(cs).get());
    if let Some(handler) = handler {
        handler.on_data_request();
    }
}

/// Forget the binding so the next test can bind its own player.
#[cfg(test)]
pub(crate) fn unbind() {
    critical_section::with(|cs| BINDING.borrow(cs).set(None));
}
