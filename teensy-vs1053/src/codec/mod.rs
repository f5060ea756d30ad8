//! VS1053 decoder driver module.
//!
//! [`Vs1053`] owns the SPI bus, both chip selects, the optional reset line,
//! the DREQ input and a delay provider. It frames SCI register access and SDI
//! payload writes and implements the reset / clock / volume lifecycle.
//!
//! The pin helper types here fill the gaps between plain `embedded-hal` pins
//! and what the driver needs: [`NoPin`] for a board without a reset line, and
//! [`Polled`] for a DREQ input that has no interrupt wiring.

use core::convert::Infallible;

use embedded_hal::digital::{self, InputPin, OutputPin};

pub mod registers;
mod vs1053;

pub use registers::{status_version, SCI_READ, SCI_WRITE};
pub use vs1053::Vs1053;

// ── DREQ interrupt seam ────────────────────────────────────────────────────

/// Pin-change condition that raises the DREQ interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// Level low.
    Low,
    /// Level high.
    High,
    /// Low-to-high transition.
    RisingEdge,
    /// High-to-low transition.
    FallingEdge,
    /// Any transition.
    EitherEdge,
}

/// GPIO input that can raise an interrupt, shaped after the i.MX RT GPIO HAL.
///
/// The codec calls `set_interrupt_enable(false)` at the start of every bus
/// transaction once the interrupt is attached, and `true` at the end, so the
/// handler can never fire in the middle of a frame.
pub trait EdgeInterrupt {
    /// Select the condition that raises the interrupt.
    fn set_interrupt_config(&mut self, trigger: Trigger);

    /// Enable or mask the interrupt.
    fn set_interrupt_enable(&mut self, enable: bool);
}

/// DREQ input without interrupt wiring. Interrupt calls are ignored.
#[derive(Debug)]
pub struct Polled<P>(pub P);

impl<P: digital::ErrorType> digital::ErrorType for Polled<P> {
    type Error = P::Error;
}

impl<P: InputPin> InputPin for Polled<P> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }
}

impl<P> EdgeInterrupt for Polled<P> {
    fn set_interrupt_config(&mut self, _trigger: Trigger) {}

    fn set_interrupt_enable(&mut self, _enable: bool) {}
}

/// Placeholder for an unconnected reset line (pass `None::<NoPin>`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl digital::ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// ── Volume ─────────────────────────────────────────────────────────────────

/// Per-channel attenuation in 0.5 dB steps. Lower is louder; `0` is full
/// scale and `0xFE` is silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Volume {
    /// Left channel attenuation.
    pub left: u8,
    /// Right channel attenuation.
    pub right: u8,
}

impl Volume {
    /// Loudest setting.
    pub const MAX: Volume = Volume::both(0x00);

    /// Quietest setting short of analog power-down.
    pub const SILENT: Volume = Volume::both(0xFE);

    /// Same attenuation on both channels.
    pub const fn both(value: u8) -> Self {
        Volume {
            left: value,
            right: value,
        }
    }

    /// Pack into an SCI_VOL value: left in the high byte, right in the low byte.
    pub const fn to_register(self) -> u16 {
        ((self.left as u16) << 8) | self.right as u16
    }

    /// Unpack an SCI_VOL value.
    pub const fn from_register(value: u16) -> Self {
        Volume {
            left: (value >> 8) as u8,
            right: value as u8,
        }
    }

    /// Attenuation for a linear gain (0.0 = silent, 1.0 = full scale).
    pub fn from_gain(gain: f32) -> Self {
        Volume::both(Self::gain_to_steps(gain))
    }

    /// Convert a linear gain into 0.5 dB attenuation steps.
    pub(crate) fn gain_to_steps(gain: f32) -> u8 {
        if gain.is_nan() || gain <= 0.0 {
            return 0xFE;
        }
        if gain >= 1.0 {
            return 0x00;
        }
        let db = -20.0 * libm::log10f(gain);
        let steps = (db * 2.0 + 0.5) as u32;
        steps.min(0xFE) as u8
    }
}
