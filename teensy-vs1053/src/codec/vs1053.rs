//! VS1053 decoder driver.
//!
//! Generic over an [`SpiTransactions`] bus, two [`OutputPin`] chip selects
//! (XCS for SCI, XDCS for SDI), an optional [`OutputPin`] reset line, the
//! DREQ [`InputPin`] and a [`DelayNs`] provider.
//!
//! # Example
//!
//! ```ignore
//! let mut codec = Vs1053::new(spi, xcs, xdcs, None::<NoPin>, Polled(dreq), delay);
//! let version = codec.begin()?;   // SS_VER nibble, 4 on a VS1053
//! codec.set_volume(20, 20)?;      // -10 dB both channels
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::registers as reg;
use super::{EdgeInterrupt, Trigger, Volume};
use crate::bus::{BusSettings, SpiTransactions};
use crate::config::Config;
use crate::constants::{CHUNK_SIZE, READ_SETTLE_US};
use crate::control::AudioControl;
use crate::error::{BusError, Error};
use crate::playback::{StreamSink, Track};

/// Which of the two chip channels a transaction addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    /// SCI, selected by XCS.
    Control,
    /// SDI, selected by XDCS.
    Data,
}

// ── Bus framing ────────────────────────────────────────────────────────────

/// Run `body` inside a bus transaction with `cs` asserted.
///
/// Chip select and the transaction are released even if `body` fails. With
/// `masked` set the DREQ interrupt is disabled for the whole bracket.
fn framed<SPI, CS, DREQ, D, R>(
    spi: &mut SPI,
    cs: &mut CS,
    dreq: &mut DREQ,
    delay: &mut D,
    settings: &BusSettings,
    masked: bool,
    body: impl FnOnce(&mut SPI, &mut D) -> Result<R, SPI::Error>,
) -> Result<R, BusError>
where
    SPI: SpiTransactions,
    CS: OutputPin,
    DREQ: EdgeInterrupt,
{
    if masked {
        dreq.set_interrupt_enable(false);
    }
    let result = bracket(spi, cs, delay, settings, body);
    if masked {
        dreq.set_interrupt_enable(true);
    }
    result
}

fn bracket<SPI, CS, D, R>(
    spi: &mut SPI,
    cs: &mut CS,
    delay: &mut D,
    settings: &BusSettings,
    body: impl FnOnce(&mut SPI, &mut D) -> Result<R, SPI::Error>,
) -> Result<R, BusError>
where
    SPI: SpiTransactions,
    CS: OutputPin,
{
    spi.begin_transaction(settings).map_err(BusError::spi)?;

    // Chip selects are active low.
    let result = match cs.set_low().map_err(BusError::pin) {
        Ok(()) => body(spi, delay).map_err(BusError::spi),
        Err(e) => Err(e),
    };
    let deselected = cs.set_high().map_err(BusError::pin);
    let ended = spi.end_transaction().map_err(BusError::spi);

    let value = result?;
    deselected?;
    ended?;
    Ok(value)
}

// ── Driver struct ──────────────────────────────────────────────────────────

/// VS1053 decoder driver.
pub struct Vs1053<SPI, XCS, XDCS, RST, DREQ, D> {
    spi: SPI,
    xcs: XCS,
    xdcs: XDCS,
    reset: Option<RST>,
    dreq: DREQ,
    delay: D,
    config: Config,
    /// DREQ interrupt armed; mask it for the duration of every transaction.
    interrupt_attached: bool,
    /// Scratch space for one chunk on its way from the track to the chip.
    buffer: [u8; CHUNK_SIZE],
}

impl<SPI, XCS, XDCS, RST, DREQ, D> Vs1053<SPI, XCS, XDCS, RST, DREQ, D>
where
    SPI: SpiTransactions,
    XCS: OutputPin,
    XDCS: OutputPin,
    RST: OutputPin,
    DREQ: InputPin + EdgeInterrupt,
    D: DelayNs,
{
    /// Create a driver with the default [`Config`].
    ///
    /// Pass `None` for `reset` when XRST is tied high on the board.
    pub fn new(spi: SPI, xcs: XCS, xdcs: XDCS, reset: Option<RST>, dreq: DREQ, delay: D) -> Self {
        Self::with_config(spi, xcs, xdcs, reset, dreq, delay, Config::default())
    }

    /// Create a driver with an explicit [`Config`].
    #[allow(clippy::too_many_arguments)]
    pub fn with_config(
        spi: SPI,
        xcs: XCS,
        xdcs: XDCS,
        reset: Option<RST>,
        dreq: DREQ,
        delay: D,
        config: Config,
    ) -> Self {
        Self {
            spi,
            xcs,
            xdcs,
            reset,
            dreq,
            delay,
            config,
            interrupt_attached: false,
            buffer: [0; CHUNK_SIZE],
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the driver and return the owned peripherals.
    pub fn release(self) -> (SPI, XCS, XDCS, Option<RST>, DREQ, D) {
        (self.spi, self.xcs, self.xdcs, self.reset, self.dreq, self.delay)
    }

    // ── Bus framing ────────────────────────────────────────────────────

    /// Run `body` inside a bus transaction with `channel` selected.
    fn transaction<R>(
        &mut self,
        channel: Channel,
        body: impl FnOnce(&mut SPI, &mut D) -> Result<R, SPI::Error>,
    ) -> Result<R, BusError> {
        let masked = self.interrupt_attached;
        match channel {
            Channel::Control => {
                let settings = self.config.control;
                let cs = &mut self.xcs;
                framed(&mut self.spi, cs, &mut self.dreq, &mut self.delay, &settings, masked, body)
            }
            Channel::Data => {
                let settings = self.config.data;
                let cs = &mut self.xdcs;
                framed(&mut self.spi, cs, &mut self.dreq, &mut self.delay, &settings, masked, body)
            }
        }
    }

    // ── SCI register protocol ──────────────────────────────────────────

    /// Read a 16-bit SCI register.
    ///
    /// Frame: `[0x03, address]`, at least 10 µs of settle time, then two
    /// bytes clocked back MSB first. The chip gives no acknowledgement; an
    /// unpowered chip reads as whatever the bus floats to.
    pub fn read_register(&mut self, address: u8) -> Result<u16, BusError> {
        self.transaction(Channel::Control, |spi, delay| {
            spi.write(&[reg::SCI_READ, address])?;
            spi.flush()?;
            delay.delay_us(READ_SETTLE_US);
            let mut value = [0u8; 2];
            spi.read(&mut value)?;
            Ok(u16::from_be_bytes(value))
        })
    }

    /// Write a 16-bit SCI register. Frame: `[0x02, address, high, low]`.
    pub fn write_register(&mut self, address: u8, value: u16) -> Result<(), BusError> {
        let [high, low] = value.to_be_bytes();
        self.transaction(Channel::Control, |spi, _| {
            spi.write(&[reg::SCI_WRITE, address, high, low])?;
            spi.flush()
        })
    }

    /// Write `value` to chip RAM at `address` (SCI_WRAMADDR, then SCI_WRAM).
    pub fn write_wram(&mut self, address: u16, value: u16) -> Result<(), BusError> {
        self.write_register(reg::SCI_WRAMADDR, address)?;
        self.write_register(reg::SCI_WRAM, value)
    }

    /// Read chip RAM at `address`.
    pub fn read_wram(&mut self, address: u16) -> Result<u16, BusError> {
        self.write_register(reg::SCI_WRAMADDR, address)?;
        self.read_register(reg::SCI_WRAM)
    }

    // ── SDI payload protocol ───────────────────────────────────────────

    /// Write one chunk of encoded audio (at most [`CHUNK_SIZE`] bytes).
    ///
    /// The caller is responsible for checking [`ready_for_data`](Self::ready_for_data)
    /// first; DREQ high guarantees room for exactly one chunk.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), BusError> {
        debug_assert!(chunk.len() <= CHUNK_SIZE, "chunk larger than the DREQ window");
        self.transaction(Channel::Data, |spi, _| {
            spi.write(chunk)?;
            spi.flush()
        })
    }

    /// DREQ level: `true` while the decoder FIFO has room for a chunk.
    pub fn ready_for_data(&mut self) -> Result<bool, BusError> {
        self.dreq.is_high().map_err(BusError::pin)
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Bring the chip up and return the SS_VER nibble of SCI_STATUS.
    ///
    /// Drives XRST low (when present) and both chip selects high, then runs
    /// [`reset`](Self::reset). The version is returned as-is (4 for a VS1053,
    /// 3 for a VS1003); judging it is up to the caller.
    pub fn begin(&mut self) -> Result<u8, BusError> {
        if let Some(reset) = self.reset.as_mut() {
            reset.set_low().map_err(BusError::pin)?;
        }
        self.xcs.set_high().map_err(BusError::pin)?;
        self.xdcs.set_high().map_err(BusError::pin)?;

        self.reset()?;

        let version = self.version()?;
        #[cfg(feature = "defmt")]
        defmt::info!("VS10xx up, SS_VER={=u8}", version);
        Ok(version)
    }

    /// Hardware reset (if XRST is wired) followed by a soft reset, clock
    /// multiplier and default volume.
    pub fn reset(&mut self) -> Result<(), BusError> {
        let settle = self.config.reset_settle_ms;

        if let Some(reset) = self.reset.as_mut() {
            reset.set_low().map_err(BusError::pin)?;
            self.delay.delay_ms(settle);
            reset.set_high().map_err(BusError::pin)?;
        }
        self.xcs.set_high().map_err(BusError::pin)?;
        self.xdcs.set_high().map_err(BusError::pin)?;
        self.delay.delay_ms(settle);

        self.soft_reset()?;
        self.delay.delay_ms(settle);

        self.write_register(reg::SCI_CLOCKF, self.config.clock_multiplier)?;
        let volume = self.config.volume;
        self.write_volume(volume)
    }

    /// Soft reset: SCI_MODE = SM_SDINEW | SM_RESET, then wait for the chip.
    pub fn soft_reset(&mut self) -> Result<(), BusError> {
        self.write_register(reg::SCI_MODE, reg::SM_SDINEW | reg::SM_RESET)?;
        self.delay.delay_ms(self.config.reset_settle_ms);
        Ok(())
    }

    // ── Volume ─────────────────────────────────────────────────────────

    /// Set attenuation per channel in 0.5 dB steps (0 = loudest, 0xFE = silent).
    pub fn set_volume(&mut self, left: u8, right: u8) -> Result<(), BusError> {
        self.write_volume(Volume { left, right })
    }

    /// Same attenuation on both channels.
    pub fn set_volume_both(&mut self, value: u8) -> Result<(), BusError> {
        self.write_volume(Volume::both(value))
    }

    /// Read back SCI_VOL.
    pub fn current_volume(&mut self) -> Result<Volume, BusError> {
        self.read_register(reg::SCI_VOL).map(Volume::from_register)
    }

    fn write_volume(&mut self, volume: Volume) -> Result<(), BusError> {
        self.write_register(reg::SCI_VOL, volume.to_register())
    }

    // ── Status / diagnostics ───────────────────────────────────────────

    /// Raw SCI_STATUS.
    pub fn status(&mut self) -> Result<u16, BusError> {
        self.read_register(reg::SCI_STATUS)
    }

    /// SS_VER field of SCI_STATUS.
    pub fn version(&mut self) -> Result<u8, BusError> {
        self.status().map(reg::status_version)
    }

    /// Seconds decoded in the current stream (SCI_DECODE_TIME).
    pub fn decode_time(&mut self) -> Result<u16, BusError> {
        self.read_register(reg::SCI_DECODE_TIME)
    }

    /// Playback speed multiplier (0 or 1 = normal).
    pub fn play_speed(&mut self) -> Result<u16, BusError> {
        self.read_wram(reg::PARA_PLAY_SPEED)
    }

    /// Set playback speed 1..=4x. Anything outside that range selects 1x.
    pub fn set_play_speed(&mut self, speed: u16) -> Result<(), BusError> {
        let speed = if (1..=4).contains(&speed) { speed } else { 1 };
        self.write_wram(reg::PARA_PLAY_SPEED, speed)
    }
}

// ── StreamSink implementation ──────────────────────────────────────────────

impl<SPI, XCS, XDCS, RST, DREQ, D> StreamSink for Vs1053<SPI, XCS, XDCS, RST, DREQ, D>
where
    SPI: SpiTransactions,
    XCS: OutputPin,
    XDCS: OutputPin,
    RST: OutputPin,
    DREQ: InputPin + EdgeInterrupt,
    D: DelayNs,
{
    fn ready_for_data(&mut self) -> Result<bool, BusError> {
        Vs1053::ready_for_data(self)
    }

    fn stream_chunk<T: Track>(&mut self, track: &mut T) -> Result<usize, Error<T::Error>> {
        let len = track.read(&mut self.buffer).map_err(Error::Track)?.min(CHUNK_SIZE);
        if len == 0 {
            return Ok(0);
        }
        // Field-wise borrows so the chunk goes out straight from the buffer.
        let chunk = &self.buffer[..len];
        framed(
            &mut self.spi,
            &mut self.xdcs,
            &mut self.dreq,
            &mut self.delay,
            &self.config.data,
            self.interrupt_attached,
            |spi, _| {
                spi.write(chunk)?;
                spi.flush()
            },
        )?;
        Ok(len)
    }

    fn wait_ready(&mut self) -> Result<bool, BusError> {
        let poll_us = self.config.ready_poll_us;
        for _ in 0..self.config.ready_polls() {
            if Vs1053::ready_for_data(self)? {
                return Ok(true);
            }
            self.delay.delay_us(poll_us);
        }
        Vs1053::ready_for_data(self)
    }

    fn attach_interrupt(&mut self) -> Result<(), BusError> {
        self.dreq.set_interrupt_config(Trigger::EitherEdge);
        self.interrupt_attached = true;
        self.dreq.set_interrupt_enable(true);
        Ok(())
    }
}

// ── AudioControl trait implementation ──────────────────────────────────────

impl<SPI, XCS, XDCS, RST, DREQ, D> AudioControl for Vs1053<SPI, XCS, XDCS, RST, DREQ, D>
where
    SPI: SpiTransactions,
    XCS: OutputPin,
    XDCS: OutputPin,
    RST: OutputPin,
    DREQ: InputPin + EdgeInterrupt,
    D: DelayNs,
{
    type Error = BusError;

    fn enable(&mut self) -> Result<(), Self::Error> {
        self.begin().map(|_| ())
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        // SCI_VOL = 0xFFFF powers the analog drivers down.
        self.write_register(reg::SCI_VOL, 0xFFFF)
    }

    fn volume(&mut self, level: f32) -> Result<(), Self::Error> {
        self.write_volume(Volume::from_gain(level))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
