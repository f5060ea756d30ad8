//! # teensy-vs1053
//!
//! A `no_std` driver for the VLSI [VS1053](https://www.vlsi.fi/en/products/vs1053.html)
//! streaming audio decoder on the [Teensy 4.x](https://www.pjrc.com/teensy/)
//! (i.MX RT1062, Cortex-M7), e.g. the Adafruit "Music Maker" shield.
//!
//! The chip decodes MP3/Ogg/WAV/... on its own; this crate moves bytes. It
//! reads a track in 32-byte chunks and pushes them over SPI whenever the
//! chip's DREQ line says its FIFO has room, either from a foreground loop or
//! from the DREQ pin-change interrupt.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Bus | [`bus`] | SPI transaction settings, `SpiTransactions` seam |
//! | Codec | [`codec`] | SCI register protocol, SDI payload protocol, DREQ gate, reset/volume |
//! | Trait | [`control`] | `AudioControl` trait (enable / disable / volume) |
//! | Playback | [`playback`] | Reentrancy guard, feed loop, play/pause/stop state machine |
//! | Interrupt | [`interrupt`] | Binds one player to the DREQ edge interrupt (feature-gated) |
//!
//! ## Quick start
//!
//! ```ignore
//! use static_cell::StaticCell;
//! use teensy_vs1053::codec::Vs1053;
//! use teensy_vs1053::playback::Vs1053Player;
//!
//! static PLAYER: StaticCell<Vs1053Player<MyCodec, MyFile>> = StaticCell::new();
//!
//! let mut codec = Vs1053::new(spi, xcs, xdcs, None, dreq, delay);
//! let version = codec.begin()?;      // 4 for a VS1053
//! codec.set_volume(20, 20)?;
//!
//! let player = PLAYER.init(Vs1053Player::new(codec));
//! teensy_vs1053::interrupt::bind(player)?;   // optional: background feeding
//! player.play_file(&mut sd, "track001.mp3")?;
//!
//! // In the GPIO ISR for the DREQ pin (after acknowledging the pin flag):
//! teensy_vs1053::interrupt::on_data_request();
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `interrupt` | yes | DREQ interrupt adapter (requires `critical-section`) |
//! | `defmt` | no | `defmt::Format` derives and driver log messages |
//!
//! ## Wire parameters
//!
//! - **Chunk size:** 32 bytes ([`constants::CHUNK_SIZE`])
//! - **Control bus:** 250 kHz, MSB first, SPI mode 0
//! - **Data bus:** 8 MHz, MSB first, SPI mode 0
//! - **SCI opcodes:** `0x03` read, `0x02` write, big-endian 16-bit values

#![no_std]

#[cfg(test)]
extern crate std;

pub mod constants;
pub mod error;
pub mod bus;
pub mod config;
pub mod control;
pub mod codec;
pub mod playback;

#[cfg(feature = "interrupt")]
pub mod interrupt;

#[cfg(test)]
pub(crate) mod mock;

pub use error::{BusError, Error};
