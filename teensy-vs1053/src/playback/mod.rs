//! Track playback on top of the decoder driver.
//!
//! ## Components
//!
//! | Item | Description |
//! |------|-------------|
//! | [`Vs1053Player`] | Play / pause / stop state machine and the DREQ feed loop |
//! | [`ReentrancyGuard`] | Non-blocking single-entry flag shared by foreground and ISR |
//! | [`Track`] / [`TrackSource`] | What the player reads encoded audio from |
//! | [`StreamSink`] | What the player writes chunks to (implemented by the codec) |
//!
//! ## Drive modes
//!
//! Without an interrupt binding `play` feeds in a loop until the track ends.
//! After [`interrupt::bind`](crate::interrupt::bind) it feeds the first burst
//! and returns; each DREQ edge then calls [`Vs1053Player::feed`] from the ISR.

pub mod guard;
pub mod player;
pub mod sink;
pub mod track;

pub use guard::ReentrancyGuard;
pub use player::{PlaybackState, Vs1053Player};
pub use sink::StreamSink;
pub use track::{Track, TrackSource};
