//! Track stream contract.
//!
//! The storage layer (SD card, flash, a RAM buffer) is outside this crate;
//! anything that can be read in chunks and closed can be played.

/// An open, readable byte stream holding one encoded track.
pub trait Track {
    /// I/O error of the underlying storage.
    type Error;

    /// Whether the handle is open. A closed handle is never read.
    fn is_open(&self) -> bool;

    /// Read up to `buf.len()` bytes. `Ok(0)` means end of stream.
    ///
    /// Must not block waiting for more data than is available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Close the handle. Closing twice is harmless.
    fn close(&mut self);

    /// Display name of the track.
    fn name(&self) -> &str;
}

/// Something that can open tracks by name (e.g. a FAT volume).
pub trait TrackSource {
    /// Handle type produced by [`open`](Self::open).
    type Track: Track;

    /// Open the track called `name`.
    fn open(&mut self, name: &str) -> Result<Self::Track, <Self::Track as Track>::Error>;
}
