use crate::error::{BusError, Error};

use super::track::Track;

/// What the feed loop needs from the decoder.
///
/// Implemented by [`Vs1053`](crate::codec::Vs1053); the playback state machine
/// is written against this trait only.
pub trait StreamSink {
    /// `true` while the decoder FIFO can take another chunk (DREQ high).
    fn ready_for_data(&mut self) -> Result<bool, BusError>;

    /// Read up to one chunk from `track` and write it to the decoder.
    ///
    /// Returns the number of bytes moved; `0` means the track is exhausted and
    /// nothing was written.
    fn stream_chunk<T: Track>(&mut self, track: &mut T) -> Result<usize, Error<T::Error>>;

    /// Poll DREQ until it goes high or the configured timeout elapses.
    fn wait_ready(&mut self) -> Result<bool, BusError>;

    /// Arm the DREQ pin-change interrupt and mask it around every bus
    /// transaction from now on.
    fn attach_interrupt(&mut self) -> Result<(), BusError>;
}
