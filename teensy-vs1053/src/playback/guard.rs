//! Try-lock that keeps the feed loop single-entry across execution contexts.
//!
//! The foreground loop and the DREQ interrupt both call into the same player.
//! Whoever gets the guard first drains the decoder FIFO; anyone arriving while
//! it is held returns immediately and leaves a note so the holder runs one
//! more pass before it leaves.
//!
//! # Safety Contract
//!
//! - The guard never blocks, so taking it from an ISR is always safe.
//! - Data protected by the guard must only be touched through an [`Entered`]
//!   token; the token's `Drop` publishes those writes to the next holder.
//! - A holder must check [`ReentrancyGuard::has_missed`] after dropping its
//!   token and re-enter to serve the note if one is set.

use core::sync::atomic::{AtomicBool, Ordering};

/// Non-blocking single-entry flag with a "someone knocked" note.
pub struct ReentrancyGuard {
    busy: AtomicBool,
    missed: AtomicBool,
}

impl ReentrancyGuard {
    /// Create a released guard.
    pub const fn new() -> Self {
        ReentrancyGuard {
            busy: AtomicBool::new(false),
            missed: AtomicBool::new(false),
        }
    }

    /// Take the guard, or record the attempt and return `None` if it is held.
    ///
    /// A refused caller only gives up after seeing the guard still held once
    /// its note is written. The holder looks for notes after letting go (see
    /// [`has_missed`](Self::has_missed)), so a note can never fall between a
    /// holder's last check and its release.
    pub fn try_enter(&self) -> Option<Entered<'_>> {
        loop {
            if !self.busy.swap(true, Ordering::SeqCst) {
                return Some(Entered { guard: self });
            }
            self.missed.store(true, Ordering::SeqCst);
            if self.busy.load(Ordering::SeqCst) {
                return None;
            }
        }
    }

    /// Whether some context currently holds the guard.
    pub fn is_held(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Whether a refused attempt is waiting to be served.
    ///
    /// Checked by a context right after it released the guard.
    pub fn has_missed(&self) -> bool {
        self.missed.load(Ordering::SeqCst)
    }
}

impl Default for ReentrancyGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof that the current context holds a [`ReentrancyGuard`].
///
/// Released on drop.
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl Entered<'_> {
    /// Clear and return the "someone knocked" note.
    ///
    /// A `true` result means another context tried to enter since the last
    /// call and gave up; the holder should run its work once more.
    pub fn take_missed(&self) -> bool {
        self.guard.missed.swap(false, Ordering::SeqCst)
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::SeqCst);
    }
}
