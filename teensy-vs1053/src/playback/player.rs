//! Playback state machine and feed engine.
//!
//! [`Vs1053Player`] owns the decoder and the current track. It is meant to
//! live in a `static` so the foreground and the DREQ interrupt can share it:
//! every method takes `&self`.
//!
//! # Safety Contract
//!
//! - The decoder and the track are only touched while holding the
//!   [`ReentrancyGuard`]. A context that finds the guard held never waits.
//! - The playback state is a separate atomic and may be changed without the
//!   guard; the guard holder reconciles the track with it before releasing.
//! - Every holder, feeding or not, releases through one path that first
//!   serves the requests turned away while it held the guard.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use super::guard::{Entered, ReentrancyGuard};
use super::sink::StreamSink;
use super::track::{Track, TrackSource};
use crate::error::Error;

/// Observable playback state.
///
/// - `Stopped`: no track is held.
/// - `Playing`: a track is held and fed whenever DREQ allows.
/// - `Paused`: a track is held but feeding is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PlaybackState {
    /// Idle, no track.
    Stopped = 0,
    /// Feeding the held track.
    Playing = 1,
    /// Track held, feeding suspended.
    Paused = 2,
}

impl PlaybackState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            _ => PlaybackState::Stopped,
        }
    }
}

struct Inner<C, T> {
    device: C,
    track: Option<T>,
}

/// VS1053 playback engine: one decoder, at most one track.
pub struct Vs1053Player<C, T> {
    guard: ReentrancyGuard,
    state: AtomicU8,
    /// Set once the DREQ interrupt is bound to this player.
    interrupt_driven: AtomicBool,
    inner: UnsafeCell<Inner<C, T>>,
}

// SAFETY: `inner` is only dereferenced while `guard` is held, and the guard
// admits one context at a time without blocking. Device and track move
// between contexts, hence `Send` on both.
unsafe impl<C: Send, T: Send> Sync for Vs1053Player<C, T> {}

impl<C, T> Vs1053Player<C, T>
where
    C: StreamSink,
    T: Track,
{
    /// Wrap an initialised decoder. The player starts out stopped.
    pub const fn new(device: C) -> Self {
        Vs1053Player {
            guard: ReentrancyGuard::new(),
            state: AtomicU8::new(PlaybackState::Stopped as u8),
            interrupt_driven: AtomicBool::new(false),
            inner: UnsafeCell::new(Inner { device, track: None }),
        }
    }

    /// Consume the player, closing any open track, and return the decoder.
    pub fn into_device(self) -> C {
        let mut inner = self.inner.into_inner();
        if let Some(mut track) = inner.track.take() {
            track.close();
        }
        inner.device
    }

    /// Exclusive access to the guarded state.
    ///
    /// The `Entered` token proves the guard is held; it is borrowed for as
    /// long as the returned reference lives.
    #[allow(clippy::mut_from_ref)]
    fn inner<'g>(&'g self, _entered: &'g Entered<'_>) -> &'g mut Inner<C, T> {
        // SAFETY: the guard is held for 'g and admits no other context, so
        // this is the only live reference to `inner`.
        unsafe { &mut *self.inner.get() }
    }

    // ── State ──────────────────────────────────────────────────────────

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: PlaybackState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Whether a track is being fed.
    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Whether a track is held with feeding suspended.
    pub fn is_paused(&self) -> bool {
        self.state() == PlaybackState::Paused
    }

    /// Whether the player is idle with no track.
    pub fn is_stopped(&self) -> bool {
        self.state() == PlaybackState::Stopped
    }

    /// Whether `play` hands feeding over to the DREQ interrupt.
    pub fn is_interrupt_driven(&self) -> bool {
        self.interrupt_driven.load(Ordering::Acquire)
    }

    // ── Feed engine ────────────────────────────────────────────────────

    /// Push chunks to the decoder until DREQ drops or the track ends.
    ///
    /// Returns at once, doing nothing, when another context is already
    /// feeding; that context runs one more pass on our behalf before it
    /// lets go. On end of stream the track is closed and the state becomes
    /// [`Stopped`](PlaybackState::Stopped). A track read error does the same
    /// and is returned. A bus error is returned with the state untouched.
    pub fn feed(&self) -> Result<(), Error<T::Error>> {
        let Some(entered) = self.guard.try_enter() else {
            return Ok(());
        };
        let drained = self.drain(self.inner(&entered));
        let released = self.release(entered);
        drained.and(released)
    }

    /// Let go of the guard, first serving every request turned away while it
    /// was held.
    ///
    /// Every guard holder leaves through here. A refused `feed` gets its
    /// drain, a refused `stop` gets its track closed. Notes that land after
    /// the last check are picked up by re-entering once the guard is free.
    /// Returns the first error of the drains run on others' behalf.
    fn release<'a>(&'a self, mut entered: Entered<'a>) -> Result<(), Error<T::Error>> {
        let mut outcome = Ok(());
        loop {
            let inner = self.inner(&entered);
            while entered.take_missed() {
                let drained = self.drain(inner);
                if drained.is_err() {
                    outcome = outcome.and(drained);
                    break;
                }
            }
            self.reconcile(inner);
            drop(entered);

            if !self.guard.has_missed() {
                return outcome;
            }
            entered = match self.guard.try_enter() {
                Some(entered) => entered,
                // The new holder serves the note on its way out.
                None => return outcome,
            };
        }
    }

    /// [`release`](Self::release) for holders with no error channel of their
    /// own for the deferred drains; failures are dropped as in the ISR.
    fn release_quietly(&self, entered: Entered<'_>) {
        if self.release(entered).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("deferred feed failed");
        }
    }

    fn drain(&self, inner: &mut Inner<C, T>) -> Result<(), Error<T::Error>> {
        loop {
            // Checked every chunk so pause and stop land within one write.
            if !self.is_playing() {
                return Ok(());
            }
            let Some(track) = inner.track.as_mut() else {
                return Ok(());
            };
            if !track.is_open() || !inner.device.ready_for_data()? {
                return Ok(());
            }
            match inner.device.stream_chunk(track) {
                Ok(0) => {
                    #[cfg(feature = "defmt")]
                    defmt::info!("end of stream");
                    self.halt(inner);
                    return Ok(());
                }
                Ok(_) => {}
                Err(Error::Track(e)) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("track read failed, stopping");
                    self.halt(inner);
                    return Err(Error::Track(e));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Enter Stopped and close the held track.
    fn halt(&self, inner: &mut Inner<C, T>) {
        self.set_state(PlaybackState::Stopped);
        self.reconcile(inner);
    }

    /// Close the track if the state says Stopped. Run by every guard holder
    /// before it lets go, so a `stop` that lost the race still takes effect.
    fn reconcile(&self, inner: &mut Inner<C, T>) {
        if self.is_stopped() {
            if let Some(mut track) = inner.track.take() {
                track.close();
            }
        }
    }

    // ── Transport ──────────────────────────────────────────────────────

    /// Play an already opened track, replacing whatever is loaded.
    ///
    /// The previous track is closed first. A track that is not open is
    /// refused with [`Error::TrackUnavailable`] and the player stays stopped.
    ///
    /// Without a bound DREQ interrupt this blocks, feeding until the track
    /// ends or the state leaves Playing. With one bound it waits (bounded)
    /// for DREQ, feeds once and returns; the interrupt does the rest.
    pub fn play(&self, track: T) -> Result<(), Error<T::Error>> {
        self.start(|| Ok(track))
    }

    /// Stop the current track, open `name` from `source`, and play it.
    pub fn play_file<S>(&self, source: &mut S, name: &str) -> Result<(), Error<T::Error>>
    where
        S: TrackSource<Track = T>,
    {
        self.start(|| source.open(name).map_err(Error::Track))
    }

    fn start(&self, open: impl FnOnce() -> Result<T, Error<T::Error>>) -> Result<(), Error<T::Error>> {
        let entered = self.guard.try_enter().ok_or(Error::Busy)?;
        let loaded = self.load(self.inner(&entered), open);
        let released = self.release(entered);
        loaded.and(released)?;

        if self.is_interrupt_driven() {
            self.kick_off()
        } else {
            while self.is_playing() {
                self.feed()?;
            }
            Ok(())
        }
    }

    /// Close whatever is loaded, open the next track and start playing it.
    fn load(
        &self,
        inner: &mut Inner<C, T>,
        open: impl FnOnce() -> Result<T, Error<T::Error>>,
    ) -> Result<(), Error<T::Error>> {
        self.halt(inner);

        let track = open()?;
        if !track.is_open() {
            return Err(Error::TrackUnavailable);
        }
        #[cfg(feature = "defmt")]
        defmt::info!("playing {=str}", track.name());
        inner.track = Some(track);
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    /// Wait for the decoder to ask for data, then feed the first burst.
    fn kick_off(&self) -> Result<(), Error<T::Error>> {
        // `None`: the interrupt beat us to it.
        let Some(entered) = self.guard.try_enter() else {
            return Ok(());
        };
        let waited = self.inner(&entered).device.wait_ready();
        let released = self.release(entered);
        let ready = waited?;
        released?;
        if !ready {
            #[cfg(feature = "defmt")]
            defmt::warn!("DREQ stayed low, giving up");
            self.stop();
            return Err(Error::NotReady);
        }
        self.feed()
    }

    /// Suspend (`true`) or resume (`false`) feeding.
    ///
    /// Pausing keeps the track open. Resuming feeds once straight away
    /// instead of waiting for the next DREQ edge. Either call is ignored
    /// when the player is not in the opposite state.
    pub fn pause(&self, pause: bool) -> Result<(), Error<T::Error>> {
        let (from, to) = if pause {
            (PlaybackState::Playing, PlaybackState::Paused)
        } else {
            (PlaybackState::Paused, PlaybackState::Playing)
        };
        let switched = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if switched && !pause {
            self.feed()?;
        }
        Ok(())
    }

    /// Stop playback and close the track.
    ///
    /// Never blocks. If another context is mid-feed, the state flips
    /// immediately and that context closes the track before it returns.
    pub fn stop(&self) {
        self.set_state(PlaybackState::Stopped);
        if let Some(entered) = self.guard.try_enter() {
            self.release_quietly(entered);
        }
        #[cfg(feature = "defmt")]
        defmt::debug!("stopped");
    }

    // ── Access ─────────────────────────────────────────────────────────

    /// Run `f` with exclusive access to the decoder (volume, status, ...).
    ///
    /// Fails with [`Error::Busy`] while another context is feeding. A DREQ
    /// request that arrives meanwhile is served before this returns.
    pub fn with_device<R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R, Error<T::Error>> {
        let entered = self.guard.try_enter().ok_or(Error::Busy)?;
        let value = f(&mut self.inner(&entered).device);
        self.release_quietly(entered);
        Ok(value)
    }

    /// Run `f` with the loaded track, if any (e.g. to read its name).
    pub fn with_track<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> Result<R, Error<T::Error>> {
        let entered = self.guard.try_enter().ok_or(Error::Busy)?;
        let value = f(self.inner(&entered).track.as_ref());
        self.release_quietly(entered);
        Ok(value)
    }

    /// Arm the decoder's DREQ interrupt and switch `play` to background mode.
    #[cfg(feature = "interrupt")]
    pub(crate) fn attach_interrupt(&self) -> Result<(), Error<T::Error>> {
        let entered = self.guard.try_enter().ok_or(Error::Busy)?;
        let attached = self.inner(&entered).device.attach_interrupt();
        if attached.is_ok() {
            self.interrupt_driven.store(true, Ordering::Release);
        }
        self.release_quietly(entered);
        Ok(attached?)
    }
}
