//! Software VS1053 for host tests.
//!
//! Every peripheral handed to the driver shares one [`Chip`] that decodes SCI
//! frames into a register file, collects SDI bytes as payload, models DREQ as
//! a FIFO with room for a few chunks, and records every bus event in order.

use std::boxed::Box;
use std::string::{String, ToString};
use std::sync::{Arc, Mutex, MutexGuard};
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, SpiBus};

use crate::bus::{BusSettings, SpiTransactions};
use crate::codec::registers::{SCI_READ, SCI_STATUS, SCI_WRAM, SCI_WRAMADDR, SCI_WRITE};
use crate::codec::{EdgeInterrupt, Trigger, Vs1053};
use crate::config::Config;
use crate::playback::{Track, TrackSource};

/// FIFO room after reset, in chunks.
pub(crate) const FIFO_CHUNKS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Line {
    Xcs,
    Xdcs,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    /// Transaction opened at this SCK rate.
    Begin(u32),
    End,
    /// Output line driven; `true` = high.
    Pin(Line, bool),
    Tx(u8),
    Rx(u8),
    /// Delay in nanoseconds.
    Delay(u32),
    IrqConfig(Trigger),
    IrqEnable(bool),
    Open(String),
    Close(String),
}

type Hook = Box<dyn FnMut() + Send>;

pub(crate) struct Chip {
    regs: [u16; 16],
    wram: Vec<(u16, u16)>,
    events: Vec<Event>,
    payload: Vec<u8>,
    chunk_writes: usize,
    chunk_bytes: usize,
    xcs_low: bool,
    xdcs_low: bool,
    frame: Vec<u8>,
    read_pos: usize,
    fifo_space: usize,
    auto_refill: bool,
    reported_low: bool,
    fail_spi: bool,
    /// Runs after each SDI transaction, outside the lock.
    hook: Option<Hook>,
    hook_pending: bool,
}

impl Chip {
    fn new() -> Self {
        let mut regs = [0u16; 16];
        regs[SCI_STATUS as usize] = 0x0040;
        Chip {
            regs,
            wram: Vec::new(),
            events: Vec::new(),
            payload: Vec::new(),
            chunk_writes: 0,
            chunk_bytes: 0,
            xcs_low: false,
            xdcs_low: false,
            frame: Vec::new(),
            read_pos: 0,
            fifo_space: FIFO_CHUNKS,
            auto_refill: true,
            reported_low: false,
            fail_spi: false,
            hook: None,
            hook_pending: false,
        }
    }

    fn drive(&mut self, line: Line, high: bool) {
        self.events.push(Event::Pin(line, high));
        match line {
            Line::Xcs => {
                self.xcs_low = !high;
                self.frame.clear();
                self.read_pos = 0;
            }
            Line::Xdcs => {
                if high && self.xdcs_low && self.chunk_bytes > 0 {
                    self.chunk_writes += 1;
                    self.chunk_bytes = 0;
                    self.fifo_space = self.fifo_space.saturating_sub(1);
                    self.hook_pending = true;
                }
                self.xdcs_low = !high;
            }
            Line::Reset => {}
        }
    }

    fn dreq(&mut self) -> bool {
        if self.fifo_space > 0 {
            return true;
        }
        // The decoder catches up between two polls that both saw it full.
        if self.auto_refill && self.reported_low {
            self.fifo_space = FIFO_CHUNKS;
            self.reported_low = false;
            return true;
        }
        self.reported_low = true;
        false
    }

    fn write_byte(&mut self, byte: u8) {
        self.events.push(Event::Tx(byte));
        if self.xdcs_low {
            self.payload.push(byte);
            self.chunk_bytes += 1;
        } else if self.xcs_low {
            self.frame.push(byte);
            if self.frame.len() == 4 && self.frame[0] == SCI_WRITE {
                let value = u16::from_be_bytes([self.frame[2], self.frame[3]]);
                self.store(self.frame[1], value);
            }
        }
    }

    fn read_byte(&mut self) -> u8 {
        let byte = if self.xcs_low && self.frame.len() == 2 && self.frame[0] == SCI_READ {
            let value = self.load(self.frame[1]).to_be_bytes();
            let byte = value.get(self.read_pos).copied().unwrap_or(0xFF);
            self.read_pos += 1;
            byte
        } else {
            0xFF
        };
        self.events.push(Event::Rx(byte));
        byte
    }

    fn store(&mut self, address: u8, value: u16) {
        if address == SCI_WRAM {
            let at = self.regs[SCI_WRAMADDR as usize];
            self.wram.retain(|(a, _)| *a != at);
            self.wram.push((at, value));
        } else if let Some(reg) = self.regs.get_mut(address as usize) {
            *reg = value;
        }
    }

    fn load(&self, address: u8) -> u16 {
        if address == SCI_WRAM {
            let at = self.regs[SCI_WRAMADDR as usize];
            return self.wram.iter().find(|(a, _)| *a == at).map_or(0, |(_, v)| *v);
        }
        self.regs.get(address as usize).copied().unwrap_or(0)
    }
}

pub(crate) type Shared = Arc<Mutex<Chip>>;

fn lock(chip: &Shared) -> MutexGuard<'_, Chip> {
    chip.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Run the chunk hook, if one is due, without holding the chip lock.
fn run_hook(chip: &Shared) {
    let hook = {
        let mut state = lock(chip);
        if !state.hook_pending {
            return;
        }
        state.hook_pending = false;
        state.hook.take()
    };
    if let Some(mut hook) = hook {
        hook();
        let mut state = lock(chip);
        if state.hook.is_none() {
            state.hook = Some(hook);
        }
    }
}

// ── Peripherals ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) struct SimError;

impl spi::Error for SimError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

pub(crate) struct MockSpi(Shared);

impl spi::ErrorType for MockSpi {
    type Error = SimError;
}

impl MockSpi {
    fn check(&self) -> Result<(), SimError> {
        if lock(&self.0).fail_spi {
            Err(SimError)
        } else {
            Ok(())
        }
    }
}

impl SpiBus<u8> for MockSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.check()?;
        let mut chip = lock(&self.0);
        for word in words {
            *word = chip.read_byte();
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.check()?;
        let mut chip = lock(&self.0);
        for word in words {
            chip.write_byte(*word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.write(write)?;
        self.read(read)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.write(words)?;
        self.read(words)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl SpiTransactions for MockSpi {
    fn begin_transaction(&mut self, settings: &BusSettings) -> Result<(), Self::Error> {
        lock(&self.0).events.push(Event::Begin(settings.frequency));
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), Self::Error> {
        lock(&self.0).events.push(Event::End);
        run_hook(&self.0);
        Ok(())
    }
}

pub(crate) struct MockOut {
    line: Line,
    chip: Shared,
}

impl digital::ErrorType for MockOut {
    type Error = core::convert::Infallible;
}

impl OutputPin for MockOut {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        lock(&self.chip).drive(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        lock(&self.chip).drive(self.line, true);
        Ok(())
    }
}

pub(crate) struct MockDreq(Shared);

impl digital::ErrorType for MockDreq {
    type Error = core::convert::Infallible;
}

impl InputPin for MockDreq {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(lock(&self.0).dreq())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl EdgeInterrupt for MockDreq {
    fn set_interrupt_config(&mut self, trigger: Trigger) {
        lock(&self.0).events.push(Event::IrqConfig(trigger));
    }

    fn set_interrupt_enable(&mut self, enable: bool) {
        lock(&self.0).events.push(Event::IrqEnable(enable));
    }
}

pub(crate) struct MockDelay(Shared);

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        lock(&self.0).events.push(Event::Delay(ns));
    }
}

pub(crate) type TestCodec = Vs1053<MockSpi, MockOut, MockOut, MockOut, MockDreq, MockDelay>;

// ── Tracks ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrackFault;

pub(crate) struct MemTrack {
    name: String,
    data: Vec<u8>,
    pos: usize,
    open: bool,
    /// Reads fail once this many bytes have been delivered.
    fail_at: Option<usize>,
    chip: Shared,
}

impl MemTrack {
    pub(crate) fn fail_at(mut self, offset: usize) -> Self {
        self.fail_at = Some(offset);
        self
    }

    pub(crate) fn closed(mut self) -> Self {
        self.open = false;
        self
    }
}

impl Track for MemTrack {
    type Error = TrackFault;

    fn is_open(&self) -> bool {
        self.open
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fail_at.is_some_and(|at| self.pos >= at) {
            return Err(TrackFault);
        }
        let rest = &self.data[self.pos..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            lock(&self.chip).events.push(Event::Close(self.name.clone()));
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub(crate) struct MemSource {
    files: Vec<(String, Vec<u8>)>,
    chip: Shared,
}

impl TrackSource for MemSource {
    type Track = MemTrack;

    fn open(&mut self, name: &str) -> Result<MemTrack, TrackFault> {
        let (_, data) = self.files.iter().find(|(n, _)| n == name).ok_or(TrackFault)?;
        let data = data.clone();
        Ok(Sim { chip: self.chip.clone() }.track(name, &data))
    }
}

// ── Harness ────────────────────────────────────────────────────────────────

/// Handle on a simulated chip; hands out peripherals and inspects state.
#[derive(Clone)]
pub(crate) struct Sim {
    chip: Shared,
}

impl Sim {
    pub(crate) fn new() -> Self {
        Sim {
            chip: Arc::new(Mutex::new(Chip::new())),
        }
    }

    pub(crate) fn codec(&self) -> TestCodec {
        self.codec_with(Config::default())
    }

    pub(crate) fn codec_with(&self, config: Config) -> TestCodec {
        let out = |line| MockOut {
            line,
            chip: self.chip.clone(),
        };
        Vs1053::with_config(
            MockSpi(self.chip.clone()),
            out(Line::Xcs),
            out(Line::Xdcs),
            Some(out(Line::Reset)),
            MockDreq(self.chip.clone()),
            MockDelay(self.chip.clone()),
            config,
        )
    }

    /// An open in-memory track. Logs an [`Event::Open`].
    pub(crate) fn track(&self, name: &str, data: &[u8]) -> MemTrack {
        lock(&self.chip).events.push(Event::Open(name.to_string()));
        MemTrack {
            name: name.to_string(),
            data: data.to_vec(),
            pos: 0,
            open: true,
            fail_at: None,
            chip: self.chip.clone(),
        }
    }

    pub(crate) fn source(&self, files: &[(&str, &[u8])]) -> MemSource {
        MemSource {
            files: files.iter().map(|(n, d)| (n.to_string(), d.to_vec())).collect(),
            chip: self.chip.clone(),
        }
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        lock(&self.chip).events.clone()
    }

    pub(crate) fn clear_events(&self) {
        lock(&self.chip).events.clear();
    }

    pub(crate) fn register(&self, address: u8) -> u16 {
        lock(&self.chip).load(address)
    }

    pub(crate) fn set_register(&self, address: u8, value: u16) {
        lock(&self.chip).store(address, value);
    }

    pub(crate) fn payload(&self) -> Vec<u8> {
        lock(&self.chip).payload.clone()
    }

    pub(crate) fn chunk_writes(&self) -> usize {
        lock(&self.chip).chunk_writes
    }

    pub(crate) fn fail_spi(&self, fail: bool) {
        lock(&self.chip).fail_spi = fail;
    }

    /// Room left in the decoder FIFO, in chunks. DREQ is high while non-zero.
    pub(crate) fn set_fifo_space(&self, chunks: usize) {
        let mut chip = lock(&self.chip);
        chip.fifo_space = chunks;
        chip.reported_low = false;
    }

    /// With auto-refill off the FIFO only empties through
    /// [`set_fifo_space`](Self::set_fifo_space).
    pub(crate) fn set_auto_refill(&self, on: bool) {
        lock(&self.chip).auto_refill = on;
    }

    /// Run `hook` after every SDI transaction, as an interrupt that slips in
    /// between two chunks would.
    pub(crate) fn on_chunk(&self, hook: impl FnMut() + Send + 'static) {
        lock(&self.chip).hook = Some(Box::new(hook));
    }
}

/// Serialises tests that touch the process-wide interrupt binding.
#[cfg(feature = "interrupt")]
pub(crate) fn binding_lock() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
