//! VS1053 SCI register addresses and bitfield definitions.
//!
//! Taken from the VLSI VS1053b datasheet (section 9.6). SCI registers are
//! 8-bit addressed and hold 16-bit values sent big-endian on the wire.

// ── SCI opcodes ────────────────────────────────────────────────────────────

/// SCI read instruction.
pub const SCI_READ: u8 = 0x03;

/// SCI write instruction.
pub const SCI_WRITE: u8 = 0x02;

// ── SCI registers ──────────────────────────────────────────────────────────

/// Mode control (see the `SM_*` bits below).
pub const SCI_MODE: u8 = 0x00;

/// Status.
/// - Bits 7:4: SS_VER (4 for VS1053, 3 for VS1003)
/// - Bit    3: SS_APDOWN2
/// - Bit    2: SS_APDOWN1
/// - Bit    0: SS_DO_NOT_JUMP
pub const SCI_STATUS: u8 = 0x01;

/// Built-in bass/treble enhancer.
pub const SCI_BASS: u8 = 0x02;

/// Clock frequency and multiplier.
/// - Bits 15:13: SC_MULT (0x6000 = 3.0x)
/// - Bits 12:11: SC_ADD
/// - Bits 10:0 : SC_FREQ (0 = 12.288 MHz crystal)
pub const SCI_CLOCKF: u8 = 0x03;

/// Decode time in seconds.
pub const SCI_DECODE_TIME: u8 = 0x04;

/// Sample rate and channel count of the current stream.
pub const SCI_AUDATA: u8 = 0x05;

/// RAM data port (address set through [`SCI_WRAMADDR`]).
pub const SCI_WRAM: u8 = 0x06;

/// RAM address for [`SCI_WRAM`] accesses.
pub const SCI_WRAMADDR: u8 = 0x07;

/// Stream header data 0.
pub const SCI_HDAT0: u8 = 0x08;

/// Stream header data 1.
pub const SCI_HDAT1: u8 = 0x09;

/// Start address of user application code.
pub const SCI_AIADDR: u8 = 0x0A;

/// Volume, 0.5 dB attenuation steps.
/// - Bits 15:8: left
/// - Bits  7:0: right
///
/// 0x0000 is the loudest setting, 0xFEFE total silence, 0xFFFF powers the
/// analog section down.
pub const SCI_VOL: u8 = 0x0B;

/// Application control registers 0–3.
pub const SCI_AICTRL0: u8 = 0x0C;
pub const SCI_AICTRL1: u8 = 0x0D;
pub const SCI_AICTRL2: u8 = 0x0E;
pub const SCI_AICTRL3: u8 = 0x0F;

// ── SCI_MODE bits ──────────────────────────────────────────────────────────

/// Differential output (left channel inverted).
pub const SM_DIFF: u16 = 0x0001;
/// Allow MPEG layers I and II.
pub const SM_LAYER12: u16 = 0x0002;
/// Soft reset.
pub const SM_RESET: u16 = 0x0004;
/// Cancel decoding of the current file.
pub const SM_CANCEL: u16 = 0x0008;
/// EarSpeaker low setting.
pub const SM_EARSPEAKER_LO: u16 = 0x0010;
/// Allow SDI tests.
pub const SM_TESTS: u16 = 0x0020;
/// Stream mode.
pub const SM_STREAM: u16 = 0x0040;
/// VS1002 native SPI modes (separate XCS / XDCS).
pub const SM_SDINEW: u16 = 0x0800;
/// PCM/ADPCM recording active.
pub const SM_ADPCM: u16 = 0x1000;
/// MIC / LINE1 selector.
pub const SM_LINE1: u16 = 0x4000;
/// Input clock range (0: 12..13 MHz, 1: 24..26 MHz).
pub const SM_CLK_RANGE: u16 = 0x8000;

// ── WRAM addresses ─────────────────────────────────────────────────────────

/// GPIO direction.
pub const GPIO_DDR: u16 = 0xC017;
/// GPIO input values.
pub const GPIO_IDATA: u16 = 0xC018;
/// GPIO output values.
pub const GPIO_ODATA: u16 = 0xC019;
/// Interrupt enable.
pub const INT_ENABLE: u16 = 0xC01A;

/// Playback speed parameter (0 and 1 = normal, 2 = 2x, ...).
pub const PARA_PLAY_SPEED: u16 = 0x1E04;

// ── Field helpers ──────────────────────────────────────────────────────────

/// Extract SS_VER from an SCI_STATUS value.
pub const fn status_version(status: u16) -> u8 {
    ((status >> 4) & 0x0F) as u8
}
