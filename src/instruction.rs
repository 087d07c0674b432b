use std::{fmt, str::FromStr};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which member of the 6502 family the core behaves as. Fixed at CPU
/// construction; selects the instruction table and the edge-case
/// semantics (decimal-mode flags and timing, the indirect-JMP page
/// bug, the extended addressing modes).
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum CpuBehavior {
    Nmos6502,
    Cmos6502,
    Cmos65816,
}

#[derive(Debug, Error)]
#[error("unknown cpu type {0}")]
pub struct UnknownBehavior(String);

impl FromStr for CpuBehavior {
    type Err = UnknownBehavior;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "6502" => Ok(CpuBehavior::Nmos6502),
            "65c02" => Ok(CpuBehavior::Cmos6502),
            "65c816" => Ok(CpuBehavior::Cmos65816),
            other => Err(UnknownBehavior(other.to_string())),
        }
    }
}

impl fmt::Display for CpuBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuBehavior::Nmos6502 => write!(f, "6502"),
            CpuBehavior::Cmos6502 => write!(f, "65C02"),
            CpuBehavior::Cmos65816 => write!(f, "65C816"),
        }
    }
}

impl CpuBehavior {
    pub fn is_cmos(&self) -> bool {
        !matches!(self, CpuBehavior::Nmos6502)
    }
}

/// How an instruction finds its operand.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    /// ($zp,X)
    IndexedIndirect,
    /// ($zp),Y
    IndirectIndexed,
    /// ($zp) — 65C02 and later.
    ZeroPageIndirect,
    /// ($abs,X) — 65C02 and later, JMP only.
    AbsoluteIndexedIndirect,
    /// $zp,$rel — 65C02 BBR/BBS.
    ZeroPageRelative,
    /// $sr,S — 65C816.
    StackRelative,
    /// ($sr,S),Y — 65C816.
    StackRelativeIndirectY,
    /// [$dp] — 65C816.
    IndirectLong,
    /// [$dp],Y — 65C816.
    IndirectLongY,
    /// $al (24-bit operand) — 65C816.
    AbsoluteLong,
    /// $al,X — 65C816.
    AbsoluteLongX,
    /// 16-bit branch displacement — 65C816.
    RelativeLong,
    /// Destination and source bank pair — 65C816 MVN/MVP.
    BlockMove,
}

impl AddressingMode {
    /// Operand bytes following the opcode.
    pub fn operand_bytes(&self) -> u16 {
        use AddressingMode::*;
        match self {
            Implied | Accumulator => 0,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | Relative | IndexedIndirect
            | IndirectIndexed | ZeroPageIndirect | StackRelative | StackRelativeIndirectY
            | IndirectLong | IndirectLongY => 1,
            Absolute | AbsoluteX | AbsoluteY | Indirect | AbsoluteIndexedIndirect
            | ZeroPageRelative | RelativeLong | BlockMove => 2,
            AbsoluteLong | AbsoluteLongX => 3,
        }
    }

    pub fn available_on(&self, behavior: CpuBehavior) -> bool {
        use AddressingMode::*;
        match self {
            ZeroPageIndirect | AbsoluteIndexedIndirect => behavior.is_cmos(),
            ZeroPageRelative => behavior == CpuBehavior::Cmos6502,
            StackRelative | StackRelativeIndirectY | IndirectLong | IndirectLongY
            | AbsoluteLong | AbsoluteLongX | RelativeLong | BlockMove => {
                behavior == CpuBehavior::Cmos65816
            }
            _ => true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mnemonic {
    // Official 6502 set.
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    // Stable NMOS undocumented opcodes.
    Slo, Rla, Sre, Rra, Sax, Lax, Dcp, Isc, Anc, Alr, Arr, Sbx, Jam,
    // 65C02 additions.
    Bra, Phx, Phy, Plx, Ply, Stz, Trb, Tsb, Wai, Stp,
    Rmb(u8), Smb(u8), Bbr(u8), Bbs(u8),
    // 65C816 additions.
    Brl, Cop, Jml, Jsl, Mvn, Mvp, Pea, Pei, Per, Phb, Phd, Phk, Plb, Pld,
    Rep, Rtl, Sep, Tcd, Tcs, Tdc, Tsc, Txy, Tyx, Xba, Xce, Wdm,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mnemonic::Rmb(bit) => write!(f, "RMB{}", bit),
            Mnemonic::Smb(bit) => write!(f, "SMB{}", bit),
            Mnemonic::Bbr(bit) => write!(f, "BBR{}", bit),
            Mnemonic::Bbs(bit) => write!(f, "BBS{}", bit),
            other => write!(f, "{}", format!("{:?}", other).to_ascii_uppercase()),
        }
    }
}

/// Static description of one opcode: what it is, how it addresses, and
/// what it costs before dynamic penalties.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Base cycle cost; never below 1.
    pub cycles: u8,
    /// One extra cycle when the indexed address crosses a page.
    pub page_penalty: bool,
    /// False for undocumented/illegal encodings.
    pub documented: bool,
}

/// Resolve an opcode for a behavior. Pure data lookup: total over all
/// 256 opcodes for every behavior, no side effects.
pub fn lookup(behavior: CpuBehavior, opcode: u8) -> &'static Instruction {
    let table = match behavior {
        CpuBehavior::Nmos6502 => Lazy::force(&NMOS_TABLE),
        CpuBehavior::Cmos6502 => Lazy::force(&CMOS_TABLE),
        CpuBehavior::Cmos65816 => Lazy::force(&M65816_TABLE),
    };
    &table[opcode as usize]
}

static NMOS_TABLE: Lazy<[Instruction; 256]> = Lazy::new(nmos_table);
static CMOS_TABLE: Lazy<[Instruction; 256]> = Lazy::new(cmos_table);
static M65816_TABLE: Lazy<[Instruction; 256]> = Lazy::new(m65816_table);

fn entry(mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Instruction {
    Instruction {
        mnemonic,
        mode,
        cycles,
        page_penalty: false,
        documented: true,
    }
}

fn set(t: &mut [Instruction; 256], opcode: u8, m: Mnemonic, mode: AddressingMode, cycles: u8) {
    t[opcode as usize] = entry(m, mode, cycles);
}

fn set_paged(t: &mut [Instruction; 256], opcode: u8, m: Mnemonic, mode: AddressingMode, cycles: u8) {
    t[opcode as usize] = Instruction {
        page_penalty: true,
        ..entry(m, mode, cycles)
    };
}

fn set_undoc(t: &mut [Instruction; 256], opcode: u8, m: Mnemonic, mode: AddressingMode, cycles: u8) {
    t[opcode as usize] = Instruction {
        documented: false,
        ..entry(m, mode, cycles)
    };
}

fn set_undoc_paged(
    t: &mut [Instruction; 256],
    opcode: u8,
    m: Mnemonic,
    mode: AddressingMode,
    cycles: u8,
) {
    t[opcode as usize] = Instruction {
        documented: false,
        page_penalty: true,
        ..entry(m, mode, cycles)
    };
}

/// The 151 documented NMOS opcodes, shared by every behavior. Holes are
/// filled with a one-byte two-cycle undocumented NOP and overridden per
/// behavior.
fn official_table() -> [Instruction; 256] {
    use AddressingMode::*;
    use Mnemonic::*;

    let mut t = [Instruction {
        mnemonic: Nop,
        mode: Implied,
        cycles: 2,
        page_penalty: false,
        documented: false,
    }; 256];

    set(&mut t, 0x00, Brk, Implied, 7);
    set(&mut t, 0x01, Ora, IndexedIndirect, 6);
    set(&mut t, 0x05, Ora, ZeroPage, 3);
    set(&mut t, 0x06, Asl, ZeroPage, 5);
    set(&mut t, 0x08, Php, Implied, 3);
    set(&mut t, 0x09, Ora, Immediate, 2);
    set(&mut t, 0x0A, Asl, Accumulator, 2);
    set(&mut t, 0x0D, Ora, Absolute, 4);
    set(&mut t, 0x0E, Asl, Absolute, 6);
    set(&mut t, 0x10, Bpl, Relative, 2);
    set_paged(&mut t, 0x11, Ora, IndirectIndexed, 5);
    set(&mut t, 0x15, Ora, ZeroPageX, 4);
    set(&mut t, 0x16, Asl, ZeroPageX, 6);
    set(&mut t, 0x18, Clc, Implied, 2);
    set_paged(&mut t, 0x19, Ora, AbsoluteY, 4);
    set_paged(&mut t, 0x1D, Ora, AbsoluteX, 4);
    set(&mut t, 0x1E, Asl, AbsoluteX, 7);
    set(&mut t, 0x20, Jsr, Absolute, 6);
    set(&mut t, 0x21, And, IndexedIndirect, 6);
    set(&mut t, 0x24, Bit, ZeroPage, 3);
    set(&mut t, 0x25, And, ZeroPage, 3);
    set(&mut t, 0x26, Rol, ZeroPage, 5);
    set(&mut t, 0x28, Plp, Implied, 4);
    set(&mut t, 0x29, And, Immediate, 2);
    set(&mut t, 0x2A, Rol, Accumulator, 2);
    set(&mut t, 0x2C, Bit, Absolute, 4);
    set(&mut t, 0x2D, And, Absolute, 4);
    set(&mut t, 0x2E, Rol, Absolute, 6);
    set(&mut t, 0x30, Bmi, Relative, 2);
    set_paged(&mut t, 0x31, And, IndirectIndexed, 5);
    set(&mut t, 0x35, And, ZeroPageX, 4);
    set(&mut t, 0x36, Rol, ZeroPageX, 6);
    set(&mut t, 0x38, Sec, Implied, 2);
    set_paged(&mut t, 0x39, And, AbsoluteY, 4);
    set_paged(&mut t, 0x3D, And, AbsoluteX, 4);
    set(&mut t, 0x3E, Rol, AbsoluteX, 7);
    set(&mut t, 0x40, Rti, Implied, 6);
    set(&mut t, 0x41, Eor, IndexedIndirect, 6);
    set(&mut t, 0x45, Eor, ZeroPage, 3);
    set(&mut t, 0x46, Lsr, ZeroPage, 5);
    set(&mut t, 0x48, Pha, Implied, 3);
    set(&mut t, 0x49, Eor, Immediate, 2);
    set(&mut t, 0x4A, Lsr, Accumulator, 2);
    set(&mut t, 0x4C, Jmp, Absolute, 3);
    set(&mut t, 0x4D, Eor, Absolute, 4);
    set(&mut t, 0x4E, Lsr, Absolute, 6);
    set(&mut t, 0x50, Bvc, Relative, 2);
    set_paged(&mut t, 0x51, Eor, IndirectIndexed, 5);
    set(&mut t, 0x55, Eor, ZeroPageX, 4);
    set(&mut t, 0x56, Lsr, ZeroPageX, 6);
    set(&mut t, 0x58, Cli, Implied, 2);
    set_paged(&mut t, 0x59, Eor, AbsoluteY, 4);
    set_paged(&mut t, 0x5D, Eor, AbsoluteX, 4);
    set(&mut t, 0x5E, Lsr, AbsoluteX, 7);
    set(&mut t, 0x60, Rts, Implied, 6);
    set(&mut t, 0x61, Adc, IndexedIndirect, 6);
    set(&mut t, 0x65, Adc, ZeroPage, 3);
    set(&mut t, 0x66, Ror, ZeroPage, 5);
    set(&mut t, 0x68, Pla, Implied, 4);
    set(&mut t, 0x69, Adc, Immediate, 2);
    set(&mut t, 0x6A, Ror, Accumulator, 2);
    set(&mut t, 0x6C, Jmp, Indirect, 5);
    set(&mut t, 0x6D, Adc, Absolute, 4);
    set(&mut t, 0x6E, Ror, Absolute, 6);
    set(&mut t, 0x70, Bvs, Relative, 2);
    set_paged(&mut t, 0x71, Adc, IndirectIndexed, 5);
    set(&mut t, 0x75, Adc, ZeroPageX, 4);
    set(&mut t, 0x76, Ror, ZeroPageX, 6);
    set(&mut t, 0x78, Sei, Implied, 2);
    set_paged(&mut t, 0x79, Adc, AbsoluteY, 4);
    set_paged(&mut t, 0x7D, Adc, AbsoluteX, 4);
    set(&mut t, 0x7E, Ror, AbsoluteX, 7);
    set(&mut t, 0x81, Sta, IndexedIndirect, 6);
    set(&mut t, 0x84, Sty, ZeroPage, 3);
    set(&mut t, 0x85, Sta, ZeroPage, 3);
    set(&mut t, 0x86, Stx, ZeroPage, 3);
    set(&mut t, 0x88, Dey, Implied, 2);
    set(&mut t, 0x8A, Txa, Implied, 2);
    set(&mut t, 0x8C, Sty, Absolute, 4);
    set(&mut t, 0x8D, Sta, Absolute, 4);
    set(&mut t, 0x8E, Stx, Absolute, 4);
    set(&mut t, 0x90, Bcc, Relative, 2);
    set(&mut t, 0x91, Sta, IndirectIndexed, 6);
    set(&mut t, 0x94, Sty, ZeroPageX, 4);
    set(&mut t, 0x95, Sta, ZeroPageX, 4);
    set(&mut t, 0x96, Stx, ZeroPageY, 4);
    set(&mut t, 0x98, Tya, Implied, 2);
    set(&mut t, 0x99, Sta, AbsoluteY, 5);
    set(&mut t, 0x9A, Txs, Implied, 2);
    set(&mut t, 0x9D, Sta, AbsoluteX, 5);
    set(&mut t, 0xA0, Ldy, Immediate, 2);
    set(&mut t, 0xA1, Lda, IndexedIndirect, 6);
    set(&mut t, 0xA2, Ldx, Immediate, 2);
    set(&mut t, 0xA4, Ldy, ZeroPage, 3);
    set(&mut t, 0xA5, Lda, ZeroPage, 3);
    set(&mut t, 0xA6, Ldx, ZeroPage, 3);
    set(&mut t, 0xA8, Tay, Implied, 2);
    set(&mut t, 0xA9, Lda, Immediate, 2);
    set(&mut t, 0xAA, Tax, Implied, 2);
    set(&mut t, 0xAC, Ldy, Absolute, 4);
    set(&mut t, 0xAD, Lda, Absolute, 4);
    set(&mut t, 0xAE, Ldx, Absolute, 4);
    set(&mut t, 0xB0, Bcs, Relative, 2);
    set_paged(&mut t, 0xB1, Lda, IndirectIndexed, 5);
    set(&mut t, 0xB4, Ldy, ZeroPageX, 4);
    set(&mut t, 0xB5, Lda, ZeroPageX, 4);
    set(&mut t, 0xB6, Ldx, ZeroPageY, 4);
    set(&mut t, 0xB8, Clv, Implied, 2);
    set_paged(&mut t, 0xB9, Lda, AbsoluteY, 4);
    set(&mut t, 0xBA, Tsx, Implied, 2);
    set_paged(&mut t, 0xBC, Ldy, AbsoluteX, 4);
    set_paged(&mut t, 0xBD, Lda, AbsoluteX, 4);
    set_paged(&mut t, 0xBE, Ldx, AbsoluteY, 4);
    set(&mut t, 0xC0, Cpy, Immediate, 2);
    set(&mut t, 0xC1, Cmp, IndexedIndirect, 6);
    set(&mut t, 0xC4, Cpy, ZeroPage, 3);
    set(&mut t, 0xC5, Cmp, ZeroPage, 3);
    set(&mut t, 0xC6, Dec, ZeroPage, 5);
    set(&mut t, 0xC8, Iny, Implied, 2);
    set(&mut t, 0xC9, Cmp, Immediate, 2);
    set(&mut t, 0xCA, Dex, Implied, 2);
    set(&mut t, 0xCC, Cpy, Absolute, 4);
    set(&mut t, 0xCD, Cmp, Absolute, 4);
    set(&mut t, 0xCE, Dec, Absolute, 6);
    set(&mut t, 0xD0, Bne, Relative, 2);
    set_paged(&mut t, 0xD1, Cmp, IndirectIndexed, 5);
    set(&mut t, 0xD5, Cmp, ZeroPageX, 4);
    set(&mut t, 0xD6, Dec, ZeroPageX, 6);
    set(&mut t, 0xD8, Cld, Implied, 2);
    set_paged(&mut t, 0xD9, Cmp, AbsoluteY, 4);
    set_paged(&mut t, 0xDD, Cmp, AbsoluteX, 4);
    set(&mut t, 0xDE, Dec, AbsoluteX, 7);
    set(&mut t, 0xE0, Cpx, Immediate, 2);
    set(&mut t, 0xE1, Sbc, IndexedIndirect, 6);
    set(&mut t, 0xE4, Cpx, ZeroPage, 3);
    set(&mut t, 0xE5, Sbc, ZeroPage, 3);
    set(&mut t, 0xE6, Inc, ZeroPage, 5);
    set(&mut t, 0xE8, Inx, Implied, 2);
    set(&mut t, 0xE9, Sbc, Immediate, 2);
    set(&mut t, 0xEA, Nop, Implied, 2);
    set(&mut t, 0xEC, Cpx, Absolute, 4);
    set(&mut t, 0xED, Sbc, Absolute, 4);
    set(&mut t, 0xEE, Inc, Absolute, 6);
    set(&mut t, 0xF0, Beq, Relative, 2);
    set_paged(&mut t, 0xF1, Sbc, IndirectIndexed, 5);
    set(&mut t, 0xF5, Sbc, ZeroPageX, 4);
    set(&mut t, 0xF6, Inc, ZeroPageX, 6);
    set(&mut t, 0xF8, Sed, Implied, 2);
    set_paged(&mut t, 0xF9, Sbc, AbsoluteY, 4);
    set_paged(&mut t, 0xFD, Sbc, AbsoluteX, 4);
    set(&mut t, 0xFE, Inc, AbsoluteX, 7);

    t
}

/// NMOS: the official set plus the stable undocumented opcodes. The
/// unstable ones execute as correctly-sized NOPs; the jam opcodes are
/// two-cycle NOPs that log when hit.
fn nmos_table() -> [Instruction; 256] {
    use AddressingMode::*;
    use Mnemonic::*;

    let mut t = official_table();

    // Read-modify-write combos, one per addressing row.
    for (base, m) in [(0x00, Slo), (0x20, Rla), (0x40, Sre), (0x60, Rra)] {
        set_undoc(&mut t, base + 0x03, m, IndexedIndirect, 8);
        set_undoc(&mut t, base + 0x07, m, ZeroPage, 5);
        set_undoc(&mut t, base + 0x0F, m, Absolute, 6);
        set_undoc(&mut t, base + 0x13, m, IndirectIndexed, 8);
        set_undoc(&mut t, base + 0x17, m, ZeroPageX, 6);
        set_undoc(&mut t, base + 0x1B, m, AbsoluteY, 7);
        set_undoc(&mut t, base + 0x1F, m, AbsoluteX, 7);
    }
    for (base, m) in [(0xC0, Dcp), (0xE0, Isc)] {
        set_undoc(&mut t, base + 0x03, m, IndexedIndirect, 8);
        set_undoc(&mut t, base + 0x07, m, ZeroPage, 5);
        set_undoc(&mut t, base + 0x0F, m, Absolute, 6);
        set_undoc(&mut t, base + 0x13, m, IndirectIndexed, 8);
        set_undoc(&mut t, base + 0x17, m, ZeroPageX, 6);
        set_undoc(&mut t, base + 0x1B, m, AbsoluteY, 7);
        set_undoc(&mut t, base + 0x1F, m, AbsoluteX, 7);
    }

    set_undoc(&mut t, 0x83, Sax, IndexedIndirect, 6);
    set_undoc(&mut t, 0x87, Sax, ZeroPage, 3);
    set_undoc(&mut t, 0x8F, Sax, Absolute, 4);
    set_undoc(&mut t, 0x97, Sax, ZeroPageY, 4);

    set_undoc(&mut t, 0xA3, Lax, IndexedIndirect, 6);
    set_undoc(&mut t, 0xA7, Lax, ZeroPage, 3);
    set_undoc(&mut t, 0xAF, Lax, Absolute, 4);
    set_undoc_paged(&mut t, 0xB3, Lax, IndirectIndexed, 5);
    set_undoc(&mut t, 0xB7, Lax, ZeroPageY, 4);
    set_undoc_paged(&mut t, 0xBF, Lax, AbsoluteY, 4);

    set_undoc(&mut t, 0x0B, Anc, Immediate, 2);
    set_undoc(&mut t, 0x2B, Anc, Immediate, 2);
    set_undoc(&mut t, 0x4B, Alr, Immediate, 2);
    set_undoc(&mut t, 0x6B, Arr, Immediate, 2);
    set_undoc(&mut t, 0xCB, Sbx, Immediate, 2);
    set_undoc(&mut t, 0xEB, Sbc, Immediate, 2);

    // Wide NOPs with real operand fetches and timing.
    for op in [0x1A, 0x3A, 0x5A, 0x7A, 0xDA, 0xFA] {
        set_undoc(&mut t, op, Nop, Implied, 2);
    }
    for op in [0x80, 0x82, 0x89, 0xC2, 0xE2] {
        set_undoc(&mut t, op, Nop, Immediate, 2);
    }
    for op in [0x04, 0x44, 0x64] {
        set_undoc(&mut t, op, Nop, ZeroPage, 3);
    }
    for op in [0x14, 0x34, 0x54, 0x74, 0xD4, 0xF4] {
        set_undoc(&mut t, op, Nop, ZeroPageX, 4);
    }
    set_undoc(&mut t, 0x0C, Nop, Absolute, 4);
    for op in [0x1C, 0x3C, 0x5C, 0x7C, 0xDC, 0xFC] {
        set_undoc_paged(&mut t, op, Nop, AbsoluteX, 4);
    }

    // Unstable opcodes are not worth modeling; size them correctly.
    set_undoc(&mut t, 0x8B, Nop, Immediate, 2); // ANE
    set_undoc(&mut t, 0xAB, Nop, Immediate, 2); // LXA
    set_undoc(&mut t, 0x93, Nop, IndirectIndexed, 6); // SHA
    set_undoc(&mut t, 0x9B, Nop, AbsoluteY, 5); // TAS
    set_undoc(&mut t, 0x9C, Nop, AbsoluteX, 5); // SHY
    set_undoc(&mut t, 0x9E, Nop, AbsoluteY, 5); // SHX
    set_undoc(&mut t, 0x9F, Nop, AbsoluteY, 5); // SHA
    set_undoc_paged(&mut t, 0xBB, Nop, AbsoluteY, 4); // LAS

    for op in [0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2] {
        set_undoc(&mut t, op, Jam, Implied, 2);
    }

    t
}

/// 65C02/65C816 shared additions over the official set.
fn apply_cmos_core(t: &mut [Instruction; 256]) {
    use AddressingMode::*;
    use Mnemonic::*;

    for (op, m) in [
        (0x12, Ora),
        (0x32, And),
        (0x52, Eor),
        (0x72, Adc),
        (0x92, Sta),
        (0xB2, Lda),
        (0xD2, Cmp),
        (0xF2, Sbc),
    ] {
        set(t, op, m, ZeroPageIndirect, 5);
    }

    set(t, 0x80, Bra, Relative, 2);
    set(t, 0x89, Bit, Immediate, 2);
    set(t, 0x34, Bit, ZeroPageX, 4);
    set_paged(t, 0x3C, Bit, AbsoluteX, 4);
    set(t, 0x04, Tsb, ZeroPage, 5);
    set(t, 0x0C, Tsb, Absolute, 6);
    set(t, 0x14, Trb, ZeroPage, 5);
    set(t, 0x1C, Trb, Absolute, 6);
    set(t, 0x64, Stz, ZeroPage, 3);
    set(t, 0x74, Stz, ZeroPageX, 4);
    set(t, 0x9C, Stz, Absolute, 4);
    set(t, 0x9E, Stz, AbsoluteX, 5);
    set(t, 0x1A, Inc, Accumulator, 2);
    set(t, 0x3A, Dec, Accumulator, 2);
    set(t, 0x5A, Phy, Implied, 3);
    set(t, 0x7A, Ply, Implied, 4);
    set(t, 0xDA, Phx, Implied, 3);
    set(t, 0xFA, Plx, Implied, 4);
    set(t, 0x7C, Jmp, AbsoluteIndexedIndirect, 6);
    // The indirect-JMP page bug is fixed at the cost of a cycle.
    set(t, 0x6C, Jmp, Indirect, 6);
    set(t, 0xCB, Wai, Implied, 3);
    set(t, 0xDB, Stp, Implied, 3);
}

/// 65C02: CMOS core plus the Rockwell/WDC bit instructions; every hole
/// is a defined NOP of documented size and timing.
fn cmos_table() -> [Instruction; 256] {
    use AddressingMode::*;
    use Mnemonic::*;

    let mut t = official_table();

    // Defined NOP holes: columns 3, 7, B and F are one-cycle one-byte
    // NOPs except where the bit instructions land below.
    for row in 0..16u8 {
        for col in [0x03u8, 0x07, 0x0B, 0x0F] {
            set_undoc(&mut t, row * 0x10 + col, Nop, Implied, 1);
        }
    }
    for op in [0x02, 0x22, 0x42, 0x62, 0x82, 0xC2, 0xE2] {
        set_undoc(&mut t, op, Nop, Immediate, 2);
    }
    set_undoc(&mut t, 0x44, Nop, ZeroPage, 3);
    for op in [0x54, 0xD4, 0xF4] {
        set_undoc(&mut t, op, Nop, ZeroPageX, 4);
    }
    set_undoc(&mut t, 0x5C, Nop, Absolute, 8);
    set_undoc(&mut t, 0xDC, Nop, Absolute, 4);
    set_undoc(&mut t, 0xFC, Nop, Absolute, 4);

    apply_cmos_core(&mut t);

    for bit in 0..8u8 {
        set(&mut t, 0x07 + bit * 0x10, Rmb(bit), ZeroPage, 5);
        set(&mut t, 0x87 + bit * 0x10, Smb(bit), ZeroPage, 5);
        set(&mut t, 0x0F + bit * 0x10, Bbr(bit), ZeroPageRelative, 5);
        set(&mut t, 0x8F + bit * 0x10, Bbs(bit), ZeroPageRelative, 5);
    }

    t
}

/// 65C816 (emulation mode): CMOS core plus the extended addressing
/// columns and the new transfer/stack/control opcodes. Every opcode is
/// defined; there are no undocumented holes.
fn m65816_table() -> [Instruction; 256] {
    use AddressingMode::*;
    use Mnemonic::*;

    let mut t = official_table();
    apply_cmos_core(&mut t);

    for (row, m) in [
        (0x00, Ora),
        (0x20, And),
        (0x40, Eor),
        (0x60, Adc),
        (0x80, Sta),
        (0xA0, Lda),
        (0xC0, Cmp),
        (0xE0, Sbc),
    ] {
        set(&mut t, row + 0x03, m, StackRelative, 4);
        set(&mut t, row + 0x07, m, IndirectLong, 6);
        set(&mut t, row + 0x0F, m, AbsoluteLong, 5);
        set(&mut t, row + 0x13, m, StackRelativeIndirectY, 7);
        set(&mut t, row + 0x17, m, IndirectLongY, 6);
        set(&mut t, row + 0x1F, m, AbsoluteLongX, 5);
    }

    set(&mut t, 0x0B, Phd, Implied, 4);
    set(&mut t, 0x1B, Tcs, Implied, 2);
    set(&mut t, 0x2B, Pld, Implied, 5);
    set(&mut t, 0x3B, Tsc, Implied, 2);
    set(&mut t, 0x4B, Phk, Implied, 3);
    set(&mut t, 0x5B, Tcd, Implied, 2);
    set(&mut t, 0x6B, Rtl, Implied, 6);
    set(&mut t, 0x7B, Tdc, Implied, 2);
    set(&mut t, 0x8B, Phb, Implied, 3);
    set(&mut t, 0x9B, Txy, Implied, 2);
    set(&mut t, 0xAB, Plb, Implied, 4);
    set(&mut t, 0xBB, Tyx, Implied, 2);
    set(&mut t, 0xEB, Xba, Implied, 3);
    set(&mut t, 0xFB, Xce, Implied, 2);

    set(&mut t, 0x02, Cop, Immediate, 7);
    set(&mut t, 0x22, Jsl, AbsoluteLong, 8);
    set(&mut t, 0x42, Wdm, Immediate, 2);
    set(&mut t, 0x62, Per, RelativeLong, 6);
    set(&mut t, 0x82, Brl, RelativeLong, 4);
    set(&mut t, 0xC2, Rep, Immediate, 3);
    set(&mut t, 0xE2, Sep, Immediate, 3);

    set(&mut t, 0x44, Mvp, BlockMove, 7);
    set(&mut t, 0x54, Mvn, BlockMove, 7);
    set(&mut t, 0xD4, Pei, ZeroPageIndirect, 6);
    set(&mut t, 0xF4, Pea, Absolute, 5);

    set(&mut t, 0x5C, Jml, AbsoluteLong, 4);
    set(&mut t, 0xDC, Jml, Indirect, 6);

    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_total_and_costs_at_least_one_cycle() {
        for behavior in [
            CpuBehavior::Nmos6502,
            CpuBehavior::Cmos6502,
            CpuBehavior::Cmos65816,
        ] {
            for opcode in 0..=255u8 {
                let ins = lookup(behavior, opcode);
                assert!(ins.cycles >= 1, "{:#04X} on {}", opcode, behavior);
                assert!(
                    ins.mode.available_on(behavior),
                    "{:#04X} uses {:?} on {}",
                    opcode,
                    ins.mode,
                    behavior
                );
            }
        }
    }

    #[test]
    fn behavior_names_parse() {
        assert_eq!("6502".parse::<CpuBehavior>().unwrap(), CpuBehavior::Nmos6502);
        assert_eq!("65C02".parse::<CpuBehavior>().unwrap(), CpuBehavior::Cmos6502);
        assert_eq!(
            "65c816".parse::<CpuBehavior>().unwrap(),
            CpuBehavior::Cmos65816
        );
        assert!("z80".parse::<CpuBehavior>().is_err());
    }

    #[test]
    fn indirect_jmp_costs_differ_between_nmos_and_cmos() {
        assert_eq!(lookup(CpuBehavior::Nmos6502, 0x6C).cycles, 5);
        assert_eq!(lookup(CpuBehavior::Cmos6502, 0x6C).cycles, 6);
    }
}
