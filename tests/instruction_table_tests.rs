use r6502::{lookup, AddressingMode, CpuBehavior, Mnemonic};

const BEHAVIORS: [CpuBehavior; 3] = [
    CpuBehavior::Nmos6502,
    CpuBehavior::Cmos6502,
    CpuBehavior::Cmos65816,
];

#[test]
fn every_opcode_resolves_for_every_behavior() {
    for behavior in BEHAVIORS {
        for opcode in 0..=255u8 {
            let ins = lookup(behavior, opcode);
            assert!(
                ins.cycles >= 1,
                "opcode {:#04X} on {} has zero cycle cost",
                opcode,
                behavior
            );
            assert!(
                ins.mode.available_on(behavior),
                "opcode {:#04X} on {} resolves to mode {:?} that behavior lacks",
                opcode,
                behavior,
                ins.mode
            );
        }
    }
}

#[test]
fn documented_core_is_shared_across_behaviors() {
    // A few anchors of the official set that must agree everywhere.
    for behavior in BEHAVIORS {
        let lda = lookup(behavior, 0xA9);
        assert_eq!(lda.mnemonic, Mnemonic::Lda);
        assert_eq!(lda.mode, AddressingMode::Immediate);
        assert_eq!(lda.cycles, 2);

        let brk = lookup(behavior, 0x00);
        assert_eq!(brk.mnemonic, Mnemonic::Brk);
        assert_eq!(brk.cycles, 7);

        let sta_abs_x = lookup(behavior, 0x9D);
        assert_eq!(sta_abs_x.mnemonic, Mnemonic::Sta);
        assert_eq!(sta_abs_x.cycles, 5);
        assert!(!sta_abs_x.page_penalty, "stores never pay the page cycle");
    }
}

#[test]
fn indexed_loads_carry_the_page_penalty_flag() {
    for behavior in BEHAVIORS {
        assert!(lookup(behavior, 0xBD).page_penalty); // LDA abs,X
        assert!(lookup(behavior, 0xB9).page_penalty); // LDA abs,Y
        assert!(lookup(behavior, 0xB1).page_penalty); // LDA (zp),Y
    }
}

#[test]
fn indirect_jmp_is_one_cycle_slower_on_cmos() {
    assert_eq!(lookup(CpuBehavior::Nmos6502, 0x6C).cycles, 5);
    assert_eq!(lookup(CpuBehavior::Cmos6502, 0x6C).cycles, 6);
    assert_eq!(lookup(CpuBehavior::Cmos65816, 0x6C).cycles, 6);
}

#[test]
fn nmos_quasi_official_opcodes_are_marked_undocumented() {
    let lax = lookup(CpuBehavior::Nmos6502, 0xA7);
    assert_eq!(lax.mnemonic, Mnemonic::Lax);
    assert!(!lax.documented);

    let slo = lookup(CpuBehavior::Nmos6502, 0x03);
    assert_eq!(slo.mnemonic, Mnemonic::Slo);
    assert_eq!(slo.cycles, 8);

    // Jam opcodes still cost cycles and carry a defined mode.
    let jam = lookup(CpuBehavior::Nmos6502, 0x02);
    assert_eq!(jam.mnemonic, Mnemonic::Jam);
    assert!(jam.cycles >= 1);
}

#[test]
fn cmos_fills_nmos_holes_with_defined_nops() {
    // SLO (zp,X) on NMOS is a one-cycle NOP on the 65C02.
    let hole = lookup(CpuBehavior::Cmos6502, 0x03);
    assert_eq!(hole.mnemonic, Mnemonic::Nop);
    assert_eq!(hole.cycles, 1);
    assert!(!hole.documented);

    // The 65C02 additions live where NMOS had nothing.
    assert_eq!(lookup(CpuBehavior::Cmos6502, 0x80).mnemonic, Mnemonic::Bra);
    assert_eq!(lookup(CpuBehavior::Cmos6502, 0x64).mnemonic, Mnemonic::Stz);
    assert_eq!(
        lookup(CpuBehavior::Cmos6502, 0x7C).mode,
        AddressingMode::AbsoluteIndexedIndirect
    );
    assert_eq!(
        lookup(CpuBehavior::Cmos6502, 0x0F).mnemonic,
        Mnemonic::Bbr(0)
    );
}

#[test]
fn m65816_extends_the_addressing_modes() {
    assert_eq!(
        lookup(CpuBehavior::Cmos65816, 0x03).mode,
        AddressingMode::StackRelative
    );
    assert_eq!(
        lookup(CpuBehavior::Cmos65816, 0x07).mode,
        AddressingMode::IndirectLong
    );
    assert_eq!(
        lookup(CpuBehavior::Cmos65816, 0xAF).mode,
        AddressingMode::AbsoluteLong
    );
    assert_eq!(lookup(CpuBehavior::Cmos65816, 0x22).mnemonic, Mnemonic::Jsl);
    assert_eq!(lookup(CpuBehavior::Cmos65816, 0x54).mnemonic, Mnemonic::Mvn);

    // The Rockwell bit instructions do not exist on the 65C816; those
    // slots hold the long addressing column instead.
    assert_eq!(lookup(CpuBehavior::Cmos65816, 0x0F).mnemonic, Mnemonic::Ora);
}

#[test]
fn operand_widths_match_the_modes() {
    use AddressingMode::*;
    assert_eq!(Implied.operand_bytes(), 0);
    assert_eq!(Immediate.operand_bytes(), 1);
    assert_eq!(Absolute.operand_bytes(), 2);
    assert_eq!(AbsoluteLong.operand_bytes(), 3);
    assert_eq!(ZeroPageRelative.operand_bytes(), 2);
    assert_eq!(BlockMove.operand_bytes(), 2);
}
