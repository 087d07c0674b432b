use std::path::PathBuf;

use r6502::{
    machine::{Machine, MachineError, MachineKind},
    CpuBehavior,
};

#[cfg(test)]
#[ctor::ctor]
fn init() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Drop-cleaned temp file holding a ROM image.
struct TempRom(PathBuf);

impl TempRom {
    fn new(name: &str, image: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!("r6502-{}-{}", std::process::id(), name));
        std::fs::write(&path, image).unwrap();
        TempRom(path)
    }
}

impl Drop for TempRom {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

#[test]
fn every_preset_builds_and_exposes_its_parts() {
    let symon = Machine::new(MachineKind::Symon, None, None).unwrap();
    assert!(symon.rom().is_some());
    assert!(symon.acia().is_some());
    assert!(symon.pia().is_some());
    assert!(symon.crtc().is_some());

    let multicomp = Machine::new(MachineKind::Multicomp, None, None).unwrap();
    assert!(multicomp.acia().is_some());
    assert!(multicomp.pia().is_none());
    assert!(multicomp.crtc().is_none());

    let simple = Machine::new(MachineKind::Simple, None, None).unwrap();
    assert!(simple.rom().is_none());
    assert!(simple.acia().is_none());
}

#[test]
fn preset_default_cpu_can_be_overridden() {
    let machine = Machine::new(MachineKind::BenEater, None, None).unwrap();
    assert_eq!(machine.cpu().behavior(), CpuBehavior::Cmos6502);

    let machine =
        Machine::new(MachineKind::BenEater, Some(CpuBehavior::Nmos6502), None).unwrap();
    assert_eq!(machine.cpu().behavior(), CpuBehavior::Nmos6502);
}

#[test]
fn rom_image_supplies_the_reset_vector() {
    // Symon ROM spans $D000-$FFFF; point the reset vector at $D000.
    let mut image = vec![0xEA; 0x3000];
    image[0x2FFC] = 0x00;
    image[0x2FFD] = 0xD0;
    let rom = TempRom::new("vector.bin", &image);

    let machine = Machine::new(MachineKind::Symon, None, Some(&rom.0)).unwrap();
    assert!(machine.rom_loaded());
    assert_eq!(machine.cpu().pc(), 0xD000);
    assert!(machine.rom().unwrap().is_read_only());
}

#[test]
fn missing_rom_image_falls_back_to_writable_memory() {
    let mut machine = Machine::new(
        MachineKind::Symon,
        None,
        Some(std::path::Path::new("/no/such/rom.bin")),
    )
    .unwrap();

    assert!(!machine.rom_loaded(), "fallback must be observable");
    machine.bus_mut().write(0xD000, 0x42);
    assert_eq!(machine.bus().peek(0xD000), 0x42, "region is plain RAM");
}

#[test]
fn oversized_rom_image_is_a_construction_error() {
    let image = vec![0x00; 0x3001];
    let rom = TempRom::new("too-big.bin", &image);

    let result = Machine::new(MachineKind::Symon, None, Some(&rom.0));
    assert!(matches!(result, Err(MachineError::ImageTooLarge { .. })));
}

#[test]
fn rom_swap_preserves_every_other_binding() {
    let mut machine = Machine::new(MachineKind::Symon, None, None).unwrap();

    machine.bus_mut().write(0x0042, 0x99);
    machine.bus_mut().write(0x8802, 0x0A); // ACIA command register

    machine.replace_rom(&[0x60; 0x3000]).unwrap();

    assert_eq!(machine.bus().peek(0x0042), 0x99, "RAM contents survive");
    assert_eq!(machine.bus().peek(0x8802), 0x0A, "ACIA state survives");
    assert_eq!(machine.bus().peek(0xD000), 0x60);
    assert!(machine.rom().unwrap().is_read_only());
    assert!(machine.rom_loaded());

    // The swapped ROM really is write-protected.
    machine.bus_mut().write(0xD000, 0x00);
    assert_eq!(machine.bus().peek(0xD000), 0x60);
}

#[test]
fn simple_machine_has_no_rom_to_swap() {
    let mut machine = Machine::new(MachineKind::Simple, None, None).unwrap();
    assert!(matches!(
        machine.replace_rom(&[0x00]),
        Err(MachineError::NoRom)
    ));
}

#[test]
fn acia_receive_interrupt_reaches_the_processor() {
    let mut machine = Machine::new(MachineKind::Symon, None, None).unwrap();

    // Blank-ROM fallback is writable: hand-assemble a tiny program.
    let bus = machine.bus_mut();
    bus.write_block(0xD000, &[0x58, 0xEA, 0xEA, 0xEA]); // CLI; NOPs
    bus.write_block(0xD100, &[0x40]); // RTI
    bus.write(0xFFFC, 0x00);
    bus.write(0xFFFD, 0xD0);
    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0xD1);
    machine.reset();

    machine.bus_mut().write(0x8802, 0x02); // ACIA command: receive IRQ enable
    machine.step(); // CLI

    machine.acia_mut().unwrap().receive(b'x');
    machine.step(); // NOP; the IRQ line is sampled afterwards
    machine.step(); // interrupt sequence
    assert_eq!(machine.cpu().pc(), 0xD100);
}

#[test]
fn pia_timer_interrupt_fires_through_the_machine_loop() {
    let mut machine = Machine::new(MachineKind::BenEater, None, None).unwrap();

    let program = [
        0x58, // CLI
        0xA9, 0xC0, // LDA #$C0
        0x8D, 0x0E, 0x60, // STA $600E  (IER: enable timer 1)
        0xA9, 0x20, // LDA #$20
        0x8D, 0x04, 0x60, // STA $6004  (T1 latch low)
        0xA9, 0x00, // LDA #$00
        0x8D, 0x05, 0x60, // STA $6005  (arm timer 1)
        0x4C, 0x10, 0x80, // JMP self
    ];
    let bus = machine.bus_mut();
    bus.write_block(0x8000, &program);
    bus.write_block(0x9000, &[0xEA]); // handler
    bus.write(0xFFFC, 0x00);
    bus.write(0xFFFD, 0x80);
    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x90);
    machine.reset();

    for _ in 0..32 {
        machine.step();
        if machine.cpu().pc() == 0x9000 {
            return;
        }
    }
    panic!("timer interrupt never reached the handler");
}

#[test]
fn reset_reinitializes_devices_and_vector() {
    let mut machine = Machine::new(MachineKind::Symon, None, None).unwrap();
    let bus = machine.bus_mut();
    bus.write(0xFFFC, 0x34);
    bus.write(0xFFFD, 0x12);
    bus.write(0x8802, 0x02);

    machine.reset();
    assert_eq!(machine.cpu().pc(), 0x1234);
    assert_eq!(
        machine.bus().peek(0x8802),
        0,
        "ACIA command register cleared by reset"
    );
}
