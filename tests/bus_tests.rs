use r6502::{
    acia, Acia, AddressRange, Bus, BusError, Device, Memory,
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

fn ram(size: u32) -> Device {
    Device::Memory(Memory::ram(size))
}

#[test]
fn overlapping_attach_fails_and_leaves_bus_unchanged() {
    let mut bus = Bus::new();
    bus.attach(ram(0x1000), AddressRange::new(0x1000, 0x1FFF))
        .unwrap();
    bus.write(0x1234, 0x42);

    let result = bus.attach(ram(0x1000), AddressRange::new(0x1800, 0x27FF));
    assert!(matches!(result, Err(BusError::RangeConflict { .. })));

    // The original binding set is intact: the first device still owns
    // its range and nothing claims the rest of the attempted range.
    assert_eq!(bus.peek(0x1234), 0x42);
    assert_eq!(bus.ranges(), vec![AddressRange::new(0x1000, 0x1FFF)]);
    assert_eq!(bus.read(0x2000), 0);
}

#[test]
fn attach_rejects_a_range_that_does_not_fit_the_device() {
    let mut bus = Bus::new();
    let result = bus.attach(ram(0x100), AddressRange::new(0x0000, 0x01FF));
    assert!(matches!(result, Err(BusError::SizeMismatch { .. })));
}

#[test]
fn unmapped_access_floats_instead_of_failing() {
    let mut bus = Bus::new();
    bus.attach(ram(0x100), AddressRange::new(0x0000, 0x00FF))
        .unwrap();

    assert_eq!(bus.read(0x8000), 0);
    // Writes to nowhere are dropped, not faults.
    bus.write(0x8000, 0xAA);
    assert_eq!(bus.read(0x8000), 0);
}

#[test]
fn ram_read_after_write_round_trips() {
    let mut bus = Bus::new();
    bus.attach(ram(0x4000), AddressRange::new(0x0000, 0x3FFF))
        .unwrap();

    bus.write(0x1234, 0xA5);
    assert_eq!(bus.read(0x1234), 0xA5);
    assert_eq!(bus.read(0x1234), 0xA5);
}

#[test]
fn status_register_reads_have_side_effects_but_peek_does_not() {
    let mut bus = Bus::new();
    let mut serial = Acia::new();
    serial.write(acia::REG_COMMAND, 0x02); // enable receive interrupts
    serial.receive(b'A');
    bus.attach(Device::Acia(serial), AddressRange::new(0x8800, 0x8803))
        .unwrap();

    let status_addr = 0x8800 + acia::REG_STATUS;

    // Peek as often as you like; the IRQ flag stays up.
    assert_eq!(bus.peek(status_addr) & acia::STATUS_IRQ, acia::STATUS_IRQ);
    assert_eq!(bus.peek(status_addr) & acia::STATUS_IRQ, acia::STATUS_IRQ);

    // One processor read reports the flag and clears it.
    assert_eq!(bus.read(status_addr) & acia::STATUS_IRQ, acia::STATUS_IRQ);
    assert_eq!(bus.read(status_addr) & acia::STATUS_IRQ, 0);
}

#[test]
fn data_register_read_consumes_exactly_one_byte() {
    let mut bus = Bus::new();
    let mut serial = Acia::new();
    serial.receive(0x11);
    serial.receive(0x22);
    bus.attach(Device::Acia(serial), AddressRange::new(0x8800, 0x8803))
        .unwrap();

    let data_addr = 0x8800 + acia::REG_DATA;
    assert_eq!(bus.read(data_addr), 0x11);
    assert_eq!(bus.read(data_addr), 0x22);
    assert_eq!(bus.read(data_addr), 0);
}

#[test]
fn detach_and_reattach_preserves_other_bindings() {
    let mut bus = Bus::new();
    bus.attach(ram(0x8000), AddressRange::new(0x0000, 0x7FFF))
        .unwrap();
    bus.attach(Device::Acia(Acia::new()), AddressRange::new(0x8800, 0x8803))
        .unwrap();
    bus.attach(
        Device::Memory(Memory::rom(&[0xEA; 0x1000], 0x1000)),
        AddressRange::new(0xF000, 0xFFFF),
    )
    .unwrap();

    bus.write(0x0042, 0x99);
    assert_eq!(bus.read(0xF000), 0xEA);

    // Swap the ROM for a different image.
    let old = bus.detach(0xF000).expect("ROM was attached");
    assert_eq!(old.name(), "ROM");
    assert_eq!(bus.read(0xF000), 0, "detached range is unmapped");

    bus.attach(
        Device::Memory(Memory::rom(&[0x60; 0x1000], 0x1000)),
        AddressRange::new(0xF000, 0xFFFF),
    )
    .unwrap();

    assert_eq!(bus.read(0xF000), 0x60);
    // RAM and the serial port kept their state and their ranges.
    assert_eq!(bus.read(0x0042), 0x99);
    assert!(bus.device_at(0x8800).is_some());
}

#[test]
fn word_helpers_are_little_endian() {
    let mut bus = Bus::new();
    bus.attach(ram(0x100), AddressRange::new(0x0000, 0x00FF))
        .unwrap();

    bus.write(0x10, 0x34);
    bus.write(0x11, 0x12);
    assert_eq!(bus.read_word(0x10), 0x1234);
    assert_eq!(bus.peek_word(0x10), 0x1234);
}
