use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    acia::Acia,
    bus::{AddressRange, Bus, BusError},
    cpu::{Cpu, Step},
    crtc::Crtc,
    device::Device,
    instruction::CpuBehavior,
    memory::Memory,
    pia::Pia,
    state::CpuState,
};

#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("ROM image is {len} bytes, larger than the {size} byte ROM region")]
    ImageTooLarge { len: usize, size: u32 },

    #[error("this machine has no ROM region")]
    NoRom,
}

#[derive(Debug, Error)]
#[error("unknown machine type {0}")]
pub struct UnknownMachine(String);

/// The hobby-board presets. Each is a fixed recipe of devices at fixed
/// addresses; the address constants live in `map()`.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub enum MachineKind {
    Simple,
    Multicomp,
    Symon,
    BenEater,
    Xt6502,
}

impl MachineKind {
    pub const ALL: [MachineKind; 5] = [
        MachineKind::Simple,
        MachineKind::Multicomp,
        MachineKind::Symon,
        MachineKind::BenEater,
        MachineKind::Xt6502,
    ];

    /// CPU fitted to the board when none is asked for explicitly.
    pub fn default_behavior(&self) -> CpuBehavior {
        match self {
            MachineKind::BenEater | MachineKind::Xt6502 => CpuBehavior::Cmos6502,
            _ => CpuBehavior::Nmos6502,
        }
    }

    fn map(&self) -> MachineMap {
        match self {
            MachineKind::Simple => MachineMap {
                ram: AddressRange::new(0x0000, 0xFFFF),
                rom: None,
                acia: None,
                pia: None,
                crtc: None,
            },
            MachineKind::Multicomp => MachineMap {
                ram: AddressRange::new(0x0000, 0xDFCF),
                rom: Some(AddressRange::new(0xE000, 0xFFFF)),
                acia: Some(AddressRange::new(0xDFD0, 0xDFD3)),
                pia: None,
                crtc: None,
            },
            MachineKind::Symon => MachineMap {
                ram: AddressRange::new(0x0000, 0x7FFF),
                rom: Some(AddressRange::new(0xD000, 0xFFFF)),
                acia: Some(AddressRange::new(0x8800, 0x8803)),
                pia: Some(AddressRange::new(0x8000, 0x800F)),
                crtc: Some(AddressRange::new(0x9000, 0x9001)),
            },
            MachineKind::BenEater => MachineMap {
                ram: AddressRange::new(0x0000, 0x3FFF),
                rom: Some(AddressRange::new(0x8000, 0xFFFF)),
                acia: Some(AddressRange::new(0x5000, 0x5003)),
                pia: Some(AddressRange::new(0x6000, 0x600F)),
                crtc: None,
            },
            MachineKind::Xt6502 => MachineMap {
                ram: AddressRange::new(0x0000, 0xDFEF),
                rom: Some(AddressRange::new(0xE000, 0xFFFF)),
                acia: Some(AddressRange::new(0xDFF0, 0xDFF3)),
                pia: None,
                crtc: None,
            },
        }
    }
}

impl FromStr for MachineKind {
    type Err = UnknownMachine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(MachineKind::Simple),
            "multicomp" => Ok(MachineKind::Multicomp),
            "symon" => Ok(MachineKind::Symon),
            "beneater" => Ok(MachineKind::BenEater),
            "6502xt" => Ok(MachineKind::Xt6502),
            other => Err(UnknownMachine(other.to_string())),
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineKind::Simple => write!(f, "simple"),
            MachineKind::Multicomp => write!(f, "multicomp"),
            MachineKind::Symon => write!(f, "symon"),
            MachineKind::BenEater => write!(f, "beneater"),
            MachineKind::Xt6502 => write!(f, "6502xt"),
        }
    }
}

/// Address constants for one preset.
#[derive(Debug, Copy, Clone)]
struct MachineMap {
    ram: AddressRange,
    rom: Option<AddressRange>,
    acia: Option<AddressRange>,
    pia: Option<AddressRange>,
    crtc: Option<AddressRange>,
}

/// One bus, one processor, and the preset's devices at their fixed
/// ranges. Peripheral accessors return `None` on boards that lack the
/// part rather than a stub device.
pub struct Machine {
    kind: MachineKind,
    map: MachineMap,
    bus: Bus,
    cpu: Cpu,
    rom_loaded: bool,
}

impl Machine {
    /// Build a preset. A missing or unreadable ROM image falls back to
    /// blank writable memory in the ROM region — deliberately usable
    /// for typing programs in by hand — and `rom_loaded()` reports
    /// which happened.
    pub fn new(
        kind: MachineKind,
        behavior: Option<CpuBehavior>,
        rom_image: Option<&Path>,
    ) -> Result<Self, MachineError> {
        let behavior = behavior.unwrap_or_else(|| kind.default_behavior());
        let map = kind.map();
        tracing::info!("building {} machine with {} cpu", kind, behavior);

        let mut bus = Bus::new();
        bus.attach(Device::Memory(Memory::ram(map.ram.len())), map.ram)?;
        if let Some(range) = map.acia {
            bus.attach(Device::Acia(Acia::new()), range)?;
        }
        if let Some(range) = map.pia {
            bus.attach(Device::Pia(Pia::new()), range)?;
        }
        if let Some(range) = map.crtc {
            bus.attach(Device::Crtc(Crtc::new()), range)?;
        }

        let mut rom_loaded = false;
        if map.rom.is_none() {
            if let Some(path) = rom_image {
                tracing::info!(
                    "{} has no ROM region; ignoring image {}",
                    kind,
                    path.display()
                );
            }
        }
        if let Some(range) = map.rom {
            let rom = match rom_image {
                Some(path) => match std::fs::read(path) {
                    Ok(image) if image.len() > range.len() as usize => {
                        return Err(MachineError::ImageTooLarge {
                            len: image.len(),
                            size: range.len(),
                        });
                    }
                    Ok(image) => {
                        tracing::info!("loading ROM image from {}", path.display());
                        rom_loaded = true;
                        let mut rom = Memory::rom(&image, range.len());
                        rom.image_path = Some(path.to_path_buf());
                        rom
                    }
                    Err(err) => {
                        tracing::info!(
                            "ROM image {} not readable ({}), loading empty R/W memory",
                            path.display(),
                            err
                        );
                        Memory::ram(range.len())
                    }
                },
                None => {
                    tracing::info!("no ROM image specified, loading empty R/W memory");
                    Memory::ram(range.len())
                }
            };
            bus.attach(Device::Memory(rom), range)?;
        }

        let mut cpu = Cpu::new(behavior);
        cpu.reset(&mut bus);

        Ok(Machine {
            kind,
            map,
            bus,
            cpu,
            rom_loaded,
        })
    }

    pub fn kind(&self) -> MachineKind {
        self.kind
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn state(&self) -> CpuState {
        self.cpu.state()
    }

    pub fn rom_loaded(&self) -> bool {
        self.rom_loaded
    }

    pub fn rom_range(&self) -> Option<AddressRange> {
        self.map.rom
    }

    pub fn ram(&self) -> &Memory {
        match self.bus.device_at(self.map.ram.base) {
            Some(Device::Memory(mem)) => mem,
            _ => panic!("RAM binding missing from bus"),
        }
    }

    pub fn rom(&self) -> Option<&Memory> {
        let range = self.map.rom?;
        match self.bus.device_at(range.base) {
            Some(Device::Memory(mem)) => Some(mem),
            _ => None,
        }
    }

    pub fn acia(&self) -> Option<&Acia> {
        let range = self.map.acia?;
        match self.bus.device_at(range.base) {
            Some(Device::Acia(acia)) => Some(acia),
            _ => None,
        }
    }

    pub fn acia_mut(&mut self) -> Option<&mut Acia> {
        let range = self.map.acia?;
        match self.bus.device_at_mut(range.base) {
            Some(Device::Acia(acia)) => Some(acia),
            _ => None,
        }
    }

    pub fn pia(&self) -> Option<&Pia> {
        let range = self.map.pia?;
        match self.bus.device_at(range.base) {
            Some(Device::Pia(pia)) => Some(pia),
            _ => None,
        }
    }

    pub fn pia_mut(&mut self) -> Option<&mut Pia> {
        let range = self.map.pia?;
        match self.bus.device_at_mut(range.base) {
            Some(Device::Pia(pia)) => Some(pia),
            _ => None,
        }
    }

    pub fn crtc(&self) -> Option<&Crtc> {
        let range = self.map.crtc?;
        match self.bus.device_at(range.base) {
            Some(Device::Crtc(crtc)) => Some(crtc),
            _ => None,
        }
    }

    /// Swap in a new ROM image: detach the old ROM device, attach a
    /// fresh one over the same range. All other bindings are untouched.
    pub fn replace_rom(&mut self, image: &[u8]) -> Result<(), MachineError> {
        let range = self.map.rom.ok_or(MachineError::NoRom)?;
        if image.len() > range.len() as usize {
            return Err(MachineError::ImageTooLarge {
                len: image.len(),
                size: range.len(),
            });
        }

        let old = self.bus.detach(range.base);
        match self.bus.attach(Device::Memory(Memory::rom(image, range.len())), range) {
            Ok(()) => {
                self.rom_loaded = true;
                Ok(())
            }
            Err(err) => {
                if let Some(old) = old {
                    let _ = self.bus.attach(old, range);
                }
                Err(err.into())
            }
        }
    }

    /// One instruction: step the processor, let timers observe the
    /// elapsed cycles, then mirror the device interrupt lines onto the
    /// processor for the next boundary.
    pub fn step(&mut self) -> Step {
        let step = self.cpu.step(&mut self.bus);
        self.bus.tick(step.cycles);
        if self.bus.irq_asserted() {
            self.cpu.assert_irq();
        } else {
            self.cpu.clear_irq();
        }
        step
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_build_without_conflicts() {
        for kind in MachineKind::ALL {
            let machine = Machine::new(kind, None, None).unwrap();
            assert_eq!(machine.kind(), kind);
        }
    }

    #[test]
    fn simple_machine_has_no_peripherals() {
        let machine = Machine::new(MachineKind::Simple, None, None).unwrap();
        assert!(machine.rom().is_none());
        assert!(machine.acia().is_none());
        assert!(machine.pia().is_none());
        assert!(machine.crtc().is_none());
    }

    #[test]
    fn machine_names_parse() {
        assert_eq!("symon".parse::<MachineKind>().unwrap(), MachineKind::Symon);
        assert_eq!(
            "6502XT".parse::<MachineKind>().unwrap(),
            MachineKind::Xt6502
        );
        assert!("c64".parse::<MachineKind>().is_err());
    }
}
