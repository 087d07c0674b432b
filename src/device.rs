use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{acia::Acia, crtc::Crtc, memory::Memory, pia::Pia};

/// Every addressable unit on the bus. A closed set: the bus dispatches
/// with a single match instead of boxed trait objects.
///
/// Devices are offset-addressed (0 to size-1); the bus owns the binding
/// to an absolute address range. `read` is the processor path and may
/// carry register side effects; `peek` never does.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum Device {
    Memory(Memory),
    Acia(Acia),
    Pia(Pia),
    Crtc(Crtc),
}

impl Device {
    pub fn name(&self) -> &'static str {
        match self {
            Device::Memory(mem) if mem.is_read_only() => "ROM",
            Device::Memory(_) => "RAM",
            Device::Acia(_) => "ACIA",
            Device::Pia(_) => "PIA",
            Device::Crtc(_) => "CRTC",
        }
    }

    pub fn size(&self) -> u32 {
        match self {
            Device::Memory(mem) => mem.size(),
            Device::Acia(acia) => acia.size(),
            Device::Pia(pia) => pia.size(),
            Device::Crtc(crtc) => crtc.size(),
        }
    }

    pub fn read(&mut self, offset: u16) -> u8 {
        match self {
            Device::Memory(mem) => mem.read(offset),
            Device::Acia(acia) => acia.read(offset),
            Device::Pia(pia) => pia.read(offset),
            Device::Crtc(crtc) => crtc.read(offset),
        }
    }

    pub fn peek(&self, offset: u16) -> u8 {
        match self {
            Device::Memory(mem) => mem.read(offset),
            Device::Acia(acia) => acia.peek(offset),
            Device::Pia(pia) => pia.peek(offset),
            Device::Crtc(crtc) => crtc.peek(offset),
        }
    }

    pub fn write(&mut self, offset: u16, value: u8) {
        match self {
            Device::Memory(mem) => mem.write(offset, value),
            Device::Acia(acia) => acia.write(offset, value),
            Device::Pia(pia) => pia.write(offset, value),
            Device::Crtc(crtc) => crtc.write(offset, value),
        }
    }

    pub fn reset(&mut self) {
        match self {
            // Memory survives a reset, like the real chips.
            Device::Memory(_) => (),
            Device::Acia(acia) => acia.reset(),
            Device::Pia(pia) => pia.reset(),
            Device::Crtc(crtc) => crtc.reset(),
        }
    }

    pub fn irq_asserted(&self) -> bool {
        match self {
            Device::Acia(acia) => acia.irq_asserted(),
            Device::Pia(pia) => pia.irq_asserted(),
            Device::Memory(_) | Device::Crtc(_) => false,
        }
    }

    /// Let time-dependent devices observe elapsed processor cycles.
    pub fn tick(&mut self, cycles: u32) {
        if let Device::Pia(pia) = self {
            pia.tick(cycles);
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Memory(mem) => write!(f, "{} size={:#06X}", self.name(), mem.size()),
            other => write!(f, "{}", other.name()),
        }
    }
}
