use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::Device;

/// Inclusive span of bus addresses.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct AddressRange {
    pub base: u16,
    pub top: u16,
}

impl AddressRange {
    pub fn new(base: u16, top: u16) -> Self {
        assert!(base <= top, "range base {:#06X} above top {:#06X}", base, top);
        AddressRange { base, top }
    }

    pub fn contains(&self, address: u16) -> bool {
        address >= self.base && address <= self.top
    }

    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.base <= other.top && other.base <= self.top
    }

    pub fn len(&self) -> u32 {
        self.top as u32 - self.base as u32 + 1
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:04X}-${:04X}", self.base, self.top)
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("range {range} for {device} conflicts with {existing} ({occupant})")]
    RangeConflict {
        range: AddressRange,
        device: String,
        existing: AddressRange,
        occupant: String,
    },

    #[error("{device} spans {device_size} bytes but range {range} holds {range_len}")]
    SizeMismatch {
        range: AddressRange,
        device: String,
        device_size: u32,
        range_len: u32,
    },
}

struct Binding {
    range: AddressRange,
    device: Device,
}

/// The 16-bit address space: an ordered set of non-overlapping device
/// bindings, and the only path for memory traffic. Every processor
/// access dispatches to the owning device exactly once; debugger-style
/// inspection goes through `peek`, which cannot trip register side
/// effects. Unmapped addresses float: reads return zero, writes drop,
/// both logged rather than treated as faults.
pub struct Bus {
    bindings: Vec<Binding>,
}

impl Bus {
    pub fn new() -> Self {
        Bus {
            bindings: Vec::new(),
        }
    }

    /// Bind a device to a range. Fails without modifying the bus if the
    /// range collides with an existing binding or does not match the
    /// device's size.
    pub fn attach(&mut self, device: Device, range: AddressRange) -> Result<(), BusError> {
        if device.size() != range.len() {
            return Err(BusError::SizeMismatch {
                range,
                device: device.name().to_string(),
                device_size: device.size(),
                range_len: range.len(),
            });
        }

        if let Some(binding) = self.bindings.iter().find(|b| b.range.overlaps(&range)) {
            return Err(BusError::RangeConflict {
                range,
                device: device.name().to_string(),
                existing: binding.range,
                occupant: binding.device.name().to_string(),
            });
        }

        tracing::info!("attached {} at {}", device, range);
        let at = self
            .bindings
            .partition_point(|b| b.range.base < range.base);
        self.bindings.insert(at, Binding { range, device });
        Ok(())
    }

    /// Remove the binding whose range starts at `base`, returning the
    /// device. The range becomes unmapped until something else covers it.
    pub fn detach(&mut self, base: u16) -> Option<Device> {
        let at = self.bindings.iter().position(|b| b.range.base == base)?;
        let binding = self.bindings.remove(at);
        tracing::info!("detached {} from {}", binding.device, binding.range);
        Some(binding.device)
    }

    fn find(&self, address: u16) -> Option<usize> {
        let at = self
            .bindings
            .partition_point(|b| b.range.base <= address)
            .checked_sub(1)?;
        self.bindings[at].range.contains(address).then_some(at)
    }

    /// Processor read: dispatched to the owning device exactly once, so
    /// read-sensitive registers trigger their side effects exactly as
    /// the program would see on hardware.
    pub fn read(&mut self, address: u16) -> u8 {
        match self.find(address) {
            Some(at) => {
                let binding = &mut self.bindings[at];
                binding.device.read(address - binding.range.base)
            }
            None => {
                tracing::trace!("read from unmapped address {:#06X}", address);
                0
            }
        }
    }

    /// Side-effect-free read for inspectors and disassembly.
    pub fn peek(&self, address: u16) -> u8 {
        match self.find(address) {
            Some(at) => {
                let binding = &self.bindings[at];
                binding.device.peek(address - binding.range.base)
            }
            None => 0,
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        match self.find(address) {
            Some(at) => {
                let binding = &mut self.bindings[at];
                binding.device.write(address - binding.range.base, value);
            }
            None => {
                tracing::trace!(
                    "write to unmapped address {:#06X} = {:#04X}",
                    address,
                    value
                );
            }
        }
    }

    /// Little-endian pair read on the processor path.
    pub fn read_word(&mut self, address: u16) -> u16 {
        let low = self.read(address) as u16;
        let high = self.read(address.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    pub fn peek_word(&self, address: u16) -> u16 {
        let low = self.peek(address) as u16;
        let high = self.peek(address.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    pub fn write_block(&mut self, start: u16, data: &[u8]) {
        let mut address = start;
        for &byte in data {
            self.write(address, byte);
            address = address.wrapping_add(1);
        }
    }

    pub fn reset(&mut self) {
        for binding in &mut self.bindings {
            binding.device.reset();
        }
    }

    pub fn tick(&mut self, cycles: u32) {
        for binding in &mut self.bindings {
            binding.device.tick(cycles);
        }
    }

    /// True while any attached device holds its interrupt line down.
    pub fn irq_asserted(&self) -> bool {
        self.bindings.iter().any(|b| b.device.irq_asserted())
    }

    pub fn device_at(&self, base: u16) -> Option<&Device> {
        self.bindings
            .iter()
            .find(|b| b.range.base == base)
            .map(|b| &b.device)
    }

    pub fn device_at_mut(&mut self, base: u16) -> Option<&mut Device> {
        self.bindings
            .iter_mut()
            .find(|b| b.range.base == base)
            .map(|b| &mut b.device)
    }

    pub fn ranges(&self) -> Vec<AddressRange> {
        self.bindings.iter().map(|b| b.range).collect()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for binding in &self.bindings {
            writeln!(f, "{}  {}", binding.range, binding.device)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Memory;

    #[test]
    fn ranges_overlap_inclusively() {
        let a = AddressRange::new(0x1000, 0x1FFF);
        assert!(a.overlaps(&AddressRange::new(0x1FFF, 0x2FFF)));
        assert!(a.overlaps(&AddressRange::new(0x0000, 0x1000)));
        assert!(!a.overlaps(&AddressRange::new(0x2000, 0x2FFF)));
        assert_eq!(a.len(), 0x1000);
    }

    #[test]
    fn lookup_picks_the_owning_binding() {
        let mut bus = Bus::new();
        bus.attach(Device::Memory(Memory::ram(0x100)), AddressRange::new(0x0000, 0x00FF))
            .unwrap();
        bus.attach(Device::Memory(Memory::ram(0x100)), AddressRange::new(0x0200, 0x02FF))
            .unwrap();

        bus.write(0x0280, 0x5A);
        assert_eq!(bus.peek(0x0280), 0x5A);
        // The hole between the two bindings floats.
        assert_eq!(bus.read(0x0100), 0);
    }
}
