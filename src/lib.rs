pub mod acia;
pub mod bus;
pub mod controller;
pub mod cpu;
pub mod crtc;
pub mod device;
pub mod instruction;
pub mod machine;
pub mod memory;
pub mod pia;
pub mod state;
pub mod utils;

pub use acia::Acia;
pub use bus::{AddressRange, Bus, BusError};
pub use controller::{Event, ExecutionController, ExecutionState, StopReason};
pub use cpu::{BrkPolicy, Cpu, Step};
pub use crtc::Crtc;
pub use device::Device;
pub use instruction::{lookup, AddressingMode, CpuBehavior, Instruction, Mnemonic};
pub use machine::{Machine, MachineError, MachineKind};
pub use memory::Memory;
pub use pia::Pia;
pub use state::CpuState;
pub use utils::hexdump;
