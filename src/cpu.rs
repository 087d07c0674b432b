use crate::{
    bus::Bus,
    instruction::{lookup, AddressingMode, CpuBehavior, Mnemonic},
    state::{
        CpuState, FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_IRQ_DISABLE, FLAG_NEGATIVE,
        FLAG_OVERFLOW, FLAG_UNUSED, FLAG_ZERO,
    },
};

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;
/// COP vector while the 65C816 runs in emulation mode.
pub const COP_VECTOR: u16 = 0xFFF4;

const STACK_BASE: u16 = 0x0100;

/// What a decoded BRK does. The surrounding controller chooses; the
/// core has no opinion of its own.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BrkPolicy {
    /// Run the software-interrupt sequence through the IRQ vector.
    SoftwareInterrupt,
    /// Consume the padding byte and report the BRK without touching
    /// the stack, so a halted program is resumable.
    Halt,
}

/// Outcome of one `step`: cycles consumed and whether the instruction
/// was a BRK.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Step {
    pub cycles: u32,
    pub brk: bool,
}

/// Resolved operand of the current instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Operand {
    None,
    Accumulator,
    Immediate(u8),
    Address(u16),
    /// Bit-branch pair: memory location plus branch target.
    BitBranch { addr: u16, target: u16 },
    /// Block-move bank pair.
    Move { dst: u8, src: u8 },
}

/// 6502-family processor core. Registers, flags and the fetch-decode-
/// execute cycle; the bus is borrowed per step, never owned, so the
/// machine stays free to hand the bus to inspectors between
/// instructions.
///
/// The 65C816 behavior runs in emulation mode: 8-bit registers, bank 0,
/// with the extended addressing modes folded onto the 16-bit bus.
pub struct Cpu {
    behavior: CpuBehavior,
    brk_policy: BrkPolicy,

    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    pc: u16,

    carry: bool,
    zero: bool,
    irq_disable: bool,
    decimal: bool,
    overflow: bool,
    negative: bool,

    // 65C816 emulation-mode registers.
    b: u8,
    direct: u16,
    dbr: u8,
    pbr: u8,

    irq_line: bool,
    nmi_pending: bool,
    waiting: bool,
    stopped: bool,

    cycles: u64,
}

impl Cpu {
    pub fn new(behavior: CpuBehavior) -> Self {
        Cpu {
            behavior,
            brk_policy: BrkPolicy::SoftwareInterrupt,
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            carry: false,
            zero: false,
            irq_disable: true,
            decimal: false,
            overflow: false,
            negative: false,
            b: 0,
            direct: 0,
            dbr: 0,
            pbr: 0,
            irq_line: false,
            nmi_pending: false,
            waiting: false,
            stopped: false,
            cycles: 0,
        }
    }

    pub fn behavior(&self) -> CpuBehavior {
        self.behavior
    }

    pub fn set_brk_policy(&mut self, policy: BrkPolicy) {
        self.brk_policy = policy;
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Level-sensitive maskable interrupt line.
    pub fn assert_irq(&mut self) {
        self.irq_line = true;
    }

    pub fn clear_irq(&mut self) {
        self.irq_line = false;
    }

    /// Edge-triggered non-maskable interrupt; latched until serviced.
    pub fn assert_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Load PC from the reset vector and initialize flags for the
    /// behavior. Memory is untouched; A/X/Y keep their old contents as
    /// on real silicon.
    pub fn reset(&mut self, bus: &mut Bus) {
        self.sp = 0xFD;
        self.irq_disable = true;
        if self.behavior.is_cmos() {
            self.decimal = false;
        }
        self.irq_line = false;
        self.nmi_pending = false;
        self.waiting = false;
        self.stopped = false;
        self.b = 0;
        self.direct = 0;
        self.dbr = 0;
        self.pbr = 0;
        self.pc = bus.read_word(RESET_VECTOR);
        tracing::info!("reset: PC=${:04X}", self.pc);
    }

    pub fn status(&self) -> u8 {
        self.status_byte(false)
    }

    pub fn state(&self) -> CpuState {
        CpuState {
            behavior: self.behavior,
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            status: self.status(),
            cycles: self.cycles,
        }
    }

    /// Execute exactly one instruction, or one interrupt sequence when
    /// a line is pending at this boundary.
    pub fn step(&mut self, bus: &mut Bus) -> Step {
        if self.nmi_pending {
            self.nmi_pending = false;
            self.waiting = false;
            self.interrupt(bus, NMI_VECTOR);
            self.cycles += 7;
            return Step { cycles: 7, brk: false };
        }
        if self.irq_line && !self.irq_disable {
            self.waiting = false;
            self.interrupt(bus, IRQ_VECTOR);
            self.cycles += 7;
            return Step { cycles: 7, brk: false };
        }
        if self.waiting {
            if self.irq_line {
                // A masked interrupt still ends the wait; execution
                // resumes at the following instruction.
                self.waiting = false;
            } else {
                self.cycles += 1;
                return Step { cycles: 1, brk: false };
            }
        }
        if self.stopped {
            // STP sleeps until reset.
            self.cycles += 1;
            return Step { cycles: 1, brk: false };
        }

        let opcode = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        let ins = lookup(self.behavior, opcode);

        let (operand, page_crossed) = self.resolve(bus, ins.mode);
        let mut cycles = ins.cycles as u32;
        if ins.page_penalty && page_crossed {
            cycles += 1;
        }

        let (extra, brk) = self.execute(bus, ins.mnemonic, operand, opcode);
        cycles += extra;

        self.cycles += cycles as u64;
        Step { cycles, brk }
    }

    // ----- operand resolution -----

    fn fetch_byte(&mut self, bus: &mut Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    fn fetch_word(&mut self, bus: &mut Bus) -> u16 {
        let low = self.fetch_byte(bus) as u16;
        let high = self.fetch_byte(bus) as u16;
        (high << 8) | low
    }

    /// Little-endian word from the zero page, wrapping within it.
    fn zp_word(&mut self, bus: &mut Bus, zp: u8) -> u16 {
        let low = bus.read(zp as u16) as u16;
        let high = bus.read(zp.wrapping_add(1) as u16) as u16;
        (high << 8) | low
    }

    fn resolve(&mut self, bus: &mut Bus, mode: AddressingMode) -> (Operand, bool) {
        use AddressingMode::*;

        match mode {
            Implied => (Operand::None, false),
            Accumulator => (Operand::Accumulator, false),
            Immediate => (Operand::Immediate(self.fetch_byte(bus)), false),
            ZeroPage => (Operand::Address(self.fetch_byte(bus) as u16), false),
            ZeroPageX => {
                let zp = self.fetch_byte(bus).wrapping_add(self.x);
                (Operand::Address(zp as u16), false)
            }
            ZeroPageY => {
                let zp = self.fetch_byte(bus).wrapping_add(self.y);
                (Operand::Address(zp as u16), false)
            }
            Relative => {
                let offset = self.fetch_byte(bus) as i8;
                (Operand::Address(self.pc.wrapping_add(offset as u16)), false)
            }
            Absolute => (Operand::Address(self.fetch_word(bus)), false),
            AbsoluteX => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(self.x as u16);
                (Operand::Address(addr), crosses_page(base, addr))
            }
            AbsoluteY => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(self.y as u16);
                (Operand::Address(addr), crosses_page(base, addr))
            }
            Indirect => {
                let ptr = self.fetch_word(bus);
                let addr = if self.behavior == CpuBehavior::Nmos6502 && ptr & 0x00FF == 0x00FF {
                    // NMOS fetches the high pointer byte from the start
                    // of the same page.
                    let low = bus.read(ptr) as u16;
                    let high = bus.read(ptr & 0xFF00) as u16;
                    (high << 8) | low
                } else {
                    bus.read_word(ptr)
                };
                (Operand::Address(addr), false)
            }
            IndexedIndirect => {
                let zp = self.fetch_byte(bus).wrapping_add(self.x);
                let addr = self.zp_word(bus, zp);
                (Operand::Address(addr), false)
            }
            IndirectIndexed => {
                let zp = self.fetch_byte(bus);
                let base = self.zp_word(bus, zp);
                let addr = base.wrapping_add(self.y as u16);
                (Operand::Address(addr), crosses_page(base, addr))
            }
            ZeroPageIndirect => {
                let zp = self.fetch_byte(bus);
                let addr = self.zp_word(bus, zp);
                (Operand::Address(addr), false)
            }
            AbsoluteIndexedIndirect => {
                let ptr = self.fetch_word(bus).wrapping_add(self.x as u16);
                (Operand::Address(bus.read_word(ptr)), false)
            }
            ZeroPageRelative => {
                let addr = self.fetch_byte(bus) as u16;
                let offset = self.fetch_byte(bus) as i8;
                let target = self.pc.wrapping_add(offset as u16);
                (Operand::BitBranch { addr, target }, false)
            }
            StackRelative => {
                let offset = self.fetch_byte(bus) as u16;
                let addr = (STACK_BASE | self.sp as u16).wrapping_add(offset);
                (Operand::Address(addr), false)
            }
            StackRelativeIndirectY => {
                let offset = self.fetch_byte(bus) as u16;
                let ptr = (STACK_BASE | self.sp as u16).wrapping_add(offset);
                let base = bus.read_word(ptr);
                (Operand::Address(base.wrapping_add(self.y as u16)), false)
            }
            IndirectLong => {
                let zp = self.fetch_byte(bus);
                // The bank byte collapses onto the 16-bit bus.
                let addr = self.zp_word(bus, zp);
                let _bank = bus.read(zp.wrapping_add(2) as u16);
                (Operand::Address(addr), false)
            }
            IndirectLongY => {
                let zp = self.fetch_byte(bus);
                let base = self.zp_word(bus, zp);
                let _bank = bus.read(zp.wrapping_add(2) as u16);
                (Operand::Address(base.wrapping_add(self.y as u16)), false)
            }
            AbsoluteLong => {
                let addr = self.fetch_word(bus);
                let _bank = self.fetch_byte(bus);
                (Operand::Address(addr), false)
            }
            AbsoluteLongX => {
                let base = self.fetch_word(bus);
                let _bank = self.fetch_byte(bus);
                (Operand::Address(base.wrapping_add(self.x as u16)), false)
            }
            RelativeLong => {
                let offset = self.fetch_word(bus);
                (Operand::Address(self.pc.wrapping_add(offset)), false)
            }
            BlockMove => {
                let dst = self.fetch_byte(bus);
                let src = self.fetch_byte(bus);
                (Operand::Move { dst, src }, false)
            }
        }
    }

    fn read_operand(&mut self, bus: &mut Bus, operand: Operand) -> u8 {
        match operand {
            Operand::Accumulator => self.a,
            Operand::Immediate(value) => value,
            Operand::Address(addr) => bus.read(addr),
            other => panic!("operand {:?} has no value to read", other),
        }
    }

    fn write_operand(&mut self, bus: &mut Bus, operand: Operand, value: u8) {
        match operand {
            Operand::Accumulator => self.a = value,
            Operand::Address(addr) => bus.write(addr, value),
            other => panic!("operand {:?} is not writable", other),
        }
    }

    fn address_of(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Address(addr) => addr,
            other => panic!("operand {:?} carries no address", other),
        }
    }

    // ----- stack and flags -----

    fn push(&mut self, bus: &mut Bus, value: u8) {
        bus.write(STACK_BASE | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pop(&mut self, bus: &mut Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(STACK_BASE | self.sp as u16)
    }

    fn push_word(&mut self, bus: &mut Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, (value & 0xFF) as u8);
    }

    fn pop_word(&mut self, bus: &mut Bus) -> u16 {
        let low = self.pop(bus) as u16;
        let high = self.pop(bus) as u16;
        (high << 8) | low
    }

    fn status_byte(&self, brk: bool) -> u8 {
        let mut status = FLAG_UNUSED;
        if self.carry {
            status |= FLAG_CARRY;
        }
        if self.zero {
            status |= FLAG_ZERO;
        }
        if self.irq_disable {
            status |= FLAG_IRQ_DISABLE;
        }
        if self.decimal {
            status |= FLAG_DECIMAL;
        }
        if brk {
            status |= FLAG_BREAK;
        }
        if self.overflow {
            status |= FLAG_OVERFLOW;
        }
        if self.negative {
            status |= FLAG_NEGATIVE;
        }
        status
    }

    fn set_status_byte(&mut self, value: u8) {
        self.carry = value & FLAG_CARRY != 0;
        self.zero = value & FLAG_ZERO != 0;
        self.irq_disable = value & FLAG_IRQ_DISABLE != 0;
        self.decimal = value & FLAG_DECIMAL != 0;
        self.overflow = value & FLAG_OVERFLOW != 0;
        self.negative = value & FLAG_NEGATIVE != 0;
    }

    fn set_nz(&mut self, value: u8) {
        self.zero = value == 0;
        self.negative = value & 0x80 != 0;
    }

    fn set_nz16(&mut self, value: u16) {
        self.zero = value == 0;
        self.negative = value & 0x8000 != 0;
    }

    /// Hardware interrupt sequence: seven cycles, B clear on the pushed
    /// status.
    fn interrupt(&mut self, bus: &mut Bus, vector: u16) {
        let pc = self.pc;
        self.push_word(bus, pc);
        let status = self.status_byte(false);
        self.push(bus, status);
        self.irq_disable = true;
        if self.behavior.is_cmos() {
            self.decimal = false;
        }
        self.pc = bus.read_word(vector);
        tracing::trace!("interrupt via ${:04X} -> ${:04X}", vector, self.pc);
    }

    fn software_interrupt(&mut self, bus: &mut Bus, vector: u16) {
        let pc = self.pc;
        self.push_word(bus, pc);
        let status = self.status_byte(true);
        self.push(bus, status);
        self.irq_disable = true;
        if self.behavior.is_cmos() {
            self.decimal = false;
        }
        self.pc = bus.read_word(vector);
    }

    // ----- arithmetic -----

    /// Add with carry; returns true when the CMOS decimal path costs
    /// its extra cycle.
    fn adc(&mut self, value: u8) -> bool {
        if !self.decimal {
            let a = self.a as u16;
            let v = value as u16;
            let sum = a + v + self.carry as u16;
            let result = sum as u8;
            self.carry = sum > 0xFF;
            self.overflow = !(a ^ v) & (a ^ sum) & 0x80 != 0;
            self.set_nz(result);
            self.a = result;
            return false;
        }

        let a = self.a as u16;
        let v = value as u16;
        let c = self.carry as u16;

        // Z comes from the binary sum on NMOS.
        let binary = a + v + c;

        let mut low = (a & 0x0F) + (v & 0x0F) + c;
        if low >= 0x0A {
            low = ((low + 0x06) & 0x0F) + 0x10;
        }
        let mut result = (a & 0xF0) + (v & 0xF0) + low;
        self.negative = result & 0x80 != 0;
        self.overflow = !(a ^ v) & (a ^ result) & 0x80 != 0;
        if result >= 0xA0 {
            result += 0x60;
        }
        self.carry = result >= 0x100;
        self.a = result as u8;

        if self.behavior.is_cmos() {
            // CMOS parts report N and Z from the corrected result; the
            // 65C02 spends one extra cycle doing it, the 65C816 does not.
            self.set_nz(self.a);
            self.behavior == CpuBehavior::Cmos6502
        } else {
            self.zero = binary & 0xFF == 0;
            false
        }
    }

    /// Subtract with borrow; same CMOS decimal cycle rule as `adc`.
    fn sbc(&mut self, value: u8) -> bool {
        let a = self.a as i16;
        let v = value as i16;
        let borrow = 1 - self.carry as i16;

        let binary = a - v - borrow;
        let result = binary as u8;
        self.carry = binary >= 0;
        self.overflow = (a ^ v) & (a ^ binary) & 0x80 != 0;

        if !self.decimal {
            self.set_nz(result);
            self.a = result;
            return false;
        }

        // Decimal correction; NMOS flags stay binary.
        let mut low = (a & 0x0F) - (v & 0x0F) - borrow;
        if low < 0 {
            low = ((low - 0x06) & 0x0F) - 0x10;
        }
        let mut corrected = (a & 0xF0) - (v & 0xF0) + low;
        if corrected < 0 {
            corrected -= 0x60;
        }
        self.a = corrected as u8;

        if self.behavior.is_cmos() {
            self.set_nz(self.a);
            self.behavior == CpuBehavior::Cmos6502
        } else {
            self.set_nz(result);
            false
        }
    }

    fn compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        self.carry = register >= value;
        self.set_nz(result);
    }

    /// Taken branches cost one cycle, two when they land on another
    /// page.
    fn branch(&mut self, taken: bool, target: u16) -> u32 {
        if !taken {
            return 0;
        }
        let extra = if crosses_page(self.pc, target) { 2 } else { 1 };
        self.pc = target;
        extra
    }

    fn shift_left(&mut self, value: u8, carry_in: bool) -> u8 {
        self.carry = value & 0x80 != 0;
        let result = (value << 1) | carry_in as u8;
        self.set_nz(result);
        result
    }

    fn shift_right(&mut self, value: u8, carry_in: bool) -> u8 {
        self.carry = value & 0x01 != 0;
        let result = (value >> 1) | ((carry_in as u8) << 7);
        self.set_nz(result);
        result
    }

    // ----- execution -----

    /// Returns extra cycles beyond the table cost, plus the BRK marker.
    fn execute(
        &mut self,
        bus: &mut Bus,
        mnemonic: Mnemonic,
        operand: Operand,
        opcode: u8,
    ) -> (u32, bool) {
        use Mnemonic::*;

        let mut extra = 0;
        let mut brk = false;

        match mnemonic {
            // Loads and stores.
            Lda => {
                let value = self.read_operand(bus, operand);
                self.a = value;
                self.set_nz(value);
            }
            Ldx => {
                let value = self.read_operand(bus, operand);
                self.x = value;
                self.set_nz(value);
            }
            Ldy => {
                let value = self.read_operand(bus, operand);
                self.y = value;
                self.set_nz(value);
            }
            Sta => {
                let a = self.a;
                self.write_operand(bus, operand, a);
            }
            Stx => {
                let x = self.x;
                self.write_operand(bus, operand, x);
            }
            Sty => {
                let y = self.y;
                self.write_operand(bus, operand, y);
            }
            Stz => self.write_operand(bus, operand, 0),

            // Register transfers.
            Tax => {
                self.x = self.a;
                self.set_nz(self.x);
            }
            Tay => {
                self.y = self.a;
                self.set_nz(self.y);
            }
            Txa => {
                self.a = self.x;
                self.set_nz(self.a);
            }
            Tya => {
                self.a = self.y;
                self.set_nz(self.a);
            }
            Tsx => {
                self.x = self.sp;
                self.set_nz(self.x);
            }
            Txs => self.sp = self.x,

            // Stack.
            Pha => {
                let a = self.a;
                self.push(bus, a);
            }
            Php => {
                let status = self.status_byte(true);
                self.push(bus, status);
            }
            Pla => {
                self.a = self.pop(bus);
                let a = self.a;
                self.set_nz(a);
            }
            Plp => {
                let status = self.pop(bus);
                self.set_status_byte(status);
            }
            Phx => {
                let x = self.x;
                self.push(bus, x);
            }
            Phy => {
                let y = self.y;
                self.push(bus, y);
            }
            Plx => {
                self.x = self.pop(bus);
                let x = self.x;
                self.set_nz(x);
            }
            Ply => {
                self.y = self.pop(bus);
                let y = self.y;
                self.set_nz(y);
            }

            // Arithmetic and logic.
            Adc => {
                let value = self.read_operand(bus, operand);
                if self.adc(value) {
                    extra += 1;
                }
            }
            Sbc => {
                let value = self.read_operand(bus, operand);
                if self.sbc(value) {
                    extra += 1;
                }
            }
            Cmp => {
                let value = self.read_operand(bus, operand);
                let a = self.a;
                self.compare(a, value);
            }
            Cpx => {
                let value = self.read_operand(bus, operand);
                let x = self.x;
                self.compare(x, value);
            }
            Cpy => {
                let value = self.read_operand(bus, operand);
                let y = self.y;
                self.compare(y, value);
            }
            And => {
                let value = self.read_operand(bus, operand);
                self.a &= value;
                let a = self.a;
                self.set_nz(a);
            }
            Ora => {
                let value = self.read_operand(bus, operand);
                self.a |= value;
                let a = self.a;
                self.set_nz(a);
            }
            Eor => {
                let value = self.read_operand(bus, operand);
                self.a ^= value;
                let a = self.a;
                self.set_nz(a);
            }
            Bit => {
                let value = self.read_operand(bus, operand);
                self.zero = self.a & value == 0;
                // Immediate BIT only touches Z.
                if !matches!(operand, Operand::Immediate(_)) {
                    self.negative = value & 0x80 != 0;
                    self.overflow = value & 0x40 != 0;
                }
            }

            // Increments and decrements.
            Inc => {
                let value = self.read_operand(bus, operand).wrapping_add(1);
                self.write_operand(bus, operand, value);
                self.set_nz(value);
            }
            Dec => {
                let value = self.read_operand(bus, operand).wrapping_sub(1);
                self.write_operand(bus, operand, value);
                self.set_nz(value);
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                let x = self.x;
                self.set_nz(x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                let y = self.y;
                self.set_nz(y);
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                let x = self.x;
                self.set_nz(x);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                let y = self.y;
                self.set_nz(y);
            }

            // Shifts and rotates.
            Asl => {
                let value = self.read_operand(bus, operand);
                let result = self.shift_left(value, false);
                self.write_operand(bus, operand, result);
            }
            Lsr => {
                let value = self.read_operand(bus, operand);
                let result = self.shift_right(value, false);
                self.write_operand(bus, operand, result);
            }
            Rol => {
                let value = self.read_operand(bus, operand);
                let carry = self.carry;
                let result = self.shift_left(value, carry);
                self.write_operand(bus, operand, result);
            }
            Ror => {
                let value = self.read_operand(bus, operand);
                let carry = self.carry;
                let result = self.shift_right(value, carry);
                self.write_operand(bus, operand, result);
            }

            // Control flow.
            Jmp => self.pc = self.address_of(operand),
            Jsr => {
                let target = self.address_of(operand);
                let ret = self.pc.wrapping_sub(1);
                self.push_word(bus, ret);
                self.pc = target;
            }
            Rts => {
                self.pc = self.pop_word(bus).wrapping_add(1);
            }
            Rti => {
                let status = self.pop(bus);
                self.set_status_byte(status);
                self.pc = self.pop_word(bus);
            }
            Brk => {
                brk = true;
                match self.brk_policy {
                    BrkPolicy::Halt => {
                        // Skip the padding byte; nothing else happens.
                        self.pc = self.pc.wrapping_add(1);
                    }
                    BrkPolicy::SoftwareInterrupt => {
                        self.pc = self.pc.wrapping_add(1);
                        self.software_interrupt(bus, IRQ_VECTOR);
                    }
                }
            }

            Bcc => extra += self.branch(!self.carry, self.address_of(operand)),
            Bcs => extra += self.branch(self.carry, self.address_of(operand)),
            Bne => extra += self.branch(!self.zero, self.address_of(operand)),
            Beq => extra += self.branch(self.zero, self.address_of(operand)),
            Bpl => extra += self.branch(!self.negative, self.address_of(operand)),
            Bmi => extra += self.branch(self.negative, self.address_of(operand)),
            Bvc => extra += self.branch(!self.overflow, self.address_of(operand)),
            Bvs => extra += self.branch(self.overflow, self.address_of(operand)),
            Bra => extra += self.branch(true, self.address_of(operand)),

            // Flag manipulation.
            Clc => self.carry = false,
            Sec => self.carry = true,
            Cli => self.irq_disable = false,
            Sei => self.irq_disable = true,
            Cld => self.decimal = false,
            Sed => self.decimal = true,
            Clv => self.overflow = false,

            Nop => {
                // Wide NOPs still perform their operand read.
                if let Operand::Address(addr) = operand {
                    let _ = bus.read(addr);
                }
            }
            Jam => {
                tracing::warn!("jam opcode {:#04X} at ${:04X}", opcode, self.pc.wrapping_sub(1));
            }

            // Stable NMOS undocumented opcodes.
            Slo => {
                let value = self.read_operand(bus, operand);
                let shifted = self.shift_left(value, false);
                self.write_operand(bus, operand, shifted);
                self.a |= shifted;
                let a = self.a;
                self.set_nz(a);
            }
            Rla => {
                let value = self.read_operand(bus, operand);
                let carry = self.carry;
                let rotated = self.shift_left(value, carry);
                self.write_operand(bus, operand, rotated);
                self.a &= rotated;
                let a = self.a;
                self.set_nz(a);
            }
            Sre => {
                let value = self.read_operand(bus, operand);
                let shifted = self.shift_right(value, false);
                self.write_operand(bus, operand, shifted);
                self.a ^= shifted;
                let a = self.a;
                self.set_nz(a);
            }
            Rra => {
                let value = self.read_operand(bus, operand);
                let carry = self.carry;
                let rotated = self.shift_right(value, carry);
                self.write_operand(bus, operand, rotated);
                self.adc(rotated);
            }
            Sax => {
                let value = self.a & self.x;
                self.write_operand(bus, operand, value);
            }
            Lax => {
                let value = self.read_operand(bus, operand);
                self.a = value;
                self.x = value;
                self.set_nz(value);
            }
            Dcp => {
                let value = self.read_operand(bus, operand).wrapping_sub(1);
                self.write_operand(bus, operand, value);
                let a = self.a;
                self.compare(a, value);
            }
            Isc => {
                let value = self.read_operand(bus, operand).wrapping_add(1);
                self.write_operand(bus, operand, value);
                self.sbc(value);
            }
            Anc => {
                let value = self.read_operand(bus, operand);
                self.a &= value;
                let a = self.a;
                self.set_nz(a);
                self.carry = self.negative;
            }
            Alr => {
                let value = self.read_operand(bus, operand);
                let masked = self.a & value;
                self.a = self.shift_right(masked, false);
            }
            Arr => {
                let value = self.read_operand(bus, operand);
                let masked = self.a & value;
                let result = (masked >> 1) | ((self.carry as u8) << 7);
                self.a = result;
                self.set_nz(result);
                self.carry = result & 0x40 != 0;
                self.overflow = ((result >> 6) ^ (result >> 5)) & 0x01 != 0;
            }
            Sbx => {
                let value = self.read_operand(bus, operand);
                let masked = self.a & self.x;
                self.carry = masked >= value;
                self.x = masked.wrapping_sub(value);
                let x = self.x;
                self.set_nz(x);
            }

            // 65C02 additions.
            Trb => {
                let value = self.read_operand(bus, operand);
                self.zero = self.a & value == 0;
                let cleared = value & !self.a;
                self.write_operand(bus, operand, cleared);
            }
            Tsb => {
                let value = self.read_operand(bus, operand);
                self.zero = self.a & value == 0;
                let set = value | self.a;
                self.write_operand(bus, operand, set);
            }
            Rmb(bit) => {
                let value = self.read_operand(bus, operand);
                self.write_operand(bus, operand, value & !(1 << bit));
            }
            Smb(bit) => {
                let value = self.read_operand(bus, operand);
                self.write_operand(bus, operand, value | (1 << bit));
            }
            Bbr(bit) => {
                if let Operand::BitBranch { addr, target } = operand {
                    let value = bus.read(addr);
                    extra += self.branch(value & (1 << bit) == 0, target);
                }
            }
            Bbs(bit) => {
                if let Operand::BitBranch { addr, target } = operand {
                    let value = bus.read(addr);
                    extra += self.branch(value & (1 << bit) != 0, target);
                }
            }
            Wai => self.waiting = true,
            Stp => {
                tracing::warn!("STP at ${:04X}; core sleeps until reset", self.pc);
                self.stopped = true;
            }

            // 65C816 additions, emulation mode.
            Phb => {
                let dbr = self.dbr;
                self.push(bus, dbr);
            }
            Plb => {
                self.dbr = self.pop(bus);
                let dbr = self.dbr;
                self.set_nz(dbr);
            }
            Phd => {
                let direct = self.direct;
                self.push_word(bus, direct);
            }
            Pld => {
                self.direct = self.pop_word(bus);
                let direct = self.direct;
                self.set_nz16(direct);
            }
            Phk => {
                let pbr = self.pbr;
                self.push(bus, pbr);
            }
            Tcs => self.sp = self.a,
            Tsc => {
                self.a = self.sp;
                self.b = 0x01;
                let c = STACK_BASE | self.sp as u16;
                self.set_nz16(c);
            }
            Tcd => {
                self.direct = ((self.b as u16) << 8) | self.a as u16;
                let direct = self.direct;
                self.set_nz16(direct);
            }
            Tdc => {
                self.a = (self.direct & 0xFF) as u8;
                self.b = (self.direct >> 8) as u8;
                let direct = self.direct;
                self.set_nz16(direct);
            }
            Txy => {
                self.y = self.x;
                let y = self.y;
                self.set_nz(y);
            }
            Tyx => {
                self.x = self.y;
                let x = self.x;
                self.set_nz(x);
            }
            Xba => {
                std::mem::swap(&mut self.a, &mut self.b);
                let a = self.a;
                self.set_nz(a);
            }
            Xce => {
                // The core stays in emulation mode; the carry reports
                // the previous emulation bit, which is always set.
                if !self.carry {
                    tracing::trace!("XCE requested native mode; staying in emulation");
                }
                self.carry = true;
            }
            Rep => {
                let mask = self.read_operand(bus, operand);
                let status = self.status_byte(false) & !mask;
                self.set_status_byte(status);
            }
            Sep => {
                let mask = self.read_operand(bus, operand);
                let status = self.status_byte(false) | mask;
                self.set_status_byte(status);
            }
            Pea | Pei | Per => {
                let value = self.address_of(operand);
                self.push_word(bus, value);
            }
            Brl => self.pc = self.address_of(operand),
            Jsl => {
                let target = self.address_of(operand);
                let pbr = self.pbr;
                self.push(bus, pbr);
                let ret = self.pc.wrapping_sub(1);
                self.push_word(bus, ret);
                self.pc = target;
            }
            Rtl => {
                self.pc = self.pop_word(bus).wrapping_add(1);
                self.pbr = self.pop(bus);
            }
            Jml => {
                self.pc = self.address_of(operand);
                self.pbr = 0;
            }
            Cop => {
                // Always a software interrupt; the halt policy is a
                // BRK-only concern.
                self.software_interrupt(bus, COP_VECTOR);
            }
            Wdm => (),
            Mvn | Mvp => {
                if let Operand::Move { dst, src: _ } = operand {
                    let byte = bus.read(self.x as u16);
                    bus.write(self.y as u16, byte);
                    let count = (((self.b as u16) << 8) | self.a as u16).wrapping_sub(1);
                    self.a = (count & 0xFF) as u8;
                    self.b = (count >> 8) as u8;
                    if mnemonic == Mvn {
                        self.x = self.x.wrapping_add(1);
                        self.y = self.y.wrapping_add(1);
                    } else {
                        self.x = self.x.wrapping_sub(1);
                        self.y = self.y.wrapping_sub(1);
                    }
                    self.dbr = dst;
                    if count != 0xFFFF {
                        // One byte per step; rewind to run again.
                        self.pc = self.pc.wrapping_sub(3);
                    }
                }
            }
        }

        (extra, brk)
    }
}

fn crosses_page(from: u16, to: u16) -> bool {
    from & 0xFF00 != to & 0xFF00
}
