//! Instruction execution engine.
//!
//! [`Cpu::step`] polls the interrupt lines, then fetches, decodes and
//! executes exactly one instruction, returning the cycles it consumed.
//! Decode failures surface as [`CoreError`] values carrying the faulting
//! address; a step never reports zero cycles.

mod indexed;
mod ops;

use crate::decoder::{lookup_op, Page};
use crate::fault::CoreError;
use crate::memory::Bus;
use crate::state::{
    CpuRegisters, FIRQ_VECTOR, IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR, SWI2_VECTOR, SWI3_VECTOR,
    SWI_VECTOR,
};
use crate::timing::{base_cycles, FIRQ_ENTRY_CYCLES, IRQ_ENTRY_CYCLES, NMI_ENTRY_CYCLES};

/// Why the CPU is stalled between instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum WaitState {
    /// `SYNC`: stopped until any interrupt line rises, masked or not.
    Sync,
    /// `CWAI`: like `Sync`, but the register frame is already stacked
    /// so interrupt entry skips the push.
    CwaiStacked,
}

/// Which stack pointer a push or pull operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StackPointer {
    Hardware,
    User,
}

/// The 6809-class processor core.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cpu {
    pub(crate) regs: CpuRegisters,
    pub(crate) cycles: u8,
    wait: Option<WaitState>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// A powered-on core; call [`Self::reset`] before stepping.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: CpuRegisters::power_on(),
            cycles: 0,
            wait: None,
        }
    }

    /// Hardware reset: registers to power-on state, `PC` loaded from the
    /// reset vector. Uses raw reads so reset itself cannot fault.
    pub fn reset(&mut self, bus: &Bus) {
        self.regs = CpuRegisters::power_on();
        self.regs.pc = bus.read16_raw(RESET_VECTOR);
        self.wait = None;
        self.cycles = 0;
    }

    /// Borrows the register file.
    #[must_use]
    pub const fn registers(&self) -> &CpuRegisters {
        &self.regs
    }

    /// Mutably borrows the register file.
    pub const fn registers_mut(&mut self) -> &mut CpuRegisters {
        &mut self.regs
    }

    /// True while the core sits in a `SYNC` or `CWAI` wait.
    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        self.wait.is_some()
    }

    /// Executes one instruction (or honors a pending interrupt) and
    /// returns the cycles consumed. Never returns zero.
    ///
    /// `irq` and `firq` are the current levels of the two interrupt
    /// lines, polled once before the fetch. A raised line whose mask bit
    /// is set still releases a `SYNC`/`CWAI` wait without dispatching.
    ///
    /// # Errors
    ///
    /// [`CoreError::IllegalOpcode`] or
    /// [`CoreError::IllegalIndexedPostbyte`] on undecodable bytes, and
    /// bus faults under the fatal unmapped policy.
    pub fn step(&mut self, bus: &mut Bus, irq: bool, firq: bool) -> Result<u8, CoreError> {
        self.cycles = 0;

        if firq && !self.regs.cc.fast_interrupt_mask {
            return self.enter_firq(bus);
        }
        if irq && !self.regs.cc.interrupt_mask {
            return self.enter_irq(bus);
        }
        if self.wait.is_some() {
            if !(irq || firq) {
                return Ok(1);
            }
            self.wait = None;
        }

        let mut opcode = self.fetch8(bus)?;
        let page = match opcode {
            0x10 => Page::P10,
            0x11 => Page::P11,
            _ => Page::P0,
        };
        if !matches!(page, Page::P0) {
            opcode = self.fetch8(bus)?;
        }
        let opcode_pc = self.regs.pc.wrapping_sub(1);
        let info = lookup_op(page, opcode).ok_or(CoreError::IllegalOpcode {
            pc: opcode_pc,
            opcode,
        })?;

        self.cycles = base_cycles(page, opcode);
        self.dispatch(bus, page, opcode, info.mode)?;
        Ok(self.cycles)
    }

    /// Honors a non-maskable interrupt: entire frame stacked, both masks
    /// set, control transferred through the NMI vector.
    ///
    /// # Errors
    ///
    /// Bus faults while stacking under the fatal unmapped policy.
    pub fn nmi(&mut self, bus: &mut Bus) -> Result<u8, CoreError> {
        let stacked = self.take_wait_stacked();
        if !stacked {
            self.regs.cc.entire = true;
            self.push_entire_frame(bus, StackPointer::Hardware)?;
        }
        self.regs.cc.interrupt_mask = true;
        self.regs.cc.fast_interrupt_mask = true;
        self.regs.pc = bus.read16(NMI_VECTOR)?;
        Ok(NMI_ENTRY_CYCLES)
    }

    fn enter_irq(&mut self, bus: &mut Bus) -> Result<u8, CoreError> {
        let stacked = self.take_wait_stacked();
        if !stacked {
            self.regs.cc.entire = true;
            self.push_entire_frame(bus, StackPointer::Hardware)?;
        }
        self.regs.cc.interrupt_mask = true;
        self.regs.pc = bus.read16(IRQ_VECTOR)?;
        Ok(IRQ_ENTRY_CYCLES)
    }

    fn enter_firq(&mut self, bus: &mut Bus) -> Result<u8, CoreError> {
        let stacked = self.take_wait_stacked();
        if !stacked {
            // Fast entry stacks only PC and CC.
            self.regs.cc.entire = false;
            self.push16(bus, StackPointer::Hardware, self.regs.pc)?;
            self.push8(bus, StackPointer::Hardware, self.regs.cc.to_byte())?;
        }
        self.regs.cc.fast_interrupt_mask = true;
        self.regs.cc.interrupt_mask = true;
        self.regs.pc = bus.read16(FIRQ_VECTOR)?;
        Ok(FIRQ_ENTRY_CYCLES)
    }

    fn take_wait_stacked(&mut self) -> bool {
        let stacked = self.wait == Some(WaitState::CwaiStacked);
        self.wait = None;
        stacked
    }

    pub(crate) fn enter_swi(&mut self, bus: &mut Bus, vector: u16) -> Result<(), CoreError> {
        self.regs.cc.entire = true;
        self.push_entire_frame(bus, StackPointer::Hardware)?;
        if vector == SWI_VECTOR {
            self.regs.cc.interrupt_mask = true;
            self.regs.cc.fast_interrupt_mask = true;
        }
        self.regs.pc = bus.read16(vector)?;
        Ok(())
    }

    pub(crate) fn begin_sync_wait(&mut self) {
        self.wait = Some(WaitState::Sync);
    }

    pub(crate) fn begin_cwai_wait(&mut self) {
        self.wait = Some(WaitState::CwaiStacked);
    }

    // Fetch and stack primitives.

    pub(crate) fn fetch8(&mut self, bus: &mut Bus) -> Result<u8, CoreError> {
        let value = bus.read(self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        Ok(value)
    }

    pub(crate) fn fetch16(&mut self, bus: &mut Bus) -> Result<u16, CoreError> {
        let high = self.fetch8(bus)?;
        let low = self.fetch8(bus)?;
        Ok(u16::from(high) << 8 | u16::from(low))
    }

    const fn stack(&self, sp: StackPointer) -> u16 {
        match sp {
            StackPointer::Hardware => self.regs.s,
            StackPointer::User => self.regs.u,
        }
    }

    const fn set_stack(&mut self, sp: StackPointer, value: u16) {
        match sp {
            StackPointer::Hardware => self.regs.s = value,
            StackPointer::User => self.regs.u = value,
        }
    }

    pub(crate) fn push8(
        &mut self,
        bus: &mut Bus,
        sp: StackPointer,
        value: u8,
    ) -> Result<(), CoreError> {
        let pointer = self.stack(sp).wrapping_sub(1);
        self.set_stack(sp, pointer);
        bus.write(pointer, value)
    }

    /// Pushes low byte first so the word sits big-endian in memory.
    pub(crate) fn push16(
        &mut self,
        bus: &mut Bus,
        sp: StackPointer,
        value: u16,
    ) -> Result<(), CoreError> {
        self.push8(bus, sp, (value & 0xFF) as u8)?;
        self.push8(bus, sp, (value >> 8) as u8)
    }

    pub(crate) fn pop8(&mut self, bus: &mut Bus, sp: StackPointer) -> Result<u8, CoreError> {
        let pointer = self.stack(sp);
        let value = bus.read(pointer)?;
        self.set_stack(sp, pointer.wrapping_add(1));
        Ok(value)
    }

    pub(crate) fn pop16(&mut self, bus: &mut Bus, sp: StackPointer) -> Result<u16, CoreError> {
        let high = self.pop8(bus, sp)?;
        let low = self.pop8(bus, sp)?;
        Ok(u16::from(high) << 8 | u16::from(low))
    }

    /// Stacks the full frame in hardware order: PC, U/S, Y, X, DP, B,
    /// A, CC, leaving CC at the lowest address.
    pub(crate) fn push_entire_frame(
        &mut self,
        bus: &mut Bus,
        sp: StackPointer,
    ) -> Result<(), CoreError> {
        let other = match sp {
            StackPointer::Hardware => self.regs.u,
            StackPointer::User => self.regs.s,
        };
        self.push16(bus, sp, self.regs.pc)?;
        self.push16(bus, sp, other)?;
        self.push16(bus, sp, self.regs.y)?;
        self.push16(bus, sp, self.regs.x)?;
        self.push8(bus, sp, self.regs.dp)?;
        self.push8(bus, sp, self.regs.b)?;
        self.push8(bus, sp, self.regs.a)?;
        self.push8(bus, sp, self.regs.cc.to_byte())
    }
}

#[cfg(test)]
mod tests {
    use super::Cpu;
    use crate::fault::CoreError;
    use crate::memory::{Bus, Device, UnmappedPolicy};
    use crate::state::{ConditionCodes, IRQ_VECTOR, RESET_VECTOR};

    const RAM_START: u16 = 0x0000;
    const ROM_START: u16 = 0xE000;

    /// RAM over the low half, ROM with vectors at the top. Program bytes
    /// land at the start of RAM, handlers at the start of ROM.
    fn fixture(program: &[u8]) -> (Cpu, Bus) {
        let mut bus = Bus::new(UnmappedPolicy::Ignore);
        let mut ram = vec![0u8; 0x8000];
        ram[..program.len()].copy_from_slice(program);
        bus.map_device(RAM_START, 0x7FFF, Device::Ram(ram))
            .expect("ram range");

        let mut rom = vec![0u8; 0x2000];
        rom[0] = 0x3B; // Handler at ROM_START is a bare RTI
        let reset = usize::from(RESET_VECTOR - ROM_START);
        rom[reset] = 0x00; // Program starts at RAM_START
        rom[reset + 1] = 0x00;
        let irq = usize::from(IRQ_VECTOR - ROM_START);
        rom[irq] = 0xE0; // Handlers parked at ROM_START
        rom[irq + 1] = 0x00;
        bus.map_device(ROM_START, 0xFFFF, Device::Rom(rom))
            .expect("rom range");

        let mut cpu = Cpu::new();
        cpu.reset(&bus);
        (cpu, bus)
    }

    fn step(cpu: &mut Cpu, bus: &mut Bus) -> u8 {
        cpu.step(bus, false, false).expect("legal instruction")
    }

    #[test]
    fn reset_loads_pc_from_the_vector() {
        let (cpu, _bus) = fixture(&[0x12]);
        assert_eq!(cpu.registers().pc, 0x0000);
        assert!(cpu.registers().cc.interrupt_mask);
        assert!(cpu.registers().cc.fast_interrupt_mask);
    }

    #[test]
    fn nop_advances_pc_and_costs_two_cycles() {
        let (mut cpu, mut bus) = fixture(&[0x12, 0x12]);
        assert_eq!(step(&mut cpu, &mut bus), 2);
        assert_eq!(cpu.registers().pc, 0x0001);
    }

    #[test]
    fn illegal_opcode_surfaces_with_its_address() {
        let (mut cpu, mut bus) = fixture(&[0x12, 0x05]);
        step(&mut cpu, &mut bus);
        let err = cpu.step(&mut bus, false, false).expect_err("reserved byte");
        assert_eq!(
            err,
            CoreError::IllegalOpcode {
                pc: 0x0001,
                opcode: 0x05
            }
        );
    }

    #[test]
    fn illegal_prefixed_opcode_reports_the_second_byte() {
        let (mut cpu, mut bus) = fixture(&[0x10, 0x20]);
        let err = cpu.step(&mut bus, false, false).expect_err("reserved byte");
        assert_eq!(
            err,
            CoreError::IllegalOpcode {
                pc: 0x0001,
                opcode: 0x20
            }
        );
    }

    #[test]
    fn masked_irq_is_not_honored() {
        let (mut cpu, mut bus) = fixture(&[0x12]);
        assert!(cpu.registers().cc.interrupt_mask);
        let cycles = cpu.step(&mut bus, true, false).expect("masked line");
        assert_eq!(cycles, 2); // The NOP ran instead.
        assert_eq!(cpu.registers().pc, 0x0001);
    }

    #[test]
    fn irq_stacks_the_entire_frame() {
        // ANDCC #$EF clears the IRQ mask, then one NOP runs before the
        // line is raised.
        let (mut cpu, mut bus) = fixture(&[0x1C, 0xEF, 0x12]);
        cpu.registers_mut().s = 0x4000;
        cpu.registers_mut().a = 0xAA;
        cpu.registers_mut().b = 0xBB;
        cpu.registers_mut().x = 0x1234;
        step(&mut cpu, &mut bus);
        step(&mut cpu, &mut bus);
        let cc_before = cpu.registers().cc;

        let cycles = cpu.step(&mut bus, true, false).expect("irq entry");
        assert_eq!(cycles, 19);
        assert_eq!(cpu.registers().pc, 0xE000);
        assert!(cpu.registers().cc.interrupt_mask);
        assert_eq!(cpu.registers().s, 0x4000 - 12);

        // Frame layout from the lowest stacked address: CC A B DP X Y U PC.
        let s = cpu.registers().s;
        let stacked_cc = ConditionCodes::from_byte(bus.read_raw(s));
        assert!(stacked_cc.entire);
        assert_eq!(stacked_cc.interrupt_mask, cc_before.interrupt_mask);
        assert_eq!(bus.read_raw(s + 1), 0xAA);
        assert_eq!(bus.read_raw(s + 2), 0xBB);
        assert_eq!(bus.read16_raw(s + 4), 0x1234);
        assert_eq!(bus.read16_raw(s + 10), 0x0003);
    }

    #[test]
    fn rti_restores_the_stacked_frame() {
        let (mut cpu, mut bus) = fixture(&[0x1C, 0xEF, 0x12]);
        cpu.registers_mut().s = 0x4000;
        cpu.registers_mut().y = 0xCAFE;
        step(&mut cpu, &mut bus);
        step(&mut cpu, &mut bus);
        cpu.step(&mut bus, true, false).expect("irq entry");
        cpu.registers_mut().y = 0;

        // The handler is a bare RTI.
        let cycles = cpu.step(&mut bus, false, false).expect("rti");
        assert_eq!(cycles, 15);
        assert_eq!(cpu.registers().y, 0xCAFE);
        assert_eq!(cpu.registers().pc, 0x0003);
        assert_eq!(cpu.registers().s, 0x4000);
        assert!(!cpu.registers().cc.interrupt_mask);
    }

    #[test]
    fn firq_stacks_only_pc_and_cc() {
        let (mut cpu, mut bus) = fixture(&[0x1C, 0xBF]); // Clear F mask
        cpu.registers_mut().s = 0x4000;
        step(&mut cpu, &mut bus);

        let cycles = cpu.step(&mut bus, false, true).expect("firq entry");
        assert_eq!(cycles, 10);
        assert_eq!(cpu.registers().s, 0x4000 - 3);
        let stacked_cc = ConditionCodes::from_byte(bus.read_raw(cpu.registers().s));
        assert!(!stacked_cc.entire);
        assert!(cpu.registers().cc.fast_interrupt_mask);
        assert!(cpu.registers().cc.interrupt_mask);
    }

    #[test]
    fn sync_waits_until_a_line_rises() {
        let (mut cpu, mut bus) = fixture(&[0x13, 0x12]);
        assert_eq!(step(&mut cpu, &mut bus), 4);
        assert!(cpu.is_waiting());

        // Idle while nothing is pending.
        assert_eq!(cpu.step(&mut bus, false, false).expect("idle"), 1);
        assert!(cpu.is_waiting());

        // A masked line releases the wait without dispatching.
        let cycles = cpu.step(&mut bus, true, false).expect("release");
        assert!(!cpu.is_waiting());
        assert_eq!(cycles, 2); // The following NOP.
        assert_eq!(cpu.registers().pc, 0x0002);
    }

    #[test]
    fn cwai_stacks_once_and_interrupt_entry_skips_the_push() {
        // CWAI #$EF clears the IRQ mask and stacks the frame.
        let (mut cpu, mut bus) = fixture(&[0x3C, 0xEF]);
        cpu.registers_mut().s = 0x4000;
        assert_eq!(step(&mut cpu, &mut bus), 20);
        assert!(cpu.is_waiting());
        assert_eq!(cpu.registers().s, 0x4000 - 12);
        let s_after_push = cpu.registers().s;

        cpu.step(&mut bus, true, false).expect("irq entry");
        assert_eq!(cpu.registers().pc, 0xE000);
        // No second frame was pushed.
        assert_eq!(cpu.registers().s, s_after_push);
        let stacked_cc = ConditionCodes::from_byte(bus.read_raw(s_after_push));
        assert!(stacked_cc.entire);
    }
}
