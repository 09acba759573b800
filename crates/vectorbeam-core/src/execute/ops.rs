//! Instruction semantics and flag math.
//!
//! One `dispatch` entry per opcode, grouped by family. Handlers receive
//! the addressing mode from the decode tables and add any dynamic cycle
//! cost (indexed forms, taken long branches, per-byte stack traffic) on
//! top of the base cost already charged by `step`.

use crate::decoder::{AddressingMode, Page};
use crate::execute::{Cpu, StackPointer};
use crate::fault::CoreError;
use crate::memory::Bus;
use crate::state::{ConditionCodes, SWI2_VECTOR, SWI3_VECTOR, SWI_VECTOR};

// Push/pull postbyte bits, high to low in push order.
const STACK_PC: u8 = 0x80;
const STACK_OTHER: u8 = 0x40;
const STACK_Y: u8 = 0x20;
const STACK_X: u8 = 0x10;
const STACK_DP: u8 = 0x08;
const STACK_B: u8 = 0x04;
const STACK_A: u8 = 0x02;
const STACK_CC: u8 = 0x01;

impl Cpu {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn dispatch(
        &mut self,
        bus: &mut Bus,
        page: Page,
        opcode: u8,
        mode: AddressingMode,
    ) -> Result<(), CoreError> {
        match (page, opcode) {
            // Memory read-modify-write rows.
            (Page::P0, 0x00 | 0x60 | 0x70) => self.rmw_mem(bus, mode, Self::op_neg),
            (Page::P0, 0x03 | 0x63 | 0x73) => self.rmw_mem(bus, mode, Self::op_com),
            (Page::P0, 0x04 | 0x64 | 0x74) => self.rmw_mem(bus, mode, Self::op_lsr),
            (Page::P0, 0x06 | 0x66 | 0x76) => self.rmw_mem(bus, mode, Self::op_ror),
            (Page::P0, 0x07 | 0x67 | 0x77) => self.rmw_mem(bus, mode, Self::op_asr),
            (Page::P0, 0x08 | 0x68 | 0x78) => self.rmw_mem(bus, mode, Self::op_asl),
            (Page::P0, 0x09 | 0x69 | 0x79) => self.rmw_mem(bus, mode, Self::op_rol),
            (Page::P0, 0x0A | 0x6A | 0x7A) => self.rmw_mem(bus, mode, Self::op_dec),
            (Page::P0, 0x0C | 0x6C | 0x7C) => self.rmw_mem(bus, mode, Self::op_inc),
            (Page::P0, 0x0D | 0x6D | 0x7D) => {
                let addr = self.ea(bus, mode)?;
                let value = bus.read(addr)?;
                self.op_tst(value);
                Ok(())
            }
            (Page::P0, 0x0F | 0x6F | 0x7F) => {
                let addr = self.ea(bus, mode)?;
                self.op_clr();
                bus.write(addr, 0)
            }
            (Page::P0, 0x0E | 0x6E | 0x7E) => {
                self.regs.pc = self.ea(bus, mode)?;
                Ok(())
            }

            // Accumulator read-modify-write rows.
            (Page::P0, 0x40) => Ok(self.rmw_a(Self::op_neg)),
            (Page::P0, 0x43) => Ok(self.rmw_a(Self::op_com)),
            (Page::P0, 0x44) => Ok(self.rmw_a(Self::op_lsr)),
            (Page::P0, 0x46) => Ok(self.rmw_a(Self::op_ror)),
            (Page::P0, 0x47) => Ok(self.rmw_a(Self::op_asr)),
            (Page::P0, 0x48) => Ok(self.rmw_a(Self::op_asl)),
            (Page::P0, 0x49) => Ok(self.rmw_a(Self::op_rol)),
            (Page::P0, 0x4A) => Ok(self.rmw_a(Self::op_dec)),
            (Page::P0, 0x4C) => Ok(self.rmw_a(Self::op_inc)),
            (Page::P0, 0x4D) => Ok(self.op_tst(self.regs.a)),
            (Page::P0, 0x4F) => {
                self.op_clr();
                self.regs.a = 0;
                Ok(())
            }
            (Page::P0, 0x50) => Ok(self.rmw_b(Self::op_neg)),
            (Page::P0, 0x53) => Ok(self.rmw_b(Self::op_com)),
            (Page::P0, 0x54) => Ok(self.rmw_b(Self::op_lsr)),
            (Page::P0, 0x56) => Ok(self.rmw_b(Self::op_ror)),
            (Page::P0, 0x57) => Ok(self.rmw_b(Self::op_asr)),
            (Page::P0, 0x58) => Ok(self.rmw_b(Self::op_asl)),
            (Page::P0, 0x59) => Ok(self.rmw_b(Self::op_rol)),
            (Page::P0, 0x5A) => Ok(self.rmw_b(Self::op_dec)),
            (Page::P0, 0x5C) => Ok(self.rmw_b(Self::op_inc)),
            (Page::P0, 0x5D) => Ok(self.op_tst(self.regs.b)),
            (Page::P0, 0x5F) => {
                self.op_clr();
                self.regs.b = 0;
                Ok(())
            }

            // A-accumulator arithmetic and logic.
            (Page::P0, 0x80 | 0x90 | 0xA0 | 0xB0) => {
                let m = self.operand8(bus, mode)?;
                self.regs.a = self.sub8(self.regs.a, m, false);
                Ok(())
            }
            (Page::P0, 0x81 | 0x91 | 0xA1 | 0xB1) => {
                let m = self.operand8(bus, mode)?;
                let _ = self.sub8(self.regs.a, m, false);
                Ok(())
            }
            (Page::P0, 0x82 | 0x92 | 0xA2 | 0xB2) => {
                let m = self.operand8(bus, mode)?;
                let carry = self.regs.cc.carry;
                self.regs.a = self.sub8(self.regs.a, m, carry);
                Ok(())
            }
            (Page::P0, 0x84 | 0x94 | 0xA4 | 0xB4) => {
                let m = self.operand8(bus, mode)?;
                self.regs.a = self.logic8(self.regs.a & m);
                Ok(())
            }
            (Page::P0, 0x85 | 0x95 | 0xA5 | 0xB5) => {
                let m = self.operand8(bus, mode)?;
                let _ = self.logic8(self.regs.a & m);
                Ok(())
            }
            (Page::P0, 0x86 | 0x96 | 0xA6 | 0xB6) => {
                let m = self.operand8(bus, mode)?;
                self.regs.a = self.logic8(m);
                Ok(())
            }
            (Page::P0, 0x97 | 0xA7 | 0xB7) => {
                let addr = self.ea(bus, mode)?;
                let value = self.regs.a;
                let _ = self.logic8(value);
                bus.write(addr, value)
            }
            (Page::P0, 0x88 | 0x98 | 0xA8 | 0xB8) => {
                let m = self.operand8(bus, mode)?;
                self.regs.a = self.logic8(self.regs.a ^ m);
                Ok(())
            }
            (Page::P0, 0x89 | 0x99 | 0xA9 | 0xB9) => {
                let m = self.operand8(bus, mode)?;
                let carry = self.regs.cc.carry;
                self.regs.a = self.add8(self.regs.a, m, carry);
                Ok(())
            }
            (Page::P0, 0x8A | 0x9A | 0xAA | 0xBA) => {
                let m = self.operand8(bus, mode)?;
                self.regs.a = self.logic8(self.regs.a | m);
                Ok(())
            }
            (Page::P0, 0x8B | 0x9B | 0xAB | 0xBB) => {
                let m = self.operand8(bus, mode)?;
                self.regs.a = self.add8(self.regs.a, m, false);
                Ok(())
            }

            // B-accumulator arithmetic and logic.
            (Page::P0, 0xC0 | 0xD0 | 0xE0 | 0xF0) => {
                let m = self.operand8(bus, mode)?;
                self.regs.b = self.sub8(self.regs.b, m, false);
                Ok(())
            }
            (Page::P0, 0xC1 | 0xD1 | 0xE1 | 0xF1) => {
                let m = self.operand8(bus, mode)?;
                let _ = self.sub8(self.regs.b, m, false);
                Ok(())
            }
            (Page::P0, 0xC2 | 0xD2 | 0xE2 | 0xF2) => {
                let m = self.operand8(bus, mode)?;
                let carry = self.regs.cc.carry;
                self.regs.b = self.sub8(self.regs.b, m, carry);
                Ok(())
            }
            (Page::P0, 0xC4 | 0xD4 | 0xE4 | 0xF4) => {
                let m = self.operand8(bus, mode)?;
                self.regs.b = self.logic8(self.regs.b & m);
                Ok(())
            }
            (Page::P0, 0xC5 | 0xD5 | 0xE5 | 0xF5) => {
                let m = self.operand8(bus, mode)?;
                let _ = self.logic8(self.regs.b & m);
                Ok(())
            }
            (Page::P0, 0xC6 | 0xD6 | 0xE6 | 0xF6) => {
                let m = self.operand8(bus, mode)?;
                self.regs.b = self.logic8(m);
                Ok(())
            }
            (Page::P0, 0xD7 | 0xE7 | 0xF7) => {
                let addr = self.ea(bus, mode)?;
                let value = self.regs.b;
                let _ = self.logic8(value);
                bus.write(addr, value)
            }
            (Page::P0, 0xC8 | 0xD8 | 0xE8 | 0xF8) => {
                let m = self.operand8(bus, mode)?;
                self.regs.b = self.logic8(self.regs.b ^ m);
                Ok(())
            }
            (Page::P0, 0xC9 | 0xD9 | 0xE9 | 0xF9) => {
                let m = self.operand8(bus, mode)?;
                let carry = self.regs.cc.carry;
                self.regs.b = self.add8(self.regs.b, m, carry);
                Ok(())
            }
            (Page::P0, 0xCA | 0xDA | 0xEA | 0xFA) => {
                let m = self.operand8(bus, mode)?;
                self.regs.b = self.logic8(self.regs.b | m);
                Ok(())
            }
            (Page::P0, 0xCB | 0xDB | 0xEB | 0xFB) => {
                let m = self.operand8(bus, mode)?;
                self.regs.b = self.add8(self.regs.b, m, false);
                Ok(())
            }

            // 16-bit arithmetic.
            (Page::P0, 0x83 | 0x93 | 0xA3 | 0xB3) => {
                let m = self.operand16(bus, mode)?;
                let d = self.sub16(self.regs.d(), m);
                self.regs.set_d(d);
                Ok(())
            }
            (Page::P0, 0xC3 | 0xD3 | 0xE3 | 0xF3) => {
                let m = self.operand16(bus, mode)?;
                let d = self.add16(self.regs.d(), m);
                self.regs.set_d(d);
                Ok(())
            }
            (Page::P0, 0x8C | 0x9C | 0xAC | 0xBC) => {
                let m = self.operand16(bus, mode)?;
                let _ = self.sub16(self.regs.x, m);
                Ok(())
            }
            (Page::P10, 0x83 | 0x93 | 0xA3 | 0xB3) => {
                let m = self.operand16(bus, mode)?;
                let _ = self.sub16(self.regs.d(), m);
                Ok(())
            }
            (Page::P10, 0x8C | 0x9C | 0xAC | 0xBC) => {
                let m = self.operand16(bus, mode)?;
                let _ = self.sub16(self.regs.y, m);
                Ok(())
            }
            (Page::P11, 0x83 | 0x93 | 0xA3 | 0xB3) => {
                let m = self.operand16(bus, mode)?;
                let _ = self.sub16(self.regs.u, m);
                Ok(())
            }
            (Page::P11, 0x8C | 0x9C | 0xAC | 0xBC) => {
                let m = self.operand16(bus, mode)?;
                let _ = self.sub16(self.regs.s, m);
                Ok(())
            }

            // 16-bit loads and stores.
            (Page::P0, 0x8E | 0x9E | 0xAE | 0xBE) => {
                self.regs.x = self.load16(bus, mode)?;
                Ok(())
            }
            (Page::P0, 0x9F | 0xAF | 0xBF) => self.store16(bus, mode, self.regs.x),
            (Page::P0, 0xCC | 0xDC | 0xEC | 0xFC) => {
                let value = self.load16(bus, mode)?;
                self.regs.set_d(value);
                Ok(())
            }
            (Page::P0, 0xDD | 0xED | 0xFD) => self.store16(bus, mode, self.regs.d()),
            (Page::P0, 0xCE | 0xDE | 0xEE | 0xFE) => {
                self.regs.u = self.load16(bus, mode)?;
                Ok(())
            }
            (Page::P0, 0xDF | 0xEF | 0xFF) => self.store16(bus, mode, self.regs.u),
            (Page::P10, 0x8E | 0x9E | 0xAE | 0xBE) => {
                self.regs.y = self.load16(bus, mode)?;
                Ok(())
            }
            (Page::P10, 0x9F | 0xAF | 0xBF) => self.store16(bus, mode, self.regs.y),
            (Page::P10, 0xCE | 0xDE | 0xEE | 0xFE) => {
                self.regs.s = self.load16(bus, mode)?;
                Ok(())
            }
            (Page::P10, 0xDF | 0xEF | 0xFF) => self.store16(bus, mode, self.regs.s),

            // Short branches.
            (Page::P0, 0x20..=0x2F) => {
                let offset = self.fetch8(bus)? as i8;
                if self.test_condition(opcode & 0x0F) {
                    self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
                }
                Ok(())
            }
            // Long branches; one extra cycle when taken.
            (Page::P0, 0x16) => {
                let offset = self.fetch16(bus)?;
                self.regs.pc = self.regs.pc.wrapping_add(offset);
                Ok(())
            }
            (Page::P10, 0x21..=0x2F) => {
                let offset = self.fetch16(bus)?;
                if self.test_condition(opcode & 0x0F) {
                    self.regs.pc = self.regs.pc.wrapping_add(offset);
                    self.cycles += 1;
                }
                Ok(())
            }

            // Subroutine linkage.
            (Page::P0, 0x8D) => {
                let offset = self.fetch8(bus)? as i8;
                self.push16(bus, StackPointer::Hardware, self.regs.pc)?;
                self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
                Ok(())
            }
            (Page::P0, 0x17) => {
                let offset = self.fetch16(bus)?;
                self.push16(bus, StackPointer::Hardware, self.regs.pc)?;
                self.regs.pc = self.regs.pc.wrapping_add(offset);
                Ok(())
            }
            (Page::P0, 0x9D | 0xAD | 0xBD) => {
                let target = self.ea(bus, mode)?;
                self.push16(bus, StackPointer::Hardware, self.regs.pc)?;
                self.regs.pc = target;
                Ok(())
            }
            (Page::P0, 0x39) => {
                self.regs.pc = self.pop16(bus, StackPointer::Hardware)?;
                Ok(())
            }

            // Effective-address loads.
            (Page::P0, 0x30) => {
                self.regs.x = self.ea(bus, mode)?;
                self.regs.cc.zero = self.regs.x == 0;
                Ok(())
            }
            (Page::P0, 0x31) => {
                self.regs.y = self.ea(bus, mode)?;
                self.regs.cc.zero = self.regs.y == 0;
                Ok(())
            }
            (Page::P0, 0x32) => {
                self.regs.s = self.ea(bus, mode)?;
                Ok(())
            }
            (Page::P0, 0x33) => {
                self.regs.u = self.ea(bus, mode)?;
                Ok(())
            }

            // Stack traffic.
            (Page::P0, 0x34) => self.push_masked(bus, StackPointer::Hardware),
            (Page::P0, 0x35) => self.pull_masked(bus, StackPointer::Hardware),
            (Page::P0, 0x36) => self.push_masked(bus, StackPointer::User),
            (Page::P0, 0x37) => self.pull_masked(bus, StackPointer::User),

            // Register plumbing.
            (Page::P0, 0x1E) => {
                let postbyte = self.fetch8(bus)?;
                let left = self.read_interchange(postbyte >> 4);
                let right = self.read_interchange(postbyte & 0x0F);
                self.write_interchange(postbyte >> 4, right);
                self.write_interchange(postbyte & 0x0F, left);
                Ok(())
            }
            (Page::P0, 0x1F) => {
                let postbyte = self.fetch8(bus)?;
                let value = self.read_interchange(postbyte >> 4);
                self.write_interchange(postbyte & 0x0F, value);
                Ok(())
            }
            (Page::P0, 0x1A) => {
                let mask = self.fetch8(bus)?;
                self.regs.cc = ConditionCodes::from_byte(self.regs.cc.to_byte() | mask);
                Ok(())
            }
            (Page::P0, 0x1C) => {
                let mask = self.fetch8(bus)?;
                self.regs.cc = ConditionCodes::from_byte(self.regs.cc.to_byte() & mask);
                Ok(())
            }

            // Inherent arithmetic.
            (Page::P0, 0x3D) => {
                let product = u16::from(self.regs.a) * u16::from(self.regs.b);
                self.regs.set_d(product);
                self.regs.cc.zero = product == 0;
                self.regs.cc.carry = product & 0x80 != 0;
                Ok(())
            }
            (Page::P0, 0x19) => Ok(self.op_daa()),
            (Page::P0, 0x1D) => {
                self.regs.a = if self.regs.b & 0x80 != 0 { 0xFF } else { 0x00 };
                let d = self.regs.d();
                self.regs.cc.negative = d & 0x8000 != 0;
                self.regs.cc.zero = d == 0;
                Ok(())
            }
            (Page::P0, 0x3A) => {
                self.regs.x = self.regs.x.wrapping_add(u16::from(self.regs.b));
                Ok(())
            }
            (Page::P0, 0x12) => Ok(()),

            // Interrupt plumbing.
            (Page::P0, 0x3B) => self.op_rti(bus),
            (Page::P0, 0x13) => {
                self.begin_sync_wait();
                Ok(())
            }
            (Page::P0, 0x3C) => {
                let mask = self.fetch8(bus)?;
                self.regs.cc = ConditionCodes::from_byte(self.regs.cc.to_byte() & mask);
                self.regs.cc.entire = true;
                self.push_entire_frame(bus, StackPointer::Hardware)?;
                self.begin_cwai_wait();
                Ok(())
            }
            (Page::P0, 0x3F) => self.enter_swi(bus, SWI_VECTOR),
            (Page::P10, 0x3F) => self.enter_swi(bus, SWI2_VECTOR),
            (Page::P11, 0x3F) => self.enter_swi(bus, SWI3_VECTOR),

            // The decode tables admit nothing else.
            _ => Err(CoreError::IllegalOpcode {
                pc: self.regs.pc.wrapping_sub(1),
                opcode,
            }),
        }
    }

    // Operand plumbing.

    fn ea(&mut self, bus: &mut Bus, mode: AddressingMode) -> Result<u16, CoreError> {
        match mode {
            AddressingMode::Direct => {
                let low = self.fetch8(bus)?;
                Ok(u16::from(self.regs.dp) << 8 | u16::from(low))
            }
            AddressingMode::Extended => self.fetch16(bus),
            _ => self.indexed_ea(bus),
        }
    }

    fn operand8(&mut self, bus: &mut Bus, mode: AddressingMode) -> Result<u8, CoreError> {
        if mode == AddressingMode::Immediate8 {
            return self.fetch8(bus);
        }
        let addr = self.ea(bus, mode)?;
        bus.read(addr)
    }

    fn operand16(&mut self, bus: &mut Bus, mode: AddressingMode) -> Result<u16, CoreError> {
        if mode == AddressingMode::Immediate16 {
            return self.fetch16(bus);
        }
        let addr = self.ea(bus, mode)?;
        bus.read16(addr)
    }

    fn load16(&mut self, bus: &mut Bus, mode: AddressingMode) -> Result<u16, CoreError> {
        let value = self.operand16(bus, mode)?;
        self.regs.cc.negative = value & 0x8000 != 0;
        self.regs.cc.zero = value == 0;
        self.regs.cc.overflow = false;
        Ok(value)
    }

    fn store16(&mut self, bus: &mut Bus, mode: AddressingMode, value: u16) -> Result<(), CoreError> {
        let addr = self.ea(bus, mode)?;
        self.regs.cc.negative = value & 0x8000 != 0;
        self.regs.cc.zero = value == 0;
        self.regs.cc.overflow = false;
        bus.write(addr, (value >> 8) as u8)?;
        bus.write(addr.wrapping_add(1), (value & 0xFF) as u8)
    }

    fn rmw_mem(
        &mut self,
        bus: &mut Bus,
        mode: AddressingMode,
        f: fn(&mut Self, u8) -> u8,
    ) -> Result<(), CoreError> {
        let addr = self.ea(bus, mode)?;
        let value = bus.read(addr)?;
        let result = f(self, value);
        bus.write(addr, result)
    }

    fn rmw_a(&mut self, f: fn(&mut Self, u8) -> u8) {
        let value = self.regs.a;
        self.regs.a = f(self, value);
    }

    fn rmw_b(&mut self, f: fn(&mut Self, u8) -> u8) {
        let value = self.regs.b;
        self.regs.b = f(self, value);
    }

    // Flag math.

    fn nz8(&mut self, value: u8) {
        self.regs.cc.negative = value & 0x80 != 0;
        self.regs.cc.zero = value == 0;
    }

    fn logic8(&mut self, value: u8) -> u8 {
        self.nz8(value);
        self.regs.cc.overflow = false;
        value
    }

    fn add8(&mut self, a: u8, m: u8, carry_in: bool) -> u8 {
        let c = u16::from(carry_in);
        let wide = u16::from(a) + u16::from(m) + c;
        let result = (wide & 0xFF) as u8;
        self.regs.cc.half_carry = (a & 0x0F) + (m & 0x0F) + (c as u8) > 0x0F;
        self.regs.cc.carry = wide > 0xFF;
        self.regs.cc.overflow = (!(a ^ m) & (a ^ result) & 0x80) != 0;
        self.nz8(result);
        result
    }

    fn sub8(&mut self, a: u8, m: u8, borrow_in: bool) -> u8 {
        let b = u16::from(borrow_in);
        let result = a.wrapping_sub(m).wrapping_sub(b as u8);
        self.regs.cc.carry = u16::from(m) + b > u16::from(a);
        self.regs.cc.overflow = ((a ^ m) & (a ^ result) & 0x80) != 0;
        self.nz8(result);
        result
    }

    fn add16(&mut self, a: u16, m: u16) -> u16 {
        let wide = u32::from(a) + u32::from(m);
        let result = (wide & 0xFFFF) as u16;
        self.regs.cc.carry = wide > 0xFFFF;
        self.regs.cc.overflow = (!(a ^ m) & (a ^ result) & 0x8000) != 0;
        self.regs.cc.negative = result & 0x8000 != 0;
        self.regs.cc.zero = result == 0;
        result
    }

    fn sub16(&mut self, a: u16, m: u16) -> u16 {
        let result = a.wrapping_sub(m);
        self.regs.cc.carry = m > a;
        self.regs.cc.overflow = ((a ^ m) & (a ^ result) & 0x8000) != 0;
        self.regs.cc.negative = result & 0x8000 != 0;
        self.regs.cc.zero = result == 0;
        result
    }

    fn op_neg(&mut self, value: u8) -> u8 {
        let result = 0u8.wrapping_sub(value);
        self.regs.cc.carry = value != 0;
        self.regs.cc.overflow = value == 0x80;
        self.nz8(result);
        result
    }

    fn op_com(&mut self, value: u8) -> u8 {
        let result = !value;
        self.regs.cc.carry = true;
        self.regs.cc.overflow = false;
        self.nz8(result);
        result
    }

    fn op_lsr(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.regs.cc.carry = value & 0x01 != 0;
        self.nz8(result);
        result
    }

    fn op_ror(&mut self, value: u8) -> u8 {
        let result = value >> 1 | u8::from(self.regs.cc.carry) << 7;
        self.regs.cc.carry = value & 0x01 != 0;
        self.nz8(result);
        result
    }

    fn op_asr(&mut self, value: u8) -> u8 {
        let result = value & 0x80 | value >> 1;
        self.regs.cc.carry = value & 0x01 != 0;
        self.nz8(result);
        result
    }

    fn op_asl(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.regs.cc.carry = value & 0x80 != 0;
        self.regs.cc.overflow = (value ^ result) & 0x80 != 0;
        self.nz8(result);
        result
    }

    fn op_rol(&mut self, value: u8) -> u8 {
        let result = value << 1 | u8::from(self.regs.cc.carry);
        self.regs.cc.carry = value & 0x80 != 0;
        self.regs.cc.overflow = (value ^ result) & 0x80 != 0;
        self.nz8(result);
        result
    }

    fn op_dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.regs.cc.overflow = value == 0x80;
        self.nz8(result);
        result
    }

    fn op_inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.regs.cc.overflow = value == 0x7F;
        self.nz8(result);
        result
    }

    fn op_tst(&mut self, value: u8) {
        self.regs.cc.overflow = false;
        self.nz8(value);
    }

    fn op_clr(&mut self) {
        self.regs.cc.negative = false;
        self.regs.cc.zero = true;
        self.regs.cc.overflow = false;
        self.regs.cc.carry = false;
    }

    fn op_daa(&mut self) {
        let a = self.regs.a;
        let mut adjust = 0u8;
        if self.regs.cc.half_carry || a & 0x0F > 0x09 {
            adjust |= 0x06;
        }
        if self.regs.cc.carry || a > 0x99 {
            adjust |= 0x60;
        }
        let result = a.wrapping_add(adjust);
        self.regs.cc.carry = self.regs.cc.carry || adjust & 0x60 != 0;
        self.nz8(result);
        self.regs.a = result;
    }

    fn op_rti(&mut self, bus: &mut Bus) -> Result<(), CoreError> {
        let cc = ConditionCodes::from_byte(self.pop8(bus, StackPointer::Hardware)?);
        self.regs.cc = cc;
        if cc.entire {
            self.cycles += 9;
            self.regs.a = self.pop8(bus, StackPointer::Hardware)?;
            self.regs.b = self.pop8(bus, StackPointer::Hardware)?;
            self.regs.dp = self.pop8(bus, StackPointer::Hardware)?;
            self.regs.x = self.pop16(bus, StackPointer::Hardware)?;
            self.regs.y = self.pop16(bus, StackPointer::Hardware)?;
            self.regs.u = self.pop16(bus, StackPointer::Hardware)?;
        }
        self.regs.pc = self.pop16(bus, StackPointer::Hardware)?;
        Ok(())
    }

    // Branch condition select, low nibble of the opcode.
    fn test_condition(&self, select: u8) -> bool {
        let cc = self.regs.cc;
        match select {
            0x0 => true,
            0x1 => false,
            0x2 => !(cc.carry || cc.zero),
            0x3 => cc.carry || cc.zero,
            0x4 => !cc.carry,
            0x5 => cc.carry,
            0x6 => !cc.zero,
            0x7 => cc.zero,
            0x8 => !cc.overflow,
            0x9 => cc.overflow,
            0xA => !cc.negative,
            0xB => cc.negative,
            0xC => cc.negative == cc.overflow,
            0xD => cc.negative != cc.overflow,
            0xE => !cc.zero && cc.negative == cc.overflow,
            _ => cc.zero || cc.negative != cc.overflow,
        }
    }

    fn push_masked(&mut self, bus: &mut Bus, sp: StackPointer) -> Result<(), CoreError> {
        let mask = self.fetch8(bus)?;
        let other = match sp {
            StackPointer::Hardware => self.regs.u,
            StackPointer::User => self.regs.s,
        };
        if mask & STACK_PC != 0 {
            self.push16(bus, sp, self.regs.pc)?;
            self.cycles += 2;
        }
        if mask & STACK_OTHER != 0 {
            self.push16(bus, sp, other)?;
            self.cycles += 2;
        }
        if mask & STACK_Y != 0 {
            self.push16(bus, sp, self.regs.y)?;
            self.cycles += 2;
        }
        if mask & STACK_X != 0 {
            self.push16(bus, sp, self.regs.x)?;
            self.cycles += 2;
        }
        if mask & STACK_DP != 0 {
            self.push8(bus, sp, self.regs.dp)?;
            self.cycles += 1;
        }
        if mask & STACK_B != 0 {
            self.push8(bus, sp, self.regs.b)?;
            self.cycles += 1;
        }
        if mask & STACK_A != 0 {
            self.push8(bus, sp, self.regs.a)?;
            self.cycles += 1;
        }
        if mask & STACK_CC != 0 {
            self.push8(bus, sp, self.regs.cc.to_byte())?;
            self.cycles += 1;
        }
        Ok(())
    }

    fn pull_masked(&mut self, bus: &mut Bus, sp: StackPointer) -> Result<(), CoreError> {
        let mask = self.fetch8(bus)?;
        if mask & STACK_CC != 0 {
            let byte = self.pop8(bus, sp)?;
            self.regs.cc = ConditionCodes::from_byte(byte);
            self.cycles += 1;
        }
        if mask & STACK_A != 0 {
            self.regs.a = self.pop8(bus, sp)?;
            self.cycles += 1;
        }
        if mask & STACK_B != 0 {
            self.regs.b = self.pop8(bus, sp)?;
            self.cycles += 1;
        }
        if mask & STACK_DP != 0 {
            self.regs.dp = self.pop8(bus, sp)?;
            self.cycles += 1;
        }
        if mask & STACK_X != 0 {
            self.regs.x = self.pop16(bus, sp)?;
            self.cycles += 2;
        }
        if mask & STACK_Y != 0 {
            self.regs.y = self.pop16(bus, sp)?;
            self.cycles += 2;
        }
        if mask & STACK_OTHER != 0 {
            let value = self.pop16(bus, sp)?;
            match sp {
                StackPointer::Hardware => self.regs.u = value,
                StackPointer::User => self.regs.s = value,
            }
            self.cycles += 2;
        }
        if mask & STACK_PC != 0 {
            self.regs.pc = self.pop16(bus, sp)?;
            self.cycles += 2;
        }
        Ok(())
    }

    // TFR/EXG interchange codes: 0-5 are the 16-bit registers, 8-B the
    // 8-bit ones. An 8-bit source presents with a high filler byte.
    fn read_interchange(&self, code: u8) -> u16 {
        match code & 0x0F {
            0x0 => self.regs.d(),
            0x1 => self.regs.x,
            0x2 => self.regs.y,
            0x3 => self.regs.u,
            0x4 => self.regs.s,
            0x5 => self.regs.pc,
            0x8 => 0xFF00 | u16::from(self.regs.a),
            0x9 => 0xFF00 | u16::from(self.regs.b),
            0xA => 0xFF00 | u16::from(self.regs.cc.to_byte()),
            0xB => 0xFF00 | u16::from(self.regs.dp),
            _ => 0xFFFF,
        }
    }

    fn write_interchange(&mut self, code: u8, value: u16) {
        match code & 0x0F {
            0x0 => self.regs.set_d(value),
            0x1 => self.regs.x = value,
            0x2 => self.regs.y = value,
            0x3 => self.regs.u = value,
            0x4 => self.regs.s = value,
            0x5 => self.regs.pc = value,
            0x8 => self.regs.a = (value & 0xFF) as u8,
            0x9 => self.regs.b = (value & 0xFF) as u8,
            0xA => self.regs.cc = ConditionCodes::from_byte((value & 0xFF) as u8),
            0xB => self.regs.dp = (value & 0xFF) as u8,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::execute::Cpu;
    use crate::memory::{Bus, Device, UnmappedPolicy};
    use crate::state::RESET_VECTOR;

    /// RAM everywhere below the vector ROM; program at address zero.
    fn fixture(program: &[u8]) -> (Cpu, Bus) {
        let mut bus = Bus::new(UnmappedPolicy::Ignore);
        let mut ram = vec![0u8; 0xE000];
        ram[..program.len()].copy_from_slice(program);
        bus.map_device(0x0000, 0xDFFF, Device::Ram(ram))
            .expect("ram range");
        let mut rom = vec![0u8; 0x2000];
        let reset = usize::from(RESET_VECTOR - 0xE000);
        rom[reset] = 0x00;
        rom[reset + 1] = 0x00;
        bus.map_device(0xE000, 0xFFFF, Device::Rom(rom))
            .expect("rom range");
        let mut cpu = Cpu::new();
        cpu.reset(&bus);
        (cpu, bus)
    }

    fn run(cpu: &mut Cpu, bus: &mut Bus, steps: usize) -> u64 {
        let mut total = 0u64;
        for _ in 0..steps {
            total += u64::from(cpu.step(bus, false, false).expect("legal instruction"));
        }
        total
    }

    #[test]
    fn lda_sets_negative_and_clears_overflow() {
        let (mut cpu, mut bus) = fixture(&[0x86, 0x80]); // LDA #$80
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.registers().a, 0x80);
        assert!(cpu.registers().cc.negative);
        assert!(!cpu.registers().cc.zero);
        assert!(!cpu.registers().cc.overflow);
    }

    #[test]
    fn sta_direct_honors_the_direct_page() {
        let (mut cpu, mut bus) = fixture(&[0x86, 0x42, 0x97, 0x20]); // LDA / STA <$20
        cpu.registers_mut().dp = 0x20;
        run(&mut cpu, &mut bus, 2);
        assert_eq!(bus.read_raw(0x2020), 0x42);
    }

    #[test]
    fn adda_sets_half_carry_and_carry() {
        let (mut cpu, mut bus) = fixture(&[0x86, 0x0F, 0x8B, 0x01, 0x8B, 0xF0]);
        run(&mut cpu, &mut bus, 2); // LDA #$0F / ADDA #$01
        assert_eq!(cpu.registers().a, 0x10);
        assert!(cpu.registers().cc.half_carry);
        assert!(!cpu.registers().cc.carry);
        run(&mut cpu, &mut bus, 1); // ADDA #$F0
        assert_eq!(cpu.registers().a, 0x00);
        assert!(cpu.registers().cc.carry);
        assert!(cpu.registers().cc.zero);
    }

    #[test]
    fn suba_borrow_and_overflow() {
        let (mut cpu, mut bus) = fixture(&[0x86, 0x00, 0x80, 0x01]); // LDA #0 / SUBA #1
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.registers().a, 0xFF);
        assert!(cpu.registers().cc.carry);
        assert!(cpu.registers().cc.negative);
        assert!(!cpu.registers().cc.overflow);
    }

    #[test]
    fn addd_combines_both_accumulators() {
        // LDD #$00FF / ADDD #$0001
        let (mut cpu, mut bus) = fixture(&[0xCC, 0x00, 0xFF, 0xC3, 0x00, 0x01]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.registers().d(), 0x0100);
        assert!(!cpu.registers().cc.carry);
        assert!(!cpu.registers().cc.zero);
    }

    #[test]
    fn mul_multiplies_into_d() {
        let (mut cpu, mut bus) = fixture(&[0x3D]);
        cpu.registers_mut().a = 0x0C;
        cpu.registers_mut().b = 0x64;
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, 11);
        assert_eq!(cpu.registers().d(), 0x04B0);
        assert!(cpu.registers().cc.carry); // Bit 7 of the low byte
    }

    #[test]
    fn daa_adjusts_bcd_addition() {
        // LDA #$19 / ADDA #$28 / DAA => BCD 19 + 28 = 47
        let (mut cpu, mut bus) = fixture(&[0x86, 0x19, 0x8B, 0x28, 0x19]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.registers().a, 0x47);
    }

    #[test]
    fn asl_rol_shift_through_carry() {
        let (mut cpu, mut bus) = fixture(&[0x86, 0xC0, 0x48, 0x49]); // LDA / ASLA / ROLA
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.registers().a, 0x80);
        assert!(cpu.registers().cc.carry);
        // Bits 7 and 6 agreed before the shift, so no overflow.
        assert!(!cpu.registers().cc.overflow);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.registers().a, 0x01); // Carry rotated into bit 0
        assert!(cpu.registers().cc.carry);
    }

    #[test]
    fn inc_dec_set_overflow_at_the_boundaries() {
        let (mut cpu, mut bus) = fixture(&[0x86, 0x7F, 0x4C, 0x4A]); // LDA / INCA / DECA
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.registers().a, 0x80);
        assert!(cpu.registers().cc.overflow);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.registers().a, 0x7F);
        assert!(cpu.registers().cc.overflow);
    }

    #[rstest]
    #[case(&[0x86, 0x00, 0x27, 0x02], 0x0006)] // BEQ taken
    #[case(&[0x86, 0x01, 0x27, 0x02], 0x0004)] // BEQ not taken
    #[case(&[0x86, 0x80, 0x2B, 0x02], 0x0006)] // BMI taken
    fn short_branches_follow_the_flags(#[case] program: &[u8], #[case] expected_pc: u16) {
        let (mut cpu, mut bus) = fixture(program);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.registers().pc, expected_pc);
    }

    #[test]
    fn taken_long_branch_costs_an_extra_cycle() {
        // LBEQ +2, flags from CLRA.
        let (mut cpu, mut bus) = fixture(&[0x4F, 0x10, 0x27, 0x00, 0x02]);
        run(&mut cpu, &mut bus, 1);
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, 6);
        assert_eq!(cpu.registers().pc, 0x0007);
    }

    #[test]
    fn bsr_and_rts_round_trip() {
        // BSR +2 / NOP / NOP / target: RTS
        let (mut cpu, mut bus) = fixture(&[0x8D, 0x02, 0x12, 0x12, 0x39]);
        cpu.registers_mut().s = 0x4000;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.registers().pc, 0x0004);
        assert_eq!(bus.read16_raw(0x3FFE), 0x0002);
        run(&mut cpu, &mut bus, 1); // RTS
        assert_eq!(cpu.registers().pc, 0x0002);
        assert_eq!(cpu.registers().s, 0x4000);
    }

    #[test]
    fn jsr_indexed_pushes_the_return_address() {
        // JSR 4,X with X = 0x0100
        let (mut cpu, mut bus) = fixture(&[0xAD, 0x04]);
        cpu.registers_mut().s = 0x4000;
        cpu.registers_mut().x = 0x0100;
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, 7 + 1);
        assert_eq!(cpu.registers().pc, 0x0104);
        assert_eq!(bus.read16_raw(0x3FFE), 0x0002);
        assert_eq!(cpu.registers().s, 0x3FFE);
    }

    #[test]
    fn pshs_puls_preserve_register_order() {
        // PSHS A,B,X / CLRA / CLRB / LDX #0 / PULS A,B,X
        let (mut cpu, mut bus) = fixture(&[
            0x34, 0x16, 0x4F, 0x5F, 0x8E, 0x00, 0x00, 0x35, 0x16,
        ]);
        cpu.registers_mut().s = 0x4000;
        cpu.registers_mut().a = 0x11;
        cpu.registers_mut().b = 0x22;
        cpu.registers_mut().x = 0x3344;
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, 5 + 4);
        assert_eq!(cpu.registers().s, 0x4000 - 4);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.registers().x, 0);
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.registers().a, 0x11);
        assert_eq!(cpu.registers().b, 0x22);
        assert_eq!(cpu.registers().x, 0x3344);
        assert_eq!(cpu.registers().s, 0x4000);
    }

    #[test]
    fn tfr_and_exg_move_whole_registers() {
        // TFR X,Y / EXG A,B
        let (mut cpu, mut bus) = fixture(&[0x1F, 0x12, 0x1E, 0x89]);
        cpu.registers_mut().x = 0xBEEF;
        cpu.registers_mut().a = 0x01;
        cpu.registers_mut().b = 0x02;
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.registers().y, 0xBEEF);
        assert_eq!(cpu.registers().a, 0x02);
        assert_eq!(cpu.registers().b, 0x01);
    }

    #[test]
    fn lea_postincrement_walks_the_register() {
        // LEAY ,X+ : Y takes the pre-increment address, X steps by one.
        let (mut cpu, mut bus) = fixture(&[0x31, 0x80]);
        cpu.registers_mut().x = 0x1000;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.registers().y, 0x1000);
        assert_eq!(cpu.registers().x, 0x1001);
    }

    #[test]
    fn indexed_five_bit_offset_addresses_relative_to_x() {
        // LDA -2,X with X pointing past two known bytes.
        let (mut cpu, mut bus) = fixture(&[0xA6, 0x1E]); // postbyte 0b00011110 = -2
        bus.write(0x0FFE, 0x77).expect("ram");
        cpu.registers_mut().x = 0x1000;
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, 4 + 1);
        assert_eq!(cpu.registers().a, 0x77);
    }

    #[test]
    fn indexed_indirect_reads_the_pointer() {
        // LDA [,X]
        let (mut cpu, mut bus) = fixture(&[0xA6, 0x94]);
        cpu.registers_mut().x = 0x0200;
        bus.write(0x0200, 0x03).expect("ram");
        bus.write(0x0201, 0x00).expect("ram");
        bus.write(0x0300, 0x5A).expect("ram");
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, 4 + 3);
        assert_eq!(cpu.registers().a, 0x5A);
    }

    #[test]
    fn indexed_postincrement_by_two_supports_indirect() {
        // LDD ,X++ then LDA [,X++] style postbytes exercised separately.
        let (mut cpu, mut bus) = fixture(&[0xEC, 0x81]); // LDD ,X++
        cpu.registers_mut().x = 0x0200;
        bus.write(0x0200, 0x12).expect("ram");
        bus.write(0x0201, 0x34).expect("ram");
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.registers().d(), 0x1234);
        assert_eq!(cpu.registers().x, 0x0202);
    }

    #[test]
    fn reserved_postbyte_is_a_decode_error() {
        let (mut cpu, mut bus) = fixture(&[0xA6, 0x87]); // reserved form
        let err = cpu.step(&mut bus, false, false).expect_err("reserved");
        assert!(matches!(
            err,
            crate::fault::CoreError::IllegalIndexedPostbyte { postbyte: 0x87, .. }
        ));
    }

    #[test]
    fn cmpx_sets_flags_without_writing() {
        // LDX #$8000 / CMPX #$8000
        let (mut cpu, mut bus) = fixture(&[0x8E, 0x80, 0x00, 0x8C, 0x80, 0x00]);
        run(&mut cpu, &mut bus, 2);
        assert!(cpu.registers().cc.zero);
        assert!(!cpu.registers().cc.carry);
        assert_eq!(cpu.registers().x, 0x8000);
    }

    #[test]
    fn sty_page10_stores_through_direct() {
        // LDY #$AABB / STY <$40
        let (mut cpu, mut bus) = fixture(&[0x10, 0x8E, 0xAA, 0xBB, 0x10, 0x9F, 0x40]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(bus.read16_raw(0x0040), 0xAABB);
    }

    #[test]
    fn sex_extends_the_sign_of_b() {
        let (mut cpu, mut bus) = fixture(&[0x1D]);
        cpu.registers_mut().b = 0x80;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.registers().a, 0xFF);
        assert!(cpu.registers().cc.negative);
    }

    #[test]
    fn abx_adds_unsigned_b() {
        let (mut cpu, mut bus) = fixture(&[0x3A]);
        cpu.registers_mut().x = 0x1000;
        cpu.registers_mut().b = 0xFF;
        run(&mut cpu, &mut bus, 1);
        assert_eq!(cpu.registers().x, 0x10FF);
    }

    #[test]
    fn clr_extended_writes_zero_and_fixed_flags() {
        let (mut cpu, mut bus) = fixture(&[0x7F, 0x02, 0x00]);
        bus.write(0x0200, 0xAB).expect("ram");
        run(&mut cpu, &mut bus, 1);
        assert_eq!(bus.read_raw(0x0200), 0x00);
        assert!(cpu.registers().cc.zero);
        assert!(!cpu.registers().cc.carry);
    }

    #[test]
    fn neg_memory_direct() {
        let (mut cpu, mut bus) = fixture(&[0x00, 0x80]); // NEG <$80
        bus.write(0x0080, 0x01).expect("ram");
        run(&mut cpu, &mut bus, 1);
        assert_eq!(bus.read_raw(0x0080), 0xFF);
        assert!(cpu.registers().cc.carry);
    }

    #[test]
    fn swi_vectors_and_masks() {
        let (mut cpu, mut bus) = fixture(&[0x3F]);
        cpu.registers_mut().s = 0x4000;
        cpu.registers_mut().cc.interrupt_mask = false;
        cpu.registers_mut().cc.fast_interrupt_mask = false;
        let cycles = run(&mut cpu, &mut bus, 1);
        assert_eq!(cycles, 19);
        assert!(cpu.registers().cc.interrupt_mask);
        assert!(cpu.registers().cc.fast_interrupt_mask);
        assert_eq!(cpu.registers().s, 0x4000 - 12);
        // SWI vector sits in the zeroed ROM: PC lands at 0x0000.
        assert_eq!(cpu.registers().pc, 0x0000);
    }
}
