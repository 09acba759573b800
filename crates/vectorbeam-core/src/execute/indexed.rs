//! Indexed addressing: postbyte decode and effective-address math.
//!
//! With bit 7 clear the postbyte carries a 5-bit signed offset from the
//! selected index register. With bit 7 set the low nibble picks the
//! form, bit 4 requests one level of indirection, and bits 5..=6 select
//! the register. Auto-increment/decrement forms reject indirection on
//! the single-step variants, and three nibbles are reserved; both
//! surface as decode errors. Extra cycle costs accrue on the
//! instruction's running total.

use crate::execute::Cpu;
use crate::fault::CoreError;
use crate::memory::Bus;

const INDIRECT: u8 = 0x10;

impl Cpu {
    /// Consumes an indexed postbyte (plus any offset bytes) and returns
    /// the effective address.
    pub(crate) fn indexed_ea(&mut self, bus: &mut Bus) -> Result<u16, CoreError> {
        let postbyte_pc = self.regs.pc;
        let postbyte = self.fetch8(bus)?;
        let reg = self.index_register((postbyte >> 5) & 0x03);

        if postbyte & 0x80 == 0 {
            // 5-bit signed offset, never indirect.
            let mut offset = postbyte & 0x1F;
            if offset & 0x10 != 0 {
                offset |= 0xE0;
            }
            self.cycles += 1;
            return Ok(reg.wrapping_add(offset as i8 as u16));
        }

        let indirect = postbyte & INDIRECT != 0;
        let illegal = CoreError::IllegalIndexedPostbyte {
            pc: postbyte_pc,
            postbyte,
        };

        let mut ea = match postbyte & 0x0F {
            0x00 => {
                if indirect {
                    return Err(illegal);
                }
                self.cycles += 2;
                let ea = reg;
                self.set_index_register((postbyte >> 5) & 0x03, reg.wrapping_add(1));
                ea
            }
            0x01 => {
                self.cycles += 3;
                let ea = reg;
                self.set_index_register((postbyte >> 5) & 0x03, reg.wrapping_add(2));
                ea
            }
            0x02 => {
                if indirect {
                    return Err(illegal);
                }
                self.cycles += 2;
                let ea = reg.wrapping_sub(1);
                self.set_index_register((postbyte >> 5) & 0x03, ea);
                ea
            }
            0x03 => {
                self.cycles += 3;
                let ea = reg.wrapping_sub(2);
                self.set_index_register((postbyte >> 5) & 0x03, ea);
                ea
            }
            0x04 => reg,
            0x05 => {
                self.cycles += 1;
                reg.wrapping_add(self.regs.b as i8 as u16)
            }
            0x06 => {
                self.cycles += 1;
                reg.wrapping_add(self.regs.a as i8 as u16)
            }
            0x08 => {
                self.cycles += 1;
                let offset = self.fetch8(bus)? as i8;
                reg.wrapping_add(offset as u16)
            }
            0x09 => {
                self.cycles += 4;
                let offset = self.fetch16(bus)?;
                reg.wrapping_add(offset)
            }
            0x0B => {
                self.cycles += 4;
                reg.wrapping_add(self.regs.d())
            }
            0x0C => {
                self.cycles += 1;
                let offset = self.fetch8(bus)? as i8;
                self.regs.pc.wrapping_add(offset as u16)
            }
            0x0D => {
                self.cycles += 5;
                let offset = self.fetch16(bus)?;
                self.regs.pc.wrapping_add(offset)
            }
            0x0F => {
                self.cycles += 2;
                self.fetch16(bus)?
            }
            _ => return Err(illegal),
        };

        if indirect {
            self.cycles += 3;
            ea = bus.read16(ea)?;
        }
        Ok(ea)
    }

    const fn index_register(&self, select: u8) -> u16 {
        match select {
            0 => self.regs.x,
            1 => self.regs.y,
            2 => self.regs.u,
            _ => self.regs.s,
        }
    }

    const fn set_index_register(&mut self, select: u8, value: u16) {
        match select {
            0 => self.regs.x = value,
            1 => self.regs.y = value,
            2 => self.regs.u = value,
            _ => self.regs.s = value,
        }
    }
}
