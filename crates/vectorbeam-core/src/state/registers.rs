//! CPU register file and condition-code packing.
//!
//! The condition-code byte packs eight boolean flags in a fixed layout;
//! `to_byte`/`from_byte` are exact inverses for every value, which the
//! `TFR`/`EXG`/`PSHS`/`RTI` paths depend on.

/// Carry / borrow flag bit.
pub const CC_CARRY: u8 = 0x01;
/// Twos-complement overflow flag bit.
pub const CC_OVERFLOW: u8 = 0x02;
/// Zero flag bit.
pub const CC_ZERO: u8 = 0x04;
/// Negative flag bit.
pub const CC_NEGATIVE: u8 = 0x08;
/// IRQ mask bit; IRQ is honored only while clear.
pub const CC_INTERRUPT_MASK: u8 = 0x10;
/// Half-carry flag bit (BCD adjust input).
pub const CC_HALF_CARRY: u8 = 0x20;
/// FIRQ mask bit; FIRQ is honored only while clear.
pub const CC_FAST_INTERRUPT_MASK: u8 = 0x40;
/// Entire flag bit; set when the full register frame was stacked.
pub const CC_ENTIRE: u8 = 0x80;

/// SWI3 vector address.
pub const SWI3_VECTOR: u16 = 0xFFF2;
/// SWI2 vector address.
pub const SWI2_VECTOR: u16 = 0xFFF4;
/// FIRQ vector address.
pub const FIRQ_VECTOR: u16 = 0xFFF6;
/// IRQ vector address.
pub const IRQ_VECTOR: u16 = 0xFFF8;
/// SWI vector address.
pub const SWI_VECTOR: u16 = 0xFFFA;
/// NMI vector address.
pub const NMI_VECTOR: u16 = 0xFFFC;
/// Reset vector address.
pub const RESET_VECTOR: u16 = 0xFFFE;

/// The eight condition-code flags as individual booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConditionCodes {
    /// Carry / borrow.
    pub carry: bool,
    /// Twos-complement overflow.
    pub overflow: bool,
    /// Result was zero.
    pub zero: bool,
    /// Result was negative.
    pub negative: bool,
    /// IRQ mask.
    pub interrupt_mask: bool,
    /// Half carry out of bit 3.
    pub half_carry: bool,
    /// FIRQ mask.
    pub fast_interrupt_mask: bool,
    /// Entire register frame was stacked.
    pub entire: bool,
}

impl ConditionCodes {
    /// Packs the eight flags into the architectural byte layout.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        (self.carry as u8)
            | (self.overflow as u8) << 1
            | (self.zero as u8) << 2
            | (self.negative as u8) << 3
            | (self.interrupt_mask as u8) << 4
            | (self.half_carry as u8) << 5
            | (self.fast_interrupt_mask as u8) << 6
            | (self.entire as u8) << 7
    }

    /// Unpacks an architectural condition-code byte.
    #[must_use]
    pub const fn from_byte(value: u8) -> Self {
        Self {
            carry: value & CC_CARRY != 0,
            overflow: value & CC_OVERFLOW != 0,
            zero: value & CC_ZERO != 0,
            negative: value & CC_NEGATIVE != 0,
            interrupt_mask: value & CC_INTERRUPT_MASK != 0,
            half_carry: value & CC_HALF_CARRY != 0,
            fast_interrupt_mask: value & CC_FAST_INTERRUPT_MASK != 0,
            entire: value & CC_ENTIRE != 0,
        }
    }
}

/// The 6809-class register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuRegisters {
    /// Program counter.
    pub pc: u16,
    /// Index register X.
    pub x: u16,
    /// Index register Y.
    pub y: u16,
    /// User stack pointer.
    pub u: u16,
    /// Hardware stack pointer.
    pub s: u16,
    /// Accumulator A (high byte of D).
    pub a: u8,
    /// Accumulator B (low byte of D).
    pub b: u8,
    /// Direct page register.
    pub dp: u8,
    /// Condition codes.
    pub cc: ConditionCodes,
}

impl CpuRegisters {
    /// The combined 16-bit accumulator `D = A:B`.
    #[must_use]
    pub const fn d(&self) -> u16 {
        (self.a as u16) << 8 | self.b as u16
    }

    /// Sets `A` and `B` from the combined accumulator value.
    pub const fn set_d(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.b = (value & 0xFF) as u8;
    }

    /// Power-on defaults: everything zero except both interrupt masks,
    /// which start set so no interrupt is honored before the program
    /// enables it. `PC` is loaded separately from the reset vector.
    #[must_use]
    pub const fn power_on() -> Self {
        Self {
            pc: 0,
            x: 0,
            y: 0,
            u: 0,
            s: 0,
            a: 0,
            b: 0,
            dp: 0,
            cc: ConditionCodes {
                carry: false,
                overflow: false,
                zero: false,
                negative: false,
                interrupt_mask: true,
                half_carry: false,
                fast_interrupt_mask: true,
                entire: false,
            },
        }
    }
}
