//! Documented 6809 cycle-cost tables.
//!
//! Dense per-page tables of base costs; zero marks an illegal encoding.
//! Dynamic costs (indexed postbyte forms, taken long branches, push/pull
//! masks, the RTI Entire split) are added by the execute engine on top of
//! these base values. Prefixed-page entries already include the prefix
//! fetch cycle.

use crate::decoder::Page;

/// Base cycle costs for unprefixed opcodes.
pub static CYCLES_PAGE0: [u8; 256] = [
    /* 00 */ 6, 0, 0, 6, 6, 0, 6, 6, 6, 6, 6, 0, 6, 6, 3, 6,
    /* 10 */ 0, 0, 2, 4, 0, 0, 5, 9, 0, 2, 3, 0, 3, 2, 8, 6,
    /* 20 */ 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    /* 30 */ 4, 4, 4, 4, 5, 5, 5, 5, 0, 5, 3, 6, 20, 11, 0, 19,
    /* 40 */ 2, 0, 0, 2, 2, 0, 2, 2, 2, 2, 2, 0, 2, 2, 0, 2,
    /* 50 */ 2, 0, 0, 2, 2, 0, 2, 2, 2, 2, 2, 0, 2, 2, 0, 2,
    /* 60 */ 6, 0, 0, 6, 6, 0, 6, 6, 6, 6, 6, 0, 6, 6, 3, 6,
    /* 70 */ 7, 0, 0, 7, 7, 0, 7, 7, 7, 7, 7, 0, 7, 7, 4, 7,
    /* 80 */ 2, 2, 2, 4, 2, 2, 2, 0, 2, 2, 2, 2, 4, 7, 3, 0,
    /* 90 */ 4, 4, 4, 6, 4, 4, 4, 4, 4, 4, 4, 4, 6, 7, 5, 5,
    /* A0 */ 4, 4, 4, 6, 4, 4, 4, 4, 4, 4, 4, 4, 6, 7, 5, 5,
    /* B0 */ 5, 5, 5, 7, 5, 5, 5, 5, 5, 5, 5, 5, 7, 8, 6, 6,
    /* C0 */ 2, 2, 2, 4, 2, 2, 2, 0, 2, 2, 2, 2, 3, 0, 3, 0,
    /* D0 */ 4, 4, 4, 6, 4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5,
    /* E0 */ 4, 4, 4, 6, 4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5,
    /* F0 */ 5, 5, 5, 7, 5, 5, 5, 5, 5, 5, 5, 5, 6, 6, 6, 6,
];

/// Base cycle costs for `0x10`-prefixed opcodes.
pub static CYCLES_PAGE10: [u8; 256] = {
    let mut t = [0u8; 256];
    // Long conditional branches; +1 when taken.
    let mut i = 0x21;
    while i <= 0x2F {
        t[i] = 5;
        i += 1;
    }
    t[0x3F] = 20; // SWI2
    t[0x83] = 5; // CMPD
    t[0x93] = 7;
    t[0xA3] = 7;
    t[0xB3] = 8;
    t[0x8C] = 5; // CMPY
    t[0x9C] = 7;
    t[0xAC] = 7;
    t[0xBC] = 8;
    t[0x8E] = 4; // LDY
    t[0x9E] = 6;
    t[0xAE] = 6;
    t[0xBE] = 7;
    t[0x9F] = 6; // STY
    t[0xAF] = 6;
    t[0xBF] = 7;
    t[0xCE] = 4; // LDS
    t[0xDE] = 6;
    t[0xEE] = 6;
    t[0xFE] = 7;
    t[0xDF] = 6; // STS
    t[0xEF] = 6;
    t[0xFF] = 7;
    t
};

/// Base cycle costs for `0x11`-prefixed opcodes.
pub static CYCLES_PAGE11: [u8; 256] = {
    let mut t = [0u8; 256];
    t[0x3F] = 20; // SWI3
    t[0x83] = 5; // CMPU
    t[0x93] = 7;
    t[0xA3] = 7;
    t[0xB3] = 8;
    t[0x8C] = 5; // CMPS
    t[0x9C] = 7;
    t[0xAC] = 7;
    t[0xBC] = 8;
    t
};

/// Cycles consumed by honoring an IRQ (entire frame stacked plus vector
/// fetch).
pub const IRQ_ENTRY_CYCLES: u8 = 19;
/// Cycles consumed by honoring an NMI.
pub const NMI_ENTRY_CYCLES: u8 = 19;
/// Cycles consumed by honoring a FIRQ (PC and CC only).
pub const FIRQ_ENTRY_CYCLES: u8 = 10;
/// Cycles consumed by the reset sequence (vector fetch).
pub const RESET_CYCLES: u8 = 1;

/// Base cycle cost for an opcode byte on the given page; zero for illegal
/// encodings.
#[must_use]
pub fn base_cycles(page: Page, opcode: u8) -> u8 {
    let table = match page {
        Page::P0 => &CYCLES_PAGE0,
        Page::P10 => &CYCLES_PAGE10,
        Page::P11 => &CYCLES_PAGE11,
    };
    table[usize::from(opcode)]
}

#[cfg(test)]
mod tests {
    use super::{base_cycles, CYCLES_PAGE0};
    use crate::decoder::Page;

    #[test]
    fn canonical_costs_match_the_programming_manual() {
        assert_eq!(base_cycles(Page::P0, 0x12), 2); // NOP
        assert_eq!(base_cycles(Page::P0, 0x39), 5); // RTS
        assert_eq!(base_cycles(Page::P0, 0x20), 3); // BRA
        assert_eq!(base_cycles(Page::P0, 0x8D), 7); // BSR
        assert_eq!(base_cycles(Page::P0, 0xBD), 8); // JSR extended
        assert_eq!(base_cycles(Page::P0, 0x3D), 11); // MUL
        assert_eq!(base_cycles(Page::P0, 0x3C), 20); // CWAI
        assert_eq!(base_cycles(Page::P0, 0x3F), 19); // SWI
        assert_eq!(base_cycles(Page::P10, 0x26), 5); // LBNE
        assert_eq!(base_cycles(Page::P11, 0x8C), 5); // CMPS immediate
    }

    #[test]
    fn prefix_bytes_have_no_base_cost() {
        assert_eq!(CYCLES_PAGE0[0x10], 0);
        assert_eq!(CYCLES_PAGE0[0x11], 0);
    }

    #[test]
    fn accumulator_inherent_row_is_uniform() {
        for opcode in [0x40u8, 0x43, 0x44, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4C, 0x4D, 0x4F] {
            assert_eq!(base_cycles(Page::P0, opcode), 2);
            assert_eq!(base_cycles(Page::P0, opcode + 0x10), 2);
        }
    }
}
