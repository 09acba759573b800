//! Opcode classification tables.
//!
//! Maps each opcode byte (per page) to its mnemonic and addressing mode.
//! The execute engine uses the mode to compute effective addresses, the
//! disassembler uses both, and [`crate::timing`] carries the matching
//! cycle costs. A byte with no entry here is an illegal encoding.

/// Opcode page selected by the `0x10`/`0x11` prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    /// Unprefixed opcodes.
    P0,
    /// `0x10`-prefixed opcodes.
    P10,
    /// `0x11`-prefixed opcodes.
    P11,
}

/// Addressing modes of the 6809-class ISA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// No operand bytes.
    Inherent,
    /// One immediate operand byte (also register/mask postbytes).
    Immediate8,
    /// Two immediate operand bytes.
    Immediate16,
    /// One-byte offset into the `DP` page.
    Direct,
    /// Two-byte absolute address.
    Extended,
    /// Index postbyte plus zero to two offset bytes.
    Indexed,
    /// One-byte signed branch displacement.
    Relative8,
    /// Two-byte signed branch displacement.
    Relative16,
}

impl AddressingMode {
    /// Minimum operand byte count for the mode (indexed forms may consume
    /// up to two further offset bytes selected by the postbyte).
    #[must_use]
    pub const fn min_operand_bytes(self) -> u16 {
        match self {
            Self::Inherent => 0,
            Self::Immediate8 | Self::Direct | Self::Relative8 | Self::Indexed => 1,
            Self::Immediate16 | Self::Extended | Self::Relative16 => 2,
        }
    }
}

/// Decoded classification of one opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    /// Canonical mnemonic.
    pub mnemonic: &'static str,
    /// Addressing mode.
    pub mode: AddressingMode,
}

const fn op(mnemonic: &'static str, mode: AddressingMode) -> Option<OpInfo> {
    Some(OpInfo { mnemonic, mode })
}

/// Looks up an opcode byte on the given page.
#[must_use]
pub const fn lookup_op(page: Page, opcode: u8) -> Option<OpInfo> {
    match page {
        Page::P0 => lookup_page0(opcode),
        Page::P10 => lookup_page10(opcode),
        Page::P11 => lookup_page11(opcode),
    }
}

#[allow(clippy::too_many_lines)]
const fn lookup_page0(opcode: u8) -> Option<OpInfo> {
    use AddressingMode::{
        Direct, Extended, Immediate16, Immediate8, Indexed, Inherent, Relative16, Relative8,
    };
    match opcode {
        0x00 => op("NEG", Direct),
        0x03 => op("COM", Direct),
        0x04 => op("LSR", Direct),
        0x06 => op("ROR", Direct),
        0x07 => op("ASR", Direct),
        0x08 => op("ASL", Direct),
        0x09 => op("ROL", Direct),
        0x0A => op("DEC", Direct),
        0x0C => op("INC", Direct),
        0x0D => op("TST", Direct),
        0x0E => op("JMP", Direct),
        0x0F => op("CLR", Direct),

        0x12 => op("NOP", Inherent),
        0x13 => op("SYNC", Inherent),
        0x16 => op("LBRA", Relative16),
        0x17 => op("LBSR", Relative16),
        0x19 => op("DAA", Inherent),
        0x1A => op("ORCC", Immediate8),
        0x1C => op("ANDCC", Immediate8),
        0x1D => op("SEX", Inherent),
        0x1E => op("EXG", Immediate8),
        0x1F => op("TFR", Immediate8),

        0x20 => op("BRA", Relative8),
        0x21 => op("BRN", Relative8),
        0x22 => op("BHI", Relative8),
        0x23 => op("BLS", Relative8),
        0x24 => op("BCC", Relative8),
        0x25 => op("BCS", Relative8),
        0x26 => op("BNE", Relative8),
        0x27 => op("BEQ", Relative8),
        0x28 => op("BVC", Relative8),
        0x29 => op("BVS", Relative8),
        0x2A => op("BPL", Relative8),
        0x2B => op("BMI", Relative8),
        0x2C => op("BGE", Relative8),
        0x2D => op("BLT", Relative8),
        0x2E => op("BGT", Relative8),
        0x2F => op("BLE", Relative8),

        0x30 => op("LEAX", Indexed),
        0x31 => op("LEAY", Indexed),
        0x32 => op("LEAS", Indexed),
        0x33 => op("LEAU", Indexed),
        0x34 => op("PSHS", Immediate8),
        0x35 => op("PULS", Immediate8),
        0x36 => op("PSHU", Immediate8),
        0x37 => op("PULU", Immediate8),
        0x39 => op("RTS", Inherent),
        0x3A => op("ABX", Inherent),
        0x3B => op("RTI", Inherent),
        0x3C => op("CWAI", Immediate8),
        0x3D => op("MUL", Inherent),
        0x3F => op("SWI", Inherent),

        0x40 => op("NEGA", Inherent),
        0x43 => op("COMA", Inherent),
        0x44 => op("LSRA", Inherent),
        0x46 => op("RORA", Inherent),
        0x47 => op("ASRA", Inherent),
        0x48 => op("ASLA", Inherent),
        0x49 => op("ROLA", Inherent),
        0x4A => op("DECA", Inherent),
        0x4C => op("INCA", Inherent),
        0x4D => op("TSTA", Inherent),
        0x4F => op("CLRA", Inherent),

        0x50 => op("NEGB", Inherent),
        0x53 => op("COMB", Inherent),
        0x54 => op("LSRB", Inherent),
        0x56 => op("RORB", Inherent),
        0x57 => op("ASRB", Inherent),
        0x58 => op("ASLB", Inherent),
        0x59 => op("ROLB", Inherent),
        0x5A => op("DECB", Inherent),
        0x5C => op("INCB", Inherent),
        0x5D => op("TSTB", Inherent),
        0x5F => op("CLRB", Inherent),

        0x60 => op("NEG", Indexed),
        0x63 => op("COM", Indexed),
        0x64 => op("LSR", Indexed),
        0x66 => op("ROR", Indexed),
        0x67 => op("ASR", Indexed),
        0x68 => op("ASL", Indexed),
        0x69 => op("ROL", Indexed),
        0x6A => op("DEC", Indexed),
        0x6C => op("INC", Indexed),
        0x6D => op("TST", Indexed),
        0x6E => op("JMP", Indexed),
        0x6F => op("CLR", Indexed),

        0x70 => op("NEG", Extended),
        0x73 => op("COM", Extended),
        0x74 => op("LSR", Extended),
        0x76 => op("ROR", Extended),
        0x77 => op("ASR", Extended),
        0x78 => op("ASL", Extended),
        0x79 => op("ROL", Extended),
        0x7A => op("DEC", Extended),
        0x7C => op("INC", Extended),
        0x7D => op("TST", Extended),
        0x7E => op("JMP", Extended),
        0x7F => op("CLR", Extended),

        0x80 => op("SUBA", Immediate8),
        0x81 => op("CMPA", Immediate8),
        0x82 => op("SBCA", Immediate8),
        0x83 => op("SUBD", Immediate16),
        0x84 => op("ANDA", Immediate8),
        0x85 => op("BITA", Immediate8),
        0x86 => op("LDA", Immediate8),
        0x88 => op("EORA", Immediate8),
        0x89 => op("ADCA", Immediate8),
        0x8A => op("ORA", Immediate8),
        0x8B => op("ADDA", Immediate8),
        0x8C => op("CMPX", Immediate16),
        0x8D => op("BSR", Relative8),
        0x8E => op("LDX", Immediate16),

        0x90 => op("SUBA", Direct),
        0x91 => op("CMPA", Direct),
        0x92 => op("SBCA", Direct),
        0x93 => op("SUBD", Direct),
        0x94 => op("ANDA", Direct),
        0x95 => op("BITA", Direct),
        0x96 => op("LDA", Direct),
        0x97 => op("STA", Direct),
        0x98 => op("EORA", Direct),
        0x99 => op("ADCA", Direct),
        0x9A => op("ORA", Direct),
        0x9B => op("ADDA", Direct),
        0x9C => op("CMPX", Direct),
        0x9D => op("JSR", Direct),
        0x9E => op("LDX", Direct),
        0x9F => op("STX", Direct),

        0xA0 => op("SUBA", Indexed),
        0xA1 => op("CMPA", Indexed),
        0xA2 => op("SBCA", Indexed),
        0xA3 => op("SUBD", Indexed),
        0xA4 => op("ANDA", Indexed),
        0xA5 => op("BITA", Indexed),
        0xA6 => op("LDA", Indexed),
        0xA7 => op("STA", Indexed),
        0xA8 => op("EORA", Indexed),
        0xA9 => op("ADCA", Indexed),
        0xAA => op("ORA", Indexed),
        0xAB => op("ADDA", Indexed),
        0xAC => op("CMPX", Indexed),
        0xAD => op("JSR", Indexed),
        0xAE => op("LDX", Indexed),
        0xAF => op("STX", Indexed),

        0xB0 => op("SUBA", Extended),
        0xB1 => op("CMPA", Extended),
        0xB2 => op("SBCA", Extended),
        0xB3 => op("SUBD", Extended),
        0xB4 => op("ANDA", Extended),
        0xB5 => op("BITA", Extended),
        0xB6 => op("LDA", Extended),
        0xB7 => op("STA", Extended),
        0xB8 => op("EORA", Extended),
        0xB9 => op("ADCA", Extended),
        0xBA => op("ORA", Extended),
        0xBB => op("ADDA", Extended),
        0xBC => op("CMPX", Extended),
        0xBD => op("JSR", Extended),
        0xBE => op("LDX", Extended),
        0xBF => op("STX", Extended),

        0xC0 => op("SUBB", Immediate8),
        0xC1 => op("CMPB", Immediate8),
        0xC2 => op("SBCB", Immediate8),
        0xC3 => op("ADDD", Immediate16),
        0xC4 => op("ANDB", Immediate8),
        0xC5 => op("BITB", Immediate8),
        0xC6 => op("LDB", Immediate8),
        0xC8 => op("EORB", Immediate8),
        0xC9 => op("ADCB", Immediate8),
        0xCA => op("ORB", Immediate8),
        0xCB => op("ADDB", Immediate8),
        0xCC => op("LDD", Immediate16),
        0xCE => op("LDU", Immediate16),

        0xD0 => op("SUBB", Direct),
        0xD1 => op("CMPB", Direct),
        0xD2 => op("SBCB", Direct),
        0xD3 => op("ADDD", Direct),
        0xD4 => op("ANDB", Direct),
        0xD5 => op("BITB", Direct),
        0xD6 => op("LDB", Direct),
        0xD7 => op("STB", Direct),
        0xD8 => op("EORB", Direct),
        0xD9 => op("ADCB", Direct),
        0xDA => op("ORB", Direct),
        0xDB => op("ADDB", Direct),
        0xDC => op("LDD", Direct),
        0xDD => op("STD", Direct),
        0xDE => op("LDU", Direct),
        0xDF => op("STU", Direct),

        0xE0 => op("SUBB", Indexed),
        0xE1 => op("CMPB", Indexed),
        0xE2 => op("SBCB", Indexed),
        0xE3 => op("ADDD", Indexed),
        0xE4 => op("ANDB", Indexed),
        0xE5 => op("BITB", Indexed),
        0xE6 => op("LDB", Indexed),
        0xE7 => op("STB", Indexed),
        0xE8 => op("EORB", Indexed),
        0xE9 => op("ADCB", Indexed),
        0xEA => op("ORB", Indexed),
        0xEB => op("ADDB", Indexed),
        0xEC => op("LDD", Indexed),
        0xED => op("STD", Indexed),
        0xEE => op("LDU", Indexed),
        0xEF => op("STU", Indexed),

        0xF0 => op("SUBB", Extended),
        0xF1 => op("CMPB", Extended),
        0xF2 => op("SBCB", Extended),
        0xF3 => op("ADDD", Extended),
        0xF4 => op("ANDB", Extended),
        0xF5 => op("BITB", Extended),
        0xF6 => op("LDB", Extended),
        0xF7 => op("STB", Extended),
        0xF8 => op("EORB", Extended),
        0xF9 => op("ADCB", Extended),
        0xFA => op("ORB", Extended),
        0xFB => op("ADDB", Extended),
        0xFC => op("LDD", Extended),
        0xFD => op("STD", Extended),
        0xFE => op("LDU", Extended),
        0xFF => op("STU", Extended),

        _ => None,
    }
}

const fn lookup_page10(opcode: u8) -> Option<OpInfo> {
    use AddressingMode::{Direct, Extended, Immediate16, Indexed, Inherent, Relative16};
    match opcode {
        0x21 => op("LBRN", Relative16),
        0x22 => op("LBHI", Relative16),
        0x23 => op("LBLS", Relative16),
        0x24 => op("LBCC", Relative16),
        0x25 => op("LBCS", Relative16),
        0x26 => op("LBNE", Relative16),
        0x27 => op("LBEQ", Relative16),
        0x28 => op("LBVC", Relative16),
        0x29 => op("LBVS", Relative16),
        0x2A => op("LBPL", Relative16),
        0x2B => op("LBMI", Relative16),
        0x2C => op("LBGE", Relative16),
        0x2D => op("LBLT", Relative16),
        0x2E => op("LBGT", Relative16),
        0x2F => op("LBLE", Relative16),
        0x3F => op("SWI2", Inherent),

        0x83 => op("CMPD", Immediate16),
        0x93 => op("CMPD", Direct),
        0xA3 => op("CMPD", Indexed),
        0xB3 => op("CMPD", Extended),

        0x8C => op("CMPY", Immediate16),
        0x9C => op("CMPY", Direct),
        0xAC => op("CMPY", Indexed),
        0xBC => op("CMPY", Extended),

        0x8E => op("LDY", Immediate16),
        0x9E => op("LDY", Direct),
        0xAE => op("LDY", Indexed),
        0xBE => op("LDY", Extended),

        0x9F => op("STY", Direct),
        0xAF => op("STY", Indexed),
        0xBF => op("STY", Extended),

        0xCE => op("LDS", Immediate16),
        0xDE => op("LDS", Direct),
        0xEE => op("LDS", Indexed),
        0xFE => op("LDS", Extended),

        0xDF => op("STS", Direct),
        0xEF => op("STS", Indexed),
        0xFF => op("STS", Extended),

        _ => None,
    }
}

const fn lookup_page11(opcode: u8) -> Option<OpInfo> {
    use AddressingMode::{Direct, Extended, Immediate16, Indexed, Inherent};
    match opcode {
        0x3F => op("SWI3", Inherent),

        0x83 => op("CMPU", Immediate16),
        0x93 => op("CMPU", Direct),
        0xA3 => op("CMPU", Indexed),
        0xB3 => op("CMPU", Extended),

        0x8C => op("CMPS", Immediate16),
        0x9C => op("CMPS", Direct),
        0xAC => op("CMPS", Indexed),
        0xBC => op("CMPS", Extended),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{lookup_op, AddressingMode, Page};
    use crate::timing::base_cycles;

    #[rstest]
    #[case(Page::P0, 0x86, "LDA", AddressingMode::Immediate8)]
    #[case(Page::P0, 0xB7, "STA", AddressingMode::Extended)]
    #[case(Page::P0, 0x8D, "BSR", AddressingMode::Relative8)]
    #[case(Page::P0, 0xAD, "JSR", AddressingMode::Indexed)]
    #[case(Page::P0, 0x3B, "RTI", AddressingMode::Inherent)]
    #[case(Page::P10, 0x8E, "LDY", AddressingMode::Immediate16)]
    #[case(Page::P10, 0x26, "LBNE", AddressingMode::Relative16)]
    #[case(Page::P11, 0x8C, "CMPS", AddressingMode::Immediate16)]
    fn classifies_representative_opcodes(
        #[case] page: Page,
        #[case] opcode: u8,
        #[case] mnemonic: &str,
        #[case] mode: AddressingMode,
    ) {
        let info = lookup_op(page, opcode).expect("legal opcode");
        assert_eq!(info.mnemonic, mnemonic);
        assert_eq!(info.mode, mode);
    }

    #[rstest]
    #[case(Page::P0, 0x01)]
    #[case(Page::P0, 0x38)]
    #[case(Page::P0, 0x3E)]
    #[case(Page::P0, 0x87)]
    #[case(Page::P0, 0xCD)]
    #[case(Page::P10, 0x20)]
    #[case(Page::P11, 0x00)]
    fn rejects_reserved_encodings(#[case] page: Page, #[case] opcode: u8) {
        assert!(lookup_op(page, opcode).is_none());
    }

    #[test]
    fn classification_agrees_with_cycle_table() {
        for page in [Page::P0, Page::P10, Page::P11] {
            for opcode in 0..=255u8 {
                // 0x10/0x11 on page 0 are prefixes, present in neither table.
                if page == Page::P0 && (opcode == 0x10 || opcode == 0x11) {
                    assert!(lookup_op(page, opcode).is_none());
                    continue;
                }
                let classified = lookup_op(page, opcode).is_some();
                let costed = base_cycles(page, opcode) != 0;
                assert_eq!(
                    classified, costed,
                    "page {page:?} opcode {opcode:#04x} disagrees between tables"
                );
            }
        }
    }

    #[test]
    fn minimum_operand_bytes_follow_the_mode() {
        assert_eq!(AddressingMode::Inherent.min_operand_bytes(), 0);
        assert_eq!(AddressingMode::Immediate8.min_operand_bytes(), 1);
        assert_eq!(AddressingMode::Indexed.min_operand_bytes(), 1);
        assert_eq!(AddressingMode::Extended.min_operand_bytes(), 2);
        assert_eq!(AddressingMode::Relative16.min_operand_bytes(), 2);
    }
}
