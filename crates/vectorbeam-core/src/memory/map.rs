//! Fixed platform address map.
//!
//! Cartridge ROM sits at the bottom of the address space, system RAM and
//! the VIA in the upper third, and the BIOS ROM at the top so the
//! interrupt vectors land at `0xFFF2..=0xFFFF`.

/// First cartridge ROM address.
pub const CARTRIDGE_START: u16 = 0x0000;
/// Last cartridge ROM address.
pub const CARTRIDGE_END: u16 = 0x7FFF;

/// First system RAM address.
pub const RAM_START: u16 = 0xC800;
/// Last system RAM address.
pub const RAM_END: u16 = 0xCFFF;

/// First VIA register address. Registers mirror every 16 bytes across the
/// range.
pub const VIA_START: u16 = 0xD000;
/// Last VIA register address.
pub const VIA_END: u16 = 0xD7FF;

/// First BIOS ROM address.
pub const BIOS_START: u16 = 0xE000;
/// Last BIOS ROM address; the reset vector lives at `0xFFFE`.
pub const BIOS_END: u16 = 0xFFFF;

const fn regions_are_ordered_and_disjoint() -> bool {
    CARTRIDGE_START <= CARTRIDGE_END
        && CARTRIDGE_END < RAM_START
        && RAM_START <= RAM_END
        && RAM_END < VIA_START
        && VIA_START <= VIA_END
        && VIA_END < BIOS_START
        && BIOS_START <= BIOS_END
}

const _: () = assert!(regions_are_ordered_and_disjoint());

#[cfg(test)]
mod tests {
    use super::{BIOS_END, BIOS_START, RAM_END, RAM_START, VIA_END, VIA_START};
    use crate::state::RESET_VECTOR;

    #[test]
    fn vectors_fall_inside_bios() {
        assert!(RESET_VECTOR >= BIOS_START);
        assert!(RESET_VECTOR < BIOS_END);
    }

    #[test]
    fn region_sizes_match_hardware() {
        assert_eq!(usize::from(RAM_END - RAM_START) + 1, 0x800);
        assert_eq!(usize::from(VIA_END - VIA_START) + 1, 0x800);
        assert_eq!(usize::from(BIOS_END - BIOS_START) + 1, 0x2000);
    }
}
