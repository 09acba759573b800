//! Memory bus dispatch and the fixed platform address map.

mod bus;
mod map;

pub use bus::{Bus, BusStats, Device, UnmappedPolicy, UNMAPPED_FILL};
pub use map::{
    BIOS_END, BIOS_START, CARTRIDGE_END, CARTRIDGE_START, RAM_END, RAM_START, VIA_END, VIA_START,
};
