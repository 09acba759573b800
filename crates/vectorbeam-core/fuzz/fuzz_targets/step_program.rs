#![no_main]

use libfuzzer_sys::fuzz_target;
use vectorbeam_core::{
    disassemble, FrameContext, Machine, MachineConfig, UnmappedPolicy, BIOS_START, RESET_VECTOR,
};

// Arbitrary bytes become a BIOS image executed from the reset vector.
// Undecodable bytes must surface as errors, never as panics, and the
// disassembler must agree with the executor about where instructions end.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > 0x1F00 {
        return;
    }

    let mut bios = vec![0u8; 0x2000];
    bios[..data.len()].copy_from_slice(data);
    let vector = usize::from(RESET_VECTOR - BIOS_START);
    bios[vector] = (BIOS_START >> 8) as u8;
    bios[vector + 1] = (BIOS_START & 0xFF) as u8;

    let mut machine = match Machine::new(MachineConfig {
        unmapped_policy: UnmappedPolicy::Ignore,
        ..MachineConfig::default()
    }) {
        Ok(machine) => machine,
        Err(_) => return,
    };
    if machine.load_bios(&bios).is_err() {
        return;
    }
    machine.set_frame_context(FrameContext::new(100.0));
    machine.reset();

    for _ in 0..256 {
        let _ = disassemble(machine.bus(), machine.registers().pc);
        if machine.step().is_err() {
            break;
        }
    }
});
