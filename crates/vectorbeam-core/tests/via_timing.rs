//! Peripheral timing observed through the memory-mapped interface.

use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use vectorbeam_core::{
    FrameContext, Machine, MachineConfig, UnmappedPolicy, BIOS_START, RESET_VECTOR, VIA_START,
};

const IFR: u16 = VIA_START + 0x0D;
const T1_FLAG: u8 = 0x40;
const MASTER: u8 = 0x80;

fn booted(body: &[u8]) -> Machine {
    let mut bios = vec![0u8; 0x2000];
    bios[..body.len()].copy_from_slice(body);
    let vector = usize::from(RESET_VECTOR - BIOS_START);
    bios[vector] = (BIOS_START >> 8) as u8;
    bios[vector + 1] = (BIOS_START & 0xFF) as u8;
    let mut machine = Machine::new(MachineConfig {
        unmapped_policy: UnmappedPolicy::Fatal,
        ..MachineConfig::default()
    })
    .expect("fixed map");
    machine.load_bios(&bios).expect("bios fits");
    machine.set_frame_context(FrameContext::new(0.0));
    machine.reset();
    machine
}

/// Loading timer 1 with `N` raises its flag on the sync consuming the
/// `N`th cumulative cycle after the load, not before.
#[test]
fn timer1_flag_is_pinned_to_the_nth_cycle() {
    // Counter = 20. The starting store costs 5 cycles, all synced after
    // the write lands, then NOPs tick 2 cycles each: the flag must appear
    // on the NOP that crosses cycle 20 and on no earlier one.
    let mut machine = booted(&[
        0x86, 0x14, // LDA #$14
        0xB7, 0xD0, 0x04, // STA $D004 (latch low)
        0x86, 0x00, // LDA #$00
        0xB7, 0xD0, 0x05, // STA $D005 (transfer, start)
        // 32 NOPs of runway.
        0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12,
        0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12,
        0x12, 0x12, 0x12, 0x12,
    ]);
    for _ in 0..4 {
        machine.step().expect("setup");
    }
    // 5 of the 20 cycles elapsed with the starting store itself.
    let mut since_load = 5u32;
    while machine.read_raw(IFR) & T1_FLAG == 0 {
        since_load += u32::from(machine.step().expect("nop").cycles);
        assert!(since_load <= 21, "flag overdue");
    }
    assert_eq!(since_load, 21); // First NOP boundary at or past cycle 20
}

/// The master bit follows `(IFR & IER) != 0`, so the same flag pattern
/// asserts IRQ only once the enable bit is set.
#[test]
fn master_bit_requires_the_enable_mask() {
    let mut machine = booted(&[
        0x86, 0x02, // LDA #$02
        0xB7, 0xD0, 0x04, // STA $D004
        0x86, 0x00, // LDA #$00
        0xB7, 0xD0, 0x05, // STA $D005 (counter = 2, expires in the store)
        0x12, // NOP
        0x86, 0xC0, // LDA #$C0
        0xB7, 0xD0, 0x0E, // STA $D00E (enable T1)
        0x20, 0xFE, // BRA *
    ]);
    for _ in 0..5 {
        machine.step().expect("setup");
    }
    assert_ne!(machine.read_raw(IFR) & T1_FLAG, 0);
    assert_eq!(machine.read_raw(IFR) & MASTER, 0);
    assert!(!machine.via().expect("via mapped").irq_asserted());

    machine.step().expect("lda");
    machine.step().expect("ier write");
    assert_ne!(machine.read_raw(IFR) & MASTER, 0);
    assert!(machine.via().expect("via mapped").irq_asserted());
}

/// One-shot timer 1 stays expired; free-running reloads and raises the
/// flag again after acknowledgment.
#[test]
fn free_run_reloads_where_one_shot_saturates() {
    // ACR bit 6 on, counter = 4, then spin on NOPs.
    let mut machine = booted(&[
        0x86, 0x40, // LDA #$40
        0xB7, 0xD0, 0x0B, // STA $D00B (ACR free-run)
        0x86, 0x04, // LDA #$04
        0xB7, 0xD0, 0x04, // STA $D004
        0x86, 0x00, // LDA #$00
        0xB7, 0xD0, 0x05, // STA $D005
        0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12, 0x12,
    ]);
    for _ in 0..6 {
        machine.step().expect("setup");
    }
    assert_ne!(machine.read_raw(IFR) & T1_FLAG, 0);

    // Acknowledge, then wait out another reload period.
    machine
        .via_mut()
        .expect("via mapped")
        .write(0x0D, T1_FLAG);
    assert_eq!(machine.read_raw(IFR) & T1_FLAG, 0);
    for _ in 0..4 {
        machine.step().expect("nop");
    }
    assert_ne!(machine.read_raw(IFR) & T1_FLAG, 0, "free-run must re-expire");
}

/// The shift register completes its 18 half-cycle sequence and raises
/// the shift flag; an all-ones pattern keeps CB2 high so the beam is not
/// blanked while it runs.
#[test]
fn shift_register_flags_after_its_sequence() {
    let mut machine = booted(&[
        0x86, 0x18, // LDA #$18 (ACR shift mode 110)
        0xB7, 0xD0, 0x0B, // STA $D00B
        0x86, 0xFF, // LDA #$FF
        0xB7, 0xD0, 0x0A, // STA $D00A (load shift register)
        0x12, 0x12, 0x12, 0x12, 0x12, 0x12, // 12 cycles of runway
    ]);
    for _ in 0..4 {
        machine.step().expect("setup");
    }
    const SHIFT_FLAG: u8 = 0x04;
    // The load itself consumed 2 of the 18 half-cycles during its store.
    let mut waited = 0u32;
    while machine.read_raw(IFR) & SHIFT_FLAG == 0 {
        waited += u32::from(machine.step().expect("nop").cycles);
        assert!(waited <= 18, "shift sequence overdue");
    }
    assert_ne!(machine.read_raw(IFR) & SHIFT_FLAG, 0);
}

/// Audio samples accumulate at the configured cycles-per-sample ratio
/// while the machine runs.
#[test]
fn audio_cadence_follows_the_config() {
    let mut bios = vec![0u8; 0x2000];
    bios[0] = 0x20; // BRA *
    bios[1] = 0xFE;
    let vector = usize::from(RESET_VECTOR - BIOS_START);
    bios[vector] = (BIOS_START >> 8) as u8;
    bios[vector + 1] = (BIOS_START & 0xFF) as u8;
    let mut machine = Machine::new(MachineConfig {
        unmapped_policy: UnmappedPolicy::Fatal,
        cycles_per_audio_sample: 10.0,
    })
    .expect("fixed map");
    machine.load_bios(&bios).expect("bios fits");
    let frame = machine.default_frame_context();
    machine.set_frame_context(frame);
    machine.reset();

    let elapsed = machine.run(200).expect("spin");
    let samples = machine
        .frame_context()
        .expect("wired")
        .audio
        .samples
        .len();
    assert_eq!(samples as u64, elapsed / 10);
}
