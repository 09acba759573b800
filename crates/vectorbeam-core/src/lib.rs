//! Core emulator crate for the Vectorbeam vector console.
//!
//! Emulates a 6809-class CPU, a 6522-class VIA peripheral, and the memory
//! bus that connects them. Drivers step the [`Machine`] and consume the
//! vector segments and audio samples its peripheral emits per frame.

/// Memory bus, device set, and fixed platform address map.
pub mod memory;
pub use memory::{
    Bus, BusStats, Device, UnmappedPolicy, BIOS_END, BIOS_START, CARTRIDGE_END, CARTRIDGE_START,
    RAM_END, RAM_START, UNMAPPED_FILL, VIA_END, VIA_START,
};

/// Fault taxonomy for decode, bus, and configuration errors.
pub mod fault;
pub use fault::{CoreError, ErrorClass};

/// Architectural CPU register state and condition-code packing.
pub mod state;
pub use state::{
    ConditionCodes, CpuRegisters, CC_CARRY, CC_ENTIRE, CC_FAST_INTERRUPT_MASK, CC_HALF_CARRY,
    CC_INTERRUPT_MASK, CC_NEGATIVE, CC_OVERFLOW, CC_ZERO, FIRQ_VECTOR, IRQ_VECTOR, NMI_VECTOR,
    RESET_VECTOR, SWI2_VECTOR, SWI3_VECTOR, SWI_VECTOR,
};

/// Opcode classification: addressing modes, mnemonics, lengths.
pub mod decoder;
pub use decoder::{lookup_op, AddressingMode, OpInfo, Page};

/// Documented 6809 cycle-cost tables and interrupt entry costs.
pub mod timing;
pub use timing::{
    base_cycles, FIRQ_ENTRY_CYCLES, IRQ_ENTRY_CYCLES, NMI_ENTRY_CYCLES, RESET_CYCLES,
};

/// Fetch-decode-execute engine.
pub mod execute;
pub use execute::Cpu;

/// VIA peripheral: ports, timers, shift register, beam, sound generator.
pub mod peripherals;
pub use peripherals::{Beam, Psg, RampPhase, ShiftRegister, ShiftRegisterMode, Timer1, Timer2, Via};

/// Host-facing frame context: input snapshot, render and audio sinks.
pub mod frame;
pub use frame::{AudioContext, FrameContext, Input, RenderContext, Segment};

/// Emulator instance: construction, image loading, reset, stepping.
pub mod api;
pub use api::{Machine, MachineConfig, StepOutcome, DEFAULT_CYCLES_PER_AUDIO_SAMPLE};

/// Call-stack reconstruction over the public stepping contract.
pub mod diag;
pub use diag::{CallFrame, CallStackTracer, TraceStatus};

/// Table-driven one-line disassembly.
pub mod disasm;
pub use disasm::disassemble;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
