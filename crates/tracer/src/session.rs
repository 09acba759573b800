//! Trace session: boots a BIOS image, steps it, and captures the call
//! stack through the core's diagnostic contract.

use std::fmt::Write as _;

use vectorbeam_core::{
    disassemble, CallFrame, CallStackTracer, CoreError, Machine, MachineConfig, TraceStatus,
    UnmappedPolicy,
};

use crate::labels::bios_label;

/// Session limits and bus policy.
#[derive(Debug, Clone, Copy)]
pub struct TraceConfig {
    /// Maximum instruction steps before giving up.
    pub step_limit: u64,
    /// Number of leading instructions to disassemble into the report.
    pub trace_instructions: u64,
    /// Bus policy for accesses outside the mapped regions.
    pub policy: UnmappedPolicy,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            step_limit: 100_000,
            trace_instructions: 0,
            policy: UnmappedPolicy::LogOnce,
        }
    }
}

/// Why the session stopped stepping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The captured call stack drained back to empty.
    Drained,
    /// The step limit ran out first.
    StepLimit,
    /// The core faulted.
    Fault(CoreError),
}

/// Everything a session captured.
#[derive(Debug)]
pub struct TraceReport {
    /// Instructions stepped.
    pub steps: u64,
    /// Cycles consumed.
    pub cycles: u64,
    /// Leading disassembled instructions, one line each.
    pub instruction_trace: Vec<String>,
    /// The deepest call stack observed, outermost first.
    pub deepest_frames: Vec<CallFrame>,
    /// Unmapped addresses the bus recorded, if any.
    pub unmapped_addresses: Vec<u16>,
    /// Why stepping stopped.
    pub stop: StopReason,
}

/// Boots `image` as the BIOS and traces it until the call stack drains
/// or a limit is hit.
///
/// # Errors
///
/// Returns the construction or image-loading fault; runtime faults are
/// reported through [`StopReason::Fault`] instead.
pub fn trace_bios(image: &[u8], config: &TraceConfig) -> Result<TraceReport, CoreError> {
    let mut machine = Machine::new(MachineConfig {
        unmapped_policy: config.policy,
        ..MachineConfig::default()
    })?;
    machine.load_bios(image)?;
    let frame = machine.default_frame_context();
    machine.set_frame_context(frame);
    machine.reset();

    let mut tracer = CallStackTracer::new();
    let mut report = TraceReport {
        steps: 0,
        cycles: 0,
        instruction_trace: Vec::new(),
        deepest_frames: Vec::new(),
        unmapped_addresses: Vec::new(),
        stop: StopReason::StepLimit,
    };

    while report.steps < config.step_limit {
        if report.steps < config.trace_instructions {
            let pc = machine.registers().pc;
            let (text, _) = disassemble(machine.bus(), pc);
            report.instruction_trace.push(format!("{pc:04X}: {text}"));
        }

        tracer.pre_step(&machine);
        match machine.step() {
            Ok(outcome) => report.cycles += u64::from(outcome.cycles),
            Err(fault) => {
                report.stop = StopReason::Fault(fault);
                break;
            }
        }
        report.steps += 1;

        let status = tracer.post_step(&machine);
        if tracer.depth() > report.deepest_frames.len() {
            report.deepest_frames = tracer.frames().to_vec();
        }
        if status == TraceStatus::Drained {
            report.stop = StopReason::Drained;
            break;
        }
    }

    report.unmapped_addresses = machine.bus().stats().logged_addresses.clone();
    Ok(report)
}

/// Renders the captured frame table with known BIOS routine names.
#[must_use]
pub fn render_frame_table(frames: &[CallFrame]) -> String {
    let mut out = String::new();
    for (depth, frame) in frames.iter().enumerate() {
        let _ = write!(out, "#{depth} {:04X}", frame.target);
        if let Some(name) = bios_label(frame.target) {
            let _ = write!(out, " {name}");
        }
        let _ = writeln!(out, " (returns to {:04X})", frame.return_addr);
    }
    out
}

#[cfg(test)]
mod tests {
    use vectorbeam_core::{BIOS_START, RESET_VECTOR};

    use super::{render_frame_table, trace_bios, StopReason, TraceConfig};

    /// BIOS image that sets up a stack, calls a routine at the
    /// `Wait_Recal` address, and spins after it returns.
    fn synthetic_bios() -> Vec<u8> {
        let mut bios = vec![0u8; 0x2000];
        let body = [
            0x10, 0xCE, 0xCF, 0xFF, // LDS #$CFFF
            0xBD, 0xF1, 0x92, // JSR $F192
            0x20, 0xFE, // BRA *
        ];
        bios[..body.len()].copy_from_slice(&body);
        bios[usize::from(0xF192 - BIOS_START)] = 0x39; // RTS
        let vector = usize::from(RESET_VECTOR - BIOS_START);
        bios[vector] = (BIOS_START >> 8) as u8;
        bios[vector + 1] = (BIOS_START & 0xFF) as u8;
        bios
    }

    #[test]
    fn session_drains_and_labels_the_frame() {
        let report = trace_bios(&synthetic_bios(), &TraceConfig::default()).expect("image loads");
        assert_eq!(report.stop, StopReason::Drained);
        assert_eq!(report.deepest_frames.len(), 1);
        assert_eq!(report.deepest_frames[0].target, 0xF192);

        let table = render_frame_table(&report.deepest_frames);
        assert!(table.contains("Wait_Recal"), "missing label in {table}");
        assert!(table.contains("F192"));
    }

    #[test]
    fn instruction_trace_captures_leading_lines() {
        let config = TraceConfig {
            trace_instructions: 2,
            ..TraceConfig::default()
        };
        let report = trace_bios(&synthetic_bios(), &config).expect("image loads");
        assert_eq!(report.instruction_trace.len(), 2);
        assert!(report.instruction_trace[0].starts_with("E000: LDS"));
        assert!(report.instruction_trace[1].starts_with("E004: JSR"));
    }

    #[test]
    fn step_limit_stops_a_busy_image() {
        let config = TraceConfig {
            step_limit: 10,
            ..TraceConfig::default()
        };
        let bios = synthetic_bios();
        // Truncated image boots through a zeroed vector and never calls.
        let report = trace_bios(&bios[..0x200], &config).expect("image loads");
        assert_eq!(report.stop, StopReason::StepLimit);
        assert_eq!(report.steps, 10);
    }
}
