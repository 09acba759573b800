//! Call-stack reconstruction over the public stepping contract.
//!
//! The tracer never touches CPU internals: it peeks the next opcode with
//! side-effect-free reads before a step and compares register state after
//! it. Direct, extended, and relative calls are recognized from the
//! opcode bytes alone; indexed calls are recognized from the stack-pointer
//! delta, since their target depends on index-register state.

use crate::api::Machine;

/// One reconstructed call: where the subroutine starts and where it will
/// return to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallFrame {
    /// First address of the called subroutine.
    pub target: u16,
    /// Address execution resumes at after the matching return.
    pub return_addr: u16,
}

/// Tracer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TraceStatus {
    /// Frames may still be open or yet to be captured.
    Tracking,
    /// A return drained the last captured frame.
    Drained,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    opcode: u8,
    pc: u16,
    s: u16,
    dp: u8,
}

/// Reconstructs the call stack of a running machine.
///
/// Drivers call [`Self::pre_step`] immediately before each
/// `Machine::step` and [`Self::post_step`] immediately after it.
#[derive(Debug, Default)]
pub struct CallStackTracer {
    frames: Vec<CallFrame>,
    pending: Option<Pending>,
    captured_any: bool,
}

impl CallStackTracer {
    /// Empty tracer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames: Vec::new(),
            pending: None,
            captured_any: false,
        }
    }

    /// Snapshots the machine before the next instruction executes.
    pub fn pre_step(&mut self, machine: &Machine) {
        let regs = machine.registers();
        self.pending = Some(Pending {
            opcode: machine.read_raw(regs.pc),
            pc: regs.pc,
            s: regs.s,
            dp: regs.dp,
        });
    }

    /// Inspects the machine after the instruction executed and updates
    /// the captured stack.
    pub fn post_step(&mut self, machine: &Machine) -> TraceStatus {
        let Some(before) = self.pending.take() else {
            return self.status();
        };
        let regs = machine.registers();

        match before.opcode {
            // BSR: relative target, two operand-less return bytes.
            0x8D => {
                let offset = machine.read_raw(before.pc.wrapping_add(1)) as i8;
                let return_addr = before.pc.wrapping_add(2);
                self.push_frame(return_addr.wrapping_add(offset as u16), return_addr);
            }
            // LBSR.
            0x17 => {
                let offset = machine
                    .bus()
                    .read16_raw(before.pc.wrapping_add(1));
                let return_addr = before.pc.wrapping_add(3);
                self.push_frame(return_addr.wrapping_add(offset), return_addr);
            }
            // JSR direct: target assembled from the direct page.
            0x9D => {
                let low = machine.read_raw(before.pc.wrapping_add(1));
                let target = u16::from(before.dp) << 8 | u16::from(low);
                self.push_frame(target, before.pc.wrapping_add(2));
            }
            // JSR extended.
            0xBD => {
                let target = machine.bus().read16_raw(before.pc.wrapping_add(1));
                self.push_frame(target, before.pc.wrapping_add(3));
            }
            // JSR indexed: the target depends on index-register state, so
            // it is read back from where the instruction landed, and the
            // return address from what it pushed.
            0xAD => {
                if before.s.wrapping_sub(regs.s) == 2 {
                    let return_addr = machine.bus().read16_raw(regs.s);
                    self.push_frame(regs.pc, return_addr);
                }
            }
            // RTS: pop on a return-address match.
            0x39 => {
                if self.frames.last().map(|f| f.return_addr) == Some(regs.pc) {
                    self.frames.pop();
                }
            }
            _ => {}
        }
        self.status()
    }

    fn push_frame(&mut self, target: u16, return_addr: u16) {
        self.captured_any = true;
        self.frames.push(CallFrame {
            target,
            return_addr,
        });
    }

    /// Currently open frames, outermost first.
    #[must_use]
    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    /// Open-frame count.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.frames.len()
    }

    /// [`TraceStatus::Drained`] once at least one frame was captured and
    /// all captured frames have returned.
    #[must_use]
    pub fn status(&self) -> TraceStatus {
        if self.captured_any && self.frames.is_empty() {
            TraceStatus::Drained
        } else {
            TraceStatus::Tracking
        }
    }
}
