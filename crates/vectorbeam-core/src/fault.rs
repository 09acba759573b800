//! Fault taxonomy for the emulator core.
//!
//! Three classes cover everything the core can surface: decode failures
//! (fatal to the current run), bus faults (raised only under the `Fatal`
//! unmapped-access policy), and configuration errors (detected at setup,
//! never mid-run).

use thiserror::Error;

/// Broad classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Illegal or unimplemented instruction encoding.
    Decode,
    /// Unmapped bus access under the fatal policy.
    Bus,
    /// Invalid wiring or setup detected before stepping.
    Config,
}

/// Errors surfaced by the emulator core.
///
/// Decode and bus errors unwind out of `step` as distinguishable values;
/// configuration errors are returned from setup calls and never occur
/// mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Opcode byte at `pc` does not decode to any implemented instruction.
    #[error("illegal opcode {opcode:#04x} at {pc:#06x}")]
    IllegalOpcode {
        /// Address of the faulting opcode byte (after any page prefix).
        pc: u16,
        /// The opcode byte that failed to decode.
        opcode: u8,
    },
    /// Indexed addressing postbyte selects a reserved form.
    #[error("illegal indexed postbyte {postbyte:#04x} at {pc:#06x}")]
    IllegalIndexedPostbyte {
        /// Address of the instruction that consumed the postbyte.
        pc: u16,
        /// The reserved postbyte value.
        postbyte: u8,
    },
    /// Read from an address with no mapped device under the fatal policy.
    #[error("unmapped read at {addr:#06x}")]
    UnmappedRead {
        /// The unmapped address.
        addr: u16,
    },
    /// Write to an address with no mapped device under the fatal policy.
    #[error("unmapped write at {addr:#06x}")]
    UnmappedWrite {
        /// The unmapped address.
        addr: u16,
    },
    /// Device registration would overlap an existing mapping.
    #[error("device range {start:#06x}..={end:#06x} overlaps an existing mapping")]
    OverlappingRange {
        /// First address of the rejected range.
        start: u16,
        /// Last address of the rejected range.
        end: u16,
    },
    /// ROM image does not fit the region it is being loaded into.
    #[error("image of {len} bytes does not fit region of {capacity} bytes")]
    ImageTooLarge {
        /// Length of the rejected image.
        len: usize,
        /// Capacity of the target region.
        capacity: usize,
    },
    /// `Sync` was attempted before the frame context was wired.
    #[error("frame context must be wired before stepping")]
    FrameContextNotWired,
}

impl CoreError {
    /// Returns the broad class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::IllegalOpcode { .. } | Self::IllegalIndexedPostbyte { .. } => ErrorClass::Decode,
            Self::UnmappedRead { .. } | Self::UnmappedWrite { .. } => ErrorClass::Bus,
            Self::OverlappingRange { .. }
            | Self::ImageTooLarge { .. }
            | Self::FrameContextNotWired => ErrorClass::Config,
        }
    }

    /// Returns true when the error terminates the current run.
    ///
    /// Every surfaced error is terminal; recoverable conditions (the
    /// `Ignore` and `LogOnce` unmapped policies) are absorbed inside the
    /// bus and never materialize as a `CoreError`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        true
    }
}
