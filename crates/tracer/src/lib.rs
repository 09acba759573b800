//! Vectorbeam BIOS call-stack tracer library.

/// Known BIOS routine entry points.
pub mod labels;
/// Trace session: stepping, capture, and report rendering.
pub mod session;

#[cfg(test)]
use tempfile as _;
