//! The 6522-class interface adapter and the analog hardware behind it.
//!
//! [`Via`] owns the register file plus the four components it fans out
//! to: two interval timers, the pattern shift register, the beam model
//! and the sound generator. The bus hands it register offsets; the
//! machine drives [`Via::sync`] once per executed instruction.

mod beam;
mod psg;
mod shift;
mod timers;
mod via;

pub use beam::{Beam, RampPhase};
pub use psg::Psg;
pub use shift::{ShiftRegister, ShiftRegisterMode};
pub use timers::{Timer1, Timer2};
pub use via::Via;
