//! Architectural CPU state: registers, condition codes, vectors.

mod registers;
pub use registers::{
    ConditionCodes, CpuRegisters, CC_CARRY, CC_ENTIRE, CC_FAST_INTERRUPT_MASK, CC_HALF_CARRY,
    CC_INTERRUPT_MASK, CC_NEGATIVE, CC_OVERFLOW, CC_ZERO, FIRQ_VECTOR, IRQ_VECTOR, NMI_VECTOR,
    RESET_VECTOR, SWI2_VECTOR, SWI3_VECTOR, SWI_VECTOR,
};
