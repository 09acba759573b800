//! Pattern shift register.
//!
//! Loaded with an 8-bit draw pattern which it rotates out on CB2 at half
//! the CPU clock, so a full pattern takes 18 cycles: nine shift points on
//! the odd half-cycles, with the ninth repeating the bit the eighth left
//! in position 0. Because the value rotates rather than drains, a pattern
//! repeats if left running.

/// Operating mode, decoded from the control register's shift bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShiftRegisterMode {
    /// Register holds its value; CB2 is free for manual blanking.
    #[default]
    Disabled,
    /// Shift out under the system clock; CB2 follows the output bit.
    ShiftOutUnder02,
}

/// The VIA shift register and its CB2 output line.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShiftRegister {
    mode: ShiftRegisterMode,
    value: u8,
    shift_cycles_left: i32,
    cb2_active: bool,
    interrupt_flag: bool,
}

impl ShiftRegister {
    /// Power-on state: disabled, empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the operating mode.
    pub const fn set_mode(&mut self, mode: ShiftRegisterMode) {
        self.mode = mode;
    }

    /// Current operating mode.
    #[must_use]
    pub const fn mode(&self) -> ShiftRegisterMode {
        self.mode
    }

    /// Loads a pattern and restarts the 18-cycle shift sequence. The
    /// load itself consumes the first two cycles.
    pub fn load(&mut self, value: u8) {
        self.value = value;
        self.shift_cycles_left = 18;
        self.interrupt_flag = false;
        self.update(2);
    }

    /// Reads the register, which also restarts the shift sequence and
    /// clears the interrupt flag.
    pub const fn read(&mut self) -> u8 {
        self.shift_cycles_left = 18;
        self.interrupt_flag = false;
        self.value
    }

    /// Current register contents without timing side effects.
    #[must_use]
    pub const fn peek(&self) -> u8 {
        self.value
    }

    /// Whether CB2 currently drives its line active (low).
    #[must_use]
    pub const fn cb2_active(&self) -> bool {
        self.cb2_active
    }

    /// Advances the shift sequence by `cycles` half-steps.
    pub fn update(&mut self, cycles: u16) {
        for _ in 0..cycles {
            if self.shift_cycles_left == 0 {
                continue;
            }
            if self.shift_cycles_left % 2 == 1 {
                if self.shift_cycles_left == 1 {
                    // Ninth shift point repeats the previous output bit,
                    // now sitting in position 0, without rotating.
                    let bit = self.value & 0x01;
                    self.cb2_active = bit == 0;
                } else {
                    let bit = (self.value & 0x80) >> 7;
                    self.cb2_active = bit == 0;
                    self.value = self.value << 1 | bit;
                }
            }
            self.shift_cycles_left -= 1;
            if self.shift_cycles_left == 0 {
                self.interrupt_flag = true;
            }
        }
    }

    /// Forces the interrupt flag; used by the flag-register write path.
    pub const fn set_interrupt_flag(&mut self, enabled: bool) {
        self.interrupt_flag = enabled;
    }

    /// Current interrupt flag.
    #[must_use]
    pub const fn interrupt_flag(&self) -> bool {
        self.interrupt_flag
    }
}
