//! The two 6522 interval timers.
//!
//! Both count down once per CPU cycle and latch an interrupt flag on the
//! cycle their counter reaches zero, so a counter loaded with N raises
//! its flag exactly N cycles after the load. Timer 1 carries a full
//! 16-bit latch pair and can drive the PB7 output; timer 2 has only a
//! low-order latch and always runs one-shot.

/// Timer 1: 16-bit counter, 16-bit latch, optional PB7 output and
/// free-running reload.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timer1 {
    latch_low: u8,
    latch_high: u8,
    counter: u16,
    interrupt_flag: bool,
    free_running: bool,
    pb7_flag: bool,
    pb7_signal_low: bool,
}

impl Timer1 {
    /// Power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write to the counter-low address; only the latch is touched.
    pub const fn write_counter_low(&mut self, value: u8) {
        self.latch_low = value;
    }

    /// Write to the counter-high address: both latches transfer to the
    /// counter, the interrupt flag clears, and the PB7 output (when
    /// enabled) goes low for the duration of the count.
    pub const fn write_counter_high(&mut self, value: u8) {
        self.latch_high = value;
        self.counter = (self.latch_high as u16) << 8 | self.latch_low as u16;
        self.interrupt_flag = false;
        if self.pb7_flag {
            self.pb7_signal_low = true;
        }
    }

    /// Read of the counter-low address; clears the interrupt flag.
    pub const fn read_counter_low(&mut self) -> u8 {
        self.interrupt_flag = false;
        (self.counter & 0xFF) as u8
    }

    /// Counter low byte without the flag-clearing side effect.
    #[must_use]
    pub const fn peek_counter_low(&self) -> u8 {
        (self.counter & 0xFF) as u8
    }

    /// Read of the counter-high address.
    #[must_use]
    pub const fn read_counter_high(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    /// Write to the latch-low address.
    pub const fn write_latch_low(&mut self, value: u8) {
        self.latch_low = value;
    }

    /// Write to the latch-high address; does not reload the counter.
    pub const fn write_latch_high(&mut self, value: u8) {
        self.latch_high = value;
    }

    /// Read of the latch-low address.
    #[must_use]
    pub const fn read_latch_low(&self) -> u8 {
        self.latch_low
    }

    /// Read of the latch-high address.
    #[must_use]
    pub const fn read_latch_high(&self) -> u8 {
        self.latch_high
    }

    const fn latch(&self) -> u16 {
        (self.latch_high as u16) << 8 | self.latch_low as u16
    }

    /// Advances the countdown by `cycles`.
    ///
    /// In one-shot mode an expired counter saturates at zero and the PB7
    /// output returns high. In free-running mode the counter reloads
    /// from the latch pair and the PB7 output toggles on each expiry.
    pub fn update(&mut self, cycles: u16) {
        let expired = cycles >= self.counter;
        self.counter = self.counter.saturating_sub(cycles);
        if expired {
            self.interrupt_flag = true;
            if self.free_running {
                self.counter = self.latch();
                if self.pb7_flag {
                    self.pb7_signal_low = !self.pb7_signal_low;
                }
            } else if self.pb7_flag {
                self.pb7_signal_low = false;
            }
        }
    }

    /// Enables or disables free-running reload (control register bit 6).
    pub const fn set_free_running(&mut self, enabled: bool) {
        self.free_running = enabled;
    }

    /// Whether free-running reload is enabled.
    #[must_use]
    pub const fn free_running(&self) -> bool {
        self.free_running
    }

    /// Enables or disables the PB7 output (control register bit 7).
    pub const fn set_pb7_flag(&mut self, enabled: bool) {
        self.pb7_flag = enabled;
    }

    /// Whether the PB7 output is enabled.
    #[must_use]
    pub const fn pb7_flag(&self) -> bool {
        self.pb7_flag
    }

    /// Whether the PB7 output currently drives its line low.
    #[must_use]
    pub const fn pb7_signal_low(&self) -> bool {
        self.pb7_signal_low
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

/// Timer 2: 16-bit counter with a low-order latch only, always one-shot.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timer2 {
    latch_low: u8,
    counter: u16,
    interrupt_flag: bool,
}

impl Timer2 {
    /// Power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write to the counter-low address; only the latch is touched.
    pub const fn write_counter_low(&mut self, value: u8) {
        self.latch_low = value;
    }

    /// Write to the counter-high address: the written byte and the low
    /// latch transfer to the counter and the interrupt flag clears.
    pub const fn write_counter_high(&mut self, value: u8) {
        self.counter = (value as u16) << 8 | self.latch_low as u16;
        self.interrupt_flag = false;
    }

    /// Read of the counter-low address; clears the interrupt flag.
    pub const fn read_counter_low(&mut self) -> u8 {
        self.interrupt_flag = false;
        (self.counter & 0xFF) as u8
    }

    /// Counter low byte without the flag-clearing side effect.
    #[must_use]
    pub const fn peek_counter_low(&self) -> u8 {
        (self.counter & 0xFF) as u8
    }

    /// Read of the counter-high address.
    #[must_use]
    pub const fn read_counter_high(&self) -> u8 {
        (self.counter >> 8) as u8
    }

    /// Advances the countdown by `cycles`; an expired counter saturates
    /// at zero.
    pub fn update(&mut self, cycles: u16) {
        let expired = cycles >= self.counter;
        self.counter = self.counter.saturating_sub(cycles);
        if expired {
            self.interrupt_flag = true;
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

#[cfg(test)]
mod tests {
    use super::{Timer1, Timer2};

    fn loaded_timer1(count: u16) -> Timer1 {
        let mut t1 = Timer1::new();
        t1.write_counter_low((count & 0xFF) as u8);
        t1.write_counter_high((count >> 8) as u8);
        t1
    }

    #[test]
    fn timer1_flag_raises_at_exactly_n_cycles() {
        let mut t1 = loaded_timer1(10);
        for _ in 0..9 {
            t1.update(1);
            assert!(!t1.interrupt_flag());
        }
        t1.update(1);
        assert!(t1.interrupt_flag());
    }

    #[test]
    fn timer1_counter_low_write_only_touches_the_latch() {
        let mut t1 = loaded_timer1(0x0200);
        t1.update(1);
        t1.write_counter_low(0x34);
        assert_eq!(t1.read_counter_high(), 0x01);
        t1.write_counter_high(0x12);
        assert_eq!(t1.read_counter_high(), 0x12);
        assert_eq!(t1.read_counter_low(), 0x34);
    }

    #[test]
    fn timer1_counter_low_read_clears_the_flag() {
        let mut t1 = loaded_timer1(1);
        t1.update(1);
        assert!(t1.interrupt_flag());
        let _ = t1.read_counter_low();
        assert!(!t1.interrupt_flag());
    }

    #[test]
    fn timer1_pb7_goes_low_on_load_and_high_on_expiry() {
        let mut t1 = Timer1::new();
        t1.set_pb7_flag(true);
        t1.write_counter_low(3);
        t1.write_counter_high(0);
        assert!(t1.pb7_signal_low());
        t1.update(2);
        assert!(t1.pb7_signal_low());
        t1.update(1);
        assert!(!t1.pb7_signal_low());
    }

    #[test]
    fn timer1_free_running_reloads_and_toggles_pb7() {
        let mut t1 = Timer1::new();
        t1.set_free_running(true);
        t1.set_pb7_flag(true);
        t1.write_counter_low(4);
        t1.write_counter_high(0);
        assert!(t1.pb7_signal_low());

        t1.update(4);
        assert!(t1.interrupt_flag());
        assert!(!t1.pb7_signal_low());
        assert_eq!(t1.read_counter_high(), 0);
        t1.set_interrupt_flag(false);

        // Reloaded from the latch, second expiry toggles PB7 back.
        t1.update(4);
        assert!(t1.interrupt_flag());
        assert!(t1.pb7_signal_low());
    }

    #[test]
    fn timer2_counter_transfers_on_high_write() {
        let mut t2 = Timer2::new();
        t2.write_counter_low(0x30);
        t2.write_counter_high(0x01);
        assert_eq!(t2.read_counter_high(), 0x01);
        assert_eq!(t2.read_counter_low(), 0x30);
    }

    #[test]
    fn timer2_flag_raises_at_exactly_n_cycles() {
        let mut t2 = Timer2::new();
        t2.write_counter_low(5);
        t2.write_counter_high(0);
        t2.update(4);
        assert!(!t2.interrupt_flag());
        t2.update(1);
        assert!(t2.interrupt_flag());
    }

    #[test]
    fn timer2_saturates_at_zero_after_expiry() {
        let mut t2 = Timer2::new();
        t2.write_counter_low(1);
        t2.write_counter_high(0);
        t2.update(7);
        assert_eq!(t2.read_counter_high(), 0);
        let _ = t2.read_counter_low();
        assert_eq!(t2.read_counter_high(), 0);
    }
}
