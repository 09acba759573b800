//! 6522-class interface adapter.
//!
//! Sixteen registers, mirrored every 16 bytes across the mapped range.
//! Port A drives the DAC feeding the X integrator and, through the
//! analog mux on port B, the Y integrator, the XY offset, the beam
//! brightness or the direct audio line. Port B also carries the sound
//! chip control lines, the comparator input and the /RAMP output.

use crate::frame::{AudioContext, Input, RenderContext};
use crate::peripherals::beam::Beam;
use crate::peripherals::psg::Psg;
use crate::peripherals::shift::{ShiftRegister, ShiftRegisterMode};
use crate::peripherals::timers::{Timer1, Timer2};

// Register offsets within a 16-byte mirror.
const PORT_B: u16 = 0x0;
const PORT_A: u16 = 0x1;
const DATA_DIR_B: u16 = 0x2;
const DATA_DIR_A: u16 = 0x3;
const TIMER1_LOW: u16 = 0x4;
const TIMER1_HIGH: u16 = 0x5;
const TIMER1_LATCH_LOW: u16 = 0x6;
const TIMER1_LATCH_HIGH: u16 = 0x7;
const TIMER2_LOW: u16 = 0x8;
const TIMER2_HIGH: u16 = 0x9;
const SHIFT: u16 = 0xA;
const AUX_CNTL: u16 = 0xB;
const PERIPH_CNTL: u16 = 0xC;
const INTERRUPT_FLAG: u16 = 0xD;
const INTERRUPT_ENABLE: u16 = 0xE;
const PORT_A_NO_HANDSHAKE: u16 = 0xF;

// Port B bit assignments.
const PORT_B_MUX_DISABLED: u8 = 0x01;
const PORT_B_MUX_SEL_MASK: u8 = 0x06;
const PORT_B_MUX_SEL_SHIFT: u8 = 1;
const PORT_B_SOUND_BC1: u8 = 0x08;
const PORT_B_SOUND_BDIR: u8 = 0x10;
const PORT_B_COMPARATOR: u8 = 0x20;
const PORT_B_RAMP_DISABLED: u8 = 0x80;

// Auxiliary control register bits.
const ACR_SHIFT_MODE_MASK: u8 = 0x1C;
const ACR_SHIFT_MODE_SHIFT: u8 = 2;
const ACR_TIMER1_FREE_RUNNING: u8 = 0x40;
const ACR_TIMER1_PB7: u8 = 0x80;

// Peripheral control register fields; 0b110 drives the line low.
const PCR_CA2_MASK: u8 = 0x0E;
const PCR_CA2_SHIFT: u8 = 1;
const PCR_CB2_MASK: u8 = 0xE0;
const PCR_CB2_SHIFT: u8 = 5;
const PCR_LINE_LOW: u8 = 0b110;

/// Interrupt flag and enable bits, shared between the two registers.
pub mod irq_bits {
    /// CA1 edge (port A handshake).
    pub const CA1: u8 = 0x02;
    /// Shift register sequence complete.
    pub const SHIFT: u8 = 0x04;
    /// Timer 2 expired.
    pub const TIMER2: u8 = 0x20;
    /// Timer 1 expired.
    pub const TIMER1: u8 = 0x40;
    /// Flag-register master bit: any enabled flag is raised.
    pub const MASTER: u8 = 0x80;
    /// Enable-register control bit: set or clear the written mask.
    pub const SET_CLEAR: u8 = 0x80;
}

#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// The interface adapter and the analog hardware it fans out to.
pub struct Via {
    port_b: u8,
    port_a: u8,
    data_dir_b: u8,
    data_dir_a: u8,
    aux_cntl: u8,
    periph_cntl: u8,
    interrupt_enable: u8,

    beam: Beam,
    psg: Psg,
    timer1: Timer1,
    timer2: Timer2,
    shift_register: ShiftRegister,

    joystick_button_state: u8,
    joystick_pot: i8,
    ca1_interrupt_flag: bool,
    firq_line: bool,

    direct_audio_sample: f32,
    elapsed_audio_cycles: f32,
}

impl Via {
    /// Power-on state; equivalent to [`Self::reset`] on a fresh adapter.
    #[must_use]
    pub fn new() -> Self {
        let mut via = Self::default();
        via.reset();
        via
    }

    /// Hardware reset: registers cleared, /RAMP released, components
    /// back to power-on state.
    pub fn reset(&mut self) {
        self.port_b = 0;
        self.port_a = 0;
        self.data_dir_b = 0;
        self.data_dir_a = 0;
        self.aux_cntl = 0;
        self.periph_cntl = 0;
        self.interrupt_enable = 0;
        self.beam = Beam::new();
        self.psg = Psg::new();
        self.timer1 = Timer1::new();
        self.timer2 = Timer2::new();
        self.shift_register = ShiftRegister::new();
        self.ca1_interrupt_flag = false;
        self.firq_line = false;
        self.direct_audio_sample = 0.0;
        self.elapsed_audio_cycles = 0.0;
        // /RAMP idles high (integrators off).
        self.port_b |= PORT_B_RAMP_DISABLED;
    }

    /// Register read with full hardware side effects.
    pub fn read(&mut self, offset: u16) -> u8 {
        match offset & 0x0F {
            PORT_A => {
                // Reading port A acknowledges the CA1 handshake.
                self.ca1_interrupt_flag = false;
                self.read_port_a()
            }
            TIMER1_LOW => self.timer1.read_counter_low(),
            TIMER2_LOW => self.timer2.read_counter_low(),
            SHIFT => self.shift_register.read(),
            index => self.read_plain(index),
        }
    }

    /// Side-effect-free register read for diagnostics.
    #[must_use]
    pub fn read_raw(&self, offset: u16) -> u8 {
        match offset & 0x0F {
            PORT_A => self.read_port_a(),
            TIMER1_LOW => self.timer1.peek_counter_low(),
            TIMER2_LOW => self.timer2.peek_counter_low(),
            SHIFT => self.shift_register.peek(),
            index => self.read_plain(index),
        }
    }

    fn read_plain(&self, index: u16) -> u8 {
        match index {
            PORT_B => self.read_port_b(),
            DATA_DIR_B => self.data_dir_b,
            DATA_DIR_A => self.data_dir_a,
            TIMER1_HIGH => self.timer1.read_counter_high(),
            TIMER1_LATCH_LOW => self.timer1.read_latch_low(),
            TIMER1_LATCH_HIGH => self.timer1.read_latch_high(),
            TIMER2_HIGH => self.timer2.read_counter_high(),
            AUX_CNTL => self.aux_cntl,
            PERIPH_CNTL => self.periph_cntl,
            INTERRUPT_FLAG => self.interrupt_flags(),
            INTERRUPT_ENABLE => self.interrupt_enable,
            _ => self.read_port_a(),
        }
    }

    /// Register write with full hardware side effects.
    pub fn write(&mut self, offset: u16, value: u8) {
        match offset & 0x0F {
            PORT_B => {
                self.port_b = value;
                self.update_integrators();
                self.update_psg();
            }
            PORT_A => {
                // Writing port A acknowledges the CA1 handshake.
                self.ca1_interrupt_flag = false;
                self.write_port_a(value);
            }
            DATA_DIR_B => self.data_dir_b = value,
            DATA_DIR_A => self.data_dir_a = value,
            TIMER1_LOW => self.timer1.write_counter_low(value),
            TIMER1_HIGH => self.timer1.write_counter_high(value),
            TIMER1_LATCH_LOW => self.timer1.write_latch_low(value),
            TIMER1_LATCH_HIGH => self.timer1.write_latch_high(value),
            TIMER2_LOW => self.timer2.write_counter_low(value),
            TIMER2_HIGH => self.timer2.write_counter_high(value),
            SHIFT => self.shift_register.load(value),
            AUX_CNTL => {
                self.aux_cntl = value;
                let mode = match (value & ACR_SHIFT_MODE_MASK) >> ACR_SHIFT_MODE_SHIFT {
                    0 => ShiftRegisterMode::Disabled,
                    _ => ShiftRegisterMode::ShiftOutUnder02,
                };
                self.shift_register.set_mode(mode);
                self.timer1
                    .set_free_running(value & ACR_TIMER1_FREE_RUNNING != 0);
                self.timer1.set_pb7_flag(value & ACR_TIMER1_PB7 != 0);
            }
            PERIPH_CNTL => {
                self.periph_cntl = value;
                if self.shift_register.mode() == ShiftRegisterMode::Disabled {
                    let blank =
                        (value & PCR_CB2_MASK) >> PCR_CB2_SHIFT == PCR_LINE_LOW;
                    self.beam.set_blank_enabled(blank);
                }
            }
            INTERRUPT_FLAG => {
                // Written 1-bits acknowledge the matching flags.
                if value & irq_bits::CA1 != 0 {
                    self.ca1_interrupt_flag = false;
                }
                if value & irq_bits::SHIFT != 0 {
                    self.shift_register.set_interrupt_flag(false);
                }
                if value & irq_bits::TIMER2 != 0 {
                    self.timer2.set_interrupt_flag(false);
                }
                if value & irq_bits::TIMER1 != 0 {
                    self.timer1.set_interrupt_flag(false);
                }
            }
            INTERRUPT_ENABLE => {
                // Bit 7 selects whether the written mask sets or clears.
                let mask = value & 0x7F;
                if value & irq_bits::SET_CLEAR != 0 {
                    self.interrupt_enable |= mask;
                } else {
                    self.interrupt_enable &= !mask;
                }
            }
            _ => self.write_port_a(value),
        }
    }

    /// Advances the adapter and everything behind it by `cycles`.
    ///
    /// Timers, the shift register and the beam are stepped one cycle at
    /// a time; a run of N cycles is exactly N single steps.
    pub fn sync(
        &mut self,
        cycles: u16,
        input: &Input,
        render: &mut RenderContext,
        audio: &mut AudioContext,
    ) {
        self.joystick_button_state = input.button_mask();
        if self.mux_enabled() {
            self.joystick_pot = input.analog(self.mux_sel());
        }

        for _ in 0..cycles {
            self.timer1.update(1);
            self.timer2.update(1);
            self.shift_register.update(1);

            // In shift-out mode CB2 drives /BLANK.
            if self.shift_register.mode() == ShiftRegisterMode::ShiftOutUnder02 {
                self.beam.set_blank_enabled(self.shift_register.cb2_active());
            }

            // With the PB7 option on, timer 1 owns the /RAMP line.
            if self.timer1.pb7_flag() {
                if self.timer1.pb7_signal_low() {
                    self.port_b &= !PORT_B_RAMP_DISABLED;
                } else {
                    self.port_b |= PORT_B_RAMP_DISABLED;
                }
            }

            if (self.periph_cntl & PCR_CA2_MASK) >> PCR_CA2_SHIFT == PCR_LINE_LOW {
                self.beam.zero(render);
            }

            self.beam
                .set_integrators_enabled(self.port_b & PORT_B_RAMP_DISABLED == 0);
            self.beam.update(1, render);

            self.psg.update(1);
            self.emit_audio(audio);
        }
    }

    fn emit_audio(&mut self, audio: &mut AudioContext) {
        if audio.cpu_cycles_per_sample <= 0.0 {
            return;
        }
        self.elapsed_audio_cycles += 1.0;
        while self.elapsed_audio_cycles >= audio.cpu_cycles_per_sample {
            self.elapsed_audio_cycles -= audio.cpu_cycles_per_sample;
            let mixed = self.psg.sample() * 0.5 + self.direct_audio_sample * 0.5;
            audio.samples.push(mixed.clamp(-1.0, 1.0));
        }
    }

    /// True when any enabled interrupt flag is raised.
    #[must_use]
    pub fn irq_asserted(&self) -> bool {
        self.interrupt_flags() & irq_bits::MASTER != 0
    }

    /// State of the fast-interrupt line, driven by the cartridge port.
    #[must_use]
    pub const fn firq_asserted(&self) -> bool {
        self.firq_line
    }

    /// Drives the cartridge fast-interrupt line.
    pub const fn set_firq_line(&mut self, asserted: bool) {
        self.firq_line = asserted;
    }

    /// Signals an edge on the CA1 input; acknowledged by a port A
    /// access or a flag-register write.
    pub const fn trigger_ca1(&mut self) {
        self.ca1_interrupt_flag = true;
    }

    /// Borrows the beam model.
    #[must_use]
    pub const fn beam(&self) -> &Beam {
        &self.beam
    }

    /// Borrows the sound generator.
    #[must_use]
    pub const fn psg(&self) -> &Psg {
        &self.psg
    }

    fn interrupt_flags(&self) -> u8 {
        let mut flags = 0u8;
        if self.ca1_interrupt_flag {
            flags |= irq_bits::CA1;
        }
        if self.shift_register.interrupt_flag() {
            flags |= irq_bits::SHIFT;
        }
        if self.timer2.interrupt_flag() {
            flags |= irq_bits::TIMER2;
        }
        if self.timer1.interrupt_flag() {
            flags |= irq_bits::TIMER1;
        }
        if flags & self.interrupt_enable != 0 {
            flags |= irq_bits::MASTER;
        }
        flags
    }

    fn read_port_b(&self) -> u8 {
        let mut result = self.port_b;
        // Comparator: DAC output against the selected pot input.
        if (self.port_a as i8) < self.joystick_pot {
            result |= PORT_B_COMPARATOR;
        } else {
            result &= !PORT_B_COMPARATOR;
        }
        if self.psg.bc1() {
            result |= PORT_B_SOUND_BC1;
        } else {
            result &= !PORT_B_SOUND_BC1;
        }
        if self.psg.bdir() {
            result |= PORT_B_SOUND_BDIR;
        } else {
            result &= !PORT_B_SOUND_BDIR;
        }
        result
    }

    fn read_port_a(&self) -> u8 {
        // With the port in input mode and the sound chip in read mode,
        // the bus carries the button state.
        if self.data_dir_a == 0
            && self.port_b & PORT_B_SOUND_BDIR == 0
            && self.port_b & PORT_B_SOUND_BC1 != 0
        {
            self.joystick_button_state
        } else {
            self.port_a
        }
    }

    fn write_port_a(&mut self, value: u8) {
        self.port_a = value;
        if self.data_dir_a == 0xFF {
            self.update_integrators();
        }
    }

    const fn mux_enabled(&self) -> bool {
        self.port_b & PORT_B_MUX_DISABLED == 0
    }

    const fn mux_sel(&self) -> u8 {
        (self.port_b & PORT_B_MUX_SEL_MASK) >> PORT_B_MUX_SEL_SHIFT
    }

    fn update_integrators(&mut self) {
        if self.mux_enabled() {
            match self.mux_sel() {
                0 => self.beam.set_integrator_y(self.port_a as i8),
                1 => self.beam.set_integrator_xy_offset(self.port_a as i8),
                2 => self.beam.set_brightness(self.port_a),
                _ => self.direct_audio_sample = f32::from(self.port_a as i8) / 128.0,
            }
        }
        // The DAC always drives the X integrator.
        self.beam.set_integrator_x(self.port_a as i8);
    }

    fn update_psg(&mut self) {
        if !self.mux_enabled() {
            self.psg.set_bc1(self.port_b & PORT_B_SOUND_BC1 != 0);
            self.psg.set_bdir(self.port_b & PORT_B_SOUND_BDIR != 0);
            self.psg.write_da(self.port_a);
        }
    }
}
