//! AY-3-8912-class programmable sound generator.
//!
//! The CPU never addresses this chip directly: the interface adapter
//! latches a register address and moves data over an 8-bit bus, with the
//! BDIR and BC1 lines selecting the operation. Internally a master
//! divider clocks three square-wave tone channels, a 17-bit LFSR noise
//! source and a shared envelope generator, mixed into one sample.

use std::cmp;

mod reg {
    pub const TONE_A_LOW: u8 = 0;
    pub const TONE_A_HIGH: u8 = 1;
    pub const TONE_B_LOW: u8 = 2;
    pub const TONE_B_HIGH: u8 = 3;
    pub const TONE_C_LOW: u8 = 4;
    pub const TONE_C_HIGH: u8 = 5;
    pub const NOISE_PERIOD: u8 = 6;
    pub const MIXER_CONTROL: u8 = 7;
    pub const AMPLITUDE_A: u8 = 8;
    pub const ENVELOPE_LOW: u8 = 11;
    pub const ENVELOPE_HIGH: u8 = 12;
    pub const ENVELOPE_SHAPE: u8 = 13;
}

// Amplitude register: low nibble is the fixed volume, bit 4 selects the
// envelope instead.
const AMPLITUDE_ENVELOPE_MODE: u8 = 0x10;
const AMPLITUDE_FIXED_MASK: u8 = 0x0F;

// Envelope shape register bits.
const SHAPE_HOLD: u8 = 0x01;
const SHAPE_ALTERNATE: u8 = 0x02;
const SHAPE_ATTACK: u8 = 0x04;
const SHAPE_CONTINUE: u8 = 0x08;

/// Free-running divider used by every generator.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Divider {
    period: u32,
    time: u32,
}

impl Divider {
    fn new(period: u32) -> Self {
        Self { period, time: 0 }
    }

    fn set_period(&mut self, period: u32) {
        // Keep the relative phase when the period changes mid-count.
        let ratio = if self.period == 0 {
            0.0
        } else {
            self.time as f32 / self.period as f32
        };
        self.period = period;
        self.time = (self.period as f32 * ratio) as u32;
    }

    fn clock(&mut self) -> bool {
        if self.period == 0 {
            return false;
        }
        self.time += 1;
        if self.time >= self.period {
            self.time = 0;
            return true;
        }
        false
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct ToneGenerator {
    period: u16,
    divider: Divider,
    value: u8,
}

impl ToneGenerator {
    fn new() -> Self {
        Self {
            period: 0,
            divider: Divider::new(1),
            value: 0,
        }
    }

    fn set_period_low(&mut self, low: u8) {
        self.period = self.period & 0xFF00 | u16::from(low);
        self.divider
            .set_period(cmp::max(1, u32::from(self.period)));
    }

    fn set_period_high(&mut self, high: u8) {
        self.period = u16::from(high & 0x0F) << 8 | self.period & 0x00FF;
        self.divider
            .set_period(cmp::max(1, u32::from(self.period)));
    }

    const fn period_low(&self) -> u8 {
        (self.period & 0xFF) as u8
    }

    const fn period_high(&self) -> u8 {
        (self.period >> 8) as u8
    }

    fn clock(&mut self) {
        if self.divider.clock() {
            self.value ^= 1;
        }
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct NoiseGenerator {
    period: u8,
    divider: Divider,
    lfsr: u32,
}

impl NoiseGenerator {
    fn new() -> Self {
        Self {
            period: 0,
            divider: Divider::new(1),
            lfsr: 1,
        }
    }

    fn set_period(&mut self, period: u8) {
        self.period = period & 0x1F;
        self.divider.set_period(cmp::max(1, u32::from(self.period)));
    }

    fn clock(&mut self) {
        if self.divider.clock() {
            let bit = (self.lfsr ^ self.lfsr >> 3) & 1;
            self.lfsr = self.lfsr >> 1 | bit << 16;
        }
    }

    const fn value(&self) -> u8 {
        (self.lfsr & 1) as u8
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct EnvelopeGenerator {
    period: u16,
    divider: Divider,
    shape: u8,
    step: u8,
    holding: bool,
    attacking: bool,
}

impl EnvelopeGenerator {
    fn new() -> Self {
        Self {
            period: 0,
            divider: Divider::new(1),
            shape: 0,
            step: 0,
            holding: false,
            attacking: false,
        }
    }

    fn set_period_low(&mut self, low: u8) {
        self.period = self.period & 0xFF00 | u16::from(low);
        self.on_period_updated();
    }

    fn set_period_high(&mut self, high: u8) {
        self.period = u16::from(high) << 8 | self.period & 0x00FF;
        self.on_period_updated();
    }

    fn on_period_updated(&mut self) {
        // The period spans the full 16-step ramp.
        self.divider
            .set_period(cmp::max(1, u32::from(self.period) / 16));
    }

    fn set_shape(&mut self, shape: u8) {
        self.shape = shape & 0x0F;
        self.step = 0;
        self.holding = false;
        self.attacking = self.shape & SHAPE_ATTACK != 0;
        self.divider.time = 0;
    }

    fn clock(&mut self) {
        if !self.divider.clock() || self.holding {
            return;
        }
        if self.step < 15 {
            self.step += 1;
            return;
        }
        // End of a ramp: decide how the shape continues.
        if self.shape & SHAPE_CONTINUE == 0 {
            self.holding = true;
            self.attacking = false;
            self.step = 15;
        } else if self.shape & SHAPE_HOLD != 0 {
            self.holding = true;
            if self.shape & SHAPE_ALTERNATE != 0 {
                self.attacking = !self.attacking;
            }
            self.step = 15;
        } else {
            if self.shape & SHAPE_ALTERNATE != 0 {
                self.attacking = !self.attacking;
            }
            self.step = 0;
        }
    }

    fn value(&self) -> u8 {
        // A held non-continue shape decays to silence.
        if self.holding && self.shape & SHAPE_CONTINUE == 0 {
            return 0;
        }
        if self.attacking {
            self.step
        } else {
            15 - self.step
        }
    }

    const fn period_low(&self) -> u8 {
        (self.period & 0xFF) as u8
    }

    const fn period_high(&self) -> u8 {
        (self.period >> 8) as u8
    }

    const fn shape(&self) -> u8 {
        self.shape
    }
}

/// Bus operation selected by the BDIR and BC1 lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum BusMode {
    #[default]
    Inactive,
    Read,
    Write,
    LatchAddress,
}

/// The sound generator as seen from the interface adapter.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Psg {
    mode: BusMode,
    bdir: bool,
    bc1: bool,
    data: u8,
    latched_address: u8,
    registers: [u8; 16],
    master_divider: Divider,
    tones: [ToneGenerator; 3],
    noise: NoiseGenerator,
    envelope: EnvelopeGenerator,
    sample: f32,
}

impl Default for Psg {
    fn default() -> Self {
        Self::new()
    }
}

impl Psg {
    /// Power-on state: all registers zero, bus inactive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: BusMode::Inactive,
            bdir: false,
            bc1: false,
            data: 0,
            latched_address: 0,
            registers: [0; 16],
            // Generators run at one sixteenth of the CPU clock.
            master_divider: Divider::new(16),
            tones: [
                ToneGenerator::new(),
                ToneGenerator::new(),
                ToneGenerator::new(),
            ],
            noise: NoiseGenerator::new(),
            envelope: EnvelopeGenerator::new(),
            sample: 0.0,
        }
    }

    /// Sets the BDIR control line.
    pub const fn set_bdir(&mut self, enable: bool) {
        self.bdir = enable;
    }

    /// Sets the BC1 control line.
    pub const fn set_bc1(&mut self, enable: bool) {
        self.bc1 = enable;
    }

    /// Current BDIR line state.
    #[must_use]
    pub const fn bdir(&self) -> bool {
        self.bdir
    }

    /// Current BC1 line state.
    #[must_use]
    pub const fn bc1(&self) -> bool {
        self.bc1
    }

    /// Drives the data bus; the effect depends on BDIR and BC1.
    pub fn write_da(&mut self, value: u8) {
        self.data = value;
        self.mode = match (self.bdir, self.bc1) {
            (false, false) => BusMode::Inactive,
            (false, true) => BusMode::Read,
            (true, false) => BusMode::Write,
            (true, true) => BusMode::LatchAddress,
        };
        match self.mode {
            BusMode::LatchAddress => self.latched_address = value & 0x0F,
            BusMode::Write => self.write_register(self.latched_address, value),
            BusMode::Inactive | BusMode::Read => {}
        }
    }

    /// Reads the data bus; returns the latched register in read mode.
    #[must_use]
    pub fn read_da(&self) -> u8 {
        match self.mode {
            BusMode::Read => self.read_register(self.latched_address),
            _ => self.data,
        }
    }

    /// Advances the generators by `cycles` CPU cycles.
    pub fn update(&mut self, cycles: u16) {
        for _ in 0..cycles {
            self.clock();
        }
    }

    /// Mixed output of all three channels, in `-1.0..=1.0`.
    #[must_use]
    pub const fn sample(&self) -> f32 {
        self.sample
    }

    fn clock(&mut self) {
        if !self.master_divider.clock() {
            return;
        }
        for tone in &mut self.tones {
            tone.clock();
        }
        self.noise.clock();
        self.envelope.clock();

        let mixer = self.registers[usize::from(reg::MIXER_CONTROL)];
        let mut level = 0u32;
        for (channel, tone) in self.tones.iter().enumerate() {
            // Mixer bits are active low; a disabled source contributes a
            // constant high so the other source passes through.
            let tone_bit = if mixer >> channel & 1 == 0 {
                u32::from(tone.value)
            } else {
                1
            };
            let noise_bit = if mixer >> (channel + 3) & 1 == 0 {
                u32::from(self.noise.value())
            } else {
                1
            };
            if tone_bit & noise_bit == 1 {
                level += u32::from(self.channel_volume(channel));
            }
        }
        // Three channels of 0..=15 map onto the output range.
        self.sample = level as f32 / 45.0 * 2.0 - 1.0;
    }

    fn channel_volume(&self, channel: usize) -> u8 {
        let amplitude = self.registers[usize::from(reg::AMPLITUDE_A) + channel];
        if amplitude & AMPLITUDE_ENVELOPE_MODE == 0 {
            amplitude & AMPLITUDE_FIXED_MASK
        } else {
            self.envelope.value()
        }
    }

    fn read_register(&self, address: u8) -> u8 {
        match address {
            reg::TONE_A_LOW => self.tones[0].period_low(),
            reg::TONE_A_HIGH => self.tones[0].period_high(),
            reg::TONE_B_LOW => self.tones[1].period_low(),
            reg::TONE_B_HIGH => self.tones[1].period_high(),
            reg::TONE_C_LOW => self.tones[2].period_low(),
            reg::TONE_C_HIGH => self.tones[2].period_high(),
            reg::NOISE_PERIOD => self.noise.period,
            reg::ENVELOPE_LOW => self.envelope.period_low(),
            reg::ENVELOPE_HIGH => self.envelope.period_high(),
            reg::ENVELOPE_SHAPE => self.envelope.shape(),
            _ => self.registers[usize::from(address & 0x0F)],
        }
    }

    fn write_register(&mut self, address: u8, value: u8) {
        self.registers[usize::from(address & 0x0F)] = value;
        match address {
            reg::TONE_A_LOW => self.tones[0].set_period_low(value),
            reg::TONE_A_HIGH => self.tones[0].set_period_high(value),
            reg::TONE_B_LOW => self.tones[1].set_period_low(value),
            reg::TONE_B_HIGH => self.tones[1].set_period_high(value),
            reg::TONE_C_LOW => self.tones[2].set_period_low(value),
            reg::TONE_C_HIGH => self.tones[2].set_period_high(value),
            reg::NOISE_PERIOD => self.noise.set_period(value),
            reg::ENVELOPE_LOW => self.envelope.set_period_low(value),
            reg::ENVELOPE_HIGH => self.envelope.set_period_high(value),
            reg::ENVELOPE_SHAPE => self.envelope.set_shape(value),
            _ => {}
        }
    }
}
