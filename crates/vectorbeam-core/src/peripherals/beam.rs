//! Analog beam model.
//!
//! Integrator velocities, the RAMP line and the blanking input are all
//! set by the interface adapter; this module turns them into relative
//! [`Segment`] moves. The analog path is not instantaneous: the RAMP
//! line takes a few cycles to open or close the integrators, and the X
//! velocity input sits behind an extra buffer stage, so changes are
//! applied after fixed cycle delays.

use std::collections::VecDeque;

use crate::frame::{RenderContext, Segment};

const RAMP_UP_DELAY: i32 = 5;
const RAMP_DOWN_DELAY: i32 = 10;
const VELOCITY_X_DELAY: u16 = 6;

// Delays let moves overshoot the nominal 256-unit grid, so drawn deltas
// are scaled back down to fit.
const LINE_DRAW_SCALE: f32 = 0.85;

/// State of the RAMP line as seen by the integrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RampPhase {
    /// Integrators idle.
    #[default]
    RampOff,
    /// RAMP asserted, integrators not yet moving.
    RampUp,
    /// Integrators moving.
    RampOn,
    /// RAMP released, integrators still coasting.
    RampDown,
}

/// A value that takes effect a fixed number of cycles after assignment.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct DelayedValue {
    value: f32,
    delay: u16,
    pending: VecDeque<(u16, f32)>,
}

impl DelayedValue {
    fn with_delay(delay: u16) -> Self {
        Self {
            value: 0.0,
            delay,
            pending: VecDeque::new(),
        }
    }

    fn assign(&mut self, value: f32) {
        if self.delay == 0 {
            self.value = value;
            self.pending.clear();
        } else {
            self.pending.push_back((self.delay, value));
        }
    }

    fn update(&mut self, cycles: u16) {
        for entry in &mut self.pending {
            entry.0 = entry.0.saturating_sub(cycles);
        }
        while let Some(&(remaining, value)) = self.pending.front() {
            if remaining > 0 {
                break;
            }
            self.value = value;
            self.pending.pop_front();
        }
    }

    const fn value(&self) -> f32 {
        self.value
    }
}

/// Beam position model; emits relative segment moves into a
/// [`RenderContext`].
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Beam {
    integrators_enabled: bool,
    pos_x: f32,
    pos_y: f32,
    last_drawing_enabled: bool,
    last_dir: (f32, f32),
    velocity_x: DelayedValue,
    velocity_y: DelayedValue,
    xy_offset: f32,
    brightness: f32,
    blank: bool,
    ramp_phase: RampPhase,
    ramp_delay: i32,
}

impl Default for Beam {
    fn default() -> Self {
        Self::new()
    }
}

impl Beam {
    /// Power-on state: centered, blanked, integrators idle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            integrators_enabled: false,
            pos_x: 0.0,
            pos_y: 0.0,
            last_drawing_enabled: false,
            last_dir: (0.0, 0.0),
            velocity_x: DelayedValue::with_delay(VELOCITY_X_DELAY),
            velocity_y: DelayedValue::with_delay(0),
            xy_offset: 0.0,
            brightness: 0.0,
            blank: false,
            ramp_phase: RampPhase::RampOff,
            ramp_delay: 0,
        }
    }

    /// Advances the model by `cycles` and appends any beam motion to
    /// `render`. The adapter drives this one cycle at a time.
    pub fn update(&mut self, cycles: u16, render: &mut RenderContext) {
        self.velocity_x.update(cycles);
        self.velocity_y.update(cycles);

        match self.ramp_phase {
            RampPhase::RampOff | RampPhase::RampDown => {
                if self.integrators_enabled {
                    self.ramp_phase = RampPhase::RampUp;
                    self.ramp_delay = RAMP_UP_DELAY;
                }
            }
            RampPhase::RampOn | RampPhase::RampUp => {
                if !self.integrators_enabled {
                    self.ramp_phase = RampPhase::RampDown;
                    self.ramp_delay = RAMP_DOWN_DELAY;
                }
            }
        }

        match self.ramp_phase {
            RampPhase::RampUp => {
                self.ramp_delay -= 1;
                if self.ramp_delay <= 0 {
                    self.ramp_phase = RampPhase::RampOn;
                }
            }
            RampPhase::RampDown => {
                self.ramp_delay -= 1;
                if self.ramp_delay <= 0 {
                    self.ramp_phase = RampPhase::RampOff;
                }
            }
            RampPhase::RampOff | RampPhase::RampOn => {}
        }

        let velocity = (self.velocity_x.value(), self.velocity_y.value());
        let curr_dir = normalized(velocity);

        let (dx, dy) = match self.ramp_phase {
            RampPhase::RampDown | RampPhase::RampOn => {
                let scale = f32::from(cycles) * LINE_DRAW_SCALE / 128.0;
                (
                    (velocity.0 + self.xy_offset) * scale,
                    (velocity.1 + self.xy_offset) * scale,
                )
            }
            RampPhase::RampOff | RampPhase::RampUp => (0.0, 0.0),
        };
        self.pos_x += dx;
        self.pos_y += dy;

        // Dots are drawn with the integrators off, so drawing does not
        // require motion.
        let drawing_enabled = !self.blank && self.brightness > 0.0 && self.brightness <= 128.0;

        if drawing_enabled {
            let extend = self.last_drawing_enabled
                && magnitude(self.last_dir) > 0.0
                && self.last_dir == curr_dir;
            match render.segments.last_mut() {
                Some(last) if extend && last.visible => {
                    last.dx += dx;
                    last.dy += dy;
                }
                _ => render.segments.push(Segment {
                    dx,
                    dy,
                    visible: true,
                }),
            }
        } else if dx != 0.0 || dy != 0.0 {
            match render.segments.last_mut() {
                Some(last) if !last.visible => {
                    last.dx += dx;
                    last.dy += dy;
                }
                _ => render.segments.push(Segment {
                    dx,
                    dy,
                    visible: false,
                }),
            }
        }

        self.last_drawing_enabled = drawing_enabled;
        self.last_dir = curr_dir;
    }

    /// Snaps the beam back to center, emitting the recenter as a blank
    /// move so downstream positions stay consistent.
    pub fn zero(&mut self, render: &mut RenderContext) {
        if self.pos_x != 0.0 || self.pos_y != 0.0 {
            let (dx, dy) = (-self.pos_x, -self.pos_y);
            match render.segments.last_mut() {
                Some(last) if !last.visible => {
                    last.dx += dx;
                    last.dy += dy;
                }
                _ => render.segments.push(Segment {
                    dx,
                    dy,
                    visible: false,
                }),
            }
        }
        self.pos_x = 0.0;
        self.pos_y = 0.0;
        self.last_drawing_enabled = false;
    }

    /// Sets the /BLANK input; a blanked beam moves without drawing.
    pub const fn set_blank_enabled(&mut self, enabled: bool) {
        self.blank = enabled;
    }

    /// Sets the RAMP-derived integrator enable.
    pub const fn set_integrators_enabled(&mut self, enabled: bool) {
        self.integrators_enabled = enabled;
    }

    /// Sets the X integrator input; takes effect after the buffer delay.
    pub fn set_integrator_x(&mut self, value: i8) {
        self.velocity_x.assign(f32::from(value));
    }

    /// Sets the Y integrator input.
    pub fn set_integrator_y(&mut self, value: i8) {
        self.velocity_y.assign(f32::from(value));
    }

    /// Sets the offset added to both integrator inputs.
    pub const fn set_integrator_xy_offset(&mut self, value: i8) {
        self.xy_offset = value as f32;
    }

    /// Sets the beam brightness; zero or above 128 disables drawing.
    pub const fn set_brightness(&mut self, value: u8) {
        self.brightness = value as f32;
    }

    /// Current RAMP phase.
    #[must_use]
    pub const fn ramp_phase(&self) -> RampPhase {
        self.ramp_phase
    }

    /// Current beam position relative to center.
    #[must_use]
    pub const fn position(&self) -> (f32, f32) {
        (self.pos_x, self.pos_y)
    }

    /// Whether the integrators are currently enabled.
    #[must_use]
    pub const fn integrators_enabled(&self) -> bool {
        self.integrators_enabled
    }
}

fn magnitude(v: (f32, f32)) -> f32 {
    v.0.hypot(v.1)
}

fn normalized(v: (f32, f32)) -> (f32, f32) {
    let mag = magnitude(v);
    if mag == 0.0 {
        (0.0, 0.0)
    } else {
        (v.0 / mag, v.1 / mag)
    }
}
