//! Host-facing frame context: input snapshot, render sink, audio sink.
//!
//! The peripheral reads the input snapshot and appends to the two sinks
//! during `Sync`; the host drains them once per frame. All three are
//! plain values owned by the machine, borrowed only for the duration of a
//! sync call.

/// Number of analog axes exposed by the controller port.
pub const ANALOG_AXES: usize = 4;

/// Controller snapshot. Button bits read *set* while the button is not
/// pressed, matching the pulled-up hardware lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Input {
    button_mask: u8,
    analog: [i8; ANALOG_AXES],
}

impl Default for Input {
    fn default() -> Self {
        Self {
            button_mask: 0xFF,
            analog: [0; ANALOG_AXES],
        }
    }
}

impl Input {
    /// Power-on state: no buttons pressed, axes centered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current button mask (a bit is clear while its button is pressed).
    #[must_use]
    pub const fn button_mask(&self) -> u8 {
        self.button_mask
    }

    /// Presses or releases button `index` (0..=7).
    pub fn set_button(&mut self, index: u8, pressed: bool) {
        let bit = 1u8 << (index & 0x07);
        if pressed {
            self.button_mask &= !bit;
        } else {
            self.button_mask |= bit;
        }
    }

    /// Value of analog axis `select` (0..=3), wrapped into range.
    #[must_use]
    pub const fn analog(&self, select: u8) -> i8 {
        self.analog[(select & 0x03) as usize]
    }

    /// Sets analog axis `select` (0..=3).
    pub const fn set_analog(&mut self, select: u8, value: i8) {
        self.analog[(select & 0x03) as usize] = value;
    }
}

/// One relative beam move emitted by the peripheral.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    /// Horizontal delta in integrator units.
    pub dx: f32,
    /// Vertical delta in integrator units.
    pub dy: f32,
    /// True when the beam was drawing during the move.
    pub visible: bool,
}

/// Append-only sink of vector segments for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderContext {
    /// Emitted segments, in beam order.
    pub segments: Vec<Segment>,
}

impl RenderContext {
    /// Empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Drops all segments; called by the host between frames.
    pub fn clear(&mut self) {
        self.segments.clear();
    }
}

/// Append-only sink of audio samples for one frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioContext {
    /// CPU cycles between consecutive samples.
    pub cpu_cycles_per_sample: f32,
    /// Emitted samples in `-1.0..=1.0`.
    pub samples: Vec<f32>,
}

impl AudioContext {
    /// Sink producing one sample every `cpu_cycles_per_sample` cycles.
    #[must_use]
    pub const fn new(cpu_cycles_per_sample: f32) -> Self {
        Self {
            cpu_cycles_per_sample,
            samples: Vec::new(),
        }
    }

    /// Drops all samples; called by the host between frames.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// The three per-frame values the peripheral's sync reads and writes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameContext {
    /// Controller snapshot, read-only to the peripheral.
    pub input: Input,
    /// Vector segment sink.
    pub render: RenderContext,
    /// Audio sample sink.
    pub audio: AudioContext,
}

impl FrameContext {
    /// Fresh context with centered input and empty sinks.
    #[must_use]
    pub fn new(cpu_cycles_per_sample: f32) -> Self {
        Self {
            input: Input::new(),
            render: RenderContext::new(),
            audio: AudioContext::new(cpu_cycles_per_sample),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Input;

    #[test]
    fn buttons_read_inverted() {
        let mut input = Input::new();
        assert_eq!(input.button_mask(), 0xFF);
        input.set_button(0, true);
        input.set_button(3, true);
        assert_eq!(input.button_mask(), 0xFF & !0x01 & !0x08);
        input.set_button(0, false);
        assert_eq!(input.button_mask(), 0xFF & !0x08);
    }

    #[test]
    fn analog_axes_wrap_the_mux_select() {
        let mut input = Input::new();
        input.set_analog(1, -64);
        assert_eq!(input.analog(1), -64);
        assert_eq!(input.analog(5), -64);
    }
}
