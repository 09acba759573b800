use serde::{Deserialize, Serialize};
use vectorbeam_core::{Machine, MachineConfig, Segment, UnmappedPolicy, RAM_END, RAM_START};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

macro_rules! console_log {
    ($($t:tt)*) => (log(&format!($($t)*)))
}

/// JS-compatible summary of one frame's worth of execution.
#[derive(Serialize, Deserialize)]
pub struct WasmFrameOutcome {
    pub cycles: u64,
    pub waiting: bool,
    pub segments: Vec<Segment>,
    pub samples: Vec<f32>,
}

#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Builds a machine with the default configuration and a wired
    /// frame context.
    ///
    /// # Errors
    ///
    /// Fails if machine construction fails.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmMachine, JsError> {
        console_error_panic_hook::set_once();
        let mut machine = Machine::new(MachineConfig {
            unmapped_policy: UnmappedPolicy::LogOnce,
            ..MachineConfig::default()
        })
        .map_err(|e| JsError::new(&e.to_string()))?;
        let frame = machine.default_frame_context();
        machine.set_frame_context(frame);
        Ok(Self { machine })
    }

    /// Loads a BIOS image into the ROM region.
    ///
    /// # Errors
    ///
    /// Fails if the image does not fit the region.
    pub fn load_bios(&mut self, image: &[u8]) -> Result<(), JsError> {
        self.machine
            .load_bios(image)
            .map_err(|e| JsError::new(&e.to_string()))?;
        console_log!("Loaded {} BIOS bytes", image.len());
        Ok(())
    }

    /// Loads a cartridge image into the cartridge region.
    ///
    /// # Errors
    ///
    /// Fails if the image does not fit the region.
    pub fn load_cartridge(&mut self, image: &[u8]) -> Result<(), JsError> {
        self.machine
            .load_cartridge(image)
            .map_err(|e| JsError::new(&e.to_string()))?;
        console_log!("Loaded {} cartridge bytes", image.len());
        Ok(())
    }

    /// Resets the machine through the reset vector.
    pub fn reset(&mut self) {
        self.machine.reset();
    }

    /// Presses or releases controller button `index` (0..=7).
    pub fn set_button(&mut self, index: u8, pressed: bool) {
        if let Some(frame) = self.machine.frame_context_mut() {
            frame.input.set_button(index, pressed);
        }
    }

    /// Sets analog axis `select` (0..=3) to `value`.
    pub fn set_analog(&mut self, select: u8, value: i8) {
        if let Some(frame) = self.machine.frame_context_mut() {
            frame.input.set_analog(select, value);
        }
    }

    /// Runs for at least `cycle_budget` cycles and returns the frame's
    /// segments and audio samples as a JSON object.
    ///
    /// # Errors
    ///
    /// Fails on a core fault during stepping.
    pub fn run_frame(&mut self, cycle_budget: u64) -> Result<JsValue, JsError> {
        if let Some(frame) = self.machine.frame_context_mut() {
            frame.render.clear();
            frame.audio.clear();
        }

        let cycles = self
            .machine
            .run(cycle_budget)
            .map_err(|e| JsError::new(&e.to_string()))?;
        let waiting = self.machine.is_waiting();

        let outcome = match self.machine.frame_context() {
            Some(frame) => WasmFrameOutcome {
                cycles,
                waiting,
                segments: frame.render.segments.clone(),
                samples: frame.audio.samples.clone(),
            },
            None => WasmFrameOutcome {
                cycles,
                waiting,
                segments: Vec::new(),
                samples: Vec::new(),
            },
        };

        serde_wasm_bindgen::to_value(&outcome).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Returns the register file as a JSON object.
    ///
    /// # Errors
    ///
    /// Fails if serialization to a JS value fails.
    pub fn registers(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(self.machine.registers())
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Reads one byte without bus side effects.
    pub fn peek(&self, addr: u16) -> u8 {
        self.machine.read_raw(addr)
    }

    /// Returns a copy of system RAM as a Uint8Array.
    pub fn ram_snapshot(&self) -> js_sys::Uint8Array {
        let mut bytes = Vec::with_capacity(usize::from(RAM_END - RAM_START) + 1);
        for addr in RAM_START..=RAM_END {
            bytes.push(self.machine.read_raw(addr));
        }
        js_sys::Uint8Array::from(bytes.as_slice())
    }

    /// Addresses recorded by the log-once unmapped policy so far.
    pub fn unmapped_addresses(&self) -> Vec<u16> {
        self.machine.bus().stats().logged_addresses.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::WasmFrameOutcome;
    use vectorbeam_core::Segment;

    #[test]
    fn frame_outcome_serializes_for_the_bridge() {
        let outcome = WasmFrameOutcome {
            cycles: 1500,
            waiting: false,
            segments: vec![Segment {
                dx: 1.0,
                dy: -2.0,
                visible: true,
            }],
            samples: vec![0.25],
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"cycles\":1500"));
        assert!(json.contains("\"visible\":true"));
    }
}
