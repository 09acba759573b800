//! Emulator instance: construction, image loading, reset, stepping.
//!
//! [`Machine`] owns the CPU, the bus with its device set, and the frame
//! context, and is the only type drivers need. Two instances never share
//! state.

use crate::execute::Cpu;
use crate::fault::CoreError;
use crate::frame::FrameContext;
use crate::memory::{
    Bus, Device, UnmappedPolicy, BIOS_END, BIOS_START, CARTRIDGE_END, CARTRIDGE_START, RAM_END,
    RAM_START, VIA_END, VIA_START,
};
use crate::peripherals::Via;

/// CPU cycles between audio samples for a 1.5 MHz core driving a
/// 44.1 kHz stream.
pub const DEFAULT_CYCLES_PER_AUDIO_SAMPLE: f32 = 1_500_000.0 / 44_100.0;

/// Construction-time knobs. Everything else about the platform is fixed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineConfig {
    /// Bus behavior for accesses that reach no device.
    pub unmapped_policy: UnmappedPolicy,
    /// CPU cycles between consecutive audio samples.
    pub cycles_per_audio_sample: f32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            unmapped_policy: UnmappedPolicy::default(),
            cycles_per_audio_sample: DEFAULT_CYCLES_PER_AUDIO_SAMPLE,
        }
    }
}

/// Result of one instruction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepOutcome {
    /// Cycles the instruction (or interrupt entry, or idle wait) consumed.
    pub cycles: u8,
    /// True when the CPU is parked in a `SYNC`/`CWAI` wait state.
    pub waiting: bool,
}

/// One emulated console: CPU, bus, devices, and the frame context.
#[derive(Debug)]
pub struct Machine {
    cpu: Cpu,
    bus: Bus,
    frame: Option<FrameContext>,
    cartridge: usize,
    bios: usize,
    config: MachineConfig,
}

impl Machine {
    /// Builds a machine with the platform address map: cartridge ROM at
    /// the bottom, system RAM, the VIA, and the BIOS ROM at the top.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OverlappingRange`] if device registration
    /// fails; the fixed map makes this unreachable in practice.
    pub fn new(config: MachineConfig) -> Result<Self, CoreError> {
        let mut bus = Bus::new(config.unmapped_policy);
        let cartridge = bus.map_device(
            CARTRIDGE_START,
            CARTRIDGE_END,
            Device::Rom(vec![0; region_len(CARTRIDGE_START, CARTRIDGE_END)]),
        )?;
        bus.map_device(
            RAM_START,
            RAM_END,
            Device::Ram(vec![0; region_len(RAM_START, RAM_END)]),
        )?;
        bus.map_device(VIA_START, VIA_END, Device::Peripheral(Via::new()))?;
        let bios = bus.map_device(
            BIOS_START,
            BIOS_END,
            Device::Rom(vec![0; region_len(BIOS_START, BIOS_END)]),
        )?;
        Ok(Self {
            cpu: Cpu::new(),
            bus,
            frame: None,
            cartridge,
            bios,
            config,
        })
    }

    /// The configuration this machine was built with.
    #[must_use]
    pub const fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// A fresh frame context carrying this machine's audio sample ratio;
    /// pass it to [`Self::set_frame_context`].
    #[must_use]
    pub fn default_frame_context(&self) -> FrameContext {
        FrameContext::new(self.config.cycles_per_audio_sample)
    }

    /// Copies a BIOS image to the top of the address space.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ImageTooLarge`] when the image exceeds the
    /// BIOS region.
    pub fn load_bios(&mut self, image: &[u8]) -> Result<(), CoreError> {
        let handle = self.bios;
        self.load_rom(handle, image, region_len(BIOS_START, BIOS_END))
    }

    /// Copies a cartridge image to the bottom of the address space.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ImageTooLarge`] when the image exceeds the
    /// cartridge region.
    pub fn load_cartridge(&mut self, image: &[u8]) -> Result<(), CoreError> {
        let handle = self.cartridge;
        self.load_rom(handle, image, region_len(CARTRIDGE_START, CARTRIDGE_END))
    }

    fn load_rom(&mut self, handle: usize, image: &[u8], capacity: usize) -> Result<(), CoreError> {
        if image.len() > capacity {
            return Err(CoreError::ImageTooLarge {
                len: image.len(),
                capacity,
            });
        }
        if let Some(Device::Rom(data)) = self.bus.device_mut(handle) {
            data[..image.len()].copy_from_slice(image);
        }
        Ok(())
    }

    /// Copies `program` into system RAM at `base` and points `PC` at it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ImageTooLarge`] when the program does not fit
    /// between `base` and the end of RAM.
    pub fn load_program(&mut self, base: u16, program: &[u8]) -> Result<(), CoreError> {
        let capacity = if (RAM_START..=RAM_END).contains(&base) {
            usize::from(RAM_END - base) + 1
        } else {
            0
        };
        if program.len() > capacity {
            return Err(CoreError::ImageTooLarge {
                len: program.len(),
                capacity,
            });
        }
        for (i, byte) in program.iter().enumerate() {
            self.bus.write(base.wrapping_add(i as u16), *byte)?;
        }
        self.cpu.registers_mut().pc = base;
        Ok(())
    }

    /// Hardware reset: the peripheral returns to power-on state and the
    /// CPU reloads `PC` from the reset vector.
    pub fn reset(&mut self) {
        if let Some(via) = self.bus.via_mut() {
            via.reset();
        }
        self.cpu.reset(&self.bus);
    }

    /// Wires the frame context the peripheral reads and writes during
    /// stepping. Must happen before the first [`Self::step`].
    pub fn set_frame_context(&mut self, frame: FrameContext) {
        self.frame = Some(frame);
    }

    /// Borrows the wired frame context.
    #[must_use]
    pub const fn frame_context(&self) -> Option<&FrameContext> {
        self.frame.as_ref()
    }

    /// Mutably borrows the wired frame context; hosts use this to update
    /// input and drain the sinks between frames.
    pub const fn frame_context_mut(&mut self) -> Option<&mut FrameContext> {
        self.frame.as_mut()
    }

    /// Executes one instruction (or interrupt entry, or one idle wait
    /// cycle) and advances the peripheral by the consumed cycles.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FrameContextNotWired`] before the first
    /// [`Self::set_frame_context`], and propagates decode and bus faults
    /// from the CPU.
    pub fn step(&mut self) -> Result<StepOutcome, CoreError> {
        let frame = self.frame.as_mut().ok_or(CoreError::FrameContextNotWired)?;
        let (irq, firq) = self
            .bus
            .via()
            .map_or((false, false), |via| (via.irq_asserted(), via.firq_asserted()));
        let cycles = self.cpu.step(&mut self.bus, irq, firq)?;
        if let Some(via) = self.bus.via_mut() {
            via.sync(
                u16::from(cycles),
                &frame.input,
                &mut frame.render,
                &mut frame.audio,
            );
        }
        Ok(StepOutcome {
            cycles,
            waiting: self.cpu.is_waiting(),
        })
    }

    /// Steps until at least `cycle_budget` cycles have elapsed; returns
    /// the exact total, which may overshoot by one instruction.
    ///
    /// # Errors
    ///
    /// Propagates the first [`Self::step`] fault.
    pub fn run(&mut self, cycle_budget: u64) -> Result<u64, CoreError> {
        let mut elapsed = 0u64;
        while elapsed < cycle_budget {
            elapsed += u64::from(self.step()?.cycles);
        }
        Ok(elapsed)
    }

    /// Raises the non-maskable interrupt line for one entry.
    ///
    /// # Errors
    ///
    /// Propagates bus faults from stacking the frame.
    pub fn nmi(&mut self) -> Result<u8, CoreError> {
        self.cpu.nmi(&mut self.bus)
    }

    /// True when the CPU is parked in a `SYNC`/`CWAI` wait state.
    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        self.cpu.is_waiting()
    }

    /// Borrows the CPU registers.
    #[must_use]
    pub const fn registers(&self) -> &crate::state::CpuRegisters {
        self.cpu.registers()
    }

    /// Mutably borrows the CPU registers.
    pub const fn registers_mut(&mut self) -> &mut crate::state::CpuRegisters {
        self.cpu.registers_mut()
    }

    /// Borrows the bus.
    #[must_use]
    pub const fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Borrows the peripheral.
    #[must_use]
    pub fn via(&self) -> Option<&Via> {
        self.bus.via()
    }

    /// Mutably borrows the peripheral; drivers use this to drive the
    /// cartridge fast-interrupt line.
    pub fn via_mut(&mut self) -> Option<&mut Via> {
        self.bus.via_mut()
    }

    /// Side-effect-free read for diagnostics; see `Bus::read_raw`.
    #[must_use]
    pub fn read_raw(&self, addr: u16) -> u8 {
        self.bus.read_raw(addr)
    }
}

fn region_len(start: u16, end: u16) -> usize {
    usize::from(end - start) + 1
}
