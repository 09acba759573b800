//! Memory bus: ordered range-to-device dispatch with an unmapped policy.

use crate::fault::CoreError;
use crate::peripherals::Via;

/// Byte returned for reads that reach no device.
pub const UNMAPPED_FILL: u8 = 0xFF;

/// Behavior of the bus when an access reaches no mapped device.
///
/// Held per bus instance and fixed after construction so two emulator
/// instances never share policy state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnmappedPolicy {
    /// Return the filler byte, record nothing.
    Ignore,
    /// Record the first access per address in [`BusStats`], then behave
    /// as [`Self::Ignore`].
    #[default]
    LogOnce,
    /// Surface the access as a terminal [`CoreError`].
    Fatal,
}

/// Access counters and the addresses recorded under the log-once policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusStats {
    /// Total reads dispatched.
    pub reads: u64,
    /// Total writes dispatched.
    pub writes: u64,
    /// Reads that reached no device.
    pub unmapped_reads: u64,
    /// Writes that reached no device.
    pub unmapped_writes: u64,
    /// Distinct unmapped addresses recorded under `LogOnce`, in first-hit
    /// order.
    pub logged_addresses: Vec<u16>,
}

impl BusStats {
    fn record_unmapped(&mut self, addr: u16, policy: UnmappedPolicy) {
        if policy == UnmappedPolicy::LogOnce && !self.logged_addresses.contains(&addr) {
            self.logged_addresses.push(addr);
        }
    }
}

/// The closed set of devices a bus range can map to.
#[derive(Debug)]
pub enum Device {
    /// Read-only memory. Writes are documented no-ops.
    Rom(Vec<u8>),
    /// Read-write memory.
    Ram(Vec<u8>),
    /// The VIA register file; reads and writes have timing side effects.
    Peripheral(Via),
    /// Explicitly mapped hole; behaves per the bus policy.
    UnmappedSink,
}

#[derive(Debug, Clone, Copy)]
struct Mapping {
    start: u16,
    end: u16,
    device: usize,
}

impl Mapping {
    const fn contains(&self, addr: u16) -> bool {
        addr >= self.start && addr <= self.end
    }

    const fn overlaps(&self, start: u16, end: u16) -> bool {
        start <= self.end && end >= self.start
    }
}

/// Ordered, non-overlapping address-range-to-device dispatch.
#[derive(Debug)]
pub struct Bus {
    mappings: Vec<Mapping>,
    devices: Vec<Device>,
    policy: UnmappedPolicy,
    stats: BusStats,
}

impl Bus {
    /// Creates an empty bus with the given unmapped-access policy.
    #[must_use]
    pub const fn new(policy: UnmappedPolicy) -> Self {
        Self {
            mappings: Vec::new(),
            devices: Vec::new(),
            policy,
            stats: BusStats {
                reads: 0,
                writes: 0,
                unmapped_reads: 0,
                unmapped_writes: 0,
                logged_addresses: Vec::new(),
            },
        }
    }

    /// Registers `device` over `start..=end` and returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::OverlappingRange`] if the range intersects an
    /// existing mapping. Overlap is a setup mistake, never a runtime
    /// tie-break.
    pub fn map_device(&mut self, start: u16, end: u16, device: Device) -> Result<usize, CoreError> {
        debug_assert!(start <= end);
        if self.mappings.iter().any(|m| m.overlaps(start, end)) {
            return Err(CoreError::OverlappingRange { start, end });
        }
        let index = self.devices.len();
        self.devices.push(device);
        self.mappings.push(Mapping {
            start,
            end,
            device: index,
        });
        Ok(index)
    }

    /// The unmapped-access policy this bus was built with.
    #[must_use]
    pub const fn policy(&self) -> UnmappedPolicy {
        self.policy
    }

    /// Access statistics accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> &BusStats {
        &self.stats
    }

    /// Borrows a registered device by handle.
    #[must_use]
    pub fn device(&self, handle: usize) -> Option<&Device> {
        self.devices.get(handle)
    }

    /// Mutably borrows a registered device by handle.
    pub fn device_mut(&mut self, handle: usize) -> Option<&mut Device> {
        self.devices.get_mut(handle)
    }

    /// Borrows the first mapped peripheral, if any.
    #[must_use]
    pub fn via(&self) -> Option<&Via> {
        self.devices.iter().find_map(|device| match device {
            Device::Peripheral(via) => Some(via),
            _ => None,
        })
    }

    /// Mutably borrows the first mapped peripheral, if any.
    pub fn via_mut(&mut self) -> Option<&mut Via> {
        self.devices.iter_mut().find_map(|device| match device {
            Device::Peripheral(via) => Some(via),
            _ => None,
        })
    }

    fn resolve(&self, addr: u16) -> Option<(usize, u16)> {
        self.mappings
            .iter()
            .find(|m| m.contains(addr))
            .map(|m| (m.device, addr - m.start))
    }

    /// Reads one byte, honoring device side effects.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnmappedRead`] when the address reaches no
    /// device and the policy is [`UnmappedPolicy::Fatal`].
    pub fn read(&mut self, addr: u16) -> Result<u8, CoreError> {
        self.stats.reads += 1;
        match self.resolve(addr) {
            Some((handle, offset)) => match &mut self.devices[handle] {
                Device::Rom(data) | Device::Ram(data) => {
                    Ok(data.get(usize::from(offset)).copied().unwrap_or(UNMAPPED_FILL))
                }
                Device::Peripheral(via) => Ok(via.read(offset)),
                Device::UnmappedSink => self.unmapped_read(addr),
            },
            None => self.unmapped_read(addr),
        }
    }

    /// Reads a big-endian 16-bit word.
    ///
    /// # Errors
    ///
    /// Propagates any fault of the two byte reads.
    pub fn read16(&mut self, addr: u16) -> Result<u16, CoreError> {
        let high = self.read(addr)?;
        let low = self.read(addr.wrapping_add(1))?;
        Ok(u16::from(high) << 8 | u16::from(low))
    }

    /// Writes one byte, honoring device side effects. Writes to ROM are
    /// no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnmappedWrite`] when the address reaches no
    /// device and the policy is [`UnmappedPolicy::Fatal`].
    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), CoreError> {
        self.stats.writes += 1;
        match self.resolve(addr) {
            Some((handle, offset)) => match &mut self.devices[handle] {
                Device::Rom(_) => Ok(()),
                Device::Ram(data) => {
                    if let Some(slot) = data.get_mut(usize::from(offset)) {
                        *slot = value;
                    }
                    Ok(())
                }
                Device::Peripheral(via) => {
                    via.write(offset, value);
                    Ok(())
                }
                Device::UnmappedSink => self.unmapped_write(addr),
            },
            None => self.unmapped_write(addr),
        }
    }

    /// Side-effect-free read for diagnostics.
    ///
    /// Never perturbs peripheral timing or interrupt state, never counts
    /// toward statistics, and never faults; unmapped addresses return the
    /// filler byte regardless of policy.
    #[must_use]
    pub fn read_raw(&self, addr: u16) -> u8 {
        match self.resolve(addr) {
            Some((handle, offset)) => match &self.devices[handle] {
                Device::Rom(data) | Device::Ram(data) => {
                    data.get(usize::from(offset)).copied().unwrap_or(UNMAPPED_FILL)
                }
                Device::Peripheral(via) => via.read_raw(offset),
                Device::UnmappedSink => UNMAPPED_FILL,
            },
            None => UNMAPPED_FILL,
        }
    }

    /// Big-endian 16-bit variant of [`Self::read_raw`].
    #[must_use]
    pub fn read16_raw(&self, addr: u16) -> u16 {
        u16::from(self.read_raw(addr)) << 8 | u16::from(self.read_raw(addr.wrapping_add(1)))
    }

    fn unmapped_read(&mut self, addr: u16) -> Result<u8, CoreError> {
        self.stats.unmapped_reads += 1;
        match self.policy {
            UnmappedPolicy::Fatal => Err(CoreError::UnmappedRead { addr }),
            policy => {
                self.stats.record_unmapped(addr, policy);
                Ok(UNMAPPED_FILL)
            }
        }
    }

    fn unmapped_write(&mut self, addr: u16) -> Result<(), CoreError> {
        self.stats.unmapped_writes += 1;
        match self.policy {
            UnmappedPolicy::Fatal => Err(CoreError::UnmappedWrite { addr }),
            policy => {
                self.stats.record_unmapped(addr, policy);
                Ok(())
            }
        }
    }
}
