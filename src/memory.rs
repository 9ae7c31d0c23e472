//! Access to caller-owned memory with fault containment.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::internal::lock_unpoisoned;
use crate::param::HookStruct;
use crate::process::ProcessId;

/// An access to caller memory that would have faulted.
#[derive(Error, Copy, Clone, Eq, PartialEq, Debug)]
#[error("access violation at {address:#x} ({len} bytes)")]
pub struct MemoryFault {
    pub address: usize,
    pub len: usize,
}

/// Bounds-checked copies between kernel buffers and a process's address space.
///
/// Implementations must never panic on bad addresses; they report a [`MemoryFault`] instead.
pub trait CallerMemory: Send + Sync {
    /// Probes `address..address + buf.len()` for reading and copies it into `buf`.
    fn read(&self, process: ProcessId, address: usize, buf: &mut [u8]) -> Result<(), MemoryFault>;

    /// Probes `address..address + data.len()` for writing and copies `data` into it.
    fn write(&self, process: ProcessId, address: usize, data: &[u8]) -> Result<(), MemoryFault>;
}

/// Page protection of a [`RegionMemory`] mapping.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Protection {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug)]
struct Region {
    base: usize,
    protection: Protection,
    bytes: Vec<u8>,
}

impl Region {
    fn range_offset(&self, address: usize, len: usize) -> Option<usize> {
        let offset = address.checked_sub(self.base)?;
        let end = offset.checked_add(len)?;
        (end <= self.bytes.len()).then_some(offset)
    }
}

/// Caller memory backed by explicitly mapped regions per process.
///
/// Any access not fully contained in one mapped region faults, as does writing to a
/// read-only region.
#[derive(Default, Debug)]
pub struct RegionMemory {
    regions: Mutex<HashMap<ProcessId, Vec<Region>>>,
}

impl RegionMemory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Maps `len` zeroed bytes at `base` in the given process.
    pub fn map(&self, process: ProcessId, base: usize, len: usize, protection: Protection) {
        let region = Region {
            base,
            protection,
            bytes: vec![0; len],
        };
        lock_unpoisoned(&self.regions)
            .entry(process)
            .or_default()
            .push(region);
    }

    /// Writes a parameter structure into mapped memory, ignoring protection.
    pub fn store<T: HookStruct>(
        &self,
        process: ProcessId,
        address: usize,
        value: &T,
    ) -> Result<(), MemoryFault> {
        let bytes = value.to_bytes();
        self.access(process, address, bytes.len(), |region, offset| {
            region.bytes[offset..offset + bytes.len()].copy_from_slice(&bytes);
        })
    }

    /// Reads a parameter structure back from mapped memory.
    pub fn load<T: HookStruct>(&self, process: ProcessId, address: usize) -> Result<T, MemoryFault> {
        let mut buf = vec![0; T::SIZE];
        self.read(process, address, &mut buf)?;
        Ok(T::from_bytes(&buf))
    }

    fn access<F>(
        &self,
        process: ProcessId,
        address: usize,
        len: usize,
        action: F,
    ) -> Result<(), MemoryFault>
    where
        F: FnOnce(&mut Region, usize),
    {
        let fault = MemoryFault { address, len };
        if address == 0 {
            return Err(fault);
        }
        let mut regions = lock_unpoisoned(&self.regions);
        let region_and_offset = regions.get_mut(&process).and_then(|regions| {
            regions.iter_mut().find_map(|region| {
                region
                    .range_offset(address, len)
                    .map(|offset| (region, offset))
            })
        });
        match region_and_offset {
            Some((region, offset)) => {
                action(region, offset);
                Ok(())
            }
            None => Err(fault),
        }
    }
}

impl CallerMemory for RegionMemory {
    fn read(&self, process: ProcessId, address: usize, buf: &mut [u8]) -> Result<(), MemoryFault> {
        let len = buf.len();
        self.access(process, address, len, |region, offset| {
            buf.copy_from_slice(&region.bytes[offset..offset + len]);
        })
    }

    fn write(&self, process: ProcessId, address: usize, data: &[u8]) -> Result<(), MemoryFault> {
        let fault = MemoryFault {
            address,
            len: data.len(),
        };
        let mut writable = true;
        self.access(process, address, data.len(), |region, offset| {
            if region.protection == Protection::ReadWrite {
                region.bytes[offset..offset + data.len()].copy_from_slice(data);
            } else {
                writable = false;
            }
        })?;
        if writable { Ok(()) } else { Err(fault) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROCESS: ProcessId = ProcessId(1);

    #[test]
    fn read_inside_region() -> anyhow::Result<()> {
        let memory = RegionMemory::new();
        memory.map(PROCESS, 0x1000, 16, Protection::ReadWrite);
        memory.write(PROCESS, 0x1004, &[1, 2, 3])?;
        let mut buf = [0; 4];
        memory.read(PROCESS, 0x1003, &mut buf)?;
        assert_eq!(buf, [0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn straddling_access_faults() {
        let memory = RegionMemory::new();
        memory.map(PROCESS, 0x1000, 16, Protection::ReadWrite);
        let mut buf = [0; 8];
        assert_eq!(
            memory.read(PROCESS, 0x100C, &mut buf),
            Err(MemoryFault {
                address: 0x100C,
                len: 8
            })
        );
    }

    #[test]
    fn null_and_unmapped_fault() {
        let memory = RegionMemory::new();
        memory.map(PROCESS, 0x1000, 16, Protection::ReadWrite);
        let mut buf = [0; 1];
        assert!(memory.read(PROCESS, 0, &mut buf).is_err());
        assert!(memory.read(PROCESS, 0x2000, &mut buf).is_err());
        assert!(memory.read(ProcessId(2), 0x1000, &mut buf).is_err());
        assert!(memory.read(PROCESS, usize::MAX, &mut buf).is_err());
    }

    #[test]
    fn read_only_region_rejects_writes() {
        let memory = RegionMemory::new();
        memory.map(PROCESS, 0x1000, 16, Protection::ReadOnly);
        assert!(memory.write(PROCESS, 0x1000, &[1]).is_err());
        let mut buf = [0xFF; 1];
        assert!(memory.read(PROCESS, 0x1000, &mut buf).is_ok());
        assert_eq!(buf, [0]);
    }
}
