//! Flat guest RAM.

use dynarec_core::Width;
use dynarec_frontend::x86::fetch::GuestMemory;

use crate::BusError;

/// Guest physical memory, linear address 0 upward.
///
/// Every successful write is logged so the execute loop can
/// invalidate the cached code it overlaps.
#[derive(Debug, Clone, Default)]
pub struct GuestRam {
    bytes: Vec<u8>,
    writes: Vec<(u32, u32)>,
}

impl GuestRam {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            writes: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    fn range(&self, addr: u32, len: u32) -> Result<std::ops::Range<usize>, BusError> {
        let start = addr as usize;
        let end = start + len as usize;
        if end > self.bytes.len() {
            return Err(BusError { addr, len });
        }
        Ok(start..end)
    }

    /// Copy `data` to `addr`. Counts as a guest write.
    pub fn load(&mut self, addr: u32, data: &[u8]) -> Result<(), BusError> {
        let r = self.range(addr, data.len() as u32)?;
        self.bytes[r].copy_from_slice(data);
        self.writes.push((addr, data.len() as u32));
        Ok(())
    }

    /// Little-endian read of `w` bytes.
    pub fn read(&self, addr: u32, w: Width) -> Result<u32, BusError> {
        let r = self.range(addr, w.bytes())?;
        let v = self.bytes[r]
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);
        Ok(v)
    }

    /// Little-endian write of the low `w` bytes of `v`.
    pub fn write(&mut self, addr: u32, w: Width, v: u32) -> Result<(), BusError> {
        let r = self.range(addr, w.bytes())?;
        let bytes = v.to_le_bytes();
        self.bytes[r].copy_from_slice(&bytes[..w.bytes() as usize]);
        self.writes.push((addr, w.bytes()));
        Ok(())
    }

    /// Drain the write log.
    pub fn take_writes(&mut self) -> Vec<(u32, u32)> {
        std::mem::take(&mut self.writes)
    }
}

/// Out-of-range bytes read as 0xFF, like an unpopulated bus.
impl GuestMemory for GuestRam {
    fn read_u8(&self, addr: u32) -> u8 {
        self.bytes.get(addr as usize).copied().unwrap_or(0xff)
    }
}
