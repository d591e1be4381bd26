//! Guest code fetch for translation.

/// Longest legal x86 instruction, in bytes.
pub const MAX_INSN_LEN: usize = 15;

/// Read-only view of guest memory used while translating.
///
/// Reads must not have device side effects; translation may touch
/// bytes the guest never executes.
pub trait GuestMemory {
    fn read_u8(&self, addr: u32) -> u8;

    fn read_u16(&self, addr: u32) -> u16 {
        let lo = self.read_u8(addr);
        let hi = self.read_u8(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn read_u32(&self, addr: u32) -> u32 {
        let lo = self.read_u16(addr) as u32;
        let hi = self.read_u16(addr.wrapping_add(2)) as u32;
        lo | (hi << 16)
    }
}

/// Flat memory image starting at linear address 0. Bytes past the
/// end read as 0xFF.
impl GuestMemory for Vec<u8> {
    fn read_u8(&self, addr: u32) -> u8 {
        self.get(addr as usize).copied().unwrap_or(0xff)
    }
}

/// Pre-fetched raw bytes of the instruction being translated.
///
/// Every byte a translator consumes goes through `take`, so the
/// consumed count is exactly the encoded length.
#[derive(Debug, Clone)]
pub struct Lookahead {
    bytes: [u8; MAX_INSN_LEN],
    pos: usize,
}

impl Lookahead {
    pub fn empty() -> Self {
        Self {
            bytes: [0; MAX_INSN_LEN],
            pos: 0,
        }
    }

    /// Fill the window from `linear` onward.
    pub fn fill(&mut self, mem: &dyn GuestMemory, linear: u32) {
        for (i, b) in self.bytes.iter_mut().enumerate() {
            *b = mem.read_u8(linear.wrapping_add(i as u32));
        }
        self.pos = 0;
    }

    /// Consume one byte; `None` once the 15-byte limit is exhausted.
    pub fn take(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    /// Next byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Consume `n` (1, 2 or 4) bytes as a little-endian value.
    pub fn take_le(&mut self, n: usize) -> Option<u32> {
        if self.pos + n > MAX_INSN_LEN {
            return None;
        }
        let mut v = 0u32;
        for i in 0..n {
            v |= (self.bytes[self.pos + i] as u32) << (8 * i);
        }
        self.pos += n;
        Some(v)
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}
