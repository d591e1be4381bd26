use crate::context::Context;
use crate::provenance::Provenance;

/// Default instruction limit per block.
pub const DEFAULT_MAX_INSNS: u32 = 50;

/// Compile flags for `CodeBlock::cflags`.
pub mod cflags {
    /// Mask for the instruction count limit (0 = default limit).
    pub const CF_COUNT_MASK: u32 = 0x0000_FFFF;
    /// Load immediates from guest memory at run time instead of
    /// baking them into the IR.
    pub const CF_NO_IMMEDIATES: u32 = 0x0001_0000;
}

/// CPU mode flags that change how guest bytes translate.
pub mod flags {
    /// Default operand and address size is 32 bits.
    pub const FLAG_CODE32: u32 = 0x0001;
    /// Protected mode outside V86; enables segment checks.
    pub const FLAG_PROTECTED: u32 = 0x0002;
    /// Stack accesses use ESP rather than SP (SS.B).
    pub const FLAG_STACK32: u32 = 0x0004;
}

/// Cache key of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub cs_base: u32,
    pub pc: u32,
    pub flags: u32,
}

impl BlockKey {
    pub fn new(cs_base: u32, pc: u32, flags: u32) -> Self {
        Self { cs_base, pc, flags }
    }

    /// Linear address of the first instruction.
    pub fn linear_pc(&self) -> u32 {
        self.cs_base.wrapping_add(self.pc)
    }
}

/// Translation-time counters, kept per block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStats {
    /// Full flags-rebuild / flag-query helper calls emitted.
    pub flag_helper_calls: u32,
    /// Carry-only rebuild calls emitted ahead of INC/DEC.
    pub carry_rebuilds: u32,
    /// Flag queries answered by an inline derivation.
    pub derived_queries: u32,
    /// Segment checks emitted.
    pub seg_checks: u32,
}

/// A cached translation of a guest instruction run.
#[derive(Debug, Clone)]
pub struct CodeBlock {
    pub key: BlockKey,
    /// Compile flags (instruction count limit, no-immediates).
    pub cflags: u32,
    /// Size of guest code covered by this block, in bytes.
    pub size: u32,
    /// Number of guest instructions in this block.
    pub icount: u16,
    /// The emitted IR.
    pub ir: Context,
    /// Guest bytes the translation depended on.
    pub provenance: Provenance,
    pub stats: BlockStats,
    /// Whether this block has been invalidated.
    pub invalid: bool,
}

impl CodeBlock {
    pub fn new(key: BlockKey, cflags: u32) -> Self {
        Self {
            key,
            cflags,
            size: 0,
            icount: 0,
            ir: Context::new(),
            provenance: Provenance::new(),
            stats: BlockStats::default(),
            invalid: false,
        }
    }

    pub fn pc(&self) -> u32 {
        self.key.pc
    }

    pub fn cs_base(&self) -> u32 {
        self.key.cs_base
    }

    pub fn flags(&self) -> u32 {
        self.key.flags
    }

    pub fn no_immediates(&self) -> bool {
        self.cflags & cflags::CF_NO_IMMEDIATES != 0
    }

    pub fn code32(&self) -> bool {
        self.key.flags & flags::FLAG_CODE32 != 0
    }

    pub fn protected_mode(&self) -> bool {
        self.key.flags & flags::FLAG_PROTECTED != 0
    }

    pub fn stack32(&self) -> bool {
        self.key.flags & flags::FLAG_STACK32 != 0
    }

    /// Record guest bytes `[pc, pc + len)` of this block's code
    /// segment as consumed.
    pub fn mark_code(&mut self, pc: u32, len: u32) {
        let linear = self.key.cs_base.wrapping_add(pc);
        self.provenance.mark(linear, len);
    }

    /// Maximum number of guest instructions per block.
    pub fn max_insns(cflags: u32) -> u32 {
        let count = cflags & cflags::CF_COUNT_MASK;
        if count == 0 {
            DEFAULT_MAX_INSNS
        } else {
            count
        }
    }
}

/// Number of entries in the jump cache.
pub const JMP_CACHE_SIZE: usize = 1 << 12;

/// Direct-mapped block jump cache.
///
/// Indexed by the low bits of the linear PC. Provides O(1) lookup for
/// the common case of re-executing the same PC.
pub struct JumpCache {
    entries: Box<[Option<usize>; JMP_CACHE_SIZE]>,
}

impl JumpCache {
    pub fn new() -> Self {
        Self {
            entries: Box::new([None; JMP_CACHE_SIZE]),
        }
    }

    fn index(linear_pc: u32) -> usize {
        linear_pc as usize & (JMP_CACHE_SIZE - 1)
    }

    pub fn lookup(&self, linear_pc: u32) -> Option<usize> {
        self.entries[Self::index(linear_pc)]
    }

    pub fn insert(&mut self, linear_pc: u32, idx: usize) {
        self.entries[Self::index(linear_pc)] = Some(idx);
    }

    pub fn remove(&mut self, linear_pc: u32) {
        self.entries[Self::index(linear_pc)] = None;
    }

    pub fn invalidate(&mut self) {
        self.entries.fill(None);
    }
}

impl Default for JumpCache {
    fn default() -> Self {
        Self::new()
    }
}
