//! CodeBlock storage, lookup and write invalidation.

use std::collections::{HashMap, HashSet};

use dynarec_core::block::cflags::{CF_COUNT_MASK, CF_NO_IMMEDIATES};
use dynarec_core::provenance::PAGE_BITS;
use dynarec_core::{BlockKey, CodeBlock, JumpCache};
use tracing::debug;

/// Cache activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub jump_cache_hits: u64,
    pub inserts: u64,
    pub invalidations: u64,
    pub flushes: u64,
}

/// Translated blocks keyed by (segment base, PC, mode flags).
///
/// A page index maps each 4 KiB guest page to the blocks whose
/// provenance touches it; invalidation then tests the exact byte
/// ranges, so a write next to a block's code leaves it alone.
pub struct BlockCache {
    slots: Vec<Option<CodeBlock>>,
    free: Vec<usize>,
    map: HashMap<BlockKey, usize>,
    pages: HashMap<u32, Vec<usize>>,
    jump_cache: JumpCache,
    /// Keys whose code was overwritten since the last flush.
    dirty: HashSet<BlockKey>,
    /// Instruction limits learned from failed translations.
    insn_limits: HashMap<BlockKey, u32>,
    /// Live blocks kept before a flush. The dirty and limit tables
    /// are reset once they hold this many keys.
    capacity: usize,
    live: usize,
    pub stats: CacheStats,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            map: HashMap::new(),
            pages: HashMap::new(),
            jump_cache: JumpCache::new(),
            dirty: HashSet::new(),
            insn_limits: HashMap::new(),
            capacity: capacity.max(1),
            live: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, idx: usize) -> Option<&CodeBlock> {
        self.slots.get(idx).and_then(|s| s.as_ref())
    }

    pub fn contains(&self, key: &BlockKey) -> bool {
        self.map.contains_key(key)
    }

    /// Find the live block for `key`, jump cache first.
    pub fn lookup(&mut self, key: &BlockKey) -> Option<usize> {
        let linear = key.linear_pc();
        if let Some(idx) = self.jump_cache.lookup(linear) {
            if self.get(idx).is_some_and(|b| b.key == *key) {
                self.stats.hits += 1;
                self.stats.jump_cache_hits += 1;
                return Some(idx);
            }
        }
        let idx = *self.map.get(key)?;
        self.jump_cache.insert(linear, idx);
        self.stats.hits += 1;
        Some(idx)
    }

    /// Compile flags for a new translation of `key`.
    pub fn cflags_for(&self, key: &BlockKey) -> u32 {
        let mut cflags = 0;
        if self.dirty.contains(key) {
            cflags |= CF_NO_IMMEDIATES;
        }
        if let Some(&limit) = self.insn_limits.get(key) {
            cflags |= limit & CF_COUNT_MASK;
        }
        cflags
    }

    /// Remember that translating `key` failed at instruction
    /// `insn_index`. Only a non-zero index leaves a usable prefix.
    pub fn note_insn_limit(&mut self, key: BlockKey, insn_index: u32) {
        if insn_index == 0 {
            return;
        }
        if self.insn_limits.len() >= self.capacity
            && !self.insn_limits.contains_key(&key)
        {
            debug!(keys = self.insn_limits.len(), "resetting insn limits");
            self.insn_limits.clear();
        }
        self.insn_limits.insert(key, insn_index);
    }

    /// Store a freshly translated block and return its slot.
    pub fn insert(&mut self, block: CodeBlock) -> usize {
        if self.live >= self.capacity {
            self.flush();
        }
        let key = block.key;
        let pages = block.provenance.pages();
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(block);
                idx
            }
            None => {
                self.slots.push(Some(block));
                self.slots.len() - 1
            }
        };
        for page in pages {
            self.pages.entry(page).or_default().push(idx);
        }
        if let Some(old) = self.map.insert(key, idx) {
            self.remove(old, false);
        }
        self.jump_cache.insert(key.linear_pc(), idx);
        self.live += 1;
        self.stats.inserts += 1;
        idx
    }

    fn remove(&mut self, idx: usize, written: bool) {
        let Some(mut block) = self.slots.get_mut(idx).and_then(Option::take)
        else {
            return;
        };
        block.invalid = true;
        let key = block.key;
        if self.map.get(&key) == Some(&idx) {
            self.map.remove(&key);
        }
        for page in block.provenance.pages() {
            if let Some(list) = self.pages.get_mut(&page) {
                list.retain(|&i| i != idx);
                if list.is_empty() {
                    self.pages.remove(&page);
                }
            }
        }
        if self.jump_cache.lookup(key.linear_pc()) == Some(idx) {
            self.jump_cache.remove(key.linear_pc());
        }
        if written {
            self.mark_dirty(key);
            self.insn_limits.remove(&key);
        }
        self.free.push(idx);
        self.live -= 1;
    }

    fn mark_dirty(&mut self, key: BlockKey) {
        if self.dirty.len() >= self.capacity && !self.dirty.contains(&key) {
            debug!(keys = self.dirty.len(), "resetting dirty keys");
            self.dirty.clear();
        }
        self.dirty.insert(key);
    }

    /// Drop every block whose provenance overlaps the written range
    /// `[start, start + len)`. Returns the number dropped.
    pub fn invalidate_range(&mut self, start: u32, len: u32) -> usize {
        if len == 0 || self.live == 0 {
            return 0;
        }
        let first = start >> PAGE_BITS;
        let last = ((start as u64 + len as u64 - 1) >> PAGE_BITS) as u32;
        let mut hit: Vec<usize> = Vec::new();
        for page in first..=last {
            let Some(list) = self.pages.get(&page) else {
                continue;
            };
            for &idx in list {
                let overlaps = self
                    .get(idx)
                    .is_some_and(|b| b.provenance.intersects(start, len));
                if overlaps && !hit.contains(&idx) {
                    hit.push(idx);
                }
            }
        }
        for &idx in &hit {
            if let Some(b) = self.get(idx) {
                debug!(
                    cs_base = b.cs_base(),
                    pc = b.pc(),
                    start,
                    len,
                    "invalidating block"
                );
            }
            self.remove(idx, true);
        }
        self.stats.invalidations += hit.len() as u64;
        hit.len()
    }

    /// Drop all blocks together with the dirty keys and learned
    /// limits.
    pub fn flush(&mut self) {
        debug!(blocks = self.live, "flushing block cache");
        self.slots.clear();
        self.free.clear();
        self.map.clear();
        self.pages.clear();
        self.jump_cache.invalidate();
        self.dirty.clear();
        self.insn_limits.clear();
        self.live = 0;
        self.stats.flushes += 1;
    }
}
