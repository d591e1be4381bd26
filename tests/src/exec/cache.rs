use dynarec_core::block::cflags::{CF_COUNT_MASK, CF_NO_IMMEDIATES};
use dynarec_core::{BlockKey, CodeBlock};
use dynarec_exec::BlockCache;
use proptest::prelude::*;

use crate::harness::FLAT32;

/// A block whose code is `[pc, pc + len)`.
fn block_at(pc: u32, len: u32) -> CodeBlock {
    let mut block = CodeBlock::new(BlockKey::new(0, pc, FLAT32), 0);
    block.mark_code(pc, len);
    block.size = len;
    block
}

#[test]
fn insert_and_lookup() {
    let mut cache = BlockCache::new(16);
    let key = BlockKey::new(0, 0x1000, FLAT32);
    let idx = cache.insert(block_at(0x1000, 8));
    assert_eq!(cache.lookup(&key), Some(idx));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats.jump_cache_hits, 1);
    assert_eq!(cache.lookup(&BlockKey::new(0, 0x1000, 0)), None);
}

#[test]
fn jump_cache_alias_falls_back_to_map() {
    let mut cache = BlockCache::new(16);
    let a = cache.insert(block_at(0x1000, 4));
    let mut other = block_at(0x1000, 4);
    other.key = BlockKey::new(0, 0x1000, 0);
    let b = cache.insert(other);
    assert_ne!(a, b);
    assert_eq!(cache.lookup(&BlockKey::new(0, 0x1000, FLAT32)), Some(a));
    assert_eq!(cache.lookup(&BlockKey::new(0, 0x1000, 0)), Some(b));
}

#[test]
fn reinsert_replaces() {
    let mut cache = BlockCache::new(16);
    cache.insert(block_at(0x1000, 4));
    let idx = cache.insert(block_at(0x1000, 6));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(idx).map(|b| b.size), Some(6));
}

#[test]
fn write_inside_invalidates() {
    let mut cache = BlockCache::new(16);
    let key = BlockKey::new(0, 0x1000, FLAT32);
    cache.insert(block_at(0x1000, 8));
    assert_eq!(cache.invalidate_range(0x1007, 1), 1);
    assert!(cache.lookup(&key).is_none());
    assert!(cache.is_empty());
    assert_eq!(cache.stats.invalidations, 1);
}

#[test]
fn write_next_to_block_is_ignored() {
    let mut cache = BlockCache::new(16);
    cache.insert(block_at(0x1000, 8));
    assert_eq!(cache.invalidate_range(0x0fff, 1), 0);
    assert_eq!(cache.invalidate_range(0x1008, 4), 0);
    assert_eq!(cache.invalidate_range(0x0ffc, 4), 0);
    assert_eq!(cache.len(), 1);
}

#[test]
fn only_overlapping_blocks_on_a_page_go() {
    let mut cache = BlockCache::new(16);
    cache.insert(block_at(0x1000, 8));
    cache.insert(block_at(0x1010, 8));
    cache.insert(block_at(0x1020, 8));
    assert_eq!(cache.invalidate_range(0x1014, 0x10), 2);
    assert!(cache.contains(&BlockKey::new(0, 0x1000, FLAT32)));
    assert!(!cache.contains(&BlockKey::new(0, 0x1010, FLAT32)));
    assert!(!cache.contains(&BlockKey::new(0, 0x1020, FLAT32)));
}

#[test]
fn block_across_pages() {
    let mut cache = BlockCache::new(16);
    cache.insert(block_at(0x1ffc, 8));
    assert_eq!(cache.invalidate_range(0x2003, 1), 1);
}

#[test]
fn written_key_compiles_without_immediates() {
    let mut cache = BlockCache::new(16);
    let key = BlockKey::new(0, 0x1000, FLAT32);
    assert_eq!(cache.cflags_for(&key), 0);
    cache.insert(block_at(0x1000, 8));
    cache.note_insn_limit(key, 3);
    assert_eq!(cache.cflags_for(&key) & CF_COUNT_MASK, 3);
    cache.invalidate_range(0x1000, 1);
    // The limit was learned from the old bytes.
    assert_eq!(cache.cflags_for(&key), CF_NO_IMMEDIATES);
}

#[test]
fn flush_forgets_dirty_keys_and_limits() {
    let mut cache = BlockCache::new(16);
    let written = BlockKey::new(0, 0x1000, FLAT32);
    let limited = BlockKey::new(0, 0x2000, FLAT32);
    cache.insert(block_at(0x1000, 8));
    cache.invalidate_range(0x1000, 1);
    cache.note_insn_limit(limited, 4);
    assert_eq!(cache.cflags_for(&written), CF_NO_IMMEDIATES);
    assert_eq!(cache.cflags_for(&limited), 4);

    cache.flush();
    assert_eq!(cache.cflags_for(&written), 0);
    assert_eq!(cache.cflags_for(&limited), 0);
}

#[test]
fn side_tables_stay_bounded() {
    let mut cache = BlockCache::new(4);
    // Each block is written right after insertion, so live never
    // reaches capacity and no flush happens.
    for i in 0..64u32 {
        let pc = 0x1000 + i * 0x10;
        cache.insert(block_at(pc, 4));
        cache.invalidate_range(pc, 1);
        cache.note_insn_limit(BlockKey::new(0, pc, FLAT32), 2);
    }
    assert_eq!(cache.stats.flushes, 0);
    let keys = (0..64u32).map(|i| BlockKey::new(0, 0x1000 + i * 0x10, FLAT32));
    let dirty = keys
        .clone()
        .filter(|k| cache.cflags_for(k) & CF_NO_IMMEDIATES != 0)
        .count();
    let limited = keys
        .filter(|k| cache.cflags_for(k) & CF_COUNT_MASK != 0)
        .count();
    assert!(dirty <= 4, "{dirty} dirty keys");
    assert!(limited <= 4, "{limited} limits");
    // The most recent write is always remembered.
    let last = BlockKey::new(0, 0x1000 + 63 * 0x10, FLAT32);
    assert_eq!(cache.cflags_for(&last), CF_NO_IMMEDIATES | 2);
}

#[test]
fn zero_insn_limit_is_not_kept() {
    let mut cache = BlockCache::new(16);
    let key = BlockKey::new(0, 0x1000, FLAT32);
    cache.note_insn_limit(key, 0);
    assert_eq!(cache.cflags_for(&key), 0);
}

#[test]
fn flush_at_capacity() {
    let mut cache = BlockCache::new(2);
    cache.insert(block_at(0x1000, 4));
    cache.insert(block_at(0x1010, 4));
    cache.insert(block_at(0x1020, 4));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats.flushes, 1);
    assert!(cache.contains(&BlockKey::new(0, 0x1020, FLAT32)));
    assert!(cache.lookup(&BlockKey::new(0, 0x1000, FLAT32)).is_none());
}

proptest! {
    #[test]
    fn invalidation_is_byte_exact(
        pc in 0x1000u32..0x3000,
        len in 1u32..32,
        off in 0u32..96,
    ) {
        let mut cache = BlockCache::new(16);
        cache.insert(block_at(pc, len));
        let addr = pc - 32 + off;
        let inside = addr >= pc && addr < pc + len;
        prop_assert_eq!(cache.invalidate_range(addr, 1), inside as usize);
    }
}
