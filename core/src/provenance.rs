use std::ops::Range;

/// Guest page size used for invalidation indexing.
pub const PAGE_BITS: u32 = 12;
pub const PAGE_SIZE: u32 = 1 << PAGE_BITS;

/// Set of guest linear byte ranges a CodeBlock's translation read.
///
/// Ranges are half-open, kept sorted and coalesced, so adjacent
/// instructions collapse into one range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    ranges: Vec<Range<u64>>,
}

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `len` bytes starting at linear address `start`.
    pub fn mark(&mut self, start: u32, len: u32) {
        if len == 0 {
            return;
        }
        let new = start as u64..start as u64 + len as u64;
        // First range that could touch `new` (its end reaches new.start).
        let pos = self.ranges.partition_point(|r| r.end < new.start);
        let mut merged = new;
        let mut end = pos;
        while end < self.ranges.len() && self.ranges[end].start <= merged.end
        {
            let r = &self.ranges[end];
            merged.start = merged.start.min(r.start);
            merged.end = merged.end.max(r.end);
            end += 1;
        }
        self.ranges.splice(pos..end, std::iter::once(merged));
    }

    pub fn ranges(&self) -> &[Range<u64>] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Total number of recorded bytes.
    pub fn len(&self) -> u64 {
        self.ranges.iter().map(|r| r.end - r.start).sum()
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.intersects(addr, 1)
    }

    /// Whether any recorded byte lies in `[start, start + len)`.
    pub fn intersects(&self, start: u32, len: u32) -> bool {
        if len == 0 {
            return false;
        }
        let (s, e) = (start as u64, start as u64 + len as u64);
        let pos = self.ranges.partition_point(|r| r.end <= s);
        self.ranges.get(pos).is_some_and(|r| r.start < e)
    }

    /// Guest page numbers touched by the recorded ranges, ascending.
    pub fn pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = Vec::new();
        for r in &self.ranges {
            let first = (r.start >> PAGE_BITS) as u32;
            let last = ((r.end - 1) >> PAGE_BITS) as u32;
            for p in first..=last {
                if pages.last() != Some(&p) {
                    pages.push(p);
                }
            }
        }
        pages
    }
}
