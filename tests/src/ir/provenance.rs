use dynarec_core::Provenance;
use proptest::prelude::*;

#[test]
fn adjacent_ranges_coalesce() {
    let mut p = Provenance::new();
    p.mark(0x1000, 2);
    p.mark(0x1002, 3);
    p.mark(0x1005, 1);
    assert_eq!(p.ranges(), &[0x1000..0x1006]);
    assert_eq!(p.len(), 6);
}

#[test]
fn disjoint_ranges_stay_apart() {
    let mut p = Provenance::new();
    p.mark(0x2000, 4);
    p.mark(0x1000, 4);
    assert_eq!(p.ranges(), &[0x1000..0x1004, 0x2000..0x2004]);
    assert!(!p.intersects(0x1004, 0xffc));
    assert!(p.intersects(0x1003, 1));
    assert!(p.intersects(0x1fff, 2));
}

#[test]
fn overlapping_mark_merges() {
    let mut p = Provenance::new();
    p.mark(0x10, 4);
    p.mark(0x20, 4);
    p.mark(0x12, 0x10);
    assert_eq!(p.ranges(), &[0x10..0x24]);
}

#[test]
fn empty_mark_is_ignored() {
    let mut p = Provenance::new();
    p.mark(0x10, 0);
    assert!(p.is_empty());
    assert!(!p.intersects(0x10, 0));
}

#[test]
fn top_of_address_space() {
    let mut p = Provenance::new();
    p.mark(0xffff_fffe, 2);
    assert!(p.contains(0xffff_ffff));
    assert_eq!(p.pages(), vec![0xfffff]);
}

#[test]
fn pages_span_boundary() {
    let mut p = Provenance::new();
    p.mark(0x1ffe, 4);
    assert_eq!(p.pages(), vec![1, 2]);
}

proptest! {
    #[test]
    fn intersects_is_exact(
        marks in prop::collection::vec((0u32..0x400, 1u32..16), 1..8),
        start in 0u32..0x420,
        len in 1u32..8,
    ) {
        let mut p = Provenance::new();
        let mut bytes = vec![false; 0x420];
        for &(s, l) in &marks {
            p.mark(s, l);
            for a in s..s + l {
                bytes[a as usize] = true;
            }
        }
        let expected = (start..start + len)
            .any(|a| bytes.get(a as usize).copied().unwrap_or(false));
        prop_assert_eq!(p.intersects(start, len), expected);
        let total = bytes.iter().filter(|&&b| b).count() as u64;
        prop_assert_eq!(p.len(), total);
        for pair in p.ranges().windows(2) {
            prop_assert!(pair[0].end < pair[1].start);
        }
    }
}
