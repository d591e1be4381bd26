use dynarec_frontend::x86::fetch::{GuestMemory, Lookahead, MAX_INSN_LEN};

#[test]
fn guest_memory_reads_little_endian() {
    let mem: Vec<u8> = vec![0x78, 0x56, 0x34, 0x12];
    assert_eq!(mem.read_u8(1), 0x56);
    assert_eq!(mem.read_u16(0), 0x5678);
    assert_eq!(mem.read_u32(0), 0x1234_5678);
}

#[test]
fn guest_memory_past_end_is_ff() {
    let mem: Vec<u8> = vec![0x11, 0x22];
    assert_eq!(mem.read_u8(2), 0xff);
    assert_eq!(mem.read_u16(1), 0xff22);
    assert_eq!(mem.read_u32(0), 0xffff_2211);
}

#[test]
fn lookahead_counts_consumed_bytes() {
    let mem: Vec<u8> = (0..32).collect();
    let mut la = Lookahead::empty();
    la.fill(&mem, 4);
    assert_eq!(la.peek(), Some(4));
    assert_eq!(la.take(), Some(4));
    assert_eq!(la.take_le(2), Some(0x0605));
    assert_eq!(la.take_le(4), Some(0x0a09_0807));
    assert_eq!(la.consumed(), 7);
}

#[test]
fn lookahead_stops_at_fifteen_bytes() {
    let mem: Vec<u8> = vec![0x90; 64];
    let mut la = Lookahead::empty();
    la.fill(&mem, 0);
    assert_eq!(la.take_le(4), Some(0x9090_9090));
    assert_eq!(la.take_le(4), Some(0x9090_9090));
    assert_eq!(la.take_le(4), Some(0x9090_9090));
    // 12 consumed; a dword would cross the limit
    assert_eq!(la.take_le(4), None);
    assert_eq!(la.consumed(), 12);
    for _ in 12..MAX_INSN_LEN {
        assert_eq!(la.take(), Some(0x90));
    }
    assert_eq!(la.take(), None);
    assert_eq!(la.peek(), None);
}
