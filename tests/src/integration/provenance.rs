use dynarec_core::block::cflags::CF_NO_IMMEDIATES;
use proptest::prelude::*;

use super::gen::{encode, insn};
use crate::harness::{insn_pcs, translate, CODE, FLAT32, REAL};

proptest! {
    #[test]
    fn provenance_covers_exactly_the_decoded_bytes(
        insns in prop::collection::vec(insn(true), 1..40),
        no_imm in any::<bool>(),
    ) {
        let mut code = Vec::new();
        let mut starts = Vec::new();
        for i in &insns {
            starts.push(CODE + code.len() as u32);
            code.extend(encode(i));
        }
        starts.push(CODE + code.len() as u32);
        code.extend([0xeb, 0xfe]);

        let cflags = if no_imm { CF_NO_IMMEDIATES } else { 0 };
        let block = translate(&code, FLAT32, cflags).unwrap();

        prop_assert_eq!(insn_pcs(&block), starts);
        prop_assert_eq!(block.size, code.len() as u32);
        prop_assert_eq!(block.icount as usize, insns.len() + 1);
        prop_assert_eq!(
            block.provenance.ranges(),
            &[CODE as u64..CODE as u64 + code.len() as u64]
        );
    }

    #[test]
    fn truncated_block_covers_its_prefix(
        insns in prop::collection::vec(insn(false), 2..20),
        limit in 1u32..20,
    ) {
        let mut code: Vec<u8> = insns.iter().flat_map(encode).collect();
        code.extend([0xeb, 0xfe]);
        let limit = limit.min(insns.len() as u32);
        let block = translate(&code, FLAT32, limit).unwrap();
        let len: usize = insns[..limit as usize].iter().map(|i| encode(i).len()).sum();

        prop_assert_eq!(block.icount as u32, limit);
        prop_assert_eq!(block.size, len as u32);
        prop_assert_eq!(block.provenance.len(), len as u64);
    }
}

/// Translate `code` plus a closing `jmp $` both ways and check that
/// each block records exactly its own bytes.
fn covers_exactly(code: &[u8], flags: u32) {
    let mut code = code.to_vec();
    code.extend([0xeb, 0xfe]);
    let range = CODE as u64..CODE as u64 + code.len() as u64;
    for cflags in [0, CF_NO_IMMEDIATES] {
        let block = translate(&code, flags, cflags).unwrap();
        assert_eq!(block.size, code.len() as u32, "cflags {cflags:#x}");
        assert_eq!(block.provenance.ranges(), &[range.clone()], "cflags {cflags:#x}");
    }
}

#[test]
fn sib_disp32_with_imm32_covers_its_bytes() {
    // add dword [eax+ecx*4+0x12345678], 0x11223344
    covers_exactly(
        &[0x81, 0x84, 0x88, 0x78, 0x56, 0x34, 0x12, 0x44, 0x33, 0x22, 0x11],
        FLAT32,
    );
}

#[test]
fn real_mode_disp16_and_moffs_cover_their_bytes() {
    // add word [bp+si+0x1234], 0x5678; mov al, [0x9999]
    covers_exactly(&[0x81, 0x82, 0x34, 0x12, 0x78, 0x56, 0xa0, 0x99, 0x99], REAL);
}

#[test]
fn address_size_prefix_operands_cover_their_bytes() {
    // add word [bp+di-2], 7 (addr16 in 32-bit code); shl byte [esi+8], 3
    covers_exactly(
        &[0x66, 0x67, 0x83, 0x43, 0xfe, 0x07, 0xc0, 0x66, 0x08, 0x03],
        FLAT32,
    );
}
