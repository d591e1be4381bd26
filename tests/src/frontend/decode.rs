use dynarec_core::{Opcode, Operand};
use dynarec_frontend::x86::dispatch::TABLES;
use dynarec_frontend::{OpcodeMap, TranslateError};

use crate::harness::{insn_pcs, translate, translate32, CODE, FLAT32, PROT16};

fn last_exit_target(ops: &[dynarec_core::Op]) -> Option<Operand> {
    let op = ops.last()?;
    (op.opc == Opcode::Exit).then(|| op.iargs()[0])
}

#[test]
fn straight_line_block() {
    // mov eax, 1; add eax, ebx; jmp +0x10; hlt
    let code = [0xb8, 1, 0, 0, 0, 0x01, 0xd8, 0xeb, 0x10, 0xf4];
    let block = translate32(&code);
    assert_eq!(insn_pcs(&block), vec![CODE, CODE + 5, CODE + 7]);
    assert_eq!(block.icount, 3);
    assert_eq!(block.size, 9);
    assert_eq!(block.provenance.ranges(), &[CODE as u64..CODE as u64 + 9]);
    assert_eq!(
        last_exit_target(block.ir.ops()),
        Some(Operand::Imm(CODE + 9 + 0x10))
    );
}

#[test]
fn jcc_falls_through() {
    // jz +2; nop; nop; jmp $
    let block = translate32(&[0x74, 0x02, 0x90, 0x90, 0xeb, 0xfe]);
    assert_eq!(insn_pcs(&block), vec![CODE, CODE + 2, CODE + 3, CODE + 4]);
    let exit_if = block
        .ir
        .ops()
        .iter()
        .find(|op| op.opc == Opcode::ExitIf)
        .unwrap();
    assert_eq!(exit_if.carg(1), CODE + 4);
    assert_eq!(last_exit_target(block.ir.ops()), Some(Operand::Imm(CODE + 4)));
}

#[test]
fn unimplemented_at_block_start() {
    let err = translate(&[0x0f, 0x0b], FLAT32, 0).unwrap_err();
    assert_eq!(
        err,
        TranslateError::Unimplemented {
            pc: CODE,
            opcode: 0x0b,
            map: OpcodeMap::Map0F,
            insn_index: 0,
        }
    );
}

#[test]
fn unimplemented_reports_index() {
    let err = translate(&[0x90, 0x90, 0xf4], FLAT32, 0).unwrap_err();
    assert_eq!(err.pc(), CODE + 2);
    assert_eq!(err.insn_index(), 2);
    assert!(matches!(
        err,
        TranslateError::Unimplemented { opcode: 0xf4, map: OpcodeMap::Base, .. }
    ));
}

#[test]
fn rep_prefix_is_unimplemented() {
    let err = translate(&[0xf3, 0xa4], FLAT32, 0).unwrap_err();
    assert!(matches!(
        err,
        TranslateError::Unimplemented { opcode: 0xf3, pc: CODE, .. }
    ));
}

#[test]
fn fpu_reports_modrm() {
    // fld1
    let err = translate(&[0xd9, 0xe8], FLAT32, 0).unwrap_err();
    assert!(matches!(
        err,
        TranslateError::Unimplemented { opcode: 0xe8, map: OpcodeMap::Fpu(0xd9), .. }
    ));
}

#[test]
fn lock_is_ignored() {
    let block = translate32(&[0xf0, 0x90, 0xeb, 0xfe]);
    assert_eq!(insn_pcs(&block), vec![CODE, CODE + 2]);
}

#[test]
fn fifteen_bytes_is_legal() {
    let mut code = vec![0x66; 14];
    code.extend([0x90, 0xeb, 0xfe]);
    let block = translate32(&code);
    assert_eq!(insn_pcs(&block), vec![CODE, CODE + 15]);
    assert_eq!(block.size, 17);
}

#[test]
fn sixteen_bytes_is_too_long() {
    let mut code = vec![0x66; 15];
    code.push(0x90);
    let err = translate(&code, FLAT32, 0).unwrap_err();
    assert_eq!(err, TranslateError::InsnTooLong { pc: CODE, insn_index: 0 });
}

#[test]
fn insn_limit_from_cflags() {
    let block = translate(&[0x90; 8], FLAT32, 2).unwrap();
    assert_eq!(block.icount, 2);
    assert_eq!(block.size, 2);
    assert_eq!(last_exit_target(block.ir.ops()), Some(Operand::Imm(CODE + 2)));
}

#[test]
fn default_insn_limit() {
    let block = translate32(&[0x90; 64]);
    assert_eq!(block.icount, 50);
    assert_eq!(block.size, 50);
}

#[test]
fn operand_size_prefix_in_16bit_code() {
    // mov ax, 0x1234; mov eax, 0x12345678; jmp $
    let code = [0xb8, 0x34, 0x12, 0x66, 0xb8, 0x78, 0x56, 0x34, 0x12, 0xeb, 0xfe];
    let block = translate(&code, PROT16, 0).unwrap();
    assert_eq!(insn_pcs(&block), vec![CODE, CODE + 3, CODE + 9]);
}

#[test]
fn branch_target_wraps_in_16bit_code() {
    // jmp rel16 -0x1000 from 0x1003 lands on 0x0003.
    let block = translate(&[0xe9, 0x00, 0xf0], PROT16, 0).unwrap();
    assert_eq!(last_exit_target(block.ir.ops()), Some(Operand::Imm(0x0003)));
}

#[test]
fn indirect_jmp_ends_block() {
    // jmp eax; nop
    let block = translate32(&[0xff, 0xe0, 0x90]);
    assert_eq!(block.icount, 1);
    let op = block.ir.ops().last().unwrap();
    assert_eq!(op.opc, Opcode::Exit);
    assert!(op.iargs()[0].reg().is_some());
}

#[test]
fn dispatch_tables_cover_both_sizes() {
    for op32 in 0..2 {
        for op in [
            0x00, 0x06, 0x1f, 0x3d, 0x40, 0x53, 0x5e, 0x6a, 0x75, 0x83, 0x87, 0x8b, 0x8d,
            0x8f, 0x93, 0xb8, 0xc1, 0xc3, 0xd3, 0xe2, 0xe8, 0xeb, 0xff,
        ] {
            assert!(TABLES.base[op32][op].is_implemented(), "{op:#x}");
        }
        for op in [0x0f, 0x27, 0x9c, 0xca, 0xcd, 0xf4] {
            assert!(!TABLES.base[op32][op].is_implemented(), "{op:#x}");
        }
        assert!(TABLES.map_0f[op32][0x84].is_implemented());
        assert!(TABLES.map_0f[op32][0xbe].is_implemented());
    }
    // Base map: 128 ALU/MOV/branch entries plus 45 stack, shift,
    // call/ret, LEA and XCHG entries. 0F map: Jcc plus MOVZX/MOVSX.
    assert_eq!(TABLES.implemented(), 2 * 173 + 2 * 20);
}
