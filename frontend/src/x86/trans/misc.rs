//! NOP and the direct carry-flag instructions.

use dynarec_core::flags::CF;
use dynarec_core::{ArchSlot, CodeBlock, VReg, Width};

use super::{next, TransResult};
use crate::x86::{Insn, X86DisasContext};

/// NOP (90).
pub fn nop(
    ctx: &mut X86DisasContext<'_>,
    _block: &mut CodeBlock,
    _insn: &Insn,
) -> TransResult {
    next(ctx)
}

/// CLC (F8), STC (F9), CMC (F5).
///
/// All status flags are materialized first, after which CF can be
/// edited in place.
pub fn carry_op(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    ctx.flags.rebuild_all(block);
    let eflags = VReg::arch(ArchSlot::Eflags);
    let ir = &mut block.ir;
    match insn.opcode {
        0xf8 => ir.gen_and(Width::W32, eflags, eflags, !CF),
        0xf9 => ir.gen_or(Width::W32, eflags, eflags, CF),
        _ => ir.gen_xor(Width::W32, eflags, eflags, CF),
    };
    next(ctx)
}
