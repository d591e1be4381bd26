//! Control transfer: JMP, CALL, RET, Jcc, JCXZ and the LOOP family.
//!
//! Only unconditional transfers end the block. Conditional forms
//! emit a conditional exit and fall through.

use dynarec_core::{CodeBlock, Cond, Operand, Width};

use super::stack::{adjust_sp, peek, push};
use super::{branch_target, next, Flow, TransResult};
use crate::x86::ea::gpr;
use crate::x86::lazy_flags::{Flag, Predicate};
use crate::x86::width::OpWidth;
use crate::x86::{Insn, X86DisasContext};

/// JMP rel8 (EB).
pub fn jmp_rel8(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let rel = ctx.fetch_rel(Width::W8)?;
    let target = branch_target(insn, ctx.cur_pc(), rel);
    block.ir.gen_exit(target);
    Ok(Flow::End)
}

/// JMP rel16/rel32 (E9).
pub fn jmp_rel<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let rel = ctx.fetch_rel(W::W)?;
    let target = branch_target(insn, ctx.cur_pc(), rel);
    block.ir.gen_exit(target);
    Ok(Flow::End)
}

/// Push the address of the next instruction and leave the block
/// for `target`.
pub fn gen_call_near(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
    target: impl Into<Operand>,
) -> TransResult {
    let w = insn.op_width();
    let ret = ctx.cur_pc();
    push(ctx, block, w, ret & w.mask());
    block.ir.gen_exit(target);
    Ok(Flow::End)
}

/// CALL rel16/rel32 (E8).
pub fn call_rel<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let rel = ctx.fetch_rel(W::W)?;
    let target = branch_target(insn, ctx.cur_pc(), rel);
    gen_call_near(ctx, block, insn, target)
}

/// Near RET (C3) and RET imm16 (C2), which also releases `imm16`
/// bytes of arguments. The immediate is folded like a branch
/// displacement.
pub fn ret_near<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let extra = if insn.opcode == 0xc2 {
        ctx.fetch_rel(Width::W16)? & 0xffff
    } else {
        0
    };
    let target = peek(ctx, block, W::W);
    adjust_sp(ctx, block, W::W.bytes().wrapping_add(extra));
    block.ir.gen_exit(target);
    Ok(Flow::End)
}

fn gen_jcc(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
    rel: u32,
) -> TransResult {
    let target = branch_target(insn, ctx.cur_pc(), rel);
    let taken = ctx.flags.cond(block, insn.opcode & 0xf);
    taken.gen_exit_if(&mut block.ir, target);
    next(ctx)
}

/// Jcc rel8 (70..7F).
pub fn jcc_rel8(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let rel = ctx.fetch_rel(Width::W8)?;
    gen_jcc(ctx, block, insn, rel)
}

/// Jcc rel16/rel32 (0F 80..8F).
pub fn jcc_rel<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let rel = ctx.fetch_rel(W::W)?;
    gen_jcc(ctx, block, insn, rel)
}

/// LOOPNE (E0), LOOPE (E1), LOOP (E2) and JCXZ/JECXZ (E3). The
/// counter is CX or ECX by address size.
pub fn loop_family(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let rel = ctx.fetch_rel(Width::W8)?;
    let target = branch_target(insn, ctx.cur_pc(), rel);
    let aw = insn.addr_width();
    let counter = gpr(aw, 1);

    if insn.opcode == 0xe3 {
        block.ir.gen_exit_if(aw, Cond::Eq, counter, 0u32, target);
        return next(ctx);
    }

    block.ir.gen_sub(aw, counter, counter, 1u32);
    let nonzero = Predicate::Cmp {
        cond: Cond::Ne,
        w: aw,
        a: Operand::Reg(counter),
        b: Operand::Imm(0),
    };
    let taken = match insn.opcode {
        0xe0 => {
            let zf = ctx.flags.flag(block, Flag::Zf);
            nonzero.and(zf.not(), &mut block.ir)
        }
        0xe1 => {
            let zf = ctx.flags.flag(block, Flag::Zf);
            nonzero.and(zf, &mut block.ir)
        }
        _ => nonzero,
    };
    taken.gen_exit_if(&mut block.ir, target);
    next(ctx)
}
