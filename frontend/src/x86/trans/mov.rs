//! Data movement that needs no flags: MOV, LEA, MOVZX/MOVSX and
//! XCHG.

use dynarec_core::{ArchSlot, CodeBlock, VReg, Width};

use super::{next, unimplemented_form, TransResult};
use crate::x86::ea::{
    decode_ea, decode_moffs, fetch_modrm, gpr, load, read_ea, store, write_ea, Ea,
};
use crate::x86::width::OpWidth;
use crate::x86::{Insn, X86DisasContext};

/// MOV r/m, reg (88, 89).
pub fn mov_rm_r<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    let ea = decode_ea(ctx, block, insn, m)?;
    write_ea(ctx, block, ea, W::W, gpr(W::W, m.reg));
    next(ctx)
}

/// MOV reg, r/m (8A, 8B).
pub fn mov_r_rm<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    let ea = decode_ea(ctx, block, insn, m)?;
    let v = read_ea(ctx, block, ea, W::W);
    block.ir.gen_mov(W::W, gpr(W::W, m.reg), v);
    next(ctx)
}

/// MOV AL/AX/EAX, moffs (A0, A1).
pub fn mov_acc_moffs<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let mem = decode_moffs(ctx, block, insn)?;
    let v = load(ctx, block, mem, W::W);
    block.ir.gen_mov(W::W, gpr(W::W, 0), v);
    next(ctx)
}

/// MOV moffs, AL/AX/EAX (A2, A3).
pub fn mov_moffs_acc<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let mem = decode_moffs(ctx, block, insn)?;
    store(ctx, block, mem, W::W, gpr(W::W, 0));
    next(ctx)
}

/// MOV reg, imm (B0..BF).
pub fn mov_r_imm<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let imm = ctx.fetch_imm(block, W::W)?;
    block
        .ir
        .gen_mov_operand(W::W, gpr(W::W, insn.opcode & 7), imm);
    next(ctx)
}

/// MOV r/m, imm (C6 /0, C7 /0).
pub fn mov_rm_imm<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    if m.reg != 0 {
        return unimplemented_form(ctx, insn);
    }
    let ea = decode_ea(ctx, block, insn, m)?;
    let imm = ctx.fetch_imm(block, W::W)?;
    write_ea(ctx, block, ea, W::W, imm);
    next(ctx)
}

/// LEA reg, m (8D). Only the offset is computed; no segment is
/// touched.
pub fn lea<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    if m.is_reg() {
        return unimplemented_form(ctx, insn);
    }
    decode_ea(ctx, block, insn, m)?;
    block
        .ir
        .gen_mov(W::W, gpr(W::W, m.reg), VReg::arch(ArchSlot::EaAddr));
    next(ctx)
}

/// MOVZX (0F B6, B7) and MOVSX (0F BE, BF). Bit 0 of the opcode
/// selects a 16-bit source, bit 3 sign extension.
pub fn movx<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    let ea = decode_ea(ctx, block, insn, m)?;
    let sw = if insn.opcode & 1 != 0 {
        Width::W16
    } else {
        Width::W8
    };
    let v = read_ea(ctx, block, ea, sw);
    let dst = gpr(W::W, m.reg);
    if insn.opcode & 8 != 0 {
        block.ir.gen_movsx(W::W, dst, v);
    } else {
        block.ir.gen_movzx(W::W, dst, v);
    }
    next(ctx)
}

fn gen_xchg(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    w: Width,
    ea: Ea,
    reg: u8,
) {
    let v = read_ea(ctx, block, ea, w);
    let old = match ea {
        Ea::Reg(_) => {
            let t = block.ir.new_temp(w);
            block.ir.gen_mov(w, t, v)
        }
        Ea::Mem(_) => v,
    };
    write_ea(ctx, block, ea, w, gpr(w, reg));
    block.ir.gen_mov(w, gpr(w, reg), old);
}

/// XCHG r/m, reg (86, 87).
pub fn xchg_rm_r<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    let ea = decode_ea(ctx, block, insn, m)?;
    gen_xchg(ctx, block, W::W, ea, m.reg);
    next(ctx)
}

/// XCHG AX/EAX, reg (91..97).
pub fn xchg_acc<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    gen_xchg(ctx, block, W::W, Ea::Reg(insn.opcode & 7), 0);
    next(ctx)
}
