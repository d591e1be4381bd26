//! Stack pushes and pops.
//!
//! Stack slots are addressed through SS at SP or ESP, as selected by
//! the block's stack size. Values are read or written before the
//! stack pointer moves, so `push esp` stores the old pointer.

use dynarec_core::{ArchSlot, CodeBlock, Operand, SegReg, VReg, Width};

use super::{next, unimplemented_form, TransResult};
use crate::x86::cpu::ESP;
use crate::x86::ea::{decode_ea, fetch_modrm, gpr, load, seg_base, store, write_ea, MemRef};
use crate::x86::width::OpWidth;
use crate::x86::{Insn, X86DisasContext};

/// The stack pointer view for the block's stack size.
fn sp_width(ctx: &X86DisasContext<'_>) -> Width {
    if ctx.stack32 {
        Width::W32
    } else {
        Width::W16
    }
}

/// Stack slot `delta` bytes from the current top.
fn slot(ctx: &X86DisasContext<'_>, block: &mut CodeBlock, delta: u32) -> MemRef {
    let ir = &mut block.ir;
    let addr = ir.new_temp(Width::W32);
    if ctx.stack32 {
        ir.gen_add(Width::W32, addr, gpr(Width::W32, ESP as u8), delta);
    } else {
        let sp = ir.new_temp(Width::W16);
        ir.gen_add(Width::W16, sp, gpr(Width::W16, ESP as u8), delta);
        ir.gen_movzx(Width::W32, addr, sp);
    }
    MemRef {
        seg: SegReg::Ss,
        addr,
    }
}

/// Move the stack pointer by `delta` (two's complement).
pub fn adjust_sp(ctx: &X86DisasContext<'_>, block: &mut CodeBlock, delta: u32) {
    let sw = sp_width(ctx);
    let sp = gpr(sw, ESP as u8);
    block.ir.gen_add(sw, sp, sp, delta & sw.mask());
}

/// Push `val` as a `w`-sized slot.
pub fn push(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    w: Width,
    val: impl Into<Operand>,
) {
    let size = w.bytes();
    let mem = slot(ctx, block, size.wrapping_neg());
    store(ctx, block, mem, w, val);
    adjust_sp(ctx, block, size.wrapping_neg());
}

/// Load the `w`-sized slot at the top of the stack. The stack
/// pointer is left alone.
pub fn peek(ctx: &mut X86DisasContext<'_>, block: &mut CodeBlock, w: Width) -> VReg {
    let mem = slot(ctx, block, 0);
    load(ctx, block, mem, w)
}

/// PUSH reg (50..57).
pub fn push_reg<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    push(ctx, block, W::W, gpr(W::W, insn.opcode & 7));
    next(ctx)
}

/// POP reg (58..5F). Popping into the stack pointer keeps the
/// popped value.
pub fn pop_reg<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let reg = insn.opcode & 7;
    let v = peek(ctx, block, W::W);
    if reg != ESP as u8 {
        adjust_sp(ctx, block, W::W.bytes());
    }
    block.ir.gen_mov(W::W, gpr(W::W, reg), v);
    next(ctx)
}

/// PUSH imm16/imm32 (68) and PUSH imm8 sign-extended (6A).
pub fn push_imm<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let imm = if insn.opcode == 0x6a {
        ctx.fetch_imm_sx8(block, W::W)?
    } else {
        ctx.fetch_imm(block, W::W)?
    };
    push(ctx, block, W::W, imm);
    next(ctx)
}

/// POP r/m (8F /0). The destination address is formed with the
/// stack pointer as it was before the pop.
pub fn pop_rm<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    if m.reg != 0 {
        return unimplemented_form(ctx, insn);
    }
    let ea = decode_ea(ctx, block, insn, m)?;
    let v = peek(ctx, block, W::W);
    write_ea(ctx, block, ea, W::W, v);
    if !(m.is_reg() && m.rm == ESP as u8) {
        adjust_sp(ctx, block, W::W.bytes());
    }
    next(ctx)
}

/// Segment register of PUSH/POP ES, CS, SS, DS (06/07, 0E, 16/17,
/// 1E/1F).
fn stack_seg(opcode: u8) -> SegReg {
    SegReg::ALL[((opcode >> 3) & 3) as usize]
}

/// PUSH ES/CS/SS/DS. A 32-bit push stores the selector zero-extended.
pub fn push_seg<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let sel = VReg::arch(ArchSlot::SegSel(stack_seg(insn.opcode)));
    if W::W == Width::W16 {
        push(ctx, block, Width::W16, sel);
    } else {
        let t = block.ir.new_temp(Width::W32);
        block.ir.gen_movzx(Width::W32, t, sel);
        push(ctx, block, Width::W32, t);
    }
    next(ctx)
}

/// POP ES/SS/DS.
///
/// Only real and V86 mode are translated, where the new base is the
/// selector shifted left by four. Protected mode needs a descriptor
/// load.
pub fn pop_seg<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    if ctx.protected {
        return unimplemented_form(ctx, insn);
    }
    let seg = stack_seg(insn.opcode);
    let v = peek(ctx, block, W::W);
    adjust_sp(ctx, block, W::W.bytes());
    let ir = &mut block.ir;
    let sel = VReg::arch(ArchSlot::SegSel(seg));
    ir.gen_mov(Width::W16, sel, v);
    let t = ir.new_temp(Width::W32);
    ir.gen_movzx(Width::W32, t, sel);
    ir.gen_shl(Width::W32, seg_base(seg), t, 4u32);
    next(ctx)
}
