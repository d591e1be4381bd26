//! Two-operand integer arithmetic and logic: the 00..3F block, the
//! 80..83 immediate group, TEST, and the F6/F7 unary group.

use dynarec_core::flags::{FlagsFamily, FlagsOp};
use dynarec_core::{CodeBlock, Operand, VReg, Width};

use super::{next, unimplemented_form, TransResult};
use crate::x86::ea::{decode_ea, fetch_modrm, gpr, read_ea, write_ea};
use crate::x86::width::OpWidth;
use crate::x86::{Insn, X86DisasContext};

/// ALU operation, in x86 encoding order (`opcode >> 3` for 00..3F,
/// ModRM.reg for the 80..83 group).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Or,
    Adc,
    Sbb,
    And,
    Sub,
    Xor,
    Cmp,
}

impl AluOp {
    pub const fn from_bits(bits: u8) -> AluOp {
        match bits & 7 {
            0 => AluOp::Add,
            1 => AluOp::Or,
            2 => AluOp::Adc,
            3 => AluOp::Sbb,
            4 => AluOp::And,
            5 => AluOp::Sub,
            6 => AluOp::Xor,
            _ => AluOp::Cmp,
        }
    }

    /// CMP only defines flags.
    pub const fn writes_back(self) -> bool {
        !matches!(self, AluOp::Cmp)
    }
}

/// Emit `a <op> b` into a fresh temp and record the flags it defines.
///
/// Must run before the result is written back: the flags record
/// snapshots `a`, which may be the destination register.
pub fn gen_alu(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    op: AluOp,
    w: Width,
    a: VReg,
    b: Operand,
) -> VReg {
    let res = block.ir.new_temp(w);
    let (fam, carry_in) = match op {
        AluOp::Add => (FlagsFamily::Add, None),
        AluOp::Adc => (FlagsFamily::Adc, Some(ctx.flags.carry(block))),
        AluOp::Sub | AluOp::Cmp => (FlagsFamily::Sub, None),
        AluOp::Sbb => (FlagsFamily::Sbb, Some(ctx.flags.carry(block))),
        AluOp::And | AluOp::Or | AluOp::Xor => {
            match op {
                AluOp::And => block.ir.gen_and(w, res, a, b),
                AluOp::Or => block.ir.gen_or(w, res, a, b),
                _ => block.ir.gen_xor(w, res, a, b),
            };
            ctx.flags.set_zn(block, w, res);
            return res;
        }
    };

    let ir = &mut block.ir;
    match (op, carry_in) {
        (AluOp::Adc, Some(c)) => {
            let t = ir.new_temp(w);
            ir.gen_add(w, t, a, b);
            ir.gen_add(w, res, t, c);
        }
        (AluOp::Sbb, Some(c)) => {
            let t = ir.new_temp(w);
            ir.gen_sub(w, t, a, b);
            ir.gen_sub(w, res, t, c);
        }
        (AluOp::Add, _) => {
            ir.gen_add(w, res, a, b);
        }
        _ => {
            ir.gen_sub(w, res, a, b);
        }
    }
    ctx.flags
        .set(block, FlagsOp::new(fam, w), Operand::Reg(a), b, res);
    res
}

/// `op r/m, reg` (00, 01, 08, 09 ... 38, 39).
pub fn alu_rm_r<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let op = AluOp::from_bits(insn.opcode >> 3);
    let m = fetch_modrm(ctx)?;
    let ea = decode_ea(ctx, block, insn, m)?;
    let a = read_ea(ctx, block, ea, W::W);
    let res = gen_alu(ctx, block, op, W::W, a, Operand::Reg(gpr(W::W, m.reg)));
    if op.writes_back() {
        write_ea(ctx, block, ea, W::W, res);
    }
    next(ctx)
}

/// `op reg, r/m` (02, 03, 0A, 0B ... 3A, 3B).
pub fn alu_r_rm<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let op = AluOp::from_bits(insn.opcode >> 3);
    let m = fetch_modrm(ctx)?;
    let ea = decode_ea(ctx, block, insn, m)?;
    let b = read_ea(ctx, block, ea, W::W);
    let dst = gpr(W::W, m.reg);
    let res = gen_alu(ctx, block, op, W::W, dst, Operand::Reg(b));
    if op.writes_back() {
        block.ir.gen_mov(W::W, dst, res);
    }
    next(ctx)
}

/// `op AL/AX/EAX, imm` (04, 05, 0C, 0D ... 3C, 3D).
pub fn alu_acc_imm<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let op = AluOp::from_bits(insn.opcode >> 3);
    let imm = ctx.fetch_imm(block, W::W)?;
    let acc = gpr(W::W, 0);
    let res = gen_alu(ctx, block, op, W::W, acc, imm);
    if op.writes_back() {
        block.ir.gen_mov(W::W, acc, res);
    }
    next(ctx)
}

/// Immediate group 80, 81, 82, 83. `83` sign-extends an 8-bit
/// immediate; `82` is an alias of `80`.
pub fn group1<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    let op = AluOp::from_bits(m.reg);
    let ea = decode_ea(ctx, block, insn, m)?;
    let a = read_ea(ctx, block, ea, W::W);
    let imm = if insn.opcode == 0x83 {
        ctx.fetch_imm_sx8(block, W::W)?
    } else {
        ctx.fetch_imm(block, W::W)?
    };
    let res = gen_alu(ctx, block, op, W::W, a, imm);
    if op.writes_back() {
        write_ea(ctx, block, ea, W::W, res);
    }
    next(ctx)
}

fn gen_test(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    w: Width,
    a: VReg,
    b: Operand,
) {
    let res = block.ir.new_temp(w);
    block.ir.gen_and(w, res, a, b);
    ctx.flags.set_zn(block, w, res);
}

/// TEST r/m, reg (84, 85).
pub fn test_rm_r<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    let ea = decode_ea(ctx, block, insn, m)?;
    let a = read_ea(ctx, block, ea, W::W);
    gen_test(ctx, block, W::W, a, Operand::Reg(gpr(W::W, m.reg)));
    next(ctx)
}

/// TEST AL/AX/EAX, imm (A8, A9).
pub fn test_acc_imm<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    _insn: &Insn,
) -> TransResult {
    let imm = ctx.fetch_imm(block, W::W)?;
    gen_test(ctx, block, W::W, gpr(W::W, 0), imm);
    next(ctx)
}

/// Unary group F6, F7: TEST imm, NOT, NEG. MUL/IMUL/DIV/IDIV have no
/// translator.
pub fn group3<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let w = W::W;
    let m = fetch_modrm(ctx)?;
    if m.reg >= 4 {
        return unimplemented_form(ctx, insn);
    }
    let ea = decode_ea(ctx, block, insn, m)?;
    let a = read_ea(ctx, block, ea, w);
    match m.reg {
        0 | 1 => {
            let imm = ctx.fetch_imm(block, w)?;
            gen_test(ctx, block, w, a, imm);
        }
        2 => {
            let res = block.ir.new_temp(w);
            block.ir.gen_xor(w, res, a, w.mask());
            write_ea(ctx, block, ea, w, res);
        }
        _ => {
            // NEG is 0 - x with SUB flags.
            let res = block.ir.new_temp(w);
            block.ir.gen_sub(w, res, 0u32, a);
            let op = FlagsOp::new(FlagsFamily::Sub, w);
            ctx.flags
                .set(block, op, Operand::Imm(0), Operand::Reg(a), res);
            write_ea(ctx, block, ea, w, res);
        }
    }
    next(ctx)
}
