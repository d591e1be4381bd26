//! INC/DEC and the FE/FF groups.

use dynarec_core::flags::{FlagsFamily, FlagsOp};
use dynarec_core::{CodeBlock, Operand, VReg, Width};

use super::branch::gen_call_near;
use super::stack::push;
use super::{next, unimplemented_form, Flow, TransResult};
use crate::x86::ea::{decode_ea, fetch_modrm, read_ea, write_ea, Ea};
use crate::x86::width::{Byte, OpWidth};
use crate::x86::{Insn, X86DisasContext};

/// INC/DEC of `a` into a fresh temp.
///
/// Carry is not defined by INC/DEC, so it is made durable in EFLAGS
/// first unless the previous record already keeps it there.
fn gen_inc_dec(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    w: Width,
    a: VReg,
    dec: bool,
) -> VReg {
    ctx.flags.rebuild_carry(block);
    let res = block.ir.new_temp(w);
    let fam = if dec {
        block.ir.gen_sub(w, res, a, 1u32);
        FlagsFamily::Dec
    } else {
        block.ir.gen_add(w, res, a, 1u32);
        FlagsFamily::Inc
    };
    ctx.flags.set(
        block,
        FlagsOp::new(fam, w),
        Operand::Reg(a),
        Operand::Imm(1),
        res,
    );
    res
}

fn inc_dec_ea(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    ea: Ea,
    w: Width,
    dec: bool,
) {
    let a = read_ea(ctx, block, ea, w);
    let res = gen_inc_dec(ctx, block, w, a, dec);
    write_ea(ctx, block, ea, w, res);
}

/// INC reg (40..47) and DEC reg (48..4F).
pub fn inc_dec_reg<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let dec = insn.opcode & 8 != 0;
    inc_dec_ea(ctx, block, Ea::Reg(insn.opcode & 7), W::W, dec);
    next(ctx)
}

/// Group FE: INC/DEC r/m8.
pub fn group4(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    if m.reg > 1 {
        return unimplemented_form(ctx, insn);
    }
    let ea = decode_ea(ctx, block, insn, m)?;
    inc_dec_ea(ctx, block, ea, Byte::W, m.reg == 1);
    next(ctx)
}

/// Group FF: INC/DEC r/m, near indirect CALL and JMP, and PUSH r/m.
/// Far forms have no translator.
pub fn group5<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    match m.reg {
        0 | 1 => {
            let ea = decode_ea(ctx, block, insn, m)?;
            inc_dec_ea(ctx, block, ea, W::W, m.reg == 1);
            next(ctx)
        }
        2 => {
            let ea = decode_ea(ctx, block, insn, m)?;
            let v = read_ea(ctx, block, ea, W::W);
            // The push may change the register the target came from.
            let target = block.ir.new_temp(W::W);
            block.ir.gen_mov(W::W, target, v);
            gen_call_near(ctx, block, insn, target)
        }
        4 => {
            let ea = decode_ea(ctx, block, insn, m)?;
            let target = read_ea(ctx, block, ea, W::W);
            block.ir.gen_exit(target);
            Ok(Flow::End)
        }
        6 => {
            let ea = decode_ea(ctx, block, insn, m)?;
            let v = read_ea(ctx, block, ea, W::W);
            push(ctx, block, W::W, v);
            next(ctx)
        }
        _ => unimplemented_form(ctx, insn),
    }
}
