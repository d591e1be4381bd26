//! Shift and rotate groups C0/C1, D0/D1 and D2/D3.
//!
//! Counts are masked to five bits. A count known to be zero changes
//! nothing and emits nothing; a count only known at run time goes
//! through `FlagsTracker::set_counted`, which keeps the old flags
//! when it turns out to be zero.

use dynarec_core::flags::{FlagsFamily, FlagsOp};
use dynarec_core::{CodeBlock, Context, Operand, VReg, Width};

use super::{next, unimplemented_form, TransResult};
use crate::x86::cpu::ECX;
use crate::x86::ea::{decode_ea, fetch_modrm, gpr, read_ea, write_ea};
use crate::x86::width::OpWidth;
use crate::x86::{Insn, X86DisasContext};

/// Group member selected by ModRM.reg. RCL (/2) and RCR (/3) have no
/// translator; /6 is an alias of SHL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Rol,
    Ror,
    Shl,
    Shr,
    Sar,
}

impl ShiftOp {
    pub const fn from_reg(reg: u8) -> Option<ShiftOp> {
        match reg & 7 {
            0 => Some(ShiftOp::Rol),
            1 => Some(ShiftOp::Ror),
            4 | 6 => Some(ShiftOp::Shl),
            5 => Some(ShiftOp::Shr),
            7 => Some(ShiftOp::Sar),
            _ => None,
        }
    }

    const fn family(self) -> FlagsFamily {
        match self {
            ShiftOp::Rol => FlagsFamily::Rol,
            ShiftOp::Ror => FlagsFamily::Ror,
            ShiftOp::Shl => FlagsFamily::Shl,
            ShiftOp::Shr => FlagsFamily::Shr,
            ShiftOp::Sar => FlagsFamily::Sar,
        }
    }

    fn emit(self, ir: &mut Context, w: Width, d: VReg, a: VReg, n: Operand) {
        match self {
            ShiftOp::Rol => ir.gen_rol(w, d, a, n),
            ShiftOp::Ror => ir.gen_ror(w, d, a, n),
            ShiftOp::Shl => ir.gen_shl(w, d, a, n),
            ShiftOp::Shr => ir.gen_shr(w, d, a, n),
            ShiftOp::Sar => ir.gen_sar(w, d, a, n),
        };
    }
}

#[derive(Debug, Clone, Copy)]
enum CountSrc {
    One,
    Imm8,
    Cl,
}

fn gen_shift_group(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
    w: Width,
    src: CountSrc,
) -> TransResult {
    let m = fetch_modrm(ctx)?;
    let Some(op) = ShiftOp::from_reg(m.reg) else {
        return unimplemented_form(ctx, insn);
    };
    let ea = decode_ea(ctx, block, insn, m)?;
    let count = match src {
        CountSrc::One => Operand::Imm(1),
        CountSrc::Imm8 => ctx.fetch_imm(block, Width::W8)?,
        CountSrc::Cl => Operand::Reg(gpr(Width::W8, ECX as u8)),
    };
    let kind = FlagsOp::new(op.family(), w);

    match count {
        Operand::Imm(c) => {
            let c = c & 0x1f;
            if c == 0 {
                return next(ctx);
            }
            if kind.is_rotate() {
                ctx.flags.rebuild_all(block);
            }
            let a = read_ea(ctx, block, ea, w);
            let res = block.ir.new_temp(w);
            op.emit(&mut block.ir, w, res, a, Operand::Imm(c));
            ctx.flags
                .set(block, kind, Operand::Reg(a), Operand::Imm(c), res);
            write_ea(ctx, block, ea, w, res);
        }
        Operand::Reg(r) => {
            let a = read_ea(ctx, block, ea, w);
            let ir = &mut block.ir;
            let n = ir.new_temp(Width::W32);
            ir.gen_movzx(Width::W32, n, r);
            ir.gen_and(Width::W32, n, n, 0x1fu32);
            let res = ir.new_temp(w);
            op.emit(ir, w, res, a, Operand::Reg(n));
            ctx.flags.set_counted(block, kind, a, n, res);
            write_ea(ctx, block, ea, w, res);
        }
    }
    next(ctx)
}

/// Shift group by imm8 (C0, C1).
pub fn shift_imm<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    gen_shift_group(ctx, block, insn, W::W, CountSrc::Imm8)
}

/// Shift group by one (D0, D1).
pub fn shift_one<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    gen_shift_group(ctx, block, insn, W::W, CountSrc::One)
}

/// Shift group by CL (D2, D3).
pub fn shift_cl<W: OpWidth>(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> TransResult {
    gen_shift_group(ctx, block, insn, W::W, CountSrc::Cl)
}
