//! Human-readable text output for block IR.

use std::io::Write;

use crate::context::Context;
use crate::helper::Helper;
use crate::op::{Op, Operand};
use crate::opcode::Opcode;
use crate::types::Cond;
use crate::vreg::VRegKind;

fn cond_name(c: u32) -> &'static str {
    Cond::from_raw(c).map_or("???", Cond::name)
}

fn helper_name(h: u32) -> &'static str {
    Helper::from_raw(h).map_or("???", Helper::name)
}

/// Format an operand for display.
fn fmt_operand(ctx: &Context, a: Operand, buf: &mut String) {
    use std::fmt::Write as FmtWrite;
    let vreg = match a {
        Operand::Imm(v) => {
            let _ = write!(buf, "$0x{v:x}");
            return;
        }
        Operand::Reg(r) => r,
    };
    let i = vreg.0 as usize;
    if i >= ctx.nb_vregs() as usize {
        let _ = write!(buf, "v{i}?");
        return;
    }
    let v = ctx.vreg(vreg);
    match v.kind {
        VRegKind::Arch(slot) => buf.push_str(slot.name()),
        VRegKind::Temp => {
            let local = vreg.0 - ctx.nb_arch();
            let _ = write!(buf, "tmp{local}");
        }
    }
}

/// Build the opcode name with width suffix.
fn op_name(op: &Op) -> String {
    let base = op.opc.name();
    match op.opc {
        Opcode::Call
        | Opcode::CallRet
        | Opcode::Exit
        | Opcode::InsnStart => base.to_string(),
        _ => format!("{base}{}", op.width.suffix()),
    }
}

/// Dump all IR ops in `ctx` to the given writer.
pub fn dump_ops(ctx: &Context, w: &mut impl Write) -> std::io::Result<()> {
    dump_ops_with(ctx, w, |_, _| Ok(()))
}

/// Dump IR ops with an annotation callback for `InsnStart`.
///
/// `insn_anno` is called at each guest instruction boundary with
/// `(pc, writer)`; use it to print source instruction bytes on the
/// `---- 0x...` header line.
pub fn dump_ops_with(
    ctx: &Context,
    w: &mut impl Write,
    insn_anno: impl Fn(u32, &mut dyn Write) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let mut buf = String::with_capacity(128);

    for op in ctx.ops() {
        if op.opc == Opcode::InsnStart {
            let pc = op.carg(0);
            write!(w, " ---- 0x{pc:08x}")?;
            insn_anno(pc, w)?;
            writeln!(w)?;
            continue;
        }

        let name = op_name(op);
        write!(w, " {name}")?;

        let mut first = true;
        for &a in op.oargs().iter().chain(op.iargs()) {
            if !first {
                write!(w, ",")?;
            }
            first = false;
            buf.clear();
            fmt_operand(ctx, a, &mut buf);
            write!(w, " {buf}")?;
        }

        let sep = if first { " " } else { ", " };
        match op.opc {
            Opcode::SetCond => {
                write!(w, "{sep}{}", cond_name(op.carg(0)))?;
            }
            Opcode::CallIf => {
                let cond = cond_name(op.carg(0));
                let helper = helper_name(op.carg(1));
                write!(w, "{sep}{cond}, {helper}")?;
            }
            Opcode::ExitIf => {
                let cond = cond_name(op.carg(0));
                let pc = op.carg(1);
                write!(w, "{sep}{cond}, pc=0x{pc:x}")?;
            }
            Opcode::Call | Opcode::CallRet => {
                write!(w, "{sep}{}", helper_name(op.carg(0)))?;
            }
            _ => {
                for (i, c) in op.cargs().iter().enumerate() {
                    let s = if i == 0 { sep } else { ", " };
                    buf.clear();
                    fmt_operand(ctx, *c, &mut buf);
                    write!(w, "{s}{buf}")?;
                }
            }
        }

        writeln!(w)?;
    }
    Ok(())
}

/// Dump IR into a `String`.
pub fn dump_to_string(ctx: &Context) -> String {
    let mut out = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = dump_ops(ctx, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}
