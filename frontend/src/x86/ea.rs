//! ModRM decoding and effective-address resolution.
//!
//! Memory operands compute their offset into the `eaaddr`
//! architectural vreg; register operands resolve to the register view
//! of the operand width. Segment checks are emitted here, at the point
//! of the actual access.

use dynarec_core::{ArchSlot, CodeBlock, Context, Operand, SegReg, VReg, Width};

use super::cpu::{EBP, ESP};
use super::{Insn, X86DisasContext};
use crate::TranslateError;

/// A decoded ModRM byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm {
    pub md: u8,
    pub reg: u8,
    pub rm: u8,
}

impl ModRm {
    pub fn from_byte(b: u8) -> Self {
        Self {
            md: b >> 6,
            reg: (b >> 3) & 7,
            rm: b & 7,
        }
    }

    /// Register-direct form (mod == 3).
    pub fn is_reg(&self) -> bool {
        self.md == 3
    }
}

/// A memory operand: offset in `eaaddr`, relative to `seg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRef {
    pub seg: SegReg,
    pub addr: VReg,
}

/// A resolved r/m operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ea {
    Reg(u8),
    Mem(MemRef),
}

/// The architectural vreg holding `seg`'s base.
pub fn seg_base(seg: SegReg) -> VReg {
    VReg::arch(ArchSlot::SegBase(seg))
}

/// The register view selected by `reg` at width `w`.
pub fn gpr(w: Width, reg: u8) -> VReg {
    VReg::arch(ArchSlot::gpr(w, reg))
}

fn eaaddr() -> VReg {
    VReg::arch(ArchSlot::EaAddr)
}

pub fn fetch_modrm(ctx: &mut X86DisasContext<'_>) -> Result<ModRm, TranslateError> {
    Ok(ModRm::from_byte(ctx.fetch_u8()?))
}

/// Sums address terms into `eaaddr`, first term by move.
struct EaSum {
    started: bool,
}

impl EaSum {
    fn new() -> Self {
        Self { started: false }
    }

    fn add(&mut self, ir: &mut Context, term: Operand) {
        let ea = eaaddr();
        if self.started {
            ir.gen_add(Width::W32, ea, ea, term);
        } else {
            ir.gen_mov_operand(Width::W32, ea, term);
            self.started = true;
        }
    }

    fn add_scaled(&mut self, ir: &mut Context, reg: VReg, scale: u8) {
        if scale == 0 {
            self.add(ir, Operand::Reg(reg));
            return;
        }
        let t = ir.new_temp(Width::W32);
        ir.gen_shl(Width::W32, t, reg, scale as u32);
        self.add(ir, Operand::Reg(t));
    }

    fn finish(self, ir: &mut Context) {
        if !self.started {
            ir.gen_movi(Width::W32, eaaddr(), 0);
        }
    }
}

/// 16-bit base/index pairs selected by rm.
const EA16_REGS: [(u8, Option<u8>); 8] = [
    (3, Some(6)), // bx+si
    (3, Some(7)), // bx+di
    (5, Some(6)), // bp+si
    (5, Some(7)), // bp+di
    (6, None),    // si
    (7, None),    // di
    (5, None),    // bp
    (3, None),    // bx
];

fn resolve16(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    m: ModRm,
) -> Result<SegReg, TranslateError> {
    let mut sum = EaSum::new();
    if m.md == 0 && m.rm == 6 {
        let disp = ctx.fetch_disp(block, Width::W16)?;
        sum.add(&mut block.ir, disp);
        sum.finish(&mut block.ir);
        return Ok(SegReg::Ds);
    }

    let (base, index) = EA16_REGS[m.rm as usize];
    sum.add(&mut block.ir, Operand::Reg(gpr(Width::W32, base)));
    if let Some(index) = index {
        sum.add(&mut block.ir, Operand::Reg(gpr(Width::W32, index)));
    }
    match m.md {
        1 => {
            let disp = ctx.fetch_disp(block, Width::W8)?;
            sum.add(&mut block.ir, disp);
        }
        2 => {
            let disp = ctx.fetch_disp(block, Width::W16)?;
            sum.add(&mut block.ir, disp);
        }
        _ => {}
    }
    sum.finish(&mut block.ir);
    block.ir.gen_and(Width::W32, eaaddr(), eaaddr(), 0xffffu32);

    let seg = if base == EBP as u8 {
        SegReg::Ss
    } else {
        SegReg::Ds
    };
    Ok(seg)
}

fn resolve32(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    m: ModRm,
) -> Result<SegReg, TranslateError> {
    let mut sum = EaSum::new();
    let mut seg = SegReg::Ds;

    if m.rm == 4 {
        let sib = ctx.fetch_u8()?;
        let scale = sib >> 6;
        let index = (sib >> 3) & 7;
        let base = sib & 7;

        if base == 5 && m.md == 0 {
            let disp = ctx.fetch_disp(block, Width::W32)?;
            sum.add(&mut block.ir, disp);
        } else {
            sum.add(&mut block.ir, Operand::Reg(gpr(Width::W32, base)));
            if base == ESP as u8 || base == EBP as u8 {
                seg = SegReg::Ss;
            }
        }
        // Index 4 means no index register.
        if index != 4 {
            sum.add_scaled(&mut block.ir, gpr(Width::W32, index), scale);
        }
    } else if m.md == 0 && m.rm == 5 {
        let disp = ctx.fetch_disp(block, Width::W32)?;
        sum.add(&mut block.ir, disp);
    } else {
        sum.add(&mut block.ir, Operand::Reg(gpr(Width::W32, m.rm)));
        if m.rm == EBP as u8 {
            seg = SegReg::Ss;
        }
    }

    match m.md {
        1 => {
            let disp = ctx.fetch_disp(block, Width::W8)?;
            sum.add(&mut block.ir, disp);
        }
        2 => {
            let disp = ctx.fetch_disp(block, Width::W32)?;
            sum.add(&mut block.ir, disp);
        }
        _ => {}
    }
    sum.finish(&mut block.ir);
    Ok(seg)
}

/// Resolve the r/m operand described by `m`, consuming any SIB and
/// displacement bytes. Memory forms leave the offset in `eaaddr`.
pub fn decode_ea(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
    m: ModRm,
) -> Result<Ea, TranslateError> {
    if m.is_reg() {
        return Ok(Ea::Reg(m.rm));
    }
    let default_seg = if insn.addr32 {
        resolve32(ctx, block, m)?
    } else {
        resolve16(ctx, block, m)?
    };
    Ok(Ea::Mem(MemRef {
        seg: insn.seg.unwrap_or(default_seg),
        addr: eaaddr(),
    }))
}

/// Memory operand at an absolute offset (MOV moffs forms).
pub fn decode_moffs(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    insn: &Insn,
) -> Result<MemRef, TranslateError> {
    let aw = insn.addr_width();
    match ctx.fetch_imm(block, aw)? {
        Operand::Imm(v) => {
            block.ir.gen_movi(Width::W32, eaaddr(), v);
        }
        Operand::Reg(t) if aw == Width::W32 => {
            block.ir.gen_mov(Width::W32, eaaddr(), t);
        }
        Operand::Reg(t) => {
            block.ir.gen_movzx(Width::W32, eaaddr(), t);
        }
    }
    Ok(MemRef {
        seg: insn.seg.unwrap_or(SegReg::Ds),
        addr: eaaddr(),
    })
}

/// Load a memory operand into a fresh temp.
pub fn load(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    mem: MemRef,
    w: Width,
) -> VReg {
    ctx.check_seg(block, mem.seg);
    let t = block.ir.new_temp(w);
    block.ir.gen_load(w, t, seg_base(mem.seg), mem.addr)
}

/// Store `val` to a memory operand.
pub fn store(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    mem: MemRef,
    w: Width,
    val: impl Into<Operand>,
) {
    ctx.check_seg(block, mem.seg);
    block.ir.gen_store(w, seg_base(mem.seg), mem.addr, val);
}

/// Value of an r/m operand. Register operands are used in place.
pub fn read_ea(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    ea: Ea,
    w: Width,
) -> VReg {
    match ea {
        Ea::Reg(r) => gpr(w, r),
        Ea::Mem(mem) => load(ctx, block, mem, w),
    }
}

/// Write an r/m operand. A read-modify-write reuses the offset left
/// in `eaaddr` by the read.
pub fn write_ea(
    ctx: &mut X86DisasContext<'_>,
    block: &mut CodeBlock,
    ea: Ea,
    w: Width,
    val: impl Into<Operand>,
) {
    match ea {
        Ea::Reg(r) => {
            block.ir.gen_mov_operand(w, gpr(w, r), val.into());
        }
        Ea::Mem(mem) => store(ctx, block, mem, w, val),
    }
}
