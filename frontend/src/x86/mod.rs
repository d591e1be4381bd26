//! x86 frontend: 16/32-bit instruction translation.

pub mod cpu;
pub mod dispatch;
pub mod ea;
pub mod fetch;
pub mod lazy_flags;
mod trans;
pub mod width;

pub use trans::Flow;

use std::marker::PhantomData;

use crate::{
    translator_loop, DisasContextBase, DisasJumpType, OpcodeMap,
    TranslateError, TranslatorOps,
};
use dispatch::{Entry, TABLES};
use dynarec_core::{CodeBlock, Cond, Helper, Operand, SegReg, Width};
use fetch::{GuestMemory, Lookahead};
use lazy_flags::FlagsTracker;
use tracing::{debug, trace};

/// Decoded prefix state and position of the current instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insn {
    /// Opcode byte (second byte for the 0F map).
    pub opcode: u8,
    /// PC of the first byte, prefixes included.
    pub start: u32,
    /// PC just past the opcode byte.
    pub pc: u32,
    /// Effective operand size is 32 bits.
    pub op32: bool,
    /// Effective address size is 32 bits.
    pub addr32: bool,
    /// Segment override prefix, if any.
    pub seg: Option<SegReg>,
}

impl Insn {
    pub fn op_width(&self) -> Width {
        if self.op32 {
            Width::W32
        } else {
            Width::W16
        }
    }

    pub fn addr_width(&self) -> Width {
        if self.addr32 {
            Width::W32
        } else {
            Width::W16
        }
    }
}

// ---------------------------------------------------------------
// Disassembly context
// ---------------------------------------------------------------

/// x86 disassembly context (extends `DisasContextBase`).
pub struct X86DisasContext<'a> {
    /// Generic base fields (pc, is_jmp, counters).
    pub base: DisasContextBase,
    mem: &'a dyn GuestMemory,
    pub cs_base: u32,
    /// Default operand and address size is 32 bits.
    pub code32: bool,
    /// Protected mode, not V86; memory operands get segment checks.
    pub protected: bool,
    /// Stack accesses go through ESP rather than SP.
    pub stack32: bool,
    /// Immediates are re-read from guest memory at run time.
    pub no_immediates: bool,
    /// Deferred flags record for this block.
    pub flags: FlagsTracker,
    /// Segments already checked in this block (bit per `SegReg`).
    seg_checked: u8,
    window: Lookahead,
}

impl<'a> X86DisasContext<'a> {
    pub fn new(mem: &'a dyn GuestMemory, block: &CodeBlock) -> Self {
        Self {
            base: DisasContextBase::new(
                block.pc(),
                CodeBlock::max_insns(block.cflags),
            ),
            mem,
            cs_base: block.cs_base(),
            code32: block.code32(),
            protected: block.protected_mode(),
            stack32: block.stack32(),
            no_immediates: block.no_immediates(),
            flags: FlagsTracker::new(),
            seg_checked: 0,
            window: Lookahead::empty(),
        }
    }

    // -- Code fetch ----------------------------------------

    /// PC of the next unconsumed byte of the current instruction.
    pub fn cur_pc(&self) -> u32 {
        self.base.pc_next.wrapping_add(self.window.consumed() as u32)
    }

    fn too_long(&self) -> TranslateError {
        TranslateError::InsnTooLong {
            pc: self.base.pc_next,
            insn_index: self.base.num_insns.saturating_sub(1),
        }
    }

    pub fn unimplemented(&self, opcode: u8, map: OpcodeMap) -> TranslateError {
        TranslateError::Unimplemented {
            pc: self.base.pc_next,
            opcode,
            map,
            insn_index: self.base.num_insns.saturating_sub(1),
        }
    }

    pub fn fetch_u8(&mut self) -> Result<u8, TranslateError> {
        self.window.take().ok_or_else(|| self.too_long())
    }

    fn fetch_raw(&mut self, w: Width) -> Result<(u32, u32), TranslateError> {
        let linear = self.cs_base.wrapping_add(self.cur_pc());
        let v = self
            .window
            .take_le(w.bytes() as usize)
            .ok_or_else(|| self.too_long())?;
        Ok((linear, v))
    }

    /// Immediate of width `w`. In no-immediates blocks the value is
    /// loaded from code memory when the block runs.
    pub fn fetch_imm(
        &mut self,
        block: &mut CodeBlock,
        w: Width,
    ) -> Result<Operand, TranslateError> {
        let (linear, v) = self.fetch_raw(w)?;
        if !self.no_immediates {
            return Ok(Operand::Imm(v));
        }
        let t = block.ir.new_temp(w);
        block.ir.gen_load_code(w, t, linear);
        Ok(Operand::Reg(t))
    }

    /// 8-bit immediate sign-extended to `w`.
    pub fn fetch_imm_sx8(
        &mut self,
        block: &mut CodeBlock,
        w: Width,
    ) -> Result<Operand, TranslateError> {
        let (linear, v) = self.fetch_raw(Width::W8)?;
        if !self.no_immediates {
            return Ok(Operand::Imm(Width::W8.sext(v) & w.mask()));
        }
        let t8 = block.ir.new_temp(Width::W8);
        block.ir.gen_load_code(Width::W8, t8, linear);
        let t = block.ir.new_temp(w);
        block.ir.gen_movsx(w, t, t8);
        Ok(Operand::Reg(t))
    }

    /// Address displacement widened to 32 bits (disp8 sign-extends,
    /// wider ones zero-extend).
    pub fn fetch_disp(
        &mut self,
        block: &mut CodeBlock,
        w: Width,
    ) -> Result<Operand, TranslateError> {
        let (linear, v) = self.fetch_raw(w)?;
        if !self.no_immediates {
            let v = if w == Width::W8 { Width::W8.sext(v) } else { v };
            return Ok(Operand::Imm(v));
        }
        let raw = block.ir.new_temp(w);
        block.ir.gen_load_code(w, raw, linear);
        if w == Width::W32 {
            return Ok(Operand::Reg(raw));
        }
        let t = block.ir.new_temp(Width::W32);
        if w == Width::W8 {
            block.ir.gen_movsx(Width::W32, t, raw);
        } else {
            block.ir.gen_movzx(Width::W32, t, raw);
        }
        Ok(Operand::Reg(t))
    }

    /// Branch displacement, sign-extended. Always folded into the
    /// target; the bytes still land in provenance.
    pub fn fetch_rel(&mut self, w: Width) -> Result<u32, TranslateError> {
        let (_, v) = self.fetch_raw(w)?;
        Ok(w.sext(v))
    }

    // -- Segment checks ------------------------------------

    /// Emit the null-segment guard for `seg`, once per block.
    ///
    /// Real and V86 mode have no null selectors; CS and SS can never
    /// hold one.
    pub fn check_seg(&mut self, block: &mut CodeBlock, seg: SegReg) {
        let bit = 1u8 << seg.index();
        if !self.protected
            || matches!(seg, SegReg::Cs | SegReg::Ss)
            || self.seg_checked & bit != 0
        {
            return;
        }
        self.seg_checked |= bit;
        block.ir.gen_call_if(
            Width::W32,
            Cond::Eq,
            ea::seg_base(seg),
            cpu::NULL_SEG_BASE,
            Helper::RaiseGp,
        );
        block.stats.seg_checks += 1;
    }

    // -- Prefix decode and dispatch ------------------------

    fn decode_and_translate(
        &mut self,
        block: &mut CodeBlock,
    ) -> Result<Flow, TranslateError> {
        let start = self.base.pc_next;
        let mut op32 = self.code32;
        let mut addr32 = self.code32;
        let mut seg = None;

        let (entry, opcode, map) = loop {
            let b = self.fetch_u8()?;
            match b {
                0x26 => seg = Some(SegReg::Es),
                0x2e => seg = Some(SegReg::Cs),
                0x36 => seg = Some(SegReg::Ss),
                0x3e => seg = Some(SegReg::Ds),
                0x64 => seg = Some(SegReg::Fs),
                0x65 => seg = Some(SegReg::Gs),
                0x66 => op32 = !self.code32,
                0x67 => addr32 = !self.code32,
                // LOCK has no effect on a single-CPU guest.
                0xf0 => {}
                0xf2 | 0xf3 => {
                    return Err(self.unimplemented(b, OpcodeMap::Base))
                }
                0x0f => {
                    let op = self.fetch_u8()?;
                    let entry = TABLES.map_0f[op32 as usize][op as usize];
                    break (entry, op, OpcodeMap::Map0F);
                }
                0xd8..=0xdf => {
                    // FPU maps are indexed by the ModRM byte, which the
                    // translator consumes itself.
                    let modrm =
                        self.window.peek().ok_or_else(|| self.too_long())?;
                    let entry = TABLES.fpu[(b - 0xd8) as usize][modrm as usize];
                    break (entry, modrm, OpcodeMap::Fpu(b));
                }
                _ => {
                    let entry = TABLES.base[op32 as usize][b as usize];
                    break (entry, b, OpcodeMap::Base);
                }
            }
        };

        let insn = Insn {
            opcode,
            start,
            pc: self.cur_pc(),
            op32,
            addr32,
            seg,
        };
        match entry {
            Entry::Implemented(translate) => translate(self, block, &insn),
            Entry::Unimplemented => Err(self.unimplemented(opcode, map)),
        }
    }
}

// ---------------------------------------------------------------
// TranslatorOps implementation
// ---------------------------------------------------------------

/// Marker type for the x86 translator.
pub struct X86Translator<'a>(PhantomData<&'a ()>);

impl<'a> TranslatorOps for X86Translator<'a> {
    type DisasContext = X86DisasContext<'a>;

    fn init_disas_context(ctx: &mut X86DisasContext<'a>, block: &mut CodeBlock) {
        block.ir.reset();
        block.provenance.clear();
        ctx.flags.reset();
        ctx.seg_checked = 0;
    }

    fn tb_start(ctx: &mut X86DisasContext<'a>, block: &mut CodeBlock) {
        trace!(
            pc = ctx.base.pc_first,
            code32 = ctx.code32,
            no_imm = block.no_immediates(),
            "block start"
        );
    }

    fn insn_start(ctx: &mut X86DisasContext<'a>, block: &mut CodeBlock) {
        block.ir.gen_insn_start(ctx.base.pc_next);
        ctx.base.num_insns += 1;
    }

    fn translate_insn(
        ctx: &mut X86DisasContext<'a>,
        block: &mut CodeBlock,
    ) -> Result<(), TranslateError> {
        let start = ctx.base.pc_next;
        ctx.window.fill(ctx.mem, ctx.cs_base.wrapping_add(start));
        let flow = ctx.decode_and_translate(block)?;

        let len = ctx.window.consumed() as u32;
        block.mark_code(start, len);
        let next = start.wrapping_add(len);
        trace!(pc = start, len, ?flow, "translated insn");

        if let Flow::Next(pc) = flow {
            debug_assert_eq!(pc, next, "translator returned a wrong next pc");
        } else {
            ctx.base.is_jmp = DisasJumpType::NoReturn;
        }
        ctx.base.pc_next = next;
        Ok(())
    }

    fn tb_stop(ctx: &mut X86DisasContext<'a>, block: &mut CodeBlock) {
        match ctx.base.is_jmp {
            DisasJumpType::NoReturn => {
                // Block already terminated by the instruction.
            }
            DisasJumpType::Next | DisasJumpType::TooMany => {
                block.ir.gen_exit(ctx.base.pc_next);
            }
        }
    }

    fn base<'b>(ctx: &'b X86DisasContext<'a>) -> &'b DisasContextBase {
        &ctx.base
    }

    fn base_mut<'b>(
        ctx: &'b mut X86DisasContext<'a>,
    ) -> &'b mut DisasContextBase {
        &mut ctx.base
    }
}

/// Translate guest code at the block's start into `block`.
///
/// On error the block's IR is incomplete and must be discarded.
pub fn translate_block(
    mem: &dyn GuestMemory,
    block: &mut CodeBlock,
) -> Result<(), TranslateError> {
    let mut ctx = X86DisasContext::new(mem, block);
    translator_loop::<X86Translator<'_>>(&mut ctx, block)?;
    block.size = ctx.base.pc_next.wrapping_sub(ctx.base.pc_first);
    block.icount = ctx.base.num_insns as u16;
    debug!(
        cs_base = block.cs_base(),
        pc = block.pc(),
        size = block.size,
        icount = block.icount,
        ops = block.ir.num_ops(),
        "translated block"
    );
    Ok(())
}
