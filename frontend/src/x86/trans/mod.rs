//! Per-instruction translators.
//!
//! Each translator consumes the rest of its instruction through the
//! context's fetch helpers, emits IR into the block and reports where
//! execution continues.

pub mod alu;
pub mod branch;
pub mod incdec;
pub mod misc;
pub mod mov;
pub mod shift;
pub mod stack;

use super::{Insn, X86DisasContext};
use crate::{OpcodeMap, TranslateError};

/// Where guest execution continues after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to the next instruction at this PC.
    Next(u32),
    /// The instruction ended the block.
    End,
}

pub type TransResult = Result<Flow, TranslateError>;

fn next(ctx: &X86DisasContext<'_>) -> TransResult {
    Ok(Flow::Next(ctx.cur_pc()))
}

/// Reject a ModRM group member that has no translator.
fn unimplemented_form(ctx: &X86DisasContext<'_>, insn: &Insn) -> TransResult {
    Err(ctx.unimplemented(insn.opcode, OpcodeMap::Base))
}

/// Branch target `pc + rel`, truncated to IP when the operand size
/// is 16 bits.
fn branch_target(insn: &Insn, pc: u32, rel: u32) -> u32 {
    let target = pc.wrapping_add(rel);
    if insn.op32 {
        target
    } else {
        target & 0xffff
    }
}
