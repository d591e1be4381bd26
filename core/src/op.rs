use std::fmt;

use crate::opcode::Opcode;
use crate::types::Width;
use crate::vreg::VReg;

/// Maximum number of arguments per IR operation.
pub const MAX_OP_ARGS: usize = 4;

/// Index into the Context's op list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpIdx(pub u32);

/// A micro-op argument: a virtual register or an immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Reg(VReg),
    Imm(u32),
}

impl Operand {
    pub fn reg(self) -> Option<VReg> {
        match self {
            Operand::Reg(r) => Some(r),
            Operand::Imm(_) => None,
        }
    }

    pub fn imm(self) -> Option<u32> {
        match self {
            Operand::Imm(v) => Some(v),
            Operand::Reg(_) => None,
        }
    }

    pub fn is_imm(self) -> bool {
        matches!(self, Operand::Imm(_))
    }
}

impl From<VReg> for Operand {
    fn from(r: VReg) -> Self {
        Operand::Reg(r)
    }
}

impl From<u32> for Operand {
    fn from(v: u32) -> Self {
        Operand::Imm(v)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "v{}", r.0),
            Operand::Imm(v) => write!(f, "$0x{v:x}"),
        }
    }
}

/// A single IR operation.
///
/// Arguments are laid out outputs first, then inputs, then constant
/// arguments, with counts taken from the opcode definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Op {
    pub idx: OpIdx,
    pub opc: Opcode,
    /// Operation width. For `MovZx`/`MovSx` this is the destination
    /// width; for memory ops it is the access size.
    pub width: Width,
    pub args: [Operand; MAX_OP_ARGS],
    pub nargs: u8,
}

impl Op {
    pub fn new(idx: OpIdx, opc: Opcode, width: Width) -> Self {
        Self {
            idx,
            opc,
            width,
            args: [Operand::Imm(0); MAX_OP_ARGS],
            nargs: 0,
        }
    }

    pub fn with_args(
        idx: OpIdx,
        opc: Opcode,
        width: Width,
        args: &[Operand],
    ) -> Self {
        debug_assert_eq!(args.len(), opc.def().nb_args() as usize);
        let mut op = Self::new(idx, opc, width);
        let n = args.len().min(MAX_OP_ARGS);
        op.args[..n].copy_from_slice(&args[..n]);
        op.nargs = n as u8;
        op
    }

    /// Get the output arguments slice (based on opcode definition).
    pub fn oargs(&self) -> &[Operand] {
        let n = self.opc.def().nb_oargs as usize;
        &self.args[..n]
    }

    /// Get the input arguments slice.
    pub fn iargs(&self) -> &[Operand] {
        let def = self.opc.def();
        let start = def.nb_oargs as usize;
        let end = start + def.nb_iargs as usize;
        &self.args[start..end]
    }

    /// Get the constant arguments slice.
    pub fn cargs(&self) -> &[Operand] {
        let def = self.opc.def();
        let start = (def.nb_oargs + def.nb_iargs) as usize;
        let end = start + def.nb_cargs as usize;
        &self.args[start..end]
    }

    /// Raw value of constant argument `n`.
    pub fn carg(&self, n: usize) -> u32 {
        match self.cargs()[n] {
            Operand::Imm(v) => v,
            Operand::Reg(r) => r.0,
        }
    }

    /// The single output register, if the opcode defines one.
    pub fn dst(&self) -> Option<VReg> {
        self.oargs().first().and_then(|o| o.reg())
    }
}
