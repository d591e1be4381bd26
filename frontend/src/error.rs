use std::fmt;

/// Opcode map an instruction was dispatched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeMap {
    /// One-byte opcodes.
    Base,
    /// Two-byte opcodes behind the 0F escape.
    Map0F,
    /// FPU escape D8..DF; the opcode reported is the ModRM byte.
    Fpu(u8),
}

impl fmt::Display for OpcodeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpcodeMap::Base => write!(f, "base"),
            OpcodeMap::Map0F => write!(f, "0f"),
            OpcodeMap::Fpu(esc) => write!(f, "fpu {esc:02x}"),
        }
    }
}

/// Reasons a block cannot be translated.
///
/// Neither is fatal: the caller drops the partial block and runs the
/// instruction through the interpreter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslateError {
    #[error("no translator for opcode {opcode:#04x} ({map} map) at pc {pc:#x}")]
    Unimplemented {
        pc: u32,
        opcode: u8,
        map: OpcodeMap,
        /// Index of the failing instruction within the block.
        insn_index: u32,
    },
    #[error("instruction at pc {pc:#x} is longer than 15 bytes")]
    InsnTooLong { pc: u32, insn_index: u32 },
}

impl TranslateError {
    pub fn pc(&self) -> u32 {
        match self {
            TranslateError::Unimplemented { pc, .. }
            | TranslateError::InsnTooLong { pc, .. } => *pc,
        }
    }

    pub fn insn_index(&self) -> u32 {
        match self {
            TranslateError::Unimplemented { insn_index, .. }
            | TranslateError::InsnTooLong { insn_index, .. } => *insn_index,
        }
    }
}
