//! Translation IR for the x86 recompiler: virtual registers, the
//! micro-op vocabulary, the deferred-flags model and CodeBlocks.

pub mod block;
pub mod context;
pub mod dump;
pub mod flags;
pub mod helper;
pub mod ir_builder;
pub mod op;
pub mod opcode;
pub mod provenance;
pub mod types;
pub mod vreg;

pub use block::{BlockKey, BlockStats, CodeBlock, JumpCache};
pub use context::Context;
pub use flags::{DeferredFlags, FlagsFamily, FlagsOp};
pub use helper::Helper;
pub use op::{Op, OpIdx, Operand, MAX_OP_ARGS};
pub use opcode::{OpDef, OpFlags, Opcode, OPCODE_DEFS};
pub use provenance::Provenance;
pub use types::{Cond, SegReg, Width};
pub use vreg::{ArchSlot, VReg, VRegInfo, VRegKind};
