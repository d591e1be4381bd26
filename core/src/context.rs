use crate::op::{Op, OpIdx};
use crate::types::Width;
use crate::vreg::{ArchSlot, VReg, VRegInfo, NUM_ARCH_SLOTS};

/// IR buffer of one CodeBlock.
///
/// Holds the virtual register pool and the emitted micro-ops. The
/// architectural aliases are registered first, at fixed indices
/// (`VReg::arch`); scratch temporaries follow and are unbounded.
#[derive(Debug, Clone)]
pub struct Context {
    vregs: Vec<VRegInfo>,
    ops: Vec<Op>,
    /// Number of architectural vregs (always at the front of `vregs`).
    nb_arch: u32,
}

impl Context {
    pub fn new() -> Self {
        let mut ctx = Self {
            vregs: Vec::with_capacity(NUM_ARCH_SLOTS + 64),
            ops: Vec::with_capacity(256),
            nb_arch: 0,
        };
        for i in 0..NUM_ARCH_SLOTS {
            if let Some(slot) = ArchSlot::from_index(i) {
                ctx.new_arch(slot);
            }
        }
        ctx
    }

    /// Reset for translating a new block. Keeps the architectural
    /// aliases.
    pub fn reset(&mut self) {
        self.vregs.truncate(self.nb_arch as usize);
        self.ops.clear();
    }

    // -- VReg allocation --

    pub fn nb_arch(&self) -> u32 {
        self.nb_arch
    }

    pub fn nb_vregs(&self) -> u32 {
        self.vregs.len() as u32
    }

    fn new_arch(&mut self, slot: ArchSlot) -> VReg {
        assert_eq!(
            self.vregs.len() as u32,
            self.nb_arch,
            "arch vregs must be registered before temps"
        );
        let idx = VReg(self.vregs.len() as u32);
        debug_assert_eq!(idx, VReg::arch(slot));
        self.vregs.push(VRegInfo::new_arch(idx, slot));
        self.nb_arch += 1;
        idx
    }

    /// Allocate a new block-local temporary.
    pub fn new_temp(&mut self, w: Width) -> VReg {
        let idx = VReg(self.vregs.len() as u32);
        self.vregs.push(VRegInfo::new_temp(idx, w));
        idx
    }

    pub fn vreg(&self, idx: VReg) -> &VRegInfo {
        &self.vregs[idx.0 as usize]
    }

    pub fn vregs(&self) -> &[VRegInfo] {
        &self.vregs
    }

    pub fn width_of(&self, idx: VReg) -> Width {
        self.vreg(idx).width
    }

    // -- Op emission --

    pub fn emit_op(&mut self, op: Op) -> OpIdx {
        let idx = op.idx;
        self.ops.push(op);
        idx
    }

    pub fn next_op_idx(&self) -> OpIdx {
        OpIdx(self.ops.len() as u32)
    }

    pub fn op(&self, idx: OpIdx) -> &Op {
        &self.ops[idx.0 as usize]
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
