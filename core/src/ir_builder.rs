use crate::context::Context;
use crate::helper::Helper;
use crate::op::{Op, Operand};
use crate::opcode::Opcode;
use crate::types::{Cond, Width};
use crate::vreg::VReg;

impl Context {
    // -- Internal helpers --

    fn emit(&mut self, opc: Opcode, w: Width, args: &[Operand]) {
        let idx = self.next_op_idx();
        let op = Op::with_args(idx, opc, w, args);
        self.emit_op(op);
    }

    fn emit_binary(
        &mut self,
        opc: Opcode,
        w: Width,
        d: VReg,
        a: Operand,
        b: Operand,
    ) -> VReg {
        self.emit(opc, w, &[Operand::Reg(d), a, b]);
        d
    }

    // -- Data movement --

    pub fn gen_mov(&mut self, w: Width, d: VReg, s: VReg) -> VReg {
        self.emit(Opcode::Mov, w, &[Operand::Reg(d), Operand::Reg(s)]);
        d
    }

    pub fn gen_movi(&mut self, w: Width, d: VReg, imm: u32) -> VReg {
        self.emit(
            Opcode::MovImm,
            w,
            &[Operand::Reg(d), Operand::Imm(imm & w.mask())],
        );
        d
    }

    /// Move a register or immediate into `d`.
    pub fn gen_mov_operand(&mut self, w: Width, d: VReg, s: Operand) -> VReg {
        match s {
            Operand::Reg(r) => self.gen_mov(w, d, r),
            Operand::Imm(v) => self.gen_movi(w, d, v),
        }
    }

    /// `d = zext(s)`; `w` is the destination width.
    pub fn gen_movzx(&mut self, w: Width, d: VReg, s: VReg) -> VReg {
        self.emit(Opcode::MovZx, w, &[Operand::Reg(d), Operand::Reg(s)]);
        d
    }

    /// `d = sext(s)`; `w` is the destination width.
    pub fn gen_movsx(&mut self, w: Width, d: VReg, s: VReg) -> VReg {
        self.emit(Opcode::MovSx, w, &[Operand::Reg(d), Operand::Reg(s)]);
        d
    }

    // -- Binary ALU (1 oarg, 2 iargs) --

    pub fn gen_add(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::Add, w, d, a.into(), b.into())
    }

    pub fn gen_sub(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::Sub, w, d, a.into(), b.into())
    }

    pub fn gen_and(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::And, w, d, a.into(), b.into())
    }

    pub fn gen_or(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::Or, w, d, a.into(), b.into())
    }

    pub fn gen_xor(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::Xor, w, d, a.into(), b.into())
    }

    pub fn gen_shl(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::Shl, w, d, a.into(), b.into())
    }

    pub fn gen_shr(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::Shr, w, d, a.into(), b.into())
    }

    /// Arithmetic right shift; `a` is sign-extended from `w` first.
    pub fn gen_sar(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::Sar, w, d, a.into(), b.into())
    }

    pub fn gen_rol(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::Rol, w, d, a.into(), b.into())
    }

    pub fn gen_ror(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
    ) -> VReg {
        self.emit_binary(Opcode::Ror, w, d, a.into(), b.into())
    }

    /// `d = (a cond b) ? 1 : 0`.
    pub fn gen_setcond(
        &mut self,
        w: Width,
        d: VReg,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
        cond: Cond,
    ) -> VReg {
        self.emit(
            Opcode::SetCond,
            w,
            &[
                Operand::Reg(d),
                a.into(),
                b.into(),
                Operand::Imm(cond as u32),
            ],
        );
        d
    }

    // -- Guest memory --

    /// Load `w` bytes from `seg_base + addr`.
    pub fn gen_load(
        &mut self,
        w: Width,
        d: VReg,
        seg_base: VReg,
        addr: VReg,
    ) -> VReg {
        self.emit(
            Opcode::Load,
            w,
            &[Operand::Reg(d), Operand::Reg(seg_base), Operand::Reg(addr)],
        );
        d
    }

    /// Store `w` bytes of `val` at `seg_base + addr`.
    pub fn gen_store(
        &mut self,
        w: Width,
        seg_base: VReg,
        addr: VReg,
        val: impl Into<Operand>,
    ) {
        self.emit(
            Opcode::Store,
            w,
            &[Operand::Reg(seg_base), Operand::Reg(addr), val.into()],
        );
    }

    /// Read `w` instruction bytes at linear address `linear` when the
    /// block runs.
    pub fn gen_load_code(&mut self, w: Width, d: VReg, linear: u32) -> VReg {
        self.emit(
            Opcode::LoadCode,
            w,
            &[Operand::Reg(d), Operand::Imm(linear)],
        );
        d
    }

    // -- Calls --

    pub fn gen_call(&mut self, helper: Helper) {
        self.emit(Opcode::Call, Width::W32, &[Operand::Imm(helper as u32)]);
    }

    pub fn gen_call_ret(&mut self, d: VReg, helper: Helper) -> VReg {
        self.emit(
            Opcode::CallRet,
            Width::W32,
            &[Operand::Reg(d), Operand::Imm(helper as u32)],
        );
        d
    }

    /// Call `helper` only when `a cond b` holds.
    pub fn gen_call_if(
        &mut self,
        w: Width,
        cond: Cond,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
        helper: Helper,
    ) {
        self.emit(
            Opcode::CallIf,
            w,
            &[
                a.into(),
                b.into(),
                Operand::Imm(cond as u32),
                Operand::Imm(helper as u32),
            ],
        );
    }

    // -- Control flow --

    /// Leave the block with `pc = target` when `a cond b` holds.
    pub fn gen_exit_if(
        &mut self,
        w: Width,
        cond: Cond,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
        target: u32,
    ) {
        self.emit(
            Opcode::ExitIf,
            w,
            &[
                a.into(),
                b.into(),
                Operand::Imm(cond as u32),
                Operand::Imm(target),
            ],
        );
    }

    /// Leave the block with `pc = target`.
    pub fn gen_exit(&mut self, target: impl Into<Operand>) {
        self.emit(Opcode::Exit, Width::W32, &[target.into()]);
    }

    pub fn gen_insn_start(&mut self, pc: u32) {
        self.emit(Opcode::InsnStart, Width::W32, &[Operand::Imm(pc)]);
    }
}
