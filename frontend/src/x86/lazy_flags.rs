//! Deferred flags tracker.
//!
//! Flag-defining translators record an operation kind and
//! (op1, op2, res); the tracker commits that record to the
//! `flags_*` architectural vregs and answers later flag queries,
//! either with a short inline derivation or with a call to the
//! external flag routines.
//!
//! The tracker is local to one block and starts out `Unknown`: at
//! block entry the committed state may hold anything, so only the
//! runtime routines can interpret it.

use dynarec_core::flags::{FlagsFamily, FlagsOp, AF, CF, PF, SF, ZF};
use dynarec_core::{
    ArchSlot, CodeBlock, Cond, Context, Helper, Operand, VReg, Width,
};

/// A single status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Cf,
    Pf,
    Af,
    Zf,
    Sf,
    Of,
}

impl Flag {
    fn helper(self) -> Helper {
        match self {
            Flag::Cf => Helper::CfSet,
            Flag::Pf => Helper::PfSet,
            Flag::Af => Helper::AfSet,
            Flag::Zf => Helper::ZfSet,
            Flag::Sf => Helper::SfSet,
            Flag::Of => Helper::OfSet,
        }
    }
}

/// A boolean known at translation time or computable by one compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Const(bool),
    Cmp {
        cond: Cond,
        w: Width,
        a: Operand,
        b: Operand,
    },
}

impl Predicate {
    pub fn not(self) -> Predicate {
        match self {
            Predicate::Const(v) => Predicate::Const(!v),
            Predicate::Cmp { cond, w, a, b } => Predicate::Cmp {
                cond: cond.invert(),
                w,
                a,
                b,
            },
        }
    }

    /// Value as 0/1: an immediate, or a fresh temp set by `setcond`.
    pub fn materialize(self, ir: &mut Context) -> Operand {
        match self {
            Predicate::Const(v) => Operand::Imm(v as u32),
            Predicate::Cmp { cond, w, a, b } => {
                let t = ir.new_temp(Width::W32);
                ir.gen_setcond(w, t, a, b, cond);
                Operand::Reg(t)
            }
        }
    }

    pub fn or(self, other: Predicate, ir: &mut Context) -> Predicate {
        match (self, other) {
            (Predicate::Const(true), _) | (_, Predicate::Const(true)) => {
                Predicate::Const(true)
            }
            (Predicate::Const(false), p) | (p, Predicate::Const(false)) => p,
            (a, b) => {
                let (ta, tb) = (a.materialize(ir), b.materialize(ir));
                let t = ir.new_temp(Width::W32);
                ir.gen_or(Width::W32, t, ta, tb);
                Predicate::nonzero(t)
            }
        }
    }

    pub fn xor(self, other: Predicate, ir: &mut Context) -> Predicate {
        match (self, other) {
            (Predicate::Const(c), p) | (p, Predicate::Const(c)) => {
                if c {
                    p.not()
                } else {
                    p
                }
            }
            (a, b) => {
                let (ta, tb) = (a.materialize(ir), b.materialize(ir));
                let t = ir.new_temp(Width::W32);
                ir.gen_xor(Width::W32, t, ta, tb);
                Predicate::nonzero(t)
            }
        }
    }

    pub fn and(self, other: Predicate, ir: &mut Context) -> Predicate {
        self.not().or(other.not(), ir).not()
    }

    fn nonzero(t: VReg) -> Predicate {
        Predicate::Cmp {
            cond: Cond::Ne,
            w: Width::W32,
            a: Operand::Reg(t),
            b: Operand::Imm(0),
        }
    }

    /// Leave the block for `target` when the predicate holds.
    pub fn gen_exit_if(self, ir: &mut Context, target: u32) {
        match self {
            Predicate::Const(false) => {}
            Predicate::Const(true) => {
                ir.gen_exit_if(Width::W32, Cond::Always, 0u32, 0u32, target)
            }
            Predicate::Cmp { cond, w, a, b } => {
                ir.gen_exit_if(w, cond, a, b, target)
            }
        }
    }
}

/// Translation-time view of the most recent flag-defining
/// instruction in the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagsTracker {
    op: FlagsOp,
    op1: Operand,
    op2: Operand,
    res: Operand,
}

fn arch(slot: ArchSlot) -> VReg {
    VReg::arch(slot)
}

/// Copy a snapshot into its committed slot; immediates stay
/// immediates so later derivations can fold them.
fn commit(ir: &mut Context, w: Width, slot: ArchSlot, v: Operand) -> Operand {
    match v {
        Operand::Imm(x) => {
            ir.gen_movi(Width::W32, arch(slot), x & w.mask());
            Operand::Imm(x & w.mask())
        }
        Operand::Reg(r) => {
            if w == Width::W32 {
                ir.gen_mov(Width::W32, arch(slot), r);
            } else {
                ir.gen_movzx(Width::W32, arch(slot), r);
            }
            Operand::Reg(arch(slot))
        }
    }
}

impl FlagsTracker {
    pub fn new() -> Self {
        Self {
            op: FlagsOp::Unknown,
            op1: Operand::Imm(0),
            op2: Operand::Imm(0),
            res: Operand::Imm(0),
        }
    }

    pub fn op(&self) -> FlagsOp {
        self.op
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record an arithmetic flag-defining operation.
    pub fn set(
        &mut self,
        block: &mut CodeBlock,
        op: FlagsOp,
        op1: Operand,
        op2: Operand,
        res: VReg,
    ) {
        let w = op.width();
        let ir = &mut block.ir;
        ir.gen_movi(Width::W32, arch(ArchSlot::FlagsOp), op.raw());
        self.op1 = commit(ir, w, ArchSlot::FlagsOp1, op1);
        self.op2 = commit(ir, w, ArchSlot::FlagsOp2, op2);
        self.res = commit(ir, w, ArchSlot::FlagsRes, Operand::Reg(res));
        self.op = op;
    }

    /// Record a logic result; only the result matters for ZN kinds.
    pub fn set_zn(&mut self, block: &mut CodeBlock, w: Width, res: VReg) {
        let op = FlagsOp::new(FlagsFamily::Zn, w);
        let ir = &mut block.ir;
        ir.gen_movi(Width::W32, arch(ArchSlot::FlagsOp), op.raw());
        self.res = commit(ir, w, ArchSlot::FlagsRes, Operand::Reg(res));
        self.op1 = Operand::Imm(0);
        self.op2 = Operand::Imm(0);
        self.op = op;
    }

    /// Record a shift or rotate whose count is only known at run time.
    ///
    /// EFLAGS is rebuilt first. A zero count commits the UNKNOWN kind,
    /// which leaves the rebuilt flags as they were; afterwards the
    /// tracker knows nothing about the record.
    pub fn set_counted(
        &mut self,
        block: &mut CodeBlock,
        op: FlagsOp,
        op1: VReg,
        count: VReg,
        res: VReg,
    ) {
        self.rebuild_all(block);
        let w = op.width();
        let ir = &mut block.ir;
        let nz = ir.new_temp(Width::W32);
        ir.gen_setcond(Width::W32, nz, count, 0u32, Cond::Ne);
        let kind = ir.new_temp(Width::W32);
        ir.gen_sub(Width::W32, kind, 0u32, nz);
        ir.gen_and(Width::W32, arch(ArchSlot::FlagsOp), kind, op.raw());
        commit(ir, w, ArchSlot::FlagsOp1, Operand::Reg(op1));
        commit(ir, Width::W32, ArchSlot::FlagsOp2, Operand::Reg(count));
        commit(ir, w, ArchSlot::FlagsRes, Operand::Reg(res));
    }

    /// Materialize every flag into EFLAGS; afterwards the committed
    /// kind is UNKNOWN.
    pub fn rebuild_all(&mut self, block: &mut CodeBlock) {
        block.ir.gen_call(Helper::FlagsRebuild);
        block.stats.flag_helper_calls += 1;
        self.reset();
    }

    /// Make CF durable in EFLAGS before an INC/DEC replaces the
    /// record. Already durable when the record is INC/DEC.
    pub fn rebuild_carry(&mut self, block: &mut CodeBlock) {
        if self.op.is_inc_dec() {
            return;
        }
        block.ir.gen_call(Helper::FlagsRebuildCarry);
        block.stats.carry_rebuilds += 1;
    }

    /// Rotates keep every flag but CF and OF in EFLAGS.
    fn derive_rotate(&self, flag: Flag) -> Option<Predicate> {
        let w = self.op.width();
        let eflags = Operand::Reg(arch(ArchSlot::Eflags));
        let (w, a, bit) = match flag {
            Flag::Zf => (Width::W32, eflags, ZF),
            Flag::Sf => (Width::W32, eflags, SF),
            Flag::Pf => (Width::W32, eflags, PF),
            Flag::Af => (Width::W32, eflags, AF),
            Flag::Cf if self.op.family() == FlagsFamily::Rol => (w, self.res, 1),
            Flag::Cf => (w, self.res, w.sign_bit()),
            Flag::Of => return None,
        };
        Some(Predicate::Cmp {
            cond: Cond::TstNe,
            w,
            a,
            b: Operand::Imm(bit),
        })
    }

    /// CF of a shift by a count known at translation time.
    fn shift_carry(&self) -> Option<Predicate> {
        let Operand::Imm(c) = self.op2 else {
            return None;
        };
        if c == 0 {
            return None;
        }
        let w = self.op.width();
        let bit = match self.op.family() {
            FlagsFamily::Shl if c > w.bits() => return Some(Predicate::Const(false)),
            FlagsFamily::Shl => 1 << (w.bits() - c),
            FlagsFamily::Sar if c > w.bits() => w.sign_bit(),
            _ => 1 << (c - 1),
        };
        Some(Predicate::Cmp {
            cond: Cond::TstNe,
            w,
            a: self.op1,
            b: Operand::Imm(bit),
        })
    }

    /// Inline derivation of `flag`, if the recorded kind has one.
    fn derive(&self, ir: &mut Context, flag: Flag) -> Option<Predicate> {
        let fam = self.op.family();
        if fam == FlagsFamily::Unknown {
            return None;
        }
        if self.op.is_rotate() {
            return self.derive_rotate(flag);
        }
        let w = self.op.width();
        let cmp = |cond, w, a, b| Some(Predicate::Cmp { cond, w, a, b });
        match flag {
            Flag::Zf => cmp(Cond::Eq, w, self.res, Operand::Imm(0)),
            Flag::Sf => cmp(Cond::TstNe, w, self.res, Operand::Imm(w.sign_bit())),
            Flag::Cf => match fam {
                FlagsFamily::Zn => Some(Predicate::Const(false)),
                FlagsFamily::Add => cmp(Cond::Ltu, w, self.res, self.op1),
                FlagsFamily::Sub => cmp(Cond::Ltu, w, self.op1, self.op2),
                FlagsFamily::Inc | FlagsFamily::Dec => cmp(
                    Cond::TstNe,
                    Width::W32,
                    Operand::Reg(arch(ArchSlot::Eflags)),
                    Operand::Imm(CF),
                ),
                FlagsFamily::Shl | FlagsFamily::Shr | FlagsFamily::Sar => {
                    self.shift_carry()
                }
                _ => None,
            },
            Flag::Of => match fam {
                FlagsFamily::Zn | FlagsFamily::Sar => Some(Predicate::Const(false)),
                FlagsFamily::Shr => match self.op2 {
                    Operand::Imm(1) => {
                        cmp(Cond::TstNe, w, self.op1, Operand::Imm(w.sign_bit()))
                    }
                    Operand::Imm(_) => Some(Predicate::Const(false)),
                    Operand::Reg(_) => None,
                },
                FlagsFamily::Shl => None,
                FlagsFamily::Add | FlagsFamily::Adc | FlagsFamily::Inc => {
                    // (op1 ^ res) & (op2 ^ res)
                    let t1 = ir.new_temp(w);
                    ir.gen_xor(w, t1, self.op1, self.res);
                    let t2 = ir.new_temp(w);
                    ir.gen_xor(w, t2, self.op2, self.res);
                    ir.gen_and(w, t1, t1, t2);
                    cmp(Cond::TstNe, w, Operand::Reg(t1), Operand::Imm(w.sign_bit()))
                }
                _ => {
                    // (op1 ^ op2) & (op1 ^ res)
                    let t1 = ir.new_temp(w);
                    ir.gen_xor(w, t1, self.op1, self.op2);
                    let t2 = ir.new_temp(w);
                    ir.gen_xor(w, t2, self.op1, self.res);
                    ir.gen_and(w, t1, t1, t2);
                    cmp(Cond::TstNe, w, Operand::Reg(t1), Operand::Imm(w.sign_bit()))
                }
            },
            Flag::Pf | Flag::Af => None,
        }
    }

    /// Query one flag, emitting whatever IR computes it.
    pub fn flag(&mut self, block: &mut CodeBlock, flag: Flag) -> Predicate {
        if let Some(p) = self.derive(&mut block.ir, flag) {
            block.stats.derived_queries += 1;
            return p;
        }
        let t = block.ir.new_temp(Width::W32);
        block.ir.gen_call_ret(t, flag.helper());
        block.stats.flag_helper_calls += 1;
        Predicate::nonzero(t)
    }

    /// Carry-in for ADC/SBB as 0/1.
    pub fn carry(&mut self, block: &mut CodeBlock) -> Operand {
        let p = self.flag(block, Flag::Cf);
        p.materialize(&mut block.ir)
    }

    /// Evaluate x86 condition code `cc` (low nibble of Jcc).
    pub fn cond(&mut self, block: &mut CodeBlock, cc: u8) -> Predicate {
        let fam = self.op.family();
        let w = self.op.width();
        let sub_like = matches!(fam, FlagsFamily::Sub | FlagsFamily::Dec);
        let fast = |cond, a, b| Predicate::Cmp { cond, w, a, b };
        let p = match (cc >> 1) & 7 {
            0 => self.flag(block, Flag::Of),
            1 => self.flag(block, Flag::Cf),
            2 => self.flag(block, Flag::Zf),
            3 => match fam {
                FlagsFamily::Sub => {
                    block.stats.derived_queries += 1;
                    fast(Cond::Leu, self.op1, self.op2)
                }
                FlagsFamily::Zn => self.flag(block, Flag::Zf),
                _ => {
                    let c = self.flag(block, Flag::Cf);
                    let z = self.flag(block, Flag::Zf);
                    c.or(z, &mut block.ir)
                }
            },
            4 => self.flag(block, Flag::Sf),
            5 => self.flag(block, Flag::Pf),
            6 => match fam {
                _ if sub_like => {
                    block.stats.derived_queries += 1;
                    fast(Cond::Lt, self.op1, self.op2)
                }
                FlagsFamily::Zn => self.flag(block, Flag::Sf),
                _ => {
                    let s = self.flag(block, Flag::Sf);
                    let o = self.flag(block, Flag::Of);
                    s.xor(o, &mut block.ir)
                }
            },
            _ => match fam {
                _ if sub_like => {
                    block.stats.derived_queries += 1;
                    fast(Cond::Le, self.op1, self.op2)
                }
                FlagsFamily::Zn => {
                    block.stats.derived_queries += 1;
                    fast(Cond::Le, self.res, Operand::Imm(0))
                }
                _ => {
                    let z = self.flag(block, Flag::Zf);
                    let s = self.flag(block, Flag::Sf);
                    let o = self.flag(block, Flag::Of);
                    let l = s.xor(o, &mut block.ir);
                    z.or(l, &mut block.ir)
                }
            },
        };
        if cc & 1 != 0 {
            p.not()
        } else {
            p
        }
    }
}

impl Default for FlagsTracker {
    fn default() -> Self {
        Self::new()
    }
}
