//! Reference executor for block IR.
//!
//! Stands in for a host code generator: walks the ops of a
//! `CodeBlock` against an `X86Cpu` and `GuestRam`, with the same
//! observable effects compiled code would have.

use dynarec_core::{CodeBlock, Cond, Context, Helper, Op, Opcode, Operand, VReg, Width};
use dynarec_frontend::x86::cpu::X86Cpu;
use tracing::{debug, trace};

use crate::helpers::{call_helper, HelperCounts};
use crate::memory::GuestRam;
use crate::FaultKind;

/// How a block run ended. `cpu.pc` holds the next PC unless the
/// block faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockExit {
    /// Reached an exit op; continue at `cpu.pc`.
    Jump,
    /// A store hit this block's own code; stopped at the next
    /// instruction boundary.
    SelfModified,
    /// Faulted in the instruction at `pc`.
    Fault { pc: u32, kind: FaultKind },
}

/// Reusable IR executor.
#[derive(Debug, Default)]
pub struct Executor {
    temps: Vec<u32>,
    pub counts: HelperCounts,
}

struct Frame<'a> {
    ir: &'a Context,
    cpu: &'a mut X86Cpu,
    temps: &'a mut [u32],
}

impl Frame<'_> {
    fn get(&self, opnd: Operand) -> u32 {
        match opnd {
            Operand::Imm(v) => v,
            Operand::Reg(r) => self.read(r),
        }
    }

    fn read(&self, r: VReg) -> u32 {
        match self.ir.vreg(r).slot() {
            Some(slot) => self.cpu.read(slot),
            None => self.temps[r.0 as usize],
        }
    }

    fn write(&mut self, r: VReg, w: Width, v: u32) {
        let v = v & w.mask();
        match self.ir.vreg(r).slot() {
            Some(slot) => self.cpu.write(slot, v),
            None => self.temps[r.0 as usize] = v,
        }
    }

    fn out(&mut self, op: &Op, v: u32) {
        if let Some(d) = op.dst() {
            self.write(d, op.width, v);
        }
    }

    fn cond(&self, op: &Op, cond_arg: usize) -> bool {
        let iargs = op.iargs();
        let (a, b) = (self.get(iargs[0]), self.get(iargs[1]));
        Cond::from_raw(op.carg(cond_arg)).is_some_and(|c| c.eval(op.width, a, b))
    }
}

fn helper_arg(op: &Op, n: usize) -> Result<Helper, FaultKind> {
    Helper::from_raw(op.carg(n)).ok_or(FaultKind::BadHelper(op.carg(n)))
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `block` to its first exit.
    pub fn run(
        &mut self,
        block: &CodeBlock,
        cpu: &mut X86Cpu,
        ram: &mut GuestRam,
    ) -> BlockExit {
        let ir = &block.ir;
        self.temps.clear();
        self.temps.resize(ir.nb_vregs() as usize, 0);
        let counts = &mut self.counts;
        let mut f = Frame {
            ir,
            cpu,
            temps: &mut self.temps,
        };

        let mut insn_pc = block.pc();
        let mut self_modified = false;

        for op in ir.ops() {
            let r = match op.opc {
                Opcode::InsnStart => {
                    let pc = op.carg(0);
                    if self_modified {
                        debug!(pc, block = block.pc(), "self-modifying store, leaving block");
                        f.cpu.pc = pc;
                        return BlockExit::SelfModified;
                    }
                    insn_pc = pc;
                    f.cpu.pc = pc;
                    Ok(None)
                }
                Opcode::Exit => {
                    f.cpu.pc = f.get(op.iargs()[0]);
                    return BlockExit::Jump;
                }
                Opcode::ExitIf => {
                    if f.cond(op, 0) {
                        f.cpu.pc = op.carg(1);
                        return BlockExit::Jump;
                    }
                    Ok(None)
                }
                Opcode::Store => {
                    let a = op.iargs();
                    let linear = f.get(a[0]).wrapping_add(f.get(a[1]));
                    let v = f.get(a[2]);
                    trace!(linear, v, "store");
                    match ram.write(linear, op.width, v) {
                        Ok(()) => {
                            if block.provenance.intersects(linear, op.width.bytes()) {
                                self_modified = true;
                            }
                            Ok(None)
                        }
                        Err(e) => Err(FaultKind::Bus(e)),
                    }
                }
                _ => step(op, &mut f, ram, counts),
            };
            match r {
                Ok(Some(v)) => f.out(op, v),
                Ok(None) => {}
                Err(kind) => {
                    return BlockExit::Fault { pc: insn_pc, kind };
                }
            }
        }
        BlockExit::Jump
    }
}

/// Rotate `x` within the low `w` bits.
fn rotate(opc: Opcode, w: Width, x: u32, y: u32) -> u32 {
    let bits = w.bits();
    let x = x & w.mask();
    let n = y % bits;
    if n == 0 {
        return x;
    }
    let n = if opc == Opcode::Ror { bits - n } else { n };
    (x << n) | (x >> (bits - n))
}

/// Ops without control-flow effect. Returns the value for the output
/// register, if any.
fn step(
    op: &Op,
    f: &mut Frame<'_>,
    ram: &GuestRam,
    counts: &mut HelperCounts,
) -> Result<Option<u32>, FaultKind> {
    let w = op.width;
    let a = op.iargs();
    let v = match op.opc {
        Opcode::Mov => f.get(a[0]),
        Opcode::MovImm => op.carg(0),
        Opcode::MovZx | Opcode::MovSx => {
            let src = f.get(a[0]);
            let sw = a[0].reg().map_or(w, |r| f.ir.width_of(r));
            if op.opc == Opcode::MovSx {
                sw.sext(src)
            } else {
                src & sw.mask()
            }
        }
        Opcode::Add
        | Opcode::Sub
        | Opcode::And
        | Opcode::Or
        | Opcode::Xor
        | Opcode::Shl
        | Opcode::Shr
        | Opcode::Sar
        | Opcode::Rol
        | Opcode::Ror => {
            let (x, y) = (f.get(a[0]), f.get(a[1]));
            match op.opc {
                Opcode::Add => x.wrapping_add(y),
                Opcode::Sub => x.wrapping_sub(y),
                Opcode::And => x & y,
                Opcode::Or => x | y,
                Opcode::Xor => x ^ y,
                Opcode::Shl => x << (y & 31),
                Opcode::Shr => (x & w.mask()) >> (y & 31),
                Opcode::Sar => ((w.sext(x) as i32) >> (y & 31)) as u32,
                _ => rotate(op.opc, w, x, y),
            }
        }
        Opcode::SetCond => f.cond(op, 0) as u32,
        Opcode::Load => {
            let linear = f.get(a[0]).wrapping_add(f.get(a[1]));
            ram.read(linear, w)?
        }
        Opcode::LoadCode => ram.read(op.carg(0), w)?,
        Opcode::Call => {
            call_helper(f.cpu, helper_arg(op, 0)?, counts)?;
            return Ok(None);
        }
        Opcode::CallRet => call_helper(f.cpu, helper_arg(op, 0)?, counts)?,
        Opcode::CallIf => {
            if f.cond(op, 0) {
                call_helper(f.cpu, helper_arg(op, 1)?, counts)?;
            }
            return Ok(None);
        }
        Opcode::InsnStart
        | Opcode::Exit
        | Opcode::ExitIf
        | Opcode::Store
        | Opcode::Count => return Ok(None),
    };
    Ok(Some(v))
}
