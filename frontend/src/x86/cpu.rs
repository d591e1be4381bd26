//! x86 architectural register file.

use dynarec_core::block::flags::{FLAG_CODE32, FLAG_PROTECTED, FLAG_STACK32};
use dynarec_core::flags::{DeferredFlags, FlagsOp};
use dynarec_core::types::{SegReg, NUM_SEGS};
use dynarec_core::vreg::ArchSlot;

/// Number of general-purpose registers (EAX..EDI).
pub const NUM_GPRS: usize = 8;

pub const EAX: usize = 0;
pub const ECX: usize = 1;
pub const EDX: usize = 2;
pub const EBX: usize = 3;
pub const ESP: usize = 4;
pub const EBP: usize = 5;
pub const ESI: usize = 6;
pub const EDI: usize = 7;

/// EFLAGS bit 1 always reads as one.
pub const EFLAGS_FIXED: u32 = 0x0002;

/// Base value marking a null segment selector; any access through
/// it raises #GP.
pub const NULL_SEG_BASE: u32 = 0xFFFF_FFFF;

/// Guest CPU state the IR's architectural virtual registers alias.
///
/// Deferred flags live in `flags_op`/`flags_op1`/`flags_op2`/
/// `flags_res`; `eflags` holds whatever has been materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X86Cpu {
    pub regs: [u32; NUM_GPRS],
    pub eflags: u32,
    pub flags_op: u32,
    pub flags_op1: u32,
    pub flags_op2: u32,
    pub flags_res: u32,
    pub pc: u32,
    pub eaaddr: u32,
    pub seg_base: [u32; NUM_SEGS],
    pub seg_sel: [u16; NUM_SEGS],
    /// Default operand/address size is 32 bits (CS.D).
    pub code32: bool,
    /// Stack pointer is ESP (SS.B).
    pub stack32: bool,
    /// Protected mode, not V86.
    pub protected: bool,
}

impl X86Cpu {
    pub fn new() -> Self {
        Self {
            regs: [0; NUM_GPRS],
            eflags: EFLAGS_FIXED,
            flags_op: FlagsOp::Unknown.raw(),
            flags_op1: 0,
            flags_op2: 0,
            flags_res: 0,
            pc: 0,
            eaaddr: 0,
            seg_base: [0; NUM_SEGS],
            seg_sel: [0; NUM_SEGS],
            code32: false,
            stack32: false,
            protected: false,
        }
    }

    /// 32-bit flat protected-mode CPU.
    pub fn new_flat32() -> Self {
        Self {
            code32: true,
            stack32: true,
            protected: true,
            ..Self::new()
        }
    }

    /// Mode flags that select how code at the current PC translates.
    pub fn translation_flags(&self) -> u32 {
        let mut flags = 0;
        if self.code32 {
            flags |= FLAG_CODE32;
        }
        if self.protected {
            flags |= FLAG_PROTECTED;
        }
        if self.stack32 {
            flags |= FLAG_STACK32;
        }
        flags
    }

    pub fn cs_base(&self) -> u32 {
        self.seg_base[SegReg::Cs.index()]
    }

    /// Read the value an architectural virtual register aliases.
    pub fn read(&self, slot: ArchSlot) -> u32 {
        match slot {
            ArchSlot::Gpr32(r) => self.regs[r as usize & 7],
            ArchSlot::Gpr16(r) => self.regs[r as usize & 7] & 0xffff,
            ArchSlot::Gpr8Lo(r) => self.regs[r as usize & 3] & 0xff,
            ArchSlot::Gpr8Hi(r) => (self.regs[r as usize & 3] >> 8) & 0xff,
            ArchSlot::Eflags => self.eflags,
            ArchSlot::FlagsOp => self.flags_op,
            ArchSlot::FlagsOp1 => self.flags_op1,
            ArchSlot::FlagsOp2 => self.flags_op2,
            ArchSlot::FlagsRes => self.flags_res,
            ArchSlot::Pc => self.pc,
            ArchSlot::EaAddr => self.eaaddr,
            ArchSlot::SegBase(s) => self.seg_base[s.index()],
            ArchSlot::SegSel(s) => self.seg_sel[s.index()] as u32,
        }
    }

    /// Write an architectural virtual register. Narrow register views
    /// replace only their own bits.
    pub fn write(&mut self, slot: ArchSlot, v: u32) {
        match slot {
            ArchSlot::Gpr32(r) => self.regs[r as usize & 7] = v,
            ArchSlot::Gpr16(r) => {
                let reg = &mut self.regs[r as usize & 7];
                *reg = (*reg & 0xffff_0000) | (v & 0xffff);
            }
            ArchSlot::Gpr8Lo(r) => {
                let reg = &mut self.regs[r as usize & 3];
                *reg = (*reg & 0xffff_ff00) | (v & 0xff);
            }
            ArchSlot::Gpr8Hi(r) => {
                let reg = &mut self.regs[r as usize & 3];
                *reg = (*reg & 0xffff_00ff) | ((v & 0xff) << 8);
            }
            ArchSlot::Eflags => self.eflags = v | EFLAGS_FIXED,
            ArchSlot::FlagsOp => self.flags_op = v,
            ArchSlot::FlagsOp1 => self.flags_op1 = v,
            ArchSlot::FlagsOp2 => self.flags_op2 = v,
            ArchSlot::FlagsRes => self.flags_res = v,
            ArchSlot::Pc => self.pc = v,
            ArchSlot::EaAddr => self.eaaddr = v,
            ArchSlot::SegBase(s) => self.seg_base[s.index()] = v,
            ArchSlot::SegSel(s) => self.seg_sel[s.index()] = v as u16,
        }
    }

    /// The committed deferred flags record.
    pub fn deferred_flags(&self) -> DeferredFlags {
        DeferredFlags {
            op: FlagsOp::from_raw(self.flags_op),
            op1: self.flags_op1,
            op2: self.flags_op2,
            res: self.flags_res,
            eflags: self.eflags,
        }
    }

    /// Status flags as the guest would observe them, without
    /// changing any state.
    pub fn observed_eflags(&self) -> u32 {
        self.deferred_flags().materialize()
    }
}

impl Default for X86Cpu {
    fn default() -> Self {
        Self::new()
    }
}
