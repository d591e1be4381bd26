use crate::types::{SegReg, Width, NUM_SEGS};

/// Architectural state a fixed virtual register aliases.
///
/// General-purpose registers are exposed through every x86 view
/// (EAX, AX, AL, AH ...). Writing a narrow view only replaces its
/// bits of the underlying 32-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchSlot {
    /// Full 32-bit register, x86 encoding order (EAX..EDI).
    Gpr32(u8),
    /// Low 16 bits (AX..DI).
    Gpr16(u8),
    /// Low byte of registers 0..4 (AL, CL, DL, BL).
    Gpr8Lo(u8),
    /// Second byte of registers 0..4 (AH, CH, DH, BH).
    Gpr8Hi(u8),
    /// Committed EFLAGS image.
    Eflags,
    /// Deferred flags kind (`FlagsOp` as raw u32).
    FlagsOp,
    FlagsOp1,
    FlagsOp2,
    FlagsRes,
    Pc,
    /// Scratch slot holding the last computed effective address.
    EaAddr,
    SegBase(SegReg),
    /// Visible 16-bit selector of a segment register.
    SegSel(SegReg),
}

const GPR32_BASE: usize = 0;
const GPR16_BASE: usize = 8;
const GPR8LO_BASE: usize = 16;
const GPR8HI_BASE: usize = 20;
const EFLAGS_IDX: usize = 24;
const FLAGS_OP_IDX: usize = 25;
const FLAGS_OP1_IDX: usize = 26;
const FLAGS_OP2_IDX: usize = 27;
const FLAGS_RES_IDX: usize = 28;
const PC_IDX: usize = 29;
const EAADDR_IDX: usize = 30;
const SEG_BASE_IDX: usize = 31;
const SEG_SEL_IDX: usize = SEG_BASE_IDX + NUM_SEGS;

/// Number of fixed architectural virtual registers.
pub const NUM_ARCH_SLOTS: usize = SEG_SEL_IDX + NUM_SEGS;

const GPR32_NAMES: [&str; 8] =
    ["eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi"];
const GPR16_NAMES: [&str; 8] =
    ["ax", "cx", "dx", "bx", "sp", "bp", "si", "di"];
const GPR8_NAMES: [&str; 8] = ["al", "cl", "dl", "bl", "ah", "ch", "dh", "bh"];
const SEG_BASE_NAMES: [&str; NUM_SEGS] = [
    "es_base", "cs_base", "ss_base", "ds_base", "fs_base", "gs_base",
];

impl ArchSlot {
    /// The register view selected by a 3-bit x86 register field at
    /// the given width. 8-bit encodings 4..8 name AH..BH.
    pub const fn gpr(w: Width, reg: u8) -> ArchSlot {
        let reg = reg & 7;
        match w {
            Width::W8 if reg < 4 => ArchSlot::Gpr8Lo(reg),
            Width::W8 => ArchSlot::Gpr8Hi(reg - 4),
            Width::W16 => ArchSlot::Gpr16(reg),
            Width::W32 => ArchSlot::Gpr32(reg),
        }
    }

    pub const fn index(self) -> usize {
        match self {
            ArchSlot::Gpr32(r) => GPR32_BASE + (r as usize & 7),
            ArchSlot::Gpr16(r) => GPR16_BASE + (r as usize & 7),
            ArchSlot::Gpr8Lo(r) => GPR8LO_BASE + (r as usize & 3),
            ArchSlot::Gpr8Hi(r) => GPR8HI_BASE + (r as usize & 3),
            ArchSlot::Eflags => EFLAGS_IDX,
            ArchSlot::FlagsOp => FLAGS_OP_IDX,
            ArchSlot::FlagsOp1 => FLAGS_OP1_IDX,
            ArchSlot::FlagsOp2 => FLAGS_OP2_IDX,
            ArchSlot::FlagsRes => FLAGS_RES_IDX,
            ArchSlot::Pc => PC_IDX,
            ArchSlot::EaAddr => EAADDR_IDX,
            ArchSlot::SegBase(s) => SEG_BASE_IDX + s.index(),
            ArchSlot::SegSel(s) => SEG_SEL_IDX + s.index(),
        }
    }

    pub const fn from_index(idx: usize) -> Option<ArchSlot> {
        Some(match idx {
            0..=7 => ArchSlot::Gpr32(idx as u8),
            8..=15 => ArchSlot::Gpr16((idx - GPR16_BASE) as u8),
            16..=19 => ArchSlot::Gpr8Lo((idx - GPR8LO_BASE) as u8),
            20..=23 => ArchSlot::Gpr8Hi((idx - GPR8HI_BASE) as u8),
            EFLAGS_IDX => ArchSlot::Eflags,
            FLAGS_OP_IDX => ArchSlot::FlagsOp,
            FLAGS_OP1_IDX => ArchSlot::FlagsOp1,
            FLAGS_OP2_IDX => ArchSlot::FlagsOp2,
            FLAGS_RES_IDX => ArchSlot::FlagsRes,
            PC_IDX => ArchSlot::Pc,
            EAADDR_IDX => ArchSlot::EaAddr,
            i if i < SEG_SEL_IDX => {
                ArchSlot::SegBase(SegReg::ALL[i - SEG_BASE_IDX])
            }
            i if i < NUM_ARCH_SLOTS => {
                ArchSlot::SegSel(SegReg::ALL[i - SEG_SEL_IDX])
            }
            _ => return None,
        })
    }

    pub const fn width(self) -> Width {
        match self {
            ArchSlot::Gpr16(_) | ArchSlot::SegSel(_) => Width::W16,
            ArchSlot::Gpr8Lo(_) | ArchSlot::Gpr8Hi(_) => Width::W8,
            _ => Width::W32,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ArchSlot::Gpr32(r) => GPR32_NAMES[r as usize & 7],
            ArchSlot::Gpr16(r) => GPR16_NAMES[r as usize & 7],
            ArchSlot::Gpr8Lo(r) => GPR8_NAMES[r as usize & 3],
            ArchSlot::Gpr8Hi(r) => GPR8_NAMES[4 + (r as usize & 3)],
            ArchSlot::Eflags => "eflags",
            ArchSlot::FlagsOp => "flags_op",
            ArchSlot::FlagsOp1 => "flags_op1",
            ArchSlot::FlagsOp2 => "flags_op2",
            ArchSlot::FlagsRes => "flags_res",
            ArchSlot::Pc => "pc",
            ArchSlot::EaAddr => "eaaddr",
            ArchSlot::SegBase(s) => SEG_BASE_NAMES[s.index()],
            ArchSlot::SegSel(s) => s.name(),
        }
    }
}

/// Scope of a virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VRegKind {
    /// Fixed alias of architectural state; persists across blocks.
    Arch(ArchSlot),
    /// Block-local scratch value.
    Temp,
}

/// Index into the Context's virtual register pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VReg(pub u32);

impl VReg {
    /// The fixed virtual register aliasing `slot`.
    pub const fn arch(slot: ArchSlot) -> VReg {
        VReg(slot.index() as u32)
    }
}

/// A width-tagged virtual register.
#[derive(Debug, Clone)]
pub struct VRegInfo {
    pub idx: VReg,
    pub width: Width,
    pub kind: VRegKind,
    /// Debug name (e.g. "eax", "flags_res").
    pub name: Option<&'static str>,
}

impl VRegInfo {
    pub fn new_temp(idx: VReg, width: Width) -> Self {
        Self {
            idx,
            width,
            kind: VRegKind::Temp,
            name: None,
        }
    }

    pub fn new_arch(idx: VReg, slot: ArchSlot) -> Self {
        Self {
            idx,
            width: slot.width(),
            kind: VRegKind::Arch(slot),
            name: Some(slot.name()),
        }
    }

    pub fn is_arch(&self) -> bool {
        matches!(self.kind, VRegKind::Arch(_))
    }

    pub fn slot(&self) -> Option<ArchSlot> {
        match self.kind {
            VRegKind::Arch(s) => Some(s),
            VRegKind::Temp => None,
        }
    }
}
