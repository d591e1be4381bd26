/// Micro-op vocabulary of the translation IR.
///
/// Every op carries a `Width` in `Op::width`; see `OPCODE_DEFS` for the
/// argument layout of each opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // -- Data movement --
    Mov = 0,
    MovZx, // zero-extend narrower source into dst width
    MovSx, // sign-extend narrower source into dst width
    MovImm,

    // -- Arithmetic / logic --
    Add,
    Sub,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Sar,
    // Rotates stay within the op width.
    Rol,
    Ror,
    SetCond,

    // -- Guest memory access (fault-guarded) --
    Load,
    Store,
    /// Runtime re-read of instruction bytes, used for immediates in
    /// no-immediates blocks.
    LoadCode,

    // -- External routines --
    Call,
    CallRet,
    CallIf,

    // -- Control flow --
    ExitIf, // compare and leave the block, result never stored
    Exit,

    // -- Misc --
    InsnStart, // marks guest instruction boundary

    // Sentinel, must be last
    Count,
}

/// Flags describing properties of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpFlags(u16);

impl OpFlags {
    pub const NONE: OpFlags = OpFlags(0);
    /// May leave the block.
    pub const BB_EXIT: OpFlags = OpFlags(0x01);
    /// Always leaves the block; nothing after it executes.
    pub const BB_END: OpFlags = OpFlags(0x02);
    /// Invokes an external routine.
    pub const CALL: OpFlags = OpFlags(0x04);
    /// Has side effects; never eliminated.
    pub const SIDE_EFFECTS: OpFlags = OpFlags(0x08);
    /// Touches guest memory and may fault.
    pub const MEM: OpFlags = OpFlags(0x10);
    /// Not lowered to host code (marker only).
    pub const NOT_PRESENT: OpFlags = OpFlags(0x20);
    /// Taken only when its condition holds.
    pub const COND: OpFlags = OpFlags(0x40);

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: OpFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Static definition of an opcode: argument counts and flags.
#[derive(Debug, Clone, Copy)]
pub struct OpDef {
    pub name: &'static str,
    pub nb_oargs: u8,
    pub nb_iargs: u8,
    pub nb_cargs: u8,
    pub flags: OpFlags,
}

impl OpDef {
    pub const fn nb_args(&self) -> u8 {
        self.nb_oargs + self.nb_iargs + self.nb_cargs
    }
}

const fn f(a: OpFlags, b: OpFlags) -> OpFlags {
    OpFlags(a.0 | b.0)
}

const fn def(
    name: &'static str,
    nb_oargs: u8,
    nb_iargs: u8,
    nb_cargs: u8,
    flags: OpFlags,
) -> OpDef {
    OpDef {
        name,
        nb_oargs,
        nb_iargs,
        nb_cargs,
        flags,
    }
}

const N: OpFlags = OpFlags::NONE;
const BX: OpFlags = OpFlags::BB_EXIT;
const BE: OpFlags = OpFlags::BB_END;
const CL: OpFlags = OpFlags::CALL;
const SE: OpFlags = OpFlags::SIDE_EFFECTS;
const MM: OpFlags = OpFlags::MEM;
const NP: OpFlags = OpFlags::NOT_PRESENT;
const CD: OpFlags = OpFlags::COND;

/// Static opcode definition table, indexed by `Opcode as usize`.
pub static OPCODE_DEFS: [OpDef; Opcode::Count as usize] = [
    def("mov", 1, 1, 0, N),
    def("movzx", 1, 1, 0, N),
    def("movsx", 1, 1, 0, N),
    def("movi", 1, 0, 1, N),
    def("add", 1, 2, 0, N),
    def("sub", 1, 2, 0, N),
    def("and", 1, 2, 0, N),
    def("or", 1, 2, 0, N),
    def("xor", 1, 2, 0, N),
    def("shl", 1, 2, 0, N),
    def("shr", 1, 2, 0, N),
    def("sar", 1, 2, 0, N),
    def("rol", 1, 2, 0, N),
    def("ror", 1, 2, 0, N),
    // cargs: cond
    def("setcond", 1, 2, 1, N),
    // iargs: seg_base, addr
    def("ld", 1, 2, 0, f(MM, SE)),
    // iargs: seg_base, addr, value
    def("st", 0, 3, 0, f(MM, SE)),
    // cargs: linear address
    def("ld_code", 1, 0, 1, f(MM, SE)),
    // cargs: helper
    def("call", 0, 0, 1, f(CL, SE)),
    def("call_ret", 1, 0, 1, f(CL, SE)),
    // cargs: cond, helper
    def("call_if", 0, 2, 2, f(f(CL, SE), CD)),
    // cargs: cond, pc
    def("exit_if", 0, 2, 2, f(f(BX, SE), CD)),
    // iargs: target pc
    def("exit", 0, 1, 0, f(f(BX, BE), SE)),
    // cargs: pc
    def("insn_start", 0, 0, 1, NP),
];

impl Opcode {
    pub fn def(self) -> &'static OpDef {
        &OPCODE_DEFS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn flags(self) -> OpFlags {
        self.def().flags
    }

    pub fn touches_memory(self) -> bool {
        self.flags().contains(OpFlags::MEM)
    }
}
