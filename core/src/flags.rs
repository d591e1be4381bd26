//! Deferred flags vocabulary and the x86 status-flag formulas.
//!
//! A flag-defining instruction records only a `FlagsOp` tag plus
//! (op1, op2, res). Individual flags are derived from that record on
//! demand. The formulas here are the single runtime source of truth;
//! the translator emits IR equivalents of the cheap ones.

use crate::types::Width;

pub const CF: u32 = 0x0001;
pub const PF: u32 = 0x0004;
pub const AF: u32 = 0x0010;
pub const ZF: u32 = 0x0040;
pub const SF: u32 = 0x0080;
pub const OF: u32 = 0x0800;

/// All status flags tracked by the deferred model.
pub const STATUS_FLAGS: u32 = CF | PF | AF | ZF | SF | OF;

/// Operation family of a deferred flags record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagsFamily {
    Unknown,
    /// Logic ops: only ZF/SF/PF depend on the result, CF/OF/AF clear.
    Zn,
    Add,
    Sub,
    Inc,
    Dec,
    Adc,
    Sbb,
    /// Shifts record (value, count, result); AF reads clear.
    Shl,
    Shr,
    Sar,
    /// Rotates only define CF and OF. The other flags were
    /// materialized into EFLAGS before the rotate.
    Rol,
    Ror,
}

/// Deferred flags kind, stored raw in the `flags_op` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FlagsOp {
    Unknown = 0,
    Zn8,
    Zn16,
    Zn32,
    Add8,
    Add16,
    Add32,
    Sub8,
    Sub16,
    Sub32,
    Inc8,
    Inc16,
    Inc32,
    Dec8,
    Dec16,
    Dec32,
    Adc8,
    Adc16,
    Adc32,
    Sbb8,
    Sbb16,
    Sbb32,
    Shl8,
    Shl16,
    Shl32,
    Shr8,
    Shr16,
    Shr32,
    Sar8,
    Sar16,
    Sar32,
    Rol8,
    Rol16,
    Rol32,
    Ror8,
    Ror16,
    Ror32,
}

const BY_RAW: [FlagsOp; 37] = [
    FlagsOp::Unknown,
    FlagsOp::Zn8,
    FlagsOp::Zn16,
    FlagsOp::Zn32,
    FlagsOp::Add8,
    FlagsOp::Add16,
    FlagsOp::Add32,
    FlagsOp::Sub8,
    FlagsOp::Sub16,
    FlagsOp::Sub32,
    FlagsOp::Inc8,
    FlagsOp::Inc16,
    FlagsOp::Inc32,
    FlagsOp::Dec8,
    FlagsOp::Dec16,
    FlagsOp::Dec32,
    FlagsOp::Adc8,
    FlagsOp::Adc16,
    FlagsOp::Adc32,
    FlagsOp::Sbb8,
    FlagsOp::Sbb16,
    FlagsOp::Sbb32,
    FlagsOp::Shl8,
    FlagsOp::Shl16,
    FlagsOp::Shl32,
    FlagsOp::Shr8,
    FlagsOp::Shr16,
    FlagsOp::Shr32,
    FlagsOp::Sar8,
    FlagsOp::Sar16,
    FlagsOp::Sar32,
    FlagsOp::Rol8,
    FlagsOp::Rol16,
    FlagsOp::Rol32,
    FlagsOp::Ror8,
    FlagsOp::Ror16,
    FlagsOp::Ror32,
];

impl FlagsOp {
    pub const fn new(family: FlagsFamily, w: Width) -> FlagsOp {
        let base = match family {
            FlagsFamily::Unknown => return FlagsOp::Unknown,
            FlagsFamily::Zn => 1,
            FlagsFamily::Add => 4,
            FlagsFamily::Sub => 7,
            FlagsFamily::Inc => 10,
            FlagsFamily::Dec => 13,
            FlagsFamily::Adc => 16,
            FlagsFamily::Sbb => 19,
            FlagsFamily::Shl => 22,
            FlagsFamily::Shr => 25,
            FlagsFamily::Sar => 28,
            FlagsFamily::Rol => 31,
            FlagsFamily::Ror => 34,
        };
        BY_RAW[base + w as usize]
    }

    /// Decode a raw `flags_op` value; out-of-range values read as
    /// `Unknown`.
    pub fn from_raw(raw: u32) -> FlagsOp {
        BY_RAW.get(raw as usize).copied().unwrap_or(FlagsOp::Unknown)
    }

    pub const fn raw(self) -> u32 {
        self as u32
    }

    pub const fn family(self) -> FlagsFamily {
        match self as u32 {
            0 => FlagsFamily::Unknown,
            1..=3 => FlagsFamily::Zn,
            4..=6 => FlagsFamily::Add,
            7..=9 => FlagsFamily::Sub,
            10..=12 => FlagsFamily::Inc,
            13..=15 => FlagsFamily::Dec,
            16..=18 => FlagsFamily::Adc,
            19..=21 => FlagsFamily::Sbb,
            22..=24 => FlagsFamily::Shl,
            25..=27 => FlagsFamily::Shr,
            28..=30 => FlagsFamily::Sar,
            31..=33 => FlagsFamily::Rol,
            _ => FlagsFamily::Ror,
        }
    }

    /// Operand width of the recorded operation (32 for `Unknown`).
    pub const fn width(self) -> Width {
        match self as u32 {
            0 => Width::W32,
            r => match (r - 1) % 3 {
                0 => Width::W8,
                1 => Width::W16,
                _ => Width::W32,
            },
        }
    }

    pub const fn is_inc_dec(self) -> bool {
        matches!(self.family(), FlagsFamily::Inc | FlagsFamily::Dec)
    }

    pub const fn is_rotate(self) -> bool {
        matches!(self.family(), FlagsFamily::Rol | FlagsFamily::Ror)
    }

    pub const fn name(self) -> &'static str {
        match self.family() {
            FlagsFamily::Unknown => "UNKNOWN",
            FlagsFamily::Zn => "ZN",
            FlagsFamily::Add => "ADD",
            FlagsFamily::Sub => "SUB",
            FlagsFamily::Inc => "INC",
            FlagsFamily::Dec => "DEC",
            FlagsFamily::Adc => "ADC",
            FlagsFamily::Sbb => "SBB",
            FlagsFamily::Shl => "SHL",
            FlagsFamily::Shr => "SHR",
            FlagsFamily::Sar => "SAR",
            FlagsFamily::Rol => "ROL",
            FlagsFamily::Ror => "ROR",
        }
    }
}

/// Even parity of the low byte.
pub fn parity_even(v: u32) -> bool {
    (v as u8).count_ones() % 2 == 0
}

/// A committed deferred flags record plus the EFLAGS image it
/// overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredFlags {
    pub op: FlagsOp,
    pub op1: u32,
    pub op2: u32,
    pub res: u32,
    pub eflags: u32,
}

impl DeferredFlags {
    fn w(&self) -> Width {
        self.op.width()
    }

    fn res_m(&self) -> u32 {
        self.res & self.w().mask()
    }

    /// Shift count, already masked to 1..=31 by the recorder.
    fn count(&self) -> u32 {
        (self.op2 & 0x1f).max(1)
    }

    fn carry_in(&self) -> bool {
        let m = self.w().mask();
        match self.op.family() {
            FlagsFamily::Adc => {
                self.res.wrapping_sub(self.op1).wrapping_sub(self.op2) & m != 0
            }
            FlagsFamily::Sbb => {
                self.op1.wrapping_sub(self.op2).wrapping_sub(self.res) & m != 0
            }
            _ => false,
        }
    }

    pub fn cf(&self) -> bool {
        let m = self.w().mask();
        let (a, b, r) = (self.op1 & m, self.op2 & m, self.res_m());
        match self.op.family() {
            FlagsFamily::Unknown | FlagsFamily::Inc | FlagsFamily::Dec => {
                self.eflags & CF != 0
            }
            FlagsFamily::Zn => false,
            FlagsFamily::Add => r < a,
            FlagsFamily::Sub => a < b,
            FlagsFamily::Adc => {
                if self.carry_in() {
                    r <= a
                } else {
                    r < a
                }
            }
            FlagsFamily::Sbb => {
                if self.carry_in() {
                    a <= b
                } else {
                    a < b
                }
            }
            FlagsFamily::Shl => {
                let n = self.count() - 1;
                (a << n) & self.w().sign_bit() != 0
            }
            FlagsFamily::Shr => (a >> (self.count() - 1)) & 1 != 0,
            FlagsFamily::Sar => {
                let s = self.w().sext(a) as i32;
                (s >> (self.count() - 1)) & 1 != 0
            }
            FlagsFamily::Rol => r & 1 != 0,
            FlagsFamily::Ror => r & self.w().sign_bit() != 0,
        }
    }

    pub fn of(&self) -> bool {
        let w = self.w();
        let (a, b, r) = (self.op1, self.op2, self.res);
        match self.op.family() {
            FlagsFamily::Unknown => self.eflags & OF != 0,
            FlagsFamily::Zn => false,
            FlagsFamily::Add | FlagsFamily::Adc | FlagsFamily::Inc => {
                (a ^ r) & (b ^ r) & w.sign_bit() != 0
            }
            FlagsFamily::Sub | FlagsFamily::Sbb | FlagsFamily::Dec => {
                (a ^ b) & (a ^ r) & w.sign_bit() != 0
            }
            FlagsFamily::Shl => {
                let n = self.count();
                ((a << n) ^ (a << (n - 1))) & w.sign_bit() != 0
            }
            FlagsFamily::Shr => self.count() == 1 && a & w.sign_bit() != 0,
            FlagsFamily::Sar => false,
            FlagsFamily::Rol => (r ^ ((r & w.mask()) >> (w.bits() - 1))) & 1 != 0,
            FlagsFamily::Ror => (r ^ (r >> 1)) & (w.sign_bit() >> 1) != 0,
        }
    }

    pub fn af(&self) -> bool {
        match self.op.family() {
            FlagsFamily::Unknown | FlagsFamily::Rol | FlagsFamily::Ror => {
                self.eflags & AF != 0
            }
            FlagsFamily::Zn
            | FlagsFamily::Shl
            | FlagsFamily::Shr
            | FlagsFamily::Sar => false,
            _ => (self.op1 ^ self.op2 ^ self.res) & 0x10 != 0,
        }
    }

    pub fn zf(&self) -> bool {
        match self.op.family() {
            FlagsFamily::Unknown | FlagsFamily::Rol | FlagsFamily::Ror => {
                self.eflags & ZF != 0
            }
            _ => self.res_m() == 0,
        }
    }

    pub fn sf(&self) -> bool {
        match self.op.family() {
            FlagsFamily::Unknown | FlagsFamily::Rol | FlagsFamily::Ror => {
                self.eflags & SF != 0
            }
            _ => self.res & self.w().sign_bit() != 0,
        }
    }

    pub fn pf(&self) -> bool {
        match self.op.family() {
            FlagsFamily::Unknown | FlagsFamily::Rol | FlagsFamily::Ror => {
                self.eflags & PF != 0
            }
            _ => parity_even(self.res),
        }
    }

    /// EFLAGS with every status flag replaced by its derived value.
    pub fn materialize(&self) -> u32 {
        let mut flags = self.eflags & !STATUS_FLAGS;
        for (set, bit) in [
            (self.cf(), CF),
            (self.pf(), PF),
            (self.af(), AF),
            (self.zf(), ZF),
            (self.sf(), SF),
            (self.of(), OF),
        ] {
            if set {
                flags |= bit;
            }
        }
        flags
    }

    /// EFLAGS with only CF replaced by its derived value.
    pub fn materialize_carry(&self) -> u32 {
        if self.cf() {
            self.eflags | CF
        } else {
            self.eflags & !CF
        }
    }
}
