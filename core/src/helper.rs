/// External routines the IR may call.
///
/// These are owned by the execution side; the translation layer only
/// names them. Flag routines operate on the committed deferred-flags
/// state (`flags_op`, `flags_op1`, `flags_op2`, `flags_res`, `eflags`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Helper {
    /// Materialize every status flag into EFLAGS and mark the
    /// deferred state UNKNOWN.
    FlagsRebuild = 0,
    /// Materialize only CF into EFLAGS; the deferred kind is kept.
    FlagsRebuildCarry,
    CfSet,
    PfSet,
    AfSet,
    ZfSet,
    SfSet,
    OfSet,
    /// Deliver #GP(0) for a null segment access.
    RaiseGp,
}

pub const HELPER_COUNT: usize = 9;

impl Helper {
    pub const ALL: [Helper; HELPER_COUNT] = [
        Helper::FlagsRebuild,
        Helper::FlagsRebuildCarry,
        Helper::CfSet,
        Helper::PfSet,
        Helper::AfSet,
        Helper::ZfSet,
        Helper::SfSet,
        Helper::OfSet,
        Helper::RaiseGp,
    ];

    pub fn from_raw(raw: u32) -> Option<Helper> {
        Self::ALL.get(raw as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Helper::FlagsRebuild => "flags_rebuild",
            Helper::FlagsRebuildCarry => "flags_rebuild_c",
            Helper::CfSet => "cf_set",
            Helper::PfSet => "pf_set",
            Helper::AfSet => "af_set",
            Helper::ZfSet => "zf_set",
            Helper::SfSet => "sf_set",
            Helper::OfSet => "of_set",
            Helper::RaiseGp => "raise_gp",
        }
    }

    /// Whether the routine reads or rebuilds deferred flags.
    pub const fn is_flags(self) -> bool {
        !matches!(self, Helper::RaiseGp)
    }
}
