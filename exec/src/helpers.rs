//! Runtime side of the external routines named by `Helper`.

use dynarec_core::flags::FlagsOp;
use dynarec_core::helper::HELPER_COUNT;
use dynarec_core::Helper;
use dynarec_frontend::x86::cpu::{X86Cpu, EFLAGS_FIXED};

use crate::FaultKind;

/// How often each routine ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HelperCounts {
    counts: [u64; HELPER_COUNT],
}

impl HelperCounts {
    pub fn get(&self, helper: Helper) -> u64 {
        self.counts[helper as usize]
    }

    /// Calls to any flags routine.
    pub fn flags_total(&self) -> u64 {
        Helper::ALL
            .iter()
            .filter(|h| h.is_flags())
            .map(|&h| self.get(h))
            .sum()
    }

    fn bump(&mut self, helper: Helper) {
        self.counts[helper as usize] += 1;
    }
}

/// Run `helper` on `cpu`. Query routines return 0/1; the others
/// return 0.
pub fn call_helper(
    cpu: &mut X86Cpu,
    helper: Helper,
    counts: &mut HelperCounts,
) -> Result<u32, FaultKind> {
    counts.bump(helper);
    let flags = cpu.deferred_flags();
    let v = match helper {
        Helper::FlagsRebuild => {
            cpu.eflags = flags.materialize() | EFLAGS_FIXED;
            cpu.flags_op = FlagsOp::Unknown.raw();
            0
        }
        Helper::FlagsRebuildCarry => {
            cpu.eflags = flags.materialize_carry() | EFLAGS_FIXED;
            0
        }
        Helper::CfSet => flags.cf() as u32,
        Helper::PfSet => flags.pf() as u32,
        Helper::AfSet => flags.af() as u32,
        Helper::ZfSet => flags.zf() as u32,
        Helper::SfSet => flags.sf() as u32,
        Helper::OfSet => flags.of() as u32,
        Helper::RaiseGp => return Err(FaultKind::GeneralProtection),
    };
    Ok(v)
}
