use dynarec_core::flags::{parity_even, CF, STATUS_FLAGS, ZF};
use dynarec_core::{DeferredFlags, FlagsFamily, FlagsOp, Width};
use proptest::prelude::*;

use crate::model;

fn width() -> impl Strategy<Value = Width> {
    prop_oneof![Just(Width::W8), Just(Width::W16), Just(Width::W32)]
}

/// The deferred record the translator commits for ALU row `op`.
fn record(op: u8, w: Width, a: u32, b: u32, res: u32, eflags: u32) -> DeferredFlags {
    let family = match op {
        0 => FlagsFamily::Add,
        2 => FlagsFamily::Adc,
        3 => FlagsFamily::Sbb,
        5 | 7 => FlagsFamily::Sub,
        _ => FlagsFamily::Zn,
    };
    DeferredFlags {
        op: FlagsOp::new(family, w),
        op1: a & w.mask(),
        op2: b & w.mask(),
        res,
        eflags,
    }
}

#[test]
fn flags_op_raw_roundtrip() {
    for fam in [
        FlagsFamily::Zn,
        FlagsFamily::Add,
        FlagsFamily::Sub,
        FlagsFamily::Inc,
        FlagsFamily::Dec,
        FlagsFamily::Adc,
        FlagsFamily::Sbb,
    ] {
        for w in [Width::W8, Width::W16, Width::W32] {
            let op = FlagsOp::new(fam, w);
            assert_eq!(op.family(), fam);
            assert_eq!(op.width(), w);
            assert_eq!(FlagsOp::from_raw(op.raw()), op);
        }
    }
    assert_eq!(FlagsOp::from_raw(999), FlagsOp::Unknown);
}

#[test]
fn parity_uses_low_byte() {
    assert!(parity_even(0));
    assert!(parity_even(0x0300));
    assert!(!parity_even(0x01));
    assert!(parity_even(0x1_03));
}

#[test]
fn unknown_reads_eflags() {
    let f = DeferredFlags {
        op: FlagsOp::Unknown,
        op1: 1,
        op2: 2,
        res: 0,
        eflags: 0x2 | CF,
    };
    assert_eq!(f.materialize() & STATUS_FLAGS, CF);
    assert!(!f.zf());
}

#[test]
fn adc_with_carry_wraps_to_zero() {
    // 0xff + 0 + 1 = 0x100: CF set, result zero.
    let f = record(2, Width::W8, 0xff, 0, 0x00, CF);
    assert!(f.cf());
    assert!(f.zf());
    let f = record(3, Width::W8, 0, 0xff, 0x00, CF);
    assert!(f.cf());
    assert_eq!(f.materialize() & ZF, ZF);
}

proptest! {
    #[test]
    fn deferred_alu_matches_eager(
        op in 0u8..8,
        w in width(),
        a in any::<u32>(),
        b in any::<u32>(),
        carry in any::<bool>(),
    ) {
        let flags_in = if carry { CF } else { 0 };
        let eager = model::alu(op, w, a, b, flags_in);
        let f = record(op, w, a, b, eager.res, 0x2 | flags_in);
        prop_assert_eq!(f.materialize() & STATUS_FLAGS, eager.flags);
    }

    #[test]
    fn deferred_inc_dec_matches_eager(
        dec in any::<bool>(),
        w in width(),
        a in any::<u32>(),
        carry in any::<bool>(),
    ) {
        let a = a & w.mask();
        let flags_in = if carry { CF } else { 0 };
        let eager = model::inc_dec(dec, w, a, flags_in);
        let family = if dec { FlagsFamily::Dec } else { FlagsFamily::Inc };
        let f = DeferredFlags {
            op: FlagsOp::new(family, w),
            op1: a,
            op2: 1,
            res: eager.res,
            eflags: 0x2 | flags_in,
        };
        prop_assert_eq!(f.materialize() & STATUS_FLAGS, eager.flags);
        prop_assert_eq!(f.materialize_carry() & CF, flags_in);
    }

    #[test]
    fn deferred_neg_matches_eager(w in width(), a in any::<u32>()) {
        let a = a & w.mask();
        let eager = model::neg(w, a);
        let f = DeferredFlags {
            op: FlagsOp::new(FlagsFamily::Sub, w),
            op1: 0,
            op2: a,
            res: eager.res,
            eflags: 0x2,
        };
        prop_assert_eq!(f.materialize() & STATUS_FLAGS, eager.flags);
    }
}
