use dynarec_core::helper::HELPER_COUNT;
use dynarec_core::{
    ArchSlot, Cond, Context, Helper, OpFlags, Opcode, SegReg, VReg, Width, OPCODE_DEFS,
};

#[test]
fn width_masks() {
    assert_eq!(Width::W8.mask(), 0xff);
    assert_eq!(Width::W16.mask(), 0xffff);
    assert_eq!(Width::W32.mask(), 0xffff_ffff);
    assert_eq!(Width::W16.sign_bit(), 0x8000);
    assert_eq!(Width::W8.sext(0x80), 0xffff_ff80);
    assert_eq!(Width::W16.sext(0x7fff), 0x7fff);
}

#[test]
fn cond_invert_roundtrip() {
    for raw in 0..32 {
        if let Some(c) = Cond::from_raw(raw) {
            assert_eq!(c.invert().invert(), c);
            assert_eq!(Cond::from_raw(c as u32), Some(c));
        }
    }
}

#[test]
fn cond_eval_respects_width() {
    // 0xff is -1 as a byte but 255 as a dword.
    assert!(Cond::Lt.eval(Width::W8, 0xff, 0));
    assert!(!Cond::Lt.eval(Width::W32, 0xff, 0));
    assert!(Cond::Eq.eval(Width::W8, 0x100, 0));
    assert!(Cond::Ltu.eval(Width::W16, 0x1_0001, 2));
    assert!(Cond::TstNe.eval(Width::W32, 0x80, 0x80));
}

#[test]
fn cond_invert_negates() {
    let samples = [(0u32, 0u32), (1, 2), (0xffff_ffff, 1), (0x8000_0000, 0x7fff_ffff)];
    for raw in 0..32 {
        let Some(c) = Cond::from_raw(raw) else { continue };
        for w in [Width::W8, Width::W16, Width::W32] {
            for (a, b) in samples {
                assert_ne!(c.eval(w, a, b), c.invert().eval(w, a, b), "{c:?} {w:?}");
            }
        }
    }
}

#[test]
fn opcode_table_in_order() {
    assert_eq!(OPCODE_DEFS.len(), Opcode::Count as usize);
    assert_eq!(Opcode::Exit.name(), "exit");
    assert_eq!(Opcode::LoadCode.name(), "ld_code");
    assert!(Opcode::Exit.flags().contains(OpFlags::BB_EXIT));
    assert!(!Opcode::CallIf.flags().contains(OpFlags::BB_EXIT));
    assert!(Opcode::Store.touches_memory());
}

#[test]
fn helper_roundtrip() {
    assert_eq!(Helper::ALL.len(), HELPER_COUNT);
    for h in Helper::ALL {
        assert_eq!(Helper::from_raw(h as u32), Some(h));
    }
    assert_eq!(Helper::from_raw(HELPER_COUNT as u32), None);
    assert!(Helper::FlagsRebuild.is_flags());
    assert!(!Helper::RaiseGp.is_flags());
}

#[test]
fn arch_slot_index_roundtrip() {
    let slots = [
        ArchSlot::gpr(Width::W32, 5),
        ArchSlot::gpr(Width::W16, 3),
        ArchSlot::gpr(Width::W8, 1),
        ArchSlot::gpr(Width::W8, 6),
        ArchSlot::Eflags,
        ArchSlot::FlagsRes,
        ArchSlot::EaAddr,
        ArchSlot::SegBase(SegReg::Gs),
    ];
    for s in slots {
        assert_eq!(ArchSlot::from_index(s.index()), Some(s));
    }
    // Byte registers 4..7 are the high halves of 0..3.
    assert_eq!(ArchSlot::gpr(Width::W8, 6), ArchSlot::Gpr8Hi(2));
    assert_eq!(ArchSlot::gpr(Width::W8, 6).name(), "dh");
}

#[test]
fn temps_follow_arch_pool() {
    let mut ir = Context::new();
    let eax = VReg::arch(ArchSlot::gpr(Width::W32, 0));
    assert!(ir.vreg(eax).is_arch());
    assert_eq!(ir.vreg(eax).slot(), Some(ArchSlot::Gpr32(0)));

    let t = ir.new_temp(Width::W16);
    assert!(!ir.vreg(t).is_arch());
    assert_eq!(ir.vreg(t).width, Width::W16);
    assert_eq!(ir.nb_vregs(), t.0 + 1);
}
