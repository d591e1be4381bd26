use dynarec_core::dump::{dump_ops_with, dump_to_string};
use dynarec_core::{ArchSlot, Cond, Context, Helper, SegReg, VReg, Width};

fn eax() -> VReg {
    VReg::arch(ArchSlot::gpr(Width::W32, 0))
}

#[test]
fn dump_format() {
    let mut ir = Context::new();
    ir.gen_insn_start(0x1000);
    ir.gen_movi(Width::W32, eax(), 5);
    let t = ir.new_temp(Width::W8);
    ir.gen_add(Width::W8, t, VReg::arch(ArchSlot::gpr(Width::W8, 4)), 1u32);
    ir.gen_call_if(
        Width::W32,
        Cond::Eq,
        VReg::arch(ArchSlot::SegBase(SegReg::Ds)),
        0xffff_ffffu32,
        Helper::RaiseGp,
    );
    ir.gen_exit_if(Width::W32, Cond::Ne, eax(), 0u32, 0x2000);
    ir.gen_exit(0x1005u32);

    let text = dump_to_string(&ir);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], " ---- 0x00001000");
    assert_eq!(lines[1], " movi_32 eax, $0x5");
    assert_eq!(lines[2], " add_8 tmp0, ah, $0x1");
    assert!(lines[3].starts_with(" call_if_32 ds_base, $0xffffffff, eq"));
    assert!(lines[3].contains("raise_gp"), "{}", lines[3]);
    assert!(lines[4].ends_with("ne, pc=0x2000"), "{}", lines[4]);
    assert_eq!(lines[5], " exit $0x1005");
}

#[test]
fn dump_annotation() {
    let mut ir = Context::new();
    ir.gen_insn_start(0x40);
    ir.gen_exit(0x41u32);
    let mut out = Vec::new();
    dump_ops_with(&ir, &mut out, |pc, w| write!(w, " ; pc={pc:#x}")).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with(" ---- 0x00000040 ; pc=0x40\n"));
}
