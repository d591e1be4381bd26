use dynarec_core::flags::{CF, OF, SF, ZF};
use dynarec_core::{Helper, Width};
use dynarec_frontend::x86::cpu::{X86Cpu, EAX, ECX};

use crate::harness::{helper_calls, program, run_program, run_to_hlt, translate, CODE, FLAT32};

fn flag(cpu: &X86Cpu, f: u32) -> bool {
    cpu.observed_eflags() & f != 0
}

#[test]
fn add_al_overflows_into_sign() {
    let mut cpu = X86Cpu::new_flat32();
    cpu.regs[EAX] = 0x01;
    // add al, 0x7f
    run_to_hlt(&[0x04, 0x7f], &mut cpu);
    assert_eq!(cpu.regs[EAX], 0x80);
    assert!(!flag(&cpu, ZF));
    assert!(flag(&cpu, SF));
    assert!(flag(&cpu, OF));
    assert!(!flag(&cpu, CF));
}

#[test]
fn cmp_eax_equal_immediate() {
    let mut cpu = X86Cpu::new_flat32();
    cpu.regs[EAX] = 5;
    // cmp eax, 5
    run_to_hlt(&[0x3d, 0x05, 0x00, 0x00, 0x00], &mut cpu);
    assert_eq!(cpu.regs[EAX], 5);
    assert!(flag(&cpu, ZF));
    assert!(!flag(&cpu, CF));
}

#[test]
fn inc_cx_wraps_and_keeps_committed_carry() {
    let mut cpu = X86Cpu::new_flat32();
    cpu.regs[ECX] = 0x1234_ffff;
    cpu.eflags |= CF;
    // inc cx
    run_to_hlt(&[0x66, 0x41], &mut cpu);
    assert_eq!(cpu.regs[ECX], 0x1234_0000);
    assert!(flag(&cpu, ZF));
    assert!(flag(&cpu, CF));
}

#[test]
fn inc_cx_keeps_carry_set_in_block() {
    let mut cpu = X86Cpu::new_flat32();
    cpu.regs[ECX] = 0xffff;
    // stc; inc cx
    run_to_hlt(&[0xf9, 0x66, 0x41], &mut cpu);
    assert_eq!(cpu.regs[ECX], 0);
    assert!(flag(&cpu, ZF));
    assert!(flag(&cpu, CF));
}

#[test]
fn add_byte_mem_group_form() {
    // add byte [eax], 1
    let code = [0x80, 0x00, 0x01];

    let block = translate(&code, FLAT32, 1).unwrap();
    assert_eq!(block.size, 3);
    assert_eq!(block.provenance.ranges(), &[CODE as u64..CODE as u64 + 3]);

    let mut ram = program(&code);
    ram.load(0x2000, &[0xff]).unwrap();
    let mut cpu = X86Cpu::new_flat32();
    cpu.regs[EAX] = 0x2000;
    run_program(&mut ram, &mut cpu, code.len());
    assert_eq!(ram.read(0x2000, Width::W8).unwrap(), 0);
    assert_eq!(cpu.regs[EAX], 0x2000);
    assert!(flag(&cpu, ZF));
    assert!(flag(&cpu, CF));
}

#[test]
fn two_branches_after_add_derive_zero_inline() {
    // add eax, ebx; jz +0; jnz +0
    let code = [0x01, 0xd8, 0x74, 0x00, 0x75, 0x00];

    let block = translate(&code, FLAT32, 3).unwrap();
    assert_eq!(helper_calls(&block, Helper::FlagsRebuild), 0);
    assert_eq!(helper_calls(&block, Helper::ZfSet), 0);
    assert_eq!(block.stats.flag_helper_calls, 0);
    assert_eq!(block.stats.derived_queries, 2);

    let mut cpu = X86Cpu::new_flat32();
    cpu.regs = [1, 0, 0, 0xffff_ffff, 0, 0, 0, 0];
    let (env, _) = run_to_hlt(&code, &mut cpu);
    assert_eq!(env.executor.counts.flags_total(), 0);
    assert_eq!(cpu.regs[EAX], 0);
    assert!(flag(&cpu, ZF));
}
