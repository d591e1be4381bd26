use dynarec_core::block::cflags::{CF_COUNT_MASK, CF_NO_IMMEDIATES};
use dynarec_core::flags::ZF;
use dynarec_core::{BlockKey, SegReg, Width};
use dynarec_exec::{
    cpu_exec_loop, BusError, ExitReason, Fallback, FaultKind, GuestRam, NoFallback, Step,
};
use dynarec_frontend::x86::cpu::{X86Cpu, EAX, ECX, NULL_SEG_BASE};
use dynarec_frontend::TranslateError;

use crate::harness::{program, run_to_hlt, test_env, CODE, FLAT32, HLT};

#[test]
fn runs_straight_line_code() {
    // mov eax, 5; add eax, 3
    let mut cpu = X86Cpu::new_flat32();
    let (env, _) = run_to_hlt(&[0xb8, 5, 0, 0, 0, 0x83, 0xc0, 0x03], &mut cpu);
    assert_eq!(cpu.regs[EAX], 8);
    assert_eq!(env.stats.translations, 1);
    assert_eq!(env.stats.fallback_steps, 1);
    // The block stops short of the HLT it could not translate.
    let key = BlockKey::new(0, CODE, FLAT32);
    assert_eq!(env.cache.cflags_for(&key) & CF_COUNT_MASK, 2);
}

#[test]
fn loop_counts_down() {
    // mov ecx, 5; xor eax, eax; l: add eax, 2; loop l
    let code = [0xb9, 5, 0, 0, 0, 0x31, 0xc0, 0x83, 0xc0, 0x02, 0xe2, 0xfb];
    let mut cpu = X86Cpu::new_flat32();
    let (env, _) = run_to_hlt(&code, &mut cpu);
    assert_eq!(cpu.regs[EAX], 10);
    assert_eq!(cpu.regs[ECX], 0);
    assert!(env.cache.stats.hits > 0);
}

#[test]
fn jcxz_skips_on_zero() {
    // jecxz +5; mov eax, 1
    let code = [0xe3, 0x05, 0xb8, 1, 0, 0, 0];
    let mut cpu = X86Cpu::new_flat32();
    cpu.regs[EAX] = 7;
    run_to_hlt(&code, &mut cpu);
    assert_eq!(cpu.regs[EAX], 7);

    let mut cpu = X86Cpu::new_flat32();
    cpu.regs[ECX] = 1;
    run_to_hlt(&code, &mut cpu);
    assert_eq!(cpu.regs[EAX], 1);
}

#[test]
fn loopne_stops_on_match() {
    // mov ecx, 10; xor eax, eax; l: inc eax; cmp eax, 3; loopne l
    let code = [0xb9, 10, 0, 0, 0, 0x31, 0xc0, 0x40, 0x83, 0xf8, 0x03, 0xe0, 0xfa];
    let mut cpu = X86Cpu::new_flat32();
    run_to_hlt(&code, &mut cpu);
    assert_eq!(cpu.regs[EAX], 3);
    assert_eq!(cpu.regs[ECX], 7);
}

#[test]
fn null_segment_faults() {
    // mov eax, [ebx]
    let mut ram = program(&[0x8b, 0x03]);
    let mut cpu = X86Cpu::new_flat32();
    cpu.seg_base[SegReg::Ds.index()] = NULL_SEG_BASE;
    cpu.pc = CODE;
    let exit = cpu_exec_loop(&mut test_env(), &mut cpu, &mut ram, &mut NoFallback);
    assert_eq!(
        exit,
        ExitReason::Fault {
            pc: CODE,
            kind: FaultKind::GeneralProtection,
        }
    );
}

#[test]
fn bus_error_faults() {
    // mov [ebx], eax
    let mut ram = program(&[0x89, 0x03]);
    let mut cpu = X86Cpu::new_flat32();
    cpu.regs[3] = 0x2_0000;
    cpu.pc = CODE;
    let exit = cpu_exec_loop(&mut test_env(), &mut cpu, &mut ram, &mut NoFallback);
    assert_eq!(
        exit,
        ExitReason::Fault {
            pc: CODE,
            kind: FaultKind::Bus(BusError {
                addr: 0x2_0000,
                len: 4,
            }),
        }
    );
}

#[test]
fn budget_runs_out() {
    // jmp $
    let mut ram = program(&[0xeb, 0xfe]);
    let mut cpu = X86Cpu::new_flat32();
    cpu.pc = CODE;
    let mut env = test_env();
    let exit = cpu_exec_loop(&mut env, &mut cpu, &mut ram, &mut NoFallback);
    assert_eq!(exit, ExitReason::BudgetExhausted);
    assert_eq!(env.stats.blocks_run, env.config.block_budget);
    assert_eq!(env.stats.translations, 1);
}

#[test]
fn unsupported_reports_error() {
    let mut ram = program(&[]);
    let mut cpu = X86Cpu::new_flat32();
    cpu.pc = CODE;
    let exit = cpu_exec_loop(&mut test_env(), &mut cpu, &mut ram, &mut NoFallback);
    let ExitReason::Unsupported { pc, error } = exit else {
        panic!("expected unsupported, got {exit:?}");
    };
    assert_eq!(pc, CODE);
    assert!(matches!(
        error,
        TranslateError::Unimplemented { opcode: HLT, insn_index: 0, .. }
    ));
}

/// Interprets CLD as a no-op and records the flags it observed.
#[derive(Default)]
struct CldOnly {
    steps: u32,
    seen_flags: Vec<u32>,
}

impl Fallback for CldOnly {
    fn step(&mut self, cpu: &mut X86Cpu, ram: &mut GuestRam) -> Result<Step, FaultKind> {
        self.steps += 1;
        let linear = cpu.cs_base().wrapping_add(cpu.pc);
        if ram.read(linear, Width::W8)? != 0xfc {
            return Ok(Step::Unsupported);
        }
        self.seen_flags.push(cpu.observed_eflags());
        cpu.pc += 1;
        Ok(Step::Done)
    }
}

#[test]
fn fallback_steps_untranslatable_insn() {
    // xor eax, eax; cld; add eax, 2
    let code = [0x31, 0xc0, 0xfc, 0x83, 0xc0, 0x02];
    let mut ram = program(&code);
    let mut cpu = X86Cpu::new_flat32();
    cpu.regs[EAX] = 0x55;
    cpu.pc = CODE;
    let mut env = test_env();
    let mut fallback = CldOnly::default();
    let exit = cpu_exec_loop(&mut env, &mut cpu, &mut ram, &mut fallback);

    assert!(matches!(exit, ExitReason::Unsupported { pc, .. } if pc == CODE + 6));
    assert_eq!(cpu.regs[EAX], 2);
    assert_eq!(fallback.steps, 2);
    assert_eq!(env.stats.fallback_steps, 2);
    // The deferred record from XOR is visible to the fallback.
    assert_eq!(fallback.seen_flags.len(), 1);
    assert_ne!(fallback.seen_flags[0] & ZF, 0);
}

#[test]
fn self_modifying_store_restarts_translation() {
    let code = [
        0xc6, 0x05, 0x0c, 0x10, 0x00, 0x00, 0x07, // mov byte [0x100c], 7
        0x90, 0x90, 0x90, 0x90, //
        0xb0, 0x01, // 0x100b: mov al, 1
    ];
    let mut cpu = X86Cpu::new_flat32();
    let (env, _) = run_to_hlt(&code, &mut cpu);
    assert_eq!(cpu.regs[EAX] & 0xff, 7);
    assert_eq!(env.stats.self_modified_exits, 1);
    assert_eq!(env.cache.stats.invalidations, 1);

    let key = BlockKey::new(0, CODE, FLAT32);
    assert_ne!(env.cache.cflags_for(&key) & CF_NO_IMMEDIATES, 0);
}

#[test]
fn data_write_leaves_code_cached() {
    // mov byte [0x1009], 1; nop; nop   (0x1009 is past the HLT)
    let code = [0xc6, 0x05, 0x09, 0x10, 0x00, 0x00, 0x01, 0x90];
    let mut cpu = X86Cpu::new_flat32();
    let (env, ram) = run_to_hlt(&code, &mut cpu);
    assert_eq!(ram.read(0x1009, Width::W8).unwrap(), 1);
    assert_eq!(env.cache.stats.invalidations, 0);
    assert_eq!(env.stats.self_modified_exits, 0);
}
