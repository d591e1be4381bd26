use dynarec_core::{BlockKey, CodeBlock};
use dynarec_frontend::x86::cpu::X86Cpu;
use dynarec_frontend::x86::translate_block;
use dynarec_frontend::TranslateError;
use tracing::debug;

use crate::block_cache::BlockCache;
use crate::interp::{BlockExit, Executor};
use crate::memory::GuestRam;
use crate::{ExecConfig, FaultKind};

/// Reason the execution loop returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The guest faulted at `pc`.
    Fault { pc: u32, kind: FaultKind },
    /// Neither the translator nor the fallback handles the
    /// instruction at `pc`.
    Unsupported { pc: u32, error: TranslateError },
    /// `ExecConfig::block_budget` ran out.
    BudgetExhausted,
}

/// Outcome of a fallback step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One instruction ran; `cpu.pc` is the next one.
    Done,
    /// The fallback does not know the instruction either.
    Unsupported,
}

/// Single-instruction interpreter used when translation fails.
///
/// Reads flags with `X86Cpu::observed_eflags` and must leave the
/// deferred record consistent with what it writes to `eflags`.
pub trait Fallback {
    fn step(&mut self, cpu: &mut X86Cpu, ram: &mut GuestRam) -> Result<Step, FaultKind>;
}

/// Fallback that handles nothing.
pub struct NoFallback;

impl Fallback for NoFallback {
    fn step(&mut self, _cpu: &mut X86Cpu, _ram: &mut GuestRam) -> Result<Step, FaultKind> {
        Ok(Step::Unsupported)
    }
}

/// Execution loop counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecStats {
    pub blocks_run: u64,
    pub translations: u64,
    pub fallback_steps: u64,
    pub self_modified_exits: u64,
}

/// Execution environment holding all shared translation state.
pub struct ExecEnv {
    pub cache: BlockCache,
    pub executor: Executor,
    pub config: ExecConfig,
    pub stats: ExecStats,
}

impl ExecEnv {
    pub fn new(config: ExecConfig) -> Self {
        Self {
            cache: BlockCache::new(config.cache_capacity),
            executor: Executor::new(),
            config,
            stats: ExecStats::default(),
        }
    }

    /// Apply pending guest writes to the cache.
    pub fn sync_writes(&mut self, ram: &mut GuestRam) {
        for (start, len) in ram.take_writes() {
            self.cache.invalidate_range(start, len);
        }
    }
}

impl Default for ExecEnv {
    fn default() -> Self {
        Self::new(ExecConfig::default())
    }
}

/// Main CPU execution loop.
///
/// Repeatedly looks up or translates blocks and runs them until the
/// guest faults, hits code nothing can execute, or the budget is
/// spent.
pub fn cpu_exec_loop(
    env: &mut ExecEnv,
    cpu: &mut X86Cpu,
    ram: &mut GuestRam,
    fallback: &mut dyn Fallback,
) -> ExitReason {
    for _ in 0..env.config.block_budget {
        env.sync_writes(ram);
        let key = BlockKey::new(cpu.cs_base(), cpu.pc, cpu.translation_flags());

        let idx = match tb_find(env, ram, key) {
            Ok(idx) => idx,
            Err(error) => {
                debug!(pc = cpu.pc, %error, "interpreting one instruction");
                env.stats.fallback_steps += 1;
                match fallback.step(cpu, ram) {
                    Ok(Step::Done) => continue,
                    Ok(Step::Unsupported) => {
                        return ExitReason::Unsupported { pc: cpu.pc, error };
                    }
                    Err(kind) => return ExitReason::Fault { pc: cpu.pc, kind },
                }
            }
        };

        let Some(block) = env.cache.get(idx) else {
            continue;
        };
        env.stats.blocks_run += 1;
        match env.executor.run(block, cpu, ram) {
            BlockExit::Jump => {}
            BlockExit::SelfModified => env.stats.self_modified_exits += 1,
            BlockExit::Fault { pc, kind } => {
                env.sync_writes(ram);
                return ExitReason::Fault { pc, kind };
            }
        }
    }
    env.sync_writes(ram);
    ExitReason::BudgetExhausted
}

/// Find a block for `key`, translating if needed.
///
/// A translation that fails partway is retried once, stopping before
/// the failing instruction.
pub fn tb_find(
    env: &mut ExecEnv,
    ram: &GuestRam,
    key: BlockKey,
) -> Result<usize, TranslateError> {
    if let Some(idx) = env.cache.lookup(&key) {
        return Ok(idx);
    }
    match tb_gen_code(env, ram, key) {
        Err(TranslateError::Unimplemented { insn_index, .. }) if insn_index > 0 => {
            env.cache.note_insn_limit(key, insn_index);
            tb_gen_code(env, ram, key)
        }
        r => r,
    }
}

fn tb_gen_code(
    env: &mut ExecEnv,
    ram: &GuestRam,
    key: BlockKey,
) -> Result<usize, TranslateError> {
    let cflags = env.cache.cflags_for(&key);
    let mut block = CodeBlock::new(key, cflags);
    translate_block(ram, &mut block)?;
    env.stats.translations += 1;
    Ok(env.cache.insert(block))
}
