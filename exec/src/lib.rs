//! Execution side of the recompiler: block cache, reference IR
//! executor, runtime flag routines and the execute loop.
//!
//! Drives the lookup → translate → execute cycle. Instructions the
//! frontend cannot translate are handed to a single-step fallback
//! interpreter.

pub mod block_cache;
pub mod exec_loop;
pub mod helpers;
pub mod interp;
pub mod memory;

pub use block_cache::{BlockCache, CacheStats};
pub use exec_loop::{cpu_exec_loop, ExecEnv, ExecStats, ExitReason, Fallback, NoFallback, Step};
pub use helpers::HelperCounts;
pub use interp::{BlockExit, Executor};
pub use memory::GuestRam;

/// Guest access outside the populated RAM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("bus error: {len}-byte access at {addr:#010x}")]
pub struct BusError {
    pub addr: u32,
    pub len: u32,
}

/// A fault raised while running guest code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FaultKind {
    /// #GP(0), e.g. an access through a null segment.
    #[error("general protection fault")]
    GeneralProtection,
    #[error(transparent)]
    Bus(#[from] BusError),
    /// The IR named a routine that does not exist.
    #[error("unknown helper {0}")]
    BadHelper(u32),
}

/// Execution tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecConfig {
    /// Live blocks kept before the cache is flushed.
    pub cache_capacity: usize,
    /// Blocks or fallback steps run per `cpu_exec_loop` call.
    pub block_budget: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 4096,
            block_budget: 100_000,
        }
    }
}
