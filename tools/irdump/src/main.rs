//! dynarec-irdump: raw x86 code → IR dump tool.
//!
//! Loads a flat binary image, translates it block by block along the
//! fall-through path and prints the IR of every block.

use std::collections::HashMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, ValueEnum};
use dynarec_core::block::cflags::{CF_COUNT_MASK, CF_NO_IMMEDIATES};
use dynarec_core::block::flags::{FLAG_CODE32, FLAG_PROTECTED};
use dynarec_core::dump::dump_ops_with;
use dynarec_core::{BlockKey, CodeBlock, Opcode};
use dynarec_frontend::x86::fetch::GuestMemory;
use dynarec_frontend::x86::translate_block;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CPU mode the image is translated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Real mode, 16-bit defaults, no segment checks.
    Real,
    /// 16-bit protected mode.
    Prot16,
    /// 32-bit protected mode.
    Prot32,
}

impl Mode {
    fn flags(self) -> u32 {
        match self {
            Mode::Real => 0,
            Mode::Prot16 => FLAG_PROTECTED,
            Mode::Prot32 => FLAG_PROTECTED | FLAG_CODE32,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "dynarec-irdump", about = "Translate raw x86 code and print the IR")]
struct Args {
    /// Flat binary image.
    image: PathBuf,

    /// Linear address the image is loaded at (hex).
    #[arg(long, default_value = "0", value_parser = parse_hex)]
    load: u32,

    /// Code segment base (hex).
    #[arg(long, default_value = "0", value_parser = parse_hex)]
    cs_base: u32,

    /// First PC, relative to the code segment (hex). Defaults to the
    /// load address.
    #[arg(long, value_parser = parse_hex)]
    start: Option<u32>,

    #[arg(long, value_enum, default_value_t = Mode::Prot32)]
    mode: Mode,

    /// Maximum number of blocks to translate.
    #[arg(long, default_value_t = 16)]
    count: usize,

    /// Maximum instructions per block (0 = default).
    #[arg(long, default_value_t = 0)]
    max_insns: u32,

    /// Load immediates from guest memory at run time.
    #[arg(long)]
    no_immediates: bool,

    /// Write the dump here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_hex(s: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16)
}

/// Guest image mapped at `load`; everything else reads as 0xFF.
struct Image {
    load: u32,
    bytes: Vec<u8>,
}

impl Image {
    fn contains(&self, linear: u32) -> bool {
        linear
            .checked_sub(self.load)
            .is_some_and(|off| (off as usize) < self.bytes.len())
    }
}

impl GuestMemory for Image {
    fn read_u8(&self, addr: u32) -> u8 {
        addr.checked_sub(self.load)
            .and_then(|off| self.bytes.get(off as usize).copied())
            .unwrap_or(0xff)
    }
}

/// Encoded length of every instruction in `block`, keyed by PC.
fn insn_lengths(block: &CodeBlock) -> HashMap<u32, u32> {
    let starts: Vec<u32> = block
        .ir
        .ops()
        .iter()
        .filter(|op| op.opc == Opcode::InsnStart)
        .map(|op| op.carg(0))
        .collect();
    let end = block.pc().wrapping_add(block.size);
    starts
        .iter()
        .enumerate()
        .map(|(i, &pc)| {
            let next = starts.get(i + 1).copied().unwrap_or(end);
            (pc, next.wrapping_sub(pc))
        })
        .collect()
}

fn dump_block(image: &Image, block: &CodeBlock, w: &mut impl Write) -> io::Result<()> {
    let lengths = insn_lengths(block);
    let cs_base = block.cs_base();
    dump_ops_with(&block.ir, w, |pc, w| {
        let len = lengths.get(&pc).copied().unwrap_or(0);
        write!(w, " ")?;
        for i in 0..len {
            let b = image.read_u8(cs_base.wrapping_add(pc).wrapping_add(i));
            write!(w, " {b:02x}")?;
        }
        Ok(())
    })?;
    let s = block.stats;
    writeln!(
        w,
        " # {} insns, {} bytes, {} flag calls, {} carry rebuilds, {} derived, {} seg checks",
        block.icount,
        block.size,
        s.flag_helper_calls,
        s.carry_rebuilds,
        s.derived_queries,
        s.seg_checks
    )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let bytes = fs::read(&args.image)
        .with_context(|| format!("failed to read {}", args.image.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", args.image.display());
    }
    let image = Image {
        load: args.load,
        bytes,
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => {
            let f = fs::File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            Box::new(BufWriter::new(f))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut cflags = args.max_insns & CF_COUNT_MASK;
    if args.no_immediates {
        cflags |= CF_NO_IMMEDIATES;
    }
    let flags = args.mode.flags();
    let mut pc = args.start.unwrap_or(args.load.wrapping_sub(args.cs_base));

    for n in 0..args.count {
        if !image.contains(args.cs_base.wrapping_add(pc)) {
            break;
        }
        let mut block = CodeBlock::new(BlockKey::new(args.cs_base, pc, flags), cflags);
        writeln!(out, "BLOCK #{n} @ {:#06x}:{pc:#x}", args.cs_base)?;
        if let Err(e) = translate_block(&image, &mut block) {
            warn!(pc, "translation stopped: {e}");
            writeln!(out, " # {e}")?;
            break;
        }
        dump_block(&image, &block, &mut out)?;
        writeln!(out)?;
        pc = pc.wrapping_add(block.size);
    }
    out.flush()?;
    info!(image = %args.image.display(), "done");
    Ok(())
}
