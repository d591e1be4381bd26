//! Opcode dispatch tables.
//!
//! One table per opcode map and default operand size, so the lookup
//! on the translation path is a plain index. FPU escapes D8..DF are
//! keyed by their ModRM byte.

use std::sync::LazyLock;

use dynarec_core::CodeBlock;

use super::trans::{alu, branch, incdec, misc, mov, shift, stack, TransResult};
use super::width::{Byte, Dword, OpWidth, Word};
use super::{Insn, X86DisasContext};

/// A per-instruction translator.
pub type Translator =
    fn(&mut X86DisasContext<'_>, &mut CodeBlock, &Insn) -> TransResult;

/// Dispatch table slot.
#[derive(Debug, Clone, Copy)]
pub enum Entry {
    Implemented(Translator),
    /// No translator; the block cannot be compiled past this point.
    Unimplemented,
}

impl Entry {
    pub fn is_implemented(&self) -> bool {
        matches!(self, Entry::Implemented(_))
    }
}

const NONE: Entry = Entry::Unimplemented;

/// All dispatch tables. Maps are indexed `[op32 as usize][opcode]`.
pub struct DispatchTables {
    pub base: [[Entry; 256]; 2],
    pub map_0f: [[Entry; 256]; 2],
    /// D8..DF, indexed `[escape - 0xD8][modrm]`.
    pub fpu: [[Entry; 256]; 8],
}

pub static TABLES: LazyLock<DispatchTables> = LazyLock::new(DispatchTables::build);

impl DispatchTables {
    fn build() -> Self {
        let mut t = Self {
            base: [[NONE; 256]; 2],
            map_0f: [[NONE; 256]; 2],
            fpu: [[NONE; 256]; 8],
        };
        fill_base::<Word>(&mut t.base[0]);
        fill_base::<Dword>(&mut t.base[1]);
        fill_0f::<Word>(&mut t.map_0f[0]);
        fill_0f::<Dword>(&mut t.map_0f[1]);
        // No FPU translators; every D8..DF form falls back.
        t
    }

    /// Number of implemented entries across all maps.
    pub fn implemented(&self) -> usize {
        self.base
            .iter()
            .chain(self.map_0f.iter())
            .chain(self.fpu.iter())
            .flat_map(|m| m.iter())
            .filter(|e| e.is_implemented())
            .count()
    }
}

fn set(tab: &mut [Entry; 256], ops: impl IntoIterator<Item = u8>, f: Translator) {
    for op in ops {
        tab[op as usize] = Entry::Implemented(f);
    }
}

/// One-byte map for operand size `V` (Word or Dword).
fn fill_base<V: OpWidth>(tab: &mut [Entry; 256]) {
    // 00..3F: eight ALU rows of six forms each.
    for row in 0..8u8 {
        let b = row << 3;
        set(tab, [b], alu::alu_rm_r::<Byte>);
        set(tab, [b + 1], alu::alu_rm_r::<V>);
        set(tab, [b + 2], alu::alu_r_rm::<Byte>);
        set(tab, [b + 3], alu::alu_r_rm::<V>);
        set(tab, [b + 4], alu::alu_acc_imm::<Byte>);
        set(tab, [b + 5], alu::alu_acc_imm::<V>);
    }
    set(tab, [0x06, 0x0e, 0x16, 0x1e], stack::push_seg::<V>);
    set(tab, [0x07, 0x17, 0x1f], stack::pop_seg::<V>);

    set(tab, 0x40..=0x4f, incdec::inc_dec_reg::<V>);
    set(tab, 0x50..=0x57, stack::push_reg::<V>);
    set(tab, 0x58..=0x5f, stack::pop_reg::<V>);
    set(tab, [0x68, 0x6a], stack::push_imm::<V>);
    set(tab, 0x70..=0x7f, branch::jcc_rel8);

    set(tab, [0x80, 0x82], alu::group1::<Byte>);
    set(tab, [0x81, 0x83], alu::group1::<V>);
    set(tab, [0x84], alu::test_rm_r::<Byte>);
    set(tab, [0x85], alu::test_rm_r::<V>);
    set(tab, [0x86], mov::xchg_rm_r::<Byte>);
    set(tab, [0x87], mov::xchg_rm_r::<V>);

    set(tab, [0x88], mov::mov_rm_r::<Byte>);
    set(tab, [0x89], mov::mov_rm_r::<V>);
    set(tab, [0x8a], mov::mov_r_rm::<Byte>);
    set(tab, [0x8b], mov::mov_r_rm::<V>);
    set(tab, [0x8d], mov::lea::<V>);
    set(tab, [0x8f], stack::pop_rm::<V>);

    set(tab, [0x90], misc::nop);
    set(tab, 0x91..=0x97, mov::xchg_acc::<V>);

    set(tab, [0xa0], mov::mov_acc_moffs::<Byte>);
    set(tab, [0xa1], mov::mov_acc_moffs::<V>);
    set(tab, [0xa2], mov::mov_moffs_acc::<Byte>);
    set(tab, [0xa3], mov::mov_moffs_acc::<V>);
    set(tab, [0xa8], alu::test_acc_imm::<Byte>);
    set(tab, [0xa9], alu::test_acc_imm::<V>);

    set(tab, 0xb0..=0xb7, mov::mov_r_imm::<Byte>);
    set(tab, 0xb8..=0xbf, mov::mov_r_imm::<V>);

    set(tab, [0xc0], shift::shift_imm::<Byte>);
    set(tab, [0xc1], shift::shift_imm::<V>);
    set(tab, [0xc2, 0xc3], branch::ret_near::<V>);
    set(tab, [0xc6], mov::mov_rm_imm::<Byte>);
    set(tab, [0xc7], mov::mov_rm_imm::<V>);

    set(tab, [0xd0], shift::shift_one::<Byte>);
    set(tab, [0xd1], shift::shift_one::<V>);
    set(tab, [0xd2], shift::shift_cl::<Byte>);
    set(tab, [0xd3], shift::shift_cl::<V>);

    set(tab, 0xe0..=0xe3, branch::loop_family);
    set(tab, [0xe8], branch::call_rel::<V>);
    set(tab, [0xe9], branch::jmp_rel::<V>);
    set(tab, [0xeb], branch::jmp_rel8);

    set(tab, [0xf5, 0xf8, 0xf9], misc::carry_op);
    set(tab, [0xf6], alu::group3::<Byte>);
    set(tab, [0xf7], alu::group3::<V>);
    set(tab, [0xfe], incdec::group4);
    set(tab, [0xff], incdec::group5::<V>);
}

/// Two-byte (0F) map for operand size `V`.
fn fill_0f<V: OpWidth>(tab: &mut [Entry; 256]) {
    set(tab, 0x80..=0x8f, branch::jcc_rel::<V>);
    set(tab, [0xb6, 0xb7, 0xbe, 0xbf], mov::movx::<V>);
}
