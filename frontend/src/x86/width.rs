//! Compile-time operand widths.
//!
//! Translators are generic over `OpWidth` so each width gets its own
//! monomorphized function and the dispatch tables hold one concrete
//! translator per operation, width and form.

use dynarec_core::Width;

pub trait OpWidth {
    const W: Width;
}

pub struct Byte;
pub struct Word;
pub struct Dword;

impl OpWidth for Byte {
    const W: Width = Width::W8;
}

impl OpWidth for Word {
    const W: Width = Width::W16;
}

impl OpWidth for Dword {
    const W: Width = Width::W32;
}
