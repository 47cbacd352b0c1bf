use crate::names;
use crate::offsets::OffsetView;

use super::{Emitter, EmitterId};

/// `#define <KIND>_<SLOT>_OFFSET` per slot, then `#define <KIND>_SIZE` in words.
pub struct OffsetMacroEmitter;

impl Emitter for OffsetMacroEmitter {
    fn id(&self) -> EmitterId {
        EmitterId::OffsetMacros
    }

    fn render(&self, view: &OffsetView) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "/* Offsets are SLOT-INDEX * N-WORD-BYTES - LOWTAG (lowtag {}),\n",
            view.lowtag
        ));
        out.push_str(" * for use directly on tagged pointers. */\n\n");
        for slot in &view.slots {
            out.push_str(&format!(
                "#define {} {}\n",
                names::offset_macro(&view.kind, &slot.name),
                slot.byte_offset
            ));
        }
        out.push_str(&format!(
            "#define {} {}\n",
            names::size_macro(&view.kind),
            view.size_words
        ));
        out
    }
}
