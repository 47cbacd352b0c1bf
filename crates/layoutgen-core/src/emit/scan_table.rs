use crate::names;
use crate::offsets::OffsetView;

use super::{Emitter, EmitterId};

/// Name of the x-macro the collector defines before including a scan file.
pub const SCAN_MACRO: &str = "LAYOUT_SCAN_SLOT";

/// One `LAYOUT_SCAN_SLOT(KIND, SLOT, index, nwords, offset)` entry per boxed slot.
pub struct ScanTableEmitter;

impl Emitter for ScanTableEmitter {
    fn id(&self) -> EmitterId {
        EmitterId::ScanTable
    }

    fn render(&self, view: &OffsetView) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "/* {}: boxed slots as {SCAN_MACRO}(kind, slot, word index, words, tagged offset) */\n",
            view.kind
        ));
        for slot in view.boxed_slots() {
            out.push_str(&format!(
                "{SCAN_MACRO}({}, {}, {}, {}, {})\n",
                names::macro_ident(&view.kind),
                names::macro_ident(&slot.name),
                slot.index,
                slot.width_words,
                slot.byte_offset
            ));
        }
        out
    }
}
