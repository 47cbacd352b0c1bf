use crate::descriptor::SlotKind;
use crate::names;
use crate::offsets::{OffsetView, SlotOffset};

use super::{Emitter, EmitterId};

/// Type of the header word in every struct view.
pub const HEADER_C_TYPE: &str = "lispobj";

/// `struct <kind> { lispobj header; ... };` with fields in word-index order.
pub struct CStructEmitter;

impl Emitter for CStructEmitter {
    fn id(&self) -> EmitterId {
        EmitterId::CStruct
    }

    fn render(&self, view: &OffsetView) -> String {
        let mut out = String::new();
        out.push_str(&format!("struct {} {{\n", names::c_ident(&view.kind)));
        out.push_str(&format!("    {HEADER_C_TYPE} {};\n", names::HEADER_FIELD));
        for slot in &view.slots {
            out.push_str(&format!("    {};\n", field_decl(slot, view.word_bytes)));
        }
        out.push_str("};\n");
        out
    }
}

fn field_decl(slot: &SlotOffset, word_bytes: u32) -> String {
    let name = names::c_ident(&slot.name);
    match slot.kind {
        SlotKind::Boxed => array_decl(HEADER_C_TYPE, &name, slot.width_words),
        SlotKind::RawInteger => array_decl("long", &name, slot.width_words),
        SlotKind::RawFloat => {
            if slot.width_words * word_bytes == 4 {
                format!("float {name}")
            } else {
                format!("double {name}")
            }
        }
        SlotKind::PackedPair => format!("uword_t {name}[2]"),
    }
}

fn array_decl(ty: &str, name: &str, width_words: u32) -> String {
    if width_words == 1 {
        format!("{ty} {name}")
    } else {
        format!("{ty} {name}[{width_words}]")
    }
}
