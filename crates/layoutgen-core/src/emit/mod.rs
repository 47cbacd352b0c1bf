//! Emitters: pure projections of an [`OffsetView`] into consumer-specific text.
//!
//! Emitters read offsets, indexes and sizes from the view and never compute
//! them. Their output must depend on nothing but the view, so regeneration
//! is byte-for-byte reproducible.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::names;
use crate::offsets::OffsetView;

pub mod c_struct;
pub mod offset_macros;
pub mod scan_table;

pub use c_struct::CStructEmitter;
pub use offset_macros::OffsetMacroEmitter;
pub use scan_table::ScanTableEmitter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmitterId {
    CStruct,
    OffsetMacros,
    ScanTable,
}

impl EmitterId {
    pub fn as_str(self) -> &'static str {
        match self {
            EmitterId::CStruct => "c-struct",
            EmitterId::OffsetMacros => "offset-macros",
            EmitterId::ScanTable => "scan-table",
        }
    }

    pub fn all() -> &'static [EmitterId] {
        &[EmitterId::CStruct, EmitterId::OffsetMacros, EmitterId::ScanTable]
    }
}

impl fmt::Display for EmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Emitter {
    fn id(&self) -> EmitterId;
    fn render(&self, view: &OffsetView) -> String;
}

/// Text one emitter produced for one object kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub emitter: EmitterId,
    pub text: String,
}

pub fn standard_emitters() -> Vec<Box<dyn Emitter>> {
    vec![
        Box::new(CStructEmitter),
        Box::new(OffsetMacroEmitter),
        Box::new(ScanTableEmitter),
    ]
}

pub fn render_all(view: &OffsetView, emitters: &[Box<dyn Emitter>]) -> Vec<Artifact> {
    emitters
        .iter()
        .map(|e| Artifact {
            emitter: e.id(),
            text: e.render(view),
        })
        .collect()
}

pub fn find(artifacts: &[Artifact], id: EmitterId) -> Option<&Artifact> {
    artifacts.iter().find(|a| a.emitter == id)
}

fn banner(out: &mut String, view: &OffsetView) {
    out.push_str("/*\n");
    out.push_str(" * Generated by layoutgen. Do not edit by hand; regenerate instead.\n");
    out.push_str(" *\n");
    out.push_str(&format!(
        " * {}: lowtag {}, {} words of {} bytes.\n",
        view.kind, view.lowtag, view.size_words, view.word_bytes
    ));
    out.push_str(" */\n");
}

/// Opens the struct section of a header file.
pub(crate) const C_SECTION: &str = "#ifndef __ASSEMBLER__\n\n";
/// Ends the struct section and opens the offset section.
pub(crate) const ASM_SECTION: &str = "\n#else /* __ASSEMBLER__ */\n\n";
/// Ends the offset section.
pub(crate) const END_SECTION: &str = "\n#endif /* __ASSEMBLER__ */\n";

/// `<kind>.h`: the struct view for C, the offset view for the assembler.
pub fn header_file(view: &OffsetView, c_struct: &Artifact, macros: &Artifact) -> String {
    let guard = format!("LAYOUTGEN_{}_H", names::macro_ident(&view.kind));
    let mut out = String::new();
    banner(&mut out, view);
    out.push_str(&format!("#ifndef {guard}\n#define {guard}\n"));
    out.push_str(C_SECTION);
    out.push_str(&c_struct.text);
    out.push_str(ASM_SECTION);
    out.push_str(&macros.text);
    out.push_str(END_SECTION);
    out.push_str(&format!("\n#endif /* {guard} */\n"));
    out
}

/// `<kind>-scan.inc`: x-macro entries, included by the collector.
pub fn scan_file(view: &OffsetView, scan: &Artifact) -> String {
    let mut out = String::new();
    banner(&mut out, view);
    out.push('\n');
    out.push_str(&scan.text);
    out
}
