use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    Catalog,
    Target,
    Resolve,
    Check,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiagnosticCode {
    LG0001CatalogInvalid,
    LG0002DuplicateKind,
    LG0100MalformedLayout,
    LG0200LayoutDivergence,
    LG0300UnsupportedWordSize,
    LG0301InvalidTarget,
    LG0400StaleArtifact,
    LG0900Io,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::LG0001CatalogInvalid => "LG0001",
            DiagnosticCode::LG0002DuplicateKind => "LG0002",
            DiagnosticCode::LG0100MalformedLayout => "LG0100",
            DiagnosticCode::LG0200LayoutDivergence => "LG0200",
            DiagnosticCode::LG0300UnsupportedWordSize => "LG0300",
            DiagnosticCode::LG0301InvalidTarget => "LG0301",
            DiagnosticCode::LG0400StaleArtifact => "LG0400",
            DiagnosticCode::LG0900Io => "LG0900",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            DiagnosticCode::LG0001CatalogInvalid | DiagnosticCode::LG0002DuplicateKind => {
                Phase::Catalog
            }
            DiagnosticCode::LG0100MalformedLayout => Phase::Resolve,
            DiagnosticCode::LG0200LayoutDivergence => Phase::Check,
            DiagnosticCode::LG0300UnsupportedWordSize | DiagnosticCode::LG0301InvalidTarget => {
                Phase::Target
            }
            DiagnosticCode::LG0400StaleArtifact | DiagnosticCode::LG0900Io => Phase::Write,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::LG0001CatalogInvalid => "catalog could not be read",
            DiagnosticCode::LG0002DuplicateKind => "object kind declared twice",
            DiagnosticCode::LG0100MalformedLayout => "layout descriptor is malformed",
            DiagnosticCode::LG0200LayoutDivergence => "emitted views disagree with the layout",
            DiagnosticCode::LG0300UnsupportedWordSize => "unsupported word size",
            DiagnosticCode::LG0301InvalidTarget => "invalid target configuration",
            DiagnosticCode::LG0400StaleArtifact => "generated artifact is out of date",
            DiagnosticCode::LG0900Io => "filesystem error",
        }
    }

    pub fn default_help(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::LG0100MalformedLayout => Some(
                "Fix the kind in the catalog: size_words must equal the aligned header + slot words.",
            ),
            DiagnosticCode::LG0200LayoutDivergence => Some(
                "This is a generator bug. Do not hand-edit generated headers; report the kind and emitter.",
            ),
            DiagnosticCode::LG0300UnsupportedWordSize => Some("Use a word size of 4 or 8 bytes."),
            DiagnosticCode::LG0400StaleArtifact => {
                Some("Regenerate the artifacts without --check and commit the result.")
            }
            _ => None,
        }
    }
}

pub fn render_diagnostics_md() -> String {
    let mut rows: Vec<(&'static str, Phase, &'static str, &'static str)> = all_codes()
        .iter()
        .map(|&code| {
            (
                code.code_str(),
                code.phase(),
                code.default_message(),
                code.default_help().unwrap_or(""),
            )
        })
        .collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::new();
    out.push_str("# layoutgen diagnostics catalog\n\n");
    out.push_str("This document is generated from `crates/layoutgen-core/src/diagnostics.rs`.\n\n");
    out.push_str("| Code | Phase | Message | Help |\n");
    out.push_str("| ---- | ----- | ------- | ---- |\n");
    for (code, phase, msg, help) in rows {
        out.push_str(&format!("| {code} | {phase:?} | {msg} | {help} |\n"));
    }
    out
}

pub fn all_codes() -> &'static [DiagnosticCode] {
    &[
        DiagnosticCode::LG0001CatalogInvalid,
        DiagnosticCode::LG0002DuplicateKind,
        DiagnosticCode::LG0100MalformedLayout,
        DiagnosticCode::LG0200LayoutDivergence,
        DiagnosticCode::LG0300UnsupportedWordSize,
        DiagnosticCode::LG0301InvalidTarget,
        DiagnosticCode::LG0400StaleArtifact,
        DiagnosticCode::LG0900Io,
    ]
}
