//! Errors raised while generating layouts.
//!
//! None of these are recoverable: each one means the catalog, the target or the
//! generator itself is wrong, and the whole run is abandoned.

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::DiagnosticCode;
use crate::emit::EmitterId;

#[derive(Error, Debug)]
pub enum LayoutError {
    /// Descriptor contradicts itself or the target.
    #[error("malformed layout for kind {kind}{}: {reason}", slot_suffix(.slot))]
    MalformedLayout {
        kind: String,
        slot: Option<String>,
        reason: String,
    },

    /// An emitted view, re-parsed, disagrees with the offset view it was rendered from.
    #[error(
        "layout divergence for kind {kind} in {emitter} view, slot {slot}: expected {expected}, found {found}"
    )]
    LayoutDivergence {
        kind: String,
        emitter: EmitterId,
        slot: String,
        expected: String,
        found: String,
    },

    #[error("unsupported word size: {word_bytes} bytes (expected 4 or 8)")]
    UnsupportedWordSize { word_bytes: u32 },

    #[error("invalid target configuration: {reason}")]
    InvalidTarget { reason: String },

    #[error("invalid catalog {source_name}: {reason}")]
    Catalog { source_name: String, reason: String },

    #[error("object kind {kind} is declared more than once")]
    DuplicateKind { kind: String },

    /// Check mode found an artifact on disk that differs from what would be generated.
    #[error("generated artifact is out of date: {}: {reason}", .path.display())]
    StaleArtifact { path: PathBuf, reason: String },

    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn slot_suffix(slot: &Option<String>) -> String {
    match slot {
        Some(slot) => format!(", slot {slot}"),
        None => String::new(),
    }
}

impl LayoutError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            LayoutError::MalformedLayout { .. } => DiagnosticCode::LG0100MalformedLayout,
            LayoutError::LayoutDivergence { .. } => DiagnosticCode::LG0200LayoutDivergence,
            LayoutError::UnsupportedWordSize { .. } => DiagnosticCode::LG0300UnsupportedWordSize,
            LayoutError::InvalidTarget { .. } => DiagnosticCode::LG0301InvalidTarget,
            LayoutError::Catalog { .. } => DiagnosticCode::LG0001CatalogInvalid,
            LayoutError::DuplicateKind { .. } => DiagnosticCode::LG0002DuplicateKind,
            LayoutError::StaleArtifact { .. } => DiagnosticCode::LG0400StaleArtifact,
            LayoutError::Io { .. } => DiagnosticCode::LG0900Io,
        }
    }

    pub(crate) fn malformed(kind: &str, slot: Option<&str>, reason: impl Into<String>) -> Self {
        LayoutError::MalformedLayout {
            kind: kind.to_string(),
            slot: slot.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LayoutError::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
