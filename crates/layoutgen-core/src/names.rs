//! Catalog names and the identifiers derived from them.
//!
//! Kind and slot names are lowercase, dash-separated (`simd-pack`,
//! `lo-value`). Every generated identifier is a mechanical function of the
//! name so that consumers can predict it without reading the catalog.

/// Field name reserved for the object header in every struct view.
pub const HEADER_FIELD: &str = "header";

/// Slot name that carries the tag when a descriptor declares a tag slot.
pub const TAG_SLOT: &str = "tag";

/// Lowercase C11 keywords plus the type names and field name every struct
/// view uses. A name mapping to one of these would produce a declaration C
/// reads differently from the one intended (`long long;` declares nothing).
const RESERVED_C_IDENTS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "lispobj", "uword_t", "sword_t",
    HEADER_FIELD,
];

pub fn is_reserved_c_ident(ident: &str) -> bool {
    RESERVED_C_IDENTS.contains(&ident)
}

pub fn validate_name(what: &str, name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("{what} name must not be empty"));
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap_or('_');
    if !first.is_ascii_lowercase() {
        return Err(format!("invalid {what} name start (must be [a-z]): {name:?}"));
    }
    for c in chars {
        if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
            return Err(format!(
                "invalid {what} name char (allowed [a-z0-9_-]): {name:?}"
            ));
        }
    }
    if name.ends_with('-') || name.ends_with('_') {
        return Err(format!("invalid {what} name end: {name:?}"));
    }
    if is_reserved_c_ident(&c_ident(name)) {
        return Err(format!("{what} name {name:?} is reserved in generated C"));
    }
    Ok(())
}

/// `lo-value` -> `lo_value`
pub fn c_ident(name: &str) -> String {
    name.replace('-', "_")
}

/// `simd-pack` -> `SIMD_PACK`
pub fn macro_ident(name: &str) -> String {
    c_ident(name).to_ascii_uppercase()
}

pub fn offset_macro(kind: &str, slot: &str) -> String {
    format!("{}_{}_OFFSET", macro_ident(kind), macro_ident(slot))
}

pub fn size_macro(kind: &str) -> String {
    format!("{}_SIZE", macro_ident(kind))
}

pub fn header_file_name(kind: &str) -> String {
    format!("{kind}.h")
}

pub fn scan_file_name(kind: &str) -> String {
    format!("{kind}-scan.inc")
}

/// Whether `file` could have been produced by [`header_file_name`] or
/// [`scan_file_name`]; used before removing files named by an old index.
pub fn is_artifact_file_name(file: &str) -> bool {
    let stem = file
        .strip_suffix("-scan.inc")
        .or_else(|| file.strip_suffix(".h"));
    match stem {
        Some(stem) => validate_name("kind", stem).is_ok(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dashed_lowercase_names() {
        assert!(validate_name("kind", "simd-pack").is_ok());
        assert!(validate_name("slot", "hi_value2").is_ok());
    }

    #[test]
    fn rejects_names_that_do_not_map_to_c_identifiers() {
        for bad in ["", "Simd", "2pack", "simd pack", "simd-", "simd.pack", "../x"] {
            assert!(validate_name("kind", bad).is_err(), "{bad:?}");
        }
        for keyword in ["long", "int", "double", "const", "unsigned", "struct", "lispobj"] {
            let err = validate_name("slot", keyword).expect_err(keyword);
            assert!(err.contains("reserved"), "{err}");
        }
        assert!(validate_name("slot", "header").is_err());
        assert!(validate_name("slot", "uword-t").is_err());
        assert!(validate_name("slot", "long-value").is_ok());
    }

    #[test]
    fn derives_identifiers() {
        assert_eq!(c_ident("simd-pack"), "simd_pack");
        assert_eq!(offset_macro("simd-pack", "lo-value"), "SIMD_PACK_LO_VALUE_OFFSET");
        assert_eq!(size_macro("simd-pack"), "SIMD_PACK_SIZE");
        assert_eq!(header_file_name("simd-pack"), "simd-pack.h");
        assert_eq!(scan_file_name("simd-pack"), "simd-pack-scan.inc");
    }

    #[test]
    fn artifact_file_names_are_recognised() {
        assert!(is_artifact_file_name("simd-pack.h"));
        assert!(is_artifact_file_name("simd-pack-scan.inc"));
        assert!(!is_artifact_file_name("../simd-pack.h"));
        assert!(!is_artifact_file_name("layouts.index.json"));
        assert!(!is_artifact_file_name("Makefile"));
    }
}
