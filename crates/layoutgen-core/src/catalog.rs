//! Catalog intake: the JSON document that declares every object kind.

use std::collections::BTreeMap;
use std::path::Path;

use layoutgen_contracts::CATALOG_SCHEMA_VERSION;
use layoutgen_targets::{TargetId, TargetSpec};
use serde::Deserialize;

use crate::descriptor::{LayoutDescriptor, Slot, SlotKind};
use crate::error::LayoutError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    schema_version: String,
    #[serde(default)]
    target: Option<TargetEntry>,
    #[serde(default)]
    lowtags: BTreeMap<String, u32>,
    kinds: Vec<KindEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TargetEntry {
    #[serde(default)]
    preset: Option<String>,
    #[serde(default)]
    word_bytes: Option<u32>,
    #[serde(default)]
    lowtag_bits: Option<u32>,
    #[serde(default)]
    alignment_words: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KindEntry {
    name: String,
    lowtag: LowtagRef,
    #[serde(default)]
    tag_slot: bool,
    size_words: u32,
    #[serde(default)]
    slots: Vec<SlotEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LowtagRef {
    Value(u32),
    Named(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SlotEntry {
    name: String,
    kind: SlotKind,
    #[serde(default)]
    width: Option<u32>,
}

/// Parsed catalog. Kinds keep their file order; the driver sorts them.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub target: TargetSpec,
    pub kinds: Vec<LayoutDescriptor>,
}

pub fn load_catalog(path: &Path) -> Result<Catalog, LayoutError> {
    let bytes = std::fs::read(path).map_err(|e| LayoutError::io("read catalog", path, e))?;
    parse_catalog(&bytes, &path.display().to_string())
}

pub fn parse_catalog(bytes: &[u8], source_name: &str) -> Result<Catalog, LayoutError> {
    let invalid = |reason: String| LayoutError::Catalog {
        source_name: source_name.to_string(),
        reason,
    };

    let file: CatalogFile =
        serde_json::from_slice(bytes).map_err(|e| invalid(format!("parse JSON: {e}")))?;
    if file.schema_version.trim() != CATALOG_SCHEMA_VERSION {
        return Err(invalid(format!(
            "schema_version mismatch: expected {CATALOG_SCHEMA_VERSION} got {:?}",
            file.schema_version
        )));
    }

    let target = match &file.target {
        None => TargetSpec::default(),
        Some(t) => {
            let preset = match &t.preset {
                None => None,
                Some(raw) => Some(
                    TargetId::parse(raw)
                        .ok_or_else(|| invalid(format!("unknown target preset: {raw}")))?,
                ),
            };
            TargetSpec {
                preset,
                word_bytes: t.word_bytes,
                lowtag_bits: t.lowtag_bits,
                alignment_words: t.alignment_words,
            }
        }
    };

    let mut kinds = Vec::with_capacity(file.kinds.len());
    for (idx, entry) in file.kinds.into_iter().enumerate() {
        let lowtag = match entry.lowtag {
            LowtagRef::Value(v) => v,
            LowtagRef::Named(name) => *file.lowtags.get(&name).ok_or_else(|| {
                invalid(format!(
                    "kinds[{idx}] ({}) uses unknown lowtag name {name:?}",
                    entry.name
                ))
            })?,
        };
        let slots = entry
            .slots
            .into_iter()
            .map(|s| match s.width {
                Some(width) => Slot::with_width(s.name, s.kind, width),
                None => Slot::new(s.name, s.kind),
            })
            .collect();
        kinds.push(LayoutDescriptor::new(
            entry.name,
            lowtag,
            entry.tag_slot,
            slots,
            entry.size_words,
        )?);
    }

    Ok(Catalog { target, kinds })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMD_PACK: &str = r#"{
      "schema_version": "layoutgen.catalog@0.1.0",
      "target": {"preset": "x86-64"},
      "lowtags": {"other-pointer": 15},
      "kinds": [
        {"name": "simd-pack", "lowtag": "other-pointer", "tag_slot": true, "size_words": 4,
         "slots": [
           {"name": "tag", "kind": "boxed"},
           {"name": "lo-value", "kind": "raw-integer"},
           {"name": "hi-value", "kind": "raw-integer"}
         ]}
      ]
    }"#;

    #[test]
    fn parses_named_lowtag_and_target() {
        let c = parse_catalog(SIMD_PACK.as_bytes(), "inline").expect("catalog");
        assert_eq!(c.target, TargetSpec::preset(TargetId::X86_64));
        assert_eq!(c.kinds.len(), 1);
        let k = &c.kinds[0];
        assert_eq!(k.lowtag(), 15);
        assert!(k.tag_slot_present());
        assert_eq!(k.slots()[1], Slot::new("lo-value", SlotKind::RawInteger));
    }

    #[test]
    fn width_defaults_follow_slot_kind() {
        let src = r#"{"schema_version":"layoutgen.catalog@0.1.0","kinds":[
          {"name":"k","lowtag":15,"size_words":6,"slots":[
            {"name":"bits","kind":"packed-pair"},
            {"name":"data","kind":"boxed","width":3}]}]}"#;
        let c = parse_catalog(src.as_bytes(), "inline").expect("catalog");
        assert!(c.target.is_empty());
        let widths: Vec<u32> = c.kinds[0].slots().iter().map(|s| s.width_words).collect();
        assert_eq!(widths, vec![2, 3]);
    }

    #[test]
    fn rejects_schema_mismatch() {
        let src = SIMD_PACK.replace("layoutgen.catalog@0.1.0", "layoutgen.catalog@9.9.9");
        let err = parse_catalog(src.as_bytes(), "inline").expect_err("schema");
        assert!(err.to_string().contains("schema_version mismatch"), "{err}");
    }

    #[test]
    fn rejects_unknown_lowtag_name() {
        let src = SIMD_PACK.replace("\"lowtag\": \"other-pointer\"", "\"lowtag\": \"fun-pointer\"");
        let err = parse_catalog(src.as_bytes(), "inline").expect_err("lowtag");
        assert!(err.to_string().contains("fun-pointer"), "{err}");
    }

    #[test]
    fn rejects_unknown_fields_and_slot_kinds() {
        let src = SIMD_PACK.replace("\"tag_slot\": true", "\"tag_slot\": true, \"rest\": true");
        assert!(parse_catalog(src.as_bytes(), "inline").is_err());
        let src = SIMD_PACK.replace("raw-integer", "raw-pointer");
        assert!(parse_catalog(src.as_bytes(), "inline").is_err());
    }

    #[test]
    fn keyword_slot_name_is_rejected() {
        let src = SIMD_PACK.replace("\"lo-value\"", "\"long\"");
        let err = parse_catalog(src.as_bytes(), "inline").expect_err("keyword slot");
        assert!(matches!(err, LayoutError::MalformedLayout { .. }), "{err}");
        assert!(err.to_string().contains("slot long"), "{err}");
    }

    #[test]
    fn descriptor_errors_surface_as_malformed_layout() {
        let src = SIMD_PACK.replace("\"name\": \"tag\"", "\"name\": \"header\"");
        let err = parse_catalog(src.as_bytes(), "inline").expect_err("header slot");
        assert!(matches!(err, LayoutError::MalformedLayout { .. }), "{err}");
    }
}
