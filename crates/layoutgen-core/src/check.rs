//! Consistency checker.
//!
//! The struct view and the offset-constant view are two independent encodings
//! of the same layout, and the scan table is a third. Each artifact is parsed
//! back and its offsets re-derived from what the text says (field sizes,
//! `#define` values, table entries), then compared slot by slot against the
//! [`OffsetView`] it was rendered from. Any disagreement is fatal.

use std::collections::BTreeMap;

use crate::emit::c_struct::HEADER_C_TYPE;
use crate::emit::scan_table::SCAN_MACRO;
use crate::emit::{self, Artifact, EmitterId};
use crate::error::LayoutError;
use crate::names;
use crate::offsets::OffsetView;

const SIZE_LABEL: &str = "(size)";

pub fn verify(view: &OffsetView, artifacts: &[Artifact]) -> Result<(), LayoutError> {
    for &id in EmitterId::all() {
        let Some(artifact) = emit::find(artifacts, id) else {
            return Err(divergence(view, id, "(artifact)", "a rendered artifact", "none"));
        };
        match id {
            EmitterId::CStruct => verify_struct(view, &artifact.text)?,
            EmitterId::OffsetMacros => verify_macros(view, &artifact.text)?,
            EmitterId::ScanTable => verify_scan_table(view, &artifact.text)?,
        }
    }
    Ok(())
}

/// Re-checks the files as they will be written: the struct and offset
/// sections are cut out of the composed header, and the scan file is parsed
/// whole, then each is verified like the artifact it was built from.
pub fn verify_files(view: &OffsetView, header: &str, scan: &str) -> Result<(), LayoutError> {
    let header_name = names::header_file_name(&view.kind);
    let Some(c_struct) = section(header, emit::C_SECTION, emit::ASM_SECTION) else {
        let expected = format!("a struct section in {header_name}");
        return Err(divergence(view, EmitterId::CStruct, "(file)", expected, "none"));
    };
    verify_struct(view, c_struct)?;
    let Some(macros) = section(header, emit::ASM_SECTION, emit::END_SECTION) else {
        let expected = format!("an offset section in {header_name}");
        return Err(divergence(view, EmitterId::OffsetMacros, "(file)", expected, "none"));
    };
    verify_macros(view, macros)?;
    verify_scan_table(view, scan)
}

fn section<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let len = text[from..].find(end)?;
    Some(&text[from..from + len])
}

fn divergence(
    view: &OffsetView,
    emitter: EmitterId,
    slot: &str,
    expected: impl ToString,
    found: impl ToString,
) -> LayoutError {
    LayoutError::LayoutDivergence {
        kind: view.kind.clone(),
        emitter,
        slot: slot.to_string(),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

#[derive(Debug, PartialEq, Eq)]
struct StructField {
    ty: String,
    name: String,
    count: u32,
}

/// Byte size of the C types the struct view may use, assuming `long` is one
/// word (LP64 / ILP32).
fn c_type_bytes(ty: &str, word_bytes: u32) -> Option<u32> {
    match ty {
        "lispobj" | "long" | "uword_t" | "sword_t" => Some(word_bytes),
        "double" => Some(8),
        "float" => Some(4),
        _ => None,
    }
}

fn parse_field(line: &str) -> Option<StructField> {
    let decl = line.strip_suffix(';')?;
    let mut parts = decl.split_whitespace();
    let ty = parts.next()?;
    let declarator = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let (name, count) = match declarator.split_once('[') {
        Some((name, rest)) => (name, rest.strip_suffix(']')?.parse::<u32>().ok()?),
        None => (declarator, 1),
    };
    Some(StructField {
        ty: ty.to_string(),
        name: name.to_string(),
        count,
    })
}

fn parse_struct(view: &OffsetView, text: &str) -> Result<Vec<StructField>, LayoutError> {
    let id = EmitterId::CStruct;
    let expected_open = format!("struct {} {{", names::c_ident(&view.kind));
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    match lines.next() {
        Some(open) if open == expected_open => {}
        other => {
            return Err(divergence(
                view,
                id,
                "(struct)",
                &expected_open,
                other.unwrap_or("end of artifact"),
            ))
        }
    }

    let mut fields = Vec::new();
    for line in lines {
        if line == "};" {
            return Ok(fields);
        }
        let Some(field) = parse_field(line) else {
            return Err(divergence(view, id, "(struct)", "a field declaration", line));
        };
        fields.push(field);
    }
    Err(divergence(view, id, "(struct)", "};", "end of artifact"))
}

fn verify_struct(view: &OffsetView, text: &str) -> Result<(), LayoutError> {
    let id = EmitterId::CStruct;
    let fields = parse_struct(view, text)?;

    let Some((header, rest)) = fields.split_first() else {
        return Err(divergence(view, id, names::HEADER_FIELD, "header field", "no fields"));
    };
    let expected_header = StructField {
        ty: HEADER_C_TYPE.to_string(),
        name: names::HEADER_FIELD.to_string(),
        count: 1,
    };
    if *header != expected_header {
        return Err(divergence(
            view,
            id,
            names::HEADER_FIELD,
            format!("{HEADER_C_TYPE} {}", names::HEADER_FIELD),
            format!("{} {}", header.ty, header.name),
        ));
    }

    let lowtag = i64::from(view.lowtag);
    let mut pos = i64::from(view.word_bytes);
    for (i, slot) in view.slots.iter().enumerate() {
        let Some(field) = rest.get(i) else {
            return Err(divergence(view, id, &slot.name, "a field", "missing"));
        };
        let c_name = names::c_ident(&slot.name);
        if field.name != c_name {
            return Err(divergence(
                view,
                id,
                &slot.name,
                format!("field {c_name}"),
                format!("field {}", field.name),
            ));
        }
        let found_offset = pos - lowtag;
        if found_offset != slot.byte_offset {
            return Err(divergence(view, id, &slot.name, slot.byte_offset, found_offset));
        }
        let Some(ty_bytes) = c_type_bytes(&field.ty, view.word_bytes) else {
            return Err(divergence(view, id, &slot.name, "a known C type", &field.ty));
        };
        // natural alignment; a compiler would pad before a misaligned field
        if pos % i64::from(ty_bytes) != 0 {
            return Err(divergence(
                view,
                id,
                &slot.name,
                format!("{ty_bytes}-byte aligned {}", field.ty),
                format!("{} at byte {pos}", field.ty),
            ));
        }
        let field_bytes = i64::from(ty_bytes) * i64::from(field.count);
        let slot_bytes = i64::from(slot.width_words) * i64::from(view.word_bytes);
        if field_bytes != slot_bytes {
            return Err(divergence(
                view,
                id,
                &slot.name,
                format!("{slot_bytes} bytes"),
                format!("{field_bytes} bytes"),
            ));
        }
        pos += field_bytes;
    }
    if let Some(extra) = rest.get(view.slots.len()) {
        let found = format!("field {}", extra.name);
        return Err(divergence(view, id, &extra.name, "no field", found));
    }
    Ok(())
}

fn parse_defines(view: &OffsetView, text: &str) -> Result<BTreeMap<String, i64>, LayoutError> {
    let id = EmitterId::OffsetMacros;
    let mut out = BTreeMap::new();
    for line in text.lines().map(str::trim) {
        let Some(rest) = line.strip_prefix("#define ") else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(divergence(view, id, "(define)", "#define NAME VALUE", line));
        };
        let Ok(value) = value.parse::<i64>() else {
            return Err(divergence(view, id, name, "an integer", value));
        };
        if out.insert(name.to_string(), value).is_some() {
            return Err(divergence(view, id, name, "one definition", "duplicate definition"));
        }
    }
    Ok(out)
}

fn verify_macros(view: &OffsetView, text: &str) -> Result<(), LayoutError> {
    let id = EmitterId::OffsetMacros;
    let mut defines = parse_defines(view, text)?;

    let mut expected: Vec<(String, &str, i64)> = view
        .slots
        .iter()
        .map(|s| {
            (
                names::offset_macro(&view.kind, &s.name),
                s.name.as_str(),
                s.byte_offset,
            )
        })
        .collect();
    expected.push((
        names::size_macro(&view.kind),
        SIZE_LABEL,
        i64::from(view.size_words),
    ));

    for (macro_name, label, value) in expected {
        match defines.remove(&macro_name) {
            None => {
                return Err(divergence(
                    view,
                    id,
                    label,
                    format!("{macro_name} = {value}"),
                    "missing",
                ))
            }
            Some(found) if found != value => {
                return Err(divergence(view, id, label, value, found));
            }
            Some(_) => {}
        }
    }
    if let Some((extra, value)) = defines.into_iter().next() {
        return Err(divergence(
            view,
            id,
            &extra,
            "no such constant",
            format!("{extra} = {value}"),
        ));
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
struct ScanEntry {
    kind: String,
    slot: String,
    index: u32,
    words: u32,
    offset: i64,
}

fn parse_scan_entry(line: &str) -> Option<ScanEntry> {
    let args = line
        .strip_prefix(SCAN_MACRO)?
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let [kind, slot, index, words, offset] = parts.as_slice() else {
        return None;
    };
    Some(ScanEntry {
        kind: kind.to_string(),
        slot: slot.to_string(),
        index: index.parse().ok()?,
        words: words.parse().ok()?,
        offset: offset.parse().ok()?,
    })
}

fn verify_scan_table(view: &OffsetView, text: &str) -> Result<(), LayoutError> {
    let id = EmitterId::ScanTable;
    let mut entries = Vec::new();
    for line in text.lines().map(str::trim) {
        if !line.starts_with(SCAN_MACRO) {
            continue;
        }
        let Some(entry) = parse_scan_entry(line) else {
            return Err(divergence(view, id, "(entry)", "a scan entry", line));
        };
        entries.push(entry);
    }

    let kind_macro = names::macro_ident(&view.kind);
    let mut found = entries.into_iter();
    for slot in view.boxed_slots() {
        let expected = ScanEntry {
            kind: kind_macro.clone(),
            slot: names::macro_ident(&slot.name),
            index: slot.index,
            words: slot.width_words,
            offset: slot.byte_offset,
        };
        match found.next() {
            None => return Err(divergence(view, id, &slot.name, "a scan entry", "missing")),
            Some(entry) if entry != expected => {
                return Err(divergence(
                    view,
                    id,
                    &slot.name,
                    format!("{expected:?}"),
                    format!("{entry:?}"),
                ))
            }
            Some(_) => {}
        }
    }
    if let Some(extra) = found.next() {
        return Err(divergence(
            view,
            id,
            &extra.slot,
            "no entry (slot is not boxed)",
            format!("{extra:?}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{LayoutDescriptor, Slot, SlotKind};
    use crate::emit::{render_all, standard_emitters};
    use crate::offsets::resolve;
    use layoutgen_targets::TargetId;

    fn view() -> OffsetView {
        let d = LayoutDescriptor::new(
            "simd-pack",
            15,
            true,
            vec![
                Slot::new("tag", SlotKind::Boxed),
                Slot::new("lo-value", SlotKind::RawInteger),
                Slot::new("hi-value", SlotKind::RawInteger),
            ],
            4,
        )
        .expect("descriptor");
        resolve(&d, &TargetId::X86_64.config()).expect("resolve")
    }

    fn tampered(id: EmitterId, from: &str, to: &str) -> Result<(), LayoutError> {
        let view = view();
        let mut artifacts = render_all(&view, &standard_emitters());
        for a in artifacts.iter_mut().filter(|a| a.emitter == id) {
            assert!(a.text.contains(from), "{from:?} not in:\n{}", a.text);
            a.text = a.text.replace(from, to);
        }
        verify(&view, &artifacts)
    }

    fn divergent_slot(err: LayoutError) -> (EmitterId, String) {
        match err {
            LayoutError::LayoutDivergence { emitter, slot, .. } => (emitter, slot),
            other => panic!("expected divergence, got {other}"),
        }
    }

    #[test]
    fn standard_emitters_agree() {
        let view = view();
        verify(&view, &render_all(&view, &standard_emitters())).expect("consistent");
    }

    #[test]
    fn parses_field_declarations() {
        assert_eq!(
            parse_field("lispobj data[3];"),
            Some(StructField {
                ty: "lispobj".to_string(),
                name: "data".to_string(),
                count: 3
            })
        );
        assert_eq!(parse_field("long x"), None);
        assert_eq!(parse_field("unsigned long x;"), None);
    }

    #[test]
    fn detects_wrong_offset_constant() {
        let err = tampered(
            EmitterId::OffsetMacros,
            "SIMD_PACK_LO_VALUE_OFFSET 1",
            "SIMD_PACK_LO_VALUE_OFFSET 2",
        )
        .expect_err("drift");
        assert_eq!(divergent_slot(err), (EmitterId::OffsetMacros, "lo-value".to_string()));
    }

    #[test]
    fn detects_wrong_size_constant() {
        let err = tampered(EmitterId::OffsetMacros, "SIMD_PACK_SIZE 4", "SIMD_PACK_SIZE 3")
            .expect_err("drift");
        assert_eq!(divergent_slot(err), (EmitterId::OffsetMacros, SIZE_LABEL.to_string()));
    }

    #[test]
    fn detects_missing_and_extra_constants() {
        let err = tampered(
            EmitterId::OffsetMacros,
            "#define SIMD_PACK_HI_VALUE_OFFSET 9\n",
            "",
        )
        .expect_err("missing");
        assert_eq!(divergent_slot(err).1, "hi-value");

        let err = tampered(
            EmitterId::OffsetMacros,
            "#define SIMD_PACK_SIZE 4\n",
            "#define SIMD_PACK_SIZE 4\n#define SIMD_PACK_EXTRA_OFFSET 25\n",
        )
        .expect_err("extra");
        assert_eq!(divergent_slot(err).1, "SIMD_PACK_EXTRA_OFFSET");
    }

    #[test]
    fn detects_struct_field_drift() {
        // swapping two fields moves both of their offsets
        let err = tampered(
            EmitterId::CStruct,
            "    long lo_value;\n    long hi_value;\n",
            "    long hi_value;\n    long lo_value;\n",
        )
        .expect_err("reordered");
        assert_eq!(divergent_slot(err), (EmitterId::CStruct, "lo-value".to_string()));

        let err = tampered(EmitterId::CStruct, "long lo_value;", "long lo_value[2];")
            .expect_err("widened");
        assert_eq!(divergent_slot(err), (EmitterId::CStruct, "lo-value".to_string()));

        let err = tampered(EmitterId::CStruct, "lispobj tag;", "float tag;").expect_err("narrowed");
        assert_eq!(divergent_slot(err), (EmitterId::CStruct, "tag".to_string()));
    }

    #[test]
    fn detects_double_the_compiler_would_pad() {
        use crate::offsets::SlotOffset;

        let view = OffsetView {
            kind: "dbl".to_string(),
            lowtag: 7,
            word_bytes: 4,
            size_words: 4,
            slots: vec![SlotOffset {
                name: "value".to_string(),
                kind: SlotKind::RawFloat,
                width_words: 2,
                index: 1,
                byte_offset: -3,
            }],
        };
        let err = verify(&view, &render_all(&view, &standard_emitters())).expect_err("padding");
        assert_eq!(divergent_slot(err), (EmitterId::CStruct, "value".to_string()));
    }

    fn composed(view: &OffsetView) -> (String, String) {
        let artifacts = render_all(view, &standard_emitters());
        let find = |id| emit::find(&artifacts, id).expect("artifact");
        (
            emit::header_file(view, find(EmitterId::CStruct), find(EmitterId::OffsetMacros)),
            emit::scan_file(view, find(EmitterId::ScanTable)),
        )
    }

    #[test]
    fn composed_files_agree() {
        let view = view();
        let (header, scan) = composed(&view);
        verify_files(&view, &header, &scan).expect("consistent");
    }

    #[test]
    fn detects_drift_in_composed_header() {
        let view = view();
        let (header, scan) = composed(&view);

        let edited = header.replace("SIMD_PACK_HI_VALUE_OFFSET 9", "SIMD_PACK_HI_VALUE_OFFSET 17");
        let err = verify_files(&view, &edited, &scan).expect_err("macro drift");
        assert_eq!(divergent_slot(err), (EmitterId::OffsetMacros, "hi-value".to_string()));

        let edited = header.replace("    long lo_value;\n", "");
        let err = verify_files(&view, &edited, &scan).expect_err("struct drift");
        assert_eq!(divergent_slot(err).0, EmitterId::CStruct);

        let edited = header.replace("#else /* __ASSEMBLER__ */", "#else");
        let err = verify_files(&view, &edited, &scan).expect_err("no offset section");
        assert_eq!(divergent_slot(err).1, "(file)");

        let err = verify_files(&view, &header, "").expect_err("empty scan file");
        assert_eq!(divergent_slot(err), (EmitterId::ScanTable, "tag".to_string()));
    }

    #[test]
    fn detects_missing_header_field() {
        let err = tampered(EmitterId::CStruct, "    lispobj header;\n", "").expect_err("header");
        assert_eq!(divergent_slot(err).1, "header");
    }

    #[test]
    fn detects_scan_table_drift() {
        let err = tampered(
            EmitterId::ScanTable,
            "LAYOUT_SCAN_SLOT(SIMD_PACK, TAG, 1, 1, -7)",
            "LAYOUT_SCAN_SLOT(SIMD_PACK, TAG, 1, 1, -15)",
        )
        .expect_err("offset");
        assert_eq!(divergent_slot(err), (EmitterId::ScanTable, "tag".to_string()));

        let err = tampered(
            EmitterId::ScanTable,
            "LAYOUT_SCAN_SLOT(SIMD_PACK, TAG, 1, 1, -7)\n",
            concat!(
                "LAYOUT_SCAN_SLOT(SIMD_PACK, TAG, 1, 1, -7)\n",
                "LAYOUT_SCAN_SLOT(SIMD_PACK, LO_VALUE, 2, 1, 1)\n",
            ),
        )
        .expect_err("raw slot scanned");
        assert_eq!(divergent_slot(err).1, "LO_VALUE");
    }

    #[test]
    fn missing_artifact_is_a_divergence() {
        let view = view();
        let mut artifacts = render_all(&view, &standard_emitters());
        artifacts.retain(|a| a.emitter != EmitterId::ScanTable);
        let err = verify(&view, &artifacts).expect_err("missing");
        assert_eq!(divergent_slot(err).0, EmitterId::ScanTable);
    }
}
