use std::path::PathBuf;

use layoutgen_core::catalog::load_catalog;
use layoutgen_core::driver::Generator;
use layoutgen_core::emit::{self, EmitterId};
use layoutgen_core::{TargetId, TargetSpec};

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("repo root")
}

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

fn runtime_generator() -> (Generator, layoutgen_core::catalog::Catalog) {
    let catalog = load_catalog(&repo_root().join("catalog/runtime.catalog.json")).expect("catalog");
    let target = TargetSpec::default().over(catalog.target).resolve();
    assert_eq!(target, TargetId::X86_64.config());
    (Generator::new(target).expect("generator"), catalog)
}

#[test]
fn simd_pack_header_matches_golden() {
    let (gen, catalog) = runtime_generator();
    let simd = catalog
        .kinds
        .iter()
        .find(|k| k.name() == "simd-pack")
        .expect("simd-pack kind");
    let kind = gen.generate_kind(simd).expect("generate");

    let header = kind
        .files
        .iter()
        .find(|f| f.name == "simd-pack.h")
        .expect("header file");
    assert_eq!(header.contents, fixture("simd-pack.h"));

    let scan = kind
        .files
        .iter()
        .find(|f| f.name == "simd-pack-scan.inc")
        .expect("scan file");
    assert_eq!(scan.contents, fixture("simd-pack-scan.inc"));
}

#[test]
fn simd_pack_offsets_are_tag_relative() {
    let (gen, catalog) = runtime_generator();
    let set = gen.generate(&catalog.kinds).expect("generate");
    let view = &set.kind("simd-pack").expect("simd-pack").view;
    let got: Vec<(&str, i64)> = view
        .slots
        .iter()
        .map(|s| (s.name.as_str(), s.byte_offset))
        .collect();
    assert_eq!(got, vec![("tag", -7), ("lo-value", 1), ("hi-value", 9)]);
    assert_eq!(view.size_words, 4);
}

#[test]
fn struct_and_macro_views_agree_for_every_kind() {
    let (gen, catalog) = runtime_generator();
    let set = gen.generate(&catalog.kinds).expect("generate");
    assert_eq!(set.kinds.len(), catalog.kinds.len());
    for kind in &set.kinds {
        let macros = emit::find(&kind.artifacts, EmitterId::OffsetMacros).expect("macros");
        for slot in &kind.view.slots {
            let line = format!(
                "#define {} {}\n",
                layoutgen_core::names::offset_macro(&kind.view.kind, &slot.name),
                slot.byte_offset
            );
            assert!(macros.text.contains(&line), "{} missing {line:?}", kind.view.kind);
        }
        let header = &kind.files[0].contents;
        assert!(header.contains(&macros.text));
        let c_struct = emit::find(&kind.artifacts, EmitterId::CStruct).expect("struct");
        assert!(header.contains(&c_struct.text));
    }
}

#[test]
fn generation_is_reproducible() {
    let (gen, catalog) = runtime_generator();
    let a = gen.generate(&catalog.kinds).expect("first run");
    let mut reversed = catalog.kinds.clone();
    reversed.reverse();
    let b = gen.generate(&reversed).expect("second run");
    assert_eq!(a.index_json(), b.index_json());
    assert_eq!(a.artifact_files(), b.artifact_files());
}

#[test]
fn scan_table_lists_only_boxed_slots() {
    let (gen, catalog) = runtime_generator();
    let set = gen.generate(&catalog.kinds).expect("generate");

    let ratio = set.kind("ratio").expect("ratio");
    let scan = emit::find(&ratio.artifacts, EmitterId::ScanTable).expect("scan");
    assert!(scan.text.contains("LAYOUT_SCAN_SLOT(RATIO, NUMERATOR, 1, 1, -7)"));
    assert!(scan.text.contains("LAYOUT_SCAN_SLOT(RATIO, DENOMINATOR, 2, 1, 1)"));

    let sap = set.kind("sap").expect("sap");
    let scan = emit::find(&sap.artifacts, EmitterId::ScanTable).expect("scan");
    assert!(!scan.text.contains("LAYOUT_SCAN_SLOT(SAP"), "{}", scan.text);
}
