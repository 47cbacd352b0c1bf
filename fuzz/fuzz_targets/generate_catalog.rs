#![no_main]

use layoutgen_core::catalog::parse_catalog;
use layoutgen_core::driver::generate;
use layoutgen_core::offsets::tagged_offset;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let data = if data.len() > 64 * 1024 {
        &data[..64 * 1024]
    } else {
        data
    };

    let Ok(catalog) = parse_catalog(data, "fuzz") else {
        return;
    };
    let target = catalog.target.resolve();
    let Ok(set) = generate(&catalog, &target) else {
        return;
    };

    for kind in &set.kinds {
        let view = &kind.view;
        for slot in &view.slots {
            assert_eq!(
                slot.byte_offset,
                tagged_offset(slot.index, view.word_bytes, view.lowtag)
            );
            assert!(slot.index + slot.width_words <= view.size_words);
        }
    }
});
