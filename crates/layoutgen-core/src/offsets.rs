//! Tag arithmetic: where every slot lives relative to a tagged pointer.
//!
//! A tagged pointer to an object is its base address plus its lowtag. Low-level
//! code addresses slots without removing the tag first, so a slot at word
//! index `i` sits at displacement `i * word_bytes - lowtag` from the pointer.
//! That formula exists only in [`tagged_offset`]; every emitter and the
//! generated constants take their numbers from the [`OffsetView`] built here.

use layoutgen_targets::TargetConfig;
use serde::Serialize;
use tracing::debug;

use crate::descriptor::{LayoutDescriptor, Slot, SlotKind};
use crate::error::LayoutError;
use crate::target::{max_lowtag, validate_target};

/// Word index of the object header.
pub const HEADER_INDEX: u32 = 0;
/// Word index the tag slot is pinned to, when the descriptor has one.
pub const TAG_INDEX: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotOffset {
    pub name: String,
    pub kind: SlotKind,
    pub width_words: u32,
    pub index: u32,
    pub byte_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffsetView {
    pub kind: String,
    pub lowtag: u32,
    pub word_bytes: u32,
    pub size_words: u32,
    /// Slots in word-index order: tag first (if any), then declaration order.
    pub slots: Vec<SlotOffset>,
}

impl OffsetView {
    pub fn slot(&self, name: &str) -> Option<&SlotOffset> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub fn boxed_slots(&self) -> impl Iterator<Item = &SlotOffset> {
        self.slots.iter().filter(|s| s.kind.is_boxed())
    }

    /// Displacement of the header word from a tagged pointer.
    pub fn header_offset(&self) -> i64 {
        tagged_offset(HEADER_INDEX, self.word_bytes, self.lowtag)
    }
}

pub fn tagged_offset(index: u32, word_bytes: u32, lowtag: u32) -> i64 {
    i64::from(index) * i64::from(word_bytes) - i64::from(lowtag)
}

pub fn align_up(words: u64, alignment_words: u32) -> u64 {
    let a = u64::from(alignment_words.max(1));
    words.div_ceil(a) * a
}

/// Size in words `desc` must declare on `target`.
pub fn required_size_words(desc: &LayoutDescriptor, target: &TargetConfig) -> u64 {
    align_up(desc.unaligned_words(), target.alignment_words)
}

pub fn resolve(desc: &LayoutDescriptor, target: &TargetConfig) -> Result<OffsetView, LayoutError> {
    validate_target(target)?;
    let kind = desc.name();

    if desc.lowtag() > max_lowtag(target) {
        return Err(LayoutError::malformed(
            kind,
            None,
            format!(
                "lowtag {} does not fit in {} tag bits (max {})",
                desc.lowtag(),
                target.lowtag_bits,
                max_lowtag(target)
            ),
        ));
    }

    for slot in desc.slots() {
        check_slot_on_target(kind, slot, target)?;
    }

    let required = required_size_words(desc, target);
    if u64::from(desc.size_words()) != required {
        return Err(LayoutError::malformed(
            kind,
            None,
            format!(
                "declared size {} words, computed {} (1 header + {} slot words, aligned to {})",
                desc.size_words(),
                required,
                desc.unaligned_words() - 1,
                target.alignment_words
            ),
        ));
    }

    let mut slots = Vec::with_capacity(desc.slots().len());
    let mut index = HEADER_INDEX + 1;
    if desc.tag_slot_present() {
        if let Some(tag) = desc.slots().iter().find(|s| desc.is_tag_slot(s)) {
            slots.push(place(tag, TAG_INDEX, target, desc.lowtag()));
            index = TAG_INDEX + 1;
        }
    }
    for slot in desc.slots().iter().filter(|s| !desc.is_tag_slot(s)) {
        check_natural_alignment(kind, slot, index, target)?;
        slots.push(place(slot, index, target, desc.lowtag()));
        // bounded by size_words, checked above
        index += slot.width_words;
    }

    debug!(
        target: "layoutgen",
        kind,
        size_words = desc.size_words(),
        slots = slots.len(),
        lowtag = desc.lowtag(),
        "resolved layout"
    );

    Ok(OffsetView {
        kind: kind.to_string(),
        lowtag: desc.lowtag(),
        word_bytes: target.word_bytes,
        size_words: desc.size_words(),
        slots,
    })
}

fn place(slot: &Slot, index: u32, target: &TargetConfig, lowtag: u32) -> SlotOffset {
    SlotOffset {
        name: slot.name.clone(),
        kind: slot.kind,
        width_words: slot.width_words,
        index,
        byte_offset: tagged_offset(index, target.word_bytes, lowtag),
    }
}

fn check_slot_on_target(kind: &str, slot: &Slot, target: &TargetConfig) -> Result<(), LayoutError> {
    let bytes = u64::from(slot.width_words) * u64::from(target.word_bytes);
    match slot.kind {
        SlotKind::RawFloat if bytes != 4 && bytes != 8 => Err(LayoutError::malformed(
            kind,
            Some(slot.name.as_str()),
            format!(
                "raw-float slots must span 4 or 8 bytes, got {} words of {} bytes",
                slot.width_words, target.word_bytes
            ),
        )),
        SlotKind::PackedPair if target.word_bytes != 8 => Err(LayoutError::malformed(
            kind,
            Some(slot.name.as_str()),
            "packed-pair slots need 8-byte words",
        )),
        _ => Ok(()),
    }
}

/// A `double` wider than the word must start on an 8-byte boundary of the
/// object; some ABIs (ARM EABI) would otherwise pad before it in the struct view.
fn check_natural_alignment(
    kind: &str,
    slot: &Slot,
    index: u32,
    target: &TargetConfig,
) -> Result<(), LayoutError> {
    let bytes = u64::from(slot.width_words) * u64::from(target.word_bytes);
    let base = u64::from(index) * u64::from(target.word_bytes);
    if slot.kind == SlotKind::RawFloat && bytes == 8 && base % 8 != 0 {
        return Err(LayoutError::malformed(
            kind,
            Some(slot.name.as_str()),
            format!("8-byte raw-float at word {index} is not 8-byte aligned; add a filler word"),
        ));
    }
    Ok(())
}
