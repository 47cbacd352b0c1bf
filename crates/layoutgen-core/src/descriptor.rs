use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::names;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotKind {
    /// Tagged reference to another heap object; the collector scans it.
    Boxed,
    RawInteger,
    RawFloat,
    /// Two 64-bit raw values sharing one 128-bit region.
    PackedPair,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::Boxed => "boxed",
            SlotKind::RawInteger => "raw-integer",
            SlotKind::RawFloat => "raw-float",
            SlotKind::PackedPair => "packed-pair",
        }
    }

    pub fn default_width(self) -> u32 {
        match self {
            SlotKind::PackedPair => 2,
            _ => 1,
        }
    }

    pub fn is_boxed(self) -> bool {
        self == SlotKind::Boxed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub name: String,
    pub kind: SlotKind,
    pub width_words: u32,
}

impl Slot {
    pub fn new(name: impl Into<String>, kind: SlotKind) -> Self {
        Slot {
            name: name.into(),
            kind,
            width_words: kind.default_width(),
        }
    }

    pub fn with_width(name: impl Into<String>, kind: SlotKind, width_words: u32) -> Self {
        Slot {
            name: name.into(),
            kind,
            width_words,
        }
    }
}

/// Canonical layout of one heap-object kind.
///
/// Built once through [`LayoutDescriptor::new`], which enforces every
/// target-independent invariant; the target-dependent ones (lowtag range,
/// declared size, float widths) are checked by [`crate::offsets::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutDescriptor {
    name: String,
    tag_slot_present: bool,
    lowtag: u32,
    slots: Vec<Slot>,
    size_words: u32,
}

impl LayoutDescriptor {
    pub fn new(
        name: impl Into<String>,
        lowtag: u32,
        tag_slot_present: bool,
        slots: Vec<Slot>,
        size_words: u32,
    ) -> Result<Self, LayoutError> {
        let name = name.into();
        names::validate_name("kind", &name).map_err(|e| LayoutError::malformed(&name, None, e))?;
        if size_words == 0 {
            return Err(LayoutError::malformed(
                &name,
                None,
                "size_words must be positive",
            ));
        }

        let mut seen: BTreeMap<String, &str> = BTreeMap::new();
        for slot in &slots {
            names::validate_name("slot", &slot.name)
                .map_err(|e| LayoutError::malformed(&name, Some(slot.name.as_str()), e))?;
            if let Some(prev) = seen.insert(names::c_ident(&slot.name), &slot.name) {
                return Err(LayoutError::malformed(
                    &name,
                    Some(slot.name.as_str()),
                    format!("slot collides with slot {prev} after identifier mapping"),
                ));
            }
            if slot.width_words == 0 {
                return Err(LayoutError::malformed(
                    &name,
                    Some(slot.name.as_str()),
                    "width must be at least one word",
                ));
            }
            if slot.kind == SlotKind::PackedPair && slot.width_words != 2 {
                return Err(LayoutError::malformed(
                    &name,
                    Some(slot.name.as_str()),
                    format!(
                        "packed-pair slots are exactly 2 words wide, got {}",
                        slot.width_words
                    ),
                ));
            }
        }

        if tag_slot_present {
            let Some(tag) = slots.iter().find(|s| s.name == names::TAG_SLOT) else {
                return Err(LayoutError::malformed(
                    &name,
                    Some(names::TAG_SLOT),
                    "tag_slot is set but no slot named tag is declared",
                ));
            };
            if tag.kind != SlotKind::Boxed || tag.width_words != 1 {
                return Err(LayoutError::malformed(
                    &name,
                    Some(names::TAG_SLOT),
                    "the tag slot must be a single boxed word",
                ));
            }
        }

        Ok(LayoutDescriptor {
            name,
            tag_slot_present,
            lowtag,
            slots,
            size_words,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag_slot_present(&self) -> bool {
        self.tag_slot_present
    }

    pub fn lowtag(&self) -> u32 {
        self.lowtag
    }

    /// Slots in declaration order, including the tag slot wherever it was declared.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn size_words(&self) -> u32 {
        self.size_words
    }

    pub fn is_tag_slot(&self, slot: &Slot) -> bool {
        self.tag_slot_present && slot.name == names::TAG_SLOT
    }

    /// Header word plus every slot word, before alignment.
    pub fn unaligned_words(&self) -> u64 {
        1 + self
            .slots
            .iter()
            .map(|s| u64::from(s.width_words))
            .sum::<u64>()
    }
}
