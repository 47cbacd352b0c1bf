use layoutgen_targets::TargetConfig;
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

pub const SUPPORTED_WORD_BYTES: [u32; 2] = [4, 8];

pub fn validate_target(target: &TargetConfig) -> Result<(), LayoutError> {
    if !SUPPORTED_WORD_BYTES.contains(&target.word_bytes) {
        return Err(LayoutError::UnsupportedWordSize {
            word_bytes: target.word_bytes,
        });
    }
    if target.alignment_words == 0 || !target.alignment_words.is_power_of_two() {
        return Err(LayoutError::InvalidTarget {
            reason: format!(
                "alignment_words must be a power of two, got {}",
                target.alignment_words
            ),
        });
    }
    let Some(granule) = target.granule_bytes() else {
        return Err(LayoutError::InvalidTarget {
            reason: format!(
                "alignment of {} words overflows a byte count",
                target.alignment_words
            ),
        });
    };
    if target.lowtag_bits == 0 || target.lowtag_bits >= 32 {
        return Err(LayoutError::InvalidTarget {
            reason: format!("lowtag_bits must be in 1..32, got {}", target.lowtag_bits),
        });
    }
    // Every object starts on a granule boundary, so the tag must fit below it.
    if (1u64 << target.lowtag_bits) > u64::from(granule) {
        return Err(LayoutError::InvalidTarget {
            reason: format!(
                "{} lowtag bits do not fit in a {granule}-byte alignment granule",
                target.lowtag_bits
            ),
        });
    }
    Ok(())
}

/// Largest lowtag representable on `target`.
pub fn max_lowtag(target: &TargetConfig) -> u32 {
    // lowtag_bits < 32 after validation
    ((1u64 << target.lowtag_bits) - 1) as u32
}

/// Serializable snapshot of a target, as recorded in indexes and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub word_bytes: u32,
    pub lowtag_bits: u32,
    pub alignment_words: u32,
}

impl From<&TargetConfig> for TargetRecord {
    fn from(t: &TargetConfig) -> Self {
        TargetRecord {
            word_bytes: t.word_bytes,
            lowtag_bits: t.lowtag_bits,
            alignment_words: t.alignment_words,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layoutgen_targets::TargetId;

    fn cfg(word_bytes: u32, lowtag_bits: u32, alignment_words: u32) -> TargetConfig {
        TargetConfig {
            word_bytes,
            lowtag_bits,
            alignment_words,
        }
    }

    #[test]
    fn presets_are_valid() {
        for &t in TargetId::all() {
            validate_target(&t.config()).expect(t.as_str());
        }
    }

    #[test]
    fn rejects_unsupported_word_sizes() {
        for w in [0, 2, 16] {
            let err = validate_target(&cfg(w, 3, 2)).expect_err("word size");
            assert!(matches!(
                err,
                LayoutError::UnsupportedWordSize { word_bytes } if word_bytes == w
            ));
        }
    }

    #[test]
    fn rejects_tag_bits_wider_than_alignment() {
        let err = validate_target(&cfg(8, 5, 2)).expect_err("5 bits in 16 bytes");
        assert!(matches!(err, LayoutError::InvalidTarget { .. }));
        assert!(validate_target(&cfg(8, 4, 2)).is_ok());
        assert!(validate_target(&cfg(8, 5, 4)).is_ok());
    }

    #[test]
    fn rejects_odd_alignment() {
        assert!(validate_target(&cfg(8, 3, 3)).is_err());
        assert!(validate_target(&cfg(8, 3, 0)).is_err());
    }

    #[test]
    fn max_lowtag_follows_tag_bits() {
        assert_eq!(max_lowtag(&TargetId::X86_64.config()), 15);
        assert_eq!(max_lowtag(&TargetId::X86.config()), 7);
    }
}
