//! Target platform parameters shared by the generator and its CLI.
//!
//! A target fixes the three numbers every layout depends on:
//! - the machine word size in bytes,
//! - how many low pointer bits are reserved for the lowtag,
//! - the object alignment granularity in words.
//!
//! Layouts are only meaningful for one target at a time; changing any of these
//! changes every generated offset.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TargetId {
    #[default]
    #[cfg_attr(feature = "clap", value(name = "x86-64"))]
    X86_64,
    #[cfg_attr(feature = "clap", value(name = "arm64"))]
    Arm64,
    #[cfg_attr(feature = "clap", value(name = "x86"))]
    X86,
    #[cfg_attr(feature = "clap", value(name = "arm"))]
    Arm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetConfig {
    pub word_bytes: u32,
    pub lowtag_bits: u32,
    pub alignment_words: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetId::default().config()
    }
}

impl TargetConfig {
    /// Object alignment granularity in bytes, if it fits in a `u32`.
    pub fn granule_bytes(&self) -> Option<u32> {
        self.word_bytes.checked_mul(self.alignment_words)
    }
}

impl TargetId {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetId::X86_64 => "x86-64",
            TargetId::Arm64 => "arm64",
            TargetId::X86 => "x86",
            TargetId::Arm => "arm",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "x86-64" | "x86_64" => Some(TargetId::X86_64),
            "arm64" | "aarch64" => Some(TargetId::Arm64),
            "x86" | "i386" => Some(TargetId::X86),
            "arm" => Some(TargetId::Arm),
            _ => None,
        }
    }

    pub fn all() -> &'static [TargetId] {
        &[
            TargetId::X86_64,
            TargetId::Arm64,
            TargetId::X86,
            TargetId::Arm,
        ]
    }

    pub fn config(self) -> TargetConfig {
        match self {
            TargetId::X86_64 | TargetId::Arm64 => TargetConfig {
                word_bytes: 8,
                lowtag_bits: 4,
                alignment_words: 2,
            },
            TargetId::X86 | TargetId::Arm => TargetConfig {
                word_bytes: 4,
                lowtag_bits: 3,
                alignment_words: 2,
            },
        }
    }
}

/// A partially specified target, as written in a catalog or on a command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetSpec {
    pub preset: Option<TargetId>,
    pub word_bytes: Option<u32>,
    pub lowtag_bits: Option<u32>,
    pub alignment_words: Option<u32>,
}

impl TargetSpec {
    pub fn preset(id: TargetId) -> Self {
        TargetSpec {
            preset: Some(id),
            ..TargetSpec::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TargetSpec::default()
    }

    /// Layers `self` over `lower`.
    ///
    /// A layer that names a preset replaces `lower` entirely (its own explicit
    /// fields still apply on top of the preset). Otherwise fields are merged
    /// one by one, with `self` winning.
    pub fn over(self, lower: TargetSpec) -> TargetSpec {
        if self.preset.is_some() {
            return self;
        }
        TargetSpec {
            preset: lower.preset,
            word_bytes: self.word_bytes.or(lower.word_bytes),
            lowtag_bits: self.lowtag_bits.or(lower.lowtag_bits),
            alignment_words: self.alignment_words.or(lower.alignment_words),
        }
    }

    pub fn resolve(self) -> TargetConfig {
        let base = self.preset.unwrap_or_default().config();
        TargetConfig {
            word_bytes: self.word_bytes.unwrap_or(base.word_bytes),
            lowtag_bits: self.lowtag_bits.unwrap_or(base.lowtag_bits),
            alignment_words: self.alignment_words.unwrap_or(base.alignment_words),
        }
    }
}
