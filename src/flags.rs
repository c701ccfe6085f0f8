//! Compilation flags

use bitflags::bitflags;

bitflags! {
    /// Flags that control how a pattern is compiled. None of them survive
    /// into the bytecode: they are applied as rewrites of the syntax tree.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u32 {
        /// Letters match both their lowercase and uppercase forms
        const CASE_INSENSITIVE = 1;
        /// Letters match their base letter and all its diacritic variants
        const DIACRITICS_INSENSITIVE = 2;
        /// Surround the pattern with word boundaries where it starts or ends
        /// with something that can match a word character
        const AUTO_WORD_BOUNDARIES = 4;
    }
}

impl Default for Flags {
    fn default() -> Self {
        Flags::empty()
    }
}

impl Flags {
    /// Check if case insensitive matching is enabled
    pub fn case_insensitive(self) -> bool {
        self.contains(Self::CASE_INSENSITIVE)
    }

    /// Check if diacritic insensitive matching is enabled
    pub fn diacritics_insensitive(self) -> bool {
        self.contains(Self::DIACRITICS_INSENSITIVE)
    }

    /// Check if word boundaries are added automatically
    pub fn auto_word_boundaries(self) -> bool {
        self.contains(Self::AUTO_WORD_BOUNDARIES)
    }

    /// True when literal characters have to be expanded before code generation
    pub(crate) fn needs_expansion(self) -> bool {
        self.intersects(Self::CASE_INSENSITIVE | Self::DIACRITICS_INSENSITIVE)
    }
}
