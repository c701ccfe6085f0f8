//! Case and diacritic variants
//!
//! [`VariantTable`] maps letters to their base letter and back. The
//! [`expand`] pass uses it to rewrite every literal character and character
//! set of a tree according to the case and diacritic flags, so that the
//! generated bytecode never has to know about the flags.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::{
    ast::{CharRange, CharSet, Node},
    flags::Flags,
};

/// Base letters and their diacritic variants, covering the letters of
/// Latin-1 and Latin Extended-A
const LATIN: &[(char, &str)] = &[
    ('a', "àáâãäåāăą"),
    ('A', "ÀÁÂÃÄÅĀĂĄ"),
    ('c', "çćĉċč"),
    ('C', "ÇĆĈĊČ"),
    ('d', "ďđ"),
    ('D', "ĎĐ"),
    ('e', "èéêëēĕėęě"),
    ('E', "ÈÉÊËĒĔĖĘĚ"),
    ('g', "ĝğġģ"),
    ('G', "ĜĞĠĢ"),
    ('h', "ĥħ"),
    ('H', "ĤĦ"),
    ('i', "ìíîïĩīĭįı"),
    ('I', "ÌÍÎÏĨĪĬĮİ"),
    ('j', "ĵ"),
    ('J', "Ĵ"),
    ('k', "ķ"),
    ('K', "Ķ"),
    ('l', "ĺļľŀł"),
    ('L', "ĹĻĽĿŁ"),
    ('n', "ñńņň"),
    ('N', "ÑŃŅŇ"),
    ('o', "òóôõöøōŏő"),
    ('O', "ÒÓÔÕÖØŌŎŐ"),
    ('r', "ŕŗř"),
    ('R', "ŔŖŘ"),
    ('s', "śŝşš"),
    ('S', "ŚŜŞŠ"),
    ('t', "ţťŧ"),
    ('T', "ŢŤŦ"),
    ('u', "ùúûüũūŭůűų"),
    ('U', "ÙÚÛÜŨŪŬŮŰŲ"),
    ('w', "ŵ"),
    ('W', "Ŵ"),
    ('y', "ýÿŷ"),
    ('Y', "ÝŸŶ"),
    ('z', "źżž"),
    ('Z', "ŹŻŽ"),
];

/// Ranges wider than this are only expanded over [`EXPANDED_UPTO`]
const MAX_EXPANDED_RANGE: u32 = 256;
/// Last character that can have a variant in the built-in table
const EXPANDED_UPTO: char = '\u{24f}';

/// Base letter to diacritic variants table
#[derive(Debug, Clone, Default)]
pub struct VariantTable {
    /// Variant to base letter
    bases: HashMap<char, char>,
    /// Base letter to its variants, base letter excluded
    variants: HashMap<char, Vec<char>>,
}

impl VariantTable {
    /// Creates an empty table, where every letter is its own base
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table for French and the other languages written with
    /// Latin-1 and Latin Extended-A letters
    pub fn latin() -> &'static VariantTable {
        static LATIN_TABLE: OnceLock<VariantTable> = OnceLock::new();
        LATIN_TABLE.get_or_init(|| {
            let mut table = VariantTable::new();
            for (base, variants) in LATIN {
                table.add(*base, variants.chars());
            }
            table
        })
    }

    /// Declares `variants` as diacritic variants of `base`
    pub fn add<I>(&mut self, base: char, variants: I) -> &mut Self
    where
        I: IntoIterator<Item = char>,
    {
        let known = self.variants.entry(base).or_default();
        for variant in variants {
            if variant != base && !known.contains(&variant) {
                known.push(variant);
                self.bases.insert(variant, base);
            }
        }
        self
    }

    /// Returns the base letter of `c`, or `c` itself if it has none
    pub fn base(&self, c: char) -> char {
        self.bases.get(&c).copied().unwrap_or(c)
    }

    /// Returns the diacritic variants of the base letter `base`
    pub fn variants(&self, base: char) -> &[char] {
        self.variants.get(&base).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Letters sharing the base letter of `c`, the base letter included
    pub fn equivalents(&self, c: char) -> impl Iterator<Item = char> + '_ {
        let base = self.base(c);
        std::iter::once(base).chain(self.variants(base).iter().copied())
    }
}

/// Lowercase form of `c` when it is a single character, `c` otherwise
pub fn lower(c: char) -> char {
    single(c.to_lowercase()).unwrap_or(c)
}

/// Uppercase form of `c` when it is a single character, `c` otherwise
pub fn upper(c: char) -> char {
    single(c.to_uppercase()).unwrap_or(c)
}

fn single(mut chars: impl Iterator<Item = char>) -> Option<char> {
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Every character `c` stands for under `flags`. Case insensitivity also
/// accepts the uppercase base letter, so that `à` matches `A`.
fn char_variants(c: char, flags: Flags, table: &VariantTable) -> Vec<char> {
    let mut chars = vec![c];
    if flags.diacritics_insensitive() {
        chars.extend(table.equivalents(c));
    }
    if flags.case_insensitive() {
        let cased: Vec<char> = chars.iter().flat_map(|c| [lower(*c), upper(*c)]).collect();
        chars.extend(cased);
        chars.push(upper(table.base(c)));
    }
    chars.sort_unstable();
    chars.dedup();
    chars
}

fn expand_set(set: &CharSet, flags: Flags, table: &VariantTable) -> CharSet {
    let mut ranges: Vec<CharRange> = set.ranges().to_vec();
    for range in set.ranges() {
        let range = if range.width() <= MAX_EXPANDED_RANGE {
            *range
        } else if range.start <= EXPANDED_UPTO {
            CharRange::new(range.start, range.end.min(EXPANDED_UPTO))
        } else {
            continue;
        };
        for c in range.chars() {
            ranges.extend(
                char_variants(c, flags, table)
                    .into_iter()
                    .map(CharRange::single),
            );
        }
    }
    CharSet::new(ranges)
}

/// Rewrites the literal characters and character sets of `node` so that
/// they also match the variants selected by `flags`
pub fn expand(node: Node, flags: Flags, table: &VariantTable) -> Node {
    if !flags.needs_expansion() {
        return node;
    }
    match node {
        Node::Char(c) => {
            let set = CharSet::from_chars(char_variants(c, flags, table));
            match set.as_single() {
                Some(c) => Node::Char(c),
                None => Node::CharSet(set),
            }
        }
        Node::CharSet(set) => Node::CharSet(expand_set(&set, flags, table)),
        Node::Concat(left, right) => Node::concat(
            expand(*left, flags, table),
            expand(*right, flags, table),
        ),
        Node::Alternative(left, right) => Node::alternative(
            expand(*left, flags, table),
            expand(*right, flags, table),
        ),
        Node::Repeated { child, min, max } => {
            Node::repeated(expand(*child, flags, table), min, max)
        }
        Node::Capture { group, child } => Node::capture(group, expand(*child, flags, table)),
        other @ (Node::Empty | Node::Dot | Node::NamedClass(_) | Node::WordBoundary) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expanded(c: char, flags: Flags) -> Node {
        expand(Node::Char(c), flags, VariantTable::latin())
    }

    #[test]
    fn test_base_letters() {
        let table = VariantTable::latin();
        assert_eq!(table.base('é'), 'e');
        assert_eq!(table.base('Ç'), 'C');
        assert_eq!(table.base('e'), 'e');
        assert_eq!(table.base('?'), '?');
        assert!(table.variants('y').contains(&'ÿ'));
        assert!(table.variants('é').is_empty());
    }

    #[test]
    fn test_diacritics_insensitive() {
        assert_eq!(
            expanded('é', Flags::DIACRITICS_INSENSITIVE),
            Node::CharSet(CharSet::from_chars("eèéêëēĕėęě".chars()))
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            expanded('à', Flags::CASE_INSENSITIVE),
            Node::CharSet(CharSet::from_chars(['à', 'À', 'A']))
        );
        assert_eq!(
            expanded('7', Flags::CASE_INSENSITIVE),
            Node::Char('7')
        );
    }

    #[test]
    fn test_flags_combine() {
        let Node::CharSet(set) = expanded('É', Flags::CASE_INSENSITIVE | Flags::DIACRITICS_INSENSITIVE)
        else {
            panic!("expected a set");
        };
        for c in ['e', 'E', 'é', 'É', 'ê', 'Ê'] {
            assert!(set.contains(c), "{c}");
        }
        assert!(!set.contains('a'));
    }

    #[test]
    fn test_sets_are_expanded() {
        let node = Node::CharSet(CharSet::new([CharRange::new('a', 'c')]));
        let Node::CharSet(set) = expand(node, Flags::CASE_INSENSITIVE, VariantTable::latin()) else {
            panic!("expected a set");
        };
        assert_eq!(
            set.ranges(),
            &[CharRange::new('A', 'C'), CharRange::new('a', 'c')]
        );
    }

    #[test]
    fn test_no_flags_is_identity() {
        let node = Node::concat(Node::Char('é'), Node::Dot);
        assert_eq!(
            expand(node.clone(), Flags::AUTO_WORD_BOUNDARIES, VariantTable::latin()),
            node
        );
    }
}
