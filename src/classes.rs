//! Built-in character classes: the `\d`, `\w` and `\s` shorthands and the
//! named classes available through `\p{Name}`.

use crate::ast::{CharRange, CharSet};

const PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// `\d`
pub fn digit() -> CharSet {
    CharSet::new([CharRange::new('0', '9')])
}

/// `\w`
pub fn word() -> CharSet {
    CharSet::new([
        CharRange::new('a', 'z'),
        CharRange::new('A', 'Z'),
        CharRange::new('0', '9'),
        CharRange::single('_'),
    ])
}

/// `\s`
pub fn whitespace() -> CharSet {
    CharSet::from_chars([' ', '\t', '\n', '\u{b}', '\u{c}', '\r'])
}

fn lower() -> CharSet {
    CharSet::new(
        [
            CharRange::new('a', 'z'),
            CharRange::new('ß', 'ö'),
            CharRange::new('ø', 'ÿ'),
        ]
        .into_iter()
        .chain(latin_extended_a(|c| c.is_lowercase())),
    )
}

fn upper() -> CharSet {
    CharSet::new(
        [
            CharRange::new('A', 'Z'),
            CharRange::new('À', 'Ö'),
            CharRange::new('Ø', 'Þ'),
        ]
        .into_iter()
        .chain(latin_extended_a(|c| c.is_uppercase())),
    )
}

/// Letters of the Latin Extended-A block accepted by `keep`
fn latin_extended_a(keep: fn(char) -> bool) -> impl Iterator<Item = CharRange> {
    ('\u{100}'..='\u{17f}').filter(move |c| keep(*c)).map(CharRange::single)
}

/// Resolves a `\p{Name}` class. Coverage is limited to ASCII, Latin-1 and
/// Latin Extended-A.
pub fn named(name: &str) -> Option<CharSet> {
    let set = match name {
        "Lower" => lower(),
        "Upper" => upper(),
        "ASCII" => CharSet::new([CharRange::new('\0', '\u{7f}')]),
        "Alpha" => lower().union(&upper()),
        "Digit" => digit(),
        "Alnum" => lower().union(&upper()).union(&digit()),
        "Punct" => CharSet::from_chars(PUNCTUATION.chars()),
        _ => return None,
    };
    Some(set)
}

/// Characters forming words, as seen by the word boundary predicate
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
