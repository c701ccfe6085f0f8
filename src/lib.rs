//! Regular expression engine with a serializable bytecode
//!
//! Patterns are parsed into a syntax tree, compiled into a small bytecode
//! program and run by a Pike virtual machine, which matches in linear time
//! with leftmost-first semantics and capture groups. Compiled programs can
//! be serialized to bytes and loaded back without compiling again.
//!
//! Besides the usual syntax, patterns can reference built-in classes with
//! `\p{Punct}` and named lists of words with `\p{WordList(Name)}`, and be
//! compiled case or diacritic insensitive.
//!
//! ```
//! use talisman_regex::CompiledRegex;
//!
//! let regex = CompiledRegex::new("(\\d+)-(\\d+)").unwrap();
//! let found = regex.find_first_in("pages 12-14").unwrap();
//! assert_eq!(found.as_str("pages 12-14"), Some("12-14"));
//! assert_eq!(found.group_str("pages 12-14", 2), Some("14"));
//! ```
//!
//! Match offsets are byte offsets into the searched text.

pub mod ast;
pub mod classes;
pub mod compiler;
pub mod error;
pub mod flags;
pub mod lexer;
pub mod matcher;
pub mod opcodes;
pub mod parser;
pub mod serializer;
pub mod variants;

use std::{fmt, io, ops::Range};

use log::debug;

pub use compiler::{compile, Compiler};
pub use error::{RegexError, Result};
pub use flags::Flags;
pub use matcher::Matcher;
pub use opcodes::Instruction;
pub use parser::{WordList, WordListResolver, WordLists};
pub use variants::VariantTable;

/// A compiled regular expression: a bytecode program and the number of
/// capture registers it uses. Registers `2g` and `2g + 1` hold the start and
/// end of capture group `g + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRegex {
    register_count: usize,
    instructions: Vec<Instruction>,
}

impl CompiledRegex {
    /// Compile a pattern without flags
    pub fn new(pattern: &str) -> Result<Self> {
        Compiler::new().compile(pattern)
    }

    /// Compile a pattern with specific flags
    pub fn with_flags(pattern: &str, flags: Flags) -> Result<Self> {
        Compiler::new().flags(flags).compile(pattern)
    }

    /// Builds a regex out of a hand-written program, after checking that it
    /// can be executed
    pub fn from_parts(register_count: usize, instructions: Vec<Instruction>) -> Result<Self> {
        opcodes::validate(register_count, &instructions)?;
        Ok(Self::from_compiled(register_count, instructions))
    }

    pub(crate) fn from_compiled(register_count: usize, instructions: Vec<Instruction>) -> Self {
        CompiledRegex {
            register_count,
            instructions,
        }
    }

    pub fn register_count(&self) -> usize {
        self.register_count
    }

    /// Number of capture groups, the whole match excluded
    pub fn group_count(&self) -> usize {
        self.register_count / 2
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Find the first match in the text
    pub fn find_first_in(&self, text: &str) -> Option<Match> {
        matcher::find_at(self, text, 0)
    }

    /// Find the first match starting at byte offset `start` or later
    pub fn find_at(&self, text: &str, start: usize) -> Option<Match> {
        matcher::find_at(self, text, start)
    }

    /// Iterate over the successive matches in the text
    pub fn find_in<'r, 't>(&'r self, text: &'t str) -> Matcher<'r, 't> {
        Matcher::new(self, text)
    }

    /// Test if the pattern matches anywhere in the text
    pub fn is_match(&self, text: &str) -> bool {
        self.find_first_in(text).is_some()
    }

    /// Combines two programs into one matching either of them, `self` having
    /// the priority. The capture groups of `other` are numbered after the
    /// groups of `self`, and [`Match::id`] tells which program matched.
    pub fn or(&self, other: &CompiledRegex) -> CompiledRegex {
        let offset = self.instructions.len() + 1;
        let mut instructions = Vec::with_capacity(offset + other.instructions.len());
        instructions.push(Instruction::Split(1, offset));
        instructions.extend(self.instructions.iter().map(|i| i.resolved(1)));
        instructions.extend(
            other
                .instructions
                .iter()
                .map(|i| i.resolved(offset).rebase_captures(self.register_count)),
        );
        debug!(
            "combined programs of {} and {} instructions",
            self.instructions.len(),
            other.instructions.len()
        );
        CompiledRegex {
            register_count: self.register_count + other.register_count,
            instructions,
        }
    }

    /// Serialize the program to bytes
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serializer::serialize(self)
    }

    /// Write the serialized program to `writer`
    pub fn serialize_into<W: io::Write>(&self, writer: W) -> Result<()> {
        serializer::serialize_into(self, writer)
    }

    /// Load a program serialized with [`CompiledRegex::serialize`]
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        serializer::deserialize(bytes)
    }

    /// Read a serialized program from `reader`
    pub fn deserialize_from<R: io::Read>(reader: R) -> Result<Self> {
        serializer::deserialize_from(reader)
    }
}

impl fmt::Display for CompiledRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "registers: {}", self.register_count)?;
        for (pc, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{pc:4}: {instruction}")?;
        }
        Ok(())
    }
}

/// A successful match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    start: usize,
    end: usize,
    /// Bounds of the capture groups, group 1 first
    groups: Vec<Option<(usize, usize)>>,
    id: i32,
}

impl Match {
    pub(crate) fn new(start: usize, end: usize, groups: Vec<Option<(usize, usize)>>, id: i32) -> Self {
        Match {
            start,
            end,
            groups,
            id,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Id of the `MATCH` instruction reached, negative if anonymous
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Number of capture groups, the whole match excluded
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Get the bounds of a capture group. Group 0 is the whole match;
    /// groups that did not take part in the match are `None`.
    pub fn group(&self, index: usize) -> Option<(usize, usize)> {
        match index {
            0 => Some((self.start, self.end)),
            _ => self.groups.get(index - 1).copied().flatten(),
        }
    }

    /// Text of a capture group
    pub fn group_str<'t>(&self, text: &'t str, index: usize) -> Option<&'t str> {
        self.group(index).and_then(|(start, end)| text.get(start..end))
    }

    /// Text of the whole match, `None` if `text` is not the searched text
    /// and the bounds do not fit it
    pub fn as_str<'t>(&self, text: &'t str) -> Option<&'t str> {
        text.get(self.range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_group_accessors() {
        let found = Match::new(2, 6, vec![Some((2, 4)), None], -1);
        assert_eq!(found.group(0), Some((2, 6)));
        assert_eq!(found.group(1), Some((2, 4)));
        assert_eq!(found.group(2), None);
        assert_eq!(found.group(3), None);
        assert_eq!(found.group_count(), 2);
        assert_eq!(found.as_str("abcdefgh"), Some("cdef"));
        assert_eq!(found.as_str("abc"), None);
        assert_eq!(found.as_str("aéxyz"), None);
        assert_eq!(found.group_str("abcdefgh", 1), Some("cd"));
    }

    #[test]
    fn test_or_rebases_program() {
        let left = CompiledRegex::new("(a)").unwrap();
        let right = CompiledRegex::new("b(c)").unwrap();
        let combined = left.or(&right);
        assert_eq!(combined.register_count(), 4);
        assert_eq!(
            combined.instructions(),
            &[
                Instruction::Split(1, 5),
                Instruction::Save(0),
                Instruction::SomeChar('a'),
                Instruction::Save(1),
                Instruction::MatchFound(-1),
                Instruction::SomeChar('b'),
                Instruction::Save(2),
                Instruction::SomeChar('c'),
                Instruction::Save(3),
                Instruction::MatchFound(-1),
            ]
        );
        assert!(opcodes::validate(combined.register_count(), combined.instructions()).is_ok());
    }

    #[test]
    fn test_display_listing() {
        let regex = CompiledRegex::new("a|b").unwrap();
        assert_eq!(
            regex.to_string(),
            "registers: 0\n   0: SPLIT 1, 3\n   1: SOME_CHAR 'a'\n   2: JUMP 4\n   3: SOME_CHAR 'b'\n   4: MATCH -1\n"
        );
    }
}
