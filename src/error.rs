//! Error types for the regex engine

use thiserror::Error;

/// Result type for regex operations
pub type Result<T> = std::result::Result<T, RegexError>;

/// Errors that can occur while compiling, combining or (de)serializing a
/// regular expression. Matching itself never fails.
#[derive(Error, Debug)]
pub enum RegexError {
    /// The pattern could not be split into tokens
    #[error("Invalid regular expression at index {offset}: {message}")]
    Lexer { offset: usize, message: String },

    /// The token stream does not form a valid expression
    #[error("Malformed regular expression{}: {message}", fmt_offset(.offset))]
    Parser {
        offset: Option<usize>,
        message: String,
    },

    /// `\p{WordList(Name)}` names a list the resolver does not know
    #[error("Unknown word list {name} at index {offset}")]
    UnknownWordList { name: String, offset: usize },

    /// Unsupported option in a `\p{WordList(...)}` reference
    #[error("Unknown word list option {option} at index {offset}")]
    UnknownWordListOption { option: String, offset: usize },

    /// `\p{Name}` with a name outside the built-in classes
    #[error("Unknown class name {0}")]
    UnknownNamedClass(String),

    /// Repetition whose upper bound is below its lower bound
    #[error("Invalid repetition bounds {{{min},{max}}}")]
    InvalidRepetition { min: u32, max: u32 },

    /// Bytecode stream holds an opcode outside the instruction set
    #[error("Unknown opcode {0}")]
    UnknownOpcode(u8),

    /// Bytecode stream holds a predicate id outside the known set
    #[error("Unknown predicate {0}")]
    UnknownPredicate(u8),

    /// Bytecode stream holds a code unit that is not a Unicode scalar value
    #[error("Invalid character code {0:#x}")]
    InvalidChar(u32),

    /// Character that does not fit in a 16-bit bytecode slot
    #[error("Character {0:?} cannot be stored in bytecode")]
    UnrepresentableChar(char),

    /// Instruction array violates a well-formedness rule
    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    /// Reading or writing a bytecode stream failed
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RegexError {
    pub(crate) fn lexer(offset: usize, message: impl Into<String>) -> Self {
        RegexError::Lexer {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn parser(offset: Option<usize>, message: impl Into<String>) -> Self {
        RegexError::Parser {
            offset,
            message: message.into(),
        }
    }

    /// True for every error caused by the pattern text itself, as opposed
    /// to errors raised while reading or writing bytecode.
    pub fn is_pattern_error(&self) -> bool {
        matches!(
            self,
            RegexError::Lexer { .. }
                | RegexError::Parser { .. }
                | RegexError::UnknownWordList { .. }
                | RegexError::UnknownWordListOption { .. }
                | RegexError::UnknownNamedClass(_)
                | RegexError::InvalidRepetition { .. }
        )
    }
}

fn fmt_offset(offset: &Option<usize>) -> String {
    match offset {
        Some(offset) => format!(" at index {offset}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_offsets() {
        let err = RegexError::parser(Some(4), "Unexpected RBrace");
        assert_eq!(
            err.to_string(),
            "Malformed regular expression at index 4: Unexpected RBrace"
        );

        let err = RegexError::parser(None, "unbalanced expression");
        assert_eq!(
            err.to_string(),
            "Malformed regular expression: unbalanced expression"
        );

        let err = RegexError::InvalidRepetition { min: 3, max: 1 };
        assert_eq!(err.to_string(), "Invalid repetition bounds {3,1}");
    }

    #[test]
    fn test_pattern_error_family() {
        assert!(RegexError::lexer(0, "x").is_pattern_error());
        assert!(RegexError::UnknownNamedClass("Foo".into()).is_pattern_error());
        assert!(!RegexError::UnknownOpcode(42).is_pattern_error());
    }
}
