//! Pattern lexer
//!
//! Splits a pattern into tokens, one per call to [`Lexer::next_token`]. The
//! lexer is modal: inside `[...]` only `-` and `]` are special, inside a
//! repetition `{...}` it reads integers and commas, and after `\p{` it reads
//! class names and the parenthesised arguments of `WordList(...)`.

use std::fmt;

use crate::error::{RegexError, Result};

/// Characters that may be escaped outside of a character set
const NORMAL_ESCAPABLE: &str = "|.()[]\\?*+{}";
/// Characters that may be escaped inside a character set
const CHARSET_ESCAPABLE: &str = "-]\\[";

/// Lexer modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    CharSet,
    Repetition,
    ClassName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal character
    Char(char),
    /// Repetition bound
    Int(u32),
    /// Class name or word list argument
    Name(String),
    Dot,
    Pipe,
    Opt,
    Star,
    Plus,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dash,
    /// `\d`
    Digit,
    /// `\w`
    WordChar,
    /// `\s`
    Whitespace,
    /// `\b`
    WordBoundary,
    /// `\p{`
    NamedClass,
    /// End of input
    Eoi,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Char(c) => write!(f, "character {c:?}"),
            TokenKind::Int(n) => write!(f, "integer {n}"),
            TokenKind::Name(name) => write!(f, "name {name}"),
            TokenKind::Dot => write!(f, "DOT"),
            TokenKind::Pipe => write!(f, "PIPE"),
            TokenKind::Opt => write!(f, "OPT"),
            TokenKind::Star => write!(f, "STAR"),
            TokenKind::Plus => write!(f, "PLUS"),
            TokenKind::LParen => write!(f, "LPAREN"),
            TokenKind::RParen => write!(f, "RPAREN"),
            TokenKind::LBracket => write!(f, "LBRACKET"),
            TokenKind::RBracket => write!(f, "RBRACKET"),
            TokenKind::LBrace => write!(f, "LBRACE"),
            TokenKind::RBrace => write!(f, "RBRACE"),
            TokenKind::Comma => write!(f, "COMMA"),
            TokenKind::Dash => write!(f, "DASH"),
            TokenKind::Digit => write!(f, "NUMBER"),
            TokenKind::WordChar => write!(f, "WORD_CHARACTER"),
            TokenKind::Whitespace => write!(f, "WHITESPACE"),
            TokenKind::WordBoundary => write!(f, "WORD_BOUNDARY"),
            TokenKind::NamedClass => write!(f, "NAMED_CLASS"),
            TokenKind::Eoi => write!(f, "EOI"),
        }
    }
}

/// A token and the index of the pattern character it starts at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub offset: usize,
    pub kind: TokenKind,
}

impl Token {
    fn new(offset: usize, kind: TokenKind) -> Self {
        Token { offset, kind }
    }
}

pub struct Lexer {
    /// Input pattern as chars
    pattern: Vec<char>,
    /// Current position in pattern
    pos: usize,
    mode: Mode,
    /// Mode to return to once a class name is closed
    resume: Mode,
}

impl Lexer {
    pub fn new(pattern: &str) -> Self {
        Lexer {
            pattern: pattern.chars().collect(),
            pos: 0,
            mode: Mode::Normal,
            resume: Mode::Normal,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.pattern.get(self.pos + ahead).copied()
    }

    /// Emits a single-character token and moves past it
    fn single(&mut self, kind: TokenKind) -> Token {
        let token = Token::new(self.pos, kind);
        self.pos += 1;
        token
    }

    /// Returns the next token. Once the end of the pattern is reached,
    /// every call returns [`TokenKind::Eoi`].
    pub fn next_token(&mut self) -> Result<Token> {
        let Some(current) = self.peek(0) else {
            return match self.mode {
                Mode::Normal => Ok(Token::new(self.pos, TokenKind::Eoi)),
                Mode::CharSet => Err(RegexError::lexer(self.pos, "unterminated character set")),
                Mode::Repetition => Err(RegexError::lexer(self.pos, "unterminated repetition")),
                Mode::ClassName => Err(RegexError::lexer(self.pos, "unterminated class name")),
            };
        };

        if current == '\\' {
            return self.escaped_character();
        }

        match self.mode {
            Mode::Normal => Ok(match current {
                '.' => self.single(TokenKind::Dot),
                '|' => self.single(TokenKind::Pipe),
                '?' => self.single(TokenKind::Opt),
                '+' => self.single(TokenKind::Plus),
                '*' => self.single(TokenKind::Star),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => {
                    self.mode = Mode::CharSet;
                    self.single(TokenKind::LBracket)
                }
                '{' => {
                    self.mode = Mode::Repetition;
                    self.single(TokenKind::LBrace)
                }
                '}' => self.single(TokenKind::RBrace),
                c => self.single(TokenKind::Char(c)),
            }),
            Mode::CharSet => Ok(match current {
                '-' => self.single(TokenKind::Dash),
                ']' => {
                    self.mode = Mode::Normal;
                    self.single(TokenKind::RBracket)
                }
                c => self.single(TokenKind::Char(c)),
            }),
            Mode::Repetition => match current {
                ',' => Ok(self.single(TokenKind::Comma)),
                '}' => {
                    self.mode = Mode::Normal;
                    Ok(self.single(TokenKind::RBrace))
                }
                c if c.is_ascii_digit() => self.integer(),
                c => Err(RegexError::lexer(
                    self.pos,
                    format!("unexpected {c:?} in repetition"),
                )),
            },
            Mode::ClassName => match current {
                '(' => Ok(self.single(TokenKind::LParen)),
                ')' => Ok(self.single(TokenKind::RParen)),
                ',' => Ok(self.single(TokenKind::Comma)),
                '}' => {
                    self.mode = self.resume;
                    Ok(self.single(TokenKind::RBrace))
                }
                c if c.is_alphabetic() || c == '_' => Ok(self.name()),
                c => Err(RegexError::lexer(
                    self.pos,
                    format!("unexpected {c:?} in class name"),
                )),
            },
        }
    }

    fn integer(&mut self) -> Result<Token> {
        let offset = self.pos;
        let mut value: u32 = 0;
        while let Some(digit) = self.peek(0).and_then(|c| c.to_digit(10)) {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| RegexError::lexer(offset, "repetition bound too large"))?;
            self.pos += 1;
        }
        Ok(Token::new(offset, TokenKind::Int(value)))
    }

    fn name(&mut self) -> Token {
        let offset = self.pos;
        let mut name = String::new();
        while let Some(c) = self.peek(0).filter(|c| c.is_alphanumeric() || *c == '_') {
            name.push(c);
            self.pos += 1;
        }
        Token::new(offset, TokenKind::Name(name))
    }

    /// Handles a backslash at the current position
    fn escaped_character(&mut self) -> Result<Token> {
        let offset = self.pos;
        let Some(escaped) = self.peek(1) else {
            return Err(RegexError::lexer(offset, "pattern ends with a backslash"));
        };

        let kind = match escaped {
            'd' => TokenKind::Digit,
            'w' => TokenKind::WordChar,
            's' => TokenKind::Whitespace,
            'b' => TokenKind::WordBoundary,
            'p' => {
                if self.peek(2) != Some('{') {
                    return Err(RegexError::lexer(offset, "expected '{' after \\p"));
                }
                self.pos += 3;
                self.resume = self.mode;
                self.mode = Mode::ClassName;
                return Ok(Token::new(offset, TokenKind::NamedClass));
            }
            c if self.mode == Mode::Normal && NORMAL_ESCAPABLE.contains(c) => TokenKind::Char(c),
            c if self.mode == Mode::CharSet && CHARSET_ESCAPABLE.contains(c) => TokenKind::Char(c),
            c => {
                return Err(RegexError::lexer(
                    offset,
                    format!("invalid escaped character {c:?}"),
                ))
            }
        };

        self.pos += 2;
        Ok(Token::new(offset, kind))
    }
}
