//! Bytecode instructions for the matching virtual machine

use std::fmt;

use crate::{
    ast::CharSet,
    classes,
    error::{RegexError, Result},
};

/// Instruction opcodes, as written in serialized programs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Exact character match (followed by the character)
    SomeChar = 1,
    /// Matches any character
    AnyChar = 2,
    /// Character set (followed by the number of ranges and the ranges)
    CharSet = 3,
    /// Unconditional jump (followed by the target)
    Jump = 4,
    /// End of a successful match (followed by the match id)
    Match = 5,
    /// Zero-width assertion (followed by the predicate id)
    Predicate = 6,
    /// Record the current position (followed by the register number)
    Save = 7,
    /// Fork execution (followed by both targets, highest priority first)
    Split = 8,
    /// Built-in class looked up by name (followed by the name)
    NamedClass = 9,
}

impl OpCode {
    /// Convert byte to opcode
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(OpCode::SomeChar),
            2 => Some(OpCode::AnyChar),
            3 => Some(OpCode::CharSet),
            4 => Some(OpCode::Jump),
            5 => Some(OpCode::Match),
            6 => Some(OpCode::Predicate),
            7 => Some(OpCode::Save),
            8 => Some(OpCode::Split),
            9 => Some(OpCode::NamedClass),
            _ => None,
        }
    }

    /// Convert opcode to byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Zero-width assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Predicate {
    /// A word character on exactly one side of the position
    WordBoundary = 1,
}

impl Predicate {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Predicate::WordBoundary),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Evaluates the predicate at byte offset `pos` of `text`. `pos` must be
    /// a char boundary.
    pub fn evaluate(self, text: &str, pos: usize) -> bool {
        match self {
            Predicate::WordBoundary => {
                let before = text[..pos]
                    .chars()
                    .next_back()
                    .is_some_and(classes::is_word_char);
                let after = text[pos..].chars().next().is_some_and(classes::is_word_char);
                before != after
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::WordBoundary => write!(f, "WORD_BOUNDARY"),
        }
    }
}

/// A bytecode instruction. Jump targets are indexes into the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    SomeChar(char),
    AnyChar,
    CharSet(CharSet),
    Jump(usize),
    /// The first target has the highest priority
    Split(usize, usize),
    Save(usize),
    /// Negative ids are anonymous
    MatchFound(i32),
    Predicate(Predicate),
    NamedClass(String),
}

impl Instruction {
    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::SomeChar(_) => OpCode::SomeChar,
            Instruction::AnyChar => OpCode::AnyChar,
            Instruction::CharSet(_) => OpCode::CharSet,
            Instruction::Jump(_) => OpCode::Jump,
            Instruction::Split(_, _) => OpCode::Split,
            Instruction::Save(_) => OpCode::Save,
            Instruction::MatchFound(_) => OpCode::Match,
            Instruction::Predicate(_) => OpCode::Predicate,
            Instruction::NamedClass(_) => OpCode::NamedClass,
        }
    }

    /// Returns the instruction with its jump targets moved by `delta`
    pub fn resolved(&self, delta: usize) -> Instruction {
        match self {
            Instruction::Jump(target) => Instruction::Jump(target + delta),
            Instruction::Split(x, y) => Instruction::Split(x + delta, y + delta),
            other => other.clone(),
        }
    }

    /// Returns the instruction with its capture register moved by `delta`
    pub fn rebase_captures(&self, delta: usize) -> Instruction {
        match self {
            Instruction::Save(register) => Instruction::Save(register + delta),
            other => other.clone(),
        }
    }

    /// True when execution may continue at the next instruction
    fn falls_through(&self) -> bool {
        !matches!(
            self,
            Instruction::Jump(_) | Instruction::Split(_, _) | Instruction::MatchFound(_)
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::SomeChar(c) => write!(f, "SOME_CHAR {c:?}"),
            Instruction::AnyChar => write!(f, "ANY_CHAR"),
            Instruction::CharSet(set) => write!(f, "CHAR_SET {set}"),
            Instruction::Jump(target) => write!(f, "JUMP {target}"),
            Instruction::Split(x, y) => write!(f, "SPLIT {x}, {y}"),
            Instruction::Save(register) => write!(f, "SAVE {register}"),
            Instruction::MatchFound(id) => write!(f, "MATCH {id}"),
            Instruction::Predicate(predicate) => write!(f, "PREDICATE {predicate}"),
            Instruction::NamedClass(name) => write!(f, "NAMED_CLASS {name}"),
        }
    }
}

/// Number of registers needed by the `SAVE` instructions of a program: the
/// highest register used, rounded up to a whole group
pub(crate) fn required_registers(instructions: &[Instruction]) -> usize {
    instructions
        .iter()
        .filter_map(|instruction| match instruction {
            Instruction::Save(register) => Some((register / 2 + 1) * 2),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

/// Checks that a program can be executed: every target is in range, the
/// register count is the one the `SAVE` instructions need and no
/// instruction falls through past the end of the program.
pub(crate) fn validate(register_count: usize, instructions: &[Instruction]) -> Result<()> {
    if instructions.is_empty() {
        return Err(RegexError::InvalidProgram("empty program".into()));
    }
    let required = required_registers(instructions);
    if register_count != required {
        return Err(RegexError::InvalidProgram(format!(
            "register count {register_count}, the program uses {required}"
        )));
    }

    let len = instructions.len();
    for (pc, instruction) in instructions.iter().enumerate() {
        let check_target = |target: usize| {
            if target < len {
                Ok(())
            } else {
                Err(RegexError::InvalidProgram(format!(
                    "{pc}: {instruction} jumps past the end of the program"
                )))
            }
        };
        match instruction {
            Instruction::Jump(target) => check_target(*target)?,
            Instruction::Split(x, y) => {
                check_target(*x)?;
                check_target(*y)?;
            }
            Instruction::NamedClass(name) if classes::named(name).is_none() => {
                return Err(RegexError::UnknownNamedClass(name.clone()));
            }
            _ => {}
        }
        if instruction.falls_through() && pc + 1 == len {
            return Err(RegexError::InvalidProgram(format!(
                "{pc}: {instruction} falls through the end of the program"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_bytes() {
        for byte in 1..=9 {
            let opcode = OpCode::from_byte(byte).unwrap();
            assert_eq!(opcode.to_byte(), byte);
        }
        assert_eq!(OpCode::from_byte(0), None);
        assert_eq!(OpCode::from_byte(10), None);
        assert_eq!(Predicate::from_byte(2), None);
    }

    #[test]
    fn test_word_boundary() {
        let text = "l'été 8a";
        let boundary = |pos| Predicate::WordBoundary.evaluate(text, pos);
        assert!(boundary(0));
        assert!(boundary(1));
        assert!(boundary(2));
        assert!(!boundary(4));
        assert!(boundary(text.find(' ').unwrap()));
        assert!(!boundary(text.len() - 1));
        assert!(boundary(text.len()));
        assert!(!Predicate::WordBoundary.evaluate("", 0));
    }

    #[test]
    fn test_rebasing() {
        assert_eq!(Instruction::Split(1, 4).resolved(3), Instruction::Split(4, 7));
        assert_eq!(Instruction::Jump(0).resolved(3), Instruction::Jump(3));
        assert_eq!(Instruction::Save(1).resolved(3), Instruction::Save(1));
        assert_eq!(Instruction::Save(1).rebase_captures(2), Instruction::Save(3));
        assert_eq!(Instruction::Jump(1).rebase_captures(2), Instruction::Jump(1));
    }

    #[test]
    fn test_validate() {
        let ok = [
            Instruction::Save(0),
            Instruction::SomeChar('a'),
            Instruction::Save(1),
            Instruction::MatchFound(-1),
        ];
        assert!(validate(2, &ok).is_ok());
        assert!(validate(0, &ok).is_err());
        assert!(validate(4, &ok).is_err());
        assert!(validate(0x4000_0000, &[Instruction::MatchFound(-1)]).is_err());
        assert!(validate(0, &[]).is_err());
        assert!(validate(0, &[Instruction::Jump(1)]).is_err());
        assert!(validate(0, &[Instruction::AnyChar]).is_err());
        assert!(matches!(
            validate(
                0,
                &[
                    Instruction::NamedClass("Nope".into()),
                    Instruction::MatchFound(0)
                ]
            ),
            Err(RegexError::UnknownNamedClass(_))
        ));
    }

    #[test]
    fn test_required_registers() {
        assert_eq!(required_registers(&[Instruction::MatchFound(-1)]), 0);
        assert_eq!(
            required_registers(&[Instruction::Save(4), Instruction::Save(1)]),
            6
        );
        assert_eq!(required_registers(&[Instruction::Save(3)]), 4);
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::SomeChar('a').to_string(), "SOME_CHAR 'a'");
        assert_eq!(Instruction::Split(1, 3).to_string(), "SPLIT 1, 3");
        assert_eq!(
            Instruction::Predicate(Predicate::WordBoundary).to_string(),
            "PREDICATE WORD_BOUNDARY"
        );
    }
}
