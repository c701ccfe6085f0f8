//! Binary format of compiled programs
//!
//! All integers are big-endian. A program is written as:
//!
//! ```text
//! i32  register count
//! i32  instruction count
//! for each instruction:
//!   u8   opcode
//!   ...  payload
//!        SOME_CHAR    u16 character
//!        ANY_CHAR     -
//!        CHAR_SET     i32 range count, then u16 start and u16 end per range
//!        JUMP         i32 target
//!        MATCH        i32 id
//!        PREDICATE    u8 predicate id
//!        SAVE         i32 register
//!        SPLIT        i32 target, i32 target
//!        NAMED_CLASS  u16 length, then the name in UTF-8
//! ```
//!
//! Characters take a single 16-bit slot, so programs holding characters
//! outside the Basic Multilingual Plane cannot be serialized. Loaded programs
//! go through the same checks as [`CompiledRegex::from_parts`].

use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{
    ast::{CharRange, CharSet},
    error::{RegexError, Result},
    opcodes::{Instruction, OpCode, Predicate},
    CompiledRegex,
};

/// Upper bound on capacities reserved from counts read in a stream
const MAX_PREALLOCATED: usize = 1024;

/// Serializes `regex` to a byte vector
pub fn serialize(regex: &CompiledRegex) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    serialize_into(regex, &mut bytes)?;
    Ok(bytes)
}

/// Serializes `regex` into `writer`
pub fn serialize_into<W: Write>(regex: &CompiledRegex, mut writer: W) -> Result<()> {
    write_count(&mut writer, regex.register_count())?;
    write_count(&mut writer, regex.instructions().len())?;

    for instruction in regex.instructions() {
        writer.write_u8(instruction.opcode().to_byte())?;
        match instruction {
            Instruction::SomeChar(c) => write_char(&mut writer, *c)?,
            Instruction::AnyChar => {}
            Instruction::CharSet(set) => {
                write_count(&mut writer, set.ranges().len())?;
                for range in set.ranges() {
                    write_char(&mut writer, range.start)?;
                    write_char(&mut writer, range.end)?;
                }
            }
            Instruction::Jump(target) => write_count(&mut writer, *target)?,
            Instruction::Split(x, y) => {
                write_count(&mut writer, *x)?;
                write_count(&mut writer, *y)?;
            }
            Instruction::Save(register) => write_count(&mut writer, *register)?,
            Instruction::MatchFound(id) => writer.write_i32::<BigEndian>(*id)?,
            Instruction::Predicate(predicate) => writer.write_u8(predicate.to_byte())?,
            Instruction::NamedClass(name) => {
                let len = u16::try_from(name.len()).map_err(|_| {
                    RegexError::InvalidProgram(format!("class name of {} bytes", name.len()))
                })?;
                writer.write_u16::<BigEndian>(len)?;
                writer.write_all(name.as_bytes())?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

/// Loads a program from `bytes`, which must hold exactly one program
pub fn deserialize(bytes: &[u8]) -> Result<CompiledRegex> {
    let mut cursor = Cursor::new(bytes);
    let regex = deserialize_from(&mut cursor)?;
    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(RegexError::InvalidProgram(format!(
            "{} trailing bytes",
            bytes.len() - consumed
        )));
    }
    Ok(regex)
}

/// Loads a program from `reader`
pub fn deserialize_from<R: Read>(mut reader: R) -> Result<CompiledRegex> {
    let register_count = read_count(&mut reader, "register count")?;
    let count = read_count(&mut reader, "instruction count")?;

    let mut instructions = Vec::with_capacity(count.min(MAX_PREALLOCATED));
    for _ in 0..count {
        let byte = reader.read_u8()?;
        let opcode = OpCode::from_byte(byte).ok_or(RegexError::UnknownOpcode(byte))?;
        let instruction = match opcode {
            OpCode::SomeChar => Instruction::SomeChar(read_char(&mut reader)?),
            OpCode::AnyChar => Instruction::AnyChar,
            OpCode::CharSet => {
                let len = read_count(&mut reader, "range count")?;
                let mut ranges = Vec::with_capacity(len.min(MAX_PREALLOCATED));
                for _ in 0..len {
                    let start = read_char(&mut reader)?;
                    let end = read_char(&mut reader)?;
                    if start > end {
                        return Err(RegexError::InvalidProgram(format!(
                            "inverted range {start:?}-{end:?}"
                        )));
                    }
                    ranges.push(CharRange::new(start, end));
                }
                Instruction::CharSet(CharSet::new(ranges))
            }
            OpCode::Jump => Instruction::Jump(read_count(&mut reader, "jump target")?),
            OpCode::Split => {
                let x = read_count(&mut reader, "split target")?;
                let y = read_count(&mut reader, "split target")?;
                Instruction::Split(x, y)
            }
            OpCode::Save => Instruction::Save(read_count(&mut reader, "register")?),
            OpCode::Match => Instruction::MatchFound(reader.read_i32::<BigEndian>()?),
            OpCode::Predicate => {
                let byte = reader.read_u8()?;
                let predicate =
                    Predicate::from_byte(byte).ok_or(RegexError::UnknownPredicate(byte))?;
                Instruction::Predicate(predicate)
            }
            OpCode::NamedClass => {
                let len = reader.read_u16::<BigEndian>()?;
                let mut name = vec![0; len as usize];
                reader.read_exact(&mut name)?;
                let name = String::from_utf8(name).map_err(|_| {
                    RegexError::InvalidProgram("class name is not valid UTF-8".into())
                })?;
                Instruction::NamedClass(name)
            }
        };
        instructions.push(instruction);
    }

    CompiledRegex::from_parts(register_count, instructions)
}

fn write_count<W: Write>(writer: &mut W, value: usize) -> Result<()> {
    let value = i32::try_from(value).map_err(|_| {
        RegexError::InvalidProgram(format!("{value} does not fit in 32 bits"))
    })?;
    writer.write_i32::<BigEndian>(value)?;
    Ok(())
}

fn write_char<W: Write>(writer: &mut W, c: char) -> Result<()> {
    let unit = u16::try_from(u32::from(c)).map_err(|_| RegexError::UnrepresentableChar(c))?;
    writer.write_u16::<BigEndian>(unit)?;
    Ok(())
}

fn read_count<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let value = reader.read_i32::<BigEndian>()?;
    usize::try_from(value)
        .map_err(|_| RegexError::InvalidProgram(format!("negative {what} {value}")))
}

fn read_char<R: Read>(reader: &mut R) -> Result<char> {
    let unit = reader.read_u16::<BigEndian>()?;
    char::from_u32(u32::from(unit)).ok_or(RegexError::InvalidChar(u32::from(unit)))
}
