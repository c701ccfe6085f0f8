//! Syntax tree to bytecode compiler
//!
//! Compilation runs in three steps: the pattern is parsed into a [`Node`]
//! tree, the tree is rewritten according to the [`Flags`] (case and
//! diacritic variants, automatic word boundaries), and code is generated by
//! a recursive walk over the rewritten tree. Every program ends with a single
//! `MATCH` instruction.

use log::{debug, log_enabled, trace, Level};

use crate::{
    ast::{CharSet, Node},
    classes,
    error::{RegexError, Result},
    flags::Flags,
    opcodes::{self, Instruction, Predicate},
    parser::{Parser, WordListResolver},
    variants::{self, VariantTable},
    CompiledRegex,
};

/// Id of the `MATCH` instruction of anonymous programs
pub const ANONYMOUS: i32 = -1;

/// Ranges wider than this are assumed to hold a letter or a digit
const MAX_SCANNED_RANGE: u32 = 1024;

/// Regex compiler configuration
///
/// ```
/// use talisman_regex::{Compiler, Flags};
///
/// let regex = Compiler::new()
///     .flags(Flags::CASE_INSENSITIVE)
///     .id(3)
///     .compile("ab+c")
///     .unwrap();
/// let found = regex.find_first_in("xABBC").unwrap();
/// assert_eq!((found.start(), found.end(), found.id()), (1, 5, 3));
/// ```
#[derive(Clone, Copy)]
pub struct Compiler<'a> {
    flags: Flags,
    word_lists: Option<&'a dyn WordListResolver>,
    variants: &'a VariantTable,
    id: i32,
}

impl Default for Compiler<'_> {
    fn default() -> Self {
        Compiler {
            flags: Flags::default(),
            word_lists: None,
            variants: VariantTable::latin(),
            id: ANONYMOUS,
        }
    }
}

impl<'a> Compiler<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the resolver for `\p{WordList(Name)}` references
    pub fn word_lists(mut self, resolver: &'a dyn WordListResolver) -> Self {
        self.word_lists = Some(resolver);
        self
    }

    /// Sets the base letter table used for diacritic insensitivity and the
    /// word list options. Defaults to [`VariantTable::latin`].
    pub fn variants(mut self, table: &'a VariantTable) -> Self {
        self.variants = table;
        self
    }

    /// Sets the id reported by [`Match::id`](crate::Match::id)
    pub fn id(mut self, id: i32) -> Self {
        self.id = id;
        self
    }

    /// Compiles `pattern`
    pub fn compile(&self, pattern: &str) -> Result<CompiledRegex> {
        let mut parser = Parser::new(pattern).variants(self.variants);
        if let Some(resolver) = self.word_lists {
            parser = parser.word_lists(resolver);
        }
        let mut node = parser.parse()?;

        node = variants::expand(node, self.flags, self.variants);
        if self.flags.auto_word_boundaries() {
            node = add_word_boundaries(node);
        }

        let mut generator = CodeGenerator::default();
        generator.emit(&node)?;
        generator.code.push(Instruction::MatchFound(self.id));

        let register_count = opcodes::required_registers(&generator.code);
        let regex = CompiledRegex::from_compiled(register_count, generator.code);
        debug!(
            "compiled {pattern:?} with {:?}: {} instructions, {} registers",
            self.flags,
            regex.instructions().len(),
            regex.register_count()
        );
        if log_enabled!(Level::Trace) {
            trace!("program for {pattern:?}:\n{regex}");
        }
        Ok(regex)
    }
}

/// Compiles `pattern` with `flags`, resolving word lists with `word_lists`
pub fn compile(
    pattern: &str,
    flags: Flags,
    word_lists: &dyn WordListResolver,
) -> Result<CompiledRegex> {
    Compiler::new()
        .flags(flags)
        .word_lists(word_lists)
        .compile(pattern)
}

#[derive(Default)]
struct CodeGenerator {
    code: Vec<Instruction>,
}

impl CodeGenerator {
    /// Index of the next instruction
    fn pc(&self) -> usize {
        self.code.len()
    }

    /// Emits an instruction to be patched once its targets are known
    fn placeholder(&mut self) -> usize {
        self.code.push(Instruction::Jump(0));
        self.code.len() - 1
    }

    fn emit(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Empty => {}
            Node::Char(c) => self.code.push(Instruction::SomeChar(*c)),
            Node::Dot => self.code.push(Instruction::AnyChar),
            Node::CharSet(set) => self.emit_set(set.clone()),
            Node::NamedClass(name) => {
                let set = classes::named(name)
                    .ok_or_else(|| RegexError::UnknownNamedClass(name.clone()))?;
                self.emit_set(set);
            }
            Node::WordBoundary => self
                .code
                .push(Instruction::Predicate(Predicate::WordBoundary)),
            Node::Concat(left, right) => {
                self.emit(left)?;
                self.emit(right)?;
            }
            Node::Alternative(left, right) => {
                // SPLIT L, R; L: left; JUMP END; R: right; END:
                let split = self.placeholder();
                self.emit(left)?;
                let jump = self.placeholder();
                let right_start = self.pc();
                self.emit(right)?;
                self.code[split] = Instruction::Split(split + 1, right_start);
                self.code[jump] = Instruction::Jump(self.pc());
            }
            Node::Capture { group, child } => {
                let register = 2 * *group as usize;
                self.code.push(Instruction::Save(register));
                self.emit(child)?;
                self.code.push(Instruction::Save(register + 1));
            }
            Node::Repeated { child, min, max } => self.emit_repeated(child, *min, *max)?,
        }
        Ok(())
    }

    fn emit_set(&mut self, set: CharSet) {
        match set.as_single() {
            Some(c) => self.code.push(Instruction::SomeChar(c)),
            None => self.code.push(Instruction::CharSet(set)),
        }
    }

    fn emit_repeated(&mut self, child: &Node, min: u32, max: Option<u32>) -> Result<()> {
        match (min, max) {
            (0, Some(1)) => self.emit_optional(child),
            (0, None) => self.emit_star(child),
            (1, None) => self.emit_plus(child),
            (min, None) => {
                for _ in 0..min {
                    self.emit(child)?;
                }
                self.emit_star(child)
            }
            (min, Some(max)) => {
                if max < min {
                    return Err(RegexError::InvalidRepetition { min, max });
                }
                for _ in 0..min {
                    self.emit(child)?;
                }
                // Each optional copy is only tried if the previous one
                // matched: SPLIT A1, END; A1: child; SPLIT A2, END; ...
                let mut splits = Vec::with_capacity((max - min) as usize);
                for _ in min..max {
                    splits.push(self.placeholder());
                    self.emit(child)?;
                }
                let end = self.pc();
                for split in splits {
                    self.code[split] = Instruction::Split(split + 1, end);
                }
                Ok(())
            }
        }
    }

    /// SPLIT A, END; A: child; END:
    fn emit_optional(&mut self, child: &Node) -> Result<()> {
        let split = self.placeholder();
        self.emit(child)?;
        self.code[split] = Instruction::Split(split + 1, self.pc());
        Ok(())
    }

    /// L: SPLIT A, END; A: child; JUMP L; END:
    fn emit_star(&mut self, child: &Node) -> Result<()> {
        let split = self.placeholder();
        self.emit(child)?;
        self.code.push(Instruction::Jump(split));
        self.code[split] = Instruction::Split(split + 1, self.pc());
        Ok(())
    }

    /// L: child; SPLIT L, END; END:
    fn emit_plus(&mut self, child: &Node) -> Result<()> {
        let start = self.pc();
        self.emit(child)?;
        let end = self.pc() + 1;
        self.code.push(Instruction::Split(start, end));
        Ok(())
    }
}

/// Adds a word boundary before each top-level alternative that starts with
/// something able to match a letter or a digit, and after each one that ends
/// with such a thing, unless the alternative already has a boundary there.
/// The wildcard `.` does not count as a letter.
fn add_word_boundaries(node: Node) -> Node {
    match node {
        Node::Alternative(left, right) => {
            Node::alternative(add_word_boundaries(*left), add_word_boundaries(*right))
        }
        Node::Capture { group, child } => Node::capture(group, add_word_boundaries(*child)),
        branch => {
            let leading = starts_with_letter(&branch) && !starts_with_boundary(&branch);
            let trailing = ends_with_letter(&branch) && !ends_with_boundary(&branch);
            let mut branch = branch;
            if leading {
                branch = Node::concat(Node::WordBoundary, branch);
            }
            if trailing {
                branch = Node::concat(branch, Node::WordBoundary);
            }
            branch
        }
    }
}

fn set_has_letter(set: &CharSet) -> bool {
    set.ranges().iter().any(|range| {
        range.width() > MAX_SCANNED_RANGE || range.chars().any(char::is_alphanumeric)
    })
}

/// True if the first character consumed by `node` can be a letter or a digit
fn starts_with_letter(node: &Node) -> bool {
    match node {
        Node::Empty | Node::Dot | Node::WordBoundary => false,
        Node::Char(c) => c.is_alphanumeric(),
        Node::CharSet(set) => set_has_letter(set),
        Node::NamedClass(name) => classes::named(name).is_some_and(|set| set_has_letter(&set)),
        Node::Concat(left, right) => {
            starts_with_letter(left) || (left.is_nullable() && starts_with_letter(right))
        }
        Node::Alternative(left, right) => starts_with_letter(left) || starts_with_letter(right),
        Node::Repeated { child, max, .. } => *max != Some(0) && starts_with_letter(child),
        Node::Capture { child, .. } => starts_with_letter(child),
    }
}

/// True if the last character consumed by `node` can be a letter or a digit
fn ends_with_letter(node: &Node) -> bool {
    match node {
        Node::Concat(left, right) => {
            ends_with_letter(right) || (right.is_nullable() && ends_with_letter(left))
        }
        Node::Alternative(left, right) => ends_with_letter(left) || ends_with_letter(right),
        Node::Repeated { child, max, .. } => *max != Some(0) && ends_with_letter(child),
        Node::Capture { child, .. } => ends_with_letter(child),
        single => starts_with_letter(single),
    }
}

fn starts_with_boundary(node: &Node) -> bool {
    match node {
        Node::WordBoundary => true,
        Node::Concat(left, _) => starts_with_boundary(left),
        Node::Capture { child, .. } => starts_with_boundary(child),
        _ => false,
    }
}

fn ends_with_boundary(node: &Node) -> bool {
    match node {
        Node::WordBoundary => true,
        Node::Concat(_, right) => ends_with_boundary(right),
        Node::Capture { child, .. } => ends_with_boundary(child),
        _ => false,
    }
}
