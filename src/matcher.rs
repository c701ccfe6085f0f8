//! Regex matching virtual machine
//!
//! A Pike VM: every thread of the program advances in lockstep over the
//! input, one character at a time, so matching never backtracks and runs in
//! `O(input × program)` time. Threads are kept in priority order, which gives
//! leftmost-first semantics: the first thread to reach a `MATCH` under that
//! order wins, and the threads below it are cut.

use std::iter::FusedIterator;

use log::trace;

use crate::{ast::CharSet, classes, opcodes::Instruction, CompiledRegex, Match};

/// Set of program counters with O(1) insertion, lookup and clearing
#[derive(Clone, Debug)]
struct SparseSet {
    /// Number of elements currently in the set
    len: usize,
    /// Elements in insertion order
    dense: Vec<usize>,
    /// Maps an element to its position in `dense`
    sparse: Vec<usize>,
}

impl SparseSet {
    fn new(capacity: usize) -> Self {
        SparseSet {
            len: 0,
            dense: vec![0; capacity],
            sparse: vec![0; capacity],
        }
    }

    fn contains(&self, id: usize) -> bool {
        let index = self.sparse[id];
        index < self.len && self.dense[index] == id
    }

    /// Returns true if `id` was not already present
    fn insert(&mut self, id: usize) -> bool {
        if self.contains(id) {
            return false;
        }
        self.dense[self.len] = id;
        self.sparse[id] = self.len;
        self.len += 1;
        true
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}

/// One execution path through the program
#[derive(Debug, Clone)]
struct Thread {
    pc: usize,
    /// Position the thread started matching at
    start: usize,
    /// Capture registers
    saved: Vec<Option<usize>>,
}

/// Execution state for a single search
struct Vm<'r, 't> {
    program: &'r [Instruction],
    text: &'t str,
    register_count: usize,
    /// Sets of the `NAMED_CLASS` instructions, indexed by program counter
    named_classes: Vec<Option<CharSet>>,
    /// Program counters already reached at the current position
    visited: SparseSet,
    /// Work stack for the epsilon closure
    stack: Vec<Thread>,
}

impl<'r, 't> Vm<'r, 't> {
    fn new(regex: &'r CompiledRegex, text: &'t str) -> Self {
        let program = regex.instructions();
        let named_classes = program
            .iter()
            .map(|instruction| match instruction {
                Instruction::NamedClass(name) => classes::named(name),
                _ => None,
            })
            .collect();
        Vm {
            program,
            text,
            register_count: regex.register_count(),
            named_classes,
            visited: SparseSet::new(program.len()),
            stack: Vec::new(),
        }
    }

    /// Follows every instruction reachable from `thread` without consuming
    /// input, in priority order. Threads waiting on a character or on a
    /// `MATCH` are appended to `list`; a program counter already reached at
    /// this position is never added twice, which also ends empty loops.
    fn add_thread(&mut self, list: &mut Vec<Thread>, thread: Thread, pos: usize) {
        let program = self.program;
        self.stack.push(thread);
        while let Some(Thread {
            pc,
            start,
            mut saved,
        }) = self.stack.pop()
        {
            if !self.visited.insert(pc) {
                continue;
            }
            match &program[pc] {
                Instruction::Jump(target) => self.stack.push(Thread {
                    pc: *target,
                    start,
                    saved,
                }),
                Instruction::Split(x, y) => {
                    self.stack.push(Thread {
                        pc: *y,
                        start,
                        saved: saved.clone(),
                    });
                    self.stack.push(Thread {
                        pc: *x,
                        start,
                        saved,
                    });
                }
                Instruction::Save(register) => {
                    saved[*register] = Some(pos);
                    self.stack.push(Thread {
                        pc: pc + 1,
                        start,
                        saved,
                    });
                }
                Instruction::Predicate(predicate) => {
                    if predicate.evaluate(self.text, pos) {
                        self.stack.push(Thread {
                            pc: pc + 1,
                            start,
                            saved,
                        });
                    }
                }
                Instruction::SomeChar(_)
                | Instruction::AnyChar
                | Instruction::CharSet(_)
                | Instruction::NamedClass(_)
                | Instruction::MatchFound(_) => list.push(Thread { pc, start, saved }),
            }
        }
    }

    /// True if the thread waiting at `pc` accepts `c`
    fn accepts(&self, pc: usize, c: char) -> bool {
        match &self.program[pc] {
            Instruction::SomeChar(expected) => *expected == c,
            Instruction::AnyChar => true,
            Instruction::CharSet(set) => set.contains(c),
            Instruction::NamedClass(_) => self.named_classes[pc]
                .as_ref()
                .is_some_and(|set| set.contains(c)),
            _ => false,
        }
    }

    /// Searches for the leftmost-first match starting at or after `start`
    fn run(&mut self, start: usize) -> Option<Match> {
        let mut pending: Vec<Thread> = Vec::new();
        let mut runnable: Vec<Thread> = Vec::new();
        let mut found: Option<(Thread, usize, i32)> = None;
        let mut pos = start;

        loop {
            // A new attempt starts at every position until something matched
            if found.is_none() {
                pending.push(Thread {
                    pc: 0,
                    start: pos,
                    saved: vec![None; self.register_count],
                });
            }
            if pending.is_empty() {
                break;
            }

            self.visited.clear();
            for thread in std::mem::take(&mut pending) {
                self.add_thread(&mut runnable, thread, pos);
            }

            let current = self.text[pos..].chars().next();
            for thread in runnable.drain(..) {
                if let Instruction::MatchFound(id) = self.program[thread.pc] {
                    found = Some((thread, pos, id));
                    break;
                }
                if let Some(c) = current {
                    if self.accepts(thread.pc, c) {
                        pending.push(Thread {
                            pc: thread.pc + 1,
                            ..thread
                        });
                    }
                }
            }

            match current {
                Some(c) => pos += c.len_utf8(),
                None => break,
            }
        }

        let (thread, end, id) = found?;
        let groups = thread
            .saved
            .chunks(2)
            .map(|pair| match pair {
                [Some(start), Some(end)] if start <= end => Some((*start, *end)),
                _ => None,
            })
            .collect();
        trace!("match {}..{} (id {id})", thread.start, end);
        Some(Match::new(thread.start, end, groups, id))
    }
}

/// Finds the first match in `text` starting at byte offset `start` or later.
/// An offset inside a character is moved to the next character boundary.
pub(crate) fn find_at(regex: &CompiledRegex, text: &str, start: usize) -> Option<Match> {
    let start = (start..=text.len()).find(|&i| text.is_char_boundary(i))?;
    Vm::new(regex, text).run(start)
}

/// Iterator over the successive, non-overlapping matches of a regex
#[derive(Debug, Clone)]
pub struct Matcher<'r, 't> {
    regex: &'r CompiledRegex,
    text: &'t str,
    /// Where the next search starts, `None` once the input is exhausted
    next_start: Option<usize>,
}

impl<'r, 't> Matcher<'r, 't> {
    pub(crate) fn new(regex: &'r CompiledRegex, text: &'t str) -> Self {
        Matcher {
            regex,
            text,
            next_start: Some(0),
        }
    }

    /// The text being searched
    pub fn text(&self) -> &'t str {
        self.text
    }

    /// Restarts the search from the beginning of the text
    pub fn reset(&mut self) {
        self.next_start = Some(0);
    }
}

impl Iterator for Matcher<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        let start = self.next_start?;
        let Some(found) = find_at(self.regex, self.text, start) else {
            self.next_start = None;
            return None;
        };
        self.next_start = if found.end() > found.start() {
            Some(found.end())
        } else {
            // Step over one character after an empty match
            self.text[found.end()..]
                .chars()
                .next()
                .map(|c| found.end() + c.len_utf8())
        };
        Some(found)
    }
}

impl FusedIterator for Matcher<'_, '_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::Predicate;
    use pretty_assertions::assert_eq;

    fn program(register_count: usize, instructions: Vec<Instruction>) -> CompiledRegex {
        CompiledRegex::from_parts(register_count, instructions).unwrap()
    }

    #[test]
    fn test_sparse_set() {
        let mut set = SparseSet::new(4);
        assert!(set.insert(3));
        assert!(set.insert(0));
        assert!(!set.insert(3));
        assert!(set.contains(0));
        assert!(!set.contains(1));
        set.clear();
        assert!(!set.contains(3));
        assert!(set.insert(3));
    }

    #[test]
    fn test_split_priority() {
        // (a)|(ab) on "ab": the first branch wins
        let regex = program(
            4,
            vec![
                Instruction::Split(1, 5),
                Instruction::Save(0),
                Instruction::SomeChar('a'),
                Instruction::Save(1),
                Instruction::Jump(10),
                Instruction::Save(2),
                Instruction::SomeChar('a'),
                Instruction::SomeChar('b'),
                Instruction::Save(3),
                Instruction::Jump(10),
                Instruction::MatchFound(-1),
            ],
        );
        let found = find_at(&regex, "ab", 0).unwrap();
        assert_eq!((found.start(), found.end()), (0, 1));
        assert_eq!(found.group(1), Some((0, 1)));
        assert_eq!(found.group(2), None);
    }

    #[test]
    fn test_empty_loop_terminates() {
        // JUMP 0 loops back to the SPLIT without consuming input
        let regex = program(
            0,
            vec![
                Instruction::Split(1, 2),
                Instruction::Jump(0),
                Instruction::MatchFound(7),
            ],
        );
        let found = find_at(&regex, "xyz", 0).unwrap();
        assert_eq!((found.start(), found.end(), found.id()), (0, 0, 7));
    }

    #[test]
    fn test_named_class_instruction() {
        let regex = program(
            0,
            vec![
                Instruction::NamedClass("Punct".into()),
                Instruction::Predicate(Predicate::WordBoundary),
                Instruction::MatchFound(-1),
            ],
        );
        assert_eq!(find_at(&regex, "ab,c", 0).map(|m| m.range()), Some(2..3));
        assert_eq!(find_at(&regex, "a,,", 0), None);
    }

    #[test]
    fn test_start_inside_character() {
        let regex = program(0, vec![Instruction::AnyChar, Instruction::MatchFound(-1)]);
        let found = find_at(&regex, "éa", 1).unwrap();
        assert_eq!(found.range(), 2..3);
        assert_eq!(find_at(&regex, "éa", 9), None);
    }

    #[test]
    fn test_matcher_steps_over_empty_matches() {
        // a*
        let regex = program(
            0,
            vec![
                Instruction::Split(1, 3),
                Instruction::SomeChar('a'),
                Instruction::Jump(0),
                Instruction::MatchFound(-1),
            ],
        );
        let ranges: Vec<_> = Matcher::new(&regex, "baaé")
            .map(|m| m.range())
            .collect();
        assert_eq!(ranges, vec![0..0, 1..3, 3..3, 5..5]);

        let mut matcher = Matcher::new(&regex, "a");
        assert_eq!(matcher.by_ref().count(), 2);
        assert_eq!(matcher.next(), None);
        matcher.reset();
        assert_eq!(matcher.next().map(|m| m.range()), Some(0..1));
    }
}
