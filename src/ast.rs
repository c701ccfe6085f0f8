//! Abstract syntax tree produced by the parser and consumed by the compiler

use std::fmt;

/// Inclusive range of characters. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharRange {
    pub start: char,
    pub end: char,
}

impl CharRange {
    /// Creates the range `[start, end]`
    pub fn new(start: char, end: char) -> Self {
        debug_assert!(start <= end, "inverted range {start:?}-{end:?}");
        CharRange { start, end }
    }

    /// Creates a range holding a single character
    pub fn single(c: char) -> Self {
        CharRange { start: c, end: c }
    }

    pub fn contains(&self, c: char) -> bool {
        self.start <= c && c <= self.end
    }

    /// Number of scalar values between `start` and `end`, surrogates included
    pub(crate) fn width(&self) -> u32 {
        self.end as u32 - self.start as u32 + 1
    }

    /// Iterates over every character of the range
    pub fn chars(&self) -> impl Iterator<Item = char> {
        self.start..=self.end
    }
}

impl fmt::Display for CharRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{:?}", self.start)
        } else {
            write!(f, "{:?}-{:?}", self.start, self.end)
        }
    }
}

/// Set of characters stored as sorted, pairwise disjoint and non-adjacent
/// ranges. Overlapping or touching ranges are merged on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CharSet {
    ranges: Vec<CharRange>,
}

impl CharSet {
    pub fn new<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = CharRange>,
    {
        let mut ranges: Vec<CharRange> = ranges.into_iter().collect();
        ranges.sort_unstable();

        let mut merged: Vec<CharRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.start as u32 <= last.end as u32 + 1 => {
                    if range.end > last.end {
                        last.end = range.end;
                    }
                }
                _ => merged.push(range),
            }
        }

        CharSet { ranges: merged }
    }

    /// Builds a set out of individual characters
    pub fn from_chars<I>(chars: I) -> Self
    where
        I: IntoIterator<Item = char>,
    {
        CharSet::new(chars.into_iter().map(CharRange::single))
    }

    pub fn ranges(&self) -> &[CharRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Binary search over the ranges
    pub fn contains(&self, c: char) -> bool {
        self.ranges
            .binary_search_by(|range| {
                if range.end < c {
                    std::cmp::Ordering::Less
                } else if range.start > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn union(&self, other: &CharSet) -> CharSet {
        CharSet::new(self.ranges.iter().chain(other.ranges.iter()).copied())
    }

    /// Returns the only character of the set, if it holds exactly one
    pub fn as_single(&self) -> Option<char> {
        match self.ranges.as_slice() {
            [range] if range.start == range.end => Some(range.start),
            _ => None,
        }
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{range}")?;
        }
        write!(f, "]")
    }
}

/// A node of the regular expression syntax tree.
///
/// Trees are built bottom-up by the parser and never mutated afterwards;
/// rewriting passes (flag expansion, word boundaries) build new trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Matches the empty string
    Empty,
    /// A literal character
    Char(char),
    /// Any character
    Dot,
    /// Any character of the set
    CharSet(CharSet),
    /// `left` followed by `right`
    Concat(Box<Node>, Box<Node>),
    /// `left` or, with lower priority, `right`
    Alternative(Box<Node>, Box<Node>),
    /// `child` repeated at least `min` times and at most `max` times;
    /// `max == None` means unbounded
    Repeated {
        child: Box<Node>,
        min: u32,
        max: Option<u32>,
    },
    /// Capturing group number `group` (0-based, in order of the opening
    /// parentheses)
    Capture { group: u32, child: Box<Node> },
    /// A built-in class such as `\p{Punct}`, resolved by the compiler
    NamedClass(String),
    /// Zero-width word boundary assertion
    WordBoundary,
}

impl Node {
    pub fn concat(left: Node, right: Node) -> Node {
        Node::Concat(Box::new(left), Box::new(right))
    }

    pub fn alternative(left: Node, right: Node) -> Node {
        Node::Alternative(Box::new(left), Box::new(right))
    }

    pub fn repeated(child: Node, min: u32, max: Option<u32>) -> Node {
        debug_assert!(max.map_or(true, |max| max >= min));
        Node::Repeated {
            child: Box::new(child),
            min,
            max,
        }
    }

    pub fn capture(group: u32, child: Node) -> Node {
        Node::Capture {
            group,
            child: Box::new(child),
        }
    }

    /// Builds the alternation of `branches`, the first branch having the
    /// highest priority. The tree is kept balanced so that long word lists
    /// don't produce deep trees. Returns `None` when there are no branches.
    pub fn alternation(mut branches: Vec<Node>) -> Option<Node> {
        match branches.len() {
            0 => None,
            1 => branches.pop(),
            n => {
                let right = branches.split_off(n / 2);
                let left = Node::alternation(branches)?;
                let right = Node::alternation(right)?;
                Some(Node::alternative(left, right))
            }
        }
    }

    /// Folds a sequence of nodes into a balanced tree of `Concat` nodes, or
    /// `Empty` if the sequence is empty.
    pub fn sequence(mut nodes: Vec<Node>) -> Node {
        match nodes.len() {
            0 => Node::Empty,
            1 => nodes.pop().unwrap_or(Node::Empty),
            n => {
                let right = nodes.split_off(n / 2);
                Node::concat(Node::sequence(nodes), Node::sequence(right))
            }
        }
    }

    /// Height added on top of `n` nodes by [`Node::alternation`] and
    /// [`Node::sequence`]
    pub fn balanced_height(n: usize) -> u32 {
        match n {
            0 | 1 => 0,
            n => usize::BITS - (n - 1).leading_zeros(),
        }
    }

    /// Number of the highest capture group in the tree plus one
    pub fn group_count(&self) -> u32 {
        match self {
            Node::Capture { group, child } => (group + 1).max(child.group_count()),
            Node::Concat(left, right) | Node::Alternative(left, right) => {
                left.group_count().max(right.group_count())
            }
            Node::Repeated { child, .. } => child.group_count(),
            _ => 0,
        }
    }

    /// True if the node can match the empty string
    pub fn is_nullable(&self) -> bool {
        match self {
            Node::Empty | Node::WordBoundary => true,
            Node::Char(_) | Node::Dot | Node::CharSet(_) | Node::NamedClass(_) => false,
            Node::Concat(left, right) => left.is_nullable() && right.is_nullable(),
            Node::Alternative(left, right) => left.is_nullable() || right.is_nullable(),
            Node::Repeated { child, min, .. } => *min == 0 || child.is_nullable(),
            Node::Capture { child, .. } => child.is_nullable(),
        }
    }
}
