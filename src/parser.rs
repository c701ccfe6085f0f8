//! Shift-reduce pattern parser
//!
//! Tokens coming out of the [`Lexer`] are pushed on a stack of tokens and
//! already-built nodes. Closing tokens (`)`, `]`, `}`, `|`) and quantifiers
//! trigger a reduction that replaces the top of the stack by a single node.
//! Word lists referenced with `\p{WordList(Name)}` are resolved and expanded
//! here, so the resulting tree only holds literal characters for them.

use std::collections::HashMap;

use log::trace;

use crate::{
    ast::{CharRange, CharSet, Node},
    classes,
    error::{RegexError, Result},
    lexer::{Lexer, Mode, Token, TokenKind},
    variants::{self, VariantTable},
};

/// Source of the word lists referenced by `\p{WordList(Name)}`
pub trait WordListResolver {
    /// Returns the words of the list called `name`, in priority order
    fn lookup(&self, name: &str) -> Option<&[String]>;
}

impl WordListResolver for HashMap<String, Vec<String>> {
    fn lookup(&self, name: &str) -> Option<&[String]> {
        self.get(name).map(Vec::as_slice)
    }
}

/// A named, ordered list of words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordList {
    name: String,
    words: Vec<String>,
}

impl WordList {
    pub fn new<I, S>(name: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WordList {
            name: name.into(),
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }
}

/// Registry of word lists indexed by name
#[derive(Debug, Clone, Default)]
pub struct WordLists {
    lists: HashMap<String, WordList>,
}

impl WordLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `list`, replacing any list with the same name
    pub fn add(&mut self, list: WordList) -> &mut Self {
        self.lists.insert(list.name.clone(), list);
        self
    }

    pub fn get(&self, name: &str) -> Option<&WordList> {
        self.lists.get(name)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

impl WordListResolver for WordLists {
    fn lookup(&self, name: &str) -> Option<&[String]> {
        self.lists.get(name).map(WordList::words)
    }
}

/// Options accepted after the list name in `\p{WordList(Name,...)}`
#[derive(Debug, Clone, Copy, Default)]
struct WordListOptions {
    diacritics_optional: bool,
    uppercase_optional: bool,
    lowercase_optional: bool,
}

impl WordListOptions {
    fn set(&mut self, option: &str) -> bool {
        match option {
            "diacriticsOptional" => self.diacritics_optional = true,
            "uppercaseOptional" => self.uppercase_optional = true,
            "lowercaseOptional" => self.lowercase_optional = true,
            _ => return false,
        }
        true
    }
}

/// Deepest tree the parser builds. The compiler passes walk trees
/// recursively, and the parser keeps long concatenations and alternations
/// balanced, so only nesting in the pattern itself gets close to this.
pub const MAX_DEPTH: u32 = 500;

/// Stack entries. Nodes carry the height of their tree.
#[derive(Debug)]
enum Item {
    Token(Token),
    Node(Node, u32),
}

pub struct Parser<'a> {
    lexer: Lexer,
    stack: Vec<Item>,
    /// Numbers of the groups whose `(` has not been closed yet
    open_groups: Vec<u32>,
    /// Number given to the next capture group
    next_group: u32,
    word_lists: Option<&'a dyn WordListResolver>,
    variants: &'a VariantTable,
}

impl<'a> Parser<'a> {
    pub fn new(pattern: &str) -> Self {
        Parser {
            lexer: Lexer::new(pattern),
            stack: Vec::new(),
            open_groups: Vec::new(),
            next_group: 0,
            word_lists: None,
            variants: VariantTable::latin(),
        }
    }

    /// Sets the resolver consulted for `\p{WordList(Name)}`
    pub fn word_lists(mut self, resolver: &'a dyn WordListResolver) -> Self {
        self.word_lists = Some(resolver);
        self
    }

    /// Sets the table used by the word list options
    pub fn variants(mut self, table: &'a VariantTable) -> Self {
        self.variants = table;
        self
    }

    /// Parses the whole pattern
    pub fn parse(mut self) -> Result<Node> {
        loop {
            let token = self.lexer.next_token()?;
            match token.kind {
                TokenKind::Eoi => break,
                TokenKind::Char(c) => self.push_leaf(Node::Char(c)),
                TokenKind::Dot => self.push_leaf(Node::Dot),
                TokenKind::Digit => self.push_leaf(Node::CharSet(classes::digit())),
                TokenKind::WordChar => self.push_leaf(Node::CharSet(classes::word())),
                TokenKind::Whitespace => self.push_leaf(Node::CharSet(classes::whitespace())),
                TokenKind::WordBoundary => self.push_leaf(Node::WordBoundary),
                TokenKind::Opt => self.reduce_one(token, 0, Some(1))?,
                TokenKind::Star => self.reduce_one(token, 0, None)?,
                TokenKind::Plus => self.reduce_one(token, 1, None)?,
                TokenKind::Pipe => {
                    self.reduce_concat(Some(token.offset))?;
                    self.stack.push(Item::Token(token));
                }
                TokenKind::LParen => {
                    // Parentheses inside \p{...} delimit word list arguments
                    if self.lexer.mode() != Mode::ClassName {
                        self.open_groups.push(self.next_group);
                        self.next_group += 1;
                    }
                    self.stack.push(Item::Token(token));
                }
                TokenKind::RParen => {
                    if self.lexer.mode() == Mode::ClassName {
                        self.stack.push(Item::Token(token));
                    } else {
                        self.reduce_capture(token)?;
                    }
                }
                TokenKind::RBracket => self.reduce_charset(token)?,
                TokenKind::RBrace => self.reduce_rep_or_class(token)?,
                TokenKind::Int(_)
                | TokenKind::Name(_)
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::Comma
                | TokenKind::Dash
                | TokenKind::NamedClass => self.stack.push(Item::Token(token)),
            }
        }

        self.reduce_alternative(None)?;

        match (self.stack.pop(), self.stack.pop()) {
            (Some(Item::Node(node, depth)), None) => {
                trace!(
                    "parsed tree of depth {depth} with {} groups",
                    node.group_count()
                );
                Ok(node)
            }
            (None, _) => Ok(Node::Empty),
            (top, below) => {
                let token = self
                    .stack
                    .iter()
                    .chain(below.iter())
                    .chain(top.iter())
                    .find_map(|item| match item {
                        Item::Token(token) => Some(token),
                        Item::Node(..) => None,
                    });
                Err(RegexError::parser(
                    token.map(|token| token.offset),
                    match token {
                        Some(token) => format!("Unclosed {}", token.kind),
                        None => "malformed regular expression".to_string(),
                    },
                ))
            }
        }
    }

    fn push_leaf(&mut self, node: Node) {
        self.stack.push(Item::Node(node, 1));
    }

    /// Pushes a node of height `depth`, built while reducing at `offset`
    fn push_node(&mut self, node: Node, depth: u32, offset: Option<usize>) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(RegexError::parser(
                offset,
                format!("Expression nested deeper than {MAX_DEPTH} levels"),
            ));
        }
        self.stack.push(Item::Node(node, depth));
        Ok(())
    }

    fn pop_node(&mut self) -> Option<(Node, u32)> {
        match self.stack.pop() {
            Some(Item::Node(node, depth)) => Some((node, depth)),
            Some(item) => {
                self.stack.push(item);
                None
            }
            None => None,
        }
    }

    /// Applies `?`, `*` or `+` to the operand on top of the stack
    fn reduce_one(&mut self, token: Token, min: u32, max: Option<u32>) -> Result<()> {
        let (child, depth) = self.pop_node().ok_or_else(|| unexpected(&token))?;
        self.push_node(Node::repeated(child, min, max), depth + 1, Some(token.offset))
    }

    /// Folds the operands above the topmost token into a balanced
    /// concatenation, `Empty` if there are none.
    fn reduce_concat(&mut self, offset: Option<usize>) -> Result<()> {
        let mut nodes = Vec::new();
        let mut depth = 1;
        while let Some((node, height)) = self.pop_node() {
            nodes.push(node);
            depth = depth.max(height);
        }
        nodes.reverse();
        let depth = depth + Node::balanced_height(nodes.len());
        self.push_node(Node::sequence(nodes), depth, offset)
    }

    /// Closes the alternative above the last `(`, or the whole pattern. The
    /// branches, separated by `|` tokens, are folded into a balanced
    /// alternation that keeps their priority order.
    fn reduce_alternative(&mut self, offset: Option<usize>) -> Result<()> {
        self.reduce_concat(offset)?;
        let mut branches = Vec::new();
        let mut depth = 1;
        while let Some((branch, height)) = self.pop_node() {
            branches.push(branch);
            depth = depth.max(height);
            match self.stack.last() {
                Some(Item::Token(token)) if token.kind == TokenKind::Pipe => {
                    self.stack.pop();
                }
                _ => break,
            }
        }
        branches.reverse();
        let depth = depth + Node::balanced_height(branches.len());
        let node = Node::alternation(branches).unwrap_or(Node::Empty);
        self.push_node(node, depth, offset)
    }

    /// Handles `)`: the body of the group is reduced like an alternative,
    /// then wrapped in a capture numbered after its opening parenthesis.
    fn reduce_capture(&mut self, rparen: Token) -> Result<()> {
        self.reduce_alternative(Some(rparen.offset))?;
        let (body, depth) = self.pop_node().ok_or_else(|| unexpected(&rparen))?;
        match self.stack.pop() {
            Some(Item::Token(Token {
                kind: TokenKind::LParen,
                ..
            })) => {}
            _ => return Err(unexpected(&rparen)),
        }
        let group = self
            .open_groups
            .pop()
            .ok_or_else(|| unexpected(&rparen))?;
        self.push_node(Node::capture(group, body), depth + 1, Some(rparen.offset))
    }

    /// Handles `]`: collects characters, ranges and shorthand classes down to
    /// the matching `[`. A `-` that is not between two characters is literal.
    fn reduce_charset(&mut self, rbracket: Token) -> Result<()> {
        let mut ranges: Vec<CharRange> = Vec::new();
        loop {
            match self.stack.pop() {
                Some(Item::Token(token)) => match token.kind {
                    TokenKind::LBracket => break,
                    TokenKind::Dash => ranges.push(CharRange::single('-')),
                    _ => return Err(unexpected(&token)),
                },
                Some(Item::Node(Node::Char(end), _)) => {
                    let range = self.range_ending_with(end)?;
                    ranges.extend(range);
                }
                Some(Item::Node(Node::CharSet(set), _)) => ranges.extend_from_slice(set.ranges()),
                Some(Item::Node(Node::NamedClass(name), _)) => {
                    let set = classes::named(&name).ok_or(RegexError::UnknownNamedClass(name))?;
                    ranges.extend_from_slice(set.ranges());
                }
                Some(Item::Node(..)) | None => return Err(unexpected(&rbracket)),
            }
        }
        self.push_leaf(Node::CharSet(CharSet::new(ranges)));
        Ok(())
    }

    /// Pops the start of an `a-z` range ending at `end`, if any. Yields the
    /// single character otherwise.
    fn range_ending_with(&mut self, end: char) -> Result<Vec<CharRange>> {
        let dash = match self.stack.last() {
            Some(Item::Token(token)) if token.kind == TokenKind::Dash => token.clone(),
            _ => return Ok(vec![CharRange::single(end)]),
        };
        self.stack.pop();

        match self.stack.last() {
            Some(Item::Node(Node::Char(start), _)) => {
                let start = *start;
                if start > end {
                    return Err(RegexError::parser(
                        Some(dash.offset),
                        format!("Invalid range {start:?}-{end:?} at index {}", dash.offset),
                    ));
                }
                self.stack.pop();
                Ok(vec![CharRange::new(start, end)])
            }
            _ => Ok(vec![CharRange::single(end), CharRange::single('-')]),
        }
    }

    /// Handles `}`, closing either a repetition `{n,m}` or a class `\p{...}`.
    /// The construct is identified by the shape of the tokens between the
    /// opening token and `}`.
    fn reduce_rep_or_class(&mut self, rbrace: Token) -> Result<()> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            match self.stack.pop() {
                Some(Item::Token(token)) => {
                    let opener = matches!(token.kind, TokenKind::LBrace | TokenKind::NamedClass);
                    tokens.push(token);
                    if opener {
                        break;
                    }
                }
                Some(Item::Node(..)) | None => return Err(unexpected(&rbrace)),
            }
        }
        tokens.reverse();

        let kinds: Vec<&TokenKind> = tokens.iter().map(|token| &token.kind).collect();
        let (min, max) = match kinds.as_slice() {
            [TokenKind::LBrace, TokenKind::Int(n)] => (*n, Some(*n)),
            [TokenKind::LBrace, TokenKind::Int(n), TokenKind::Comma] => (*n, None),
            [TokenKind::LBrace, TokenKind::Comma, TokenKind::Int(m)] => (0, Some(*m)),
            [TokenKind::LBrace, TokenKind::Int(n), TokenKind::Comma, TokenKind::Int(m)] => {
                (*n, Some(*m))
            }
            [TokenKind::NamedClass, TokenKind::Name(name)] => {
                self.push_leaf(Node::NamedClass(name.clone()));
                return Ok(());
            }
            [TokenKind::NamedClass, TokenKind::Name(word_list), TokenKind::LParen, TokenKind::Name(name), args @ .., TokenKind::RParen]
                if word_list == "WordList" =>
            {
                let (node, depth) = self.word_list(&tokens[3], name, args, &tokens[4..])?;
                return self.push_node(node, depth, Some(tokens[0].offset));
            }
            _ => return Err(unexpected(tokens.get(1).unwrap_or(&rbrace))),
        };

        if let Some(max) = max {
            if max < min {
                return Err(RegexError::InvalidRepetition { min, max });
            }
        }
        let (child, depth) = self.pop_node().ok_or_else(|| unexpected(&tokens[0]))?;
        self.push_node(
            Node::repeated(child, min, max),
            depth + 1,
            Some(tokens[0].offset),
        )
    }

    /// Expands `\p{WordList(name, options...)}` into a tree and its height.
    /// `args` holds the tokens following the name, which must be
    /// `, option` pairs.
    fn word_list(
        &self,
        name_token: &Token,
        name: &str,
        args: &[&TokenKind],
        arg_tokens: &[Token],
    ) -> Result<(Node, u32)> {
        let mut options = WordListOptions::default();
        for (pair, pair_tokens) in args.chunks(2).zip(arg_tokens.chunks(2)) {
            match pair {
                [TokenKind::Comma, TokenKind::Name(option)] => {
                    if !options.set(option) {
                        return Err(RegexError::UnknownWordListOption {
                            option: option.clone(),
                            offset: pair_tokens[1].offset,
                        });
                    }
                }
                _ => return Err(unexpected(&pair_tokens[0])),
            }
        }

        let words = self
            .word_lists
            .and_then(|resolver| resolver.lookup(name))
            .ok_or_else(|| RegexError::UnknownWordList {
                name: name.to_string(),
                offset: name_token.offset,
            })?;
        trace!("expanding word list {name} ({} words)", words.len());

        let branches: Vec<Node> = words
            .iter()
            .filter(|word| !word.is_empty())
            .map(|word| self.word_node(word, options))
            .collect();
        let longest = words.iter().map(|word| word.chars().count()).max().unwrap_or(0);
        let depth = 1 + Node::balanced_height(longest) + Node::balanced_height(branches.len());
        Ok((Node::alternation(branches).unwrap_or(Node::Empty), depth))
    }

    fn word_node(&self, word: &str, options: WordListOptions) -> Node {
        let table = self.variants;
        Node::sequence(
            word.chars()
                .map(|c| {
                    let base = table.base(c);
                    let mut chars = vec![c];
                    if options.uppercase_optional {
                        chars.push(variants::lower(c));
                    }
                    if options.lowercase_optional {
                        chars.push(variants::upper(base));
                    }
                    if options.diacritics_optional {
                        chars.push(base);
                    }
                    if options.uppercase_optional && options.diacritics_optional {
                        chars.push(variants::lower(base));
                    }
                    let set = CharSet::from_chars(chars);
                    match set.as_single() {
                        Some(c) => Node::Char(c),
                        None => Node::CharSet(set),
                    }
                })
                .collect(),
        )
    }
}

fn unexpected(token: &Token) -> RegexError {
    RegexError::parser(
        Some(token.offset),
        format!("Unexpected {} at index {}", token.kind, token.offset),
    )
}

/// Parses `pattern` without word lists
pub fn parse(pattern: &str) -> Result<Node> {
    Parser::new(pattern).parse()
}
