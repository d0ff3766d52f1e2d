//! Grammar over the label token stream.
//!
//! ```text
//! text     := chunk*
//! chunk    := ["value"] NAME line* [";" ignored*]
//! line     := operand* ("=" operand*)? NEWLINE
//! ```
//!
//! A chunk starts at the `value` marker when it is the first token of a line;
//! text before the first marker is a chunk of its own. The first operand of a
//! chunk names the section. Lines with an `=` become entries until the first
//! `;` closes the chunk. Lines without `=` are dropped.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WarehouseError};
use crate::labels::lexer::{Lexer, Token};

/// Keyword that opens a section
pub const SECTION_MARKER: &str = "value";

/// One `code = 'label'` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEntry {
    pub code: String,
    pub label: String,
}

impl LabelEntry {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

/// Parsed sections in source order
#[derive(Debug, Clone, Default)]
pub struct LabelSections {
    sections: Vec<(String, Vec<LabelEntry>)>,
    index: FxHashMap<String, usize>,
}

impl LabelSections {
    /// Entries of the section `name`
    pub fn section(&self, name: &str) -> Result<&[LabelEntry]> {
        self.index
            .get(name)
            .map(|&idx| self.sections[idx].1.as_slice())
            .ok_or_else(|| WarehouseError::MissingSection(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn insert(&mut self, name: String, entries: Vec<LabelEntry>) {
        if let Some(&idx) = self.index.get(&name) {
            self.sections[idx].1 = entries;
        } else {
            self.index.insert(name.clone(), self.sections.len());
            self.sections.push((name, entries));
        }
    }
}

#[derive(Debug, Default)]
struct Chunk {
    name: Option<String>,
    entries: Vec<LabelEntry>,
    closed: bool,
}

impl Chunk {
    fn feed(&mut self, line: &[Token]) {
        if self.closed {
            return;
        }

        let mut tokens = line;
        if self.name.is_none() {
            let Some(pos) = tokens.iter().position(|t| t.operand().is_some()) else {
                self.closed = tokens.contains(&Token::Terminator);
                return;
            };
            if let Some(name) = tokens[pos].operand() {
                self.name = Some(name.trim_start_matches('$').to_string());
            }
            tokens = &tokens[pos + 1..];
        }

        if let Some(end) = tokens.iter().position(|t| *t == Token::Terminator) {
            tokens = &tokens[..end];
            self.closed = true;
        }

        if let Some(entry) = entry_from_line(tokens) {
            self.entries.push(entry);
        }
    }
}

fn join_operands(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter_map(|t| match t {
            Token::Equals => Some("="),
            other => other.operand(),
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn entry_from_line(tokens: &[Token]) -> Option<LabelEntry> {
    let eq = tokens.iter().position(|t| *t == Token::Equals)?;
    Some(LabelEntry {
        code: join_operands(&tokens[..eq]),
        label: join_operands(&tokens[eq + 1..]),
    })
}

fn is_marker(token: &Token) -> bool {
    matches!(token, Token::Word(w) if w.eq_ignore_ascii_case(SECTION_MARKER))
}

/// Parse a label description text into its sections
#[must_use]
pub fn parse(text: &str) -> LabelSections {
    let mut sections = LabelSections::default();
    let mut chunk = Chunk::default();
    let mut line = Vec::new();
    let mut tokens = Lexer::new(text);

    loop {
        let token = tokens.next();
        let at_end = token.is_none();
        match token {
            Some(Token::Newline) | None => {}
            Some(token) => {
                line.push(token);
                continue;
            }
        }

        if line.first().is_some_and(is_marker) {
            finish(&mut sections, std::mem::take(&mut chunk));
            chunk.feed(&line[1..]);
        } else if !line.is_empty() {
            chunk.feed(&line);
        }
        line.clear();

        if at_end {
            break;
        }
    }

    finish(&mut sections, chunk);
    sections
}

fn finish(sections: &mut LabelSections, chunk: Chunk) {
    match chunk.name {
        Some(name) if !name.is_empty() => sections.insert(name, chunk.entries),
        _ => {}
    }
}
