//! Tokenizer for SAS `proc format` label descriptions.
//!
//! The lexer recognises just enough of the format to split entries apart:
//! bare words, quoted literals, the `=` delimiter, the `;` terminator and line
//! breaks. Tabs and spaces only separate tokens, and `/* ... */` comments are
//! skipped.

use std::iter::FusedIterator;

/// A lexical token of the label text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Unquoted run of characters
    Word(String),
    /// Quoted literal, trimmed, with inner whitespace runs collapsed
    Quoted(String),
    /// `=` delimiter between code and label
    Equals,
    /// `;` statement terminator
    Terminator,
    /// End of a source line
    Newline,
}

impl Token {
    /// Text of a word or quoted literal
    #[must_use]
    pub fn operand(&self) -> Option<&str> {
        match self {
            Self::Word(text) | Self::Quoted(text) => Some(text),
            _ => None,
        }
    }
}

/// Streaming tokenizer over a label text blob
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn skip_blanks(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' || !c.is_whitespace() {
                break;
            }
            self.bump(c);
        }
    }

    fn skip_comment(&mut self) {
        match self.rest()[2..].find("*/") {
            Some(end) => self.pos += 2 + end + 2,
            None => self.pos = self.text.len(),
        }
    }

    /// Read a quoted literal opened by `quote` at the current position.
    ///
    /// The literal closes at the first matching quote that is followed only by
    /// blanks and then `=`, `;`, a `/*` comment or the end of the line. Quotes
    /// elsewhere belong to the literal. Without such a quote the literal runs
    /// to the end of the line.
    fn quoted(&mut self, quote: char) -> Token {
        self.bump(quote);
        let body_start = self.pos;
        let line = self.rest();
        let line_end = line.find('\n').unwrap_or(line.len());
        let line = &line[..line_end];

        let close = line.char_indices().find_map(|(idx, c)| {
            if c != quote {
                return None;
            }
            let after = line[idx + c.len_utf8()..].trim_start_matches([' ', '\t', '\r']);
            let closes = after.is_empty()
                || after.starts_with('=')
                || after.starts_with(';')
                || after.starts_with("/*");
            closes.then_some(idx)
        });

        let (body, consumed) = match close {
            Some(idx) => (&line[..idx], idx + quote.len_utf8()),
            None => (line, line_end),
        };
        self.pos = body_start + consumed;
        Token::Quoted(collapse_whitespace(body))
    }

    fn word(&mut self) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '=' || c == ';' {
                break;
            }
            // stray quotes inside a bare word are dropped
            if c != '\'' && c != '"' {
                word.push(c);
            }
            self.bump(c);
        }
        Token::Word(word)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            self.skip_blanks();
            let c = self.peek()?;
            return Some(match c {
                '\n' => {
                    self.bump(c);
                    Token::Newline
                }
                '=' => {
                    self.bump(c);
                    Token::Equals
                }
                ';' => {
                    self.bump(c);
                    Token::Terminator
                }
                '\'' | '"' => self.quoted(c),
                '/' if self.rest().starts_with("/*") => {
                    self.skip_comment();
                    continue;
                }
                _ => self.word(),
            });
        }
    }
}

impl FusedIterator for Lexer<'_> {}

/// Trim `text` and collapse each internal whitespace run to one space
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
