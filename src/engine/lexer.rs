//! Context-sensitive token recognition.
//!
//! The lexer never tokenizes the whole input up front. The matcher asks "does
//! terminal `T` start at (or after ignorable text following) position `p`?" and
//! only terminals that the grammar expects at that point are ever tried, so
//! `CREATE` can be a keyword in one place and an identifier in another.
//!
//! ```text
//! input:  "CREATE TABLE foo"
//!                 ^ pos = 6
//! skip_ignored(6) -> 7      ("\s+" ignore pattern)
//! token(TABLE, 6) -> Span { start: 7, end: 12 }
//! ```

use super::grammar::{CompiledGrammar, TermId};

/// Byte span of a recognized token (`end` exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
}

pub(crate) struct Lexer<'g, 'i> {
    grammar: &'g CompiledGrammar,
    input: &'i str,
}

impl<'g, 'i> Lexer<'g, 'i> {
    pub fn new(grammar: &'g CompiledGrammar, input: &'i str) -> Self {
        Lexer { grammar, input }
    }

    /// Advance past any run of ignorable text starting at `pos`.
    pub fn skip_ignored(&self, mut pos: usize) -> usize {
        loop {
            let before = pos;
            for re in &self.grammar.ignore {
                if let Some(m) = re.find(&self.input[pos..]) {
                    pos += m.end();
                }
            }
            if pos == before {
                return pos;
            }
        }
    }

    /// Recognize terminal `term` at `pos`, skipping ignorable text first.
    pub fn token(&self, term: TermId, pos: usize) -> Option<Span> {
        let start = self.skip_ignored(pos);
        let len = self.grammar.terminals[term].match_len(&self.input[start..])?;
        Some(Span { start, end: start + len })
    }

    /// True when any terminal in `first` can be recognized at `pos`.
    pub fn predicts(&self, first: &[TermId], pos: usize) -> bool {
        first.iter().any(|&t| self.token(t, pos).is_some())
    }

    pub fn text(&self, start: usize, end: usize) -> &'i str {
        &self.input[start..end]
    }

    pub fn terminal_name(&self, term: TermId) -> &'g str {
        &self.grammar.terminals[term].name
    }

    pub fn input_len(&self) -> usize {
        self.input.len()
    }
}
