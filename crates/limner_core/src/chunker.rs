//! Deterministic chunking of chapter text into token-bounded pieces.

use crate::Tokenizer;
use limner_error::LimnerResult;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

/// Splits chapter text into contiguous runs of at most `max_tokens` tokens.
///
/// Boundaries are computed once at book construction and never recomputed.
/// Concatenating the decoded chunks reproduces the normalized chapter's
/// token sequence exactly.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use limner_core::{Chunker, CoreBpeTokenizer};
///
/// let tokenizer = Arc::new(CoreBpeTokenizer::cl100k().unwrap());
/// let chunker = Chunker::new(tokenizer, 100);
/// let chunks = chunker.chunk("A short chapter.").unwrap();
/// assert_eq!(chunks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Chunker {
    tokenizer: Arc<dyn Tokenizer>,
    max_tokens: usize,
}

impl Chunker {
    /// Create a chunker over an injected tokenizer.
    ///
    /// # Panics
    ///
    /// Panics if `max_tokens` is zero.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, max_tokens: usize) -> Self {
        assert!(max_tokens > 0, "max_tokens must be positive");
        Self {
            tokenizer,
            max_tokens,
        }
    }

    /// The per-chunk token bound.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Split chapter text into ordered chunk texts.
    ///
    /// The input is normalized first (Unicode NFC, escape decoding,
    /// whitespace collapsing), then tokenized and sliced into runs of at
    /// most `max_tokens` ids, each decoded back to text. The final run may
    /// be shorter; text that tokenizes to nothing yields no chunks.
    ///
    /// # Errors
    ///
    /// Tokenizer failure is fatal for the whole chapter: no partial chunk
    /// list is returned.
    pub fn chunk(&self, text: &str) -> LimnerResult<Vec<String>> {
        let normalized = normalize_text(text);
        let tokens = self.tokenizer.encode(&normalized)?;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        tokens
            .chunks(self.max_tokens)
            .map(|run| self.tokenizer.decode(run))
            .collect()
    }
}

/// Normalize extracted chapter text before tokenization.
///
/// Applies Unicode NFC normalization, decodes literal escape sequences left
/// behind by upstream extraction (`\n`, `\t`, `\r`, `\"`, `\\`), normalizes
/// line endings, collapses runs of spaces/tabs, and caps consecutive blank
/// lines at one (paragraph breaks survive).
pub fn normalize_text(text: &str) -> String {
    let composed: String = text.nfc().collect();
    let unescaped = decode_escapes(&composed);
    collapse_whitespace(&unescaped)
}

fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('r') => {
                chars.next();
            }
            Some('"') => {
                chars.next();
                out.push('"');
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push(c),
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut newlines = 0u32;
    for c in text.replace("\r\n", "\n").replace('\r', "\n").chars() {
        match c {
            ' ' | '\t' => pending_space = true,
            '\n' => {
                pending_space = false;
                newlines += 1;
            }
            _ => {
                if newlines > 0 {
                    if !out.is_empty() {
                        out.push('\n');
                        if newlines > 1 {
                            out.push('\n');
                        }
                    }
                    newlines = 0;
                } else if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }
    out
}
