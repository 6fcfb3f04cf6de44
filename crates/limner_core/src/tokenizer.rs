//! Tokenizer contract and the tiktoken-backed implementation.

use limner_error::{ChunkerError, LimnerResult};
use std::sync::Arc;

/// Contract for the external tokenizer the chunker depends on.
///
/// Implementations must be deterministic and round-trip-stable: decoding
/// any contiguous slice of an encoded sequence and re-encoding it yields
/// the same token ids.
pub trait Tokenizer: Send + Sync {
    /// Encode text into a token id sequence.
    fn encode(&self, text: &str) -> LimnerResult<Vec<usize>>;

    /// Decode a token id sequence back into text.
    fn decode(&self, tokens: &[usize]) -> LimnerResult<String>;

    /// Count tokens in text.
    fn count(&self, text: &str) -> LimnerResult<usize> {
        Ok(self.encode(text)?.len())
    }
}

/// Tokenizer backed by tiktoken's cl100k_base encoding.
///
/// Loading the BPE model is expensive; construct once at process start and
/// share via [`Arc`].
///
/// # Examples
///
/// ```
/// use limner_core::{CoreBpeTokenizer, Tokenizer};
///
/// let tokenizer = CoreBpeTokenizer::cl100k().expect("encoding should load");
/// let tokens = tokenizer.encode("Hello, world!").unwrap();
/// assert!(!tokens.is_empty());
/// ```
#[derive(Clone)]
pub struct CoreBpeTokenizer {
    bpe: Arc<tiktoken_rs::CoreBPE>,
}

impl CoreBpeTokenizer {
    /// Load the cl100k_base encoding.
    ///
    /// # Errors
    ///
    /// Returns a [`ChunkerError`] if the encoding cannot be loaded; this is
    /// fatal for the whole book.
    pub fn cl100k() -> LimnerResult<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ChunkerError::new(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl Tokenizer for CoreBpeTokenizer {
    fn encode(&self, text: &str) -> LimnerResult<Vec<usize>> {
        Ok(self.bpe.encode_ordinary(text))
    }

    fn decode(&self, tokens: &[usize]) -> LimnerResult<String> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| ChunkerError::new(format!("Failed to decode tokens: {}", e)).into())
    }
}

impl std::fmt::Debug for CoreBpeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreBpeTokenizer").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for dyn Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Tokenizer")
    }
}

/// Token usage statistics reported by a generation service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_getters::Getters)]
pub struct TokenUsage {
    /// Tokens in the prompt/input.
    prompt_tokens: usize,
    /// Tokens in the response/output.
    completion_tokens: usize,
    /// Total tokens (prompt + completion).
    total_tokens: usize,
}

impl TokenUsage {
    /// Create a new token usage record.
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_round_trip() {
        let tokenizer = CoreBpeTokenizer::cl100k().expect("Should load encoding");
        let text = "The quick brown fox jumps over the lazy dog.";
        let tokens = tokenizer.encode(text).unwrap();
        let decoded = tokenizer.decode(&tokens).unwrap();
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_count_matches_encode() {
        let tokenizer = CoreBpeTokenizer::cl100k().expect("Should load encoding");
        let text = "Hello, world!";
        assert_eq!(
            tokenizer.count(text).unwrap(),
            tokenizer.encode(text).unwrap().len()
        );
    }

    #[test]
    fn test_token_usage_new() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(*usage.prompt_tokens(), 100);
        assert_eq!(*usage.completion_tokens(), 50);
        assert_eq!(*usage.total_tokens(), 150);
    }
}
