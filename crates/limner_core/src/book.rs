//! The Book/Chapter/Chunk data graph.
//!
//! A [`Book`] owns its [`Chapter`]s, each of which owns the [`Chunk`]s
//! produced by the chunker at construction time. Chunks are the unit of
//! generation work: four concurrent stage workers read and write the same
//! graph, so every chunk's mutable fields sit behind a lock and writers
//! only ever move fields forward (monotonic writes).

use crate::{BookState, Chunker, ChunkState};
use limner_error::{LimnerResult, PipelineError, PipelineErrorKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Globally unique, stable chunk address: `(chapter_id, chunk_id)`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    derive_more::Display,
)]
#[display("{:04}_{:04}", chapter_id, chunk_id)]
pub struct ChunkKey {
    /// Owning chapter's ordinal, 0-based.
    pub chapter_id: u32,
    /// Chapter-scoped ordinal, 1-based.
    pub chunk_id: u32,
}

/// Rolling context fed into a chunk's Summary request: the immediately
/// preceding chunk's resulting summary and knowledge base.
///
/// The default value is the fixed seed used by the very first chunk of the
/// book: empty summary, empty character and place maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryContext {
    /// Preceding chunk's narrative summary.
    pub summary: String,
    /// Accumulated character descriptions.
    pub characters: BTreeMap<String, String>,
    /// Accumulated place descriptions.
    pub places: BTreeMap<String, String>,
}

impl SummaryContext {
    /// True for the seed context (no preceding summary exists).
    pub fn is_seed(&self) -> bool {
        self.summary.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
struct StageFields {
    summary: String,
    characters: BTreeMap<String, String>,
    places: BTreeMap<String, String>,
    inherited: bool,
    scene_title: String,
    prompt: String,
    image: String,
    image_task: String,
    audio: bool,
}

/// The unit of generation work: a token-bounded slice of a chapter.
///
/// Raw text is immutable; the stage-owned fields are guarded by a lock and
/// written monotonically — once non-empty they are only ever replaced by a
/// new valid value for the same stage, never cleared.
#[derive(Debug)]
pub struct Chunk {
    key: ChunkKey,
    text: String,
    fields: RwLock<StageFields>,
}

impl Chunk {
    fn new(key: ChunkKey, text: String) -> Self {
        Self {
            key,
            text,
            fields: RwLock::new(StageFields::default()),
        }
    }

    /// The chunk's stable address.
    pub fn key(&self) -> ChunkKey {
        self.key
    }

    /// The chunk's immutable raw text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Apply the Summary stage's result.
    ///
    /// Returns the fresh durable snapshot on success.
    ///
    /// # Errors
    ///
    /// Rejects an empty summary: a set summary may only be replaced by a
    /// new valid value, never cleared.
    pub fn set_summary(
        &self,
        summary: impl Into<String>,
        characters: BTreeMap<String, String>,
        places: BTreeMap<String, String>,
        inherited: bool,
    ) -> LimnerResult<ChunkState> {
        let summary = summary.into();
        if summary.is_empty() {
            return Err(PipelineError::new(PipelineErrorKind::RejectedWrite(format!(
                "empty summary for chunk {}",
                self.key
            )))
            .into());
        }
        let mut fields = self.fields.write().expect("chunk lock poisoned");
        fields.summary = summary;
        fields.characters = characters;
        fields.places = places;
        fields.inherited = inherited;
        Ok(self.snapshot(&fields))
    }

    /// Apply the Prompt stage's result.
    ///
    /// # Errors
    ///
    /// Rejects an empty prompt.
    pub fn set_prompt(
        &self,
        scene_title: impl Into<String>,
        prompt: impl Into<String>,
    ) -> LimnerResult<ChunkState> {
        let prompt = prompt.into();
        if prompt.is_empty() {
            return Err(PipelineError::new(PipelineErrorKind::RejectedWrite(format!(
                "empty prompt for chunk {}",
                self.key
            )))
            .into());
        }
        let mut fields = self.fields.write().expect("chunk lock poisoned");
        fields.scene_title = scene_title.into();
        fields.prompt = prompt;
        Ok(self.snapshot(&fields))
    }

    /// Apply the Image stage's result.
    ///
    /// # Errors
    ///
    /// Rejects an empty image reference.
    pub fn set_image(
        &self,
        image: impl Into<String>,
        task_id: impl Into<String>,
    ) -> LimnerResult<ChunkState> {
        let image = image.into();
        if image.is_empty() {
            return Err(PipelineError::new(PipelineErrorKind::RejectedWrite(format!(
                "empty image reference for chunk {}",
                self.key
            )))
            .into());
        }
        let mut fields = self.fields.write().expect("chunk lock poisoned");
        fields.image = image;
        fields.image_task = task_id.into();
        Ok(self.snapshot(&fields))
    }

    /// Mark narrated audio as generated and stored.
    pub fn set_audio_done(&self) -> ChunkState {
        let mut fields = self.fields.write().expect("chunk lock poisoned");
        fields.audio = true;
        self.snapshot(&fields)
    }

    /// Whether the Summary stage has filled this chunk.
    pub fn is_summary_set(&self) -> bool {
        !self.fields.read().expect("chunk lock poisoned").summary.is_empty()
    }

    /// Whether the Prompt stage has filled this chunk.
    pub fn is_prompt_set(&self) -> bool {
        !self.fields.read().expect("chunk lock poisoned").prompt.is_empty()
    }

    /// Whether the Image stage has filled this chunk.
    pub fn is_image_set(&self) -> bool {
        !self.fields.read().expect("chunk lock poisoned").image.is_empty()
    }

    /// Whether narrated audio has been generated.
    pub fn is_audio_done(&self) -> bool {
        self.fields.read().expect("chunk lock poisoned").audio
    }

    /// Whether all four stage fields are set.
    pub fn is_done(&self) -> bool {
        let fields = self.fields.read().expect("chunk lock poisoned");
        !fields.summary.is_empty()
            && !fields.prompt.is_empty()
            && !fields.image.is_empty()
            && fields.audio
    }

    /// Whether this chunk's summary context was inherited from its
    /// predecessor rather than generated.
    pub fn is_inherited(&self) -> bool {
        self.fields.read().expect("chunk lock poisoned").inherited
    }

    /// Snapshot of this chunk's resulting summary context, as fed to the
    /// next chunk's Summary request.
    pub fn summary_context(&self) -> SummaryContext {
        let fields = self.fields.read().expect("chunk lock poisoned");
        SummaryContext {
            summary: fields.summary.clone(),
            characters: fields.characters.clone(),
            places: fields.places.clone(),
        }
    }

    /// The chunk's own summary text, when set.
    pub fn summary_text(&self) -> Option<String> {
        let fields = self.fields.read().expect("chunk lock poisoned");
        (!fields.summary.is_empty()).then(|| fields.summary.clone())
    }

    /// The chunk's own prompt text, when set.
    pub fn prompt_text(&self) -> Option<String> {
        let fields = self.fields.read().expect("chunk lock poisoned");
        (!fields.prompt.is_empty()).then(|| fields.prompt.clone())
    }

    /// Durable snapshot of the chunk's current state.
    pub fn state(&self) -> ChunkState {
        let fields = self.fields.read().expect("chunk lock poisoned");
        self.snapshot(&fields)
    }

    /// Re-apply a persisted state on resume.
    ///
    /// Only fills fields that are still unset in memory; already-set fields
    /// win (monotonicity holds across restarts).
    pub fn restore(&self, state: &ChunkState) {
        let mut fields = self.fields.write().expect("chunk lock poisoned");
        if fields.summary.is_empty() && !state.summary.is_empty() {
            fields.summary = state.summary.clone();
            fields.characters = state.characters.clone();
            fields.places = state.places.clone();
            fields.inherited = state.inherited;
        }
        if fields.prompt.is_empty() && !state.prompt.is_empty() {
            fields.scene_title = state.scene_title.clone();
            fields.prompt = state.prompt.clone();
        }
        if fields.image.is_empty() && !state.image.is_empty() {
            fields.image = state.image.clone();
            fields.image_task = state.image_task.clone();
        }
        if state.audio {
            fields.audio = true;
        }
    }

    fn snapshot(&self, fields: &StageFields) -> ChunkState {
        ChunkState {
            chunk_id: self.key.chunk_id,
            chapter_id: self.key.chapter_id,
            summary: fields.summary.clone(),
            characters: fields.characters.clone(),
            places: fields.places.clone(),
            scene_title: fields.scene_title.clone(),
            prompt: fields.prompt.clone(),
            image: fields.image.clone(),
            image_task: fields.image_task.clone(),
            audio: fields.audio,
            inherited: fields.inherited,
            is_done: !fields.summary.is_empty()
                && !fields.prompt.is_empty()
                && !fields.image.is_empty()
                && fields.audio,
        }
    }
}

/// One logical section of the book.
///
/// Immutable after construction except through its chunks.
#[derive(Debug)]
pub struct Chapter {
    chapter_id: u32,
    title: String,
    text: String,
    chunks: Vec<Chunk>,
}

impl Chapter {
    /// The chapter's ordinal, assigned at parse time.
    pub fn chapter_id(&self) -> u32 {
        self.chapter_id
    }

    /// The chapter's title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The chapter's extracted text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The chapter's chunks, in order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// A parsed book plus its generation state.
#[derive(Debug)]
pub struct Book {
    book_id: Uuid,
    chapters: Vec<Chapter>,
}

impl Book {
    /// Build a book from extracted `(title, text)` chapters, chunking each
    /// chapter once.
    ///
    /// # Errors
    ///
    /// Tokenizer failure aborts the whole book; no partially chunked book
    /// is ever returned.
    pub fn from_chapters(
        chapters: Vec<(String, String)>,
        chunker: &Chunker,
    ) -> LimnerResult<Self> {
        Self::with_id(Uuid::new_v4(), chapters, chunker)
    }

    /// Build a book with a caller-supplied identity (used on resume).
    ///
    /// # Errors
    ///
    /// Tokenizer failure aborts the whole book.
    pub fn with_id(
        book_id: Uuid,
        chapters: Vec<(String, String)>,
        chunker: &Chunker,
    ) -> LimnerResult<Self> {
        let mut built = Vec::with_capacity(chapters.len());
        for (idx, (title, text)) in chapters.into_iter().enumerate() {
            let chapter_id = idx as u32;
            let chunks = chunker
                .chunk(&text)?
                .into_iter()
                .enumerate()
                .map(|(pos, chunk_text)| {
                    Chunk::new(
                        ChunkKey {
                            chapter_id,
                            chunk_id: pos as u32 + 1,
                        },
                        chunk_text,
                    )
                })
                .collect();
            built.push(Chapter {
                chapter_id,
                title,
                text,
                chunks,
            });
        }
        Ok(Self {
            book_id,
            chapters: built,
        })
    }

    /// The book's stable identity.
    pub fn book_id(&self) -> Uuid {
        self.book_id
    }

    /// The book's chapters, in order.
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// All chunks in sweep order: chapter order, then chunk order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chapters.iter().flat_map(|chapter| chapter.chunks.iter())
    }

    /// Total number of chunks in the book.
    pub fn chunk_count(&self) -> usize {
        self.chapters.iter().map(|c| c.chunks.len()).sum()
    }

    /// Whether every chunk has a summary.
    pub fn is_summary_done(&self) -> bool {
        self.chunks().all(Chunk::is_summary_set)
    }

    /// Whether every chunk has a prompt.
    pub fn is_prompt_done(&self) -> bool {
        self.chunks().all(Chunk::is_prompt_set)
    }

    /// Whether every chunk has a stored image.
    pub fn is_image_done(&self) -> bool {
        self.chunks().all(Chunk::is_image_set)
    }

    /// Whether every chunk has narrated audio.
    pub fn is_audio_done(&self) -> bool {
        self.chunks().all(Chunk::is_audio_done)
    }

    /// Whether every chunk is fully enriched.
    pub fn is_done(&self) -> bool {
        self.chunks().all(Chunk::is_done)
    }

    /// Durable book-level snapshot.
    pub fn state(&self) -> BookState {
        BookState {
            book_id: self.book_id,
            chunk_keys: self.chunks().map(|c| c.key().to_string()).collect(),
            is_done: self.is_done(),
        }
    }

    /// Re-apply persisted chunk states on resume, keyed by
    /// [`ChunkKey`]'s display form.
    ///
    /// States with no matching chunk are ignored with a warning (the source
    /// text or token bound changed since the states were written).
    pub fn restore(&self, states: &HashMap<String, ChunkState>) {
        for chunk in self.chunks() {
            if let Some(state) = states.get(&chunk.key().to_string()) {
                chunk.restore(state);
            }
        }
        let known: usize = self
            .chunks()
            .filter(|c| states.contains_key(&c.key().to_string()))
            .count();
        if known < states.len() {
            warn!(
                persisted = states.len(),
                matched = known,
                "some persisted chunk states match no chunk; was the book re-chunked?"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Chunker;
    use limner_error::LimnerResult;
    use std::sync::Arc;

    struct WordTokenizer;

    impl crate::Tokenizer for WordTokenizer {
        fn encode(&self, text: &str) -> LimnerResult<Vec<usize>> {
            Ok(text.chars().map(|c| c as usize).collect())
        }

        fn decode(&self, tokens: &[usize]) -> LimnerResult<String> {
            Ok(tokens
                .iter()
                .filter_map(|&t| char::from_u32(t as u32))
                .collect())
        }
    }

    fn test_book() -> Book {
        let chunker = Chunker::new(Arc::new(WordTokenizer), 8);
        Book::from_chapters(
            vec![
                ("One".to_string(), "abcdefghijkl".to_string()),
                ("Two".to_string(), "mnop".to_string()),
            ],
            &chunker,
        )
        .unwrap()
    }

    #[test]
    fn test_chunk_keys_are_stable_and_ordered() {
        let book = test_book();
        let keys: Vec<String> = book.chunks().map(|c| c.key().to_string()).collect();
        assert_eq!(keys, vec!["0000_0001", "0000_0002", "0001_0001"]);
    }

    #[test]
    fn test_monotonic_write_rejects_empty_summary() {
        let book = test_book();
        let chunk = book.chunks().next().unwrap();
        chunk
            .set_summary("A beginning.", BTreeMap::new(), BTreeMap::new(), false)
            .unwrap();
        assert!(chunk
            .set_summary("", BTreeMap::new(), BTreeMap::new(), false)
            .is_err());
        assert_eq!(chunk.summary_text().unwrap(), "A beginning.");
    }

    #[test]
    fn test_done_requires_all_four_stages() {
        let book = test_book();
        for chunk in book.chunks() {
            assert!(!chunk.is_done());
            chunk
                .set_summary("s", BTreeMap::new(), BTreeMap::new(), false)
                .unwrap();
            chunk.set_prompt("title", "p").unwrap();
            chunk.set_image("media/ab/cd/abcd", "task-1").unwrap();
            assert!(!chunk.is_done());
            chunk.set_audio_done();
            assert!(chunk.is_done());
        }
        assert!(book.is_done());
        assert!(book.state().is_done);
    }

    #[test]
    fn test_restore_skips_already_set_fields() {
        let book = test_book();
        let chunk = book.chunks().next().unwrap();
        chunk
            .set_summary("live", BTreeMap::new(), BTreeMap::new(), false)
            .unwrap();

        let mut persisted = chunk.state();
        persisted.summary = "stale".to_string();
        persisted.prompt = "persisted prompt".to_string();
        chunk.restore(&persisted);

        assert_eq!(chunk.summary_text().unwrap(), "live");
        assert_eq!(chunk.prompt_text().unwrap(), "persisted prompt");
    }

    #[test]
    fn test_seed_context_is_empty() {
        let seed = SummaryContext::default();
        assert!(seed.is_seed());
        assert!(seed.characters.is_empty());
        assert!(seed.places.is_empty());
    }
}
