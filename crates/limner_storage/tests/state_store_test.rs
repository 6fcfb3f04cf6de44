//! Tests for the recovery-state store.

use limner_core::{BookState, ChunkState};
use limner_storage::StateStore;
use tempfile::TempDir;
use uuid::Uuid;

fn chunk(chapter_id: u32, chunk_id: u32) -> ChunkState {
    ChunkState {
        chunk_id,
        chapter_id,
        summary: format!("summary {}-{}", chapter_id, chunk_id),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_save_and_load_book() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();

    assert!(store.load_book().await.unwrap().is_none());

    let state = BookState {
        book_id: Uuid::new_v4(),
        chunk_keys: vec!["0000_0001".to_string(), "0000_0002".to_string()],
        is_done: false,
    };
    store.save_book(&state).await.unwrap();

    let loaded = store.load_book().await.unwrap().unwrap();
    assert_eq!(loaded, state);
}

#[tokio::test]
async fn test_save_and_load_chunks() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();

    store.save_chunk(&chunk(0, 1)).await.unwrap();
    store.save_chunk(&chunk(0, 2)).await.unwrap();
    store.save_chunk(&chunk(1, 1)).await.unwrap();

    let loaded = store.load_chunks().await.unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded["0000_0002"].summary, "summary 0-2");
}

#[tokio::test]
async fn test_resave_overwrites_whole_record() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();

    let mut state = chunk(0, 1);
    store.save_chunk(&state).await.unwrap();

    state.prompt = "a painted harbor".to_string();
    state.audio = true;
    store.save_chunk(&state).await.unwrap();

    let loaded = store.load_chunks().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded["0000_0001"], state);
}

#[tokio::test]
async fn test_no_temp_files_left_behind() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();

    store.save_chunk(&chunk(0, 1)).await.unwrap();
    store
        .save_book(&BookState {
            book_id: Uuid::new_v4(),
            chunk_keys: vec!["0000_0001".to_string()],
            is_done: false,
        })
        .await
        .unwrap();

    let mut names = Vec::new();
    for entry in std::fs::read_dir(temp_dir.path()).unwrap() {
        names.push(entry.unwrap().file_name().into_string().unwrap());
    }
    names.sort();
    assert_eq!(names, vec!["0000_0001.json", "book.json"]);
}

#[tokio::test]
async fn test_book_file_ignored_by_chunk_loader() {
    let temp_dir = TempDir::new().unwrap();
    let store = StateStore::new(temp_dir.path()).unwrap();

    store
        .save_book(&BookState {
            book_id: Uuid::new_v4(),
            chunk_keys: Vec::new(),
            is_done: false,
        })
        .await
        .unwrap();
    store.save_chunk(&chunk(2, 3)).await.unwrap();

    let loaded = store.load_chunks().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.contains_key("0002_0003"));
}
