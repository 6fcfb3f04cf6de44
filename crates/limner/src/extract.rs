//! Plain-text chapter extraction.
//!
//! Document parsing (EPUB/MOBI/PDF) happens upstream; this module accepts
//! the pre-extracted plain text in one of two shapes: a directory of
//! chapter `.txt` files taken in lexicographic order, or a single file
//! whose `# ` heading lines mark chapter starts.

use limner_error::{LimnerResult, StorageError, StorageErrorKind};
use std::path::Path;

/// Load `(title, text)` chapters from a book path.
///
/// # Errors
///
/// Returns an error if the path does not exist, is unreadable, or yields
/// no chapters.
pub fn load_chapters(path: &Path) -> LimnerResult<Vec<(String, String)>> {
    let chapters = if path.is_dir() {
        chapters_from_dir(path)?
    } else {
        chapters_from_file(path)?
    };
    if chapters.is_empty() {
        return Err(StorageError::new(StorageErrorKind::NotFound(format!(
            "no chapters found in {}",
            path.display()
        )))
        .into());
    }
    Ok(chapters)
}

fn chapters_from_dir(dir: &Path) -> LimnerResult<Vec<(String, String)>> {
    let mut paths = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| {
        StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", dir.display(), e)))
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", dir.display(), e)))
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("txt") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut chapters = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path).map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        chapters.push((title, text));
    }
    Ok(chapters)
}

fn chapters_from_file(path: &Path) -> LimnerResult<Vec<(String, String)>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })?;

    let mut chapters: Vec<(String, String)> = Vec::new();
    let mut current: Option<(String, String)> = None;
    for line in contents.lines() {
        if let Some(title) = line.strip_prefix("# ") {
            if let Some(done) = current.take() {
                chapters.push(done);
            }
            current = Some((title.trim().to_string(), String::new()));
        } else if let Some((_, text)) = current.as_mut() {
            text.push_str(line);
            text.push('\n');
        } else if !line.trim().is_empty() {
            // Text before any heading: the whole file is one chapter.
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let mut text = String::from(line);
            text.push('\n');
            current = Some((title, text));
        }
    }
    if let Some(done) = current.take() {
        chapters.push(done);
    }

    // Drop chapters whose body is pure whitespace.
    Ok(chapters
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect())
}
