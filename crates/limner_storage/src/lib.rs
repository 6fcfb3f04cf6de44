//! Durable recovery state and media storage for the Limner pipeline.
//!
//! Two stores live here:
//!
//! - [`StateStore`] persists the book's recovery format — one JSON record
//!   per chunk plus a book-level record, fully rewritten after every
//!   mutation so a restarted process can resume by skipping already-set
//!   fields.
//! - [`MediaStore`] persists generated image and audio bytes in a
//!   content-addressable layout (SHA-256 hash paths) with automatic
//!   deduplication.
//!
//! Both stores write atomically: data lands in a temp file that is renamed
//! into place, so a crash never leaves a torn record behind.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod media;
mod state;

pub use media::{MediaKind, MediaRef, MediaStore};
pub use state::StateStore;
