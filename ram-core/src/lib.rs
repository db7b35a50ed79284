//! Core library for r.a.m.
//!
//! This crate provides the note model, the note store and the schema
//! migrations, independent of any transport layer.
//!
//! # Usage
//!
//! ```no_run
//! use ram_core::db::Database;
//! use ram_core::models::Note;
//!
//! let db = Database::open("ram.db")?;
//! db.migrate()?;
//!
//! let mut note = Note::new("buy milk", "", "errand, home");
//! db.persist_note(&note)?;
//! note.mark_persisted();
//!
//! let notes = db.recent_notes()?;
//! # Ok::<(), ram_core::Error>(())
//! ```

pub mod db;
pub mod error;
pub mod models;

// Re-export commonly used types at crate root
pub use db::Database;
pub use error::{Error, Result};
