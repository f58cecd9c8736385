// src/storage/mod.rs

//! Flat-file persistence for quizzes and notes.
//!
//! Layout under the data directory:
//! ```text
//! quizzes/{stem}.json
//! notes/{stem}.json
//! ```
//!
//! New records get the stem `sanitize_title(title)`, but files written by
//! hand may use any stem, so the record's own title is authoritative.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{note::Note, quiz::QuizRecord};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("'{title}' maps to the same file as '{existing}'")]
    Collision { title: String, existing: String },
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Outcome of reading one record file during a scan.
#[derive(Debug)]
pub enum Loaded<T> {
    Record { stem: String, record: T },
    Warning(String),
}

/// Maps a title to its file name stem: anything other than alphanumerics,
/// space, `-` and `_` becomes `_`. Several titles can share a stem.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Opens the store, creating `quizzes/` and `notes/` if absent.
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            base_path: base_path.into(),
        };
        fs::create_dir_all(store.quizzes_dir())?;
        fs::create_dir_all(store.notes_dir())?;
        Ok(store)
    }

    pub fn quizzes_dir(&self) -> PathBuf {
        self.base_path.join("quizzes")
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.base_path.join("notes")
    }

    fn quiz_path(&self, stem: &str) -> PathBuf {
        self.quizzes_dir().join(format!("{}.json", stem))
    }

    fn note_path(&self, stem: &str) -> PathBuf {
        self.notes_dir().join(format!("{}.json", stem))
    }

    // ===== Quiz Operations =====
    // Files are addressed by stem; callers derive new stems with `sanitize_title`.

    pub fn read_quizzes(&self) -> Result<Vec<Loaded<QuizRecord>>> {
        read_dir_records(&self.quizzes_dir())
    }

    pub fn write_quiz(&self, stem: &str, record: &QuizRecord) -> Result<()> {
        write_atomic(&self.quiz_path(stem), record)
    }

    pub fn remove_quiz(&self, stem: &str) -> Result<()> {
        remove(&self.quiz_path(stem), stem)
    }

    pub fn quiz_exists(&self, stem: &str) -> bool {
        self.quiz_path(stem).exists()
    }

    // ===== Note Operations =====

    pub fn read_notes(&self) -> Result<Vec<Loaded<Note>>> {
        read_dir_records(&self.notes_dir())
    }

    pub fn write_note(&self, stem: &str, note: &Note) -> Result<()> {
        write_atomic(&self.note_path(stem), note)
    }

    pub fn remove_note(&self, stem: &str) -> Result<()> {
        remove(&self.note_path(stem), stem)
    }

    pub fn note_exists(&self, stem: &str) -> bool {
        self.note_path(stem).exists()
    }
}

fn read_dir_records<T: DeserializeOwned>(dir: &Path) -> Result<Vec<Loaded<T>>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();

    let mut loaded = Vec::with_capacity(entries.len());
    for path in entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let parsed = fs::read_to_string(&path)
            .map_err(StorageError::from)
            .and_then(|content| serde_json::from_str::<T>(&content).map_err(StorageError::from));

        match parsed {
            Ok(record) => loaded.push(Loaded::Record { stem, record }),
            Err(e) => loaded.push(Loaded::Warning(format!("Could not load {}: {}", name, e))),
        }
    }
    Ok(loaded)
}

/// Writes to a sibling temp file and renames it over the target, so readers
/// see either the old record or the new one.
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove(path: &Path, name: &str) -> Result<()> {
    if !path.exists() {
        return Err(StorageError::NotFound(name.to_string()));
    }
    fs::remove_file(path)?;
    Ok(())
}
