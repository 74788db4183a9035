//! Error types for the patch engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the engine.
pub type PatchResult<T> = Result<T, EngineError>;

/// Errors the engine can surface to its embedder.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Path is covered by the ignore policy.
    #[error("{path} is protected by the ignore policy")]
    Ignored { path: String },

    /// Existing-file block carried a non-blank search for a file that does not exist.
    #[error("{path}: file not found (SEARCH must be empty for new files)")]
    FileMissingWithSearch { path: String },

    /// Could not read an existing file during analysis.
    #[error("{path}: failed to read file: {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Search block was blank for a file that already exists.
    #[error("{path}: SEARCH block is empty for existing file")]
    EmptySearch { path: String },

    /// Exact match occurred more than once.
    #[error("{path}: ambiguous, {count} exact matches")]
    AmbiguousExact { path: String, count: usize },

    /// Whitespace-flexible regex matched more than once.
    #[error("{path}: {count} similar blocks")]
    AmbiguousRegex { path: String, count: usize },

    /// No strategy in the cascade resolved a target.
    #[error("{path}: no match found, best similarity {best_similarity:.1}")]
    NoMatch { path: String, best_similarity: f64 },

    /// Apply's preflight check rejected one or more blocks; nothing was written.
    #[error("preflight halt: {0} block(s) lack a resolved match target")]
    PreflightHalt(usize),

    /// A write failed partway through an apply.
    #[error("write failed for {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Undo refused because a file was modified after apply.
    #[error("refusing undo: {path} was modified since the patch was applied")]
    UndoRefusedTampered { path: String },

    /// No transaction recorded to undo.
    #[error("no transaction to undo")]
    NoTransactionToUndo,

    /// Undo's restore phase failed partway through.
    #[error("undo restore failed for {path}: {message}")]
    UndoRestoreFailed { path: String, message: String },

    /// An engine handle is already live against this directory.
    #[error("an engine handle is already open for {0}")]
    HandleInUse(PathBuf),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// History log (de)serialization failure.
    #[error("history log error: {0}")]
    Json(#[from] serde_json::Error),
}
