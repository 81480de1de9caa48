//! Error types for corpus acquisition and loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::decode::DecodeError;

/// Errors that can occur while acquiring shards or loading them into the store.
///
/// Every shard-related variant carries the shard name so a failing run can
/// report which shard and which stage went wrong.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// The shard has no local representation. Not fatal: callers fall back
    /// to a remote fetch.
    #[error("shard {name}: not found locally")]
    NotFound {
        /// Name of the shard that is missing on disk.
        name: String,
    },

    /// I/O error while opening, reading or writing a shard file.
    #[error("shard {name}: {source}")]
    Io {
        /// Name of the affected shard.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// HTTP error while fetching a shard. A single failed request is
    /// terminal for that shard; there is no retry.
    #[error("fetch shard {name}: {source}")]
    Fetch {
        /// Name of the affected shard.
        name: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// Malformed shard content. The surrounding load transaction is rolled
    /// back and the shard contributes zero rows.
    #[error("decode shard {name}: {source}")]
    Decode {
        /// Name of the affected shard.
        name: String,
        /// Underlying decode error.
        #[source]
        source: DecodeError,
    },

    /// Database error. Any in-progress transaction is rolled back.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    /// Point lookup matched no row.
    #[error("page {id}: not found")]
    PageNotFound {
        /// Requested primary key.
        id: String,
    },

    /// The shard manifest file could not be read or parsed.
    #[error("manifest {path:?}: {message}")]
    Manifest {
        /// Path of the manifest file.
        path: PathBuf,
        /// What went wrong while reading or parsing it.
        message: String,
    },
}
