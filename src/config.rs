//! Run configuration and shard manifest handling.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::CorpusError;

/// Default remote location of the dump shards.
pub const DEFAULT_BASE_URL: &str = "https://dumps.wikimedia.org/enwiki/20231020/";

/// Suffix of compressed shard files, both locally and on the remote.
pub const SHARD_EXT: &str = ".bz2";

/// Shards of the 2023-10-20 English Wikipedia dump known to this tool.
pub const DEFAULT_SHARDS: [&str; 6] = [
    "enwiki-20231020-pages-articles1.xml-p1p41242",
    "enwiki-20231020-pages-articles2.xml-p41243p151573",
    "enwiki-20231020-pages-articles3.xml-p151574p311329",
    "enwiki-20231020-pages-articles4.xml-p311330p558391",
    "enwiki-20231020-pages-articles5.xml-p558392p958045",
    "enwiki-20231020-pages-articles6.xml-p958046p1483661",
];

/// Configuration for acquiring and loading a corpus.
///
/// # Example
///
/// ```
/// use wikibench::CorpusConfig;
///
/// let config = CorpusConfig {
///     base_url: "https://dumps.example.org/".to_string(),
///     data_dir: ".".into(),
///     db_path: "wikibench.db".into(),
///     shards: vec!["shard-a".to_string()],
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Base URL the shards are fetched from. Must end with a slash; the
    /// shard name and [`SHARD_EXT`] are appended verbatim.
    pub base_url: String,
    /// Directory searched for local shard files and receiving fetched ones.
    pub data_dir: PathBuf,
    /// Path of the SQLite database the corpus is loaded into.
    pub db_path: PathBuf,
    /// Names of the shards to acquire and load.
    pub shards: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            data_dir: PathBuf::from("."),
            db_path: PathBuf::from("wikibench.db"),
            shards: DEFAULT_SHARDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A JSON shard manifest overriding the built-in shard list.
///
/// Expected shape: `{"shards": ["enwiki-...-p1p41242", ...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Names of the shards to acquire and load.
    pub shards: Vec<String>,
}

impl Manifest {
    /// Reads and parses a manifest file.
    pub fn from_file(path: &Path) -> Result<Self, CorpusError> {
        let content = fs::read_to_string(path).map_err(|err| CorpusError::Manifest {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|err| CorpusError::Manifest {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}
