//! wikibench - load Wikipedia dump shards into SQLite and benchmark keyset reads
//!
//! This library acquires the multi-part, bzip2-compressed Wikipedia dump,
//! loads it into a relational store, and exposes the read path the bundled
//! benchmarks measure.
//!
//! # Features
//!
//! - **Local-first acquisition**: shards already on disk are reused; only
//!   missing ones are fetched
//! - **Concurrent fetches**: one worker per shard with live byte progress
//! - **Streaming decode**: dump bytes flow file → decompressor → decoder
//!   without buffering a shard in memory
//! - **Per-shard atomicity**: each shard loads in a single transaction,
//!   so all of its pages commit or none do
//! - **Keyset pagination**: forward-only cursor reads ordered by primary key
//!
//! # Example
//!
//! ```no_run
//! use wikibench::{acquire_all, load_shard, CorpusConfig, Store};
//!
//! # async fn example() -> Result<(), wikibench::CorpusError> {
//! let config = CorpusConfig::default();
//! let shards = acquire_all(&config, &config.shards).await?;
//!
//! let mut store = Store::open(&config.db_path)?;
//! store.setup()?;
//! for shard in shards {
//!     let bar = indicatif::ProgressBar::hidden();
//!     load_shard(store.connection_mut(), shard, &bar)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod acquire;
pub mod config;
pub mod decode;
pub mod error;
pub mod loader;
pub mod shard;
pub mod store;

pub use acquire::acquire_all;
pub use config::{CorpusConfig, Manifest};
pub use decode::{DecodeError, PageDecoder, PageRecord, RecordSource};
pub use error::CorpusError;
pub use loader::{load_records, load_shard};
pub use shard::Shard;
pub use store::{Page, Store};
