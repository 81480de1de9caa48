//! Shard resolution: local files first, remote fetch as the fallback.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use bzip2::read::MultiBzDecoder;
use futures_util::StreamExt;
use indicatif::ProgressBar;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::config::{CorpusConfig, SHARD_EXT};
use crate::error::CorpusError;

/// One named, independently fetchable unit of the corpus.
///
/// A shard owns its backing file exclusively and exposes only the
/// decompressed byte stream, never the raw compressed bytes. The stream is
/// forward-only and consumed at most once.
pub struct Shard {
    name: String,
    size: u64,
    reader: Box<dyn Read + Send>,
}

impl Shard {
    /// Resolves a shard from local disk.
    ///
    /// Tries, in order: `dir/name` as an already-decompressed file, then
    /// `dir/name.bz2` through the streaming decompressor. Returns
    /// [`CorpusError::NotFound`] when neither path exists; any other open
    /// error is fatal for the shard.
    pub fn resolve(dir: &Path, name: &str) -> Result<Self, CorpusError> {
        let plain = dir.join(name);
        match File::open(&plain) {
            Ok(file) => {
                let size = file_size(name, &file)?;
                debug!(shard = name, size, "resolved uncompressed file");
                return Ok(Self {
                    name: name.to_string(),
                    size,
                    reader: Box::new(BufReader::new(file)),
                });
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(CorpusError::Io {
                    name: name.to_string(),
                    source,
                })
            }
        }

        let compressed = dir.join(format!("{name}{SHARD_EXT}"));
        match File::open(&compressed) {
            Ok(file) => {
                debug!(shard = name, "resolved compressed file");
                Self::from_compressed(name, file)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(CorpusError::NotFound {
                name: name.to_string(),
            }),
            Err(source) => Err(CorpusError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Fetches a shard from the remote source and persists a local copy.
    ///
    /// Performs a single GET of `{base_url}{name}.bz2` and streams the body
    /// into `data_dir/name.bz2`, seeding the progress bar length from
    /// Content-Length when the server provides it and advancing the bar as
    /// bytes arrive. The finished file is then re-opened through the same
    /// decompression path as [`Shard::resolve`].
    ///
    /// There is no retry: a failed request is terminal for the shard, and a
    /// partially written local file is left behind.
    pub async fn fetch(
        client: &reqwest::Client,
        config: &CorpusConfig,
        name: &str,
        bar: &ProgressBar,
    ) -> Result<Self, CorpusError> {
        let url = format!("{}{}{}", config.base_url, name, SHARD_EXT);
        info!(shard = name, url = %url, "fetching shard");

        let response = client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| CorpusError::Fetch {
                name: name.to_string(),
                source,
            })?;
        if let Some(total) = response.content_length() {
            bar.set_length(total);
        }

        let path = config.data_dir.join(format!("{name}{SHARD_EXT}"));
        let mut file = BufWriter::new(
            tokio::fs::File::create(&path)
                .await
                .map_err(|source| CorpusError::Io {
                    name: name.to_string(),
                    source,
                })?,
        );

        let mut stream = response.bytes_stream();
        while let Some(piece) = stream.next().await {
            let chunk = piece.map_err(|source| CorpusError::Fetch {
                name: name.to_string(),
                source,
            })?;
            file.write_all(&chunk)
                .await
                .map_err(|source| CorpusError::Io {
                    name: name.to_string(),
                    source,
                })?;
            bar.inc(chunk.len() as u64);
        }
        file.flush().await.map_err(|source| CorpusError::Io {
            name: name.to_string(),
            source,
        })?;
        drop(file);

        // Re-open through the same decompression path as a local resolve.
        let file = File::open(&path).map_err(|source| CorpusError::Io {
            name: name.to_string(),
            source,
        })?;
        Self::from_compressed(name, file)
    }

    /// Wraps an open compressed file in the streaming decompressor.
    fn from_compressed(name: &str, file: File) -> Result<Self, CorpusError> {
        let size = file_size(name, &file)?;
        Ok(Self {
            name: name.to_string(),
            size,
            reader: Box::new(MultiBzDecoder::new(BufReader::new(file))),
        })
    }

    /// Name of the shard.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte size of the backing file on disk.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Releases the underlying file.
    ///
    /// Consuming `self` makes a double close unrepresentable; dropping an
    /// unconsumed shard releases the file just the same.
    pub fn close(self) {}
}

impl Read for Shard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

fn file_size(name: &str, file: &File) -> Result<u64, CorpusError> {
    let metadata = file.metadata().map_err(|source| CorpusError::Io {
        name: name.to_string(),
        source,
    })?;
    Ok(metadata.len())
}
