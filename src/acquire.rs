//! Concurrent shard acquisition with per-shard progress reporting.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::CorpusConfig;
use crate::error::CorpusError;
use crate::shard::Shard;

const SHARD_BAR_TEMPLATE: &str =
    "{prefix:>45} {spinner:.cyan} [{bar:25.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec}";

/// Creates the byte-progress bar tracking one shard's acquisition.
fn shard_bar(multi: &MultiProgress, name: &str) -> ProgressBar {
    let bar = multi.add(ProgressBar::new(0));
    bar.set_style(
        ProgressStyle::default_bar()
            .template(SHARD_BAR_TEMPLATE)
            .unwrap()
            .progress_chars("█▓▒░ "),
    );
    bar.set_prefix(name.to_string());
    bar
}

/// Resolves every named shard concurrently, fetching the ones that have no
/// local copy.
///
/// One task runs per shard, reporting through its own progress bar: a local
/// hit shows as instantly complete, a remote fetch grows as bytes arrive.
/// Either every shard resolves or the whole call fails; there is no
/// partial success. On success the shards are sorted by name ascending so
/// downstream loading order is reproducible regardless of completion order.
///
/// The first error wins, but the coordinator still collects one result per
/// task before returning it, so no sender is left blocked. Sibling
/// in-flight fetches are not cancelled; they run to completion into the
/// drained channel.
pub async fn acquire_all(
    config: &CorpusConfig,
    names: &[String],
) -> Result<Vec<Shard>, CorpusError> {
    let multi = MultiProgress::new();
    let client = reqwest::Client::new();
    let (tx, mut rx) = mpsc::channel(names.len().max(1));

    for name in names {
        let bar = shard_bar(&multi, name);
        let tx = tx.clone();
        let client = client.clone();
        let config = config.clone();
        let name = name.clone();

        tokio::spawn(async move {
            let result = acquire_one(&client, &config, &name, &bar).await;
            bar.finish();
            // The channel capacity matches the task count; send cannot block.
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut shards = Vec::with_capacity(names.len());
    let mut first_err = None;
    for _ in 0..names.len() {
        match rx.recv().await {
            Some(Ok(shard)) => shards.push(shard),
            Some(Err(err)) => {
                warn!(error = %err, "shard acquisition failed");
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
            None => break,
        }
    }
    if let Some(err) = first_err {
        return Err(err);
    }

    shards.sort_by(|a, b| a.name().cmp(b.name()));
    info!(count = shards.len(), "all shards acquired");
    Ok(shards)
}

/// Resolves one shard, fetching it when no local copy exists.
async fn acquire_one(
    client: &reqwest::Client,
    config: &CorpusConfig,
    name: &str,
    bar: &ProgressBar,
) -> Result<Shard, CorpusError> {
    match Shard::resolve(&config.data_dir, name) {
        Ok(shard) => {
            // Local hit: seed the bar with the known size so it displays
            // as complete right away.
            bar.set_length(shard.size());
            bar.inc(shard.size());
            Ok(shard)
        }
        Err(CorpusError::NotFound { .. }) => {
            info!(shard = name, "no local copy, falling back to fetch");
            Shard::fetch(client, config, name, bar).await
        }
        Err(err) => Err(err),
    }
}
