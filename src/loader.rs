//! Transactional, per-shard loading of decoded pages.

use std::io::BufReader;

use indicatif::ProgressBar;
use rusqlite::{params, Connection};
use tracing::debug;
use uuid::Uuid;

use crate::decode::{PageDecoder, RecordSource};
use crate::error::CorpusError;
use crate::shard::Shard;

/// Decodes `shard` and inserts every page it yields.
///
/// The shard is the unit of atomicity: either every record decoded from it
/// commits, or none do. Returns the number of rows committed.
pub fn load_shard(
    conn: &mut Connection,
    shard: Shard,
    bar: &ProgressBar,
) -> Result<usize, CorpusError> {
    let name = shard.name().to_string();
    let decoder = PageDecoder::new(BufReader::new(shard));
    load_records(conn, &name, decoder, bar)
}

/// Drives `source` to exhaustion inside a single transaction.
///
/// Generic over the record source so alternative formats (and failing test
/// doubles) can stand in for the dump decoder. Each record gets a freshly
/// generated id; its timestamp, title and body are carried over verbatim.
/// The bar advances once per inserted record.
pub fn load_records<S: RecordSource>(
    conn: &mut Connection,
    shard_name: &str,
    mut source: S,
    bar: &ProgressBar,
) -> Result<usize, CorpusError> {
    // Dropping an uncommitted transaction rolls it back, so every early
    // return below leaves the table untouched.
    let tx = conn.transaction()?;
    let mut count = 0usize;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO pages (id, updated_at, title, text) VALUES (?1, ?2, ?3, ?4)",
        )?;
        loop {
            let record = source
                .next_record()
                .map_err(|source| CorpusError::Decode {
                    name: shard_name.to_string(),
                    source,
                })?;
            let Some(page) = record else { break };

            stmt.execute(params![
                Uuid::new_v4().to_string(),
                page.updated_at,
                page.title,
                page.text,
            ])?;
            count += 1;
            bar.inc(1);
        }
    }

    tx.commit()?;
    debug!(shard = shard_name, rows = count, "shard committed");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodeError, PageRecord};
    use crate::store::Store;
    use chrono::{TimeZone, Utc};

    /// Yields a fixed number of synthetic records, then optionally fails.
    struct ScriptedSource {
        remaining: usize,
        fail_at_end: bool,
    }

    impl ScriptedSource {
        fn pages(n: usize) -> Self {
            Self {
                remaining: n,
                fail_at_end: false,
            }
        }

        fn failing_after(n: usize) -> Self {
            Self {
                remaining: n,
                fail_at_end: true,
            }
        }
    }

    impl RecordSource for ScriptedSource {
        fn next_record(&mut self) -> Result<Option<PageRecord>, DecodeError> {
            if self.remaining == 0 {
                if self.fail_at_end {
                    return Err(DecodeError::Truncated);
                }
                return Ok(None);
            }
            self.remaining -= 1;
            Ok(Some(PageRecord {
                updated_at: Utc.with_ymd_and_hms(2023, 10, 20, 0, 0, 0).unwrap(),
                title: format!("page {}", self.remaining),
                text: "body".to_string(),
            }))
        }
    }

    #[test]
    fn counts_accumulate_across_shards() {
        let mut store = Store::open_in_memory().expect("open store");
        store.setup().expect("create schema");
        let bar = ProgressBar::hidden();

        let first = load_records(store.connection_mut(), "shard-a", ScriptedSource::pages(3), &bar)
            .expect("load shard-a");
        let second = load_records(store.connection_mut(), "shard-b", ScriptedSource::pages(5), &bar)
            .expect("load shard-b");

        assert_eq!(first, 3);
        assert_eq!(second, 5);
        assert_eq!(store.count().expect("count"), 8);
    }

    #[test]
    fn decode_failure_rolls_back_the_whole_shard() {
        let mut store = Store::open_in_memory().expect("open store");
        store.setup().expect("create schema");
        let bar = ProgressBar::hidden();

        load_records(store.connection_mut(), "good", ScriptedSource::pages(4), &bar)
            .expect("load good shard");
        let before = store.count().expect("count");

        let err = load_records(
            store.connection_mut(),
            "bad",
            ScriptedSource::failing_after(2),
            &bar,
        )
        .expect_err("failing source should abort the shard");

        assert!(matches!(err, CorpusError::Decode { ref name, .. } if name == "bad"));
        assert_eq!(
            store.count().expect("count"),
            before,
            "failed shard must contribute zero rows"
        );
    }

    #[test]
    fn earlier_shards_stay_committed_after_a_failure() {
        let mut store = Store::open_in_memory().expect("open store");
        store.setup().expect("create schema");
        let bar = ProgressBar::hidden();

        load_records(store.connection_mut(), "shard-a", ScriptedSource::pages(3), &bar)
            .expect("load shard-a");
        let _ = load_records(
            store.connection_mut(),
            "shard-b",
            ScriptedSource::failing_after(1),
            &bar,
        );

        assert_eq!(store.count().expect("count"), 3);
    }

    #[test]
    fn every_insert_gets_a_distinct_generated_id() {
        let mut store = Store::open_in_memory().expect("open store");
        store.setup().expect("create schema");
        let bar = ProgressBar::hidden();

        load_records(store.connection_mut(), "shard-a", ScriptedSource::pages(10), &bar)
            .expect("load shard");

        let ids = store.list_ids(None, 100).expect("list ids");
        assert_eq!(ids.len(), 10);
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 10, "generated ids must be unique");
    }
}
