//! End-to-end pipeline tests: compressed XML fixtures through resolution,
//! decoding, transactional load and the keyset read path.

use std::io::Write;
use std::path::Path;

use bzip2::write::BzEncoder;
use bzip2::Compression;
use indicatif::ProgressBar;
use tempfile::TempDir;

use wikibench::{load_shard, CorpusError, Shard, Store};

/// Renders a minimal dump document with `count` pages.
fn dump_document(prefix: &str, count: usize) -> String {
    let mut doc = String::from("<mediawiki>\n");
    for i in 0..count {
        doc.push_str(&format!(
            "  <page>\n    <title>{prefix} {i}</title>\n    <revision>\n      \
             <timestamp>2023-10-20T08:0{}:00Z</timestamp>\n      \
             <text xml:space=\"preserve\">Body of {prefix} {i}.</text>\n    \
             </revision>\n  </page>\n",
            i % 10
        ));
    }
    doc.push_str("</mediawiki>\n");
    doc
}

fn write_shard(dir: &Path, name: &str, document: &str) {
    let file = std::fs::File::create(dir.join(format!("{name}.bz2"))).expect("create shard file");
    let mut encoder = BzEncoder::new(file, Compression::default());
    encoder
        .write_all(document.as_bytes())
        .expect("compress shard");
    encoder.finish().expect("finish shard");
}

#[test]
fn loads_every_page_of_every_shard() {
    let dir = TempDir::new().expect("create temp dir");
    write_shard(dir.path(), "shard-a", &dump_document("Alpha", 3));
    write_shard(dir.path(), "shard-b", &dump_document("Bravo", 5));

    let mut store = Store::open_in_memory().expect("open store");
    store.setup().expect("create schema");
    let bar = ProgressBar::hidden();

    let shard_a = Shard::resolve(dir.path(), "shard-a").expect("resolve shard-a");
    let shard_b = Shard::resolve(dir.path(), "shard-b").expect("resolve shard-b");

    assert_eq!(
        load_shard(store.connection_mut(), shard_a, &bar).expect("load shard-a"),
        3
    );
    assert_eq!(
        load_shard(store.connection_mut(), shard_b, &bar).expect("load shard-b"),
        5
    );
    assert_eq!(store.count().expect("count"), 8);
}

#[test]
fn loaded_pages_survive_the_read_path_round_trip() {
    let dir = TempDir::new().expect("create temp dir");
    write_shard(dir.path(), "shard-a", &dump_document("Reading", 7));

    let mut store = Store::open_in_memory().expect("open store");
    store.setup().expect("create schema");
    let shard = Shard::resolve(dir.path(), "shard-a").expect("resolve shard");
    load_shard(store.connection_mut(), shard, &ProgressBar::hidden()).expect("load shard");

    // Page through everything keyset-style and point-look-up each id.
    let mut seen = 0usize;
    let mut cursor: Option<String> = None;
    loop {
        let ids = store.list_ids(cursor.as_deref(), 3).expect("list ids");
        for id in &ids {
            let page = store.get(id).expect("get listed page");
            assert_eq!(&page.id, id);
            assert!(page.title.starts_with("Reading"));
            assert!(page.text.starts_with("Body of Reading"));
        }
        seen += ids.len();
        if ids.len() < 3 {
            break;
        }
        cursor = ids.last().cloned();
    }
    assert_eq!(seen, 7);
}

#[test]
fn malformed_shard_contributes_zero_rows() {
    let dir = TempDir::new().expect("create temp dir");
    // A page that never closes: decoding fails mid-shard.
    let broken = "<mediawiki>\n  <page>\n    <title>Broken</title>\n";
    write_shard(dir.path(), "shard-x", broken);

    let mut store = Store::open_in_memory().expect("open store");
    store.setup().expect("create schema");
    let shard = Shard::resolve(dir.path(), "shard-x").expect("resolve shard");

    let err = load_shard(store.connection_mut(), shard, &ProgressBar::hidden())
        .expect_err("truncated shard should fail");
    assert!(matches!(err, CorpusError::Decode { ref name, .. } if name == "shard-x"));
    assert_eq!(store.count().expect("count"), 0);
}
