//! # Brigade Read Scenarios
//!
//! End-to-end tests driving brigades of file buckets the way a consumer
//! would: pull the head, read it, destroy it, repeat.
//!
//! ## Test Coverage
//!
//! 1. Buffered Reads
//!    - Small file below the mapping threshold
//!    - Large file above the mapping limit, drained chunk by chunk
//!    - Unknown length read to end-of-stream
//!    - Sequential drains never seek
//!
//! 2. Mapping Window
//!    - Range inside the window maps once with no split
//!    - Ranges outside the window or with mapping disabled never map
//!    - Tail of a large file maps once it drops under the limit
//!
//! 3. Failure Paths
//!    - Seek failure leaves the bucket and the budget untouched
//!    - Would-block leaves the bucket retryable
//!    - Budget refusal surfaces as out-of-memory
//!    - Zero chunk size is refused without losing the range
//!    - Setaside of a file bucket is refused
//!
//! 4. Structure
//!    - Split identity of the consumer's handle
//!    - Store closed exactly once across copies and splits

mod common;

use std::sync::Arc;

use brigade::{
    Brigade, Bucket, BucketConfig, BucketError, FileStore, Length, MemoryBudget, ReadMode,
    ReadStatus, Scope, SharedRef,
};
use common::{pattern, temp_file, ScriptedStore};

struct Drained {
    bytes: Vec<u8>,
    kinds: Vec<&'static str>,
    lengths: Vec<usize>,
    last_status: Option<ReadStatus>,
}

fn drain(brigade: &mut Brigade) -> Drained {
    let mut drained = Drained {
        bytes: Vec::new(),
        kinds: Vec::new(),
        lengths: Vec::new(),
        last_status: None,
    };

    while let Some(id) = brigade.first() {
        let (data, status) = brigade.read(id, ReadMode::Blocking).unwrap();
        drained.bytes.extend_from_slice(data);
        drained.lengths.push(data.len());
        drained.last_status = Some(status);
        drained.kinds.push(brigade.get(id).unwrap().kind_name());
        brigade.destroy(id).unwrap();
    }
    drained
}

// ============================================================================
// Buffered Reads
// ============================================================================

#[test]
fn small_file_reads_as_one_heap_bucket() {
    let data = pattern(1000);
    let (_dir, path) = temp_file(&data);
    let config = BucketConfig::default()
        .mmap_low_threshold(8 * 1024)
        .buffer_chunk_size(8000);
    let mut brigade = Brigade::with_config(config).unwrap();
    let id = brigade.push_back(Bucket::file(FileStore::open(&path).unwrap(), 0, 1000).unwrap());

    let (view, status) = brigade.read(id, ReadMode::Blocking).unwrap();

    assert_eq!(view, &data[..]);
    assert_eq!(status, ReadStatus::Ready);
    assert_eq!(brigade.len(), 1);
    assert_eq!(brigade.get(id).unwrap().kind_name(), "HEAP");
}

#[test]
fn large_unmappable_file_drains_in_chunks() {
    let data = pattern(5_000_000);
    // ScriptedStore cannot map, so remainders under the limit still buffer
    let (store, _script) = ScriptedStore::new(data.clone());
    let config = BucketConfig::default()
        .mmap_high_limit(4_194_304)
        .buffer_chunk_size(8000)
        .mmap_enabled(true);
    let mut brigade = Brigade::with_config(config).unwrap();
    let head = brigade.push_back(Bucket::file(store, 0, 5_000_000).unwrap());

    let (view, _) = brigade.read(head, ReadMode::Blocking).unwrap();
    assert_eq!(view.len(), 8000);
    let rest = brigade.next(head).unwrap().unwrap();
    let rest = brigade.get(rest).unwrap();
    assert_eq!(rest.kind_name(), "FILE");
    assert_eq!(rest.start(), 8000);
    assert_eq!(rest.length(), Length::Known(4_991_992));

    let drained = drain(&mut brigade);

    assert_eq!(drained.kinds.len(), 625);
    assert!(drained.kinds.iter().all(|kind| *kind == "HEAP"));
    assert!(drained.lengths.iter().all(|len| *len == 8000));
    assert_eq!(drained.bytes.len(), 5_000_000);
    assert!(drained.bytes == data);
    assert_eq!(drained.last_status, Some(ReadStatus::Ready));
}

#[test]
fn unknown_length_reads_until_end_of_stream() {
    let data = pattern(20_000);
    let (store, _script) = ScriptedStore::new(data.clone());
    let mut brigade = Brigade::new();
    brigade.push_back(Bucket::file(store, 0, Length::Unknown).unwrap());

    let drained = drain(&mut brigade);

    assert_eq!(drained.lengths, vec![8000, 8000, 4000]);
    assert_eq!(drained.bytes, data);
    assert_eq!(drained.last_status, Some(ReadStatus::EndOfStream));
}

#[test]
fn unknown_length_on_chunk_boundary_ends_with_empty_read() {
    let (store, _script) = ScriptedStore::new(pattern(16_000));
    let mut brigade = Brigade::new();
    brigade.push_back(Bucket::file(store, 0, Length::Unknown).unwrap());

    let drained = drain(&mut brigade);

    assert_eq!(drained.lengths, vec![8000, 8000, 0]);
    assert_eq!(drained.last_status, Some(ReadStatus::EndOfStream));
}

#[test]
fn sequential_drain_never_seeks() {
    let (store, script) = ScriptedStore::new(pattern(50_000));
    let mut brigade = Brigade::new();
    brigade.push_back(Bucket::file(store, 0, 50_000).unwrap());

    let drained = drain(&mut brigade);

    assert_eq!(drained.bytes.len(), 50_000);
    assert_eq!(script.seeks.get(), 0);
    assert_eq!(script.reads.get(), 7);
    assert_eq!(script.closed.get(), 1);
}

#[test]
fn truncated_source_ends_stream_early() {
    let (store, script) = ScriptedStore::new(pattern(10_000));
    let mut brigade = Brigade::new();
    brigade.push_back(Bucket::file(store, 0, 30_000).unwrap());

    let drained = drain(&mut brigade);

    assert_eq!(drained.lengths, vec![8000, 2000]);
    assert_eq!(drained.last_status, Some(ReadStatus::EndOfStream));
    assert_eq!(script.closed.get(), 1);
}

// ============================================================================
// Mapping Window
// ============================================================================

#[test]
fn range_inside_window_maps_without_split() {
    let data = pattern(64 * 1024);
    let (_dir, path) = temp_file(&data);
    let mut brigade = Brigade::new();
    let id = brigade.push_back(Bucket::file(FileStore::open(&path).unwrap(), 0, 64 * 1024).unwrap());

    let (view, status) = brigade.read(id, ReadMode::Blocking).unwrap();

    assert_eq!(view, &data[..]);
    assert_eq!(status, ReadStatus::Ready);
    assert_eq!(brigade.len(), 1);
    assert_eq!(brigade.get(id).unwrap().kind_name(), "MMAP");
}

#[test]
fn ranges_outside_window_never_map() {
    let data = pattern(64 * 1024);
    let (_dir, path) = temp_file(&data);

    let configs = [
        BucketConfig::default().mmap_low_threshold(128 * 1024).mmap_high_limit(1 << 20),
        BucketConfig::default().mmap_enabled(false),
    ];

    for config in configs {
        let mut brigade = Brigade::with_config(config).unwrap();
        brigade.push_back(Bucket::file(FileStore::open(&path).unwrap(), 0, 64 * 1024).unwrap());

        let drained = drain(&mut brigade);

        assert!(drained.kinds.iter().all(|kind| *kind == "HEAP"), "{:?}", config);
        assert_eq!(drained.bytes, data);
    }
}

#[test]
fn tail_of_large_file_maps_once_under_limit() {
    let data = pattern(5_000_000);
    let (_dir, path) = temp_file(&data);
    let mut brigade = Brigade::new();
    brigade.push_back(Bucket::file(FileStore::open(&path).unwrap(), 0, 5_000_000).unwrap());

    let drained = drain(&mut brigade);

    // 101 chunks bring the rest to 4_192_000, under the 4 MiB limit
    assert_eq!(drained.kinds.len(), 102);
    assert!(drained.kinds[..101].iter().all(|kind| *kind == "HEAP"));
    assert_eq!(drained.kinds[101], "MMAP");
    assert_eq!(drained.lengths[101], 4_192_000);
    assert!(drained.bytes == data);
}

// ============================================================================
// Failure Paths
// ============================================================================

#[test]
fn seek_failure_leaves_bucket_untouched() {
    let budget = Arc::new(MemoryBudget::with_limit(1 << 20));
    let scope = Scope::with_budget("request", Arc::clone(&budget));
    let (store, script) = ScriptedStore::in_scope(pattern(1000), scope);
    let store = store.with_cursor(500);
    script.fail_seek.set(true);

    let mut brigade = Brigade::new();
    let id = brigade.push_back(Bucket::file(store, 0, 1000).unwrap());

    let err = brigade.read(id, ReadMode::Blocking).unwrap_err();

    match err {
        BucketError::Io(io) => assert_eq!(io.to_string(), "scripted seek failure"),
        other => panic!("expected seek error, got {}", other),
    }
    let bucket = brigade.get(id).unwrap();
    assert_eq!(bucket.kind_name(), "FILE");
    assert_eq!(bucket.start(), 0);
    assert_eq!(bucket.length(), Length::Known(1000));
    assert_eq!(brigade.len(), 1);
    assert_eq!(script.reads.get(), 0);
    assert_eq!(budget.stats().peak_used, 0);
    assert_eq!(budget.total_used(), 0);
}

#[test]
fn would_block_is_retryable() {
    let (store, script) = ScriptedStore::new(pattern(100));
    script.would_block.set(true);
    let mut brigade = Brigade::new();
    let id = brigade.push_back(Bucket::file(store, 0, 100).unwrap());

    let err = brigade.read(id, ReadMode::NonBlocking).unwrap_err();
    assert!(err.is_would_block());
    assert_eq!(brigade.get(id).unwrap().kind_name(), "FILE");

    script.would_block.set(false);
    let (view, status) = brigade.read(id, ReadMode::NonBlocking).unwrap();
    assert_eq!(view.len(), 100);
    assert_eq!(status, ReadStatus::Ready);
}

#[test]
fn budget_refusal_is_out_of_memory() {
    let budget = Arc::new(MemoryBudget::with_limit(100));
    let scope = Scope::with_budget("tight", Arc::clone(&budget));
    let (store, script) = ScriptedStore::in_scope(pattern(1000), scope);
    let mut brigade = Brigade::new();
    let id = brigade.push_back(Bucket::file(store, 0, 1000).unwrap());

    let err = brigade.read(id, ReadMode::Blocking).unwrap_err();

    assert!(matches!(
        err,
        BucketError::OutOfMemory {
            requested: 1000,
            available: 100
        }
    ));
    assert_eq!(brigade.get(id).unwrap().kind_name(), "FILE");
    assert_eq!(script.reads.get(), 0);
    assert_eq!(budget.total_used(), 0);

    budget.set_limit(1000);
    brigade.read(id, ReadMode::Blocking).unwrap();
    assert_eq!(budget.total_used(), 1000);

    brigade.destroy(id).unwrap();
    assert_eq!(budget.total_used(), 0);
}

#[test]
fn zero_chunk_size_refused_without_losing_range() {
    let (store, script) = ScriptedStore::new(pattern(100));
    let mut bucket = Bucket::file(store, 0, 100).unwrap();
    let config = BucketConfig::default()
        .mmap_enabled(false)
        .buffer_chunk_size(0);

    let err = bucket.read(&config, ReadMode::Blocking).unwrap_err();

    assert!(matches!(err, BucketError::InvalidConfig { option: "buffer_chunk_size" }));
    assert_eq!(bucket.kind_name(), "FILE");
    assert_eq!(bucket.length(), Length::Known(100));
    assert_eq!(script.reads.get(), 0);
    assert_eq!(script.closed.get(), 0);

    let read = bucket.read(&config.buffer_chunk_size(8000), ReadMode::Blocking).unwrap();
    assert_eq!(read.data.len(), 100);
    assert!(read.remainder.is_none());
}

#[test]
fn setaside_file_bucket_is_refused() {
    let (store, _script) = ScriptedStore::new(pattern(10));
    let mut brigade = Brigade::new();
    let id = brigade.push_back(Bucket::file(store, 2, 8).unwrap());

    let err = brigade.setaside(id, &Scope::new("connection")).unwrap_err();

    assert!(err.is_not_supported());
    assert_eq!(err.to_string(), "setaside is not supported by FILE buckets");
    let bucket = brigade.get(id).unwrap();
    assert_eq!((bucket.start(), bucket.length()), (2, Length::Known(8)));
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn handle_denotes_materialized_head_after_split() {
    let (store, _script) = ScriptedStore::new(pattern(20_000));
    let mut brigade = Brigade::new();
    let before = brigade.push_back(Bucket::heap(b"before".to_vec()));
    let id = brigade.push_back(Bucket::file(store, 0, 20_000).unwrap());

    brigade.read(id, ReadMode::Blocking).unwrap();

    assert_eq!(brigade.prev(id).unwrap(), Some(before));
    let head = brigade.get(id).unwrap();
    assert_eq!(head.kind_name(), "HEAP");
    assert_eq!((head.start(), head.length()), (0, Length::Known(8000)));

    let rest = brigade.next(id).unwrap().unwrap();
    assert_eq!(brigade.get(rest).unwrap().start(), 8000);
    assert_eq!(brigade.last(), Some(rest));
}

#[test]
fn store_closed_once_after_last_alias() {
    let (store, script) = ScriptedStore::new(pattern(3000));
    let shared = SharedRef::new(store);
    let mut brigade = Brigade::new();
    let a = brigade.push_back(Bucket::from_shared(shared.acquire(), 0, 3000).unwrap());
    drop(shared);

    let b = brigade.copy(a).unwrap();
    let c = brigade.split(b, 1000).unwrap();

    brigade.read(a, ReadMode::Blocking).unwrap();
    assert_eq!(script.closed.get(), 0);

    brigade.destroy(c).unwrap();
    assert_eq!(script.closed.get(), 0);

    brigade.read(b, ReadMode::Blocking).unwrap();
    assert_eq!(script.closed.get(), 1);

    brigade.clear();
    assert_eq!(script.closed.get(), 1);
}
