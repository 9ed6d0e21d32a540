//! Build Round-Trip Tests
//!
//! Builds small databases through the public builder API and reads them
//! back through `NodeTable`:
//! - record layout of every node kind
//! - integer inlining and the store each overflow value lands in
//! - patch replay idempotence
//! - capacity failures leave nothing on disk
//! - checksum verification catches tampering
//! - random event sequences read back exactly as they were written

use std::fs;

use proptest::prelude::*;
use tempfile::TempDir;
use xmlstore::build::{Builder, LeafKind};
use xmlstore::config::BuildConfig;
use xmlstore::storage::{
    DbLayout, NodeKind, NodeRecord, Stream, StorageErrorCode, ValueRef, INLINE_FLAG,
    RECORD_SIZE, VALUE_OFFSET,
};

// =============================================================================
// Test Utilities
// =============================================================================

fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn test_config(temp_dir: &TempDir) -> BuildConfig {
    BuildConfig {
        sync_on_finish: false,
        ..BuildConfig::with_root(temp_dir.path())
    }
}

fn read_u40(record: &[u8]) -> u64 {
    record[VALUE_OFFSET..VALUE_OFFSET + 5]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Document with one element holding attribute `a="abc"` and text `42`.
fn build_small(config: &BuildConfig, name: &str) -> xmlstore::build::Finished {
    let mut builder = Builder::create(config, name, 64).unwrap();
    let doc = builder.begin_document(b"small.xml").unwrap();
    let root = builder.begin_element(0, 0, 1, 1, false).unwrap();
    builder.begin_attribute(0, 0, b"abc", 1).unwrap();
    builder.add_text_like(LeafKind::Text, b"42", 2).unwrap();
    builder.request_size_patch(root, 3).unwrap();
    builder.request_size_patch(doc, 4).unwrap();
    builder.finish().unwrap()
}

// =============================================================================
// Record Layout
// =============================================================================

#[test]
fn test_inlined_text_and_overflow_attribute() {
    let temp_dir = create_temp_data_dir();
    let finished = build_small(&test_config(&temp_dir), "small");
    let mut table = finished.open().unwrap();

    assert_eq!(table.len(), 4);
    assert_eq!(table.kind(0).unwrap(), NodeKind::Document);
    assert_eq!(table.record(0).unwrap().size(), 4);
    assert_eq!(table.record(1).unwrap().size(), 3);

    let text = table.record(3).unwrap();
    assert_eq!(text.kind(), NodeKind::Text);
    assert_eq!(text.value(), Some(ValueRef::Inline(42)));
    assert_eq!(text.dist(), 2);

    let attr = table.record(2).unwrap();
    assert_eq!(attr.kind(), NodeKind::Attribute);
    match attr.value() {
        Some(ValueRef::Offset(_)) => {}
        other => panic!("attribute value should live in the value store, got {:?}", other),
    }
    assert_eq!(table.value(2).unwrap().unwrap(), b"abc");
    assert_eq!(table.value(1).unwrap(), None);
}

#[test]
fn test_inline_flag_is_visible_in_raw_bytes() {
    let temp_dir = create_temp_data_dir();
    let finished = build_small(&test_config(&temp_dir), "raw");
    let bytes = fs::read(finished.layout().path(Stream::Table)).unwrap();
    assert_eq!(bytes.len(), 4 * RECORD_SIZE);

    let text = &bytes[3 * RECORD_SIZE..4 * RECORD_SIZE];
    let field = read_u40(text);
    assert_ne!(field & INLINE_FLAG, 0);
    assert_eq!(field & 0xFFFF_FFFF, 42);

    let attr = &bytes[2 * RECORD_SIZE..3 * RECORD_SIZE];
    assert_eq!(read_u40(attr) & INLINE_FLAG, 0);
}

#[test]
fn test_every_node_kind_round_trips() {
    let temp_dir = create_temp_data_dir();
    let config = test_config(&temp_dir);
    let long_text = "x".repeat(10_000);

    let mut builder = Builder::create(&config, "kinds", 0).unwrap();
    let doc = builder.begin_document(b"kinds.xml").unwrap();
    let root = builder.begin_element(3, 2, 1, 2, true).unwrap();
    builder.begin_attribute(7, 2, b"-17", 1).unwrap();
    builder.begin_attribute(4095, 0, b"3.5", 2).unwrap();
    builder.add_text_like(LeafKind::Text, long_text.as_bytes(), 3).unwrap();
    builder.add_text_like(LeafKind::Comment, b" note ", 4).unwrap();
    builder
        .add_text_like(LeafKind::ProcessingInstruction, b"pi data", 5)
        .unwrap();
    builder.add_text_like(LeafKind::Text, b"2147483647", 6).unwrap();
    builder.add_text_like(LeafKind::Text, b"2147483648", 7).unwrap();
    builder.add_text_like(LeafKind::Text, b"007", 8).unwrap();
    builder.request_size_patch(root, 9).unwrap();
    builder.request_size_patch(doc, 10).unwrap();
    let finished = builder.finish().unwrap();

    let mut table = finished.open().unwrap();
    assert_eq!(table.len(), 10);

    match table.record(root).unwrap() {
        NodeRecord::Element {
            name,
            attr_size,
            dist,
            size,
            ..
        } => {
            assert_eq!(name.name_id, 3);
            assert_eq!(name.ns_id, 2);
            assert!(name.has_namespaces);
            assert_eq!(attr_size, 3);
            assert_eq!(dist, 1);
            assert_eq!(size, 9);
        }
        other => panic!("expected element, got {:?}", other),
    }

    let attr = table.record(2).unwrap();
    assert_eq!(attr.value(), Some(ValueRef::Inline(-17)));
    assert_eq!(attr.name().unwrap().ns_id, 2);
    assert_eq!(table.record(3).unwrap().name().unwrap().name_id, 4095);
    assert_eq!(table.value(3).unwrap().unwrap(), b"3.5");

    assert_eq!(table.value(4).unwrap().unwrap(), long_text.as_bytes());
    assert_eq!(table.kind(5).unwrap(), NodeKind::Comment);
    assert_eq!(table.value(5).unwrap().unwrap(), b" note ");
    assert_eq!(table.kind(6).unwrap(), NodeKind::ProcessingInstruction);
    assert_eq!(table.value(6).unwrap().unwrap(), b"pi data");

    assert_eq!(
        table.record(7).unwrap().value(),
        Some(ValueRef::Inline(i32::MAX))
    );
    // out of range and non-canonical integers are stored verbatim
    assert!(matches!(table.record(8).unwrap().value(), Some(ValueRef::Offset(_))));
    assert_eq!(table.value(8).unwrap().unwrap(), b"2147483648");
    assert!(matches!(table.record(9).unwrap().value(), Some(ValueRef::Offset(_))));
    assert_eq!(table.value(9).unwrap().unwrap(), b"007");

    let meta = finished.meta();
    assert_eq!(meta.size, 10);
    assert_eq!(meta.element_names, 4);
    assert_eq!(meta.attribute_names, 4096);
    assert_eq!(meta.namespaces, 3);
    table.verify().unwrap();
}

#[test]
fn test_attribute_and_text_overflow_use_separate_stores() {
    let temp_dir = create_temp_data_dir();
    let config = test_config(&temp_dir);

    let mut builder = Builder::create(&config, "stores", 0).unwrap();
    builder.begin_document(b"").unwrap();
    builder.begin_element(0, 0, 1, 1, false).unwrap();
    builder.begin_attribute(0, 0, b"attr-value", 1).unwrap();
    builder.add_text_like(LeafKind::Text, b"text-value", 2).unwrap();
    let finished = builder.finish().unwrap();

    let layout = finished.layout();
    let texts = fs::read(layout.path(Stream::Texts)).unwrap();
    let values = fs::read(layout.path(Stream::Values)).unwrap();
    let contains = |hay: &[u8], needle: &[u8]| hay.windows(needle.len()).any(|w| w == needle);

    assert!(contains(&values, b"attr-value"));
    assert!(!contains(&texts, b"attr-value"));
    assert!(contains(&texts, b"text-value"));
    assert!(!contains(&values, b"text-value"));
}

// =============================================================================
// Patch Replay
// =============================================================================

#[test]
fn test_replaying_patches_twice_matches_single_replay() {
    let temp_dir = create_temp_data_dir();
    let config = test_config(&temp_dir);

    let events = |builder: &mut Builder| {
        let doc = builder.begin_document(b"p.xml").unwrap();
        let root = builder.begin_element(1, 0, 1, 1, false).unwrap();
        let attr = builder.begin_attribute(2, 0, b"old", 1).unwrap();
        let child = builder.begin_element(3, 0, 2, 0, false).unwrap();
        builder.add_text_like(LeafKind::Text, b"leaf", 1).unwrap();
        builder.request_size_patch(child, 2).unwrap();
        builder.request_value_patch(attr, b"new value").unwrap();
        builder.request_size_patch(root, 4).unwrap();
        builder.request_size_patch(doc, 5).unwrap();
    };

    let mut once = Builder::create(&config, "once", 0).unwrap();
    events(&mut once);
    let once = once.finish().unwrap();

    let mut twice = Builder::create(&config, "twice", 0).unwrap();
    events(&mut twice);
    let closed = twice.close().unwrap();
    assert_eq!(closed.patch_count(), 4);
    let mut reconciler = closed.reconcile().unwrap();
    assert_eq!(reconciler.replay().unwrap(), 4);
    assert_eq!(reconciler.replay().unwrap(), 4);
    assert_eq!(reconciler.replays(), 2);
    let twice = reconciler.finish().unwrap();

    let once_bytes = fs::read(once.layout().path(Stream::Table)).unwrap();
    let twice_bytes = fs::read(twice.layout().path(Stream::Table)).unwrap();
    assert_eq!(once_bytes, twice_bytes);

    let mut table = twice.open().unwrap();
    assert_eq!(table.value(2).unwrap().unwrap(), b"new value");
    assert_eq!(table.record(3).unwrap().size(), 2);
}

#[test]
fn test_unpatched_sizes_keep_initial_values() {
    let temp_dir = create_temp_data_dir();
    let config = test_config(&temp_dir);

    let mut builder = Builder::create(&config, "unpatched", 0).unwrap();
    builder.begin_document(b"u").unwrap();
    builder.begin_element(0, 0, 1, 2, false).unwrap();
    let finished = builder.finish().unwrap();

    let mut table = finished.open().unwrap();
    assert_eq!(table.record(0).unwrap().size(), 1);
    assert_eq!(table.record(1).unwrap().size(), 3);
    assert_eq!(finished.stats().size_patches, 0);
}

// =============================================================================
// Failure Handling
// =============================================================================

#[test]
fn test_too_many_element_names_fails_without_leftovers() {
    let temp_dir = create_temp_data_dir();
    let config = test_config(&temp_dir);

    let mut builder = Builder::create(&config, "crowded", 0).unwrap();
    builder.begin_document(b"c").unwrap();
    for name_id in 0..=2048u16 {
        builder.begin_element(name_id, 0, 1, 0, false).unwrap();
    }
    let layout = builder.layout().clone();

    let err = builder.finish().unwrap_err();
    assert_eq!(err.code(), StorageErrorCode::XsCapacityExceeded);
    assert!(!layout.exists());
    assert!(!layout.path(Stream::Table).exists());
}

#[test]
fn test_too_many_namespaces_fails() {
    let temp_dir = create_temp_data_dir();
    let config = test_config(&temp_dir);

    let mut builder = Builder::create(&config, "ns", 0).unwrap();
    builder.begin_document(b"n").unwrap();
    builder.begin_element(0, 16, 1, 0, true).unwrap();

    let err = builder.finish().unwrap_err();
    assert_eq!(err.code(), StorageErrorCode::XsCapacityExceeded);
}

#[test]
fn test_rebuild_replaces_existing_database() {
    let temp_dir = create_temp_data_dir();
    let config = test_config(&temp_dir);
    build_small(&config, "again");

    let mut builder = Builder::create(&config, "again", 0).unwrap();
    builder.begin_document(b"second").unwrap();
    let finished = builder.finish().unwrap();

    let mut table = finished.open().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.value(0).unwrap().unwrap(), b"second");
}

#[test]
fn test_checksum_detects_flipped_byte() {
    let temp_dir = create_temp_data_dir();
    let finished = build_small(&test_config(&temp_dir), "tamper");
    finished.open().unwrap().verify().unwrap();

    let path = finished.layout().path(Stream::Table);
    let mut bytes = fs::read(&path).unwrap();
    bytes[RECORD_SIZE + 9] ^= 0x01;
    fs::write(&path, bytes).unwrap();

    let err = finished.open().unwrap().verify().unwrap_err();
    assert_eq!(err.code(), StorageErrorCode::XsDataCorruption);
    assert!(err.to_string().contains("checksum"));
}

#[test]
fn test_truncated_table_rejected_on_open() {
    let temp_dir = create_temp_data_dir();
    let finished = build_small(&test_config(&temp_dir), "short");

    let path = finished.layout().path(Stream::Table);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - RECORD_SIZE]).unwrap();

    let layout = DbLayout::new(temp_dir.path(), "short").unwrap();
    assert!(xmlstore::storage::NodeTable::open(&layout).is_err());
}

// =============================================================================
// Random Event Sequences
// =============================================================================

#[derive(Clone, Debug)]
enum Event {
    Element {
        name_id: u16,
        ns_id: u8,
        dist: u32,
        attr_count: u32,
        has_namespaces: bool,
    },
    Attribute {
        name_id: u16,
        ns_id: u8,
        value: Vec<u8>,
        dist: u32,
    },
    Leaf {
        kind: LeafKind,
        value: Vec<u8>,
        dist: u32,
    },
}

fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        any::<i32>().prop_map(|v| v.to_string().into_bytes()),
        prop::sample::select(vec![
            "007", "+1", "-0", " 1", "1 ", "", "-", "2147483648", "-2147483649", "0x10", "1e3",
        ])
        .prop_map(|v| v.as_bytes().to_vec()),
        prop::collection::vec(any::<u8>(), 0..48),
    ]
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        (0u16..2048, 0u8..16, any::<u32>(), 0u32..255, any::<bool>()).prop_map(
            |(name_id, ns_id, dist, attr_count, has_namespaces)| Event::Element {
                name_id,
                ns_id,
                dist,
                attr_count,
                has_namespaces,
            }
        ),
        (0u16..4096, 0u8..16, value_strategy(), any::<u32>()).prop_map(
            |(name_id, ns_id, value, dist)| Event::Attribute {
                name_id,
                ns_id,
                value,
                dist,
            }
        ),
        (
            prop::sample::select(vec![
                LeafKind::Text,
                LeafKind::Comment,
                LeafKind::ProcessingInstruction,
            ]),
            value_strategy(),
            any::<u32>(),
        )
            .prop_map(|(kind, value, dist)| Event::Leaf { kind, value, dist }),
    ]
}

/// Canonical decimal `i32`, decided independently of the builder.
fn expect_inline(value: &[u8]) -> Option<i32> {
    let text = std::str::from_utf8(value).ok()?;
    let parsed: i32 = text.parse().ok()?;
    (parsed.to_string() == text).then_some(parsed)
}

fn check_value(
    table: &mut xmlstore::storage::NodeTable,
    record: &NodeRecord,
    value: &[u8],
) -> Result<(), TestCaseError> {
    let rank = record.rank();
    match (expect_inline(value), record.value()) {
        (Some(v), Some(ValueRef::Inline(stored))) => prop_assert_eq!(v, stored),
        (None, Some(ValueRef::Offset(_))) => {}
        (expected, stored) => {
            return Err(TestCaseError::fail(format!(
                "rank {}: value {:?} expected inline {:?}, stored {:?}",
                rank, value, expected, stored
            )))
        }
    }
    prop_assert_eq!(table.value(rank).unwrap(), Some(value.to_vec()));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn random_event_sequences_round_trip(
        doc_name in value_strategy(),
        events in prop::collection::vec(event_strategy(), 0..40),
    ) {
        let temp_dir = create_temp_data_dir();
        let config = test_config(&temp_dir);

        let mut builder = Builder::create(&config, "random", 0).unwrap();
        builder.begin_document(&doc_name).unwrap();
        for event in &events {
            match event {
                Event::Element { name_id, ns_id, dist, attr_count, has_namespaces } => {
                    builder
                        .begin_element(*name_id, *ns_id, *dist, *attr_count, *has_namespaces)
                        .unwrap();
                }
                Event::Attribute { name_id, ns_id, value, dist } => {
                    builder.begin_attribute(*name_id, *ns_id, value, *dist).unwrap();
                }
                Event::Leaf { kind, value, dist } => {
                    builder.add_text_like(*kind, value, *dist).unwrap();
                }
            }
        }
        let finished = builder.finish().unwrap();
        let mut table = finished.open().unwrap();
        prop_assert_eq!(table.len() as usize, events.len() + 1);

        let doc = table.record(0).unwrap();
        prop_assert_eq!(doc.kind(), NodeKind::Document);
        check_value(&mut table, &doc, &doc_name)?;

        for (i, event) in events.iter().enumerate() {
            let rank = i as u32 + 1;
            let record = table.record(rank).unwrap();
            prop_assert_eq!(record.rank(), rank);
            match event {
                Event::Element { name_id, ns_id, dist, attr_count, has_namespaces } => {
                    prop_assert_eq!(record.kind(), NodeKind::Element);
                    let name = record.name().unwrap();
                    prop_assert_eq!(name.name_id, *name_id);
                    prop_assert_eq!(name.ns_id, *ns_id);
                    prop_assert_eq!(name.has_namespaces, *has_namespaces);
                    prop_assert_eq!(record.dist(), *dist);
                    prop_assert_eq!(record.size(), attr_count + 1);
                    prop_assert_eq!(table.value(rank).unwrap(), None);
                }
                Event::Attribute { name_id, ns_id, value, dist } => {
                    prop_assert_eq!(record.kind(), NodeKind::Attribute);
                    let name = record.name().unwrap();
                    prop_assert_eq!(name.name_id, *name_id);
                    prop_assert_eq!(name.ns_id, *ns_id);
                    prop_assert_eq!(record.dist(), *dist);
                    check_value(&mut table, &record, value)?;
                }
                Event::Leaf { kind, value, dist } => {
                    prop_assert_eq!(record.kind(), NodeKind::from(*kind));
                    prop_assert_eq!(record.dist(), *dist);
                    check_value(&mut table, &record, value)?;
                }
            }
        }
        table.verify().unwrap();
    }
}

