use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use crate::engine::core::column::{Block, Column, DataType, Value};
use crate::engine::core::compression::METHOD_NONE;
use crate::engine::core::io::{ReadInstrumentation, ReadObserver, ReadProfile};
use crate::engine::core::mark::{MarkRange, load_marks};
use crate::engine::core::part::{BrokenPartReporter, DataPart, StorageContext};
use crate::engine::core::read::cache::{LruMarkCache, LruUncompressedCache};
use crate::engine::core::read::{PartReader, ReaderCaches, ReaderSettings};
use crate::engine::errors::{ConfigError, LogicError, PartReadError};
use crate::logging::init_for_tests;
use crate::test_helpers::factory::Factory;

const GRANULARITY: usize = 8;
const ROWS: usize = 57;

fn storage_for(part: &DataPart, granularity: usize) -> Arc<StorageContext> {
    Arc::new(StorageContext::new(granularity, part.columns.clone()))
}

fn open_reader(
    part: &Arc<DataPart>,
    storage: &Arc<StorageContext>,
    names: &[&str],
    ranges: &[MarkRange],
    caches: ReaderCaches,
    settings: &ReaderSettings,
) -> PartReader {
    let columns = storage.resolve_columns(names).unwrap();
    PartReader::new(
        Arc::clone(part),
        columns,
        caches,
        Arc::clone(storage),
        ranges,
        settings,
        ReadInstrumentation::default(),
    )
    .unwrap()
}

fn open_plain(
    part: &Arc<DataPart>,
    storage: &Arc<StorageContext>,
    names: &[&str],
    ranges: &[MarkRange],
) -> PartReader {
    let settings = ReaderSettings::default();
    open_reader(part, storage, names, ranges, ReaderCaches::none(), &settings)
}

fn read_all(reader: &mut PartReader, ranges: &[MarkRange]) -> Block {
    let mut block = Block::new();
    for range in ranges {
        reader.read_range(range.begin, range.end, &mut block).unwrap();
    }
    block
}

fn values(block: &Block, name: &str) -> Vec<Value> {
    let column = &block.get(name).expect("column present").column;
    (0..column.len()).map(|i| column.value_at(i).unwrap()).collect()
}

fn sizes(rows: usize, modulo: usize) -> Vec<u64> {
    (0..rows).map(|i| (i % modulo) as u64).collect()
}

fn write_rich_part(dir: &Path) -> Arc<DataPart> {
    let x = Column::from((0..ROWS as u64).map(|i| i * 3).collect::<Vec<_>>());
    let s = Column::strings((0..ROWS).map(|i| format!("s{}", "x".repeat(i % 7))));

    let a_sizes = sizes(ROWS, 4);
    let mut null_map = Vec::new();
    let mut texts = Vec::new();
    for (i, size) in a_sizes.iter().enumerate() {
        for j in 0..*size as usize {
            let is_null = (i + j) % 3 == 0;
            null_map.push(is_null as u8);
            texts.push(if is_null { String::new() } else { format!("v{i}_{j}") });
        }
    }
    let a = Column::arrays(
        &a_sizes,
        Column::Nullable {
            null_map,
            nested: Box::new(Column::strings(texts)),
        },
    );

    let t = Column::Tuple(vec![
        Column::from((0..ROWS as i32).map(|i| i - 20).collect::<Vec<_>>()),
        Column::FixedString {
            n: 3,
            chars: (0..ROWS)
                .flat_map(|i| [b'a' + (i % 26) as u8, b'b', b'c'])
                .collect(),
        },
    ]);

    let n_sizes = sizes(ROWS, 3);
    let mut n_a = Vec::new();
    let mut n_b = Vec::new();
    for (i, size) in n_sizes.iter().enumerate() {
        for j in 0..*size as usize {
            n_a.push((i * 10 + j) as u16);
            n_b.push(format!("{i}-{j}"));
        }
    }

    Factory::part_writer()
        .with_dir(dir)
        .with_granularity(GRANULARITY)
        .with_max_block_size(100)
        .with_column("x", DataType::UInt64, x)
        .with_column("s", DataType::String, s)
        .with_column("a", "Array(Nullable(String))".parse().unwrap(), a)
        .with_column("t", "Tuple(Int32, FixedString(3))".parse().unwrap(), t)
        .with_column(
            "n.a",
            DataType::array(DataType::UInt16),
            Column::arrays(&n_sizes, Column::from(n_a)),
        )
        .with_column(
            "n.b",
            DataType::array(DataType::String),
            Column::arrays(&n_sizes, Column::strings(n_b)),
        )
        .create()
}

const RICH_COLUMNS: [&str; 6] = ["x", "s", "a", "t", "n.a", "n.b"];

fn per_mark(marks_count: usize) -> Vec<MarkRange> {
    (0..marks_count).map(|m| MarkRange::new(m, m + 1)).collect()
}

fn random_chunks(marks_count: usize, seed: u64) -> Vec<MarkRange> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ranges = Vec::new();
    let mut begin = 0;
    while begin < marks_count {
        let end = (begin + rng.gen_range(1..=3)).min(marks_count);
        ranges.push(MarkRange::new(begin, end));
        begin = end;
    }
    ranges
}

#[test]
fn reads_a_range_then_appends_the_next() {
    init_for_tests();
    let dir = tempdir().unwrap();
    let part = Factory::part_writer()
        .with_dir(dir.path())
        .with_granularity(10)
        .with_column("x", DataType::UInt8, Column::from((0..40u8).collect::<Vec<_>>()))
        .create();
    assert_eq!(part.marks_count, 4);
    let marks = load_marks(&dir.path().join("x.mrk"), 4).unwrap();
    let offsets: Vec<u64> = marks.iter().map(|m| m.offset_in_decompressed_block).collect();
    assert_eq!(offsets, vec![0, 10, 20, 30]);

    let storage = storage_for(&part, 10);
    let ranges = [MarkRange::new(1, 3), MarkRange::new(3, 4)];
    let mut reader = open_plain(&part, &storage, &["x"], &ranges);

    let mut block = Block::new();
    assert_eq!(reader.read_range(1, 3, &mut block).unwrap(), 20);
    assert_eq!(block.get("x").unwrap().column, Column::from((10..30u8).collect::<Vec<_>>()));

    assert_eq!(reader.read_range(3, 4, &mut block).unwrap(), 10);
    assert_eq!(block.get("x").unwrap().column, Column::from((10..40u8).collect::<Vec<_>>()));
    assert_eq!(reader.seek_stats("x").unwrap().file_seeks, 0);
}

#[test]
fn column_without_files_is_default_filled() {
    let dir = tempdir().unwrap();
    let part = Factory::part_writer()
        .with_dir(dir.path())
        .with_granularity(10)
        .with_column("x", DataType::UInt8, Column::from((0..40u8).collect::<Vec<_>>()))
        .with_metadata_only_column("y", DataType::Int32)
        .create();
    let storage = storage_for(&part, 10);
    let ranges = [MarkRange::new(1, 2), MarkRange::new(2, 3)];
    let mut reader = open_plain(&part, &storage, &["x", "y"], &ranges);
    assert!(reader.stream("y").unwrap().is_empty());

    let block = {
        let mut block = read_all(&mut reader, &ranges);
        assert_eq!(block.names(), vec!["x"]);
        assert_eq!(block.rows().unwrap(), 20);
        reader.fill_missing_columns(&mut block, &["x", "y"], false).unwrap();
        block
    };
    assert_eq!(block.names(), vec!["x", "y"]);
    assert_eq!(block.get("y").unwrap().column, Column::from(vec![0i32; 20]));
}

#[test]
fn chunked_reads_match_a_single_full_read() {
    let dir = tempdir().unwrap();
    let part = write_rich_part(dir.path());
    let storage = storage_for(&part, GRANULARITY);
    let marks_count = part.marks_count;
    assert_eq!(marks_count, ROWS.div_ceil(GRANULARITY));

    let full_ranges = [MarkRange::new(0, marks_count)];
    let mut reader = open_plain(&part, &storage, &RICH_COLUMNS, &full_ranges);
    let full = read_all(&mut reader, &full_ranges);
    assert_eq!(full.rows().unwrap(), ROWS);
    assert!(!reader.stream("x").unwrap().marks_loaded());

    let mut chunkings = vec![per_mark(marks_count)];
    chunkings.extend((0..5).map(|seed| random_chunks(marks_count, seed)));
    for ranges in chunkings {
        let mut reader = open_plain(&part, &storage, &RICH_COLUMNS, &ranges);
        let chunked = read_all(&mut reader, &ranges);
        assert_eq!(chunked, full, "ranges {ranges:?}");
        for stem in ["x", "s", "n.size0", "a.null"] {
            assert_eq!(reader.seek_stats(stem).unwrap().file_seeks, 0, "{stem}");
        }
    }
}

#[test]
fn decoded_values_match_what_was_written() {
    let dir = tempdir().unwrap();
    let part = write_rich_part(dir.path());
    let storage = storage_for(&part, GRANULARITY);
    let ranges = [MarkRange::new(2, 4)];
    let mut reader = open_plain(&part, &storage, &RICH_COLUMNS, &ranges);
    let block = read_all(&mut reader, &ranges);

    // Rows 16..32.
    assert_eq!(values(&block, "x")[0], Value::UInt(48));
    assert_eq!(values(&block, "s")[4].to_string(), "sxxxxxx");
    assert_eq!(values(&block, "a")[3].to_string(), "['v19_0','v19_1',NULL]");
    assert_eq!(values(&block, "t")[1].to_string(), "(-3,'rbc')");
    assert_eq!(values(&block, "n.a")[1].to_string(), "[170,171]");
    assert_eq!(values(&block, "n.a")[2].to_string(), "[]");
    assert_eq!(values(&block, "n.b")[3].to_string(), "['19-0']");
}

#[test]
fn nested_columns_share_one_sizes_stream() {
    let dir = tempdir().unwrap();
    let part = write_rich_part(dir.path());
    assert!(dir.path().join("n.size0.bin").exists());
    assert!(!dir.path().join("n%2Ea.size0.bin").exists());

    let storage = storage_for(&part, GRANULARITY);
    let ranges = per_mark(part.marks_count);
    let mut both = open_plain(&part, &storage, &["n.a", "n.b"], &ranges);
    let mut only_b = open_plain(&part, &storage, &["n.b"], &ranges);

    let with_sibling = read_all(&mut both, &ranges);
    let alone = read_all(&mut only_b, &ranges);
    assert_eq!(with_sibling.get("n.b"), alone.get("n.b"));
    assert_eq!(
        with_sibling.get("n.a").unwrap().column.array_offsets(),
        alone.get("n.b").unwrap().column.array_offsets()
    );
}

#[test]
fn caches_do_not_change_results() {
    let dir = tempdir().unwrap();
    let part = write_rich_part(dir.path());
    let storage = storage_for(&part, GRANULARITY);
    let ranges = random_chunks(part.marks_count, 42);

    let mut plain = open_plain(&part, &storage, &RICH_COLUMNS, &ranges);
    let expected = read_all(&mut plain, &ranges);

    let caches = ReaderCaches {
        mark_cache: Some(Arc::new(LruMarkCache::new(64))),
        uncompressed_cache: Some(Arc::new(LruUncompressedCache::new(1 << 20))),
    };
    let mut cold = open_reader(
        &part,
        &storage,
        &RICH_COLUMNS,
        &ranges,
        caches.clone(),
        &ReaderSettings::default(),
    );
    assert_eq!(read_all(&mut cold, &ranges), expected);

    let mut warm = open_reader(
        &part,
        &storage,
        &RICH_COLUMNS,
        &ranges,
        caches.clone(),
        &ReaderSettings::default(),
    );
    assert_eq!(read_all(&mut warm, &ranges), expected);

    let unsaved = ReaderSettings {
        save_marks_in_cache: false,
        ..ReaderSettings::default()
    };
    let fresh = ReaderCaches {
        mark_cache: Some(Arc::new(LruMarkCache::new(64))),
        uncompressed_cache: None,
    };
    let mut reader = open_reader(&part, &storage, &RICH_COLUMNS, &ranges, fresh, &unsaved);
    assert_eq!(read_all(&mut reader, &ranges), expected);

    let mapped = ReaderSettings {
        aio_threshold: 1,
        ..ReaderSettings::default()
    };
    let mut reader = open_reader(
        &part,
        &storage,
        &RICH_COLUMNS,
        &ranges,
        ReaderCaches::none(),
        &mapped,
    );
    assert_eq!(read_all(&mut reader, &ranges), expected);
}

#[test]
fn stale_recorded_file_size_does_not_truncate_reads() {
    let dir = tempdir().unwrap();
    let written = Factory::part_writer()
        .with_dir(dir.path())
        .with_granularity(10)
        .with_method(METHOD_NONE)
        .with_max_block_size(40)
        .with_column("x", DataType::UInt32, Column::from((0..40u32).collect::<Vec<_>>()))
        .create();
    let mut stale = (*written).clone();
    stale.checksums.get_mut("x.bin").unwrap().file_size = 80;
    stale.save().unwrap();
    let part = Arc::new(DataPart::load(dir.path()).unwrap());
    assert_eq!(part.file_size("x.bin"), Some(80));

    let storage = storage_for(&part, 10);
    let ranges = [MarkRange::new(0, 2), MarkRange::new(2, 4)];
    let expected = Column::from((0..40u32).collect::<Vec<_>>());

    let mut plain = open_plain(&part, &storage, &["x"], &ranges);
    let block = read_all(&mut plain, &ranges);
    assert_eq!(block.get("x").unwrap().column, expected);

    let caches = ReaderCaches {
        mark_cache: Some(Arc::new(LruMarkCache::new(8))),
        uncompressed_cache: Some(Arc::new(LruUncompressedCache::new(1 << 20))),
    };
    let mapped = ReaderSettings {
        aio_threshold: 1,
        ..ReaderSettings::default()
    };
    for settings in [ReaderSettings::default(), mapped] {
        let mut cached = open_reader(&part, &storage, &["x"], &ranges, caches.clone(), &settings);
        assert_eq!(read_all(&mut cached, &ranges), block);
    }
}

#[test]
fn missing_nested_column_takes_sibling_shape() {
    let dir = tempdir().unwrap();
    let n_sizes = sizes(20, 3);
    let total = n_sizes.iter().sum::<u64>() as usize;
    let part = Factory::part_writer()
        .with_dir(dir.path())
        .with_granularity(5)
        .with_column(
            "n.a",
            DataType::array(DataType::UInt16),
            Column::arrays(&n_sizes, Column::from(vec![7u16; total])),
        )
        .with_metadata_only_column("n.b", DataType::array(DataType::String))
        .create();
    let storage = storage_for(&part, 5);
    let ranges = [MarkRange::new(0, part.marks_count)];
    let mut reader = open_plain(&part, &storage, &["n.a", "n.b"], &ranges);

    let mut block = read_all(&mut reader, &ranges);
    assert!(!block.has("n.b"));
    reader.fill_missing_columns(&mut block, &["n.a", "n.b"], false).unwrap();

    let n_b = &block.get("n.b").unwrap().column;
    assert_eq!(n_b.array_offsets(), block.get("n.a").unwrap().column.array_offsets());
    assert_eq!(n_b.value_at(2).unwrap().to_string(), "['','']");
}

#[test]
fn invalid_ranges_are_logic_errors() {
    let dir = tempdir().unwrap();
    let part = write_rich_part(dir.path());
    let storage = storage_for(&part, GRANULARITY);
    let marks_count = part.marks_count;

    let columns = storage.resolve_columns(&["x"]).unwrap();
    let err = PartReader::new(
        Arc::clone(&part),
        columns,
        ReaderCaches::none(),
        Arc::clone(&storage),
        &[MarkRange::new(0, marks_count + 1)],
        &ReaderSettings::default(),
        ReadInstrumentation::default(),
    )
    .unwrap_err();
    assert!(err.is_logic_error());

    let ranges = [MarkRange::new(0, 1)];
    let mut reader = open_plain(&part, &storage, &["x"], &ranges);
    let mut block = Block::new();
    let err = reader.read_range(3, 3, &mut block).unwrap_err();
    assert!(err.is_logic_error());
    assert!(matches!(
        err.root(),
        PartReadError::Logic(LogicError::InvalidMarkRange { from_mark: 3, to_mark: 3, .. })
    ));
}

#[test]
fn duplicate_columns_are_rejected() {
    let dir = tempdir().unwrap();
    let part = write_rich_part(dir.path());
    let storage = storage_for(&part, GRANULARITY);
    let x = storage.resolve_columns(&["x"]).unwrap().remove(0);
    let err = PartReader::new(
        Arc::clone(&part),
        vec![x.clone(), x],
        ReaderCaches::none(),
        storage,
        &[],
        &ReaderSettings::default(),
        ReadInstrumentation::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PartReadError::Config(ConfigError::DuplicateColumn(_))));
}

#[derive(Debug, Default)]
struct BrokenParts(Mutex<Vec<String>>);

impl BrokenPartReporter for BrokenParts {
    fn report_broken_part(&self, part_name: &str) {
        self.0.lock().unwrap().push(part_name.to_string());
    }
}

#[test]
fn corruption_reports_the_part_and_keeps_the_block() {
    let dir = tempdir().unwrap();
    let part = Factory::part_writer()
        .with_dir(dir.path())
        .with_name("broken_1_1_0")
        .with_granularity(10)
        .with_method(METHOD_NONE)
        .with_column("x", DataType::UInt32, Column::from((0..30u32).collect::<Vec<_>>()))
        .create();
    let reporter = Arc::new(BrokenParts::default());
    let storage = Arc::new(
        StorageContext::new(10, part.columns.clone()).with_broken_part_reporter(reporter.clone()),
    );
    let ranges = [MarkRange::new(0, 1)];

    let mut reader = open_plain(&part, &storage, &["x"], &ranges);
    let mut block = read_all(&mut reader, &ranges);
    let before = block.clone();

    let path = dir.path().join("x.bin");
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x55;
    std::fs::write(&path, bytes).unwrap();

    let mut reader = open_plain(&part, &storage, &["x"], &ranges);
    let err = reader.read_range(0, 1, &mut block).unwrap_err();
    assert!(!err.is_logic_error());
    assert!(matches!(err.root(), PartReadError::Corrupted(_)));
    let message = err.to_string();
    assert!(message.contains("while reading column x"), "{message}");
    assert!(message.contains("from mark 0 to 1"), "{message}");

    assert_eq!(block, before);
    assert_eq!(*reporter.0.lock().unwrap(), vec!["broken_1_1_0".to_string()]);
}

#[test]
fn existing_column_of_another_type_is_rejected() {
    let dir = tempdir().unwrap();
    let part = write_rich_part(dir.path());
    let storage = storage_for(&part, GRANULARITY);
    let ranges = [MarkRange::new(0, 1)];
    let mut reader = open_plain(&part, &storage, &["x"], &ranges);

    let mut block = Block::new();
    block.insert("x", DataType::UInt8, Column::from(vec![1u8]));
    let err = reader.read_range(0, 1, &mut block).unwrap_err();
    assert!(matches!(
        err.root(),
        PartReadError::Logic(LogicError::TypeMismatch { .. })
    ));
    assert_eq!(block.rows().unwrap(), 1);
}

#[test]
fn value_size_hints_follow_observed_sizes() {
    let dir = tempdir().unwrap();
    let part = write_rich_part(dir.path());
    let storage = storage_for(&part, GRANULARITY);
    let ranges = [MarkRange::new(0, part.marks_count)];

    let mut seeded = BTreeMap::new();
    seeded.insert("s".to_string(), 2000.0);
    let mut reader = open_plain(&part, &storage, &["x", "s"], &ranges)
        .with_value_size_hints(seeded);
    read_all(&mut reader, &ranges);

    let hints = reader.avg_value_size_hints();
    assert_eq!(hints.get("x"), Some(&8.0));
    // Observed string size is far below half of the seed: slow decay.
    let s = *hints.get("s").unwrap();
    assert!(s < 2000.0 && s > 1000.0, "{s}");
}

#[derive(Debug, Default)]
struct CountingObserver(Mutex<usize>);

impl ReadObserver for CountingObserver {
    fn on_read(&self, profile: &ReadProfile<'_>) {
        assert!(profile.bytes_read <= profile.bytes_requested);
        *self.0.lock().unwrap() += 1;
    }
}

#[test]
fn physical_reads_reach_the_observer() {
    let dir = tempdir().unwrap();
    let part = write_rich_part(dir.path());
    let storage = storage_for(&part, GRANULARITY);
    let ranges = [MarkRange::new(0, part.marks_count)];
    let observer = Arc::new(CountingObserver::default());

    let columns = storage.resolve_columns(&["x"]).unwrap();
    let mut reader = PartReader::new(
        Arc::clone(&part),
        columns,
        ReaderCaches::none(),
        storage,
        &ranges,
        &ReaderSettings::default(),
        ReadInstrumentation::default().with_observer(observer.clone()),
    )
    .unwrap();
    read_all(&mut reader, &ranges);
    assert!(*observer.0.lock().unwrap() > 0);
}
