use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use part_reader::engine::core::column::Block;
use part_reader::engine::core::io::ReadInstrumentation;
use part_reader::engine::core::mark::MarkRange;
use part_reader::engine::core::part::{DataPart, StorageContext};
use part_reader::engine::core::read::{PartReader, ReaderCaches, ReaderSettings};
use part_reader::logging;
use part_reader::shared::config::CONFIG;
use tracing::info;

#[derive(Parser)]
#[command(name = "part_reader")]
#[command(about = "Read mark ranges of a data part and print them as TSV", long_about = None)]
struct Args {
    /// Part directory (contains part.json)
    part: PathBuf,

    /// Comma-separated columns, in output order. Defaults to every column of the part.
    #[arg(short, long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Mark range FROM..TO; may be repeated. Defaults to the whole part.
    #[arg(short, long, value_parser = parse_range)]
    range: Vec<MarkRange>,

    /// Read without mark and uncompressed caches
    #[arg(long)]
    no_cache: bool,

    /// Maximum number of rows to print (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    limit: usize,
}

fn parse_range(raw: &str) -> Result<MarkRange, String> {
    let (from, to) = raw
        .split_once("..")
        .ok_or_else(|| format!("expected FROM..TO, got {raw}"))?;
    let from = from.trim().parse().map_err(|e| format!("bad FROM: {e}"))?;
    let to = to.trim().parse().map_err(|e| format!("bad TO: {e}"))?;
    Ok(MarkRange::new(from, to))
}

fn print_block(block: &Block, limit: usize) -> io::Result<()> {
    let rows = block.rows().unwrap_or(0);
    let rows = if limit == 0 { rows } else { rows.min(limit) };
    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, "{}", block.names().join("\t"))?;
    for row in 0..rows {
        let line: Vec<String> = block
            .iter()
            .map(|(_, col)| {
                col.column
                    .value_at(row)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            })
            .collect();
        writeln!(out, "{}", line.join("\t"))?;
    }
    out.flush()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init()?;

    let part = Arc::new(DataPart::load(&args.part)?);
    let storage = Arc::new(StorageContext::from_settings(&CONFIG, part.columns.clone()));
    let names: Vec<String> = if args.columns.is_empty() {
        part.columns.iter().map(|c| c.name.clone()).collect()
    } else {
        args.columns.clone()
    };
    let columns = storage.resolve_columns(&names)?;

    let ranges = if !args.range.is_empty() {
        args.range.clone()
    } else if part.marks_count == 0 {
        Vec::new()
    } else {
        vec![MarkRange::new(0, part.marks_count)]
    };
    let caches = if args.no_cache {
        ReaderCaches::none()
    } else {
        ReaderCaches::from_config(&CONFIG.cache)
    };
    let settings = ReaderSettings::from_config(&CONFIG.reader);

    info!(part = %part.name, ranges = ranges.len(), "Reading part");
    let mut reader = PartReader::new(
        Arc::clone(&part),
        columns,
        caches,
        storage,
        &ranges,
        &settings,
        ReadInstrumentation::default(),
    )?;

    let mut block = Block::new();
    for range in &ranges {
        if let Err(e) = reader.read_range(range.begin, range.end, &mut block) {
            e.log_error();
            return Err(e).context("reading part failed");
        }
    }
    if !block.is_empty() {
        reader.fill_missing_columns_and_reorder(&mut block, &names)?;
    }

    print_block(&block, args.limit)?;
    Ok(())
}
