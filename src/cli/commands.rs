//! CLI command implementations
//!
//! Every command loads the configuration, resolves the database directory
//! under `db_root` and writes JSON to the given writer.

use std::io::{self, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::config::BuildConfig;
use crate::observability::{Event, Logger};
use crate::storage::{DbLayout, NodeRecord, NodeTable, StorageErrorCode, ValueRef};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cmd {
        Command::Info { config, name } => info(&config, &name, &mut out),
        Command::Inspect {
            config,
            name,
            start,
            count,
        } => inspect(&config, &name, start, count, &mut out),
        Command::Verify { config, name } => verify(&config, &name, &mut out),
        Command::Drop { config, name } => drop_database(&config, &name, &mut out),
    }
}

fn resolve(config_path: &Path, name: &str) -> CliResult<DbLayout> {
    let config = BuildConfig::load(config_path)?;
    let layout = DbLayout::new(&config.db_root(), name)?;
    if !layout.exists() {
        return Err(CliError::not_found(name));
    }
    Ok(layout)
}

fn write_json<W: Write>(out: &mut W, value: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    Ok(())
}

fn record_json(table: &mut NodeTable, record: &NodeRecord) -> CliResult<Value> {
    let rank = record.rank();
    let mut value = json!({
        "rank": rank,
        "kind": record.kind().as_str(),
        "dist": record.dist(),
        "size": record.size(),
    });
    if let Some(name) = record.name() {
        value["name_id"] = json!(name.name_id);
        value["ns_id"] = json!(name.ns_id);
        value["has_namespaces"] = json!(name.has_namespaces);
    }
    if let Some(stored) = record.value() {
        value["inline"] = json!(matches!(stored, ValueRef::Inline(_)));
        if let Some(bytes) = table.value(rank)? {
            value["value"] = json!(String::from_utf8_lossy(&bytes));
        }
    }
    Ok(value)
}

/// Print the metadata of a database
pub fn info<W: Write>(config_path: &Path, name: &str, out: &mut W) -> CliResult<()> {
    let layout = resolve(config_path, name)?;
    let table = NodeTable::open(&layout)?;
    write_json(out, &serde_json::to_value(table.meta())?)
}

/// Print records `start..start + count` as JSON lines
pub fn inspect<W: Write>(
    config_path: &Path,
    name: &str,
    start: u32,
    count: Option<u32>,
    out: &mut W,
) -> CliResult<()> {
    let layout = resolve(config_path, name)?;
    let mut table = NodeTable::open(&layout)?;
    let end = match count {
        Some(count) => start.saturating_add(count).min(table.len()),
        None => table.len(),
    };
    for rank in start..end {
        let record = table.record(rank)?;
        let value = record_json(&mut table, &record)?;
        write_json(out, &value)?;
    }
    Ok(())
}

/// Check the node table against its stored checksum
pub fn verify<W: Write>(config_path: &Path, name: &str, out: &mut W) -> CliResult<()> {
    let layout = resolve(config_path, name)?;
    let table = NodeTable::open(&layout)?;
    match table.verify() {
        Ok(()) => write_json(out, &json!({ "db": name, "status": "ok" })),
        Err(e) => {
            if e.code() == StorageErrorCode::XsDataCorruption {
                Logger::fatal(
                    Event::ChecksumMismatch.as_str(),
                    &[("db", name), ("reason", e.message())],
                );
            }
            Err(e.into())
        }
    }
}

/// Remove a database directory
pub fn drop_database<W: Write>(config_path: &Path, name: &str, out: &mut W) -> CliResult<()> {
    let layout = resolve(config_path, name)?;
    layout.drop_dir()?;
    Logger::info(Event::DatabaseDropped.as_str(), &[("db", name)]);
    write_json(out, &json!({ "db": name, "status": "dropped" }))
}
