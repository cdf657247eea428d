//! JSON Lines input and output for the command handlers.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use dealgrid_core::{ItemStub, ProductRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A line of `details` input: a full record from an earlier run, or a bare
/// stub straight from discovery.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DetailInput {
    Record(ProductRecord),
    Stub(ItemStub),
}

impl DetailInput {
    pub(crate) fn into_record(self) -> ProductRecord {
        match self {
            DetailInput::Record(record) => record,
            DetailInput::Stub(stub) => stub.into_record(),
        }
    }
}

/// Parses one value per non-blank line.
pub(crate) fn read_lines<T: DeserializeOwned>(reader: impl BufRead) -> anyhow::Result<Vec<T>> {
    let mut items = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        items.push(item);
    }
    Ok(items)
}

pub(crate) fn read_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_lines(BufReader::new(file))
}

pub(crate) fn write_lines<T: Serialize>(mut writer: impl Write, items: &[T]) -> anyhow::Result<()> {
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes to `path`, or to stdout when no path is given.
pub(crate) fn write_output<T: Serialize>(path: Option<&Path>, items: &[T]) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
            write_lines(BufWriter::new(file), items)
        }
        None => write_lines(io::stdout().lock(), items),
    }
}
