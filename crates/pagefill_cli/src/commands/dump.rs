//! Dump command implementation.

use pagefill_storage::{FileRecordStore, Key, RecordStore, ScanDirection};
use serde::Serialize;
use std::path::Path;

/// Stored records for output.
#[derive(Debug, Serialize)]
pub struct DumpResult {
    /// Store path.
    pub path: String,
    /// Total number of stored records.
    pub total: usize,
    /// Printed record values, ascending.
    pub values: Vec<Key>,
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    from: Key,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No record store found at {:?}", path).into());
    }

    let store = FileRecordStore::open(path)?;
    let total = store.len()?;
    let records = store.scan_ordered(from, ScanDirection::Forward, limit.unwrap_or(total))?;

    let result = DumpResult {
        path: path.display().to_string(),
        total,
        values: records.iter().map(|record| record.value()).collect(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &DumpResult) {
    println!("PageFill Record Store");
    println!("=====================");
    println!();
    println!("Path:    {}", result.path);
    println!("Records: {}", result.total);
    println!();

    if result.values.is_empty() {
        println!("(no records)");
        return;
    }

    for chunk in result.values.chunks(10) {
        let line: Vec<String> = chunk.iter().map(ToString::to_string).collect();
        println!("  {}", line.join(" "));
    }

    let (Some(first), Some(last)) = (result.values.first(), result.values.last()) else {
        return;
    };
    println!();
    println!("Showing {} records in [{}, {}]", result.values.len(), first, last);
}
