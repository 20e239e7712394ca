//! Clear command implementation.

use pagefill_storage::{FileRecordStore, RecordStore};
use std::path::Path;
use tracing::info;

/// Runs the clear command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No record store found at {:?}", path).into());
    }

    let store = FileRecordStore::open(path)?;
    let removed = store.len()?;
    store.clear()?;

    info!(removed, "cleared record store");
    println!("Removed {} records from {}", removed, path.display());
    Ok(())
}
