use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Load the most recent valid snapshot from directory
///
/// Returns None if no snapshots exist or all are corrupt.
/// Tries snapshots from newest to oldest until one loads successfully.
pub fn load_latest_snapshot(snapshot_dir: &Path) -> Result<Option<(Snapshot, u64)>> {
    // Create directory if it doesn't exist
    if !snapshot_dir.exists() {
        info!(
            directory = %snapshot_dir.display(),
            "Snapshot directory does not exist, starting without snapshot"
        );
        return Ok(None);
    }

    // List all snapshot files
    let mut snapshots = list_snapshots(snapshot_dir)?;

    if snapshots.is_empty() {
        info!("No snapshots found, starting from beginning");
        return Ok(None);
    }

    // Sort by filename descending (newest first, timestamp is lexicographically sortable)
    snapshots.sort_by(|a, b| b.cmp(a));

    info!(
        count = snapshots.len(),
        directory = %snapshot_dir.display(),
        "Found {} snapshot(s), attempting to load newest",
        snapshots.len()
    );

    // Try loading snapshots from newest to oldest
    for path in snapshots {
        match Snapshot::load_from_file(&path) {
            Ok(snapshot) => {
                let seq = snapshot.sequence_number;
                let entity_count = snapshot.entity_count();

                info!(
                    path = %path.display(),
                    sequence = seq,
                    entities = entity_count,
                    "Loaded snapshot successfully"
                );

                return Ok(Some((snapshot, seq)));
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt snapshot, trying next oldest"
                );
                continue;
            }
        }
    }

    // All snapshots failed to load
    error!("All snapshots are corrupt, starting from beginning");
    Ok(None)
}

/// List all snapshot files in directory
fn list_snapshots(snapshot_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(snapshot_dir).context("Failed to read snapshot directory")?;

    let mut snapshots = Vec::new();

    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        // Include both .json.gz (current) and .json (legacy) files
        if path.is_file() {
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                if filename.starts_with("snapshot-")
                    && (filename.ends_with(".json.gz") || filename.ends_with(".json"))
                {
                    snapshots.push(path);
                }
            }
        }
    }

    Ok(snapshots)
}
