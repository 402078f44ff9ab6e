//! # CLI Command Implementations

use crate::api::{self, load_snapshot, save_snapshot};
use crate::config::ServerConfig;
use std::path::{Path, PathBuf};
use strand_core::{GraphStore, SerializableGraph, StrandError};

/// Snapshot used when neither the CLI nor the config names one.
pub const DEFAULT_SNAPSHOT: &str = "strand.strd";

/// Configured snapshot path, or the default.
#[must_use]
pub fn snapshot_path(config: &ServerConfig) -> PathBuf {
    config
        .snapshot
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT))
}

/// Resolve the parent directory of an output file so `..` and symlinks
/// cannot point the write somewhere unexpected.
fn validate_output_path(path: &Path) -> Result<PathBuf, StrandError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let canonical_parent = parent.canonicalize().map_err(|e| {
        StrandError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;
    if !canonical_parent.is_dir() {
        return Err(StrandError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }
    let filename = path
        .file_name()
        .ok_or_else(|| StrandError::IoError("Output path has no filename".to_string()))?;
    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

pub async fn cmd_server(mut config: ServerConfig) -> Result<(), StrandError> {
    let path = snapshot_path(&config);
    let graph = load_snapshot(&path)?;
    config.snapshot = Some(path.clone());

    println!("Strand Server Starting...");
    println!();
    println!("  Listen:   ws://{}", config.bind_addr());
    println!("  Snapshot: {}", path.display());
    println!();
    println!("Endpoints:");
    println!("  GET /, /ws - WebSocket protocol");
    println!("  GET /status - Element counts");
    println!("  GET /health - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(config, graph).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

pub fn cmd_status(path: &Path, json_mode: bool) -> Result<(), StrandError> {
    let stats = load_snapshot(path)?.stats();

    if json_mode {
        let output = serde_json::json!({
            "snapshot": path.to_string_lossy(),
            "nodes": stats.nodes,
            "links": stats.links,
            "edges": stats.edges,
        });
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| StrandError::SerializationError(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    println!("Strand Graph Status");
    println!("===================");
    println!("Snapshot: {}", path.display());
    println!();
    println!("Nodes: {}", stats.nodes);
    println!("Links: {}", stats.links);
    println!("Edges: {}", stats.edges);
    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

pub fn cmd_export(path: &Path, output: &Path) -> Result<(), StrandError> {
    let validated_output = validate_output_path(output)?;
    let graph = load_snapshot(path)?;

    let data = serde_json::to_vec_pretty(&SerializableGraph::from(&graph))
        .map_err(|e| StrandError::SerializationError(e.to_string()))?;
    std::fs::write(&validated_output, &data)
        .map_err(|e| StrandError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {}", data.len(), validated_output.display());
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

pub fn cmd_init(path: &Path, force: bool) -> Result<(), StrandError> {
    if path.exists() && !force {
        return Err(StrandError::IoError(format!(
            "Snapshot {} already exists. Use --force to overwrite.",
            path.display()
        )));
    }
    save_snapshot(&strand_core::MemoryGraph::new(), path)?;
    println!("Initialized empty snapshot at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("g.strd");
        cmd_init(&path, false).expect("init");
        assert!(cmd_init(&path, false).is_err());
        cmd_init(&path, true).expect("forced init");
    }

    #[test]
    fn export_writes_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let snapshot = dir.path().join("g.strd");
        let output = dir.path().join("g.json");
        cmd_init(&snapshot, false).expect("init");
        cmd_export(&snapshot, &output).expect("export");

        let text = std::fs::read_to_string(&output).expect("read");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert!(value.get("elements").is_some());
    }

    #[test]
    fn export_rejects_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("missing").join("g.json");
        assert!(validate_output_path(&output).is_err());
    }
}
