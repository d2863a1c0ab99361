use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::{ConvertRunManifest, InventoryManifest};

const CONVERT_RUN_PREFIX: &str = "convert_run_";

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.output_root.join("manifests");
    let inventory_path = manifest_dir.join("inspection_inventory.json");

    info!(output_root = %args.output_root.display(), "status requested");

    if inventory_path.exists() {
        let inventory: InventoryManifest = read_manifest(&inventory_path)?;
        info!(
            generated_at = %inventory.generated_at,
            source = %inventory.source_directory,
            inspection_count = inventory.inspection_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    match latest_convert_manifest(&manifest_dir)? {
        Some(path) => {
            let manifest: ConvertRunManifest = read_manifest(&path)?;
            info!(
                path = %path.display(),
                run_id = %manifest.run_id,
                status = %manifest.status,
                started_at = %manifest.started_at,
                updated_at = %manifest.updated_at,
                codec = %manifest.codec,
                inspections = manifest.counts.inspection_count,
                converted = manifest.counts.converted_count,
                excel = manifest.counts.excel_placeholder_count,
                missing = manifest.counts.missing_count,
                failed = manifest.counts.failed_count,
                plots = manifest.counts.plot_count,
                warnings = manifest.warnings.len(),
                "loaded convert run manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no convert run manifest found"),
    }

    Ok(())
}

/// Run manifests carry a compact UTC stamp, so the greatest name is newest.
fn latest_convert_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.is_dir() {
        return Ok(None);
    }

    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;

    let mut latest: Option<(String, PathBuf)> = None;
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?;
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        if !name.starts_with(CONVERT_RUN_PREFIX) || !name.ends_with(".json") {
            continue;
        }
        if latest.as_ref().is_none_or(|(current, _)| name > *current) {
            latest = Some((name, entry.path()));
        }
    }

    Ok(latest.map(|(_, path)| path))
}

fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
