use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{debug, info};

use crate::cli::InventoryArgs;
use crate::model::{InspectionFileEntry, InspectionInventoryEntry, InventoryManifest};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

const INSPECTION_SLUG_PATTERN: &str = r"^[0-9]{8}-[0-9a-fA-F]{6}$";
const NESTED_DIRECTORIES: [&str; 2] = ["deliverable", "database"];
const ELIGIBLE_MARKERS: [&str; 9] = [
    "_portal.html",
    "_graph.html",
    "binned_ut.csv",
    "binned_coating.csv",
    "binned_laser.csv",
    "plot_annotations",
    "dataprocessor_settings.json",
    "summary_report.json",
    ".xlsx",
];

pub const PORTAL_MARKER: &str = "_portal.html";
pub const GRAPH_MARKER: &str = "_graph.html";
pub const SETTINGS_FILE: &str = "dataprocessor_settings.json";
pub const SUMMARY_REPORT_FILE: &str = "summary_report.json";
pub const ANNOTATIONS_FILE: &str = "plot_annotations.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub name: String,
}

/// Eligible files of one inspection, from its root and nested directories.
#[derive(Debug, Clone)]
pub struct InspectionFiles {
    pub slug: String,
    pub root: PathBuf,
    pub files: Vec<CandidateFile>,
}

impl InspectionFiles {
    pub fn named_containing(&self, marker: &str) -> Vec<&CandidateFile> {
        self.files
            .iter()
            .filter(|file| file.name.contains(marker))
            .collect()
    }

    pub fn has_file_named(&self, name: &str) -> bool {
        self.files.iter().any(|file| file.name == name)
    }
}

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.input_root)?;

    if args.dry_run {
        info!(
            inspection_count = manifest.inspection_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args.manifest_path.unwrap_or_else(|| {
        args.output_root
            .join("manifests")
            .join("inspection_inventory.json")
    });

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(
        inspection_count = manifest.inspection_count,
        "inventory completed"
    );

    Ok(())
}

pub fn build_manifest(input_root: &Path) -> Result<InventoryManifest> {
    let inspections = discover_inspections(input_root)?;

    if inspections.is_empty() {
        bail!("no inspection directories found in {}", input_root.display());
    }

    let mut entries = Vec::with_capacity(inspections.len());
    for inspection in inspections {
        let mut files = Vec::with_capacity(inspection.files.len());
        for file in &inspection.files {
            let relative_path = file
                .path
                .strip_prefix(input_root)
                .unwrap_or(&file.path)
                .display()
                .to_string();
            files.push(InspectionFileEntry {
                filename: file.name.clone(),
                relative_path,
                sha256: sha256_file(&file.path)?,
            });
        }

        entries.push(InspectionInventoryEntry {
            slug: inspection.slug,
            file_count: files.len(),
            files,
        });
    }

    Ok(InventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: input_root.display().to_string(),
        inspection_count: entries.len(),
        inspections: entries,
    })
}

/// Inspection directories under `input_root`, sorted by slug.
pub fn discover_inspections(input_root: &Path) -> Result<Vec<InspectionFiles>> {
    let pattern =
        Regex::new(INSPECTION_SLUG_PATTERN).context("failed to compile inspection slug regex")?;

    let entries = fs::read_dir(input_root)
        .with_context(|| format!("failed to read {}", input_root.display()))?;

    let mut inspections = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", input_root.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_dir()
        {
            continue;
        }

        let Some(slug) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !pattern.is_match(slug) {
            debug!(directory = %path.display(), "skipping directory without inspection slug");
            continue;
        }

        let mut files = list_eligible_files(&path)?;
        for nested in NESTED_DIRECTORIES {
            let nested_path = path.join(nested);
            if nested_path.is_dir() {
                files.extend(list_eligible_files(&nested_path)?);
            }
        }

        inspections.push(InspectionFiles {
            slug: slug.to_string(),
            root: path.clone(),
            files,
        });
    }

    inspections.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(inspections)
}

fn list_eligible_files(directory: &Path) -> Result<Vec<CandidateFile>> {
    let entries = fs::read_dir(directory)
        .with_context(|| format!("failed to read {}", directory.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", directory.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        if is_eligible_file(&name) {
            files.push(CandidateFile { path, name });
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

pub fn is_eligible_file(name: &str) -> bool {
    ELIGIBLE_MARKERS.iter().any(|marker| name.contains(marker))
}
