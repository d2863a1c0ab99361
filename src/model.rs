use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::extract::ReferenceRecord;

pub const DATA_VERSION: &str = "v1.0";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorThresholds {
    pub start_of_red: f64,
    pub start_of_green: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRecord {
    pub title: Option<String>,
    pub thresholds: Option<ColorThresholds>,
    pub thickness_min: Option<f64>,
    pub thickness_avg: Option<f64>,
    pub thickness_max: Option<f64>,
    pub plot_rotation: Option<f64>,
    pub units: String,
    pub source_file: String,
    pub plot_types: Vec<String>,
    /// Positional `[x, y]`; an unreadable size stays in place as null.
    pub bin_sizes: Vec<Option<f64>>,
    pub data: ReferenceRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectionOutput {
    pub inspection_types: Vec<String>,
    pub data_version: String,
    pub plots: Vec<PlotRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionStats {
    pub num_data_readings: Option<Number>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaceholderPlot {
    pub plot_types: Vec<String>,
    pub source_file: String,
}

/// Minimal artifact for inspections that only shipped a spreadsheet.
#[derive(Debug, Clone, Serialize)]
pub struct ExcelPlaceholderOutput {
    pub data_version: String,
    pub plots: Vec<PlaceholderPlot>,
}

impl ExcelPlaceholderOutput {
    pub fn new(source_file: &str) -> Self {
        Self {
            data_version: DATA_VERSION.to_string(),
            plots: vec![PlaceholderPlot {
                plot_types: vec!["excel_only".to_string()],
                source_file: source_file.to_string(),
            }],
        }
    }
}

/// `dataprocessor_settings.json` as written by the acquisition software.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessingSettings {
    pub red_thickness_threshold: Option<f64>,
    pub green_thickness_threshold: Option<f64>,
    pub units: Option<String>,
    pub x_bin_size: Option<f64>,
    pub y_bin_size: Option<f64>,
    pub plot_rotation: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryReport {
    #[serde(rename = "Number of data points")]
    pub number_of_data_points: Option<Number>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionFileEntry {
    pub filename: String,
    pub relative_path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionInventoryEntry {
    pub slug: String,
    pub file_count: usize,
    pub files: Vec<InspectionFileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub inspection_count: usize,
    pub inspections: Vec<InspectionInventoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertPaths {
    pub input_root: String,
    pub output_root: String,
    pub log_dir: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertCounts {
    pub inspection_count: usize,
    pub converted_count: usize,
    pub excel_placeholder_count: usize,
    pub failed_count: usize,
    pub missing_count: usize,
    pub source_file_count: usize,
    pub failed_file_count: usize,
    pub plot_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    pub source_file: String,
    pub category: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionOutcome {
    pub slug: String,
    pub status: String,
    pub categories: Vec<String>,
    pub source_files: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub plot_count: usize,
    pub inspection_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub codec: String,
    pub paths: ConvertPaths,
    pub counts: ConvertCounts,
    pub inspections: Vec<InspectionOutcome>,
    pub warnings: Vec<String>,
}
