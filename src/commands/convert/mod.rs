use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use serde_json::Number;
use tracing::{debug, info, warn};

use crate::cli::ConvertArgs;
use crate::commands::inventory::{
    self, ANNOTATIONS_FILE, CandidateFile, GRAPH_MARKER, InspectionFiles, PORTAL_MARKER,
    SETTINGS_FILE, SUMMARY_REPORT_FILE,
};
use crate::extract::{
    ExtractError, Extractor, FileOutput, FileOverrides, InProcessCodec, NumericCodec,
    SourceFile, SubprocessCodec, aggregate_inspection,
};
use crate::model::{
    ConvertCounts, ConvertPaths, ConvertRunManifest, ExcelPlaceholderOutput, FileFailure,
    InspectionOutcome, InspectionStats, ProcessingSettings, SummaryReport,
};
use crate::util::{
    append_line, copy_file, ensure_directory, now_utc_string, read_text_lossy,
    utc_compact_string, write_json, write_json_pretty,
};

const METRIC_UNITS: &str = "m-mm";
const PLOT_DATA_FILE: &str = "binned_plot_data.json";
const STATS_FILE: &str = "inspection_stats.json";

mod bookkeeping;
mod inspection;
mod run;
#[cfg(test)]
mod tests;

pub use run::run;

use bookkeeping::*;
use inspection::*;
