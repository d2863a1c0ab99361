use tracing::warn;

use crate::model::{DATA_VERSION, InspectionOutput, PlotRecord};

use super::assemble::FileOutput;
use super::resolver::ColumnKey;

pub const LEGACY: &str = "legacy";
pub const LEGACY_ANNOTATIONS: &str = "legacy_annotations";
pub const MULTIPLE_PLOTS: &str = "multiple_plots";
pub const SUBPLOTS: &str = "subplots";

/// Joins every successful file of one inspection into the final artifact.
pub fn aggregate_inspection(files: Vec<FileOutput>, has_annotations: bool) -> InspectionOutput {
    let mut inspection_types = vec![LEGACY.to_string()];
    if has_annotations {
        inspection_types.push(LEGACY_ANNOTATIONS.to_string());
    }
    if files.len() > 1 {
        inspection_types.push(MULTIPLE_PLOTS.to_string());
    }
    if files.iter().any(FileOutput::has_subplots) {
        inspection_types.push(SUBPLOTS.to_string());
    }

    let plots = files.into_iter().flat_map(|file| file.plots).collect();

    InspectionOutput {
        inspection_types,
        data_version: DATA_VERSION.to_string(),
        plots: sort_by_bin_count(plots),
    }
}

/// Largest plots first. A plot without a readable `x_bin` column leaves the
/// whole list in its original order.
pub fn sort_by_bin_count(plots: Vec<PlotRecord>) -> Vec<PlotRecord> {
    let lengths: Option<Vec<usize>> = plots
        .iter()
        .map(|plot| plot.data.get(ColumnKey::XBin).and_then(|column| column.len()))
        .collect();

    let Some(lengths) = lengths else {
        warn!(
            plot_count = plots.len(),
            "plot without x_bin column, keeping source order"
        );
        return plots;
    };

    let mut keyed: Vec<(usize, PlotRecord)> = lengths.into_iter().zip(plots).collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, plot)| plot).collect()
}
