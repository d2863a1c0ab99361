use tracing::{debug, warn};

use crate::model::{ColorThresholds, PlotRecord};

use super::error::{ExtractError, Result};
use super::resolver::{ColumnKey, ReferenceRecord, ResolvedDocument};
use super::thresholds::estimate_thresholds;

/// Records with fewer columns than this never describe a real plot.
const MIN_RAW_COLUMNS: usize = 6;
/// Assembled records must still carry this many columns to be kept.
const MIN_ASSEMBLED_COLUMNS: usize = 5;
const CONE_V2_POINTS: usize = 4;

pub const CONE_V1: &str = "cone_v1";
pub const CONE_V2: &str = "cone_v2";

/// Caller-configured values for one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOverrides {
    pub red_threshold: Option<f64>,
    pub green_threshold: Option<f64>,
    pub units: String,
    pub x_bin_size: Option<f64>,
    pub y_bin_size: Option<f64>,
    pub plot_rotation: Option<f64>,
}

impl Default for FileOverrides {
    fn default() -> Self {
        Self {
            red_threshold: None,
            green_threshold: None,
            units: "ft-in".to_string(),
            x_bin_size: None,
            y_bin_size: None,
            plot_rotation: None,
        }
    }
}

impl FileOverrides {
    fn explicit_thresholds(&self) -> Option<ColorThresholds> {
        match (self.red_threshold, self.green_threshold) {
            (Some(red), Some(green)) => Some(ColorThresholds {
                start_of_red: red,
                start_of_green: green,
            }),
            _ => None,
        }
    }
}

/// Plot records recovered from one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutput {
    pub source_file: String,
    pub plot_types: Vec<String>,
    pub plots: Vec<PlotRecord>,
}

impl FileOutput {
    pub fn has_subplots(&self) -> bool {
        self.plots.len() > 1
    }
}

/// Plot family implied by the export's file name.
pub fn classify_file_family(file_name: &str) -> &'static str {
    if file_name.contains("ut_") {
        "ut"
    } else if file_name.contains("coating_") {
        "coating"
    } else if file_name.contains("laser_") {
        "laser"
    } else {
        "ut"
    }
}

pub fn assemble_file(
    resolved: ResolvedDocument,
    source_file: &str,
    overrides: &FileOverrides,
) -> Result<FileOutput> {
    if resolved.references.is_empty() {
        return Err(ExtractError::EmptyOutput);
    }

    let mut plot_types = vec![classify_file_family(source_file).to_string()];
    let is_cone_v1 = resolved
        .references
        .iter()
        .any(|(_, record)| record.contains(ColumnKey::Radius) && record.contains(ColumnKey::Angle));
    if is_cone_v1 {
        plot_types.push(CONE_V1.to_string());
    }

    let bin_sizes = resolve_bin_sizes(overrides, resolved.bin_size_candidates.as_deref());
    let explicit_thresholds = overrides.explicit_thresholds();
    if explicit_thresholds.is_none()
        && (overrides.red_threshold.is_some() || overrides.green_threshold.is_some())
    {
        warn!(
            source_file,
            "only one explicit threshold configured, estimating from colors"
        );
    }

    let mut plots = Vec::new();
    for (reference_id, mut record) in resolved.references {
        if record.len() < MIN_RAW_COLUMNS {
            debug!(source_file, reference_id = %reference_id, columns = record.len(), "skipping sparse reference");
            continue;
        }

        if has_cone_v2_layout(&record) {
            plot_types.push(CONE_V2.to_string());
        }

        if is_cone_v1 {
            remap_cone_v1(&mut record);
        }

        let thresholds = explicit_thresholds.or_else(|| derive_thresholds(&record));

        record.remove(ColumnKey::WallName);

        let (thickness_min, thickness_avg, thickness_max) = thickness_stats(&record);

        plots.push(PlotRecord {
            title: resolved.title.clone(),
            thresholds,
            thickness_min,
            thickness_avg,
            thickness_max,
            plot_rotation: overrides.plot_rotation,
            units: overrides.units.clone(),
            source_file: source_file.to_string(),
            plot_types: unique_tags(&plot_types),
            bin_sizes: bin_sizes.clone(),
            data: record,
        });
    }

    plots.retain(|plot| plot.data.len() >= MIN_ASSEMBLED_COLUMNS);
    if plots.is_empty() {
        return Err(ExtractError::EmptyOutput);
    }

    Ok(FileOutput {
        source_file: source_file.to_string(),
        plot_types: unique_tags(&plot_types),
        plots,
    })
}

fn has_cone_v2_layout(record: &ReferenceRecord) -> bool {
    record
        .get(ColumnKey::PlotX)
        .and_then(|plot_x| plot_x.items().first())
        .and_then(|first| first.len())
        == Some(CONE_V2_POINTS)
}

/// Old cone plots kept polar coordinates under `radius`/`angle` and the
/// display coordinates under the bin columns; move both to the current layout.
pub fn remap_cone_v1(record: &mut ReferenceRecord) {
    let radius = record.remove(ColumnKey::Radius);
    let angle = record.remove(ColumnKey::Angle);
    let display_x = record.remove(ColumnKey::XBin);
    let display_y = record.remove(ColumnKey::YBin);

    record.set_or_remove(ColumnKey::CustomerX, radius.clone());
    record.set_or_remove(ColumnKey::XBin, radius);
    record.set_or_remove(ColumnKey::CustomerY, angle.clone());
    record.set_or_remove(ColumnKey::YBin, angle);
    record.set_or_remove(ColumnKey::PlotX, display_x);
    record.set_or_remove(ColumnKey::PlotY, display_y);
}

fn derive_thresholds(record: &ReferenceRecord) -> Option<ColorThresholds> {
    let colors = record.get(ColumnKey::Color)?;
    let thickness = record.get(ColumnKey::Thickness)?;

    estimate_thresholds(
        colors
            .items()
            .iter()
            .zip(thickness.items())
            .filter_map(|(color, thickness)| Some((color.as_str()?, thickness.as_f64()?))),
    )
}

fn thickness_stats(record: &ReferenceRecord) -> (Option<f64>, Option<f64>, Option<f64>) {
    let Some(values) = record.get(ColumnKey::Thickness).map(|column| column.numbers()) else {
        return (None, None, None);
    };
    if values.is_empty() {
        return (None, None, None);
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;

    (Some(min), Some(avg), Some(max))
}

fn resolve_bin_sizes(
    overrides: &FileOverrides,
    candidates: Option<&[String]>,
) -> Vec<Option<f64>> {
    if let (Some(x), Some(y)) = (overrides.x_bin_size, overrides.y_bin_size) {
        return vec![Some(x), Some(y)];
    }

    candidates
        .unwrap_or_default()
        .iter()
        .map(|literal| {
            let size = parse_float_prefix(literal);
            if size.is_none() {
                warn!(literal = %literal, "unreadable bin size literal");
            }
            size
        })
        .collect()
}

/// Reads the longest leading decimal literal, ignoring whatever follows it
/// (`"12.5px"` is 12.5). Non-finite results count as unreadable.
pub fn parse_float_prefix(literal: &str) -> Option<f64> {
    let text = literal.trim_start();
    let bytes = text.as_bytes();
    let digits_after = |start: usize| {
        bytes[start.min(bytes.len())..]
            .iter()
            .take_while(|byte| byte.is_ascii_digit())
            .count()
    };

    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer_digits = digits_after(sign);
    let mut end = sign + integer_digits;

    if bytes.get(end) == Some(&b'.') {
        let fraction_digits = digits_after(end + 1);
        if integer_digits > 0 || fraction_digits > 0 {
            end += 1 + fraction_digits;
        }
    }
    if end == sign {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let exponent_sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent_digits = digits_after(end + 1 + exponent_sign);
        if exponent_digits > 0 {
            end += 1 + exponent_sign + exponent_digits;
        }
    }

    text[..end].parse::<f64>().ok().filter(|size| size.is_finite())
}

fn unique_tags(tags: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(tag) {
            unique.push(tag.clone());
        }
    }
    unique
}
