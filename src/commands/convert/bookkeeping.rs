use super::*;

/// Inspection-level conditions worth a line in `logs/<category>.log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Category {
    Multiple,
    Missing,
    Coating,
    Laser,
    Annotations,
    Excel,
    Failed,
}

impl Category {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::Multiple => "multiple",
            Self::Missing => "missing",
            Self::Coating => "coating",
            Self::Laser => "laser",
            Self::Annotations => "annotations",
            Self::Excel => "excel",
            Self::Failed => "failed",
        }
    }

    pub(super) fn from_extract_error(error: &ExtractError) -> Self {
        match error.category() {
            "excel" => Self::Excel,
            _ => Self::Failed,
        }
    }
}

/// Categories known before any file is converted.
pub(super) fn detect_categories(files: &InspectionFiles) -> Vec<Category> {
    let mut categories = Vec::new();

    let portal_count = files.named_containing(PORTAL_MARKER).len();
    let graph_count = files.named_containing(GRAPH_MARKER).len();
    if portal_count > 1 {
        categories.push(Category::Multiple);
    } else if portal_count == 0 && graph_count == 0 {
        categories.push(Category::Missing);
        return categories;
    }

    if files.named_containing("coating").len() > 1 {
        categories.push(Category::Coating);
    } else if files.named_containing("laser").len() > 1 {
        categories.push(Category::Laser);
    }

    if files.has_file_named(ANNOTATIONS_FILE) {
        categories.push(Category::Annotations);
    }

    categories
}

/// Appends one line per inspection and category; returns the line count.
pub(super) fn write_category_logs(log_dir: &Path, outcomes: &[InspectionOutcome]) -> Result<usize> {
    let mut written = 0;
    for outcome in outcomes {
        for category in &outcome.categories {
            append_line(&log_dir.join(format!("{category}.log")), &outcome.slug)?;
            written += 1;
        }
    }

    Ok(written)
}

pub(super) fn summarize(outcomes: &[InspectionOutcome]) -> ConvertCounts {
    let mut counts = ConvertCounts {
        inspection_count: outcomes.len(),
        ..ConvertCounts::default()
    };

    for outcome in outcomes {
        match outcome.status.as_str() {
            STATUS_CONVERTED => counts.converted_count += 1,
            STATUS_EXCEL_PLACEHOLDER => counts.excel_placeholder_count += 1,
            STATUS_MISSING => counts.missing_count += 1,
            _ => counts.failed_count += 1,
        }
        counts.source_file_count += outcome.source_files.len();
        counts.failed_file_count += outcome.failures.len();
        counts.plot_count += outcome.plot_count;
    }

    counts
}
