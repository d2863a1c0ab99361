use super::*;

pub(super) const STATUS_CONVERTED: &str = "converted";
pub(super) const STATUS_EXCEL_PLACEHOLDER: &str = "excel_placeholder";
pub(super) const STATUS_MISSING: &str = "missing";
pub(super) const STATUS_FAILED: &str = "failed";

/// Run-wide inputs shared by every inspection worker.
pub(super) struct ConvertContext<'a> {
    pub extractor: &'a Extractor<'a>,
    pub output_root: &'a Path,
    pub default_units: &'a str,
    pub metric_units_inspections: &'a [String],
    pub copy_legacy: bool,
}

/// Values read from the inspection's settings and summary report.
#[derive(Debug, Clone, Default)]
pub(super) struct InspectionSettings {
    pub processing: ProcessingSettings,
    pub num_data_readings: Option<Number>,
}

impl InspectionSettings {
    /// Explicit thresholds only reach the first source file.
    pub(super) fn overrides_for(&self, index: usize, units: &str) -> FileOverrides {
        let first = index == 0;
        FileOverrides {
            red_threshold: self
                .processing
                .red_thickness_threshold
                .filter(|_| first),
            green_threshold: self
                .processing
                .green_thickness_threshold
                .filter(|_| first),
            units: units.to_string(),
            x_bin_size: self.processing.x_bin_size,
            y_bin_size: self.processing.y_bin_size,
            plot_rotation: self.processing.plot_rotation,
        }
    }
}

/// Never fails; errors become a `failed` outcome.
pub(super) fn convert_inspection(
    context: &ConvertContext<'_>,
    files: &InspectionFiles,
) -> InspectionOutcome {
    match try_convert_inspection(context, files) {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(inspection = %files.slug, error = %format!("{err:#}"), "inspection failed");
            InspectionOutcome {
                slug: files.slug.clone(),
                status: STATUS_FAILED.to_string(),
                categories: vec![Category::Failed.as_str().to_string()],
                source_files: Vec::new(),
                failures: vec![FileFailure {
                    source_file: String::new(),
                    category: Category::Failed.as_str().to_string(),
                    error: format!("{err:#}"),
                }],
                plot_count: 0,
                inspection_types: Vec::new(),
            }
        }
    }
}

fn try_convert_inspection(
    context: &ConvertContext<'_>,
    files: &InspectionFiles,
) -> Result<InspectionOutcome> {
    debug!(
        inspection = %files.slug,
        root = %files.root.display(),
        files = files.files.len(),
        "converting inspection"
    );
    let mut categories = detect_categories(files);
    for category in &categories {
        info!(inspection = %files.slug, category = category.as_str(), "flagged inspection");
    }

    let mut outcome = InspectionOutcome {
        slug: files.slug.clone(),
        status: STATUS_MISSING.to_string(),
        categories: Vec::new(),
        source_files: Vec::new(),
        failures: Vec::new(),
        plot_count: 0,
        inspection_types: Vec::new(),
    };

    if categories.contains(&Category::Missing) {
        outcome.categories = category_names(&categories);
        return Ok(outcome);
    }

    let settings = load_settings(files)?;
    let units = resolve_units(context, &files.slug, &settings.processing);
    let inspection_dir = context.output_root.join(&files.slug);

    if context.copy_legacy {
        copy_legacy_files(files, &inspection_dir.join("legacy"))?;
    }

    let sources = source_files(files);
    outcome.source_files = sources.iter().map(|file| file.name.clone()).collect();

    let results: Vec<(&CandidateFile, Result<FileOutput>)> = sources
        .par_iter()
        .enumerate()
        .map(|(index, file)| {
            let overrides = settings.overrides_for(index, &units);
            info!(inspection = %files.slug, file = %file.name, "detected source file");
            (*file, convert_file(context.extractor, file, &overrides))
        })
        .collect();

    let mut outputs = Vec::new();
    let mut excel_source = None;
    for (file, result) in results {
        match result {
            Ok(output) => {
                debug!(file = %file.name, plots = output.plots.len(), "converted source file");
                outputs.push(output);
            }
            Err(err) => {
                let category = err
                    .downcast_ref::<ExtractError>()
                    .map_or(Category::Failed, Category::from_extract_error);
                if category == Category::Excel {
                    info!(inspection = %files.slug, file = %file.name, "excel placeholder found");
                    excel_source.get_or_insert_with(|| file.name.clone());
                } else {
                    warn!(
                        inspection = %files.slug,
                        file = %file.name,
                        error = %format!("{err:#}"),
                        "unable to convert source file"
                    );
                }
                if !categories.contains(&category) {
                    categories.push(category);
                }
                outcome.failures.push(FileFailure {
                    source_file: file.name.clone(),
                    category: category.as_str().to_string(),
                    error: format!("{err:#}"),
                });
            }
        }
    }

    let stats = InspectionStats {
        num_data_readings: settings.num_data_readings.clone(),
    };

    if !outputs.is_empty() {
        let has_annotations = categories.contains(&Category::Annotations);
        let combined = aggregate_inspection(outputs, has_annotations);
        write_json(&inspection_dir.join(PLOT_DATA_FILE), &combined)?;
        write_json(&inspection_dir.join(STATS_FILE), &stats)?;

        info!(
            inspection = %files.slug,
            plots = combined.plots.len(),
            types = %combined.inspection_types.join(","),
            "successfully converted inspection"
        );
        outcome.status = STATUS_CONVERTED.to_string();
        outcome.plot_count = combined.plots.len();
        outcome.inspection_types = combined.inspection_types;
    } else if let Some(source_file) = excel_source {
        write_json(
            &inspection_dir.join(PLOT_DATA_FILE),
            &ExcelPlaceholderOutput::new(&source_file),
        )?;
        write_json(
            &inspection_dir.join(STATS_FILE),
            &InspectionStats {
                num_data_readings: None,
            },
        )?;
        outcome.status = STATUS_EXCEL_PLACEHOLDER.to_string();
    } else {
        if !categories.contains(&Category::Failed) {
            categories.push(Category::Failed);
        }
        warn!(inspection = %files.slug, "no source file produced plots");
        outcome.status = STATUS_FAILED.to_string();
    }

    outcome.categories = category_names(&categories);
    Ok(outcome)
}

fn convert_file(
    extractor: &Extractor<'_>,
    file: &CandidateFile,
    overrides: &FileOverrides,
) -> Result<FileOutput> {
    let text = read_text_lossy(&file.path)?;
    let location = file.path.display().to_string();
    let source = SourceFile {
        location: &location,
        file_name: &file.name,
        text: &text,
    };

    Ok(extractor.extract_file(&source, overrides)?)
}

/// Portal exports when present, otherwise graph exports.
pub(super) fn source_files(files: &InspectionFiles) -> Vec<&CandidateFile> {
    let portal = files.named_containing(PORTAL_MARKER);
    if portal.is_empty() {
        files.named_containing(GRAPH_MARKER)
    } else {
        portal
    }
}

pub(super) fn load_settings(files: &InspectionFiles) -> Result<InspectionSettings> {
    let mut settings = InspectionSettings::default();

    if let Some(processing) = read_single_json::<ProcessingSettings>(files, SETTINGS_FILE)? {
        settings.processing = processing;
    }
    if let Some(report) = read_single_json::<SummaryReport>(files, SUMMARY_REPORT_FILE)? {
        settings.num_data_readings = report.number_of_data_points;
    }

    Ok(settings)
}

/// Parses the file only when exactly one candidate matches. Malformed
/// content is logged and treated as absent.
fn read_single_json<T: serde::de::DeserializeOwned>(
    files: &InspectionFiles,
    marker: &str,
) -> Result<Option<T>> {
    let candidates = files.named_containing(marker);
    let [file] = candidates.as_slice() else {
        if candidates.len() > 1 {
            warn!(inspection = %files.slug, marker, count = candidates.len(), "ambiguous input files, ignoring");
        }
        return Ok(None);
    };

    let raw = fs::read(&file.path)
        .with_context(|| format!("failed to read {}", file.path.display()))?;
    match serde_json::from_slice(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            warn!(path = %file.path.display(), error = %err, "ignoring malformed input file");
            Ok(None)
        }
    }
}

pub(super) fn resolve_units(
    context: &ConvertContext<'_>,
    slug: &str,
    processing: &ProcessingSettings,
) -> String {
    if context
        .metric_units_inspections
        .iter()
        .any(|candidate| candidate == slug)
    {
        return METRIC_UNITS.to_string();
    }

    processing
        .units
        .clone()
        .unwrap_or_else(|| context.default_units.to_string())
}

fn copy_legacy_files(files: &InspectionFiles, legacy_dir: &Path) -> Result<()> {
    ensure_directory(legacy_dir)?;
    for file in &files.files {
        copy_file(&file.path, &legacy_dir.join(&file.name))?;
    }
    debug!(
        inspection = %files.slug,
        count = files.files.len(),
        "copied legacy inputs"
    );
    Ok(())
}

fn category_names(categories: &[Category]) -> Vec<String> {
    categories
        .iter()
        .map(|category| category.as_str().to_string())
        .collect()
}
