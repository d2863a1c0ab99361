use super::*;

pub fn run(args: ConvertArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let output_root = args.output_root.clone();
    let log_dir = output_root.join("logs");
    let manifest_path = output_root.join("manifests").join(format!(
        "convert_run_{}.json",
        utc_compact_string(started_ts)
    ));
    ensure_directory(&output_root)?;

    info!(
        input_root = %args.input_root.display(),
        output_root = %output_root.display(),
        run_id = %run_id,
        "starting convert"
    );

    let (inspections, warnings) =
        select_inspections(inventory::discover_inspections(&args.input_root)?, &args.inspections);

    let codec = build_codec(&args);
    let extractor = Extractor::new(codec.as_ref())?;
    let context = ConvertContext {
        extractor: &extractor,
        output_root: &output_root,
        default_units: &args.default_units,
        metric_units_inspections: &args.metric_units_inspections,
        copy_legacy: !args.skip_legacy_copy,
    };

    let outcomes: Vec<InspectionOutcome> = inspections
        .par_iter()
        .map(|files| convert_inspection(&context, files))
        .collect();

    let logged = write_category_logs(&log_dir, &outcomes)?;
    let counts = summarize(&outcomes);
    let status = if counts.failed_count == 0 {
        "completed"
    } else {
        "completed_with_failures"
    };

    let manifest = ConvertRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: std::env::args().collect::<Vec<_>>().join(" "),
        codec: codec.name().to_string(),
        paths: ConvertPaths {
            input_root: args.input_root.display().to_string(),
            output_root: output_root.display().to_string(),
            log_dir: log_dir.display().to_string(),
        },
        counts: counts.clone(),
        inspections: outcomes,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote convert run manifest");
    info!(
        run_id = %run_id,
        inspections = counts.inspection_count,
        converted = counts.converted_count,
        excel = counts.excel_placeholder_count,
        missing = counts.missing_count,
        failed = counts.failed_count,
        plots = counts.plot_count,
        log_lines = logged,
        "convert completed"
    );

    Ok(())
}

pub(super) fn build_codec(args: &ConvertArgs) -> Box<dyn NumericCodec> {
    match &args.codec_command {
        Some(program) => Box::new(SubprocessCodec::new(program.clone(), args.codec_args.clone())),
        None => Box::new(InProcessCodec),
    }
}

/// Narrows discovery to the requested slugs, warning about unknown ones.
pub(super) fn select_inspections(
    discovered: Vec<InspectionFiles>,
    requested: &[String],
) -> (Vec<InspectionFiles>, Vec<String>) {
    if requested.is_empty() {
        return (discovered, Vec::new());
    }

    let mut warnings = Vec::new();
    for slug in requested {
        if !discovered.iter().any(|files| &files.slug == slug) {
            warn!(inspection = %slug, "requested inspection not found");
            warnings.push(format!("requested inspection not found: {slug}"));
        }
    }

    let selected = discovered
        .into_iter()
        .filter(|files| requested.contains(&files.slug))
        .collect();
    (selected, warnings)
}
