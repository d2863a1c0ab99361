use std::path::PathBuf;

use serde_json::{Value, json};

use super::run::select_inspections;
use super::*;

const SLUG: &str = "20190312-a1b2c3";

fn ut_portal_html() -> String {
    let document = json!({
        "roots": {
            "references": [{
                "attributes": {
                    "data": {
                        "x": [1.0, 2.0, 3.0],
                        "y": [1.0, 1.0, 1.0],
                        "customer_x": [10.0, 20.0, 30.0],
                        "customer_y": [5.0, 5.0, 5.0],
                        "color": ["#ff0000", "#ff8000", "#40ff00"],
                        "thickness": [1.0, 5.0, 9.0]
                    }
                },
                "type": "ColumnDataSource"
            }]
        }
    });
    format!(
        "<html><body>\n<script type=\"application/json\" id=\"p1001\">{document}</script>\n</body></html>"
    )
}

fn write_file(path: PathBuf, contents: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write");
}

fn read_json(path: PathBuf) -> Value {
    let raw = fs::read(&path).expect("read");
    serde_json::from_slice(&raw).expect("json")
}

fn discover_one(input_root: &Path) -> InspectionFiles {
    let mut inspections = inventory::discover_inspections(input_root).expect("discover");
    assert_eq!(inspections.len(), 1);
    inspections.remove(0)
}

fn context<'a>(
    extractor: &'a Extractor<'a>,
    output_root: &'a Path,
    metric: &'a [String],
) -> ConvertContext<'a> {
    ConvertContext {
        extractor,
        output_root,
        default_units: "ft-in",
        metric_units_inspections: metric,
        copy_legacy: true,
    }
}

#[test]
fn categories_flag_multiple_portals_and_annotations() {
    let input = tempfile::tempdir().expect("tempdir");
    let root = input.path().join(SLUG);
    write_file(root.join("a_ut_portal.html"), "");
    write_file(root.join("b_ut_portal.html"), "");
    write_file(root.join("binned_coating.csv"), "");
    write_file(root.join("deliverable").join("wall_coating_graph.html"), "");
    write_file(root.join("plot_annotations.json"), "{}");

    let categories = detect_categories(&discover_one(input.path()));
    assert_eq!(
        categories,
        vec![Category::Multiple, Category::Coating, Category::Annotations]
    );
}

#[test]
fn inspection_without_reports_is_missing() {
    let input = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    write_file(input.path().join(SLUG).join("summary_report.json"), "{}");

    let extractor = Extractor::new(&InProcessCodec).expect("extractor");
    let outcome = convert_inspection(
        &context(&extractor, output.path(), &[]),
        &discover_one(input.path()),
    );

    assert_eq!(outcome.status, STATUS_MISSING);
    assert_eq!(outcome.categories, vec!["missing".to_string()]);
    assert!(!output.path().join(SLUG).exists());
}

#[test]
fn portal_inspection_writes_artifacts_and_legacy_copy() {
    let input = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let root = input.path().join(SLUG);
    write_file(root.join("wall_ut_portal.html"), &ut_portal_html());
    write_file(
        root.join("deliverable").join("dataprocessor_settings.json"),
        r#"{"red_thickness_threshold": 2.0, "green_thickness_threshold": 6.0, "units": "in-in"}"#,
    );
    write_file(
        root.join("summary_report.json"),
        r#"{"Number of data points": 1234}"#,
    );

    let extractor = Extractor::new(&InProcessCodec).expect("extractor");
    let outcome = convert_inspection(
        &context(&extractor, output.path(), &[]),
        &discover_one(input.path()),
    );

    assert_eq!(outcome.status, STATUS_CONVERTED);
    assert_eq!(outcome.plot_count, 1);
    assert_eq!(outcome.inspection_types, vec!["legacy".to_string()]);

    let data = read_json(output.path().join(SLUG).join(PLOT_DATA_FILE));
    assert_eq!(data["data_version"], json!("v1.0"));
    let plot = &data["plots"][0];
    assert_eq!(plot["units"], json!("in-in"));
    assert_eq!(plot["thresholds"]["start_of_red"], json!(2.0));
    assert_eq!(plot["thresholds"]["start_of_green"], json!(6.0));
    assert_eq!(plot["data"]["x_bin"], json!([1.0, 2.0, 3.0]));

    let stats = read_json(output.path().join(SLUG).join(STATS_FILE));
    assert_eq!(stats["num_data_readings"], json!(1234));

    let legacy = output.path().join(SLUG).join("legacy");
    assert!(legacy.join("wall_ut_portal.html").is_file());
    assert!(legacy.join("dataprocessor_settings.json").is_file());
}

#[test]
fn only_first_source_file_receives_explicit_thresholds() {
    let settings = InspectionSettings {
        processing: ProcessingSettings {
            red_thickness_threshold: Some(2.0),
            green_thickness_threshold: Some(6.0),
            x_bin_size: Some(12.5),
            ..ProcessingSettings::default()
        },
        num_data_readings: None,
    };

    let first = settings.overrides_for(0, "ft-in");
    let second = settings.overrides_for(1, "ft-in");
    assert_eq!(first.red_threshold, Some(2.0));
    assert_eq!(first.green_threshold, Some(6.0));
    assert_eq!(second.red_threshold, None);
    assert_eq!(second.green_threshold, None);
    assert_eq!(second.x_bin_size, Some(12.5));
}

#[test]
fn metric_unit_inspections_override_settings() {
    let extractor = Extractor::new(&InProcessCodec).expect("extractor");
    let output = PathBuf::from("unused");
    let metric = vec![SLUG.to_string()];
    let run_context = context(&extractor, &output, &metric);
    let processing = ProcessingSettings {
        units: Some("ft-in".to_string()),
        ..ProcessingSettings::default()
    };

    assert_eq!(resolve_units(&run_context, SLUG, &processing), METRIC_UNITS);
    assert_eq!(
        resolve_units(&run_context, "20190101-000000", &processing),
        "ft-in"
    );
    assert_eq!(
        resolve_units(&run_context, "20190101-000000", &ProcessingSettings::default()),
        "ft-in"
    );
}

#[test]
fn excel_only_inspection_gets_placeholder_artifact() {
    let input = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    write_file(
        input.path().join(SLUG).join("wall_ut_portal.html"),
        "<html><a href=\"report.xlsx\" class=\"excel_download\"></a></html>",
    );

    let extractor = Extractor::new(&InProcessCodec).expect("extractor");
    let outcome = convert_inspection(
        &context(&extractor, output.path(), &[]),
        &discover_one(input.path()),
    );

    assert_eq!(outcome.status, STATUS_EXCEL_PLACEHOLDER);
    assert_eq!(outcome.categories, vec!["excel".to_string()]);

    let data = read_json(output.path().join(SLUG).join(PLOT_DATA_FILE));
    assert_eq!(data["plots"][0]["plot_types"], json!(["excel_only"]));
    assert_eq!(data["plots"][0]["source_file"], json!("wall_ut_portal.html"));
    let stats = read_json(output.path().join(SLUG).join(STATS_FILE));
    assert_eq!(stats["num_data_readings"], Value::Null);
}

#[test]
fn unrecognized_report_marks_inspection_failed() {
    let input = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    write_file(
        input.path().join(SLUG).join("wall_ut_graph.html"),
        "<html><body>no plot here</body></html>",
    );

    let extractor = Extractor::new(&InProcessCodec).expect("extractor");
    let outcome = convert_inspection(
        &context(&extractor, output.path(), &[]),
        &discover_one(input.path()),
    );

    assert_eq!(outcome.status, STATUS_FAILED);
    assert_eq!(outcome.categories, vec!["failed".to_string()]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].source_file, "wall_ut_graph.html");
    assert!(!output.path().join(SLUG).join(PLOT_DATA_FILE).exists());
}

#[test]
fn category_logs_append_one_line_per_inspection() {
    let output = tempfile::tempdir().expect("tempdir");
    let log_dir = output.path().join("logs");
    let outcome = |slug: &str, categories: &[&str]| InspectionOutcome {
        slug: slug.to_string(),
        status: STATUS_CONVERTED.to_string(),
        categories: categories.iter().map(|value| value.to_string()).collect(),
        source_files: Vec::new(),
        failures: Vec::new(),
        plot_count: 0,
        inspection_types: Vec::new(),
    };

    let outcomes = vec![
        outcome("20190101-aaaaaa", &["multiple", "annotations"]),
        outcome("20190102-bbbbbb", &["multiple"]),
    ];
    assert_eq!(write_category_logs(&log_dir, &outcomes).expect("logs"), 3);
    assert_eq!(write_category_logs(&log_dir, &outcomes[1..]).expect("logs"), 1);

    let multiple = fs::read_to_string(log_dir.join("multiple.log")).expect("read");
    assert_eq!(
        multiple,
        "20190101-aaaaaa\n20190102-bbbbbb\n20190102-bbbbbb\n"
    );
    let annotations = fs::read_to_string(log_dir.join("annotations.log")).expect("read");
    assert_eq!(annotations, "20190101-aaaaaa\n");
}

#[test]
fn summary_counts_statuses_and_plots() {
    let outcome = |status: &str, plots: usize| InspectionOutcome {
        slug: String::new(),
        status: status.to_string(),
        categories: Vec::new(),
        source_files: vec!["a_portal.html".to_string()],
        failures: Vec::new(),
        plot_count: plots,
        inspection_types: Vec::new(),
    };

    let counts = summarize(&[
        outcome(STATUS_CONVERTED, 2),
        outcome(STATUS_CONVERTED, 1),
        outcome(STATUS_EXCEL_PLACEHOLDER, 0),
        outcome(STATUS_FAILED, 0),
    ]);
    assert_eq!(counts.inspection_count, 4);
    assert_eq!(counts.converted_count, 2);
    assert_eq!(counts.excel_placeholder_count, 1);
    assert_eq!(counts.failed_count, 1);
    assert_eq!(counts.source_file_count, 4);
    assert_eq!(counts.plot_count, 3);
}

#[test]
fn selection_keeps_requested_slugs_and_warns_on_unknown() {
    let files = |slug: &str| InspectionFiles {
        slug: slug.to_string(),
        root: PathBuf::from(slug),
        files: Vec::new(),
    };

    let (selected, warnings) = select_inspections(
        vec![files("20190101-aaaaaa"), files("20190102-bbbbbb")],
        &["20190102-bbbbbb".to_string(), "20190103-cccccc".to_string()],
    );
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].slug, "20190102-bbbbbb");
    assert_eq!(warnings.len(), 1);
}
