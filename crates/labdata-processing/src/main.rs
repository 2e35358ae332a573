//! CLI entry point for the lab surveillance data engine.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use labdata_processing::{
    Dataset, DuplicatePolicy, EngineConfig, Mapping, MappingSource, Pipeline, PipelineResult,
    ProcessingReport, ReportGenerator, RuleSet, SchemaSummary, TargetVocabulary,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Lab surveillance data schema, mapping and quality checks",
    long_about = "Infers the schema of a laboratory surveillance CSV, maps its columns onto \
                  the standard template fields, scores data quality and validates the core \
                  fields.\n\n\
                  EXAMPLES:\n  \
                  # Analyze and validate\n  \
                  labdata-processing -i lab.csv\n\n  \
                  # Preview the schema and suggested mapping only\n  \
                  labdata-processing -i lab.csv --dry-run\n\n  \
                  # Stricter matching, one target per source column\n  \
                  labdata-processing -i lab.csv --threshold 0.9 --exclusive\n\n  \
                  # Machine-readable output\n  \
                  labdata-processing -i lab.csv --json | jq .verdict\n\n\
                  EXIT STATUS:\n  \
                  0 when validation passes, 2 when it reports errors."
)]
struct Args {
    /// Path to the CSV file to process
    #[arg(short, long)]
    input: String,

    /// Output directory for reports
    #[arg(short, long, default_value = "./output")]
    output: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the JSON report to stdout instead of a human-readable summary
    ///
    /// Disables all logs so stdout only carries JSON.
    #[arg(long)]
    json: bool,

    /// Write the JSON report to <output>/<input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Similarity a suggested column match must exceed (0.0 - 1.0)
    #[arg(long, default_value = "0.8")]
    threshold: f64,

    /// Make a source column unavailable once a target has claimed it
    #[arg(long)]
    exclusive: bool,

    /// Additional target field, placed after the standard ones (repeatable)
    #[arg(long = "custom-field")]
    custom_fields: Vec<String>,

    /// JSON file with a manual mapping ({"Target field": "source column"})
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// JSON file with validation rules replacing the built-in table
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Validate the columns as loaded, without renaming them
    #[arg(long, conflicts_with = "mapping")]
    no_reconcile: bool,

    /// Show the schema and suggested mapping without running the checks
    #[arg(long)]
    dry_run: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// With `json_output` no subscriber is installed, so stdout stays pure JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let frame = load_csv_with_fallbacks(&args.input)?;
    let dataset = Dataset::from_columns(frame.take_columns(), DuplicatePolicy::Disambiguate)
        .context("Building dataset")?;
    info!(
        "Dataset loaded: {} rows x {} columns",
        dataset.height(),
        dataset.width()
    );

    let config = EngineConfig::builder()
        .similarity_threshold(args.threshold)
        .exclusive_mapping(args.exclusive)
        .output_dir(&args.output)
        .generate_reports(args.emit_report && !args.dry_run)
        .build()?;

    let pipeline = build_pipeline(&args, config)?;

    if args.dry_run {
        let (schema, mapping, source) = pipeline.preview(&dataset)?;
        print_dry_run(&args, &schema, &mapping, source, pipeline.vocabulary());
        return Ok(ExitCode::SUCCESS);
    }

    let result = match pipeline.process(dataset) {
        Ok(result) => result,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    let generator = ReportGenerator::new(&args.output, extract_file_stem(&args.input));
    let report = generator.build_report(&result);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if let Some(path) = &result.report_path {
            info!("Report written to: {}", path.display());
        }
        print_human_readable_summary(&args, &result, &report, pipeline.vocabulary());
    }

    if result.validation.has_blocking_errors() {
        Ok(ExitCode::from(2))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn build_pipeline(args: &Args, config: EngineConfig) -> Result<Pipeline> {
    let mut vocabulary = TargetVocabulary::standard();
    for field in &args.custom_fields {
        vocabulary.add_custom_field(field.as_str())?;
    }

    let mut builder = Pipeline::builder()
        .config(config)
        .vocabulary(vocabulary)
        .source_name(extract_file_stem(&args.input));

    if let Some(path) = &args.rules {
        let rules: RuleSet = read_json(path).context("Loading validation rules")?;
        builder = builder.rules(rules);
    }

    if let Some(path) = &args.mapping {
        let mapping: Mapping = read_json(path).context("Loading manual mapping")?;
        builder = builder.mapping(mapping);
    } else if args.no_reconcile {
        builder = builder.mapping(Mapping::new());
    }

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Parsing {}", path.display()))
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string()
}

/// Truncate a string to max characters with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn print_schema(schema: &SchemaSummary) {
    println!("SCHEMA");
    println!("{}", "-".repeat(40));
    println!(
        "{:<24} {:<10} {:<10} {:<8} {}",
        "Column", "Type", "Missing %", "Unique", "Samples"
    );
    println!("{}", "-".repeat(80));
    for column in &schema.columns {
        println!(
            "{:<24} {:<10} {:<10.1} {:<8} {}",
            truncate_str(&column.name, 23),
            column.inferred_type,
            column.missing_percentage,
            column.unique_count,
            truncate_str(&column.sample_values.join(", "), 30)
        );
    }
    println!();
}

fn print_mapping(mapping: &Mapping, source: MappingSource, vocabulary: &TargetVocabulary) {
    println!("COLUMN MAPPING ({:?}, {} of {} fields)", source, mapping.len(), vocabulary.len());
    println!("{}", "-".repeat(40));
    if mapping.is_empty() {
        println!("  No columns mapped");
    }
    for target in vocabulary.fields() {
        if let Some(source_column) = mapping.get(target) {
            println!("  {:<24} <- {}", target, source_column);
        }
    }
    for (source_column, targets) in mapping.collisions() {
        println!("  ! '{}' is mapped to: {}", source_column, targets.join(", "));
    }
    println!();
}

/// Dry-run output. Uses `println!` because this output is the point of the flag.
fn print_dry_run(
    args: &Args,
    schema: &SchemaSummary,
    mapping: &Mapping,
    source: MappingSource,
    vocabulary: &TargetVocabulary,
) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Schema and mapping preview");
    println!("{}\n", "=".repeat(80));

    println!("  File: {}", args.input);
    println!(
        "  Rows: {}  Columns: {}  Memory: {:.2} MB",
        schema.row_count, schema.column_count, schema.memory_usage_mb
    );
    println!();

    print_schema(schema);
    print_mapping(mapping, source, vocabulary);

    println!("{}", "=".repeat(80));
    println!("Run without --dry-run to assess quality and validate");
    println!("{}", "=".repeat(80));
}

fn print_human_readable_summary(
    args: &Args,
    result: &PipelineResult,
    report: &ProcessingReport,
    vocabulary: &TargetVocabulary,
) {
    println!();
    println!("{}", "=".repeat(80));
    println!("PROCESSING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input, report.shape.rows, report.shape.columns_before
    );
    println!(
        "Result: {} columns after reconciliation, {} ms",
        report.shape.columns_after, report.shape.duration_ms
    );
    println!();

    print_schema(&result.schema);
    print_mapping(&result.mapping, result.mapping_source, vocabulary);

    let metrics = &result.quality.metrics;
    println!("QUALITY");
    println!("{}", "-".repeat(40));
    println!("  Completeness: {:.3}", metrics.completeness);
    println!("  Consistency:  {:.3}", metrics.consistency);
    println!("  Accuracy:     {:.3}", metrics.accuracy);
    println!("  Validity:     {:.3}", metrics.validity);
    println!("  Uniqueness:   {:.3}", metrics.uniqueness);
    println!("  Overall:      {:.3}", metrics.overall_score);
    for issue in &result.quality.issues {
        println!("  - [{:?}] {}", issue.severity, issue.message);
    }
    for recommendation in &result.quality.recommendations {
        println!("  > {}", recommendation);
    }
    println!();

    if !result.profile.outliers.is_empty() {
        println!("OUTLIERS");
        println!("{}", "-".repeat(40));
        for outlier in &result.profile.outliers {
            println!(
                "  {}: {} values ({:.1}%)",
                outlier.column, outlier.count, outlier.percentage
            );
        }
        println!();
    }

    let validation = &result.validation;
    println!(
        "VALIDATION ({} errors, {} warnings)",
        validation.summary.total_errors, validation.summary.total_warnings
    );
    println!("{}", "-".repeat(40));
    for finding in &validation.errors {
        let rows: Vec<String> = finding.rows.iter().take(10).map(|r| r.to_string()).collect();
        let more = finding.rows.len().saturating_sub(10);
        println!(
            "  x [{}] {}{}",
            finding.kind,
            finding.message,
            if rows.is_empty() {
                String::new()
            } else if more > 0 {
                format!(" (rows {} and {} more)", rows.join(", "), more)
            } else {
                format!(" (rows {})", rows.join(", "))
            }
        );
    }
    for finding in &validation.warnings {
        println!("  ! [{}] {}", finding.kind, finding.message);
    }
    println!();

    println!(
        "Verdict: {}",
        if validation.has_blocking_errors() { "FAIL" } else { "PASS" }
    );
    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save the JSON report");
    println!("{}", "=".repeat(80));
}

/// Load a CSV, retrying with parse errors ignored.
fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_ignore_errors(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .with_context(|| format!("Failed to read CSV: {}", path))
}
