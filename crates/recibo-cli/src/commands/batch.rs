//! Batch processing command for multiple document files.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, warn};

use recibo_core::IngestionPipeline;
use recibo_core::models::extraction::ExtractionResult;

use super::process::{OutputFormat, format_result, load_config, mime_from_path};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Existing category names, comma separated (hints for the AI stage)
    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct BatchEntry {
    path: PathBuf,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No files matched: {}", args.input);
    }

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)?;
    }

    // Documents run sequentially: key rotation is shared state and a batch
    // hammering one key in parallel just burns strategies faster.
    let pipeline = IngestionPipeline::from_config(&config);

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        pb.set_message(path.display().to_string());
        let start = Instant::now();

        let entry = match process_one(&pipeline, &path, &args.categories).await {
            Ok(result) => BatchEntry {
                path: path.clone(),
                result: Some(result),
                error: None,
                processing_time_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => {
                if !args.continue_on_error {
                    pb.abandon();
                    return Err(e.context(format!("failed on {}", path.display())));
                }
                error!(file = %path.display(), error = %e, "processing failed");
                BatchEntry {
                    path: path.clone(),
                    result: None,
                    error: Some(e.to_string()),
                    processing_time_ms: start.elapsed().as_millis() as u64,
                }
            }
        };

        if let (Some(dir), Some(result)) = (&args.output_dir, &entry.result) {
            let output = format_result(result, args.format, false)?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("result");
            let ext = match args.format {
                OutputFormat::Json => "json",
                OutputFormat::Text => "txt",
            };
            fs::write(dir.join(format!("{name}.{ext}")), output)?;
        }

        entries.push(entry);
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    print_summary(&entries);
    Ok(())
}

async fn process_one(
    pipeline: &IngestionPipeline<recibo_core::GeminiClient>,
    path: &PathBuf,
    categories: &[String],
) -> anyhow::Result<ExtractionResult> {
    let mime_type = mime_from_path(path)?;
    let data = fs::read(path)?;
    Ok(pipeline.process_file(&data, mime_type, categories).await?)
}

fn print_summary(entries: &[BatchEntry]) {
    let succeeded = entries.iter().filter(|e| e.result.is_some()).count();
    let failed = entries.len() - succeeded;
    let total_ms: u64 = entries.iter().map(|e| e.processing_time_ms).sum();

    println!();
    println!(
        "{} {} processed, {} failed ({} ms total)",
        style("Summary:").bold(),
        succeeded,
        failed,
        total_ms
    );

    for entry in entries.iter().filter(|e| e.error.is_some()) {
        warn!(file = %entry.path.display(), "failed");
        println!(
            "  {} {}: {}",
            style("✗").red(),
            entry.path.display(),
            entry.error.as_deref().unwrap_or("unknown error")
        );
    }
}
