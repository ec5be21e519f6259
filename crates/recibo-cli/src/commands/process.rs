//! Process command - extract data from a single document file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use recibo_core::models::config::ReciboConfig;
use recibo_core::models::extraction::{ExtractionMethod, ExtractionResult};
use recibo_core::patterns::extract_with_patterns;
use recibo_core::pdf::{PdfTextExtractor, PdfTextSource};
use recibo_core::IngestionPipeline;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Skip the AI stage and report the regex result regardless of confidence
    #[arg(long)]
    regex_only: bool,

    /// Existing category names, comma separated (hints for the AI stage)
    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let mime_type = mime_from_path(&args.input)?;
    let data = fs::read(&args.input)?;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message("Extracting...");

    let result = if args.regex_only {
        regex_only(&data, mime_type)?
    } else {
        let pipeline = IngestionPipeline::from_config(&config);
        pipeline.process_file(&data, mime_type, &args.categories).await?
    };

    pb.finish_and_clear();

    let output = format_result(&result, args.format, args.show_confidence)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Wrote result to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    info!("Finished in {:?}", start.elapsed());
    Ok(())
}

/// Load config from an explicit path, the default location, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ReciboConfig> {
    let mut config = if let Some(path) = config_path {
        ReciboConfig::from_file(Path::new(path))?
    } else {
        let default_path = default_config_path();
        if default_path.exists() {
            ReciboConfig::from_file(&default_path)?
        } else {
            ReciboConfig::default()
        }
    };

    // API keys from the environment are appended after any configured ones.
    for var in ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"] {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() && !config.ai.api_keys.contains(&key) {
                config.ai.api_keys.push(key);
            }
        }
    }

    Ok(config)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recibo")
        .join("config.json")
}

/// Map a file extension to the pipeline's mime gate.
pub fn mime_from_path(path: &Path) -> anyhow::Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "pdf" => Ok("application/pdf"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    }
}

fn regex_only(data: &[u8], mime_type: &str) -> anyhow::Result<ExtractionResult> {
    if mime_type != "application/pdf" {
        anyhow::bail!("--regex-only works on PDF files only");
    }
    let transcript = PdfTextExtractor.extract_text(data)?;
    Ok(extract_with_patterns(&transcript).into_extraction_result(Utc::now()))
}

pub fn format_result(
    result: &ExtractionResult,
    format: OutputFormat,
    show_confidence: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Text => Ok(format_text(result, show_confidence)),
    }
}

fn format_text(result: &ExtractionResult, show_confidence: bool) -> String {
    let mut out = String::new();

    let method = match result.extraction_method {
        ExtractionMethod::Regex => "regex",
        ExtractionMethod::Ai => "ai",
    };

    out.push_str(&format!(
        "Merchant:  {}\n",
        result.merchant.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!("Date:      {}\n", result.date.as_deref().unwrap_or("-")));
    out.push_str(&format!("Amount:    R$ {:.2}\n", result.amount));
    if let Some(category) = &result.category {
        out.push_str(&format!("Category:  {}\n", category));
    }
    out.push_str(&format!("Method:    {}\n", method));
    if show_confidence {
        out.push_str(&format!("Confidence: {:.2}\n", result.confidence));
    }

    if result.is_multi_transaction {
        out.push_str(&format!(
            "Statement with {} transactions\n",
            result.transactions.len()
        ));
        for tx in &result.transactions {
            out.push_str(&format!(
                "  {}  {}  R$ {:.2}{}\n",
                tx.date.as_deref().unwrap_or("----------"),
                tx.merchant.as_deref().unwrap_or("-"),
                tx.amount,
                if tx.is_refund { " (refund)" } else { "" }
            ));
        }
    }

    for item in &result.items {
        out.push_str(&format!(
            "  item: {}  R$ {:.2}\n",
            item.description, item.total_price
        ));
    }

    out
}
