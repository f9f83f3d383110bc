use anyhow::{Context, Result};
use clap::Parser;
use docsection_core::wordsource::TextLayerSource;
use docsection_core::{Orchestrator, PipelineConfig, WordSource};
use std::path::Path;

#[derive(Parser)]
#[command(name = "docsection")]
#[command(about = "Parse a PDF into layout-aware, labeled sections")]
struct Args {
    /// Path to the PDF file to parse
    input: String,

    /// Path to a custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Output file path (defaults to stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Enable detailed per-stage timing output
    #[arg(long)]
    profile: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    println!("📄 docsection: parsing {}", args.input);

    if !Path::new(&args.input).exists() {
        println!("⚠️  input PDF not found at: {}", args.input);
        return Ok(());
    }

    if let Some(config_path) = &args.config {
        println!("📋 loaded config from: {config_path}");
    } else {
        println!("📋 using default config");
    }

    let config = PipelineConfig::load(args.config.as_deref());
    let orchestrator_config = config.orchestrator.clone();
    let document = std::fs::read(&args.input).with_context(|| format!("reading {}", args.input))?;

    let text_layer = TextLayerSource::new(&config.word_source);
    let sources: Vec<&dyn WordSource> = vec![&text_layer];

    let mut orchestrator = Orchestrator::new(config);
    let outcome = orchestrator
        .parse(&document, &sources)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let record = outcome.output_record(args.input.clone(), &orchestrator_config);

    println!(
        "✅ parsed {} section(s) at quality {:.2} ({}) (run {}, hash {})",
        record.sections.len(),
        record.quality.score,
        record.quality.rung,
        outcome.run_id,
        &outcome.document_hash[..12]
    );
    if !outcome.warnings.is_empty() {
        println!("⚠️  {} warning(s):", outcome.warnings.len());
        for warning in &outcome.warnings {
            println!("   - {warning}");
        }
    }

    let json = serde_json::to_string_pretty(&record)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {path}"))?;
            println!("💾 wrote output to {path}");
        }
        None => println!("{json}"),
    }

    if args.profile {
        println!("ℹ️  per-stage timings were printed inline above (⏱️  lines)");
    }

    Ok(())
}
