use buyerscout::adapters;
use buyerscout::config::{parse_checks, parse_sources, PipelineConfig};
use buyerscout::export;
use buyerscout::logging;
use buyerscout::pipeline::Pipeline;
use buyerscout::types::{ProgressEvent, SourceId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "buyerscout")]
#[command(about = "Commodity buyer-lead scraper with full contact validation")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the acquisition + validation pipeline and export a CSV
    Run {
        /// Optional TOML config file; CLI flags override its values
        #[arg(long)]
        config: Option<String>,
        /// Commodity search term, e.g. "turmeric buyer"
        #[arg(long)]
        search_term: Option<String>,
        /// Stop once this many unique validated records are collected
        #[arg(long)]
        target: Option<usize>,
        /// Sources to scrape (comma-separated). Available: tradeindia, indiamart, exportersindia
        #[arg(long)]
        sources: Option<String>,
        /// Validation checks to run (comma-separated). Available: email, phone, domain, name
        #[arg(long)]
        checks: Option<String>,
        /// Minimum politeness delay between page requests, in milliseconds
        #[arg(long)]
        delay_min_ms: Option<u64>,
        /// Maximum politeness delay between page requests, in milliseconds
        #[arg(long)]
        delay_max_ms: Option<u64>,
        /// Name-similarity threshold for duplicate detection, in [0, 1]
        #[arg(long)]
        dedup_threshold: Option<f64>,
        /// Output CSV path
        #[arg(long, default_value = "output/buyers.csv")]
        output: PathBuf,
    },
    /// List the available listing platforms
    Sources,
}

fn build_config(
    config_path: Option<String>,
    search_term: Option<String>,
    target: Option<usize>,
    sources: Option<String>,
    checks: Option<String>,
    delay_min_ms: Option<u64>,
    delay_max_ms: Option<u64>,
    dedup_threshold: Option<f64>,
) -> anyhow::Result<PipelineConfig> {
    let mut config = match config_path {
        Some(path) => PipelineConfig::load(&path)?,
        None => PipelineConfig::default(),
    };

    if let Some(term) = search_term {
        config.search_term = term;
    }
    if let Some(n) = target {
        config.target_count = n;
    }
    if let Some(list) = sources {
        let names: Vec<String> = list.split(',').map(|s| s.trim().to_string()).collect();
        config.sources = parse_sources(&names)?;
    }
    if let Some(list) = checks {
        let names: Vec<String> = list.split(',').map(|s| s.trim().to_string()).collect();
        config.enabled_checks = parse_checks(&names)?;
    }
    if let Some(ms) = delay_min_ms {
        config.delay_min_ms = ms;
    }
    if let Some(ms) = delay_max_ms {
        config.delay_max_ms = ms;
    }
    if let Some(t) = dedup_threshold {
        config.dedup_threshold = t;
    }
    config.validate()?;
    Ok(config)
}

async fn run_pipeline(config: PipelineConfig, output: PathBuf) -> anyhow::Result<()> {
    let run_id = Uuid::new_v4();
    info!(%run_id, search_term = %config.search_term, "starting run");

    println!("🚀 Collecting buyers for \"{}\"", config.search_term);
    println!(
        "   Sources: {}",
        config
            .sources
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("   Target: {} unique validated records", config.target_count);

    let adapters: Vec<_> = config
        .sources
        .iter()
        .map(|s| adapters::create_adapter(*s, &config.search_term))
        .collect();

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n⏹️  Cancellation requested, finishing in-flight pages...");
            ctrl_c_cancel.cancel();
        }
    });

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            println!(
                "   [{}] page {} done: {} fetched, {} validated, {} to go",
                event.source,
                event.pages_fetched,
                event.records_fetched,
                event.records_validated,
                event.records_remaining
            );
        }
    });

    let target_count = config.target_count;
    let pipeline = Pipeline::new(config)?;
    let result = pipeline.run(adapters, cancel, progress_tx).await;
    let _ = printer.await;

    match result {
        Ok(output_data) => {
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            export::write_csv_file(&output_data.records, &output)?;

            let summary = &output_data.summary;
            println!("\n📊 Run summary:");
            println!("   Fetched:            {}", summary.total_fetched);
            println!(
                "   Validated:          {} / {} target",
                summary.total_validated, target_count
            );
            println!("   Incomplete dropped: {}", summary.total_incomplete_dropped);
            println!("   Invalid dropped:    {}", summary.total_invalid_dropped);
            println!(
                "   Unverifiable:       {}",
                summary.total_unverifiable_dropped
            );
            println!("   Duplicates dropped: {}", summary.total_duplicates_dropped);
            println!("   Page failures:      {}", summary.page_failures);
            println!("   Elapsed:            {}ms", summary.elapsed_ms);
            println!("💾 Saved {} records to {}", summary.total_validated, output.display());
            info!(validated = summary.total_validated, "run finished");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "run failed");
            println!("❌ Run failed: {e}");
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            search_term,
            target,
            sources,
            checks,
            delay_min_ms,
            delay_max_ms,
            dedup_threshold,
            output,
        } => {
            let config = build_config(
                config,
                search_term,
                target,
                sources,
                checks,
                delay_min_ms,
                delay_max_ms,
                dedup_threshold,
            )?;
            run_pipeline(config, output).await
        }
        Commands::Sources => {
            println!("Available sources:");
            for id in SourceId::all() {
                println!("   {}", id);
            }
            Ok(())
        }
    }
}
