use anyhow::Context;
use clap::Parser;
use prow_etl::core::batch::{self, BatchRunner};
use prow_etl::utils::{logger, validation::Validate};
use prow_etl::{BatchConfig, LocalStorage};

#[derive(Parser)]
#[command(name = "batch-analyse")]
#[command(about = "Run the rights-of-way survey for a batch of authorities")]
struct Args {
    /// Path to TOML batch configuration file
    #[arg(short, long, default_value = "batch-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting batch rights-of-way survey");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = BatchConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let jobs = match config.jobs() {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        for job in &jobs {
            println!(
                "  Would analyse '{}' (code {}, region '{}') -> {}/{}",
                job.authority,
                job.code,
                job.region,
                config.output.output_dir,
                job.code
            );
        }
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(".".to_string());
    let runner = BatchRunner::new(storage, config).with_monitoring(monitor_enabled);

    match runner.run_all(&jobs).await {
        Ok(results) => {
            let summary = batch::execution_summary(&results);
            tracing::info!("✅ Batch completed: {:?}", summary);
            println!("✅ Batch completed successfully!");
            println!(
                "📊 {} runs, {} skipped, {} candidate edges found",
                summary["total_runs"], summary["skipped_runs"], summary["candidate_edges"]
            );
            for result in &results {
                if !result.skipped {
                    println!("📁 {} -> {}", result.code, result.output_path);
                }
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Batch failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                prow_etl::utils::error::ErrorSeverity::Low => 0,
                prow_etl::utils::error::ErrorSeverity::Medium => 2,
                prow_etl::utils::error::ErrorSeverity::High => 1,
                prow_etl::utils::error::ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &BatchConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!(
        "  Batch: {} v{}",
        config.batch.name,
        config.batch.version.as_deref().unwrap_or("0")
    );
    println!("  Runs: {}", config.batch.runs.len());
    println!("  RoW endpoint: {}", config.endpoints.row);
    println!("  Traces endpoint: {}", config.endpoints.traces);
    println!("  Overpass endpoint: {}", config.endpoints.overpass);
    println!("  Data dir: {}", config.output.data_dir);
    println!("  Output dir: {}", config.output.output_dir);
    println!(
        "  Tuning: spacing {}m, radius {}m, chunks {}m, coverage {}",
        config.tuning.sample_spacing_m,
        config.tuning.match_radius_m,
        config.tuning.chunk_length_m,
        config.tuning.row_coverage
    );
    println!("  Concurrent Requests: {}", config.tuning.concurrent_requests);

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
