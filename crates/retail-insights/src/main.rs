//! CLI entry point for the retail analysis pipeline.

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use retail_insights::{Pipeline, PipelineConfig, RenderStatus, RunSummary};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Retail transaction analysis: cleaning, KPIs and RFM segmentation",
    long_about = "Cleans a transactional retail dataset, computes global KPIs, product \
                  and price-tier rankings, RFM customer segments and temporal breakdowns, \
                  exports them as CSV/JSON and renders a report with an external program.\n\n\
                  EXAMPLES:\n  \
                  # Full analysis with a rendered report\n  \
                  retail-insights analyze data/online_retail.csv output/\n\n  \
                  # Export results only, machine-readable summary on stdout\n  \
                  retail-insights analyze data/online_retail.csv output/ --no-render --json"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a transactions file and write a report directory
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Path to the raw transactions CSV
    input_file: PathBuf,

    /// Directory under which the report folder is created
    output_dir: PathBuf,

    /// Directory containing a custom template.qmd
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Skip the external render step
    #[arg(long)]
    no_render: bool,

    /// Seconds the renderer may run before it is killed
    #[arg(long, value_name = "SECS", default_value = "600")]
    render_timeout: u64,

    /// Renderer program
    #[arg(long, value_name = "PROG", default_value = "quarto")]
    renderer: String,

    /// Write directly into OUTPUT_DIR instead of a timestamped subfolder
    #[arg(long)]
    flat_output: bool,

    /// Add the IsLargeOrder and TimeSegment columns
    #[arg(long)]
    advanced_features: bool,

    /// Keep only the N highest-revenue products
    #[arg(long, value_name = "N")]
    top_products: Option<usize>,

    /// Print the run summary as JSON instead of plain text
    ///
    /// Disables console logging so stdout only carries the JSON document.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over the computed level. Console logging is
/// disabled when `json_output` is true; the optional file layer is not.
fn init_logging(level: &str, json_output: bool, log_file: Option<&PathBuf>) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = (!json_output).then(|| fmt::layer().with_target(false));
    let file = match log_file {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| anyhow!("Cannot open log file {}: {}", path.display(), e))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load environment variables (RUST_LOG among them) from .env file
    dotenv().ok();

    match cli.command {
        Command::Analyze(ref args) => {
            let level = if args.debug {
                "debug"
            } else if cli.quiet {
                "warn"
            } else {
                cli.log_level.as_str()
            };
            init_logging(level, args.json, cli.log_file.as_ref())?;
            analyze(args)
        }
    }
}

fn analyze(args: &AnalyzeArgs) -> Result<()> {
    if !args.input_file.is_file() {
        error!("Input file not found: {}", args.input_file.display());
        return Err(anyhow!("Input file not found: {}", args.input_file.display()));
    }
    if let Some(dir) = &args.template_dir
        && !dir.is_dir()
    {
        error!("Template directory not found: {}", dir.display());
        return Err(anyhow!("Template directory not found: {}", dir.display()));
    }

    let mut builder = PipelineConfig::builder()
        .output_dir(&args.output_dir)
        .timestamped_output(!args.flat_output)
        .render_report(!args.no_render)
        .renderer_program(&args.renderer)
        .render_timeout(Some(Duration::from_secs(args.render_timeout)))
        .advanced_features(args.advanced_features);
    if let Some(dir) = &args.template_dir {
        builder = builder.template_dir(dir);
    }
    if let Some(limit) = args.top_products {
        builder = builder.top_products_limit(limit);
    }
    let config = builder.build()?;
    debug!("Configuration: {:?}", config);

    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(|update| {
            debug!("[{:>3.0}%] {}", update.progress * 100.0, update.message);
        })
        .build()?;

    let summary = pipeline.run(&args.input_file).map_err(|e| {
        error!("Analysis failed: {}", e);
        anyhow!("Analysis failed [{}]: {}", e.error_code(), e)
    })?;

    print_summary(&summary, args.json)
}

/// Print the run outcome to stdout; warnings go to stderr.
fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    for warning in &summary.warnings {
        warn!("{}", warning);
        eprintln!("Warning: {warning}");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    info!("Global KPIs: {:?}", summary.global_kpis);
    println!("Report directory: {}", summary.report_dir.display());
    match &summary.render {
        RenderStatus::Rendered { document } => println!("Rendered report: {}", document.display()),
        RenderStatus::Skipped => println!("Rendering skipped"),
        RenderStatus::Failed { .. } => println!("Rendering failed, result files are still available"),
    }
    Ok(())
}
