use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use listing_vision::collaborators::background_removal::{
    ReplicateBackgroundRemover, process_selection,
};
use listing_vision::collaborators::search::{
    DEFAULT_RESULT_COUNT, GoogleImageSearch, search_candidates,
};
use listing_vision::config::{AppConfig, SelectorConfig};
use listing_vision::core_modules::image_fetcher::HttpImageSource;
use listing_vision::parallel_pipeline::ParallelPipeline;
use listing_vision::pipeline::{CandidateImage, GroupReport, SelectionPipeline, SelectionResult};
use listing_vision::table::{self, ListingRow, ProductRow};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "listing_vision")]
#[command(about = "Pick the best listing image for each product")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search candidate image URLs for every product in a table
    Search {
        /// CSV with columns brand,product_name
        #[arg(short, long)]
        input: PathBuf,
        /// Candidate table to write
        #[arg(short, long)]
        output: PathBuf,
        /// Number of image results per product
        #[arg(short, long, default_value_t = DEFAULT_RESULT_COUNT)]
        count: usize,
    },
    /// Select one image per product from a candidate table
    Select {
        /// CSV with columns brand,product_name,image_url
        #[arg(short, long)]
        input: PathBuf,
        /// Result table to write
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Remove the background of one image and save it as a PNG
    RemoveBackground {
        #[arg(long)]
        url: String,
        #[arg(long)]
        brand: String,
        #[arg(long)]
        product: String,
        #[arg(long, default_value = "processed_images")]
        dir: PathBuf,
    },
    /// Search, select and remove the background for a single product
    Run {
        #[arg(long)]
        brand: String,
        #[arg(long)]
        product: String,
        #[arg(short, long, default_value_t = DEFAULT_RESULT_COUNT)]
        count: usize,
        #[arg(long, default_value = "processed_images")]
        dir: PathBuf,
        /// Listings table the finished product is appended to
        #[arg(long, default_value = "data.csv")]
        listings: PathBuf,
        #[command(flatten)]
        selection: SelectionArgs,
    },
}

#[derive(Args)]
struct SelectionArgs {
    /// Minimum average brightness of a usable background
    #[arg(long)]
    min_brightness: Option<u8>,
    /// URL prefixes never selected (replaces the default list)
    #[arg(long = "exclude")]
    excluded_domains: Vec<String>,
    /// Evaluation workers (defaults to LISTING_VISION_WORKERS or the CPU count)
    #[arg(short, long)]
    workers: Option<usize>,
    /// Evaluate one candidate at a time
    #[arg(long)]
    sequential: bool,
    /// Write the per-group diagnostic report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

impl SelectionArgs {
    fn selector_config(&self) -> SelectorConfig {
        let mut config = SelectorConfig::default();
        if let Some(brightness) = self.min_brightness {
            config.min_background_brightness = brightness;
        }
        if !self.excluded_domains.is_empty() {
            config.excluded_domains = self.excluded_domains.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search { input, output, count } => {
            let products = table::read_products(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let search = GoogleImageSearch::from_credentials(
                config.google_api_key.as_deref(),
                config.google_cse_id.as_deref(),
            )?;
            let candidates = search_candidates(&search, &products, count).await?;
            table::write_candidates(&output, &candidates)?;
            info!(
                products = products.len(),
                candidates = candidates.len(),
                output = %output.display(),
                "search complete"
            );
        }
        Commands::Select { input, output, selection } => {
            let candidates = table::read_candidates(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let reports = evaluate(&config, &selection, &candidates).await?;
            let results: Vec<_> = reports.iter().filter_map(GroupReport::selection).collect();
            table::write_results(&output, &results)?;
            info!(
                groups = reports.len(),
                selected = results.len(),
                output = %output.display(),
                "selection complete"
            );
        }
        Commands::RemoveBackground { url, brand, product, dir } => {
            let remover =
                ReplicateBackgroundRemover::from_token(config.replicate_api_token.as_deref())?;
            let selection = SelectionResult {
                brand,
                product_name: product,
                chosen_url: url,
            };
            let path = process_selection(&remover, &selection, &dir).await?;
            println!("{}", path.display());
        }
        Commands::Run {
            brand,
            product,
            count,
            dir,
            listings,
            selection,
        } => {
            let product = ProductRow {
                brand,
                product_name: product,
            };
            let outputs = RunOutputs {
                processed_dir: &dir,
                listings: &listings,
            };
            run_single_product(&config, product, count, outputs, &selection).await?;
        }
    }

    Ok(())
}

/// Evaluates and ranks every group, writing the diagnostic report when asked to.
async fn evaluate(
    config: &AppConfig,
    args: &SelectionArgs,
    candidates: &[CandidateImage],
) -> Result<Vec<GroupReport>> {
    let source = HttpImageSource::new(config.fetch_timeout)?;
    let selector_config = args.selector_config();

    let reports = if args.sequential {
        SelectionPipeline::new(source, selector_config)
            .generate_reports(candidates)
            .await
    } else {
        let workers = args.workers.unwrap_or(config.workers);
        let pipeline = ParallelPipeline::new(source, selector_config, workers);
        let reports = pipeline.generate_reports(candidates).await;
        pipeline.shutdown().await;
        reports
    };

    if let Some(path) = &args.report {
        write_report(path, &reports)?;
    }
    Ok(reports)
}

fn write_report(path: &Path, reports: &[GroupReport]) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, reports)?;
    info!(path = %path.display(), "diagnostic report written");
    Ok(())
}

struct RunOutputs<'a> {
    processed_dir: &'a Path,
    listings: &'a Path,
}

async fn run_single_product(
    config: &AppConfig,
    product: ProductRow,
    count: usize,
    outputs: RunOutputs<'_>,
    args: &SelectionArgs,
) -> Result<()> {
    // --- 1. Candidate search ---
    let search = GoogleImageSearch::from_credentials(
        config.google_api_key.as_deref(),
        config.google_cse_id.as_deref(),
    )?;
    let candidates = search_candidates(&search, std::slice::from_ref(&product), count).await?;
    if candidates.is_empty() {
        warn!(query = %product.query(), "search returned no images");
        return Ok(());
    }

    // --- 2. Selection ---
    let reports = evaluate(config, args, &candidates).await?;
    let Some(selection) = reports.iter().find_map(GroupReport::selection) else {
        warn!(query = %product.query(), "no candidate has a usable background");
        return Ok(());
    };
    info!(url = %selection.chosen_url, "best image selected");

    // --- 3. Background removal ---
    let remover = ReplicateBackgroundRemover::from_token(config.replicate_api_token.as_deref())?;
    let removal = process_selection(&remover, &selection, outputs.processed_dir).await;
    let processed_image_path = match removal {
        Ok(path) => {
            println!("{}", path.display());
            path.display().to_string()
        }
        Err(e) => {
            error!(
                error = %e,
                url = %selection.chosen_url,
                "background removal failed, keeping the original image"
            );
            println!("{}", selection.chosen_url);
            String::new()
        }
    };

    // --- 4. Listings table ---
    let listing = ListingRow {
        brand: selection.brand,
        product_name: selection.product_name,
        image_url: selection.chosen_url,
        processed_image_path,
    };
    table::append_listing(outputs.listings, &listing)
        .with_context(|| format!("appending to {}", outputs.listings.display()))?;
    info!(path = %outputs.listings.display(), "listing recorded");
    Ok(())
}
