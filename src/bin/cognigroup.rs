use anyhow::{Context, Result};
use clap::Parser;
use cognigroup::{
    config::Config,
    embeddings,
    logging,
    models::{GroupingSummary, SkipReason, SkippedFile},
    pipeline::{self, GroupingRequest, Prepared, ProgressSink},
};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cognigroup")]
#[command(about = "Group the documents of a directory into folders by content")]
#[command(version)]
struct Cli {
    /// Directory to organize
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Number of content clusters to create (default from config, 5)
    #[arg(short = 'k', long)]
    clusters: Option<usize>,

    /// Dry run (preview only, don't move files)
    #[arg(long)]
    dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Path to settings.toml (defaults to config/settings.toml or ~/.config/cognigroup)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the k-means seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

/// Progress bar over the extract + embed stage
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} files ({msg})")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Ok(Self { bar })
    }
}

impl ProgressSink for BarProgress {
    fn discovered(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn file_started(&self, path: &Path) {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown");
        self.bar.set_message(format!("Extracting and embedding: {}", name));
    }

    fn file_finished(&self, _path: &Path, _skipped: Option<&SkipReason>) {
        self.bar.inc(1);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_from(cli.config.as_deref())?;
    logging::init_tracing(&config);

    if let Some(seed) = cli.seed {
        config.clustering.seed = seed;
    }
    let dry_run = cli.dry_run || config.organizer.dry_run_default;
    let request = GroupingRequest {
        source_dir: cli.dir.clone(),
        clusters: cli.clusters.unwrap_or(config.clustering.default_clusters),
        dry_run,
    };

    let embedder = embeddings::provider_from_config(&config)?;
    if !cli.json {
        println!(
            "📊 Grouping {} into {} clusters (model: {})",
            cli.dir.display(),
            request.clusters,
            embedder.model_name()
        );
    }

    let progress = BarProgress::new()?;
    let prepared = pipeline::prepare(&request, &config, embedder.as_ref(), &progress).await?;
    progress.bar.finish_with_message("Analysis complete!");

    let plan = match prepared {
        Prepared::Ready(plan) => plan,
        Prepared::NotEnoughData {
            discovered,
            valid,
            skipped,
        } => {
            if !cli.json {
                println!("\nNot enough valid files to cluster ({} of {} usable).", valid, discovered);
                print_skipped(&skipped);
            } else {
                let outcome = cognigroup::GroupingOutcome::NotEnoughData {
                    discovered,
                    valid,
                    skipped,
                };
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            return Ok(());
        }
    };

    if !cli.json {
        println!("\n{}", plan.preview.render(&plan.source_dir));
    }

    if !cli.yes && !dry_run && !config.organizer.skip_confirmation {
        let proceed = Confirm::new()
            .with_prompt("Proceed with file reorganization?")
            .default(false)
            .interact()
            .context("Failed to read user input")?;

        if !proceed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let summary = pipeline::apply(plan, &config, dry_run).await?;
    if cli.json {
        let outcome = cognigroup::GroupingOutcome::Grouped(summary.clone());
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&summary);
    }

    if !summary.is_complete() {
        anyhow::bail!("{} file(s) could not be moved", summary.failed_moves.len());
    }

    Ok(())
}

fn print_skipped(skipped: &[SkippedFile]) {
    if skipped.is_empty() {
        return;
    }
    println!("⚠️  Skipped {} file(s), left in place:", skipped.len());
    for file in skipped {
        println!("   {} ({})", file.path.display(), file.reason);
    }
}

fn print_summary(summary: &GroupingSummary) {
    println!("\n✓ {}", summary.message());
    print_skipped(&summary.skipped);
    if !summary.failed_moves.is_empty() {
        println!("❌ {} move(s) failed:", summary.failed_moves.len());
        for failure in &summary.failed_moves {
            println!("   {} → {}: {}", failure.source.display(), failure.destination.display(), failure.error);
        }
    }
    if summary.dry_run {
        println!("\nDry run completed. No files were moved.");
    }
}
