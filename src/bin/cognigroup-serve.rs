use anyhow::Result;
use clap::Parser;
use cognigroup::{config::Config, embeddings, logging, server};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cognigroup-serve")]
#[command(about = "Serve content grouping over HTTP")]
#[command(version)]
struct Cli {
    /// Path to settings.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to bind (overrides [server].bind)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_from(cli.config.as_deref())?;
    logging::init_tracing(&config);

    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    let embedder: Arc<dyn embeddings::EmbeddingProvider> =
        Arc::from(embeddings::provider_from_config(&config)?);
    println!("File Organizer API listening on http://{}", config.server.bind);

    server::run_server(config, embedder).await
}
