use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_content::{
    core::{
        chain::SourceChain,
        data::bake,
        settings::{Settings, DEFAULT_SETTINGS_PATH},
    },
    server::start_server,
};

#[derive(Parser, Debug)]
#[command(name = "folio-content")]
#[command(about = "Serves normalized portfolio projects from Sanity, Strapi or a static snapshot")]
#[command(version)]
struct Args {
    /// Settings document (missing file means defaults)
    #[arg(short, long, env = "FOLIO_SETTINGS", default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Snapshot the first remote source with projects into the static document
    Bake,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_content=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args.settings)
        .and_then(Settings::with_env)
        .with_context(|| format!("Failed to load settings from {}", args.settings.display()))?;
    info!("Strapi at {}", settings.strapi_url.value);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => start_server(settings).await.context("Server stopped")?,
        Command::Bake => {
            let chain = SourceChain::from_settings(&settings);
            let path = settings.snapshot_path();
            let snapshot = bake(&chain, &path)
                .await
                .with_context(|| format!("Failed to bake {}", path.display()))?;
            info!("Snapshot holds {} projects", snapshot.projects.len());
        }
    }
    Ok(())
}
