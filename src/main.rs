//! CLI entry point for spacetraveling

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacetraveling::commands::generate::SourceOptions;

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(version)]
#[command(about = "A static blog generator for headless content APIs", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where posts are read from; overrides `_config.yml`
#[derive(Args)]
struct SourceArgs {
    /// Content API endpoint
    #[arg(long, env = "PRISMIC_API_ENDPOINT")]
    endpoint: Option<String>,

    /// Content API access token
    #[arg(long, env = "PRISMIC_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Read documents from a JSON file instead of the API
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Include unpublished drafts and show the exit-preview link
    #[arg(long)]
    preview: bool,

    /// Content ref to preview (a release or preview session ref)
    #[arg(long = "ref", requires = "preview")]
    preview_ref: Option<String>,
}

impl From<SourceArgs> for SourceOptions {
    fn from(args: SourceArgs) -> Self {
        Self {
            endpoint: args.endpoint,
            access_token: args.access_token,
            fixtures: args.fixtures,
            preview: args.preview,
            preview_ref: args.preview_ref,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Generate, then serve the public folder
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Serve the existing public folder without generating
        #[arg(long)]
        r#static: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Clean the public folder
    Clean,

    /// List posts
    List {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetraveling=debug,info"
    } else {
        "spacetraveling=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            spacetraveling::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::Generate { source } => {
            let app = spacetraveling::Spacetraveling::new(&base_dir)?;
            tracing::info!("Generating static files...");

            let report = spacetraveling::commands::generate::run(&app, &source.into()).await?;
            if report.not_found > 0 {
                println!(
                    "Generated with {} missing posts rendered as not found",
                    report.not_found
                );
            } else {
                println!("Generated successfully!");
            }
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
            source,
        } => {
            let app = spacetraveling::Spacetraveling::new(&base_dir)?;

            // Generate first
            if !r#static {
                tracing::info!("Generating static files...");
                spacetraveling::commands::generate::run(&app, &source.into()).await?;
            }

            tracing::info!("Starting server at http://{}:{}", ip, port);
            spacetraveling::server::start(&app, &ip, port, open).await?;
        }

        Commands::Clean => {
            let app = spacetraveling::Spacetraveling::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            app.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { source } => {
            let app = spacetraveling::Spacetraveling::new(&base_dir)?;
            spacetraveling::commands::list::run(&app, &source.into()).await?;
        }

        Commands::Version => {
            println!("spacetraveling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
