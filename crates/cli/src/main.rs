//! Command line interface for vignette.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vignette_cache::{CacheKeyBuilder, DerivedImageCache, GetOptions, TransformRegistry};
use vignette_core::{AppConfig, SourceImage, TransformArg, TransformRequest};
use vignette_storage::ObjectStore;

#[derive(Parser)]
#[command(name = "vignette")]
#[command(about = "Derived images cached next to their source in an object store")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "VIGNETTE_CONFIG",
        default_value = "vignette.toml"
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Bucket holding the source image
    #[arg(long)]
    bucket: String,

    /// Source file name, without folder
    #[arg(long)]
    filename: String,

    /// Folder of the source inside the bucket (omit for the bucket root)
    #[arg(long)]
    folder: Option<String>,
}

impl SourceArgs {
    fn source(&self) -> SourceImage {
        let source = SourceImage::new(&self.bucket, &self.filename);
        match &self.folder {
            Some(folder) => source.with_parent_folder(folder),
            None => source,
        }
    }
}

#[derive(Args, Clone)]
struct RequestArgs {
    /// Registered format name, e.g. SetWidth
    format: String,

    /// First transform argument
    arg1: Option<String>,

    /// Second transform argument
    arg2: Option<String>,
}

impl RequestArgs {
    fn request(&self) -> TransformRequest {
        TransformRequest {
            format: self.format.clone(),
            arg1: self.arg1.as_deref().map(TransformArg::parse),
            arg2: self.arg2.as_deref().map(TransformArg::parse),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a derivative, generating it on a miss, and print its URL
    Get {
        #[command(flatten)]
        source: SourceArgs,

        /// Record id of the source
        #[arg(long, default_value_t = 1)]
        id: u64,

        /// Title carried over to the derivative
        #[arg(long)]
        title: Option<String>,

        #[command(flatten)]
        request: RequestArgs,

        /// Regenerate even if the derivative is already cached
        #[arg(long)]
        flush: bool,

        /// Print the full artifact as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every cached derivative of a source
    Sweep {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// List registered formats and their arity
    Formats,
    /// Print the cache key for a request without touching the store
    Key {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        request: RequestArgs,
    },
    /// Check that the configured store is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Get {
            source,
            id,
            title,
            request,
            flush,
            json,
        } => {
            let mut source = source.source().with_id(id);
            if let Some(title) = title {
                source = source.with_title(title);
            }
            let cache = open_cache(&config).await?;
            let options = GetOptions::default().force_refresh(flush);

            let artifact = cache
                .get(&source, &request.request(), options)
                .await
                .with_context(|| format!("Failed to resolve {}", request.format))?;

            match artifact {
                Some(artifact) if json => {
                    println!("{}", serde_json::to_string_pretty(&artifact)?);
                }
                Some(artifact) => {
                    tracing::debug!(outcome = artifact.outcome.as_str(), "Resolved derivative");
                    println!("{}", artifact.url);
                }
                None => println!("no image"),
            }
        }
        Commands::Sweep { source } => {
            let cache = open_cache(&config).await?;
            let deleted = cache
                .delete_all(&source.source())
                .await
                .context("Failed to sweep derivatives")?;
            println!("{deleted}");
        }
        Commands::Formats => {
            let registry = TransformRegistry::with_builtins(&config.derivatives);
            println!("{:<28} ARITY", "FORMAT");
            for transform in registry.iter() {
                println!("{:<28} {}", transform.name(), transform.arity());
            }
        }
        Commands::Key { source, request } => {
            let registry = TransformRegistry::with_builtins(&config.derivatives);
            if !registry.contains(&request.format) {
                anyhow::bail!(
                    "Unknown format: {}. Run `vignette formats` to list registered formats.",
                    request.format
                );
            }
            let key = CacheKeyBuilder::new(&config.cache).build(&source.source(), &request.request());
            println!("Location:   {}", key.location());
            println!("Object key: {}", key.object_key);
            println!("URL:        {}", key.url);
        }
        Commands::Health => {
            let store = open_store(&config).await?;
            store
                .health_check()
                .await
                .with_context(|| format!("{} store is not healthy", store.backend_name()))?;
            println!("ok ({})", store.backend_name());
        }
    }

    Ok(())
}

/// Load configuration from an optional TOML file overridden by `VIGNETTE_` env vars.
fn load_config(path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if path.exists() {
        tracing::debug!(config_path = %path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path.display());
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("VIGNETTE_").split("__"))
        .extract()
        .context("Failed to parse configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn ObjectStore>> {
    let store = vignette_storage::from_config(&config.storage)
        .await
        .context("Failed to open object store")?;
    Ok(vignette_storage::with_timeout(
        store,
        config.cache.store_timeout(),
    ))
}

async fn open_cache(config: &AppConfig) -> Result<DerivedImageCache> {
    let store = open_store(config).await?;
    tracing::debug!(backend = store.backend_name(), "Opened object store");
    Ok(DerivedImageCache::from_config(store, config))
}
