//! setbuf CLI - Admin Command Line Interface
//!
//! Inspects and edits a settings domain stored in redb files. Every
//! command is a single unit of work: one session, one flush.

mod cli_config;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use cli_config::CliConfig;
use setbuf_cache::RedbCache;
use setbuf_common::{CodecKind, Value};
use setbuf_settings::{FlushReport, Settings, SettingsBackend};
use setbuf_store::RedbStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "setbuf")]
#[command(about = "setbuf settings admin CLI")]
#[command(version)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long, env = "SETBUF_CONFIG")]
    config: Option<PathBuf>,

    /// Settings store file
    #[arg(long)]
    store: Option<PathBuf>,

    /// Cache file
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Cache namespace
    #[arg(long)]
    cache_id: Option<String>,

    /// Cache entry lifetime in seconds (0 or less = never expire)
    #[arg(long, allow_negative_numbers = true)]
    cache_ttl: Option<i64>,

    /// Settings table name
    #[arg(long)]
    table: Option<String>,

    /// Value codec (bincode, json)
    #[arg(long)]
    codec: Option<CodecKind>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show one key, or a whole category
    Get {
        /// Category name
        category: String,
        /// Key to show; omit for every key of the category
        key: Option<String>,
        /// JSON value printed when the key is missing
        #[arg(short, long)]
        default: Option<String>,
    },
    /// Set a key
    Set {
        /// Category name
        category: String,
        /// Key name
        key: String,
        /// JSON value; anything that is not valid JSON is stored as a string
        value: String,
    },
    /// Delete keys, or a whole category when no key is given
    Delete {
        /// Category name
        category: String,
        /// Keys to delete
        keys: Vec<String>,
    },
    /// List categories present in the store
    Categories,
    /// Show categories registered as cached
    Registry,
    /// Drop cached entries for one category, or for all of them
    Invalidate {
        /// Category name; omit to invalidate every cached category
        category: Option<String>,
    },
    /// Remove expired entries from the cache file
    Purge,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = resolve_config(&args)?;
    debug!("Using configuration: {:?}", config);

    let store = Arc::new(RedbStore::open_with_table(
        &config.store_path,
        &config.settings.table_name,
    )?);
    let cache = Arc::new(RedbCache::open(&config.cache_path)?);
    let backend = SettingsBackend::new(store.clone(), cache.clone(), config.settings)?;
    let mut settings = backend.session();

    match args.command {
        Commands::Get {
            category,
            key,
            default,
        } => match key {
            Some(key) => {
                let default = default.as_deref().map_or(Value::Null, parse_value);
                let value = settings.get(&category, &key, default)?;
                println!("{}", serde_json::to_string_pretty(&value.to_json())?);
            }
            None => {
                let Some(values) = settings.get_category(&category)? else {
                    bail!("Category '{}' not found", category);
                };
                let json: serde_json::Map<String, serde_json::Value> = values
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        },
        Commands::Set {
            category,
            key,
            value,
        } => {
            settings.set(&category, &key, parse_value(&value));
            println!("Set {category}/{key}");
        }
        Commands::Delete { category, keys } => {
            if keys.is_empty() {
                settings.delete_category(&category);
                println!("Deleted category {category}");
            } else {
                let deleted = settings.delete_keys(&category, &keys);
                println!("Deleted {deleted} key(s) from {category}");
            }
        }
        Commands::Categories => {
            for category in store.list_categories()? {
                println!("{category}");
            }
        }
        Commands::Registry => {
            let cached = settings.cached_categories();
            if cached.is_empty() {
                println!("No cached categories");
            }
            for category in cached {
                println!("{category}");
            }
        }
        Commands::Invalidate { category } => match category {
            Some(category) => {
                settings.invalidate_cache(&category);
                println!("Invalidated {category}");
            }
            None => {
                let count = settings.cached_categories().len();
                settings.invalidate_all_cache();
                println!("Invalidated {count} cached categories");
            }
        },
        Commands::Purge => {
            let purged = cache.purge_expired()?;
            println!("Purged {purged} expired cache entries");
        }
    }

    finish(&mut settings)
}

/// Layer command-line overrides over the file and environment configuration
fn resolve_config(args: &Args) -> Result<CliConfig> {
    let mut config = CliConfig::load(args.config.as_deref())?;
    if let Some(store) = &args.store {
        config.store_path.clone_from(store);
    }
    if let Some(cache) = &args.cache {
        config.cache_path.clone_from(cache);
    }
    let mut settings = config.settings;
    if let Some(cache_id) = &args.cache_id {
        settings = settings.with_cache_id(cache_id.as_str())?;
    }
    if let Some(ttl) = args.cache_ttl {
        settings = settings.with_cache_ttl_secs(ttl);
    }
    if let Some(table) = &args.table {
        settings = settings.with_table_name(table.as_str())?;
    }
    if let Some(codec) = args.codec {
        settings = settings.with_codec(codec);
    }
    config.settings = settings;
    Ok(config)
}

fn finish(settings: &mut Settings) -> Result<()> {
    let report: FlushReport = settings.flush();
    if !report.is_noop() {
        info!(
            "Flush: {} rows saved, {} rows deleted, {} categories deleted, registry {:?}, {} cache errors",
            report.rows_saved,
            report.rows_deleted,
            report.categories_deleted,
            report.registry,
            report.cache_errors
        );
    }
    report.into_result()?;
    Ok(())
}

/// JSON when it parses, a plain string otherwise. Integers beyond `i64`
/// are kept as their decimal string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(raw).map_or_else(|_| Value::from(raw), Value::from)
}
