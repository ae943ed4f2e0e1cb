//! plantdb CLI
//!
//! Command-line interface for plantdb:
//! - Run the API server
//! - Create or reset the schema
//! - List and delete series
//! - Export aligned series as CSV
//! - Generate a config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use plantdb::align::Aligner;
use plantdb::api::{serve, AppState};
use plantdb::config::{generate_default_config, Config, ConfigError, LoggingConfig};
use plantdb::storage::{Database, MeasurementStore, MetadataCatalog, SeriesId};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "plantdb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Catalog and analysis service for plant sensor time-series")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Create the Metadata and Data tables if missing
    Init {
        /// Drop both tables first, discarding all data
        #[arg(long)]
        reset: bool,
    },

    /// List all series
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Delete a series and all its records
    Delete {
        /// Series id (64 hex characters)
        series_id: String,
    },

    /// Align series on one time axis and write CSV
    Align {
        /// Series ids, in column order
        #[arg(required = true)]
        series: Vec<String>,
        /// Inclusive lower bound (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
        #[arg(long)]
        start: Option<String>,
        /// Inclusive upper bound
        #[arg(long)]
        end: Option<String>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                std::fs::write(path, content).with_context(|| format!("writing {:?}", path))?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let config = resolve_config(cli.config.as_deref(), std::io::stderr)?;
    init_tracing(&config.logging);

    let db = Database::open(config.database.resolved_path())?.with_busy_timeout(config.database.busy_timeout());
    tracing::debug!("Database: {:?}", db.path());

    match cli.command {
        Commands::Serve => {
            db.ensure_schema()?;
            let addr = config.api.addr()?;
            tracing::info!("Starting plantdb API server v{}", env!("CARGO_PKG_VERSION"));
            let state = AppState::new(db, config.database.duplicate_policy, config.api);
            serve(state, addr).await?;
        }

        Commands::Init { reset } => {
            if reset {
                db.drop_schema()?;
            }
            db.ensure_schema()?;
            println!("Schema ready at {:?}", db.path());
        }

        Commands::List { format } => {
            let descriptors = MetadataCatalog::new(db).list_all()?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&descriptors)?),
                _ => {
                    if descriptors.is_empty() {
                        println!("No series in the catalog.");
                    } else {
                        println!("{:<64}  {}", "Series ID", "Label");
                        println!("{}", "-".repeat(100));
                        for d in &descriptors {
                            println!("{:<64}  {}", d.series_id, d.label());
                        }
                    }
                }
            }
        }

        Commands::Delete { series_id } => {
            let id = SeriesId::parse(&series_id)?;
            if MetadataCatalog::new(db).delete(&id)? {
                println!("Deleted series {}", id);
            } else {
                println!("Series {} not found", id);
            }
        }

        Commands::Align {
            series,
            start,
            end,
            output,
        } => {
            let ids = series
                .iter()
                .map(|s| SeriesId::parse(s))
                .collect::<Result<Vec<_>, _>>()?;
            let aligner = Aligner::new(MetadataCatalog::new(db.clone()), MeasurementStore::new(db))
                .with_policy(config.database.duplicate_policy);
            let alignment = aligner.align_window(&ids, start.as_deref(), end.as_deref())?;

            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path).with_context(|| format!("creating {:?}", path))?;
                    alignment.table.write_csv(file)?;
                    println!("Wrote {} rows to {:?}", alignment.table.len(), path);
                }
                None => alignment.table.write_csv(std::io::stdout().lock())?,
            }
        }

        Commands::Config { .. } => {}
    }

    Ok(())
}

/// Resolve the config under a scoped subscriber, since the global one
/// depends on the `[logging]` section being loaded
fn resolve_config<W>(explicit: Option<&Path>, writer: W) -> Result<Config, ConfigError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plantdb=info")))
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(bootstrap, || Config::resolve(explicit))
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("plantdb={},tower_http=debug", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
