//! Command-line front end for a fiscal-year partition store.
//!
//! Every command opens the configured database, runs one collection
//! operation and prints the result as JSON on stdout.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fystore_core::db::open_db;
use fystore_core::{
    import_partition, init_logging, ErrorKind, LocationRelationship, LocationRelationships,
    MultiEntryCollection, PartitionKey, RepoError, SingleRecordCollection, SqliteEntryStore,
    SqliteVersionStore, StoreConfig, ValueSet,
};
use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "fystore")]
#[command(about = "Versioned per-fiscal-year storage for tabular data and dropdown values")]
#[command(version = fystore_core::core_version())]
struct Cli {
    /// TOML config file; `--db` is required without one
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database file, overrides `db_path` from the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Directory for rotated log files; logging stays off without one
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PartitionArg {
    /// Fiscal year such as FY_25; defaults to the configured partition
    #[arg(long, short = 'p')]
    partition: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the active table document
    Get {
        #[command(flatten)]
        partition: PartitionArg,
    },
    /// Save a JSON document as a new version
    Save {
        #[command(flatten)]
        partition: PartitionArg,
        /// File holding the document
        file: PathBuf,
    },
    /// List every version, newest first
    Backups {
        #[command(flatten)]
        partition: PartitionArg,
    },
    /// Make an earlier version's document active again
    Restore {
        #[command(flatten)]
        partition: PartitionArg,
        version: i64,
    },
    /// Permanently delete an archived version
    Purge {
        #[command(flatten)]
        partition: PartitionArg,
        version: i64,
    },
    /// Archive every version of the partition
    DeleteAll {
        #[command(flatten)]
        partition: PartitionArg,
    },
    /// Dropdown option sets
    Options {
        #[command(subcommand)]
        action: ValueSetAction,
    },
    /// Location to location-code relationships
    Relationships {
        #[command(subcommand)]
        action: ValueSetAction,
    },
    /// Normalize a JSON array of spreadsheet rows and save it as a new version
    Import {
        #[command(flatten)]
        partition: PartitionArg,
        /// File holding the row array
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ValueSetAction {
    /// Print the current set, or the defaults when none was saved
    Get {
        #[command(flatten)]
        partition: PartitionArg,
    },
    /// Replace the whole set with the one in a JSON file
    Save {
        #[command(flatten)]
        partition: PartitionArg,
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    start_logging(&cli, &config)?;

    let mut conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;

    let output = match cli.command {
        Commands::Get { partition } => {
            let key = partition_key(&config, &partition)?;
            let tables = table_collection(&mut conn)?;
            match tables.get(&key).map_err(report)? {
                Some(payload) => parse_payload(&payload),
                None => Value::Null,
            }
        }
        Commands::Save { partition, file } => {
            let key = partition_key(&config, &partition)?;
            let payload = read_json(&file)?;
            let mut tables = table_collection(&mut conn)?;
            let version = tables.save(&key, &payload.to_string()).map_err(report)?;
            json!({ "version": version })
        }
        Commands::Backups { partition } => {
            let key = partition_key(&config, &partition)?;
            let tables = table_collection(&mut conn)?;
            to_json(&tables.list_backups(&key).map_err(report)?)?
        }
        Commands::Restore { partition, version } => {
            let key = partition_key(&config, &partition)?;
            let mut tables = table_collection(&mut conn)?;
            to_json(&tables.restore(&key, version).map_err(report)?)?
        }
        Commands::Purge { partition, version } => {
            let key = partition_key(&config, &partition)?;
            let mut tables = table_collection(&mut conn)?;
            let purged = tables.purge_backup(&key, version).map_err(report)?;
            if !purged {
                bail!("version {version} of {key} is active or does not exist");
            }
            json!({ "purged": version })
        }
        Commands::DeleteAll { partition } => {
            let key = partition_key(&config, &partition)?;
            let mut tables = table_collection(&mut conn)?;
            json!({ "archived": tables.delete_all(&key).map_err(report)? })
        }
        Commands::Options { action } => {
            let store = SqliteEntryStore::dropdown_options(&mut conn).map_err(report)?;
            let mut options = MultiEntryCollection::new(store, config.dropdown_defaults());
            match action {
                ValueSetAction::Get { partition } => {
                    let key = partition_key(&config, &partition)?;
                    to_json(&options.get(&key).map_err(report)?)?
                }
                ValueSetAction::Save { partition, file } => {
                    let key = partition_key(&config, &partition)?;
                    let set: ValueSet = serde_json::from_value(read_json(&file)?)
                        .context("expected an object of entry type to value array")?;
                    json!({ "saved": options.save(&key, &set).map_err(report)? })
                }
            }
        }
        Commands::Relationships { action } => {
            let store = SqliteEntryStore::location_relationships(&mut conn).map_err(report)?;
            let mut relationships = LocationRelationships::new(store, config.location_defaults());
            match action {
                ValueSetAction::Get { partition } => {
                    let key = partition_key(&config, &partition)?;
                    to_json(&relationships.get(&key).map_err(report)?)?
                }
                ValueSetAction::Save { partition, file } => {
                    let key = partition_key(&config, &partition)?;
                    let pairs: Vec<LocationRelationship> = serde_json::from_value(read_json(&file)?)
                        .context("expected an array of {location, locationCode} objects")?;
                    json!({ "saved": relationships.save(&key, &pairs).map_err(report)? })
                }
            }
        }
        Commands::Import { partition, file } => {
            let key = partition_key(&config, &partition)?;
            let Value::Array(rows) = read_json(&file)? else {
                bail!("{} must hold a JSON array of rows", file.display());
            };
            let mut tables = table_collection(&mut conn)?;
            to_json(&import_partition(&mut tables, &key, &rows).map_err(report)?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let mut config = match (&cli.config, &cli.db) {
        (Some(path), _) => StoreConfig::load(path)?,
        (None, Some(db)) => StoreConfig::new(db),
        (None, None) => bail!("either --config or --db is required"),
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = Some(level.clone());
    }
    Ok(config)
}

fn start_logging(cli: &Cli, config: &StoreConfig) -> Result<()> {
    let Some(dir) = &config.log_dir else {
        return Ok(());
    };
    let dir = if dir.is_absolute() {
        dir.clone()
    } else {
        std::env::current_dir()?.join(dir)
    };
    init_logging(config.log_level(), &dir)?;
    info!(
        "event=cli_start module=cli status=ok command={}",
        command_name(&cli.command)
    );
    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Get { .. } => "get",
        Commands::Save { .. } => "save",
        Commands::Backups { .. } => "backups",
        Commands::Restore { .. } => "restore",
        Commands::Purge { .. } => "purge",
        Commands::DeleteAll { .. } => "delete-all",
        Commands::Options { .. } => "options",
        Commands::Relationships { .. } => "relationships",
        Commands::Import { .. } => "import",
    }
}

fn partition_key(config: &StoreConfig, arg: &PartitionArg) -> Result<PartitionKey> {
    match &arg.partition {
        Some(raw) => Ok(PartitionKey::new(raw)?),
        None => Ok(config.default_partition()?),
    }
}

fn table_collection(conn: &mut Connection) -> Result<SingleRecordCollection<SqliteVersionStore<'_>>> {
    let store = SqliteVersionStore::table_data(conn).map_err(report)?;
    Ok(SingleRecordCollection::new(store))
}

/// Prefixes store failures with their stable kind.
///
/// Storage failures surface as the bare kind; their details only reach
/// the log.
fn report(err: RepoError) -> anyhow::Error {
    let kind = err.kind();
    match kind {
        ErrorKind::StorageFailure => {
            error!("event=cli_command module=cli status=error error_kind={kind} error={err}");
            anyhow!("{kind}")
        }
        ErrorKind::NotFound | ErrorKind::ValidationFailed => {
            anyhow::Error::new(err).context(kind.to_string())
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Stored payloads are opaque; print them as JSON when they parse.
fn parse_payload(payload: &str) -> Value {
    serde_json::from_str(payload).unwrap_or_else(|_| Value::String(payload.to_string()))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::report;
    use fystore_core::RepoError;

    #[test]
    fn storage_failures_hide_backend_messages() {
        let err = RepoError::from(rusqlite::Error::InvalidQuery);
        let reported = report(err);

        assert_eq!(format!("{reported:#}"), "storage_failure");
        assert_eq!(reported.chain().count(), 1);
    }

    #[test]
    fn caller_errors_keep_their_detail() {
        let reported = report(RepoError::NotFound {
            partition: "FY_25".to_string(),
            version: 9,
        });

        assert_eq!(reported.to_string(), "not_found");
        assert_eq!(reported.chain().count(), 2);
    }
}
