//! HostPin
//!
//! Management CLI for the endpoint-identity trust store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use identity::{fingerprint, IdentityType};
use trust::config::Config;
use trust::store::{TrustRecord, TrustStore};

/// HostPin - manage remembered TLS and SSH endpoint identities.
#[derive(Parser, Debug)]
#[command(name = "hostpin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List remembered identities
    List {
        /// Show records visible to this connection id (its own scoped
        /// records plus all global ones)
        #[arg(long)]
        connection: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Pre-approve an identity (required for endpoints verified under the
    /// strict policy)
    Trust {
        /// Endpoint hostname
        host: String,

        /// Endpoint port
        port: u16,

        /// Identity kind: tls or ssh
        kind: IdentityType,

        /// The fingerprint to approve
        fingerprint: String,

        /// Bind the record to one connection id instead of sharing it
        #[arg(long)]
        connection: Option<String>,
    },

    /// Forget one remembered identity
    Remove {
        /// Endpoint hostname
        host: String,

        /// Endpoint port
        port: u16,

        /// Identity kind: tls or ssh
        kind: IdentityType,

        /// Remove the connection-scoped record instead of the global one
        #[arg(long)]
        connection: Option<String>,
    },

    /// Forget all identities in a scope
    Clear {
        /// Clear one connection's scoped records instead of all global ones
        #[arg(long)]
        connection: Option<String>,
    },

    /// Label a remembered identity
    Nickname {
        /// Endpoint hostname
        host: String,

        /// Endpoint port
        port: u16,

        /// Identity kind: tls or ssh
        kind: IdentityType,

        /// The display label (omit with --clear to remove it)
        #[arg(required_unless_present = "clear")]
        name: Option<String>,

        /// Remove the label instead of setting one
        #[arg(long)]
        clear: bool,

        /// Target the connection-scoped record instead of the global one
        #[arg(long)]
        connection: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Apply environment variable overrides
    config.apply_env_overrides();

    // Validate configuration
    config.validate()?;

    // Initialize tracing
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.log.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = TrustStore::new(&config.store.path);
    store.load()?;

    match cli.command {
        Commands::List { connection, json } => {
            let records = store.all_records(connection.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No remembered identities.");
            } else {
                for record in &records {
                    print_record(record);
                }
            }
        }

        Commands::Trust {
            host,
            port,
            kind,
            fingerprint: raw,
            connection,
        } => {
            let scope = scope_of(connection);
            let record = store.upsert(&host, port, kind, &raw, scope)?;
            println!(
                "Approved {} identity for {}:{} ({})",
                record.identity_type,
                record.host,
                record.port,
                fingerprint::format(&record.identity.fingerprint)
            );
        }

        Commands::Remove {
            host,
            port,
            kind,
            connection,
        } => {
            if store.remove(&host, port, kind, connection.as_deref())? {
                println!("Removed {kind} identity for {host}:{port}");
            } else {
                println!("No matching record for {host}:{port}");
            }
        }

        Commands::Clear { connection } => {
            let removed = store.clear(connection.as_deref())?;
            match connection {
                Some(id) => println!("Cleared {removed} record(s) for connection {id}"),
                None => println!("Cleared {removed} global record(s)"),
            }
        }

        Commands::Nickname {
            host,
            port,
            kind,
            name,
            clear,
            connection,
        } => {
            let nickname = if clear { None } else { name.as_deref() };
            if store.set_nickname(&host, port, kind, nickname, connection.as_deref())? {
                match nickname {
                    Some(name) => println!("Labelled {host}:{port} as \"{name}\""),
                    None => println!("Cleared label for {host}:{port}"),
                }
            } else {
                anyhow::bail!("no matching record for {host}:{port}");
            }
        }
    }

    Ok(())
}

fn scope_of(connection: Option<String>) -> identity::Scope {
    match connection {
        Some(id) => identity::Scope::Connection(id),
        None => identity::Scope::Global,
    }
}

fn print_record(record: &TrustRecord) {
    let label = record
        .nickname
        .as_deref()
        .map(|name| format!(" \"{name}\""))
        .unwrap_or_default();
    let seen = record
        .identity
        .last_seen
        .elapsed()
        .map(|age| format!("last seen {}s ago", age.as_secs()))
        .unwrap_or_else(|_| "last seen in the future".to_string());

    println!(
        "{}:{} [{}] {} ({}){} {}",
        record.host,
        record.port,
        record.identity_type,
        fingerprint::format(&record.identity.fingerprint),
        record.scope,
        label,
        seen
    );
}
