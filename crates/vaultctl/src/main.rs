//! vaultctl - client for a vaultd environment vault
//!
//! Browse environments, edit their variables, and save them back to
//! the server.
//!
//! Commands:
//! - connect: Connect to a vault server and remember it
//! - disconnect: Drop the session, optionally forgetting the server
//! - status: Show the remembered connection and reachability
//! - envs: List environments
//! - create/delete: Manage environments server-side
//! - show: Print one environment's variables
//! - set/unset/rename: Edit one variable and save

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vaultctl::session::DEFAULT_PORT;
use vaultctl::{ConnectionConfig, ConnectionStore, SessionManager, VaultTransport, Workbench};
use vaultctl_core::Paths;

#[derive(Parser)]
#[command(name = "vaultctl")]
#[command(about = "Client for a vaultd environment vault")]
#[command(version)]
#[command(after_help = r#"WORKFLOW:
    1. vaultctl connect vault.internal:4000 --username ops
    2. vaultctl envs                  # list environments
    3. vaultctl show staging          # inspect variables
    4. vaultctl set staging API_KEY abc123

EXAMPLES:
    vaultctl connect 10.0.0.5                 # default port 4000
    vaultctl envs --json                      # for scripting
    vaultctl create dev                       # new empty environment
    vaultctl rename staging OLD_KEY NEW_KEY   # move a variable
    vaultctl unset staging OBSOLETE_KEY
    vaultctl disconnect --forget              # also clear the record

CONNECTIONS:
    The last connection is remembered in ~/.config/vaultctl and reused
    by every command until you disconnect --forget.

ALIASES:
    vaultctl c        # connect
    vaultctl ls       # envs
    vaultctl rm       # delete
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a vault server and remember it (alias: c)
    #[command(alias = "c")]
    Connect {
        /// Server address as host or host:port
        host: String,

        /// Username for the configuration handshake
        #[arg(long, short)]
        username: Option<String>,

        /// Password for the configuration handshake
        #[arg(long, short)]
        password: Option<String>,

        /// Connect for this invocation only; do not remember
        #[arg(long)]
        no_remember: bool,
    },

    /// Drop the session
    Disconnect {
        /// Also clear the remembered connection
        #[arg(long)]
        forget: bool,
    },

    /// Show the remembered connection and whether it is reachable
    Status,

    /// List environments (alias: ls)
    #[command(alias = "ls")]
    Envs {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an empty environment on the server
    Create {
        /// Environment name
        name: String,
    },

    /// Delete an environment (alias: rm)
    #[command(alias = "rm")]
    Delete {
        /// Environment name
        name: String,
    },

    /// Print one environment's variables
    Show {
        /// Environment name
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set one variable and save
    Set {
        env: String,
        key: String,
        value: String,
    },

    /// Remove one variable and save
    Unset { env: String, key: String },

    /// Rename a variable, optionally changing its value, and save
    Rename {
        env: String,
        old_key: String,
        new_key: String,

        /// New value (default: the variable's current value)
        #[arg(long)]
        value: Option<String>,

        /// Overwrite the target key if it already exists
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { run_command(cli.command).await })
}

async fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Connect {
            host,
            username,
            password,
            no_remember,
        } => cmd_connect(host, username, password, no_remember).await,
        Commands::Disconnect { forget } => cmd_disconnect(forget),
        Commands::Status => cmd_status().await,
        Commands::Envs { json } => cmd_envs(json).await,
        Commands::Create { name } => cmd_create(name).await,
        Commands::Delete { name } => cmd_delete(name).await,
        Commands::Show { name, json } => cmd_show(name, json).await,
        Commands::Set { env, key, value } => cmd_set(env, key, value).await,
        Commands::Unset { env, key } => cmd_unset(env, key).await,
        Commands::Rename {
            env,
            old_key,
            new_key,
            value,
            force,
        } => cmd_rename(env, old_key, new_key, value, force).await,
    }
}

/// Split "host:port", defaulting the port
fn parse_host(host: &str) -> Result<(String, u16)> {
    match host.split_once(':') {
        Some((h, p)) => {
            let port = p
                .parse::<u16>()
                .with_context(|| format!("Invalid port: {}", p))?;
            Ok((h.to_string(), port))
        }
        None => Ok((host.to_string(), DEFAULT_PORT)),
    }
}

fn session_manager() -> Result<SessionManager> {
    let paths = Paths::new();
    let store = ConnectionStore::new(&paths.config)?;
    Ok(SessionManager::new(store))
}

/// Reconnect with the remembered connection; every catalog or editor
/// operation needs a connected session first.
async fn open_workbench() -> Result<Workbench> {
    let session = session_manager()?;
    let Some(config) = session.recall() else {
        bail!("No remembered connection. Run 'vaultctl connect <host[:port]>' first.");
    };

    let mut workbench = Workbench::new(session);
    workbench
        .connect(config)
        .await
        .context("Could not reach the remembered vault server")?;
    Ok(workbench)
}

/// Connect, handshake, and remember
async fn cmd_connect(
    host: String,
    username: Option<String>,
    password: Option<String>,
    no_remember: bool,
) -> Result<()> {
    let (host, port) = parse_host(&host)?;
    let mut config = ConnectionConfig::new(&host, port).with_credentials(username, password);
    if !no_remember {
        config = config.remembered();
    }

    let mut workbench = Workbench::new(session_manager()?);
    workbench.connect(config).await?;

    println!("success: Connected to {}:{}", host, port);
    if !no_remember {
        println!("Connection remembered for future commands.");
    }
    Ok(())
}

/// Drop the session
fn cmd_disconnect(forget: bool) -> Result<()> {
    let mut workbench = Workbench::new(session_manager()?);
    workbench.disconnect(forget);

    if forget {
        println!("success: Disconnected, remembered connection cleared");
    } else {
        println!("success: Disconnected");
    }
    Ok(())
}

/// Show the remembered connection
async fn cmd_status() -> Result<()> {
    let session = session_manager()?;

    let Some(record) = session.recall_record() else {
        println!("No remembered connection. Run 'vaultctl connect <host[:port]>' first.");
        return Ok(());
    };

    println!("Remembered server: {}:{}", record.host, record.port);
    if let Some(username) = &record.username {
        println!("Username: {}", username);
    }
    println!("Saved: {}", record.saved_at.format("%Y-%m-%d %H:%M UTC"));

    let transport = VaultTransport::new(&record.host, record.port);
    match transport.test_connection().await {
        Ok(()) => println!("Reachable: yes"),
        Err(e) => println!("Reachable: no ({})", e),
    }
    Ok(())
}

/// List environments
async fn cmd_envs(json: bool) -> Result<()> {
    let mut workbench = open_workbench().await?;
    let names = workbench.refresh().await?.to_vec();

    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    if names.is_empty() {
        println!("No environments found.");
        return Ok(());
    }

    println!("Environments:");
    for name in names {
        println!("  {}", name);
    }
    Ok(())
}

/// Create an environment server-side
async fn cmd_create(name: String) -> Result<()> {
    let mut workbench = open_workbench().await?;
    workbench.refresh().await?;

    let message = workbench.create_environment(&name).await?;
    println!("success: {}", message);
    Ok(())
}

/// Delete an environment
async fn cmd_delete(name: String) -> Result<()> {
    let mut workbench = open_workbench().await?;
    workbench.refresh().await?;

    let message = workbench.delete_environment(&name).await?;
    println!("success: {}", message);
    Ok(())
}

/// Print one environment's variables
async fn cmd_show(name: String, json: bool) -> Result<()> {
    let mut workbench = open_workbench().await?;
    workbench.refresh().await?;
    workbench.select(&name).await?;

    let snapshot = workbench.editor().snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("No variables in environment '{}'.", name);
        return Ok(());
    }

    println!("Variables in '{}':", name);
    for (key, value) in &snapshot {
        println!("  {} = {}", key, value);
    }
    Ok(())
}

/// Set one variable and save
async fn cmd_set(env: String, key: String, value: String) -> Result<()> {
    let mut workbench = open_workbench().await?;
    workbench.refresh().await?;
    workbench.select(&env).await?;

    workbench.editor_mut().set_value(&key, &value);
    let message = workbench.save().await?;

    println!("success: {}", message);
    Ok(())
}

/// Remove one variable and save
async fn cmd_unset(env: String, key: String) -> Result<()> {
    let mut workbench = open_workbench().await?;
    workbench.refresh().await?;
    workbench.select(&env).await?;

    if workbench.editor().get(&key).is_none() {
        bail!("Key '{}' not found in environment '{}'", key, env);
    }
    workbench.editor_mut().remove(&key);
    let message = workbench.save().await?;

    println!("success: {}", message);
    Ok(())
}

/// Rename a variable and save
async fn cmd_rename(
    env: String,
    old_key: String,
    new_key: String,
    value: Option<String>,
    force: bool,
) -> Result<()> {
    let mut workbench = open_workbench().await?;
    workbench.refresh().await?;
    workbench.select(&env).await?;

    let Some(current) = workbench.editor().get(&old_key).map(String::from) else {
        bail!("Key '{}' not found in environment '{}'", old_key, env);
    };
    let value = value.unwrap_or(current);

    if force && old_key != new_key && workbench.editor().contains(&new_key) {
        workbench.editor_mut().remove(&new_key);
    }
    workbench
        .editor_mut()
        .rename(&old_key, &new_key, &value)
        .context("Pass --force to overwrite the existing key")?;

    let message = workbench.save().await?;
    println!("success: {}", message);
    Ok(())
}
