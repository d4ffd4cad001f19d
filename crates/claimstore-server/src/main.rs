//! `claimstore` binary: the REST server plus administrative commands.
//!
//! Reads `claimstore.toml` (or the path given with `--config-file`) layered
//! under `CLAIMSTORE_*` environment variables, and opens the SQLite store
//! named there.
//!
//! ```text
//! claimstore serve
//! claimstore database create --config fixtures/config
//! claimstore database populate --data fixtures/data
//! claimstore eqid reindex --yes
//! ```

use std::{io, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use claimstore_core::store::ClaimStore;
use claimstore_server::{ServerConfig, confirm, fixtures, open_store};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "ClaimStore server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(long, global = true, default_value = "claimstore.toml")]
  config_file: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the REST API.
  Serve,
  /// Database initialisation and bulk loading.
  Database {
    #[command(subcommand)]
    command: DatabaseCommand,
  },
  /// Maintenance of the equivalent-identifier index.
  Eqid {
    #[command(subcommand)]
    command: EqidCommand,
  },
}

#[derive(Subcommand)]
enum DatabaseCommand {
  /// Seed predicates, identifier types and claimants.
  Create {
    /// Folder containing `predicates/`, `pids/` and `claimants/`.
    #[arg(long)]
    config: PathBuf,
  },
  /// Submit every claim found in a data folder.
  Populate {
    /// Folder containing `claims/`.
    #[arg(long)]
    data: PathBuf,
  },
}

#[derive(Subcommand)]
enum EqidCommand {
  /// Delete every entry of the index.
  Drop {
    /// Do not ask for confirmation.
    #[arg(long)]
    yes: bool,
  },
  /// Rebuild the index from the stored claims.
  Reindex {
    /// Do not ask for confirmation.
    #[arg(long)]
    yes: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = ServerConfig::load(&cli.config_file)?;

  match cli.command {
    Command::Serve => serve(config).await,
    Command::Database { command: DatabaseCommand::Create { config: dir } } => {
      let store = open_store(&config).await?;
      let report = fixtures::create(&store, &dir).await?;
      println!(
        "Database initialisation completed: {} predicates, {} identifier types, {} claimants \
         ({} files failed).",
        report.predicates.loaded,
        report.identifier_types.loaded,
        report.claimants.loaded,
        report.predicates.failed + report.identifier_types.failed + report.claimants.failed,
      );
      Ok(())
    }
    Command::Database { command: DatabaseCommand::Populate { data } } => {
      let store = open_store(&config).await?;
      let counts = fixtures::populate(&store, &data).await?;
      println!(
        "Database populate completed: {} claims loaded, {} failed.",
        counts.loaded, counts.failed
      );
      Ok(())
    }
    Command::Eqid { command: EqidCommand::Drop { yes } } => {
      if !(yes || ask("Are you sure to drop the whole index?")?) {
        println!("Command aborted");
        return Ok(());
      }
      let store = open_store(&config).await?;
      store.clear_equivalences().await.context("failed to clear the index")?;
      println!("Index cleared.");
      Ok(())
    }
    Command::Eqid { command: EqidCommand::Reindex { yes } } => {
      if !(yes || ask("Are you sure to reindex eqid?")?) {
        println!("Command aborted");
        return Ok(());
      }
      let store = open_store(&config).await?;
      store.rebuild_equivalences().await.context("failed to rebuild the index")?;
      println!("Index rebuilt.");
      Ok(())
    }
  }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
  let store = open_store(&config).await?;
  if store.equivalence_predicates().is_empty() {
    tracing::warn!("no equivalence predicates configured; the index will stay empty");
  }
  tracing::info!(
    predicates = ?store.equivalence_predicates().iter().collect::<Vec<_>>(),
    allowed_ips = ?config.allowed_ips,
    "store opened"
  );

  let app = claimstore_api::api_router(Arc::new(store), config.api_config())
    .layer(TraceLayer::new_for_http());
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .await
    .context("server error")?;

  Ok(())
}

fn ask(question: &str) -> anyhow::Result<bool> {
  Ok(confirm(question, &mut io::stdin().lock(), &mut io::stdout())?)
}
