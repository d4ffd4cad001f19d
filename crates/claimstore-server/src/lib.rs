//! ClaimStore server: configuration, store bootstrap and the fixture
//! loaders behind the administrative commands.

pub mod fixtures;

use std::{
  io::{self, BufRead, Write},
  net::IpAddr,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use claimstore_api::ApiConfig;
use claimstore_core::registry::EquivalencePredicates;
use claimstore_sqlite::SqliteStore;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `claimstore.toml` and
/// `CLAIMSTORE_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub store_path:             PathBuf,
  /// Peers allowed to submit claims and subscriptions.
  pub allowed_ips:            Vec<IpAddr>,
  /// Predicates whose claims unify subject and object.
  pub equivalence_predicates: Vec<String>,
  pub default_per_page:       usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                   "127.0.0.1".to_string(),
      port:                   5000,
      store_path:             PathBuf::from("claimstore.db"),
      allowed_ips:            vec![IpAddr::from([127, 0, 0, 1])],
      equivalence_predicates: vec!["is_same_as".to_string()],
      default_per_page:       100,
    }
  }
}

impl ServerConfig {
  /// Layer the TOML file at `path` (optional) under `CLAIMSTORE_*`
  /// environment variables. List values in the environment are
  /// comma-separated.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("CLAIMSTORE")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("allowed_ips")
          .with_list_parse_key("equivalence_predicates"),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn equivalence(&self) -> EquivalencePredicates {
    EquivalencePredicates::new(self.equivalence_predicates.iter().map(String::as_str))
  }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      allowed_ips:      self.allowed_ips.clone(),
      default_per_page: self.default_per_page,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Open the SQLite store named by the configuration.
pub async fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
  let store_path = expand_tilde(&config.store_path);
  SqliteStore::open(&store_path, config.equivalence())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Prompt ───────────────────────────────────────────────────────────────────

/// Ask a `y/N` question. Anything but `y`/`yes` is a no.
pub fn confirm(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<bool> {
  write!(output, "{question} [y/N]: ")?;
  output.flush()?;
  let mut line = String::new();
  input.read_line(&mut line)?;
  Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
