//! Bulk loaders for the `database create` and `database populate` commands.
//!
//! A configuration directory holds `predicates/`, `pids/` and `claimants/`;
//! a data directory holds `claims/`. Each subdirectory contains one JSON
//! document per `*.json` file, loaded in file-name order. A file that cannot
//! be read, parsed or stored is logged and counted; loading continues.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use claimstore_core::{
  Error as CoreError, Rejection,
  registry::{DEFAULT_PREDICATES, IdentifierTypeSpec},
  store::{ClaimStore, StoreError},
  submission::{parse_claim, parse_claimant},
};
use serde::Deserialize;
use tracing::{info, warn};

/// Subdirectories `database create` requires.
pub const CONFIG_DIRS: &[&str] = &["predicates", "pids", "claimants"];

/// Subdirectories `database populate` requires.
pub const DATA_DIRS: &[&str] = &["claims"];

/// Outcome of loading one subdirectory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadCounts {
  pub loaded:  usize,
  /// Already present; left untouched.
  pub skipped: usize,
  pub failed:  usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CreateReport {
  pub predicates:       LoadCounts,
  pub identifier_types: LoadCounts,
  pub claimants:        LoadCounts,
}

#[derive(Debug, Deserialize)]
struct PredicateFile {
  name:        String,
  description: Option<String>,
}

/// Fail unless `dir` is an existing directory containing every one of
/// `required`.
pub fn check_layout(dir: &Path, required: &[&str]) -> anyhow::Result<()> {
  if !dir.exists() {
    bail!("The specified path {} does not exist.", dir.display());
  }
  if !dir.is_dir() {
    bail!("The specified path {} is not a directory.", dir.display());
  }
  let missing: Vec<&str> = required
    .iter()
    .copied()
    .filter(|sub| !dir.join(sub).is_dir())
    .collect();
  if !missing.is_empty() {
    bail!(
      "The specified directory must contain the folders: {} (missing: {}).",
      required.join(", "),
      missing.join(", ")
    );
  }
  Ok(())
}

/// `*.json` files directly inside `dir`, sorted by name.
fn json_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for entry in std::fs::read_dir(dir).with_context(|| format!("failed to list {dir:?}"))? {
    let path = entry?.path();
    if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}

async fn read_json(path: &Path) -> anyhow::Result<serde_json::Value> {
  let text = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read {path:?}"))?;
  serde_json::from_str(&text).with_context(|| format!("{path:?} is not valid JSON"))
}

fn is_rejection<E: StoreError>(err: &E, rejection: Rejection) -> bool {
  matches!(err.domain(), Some(CoreError::InvalidRequest(r)) if *r == rejection)
}

enum Loaded {
  New,
  Existing,
}

/// Run `load` over every JSON file of `dir`, tallying the outcome.
async fn load_dir<F, Fut>(dir: &Path, kind: &str, mut load: F) -> anyhow::Result<LoadCounts>
where
  F: FnMut(serde_json::Value) -> Fut,
  Fut: Future<Output = anyhow::Result<Loaded>>,
{
  let mut counts = LoadCounts::default();
  for path in json_files(dir)? {
    let outcome = match read_json(&path).await {
      Ok(json) => load(json).await,
      Err(e) => Err(e),
    };
    match outcome {
      Ok(Loaded::New) => counts.loaded += 1,
      Ok(Loaded::Existing) => counts.skipped += 1,
      Err(e) => {
        warn!(file = %path.display(), error = %format!("{e:#}"), "could not load {kind}");
        counts.failed += 1;
      }
    }
  }
  info!(kind, loaded = counts.loaded, skipped = counts.skipped, failed = counts.failed, "loaded");
  Ok(counts)
}

/// Seed the default predicates, then load the configuration directory in
/// dependency order: predicates, identifier types, claimants.
pub async fn create<S: ClaimStore>(store: &S, config_dir: &Path) -> anyhow::Result<CreateReport> {
  check_layout(config_dir, CONFIG_DIRS)?;

  for name in DEFAULT_PREDICATES {
    store.seed_predicate((*name).to_string(), None).await?;
  }

  let existing: Vec<String> =
    store.list_predicates().await?.into_iter().map(|p| p.name).collect();
  let predicates = load_dir(&config_dir.join("predicates"), "predicate", |json| {
    let known = &existing;
    async move {
      let file: PredicateFile = serde_json::from_value(json)?;
      let new = !known.contains(&file.name);
      store.seed_predicate(file.name, file.description).await?;
      Ok::<_, anyhow::Error>(if new { Loaded::New } else { Loaded::Existing })
    }
  })
  .await?;

  let existing: Vec<String> =
    store.list_identifier_types().await?.into_iter().map(|t| t.name).collect();
  let identifier_types = load_dir(&config_dir.join("pids"), "identifier type", |json| {
    let known = &existing;
    async move {
      let spec: IdentifierTypeSpec = serde_json::from_value(json)?;
      let registered = store.register_identifier_type(spec).await?;
      Ok::<_, anyhow::Error>(if known.contains(&registered.name) {
        Loaded::Existing
      } else {
        Loaded::New
      })
    }
  })
  .await?;

  let claimants = load_dir(&config_dir.join("claimants"), "claimant", |json| async move {
    let claimant = parse_claimant(json)?;
    match store.subscribe(claimant).await {
      Ok(_) => Ok::<_, anyhow::Error>(Loaded::New),
      Err(e) if is_rejection(&e, Rejection::ClaimantAlreadyRegistered) => Ok(Loaded::Existing),
      Err(e) => Err(e.into()),
    }
  })
  .await?;

  Ok(CreateReport { predicates, identifier_types, claimants })
}

/// Submit every claim file of `data_dir/claims` through the store.
pub async fn populate<S: ClaimStore>(store: &S, data_dir: &Path) -> anyhow::Result<LoadCounts> {
  check_layout(data_dir, DATA_DIRS)?;

  load_dir(&data_dir.join("claims"), "claim", |json| async move {
    let claim = parse_claim(json)?;
    store.record_claim(claim).await?;
    Ok::<_, anyhow::Error>(Loaded::New)
  })
  .await
}
