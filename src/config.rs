use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::ClientConfig;
use crate::scrape::Site;
use crate::util::{ConfigError, Result};

#[derive(Deserialize, Clone, Debug)]
pub struct RootConfig {
  #[serde(default = "default_bind")]
  pub bind: String,

  #[serde(default)]
  pub client: ClientConfig,

  #[serde(default = "default_cache_dir")]
  pub cache_dir: PathBuf,

  /// How often the scheduler re-scrapes the cached sources.
  #[serde(default = "default_refresh_interval")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  pub refresh_interval: Duration,

  pub sources: Vec<SourceEntry>,
}

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct SourceEntry {
  pub site: Site,
  /// Cached sources are served through the cache store and warmed by
  /// the scheduler; the rest are scraped per request.
  #[serde(default)]
  pub cached: bool,
}

impl RootConfig {
  pub fn load_from_file(path: &Path) -> Result<Self> {
    let f = std::fs::File::open(path).map_err(ConfigError::Io)?;
    let config: RootConfig =
      serde_yaml::from_reader(f).map_err(ConfigError::from)?;
    Ok(config)
  }

  pub fn sites(&self) -> Vec<Site> {
    self.sources.iter().map(|s| s.site).collect()
  }

  pub fn cached_sites(&self) -> HashSet<Site> {
    self
      .sources
      .iter()
      .filter(|s| s.cached)
      .map(|s| s.site)
      .collect()
  }
}

fn default_bind() -> String {
  "127.0.0.1:4080".to_owned()
}

fn default_cache_dir() -> PathBuf {
  "cache".into()
}

fn default_refresh_interval() -> Duration {
  Duration::from_secs(10 * 60)
}
