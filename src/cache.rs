//! Per-source cache of the last successful scrape.
//!
//! One JSON file per source under the cache directory. Writes go
//! through a temp file and a rename so a concurrent reader never
//! observes a half-written entry. Entries are only ever replaced,
//! never expired: while a source keeps failing, the last good payload
//! stays serveable indefinitely.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::announcement::Announcement;
use crate::scrape::{Site, SiteScraper};
use crate::util::{Error, Result};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CacheEntry {
  pub payload: Vec<Announcement>,
  pub content_hash: String,
}

pub struct CacheStore {
  dir: PathBuf,
}

impl CacheStore {
  pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
    let dir = dir.into();
    std::fs::create_dir_all(&dir).map_err(Error::CacheIo)?;
    Ok(Self { dir })
  }

  /// Digest of a payload, used purely for change detection. Field and
  /// row boundaries are length-prefixed so the hash is order-sensitive
  /// and two different payloads cannot collide by concatenation.
  pub fn content_hash(payload: &[Announcement]) -> String {
    let mut hasher = blake3::Hasher::new();
    for announcement in payload {
      for field in [
        &announcement.title,
        &announcement.link,
        &announcement.date,
      ] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
      }
    }
    hasher.finalize().to_hex().to_string()
  }

  fn entry_path(&self, site: Site) -> PathBuf {
    self.dir.join(format!("{site}.json"))
  }

  pub async fn load(&self, site: Site) -> Result<Option<CacheEntry>> {
    let path = self.entry_path(site);
    let bytes = match tokio::fs::read(&path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(Error::CacheIo(e)),
    };

    let entry: CacheEntry = match serde_json::from_slice(&bytes) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(site = %site, error = %e, "corrupt cache entry, ignoring");
        return Ok(None);
      }
    };

    // the stored hash must always match the stored payload; a mismatch
    // means the file was tampered with or produced by an older format
    if entry.content_hash != Self::content_hash(&entry.payload) {
      warn!(site = %site, "cache entry hash mismatch, ignoring");
      return Ok(None);
    }

    Ok(Some(entry))
  }

  /// Atomically overwrite the entry for a source. The hash is computed
  /// here, never accepted from the caller.
  pub async fn save(&self, site: Site, payload: &[Announcement]) -> Result<()> {
    let entry = CacheEntry {
      payload: payload.to_vec(),
      content_hash: Self::content_hash(payload),
    };
    let bytes = serde_json::to_vec(&entry)?;

    let path = self.entry_path(site);
    let tmp_path = tmp_path(&path);
    tokio::fs::write(&tmp_path, &bytes)
      .await
      .map_err(Error::CacheIo)?;
    tokio::fs::rename(&tmp_path, &path)
      .await
      .map_err(Error::CacheIo)?;

    debug!(site = %site, hash = %entry.content_hash, "cache entry saved");
    Ok(())
  }

  /// The change-gated refresh cycle: scrape, write the cache only if
  /// the content hash moved, and return the fresh payload either way.
  /// A failing cache write degrades to "scraped but not cached" rather
  /// than failing the caller.
  pub async fn refresh(
    &self,
    site: Site,
    scraper: &dyn SiteScraper,
  ) -> Result<Vec<Announcement>> {
    let existing = match self.load(site).await {
      Ok(existing) => existing,
      Err(e) => {
        warn!(site = %site, error = %e, "cache read failed, treating as absent");
        None
      }
    };

    let payload = scraper.scrape().await?;

    let changed = match &existing {
      None => true,
      Some(entry) => entry.content_hash != Self::content_hash(&payload),
    };

    if changed {
      if let Err(e) = self.save(site, &payload).await {
        warn!(site = %site, error = %e, "cache write failed, serving uncached");
      }
    } else {
      debug!(site = %site, "source unchanged, cache write skipped");
    }

    Ok(payload)
  }
}

/// Per-call unique temp name: a scheduler tick and an on-demand refresh
/// may write the same entry concurrently, and they must never share a
/// temp file.
fn tmp_path(path: &Path) -> PathBuf {
  static COUNTER: AtomicU64 = AtomicU64::new(0);
  let n = COUNTER.fetch_add(1, Ordering::Relaxed);
  let mut os = path.as_os_str().to_owned();
  os.push(format!(".{}.{n}.tmp", std::process::id()));
  os.into()
}
