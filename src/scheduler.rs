//! Periodic cache-warming task.
//!
//! One process-wide worker refreshes every registered source on a
//! fixed interval. Failures are logged and swallowed: a broken source
//! never stops the tick and nothing but explicit cancellation stops
//! the worker. The shutdown signal is checked between sources, so an
//! in-flight refresh finishes (its save is atomic) and the remaining
//! sources are simply skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::scrape::{ScraperRegistry, Site};

pub struct Scheduler {
  interval: Duration,
  cache: Arc<CacheStore>,
  // iterated in a stable order so logs stay comparable across ticks
  sites: Vec<Site>,
  scrapers: Arc<ScraperRegistry>,
}

impl Scheduler {
  pub fn new(
    interval: Duration,
    cache: Arc<CacheStore>,
    sites: Vec<Site>,
    scrapers: Arc<ScraperRegistry>,
  ) -> Self {
    Self {
      interval,
      cache,
      sites,
      scrapers,
    }
  }

  /// Start the refresh loop. The first tick fires immediately to warm
  /// the cache on startup. Flipping the watch channel to `true` (or
  /// dropping its sender) cancels the worker.
  pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
      info!(
        sites = self.sites.len(),
        interval = ?self.interval,
        "refresh scheduler started"
      );

      let mut ticker = tokio::time::interval(self.interval);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

      loop {
        tokio::select! {
          _ = ticker.tick() => {}
          _ = shutdown.changed() => {
            info!("refresh scheduler cancelled");
            return;
          }
        }

        self.tick(&shutdown).await;
      }
    })
  }

  async fn tick(&self, shutdown: &watch::Receiver<bool>) {
    for &site in &self.sites {
      if *shutdown.borrow() {
        info!("refresh tick interrupted by shutdown");
        return;
      }

      let Some(scraper) = self.scrapers.get(&site) else {
        warn!(site = %site, "no scraper registered, skipping");
        continue;
      };

      match self.cache.refresh(site, scraper.as_ref()).await {
        Ok(payload) => {
          debug!(site = %site, count = payload.len(), "source refreshed");
        }
        Err(e) => {
          warn!(site = %site, error = %e, "refresh failed, keeping old entry");
        }
      }
    }
  }
}

#[cfg(test)]
mod test {
  use std::collections::HashMap;
  use std::sync::Arc;

  use super::*;
  use crate::test_utils::{StubScraper, announcement, temp_dir};
  use crate::util::Error;

  fn store() -> Arc<CacheStore> {
    Arc::new(CacheStore::new(temp_dir("scheduler-test")).unwrap())
  }

  #[tokio::test]
  async fn a_failing_site_does_not_stop_the_tick() {
    let cache = store();
    let mut scrapers: ScraperRegistry = HashMap::new();
    scrapers.insert(
      Site::Incheon2,
      Arc::new(StubScraper::new([Err(Error::Parse("gone".into()))])),
    );
    scrapers.insert(
      Site::Goyang,
      Arc::new(StubScraper::new([Ok(vec![announcement("A")])])),
    );

    let scheduler = Scheduler::new(
      Duration::from_secs(3600),
      cache.clone(),
      vec![Site::Incheon2, Site::Goyang],
      Arc::new(scrapers),
    );

    let (_tx, rx) = watch::channel(false);
    scheduler.tick(&rx).await;

    assert!(cache.load(Site::Incheon2).await.unwrap().is_none());
    let entry = cache.load(Site::Goyang).await.unwrap().unwrap();
    assert_eq!(entry.payload, vec![announcement("A")]);
  }

  #[tokio::test]
  async fn cancellation_stops_the_worker() {
    let cache = store();
    let mut scrapers: ScraperRegistry = HashMap::new();
    scrapers.insert(
      Site::Goyang,
      Arc::new(StubScraper::constant(vec![announcement("A")])),
    );

    let scheduler = Scheduler::new(
      Duration::from_millis(10),
      cache.clone(),
      vec![Site::Goyang],
      Arc::new(scrapers),
    );

    let (tx, rx) = watch::channel(false);
    let handle = scheduler.spawn(rx);

    // let at least the startup tick run
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
      .await
      .expect("scheduler did not stop after cancellation")
      .unwrap();

    assert!(cache.load(Site::Goyang).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn tick_skips_remaining_sites_after_shutdown() {
    let cache = store();
    let mut scrapers: ScraperRegistry = HashMap::new();
    scrapers.insert(
      Site::Goyang,
      Arc::new(StubScraper::constant(vec![announcement("A")])),
    );

    let scheduler = Scheduler::new(
      Duration::from_secs(3600),
      cache.clone(),
      vec![Site::Goyang],
      Arc::new(scrapers),
    );

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    scheduler.tick(&rx).await;

    assert!(cache.load(Site::Goyang).await.unwrap().is_none());
  }
}
