//! Per-site announcement scrapers.
//!
//! Every municipal board publishes its notices in a different page
//! structure, so each source gets its own bespoke parser behind the
//! shared [`SiteScraper`] trait. Scrapers are independent: one site
//! failing never affects another.

mod bucheon;
mod gangneung;
mod goyang;
mod gwangju;
mod gyeonggi;
mod incheon;
mod incheon2;
mod koroad;
mod seoul;
mod ulsan;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::announcement::Announcement;
use crate::client::Client;
use crate::util::{Error, Result};

#[derive(
  Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Site {
  Incheon,
  /// Incheon city-wide notice board (the first Incheon source covers
  /// the EV business notices only).
  Incheon2,
  Seoul,
  Gyeonggi,
  Gwangju,
  Bucheon,
  Ulsan,
  Koroad,
  Goyang,
  Gangneung,
}

impl Site {
  pub const ALL: [Site; 10] = [
    Site::Incheon,
    Site::Incheon2,
    Site::Seoul,
    Site::Gyeonggi,
    Site::Gwangju,
    Site::Bucheon,
    Site::Ulsan,
    Site::Koroad,
    Site::Goyang,
    Site::Gangneung,
  ];

  pub fn id(&self) -> &'static str {
    match self {
      Site::Incheon => "incheon",
      Site::Incheon2 => "incheon2",
      Site::Seoul => "seoul",
      Site::Gyeonggi => "gyeonggi",
      Site::Gwangju => "gwangju",
      Site::Bucheon => "bucheon",
      Site::Ulsan => "ulsan",
      Site::Koroad => "koroad",
      Site::Goyang => "goyang",
      Site::Gangneung => "gangneung",
    }
  }
}

impl fmt::Display for Site {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.id())
  }
}

impl FromStr for Site {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Site::ALL
      .into_iter()
      .find(|site| site.id() == s)
      .ok_or_else(|| Error::UnknownSite(s.to_owned()))
  }
}

#[async_trait]
pub trait SiteScraper: Send + Sync {
  /// Fetch the source page and return its announcements in document
  /// order. No dedup, no sorting.
  async fn scrape(&self) -> Result<Vec<Announcement>>;
}

pub type ScraperRegistry = HashMap<Site, Arc<dyn SiteScraper>>;

pub fn scraper_for(site: Site, client: Arc<Client>) -> Arc<dyn SiteScraper> {
  match site {
    Site::Incheon => Arc::new(incheon::Incheon::new(client)),
    Site::Incheon2 => Arc::new(incheon2::Incheon2::new(client)),
    Site::Seoul => Arc::new(seoul::Seoul::new(client)),
    Site::Gyeonggi => Arc::new(gyeonggi::Gyeonggi::new(client)),
    Site::Gwangju => Arc::new(gwangju::Gwangju::new(client)),
    Site::Bucheon => Arc::new(bucheon::Bucheon::new(client)),
    Site::Ulsan => Arc::new(ulsan::Ulsan::new(client)),
    Site::Koroad => Arc::new(koroad::Koroad::new(client)),
    Site::Goyang => Arc::new(goyang::Goyang::new(client)),
    Site::Gangneung => Arc::new(gangneung::Gangneung::new(client)),
  }
}

pub fn build_registry(sites: &[Site], client: &Arc<Client>) -> ScraperRegistry {
  sites
    .iter()
    .map(|&site| (site, scraper_for(site, client.clone())))
    .collect()
}
