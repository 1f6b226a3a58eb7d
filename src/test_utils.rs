use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::announcement::Announcement;
use crate::scrape::SiteScraper;
use crate::util::Result;

pub fn announcement(title: &str) -> Announcement {
  Announcement {
    title: title.to_owned(),
    link: format!("http://x/{title}"),
    date: "2024-01-01".to_owned(),
  }
}

/// Unique scratch directory under the system temp dir.
pub fn temp_dir(label: &str) -> PathBuf {
  static COUNTER: AtomicU64 = AtomicU64::new(0);
  std::env::temp_dir().join(format!(
    "ev-bulletin-{label}-{}-{}",
    std::process::id(),
    COUNTER.fetch_add(1, Ordering::Relaxed)
  ))
}

/// Scraper stub that pops pre-programmed outcomes, one per call.
pub struct StubScraper {
  outcomes: Mutex<VecDeque<Result<Vec<Announcement>>>>,
}

impl StubScraper {
  pub fn new(
    outcomes: impl IntoIterator<Item = Result<Vec<Announcement>>>,
  ) -> Self {
    Self {
      outcomes: Mutex::new(outcomes.into_iter().collect()),
    }
  }

  /// Stub that keeps returning the same payload forever.
  pub fn constant(payload: Vec<Announcement>) -> ConstScraper {
    ConstScraper { payload }
  }
}

#[async_trait]
impl SiteScraper for StubScraper {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    self
      .outcomes
      .lock()
      .unwrap()
      .pop_front()
      .expect("stub scraper exhausted")
  }
}

pub struct ConstScraper {
  payload: Vec<Announcement>,
}

#[async_trait]
impl SiteScraper for ConstScraper {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    Ok(self.payload.clone())
  }
}
