//! Seoul EV charging business notices.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::announcement::Announcement;
use crate::client::Client;
use crate::scrape::SiteScraper;
use crate::util::Result;

const PAGE_URL: &str =
  "https://news.seoul.go.kr/env/news-notice?category=ev-charging";

pub struct Seoul {
  client: Arc<Client>,
}

impl Seoul {
  pub fn new(client: Arc<Client>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SiteScraper for Seoul {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    let url = Url::parse(PAGE_URL)?;
    let resp = self.client.get(&url).await?.error_for_status()?;
    parse(&resp.text())
  }
}

fn parse(html: &str) -> Result<Vec<Announcement>> {
  let base = Url::parse(PAGE_URL)?;
  let document = Html::parse_document(html);

  let row = Selector::parse("div.news-list article").unwrap();
  let anchor = Selector::parse("h3.title a").unwrap();
  let date = Selector::parse("time").unwrap();

  let mut announcements = Vec::new();
  for article in document.select(&row) {
    let Some(a) = article.select(&anchor).next() else {
      continue;
    };
    let Some(href) = a.value().attr("href") else {
      continue;
    };

    announcements.push(Announcement {
      title: a.text().collect::<String>().trim().to_owned(),
      link: base.join(href)?.to_string(),
      date: article
        .select(&date)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_owned())
        .unwrap_or_default(),
    });
  }

  Ok(announcements)
}
