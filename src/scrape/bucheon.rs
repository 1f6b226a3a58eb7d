//! Bucheon city business notices.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::announcement::Announcement;
use crate::client::Client;
use crate::scrape::SiteScraper;
use crate::util::Result;

const PAGE_URL: &str =
  "https://www.bucheon.go.kr/site/program/board/basicboard/list?boardtypeid=28205&menuid=148004002002";

pub struct Bucheon {
  client: Arc<Client>,
}

impl Bucheon {
  pub fn new(client: Arc<Client>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SiteScraper for Bucheon {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    let url = Url::parse(PAGE_URL)?;
    let resp = self.client.get(&url).await?.error_for_status()?;
    parse(&resp.text())
  }
}

fn parse(html: &str) -> Result<Vec<Announcement>> {
  let base = Url::parse(PAGE_URL)?;
  let document = Html::parse_document(html);

  let item = Selector::parse("ul.bbs_list > li").unwrap();
  let title = Selector::parse("p.tit a").unwrap();
  let date = Selector::parse("p.info span.date").unwrap();

  let mut announcements = Vec::new();
  for li in document.select(&item) {
    let Some(a) = li.select(&title).next() else {
      continue;
    };
    let Some(href) = a.value().attr("href") else {
      continue;
    };

    announcements.push(Announcement {
      title: a.text().collect::<String>().trim().to_owned(),
      link: base.join(href)?.to_string(),
      date: li
        .select(&date)
        .next()
        .map(|s| s.text().collect::<String>().trim().to_owned())
        .unwrap_or_default(),
    });
  }

  Ok(announcements)
}
