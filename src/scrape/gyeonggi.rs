//! Gyeonggi province business notices.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::announcement::Announcement;
use crate::client::Client;
use crate::scrape::SiteScraper;
use crate::util::{Error, Result};

const PAGE_URL: &str =
  "https://www.gg.go.kr/bbs/boardList.do?bsIdx=464&menuId=1534";

pub struct Gyeonggi {
  client: Arc<Client>,
}

impl Gyeonggi {
  pub fn new(client: Arc<Client>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SiteScraper for Gyeonggi {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    let url = Url::parse(PAGE_URL)?;
    let resp = self.client.get(&url).await?.error_for_status()?;
    parse(&resp.text())
  }
}

fn parse(html: &str) -> Result<Vec<Announcement>> {
  let base = Url::parse(PAGE_URL)?;
  let document = Html::parse_document(html);

  let item = Selector::parse("div.board_list ul li").unwrap();
  let anchor = Selector::parse("a.title").unwrap();
  let day = Selector::parse("span.day").unwrap();

  let mut announcements = Vec::new();
  for li in document.select(&item) {
    let a = li
      .select(&anchor)
      .next()
      .ok_or_else(|| Error::Parse("board item without title link".into()))?;
    let href = a
      .value()
      .attr("href")
      .ok_or_else(|| Error::Parse("title link without href".into()))?;

    announcements.push(Announcement {
      title: a.text().collect::<String>().trim().to_owned(),
      link: base.join(href)?.to_string(),
      date: li
        .select(&day)
        .next()
        .map(|s| s.text().collect::<String>().trim().to_owned())
        .unwrap_or_default(),
    });
  }

  Ok(announcements)
}
