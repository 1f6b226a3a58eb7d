//! Gangneung city notices (고시공고).

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::announcement::Announcement;
use crate::client::Client;
use crate::scrape::SiteScraper;
use crate::util::Result;

const PAGE_URL: &str =
  "https://www.gn.go.kr/www/selectBbsNttList.do?bbsNo=103&key=232";

pub struct Gangneung {
  client: Arc<Client>,
}

impl Gangneung {
  pub fn new(client: Arc<Client>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SiteScraper for Gangneung {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    let url = Url::parse(PAGE_URL)?;
    let resp = self.client.get(&url).await?.error_for_status()?;
    parse(&resp.text())
  }
}

fn parse(html: &str) -> Result<Vec<Announcement>> {
  let base = Url::parse(PAGE_URL)?;
  let document = Html::parse_document(html);

  let row = Selector::parse("table.board_list tbody tr").unwrap();
  let subject = Selector::parse("td.left a").unwrap();
  let date = Selector::parse("td.reg").unwrap();

  let mut announcements = Vec::new();
  for tr in document.select(&row) {
    let Some(a) = tr.select(&subject).next() else {
      continue;
    };
    let Some(href) = a.value().attr("href") else {
      continue;
    };

    announcements.push(Announcement {
      title: a.text().collect::<String>().trim().to_owned(),
      link: base.join(href)?.to_string(),
      date: tr
        .select(&date)
        .next()
        .map(|td| td.text().collect::<String>().trim().to_owned())
        .unwrap_or_default(),
    });
  }

  Ok(announcements)
}
