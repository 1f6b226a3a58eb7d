//! Goyang city notices (고시공고).

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::announcement::Announcement;
use crate::client::Client;
use crate::scrape::SiteScraper;
use crate::util::{Error, Result};

const PAGE_URL: &str =
  "https://www.goyang.go.kr/www/user/bbs/BD_selectBbsList.do?q_bbsCode=1022";

pub struct Goyang {
  client: Arc<Client>,
}

impl Goyang {
  pub fn new(client: Arc<Client>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SiteScraper for Goyang {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    let url = Url::parse(PAGE_URL)?;
    let resp = self.client.get(&url).await?.error_for_status()?;
    parse(&resp.text())
  }
}

fn parse(html: &str) -> Result<Vec<Announcement>> {
  let base = Url::parse(PAGE_URL)?;
  let document = Html::parse_document(html);

  let table = Selector::parse("div.bd_list table").unwrap();
  let row = Selector::parse("div.bd_list table tbody tr").unwrap();
  let subject = Selector::parse("td.ta_l a").unwrap();
  let date = Selector::parse("td.date").unwrap();

  if document.select(&table).next().is_none() {
    return Err(Error::Parse("notice table not found on page".into()));
  }

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
