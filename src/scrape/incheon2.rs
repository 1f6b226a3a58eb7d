//! Incheon city-wide notices (고시공고). Separate board from the EV
//! business notices, with its own markup.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::announcement::Announcement;
use crate::client::Client;
use crate::scrape::SiteScraper;
use crate::util::{Error, Result};

const PAGE_URL: &str =
  "https://announce.incheon.go.kr/citynet/jsp/sap/SAPGosiBizProcess.do?command=searchList";

pub struct Incheon2 {
  client: Arc<Client>,
}

impl Incheon2 {
  pub fn new(client: Arc<Client>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SiteScraper for Incheon2 {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    let url = Url::parse(PAGE_URL)?;
    let resp = self.client.get(&url).await?.error_for_status()?;
    parse(&resp.text())
  }
}

fn parse(html: &str) -> Result<Vec<Announcement>> {
  let base = Url::parse(PAGE_URL)?;
  let document = Html::parse_document(html);

  let list = Selector::parse("ul.sap-list").unwrap();
  let item = Selector::parse("ul.sap-list > li").unwrap();
  let anchor = Selector::parse("a.sap-subject").unwrap();
  let date = Selector::parse("span.sap-date").unwrap();

  if document.select(&list).next().is_none() {
    return Err(Error::Parse("notice list not found on page".into()));
  }

  let mut announcements = Vec::new();
  for li in document.select(&item) {
    let a = li
      .select(&anchor)
      .next()
      .ok_or_else(|| Error::Parse("notice item without subject link".into()))?;
    let href = a
      .value()
      .attr("href")
      .ok_or_else(|| Error::Parse("subject link without href".into()))?;

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
