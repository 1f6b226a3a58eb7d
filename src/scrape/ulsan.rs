//! Ulsan metropolitan business notices. EUC-KR board, table layout
//! with the date in a fixed column.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::announcement::Announcement;
use crate::client::Client;
use crate::scrape::SiteScraper;
use crate::util::Result;

const PAGE_URL: &str =
  "https://www.ulsan.go.kr/u/rep/bbs/list.ulsan?bbsId=BBS_0000000000000041";

pub struct Ulsan {
  client: Arc<Client>,
}

impl Ulsan {
  pub fn new(client: Arc<Client>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SiteScraper for Ulsan {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    let url = Url::parse(PAGE_URL)?;
    let resp = self.client.get(&url).await?.error_for_status()?;
    parse(&resp.text_with_charset("euc-kr"))
  }
}

fn parse(html: &str) -> Result<Vec<Announcement>> {
  let base = Url::parse(PAGE_URL)?;
  let document = Html::parse_document(html);

  let row = Selector::parse("table.bbs_ltype tbody tr").unwrap();
  let subject = Selector::parse("td.al a").unwrap();
  let date = Selector::parse("td:nth-child(4)").unwrap();

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
