//! Incheon EV business notices (사업공고).

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::announcement::Announcement;
use crate::client::Client;
use crate::scrape::SiteScraper;
use crate::util::{Error, Result};

const PAGE_URL: &str =
  "https://www.incheon.go.kr/IC010205?beginIndex=1&srchKey=sj&srchText=%EC%A0%84%EA%B8%B0%EC%B0%A8";

pub struct Incheon {
  client: Arc<Client>,
}

impl Incheon {
  pub fn new(client: Arc<Client>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SiteScraper for Incheon {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    let url = Url::parse(PAGE_URL)?;
    let resp = self.client.get(&url).await?.error_for_status()?;
    parse(&resp.text())
  }
}

fn parse(html: &str) -> Result<Vec<Announcement>> {
  let base = Url::parse(PAGE_URL)?;
  let document = Html::parse_document(html);

  let table = Selector::parse("table.board-list tbody tr").unwrap();
  let subject = Selector::parse("td.subject a").unwrap();
  let date = Selector::parse("td.date").unwrap();

  let mut announcements = Vec::new();
  for row in document.select(&table) {
    // pinned notice rows carry no link
    let Some(anchor) = row.select(&subject).next() else {
      continue;
    };
    let href = anchor
      .value()
      .attr("href")
      .ok_or_else(|| Error::Parse("subject anchor without href".into()))?;
    let title = anchor.text().collect::<String>().trim().to_owned();
    let posted = row
      .select(&date)
      .next()
      .map(|td| td.text().collect::<String>().trim().to_owned())
      .unwrap_or_default();

    announcements.push(Announcement {
      title,
      link: base.join(href)?.to_string(),
      date: posted,
    });
  }

  Ok(announcements)
}

#[cfg(test)]
mod test {
  use super::*;

  const FIXTURE: &str = r#"
    <table class="board-list">
      <tbody>
        <tr>
          <td class="num">124</td>
          <td class="subject"><a href="/IC010205/view?no=124">2024년 전기자동차 보급사업 공고</a></td>
          <td class="date">2024-03-04</td>
        </tr>
        <tr>
          <td class="num">공지</td>
          <td class="subject">접수 안내</td>
          <td class="date">2024-03-01</td>
        </tr>
        <tr>
          <td class="num">123</td>
          <td class="subject"><a href="/IC010205/view?no=123">전기차 충전시설 설치 공고</a></td>
          <td class="date">2024-02-26</td>
        </tr>
      </tbody>
    </table>
  "#;

  #[test]
  fn parse_keeps_document_order_and_skips_linkless_rows() {
    let announcements = parse(FIXTURE).unwrap();
    assert_eq!(announcements.len(), 2);
    assert_eq!(announcements[0].title, "2024년 전기자동차 보급사업 공고");
    assert_eq!(
      announcements[0].link,
      "https://www.incheon.go.kr/IC010205/view?no=124"
    );
    assert_eq!(announcements[0].date, "2024-03-04");
    assert_eq!(announcements[1].date, "2024-02-26");
  }

  #[test]
  fn parse_of_unrelated_page_yields_empty_list() {
    let announcements = parse("<html><body><p>moved</p></body></html>").unwrap();
    assert!(announcements.is_empty());
  }
}
