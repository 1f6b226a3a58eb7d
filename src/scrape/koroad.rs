//! KoROAD (도로교통공단) business notices. The only source with a
//! machine-readable feed, so this one parses RSS instead of HTML.

use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use url::Url;

use crate::announcement::Announcement;
use crate::client::Client;
use crate::scrape::SiteScraper;
use crate::util::{Error, Result};

const FEED_URL: &str = "https://www.koroad.or.kr/main/bbs/rss.do?bbsId=notice";

pub struct Koroad {
  client: Arc<Client>,
}

impl Koroad {
  pub fn new(client: Arc<Client>) -> Self {
    Self { client }
  }
}

#[async_trait]
impl SiteScraper for Koroad {
  async fn scrape(&self) -> Result<Vec<Announcement>> {
    let url = Url::parse(FEED_URL)?;
    let resp = self.client.get(&url).await?.error_for_status()?;
    parse(&resp.text())
  }
}

#[derive(Clone, Copy)]
enum Field {
  Title,
  Link,
  Date,
}

fn parse(xml: &str) -> Result<Vec<Announcement>> {
  let mut reader = Reader::from_str(xml);
  reader.config_mut().trim_text(true);

  let mut announcements = Vec::new();
  let mut in_item = false;
  let mut field: Option<Field> = None;
  let mut current = Announcement::default();

  loop {
    match reader.read_event() {
      Ok(Event::Start(e)) => match e.name().as_ref() {
        b"item" => {
          in_item = true;
          current = Announcement::default();
        }
        b"title" if in_item => field = Some(Field::Title),
        b"link" if in_item => field = Some(Field::Link),
        b"pubDate" if in_item => field = Some(Field::Date),
        _ => {}
      },
      Ok(Event::Text(t)) if in_item => {
        let text = t
          .xml_content()
          .map_err(|e| Error::Parse(format!("bad feed text: {e}")))?;
        append(&mut current, field, &text);
      }
      Ok(Event::CData(t)) if in_item => {
        let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
        append(&mut current, field, &text);
      }
      Ok(Event::End(e)) => match e.name().as_ref() {
        b"item" => {
          in_item = false;
          announcements.push(std::mem::take(&mut current));
        }
        b"title" | b"link" | b"pubDate" => field = None,
        _ => {}
      },
      Ok(Event::Eof) => break,
      Err(e) => return Err(Error::Parse(format!("invalid feed: {e}"))),
      _ => {}
    }
  }

  Ok(announcements)
}

fn append(current: &mut Announcement, field: Option<Field>, text: &str) {
  match field {
    Some(Field::Title) => current.title.push_str(text),
    Some(Field::Link) => current.link.push_str(text),
    Some(Field::Date) => current.date.push_str(text),
    None => {}
  }
}
