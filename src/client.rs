use std::sync::Arc;
use std::time::Duration;

use mime::Mime;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use url::Url;

use crate::util::{Error, Result};

#[derive(Deserialize, Debug, Clone)]
pub struct ClientConfig {
  user_agent: Option<String>,
  referer: Option<String>,
  #[serde(default = "default_timeout")]
  #[serde(deserialize_with = "duration_str::deserialize_duration")]
  timeout: Duration,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      user_agent: None,
      referer: None,
      timeout: default_timeout(),
    }
  }
}

impl ClientConfig {
  fn to_builder(&self) -> reqwest::ClientBuilder {
    let mut builder = reqwest::Client::builder();

    if let Some(user_agent) = &self.user_agent {
      builder = builder.user_agent(user_agent);
    } else {
      builder = builder.user_agent(crate::util::USER_AGENT);
    }

    let mut header_map = HeaderMap::new();
    if let Some(referer) = &self.referer {
      header_map.append(
        "Referer",
        referer.try_into().expect("invalid Referer value"),
      );
    }

    if !header_map.is_empty() {
      builder = builder.default_headers(header_map);
    }

    // the timeout doubles as the cancellation bound: shutdown never
    // waits longer than this for an in-flight fetch
    builder = builder.timeout(self.timeout);

    builder
  }

  pub fn build(&self) -> Result<Client> {
    let reqwest_client = self.to_builder().build()?;
    Ok(Client {
      client: reqwest_client,
    })
  }
}

pub struct Client {
  client: reqwest::Client,
}

impl Client {
  pub async fn get(&self, url: &Url) -> Result<Response> {
    let resp = self.client.get(url.clone()).send().await?;
    Response::from_reqwest_resp(resp).await
  }
}

#[derive(Clone)]
pub struct Response {
  inner: Arc<InnerResponse>,
}

struct InnerResponse {
  url: Url,
  status: reqwest::StatusCode,
  headers: HeaderMap,
  body: Box<[u8]>,
}

impl Response {
  async fn from_reqwest_resp(resp: reqwest::Response) -> Result<Self> {
    let status = resp.status();
    let headers = resp.headers().clone();
    let url = resp.url().clone();
    let body = resp.bytes().await?.to_vec().into_boxed_slice();
    let resp = InnerResponse {
      url,
      status,
      headers,
      body,
    };

    Ok(Self {
      inner: Arc::new(resp),
    })
  }

  pub fn error_for_status(self) -> Result<Self> {
    let status = self.inner.status;
    if status.is_client_error() || status.is_server_error() {
      return Err(Error::HttpStatus(status, self.inner.url.clone()));
    }

    Ok(self)
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self.inner.headers.get(name).and_then(|v| v.to_str().ok())
  }

  pub fn body(&self) -> &[u8] {
    &self.inner.body
  }

  /// Decode the body following the content-type charset. Several
  /// municipal boards still serve EUC-KR, so the caller picks a
  /// default for when the header is silent.
  pub fn text_with_charset(&self, default_encoding: &str) -> String {
    let content_type = self.content_type();
    let encoding_name = content_type
      .as_ref()
      .and_then(|mime| {
        mime.get_param("charset").map(|charset| charset.as_str())
      })
      .unwrap_or(default_encoding);
    let encoding = encoding_rs::Encoding::for_label(encoding_name.as_bytes())
      .unwrap_or(encoding_rs::UTF_8);

    let (text, _, _) = encoding.decode(self.body());
    text.into_owned()
  }

  pub fn text(&self) -> String {
    self.text_with_charset("utf-8")
  }

  pub fn content_type(&self) -> Option<Mime> {
    self.header("content-type").and_then(|v| v.parse().ok())
  }
}

fn default_timeout() -> Duration {
  Duration::from_secs(10)
}
