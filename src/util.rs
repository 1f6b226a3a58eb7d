pub const USER_AGENT: &str =
  concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("YAML parse error")]
  Yaml(#[from] serde_yaml::Error),

  #[error("IO error")]
  Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("error fetching source: {0}")]
  Fetch(#[from] reqwest::Error),

  #[error("HTTP status error {0} (url: {1})")]
  HttpStatus(reqwest::StatusCode, url::Url),

  #[error("error parsing source page: {0}")]
  Parse(String),

  #[error("cache IO error: {0}")]
  CacheIo(#[source] std::io::Error),

  #[error("unknown source: {0}")]
  UnknownSite(String),

  #[error("duplicate {0}")]
  Duplicate(&'static str),

  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("Invalid URL {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("IO error")]
  Io(#[from] std::io::Error),

  #[error("JSON error")]
  Json(#[from] serde_json::Error),

  #[error("Config error {0:?}")]
  Config(#[from] ConfigError),
}

impl Error {
  /// HTTP status a request handler answers with when this error bubbles
  /// up. Upstream scrape failures map to 502: the source is unreachable
  /// or its page no longer matches our parsing rules.
  pub fn status(&self) -> http::StatusCode {
    use http::StatusCode;

    match self {
      Error::Fetch(_) | Error::HttpStatus(..) | Error::Parse(_) => {
        StatusCode::BAD_GATEWAY
      }
      Error::NotFound(_) | Error::UnknownSite(_) => StatusCode::NOT_FOUND,
      Error::Duplicate(_) => StatusCode::CONFLICT,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}
