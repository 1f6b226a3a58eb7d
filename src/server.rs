use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use http::StatusCode;
use serde::Deserialize;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::announcement::Announcement;
use crate::board::{
  Board, CommentDraft, NewsDraft, NewsPatch, PostDraft, PostPatch, UserDraft,
};
use crate::cache::CacheStore;
use crate::config::RootConfig;
use crate::scheduler::Scheduler;
use crate::scrape::{self, ScraperRegistry, Site};
use crate::util::{Error, Result};

#[derive(Parser)]
pub struct ServerConfig {
  /// Address to listen on (overrides the config file)
  #[clap(long, short)]
  bind: Option<String>,
}

#[derive(Clone)]
struct AppState {
  scrapers: Arc<ScraperRegistry>,
  cache: Arc<CacheStore>,
  cached_sites: Arc<HashSet<Site>>,
  board: Board,
}

pub async fn serve(
  server_config: ServerConfig,
  root_config: RootConfig,
) -> Result<()> {
  let client = Arc::new(root_config.client.build()?);
  let scrapers = Arc::new(scrape::build_registry(&root_config.sites(), &client));
  let cache = Arc::new(CacheStore::new(root_config.cache_dir.clone())?);
  let cached_sites = root_config.cached_sites();

  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  spawn_signal_listener(shutdown_tx);

  let scheduler = Scheduler::new(
    root_config.refresh_interval,
    cache.clone(),
    cached_sites.iter().copied().collect(),
    scrapers.clone(),
  );
  let scheduler_handle = scheduler.spawn(shutdown_rx.clone());

  let state = AppState {
    scrapers,
    cache,
    cached_sites: Arc::new(cached_sites),
    board: Board::new(),
  };

  let bind = server_config.bind.unwrap_or(root_config.bind);
  info!("listening on {}", bind);
  let listener = tokio::net::TcpListener::bind(&bind).await?;

  let app = router(state);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_requested(shutdown_rx))
    .await?;

  // the scheduler saw the same signal; wait for it to wind down so no
  // cache write is cut off mid-rename
  let _ = scheduler_handle.await;
  info!("shut down cleanly");
  Ok(())
}

fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(|| async { "ev-bulletin is up and running!" }))
    .route("/health", get(|| async { "ok" }))
    .route("/announcements/:site", get(get_announcements))
    .route("/news", get(list_news).post(create_news))
    .route("/news/search", get(search_news))
    .route(
      "/news/:id",
      get(get_news).put(update_news).delete(delete_news),
    )
    .route("/news/:id/vote", post(vote_news))
    .route("/community", get(list_posts).post(create_post))
    .route(
      "/community/:id",
      get(get_post).put(update_post).delete(delete_post),
    )
    .route("/community/:id/like", post(like_post))
    .route(
      "/community/:id/comments",
      get(list_comments).post(add_comment),
    )
    .route(
      "/community/:id/comments/:comment_id",
      axum::routing::delete(delete_comment),
    )
    .route("/users", post(create_user))
    .route("/users/:id", get(get_user))
    .fallback(get(|| async {
      (StatusCode::NOT_FOUND, "Endpoint not found")
    }))
    .layer(CompressionLayer::new().gzip(true))
    .layer(CorsLayer::permissive())
    .with_state(state)
}

impl IntoResponse for Error {
  fn into_response(self) -> axum::response::Response {
    let status = self.status();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    (status, self.to_string()).into_response()
  }
}

// --- announcements ---

async fn get_announcements(
  State(state): State<AppState>,
  Path(site): Path<String>,
) -> Result<Json<Vec<Announcement>>> {
  let site: Site = site.parse()?;
  let scraper = state
    .scrapers
    .get(&site)
    .ok_or_else(|| Error::UnknownSite(site.to_string()))?;

  // cached sources run the change-gated refresh; either way the
  // response is the payload of a live scrape, never a shortened one
  let payload = if state.cached_sites.contains(&site) {
    state.cache.refresh(site, scraper.as_ref()).await?
  } else {
    scraper.scrape().await?
  };

  Ok(Json(payload))
}

// --- news ---

#[derive(Deserialize)]
struct Pagination {
  #[serde(default)]
  skip: usize,
  #[serde(default = "default_limit")]
  limit: usize,
}

fn default_limit() -> usize {
  100
}

#[derive(Deserialize)]
struct SearchQuery {
  q: String,
}

#[derive(Deserialize)]
struct VoteBody {
  /// +1 for an upvote, -1 for a downvote
  value: i64,
}

#[derive(Deserialize)]
struct LikeBody {
  user_id: u64,
}

async fn create_news(
  State(state): State<AppState>,
  Json(draft): Json<NewsDraft>,
) -> impl IntoResponse {
  (StatusCode::CREATED, Json(state.board.create_news(draft).await))
}

async fn list_news(
  State(state): State<AppState>,
  Query(page): Query<Pagination>,
) -> impl IntoResponse {
  Json(state.board.list_news(page.skip, page.limit).await)
}

async fn search_news(
  State(state): State<AppState>,
  Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
  let hits = state.board.search_news(&query.q).await;
  if hits.is_empty() {
    return Err(Error::NotFound("news"));
  }
  Ok(Json(hits))
}

async fn get_news(
  State(state): State<AppState>,
  Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.get_news(id).await?))
}

async fn update_news(
  State(state): State<AppState>,
  Path(id): Path<u64>,
  Json(patch): Json<NewsPatch>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.update_news(id, patch).await?))
}

async fn delete_news(
  State(state): State<AppState>,
  Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.delete_news(id).await?))
}

async fn vote_news(
  State(state): State<AppState>,
  Path(id): Path<u64>,
  Json(vote): Json<VoteBody>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.vote_news(id, vote.value).await?))
}

// --- community ---

async fn create_post(
  State(state): State<AppState>,
  Json(draft): Json<PostDraft>,
) -> impl IntoResponse {
  (StatusCode::CREATED, Json(state.board.create_post(draft).await))
}

async fn list_posts(
  State(state): State<AppState>,
  Query(page): Query<Pagination>,
) -> impl IntoResponse {
  Json(state.board.list_posts(page.skip, page.limit).await)
}

async fn get_post(
  State(state): State<AppState>,
  Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.get_post(id).await?))
}

async fn update_post(
  State(state): State<AppState>,
  Path(id): Path<u64>,
  Json(patch): Json<PostPatch>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.update_post(id, patch).await?))
}

async fn delete_post(
  State(state): State<AppState>,
  Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.delete_post(id).await?))
}

async fn like_post(
  State(state): State<AppState>,
  Path(id): Path<u64>,
  Json(like): Json<LikeBody>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.like_post(id, like.user_id).await?))
}

async fn add_comment(
  State(state): State<AppState>,
  Path(id): Path<u64>,
  Json(draft): Json<CommentDraft>,
) -> Result<impl IntoResponse> {
  Ok((
    StatusCode::CREATED,
    Json(state.board.add_comment(id, draft).await?),
  ))
}

async fn list_comments(
  State(state): State<AppState>,
  Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.list_comments(id).await?))
}

async fn delete_comment(
  State(state): State<AppState>,
  Path((id, comment_id)): Path<(u64, u64)>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.delete_comment(id, comment_id).await?))
}

async fn create_user(
  State(state): State<AppState>,
  Json(draft): Json<UserDraft>,
) -> Result<impl IntoResponse> {
  Ok((
    StatusCode::CREATED,
    Json(state.board.create_user(draft).await?),
  ))
}

async fn get_user(
  State(state): State<AppState>,
  Path(id): Path<u64>,
) -> Result<impl IntoResponse> {
  Ok(Json(state.board.get_user(id).await?))
}

// --- shutdown plumbing ---

async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
  // resolves when the flag flips or the sender goes away
  let _ = rx.changed().await;
}

fn spawn_signal_listener(tx: watch::Sender<bool>) {
  tokio::spawn(async move {
    wait_for_signal().await;
    info!("shutdown signal received");
    let _ = tx.send(true);
  });
}

#[cfg(unix)]
async fn wait_for_signal() {
  use tokio::signal::unix::{SignalKind, signal};

  let mut sigint =
    signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
  let mut sigterm =
    signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

  tokio::select! {
    _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
  };
}

#[cfg(not(unix))]
async fn wait_for_signal() {
  let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod test {
  use std::collections::HashMap;

  use http_body_util::BodyExt;
  use tower::ServiceExt as _; // for `oneshot`

  use super::*;
  use crate::test_utils::{StubScraper, announcement, temp_dir};

  fn test_state() -> AppState {
    let mut scrapers: ScraperRegistry = HashMap::new();
    scrapers.insert(
      Site::Seoul,
      Arc::new(StubScraper::constant(vec![announcement("A")])),
    );
    scrapers.insert(
      Site::Goyang,
      Arc::new(StubScraper::new([Err(Error::Parse("layout".into()))])),
    );

    AppState {
      scrapers: Arc::new(scrapers),
      cache: Arc::new(CacheStore::new(temp_dir("server-test")).unwrap()),
      cached_sites: Arc::new(HashSet::new()),
      board: Board::new(),
    }
  }

  async fn body_json(
    resp: axum::response::Response,
  ) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test]
  async fn announcements_endpoint_serves_the_scrape() {
    let app = router(test_state());
    let req = http::Request::builder()
      .uri("/announcements/seoul")
      .body(axum::body::Body::empty())
      .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body[0]["title"], "A");
    assert_eq!(body[0]["link"], "http://x/A");
    assert_eq!(body[0]["date"], "2024-01-01");
  }

  #[tokio::test]
  async fn unknown_site_is_404() {
    let app = router(test_state());
    let req = http::Request::builder()
      .uri("/announcements/busan")
      .body(axum::body::Body::empty())
      .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn scrape_failure_is_a_bad_gateway() {
    let app = router(test_state());
    let req = http::Request::builder()
      .uri("/announcements/goyang")
      .body(axum::body::Body::empty())
      .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
  }

  #[tokio::test]
  async fn news_create_then_vote_round_trips() {
    let state = test_state();
    let app = router(state.clone());

    let req = http::Request::builder()
      .method("POST")
      .uri("/news")
      .header("content-type", "application/json")
      .body(axum::body::Body::from(
        r#"{"title":"보조금 개편","source":"test","link":"http://x/n"}"#,
      ))
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    let id = created["id"].as_u64().unwrap();

    let req = http::Request::builder()
      .method("POST")
      .uri(format!("/news/{id}/vote"))
      .header("content-type", "application/json")
      .body(axum::body::Body::from(r#"{"value":1}"#))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let voted = body_json(resp).await;
    assert_eq!(voted["vote_count"], 1);
  }

  #[tokio::test]
  async fn news_update_accepts_a_single_field() {
    let state = test_state();
    let news = state
      .board
      .create_news(NewsDraft {
        title: "old".into(),
        source: "some outlet".into(),
        link: "http://x/n".into(),
      })
      .await;
    let app = router(state);

    let req = http::Request::builder()
      .method("PUT")
      .uri(format!("/news/{}", news.id))
      .header("content-type", "application/json")
      .body(axum::body::Body::from(r#"{"title":"new title"}"#))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["title"], "new title");
    assert_eq!(updated["source"], "some outlet");
  }

  #[tokio::test]
  async fn duplicate_like_maps_to_conflict() {
    let state = test_state();
    let post = state
      .board
      .create_post(PostDraft {
        title: "p".into(),
        content: "c".into(),
        user_id: None,
      })
      .await;
    let app = router(state);

    let like = || {
      http::Request::builder()
        .method("POST")
        .uri(format!("/community/{}/like", post.id))
        .header("content-type", "application/json")
        .body(axum::body::Body::from(r#"{"user_id":1}"#))
        .unwrap()
    };

    let resp = app.clone().oneshot(like()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.oneshot(like()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }
}
