//! News feed and community board persistence.
//!
//! Process-local store behind a single RwLock. Durability beyond the
//! process is a non-goal here; what this layer owns is the transaction
//! semantics the handlers rely on: vote adjustments are applied to the
//! aggregate atomically, a (post, liker) pair can like a post once,
//! and deleting a post cascades to its comments and likes.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::util::{Error, Result};

lazy_static! {
  // all board timestamps are pinned to KST
  static ref KST: FixedOffset = FixedOffset::east_opt(9 * 3600).unwrap();
}

fn kst_now() -> DateTime<FixedOffset> {
  Utc::now().with_timezone(&*KST)
}

#[derive(Serialize, Clone, Debug)]
pub struct News {
  pub id: u64,
  pub title: String,
  pub source: String,
  pub link: String,
  pub published_at: DateTime<FixedOffset>,
  pub vote_count: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct NewsDraft {
  pub title: String,
  pub source: String,
  pub link: String,
}

/// Absent fields are left as they were.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct NewsPatch {
  pub title: Option<String>,
  pub source: Option<String>,
  pub link: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct CommunityPost {
  pub id: u64,
  pub title: String,
  pub content: String,
  pub user_id: Option<u64>,
  pub created_at: DateTime<FixedOffset>,
  pub updated_at: DateTime<FixedOffset>,
  pub like_count: u64,
  pub comment_count: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PostDraft {
  pub title: String,
  pub content: String,
  #[serde(default)]
  pub user_id: Option<u64>,
}

/// Absent fields are left as they were.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct PostPatch {
  pub title: Option<String>,
  pub content: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct Comment {
  pub id: u64,
  pub post_id: u64,
  pub content: String,
  pub author: Option<String>,
  pub created_at: DateTime<FixedOffset>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct CommentDraft {
  pub content: String,
  #[serde(default)]
  pub author: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct User {
  pub id: u64,
  pub username: String,
  pub email: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct UserDraft {
  pub username: String,
  pub email: String,
}

#[derive(Clone, Default)]
pub struct Board {
  inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
  next_id: u64,
  news: BTreeMap<u64, News>,
  posts: BTreeMap<u64, CommunityPost>,
  comments: BTreeMap<u64, Comment>,
  post_likes: HashSet<(u64, u64)>,
  users: BTreeMap<u64, User>,
  usernames: HashMap<String, u64>,
}

impl Inner {
  fn next_id(&mut self) -> u64 {
    self.next_id += 1;
    self.next_id
  }
}

impl Board {
  pub fn new() -> Self {
    Self::default()
  }

  // --- news ---

  pub async fn create_news(&self, draft: NewsDraft) -> News {
    let mut inner = self.inner.write().await;
    let id = inner.next_id();
    let news = News {
      id,
      title: draft.title,
      source: draft.source,
      link: draft.link,
      published_at: kst_now(),
      vote_count: 0,
    };
    inner.news.insert(id, news.clone());
    news
  }

  /// Newest first. Ids are monotonic, so reverse id order is reverse
  /// creation order.
  pub async fn list_news(&self, skip: usize, limit: usize) -> Vec<News> {
    let inner = self.inner.read().await;
    inner
      .news
      .values()
      .rev()
      .skip(skip)
      .take(limit)
      .cloned()
      .collect()
  }

  pub async fn get_news(&self, id: u64) -> Result<News> {
    let inner = self.inner.read().await;
    inner.news.get(&id).cloned().ok_or(Error::NotFound("news"))
  }

  /// Only the fields present in the patch change.
  pub async fn update_news(&self, id: u64, patch: NewsPatch) -> Result<News> {
    let mut inner = self.inner.write().await;
    let news = inner.news.get_mut(&id).ok_or(Error::NotFound("news"))?;
    if let Some(title) = patch.title {
      news.title = title;
    }
    if let Some(source) = patch.source {
      news.source = source;
    }
    if let Some(link) = patch.link {
      news.link = link;
    }
    Ok(news.clone())
  }

  pub async fn delete_news(&self, id: u64) -> Result<News> {
    let mut inner = self.inner.write().await;
    inner.news.remove(&id).ok_or(Error::NotFound("news"))
  }

  /// Apply a vote (+1/-1, or any weight) to the aggregate and return
  /// the updated item.
  pub async fn vote_news(&self, id: u64, value: i64) -> Result<News> {
    let mut inner = self.inner.write().await;
    let news = inner.news.get_mut(&id).ok_or(Error::NotFound("news"))?;
    news.vote_count += value;
    Ok(news.clone())
  }

  pub async fn search_news(&self, query: &str) -> Vec<News> {
    let inner = self.inner.read().await;
    inner
      .news
      .values()
      .rev()
      .filter(|n| n.title.contains(query))
      .take(10)
      .cloned()
      .collect()
  }

  // --- community posts ---

  pub async fn create_post(&self, draft: PostDraft) -> CommunityPost {
    let mut inner = self.inner.write().await;
    let id = inner.next_id();
    let now = kst_now();
    let post = CommunityPost {
      id,
      title: draft.title,
      content: draft.content,
      user_id: draft.user_id,
      created_at: now,
      updated_at: now,
      like_count: 0,
      comment_count: 0,
    };
    inner.posts.insert(id, post.clone());
    post
  }

  pub async fn list_posts(
    &self,
    skip: usize,
    limit: usize,
  ) -> Vec<CommunityPost> {
    let inner = self.inner.read().await;
    inner
      .posts
      .values()
      .rev()
      .skip(skip)
      .take(limit)
      .cloned()
      .collect()
  }

  pub async fn get_post(&self, id: u64) -> Result<CommunityPost> {
    let inner = self.inner.read().await;
    inner.posts.get(&id).cloned().ok_or(Error::NotFound("post"))
  }

  /// Only the fields present in the patch change. Any update bumps
  /// `updated_at`.
  pub async fn update_post(
    &self,
    id: u64,
    patch: PostPatch,
  ) -> Result<CommunityPost> {
    let mut inner = self.inner.write().await;
    let post = inner.posts.get_mut(&id).ok_or(Error::NotFound("post"))?;
    if let Some(title) = patch.title {
      post.title = title;
    }
    if let Some(content) = patch.content {
      post.content = content;
    }
    post.updated_at = kst_now();
    Ok(post.clone())
  }

  /// Delete a post and cascade to its comments and likes.
  pub async fn delete_post(&self, id: u64) -> Result<CommunityPost> {
    let mut inner = self.inner.write().await;
    let post = inner.posts.remove(&id).ok_or(Error::NotFound("post"))?;
    inner.comments.retain(|_, c| c.post_id != id);
    inner.post_likes.retain(|(post_id, _)| *post_id != id);
    Ok(post)
  }

  /// One like per (post, liker). Returns the updated post, or
  /// `Duplicate` if this user already liked it.
  pub async fn like_post(
    &self,
    post_id: u64,
    user_id: u64,
  ) -> Result<CommunityPost> {
    let mut guard = self.inner.write().await;
    let inner = &mut *guard;
    let Some(post) = inner.posts.get_mut(&post_id) else {
      return Err(Error::NotFound("post"));
    };
    if !inner.post_likes.insert((post_id, user_id)) {
      return Err(Error::Duplicate("like"));
    }
    post.like_count += 1;
    Ok(post.clone())
  }

  // --- comments ---

  pub async fn add_comment(
    &self,
    post_id: u64,
    draft: CommentDraft,
  ) -> Result<Comment> {
    let mut inner = self.inner.write().await;
    if !inner.posts.contains_key(&post_id) {
      return Err(Error::NotFound("post"));
    }
    let id = inner.next_id();
    let comment = Comment {
      id,
      post_id,
      content: draft.content,
      author: draft.author,
      created_at: kst_now(),
    };
    inner.comments.insert(id, comment.clone());
    if let Some(post) = inner.posts.get_mut(&post_id) {
      post.comment_count += 1;
    }
    Ok(comment)
  }

  /// Comments in creation order.
  pub async fn list_comments(&self, post_id: u64) -> Result<Vec<Comment>> {
    let inner = self.inner.read().await;
    if !inner.posts.contains_key(&post_id) {
      return Err(Error::NotFound("post"));
    }
    Ok(
      inner
        .comments
        .values()
        .filter(|c| c.post_id == post_id)
        .cloned()
        .collect(),
    )
  }

  pub async fn delete_comment(
    &self,
    post_id: u64,
    comment_id: u64,
  ) -> Result<Comment> {
    let mut inner = self.inner.write().await;
    match inner.comments.get(&comment_id) {
      Some(c) if c.post_id == post_id => {}
      _ => return Err(Error::NotFound("comment")),
    }
    let Some(comment) = inner.comments.remove(&comment_id) else {
      return Err(Error::NotFound("comment"));
    };
    if let Some(post) = inner.posts.get_mut(&post_id) {
      post.comment_count = post.comment_count.saturating_sub(1);
    }
    Ok(comment)
  }

  // --- users ---

  pub async fn create_user(&self, draft: UserDraft) -> Result<User> {
    let mut inner = self.inner.write().await;
    if inner.usernames.contains_key(&draft.username) {
      return Err(Error::Duplicate("username"));
    }
    let id = inner.next_id();
    let user = User {
      id,
      username: draft.username.clone(),
      email: draft.email,
    };
    inner.usernames.insert(draft.username, id);
    inner.users.insert(id, user.clone());
    Ok(user)
  }

  pub async fn get_user(&self, id: u64) -> Result<User> {
    let inner = self.inner.read().await;
    inner.users.get(&id).cloned().ok_or(Error::NotFound("user"))
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn news_draft(title: &str) -> NewsDraft {
    NewsDraft {
      title: title.to_owned(),
      source: "test".to_owned(),
      link: "http://x/1".to_owned(),
    }
  }

  fn post_draft(title: &str) -> PostDraft {
    PostDraft {
      title: title.to_owned(),
      content: "body".to_owned(),
      user_id: None,
    }
  }

  #[tokio::test]
  async fn votes_accumulate_on_the_aggregate() {
    let board = Board::new();
    let news = board.create_news(news_draft("A")).await;

    board.vote_news(news.id, 1).await.unwrap();
    board.vote_news(news.id, 1).await.unwrap();
    let after = board.vote_news(news.id, -1).await.unwrap();

    assert_eq!(after.vote_count, 1);
  }

  #[tokio::test]
  async fn voting_on_missing_news_is_not_found() {
    let board = Board::new();
    let err = board.vote_news(999, 1).await.unwrap_err();
    assert!(matches!(err, Error::NotFound("news")));
  }

  #[tokio::test]
  async fn news_listing_is_newest_first_with_pagination() {
    let board = Board::new();
    for title in ["one", "two", "three"] {
      board.create_news(news_draft(title)).await;
    }

    let page = board.list_news(0, 2).await;
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].title, "three");
    assert_eq!(page[1].title, "two");

    let rest = board.list_news(2, 2).await;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].title, "one");
  }

  #[tokio::test]
  async fn news_update_only_touches_present_fields() {
    let board = Board::new();
    let news = board.create_news(news_draft("old title")).await;

    let patch = NewsPatch {
      title: Some("new title".to_owned()),
      ..Default::default()
    };
    let updated = board.update_news(news.id, patch).await.unwrap();

    assert_eq!(updated.title, "new title");
    assert_eq!(updated.source, news.source);
    assert_eq!(updated.link, news.link);
  }

  #[tokio::test]
  async fn post_update_only_touches_present_fields() {
    let board = Board::new();
    let post = board.create_post(post_draft("P")).await;

    let patch = PostPatch {
      content: Some("edited".to_owned()),
      ..Default::default()
    };
    let updated = board.update_post(post.id, patch).await.unwrap();

    assert_eq!(updated.title, "P");
    assert_eq!(updated.content, "edited");
  }

  #[tokio::test]
  async fn search_matches_title_substring() {
    let board = Board::new();
    board.create_news(news_draft("전기차 보조금 확대")).await;
    board.create_news(news_draft("수소차 충전소")).await;

    let hits = board.search_news("전기차").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "전기차 보조금 확대");
  }

  #[tokio::test]
  async fn second_like_from_same_user_is_a_duplicate() {
    let board = Board::new();
    let post = board.create_post(post_draft("P")).await;

    let liked = board.like_post(post.id, 7).await.unwrap();
    assert_eq!(liked.like_count, 1);

    let err = board.like_post(post.id, 7).await.unwrap_err();
    assert!(matches!(err, Error::Duplicate("like")));

    // a different user still counts
    let liked = board.like_post(post.id, 8).await.unwrap();
    assert_eq!(liked.like_count, 2);
  }

  #[tokio::test]
  async fn deleting_a_post_cascades_to_comments_and_likes() {
    let board = Board::new();
    let post = board.create_post(post_draft("P")).await;
    board
      .add_comment(
        post.id,
        CommentDraft {
          content: "c1".into(),
          author: None,
        },
      )
      .await
      .unwrap();
    board.like_post(post.id, 1).await.unwrap();

    board.delete_post(post.id).await.unwrap();

    assert!(matches!(
      board.list_comments(post.id).await.unwrap_err(),
      Error::NotFound("post")
    ));

    // recreating a post never resurrects old likes
    let fresh = board.create_post(post_draft("Q")).await;
    assert_eq!(fresh.like_count, 0);
  }

  #[tokio::test]
  async fn comments_come_back_in_creation_order() {
    let board = Board::new();
    let post = board.create_post(post_draft("P")).await;
    for content in ["first", "second"] {
      board
        .add_comment(
          post.id,
          CommentDraft {
            content: content.into(),
            author: Some("u".into()),
          },
        )
        .await
        .unwrap();
    }

    let comments = board.list_comments(post.id).await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].content, "first");
    assert_eq!(comments[1].content, "second");
  }

  #[tokio::test]
  async fn duplicate_username_is_rejected() {
    let board = Board::new();
    let draft = UserDraft {
      username: "ev_fan".into(),
      email: "a@b.c".into(),
    };
    board.create_user(draft.clone()).await.unwrap();
    let err = board.create_user(draft).await.unwrap_err();
    assert!(matches!(err, Error::Duplicate("username")));
  }
}
