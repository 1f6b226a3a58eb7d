use serde::{Deserialize, Serialize};

/// One row of a municipal notice board. The date stays in whatever
/// format the source publishes; no normalization happens at this layer.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Announcement {
  pub title: String,
  pub link: String,
  pub date: String,
}
