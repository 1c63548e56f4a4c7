use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timestamp;

/// A community group. `members` is always the size of `member_ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub members: usize,
    pub member_ids: Vec<String>,
    pub owner_id: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == user_id)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}

/// A group chat message. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user: String,
    pub user_id: String,
    pub message: String,
    pub avatar: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub author: String,
    pub author_id: String,
    pub author_avatar: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|l| l == user_id)
    }
}

/// Comment ids are `c<epoch millis>` and are not guaranteed unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub author_id: String,
    pub avatar: String,
    pub comment: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn id_for(created_at: &DateTime<Utc>) -> String {
        format!("c{}", created_at.timestamp_millis())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingType {
    Sale,
    Adoption,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "Sale",
            Self::Adoption => "Adoption",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Sale" => Some(Self::Sale),
            "Adoption" => Some(Self::Adoption),
            _ => None,
        }
    }
}

/// A pet offered for sale or adoption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub name: String,
    pub breed: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    pub listing_type: ListingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}
