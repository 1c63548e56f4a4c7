use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, Comment, Group, ListingType};

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Groups --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    pub owner_id: String,
}

/// `userId` is optional on the wire so a missing one is reported as a
/// bad request rather than a body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGroupResponse {
    pub message: String,
    /// False when the user already belonged to the group.
    pub joined: bool,
    pub members: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub group: Group,
    pub messages: Vec<ChatMessage>,
}

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub user: String,
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

// -- Posts --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub author: String,
    pub author_id: String,
    #[serde(default)]
    pub author_avatar: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostAction {
    Like,
    Comment,
}

impl PostAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(Self::Like),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }
}

/// Body of `PUT /posts/{id}`. Fields stay loosely typed so the handler
/// decides which combinations are invalid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentDraft>,
}

impl UpdatePostRequest {
    pub fn like(user_id: impl Into<String>) -> Self {
        Self {
            action: Some(PostAction::Like.as_str().to_string()),
            user_id: Some(user_id.into()),
            comment: None,
        }
    }

    pub fn comment(user_id: impl Into<String>, draft: CommentDraft) -> Self {
        Self {
            action: Some(PostAction::Comment.as_str().to_string()),
            user_id: Some(user_id.into()),
            comment: Some(draft),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDraft {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub message: String,
    pub liked: bool,
    pub likes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub message: String,
    pub comment: Comment,
}

// -- Listings --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub name: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    pub listing_type: ListingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_request_uses_wire_names() {
        let body = serde_json::to_value(UpdatePostRequest::like("u1")).unwrap();
        assert_eq!(body, serde_json::json!({ "action": "like", "userId": "u1" }));
    }

    #[test]
    fn update_request_tolerates_missing_fields() {
        let req: UpdatePostRequest = serde_json::from_str(r#"{"action":"like"}"#).unwrap();
        assert_eq!(req.action.as_deref(), Some("like"));
        assert!(req.user_id.is_none());
    }

    #[test]
    fn unknown_action_does_not_parse() {
        assert_eq!(PostAction::parse("like"), Some(PostAction::Like));
        assert_eq!(PostAction::parse("share"), None);
    }
}
