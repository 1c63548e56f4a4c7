use std::future::Future;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use petora_types::api::{
    CommentDraft, CommentResponse, CreateGroupRequest, CreateListingRequest, CreatePostRequest,
    ErrorResponse, GroupDetail, JoinGroupRequest, JoinGroupResponse, LikeResponse,
    SendMessageRequest, SendMessageResponse, UpdatePostRequest,
};
use petora_types::models::{Group, Listing, Post};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// The calls the views make. Implemented over HTTP by [`HttpApi`] and by
/// in-memory fakes in tests.
pub trait PetoraApi: Send + Sync + 'static {
    fn get_group(&self, id: Uuid) -> impl Future<Output = Result<GroupDetail, ClientError>> + Send;

    fn join_group(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> impl Future<Output = Result<JoinGroupResponse, ClientError>> + Send;

    fn send_message(
        &self,
        group_id: Uuid,
        req: &SendMessageRequest,
    ) -> impl Future<Output = Result<SendMessageResponse, ClientError>> + Send;

    fn get_post(&self, id: Uuid) -> impl Future<Output = Result<Post, ClientError>> + Send;

    fn like_post(
        &self,
        id: Uuid,
        user_id: &str,
    ) -> impl Future<Output = Result<LikeResponse, ClientError>> + Send;

    fn comment_post(
        &self,
        id: Uuid,
        user_id: &str,
        draft: &CommentDraft,
    ) -> impl Future<Output = Result<CommentResponse, ClientError>> + Send;

    fn get_listing(&self, id: Uuid) -> impl Future<Output = Result<Listing, ClientError>> + Send;
}

#[derive(Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // -- Creation and listing (not needed by the views) --

    pub async fn create_group(&self, req: &CreateGroupRequest) -> Result<Group, ClientError> {
        decode(self.client.post(self.url("/groups")).json(req).send().await?).await
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, ClientError> {
        decode(self.client.get(self.url("/groups")).send().await?).await
    }

    pub async fn create_post(&self, req: &CreatePostRequest) -> Result<Post, ClientError> {
        decode(self.client.post(self.url("/posts")).json(req).send().await?).await
    }

    /// One feed page, newest first.
    pub async fn list_posts(&self, limit: u32, before: Option<&str>) -> Result<Vec<Post>, ClientError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        decode(self.client.get(self.url("/posts")).query(&query).send().await?).await
    }

    pub async fn create_listing(&self, req: &CreateListingRequest) -> Result<Listing, ClientError> {
        decode(self.client.post(self.url("/pets")).json(req).send().await?).await
    }
}

impl PetoraApi for HttpApi {
    async fn get_group(&self, id: Uuid) -> Result<GroupDetail, ClientError> {
        decode(self.client.get(self.url(&format!("/groups/{}", id))).send().await?).await
    }

    async fn join_group(&self, id: Uuid, user_id: &str) -> Result<JoinGroupResponse, ClientError> {
        let body = JoinGroupRequest { user_id: Some(user_id.to_string()) };
        let resp = self
            .client
            .put(self.url(&format!("/groups/{}/join", id)))
            .json(&body)
            .send()
            .await?;
        decode(resp).await
    }

    async fn send_message(
        &self,
        group_id: Uuid,
        req: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ClientError> {
        let resp = self
            .client
            .post(self.url(&format!("/groups/{}/messages", group_id)))
            .json(req)
            .send()
            .await?;
        decode(resp).await
    }

    async fn get_post(&self, id: Uuid) -> Result<Post, ClientError> {
        decode(self.client.get(self.url(&format!("/posts/{}", id))).send().await?).await
    }

    async fn like_post(&self, id: Uuid, user_id: &str) -> Result<LikeResponse, ClientError> {
        let resp = self
            .client
            .put(self.url(&format!("/posts/{}", id)))
            .json(&UpdatePostRequest::like(user_id))
            .send()
            .await?;
        decode(resp).await
    }

    async fn comment_post(
        &self,
        id: Uuid,
        user_id: &str,
        draft: &CommentDraft,
    ) -> Result<CommentResponse, ClientError> {
        let resp = self
            .client
            .put(self.url(&format!("/posts/{}", id)))
            .json(&UpdatePostRequest::comment(user_id, draft.clone()))
            .send()
            .await?;
        decode(resp).await
    }

    async fn get_listing(&self, id: Uuid) -> Result<Listing, ClientError> {
        decode(self.client.get(self.url(&format!("/pets/{}", id))).send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound);
    }
    if !status.is_success() {
        let message = match resp.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
        };
        debug!("Request failed with {}: {}", status, message);
        return Err(ClientError::Status { status: status.as_u16(), message });
    }

    resp.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e)
        }
    })
}
