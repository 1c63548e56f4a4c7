use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use petora_db::models::{CommentRow, PostRow};
use petora_types::api::{CommentResponse, CreatePostRequest, LikeResponse, PostAction, UpdatePostRequest};
use petora_types::models::{Comment, Post};
use petora_types::timestamp;

use crate::error::{ApiError, parse_id, required};
use crate::{AppState, convert, run_db};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: the `createdAt` of the oldest post on the
    /// previous page.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

pub async fn create_post(
    State(state): State<AppState>,
    body: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let author_id = required(Some(req.author_id.as_str()), "Author ID")?.to_string();
    let content = required(Some(req.content.as_str()), "Content")?.to_string();

    let row = PostRow {
        id: Uuid::new_v4().to_string(),
        author: req.author,
        author_id,
        author_avatar: req.author_avatar,
        content,
        image_url: req.image_url.filter(|u| !u.trim().is_empty()),
        created_at: timestamp::format(&timestamp::now()),
        likes: Vec::new(),
        comments: Vec::new(),
    };

    let row = run_db(&state, move |db| {
        db.create_post(&row)?;
        Ok(row)
    })
    .await?;

    info!("Post {} created by {}", row.id, row.author_id);
    Ok((StatusCode::CREATED, Json(convert::post(row)?)))
}

/// GET /posts: newest first.
pub async fn list_posts(
    State(state): State<AppState>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.clamp(1, 200);
    // Normalize the cursor so it compares against stored text correctly.
    let before = query
        .before
        .as_deref()
        .map(|raw| {
            timestamp::parse(raw)
                .map(|ts| timestamp::format(&ts))
                .map_err(|_| ApiError::InvalidRequest("Invalid before cursor".into()))
        })
        .transpose()?;

    let rows = run_db(&state, move |db| db.list_posts(limit, before.as_deref())).await?;
    let posts = rows
        .into_iter()
        .map(convert::post)
        .collect::<anyhow::Result<Vec<Post>>>()?;
    Ok(Json(posts))
}

/// GET /posts/{id}: normalized projection; likes and comments default to empty.
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let post_id = parse_id(&id, "post")?.to_string();

    let row = run_db(&state, move |db| db.get_post(&post_id))
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    Ok(Json(convert::post(row)?))
}

/// PUT /posts/{id}: `like` toggles the caller's like, `comment` appends.
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let post_id = parse_id(&id, "post")?.to_string();
    let Json(req) = body?;

    let (Some(action), Some(user_id)) = (
        req.action.as_deref().filter(|a| !a.is_empty()),
        req.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty()),
    ) else {
        return Err(ApiError::InvalidRequest("Missing required fields".into()));
    };
    let user_id = user_id.to_string();

    match PostAction::parse(action) {
        Some(PostAction::Like) => toggle_like(&state, post_id, user_id).await,
        Some(PostAction::Comment) => {
            let draft = req.comment.unwrap_or_default();
            let text = required(Some(draft.text.as_str()), "Comment text")?.to_string();
            let created_at = timestamp::now();
            let row = CommentRow {
                comment_id: Comment::id_for(&created_at),
                post_id,
                author: draft.author,
                author_id: user_id,
                avatar: draft.avatar,
                body: text,
                created_at: timestamp::format(&created_at),
            };
            add_comment(&state, row).await
        }
        None => Err(ApiError::InvalidRequest("Invalid action".into())),
    }
}

async fn toggle_like(state: &AppState, post_id: String, user_id: String) -> Result<Response, ApiError> {
    let at = timestamp::format(&timestamp::now());
    let outcome = run_db(state, move |db| db.toggle_like(&post_id, &user_id, &at))
        .await?
        .ok_or(ApiError::NotFound("Post"))?;

    let message = if outcome.liked { "Post liked" } else { "Like removed" };
    Ok(Json(LikeResponse {
        message: message.to_string(),
        liked: outcome.liked,
        likes: outcome.likes,
    })
    .into_response())
}

async fn add_comment(state: &AppState, row: CommentRow) -> Result<Response, ApiError> {
    let (found, row) = run_db(state, move |db| {
        let found = db.add_comment(&row)?;
        Ok((found, row))
    })
    .await?;
    if !found {
        return Err(ApiError::NotFound("Post"));
    }

    Ok(Json(CommentResponse {
        message: "Comment added".to_string(),
        comment: convert::comment(row)?,
    })
    .into_response())
}
