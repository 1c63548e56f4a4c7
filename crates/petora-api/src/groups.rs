use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use petora_db::models::GroupRow;
use petora_types::api::{CreateGroupRequest, GroupDetail, JoinGroupRequest, JoinGroupResponse};
use petora_types::models::Group;
use petora_types::timestamp;

use crate::error::{ApiError, parse_id, required};
use crate::{AppState, convert, run_db};

pub async fn create_group(
    State(state): State<AppState>,
    body: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let name = required(Some(req.name.as_str()), "Group name")?.to_string();
    let owner_id = required(Some(req.owner_id.as_str()), "Owner ID")?.to_string();

    let row = GroupRow {
        id: Uuid::new_v4().to_string(),
        name,
        description: req.description,
        image_url: req.image_url,
        owner_id: owner_id.clone(),
        created_at: timestamp::format(&timestamp::now()),
        member_ids: vec![owner_id],
    };

    let row = run_db(&state, move |db| {
        db.create_group(&row)?;
        Ok(row)
    })
    .await?;

    info!("Group {} created by {}", row.id, row.owner_id);
    Ok((StatusCode::CREATED, Json(convert::group(row)?)))
}

pub async fn list_groups(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, |db| db.list_groups()).await?;
    let groups = rows
        .into_iter()
        .map(convert::group)
        .collect::<anyhow::Result<Vec<Group>>>()?;
    Ok(Json(groups))
}

/// GET /groups/{id}: the group plus its whole chat history, oldest first.
pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let group_id = parse_id(&id, "group")?.to_string();

    let (group, messages) = run_db(&state, move |db| {
        let Some(group) = db.get_group(&group_id)? else {
            return Ok(None);
        };
        let messages = db.get_group_messages(&group_id)?;
        Ok(Some((group, messages)))
    })
    .await?
    .ok_or(ApiError::NotFound("Group"))?;

    let detail = GroupDetail {
        group: convert::group(group)?,
        messages: messages
            .into_iter()
            .map(convert::message)
            .collect::<anyhow::Result<_>>()?,
    };
    Ok(Json(detail))
}

/// PUT /groups/{id}/join: idempotent; the member count is the set size.
pub async fn join_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<JoinGroupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let group_id = parse_id(&id, "group")?.to_string();
    let Json(req) = body?;
    let user_id = required(req.user_id.as_deref(), "User ID")?.to_string();

    let joined_at = timestamp::format(&timestamp::now());
    let gid = group_id.clone();
    let uid = user_id.clone();
    let outcome = run_db(&state, move |db| db.join_group(&gid, &uid, &joined_at))
        .await?
        .ok_or(ApiError::NotFound("Group"))?;

    let message = if outcome.joined {
        info!("User {} joined group {} ({} members)", user_id, group_id, outcome.members);
        "Successfully joined group"
    } else {
        "Already a member of this group"
    };

    Ok(Json(JoinGroupResponse {
        message: message.to_string(),
        joined: outcome.joined,
        members: outcome.members,
    }))
}
