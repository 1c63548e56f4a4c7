use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use petora_db::models::MessageRow;
use petora_types::api::{SendMessageRequest, SendMessageResponse};
use petora_types::timestamp;

use crate::error::{ApiError, parse_id};
use crate::{AppState, run_db};

/// POST /groups/{id}/messages
///
/// Neither the group's existence nor the sender's membership is checked;
/// the message is stored as given.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let group_id = parse_id(&id, "group")?;
    let Json(req) = body?;

    let message_id = Uuid::new_v4();
    let row = MessageRow {
        id: message_id.to_string(),
        group_id: group_id.to_string(),
        user_name: req.user,
        user_id: req.user_id,
        body: req.message,
        avatar: req.avatar,
        created_at: timestamp::format(&timestamp::now()),
    };

    run_db(&state, move |db| db.insert_message(&row)).await?;
    debug!("Message {} stored in group {}", message_id, group_id);

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            acknowledged: true,
            inserted_id: message_id,
        }),
    ))
}
