use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use petora_db::models::ListingRow;
use petora_types::api::CreateListingRequest;
use petora_types::timestamp;

use crate::error::{ApiError, parse_id, required};
use crate::{AppState, convert, run_db};

pub async fn create_listing(
    State(state): State<AppState>,
    body: Result<Json<CreateListingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body?;
    let name = required(Some(req.name.as_str()), "Pet name")?.to_string();
    let price = req
        .price
        .map(i64::try_from)
        .transpose()
        .map_err(|_| ApiError::InvalidRequest("Price out of range".into()))?;

    let row = ListingRow {
        id: Uuid::new_v4().to_string(),
        name,
        breed: req.breed,
        image_url: req.image_url,
        price,
        listing_type: req.listing_type.as_str().to_string(),
        owner_name: req.owner_name,
        owner_email: req.owner_email,
        created_at: timestamp::format(&timestamp::now()),
    };

    let row = run_db(&state, move |db| {
        db.create_listing(&row)?;
        Ok(row)
    })
    .await?;

    info!("Listing {} created ({})", row.id, row.listing_type);
    Ok((StatusCode::CREATED, Json(convert::listing(row)?)))
}

/// GET /pets/{id}: what the checkout view reads.
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let listing_id = parse_id(&id, "pet")?.to_string();

    let row = run_db(&state, move |db| db.get_listing(&listing_id))
        .await?
        .ok_or(ApiError::NotFound("Pet"))?;

    Ok(Json(convert::listing(row)?))
}
