//! Administrative account management, restricted to `admin` and `superAdmin`

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AccountError, AccountResult},
    middleware::{auth_middleware, require_admin},
    models::{AccountResponse, NewAccount, UpdateAccount},
    state::AppState,
    uploads::PhotoUpload,
};

/// Room for multipart boundaries and part headers around the photo itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Routes mounted under `/users`
pub fn router(state: AppState) -> Router<AppState> {
    let photo_limit = state.config.max_file_upload + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route(
            "/:id/photo",
            put(upload_photo).layer(DefaultBodyLimit::max(photo_limit)),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Malformed ids are reported like unknown ones
fn parse_id(raw: &str) -> AccountResult<Uuid> {
    raw.parse()
        .map_err(|_| AccountError::NotFound(format!("User not found with id of {}", raw)))
}

pub async fn list_users(State(state): State<AppState>) -> AccountResult<impl IntoResponse> {
    let accounts = state.service.list_accounts().await?;
    let data: Vec<AccountResponse> = accounts.iter().map(AccountResponse::from).collect();

    Ok(Json(json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewAccount>,
) -> AccountResult<impl IntoResponse> {
    let account = state.service.create_account(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": AccountResponse::from(&account),
        })),
    ))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AccountResult<impl IntoResponse> {
    let account = state.service.get_account(parse_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "data": AccountResponse::from(&account),
    })))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAccount>,
) -> AccountResult<impl IntoResponse> {
    let account = state.service.update_account(parse_id(&id)?, payload).await?;
    Ok(Json(json!({
        "success": true,
        "data": AccountResponse::from(&account),
    })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AccountResult<impl IntoResponse> {
    state.service.delete_account(parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": {} })))
}

/// Accepts a multipart body with the image in a `photo` field
pub async fn upload_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AccountResult<impl IntoResponse> {
    let id = parse_id(&id)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AccountError::Validation(e.body_text()))?
    {
        if field.name() != Some("photo") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AccountError::Validation(e.body_text()))?;

        upload = Some(PhotoUpload {
            file_name,
            content_type,
            data,
        });
        break;
    }

    let stored_name = state.service.upload_photo(id, upload).await?;
    Ok(Json(json!({ "success": true, "data": stored_name })))
}
