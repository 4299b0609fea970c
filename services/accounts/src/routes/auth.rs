//! Authentication routes: registration, login and password management

use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime};
use tracing::info;

use crate::{
    error::AccountResult,
    middleware::{CurrentAccount, SESSION_COOKIE, auth_middleware},
    models::{
        AccountResponse, ForgotPassword, LoginCredentials, NewAccount, ResetPassword,
        UpdateDetails, UpdatePassword,
    },
    service::SessionGrant,
    state::AppState,
};

/// Routes mounted under `/auth`
pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/updatedetails", put(update_details))
        .route("/updatepassword", put(update_password))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/forgotpassword", post(forgot_password))
        .route("/resetpassword/:token", put(reset_password))
        .merge(protected)
}

/// Session cookie carrying `value` until `expires`
fn session_cookie(value: String, expires: OffsetDateTime, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .expires(expires)
        .http_only(true)
        .secure(secure)
        .path("/")
        .build()
}

/// Token in the body and in an HttpOnly cookie
fn token_response(
    state: &AppState,
    jar: CookieJar,
    grant: SessionGrant,
) -> (CookieJar, Json<Value>) {
    let expires = OffsetDateTime::now_utc() + Duration::days(state.config.cookie_expire_days);
    let cookie = session_cookie(grant.token.clone(), expires, state.config.is_production());

    (
        jar.add(cookie),
        Json(json!({
            "success": true,
            "token": grant.token,
            "role": grant.role,
        })),
    )
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<NewAccount>,
) -> AccountResult<impl IntoResponse> {
    let grant = state.service.register(payload).await?;
    Ok(token_response(&state, jar, grant))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<LoginCredentials>,
) -> AccountResult<impl IntoResponse> {
    let grant = state.service.login(credentials).await?;
    Ok(token_response(&state, jar, grant))
}

/// Overwrite the session cookie with a short-lived placeholder
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let expires = OffsetDateTime::now_utc() + Duration::seconds(10);
    let cookie = session_cookie("none".to_string(), expires, state.config.is_production());
    info!("Session cookie cleared");

    (
        jar.add(cookie),
        Json(json!({ "success": true, "data": {} })),
    )
}

pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
) -> AccountResult<impl IntoResponse> {
    let account = state.service.me(current.id).await?;
    Ok(Json(json!({
        "success": true,
        "data": AccountResponse::from(&account),
    })))
}

pub async fn update_details(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    Json(payload): Json<UpdateDetails>,
) -> AccountResult<impl IntoResponse> {
    let account = state.service.update_details(current.id, payload).await?;
    Ok(Json(json!({
        "success": true,
        "data": AccountResponse::from(&account),
    })))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentAccount>,
    jar: CookieJar,
    Json(payload): Json<UpdatePassword>,
) -> AccountResult<impl IntoResponse> {
    let grant = state.service.update_password(current.id, payload).await?;
    Ok(token_response(&state, jar, grant))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPassword>,
) -> AccountResult<impl IntoResponse> {
    state.service.forgot_password(payload).await?;
    Ok(Json(json!({ "success": true, "data": "Email sent" })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    jar: CookieJar,
    Json(payload): Json<ResetPassword>,
) -> AccountResult<impl IntoResponse> {
    let grant = state.service.reset_password(&token, payload).await?;
    Ok(token_response(&state, jar, grant))
}
