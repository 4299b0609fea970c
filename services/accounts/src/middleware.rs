//! Middleware for session token validation and role checks

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    extract::cookie::CookieJar,
    headers::{Authorization, authorization::Bearer},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{AccountError, AccountResult},
    models::Role,
    state::AppState,
};

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "token";

/// Authenticated caller, stored in request extensions
#[derive(Debug, Clone, Copy)]
pub struct CurrentAccount {
    pub id: Uuid,
    pub role: Role,
}

/// Session token from the `token` cookie, if any
fn token_from_cookie(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        // Logout overwrites the cookie with this placeholder
        .filter(|value| !value.is_empty() && value != "none")
}

/// Resolve the session token from the Authorization header or the cookie
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> AccountResult<Response> {
    let token = match bearer {
        Some(TypedHeader(Authorization(bearer))) => bearer.token().to_string(),
        None => token_from_cookie(&jar).ok_or(AccountError::Authentication)?,
    };

    let claims = state.credentials.validate_session_token(&token)?;

    // The account may have been deleted since the token was issued
    let Some(account) = state.repository.find_by_id(claims.sub).await? else {
        warn!("Session token for unknown account {}", claims.sub);
        return Err(AccountError::Authentication);
    };

    req.extensions_mut().insert(CurrentAccount {
        id: account.id,
        role: account.role,
    });

    Ok(next.run(req).await)
}

/// Reject callers that are neither `admin` nor `superAdmin`
///
/// Must be layered inside [`auth_middleware`].
pub async fn require_admin(req: Request<Body>, next: Next) -> AccountResult<Response> {
    let current = req
        .extensions()
        .get::<CurrentAccount>()
        .copied()
        .ok_or(AccountError::Authentication)?;

    if !current.role.is_admin() {
        warn!("Account {} denied access to admin route", current.id);
        return Err(AccountError::Forbidden);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, header};

    fn jar_with_cookie(cookie: &'static str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(cookie));
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_token_from_cookie() {
        let jar = jar_with_cookie("theme=dark; token=abc.def.ghi");
        assert_eq!(token_from_cookie(&jar).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_logged_out_cookie_is_ignored() {
        let jar = jar_with_cookie("token=none");
        assert!(token_from_cookie(&jar).is_none());
    }

    #[test]
    fn test_missing_cookie() {
        assert!(token_from_cookie(&CookieJar::new()).is_none());
        assert!(token_from_cookie(&jar_with_cookie("tokenized=abc")).is_none());
    }
}
