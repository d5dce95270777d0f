use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
    response::Response,
};

use crate::auth::{self, Principal};
use crate::storage::Storage;

use super::{handlers::error_response, AppState};

pub const SESSION_COOKIE: &str = "sessionid";

/// Session token from the `sessionid` cookie, falling back to a bearer token.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
    })
    .filter(|token| !token.is_empty())
}

pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, token
    )
}

pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Raw session token, for handlers that tear the session down.
pub struct SessionToken(pub Option<String>);

#[axum::async_trait]
impl<St: Send + Sync> FromRequestParts<St> for SessionToken {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(session_token(&parts.headers)))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<AppState<S>> for Principal
where
    S: Storage + Clone + Send + Sync + 'static,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers);
        auth::current_principal(&state.storage, token.as_deref()).map_err(error_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_is_read_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; sessionid=abc123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn bearer_header_is_a_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(session_token(&headers).as_deref(), Some("tok"));

        headers.insert(COOKIE, HeaderValue::from_static("sessionid=cookie"));
        assert_eq!(session_token(&headers).as_deref(), Some("cookie"));
    }

    #[test]
    fn empty_or_missing_token_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("sessionid="));
        assert_eq!(session_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn cookies_are_http_only() {
        assert_eq!(
            session_cookie("t"),
            "sessionid=t; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(expired_session_cookie().ends_with("Max-Age=0"));
    }
}
