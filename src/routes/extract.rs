use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the secret handed out when a player enters a match.
pub const PLAYER_TOKEN_HEADER: &str = "x-player-token";

/// Player token taken from the `X-Player-Token` header.
#[derive(Debug, Clone)]
pub struct PlayerToken(pub String);

impl<S> FromRequestParts<S> for PlayerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(PLAYER_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| PlayerToken(value.to_owned()))
            .ok_or_else(|| {
                AppError::Unauthorized("missing player token header `X-Player-Token`".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<PlayerToken, AppError> {
        let (mut parts, ()) = request.into_parts();
        PlayerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_the_trimmed_header() {
        let request = Request::builder()
            .header("X-Player-Token", " abc ")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap().0, "abc");
    }

    #[tokio::test]
    async fn missing_or_blank_header_is_unauthorized() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(extract(request).await, Err(AppError::Unauthorized(_))));

        let request = Request::builder()
            .header("X-Player-Token", "   ")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(AppError::Unauthorized(_))));
    }
}
