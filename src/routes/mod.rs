use axum::Router;

use crate::state::SharedState;

pub mod creator;
pub mod docs;
pub mod extract;
pub mod health;
pub mod matches;
pub mod sse;
pub mod timeline;

/// The whole HTTP surface: REST, SSE and the Swagger UI, bound to `state`.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sse::router())
        .merge(matches::router())
        .merge(creator::router())
        .merge(timeline::router())
        .merge(docs::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::match_store::memory::InMemoryMatchStore,
        services::catalog_service,
        state::AppState,
    };

    async fn app() -> Router<()> {
        let config = AppConfig::default();
        let store = InMemoryMatchStore::new();
        catalog_service::seed(&store, &config).await.unwrap();
        let state = AppState::new(config);
        state.set_match_store(Arc::new(store)).await;
        router(state)
    }

    async fn send(app: &Router<()>, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri).header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("x-player-token", token);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn lobby_flow_over_http() {
        let app = app().await;

        let (status, created) = send(
            &app,
            post_json("/matches", None, json!({ "creator_name": "Ana" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let code = created["match"]["code"].as_str().unwrap().to_owned();
        let creator_token = created["token"].as_str().unwrap().to_owned();

        let (status, joined) = send(
            &app,
            post_json(&format!("/matches/{code}/join"), None, json!({ "name": "Ben" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let guest_token = joined["token"].as_str().unwrap().to_owned();

        let (status, _) = send(
            &app,
            post_json(&format!("/matches/{code}/start"), Some(&guest_token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // nobody picked a side yet
        let (status, _) = send(
            &app,
            post_json(&format!("/matches/{code}/start"), Some(&creator_token), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            Request::get(format!("/matches/{code}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "team_select");
        assert_eq!(body["players"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let app = app().await;
        let (status, _) = send(
            &app,
            post_json(
                "/matches",
                None,
                json!({
                    "creator_name": "Ana",
                    "settings": {
                        "max_events": 3,
                        "mid_delay_seconds": 600,
                        "late_delay_seconds": 300,
                        "map": "park"
                    }
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_token_and_unknown_match() {
        let app = app().await;
        let (status, _) = send(
            &app,
            post_json("/matches/ZZZZZZ/start", None, json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &app,
            Request::get("/matches/ZZZZZZ/timeline").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            Request::get("/healthcheck").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["driven_matches"], 0);
        assert_eq!(body["sse_listeners"], 0);
    }
}
