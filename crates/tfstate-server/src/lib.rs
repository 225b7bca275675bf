//! HTTP server for the tfstate remote-state backend.
//!
//! Clients address a workspace by URL path (under `/s/`) plus optional
//! Basic credentials, store an opaque state blob there, and serialize
//! writers with the `LOCK`/`UNLOCK` handshake.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use dispatch::{Cancellation, LockDispatcher, StateRequest, Verb};
pub use error::{ServerError, ServerResult};
pub use handler::DumpEntry;
pub use server::StateServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use tfstate_store::{SqliteStateStore, StateSchema, StateStore, StoreError, StoreResult, UpdateFn};
    use tfstate_types::{StateId, StateRecord};
    use tower::util::ServiceExt;

    const LOCK_A: &str = r#"{"ID":"a","Operation":"OperationTypeApply","Who":"alice@host","Version":"1.5.7","Created":"2024-03-01T10:00:00Z","Path":""}"#;
    const LOCK_B: &str = r#"{"ID":"b","Operation":"OperationTypeApply","Who":"bob@host","Version":"1.5.7","Created":"2024-03-01T10:00:05Z","Path":""}"#;

    fn app() -> Router {
        let store = SqliteStateStore::open_in_memory(StateSchema::default()).unwrap();
        router::build_router(AppState::new(ServerConfig::default(), Arc::new(store)))
    }

    fn method(name: &str) -> Method {
        Method::from_bytes(name.as_bytes()).unwrap()
    }

    async fn send(app: &Router, verb: &str, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method(verb))
            .uri(uri)
            .body(Body::from(body.to_owned()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn get_unwritten_state_is_empty() {
        let app = app();
        let (status, body) = send(&app, "GET", "/s/never-written", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn lock_twice_returns_first_lock() {
        let app = app();
        let (status, body) = send(&app, "LOCK", "/s/prod", LOCK_A).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, body) = send(&app, "LOCK", "/s/prod", LOCK_B).await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body, LOCK_A.as_bytes());
    }

    #[tokio::test]
    async fn unlock_is_idempotent_and_unchecked() {
        let app = app();
        let (status, body) = send(&app, "UNLOCK", "/s/prod", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        send(&app, "LOCK", "/s/prod", LOCK_A).await;
        let (status, _) = send(&app, "UNLOCK", "/s/prod?ID=someone-else", "").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "LOCK", "/s/prod", LOCK_B).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn post_roundtrips_bytes() {
        let app = app();
        let state = r#"{"version":4,"serial":1,"outputs":{}}"#;
        let (status, _) = send(&app, "POST", "/s/prod", state).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, "GET", "/s/prod", "").await;
        assert_eq!(body, state.as_bytes());
    }

    #[tokio::test]
    async fn post_with_wrong_lock_id_is_rejected() {
        let app = app();
        send(&app, "POST", "/s/prod", "v1").await;
        send(&app, "LOCK", "/s/prod", LOCK_A).await;

        let (status, body) = send(&app, "POST", "/s/prod?ID=b", "v2").await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body, LOCK_A.as_bytes());
        let (_, body) = send(&app, "GET", "/s/prod", "").await;
        assert_eq!(body, b"v1");

        let (status, _) = send(&app, "POST", "/s/prod?ID=a", "v2").await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, "GET", "/s/prod", "").await;
        assert_eq!(body, b"v2");
    }

    #[tokio::test]
    async fn delete_clears_data_and_keeps_lock() {
        let app = app();
        send(&app, "POST", "/s/prod", "v1").await;
        send(&app, "LOCK", "/s/prod", LOCK_A).await;

        let (status, _) = send(&app, "DELETE", "/s/prod?ID=a", "").await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, "GET", "/s/prod", "").await;
        assert!(body.is_empty());

        let (status, body) = send(&app, "LOCK", "/s/prod", LOCK_B).await;
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(body, LOCK_A.as_bytes());
    }

    #[tokio::test]
    async fn unsupported_method_is_not_implemented() {
        let app = app();
        let (status, body) = send(&app, "PUT", "/s/prod", "x").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body, b"Not implemented");
    }

    #[tokio::test]
    async fn corrupt_stored_lock_is_a_server_error() {
        let app = app();
        send(&app, "LOCK", "/s/prod", "not json").await;
        let (status, _) = send(&app, "POST", "/s/prod?ID=a", "v1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn credentials_separate_workspaces() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/s/prod")
            // "alice:secret"
            .header(header::AUTHORIZATION, "Basic YWxpY2U6c2VjcmV0")
            .body(Body::from("alice-state"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (_, anonymous) = send(&app, "GET", "/s/prod", "").await;
        assert!(anonymous.is_empty());

        let request = Request::builder()
            .uri("/s/prod")
            .header(header::AUTHORIZATION, "Basic YWxpY2U6c2VjcmV0")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"alice-state");
    }

    #[tokio::test]
    async fn paths_are_independent() {
        let app = app();
        send(&app, "LOCK", "/s/a", LOCK_A).await;
        let (status, _) = send(&app, "LOCK", "/s/b", LOCK_B).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "POST", "/s/b/nested?ID=b", "b").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn dump_lists_rows_as_base64() {
        let app = app();
        send(&app, "POST", "/s/a", "{}").await;
        send(&app, "LOCK", "/s/b", r#"{"ID":"x"}"#).await;

        let (status, body) = send(&app, "GET", "/health/dump/", "").await;
        assert_eq!(status, StatusCode::OK);
        let mut rows: Vec<DumpEntry> = serde_json::from_slice(&body).unwrap();
        rows.sort_by(|a, b| a.data.cmp(&b.data));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], DumpEntry { data: String::new(), lock: "eyJJRCI6IngifQ==".into() });
        assert_eq!(rows[1], DumpEntry { data: "e30=".into(), lock: String::new() });
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let store = SqliteStateStore::open_in_memory(StateSchema::default()).unwrap();
        let config = ServerConfig { max_body_size: 8, ..ServerConfig::default() };
        let app = router::build_router(AppState::new(config, Arc::new(store)));
        let (status, _) = send(&app, "POST", "/s/prod", "0123456789abcdef").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn concurrent_locks_have_one_winner() {
        let app = app();
        let tasks: Vec<_> = (0..16)
            .map(|n| {
                let app = app.clone();
                tokio::spawn(async move {
                    let envelope = format!(r#"{{"ID":"holder-{n}"}}"#);
                    send(&app, "LOCK", "/s/race", &envelope).await.0
                })
            })
            .collect();
        let mut ok = 0;
        for task in tasks {
            let status = task.await.unwrap();
            if status == StatusCode::OK {
                ok += 1;
            } else {
                assert_eq!(status, StatusCode::LOCKED);
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn repeated_id_uses_first_value() {
        let app = app();
        send(&app, "LOCK", "/s/p", r#"{"ID":"a"}"#).await;
        let (status, _) = send(&app, "POST", "/s/p?ID=a&ID=a", "v1").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "POST", "/s/p?ID=a&ID=b", "v2").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "POST", "/s/p?ID=b&ID=a", "v3").await;
        assert_eq!(status, StatusCode::LOCKED);
        let (_, body) = send(&app, "GET", "/s/p", "").await;
        assert_eq!(body, b"v2");
    }

    #[tokio::test]
    async fn bare_prefix_redirects_with_trailing_slash() {
        let app = app();
        let request = Request::builder().uri("/s?ID=a").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/s/?ID=a");

        let request = Request::builder().uri("/health/dump").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/health/dump/");
    }

    /// Store whose every operation fails the way a broken database would.
    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn lookup(&self, _: &StateId) -> StoreResult<StateRecord> {
            Err(StoreError::Poisoned("sqlite connection"))
        }

        fn upsert(&self, _: &StateId, _: &StateRecord) -> StoreResult<()> {
            Err(StoreError::Poisoned("sqlite connection"))
        }

        fn scan(&self) -> StoreResult<Vec<StateRecord>> {
            Err(StoreError::Io(std::io::Error::other("disk I/O error")))
        }

        fn update(&self, _: &StateId, _: &mut UpdateFn<'_>) -> StoreResult<StateRecord> {
            Err(StoreError::Poisoned("sqlite connection"))
        }
    }

    #[tokio::test]
    async fn store_failure_is_500_with_raw_message() {
        let app = router::build_router(AppState::new(ServerConfig::default(), Arc::new(BrokenStore)));
        for verb in ["GET", "LOCK", "UNLOCK", "POST", "DELETE"] {
            let (status, body) = send(&app, verb, "/s/prod", r#"{"ID":"a"}"#).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{verb}");
            assert_eq!(body, b"sqlite connection lock poisoned", "{verb}");
        }
        let (status, body) = send(&app, "GET", "/health/dump/", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, b"I/O error: disk I/O error");
    }
}
