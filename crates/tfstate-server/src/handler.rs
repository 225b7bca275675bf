use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tfstate_types::{Credentials, StateId, StateRecord, LOCK_ID_FIELD};

use crate::dispatch::{Cancellation, StateRequest, Verb};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Raises its [`Cancellation`] when dropped. Axum drops the handler future
/// when the client disconnects, which is the only signal we get.
struct CancelOnDrop(Cancellation);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// First `ID` value in the query string. Repeated keys are allowed and
/// later values are ignored.
fn lock_id_from_query(pairs: Vec<(String, String)>) -> Option<String> {
    pairs
        .into_iter()
        .find(|(key, _)| key == LOCK_ID_FIELD)
        .map(|(_, value)| value)
}

/// One row of the diagnostic dump. Both fields are base64 so arbitrary
/// bytes survive the JSON encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpEntry {
    pub data: String,
    pub lock: String,
}

impl From<StateRecord> for DumpEntry {
    fn from(record: StateRecord) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        Self {
            data: engine.encode(record.data),
            lock: engine.encode(record.lock),
        }
    }
}

/// State endpoint: fingerprints the request and runs the lock protocol.
pub async fn state_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    let path = uri.path();
    let verb = match Verb::parse(method.as_str()) {
        Ok(verb) => verb,
        Err(err) => {
            tracing::warn!(method = %method, path, "unsupported method");
            return err.into_response();
        }
    };

    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(Credentials::from_authorization)
        .unwrap_or_default();
    let id = StateId::fingerprint(path, &credentials);
    tracing::debug!(
        %verb,
        path,
        id = id.short(),
        anonymous = credentials.is_anonymous(),
        body_len = body.len(),
        "state request"
    );

    let guard = CancelOnDrop(Cancellation::new());
    let request = StateRequest {
        verb,
        id,
        body: body.to_vec(),
        lock_id: lock_id_from_query(query),
        cancellation: guard.0.clone(),
    };
    let dispatcher = state.dispatcher.clone();
    let result = tokio::task::spawn_blocking(move || dispatcher.dispatch(request))
        .await
        .unwrap_or_else(|e| Err(ServerError::Internal(format!("dispatch task failed: {e}"))));

    let response = match result {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => {
            if err.status_code().is_server_error() {
                tracing::error!(%verb, path, error = %err, "state request failed");
            }
            err.into_response()
        }
    };
    tracing::info!(%verb, path, status = response.status().as_u16(), "state response");
    response
}

/// Diagnostic dump of every stored record.
pub async fn dump_handler(State(state): State<AppState>) -> ServerResult<Json<Vec<DumpEntry>>> {
    let store = state.store().clone();
    let records = tokio::task::spawn_blocking(move || store.scan())
        .await
        .map_err(|e| ServerError::Internal(format!("scan task failed: {e}")))??;
    tracing::info!(rows = records.len(), "dumped state table");
    Ok(Json(records.into_iter().map(DumpEntry::from).collect()))
}

/// Go-style subtree redirect: `/s` and `/health/dump` answer 301 to the
/// same path with a trailing slash, keeping the query.
pub async fn trailing_slash_redirect(uri: Uri) -> Response {
    let location = match uri.query() {
        Some(query) => format!("{}/?{query}", uri.path()),
        None => format!("{}/", uri.path()),
    };
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}
