//! HTTP control surface.
//!
//! ```text
//! GET    /status               → "ok"
//! POST   /plugins/create       → {"id": "<hex>"}
//! GET    /plugins/{id}/status  → {"status": "running"}
//! GET    /plugins/list         → [TypeSchema, ...]
//! GET    /plugins/running      → [RunningPluginInfo, ...]
//! DELETE /plugins/{id}
//! PUT    /plugins/{id}         → 501
//! ```
//!
//! IDs must be lowercase hex; anything else is answered with 404 before the
//! controller is consulted.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use vane_agent::PluginId;

use crate::controller::PluginController;
use crate::dto::{CreatedPlugin, PluginSpec, StatusResponse};
use crate::error::ApiError;

type SharedController = Arc<PluginController>;

// ─── Router construction ──────────────────────────────────────────────────────

/// Builds the control API router around a shared controller.
pub fn router(controller: SharedController) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/plugins/create", post(create_plugin))
        .route("/plugins/list", get(list_plugin_types))
        .route("/plugins/running", get(list_running_plugins))
        .route("/plugins/{id}/status", get(plugin_status))
        .route("/plugins/{id}", delete(delete_plugin).put(update_plugin))
        .with_state(controller)
}

fn is_plugin_id(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn status() -> &'static str {
    "ok"
}

async fn create_plugin(
    State(controller): State<SharedController>,
    body: Result<Json<PluginSpec>, JsonRejection>,
) -> Result<Json<CreatedPlugin>, ApiError> {
    let Json(spec) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let id = controller.create_plugin(&spec)?;
    Ok(Json(CreatedPlugin { id }))
}

async fn plugin_status(
    State(controller): State<SharedController>,
    Path(id): Path<String>,
) -> Response {
    if !is_plugin_id(&id) {
        return not_found();
    }
    let status = controller.get_plugin_status(&PluginId::parse(id));
    Json(StatusResponse { status }).into_response()
}

async fn list_plugin_types(State(controller): State<SharedController>) -> Response {
    Json(controller.list_plugin_types()).into_response()
}

async fn list_running_plugins(State(controller): State<SharedController>) -> Response {
    Json(controller.list_running_plugins()).into_response()
}

async fn delete_plugin(
    State(controller): State<SharedController>,
    Path(id): Path<String>,
) -> Response {
    if !is_plugin_id(&id) {
        return not_found();
    }
    match controller.delete_plugin(&PluginId::parse(id)) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e @ ApiError::UnknownPlugin(_)) => e.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn update_plugin(
    State(controller): State<SharedController>,
    Path(id): Path<String>,
    body: Result<Json<PluginSpec>, JsonRejection>,
) -> Response {
    if !is_plugin_id(&id) {
        return not_found();
    }
    let spec = body.map(|Json(spec)| spec).unwrap_or_default();
    match controller.update_plugin(&PluginId::parse(id), &spec) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

// ─── Server lifecycle ─────────────────────────────────────────────────────────

/// A running control API server.
///
/// Dropping the handle does not stop the server; call [`ApiServer::shutdown`].
pub struct ApiServer {
    local_addr: SocketAddr,
    shutdown_token: CancellationToken,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Binds `addr` and starts serving in a background task.
    pub async fn bind(addr: &str, controller: SharedController) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Self::serve(listener, controller)
    }

    /// Serves on an already bound listener.
    pub fn serve(listener: TcpListener, controller: SharedController) -> std::io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let router = router(controller);
        let shutdown_token = CancellationToken::new();
        let token = shutdown_token.clone();

        debug!(addr = %local_addr, "Control API listener bound");

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, router);
            tokio::select! {
                result = server => {
                    if let Err(e) = result {
                        error!(error = %e, "Control API server error");
                    }
                }
                () = token.cancelled() => {
                    info!(addr = %local_addr, "Control API shutting down");
                }
            }
        });

        info!(addr = %local_addr, "Control API listening");
        Ok(Self {
            local_addr,
            shutdown_token,
            task,
        })
    }

    /// The address the OS actually bound, including an ephemeral port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting requests and waits for the serve task to exit.
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "Control API task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use vane_agent::PluginStatus;
    use vane_core::Strictness;

    use super::*;
    use crate::controller::fixtures;

    fn app(strictness: Strictness) -> (Router, SharedController) {
        let controller = Arc::new(fixtures::controller(strictness));
        (router(controller.clone()), controller)
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_route() {
        let (router, _) = app(Strictness::Lenient);
        let (status, body) = send(&router, Method::GET, "/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn test_create_then_status_then_delete() {
        let (router, controller) = app(Strictness::Lenient);

        let spec = json!({"Name": "inputs.gauge", "Config": {"value": 1, "interval": "20ms"}});
        let (status, body) = send(&router, Method::POST, "/plugins/create", Some(spec)).await;
        assert_eq!(status, StatusCode::OK);
        let id = json_body(&body)["id"].as_str().unwrap().to_string();
        assert_eq!(id.len(), 16);

        let plugin_id = PluginId::parse(id.clone());
        let within = Duration::from_secs(1);
        fixtures::wait_for_status(&controller, &plugin_id, PluginStatus::Running, within).await;
        let (status, body) =
            send(&router, Method::GET, &format!("/plugins/{id}/status"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!({"status": "running"}));

        let (status, body) = send(&router, Method::GET, "/plugins/running", None).await;
        assert_eq!(status, StatusCode::OK);
        let running = json_body(&body);
        assert_eq!(running[0]["ID"], json!(id));
        assert_eq!(running[0]["Name"], json!("inputs.gauge"));
        assert_eq!(running[0]["Config"]["interval"]["type"], json!("duration"));

        let (status, _) = send(&router, Method::DELETE, &format!("/plugins/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let within = Duration::from_millis(300);
        fixtures::wait_for_status(&controller, &plugin_id, PluginStatus::Dead, within).await;
    }

    #[tokio::test]
    async fn test_create_errors_are_bad_requests() {
        let (router, controller) = app(Strictness::Lenient);

        let (status, body) = send(
            &router,
            Method::POST,
            "/plugins/create",
            Some(json!({"Name": "inputs.missing"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&body).contains("inputs.missing"));

        let (status, body) = send(
            &router,
            Method::POST,
            "/plugins/create",
            Some(json!({"Name": "inputs.gauge", "Config": {"value": "many"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&body).contains("value"));

        let not_a_spec = json!(["not", "a", "spec"]);
        let (status, _) = send(&router, Method::POST, "/plugins/create", Some(not_a_spec)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(controller.agent().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_ids_are_not_found() {
        let (router, _) = app(Strictness::Lenient);
        for uri in ["/plugins/XYZ/status", "/plugins/12-34/status"] {
            let (status, _) = send(&router, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
        let (status, _) = send(&router, Method::DELETE, "/plugins/nothex", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let (router, _) = app(Strictness::Lenient);
        let (status, body) = send(&router, Method::GET, "/plugins/00ff/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(&body), json!({"status": "dead"}));

        let (status, _) = send(&router, Method::DELETE, "/plugins/00ff", None).await;
        assert_eq!(status, StatusCode::OK);

        let (strict, _) = app(Strictness::Strict);
        let (status, _) = send(&strict, Method::DELETE, "/plugins/00ff", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_is_not_implemented() {
        let (router, _) = app(Strictness::Lenient);
        let spec = json!({"Name": "inputs.gauge"});
        let (status, _) = send(&router, Method::PUT, "/plugins/0a", Some(spec)).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_list_plugin_types() {
        let (router, _) = app(Strictness::Lenient);
        let (status, body) = send(&router, Method::GET, "/plugins/list", None).await;
        assert_eq!(status, StatusCode::OK);
        let types = json_body(&body);
        assert_eq!(types[1]["Name"], json!("inputs.gauge"));
        assert_eq!(types[1]["Config"]["timeout"]["type"], json!("duration"));
    }

    #[tokio::test]
    async fn test_server_binds_and_shuts_down() {
        let controller = Arc::new(fixtures::controller(Strictness::Lenient));
        let server = ApiServer::bind("127.0.0.1:0", controller).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
        tokio::time::timeout(Duration::from_secs(1), server.shutdown())
            .await
            .unwrap();
    }
}
