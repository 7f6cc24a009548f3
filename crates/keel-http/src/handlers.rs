//! HTTP request handlers.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{Extensions, HeaderMap, Uri};
use keel_ring::{RequestKey, ServerId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::AppState;
use crate::error::HttpError;

/// Header carrying an explicit numeric request id.
pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<T> {
    pub message: T,
    pub status: &'static str,
}

impl<T> Envelope<T> {
    fn ok(message: T) -> Json<Self> {
        Json(Self {
            message,
            status: "successful",
        })
    }
}

/// Body of `GET /rep`, `POST /add` and `DELETE /rm` responses.
#[derive(Debug, Serialize)]
pub(crate) struct Replicas {
    #[serde(rename = "N")]
    pub n: usize,
    pub replicas: Vec<String>,
}

impl Replicas {
    fn from_members(members: &[ServerId]) -> Self {
        Self {
            n: members.len(),
            replicas: members.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Request body for `POST /add` and `DELETE /rm`.
#[derive(Debug, Deserialize)]
pub(crate) struct ScaleRequest {
    pub n: usize,
    #[serde(default)]
    pub hostnames: Vec<String>,
}

impl ScaleRequest {
    fn server_ids(&self) -> Result<Vec<ServerId>, HttpError> {
        self.hostnames
            .iter()
            .map(|h| {
                h.parse::<ServerId>().map_err(|_| HttpError::InvalidHostname {
                    hostname: h.clone(),
                })
            })
            .collect()
    }
}

/// Body of a routed request's response.
#[derive(Debug, Serialize)]
pub(crate) struct Routed {
    pub server: String,
    pub slot: u32,
}

fn parse_body(
    payload: Result<Json<ScaleRequest>, JsonRejection>,
) -> Result<ScaleRequest, HttpError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| HttpError::InvalidBody {
            message: e.body_text(),
        })
}

// -----------------------------------------------------------------------
// GET /rep
// -----------------------------------------------------------------------

/// List the current replicas.
pub(crate) async fn replicas(State(state): State<AppState>) -> Json<Envelope<Replicas>> {
    let members = state.balancer.members().await;
    Envelope::ok(Replicas::from_members(&members))
}

// -----------------------------------------------------------------------
// POST /add
// -----------------------------------------------------------------------

/// Spawn `n` servers, optionally with the given hostnames.
pub(crate) async fn add(
    State(state): State<AppState>,
    payload: Result<Json<ScaleRequest>, JsonRejection>,
) -> Result<Json<Envelope<Replicas>>, HttpError> {
    let body = parse_body(payload)?;
    let requested = body.server_ids()?;

    let members = state.balancer.scale_up(body.n, requested).await?;
    info!(added = body.n, members = members.len(), "scaled up");

    Ok(Envelope::ok(Replicas::from_members(&members)))
}

// -----------------------------------------------------------------------
// DELETE /rm
// -----------------------------------------------------------------------

/// Retire `n` servers, the named hostnames first.
pub(crate) async fn remove(
    State(state): State<AppState>,
    payload: Result<Json<ScaleRequest>, JsonRejection>,
) -> Result<Json<Envelope<Replicas>>, HttpError> {
    let body = parse_body(payload)?;
    let requested = body.server_ids()?;

    let members = state.balancer.scale_down(body.n, requested).await?;
    info!(removed = body.n, members = members.len(), "scaled down");

    Ok(Envelope::ok(Replicas::from_members(&members)))
}

// -----------------------------------------------------------------------
// GET /route, GET /{*path}
// -----------------------------------------------------------------------

/// Route a request to a server.
///
/// The key is the numeric `x-request-id` header if present, otherwise the
/// client IP, otherwise the request path.
pub(crate) async fn route(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
) -> Result<Json<Envelope<Routed>>, HttpError> {
    let key = request_key(&uri, &headers, &extensions);
    let routed = state.balancer.route(key).await?;
    debug!(path = %uri.path(), server = %routed.server, "forwarding request");

    Ok(Envelope::ok(Routed {
        server: routed.server.to_string(),
        slot: routed.slot,
    }))
}

fn request_key(uri: &Uri, headers: &HeaderMap, extensions: &Extensions) -> RequestKey {
    if let Some(id) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
    {
        return RequestKey::Int(id);
    }

    if let Some(ConnectInfo(addr)) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return RequestKey::from(*addr);
    }

    RequestKey::from(uri.path())
}
