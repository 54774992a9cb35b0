//! GET passthrough to the cluster management API.
//!
//! # Responsibilities
//! - Rebase the request path and query onto `cluster.endpoint`
//! - Copy request and response headers, minus `Host` and hop-by-hop headers
//! - Stream the upstream body back unchanged
//!
//! # Design Decisions
//! - GET only; other methods are answered with 405
//! - No retries; an upstream failure is a 502

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::http::request::RequestIdExt;
use crate::http::server::AppState;
use crate::observability::metrics;

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Whether a header is forwarded in either direction.
pub fn should_copy_header(name: &HeaderName) -> bool {
    *name != header::HOST && !HOP_BY_HOP.contains(name)
}

pub fn copy_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from.iter().filter(|(name, _)| should_copy_header(name)) {
        to.append(name.clone(), value.clone());
    }
}

/// Upstream URI for `path_and_query` under `base`.
pub fn upstream_uri(base: &Url, uri: &Uri) -> Option<Uri> {
    let mut target = base.clone();
    let base_path = base.path().trim_end_matches('/');
    target.set_path(&format!("{}{}", base_path, uri.path()));
    target.set_query(uri.query());
    target.as_str().parse().ok()
}

/// Forwards GET requests to the cluster gateway.
#[derive(Clone)]
pub struct Passthrough {
    client: Client<HttpConnector, Body>,
    base: Url,
}

impl Passthrough {
    pub fn new(base: Url) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub async fn forward(&self, request: Request<Body>) -> Response {
        let request_id = request.request_id().to_string();

        if request.method() != Method::GET {
            tracing::debug!(request_id = %request_id, method = %request.method(), "Rejecting non-GET passthrough");
            return respond(StatusCode::METHOD_NOT_ALLOWED, "Only GET is forwarded");
        }

        let Some(uri) = upstream_uri(&self.base, request.uri()) else {
            return respond(StatusCode::BAD_REQUEST, "Invalid request path");
        };

        let mut upstream = Request::builder().method(Method::GET).uri(uri.clone());
        if let Some(headers) = upstream.headers_mut() {
            copy_headers(request.headers(), headers);
        }
        let upstream = match upstream.body(Body::empty()) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to build upstream request");
                return respond(StatusCode::BAD_REQUEST, "Invalid request");
            }
        };

        tracing::debug!(request_id = %request_id, upstream = %uri, "Forwarding to cluster API");

        match self.client.request(upstream).await {
            Ok(response) => relay(response),
            Err(e) => {
                tracing::error!(request_id = %request_id, upstream = %uri, error = %e, "Cluster API request failed");
                respond(StatusCode::BAD_GATEWAY, "Upstream request failed")
            }
        }
    }
}

/// Upstream response with its status, end-to-end headers and streamed body.
fn relay(response: hyper::Response<Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    metrics::record_passthrough(parts.status.as_u16());

    let mut out = Response::new(Body::new(body));
    *out.status_mut() = parts.status;
    copy_headers(&parts.headers, out.headers_mut());
    out
}

fn respond(status: StatusCode, message: &'static str) -> Response {
    metrics::record_passthrough(status.as_u16());
    (status, message).into_response()
}

/// Fallback handler forwarding unmatched requests.
pub async fn passthrough_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    if !state.settings.load().passthrough.enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    state.passthrough.forward(request).await
}
