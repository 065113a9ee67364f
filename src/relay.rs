//! JSON-RPC relay.
//!
//! Forwards JSON-RPC request bodies to the upstream provider with the project
//! credentials attached, so the credentials never reach the client. The
//! upstream status, body and content type are returned as they are.

use std::{
    convert::Infallible,
    io,
    net::{AddrParseError, SocketAddr},
    sync::Arc,
    time::Instant,
};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::Incoming,
    header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::config::RelayConfig;

const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid listen address: {0}")]
    ListenAddr(#[from] AddrParseError),
    #[error("unable to listen on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Shared relay state
pub struct RelayState {
    route: String,
    endpoint: String,
    authorization: String,
    client: reqwest::Client,
}

impl RelayState {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        Ok(RelayState {
            route: config.route.clone(),
            endpoint: config.upstream_endpoint(),
            authorization: config.basic_authorization(),
            client: reqwest::Client::builder().build()?,
        })
    }
}

/// Binds the configured address and serves until the process stops.
pub async fn serve(config: RelayConfig) -> Result<(), RelayError> {
    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| RelayError::Bind { addr, source })?;
    let state = Arc::new(RelayState::new(&config)?);

    run(state, listener).await;
    Ok(())
}

/// Accept loop, one task per connection.
pub async fn run(state: Arc<RelayState>, listener: TcpListener) {
    tracing::info!(
        addr = ?listener.local_addr().ok(),
        route = %state.route,
        "relay listening"
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        tracing::error!(%addr, ?err, "error serving connection");
                    }
                });
            }
            Err(err) => {
                tracing::error!(?err, "error accepting connection");
            }
        }
    }
}

async fn handle_request(
    state: Arc<RelayState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    tracing::debug!(%addr, %method, %path, "request");

    let response = match (method, path.as_str()) {
        (Method::POST, route) if route == state.route => forward(&state, req).await,
        (Method::GET, "/health") => json_response(StatusCode::OK, &json!({ "status": "ok" })),
        _ => json_response(StatusCode::NOT_FOUND, &json!({ "error": "Not Found" })),
    };
    Ok(response)
}

async fn forward(state: &RelayState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let started = Instant::now();

    match proxy(state, req).await {
        Ok(response) => {
            tracing::info!(
                status = %response.status(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "relayed request"
            );
            response
        }
        Err(message) => {
            tracing::warn!(
                error = %message,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "relay failed"
            );
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": message }),
            )
        }
    }
}

async fn proxy(state: &RelayState, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, String> {
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| e.to_string())?
        .to_bytes();

    let upstream = state
        .client
        .post(&state.endpoint)
        .header(CONTENT_TYPE, APPLICATION_JSON)
        .header(AUTHORIZATION, &state.authorization)
        .body(body)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = upstream.status();
    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or(HeaderValue::from_static(APPLICATION_JSON));
    let body = upstream.bytes().await.map_err(|e| e.to_string())?;

    Ok(response(status, content_type, body))
}

fn response(status: StatusCode, content_type: HeaderValue, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    response
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    response(
        status,
        HeaderValue::from_static(APPLICATION_JSON),
        Bytes::from(body.to_string()),
    )
}
