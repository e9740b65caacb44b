/*
 *  server.rs
 *
 *  trixel - every frame counts
 *  (c) 2025-26
 *
 *  Request dispatch and the axum wire front-end
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::context::AppContext;

/// Header carrying the shared secret when authentication is enabled.
pub const API_KEY_HEADER: &str = "x-trixel-key";

/// Largest request body the wire layer will buffer. Generous for any
/// panel this daemon drives; everything larger is refused at the edge.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Capacity of the request hand-off channel. The core services one
/// request at a time; a short queue absorbs bursts without buffering
/// unbounded uploads.
const REQUEST_QUEUE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// A parsed request as handlers see it: body bytes plus header/query
/// lookup. Header names are lowercased at the edge.
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

/// What goes back over the wire: status, text body, content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
    pub content_type: &'static str,
}

impl ApiResponse {
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: "text/plain",
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::text(200, body)
    }

    pub fn unauthorized() -> Self {
        Self::text(401, "Unauthorized")
    }

    pub fn not_found() -> Self {
        Self::text(404, "Not Found")
    }
}

/// A handler's verdict on one request.
///
/// `fault` carries a description only when the failure should count
/// against the supervisor's consecutive-failure budget: hardware or
/// environment trouble on a well-formed request. Client mistakes -
/// malformed uploads, bad parameters, unusable URLs - answer with an
/// error status but leave the budget alone.
#[derive(Debug)]
pub struct Reply {
    pub response: ApiResponse,
    pub fault: Option<String>,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            response: ApiResponse::ok(body),
            fault: None,
        }
    }

    /// Error answer that stays the client's problem.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            response: ApiResponse::text(status, body),
            fault: None,
        }
    }

    /// Error answer that also counts as a cycle failure.
    pub fn fault(body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            fault: Some(body.clone()),
            response: ApiResponse::text(500, body),
        }
    }
}

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Reply> + Send + 'a>>;

/// Route handlers are plain functions over the shared context; they
/// borrow it for the duration of one request.
pub type Handler = for<'a> fn(&'a mut AppContext, ApiRequest) -> HandlerFuture<'a>;

/// Dispatch table: one handler per (method, path), exact match.
#[derive(Default)]
pub struct Router {
    handlers: HashMap<(Method, String), Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: Method, path: &str, handler: Handler) {
        self.handlers.insert((method, path.to_string()), handler);
    }

    /// Authenticate, route, and run one request against the shared
    /// context. Returns the wire answer and the cycle fault, if any.
    pub async fn dispatch(
        &self,
        ctx: &mut AppContext,
        request: ApiRequest,
        api_key: Option<&str>,
    ) -> (ApiResponse, Option<String>) {
        if let Some(expected) = api_key {
            match request.header(API_KEY_HEADER) {
                Some(provided) if provided == expected => {}
                Some(_) => {
                    warn!(
                        "authentication failed: invalid key for {} {}",
                        request.method, request.path
                    );
                    return (ApiResponse::unauthorized(), None);
                }
                None => {
                    warn!(
                        "authentication failed: {} header missing for {} {}",
                        API_KEY_HEADER, request.method, request.path
                    );
                    return (ApiResponse::unauthorized(), None);
                }
            }
        }

        let key = (request.method, request.path.clone());
        match self.handlers.get(&key) {
            None => {
                debug!("no handler for {} {}", request.method, request.path);
                (ApiResponse::not_found(), None)
            }
            Some(handler) => {
                let reply = handler(ctx, request).await;
                (reply.response, reply.fault)
            }
        }
    }
}

/// Errors crossing the service boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// One request cycle failed for reasons the supervisor must count.
    #[error("request cycle failed: {0}")]
    Cycle(String),

    /// The wire front-end could not bind or rebind its socket.
    #[error("front-end bind failed: {0}")]
    Bind(#[source] std::io::Error),

    /// The wire front-end stopped delivering requests. Clean shutdown.
    #[error("front-end stopped")]
    Shutdown,
}

/// One queued request with its reply slot.
pub struct Envelope {
    pub request: ApiRequest,
    pub reply: oneshot::Sender<ApiResponse>,
}

/// The out-of-scope HTTP machinery, kept behind a channel.
///
/// axum accepts connections and parses requests on the runtime; every
/// request becomes an [`Envelope`] and waits for the single-threaded
/// core to answer it. `restart` tears the listener down and rebinds,
/// which is the "fully reinitialize the server collaborator" step of
/// recovery.
pub struct HttpFrontend {
    bind: SocketAddr,
    rx: mpsc::Receiver<Envelope>,
    task: JoinHandle<()>,
}

impl HttpFrontend {
    pub async fn start(bind: SocketAddr) -> Result<Self, ServiceError> {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
        let listener = TcpListener::bind(bind).await.map_err(ServiceError::Bind)?;
        let local = listener.local_addr().map_err(ServiceError::Bind)?;

        let app = axum::Router::new().fallback(bridge).with_state(tx);
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("http front-end terminated: {}", e);
            }
        });

        info!("http front-end listening on {}", local);
        Ok(Self {
            bind: local,
            rx,
            task,
        })
    }

    /// Address actually bound (useful when the config said port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Next queued request, or `None` once the front-end is gone.
    pub async fn next(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Tear down the listener task and bind a fresh one on the same
    /// address. In-flight envelopes die with the old channel; their
    /// clients get a 503 from the bridge.
    pub async fn restart(&mut self) -> Result<(), ServiceError> {
        self.task.abort();
        // Wait for the old listener to actually close before rebinding
        // the same address.
        let _ = (&mut self.task).await;
        let fresh = Self::start(self.bind).await?;
        let _old = std::mem::replace(self, fresh);
        info!("http front-end reinitialized on {}", self.bind);
        Ok(())
    }
}

impl Drop for HttpFrontend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The front-end plus the dispatch table, packaged as the supervisor's
/// one unit of work: receive a request, run it against the context,
/// answer it.
pub struct HttpService {
    frontend: HttpFrontend,
    router: Router,
    api_key: Option<String>,
}

impl HttpService {
    pub async fn start(
        bind: SocketAddr,
        api_key: Option<String>,
        router: Router,
    ) -> Result<Self, ServiceError> {
        let frontend = HttpFrontend::start(bind).await?;
        Ok(Self {
            frontend,
            router,
            api_key,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.frontend.local_addr()
    }
}

impl crate::supervisor::EventService for HttpService {
    async fn service_next(&mut self, ctx: &mut AppContext) -> Result<(), ServiceError> {
        let Some(envelope) = self.frontend.next().await else {
            return Err(ServiceError::Shutdown);
        };

        let label = format!("{} {}", envelope.request.method, envelope.request.path);
        debug!("servicing {}", label);

        let (response, fault) = self
            .router
            .dispatch(ctx, envelope.request, self.api_key.as_deref())
            .await;

        // Every request gets an answer, even a failing one. A client
        // that hung up early is its own problem, not a cycle failure.
        if envelope.reply.send(response).is_err() {
            warn!("client went away before the reply to {}", label);
        }

        match fault {
            Some(description) => Err(ServiceError::Cycle(format!("{}: {}", label, description))),
            None => Ok(()),
        }
    }

    async fn reinitialize(&mut self) -> Result<(), ServiceError> {
        self.frontend.restart().await
    }
}

/// axum handler: parse, enqueue, await the core's answer.
async fn bridge(
    State(tx): State<mpsc::Sender<Envelope>>,
    request: axum::extract::Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let method = if parts.method == axum::http::Method::GET {
        Method::Get
    } else if parts.method == axum::http::Method::POST {
        Method::Post
    } else {
        return plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    };

    let query: HashMap<String, String> = parts
        .uri
        .query()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => {
            return plain(StatusCode::PAYLOAD_TOO_LARGE, "Body too large");
        }
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    let envelope = Envelope {
        request: ApiRequest {
            method,
            path: parts.uri.path().to_string(),
            query,
            headers,
            body,
        },
        reply: reply_tx,
    };

    if tx.send(envelope).await.is_err() {
        return plain(StatusCode::SERVICE_UNAVAILABLE, "Service restarting");
    }

    match reply_rx.await {
        Ok(response) => {
            let status =
                StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                [(header::CONTENT_TYPE, response.content_type)],
                response.body,
            )
                .into_response()
        }
        Err(_) => plain(StatusCode::SERVICE_UNAVAILABLE, "Service restarting"),
    }
}

fn plain(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}
