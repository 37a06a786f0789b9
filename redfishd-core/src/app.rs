//! The application facade.
//!
//! Owns the router, the session table and the role map; accepts sockets
//! from the supervisor; and runs the dispatch pipeline: parse, authenticate,
//! resolve, authorize, invoke, finalise.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum_server::tls_rustls::RustlsConfig;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::header::{ALLOW, CONTENT_TYPE};
use http::StatusCode;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::async_resp::AsyncResponse;
use crate::config::ServiceConfig;
use crate::error_messages;
use crate::privileges::{Admission, Privilege, PrivilegeSet, RoleMap};
use crate::request::{Request, RequestError};
use crate::response::{Attachment, Response};
use crate::router::{Resolution, RouteBuilder, Router};
use crate::secure_headers;
use crate::sessions::SessionRegistry;
use crate::socket::{self, Acceptor, HttpType};
use crate::verb::Verb;

/// Routes under this prefix identify their target user in the first `<str>`
/// hole; the `ConfigureSelf` admission rule keys on it.
pub const ACCOUNT_ROUTE_PREFIX: &str = "/redfish/v1/AccountService/Accounts/";

/// Seam for Basic-authentication credential checks. The BMC's account
/// backend implements this; a verified pair yields the account's role.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Option<String>;
}

/// Errors surfaced by [`App::run`].
#[derive(Debug)]
pub enum ServeError {
    Bind(std::io::Error),
    Tls(std::io::Error),
    Serve(std::io::Error),
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServeError::Bind(e) => write!(f, "failed to bind listener: {e}"),
            ServeError::Tls(e) => write!(f, "failed to load TLS material: {e}"),
            ServeError::Serve(e) => write!(f, "server error: {e}"),
        }
    }
}

impl std::error::Error for ServeError {}

struct AppInner {
    router: Router,
    sessions: Arc<SessionRegistry>,
    roles: RoleMap,
    config: ServiceConfig,
    verifier: Option<Arc<dyn CredentialVerifier>>,
}

/// The assembled service.
pub struct App {
    inner: AppInner,
    shutdown: CancellationToken,
}

impl App {
    /// Build an app from configuration; loads any persisted sessions.
    pub fn new(config: ServiceConfig) -> App {
        let sessions = Arc::new(SessionRegistry::new(
            Duration::from_secs(config.session_idle_timeout_secs),
            config.max_sessions_per_user,
            Some(config.session_store_path()),
        ));
        sessions.load();
        let roles = RoleMap::from_config(&config.roles);
        App {
            inner: AppInner {
                router: Router::new(),
                sessions,
                roles,
                config,
                verifier: None,
            },
            shutdown: CancellationToken::new(),
        }
    }

    /// Start registering a route. Routes may be declared at any time before
    /// [`run`](App::run).
    pub fn route(&mut self, template: &str) -> RouteBuilder<'_> {
        self.inner.router.route(template)
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        self.inner.sessions.clone()
    }

    pub fn roles(&self) -> &RoleMap {
        &self.inner.roles
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn set_verifier(&mut self, verifier: Arc<dyn CredentialVerifier>) {
        self.inner.verifier = Some(verifier);
    }

    /// Finalise the route table.
    pub fn validate(&mut self) {
        self.inner.router.validate();
    }

    /// Registered templates, optionally narrowed by prefix. Service-root
    /// builders use this to enumerate what the server exposes.
    pub fn routes(&self, prefix: &str) -> Vec<String> {
        self.inner.router.routes(prefix)
    }

    /// Token cancelled when the service shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Assemble the axum router: our dispatch pipeline as the sole service,
    /// wrapped in the security-header and trace layers.
    pub fn into_router(mut self) -> axum::Router {
        if !self.inner.router.is_validated() {
            self.inner.router.validate();
        }
        let inner = Arc::new(self.inner);
        let handler = move |req: axum::extract::Request| {
            let inner = inner.clone();
            async move { dispatch(inner, req).await }
        };
        axum::Router::new()
            .fallback(handler)
            .layer(axum::middleware::from_fn(secure_headers::apply))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until shutdown: inherited sockets if the supervisor passed
    /// any, the configured bind address otherwise.
    pub async fn run(mut self) -> Result<(), ServeError> {
        self.validate();
        let token = self.shutdown.clone();
        let config = self.inner.config.clone();

        let mut acceptors = socket::inherited_acceptors();
        if acceptors.is_empty() {
            info!(addr = %config.bind_address, "no inherited sockets, binding directly");
            let listener =
                std::net::TcpListener::bind(&config.bind_address).map_err(ServeError::Bind)?;
            listener.set_nonblocking(true).map_err(ServeError::Bind)?;
            acceptors.push(Acceptor {
                listener,
                http_type: HttpType::Https,
                name: "configured".to_string(),
            });
        }

        let make = self
            .into_router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let handle = axum_server::Handle::new();
        tokio::spawn({
            let handle = handle.clone();
            let token = token.clone();
            async move {
                token.cancelled().await;
                handle.graceful_shutdown(Some(Duration::from_secs(5)));
            }
        });
        tokio::spawn(async move {
            shutdown_signal().await;
            token.cancel();
        });

        let tls = match RustlsConfig::from_pem_file(&config.tls_certificate, &config.tls_key).await
        {
            Ok(tls) => Some(tls),
            Err(e) => {
                warn!(error = %e, "TLS material unavailable");
                None
            }
        };

        let mut servers = Vec::new();
        for acceptor in acceptors {
            info!(name = %acceptor.name, kind = ?acceptor.http_type, "starting webserver on socket");
            let serve: std::pin::Pin<
                Box<dyn std::future::Future<Output = std::io::Result<()>> + Send>,
            > = match acceptor.http_type {
                HttpType::Http => Box::pin(
                    axum_server::from_tcp(acceptor.listener)
                        .handle(handle.clone())
                        .serve(make.clone()),
                ),
                // Hybrid sockets are served as TLS; plaintext sniffing is
                // the transport's concern.
                HttpType::Https | HttpType::Both => {
                    let tls = tls.clone().ok_or_else(|| {
                        ServeError::Tls(std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "TLS socket requested but certificate or key failed to load",
                        ))
                    })?;
                    Box::pin(
                        axum_server::from_tcp_rustls(acceptor.listener, tls)
                            .handle(handle.clone())
                            .serve(make.clone()),
                    )
                }
            };
            servers.push(serve);
        }

        futures_util::future::try_join_all(servers)
            .await
            .map_err(ServeError::Serve)?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

fn authenticate(inner: &AppInner, request: &mut Request) {
    if let Some(token) = request.header("x-auth-token") {
        if let Some(session) = inner.sessions.auth_token(token) {
            request.user_role = session.role.clone();
            request.session = Some(session);
            return;
        }
    }
    let Some(auth) = request.header("authorization") else {
        return;
    };
    let Some(encoded) = auth.strip_prefix("Basic ") else {
        return;
    };
    let Ok(decoded) = BASE64.decode(encoded) else {
        return;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return;
    };
    let Some((username, password)) = decoded.split_once(':') else {
        return;
    };
    if let Some(verifier) = &inner.verifier {
        if let Some(role) = verifier.verify(username, password) {
            let session =
                SessionRegistry::ephemeral(username, &role, request.peer().map(|p| p.ip()));
            request.user_role = role;
            request.session = Some(session);
        }
    }
}

fn allow_header(allow: &[Verb]) -> String {
    allow
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

async fn dispatch(inner: Arc<AppInner>, req: axum::extract::Request) -> axum::response::Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let (parts, body) = req.into_parts();
    let body = match axum::body::to_bytes(body, inner.config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let mut res = Response::new();
            res.set_status(StatusCode::PAYLOAD_TOO_LARGE);
            return finalize(res).await;
        }
    };
    let mut request = match Request::from_http(parts, body, peer) {
        Ok(request) => request,
        Err(e) => {
            let mut res = Response::new();
            res.set_status(match e {
                RequestError::UnsupportedMethod => StatusCode::METHOD_NOT_ALLOWED,
                RequestError::InvalidTarget => StatusCode::BAD_REQUEST,
            });
            return finalize(res).await;
        }
    };
    authenticate(&inner, &mut request);
    if !crate::parsing::acceptable(request.header("accept")) {
        let mut res = Response::new();
        error_messages::content_not_acceptable(&mut res);
        return finalize(res).await;
    }
    let verb = request.verb();

    match inner.router.resolve(request.path(), verb) {
        Resolution::NotFound => {
            let mut res = Response::new();
            let name = request.segments().last().cloned().unwrap_or_default();
            error_messages::resource_not_found(&mut res, "Resource", &name);
            finalize(res).await
        }
        Resolution::MethodNotAllowed { allow } => {
            let mut res = Response::new();
            res.set_header(ALLOW, &allow_header(&allow));
            // OPTIONS never needs an explicit route; answer from the table.
            if verb == Verb::Options {
                res.set_status(StatusCode::NO_CONTENT);
            } else {
                res.set_status(StatusCode::METHOD_NOT_ALLOWED);
            }
            finalize(res).await
        }
        Resolution::Found { entry, params } => {
            let mut have = if request.session.is_some() {
                inner.roles.privileges_for(&request.user_role)
            } else {
                PrivilegeSet::EMPTY
            };
            // Under the account collection the first <str> hole names the
            // target user, and ConfigureSelf only counts toward the caller's
            // own account. Elsewhere the router cannot resolve a target and
            // ownership checks belong to the handler.
            let target_user = if entry.template.starts_with(ACCOUNT_ROUTE_PREFIX) {
                params.first_str()
            } else {
                None
            };
            if let Some(target) = target_user {
                // Case-sensitive comparison.
                if request.username() != Some(target) {
                    have.remove(Privilege::ConfigureSelf);
                }
            }
            let admitted = match entry.privileges.evaluate(have) {
                Admission::Granted => true,
                Admission::GrantedIfSelf => {
                    target_user.is_some() && target_user == request.username()
                }
                Admission::Denied => false,
            };
            if !admitted {
                let mut res = Response::new();
                if request.session.is_none() {
                    error_messages::no_valid_session(&mut res);
                } else {
                    error_messages::insufficient_privilege(&mut res);
                }
                return finalize(res).await;
            }

            let handler = match (&entry.upgrade, request.is_upgrade()) {
                (Some(upgrade), true) => upgrade.clone(),
                _ => entry.handler.clone(),
            };
            let (tx, rx) = tokio::sync::oneshot::channel();
            let resp = AsyncResponse::new(move |res| {
                let _ = tx.send(res);
            });
            handler.call(request, resp, params).await;
            match rx.await {
                Ok(res) => finalize(res).await,
                Err(_) => {
                    // A handler replaced the completion without answering
                    // the connection.
                    error!("response completion was replaced without a reply");
                    let mut res = Response::new();
                    res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                    finalize(res).await
                }
            }
        }
    }
}

async fn finalize(mut res: Response) -> axum::response::Response {
    let status = res.status();
    let body = match res.take_attachment() {
        Some(Attachment::Bytes(bytes)) => Body::from(bytes),
        Some(Attachment::File(path)) => match tokio::fs::File::open(&path).await {
            Ok(file) => Body::from_stream(ReaderStream::new(file)),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to open attachment");
                let mut failed = Response::new();
                error_messages::internal_error(&mut failed);
                return Box::pin(finalize(failed)).await;
            }
        },
        Some(Attachment::Stream(stream)) => Body::from_stream(stream),
        None if res.json_value.is_null() => Body::empty(),
        None => {
            res.set_header(CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&res.json_value).unwrap_or_default())
        }
    };
    let headers = res.take_headers();
    let mut out = axum::response::Response::new(body);
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}
