//! HTTP console
//!
//! Browser-facing routes over the console facade:
//! - `/` redirects to the resolved library version
//! - `/{version}` lists providers and their authorization state
//! - `/{version}/{provider}/authorize` starts or completes a handshake
//! - `/{version}/{provider}` renders the API console and dispatches calls
//! - `/{version}/clearAllTokens` resets every session of a version

pub mod response;
pub mod session;
pub mod template;

use self::response::{DispatchView, parse_params};
use self::session::{SessionId, SessionStore, cookie_value, set_version_cookie};
use self::template::TemplateRenderer;
use crate::auth::{AuthOutcome, CallbackKind, CallbackParams};
use crate::config::{Config, HttpConfig};
use crate::console::Console;
use crate::constants::{AUTHORIZE_SEGMENT, CLEAR_ALL_TOKENS_SEGMENT, VERSION_COOKIE};
use crate::version::VersionTag;
use crate::{ConsoleError, Result};
use axum::{
    Extension, Form, Router,
    extract::{Json, Path as AxumPath, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    LatencyUnit,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    console: Arc<Console>,
    sessions: Arc<SessionStore>,
    templates: Arc<TemplateRenderer>,
    http: Arc<HttpConfig>,
}

impl AppState {
    pub fn new(console: Arc<Console>, http: HttpConfig) -> Result<Self> {
        let ttl = chrono::Duration::try_hours(http.session_ttl_hours)
            .ok_or_else(|| ConsoleError::config("http.sessionTtlHours is out of range"))?;
        Ok(Self {
            console,
            sessions: Arc::new(SessionStore::new(ttl)),
            templates: Arc::new(TemplateRenderer::new()?),
            http: Arc::new(http),
        })
    }

    pub fn console(&self) -> &Arc<Console> {
        &self.console
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Whether cookies should carry the Secure flag for this request
    pub fn is_secure(&self, headers: &HeaderMap) -> bool {
        self.http.secure
            || (self.http.trust_proxy
                && headers
                    .get("x-forwarded-proto")
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|proto| proto.eq_ignore_ascii_case("https")))
    }
}

/// Error type for HTTP handlers
#[derive(Debug)]
pub struct AppError(ConsoleError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            ConsoleError::ProviderNotFound(_)
            | ConsoleError::VersionNotInstalled(_)
            | ConsoleError::InvalidVersion(_) => (StatusCode::NOT_FOUND, "not_found"),
            ConsoleError::NoVersionsAvailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "no_versions")
            }
            ConsoleError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            e if e.is_authorization() => (StatusCode::UNAUTHORIZED, "auth_error"),
            ConsoleError::UpstreamRequestFailed { .. } => {
                (StatusCode::BAD_GATEWAY, "upstream_error")
            }
            _ => {
                // Log full error details internally
                tracing::error!("Internal error: {:?}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An internal error occurred".to_string()
        } else {
            self.0.to_string()
        };

        tracing::debug!(
            error_type = error_type,
            status = %status,
            message = %message,
            "HTTP request error response"
        );

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "status": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<ConsoleError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

type HandlerResult = std::result::Result<Response, AppError>;

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let console = Arc::new(Console::from_config(&config)?);
    let state = AppState::new(console.clone(), config.http.clone())?;
    state
        .sessions
        .clone()
        .spawn_cleanup(console.store().clone());

    let installed = console.installed_versions()?;
    if installed.is_empty() {
        tracing::warn!(
            dir = %console.layout().releases_dir().display(),
            "No library versions installed; run `console mirror` first"
        );
    }

    let app = build_router(state);

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let socket_addr: SocketAddr = addr
        .parse()
        .map_err(|e| ConsoleError::config(format!("Invalid address {}: {}", addr, e)))?;

    tracing::info!(
        versions = installed.len(),
        providers = config.providers.len(),
        "Starting HTTP server on {}",
        socket_addr
    );

    let listener = tokio::net::TcpListener::bind(socket_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConsoleError::config(format!("Server error: {}", e)))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down HTTP server");
}

/// Build the router with all endpoints
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/{version}", get(overview_handler))
        .route(
            &format!("/{{version}}/{}", CLEAR_ALL_TOKENS_SEGMENT),
            get(clear_all_tokens_handler),
        )
        .route(
            "/{version}/{provider}",
            get(provider_handler).post(dispatch_handler),
        )
        .route(
            &format!("/{{version}}/{{provider}}/{}", AUTHORIZE_SEGMENT),
            get(authorize_handler),
        )
        .layer(
            ServiceBuilder::new()
                // Tracing layer for request/response logging
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new())
                        .on_response(
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .latency_unit(LatencyUnit::Micros),
                        ),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    session::session_middleware,
                )),
        )
        .with_state(state)
}

/// The version a request runs against, or a redirect to it
enum Resolved {
    Version(VersionTag),
    Redirect(Response),
}

/// Resolve the first path segment
///
/// A segment outside the version grammar is treated as part of an
/// unversioned path and redirected under the resolved version.
fn resolve_segment(state: &AppState, headers: &HeaderMap, segment: &str, uri: &Uri) -> Result<Resolved> {
    let cookie = cookie_value(headers, VERSION_COOKIE);
    let version = state.console.resolve_version(Some(segment), cookie)?;

    if version.as_str() == segment {
        return Ok(Resolved::Version(version));
    }

    let target = format!("/{}{}", version, uri.path());
    Ok(Resolved::Redirect(Redirect::to(&target).into_response()))
}

/// Pin the browser to `version`
fn with_version_cookie(state: &AppState, headers: &HeaderMap, version: &VersionTag, mut response: Response) -> Response {
    if let Ok(value) = HeaderValue::from_str(&set_version_cookie(version, state.is_secure(headers))) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

/// Canonical name of a provider in this version
///
/// Redirects are built from this name, never from the raw path segment.
fn provider_name(console: &crate::console::VersionConsole<'_>, raw: &str) -> Result<String> {
    console
        .registry()
        .descriptor(raw)
        .map(|d| d.name.clone())
        .ok_or_else(|| ConsoleError::ProviderNotFound(raw.to_string()))
}

fn authorize_path(version: &VersionTag, provider: &str) -> String {
    format!("/{}/{}/{}", version, provider, AUTHORIZE_SEGMENT)
}

async fn root_handler(State(state): State<AppState>, headers: HeaderMap) -> HandlerResult {
    let cookie = cookie_value(&headers, VERSION_COOKIE);
    let version = state.console.resolve_version(None, cookie)?;
    Ok(Redirect::to(&format!("/{}", version)).into_response())
}

async fn overview_handler(
    State(state): State<AppState>,
    AxumPath(segment): AxumPath<String>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    headers: HeaderMap,
    uri: Uri,
) -> HandlerResult {
    let version = match resolve_segment(&state, &headers, &segment, &uri)? {
        Resolved::Version(version) => version,
        Resolved::Redirect(response) => return Ok(response),
    };

    let console = state.console.open(&version)?;
    let providers = console.overview(&session_id).await?;
    let versions: Vec<String> = state
        .console
        .installed_versions()?
        .into_iter()
        .map(String::from)
        .collect();

    let html = state.templates.render(
        "overview.html",
        json!({
            "version": version.as_str(),
            "versions": versions,
            "providers": providers,
        }),
    )?;

    Ok(with_version_cookie(&state, &headers, &version, Html(html).into_response()))
}

async fn clear_all_tokens_handler(
    State(state): State<AppState>,
    AxumPath(segment): AxumPath<String>,
    headers: HeaderMap,
    uri: Uri,
) -> HandlerResult {
    let version = match resolve_segment(&state, &headers, &segment, &uri)? {
        Resolved::Version(version) => version,
        Resolved::Redirect(response) => return Ok(response),
    };

    state.console.open(&version)?.clear_all_tokens().await?;
    let response = Redirect::to(&format!("/{}", version)).into_response();
    Ok(with_version_cookie(&state, &headers, &version, response))
}

async fn authorize_handler(
    State(state): State<AppState>,
    AxumPath((segment, provider)): AxumPath<(String, String)>,
    Query(params): Query<CallbackParams>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    headers: HeaderMap,
    uri: Uri,
) -> HandlerResult {
    let version = match resolve_segment(&state, &headers, &segment, &uri)? {
        Resolved::Version(version) => version,
        Resolved::Redirect(response) => return Ok(response),
    };
    let console = state.console.open(&version)?;
    let provider = provider_name(&console, &provider)?;

    let response = match console.authorize(&session_id, &provider, &params).await {
        Ok(AuthOutcome::Redirect(url)) => Redirect::to(&url).into_response(),
        Ok(AuthOutcome::Authenticated) => {
            Redirect::to(&format!("/{}/{}", version, provider)).into_response()
        }
        // A failed callback goes back to a fresh handshake; a failed start is reported
        Err(e) if e.is_authorization() && !matches!(params.kind(), CallbackKind::Start) => {
            tracing::debug!(provider = %provider, error = %e, "Redirecting to re-authorize");
            Redirect::to(&authorize_path(&version, &provider)).into_response()
        }
        Err(e) => return Err(e.into()),
    };

    Ok(with_version_cookie(&state, &headers, &version, response))
}

/// Console form fields
#[derive(Debug, Default, Deserialize)]
struct DispatchForm {
    #[serde(default)]
    url: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    params: String,
}

async fn provider_handler(
    State(state): State<AppState>,
    AxumPath((segment, provider)): AxumPath<(String, String)>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    headers: HeaderMap,
    uri: Uri,
) -> HandlerResult {
    let version = match resolve_segment(&state, &headers, &segment, &uri)? {
        Resolved::Version(version) => version,
        Resolved::Redirect(response) => return Ok(response),
    };
    let console = state.console.open(&version)?;
    let provider = provider_name(&console, &provider)?;

    let response = if console
        .provider_state(&session_id, &provider)
        .await?
        .is_authenticated()
    {
        let form = DispatchForm {
            method: "GET".to_string(),
            ..Default::default()
        };
        render_provider(&state, &console, &provider, &form, None)?
    } else {
        Redirect::to(&authorize_path(&version, &provider)).into_response()
    };

    Ok(with_version_cookie(&state, &headers, &version, response))
}

async fn dispatch_handler(
    State(state): State<AppState>,
    AxumPath((segment, provider)): AxumPath<(String, String)>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    headers: HeaderMap,
    uri: Uri,
    Form(form): Form<DispatchForm>,
) -> HandlerResult {
    let version = match resolve_segment(&state, &headers, &segment, &uri)? {
        Resolved::Version(version) => version,
        Resolved::Redirect(response) => return Ok(response),
    };
    let console = state.console.open(&version)?;
    let provider = provider_name(&console, &provider)?;

    let result = console
        .dispatch(
            &session_id,
            &provider,
            &form.method,
            &form.url,
            parse_params(&form.params),
        )
        .await;

    let response = match result {
        Ok(result) => {
            let view = DispatchView::from_result(&result);
            render_provider(&state, &console, &provider, &form, Some(view))?
        }
        Err(ConsoleError::NotAuthenticated { .. }) => {
            Redirect::to(&authorize_path(&version, &provider)).into_response()
        }
        Err(e @ (ConsoleError::UpstreamRequestFailed { .. } | ConsoleError::Validation(_))) => {
            let view = DispatchView::from_error(&e);
            render_provider(&state, &console, &provider, &form, Some(view))?
        }
        Err(e) => return Err(e.into()),
    };

    Ok(with_version_cookie(&state, &headers, &version, response))
}

fn render_provider(
    state: &AppState,
    console: &crate::console::VersionConsole<'_>,
    provider: &str,
    form: &DispatchForm,
    result: Option<DispatchView>,
) -> Result<Response> {
    let descriptor = console
        .registry()
        .descriptor(provider)
        .ok_or_else(|| ConsoleError::ProviderNotFound(provider.to_string()))?;

    let html = state.templates.render(
        "provider.html",
        json!({
            "version": console.version().as_str(),
            "provider": {
                "name": descriptor.name,
                "display_name": descriptor.display_name,
                "protocol": descriptor.protocol_version.to_string(),
                "scopes": descriptor.scopes,
            },
            "form": {
                "method": form.method.to_ascii_uppercase(),
                "url": form.url,
                "params": form.params,
            },
            "result": result,
        }),
    )?;
    Ok(Html(html).into_response())
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn metrics_handler() -> std::result::Result<(StatusCode, String), AppError> {
    let metrics = crate::telemetry::get_metrics()?;
    Ok((StatusCode::OK, metrics))
}

#[cfg(test)]
mod response_test;
#[cfg(test)]
mod session_test;
#[cfg(test)]
mod template_test;
