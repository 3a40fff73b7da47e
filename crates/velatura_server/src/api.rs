//! HTTP gateway in front of Ollama.

use crate::client::OllamaClient;
use crate::config::{AllowedOrigins, GatewayConfig};
use crate::stream::cleaned_text;
use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Deserializer, de};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};
use velatura_core::{GenerateRequest, GenerateResponse, strip_markup};
use velatura_error::{ConfigError, GatewayError, GatewayErrorKind, ServerError, VelaturaResult};

/// API server state.
#[derive(Clone)]
pub struct ApiState {
    /// Upstream client.
    pub client: OllamaClient,
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
}

impl ApiState {
    /// Creates a new API state.
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: OllamaClient::new(config.upstream_base_url().clone()),
            config: Arc::new(config),
        }
    }
}

/// Query parameters for `POST /api/generate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateParams {
    /// Stream the answer as plain-text chunks; overrides the body field
    #[serde(default, deserialize_with = "lenient_bool")]
    pub stream: Option<bool>,
}

/// Parses a query flag the way HTML forms and older clients spell it.
///
/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` and their one-letter
/// forms, ignoring case.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "y" | "t" => Some(true),
        "false" | "0" | "no" | "off" | "n" | "f" => Some(false),
        _ => None,
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_flag(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid boolean: {}", raw))),
    }
}

/// Gateway failure rendered as `{"detail": …}`.
#[derive(Debug)]
pub struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let (status, detail) = if kind.is_upstream() {
            (
                StatusCode::BAD_GATEWAY,
                format!("Ollama request failed: {}", kind),
            )
        } else {
            let detail = match kind {
                GatewayErrorKind::Validation(message) => message.clone(),
                other => other.to_string(),
            };
            (StatusCode::UNPROCESSABLE_ENTITY, detail)
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

/// Creates the API router.
///
/// # Errors
///
/// Returns an error if an allowed origin is not a valid header value.
pub fn create_router(config: GatewayConfig) -> Result<Router, ConfigError> {
    let cors = cors_layer(config.allowed_origins())?;
    let state = ApiState::new(config);

    Ok(Router::new()
        .route("/health", get(health_check))
        .route("/api/generate", post(generate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Builds the CORS policy for the configured origins.
///
/// Credentials are only allowed for an explicit origin list; browsers reject
/// credentialed requests against a wildcard.
pub fn cors_layer(origins: &AllowedOrigins) -> Result<CorsLayer, ConfigError> {
    match origins {
        AllowedOrigins::Any => Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)),
        AllowedOrigins::List(list) => {
            let values = list
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .map_err(|_| ConfigError::new(format!("Invalid CORS origin: {}", origin)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CorsLayer::new()
                .allow_origin(AllowOrigin::list(values))
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true))
        }
    }
}

/// Binds the configured address and serves until Ctrl+C.
pub async fn serve(config: GatewayConfig) -> VelaturaResult<()> {
    let addr = *config.bind_addr();
    let upstream = config.upstream_base_url().clone();
    let router = create_router(config)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(ServerError::from)?;
    info!(addr = %addr, upstream = %upstream, "Gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("Shutting down gateway");
        })
        .await
        .map_err(ServerError::from)?;

    Ok(())
}

/// Health check endpoint.
#[instrument(skip_all)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Forwards a generation request to Ollama and strips reasoning markup.
#[instrument(skip_all, fields(model = ?request.model, stream = ?params.stream))]
async fn generate(
    State(state): State<ApiState>,
    Query(params): Query<GenerateParams>,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;

    let stream = params.stream.or(request.stream).unwrap_or(true);
    let payload = request.to_upstream(state.config.default_model(), stream);
    debug!(model = %payload.model(), stream, "Forwarding to Ollama");

    if stream {
        let response = state.client.generate(&payload).await?;
        let body = Body::from_stream(cleaned_text(response.bytes_stream()));
        return Ok((
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response());
    }

    let fragment = state.client.generate_once(&payload).await?;
    let answer = GenerateResponse {
        model: fragment.model,
        response: strip_markup(&fragment.response),
        total_duration: fragment.total_duration,
    };
    Ok(Json(answer).into_response())
}
