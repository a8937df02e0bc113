// SPDX-FileCopyrightText: © 2025 Lexibridge Contributors
//
// SPDX-License-Identifier: MPL-2.0

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::{Stream, StreamExt};
use lexibridge_contracts::validate::{GET_TEXT_MAX_LEN, POST_TEXT_MAX_LEN};
use lexibridge_contracts::{
    BatchTranslatedResult, HealthResponse, LanguageDetectionResult, TokenCountResult,
    TranslatedResult,
};
use lexibridge_contracts::request::{BatchTranslationRequest, LanguageDetectionQuery, TranslationRequest};
use lexibridge_core::{Error, Result};
use lexibridge_engine::{BatchItem, CandleTranslator, StubTranslator, Translator};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnFailure, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::http_error::AppError;
use crate::language_detector::{LanguageDetector, ScriptLanguageDetector, StubLanguageDetector};
use crate::state::AppState;
use crate::{registry_client, telemetry};

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::online())
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    if !state.config.telemetry.enable {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    match telemetry::render_prometheus_text() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render Prometheus metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// Detects the input text's language. With the default
/// [`crate::language_detector::ScriptLanguageDetector`], languages sharing
/// the Latin script (e.g. Spanish, French, German) are not disambiguated
/// and are all reported as `eng_Latn`.
async fn language_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LanguageDetectionQuery>,
) -> std::result::Result<Json<LanguageDetectionResult>, AppError> {
    query.validate()?;
    let (language, confidence) = state
        .language_detector
        .detect(
            &query.text,
            query.fast_model_confidence_threshold,
            query.accurate_model_confidence_threshold,
        )
        .await?;
    Ok(Json(LanguageDetectionResult { language, confidence }))
}

async fn translate_unary(
    state: &AppState,
    request: &TranslationRequest,
    max_text_len: usize,
) -> Result<TranslatedResult> {
    request.validate(max_text_len)?;
    let result = state
        .translator
        .translate(&request.text, &request.source, &request.target, request.min_length_percentage)
        .await?;
    Ok(TranslatedResult { result })
}

async fn translate_get_handler(
    State(state): State<Arc<AppState>>,
    Query(request): Query<TranslationRequest>,
) -> std::result::Result<Json<TranslatedResult>, AppError> {
    Ok(Json(translate_unary(&state, &request, GET_TEXT_MAX_LEN).await?))
}

async fn translate_post_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TranslationRequest>,
) -> std::result::Result<Json<TranslatedResult>, AppError> {
    Ok(Json(translate_unary(&state, &request, POST_TEXT_MAX_LEN).await?))
}

async fn translate_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<BatchTranslationRequest>,
) -> std::result::Result<Json<BatchTranslatedResult>, AppError> {
    batch.validate(state.config.translator_batch_max_size, POST_TEXT_MAX_LEN)?;

    let items = batch
        .translations
        .into_iter()
        .map(|item| BatchItem {
            text: item.text,
            source: item.source,
            target: item.target,
            min_length_percentage: item.min_length_percentage,
        })
        .collect();

    let results = state.translator.translate_batch(items).await?;
    let results = results.into_iter().map(|result| TranslatedResult { result }).collect();
    Ok(Json(BatchTranslatedResult { results }))
}

async fn tokens_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokensQuery>,
) -> std::result::Result<Json<TokenCountResult>, AppError> {
    let length = state.translator.count_tokens(&query.text).await?;
    Ok(Json(TokenCountResult { length }))
}

#[derive(Debug, Deserialize)]
struct TokensQuery {
    text: String,
}

fn default_min_length_percentage() -> f64 {
    0.8
}

fn default_source() -> lexibridge_core::Language {
    lexibridge_core::Language::default_source()
}

fn default_target() -> lexibridge_core::Language {
    lexibridge_core::Language::default_target()
}

// `serde_urlencoded` (used by axum's `Query` extractor) does not support
// `#[serde(flatten)]`, so the translation fields are duplicated here
// rather than embedding `TranslationRequest` directly.
#[derive(Debug, Deserialize)]
struct StreamQuery {
    text: String,
    #[serde(default = "default_source")]
    source: lexibridge_core::Language,
    #[serde(default = "default_target")]
    target: lexibridge_core::Language,
    #[serde(default = "default_min_length_percentage")]
    min_length_percentage: f64,
    event_type: Option<String>,
}

async fn translate_stream_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Error>>>, AppError> {
    let request = TranslationRequest {
        text: query.text,
        source: query.source,
        target: query.target,
        min_length_percentage: query.min_length_percentage,
    };
    request.validate(GET_TEXT_MAX_LEN)?;

    let (chunks, done) = state
        .translator
        .translate_stream(&request.text, &request.source, &request.target, request.min_length_percentage)
        .await?;

    tokio::spawn(async move {
        if let Ok(Err(e)) = done.await {
            warn!(error = %e, "Streaming translation failed after frames were sent");
        }
    });

    let event_type = query.event_type;
    let stream = ReceiverStream::new(chunks).map({
        let event_type = event_type.clone();
        move |chunk| {
            let event = Event::default().data(chunk);
            let event = match &event_type {
                Some(name) => event.event(name.clone()),
                None => event,
            };
            Ok(event)
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
struct LifecycleQuery {
    #[serde(default)]
    keep_cache: bool,
    #[serde(default)]
    to_cpu: bool,
}

fn require_bearer(headers: &HeaderMap, config: &Config) -> std::result::Result<(), AppError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
        .unwrap_or("");

    if lexibridge_core::secret_guard::token_matches(&config.auth_token, presented) {
        Ok(())
    } else {
        Err(AppError(Error::Unauthorized))
    }
}

async fn load_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LifecycleQuery>,
) -> std::result::Result<StatusCode, AppError> {
    require_bearer(&headers, &state.config)?;
    let outcome = state.translator.load(query.keep_cache).await?;
    Ok(outcome_status(outcome))
}

async fn unload_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LifecycleQuery>,
) -> std::result::Result<StatusCode, AppError> {
    require_bearer(&headers, &state.config)?;
    let outcome = state.translator.unload(query.to_cpu).await?;
    Ok(outcome_status(outcome))
}

fn outcome_status(outcome: lexibridge_engine::TransitionOutcome) -> StatusCode {
    match outcome {
        lexibridge_engine::TransitionOutcome::Changed => StatusCode::NO_CONTENT,
        lexibridge_engine::TransitionOutcome::Unchanged => StatusCode::NOT_MODIFIED,
    }
}

static HTTP_METRICS: OnceLock<(
    opentelemetry::metrics::Counter<u64>,
    opentelemetry::metrics::Histogram<f64>,
)> = OnceLock::new();

async fn metrics_middleware(req: axum::extract::Request, next: Next) -> Response {
    let start = Instant::now();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_string(), |matched| matched.as_str().to_string());
    let method = req.method().clone();

    let response = next.run(req).await;

    let (counter, histogram) = HTTP_METRICS.get_or_init(|| {
        let meter = opentelemetry::global::meter("lexibridge_http");
        (
            meter.u64_counter("http_requests_total").build(),
            meter.f64_histogram("http_request_duration_seconds").build(),
        )
    });

    let status_class = format!("{}xx", response.status().as_u16() / 100);
    let attributes = [
        opentelemetry::KeyValue::new("method", method.to_string()),
        opentelemetry::KeyValue::new("route", path),
        opentelemetry::KeyValue::new("status", status_class),
    ];
    counter.add(1, &attributes);
    histogram.record(start.elapsed().as_secs_f64(), &attributes);

    response
}

fn origin_matches_pattern(origin: &str, pattern: &str) -> bool {
    pattern == "*" || origin == pattern
}

fn create_cors_layer(config: &Config) -> CorsLayer {
    let mut methods = Vec::new();
    if config.access_control_allow_method_get {
        methods.push(Method::GET);
    }
    if config.access_control_allow_method_post {
        methods.push(Method::POST);
    }
    if config.access_control_allow_method_put {
        methods.push(Method::PUT);
    }
    if config.access_control_allow_method_delete {
        methods.push(Method::DELETE);
    }
    if config.access_control_allow_method_patch {
        methods.push(Method::PATCH);
    }
    if config.access_control_allow_method_head {
        methods.push(Method::HEAD);
    }
    if config.access_control_allow_method_options {
        methods.push(Method::OPTIONS);
    }
    if config.access_control_allow_method_trace {
        methods.push(Method::TRACE);
    }

    let mut layer = CorsLayer::new().allow_methods(methods);

    layer = if config.access_control_allow_origin == "*" {
        layer.allow_origin(Any)
    } else {
        let pattern = config.access_control_allow_origin.clone();
        layer.allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().is_ok_and(|origin| origin_matches_pattern(origin, &pattern))
        }))
    };

    layer = match &config.access_control_allow_headers {
        Some(headers) => {
            let parsed: Vec<_> = headers
                .split(',')
                .filter_map(|h| h.trim().parse().ok())
                .collect();
            layer.allow_headers(parsed)
        },
        None => layer.allow_headers(Any),
    };

    layer = match &config.access_control_expose_headers {
        Some(headers) => {
            let parsed: Vec<_> = headers
                .split(',')
                .filter_map(|h| h.trim().parse().ok())
                .collect();
            layer.expose_headers(parsed)
        },
        None => layer.expose_headers(Any),
    };

    if config.access_control_allow_credentials {
        layer = layer.allow_credentials(true);
    }

    layer
}

async fn build_translator(config: &Config) -> Result<Arc<dyn Translator>> {
    if config.stub_translator {
        info!("stub_translator enabled, using fixed-output translator");
        return Ok(Arc::new(StubTranslator::new()));
    }

    let translator = CandleTranslator::bootstrap(
        config.effective_translator_repository(),
        config.use_cuda,
        config.translator_threads,
    )
    .await?;
    Ok(Arc::new(translator))
}

fn build_language_detector(config: &Config) -> Arc<dyn LanguageDetector> {
    if config.stub_language_detector {
        Arc::new(StubLanguageDetector::new())
    } else {
        Arc::new(ScriptLanguageDetector::new())
    }
}

/// Builds the router and application state. The model is resolved and
/// loaded (state `LOADED_ON_DEVICE`) before this function returns.
///
/// # Errors
///
/// Returns an error if the translator cannot be bootstrapped (model not
/// found, download failed, or decoder load failed).
pub async fn create_app(config: Config) -> Result<(Router, Arc<AppState>)> {
    let translator = build_translator(&config).await?;
    let language_detector = build_language_detector(&config);
    let app_id = format!("lexibridge-{}", uuid::Uuid::new_v4());

    let state = Arc::new(AppState {
        translator,
        language_detector,
        config: Arc::new(config.clone()),
        app_id,
    });

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/language", get(language_handler))
        .route(
            "/translator",
            get(translate_get_handler)
                .post(translate_post_handler)
                .put(load_handler)
                .delete(unload_handler),
        )
        .route("/translator/batch", axum::routing::post(translate_batch_handler))
        .route("/translator/stream", get(translate_stream_handler))
        .route("/translator/tokens", get(tokens_handler));

    let root_path = config.server_root_path.trim_end_matches('/');
    let router = if root_path.is_empty() {
        router
    } else {
        Router::new().nest(root_path, router)
    };

    let cors_layer = create_cors_layer(&config);

    let router = router
        .with_state(Arc::clone(&state))
        .layer(ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let route = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map_or_else(|| request.uri().path(), |matched| matched.as_str());
                    tracing::info_span!("http_request", http_method = %request.method(), http_route = %route)
                })
                .on_response(DefaultOnResponse::new().level(tracing::Level::DEBUG))
                .on_failure(DefaultOnFailure::new().level(tracing::Level::WARN)),
        ))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors_layer);

    Ok((router, state))
}

/// Starts the HTTP server: builds the router, optionally self-registers
/// with a service registry, serves until a shutdown signal arrives, then
/// deregisters.
///
/// # Errors
///
/// Returns an error if the translator cannot be bootstrapped, the bind
/// address is invalid, or the server encounters a runtime error.
pub async fn start_server(config: &Config) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (app, state) = create_app(config.clone()).await.map_err(|e| -> Box<dyn std::error::Error> {
        format!("failed to initialize application state: {e}").into()
    })?;

    let addr: SocketAddr = ([0, 0, 0, 0], config.server_port).into();

    registry_client::register(config, &state.app_id).await;

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {
                info!("Received CTRL-C signal, initiating graceful shutdown");
            },
            () = terminate => {
                info!("Received SIGTERM signal, initiating graceful shutdown");
            },
        }
    };

    info!(address = %addr, "Starting HTTP API server");

    let handle = axum_server::Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal.await;
            handle.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
        }
    });

    let result = axum_server::bind(addr).handle(handle).serve(app.into_make_service()).await;

    registry_client::deregister(config, &state.app_id).await;

    result.map_err(|e| {
        error!(error = %e, "API server error");
        e.into()
    })
}

