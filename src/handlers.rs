// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay.
//!
//! The submission handler runs its gates in a fixed order and stops at the
//! first failure:
//!
//! method → SMTP config → rate limit → honeypot → timing → fields → send

use crate::clock::Clock;
use crate::config::{Config, SmtpConfigLoader};
use crate::contact::{compose_mailto, summary_lines, ContactQuery, ContactView, MAILTO_SUBJECT};
use crate::diagnostics::record_failure;
use crate::error::SubmitError;
use crate::limiter::{RateLimitResult, RateLimiter};
use crate::mailer::{compose, Mailer};
use crate::metrics::Metrics;
use crate::render::{render_contact, Fallback};
use crate::validator::{RawSubmission, SubmissionValidator};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub smtp: SmtpConfigLoader,
    pub limiter: RateLimiter,
    pub validator: SubmissionValidator,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Metrics,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Routes for the relay, with the static site as fallback.
pub fn router(state: Arc<AppState>) -> Router {
    let site = ServeDir::new(&state.config.site_root);

    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/kontakt", get(contact_page))
        .route("/kontakt.html", get(contact_page))
        .route("/send", any(submit))
        .route("/send.php", any(submit))
        .fallback_service(site)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-relay",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Contact page: offer pre-fill, success panel and the timing stamp.
pub async fn contact_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ContactQuery>,
) -> Html<String> {
    let view = ContactView::from_query(&query, state.clock.now());
    debug!(sent = view.sent, offer = ?query.angebot, "Rendering contact page");
    Html(render_contact(&view, "send"))
}

/// Contact form submission.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    body: Bytes,
) -> Response {
    match process(&state, addr.ip(), &method, &body).await {
        Ok(()) => {
            state.metrics.record("sent");
            (
                StatusCode::FOUND,
                [(header::LOCATION, state.config.mail.success_location.clone())],
            )
                .into_response()
        }
        Err(err) => reject(&state, err),
    }
}

async fn process(
    state: &AppState,
    ip: IpAddr,
    method: &Method,
    body: &[u8],
) -> Result<(), SubmitError> {
    if method != Method::POST {
        return Err(SubmitError::MethodNotAllowed(method.clone()));
    }

    let settings = state.smtp.load()?;

    let now = state.clock.now();
    match state.limiter.check_ip(ip, now).await? {
        RateLimitResult::Allowed { remaining, .. } => {
            debug!(remaining, "Submission within rate limit");
        }
        RateLimitResult::Limited { retry_after } => {
            return Err(SubmitError::RateLimited { retry_after });
        }
    }

    let raw: RawSubmission = serde_urlencoded::from_bytes(body)
        .map_err(|_| SubmitError::InvalidSubmission("undecodable form body"))?;

    state.validator.check_honeypot(&raw)?;
    state.validator.check_timing(&raw, now)?;
    let submission = state.validator.validate(&raw)?;

    let mail = compose(&submission, &state.config.mail.subject);
    state
        .mailer
        .send(&settings, &mail)
        .await
        .map_err(|source| SubmitError::Transport {
            source,
            summary: summary_lines(&raw).join("\n"),
        })?;

    info!(
        headcount = %submission.headcount,
        occasion = %submission.occasion,
        "Contact request relayed"
    );
    Ok(())
}

fn reject(state: &AppState, err: SubmitError) -> Response {
    record_failure(&err);
    state.metrics.record(err.code());

    let inbox = &state.config.mail.fallback_inbox;
    let body = match &err {
        SubmitError::Transport { summary, .. } => Some(summary.as_str()),
        _ => None,
    };
    let mut page = err.page();
    if err.is_server_fault() || matches!(err, SubmitError::RateLimited { .. }) {
        page = page.with_fallback(Fallback {
            inbox: inbox.clone(),
            href: compose_mailto(inbox, MAILTO_SUBJECT, body),
        });
    }

    let mut response = page.into_response();
    match &err {
        SubmitError::MethodNotAllowed(_) => {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        SubmitError::RateLimited { retry_after } => {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
        }
        _ => {}
    }
    response
}
