// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay Service
//!
//! Serves the static site, renders the contact page and relays contact
//! form submissions to the business inbox over SMTP.
//!
//! ## Configuration
//!
//! Service settings come from environment variables (a `.env` file is
//! read first when present):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `SITE_ROOT`: Static site directory (default: ./public)
//! - `SMTP_CONFIG_PATHS`: Candidate SMTP config files
//! - `RATE_LIMIT_MAX`: Submissions per IP and window (default: 5)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 3600)
//! - `RATE_LIMIT_BACKEND`: `file` (default) or `memory`
//! - `FAILURE_LOG_DIR`: Daily failure log files (default: ./logs)
//!
//! SMTP credentials live in a TOML file outside the site root, see
//! [`contact_relay::config::SmtpConfigLoader`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_relay::{
    clock::{Clock, SystemClock},
    config::{Config, FailureLogConfig, SmtpConfigLoader, StoreBackend},
    diagnostics::{failure_appender, failure_layer},
    handlers::{router, AppState},
    limiter::RateLimiter,
    mailer::SmtpMailer,
    metrics::Metrics,
    validator::SubmissionValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // Failure events also go to a rotated file; the guard flushes it on exit.
    let (failure_writer, _failure_guard) =
        tracing_appender::non_blocking(failure_appender(&FailureLogConfig::from_env())?);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            fmt::layer().json().with_filter(
                EnvFilter::builder()
                    .with_default_directive(Level::INFO.into())
                    .from_env_lossy(),
            ),
        )
        .with(failure_layer(failure_writer))
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        site_root = %config.site_root.display(),
        max_submissions = config.rate_limit.max_submissions,
        window_secs = config.rate_limit.window_secs,
        backend = ?config.rate_limit.backend,
        failure_log = %config.failure_log.dir.display(),
        "Starting contact relay"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = Arc::new(AppState {
        smtp: SmtpConfigLoader::new(config.smtp_config_paths.clone()),
        limiter: RateLimiter::new(config.rate_limit.clone()),
        validator: SubmissionValidator::new(config.validation.clone()),
        mailer: Arc::new(SmtpMailer::new(Duration::from_secs(config.mail.timeout_secs))),
        clock: clock.clone(),
        metrics: Metrics::new()?,
        config: config.clone(),
    });

    // The file backend prunes on access; only the memory backend needs sweeping.
    if config.rate_limit.backend == StoreBackend::Memory {
        let cleanup_state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                cleanup_state.limiter.cleanup(clock.now()).await;
            }
        });
    }

    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
