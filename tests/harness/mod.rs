// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for driving the contact relay over HTTP.
//!
//! Each [`TestApp`] gets its own scratch directory for the SMTP config,
//! rate-limit records and failure log, a manual clock and a mailer that
//! records instead of sending. Failure events are captured by a
//! thread-local subscriber, which covers `#[tokio::test]`'s current-thread
//! runtime.

#![allow(dead_code)]

pub mod generators;
pub mod mailers;

use axum::{
    body::{to_bytes, Body},
    extract::connect_info::MockConnectInfo,
    http::{header, Request, Response},
    Router,
};
use contact_relay::{
    clock::{Clock, ManualClock},
    config::{Config, FailureLogConfig, RateLimitConfig, SmtpConfigLoader, StoreBackend},
    diagnostics::failure_layer,
    handlers::{router, AppState},
    limiter::{client_key, FileStore, RateLimiter},
    mailer::Mailer,
    metrics::Metrics,
    validator::SubmissionValidator,
};
use mailers::{FailingMailer, RecordingMailer};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::prelude::*;

pub const START: i64 = 1_790_000_000;

pub const SMTP_CONFIG: &str = r#"
smtp_host = "smtp.example.org"
smtp_port = 587
smtp_secure = "tls"
smtp_user = "relay@example.org"
smtp_pass = "correct horse battery staple"
mail_from = "website@example.org"
mail_to = "inbox@example.org"
"#;

/// Knobs for a test app.
pub struct TestOptions {
    /// Contents of the SMTP config file, `None` to leave it out
    pub smtp_config: Option<&'static str>,
    pub backend: StoreBackend,
    pub max_submissions: u32,
    pub window_secs: u64,
    pub failing_mailer: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            smtp_config: Some(SMTP_CONFIG),
            backend: StoreBackend::File,
            max_submissions: 5,
            window_secs: 3600,
            failing_mailer: false,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<RecordingMailer>,
    pub dir: PathBuf,
    _failures: DefaultGuard,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_options(TestOptions::default())
    }

    pub fn with_options(options: TestOptions) -> Self {
        let dir = std::env::temp_dir().join(format!("contact-relay-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("config")).unwrap();

        let smtp_path = dir.join("config").join("smtp-config.toml");
        if let Some(contents) = options.smtp_config {
            std::fs::write(&smtp_path, contents).unwrap();
        }

        let config = Config {
            site_root: dir.join("public"),
            smtp_config_paths: vec![smtp_path, dir.join("smtp-config.toml")],
            failure_log: FailureLogConfig {
                dir: dir.clone(),
                ..Default::default()
            },
            rate_limit: RateLimitConfig {
                max_submissions: options.max_submissions,
                window_secs: options.window_secs,
                backend: options.backend,
                storage_dir: dir.join("ratelimit"),
            },
            ..Default::default()
        };

        let clock = Arc::new(ManualClock::new(START));
        let recorder = Arc::new(RecordingMailer::default());
        let mailer: Arc<dyn Mailer> = if options.failing_mailer {
            Arc::new(FailingMailer)
        } else {
            recorder.clone()
        };

        let state = Arc::new(AppState {
            smtp: SmtpConfigLoader::new(config.smtp_config_paths.clone()),
            limiter: RateLimiter::new(config.rate_limit.clone()),
            validator: SubmissionValidator::new(config.validation.clone()),
            mailer,
            clock: clock.clone(),
            metrics: Metrics::new().unwrap(),
            config,
        });

        let failures = tracing::subscriber::set_default(
            tracing_subscriber::registry()
                .with(failure_layer(tracing_appender::rolling::never(&dir, "failures.log"))),
        );

        Self {
            router: router(state.clone()),
            state,
            clock,
            mailer: recorder,
            dir,
            _failures: failures,
        }
    }

    pub async fn request(&self, ip: IpAddr, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .layer(MockConnectInfo(SocketAddr::new(ip, 40_000)))
            .oneshot(request)
            .await
            .unwrap()
    }

    pub async fn post_form(&self, ip: IpAddr, fields: &[(&str, String)]) -> Response<Body> {
        let body = serde_urlencoded::to_string(fields).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/send")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.request(ip, request).await
    }

    pub async fn get(&self, ip: IpAddr, uri: &str) -> Response<Body> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.request(ip, request).await
    }

    pub fn clock_now(&self) -> i64 {
        self.clock.now()
    }

    /// Record file the file backend keeps for `ip`.
    pub fn record_path(&self, ip: IpAddr) -> PathBuf {
        FileStore::new(self.dir.join("ratelimit")).record_path(&client_key(ip))
    }

    pub fn failure_log(&self) -> String {
        std::fs::read_to_string(self.dir.join("failures.log")).unwrap_or_default()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
