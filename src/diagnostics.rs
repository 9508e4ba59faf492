// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Failure log for operators.
//!
//! Every rejected or failed submission is emitted as a `tracing` event on
//! [`FAILURE_TARGET`]. `main` routes that target into a daily-rotated file
//! next to the regular JSON output, so the log is bounded by
//! [`FailureLogConfig::keep_files`].

use crate::config::FailureLogConfig;
use crate::error::SubmitError;
use tracing::{error, warn, Level, Subscriber};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::Targets,
    fmt::{self, MakeWriter},
    registry::LookupSpan,
    Layer,
};

/// Target carrying one event per failed submission.
pub const FAILURE_TARGET: &str = "contact_relay::failures";

/// Log a failure with its machine code, status, visitor message and,
/// when there is one, the internal detail.
pub fn record_failure(err: &SubmitError) {
    let detail = err.detail();
    let status = err.status().as_u16();

    if err.is_server_fault() {
        error!(
            target: FAILURE_TARGET,
            code = %err.code(),
            status,
            reason = ?err.to_string(),
            detail = detail.as_deref(),
            "Submission failed"
        );
    } else {
        warn!(
            target: FAILURE_TARGET,
            code = %err.code(),
            status,
            reason = ?err.to_string(),
            detail = detail.as_deref(),
            "Submission rejected"
        );
    }
}

/// Daily-rotated appender under `config.dir`, keeping at most
/// `config.keep_files` files.
pub fn failure_appender(config: &FailureLogConfig) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("failures")
        .filename_suffix("log")
        .max_log_files(config.keep_files.max(1))
        .build(&config.dir)
}

/// Plain-text layer that only sees [`FAILURE_TARGET`] events.
pub fn failure_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(Targets::new().with_target(FAILURE_TARGET, Level::WARN))
}
