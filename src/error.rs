// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Terminal outcomes of a submission.
//!
//! `Display` is the operator-facing description written to the logs. The
//! visitor only ever sees [`SubmitError::page`], which carries no
//! configuration values, paths or transport details.

use crate::config::SmtpConfigError;
use crate::limiter::StoreError;
use crate::mailer::MailError;
use crate::render::Page;
use crate::validator::{SpamError, ValidationError};
use axum::http::{Method, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Why a submission ended without a redirect.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error(transparent)]
    ConfigMissing(SmtpConfigError),

    #[error(transparent)]
    ConfigIncomplete(SmtpConfigError),

    #[error(transparent)]
    StorageUnavailable(#[from] StoreError),

    #[error("rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("invalid submission: {0}")]
    InvalidSubmission(&'static str),

    #[error("form submitted after {elapsed}s")]
    TooFast { elapsed: i64 },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("mail transport failed: {source}")]
    Transport {
        #[source]
        source: MailError,
        /// Summary of the submission for the visitor's own mail client
        summary: String,
    },
}

impl From<SmtpConfigError> for SubmitError {
    fn from(err: SmtpConfigError) -> Self {
        match err {
            SmtpConfigError::Missing { .. } => Self::ConfigMissing(err),
            SmtpConfigError::Incomplete { .. } => Self::ConfigIncomplete(err),
        }
    }
}

impl From<SpamError> for SubmitError {
    fn from(err: SpamError) -> Self {
        match err {
            SpamError::Honeypot => Self::InvalidSubmission("honeypot"),
            SpamError::MalformedTimestamp => Self::InvalidSubmission("form timestamp"),
            SpamError::TooFast { elapsed } => Self::TooFast { elapsed },
        }
    }
}

impl SubmitError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InvalidSubmission(_) | Self::TooFast { .. } | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::ConfigMissing(_)
            | Self::ConfigIncomplete(_)
            | Self::StorageUnavailable(_)
            | Self::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine code for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::ConfigMissing(_) => "config_missing",
            Self::ConfigIncomplete(_) => "config_incomplete",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidSubmission(_) => "invalid_submission",
            Self::TooFast { .. } => "too_fast",
            Self::Validation(_) => "validation_failed",
            Self::Transport { .. } => "transport_failure",
        }
    }

    /// Whether the operator needs to act.
    pub fn is_server_fault(&self) -> bool {
        self.status().is_server_error()
    }

    /// Underlying transport error text, for the failure log only.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Transport { source, .. } => Some(source.to_string()),
            Self::StorageUnavailable(source) => Some(source.to_string()),
            _ => None,
        }
    }

    /// The page shown to the visitor.
    pub fn page(&self) -> Page {
        let status = self.status();
        match self {
            Self::MethodNotAllowed(_) => Page::new(
                status,
                "Methode nicht erlaubt",
                "Diese Adresse nimmt nur Formular-Übermittlungen an.",
            ),
            Self::ConfigMissing(_) | Self::ConfigIncomplete(_) | Self::StorageUnavailable(_) => {
                Page::new(
                    status,
                    "Technischer Fehler",
                    "Ihre Anfrage konnte gerade nicht verarbeitet werden. Bitte versuchen Sie es später erneut.",
                )
            }
            Self::RateLimited { .. } => Page::new(
                status,
                "Zu viele Anfragen",
                "Sie haben in kurzer Zeit mehrere Anfragen gesendet. Bitte versuchen Sie es später erneut.",
            ),
            Self::InvalidSubmission(_) => Page::new(
                status,
                "Ungültige Anfrage",
                "Ihre Anfrage konnte nicht verarbeitet werden.",
            ),
            Self::TooFast { .. } => Page::new(
                status,
                "Bitte erneut senden",
                "Das Formular wurde zu schnell abgeschickt. Bitte prüfen Sie Ihre Angaben und senden Sie es erneut.",
            ),
            Self::Validation(err) => Page::new(status, "Bitte Eingaben prüfen", err.to_string()),
            Self::Transport { .. } => Page::new(
                status,
                "Versand fehlgeschlagen",
                "Ihre Nachricht konnte leider nicht gesendet werden. Bitte versuchen Sie es später erneut.",
            ),
        }
    }
}
