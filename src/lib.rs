// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! Server side of the Grazing Tables Saar contact form. A submission passes
//! these gates before it is relayed by SMTP:
//!
//! - POST only
//! - complete SMTP configuration, loaded per request
//! - per-IP sliding-window rate limit (5 per hour default)
//! - honeypot field
//! - minimum fill time (3 seconds default)
//! - field validation with header-injection checks
//!
//! Every failure ends in a styled status page and a line in the failure log.

pub mod clock;
pub mod config;
pub mod contact;
pub mod diagnostics;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod metrics;
pub mod render;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, SmtpConfigLoader, SmtpSettings};
pub use error::SubmitError;
pub use handlers::{router, AppState};
pub use limiter::{FileStore, MemoryStore, RateLimitResult, RateLimiter, RateStore};
pub use mailer::{Mailer, OutgoingMail, SmtpMailer};
pub use validator::{RawSubmission, Submission, SubmissionValidator};
