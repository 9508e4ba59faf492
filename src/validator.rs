// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form submission validator.
//!
//! Three gates, applied in this order by the handler:
//! - honeypot: the hidden `website` field must stay empty
//! - timing: `form_ts` must be a positive epoch and old enough
//! - fields: presence, email syntax, header-injection, headcount, lengths
//!
//! Lengths are counted in characters, not bytes.

use crate::config::ValidationConfig;
use lettre::Address;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Form fields as posted. Every field is optional at this stage.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RawSubmission {
    pub event_datum: Option<String>,
    pub event_uhrzeit: Option<String>,
    pub event_ort: Option<String>,
    pub event_anlass: Option<String>,
    pub personenzahl: Option<String>,
    pub email: Option<String>,
    pub telefon: Option<String>,
    pub nachricht: Option<String>,
    /// Honeypot
    pub website: Option<String>,
    /// Epoch seconds stamped when the form was rendered
    pub form_ts: Option<String>,
}

/// A submission that passed every gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub event_date: String,
    pub event_time: String,
    pub location: String,
    pub occasion: String,
    /// As submitted, after trimming; checked to be in range
    pub headcount: String,
    pub email: String,
    /// Empty when not given
    pub phone: String,
    pub message: String,
}

/// Bot heuristics. Kept apart from [`ValidationError`] because the user is
/// told as little as possible about them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpamError {
    #[error("honeypot field filled")]
    Honeypot,

    #[error("malformed form timestamp")]
    MalformedTimestamp,

    #[error("form submitted after {elapsed}s")]
    TooFast { elapsed: i64 },
}

/// Field validation errors. `Display` is the message shown to the user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Bitte füllen Sie alle Pflichtfelder aus ({0} fehlt).")]
    MissingField(&'static str),

    #[error("Bitte geben Sie eine gültige E-Mail-Adresse an.")]
    InvalidEmail,

    #[error("Das Feld {0} enthält unzulässige Zeilenumbrüche.")]
    HeaderInjection(&'static str),

    #[error("Die Personenzahl muss zwischen {min} und {max} liegen.")]
    InvalidHeadcount { min: u8, max: u8 },

    #[error("Das Feld {field} darf höchstens {max} Zeichen lang sein.")]
    TooLong { field: &'static str, max: usize },
}

/// Contact form validator.
pub struct SubmissionValidator {
    config: ValidationConfig,
}

fn trimmed(value: &Option<String>) -> &str {
    value.as_deref().map(str::trim).unwrap_or("")
}

/// Trim spaces and tabs only, so line breaks survive for the injection check.
fn trimmed_header(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(|v| v.trim_matches(|c| c == ' ' || c == '\t'))
        .unwrap_or("")
}

fn has_line_break(value: &str) -> bool {
    value.contains(['\r', '\n'])
}

impl SubmissionValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Reject any submission with a filled honeypot.
    pub fn check_honeypot(&self, raw: &RawSubmission) -> Result<(), SpamError> {
        if trimmed(&raw.website).is_empty() {
            Ok(())
        } else {
            debug!("Honeypot field filled");
            Err(SpamError::Honeypot)
        }
    }

    /// Require `form_ts` to be a positive integer at least
    /// `min_submit_secs` in the past.
    pub fn check_timing(&self, raw: &RawSubmission, now: i64) -> Result<(), SpamError> {
        let value = trimmed(&raw.form_ts);
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SpamError::MalformedTimestamp);
        }

        let stamped: i64 = match value.parse() {
            Ok(ts) if ts > 0 => ts,
            _ => return Err(SpamError::MalformedTimestamp),
        };

        let elapsed = now.saturating_sub(stamped);
        if elapsed < self.config.min_submit_secs {
            debug!(elapsed, min = self.config.min_submit_secs, "Form submitted too fast");
            return Err(SpamError::TooFast { elapsed });
        }

        Ok(())
    }

    /// Validate the visible fields. The first failing check wins.
    pub fn validate(&self, raw: &RawSubmission) -> Result<Submission, ValidationError> {
        let event_date = trimmed(&raw.event_datum);
        let event_time = trimmed(&raw.event_uhrzeit);
        let location = trimmed(&raw.event_ort);
        let occasion = trimmed(&raw.event_anlass);
        let headcount = trimmed(&raw.personenzahl);
        let email = trimmed_header(&raw.email);
        let phone = trimmed_header(&raw.telefon);
        let message = trimmed(&raw.nachricht);

        let required = [
            ("Datum", event_date),
            ("Uhrzeit", event_time),
            ("Ort", location),
            ("Anlass", occasion),
            ("Personenzahl", headcount),
            ("E-Mail", email),
            ("Nachricht", message),
        ];
        if let Some((field, _)) = required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(ValidationError::MissingField(field));
        }

        if email.parse::<Address>().is_err() {
            return Err(ValidationError::InvalidEmail);
        }

        if has_line_break(email) {
            return Err(ValidationError::HeaderInjection("E-Mail"));
        }
        if has_line_break(phone) {
            return Err(ValidationError::HeaderInjection("Telefon"));
        }

        self.check_headcount(headcount)?;

        for (field, value, max) in [
            ("Ort", location, self.config.max_short_chars),
            ("Anlass", occasion, self.config.max_short_chars),
            ("Telefon", phone, self.config.max_phone_chars),
            ("Nachricht", message, self.config.max_message_chars),
        ] {
            if value.chars().count() > max {
                return Err(ValidationError::TooLong { field, max });
            }
        }

        Ok(Submission {
            event_date: event_date.to_string(),
            event_time: event_time.to_string(),
            location: location.to_string(),
            occasion: occasion.to_string(),
            headcount: headcount.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            message: message.to_string(),
        })
    }

    /// Digits only, within the configured range.
    fn check_headcount(&self, value: &str) -> Result<(), ValidationError> {
        let in_range = value.bytes().all(|b| b.is_ascii_digit())
            && value.parse::<u32>().is_ok_and(|n| {
                n >= u32::from(self.config.headcount_min)
                    && n <= u32::from(self.config.headcount_max)
            });

        if in_range {
            Ok(())
        } else {
            Err(ValidationError::InvalidHeadcount {
                min: self.config.headcount_min,
                max: self.config.headcount_max,
            })
        }
    }
}
