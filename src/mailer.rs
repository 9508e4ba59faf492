// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outgoing mail: body template and SMTP delivery through lettre.

use crate::config::SmtpSettings;
use crate::validator::Submission;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const SENDER_NAME: &str = "Grazing Tables Saar Website";

/// Mail delivery errors.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid {role} address {address:?}: {reason}")]
    InvalidAddress {
        role: &'static str,
        address: String,
        reason: String,
    },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// A composed mail, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

/// Fill the fixed plain-text template with a validated submission.
pub fn compose(submission: &Submission, subject: &str) -> OutgoingMail {
    let phone = if submission.phone.is_empty() {
        "-"
    } else {
        submission.phone.as_str()
    };

    let body = format!(
        "Neue Anfrage über das Kontaktformular\n\
         \n\
         Datum: {date}\n\
         Uhrzeit: {time}\n\
         Ort: {location}\n\
         Anlass: {occasion}\n\
         Personenzahl: {headcount}\n\
         \n\
         E-Mail: {email}\n\
         Telefon: {phone}\n\
         \n\
         Nachricht:\n\
         {message}\n",
        date = submission.event_date,
        time = submission.event_time,
        location = submission.location,
        occasion = submission.occasion,
        headcount = submission.headcount,
        email = submission.email,
        phone = phone,
        message = submission.message,
    );

    OutgoingMail {
        reply_to: submission.email.clone(),
        subject: subject.to_string(),
        body,
    }
}

/// Something that can deliver an [`OutgoingMail`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, settings: &SmtpSettings, mail: &OutgoingMail) -> Result<(), MailError>;
}

/// Delivers through the configured SMTP relay. A transport is built per
/// send because settings are reloaded per request.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    timeout: Duration,
}

fn parse_address(role: &'static str, address: &str) -> Result<Address, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        role,
        address: address.to_string(),
        reason: e.to_string(),
    })
}

impl SmtpMailer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Build the lettre message: From and To from the settings, Reply-To
    /// from the submitter.
    pub fn build_message(settings: &SmtpSettings, mail: &OutgoingMail) -> Result<Message, MailError> {
        let from = Mailbox::new(
            Some(SENDER_NAME.to_string()),
            parse_address("from", &settings.mail_from)?,
        );
        let to = Mailbox::new(None, parse_address("to", &settings.mail_to)?);
        let reply_to = Mailbox::new(None, parse_address("reply-to", &mail.reply_to)?);

        Message::builder()
            .from(from)
            .to(to)
            .reply_to(reply_to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }

    fn transport(&self, settings: &SmtpSettings) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let builder = if settings.uses_implicit_tls() {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| MailError::Smtp(e.to_string()))?;

        Ok(builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, settings: &SmtpSettings, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = Self::build_message(settings, mail)?;
        let transport = self.transport(settings)?;

        debug!(
            host = %settings.host,
            port = settings.port,
            implicit_tls = settings.uses_implicit_tls(),
            "Connecting to SMTP relay"
        );

        let response = transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        info!(code = %response.code(), "Mail accepted by relay");
        Ok(())
    }
}
