// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Mailers that stand in for the SMTP relay.

use async_trait::async_trait;
use contact_relay::{
    config::SmtpSettings,
    mailer::{MailError, Mailer, OutgoingMail},
};
use std::sync::Mutex;

/// Keeps every mail it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(SmtpSettings, OutgoingMail)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(SmtpSettings, OutgoingMail)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, settings: &SmtpSettings, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((settings.clone(), mail.clone()));
        Ok(())
    }
}

/// Fails like a relay that rejects the login.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _settings: &SmtpSettings, _mail: &OutgoingMail) -> Result<(), MailError> {
        Err(MailError::Smtp(
            "permanent error (535): 5.7.8 Authentication credentials invalid".into(),
        ))
    }
}
