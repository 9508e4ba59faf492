// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact page behaviour: offer pre-fill, success view, timing stamp and
//! the `mailto:` fallback composed from a submission.

use crate::validator::RawSubmission;
use serde::Deserialize;

/// Subject used for `mailto:` fallback links.
pub const MAILTO_SUBJECT: &str = "Anfrage Grazing Table – Grazing Tables Saar";

/// Query parameters understood by the contact page.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ContactQuery {
    /// Offer the visitor came from
    pub angebot: Option<String>,
    /// Price per person for that offer
    pub preis: Option<String>,
    /// Headcount to pre-fill
    pub personen: Option<String>,
    /// `1` after a successful send
    pub sent: Option<String>,
    /// Message text already entered
    pub nachricht: Option<String>,
}

/// Everything the contact page template needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactView {
    pub sent: bool,
    pub message: String,
    pub headcount: String,
    pub form_ts: i64,
}

impl ContactView {
    pub fn from_query(query: &ContactQuery, now: i64) -> Self {
        let current = query.nachricht.as_deref().unwrap_or("");
        let offer = non_empty(query.angebot.as_deref());

        Self {
            sent: query.sent.as_deref() == Some("1"),
            message: prefill_message(current, offer, non_empty(query.preis.as_deref())),
            headcount: non_empty(query.personen.as_deref())
                .unwrap_or_default()
                .to_string(),
            form_ts: now,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Inquiry text naming an offer and, if known, its price.
pub fn offer_inquiry(offer: &str, price: Option<&str>) -> String {
    let price = price
        .map(|p| format!(" (Preis: {p} € p. P.)"))
        .unwrap_or_default();

    format!(
        "Hallo Grazing Tables Saar,\n\
         \n\
         ich möchte gerne eine Grazing Table „{offer}“{price} anfragen.\n\
         \n\
         Besondere Wünsche (z. B. vegetarisch, ohne Schwein, Allergien):\n\
         \n\
         Vielen Dank und viele Grüße\n"
    )
}

/// The message field after pre-fill. Text the visitor already typed wins.
pub fn prefill_message(current: &str, offer: Option<&str>, price: Option<&str>) -> String {
    match offer {
        Some(offer) if current.trim().is_empty() => offer_inquiry(offer, price),
        _ => current.to_string(),
    }
}

/// Human-readable summary of every form field.
pub fn summary_lines(raw: &RawSubmission) -> Vec<String> {
    let field = |value: &Option<String>| value.as_deref().unwrap_or("").to_string();

    vec![
        "Hallo Grazing Tables Saar,".to_string(),
        String::new(),
        "ich möchte unverbindlich anfragen:".to_string(),
        String::new(),
        format!("Datum: {}", field(&raw.event_datum)),
        format!("Uhrzeit: {}", field(&raw.event_uhrzeit)),
        format!("Ort: {}", field(&raw.event_ort)),
        format!("Anlass: {}", field(&raw.event_anlass)),
        format!("Personenzahl: {}", field(&raw.personenzahl)),
        String::new(),
        format!("E-Mail: {}", field(&raw.email)),
        format!("Telefon: {}", field(&raw.telefon)),
        String::new(),
        "Nachricht:".to_string(),
        field(&raw.nachricht),
        String::new(),
        "Viele Grüße".to_string(),
    ]
}

/// `mailto:` URL with percent-encoded subject and optional body.
pub fn compose_mailto(inbox: &str, subject: &str, body: Option<&str>) -> String {
    let mut href = format!("mailto:{inbox}?subject={}", urlencoding::encode(subject));
    if let Some(body) = body {
        href.push_str("&body=");
        href.push_str(&urlencoding::encode(body));
    }
    href
}
