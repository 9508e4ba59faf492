// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! End-to-end tests for the contact relay.

mod harness;

use axum::http::{header, StatusCode};
use harness::{
    body_string,
    generators::{generate_ips, valid_form, with_field},
    TestApp, TestOptions, START,
};

#[tokio::test]
async fn test_valid_submission_is_relayed() {
    let app = TestApp::new();
    let ip = generate_ips(1)[0];
    let form = valid_form(START, 60);

    let response = app.post_form(ip, &form).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "kontakt.html?sent=1"
    );

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    let (settings, mail) = &sent[0];
    assert_eq!(settings.host, "smtp.example.org");
    assert_eq!(mail.reply_to, "planung@example.com");

    for (name, value) in &form {
        if matches!(*name, "website" | "form_ts") {
            continue;
        }
        assert!(
            mail.body.contains(value.as_str()),
            "mail body is missing {name}={value:?}"
        );
    }

    assert_eq!(app.state.metrics.count("sent"), 1);
    assert!(app.failure_log().is_empty());
}

#[tokio::test]
async fn test_headcount_relayed_verbatim() {
    let app = TestApp::new();
    let ip = generate_ips(1)[0];
    let form = with_field(valid_form(START, 60), "personenzahl", "020");

    let response = app.post_form(ip, &form).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let sent = app.mailer.sent();
    assert!(sent[0].1.body.contains("Personenzahl: 020\n"));
}

#[tokio::test]
async fn test_missing_config_fails_closed() {
    let app = TestApp::with_options(TestOptions {
        smtp_config: None,
        ..Default::default()
    });
    let ip = generate_ips(1)[0];

    let response = app.post_form(ip, &valid_form(START, 60)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_string(response).await;
    assert!(body.contains("Technischer Fehler"));
    assert!(!body.contains("smtp-config"));

    assert!(!app.record_path(ip).exists(), "no rate-limit record may be written");
    assert_eq!(app.mailer.count(), 0);
    assert!(app.failure_log().contains("code=config_missing status=500"));
}

#[tokio::test]
async fn test_incomplete_config_rejected_before_side_effects() {
    let app = TestApp::with_options(TestOptions {
        smtp_config: Some("smtp_user = \"relay@example.org\"\nsmtp_pass = \"\"\n"),
        ..Default::default()
    });
    let ip = generate_ips(1)[0];

    let response = app.post_form(ip, &valid_form(START, 60)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!app.record_path(ip).exists());
    assert!(app.failure_log().contains("code=config_incomplete"));
}

#[tokio::test]
async fn test_non_post_rejected() {
    let app = TestApp::new();
    let ip = generate_ips(1)[0];

    let response = app.get(ip, "/send.php").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "POST");
    assert!(body_string(response).await.contains("Methode nicht erlaubt"));
    assert!(app.failure_log().contains("code=method_not_allowed status=405"));
}

#[tokio::test]
async fn test_transport_failure_hides_detail() {
    let app = TestApp::with_options(TestOptions {
        failing_mailer: true,
        ..Default::default()
    });
    let ip = generate_ips(1)[0];

    let response = app.post_form(ip, &valid_form(START, 60)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_string(response).await;
    assert!(body.contains("Versand fehlgeschlagen"));
    assert!(!body.contains("535"));
    assert!(body.contains("mailto:info@grazing-tables-saar.de?subject="));
    assert!(body.contains("Homburg"), "fallback link carries the summary");

    let log = app.failure_log();
    assert!(log.contains("code=transport_failure status=500"));
    assert!(log.contains("Authentication credentials invalid"));
}

#[tokio::test]
async fn test_validation_message_shown() {
    let app = TestApp::new();
    let ip = generate_ips(1)[0];
    let form = with_field(valid_form(START, 60), "personenzahl", "51");

    let response = app.post_form(ip, &form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response)
        .await
        .contains("Die Personenzahl muss zwischen 1 und 50 liegen."));
    assert_eq!(app.mailer.count(), 0);
}

#[tokio::test]
async fn test_contact_page_prefill() {
    let app = TestApp::new();
    let ip = generate_ips(1)[0];

    let response = app
        .get(ip, "/kontakt.html?angebot=Classic&preis=24&personen=12")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_string(response).await;
    assert!(body.contains("„Classic“ (Preis: 24 € p. P.) anfragen"));
    assert!(body.contains("value=\"12\""));
    assert!(body.contains(&format!("name=\"form_ts\" value=\"{START}\"")));
}

#[tokio::test]
async fn test_contact_page_success_panel() {
    let app = TestApp::new();
    let ip = generate_ips(1)[0];

    let body = body_string(app.get(ip, "/kontakt.html?sent=1").await).await;
    assert!(body.contains("successMessage"));
    assert!(!body.contains("anfrageForm"));
}

#[tokio::test]
async fn test_health_and_metrics() {
    let app = TestApp::new();
    let ip = generate_ips(1)[0];

    let health: serde_json::Value =
        serde_json::from_str(&body_string(app.get(ip, "/healthz").await).await).unwrap();
    assert_eq!(health["status"], "healthy");

    app.post_form(ip, &valid_form(START, 60)).await;
    let metrics = body_string(app.get(ip, "/metrics").await).await;
    assert!(metrics.contains("contact_submissions_total{outcome=\"sent\"} 1"));
}

#[test]
fn test_smtp_config_loads() {
    let app = TestApp::new();
    let settings = tokio_test::assert_ok!(app.state.smtp.load());
    assert_eq!(settings.port, 587);
    assert!(!settings.uses_implicit_tls());
}
