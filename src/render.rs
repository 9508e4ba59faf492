// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTML rendering for status and contact pages.
//!
//! Pure functions from data to markup. Every interpolated value is escaped.

use crate::contact::ContactView;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::borrow::Cow;
use std::fmt::Write;

const SITE_NAME: &str = "Grazing Tables Saar";

/// A status page: what went wrong, in words for the visitor.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: StatusCode,
    pub title: Cow<'static, str>,
    pub message: Cow<'static, str>,
    pub fallback: Option<Fallback>,
}

/// Alternative way to reach the business when the form failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub inbox: String,
    pub href: String,
}

impl Page {
    pub fn new(
        status: StatusCode,
        title: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            status,
            title: title.into(),
            message: message.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn render(&self) -> String {
        let mut main = String::new();
        let _ = write!(
            main,
            "<section class=\"status-page\">\n\
             <h1>{}</h1>\n\
             <p>{}</p>\n",
            text(&self.title),
            text(&self.message)
        );

        if let Some(fallback) = &self.fallback {
            let _ = write!(
                main,
                "<p>Alternativ erreichen Sie uns direkt per E-Mail: \
                 <a href=\"{}\">{}</a></p>\n",
                attr(&fallback.href),
                text(&fallback.inbox)
            );
        }

        main.push_str("<p><a class=\"btn\" href=\"kontakt.html\">Zurück zum Kontaktformular</a></p>\n</section>");

        layout(&self.title, &main)
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (self.status, Html(self.render())).into_response()
    }
}

/// The contact page with either the form or the success panel.
pub fn render_contact(view: &ContactView, action: &str) -> String {
    if view.sent {
        return layout(
            "Vielen Dank!",
            "<section id=\"successMessage\" class=\"success\">\n\
             <h1>Vielen Dank für Ihre Anfrage!</h1>\n\
             <p>Wir melden uns so schnell wie möglich bei Ihnen.</p>\n\
             </section>",
        );
    }

    let mut main = String::new();
    let _ = write!(
        main,
        "<section id=\"formContainer\">\n\
         <h1>Anfrage</h1>\n\
         <form id=\"anfrageForm\" method=\"post\" action=\"{action}\">\n\
         <label>Datum <input type=\"date\" name=\"event_datum\" required></label>\n\
         <label>Uhrzeit <input type=\"time\" name=\"event_uhrzeit\" required></label>\n\
         <label>Ort <input type=\"text\" name=\"event_ort\" maxlength=\"100\" required></label>\n\
         <label>Anlass <input type=\"text\" name=\"event_anlass\" maxlength=\"100\" required></label>\n\
         <label>Personenzahl <input id=\"people\" type=\"number\" name=\"personenzahl\" min=\"1\" max=\"50\" value=\"{headcount}\" required></label>\n\
         <label>E-Mail <input type=\"email\" name=\"email\" required></label>\n\
         <label>Telefon <input type=\"tel\" name=\"telefon\" maxlength=\"50\"></label>\n\
         <label>Nachricht <textarea id=\"message\" name=\"nachricht\" maxlength=\"2000\" required>{message}</textarea></label>\n\
         <div class=\"hp\" aria-hidden=\"true\"><input type=\"text\" name=\"website\" tabindex=\"-1\" autocomplete=\"off\"></div>\n\
         <input type=\"hidden\" id=\"form_ts\" name=\"form_ts\" value=\"{form_ts}\">\n\
         <button type=\"submit\" class=\"btn\">Anfrage senden</button>\n\
         </form>\n\
         </section>",
        action = attr(action),
        headcount = attr(&view.headcount),
        message = text(&view.message),
        form_ts = view.form_ts,
    );

    layout("Kontakt", &main)
}

fn layout(title: &str, main: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"de\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} – {SITE_NAME}</title>\n\
         <link rel=\"stylesheet\" href=\"assets/css/style.css\">\n\
         </head>\n\
         <body>\n\
         <header class=\"site-header\"><a class=\"brand\" href=\"index.html\">{SITE_NAME}</a></header>\n\
         <main>\n{main}\n</main>\n\
         </body>\n\
         </html>\n",
        title = text(title),
    )
}
