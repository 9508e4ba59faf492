// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for form submissions.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// A message of exactly `len` characters.
pub fn message_of(len: usize) -> String {
    "Käseplatte bitte! "
        .chars()
        .cycle()
        .take(len)
        .collect()
}

/// A complete, valid form stamped `age_secs` before `now`.
pub fn valid_form(now: i64, age_secs: i64) -> Vec<(&'static str, String)> {
    vec![
        ("event_datum", "2026-12-05".to_string()),
        ("event_uhrzeit", "19:00".to_string()),
        ("event_ort", "Homburg".to_string()),
        ("event_anlass", "Firmenfeier".to_string()),
        ("personenzahl", "20".to_string()),
        ("email", "planung@example.com".to_string()),
        ("telefon", "+49 6841 998877".to_string()),
        ("nachricht", message_of(100)),
        ("website", String::new()),
        ("form_ts", (now - age_secs).to_string()),
    ]
}

/// Replace one field of a form.
pub fn with_field(
    mut form: Vec<(&'static str, String)>,
    name: &str,
    value: impl Into<String>,
) -> Vec<(&'static str, String)> {
    let value = value.into();
    match form.iter_mut().find(|(key, _)| *key == name) {
        Some(entry) => entry.1 = value,
        None => panic!("unknown form field {name}"),
    }
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_message_length_in_chars() {
        assert_eq!(message_of(2000).chars().count(), 2000);
        assert!(message_of(2000).len() > 2000);
    }
}
