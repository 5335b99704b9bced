// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input validation for destinations and inbound events.

use hookrelay_core::types::{NewDestination, Payload};
use hookrelay_core::RelayError;
use reqwest::header::{HeaderName, HeaderValue};

use crate::error::IngestError;

/// Longest destination URL accepted.
pub const MAX_URL_LEN: usize = 2000;

/// Longest stored event key; the client id plus `-{destination_id}` must fit.
pub const MAX_EVENT_KEY_LEN: usize = 100;

/// Check a destination as a whole, collecting every problem.
pub fn validate_destination(destination: &NewDestination) -> Result<(), RelayError> {
    let mut errors = Vec::new();

    if destination.url.len() > MAX_URL_LEN {
        errors.push(format!("url must be at most {MAX_URL_LEN} characters"));
    }
    match url::Url::parse(&destination.url) {
        Ok(parsed) => {
            if !matches!(parsed.scheme(), "http" | "https") {
                errors.push(format!(
                    "url scheme must be http or https, got `{}`",
                    parsed.scheme()
                ));
            }
            if parsed.host_str().is_none_or(str::is_empty) {
                errors.push("url must include a host".to_string());
            }
        }
        Err(e) => errors.push(format!("url is not a valid absolute URL: {e}")),
    }

    if destination.headers.is_empty() {
        errors.push("headers must contain at least one entry".to_string());
    }
    for (name, value) in &destination.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(format!("header name `{name}` is not a valid HTTP header name"));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(format!("header `{name}` has an invalid value"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RelayError::Validation(errors))
    }
}

/// Check a client event id against the ledger key budget for `max_destination_id`.
///
/// The id must be non-blank, printable ASCII, and short enough that
/// `{id}-{max_destination_id}` fits in [`MAX_EVENT_KEY_LEN`].
pub fn validate_event_id(event_id: &str, max_destination_id: i64) -> Result<(), IngestError> {
    if event_id.trim().is_empty() {
        return Err(IngestError::InvalidEventId("event id must not be blank".into()));
    }
    if !event_id.chars().all(|c| c.is_ascii_graphic()) {
        return Err(IngestError::InvalidEventId(
            "event id must be printable ASCII without spaces".into(),
        ));
    }
    let suffix_len = 1 + max_destination_id.to_string().len();
    if event_id.len() + suffix_len > MAX_EVENT_KEY_LEN {
        return Err(IngestError::InvalidEventId(format!(
            "event id must be at most {} characters",
            MAX_EVENT_KEY_LEN.saturating_sub(suffix_len)
        )));
    }
    Ok(())
}

/// Parse an inbound body into a non-empty JSON object.
pub fn parse_payload(body: &[u8]) -> Result<Payload, IngestError> {
    if body.is_empty() {
        return Err(IngestError::InvalidPayload("request body is empty".into()));
    }
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| IngestError::InvalidPayload(format!("body is not valid JSON: {e}")))?;
    match value {
        serde_json::Value::Object(map) if !map.is_empty() => Ok(map),
        serde_json::Value::Object(_) => {
            Err(IngestError::InvalidPayload("JSON object must not be empty".into()))
        }
        _ => Err(IngestError::InvalidPayload("body must be a JSON object".into())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hookrelay_core::HttpMethod;

    use super::*;

    fn destination(url: &str, headers: &[(&str, &str)]) -> NewDestination {
        NewDestination {
            url: url.to_string(),
            http_method: HttpMethod::Post,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn valid_destination_passes() {
        let dest = destination("https://hooks.example.com/in", &[("X-Api-Key", "abc")]);
        assert!(validate_destination(&dest).is_ok());
    }

    #[test]
    fn all_problems_are_collected() {
        let dest = destination("ftp://files.example.com/drop", &[]);
        let Err(RelayError::Validation(errors)) = validate_destination(&dest) else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.contains("scheme")));
        assert!(errors.iter().any(|e| e.contains("headers must contain")));
    }

    #[test]
    fn relative_and_overlong_urls_are_rejected() {
        let relative = destination("/hook", &[("A", "b")]);
        assert!(validate_destination(&relative).is_err());

        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LEN));
        let Err(RelayError::Validation(errors)) =
            validate_destination(&destination(&long, &[("A", "b")]))
        else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.contains("at most")));
    }

    #[test]
    fn invalid_header_name_and_value_are_reported() {
        let dest = destination(
            "https://example.com",
            &[("bad name", "ok"), ("X-Ok", "line\nbreak")],
        );
        let Err(RelayError::Validation(errors)) = validate_destination(&dest) else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2, "{errors:?}");
    }

    #[test]
    fn event_id_budget_accounts_for_destination_suffix() {
        assert!(validate_event_id("evt-1", 12).is_ok());
        // "-12" leaves 97 characters for the client id.
        assert!(validate_event_id(&"x".repeat(97), 12).is_ok());
        assert!(matches!(
            validate_event_id(&"x".repeat(98), 12),
            Err(IngestError::InvalidEventId(_))
        ));
        assert!(validate_event_id("   ", 1).is_err());
        assert!(validate_event_id("has space", 1).is_err());
    }

    #[test]
    fn payload_must_be_non_empty_object() {
        assert!(parse_payload(br#"{"amount":42}"#).is_ok());
        let bodies: [&[u8]; 5] = [b"", b"{}", b"[1,2]", b"42", b"not json"];
        for body in bodies {
            assert!(
                matches!(parse_payload(body), Err(IngestError::InvalidPayload(_))),
                "{:?} should be rejected",
                String::from_utf8_lossy(body)
            );
        }
    }
}
