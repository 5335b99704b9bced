// SPDX-FileCopyrightText: 2026 Hookrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config error diagnostics.
//!
//! Figment errors are turned into [`ConfigError`]s that miette renders with
//! the offending line of `hookrelay.toml` highlighted. Unknown keys get a
//! Jaro-Winkler "did you mean" against the keys valid for that section.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Scores at or below this are not worth suggesting.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(section))]
    #[diagnostic(
        code(hookrelay::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted section path, empty for the top level.
        section: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted in `section`.
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value could not be deserialized into the field's type.
    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(hookrelay::config::invalid_value))]
    InvalidValue {
        key: String,
        detail: String,
        #[label("here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A parsed value failed a semantic check.
    #[error("validation error: {message}")]
    #[diagnostic(code(hookrelay::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(hookrelay::config::other))]
    Other(String),
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Convert every error carried by `err` into a diagnostic.
///
/// `toml_sources` holds `(path, content)` pairs for the files that were
/// merged; they are used to attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let section: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(&error, &section, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        section: section.join("."),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::InvalidType(actual, expected) => {
                    // For type errors the path ends with the field itself.
                    let (parent, field) = match section.split_last() {
                        Some((field, parent)) => (parent.to_vec(), field.clone()),
                        None => (Vec::new(), String::new()),
                    };
                    let (span, src) = locate(&error, &parent, &field, toml_sources);
                    ConfigError::InvalidValue {
                        key: section.join("."),
                        detail: format!("found {actual}, expected {expected}"),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Resolve the file an error came from and the span of `field` within it.
fn locate(
    error: &figment::Error,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let from_file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    // Inline strings carry no file source; fall back to a lone candidate.
    let source = match from_file {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };
    let Some((path, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, section, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside the `[section]` table of `content`.
///
/// Tracks table headers line by line, so a key with the same name in an
/// earlier table is not matched. An empty `section` means the top level.
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(header) = trimmed.strip_prefix('[') {
            if let Some(end) = header.find(']') {
                current = header[..end].trim().to_string();
            }
        } else if current == wanted {
            if let Some(rest) = trimmed.strip_prefix(field) {
                if rest.trim_start().starts_with('=') {
                    return Some(offset + indent);
                }
            }
        }
        offset += line.len();
    }
    None
}

/// Closest valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|&(_, score)| score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Print diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_closest_delivery_key() {
        let valid = &["workers", "request_timeout_secs", "poll_interval_ms"];
        assert_eq!(suggest_key("wrokers", valid).as_deref(), Some("workers"));
        assert_eq!(
            suggest_key("poll_interval", valid).as_deref(),
            Some("poll_interval_ms")
        );
    }

    #[test]
    fn distant_keys_get_no_suggestion() {
        assert_eq!(suggest_key("zzzzzz", &["host", "port", "log_level"]), None);
    }

    #[test]
    fn key_offset_respects_tables() {
        let content = "[server]\nport = 1\n\n[delivery]\nport = 2\n";
        let offset = find_key_offset(content, &["delivery".to_string()], "port").unwrap();
        assert_eq!(offset, content.rfind("port").unwrap());
    }

    #[test]
    fn key_offset_requires_assignment() {
        let content = "[delivery]\nworkers_extra = 1\nworkers = 3\n";
        let offset = find_key_offset(content, &["delivery".to_string()], "workers").unwrap();
        assert_eq!(&content[offset..offset + 11], "workers = 3");
    }

    #[test]
    fn key_offset_top_level_and_missing_table() {
        let content = "stray = 1\n[server]\nport = 1\n";
        assert_eq!(find_key_offset(content, &[], "stray"), Some(0));
        assert!(find_key_offset(content, &["delivery".to_string()], "workers").is_none());
    }

    #[test]
    fn unknown_key_message_names_section() {
        let err = ConfigError::UnknownKey {
            key: "wrokers".into(),
            section: "delivery".into(),
            suggestion: None,
            valid_keys: "workers".into(),
            span: None,
            src: None,
        };
        assert_eq!(err.to_string(), "unknown key `wrokers` in [delivery]");
    }
}
