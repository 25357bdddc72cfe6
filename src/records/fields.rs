//! Value checks for image and chat fields
//!
//! Image fields accept:
//! - web URLs (`http`/`https`) with a host and a path, up to 2038 characters
//! - data URLs with an image MIME type, up to 5,000,000 characters
//!
//! Chat fields accept a list of messages, each an object with `role` and `content`.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde_json::Value;

use super::errors::{RecordError, RecordResult};
use super::render::python_repr_str;

pub const IMAGE_FIELD_WEB_URL_MAX_LENGTH: usize = 2038;
pub const IMAGE_FIELD_DATA_URL_MAX_LENGTH: usize = 5_000_000;
pub const IMAGE_FIELD_DATA_URL_VALID_MIME_TYPES: [&str; 8] = [
    "image/avif",
    "image/gif",
    "image/ico",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/svg",
    "image/webp",
];

pub const CHAT_FIELD_MAX_LENGTH: usize = 5000;

/// Components of a URL split on generic-URI delimiters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlParts {
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

/// Splits a URL into scheme, netloc, path, query and fragment.
///
/// No normalization is applied: `https://example.com` has an empty path.
/// Fails on unbalanced brackets in the netloc, and on a bracketed host that is
/// neither an IPv6 address nor an `IPvFuture` literal.
pub fn split_url(raw: &str) -> Result<UrlParts, String> {
    let trimmed = raw.trim_start_matches(|c: char| c <= ' ');
    let mut rest: String = trimmed.chars().filter(|c| !matches!(c, '\t' | '\r' | '\n')).collect();
    let mut parts = UrlParts::default();

    if let Some(colon) = rest.find(':') {
        let candidate = &rest[..colon];
        let starts_alpha = candidate
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic());
        let scheme_chars = candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if starts_alpha && scheme_chars {
            parts.scheme = candidate.to_ascii_lowercase();
            rest = rest[colon + 1..].to_string();
        }
    }

    if let Some(after_slashes) = rest.strip_prefix("//") {
        let end = after_slashes
            .find(|c: char| matches!(c, '/' | '?' | '#'))
            .unwrap_or(after_slashes.len());
        parts.netloc = after_slashes[..end].to_string();
        rest = after_slashes[end..].to_string();

        let open = parts.netloc.contains('[');
        let close = parts.netloc.contains(']');
        if open != close {
            return Err("Invalid IPv6 URL".into());
        }
        if open {
            check_bracketed_netloc(&parts.netloc)?;
        }
    }

    if let Some(hash) = rest.find('#') {
        parts.fragment = rest[hash + 1..].to_string();
        rest.truncate(hash);
    }
    if let Some(question) = rest.find('?') {
        parts.query = rest[question + 1..].to_string();
        rest.truncate(question);
    }
    parts.path = rest;

    Ok(parts)
}

/// Checks the `[...]` host of a netloc: nothing before the bracket, a port (if
/// any) after it, and an IPv6 or `v<hex>.<text>` literal inside.
fn check_bracketed_netloc(netloc: &str) -> Result<(), String> {
    let host_and_port = netloc.rsplit_once('@').map_or(netloc, |(_, host)| host);
    let Some((before, bracketed)) = host_and_port.split_once('[') else {
        return Ok(());
    };
    if !before.is_empty() {
        return Err("Invalid IPv6 URL".into());
    }
    let (host, port) = bracketed.split_once(']').unwrap_or((bracketed, ""));
    if !port.is_empty() && !port.starts_with(':') {
        return Err("Invalid IPv6 URL".into());
    }

    if let Some(future) = host.strip_prefix('v') {
        let valid = future.split_once('.').map_or(false, |(version, address)| {
            !version.is_empty() && version.chars().all(|c| c.is_ascii_hexdigit()) && !address.is_empty()
        });
        return if valid {
            Ok(())
        } else {
            Err("IPvFuture address is invalid".into())
        };
    }

    let address = host.split_once('%').map_or(host, |(address, _zone)| address);
    if address.parse::<Ipv4Addr>().is_ok() {
        return Err("An IPv4 address cannot be in brackets".into());
    }
    address
        .parse::<Ipv6Addr>()
        .map(|_| ())
        .map_err(|_| format!("'{}' does not appear to be an IPv4 or IPv6 address", host))
}

/// Infers the MIME type carried by a data URL.
///
/// Returns `None` for anything that is not a `data:` URL or that has no `,` separator.
pub fn guess_data_url_mime_type(url: &str) -> Option<String> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];
    if scheme.is_empty() || scheme.contains('/') || !scheme.eq_ignore_ascii_case("data") {
        return None;
    }
    let payload = &url[colon + 1..];
    let comma = payload.find(',')?;
    let media = &payload[..comma];
    let media_type = match media.find(';') {
        Some(semi) => &media[..semi],
        None => media,
    };

    if media_type.contains('=') || !media_type.contains('/') {
        Some("text/plain".to_string())
    } else {
        Some(media_type.to_string())
    }
}

/// Validates an image field value. Null is accepted.
pub fn validate_image_field(field_name: &str, value: Option<&Value>) -> RecordResult<()> {
    let value = match value {
        None | Some(Value::Null) => return Ok(()),
        Some(value) => value,
    };
    let url = value.as_str().ok_or_else(|| invalid_image_url(field_name))?;
    let parts = split_url(url).map_err(|_| invalid_image_url(field_name))?;

    match parts.scheme.as_str() {
        "http" | "https" => validate_web_url(field_name, url, &parts),
        "data" => validate_data_url(field_name, url, &parts),
        _ => Err(invalid_image_url(field_name)),
    }
}

fn validate_web_url(field_name: &str, url: &str, parts: &UrlParts) -> RecordResult<()> {
    if parts.netloc.is_empty() || parts.path.is_empty() {
        return Err(invalid_image_url(field_name));
    }

    if url.chars().count() > IMAGE_FIELD_WEB_URL_MAX_LENGTH {
        return Err(RecordError::unprocessable(format!(
            "image field '{}' value is exceeding the maximum length of {} characters for Web URLs",
            field_name, IMAGE_FIELD_WEB_URL_MAX_LENGTH
        )));
    }

    Ok(())
}

fn validate_data_url(field_name: &str, url: &str, parts: &UrlParts) -> RecordResult<()> {
    if parts.path.is_empty() {
        return Err(invalid_image_url(field_name));
    }

    if url.chars().count() > IMAGE_FIELD_DATA_URL_MAX_LENGTH {
        return Err(RecordError::unprocessable(format!(
            "image field '{}' value is exceeding the maximum length of {} characters for Data URLs",
            field_name, IMAGE_FIELD_DATA_URL_MAX_LENGTH
        )));
    }

    let supported = guess_data_url_mime_type(url)
        .map_or(false, |mime| IMAGE_FIELD_DATA_URL_VALID_MIME_TYPES.contains(&mime.as_str()));
    if !supported {
        return Err(RecordError::unprocessable(format!(
            "image field '{}' value is using an unsupported MIME type, supported MIME types are: {}",
            field_name,
            quoted_list(&IMAGE_FIELD_DATA_URL_VALID_MIME_TYPES)
        )));
    }

    Ok(())
}

/// Validates a chat field value. Null is accepted.
///
/// The length bound runs before the list check and measures the raw value:
/// characters of a string, items of a list, keys of an object.
pub fn validate_chat_field(field_name: &str, value: Option<&Value>) -> RecordResult<()> {
    let value = match value {
        None | Some(Value::Null) => return Ok(()),
        Some(value) => value,
    };

    if raw_length(value).map_or(false, |len| len > CHAT_FIELD_MAX_LENGTH) {
        return Err(RecordError::unprocessable(format!(
            "chat field '{}' value is exceeding the maximum length of {} characters",
            field_name, CHAT_FIELD_MAX_LENGTH
        )));
    }

    let messages = value.as_array().ok_or_else(|| {
        RecordError::unprocessable(format!(
            "chat field '{}' value must be a list of dictionaries",
            field_name
        ))
    })?;

    for (i, message) in messages.iter().enumerate() {
        let message = message.as_object().ok_or_else(|| {
            RecordError::unprocessable(format!(
                "chat field '{}' value must be a list of dictionaries. Found a non-dictionary value at index {}",
                field_name, i
            ))
        })?;
        for key in ["content", "role"] {
            if !message.contains_key(key) {
                return Err(RecordError::unprocessable(format!(
                    "chat field '{}' value must be a list of dictionaries with a '{}' key. Missing '{}' key at index {}",
                    field_name, key, key, i
                )));
            }
        }
    }

    Ok(())
}

fn raw_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

fn invalid_image_url(field_name: &str) -> RecordError {
    RecordError::unprocessable(format!("image field '{}' has an invalid URL value", field_name))
}

/// Formats names as a Python list of strings: `['a', 'b']`.
pub(crate) fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| python_repr_str(s.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}
