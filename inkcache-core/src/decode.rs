//! Request decoder.
//!
//! Pulls the compressed diagram and theme selector out of a request URL.
//! Pure and synchronous: no I/O, no side effects.
//!
//! The payload uses the LZ "encoded URI component" scheme, whose alphabet is
//! `A-Z a-z 0-9 + - $`. A `+` in the query string is therefore data, not an
//! encoded space.

use std::borrow::Cow;

use crate::constants::{PAYLOAD_PARAM, THEME_PARAM};
use crate::error::DecodeError;
use crate::request::{DecodedRequest, Theme};

/// Characters the compressed payload may contain.
fn is_payload_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '$')
}

/// Query string portion of a path+query or absolute URL, without the `?`
/// and without any fragment.
fn query_of(raw_url: &str) -> &str {
    let without_fragment = raw_url.split('#').next().unwrap_or("");
    match without_fragment.split_once('?') {
        Some((_, query)) => query,
        None => "",
    }
}

fn percent_decode(raw: &str) -> Cow<'_, str> {
    urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
}

/// First value of `name` in the query string of `raw_url`, percent-decoded.
pub fn query_param<'a>(raw_url: &'a str, name: &str) -> Option<Cow<'a, str>> {
    query_of(raw_url)
        .split('&')
        .filter(|pair| !pair.is_empty())
        .find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(key) == name).then(|| percent_decode(value))
        })
}

/// Decode the diagram source and theme from a request URL.
pub fn decode(raw_url: &str) -> Result<DecodedRequest, DecodeError> {
    let payload = query_param(raw_url, PAYLOAD_PARAM)
        .filter(|value| !value.is_empty())
        .ok_or(DecodeError::MissingPayload)?;

    let diagram_source = decompress(&payload)?;
    let theme = Theme::from_param(query_param(raw_url, THEME_PARAM).as_deref());

    Ok(DecodedRequest {
        diagram_source,
        theme,
    })
}

/// Reverse the URL-safe compression of a diagram payload.
pub fn decompress(payload: &str) -> Result<String, DecodeError> {
    // Form-encoding clients turn `+` into a space.
    let payload = payload.replace(' ', "+");

    if let Some(bad) = payload.chars().find(|c| !is_payload_char(*c)) {
        return Err(DecodeError::InvalidPayload {
            reason: format!("unexpected character {:?} in payload", bad),
        });
    }

    let wide = lz_str::decompress_from_encoded_uri_component(payload.as_str()).ok_or_else(|| {
        DecodeError::InvalidPayload {
            reason: "payload is not a valid compressed stream".to_string(),
        }
    })?;

    let source = String::from_utf16(&wide).map_err(|e| DecodeError::InvalidPayload {
        reason: format!("decompressed payload is not valid text: {}", e),
    })?;

    if source.is_empty() {
        return Err(DecodeError::InvalidPayload {
            reason: "decompressed payload is empty".to_string(),
        });
    }

    Ok(source)
}

/// Compress a diagram source into a URL-safe payload. Inverse of
/// [`decompress`].
pub fn encode(diagram_source: &str) -> String {
    lz_str::compress_to_encoded_uri_component(diagram_source)
}
