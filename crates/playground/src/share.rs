//! Share-link codec.
//!
//! The state is written as `key=value` pairs (values percent-encoded), joined
//! with `&` and stored behind `#` in the lz-string base64 format the web
//! playground reads and writes:
//!
//! ```text
//! #MYewtgDglgNg...   <-   compiler=g75&compiler_flags=-O2&code=int%20x%3B&...
//! ```
//!
//! Decoding never fails loudly: a URL without `#` means "nothing shared" and a
//! damaged or oversized payload decodes to `None` or to whatever pairs
//! survived.

use std::collections::HashMap;

use crate::state::PlaygroundState;

/// Longest fragment accepted for decoding, in characters.
///
/// lz-string output can grow quadratically with its input, so the fragment
/// is bounded before it is decompressed.
pub const MAX_SHARE_FRAGMENT: usize = 16 * 1024;

/// Longest decompressed payload accepted, in UTF-16 code units.
pub const MAX_SHARE_PAYLOAD: usize = 1024 * 1024;

/// Encode `state` into a `#payload` fragment.
pub fn encode(state: &PlaygroundState) -> String {
    let query = state
        .to_pairs()
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("#{}", lz_str::compress_to_base64(query.as_str()))
}

/// Full share URL: `base` (any existing fragment removed) plus the payload.
pub fn share_url(base: &str, state: &PlaygroundState) -> String {
    let base = base.split_once('#').map_or(base, |(page, _)| page);
    format!("{base}{}", encode(state))
}

/// Decode the fragment of `url` into a key/value map.
///
/// Returns `None` when the URL has no fragment, the payload cannot be
/// decompressed, or it exceeds [`MAX_SHARE_FRAGMENT`] / [`MAX_SHARE_PAYLOAD`].
/// Pairs without `=` or with invalid percent-encoding are skipped.
pub fn decode(url: &str) -> Option<HashMap<String, String>> {
    decode_with_limit(url, MAX_SHARE_PAYLOAD)
}

fn decode_with_limit(url: &str, max_payload: usize) -> Option<HashMap<String, String>> {
    let (_, fragment) = url.split_once('#')?;
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return None;
    }
    let query = decompress(fragment, max_payload)?;

    let mut data = HashMap::new();
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match urlencoding::decode(value) {
            Ok(value) => {
                data.insert(key.to_string(), value.into_owned());
            }
            Err(e) => tracing::debug!(key, error = %e, "skipping undecodable share value"),
        }
    }
    Some(data)
}

fn decompress(fragment: &str, max_payload: usize) -> Option<String> {
    if fragment.len() > MAX_SHARE_FRAGMENT {
        tracing::debug!(length = fragment.len(), "share fragment too long");
        return None;
    }
    if !fragment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
    {
        tracing::debug!("share fragment is not base64");
        return None;
    }
    let Some(units) = lz_str::decompress_from_base64(fragment) else {
        tracing::debug!("share fragment does not decompress");
        return None;
    };
    if units.len() > max_payload {
        tracing::debug!(length = units.len(), "share payload too large");
        return None;
    }
    match String::from_utf16(&units) {
        Ok(query) => Some(query),
        Err(e) => {
            tracing::debug!(error = %e, "share payload is not valid UTF-16");
            None
        }
    }
}
