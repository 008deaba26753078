//! Thin authenticated HTTP helpers shared by the Google API clients.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Read;

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Map a ureq error to a single-line error carrying status and body.
fn api_error(url: &str, err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            anyhow!("{url}: HTTP {code}: {body}")
        }
        other => anyhow::Error::new(other).context(url.to_string()),
    }
}

pub(crate) fn get_json<T: DeserializeOwned>(
    url: &str,
    query: &[(&str, &str)],
    token: &str,
) -> Result<T> {
    let mut request = ureq::get(url).set("Authorization", &bearer(token));
    for (name, value) in query {
        request = request.query(name, value);
    }
    let response = request.call().map_err(|err| api_error(url, err))?;
    response
        .into_json()
        .with_context(|| format!("invalid JSON from {url}"))
}

pub(crate) fn post_json<T: DeserializeOwned>(
    url: &str,
    body: &impl Serialize,
    token: &str,
) -> Result<T> {
    let response = ureq::post(url)
        .set("Authorization", &bearer(token))
        .send_json(body)
        .map_err(|err| api_error(url, err))?;
    response
        .into_json()
        .with_context(|| format!("invalid JSON from {url}"))
}

pub(crate) fn put_json<T: DeserializeOwned>(
    url: &str,
    query: &[(&str, &str)],
    body: &impl Serialize,
    token: &str,
) -> Result<T> {
    let mut request = ureq::put(url).set("Authorization", &bearer(token));
    for (name, value) in query {
        request = request.query(name, value);
    }
    let response = request.send_json(body).map_err(|err| api_error(url, err))?;
    response
        .into_json()
        .with_context(|| format!("invalid JSON from {url}"))
}

pub(crate) fn patch_json<T: DeserializeOwned>(
    url: &str,
    query: &[(&str, &str)],
    body: &impl Serialize,
    token: &str,
) -> Result<T> {
    let mut request = ureq::request("PATCH", url).set("Authorization", &bearer(token));
    for (name, value) in query {
        request = request.query(name, value);
    }
    let response = request.send_json(body).map_err(|err| api_error(url, err))?;
    response
        .into_json()
        .with_context(|| format!("invalid JSON from {url}"))
}

pub(crate) fn post_bytes<T: DeserializeOwned>(
    url: &str,
    query: &[(&str, &str)],
    content_type: &str,
    body: &[u8],
    token: &str,
) -> Result<T> {
    let mut request = ureq::post(url)
        .set("Authorization", &bearer(token))
        .set("Content-Type", content_type);
    for (name, value) in query {
        request = request.query(name, value);
    }
    let response = request.send_bytes(body).map_err(|err| api_error(url, err))?;
    response
        .into_json()
        .with_context(|| format!("invalid JSON from {url}"))
}

pub(crate) fn get_bytes(url: &str, query: &[(&str, &str)], token: &str) -> Result<Vec<u8>> {
    let mut request = ureq::get(url).set("Authorization", &bearer(token));
    for (name, value) in query {
        request = request.query(name, value);
    }
    let response = request.call().map_err(|err| api_error(url, err))?;
    let mut buf = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut buf)
        .with_context(|| format!("failed to read body from {url}"))?;
    Ok(buf)
}

/// Percent-encode a value for use as a single URL path segment.
pub(crate) fn encode_path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_reserved_path_characters() {
        assert_eq!(encode_path_segment("plain-name_1.xml"), "plain-name_1.xml");
        assert_eq!(
            encode_path_segment("exports/run 1/file.zip"),
            "exports%2Frun%201%2Ffile.zip"
        );
        assert_eq!(encode_path_segment("Sheet1!A1"), "Sheet1%21A1");
    }

    #[test]
    fn encodes_non_ascii_bytes() {
        assert_eq!(encode_path_segment("café"), "caf%C3%A9");
    }
}
