//! Stream URI parsing shared by sources and outputs.
//!
//! Accepted shapes:
//! - `scheme://location?key=value&key=value`
//! - bare device paths such as `/dev/video0` (no scheme)
//!
//! `location` is the percent-decoded host, port and path. Fragments are dropped.

use anyhow::{anyhow, Context, Result};
use percent_encoding::percent_decode_str;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamUri {
    raw: String,
    scheme: Option<String>,
    location: String,
    params: Vec<(String, String)>,
}

impl StreamUri {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(anyhow!("stream URI must not be empty"));
        }

        // Device nodes are given as plain paths, not absolute URLs.
        if !raw.contains("://") {
            return Ok(Self {
                raw: raw.to_string(),
                scheme: None,
                location: raw.to_string(),
                params: Vec::new(),
            });
        }

        let url = Url::parse(raw).with_context(|| format!("invalid stream URI '{}'", raw))?;

        let mut location = String::new();
        if let Some(host) = url.host_str() {
            location.push_str(&decode(host, raw)?);
        }
        if let Some(port) = url.port() {
            location.push_str(&format!(":{}", port));
        }
        location.push_str(&decode(url.path(), raw)?);

        let params = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        Ok(Self {
            raw: raw.to_string(),
            scheme: Some(url.scheme().to_string()),
            location,
            params,
        })
    }

    /// The URI exactly as given (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lowercased scheme, if any.
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Decoded host, port and path, or the whole input when there is no scheme.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse a numeric query parameter.
    pub fn param_u64(&self, key: &str) -> Result<Option<u64>> {
        self.param(key)
            .map(|value| {
                value.parse::<u64>().map_err(|_| {
                    anyhow!("'{}' in {} must be an integer (got '{}')", key, self.raw, value)
                })
            })
            .transpose()
    }

    /// Parse a numeric query parameter that must fit in a `u32`.
    pub fn param_u32(&self, key: &str) -> Result<Option<u32>> {
        self.param_u64(key)?
            .map(|value| {
                u32::try_from(value).map_err(|_| {
                    anyhow!("'{}' in {} is out of range (got {})", key, self.raw, value)
                })
            })
            .transpose()
    }
}

impl std::fmt::Display for StreamUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn decode(component: &str, raw: &str) -> Result<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .with_context(|| format!("stream URI '{}' is not valid UTF-8 once decoded", raw))
}
