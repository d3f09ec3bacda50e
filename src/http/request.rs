//! Parsed request model.
//!
//! A [`Request`] is built once by the parser and never mutated afterwards.
//! It is owned by the worker serving the connection and dropped with it.

use std::fmt;

/// Request method. Anything outside the four served methods is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Other(other) => other,
        }
    }
}

impl From<&str> for Method {
    fn from(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            other => Method::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header map preserving names as received.
///
/// Inserting a name that is already present (exact match) replaces it and
/// moves it to the end, so entries stay in receive order. Lookups ignore
/// ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing an identically named one.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.push((name, value.into()));
    }

    /// Case-insensitive lookup. If names differing only in case were both
    /// received, the one received last wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// A fully read HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    uri: String,
    version: String,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(
        method: Method,
        uri: impl Into<String>,
        version: impl Into<String>,
        headers: Headers,
        body: Option<Vec<u8>>,
    ) -> Self {
        Self {
            method,
            uri: uri.into(),
            version: version.into(),
            headers,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Body bytes; present only when a positive Content-Length was read in full.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Body bytes, or an empty slice when there is no body.
    pub fn body_or_empty(&self) -> &[u8] {
        self.body().unwrap_or_default()
    }
}
