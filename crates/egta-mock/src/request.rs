use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::Value;
use url::form_urlencoded;

use crate::error::{MockError, MockResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl FromStr for MockMethod {
    type Err = MockError;

    fn from_str(method: &str) -> MockResult<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(MockMethod::Get),
            "POST" => Ok(MockMethod::Post),
            "PUT" => Ok(MockMethod::Put),
            "DELETE" => Ok(MockMethod::Delete),
            other => Err(MockError::BadRequest(format!("unsupported method {other}"))),
        }
    }
}

/// A request as the service sees it: method, path and the merged query and
/// form parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    pub method: MockMethod,
    pub path: String,
    pub params: Params,
}

impl MockRequest {
    /// Splits `target` (path plus optional query) and merges the urlencoded
    /// `body` into the parameters.
    pub fn new(method: MockMethod, target: &str, body: &[u8]) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let mut params = Params::default();
        params.extend(query.as_bytes());
        params.extend(body);
        Self {
            method,
            path: path.to_string(),
            params,
        }
    }

    /// Path segments with a trailing `.json` stripped from the last one.
    pub(crate) fn segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        if let Some(last) = segments.pop() {
            segments.push(last.strip_suffix(".json").unwrap_or(last));
        }
        segments
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    fn extend(&mut self, encoded: &[u8]) {
        self.0.extend(form_urlencoded::parse(encoded).into_owned());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub(crate) fn require(&self, key: &str) -> MockResult<&str> {
        self.get(key)
            .ok_or_else(|| MockError::Unprocessable(format!("missing parameter {key}")))
    }

    pub(crate) fn number<T: FromStr>(&self, key: &str) -> MockResult<Option<T>> {
        self.get(key)
            .map(|raw| {
                raw.parse().map_err(|_| {
                    MockError::Unprocessable(format!("parameter {key} is not a number: {raw}"))
                })
            })
            .transpose()
    }

    pub(crate) fn require_number<T: FromStr>(&self, key: &str) -> MockResult<T> {
        self.number(key)?
            .ok_or_else(|| MockError::Unprocessable(format!("missing parameter {key}")))
    }

    /// Rails-style booleans: `1`/`0` and `true`/`false`.
    pub(crate) fn flag(&self, key: &str) -> MockResult<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some("1") | Some("true") => Ok(Some(true)),
            Some("0") | Some("false") => Ok(Some(false)),
            Some(other) => Err(MockError::Unprocessable(format!(
                "parameter {key} is not a boolean: {other}"
            ))),
        }
    }

    /// Entries of `prefix[...]`, keyed by the bracketed name.
    pub(crate) fn nested(&self, prefix: &str) -> BTreeMap<String, String> {
        let opening = format!("{prefix}[");
        self.0
            .iter()
            .filter_map(|(key, value)| {
                let inner = key.strip_prefix(&opening)?.strip_suffix(']')?;
                Some((inner.to_string(), value.clone()))
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl MockResponse {
    pub(crate) fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: value.to_string(),
        }
    }

    pub(crate) fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body,
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            status: 204,
            content_type: "text/plain",
            body: String::new(),
        }
    }

    pub(crate) fn error(err: &MockError) -> Self {
        Self {
            status: err.status(),
            content_type: "text/plain",
            body: err.to_string(),
        }
    }
}
