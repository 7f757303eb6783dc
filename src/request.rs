//! Navigation targets and their normalization.
//!
//! Callers describe where to go either with a bare path (`"/pages/detail"`) or
//! with a structured [`NavigationRequest`] carrying query data. Before a
//! target reaches the guard pipeline, the history ledger, or the host, it is
//! normalized: the `query` map is serialized into the url and removed.
//!
//! Query encoding rules:
//!
//! - keys keep their insertion order;
//! - values that are empty (see [`is_empty`](crate::utils::is_empty)) are
//!   skipped;
//! - strings, numbers and booleans are appended as-is;
//! - arrays and objects are written as JSON text and percent-encoded.
//!
//! # Example
//!
//! ```
//! use miniapp_navigator::{normalize, NavigationRequest};
//! use serde_json::json;
//!
//! let request = NavigationRequest::new("/pages/detail")
//!     .query_param("id", json!(1))
//!     .query_param("tags", json!(["a", "b"]));
//!
//! let normalized = normalize(request);
//! assert_eq!(normalized.url, "/pages/detail?id=1&tags=%5B%22a%22%2C%22b%22%5D");
//! assert!(normalized.query.is_none());
//! ```

use crate::error::{NavigationError, NavigationResult};
use crate::utils::{is_empty, is_mapping, is_sequence};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A navigation request as seen by guards, the history ledger and the host.
///
/// `extra` holds any free-form fields the caller attached (animation type,
/// event channels, ...). They travel with the request untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationRequest {
    /// Target page path, including the encoded search string once normalized.
    pub url: String,

    /// Query data not yet merged into `url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Map<String, Value>>,

    /// Additional caller-supplied fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NavigationRequest {
    /// Create a request for `url` with no query data.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: None,
            extra: Map::new(),
        }
    }

    /// Replace the query map.
    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = Some(query);
        self
    }

    /// Append a single query entry, keeping insertion order.
    pub fn query_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Attach a free-form field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// `true` once the query map has been folded into the url.
    pub fn is_normalized(&self) -> bool {
        self.query.is_none()
    }

    /// The url without its search string.
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(path, _)| path)
    }

    /// The search string without the leading `?`, if any.
    pub fn search(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, search)| search)
    }

    /// Parse a request from a dynamic value.
    ///
    /// The value must be an object with a string `url`; `query`, when present
    /// and not `null`, must be an object.
    pub fn from_value(value: Value) -> NavigationResult<Self> {
        let Value::Object(mut fields) = value else {
            return Err(NavigationError::invalid_argument(
                "navigation target must be a path string or an object",
            ));
        };

        let url = match fields.remove("url") {
            Some(Value::String(url)) => url,
            Some(_) => {
                return Err(NavigationError::invalid_argument(
                    "navigation target `url` must be a string",
                ))
            }
            None => {
                return Err(NavigationError::invalid_argument(
                    "navigation target is missing `url`",
                ))
            }
        };

        let query = match fields.remove("query") {
            None | Some(Value::Null) => None,
            Some(Value::Object(query)) => Some(query),
            Some(_) => {
                return Err(NavigationError::invalid_argument(
                    "navigation target `query` must be an object",
                ))
            }
        };

        Ok(Self {
            url,
            query,
            extra: fields,
        })
    }
}

impl std::fmt::Display for NavigationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Anything a navigation method accepts as its destination.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationTarget {
    /// A bare path, possibly already carrying a search string.
    Path(String),
    /// A structured request.
    Request(NavigationRequest),
}

impl NavigationTarget {
    /// Parse a target from a dynamic value: a string or a request object.
    pub fn from_value(value: Value) -> NavigationResult<Self> {
        match value {
            Value::String(path) => Ok(Self::Path(path)),
            other => NavigationRequest::from_value(other).map(Self::Request),
        }
    }

    /// Normalize into a request with the query folded into the url.
    pub fn normalize(self) -> NavigationRequest {
        match self {
            Self::Path(url) => NavigationRequest::new(url),
            Self::Request(request) => normalize_request(request),
        }
    }
}

impl From<&str> for NavigationTarget {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for NavigationTarget {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<NavigationRequest> for NavigationTarget {
    fn from(request: NavigationRequest) -> Self {
        Self::Request(request)
    }
}

impl From<&NavigationRequest> for NavigationTarget {
    fn from(request: &NavigationRequest) -> Self {
        Self::Request(request.clone())
    }
}

impl TryFrom<Value> for NavigationTarget {
    type Error = NavigationError;

    fn try_from(value: Value) -> NavigationResult<Self> {
        Self::from_value(value)
    }
}

/// Normalize a navigation target.
///
/// The result owns its data; mutating the caller's request afterwards does not
/// affect it.
pub fn normalize(target: impl Into<NavigationTarget>) -> NavigationRequest {
    target.into().normalize()
}

fn normalize_request(mut request: NavigationRequest) -> NavigationRequest {
    let Some(query) = request.query.take() else {
        return request;
    };

    let search = encode_query(&query);
    if !search.is_empty() {
        let separator = if request.url.contains('?') { '&' } else { '?' };
        request.url.push(separator);
        request.url.push_str(&search);
    }
    request
}

/// Serialize a query map into `key=value&...`, skipping empty values.
pub fn encode_query(query: &Map<String, Value>) -> String {
    query
        .iter()
        .filter(|(_, value)| !is_empty(value))
        .map(|(key, value)| format!("{}={}", key, encode_value(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        v if is_sequence(v) || is_mapping(v) => urlencoding::encode(&v.to_string()).into_owned(),
        other => other.to_string(),
    }
}

/// Options for a back navigation.
///
/// `delta` is the number of pages to pop; `0` makes the call a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackOptions {
    #[serde(default = "default_delta")]
    pub delta: usize,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn default_delta() -> usize {
    1
}

impl BackOptions {
    pub fn new(delta: usize) -> Self {
        Self {
            delta,
            extra: Map::new(),
        }
    }

    /// Parse from a dynamic value: `null`, an integer, or an object with an
    /// optional integer `delta`.
    pub fn from_value(value: Value) -> NavigationResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Number(n) => n
                .as_u64()
                .map(|delta| Self::new(usize::try_from(delta).unwrap_or(usize::MAX)))
                .ok_or_else(|| {
                    NavigationError::invalid_argument("`delta` must be a non-negative integer")
                }),
            Value::Object(mut fields) => {
                let delta = match fields.remove("delta") {
                    None | Some(Value::Null) => default_delta(),
                    Some(Value::Number(n)) => n
                        .as_u64()
                        .map(|delta| usize::try_from(delta).unwrap_or(usize::MAX))
                        .ok_or_else(|| {
                            NavigationError::invalid_argument(
                                "`delta` must be a non-negative integer",
                            )
                        })?,
                    Some(_) => {
                        return Err(NavigationError::invalid_argument(
                            "`delta` must be a non-negative integer",
                        ))
                    }
                };
                Ok(Self {
                    delta,
                    extra: fields,
                })
            }
            _ => Err(NavigationError::invalid_argument(
                "back target must be an integer or an object",
            )),
        }
    }
}

impl Default for BackOptions {
    fn default() -> Self {
        Self::new(default_delta())
    }
}

impl From<usize> for BackOptions {
    fn from(delta: usize) -> Self {
        Self::new(delta)
    }
}

impl From<Option<usize>> for BackOptions {
    fn from(delta: Option<usize>) -> Self {
        delta.map_or_else(Self::default, Self::new)
    }
}

impl TryFrom<Value> for BackOptions {
    type Error = NavigationError;

    fn try_from(value: Value) -> NavigationResult<Self> {
        Self::from_value(value)
    }
}
