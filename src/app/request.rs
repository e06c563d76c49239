use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::debug;
use url::Url;

use crate::ids::RequestId;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Inline header storage; names are shared `Arc<str>` since they repeat.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Shared object stored in a request's context slot.
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Request context handed to an [`Application`](super::Application).
///
/// `script_name` is the part of the path already consumed by dispatch,
/// `path_info` the part the application still has to route. Their
/// concatenation is always the full request path.
#[derive(Clone)]
pub struct PartyRequest {
    /// Unique request ID for log correlation
    pub request_id: RequestId,
    /// HTTP method
    pub method: Method,
    /// Prefix consumed by mounting
    pub script_name: String,
    /// Remaining path for the application
    pub path_info: String,
    /// Base URL the request was built against, if any
    pub base_url: Option<Url>,
    /// Query string parameters
    pub query_params: HashMap<String, String>,
    /// HTTP headers
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
    context: HashMap<String, ContextValue>,
}

impl fmt::Debug for PartyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartyRequest")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("script_name", &self.script_name)
            .field("path_info", &self.path_info)
            .field("base_url", &self.base_url)
            .field("query_params", &self.query_params)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("context_keys", &self.context.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PartyRequest {
    /// Build an ordinary request for `path` (query string allowed).
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        let (path_info, query_params) = split_query(path);
        Self {
            request_id: RequestId::new(),
            method,
            script_name: String::new(),
            path_info,
            base_url: None,
            query_params,
            headers: HeaderVec::new(),
            body: None,
            context: HashMap::new(),
        }
    }

    /// Build a synthetic GET request for `path`, optionally against a base URL.
    ///
    /// The base URL's path (without trailing slash) becomes `script_name`, the
    /// way a front door mounted below a prefix would see it.
    #[must_use]
    pub fn synthetic(path: &str, base_url: Option<&Url>) -> Self {
        let mut request = Self::new(Method::GET, path);
        if let Some(base) = base_url {
            request.script_name = base.path().trim_end_matches('/').to_string();
            if let Some(host) = base.host_str() {
                let host = match base.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };
                request.set_header("host", host);
            }
            request.base_url = Some(base.clone());
        }
        debug!(
            request_id = %request.request_id,
            script_name = %request.script_name,
            path_info = %request.path_info,
            "Synthetic request built"
        );
        request
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Full request path: consumed prefix followed by the remaining path
    #[must_use]
    pub fn full_path(&self) -> String {
        format!("{}{}", self.script_name, self.path_info)
    }

    /// Get a query parameter by name
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Store a shared object under `key`, replacing any previous value.
    pub fn insert_context<T: Any + Send + Sync>(&mut self, key: &str, value: Arc<T>) {
        self.context.insert(key.to_string(), value);
    }

    /// Fetch the object stored under `key` if it has type `T`.
    #[must_use]
    pub fn context<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.context
            .get(key)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }

    /// Whether anything is stored under `key`
    #[must_use]
    pub fn has_context(&self, key: &str) -> bool {
        self.context.contains_key(key)
    }
}

fn split_query(path: &str) -> (String, HashMap<String, String>) {
    match path.split_once('?') {
        Some((path, query)) => (
            path.to_string(),
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ),
        None => (path.to_string(), HashMap::new()),
    }
}
