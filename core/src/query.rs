//! Query-string parameters understood by the REST endpoint.
//!
//! Parameters keep insertion order. Setting a key twice replaces the earlier
//! value in place. `orderBy`, `startAt`, `endAt` and `equalTo` take JSON
//! encoded values on the wire (`orderBy="$key"`), which the typed helpers
//! take care of.

use serde_json::Value;

/// Name of the credential parameter; owned by `Reference`.
pub(crate) const AUTH_PARAM: &str = "auth";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw parameter, replacing any earlier value for `key`.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key, value)),
        }
        self
    }

    fn json_param(self, key: &str, value: impl Into<Value>) -> Self {
        let encoded = value.into().to_string();
        self.param(key, encoded)
    }

    /// Return only the top-level keys of the addressed node.
    pub fn shallow(self) -> Self {
        self.param("shallow", "true")
    }

    /// `pretty` or `silent`. With `silent` the server answers 204 with no body.
    pub fn print(self, format: impl Into<String>) -> Self {
        self.param("print", format)
    }

    pub fn order_by(self, child: &str) -> Self {
        self.json_param("orderBy", child)
    }

    pub fn order_by_key(self) -> Self {
        self.order_by("$key")
    }

    pub fn order_by_value(self) -> Self {
        self.order_by("$value")
    }

    pub fn order_by_priority(self) -> Self {
        self.order_by("$priority")
    }

    pub fn start_at(self, value: impl Into<Value>) -> Self {
        self.json_param("startAt", value)
    }

    pub fn end_at(self, value: impl Into<Value>) -> Self {
        self.json_param("endAt", value)
    }

    pub fn equal_to(self, value: impl Into<Value>) -> Self {
        self.json_param("equalTo", value)
    }

    pub fn limit_to_first(self, limit: u32) -> Self {
        self.param("limitToFirst", limit.to_string())
    }

    pub fn limit_to_last(self, limit: u32) -> Self {
        self.param("limitToLast", limit.to_string())
    }

    /// Server-side read timeout, e.g. `"3s"` or `"500ms"`.
    pub fn timeout(self, duration: impl Into<String>) -> Self {
        self.param("timeout", duration)
    }

    /// `tiny`, `small`, `medium`, `large` or `unlimited`.
    pub fn write_size_limit(self, limit: impl Into<String>) -> Self {
        self.param("writeSizeLimit", limit)
    }

    /// Include priority metadata in the returned tree.
    pub fn format_export(self) -> Self {
        self.param("format", "export")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Final parameter list: the caller's parameters minus any `auth` entry,
    /// then `auth=<token>` when a token is present.
    pub(crate) fn with_auth(&self, auth: Option<&str>) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(k, _)| k != AUTH_PARAM)
            .cloned()
            .collect();
        if let Some(token) = auth {
            params.push((AUTH_PARAM.to_string(), token.to_string()));
        }
        params
    }
}

impl<K, V> FromIterator<(K, V)> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Query::new(), |query, (k, v)| query.param(k, v))
    }
}
