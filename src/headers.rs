use std::collections::BTreeMap;
use std::ffi::OsString;

use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Environment variables starting with this prefix are forwarded as headers.
pub const ENV_PREFIX: &str = "PROMETHEUS_HEADER_";

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("invalid header name {name:?}")]
    InvalidName {
        name: String,
        #[source]
        source: reqwest::header::InvalidHeaderName,
    },
    #[error("invalid value for header {name:?}")]
    InvalidValue {
        name: String,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },
}

/// Converts an environment variable name into a header name, if it carries
/// the recognized prefix.
///
/// `PROMETHEUS_HEADER_X_API_KEY` becomes `X-API-KEY`.
pub fn header_name_from_env_key(key: &str) -> Option<String> {
    key.strip_prefix(ENV_PREFIX)
        .map(|suffix| suffix.replace('_', "-"))
}

/// Ordered set of headers to inject into every outgoing request.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(transparent)]
pub struct HeaderRules(IndexMap<String, String>);

impl HeaderRules {
    /// Scans the process environment for `PROMETHEUS_HEADER_*` variables.
    pub fn from_env() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Same as [`Self::from_vars`], skipping the prefixed entries that are
    /// not valid unicode with a warning.
    pub fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self::from_vars(vars.into_iter().filter_map(|(key, value)| {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    let key = key.unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
                    if key.starts_with(ENV_PREFIX) {
                        tracing::warn!(
                            key = %key,
                            "skipping environment variable that is not valid unicode"
                        );
                    }
                    None
                }
            }
        }))
    }

    /// Builds the rules from arbitrary key/value pairs, keeping only the
    /// prefixed keys.
    ///
    /// When several keys map to the same header name, they are applied in
    /// lexicographic order of the original key and the last one wins.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sorted = vars
            .into_iter()
            .map(|(key, value)| -> (String, String) { (key.into(), value.into()) })
            .filter(|(key, _): &(String, String)| key.starts_with(ENV_PREFIX))
            .collect::<BTreeMap<_, _>>();
        let mut rules = Self::default();
        for (key, value) in sorted {
            if let Some(name) = header_name_from_env_key(&key) {
                rules.insert(name, value);
            }
        }
        rules
    }

    pub fn insert<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.0.insert(name.into(), value.into());
    }

    pub fn with<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds every rule of `other`, overriding the ones with the same name.
    pub fn extend(&mut self, other: HeaderRules) {
        self.0.extend(other.0);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_header_map(&self) -> Result<HeaderMap, HeaderError> {
        let mut headers = HeaderMap::with_capacity(self.0.len());
        for (name, value) in self.iter() {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
                HeaderError::InvalidName {
                    name: name.to_owned(),
                    source,
                }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|source| {
                HeaderError::InvalidValue {
                    name: name.to_owned(),
                    source,
                }
            })?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}
