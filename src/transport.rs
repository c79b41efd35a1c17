//! Builds the http stack used to talk to a Prometheus server: a reqwest
//! client carrying the configured headers on every request, wrapped into a
//! Prometheus API client.

use std::time::Duration;

use url::Url;

use crate::headers::{HeaderError, HeaderRules};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("unable to parse address")]
    InvalidAddress(#[source] url::ParseError),
    #[error("unsupported scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("unable to build http client")]
    HttpClient(#[source] reqwest::Error),
    #[error("unable to build prometheus client")]
    Prometheus(#[source] prometheus_http_query::Error),
    #[error("unable to build headers")]
    Headers(
        #[from]
        #[source]
        HeaderError,
    ),
}

/// Builds a reqwest client that sets every rule as a header on each request.
pub fn http_client(rules: &HeaderRules, timeout: Duration) -> Result<reqwest::Client, BuildError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(rules.to_header_map()?)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(BuildError::HttpClient)
}

/// Binds `http` to the Prometheus server at `address`.
///
/// Only absolute `http` and `https` addresses are accepted.
pub fn prometheus_client(
    address: &str,
    http: reqwest::Client,
) -> Result<prometheus_http_query::Client, BuildError> {
    let url = Url::parse(address).map_err(BuildError::InvalidAddress)?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(BuildError::UnsupportedScheme(other.to_owned())),
    }
    prometheus_http_query::Client::from(http, address).map_err(BuildError::Prometheus)
}
