use std::io::{Error as IoError, ErrorKind, Result as IOResult};
use std::path::Path;
use std::time::Duration;

use prometheus_http_query::response::Data;
use tracing::Instrument;

use crate::headers::HeaderRules;
use crate::transport::BuildError;

/// Overall timeout of the underlying http client.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Deadline for a single query, measured from the start of the evaluation.
pub const QUERY_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultType {
    Vector,
    Scalar,
    Matrix,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Scalar => "scalar",
            Self::Matrix => "matrix",
        }
    }
}

impl std::fmt::Display for ResultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create prometheus client")]
    Build(
        #[from]
        #[source]
        BuildError,
    ),
    #[error("failed to query prometheus")]
    Query(
        #[from]
        #[source]
        prometheus_http_query::Error,
    ),
    #[error("failed to query prometheus: no answer within {0:?}")]
    Timeout(Duration),
    #[error("unexpected result type from prometheus: {0}")]
    UnexpectedResultType(ResultType),
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Config {
    address: String,
    /// Headers set on every request, on top of the environment ones.
    #[serde(default)]
    headers: HeaderRules,
    /// Forward the `PROMETHEUS_HEADER_*` environment variables.
    #[serde(default = "crate::helper::default_true")]
    env_headers: bool,
}

impl Config {
    pub fn new<A: Into<String>>(address: A) -> Self {
        Self {
            address: address.into(),
            headers: HeaderRules::default(),
            env_headers: true,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> IOResult<Self> {
        let file = std::fs::read_to_string(path)?;
        toml::de::from_str(&file).map_err(|error| IoError::new(ErrorKind::InvalidData, error))
    }

    pub fn with_header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn without_env_headers(mut self) -> Self {
        self.env_headers = false;
        self
    }

    fn header_rules(&self) -> HeaderRules {
        let mut rules = if self.env_headers {
            HeaderRules::from_env()
        } else {
            HeaderRules::default()
        };
        rules.extend(self.headers.clone());
        rules
    }

    pub fn build(self) -> Result<Evaluator, BuildError> {
        let http = crate::transport::http_client(&self.header_rules(), HTTP_TIMEOUT)?;
        Evaluator::new(&self.address, http)
    }
}

/// Runs instant queries against a single server and reduces them to a
/// boolean.
#[derive(Clone)]
pub struct Evaluator {
    address: String,
    client: prometheus_http_query::Client,
    deadline: Duration,
}

impl Evaluator {
    pub fn new(address: &str, http: reqwest::Client) -> Result<Self, BuildError> {
        Ok(Self {
            address: address.to_owned(),
            client: crate::transport::prometheus_client(address, http)?,
            deadline: QUERY_DEADLINE,
        })
    }

    #[cfg(test)]
    fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Returns `true` when `query`, evaluated now, yields a non-empty vector.
    pub async fn evaluate(&self, query: &str) -> Result<bool, Error> {
        let span = tracing::info_span!("condition", address = %self.address, query = query);
        self.execute(query).instrument(span).await
    }

    async fn execute(&self, query: &str) -> Result<bool, Error> {
        let request = self.client.query(query).at(crate::helper::now()).get();
        let res = tokio::time::timeout(self.deadline, request)
            .await
            .map_err(|_| Error::Timeout(self.deadline))??;

        match res.data() {
            Data::Vector(samples) => {
                tracing::debug!(samples = samples.len(), "condition evaluated");
                Ok(!samples.is_empty())
            }
            Data::Scalar(_) => Err(Error::UnexpectedResultType(ResultType::Scalar)),
            Data::Matrix(_) => Err(Error::UnexpectedResultType(ResultType::Matrix)),
        }
    }
}

/// Evaluates `query` against the Prometheus server at `address`, forwarding
/// the `PROMETHEUS_HEADER_*` environment variables as headers.
///
/// The environment is read again on every call.
pub async fn evaluate(address: &str, query: &str) -> Result<bool, Error> {
    Config::new(address).build()?.evaluate(query).await
}
