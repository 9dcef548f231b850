//! HTTP endpoint configuration and error classification
//!
//! Fetching is left to callers; this module owns the contract between an
//! endpoint's failures and the workflow: each [`EndpointError`] maps to an
//! [`ErrorClass`], and the endpoint's [`ErrorHandling`] maps that class to an
//! [`ExitPolicy`].
//!
//! ```yaml
//! url: https://api.example.com/v1/orders
//! method: get
//! headers:
//!   Authorization: Bearer ${API_TOKEN}
//! response_type: json
//! table_definition:
//!   - name: id
//!     data_type: INTEGER
//! error_handling:
//!   NetworkError: retry(5)
//!   Http4XXError: fail
//!   Http5XXError: retry
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

use crate::config::expand_env;
use crate::error::{Error, Result};
use crate::schema::{Column, Table};
use crate::strategy::LoadOptions;

/// Attempts used by a bare `retry` policy
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[hH][tT][tT][pP][sS]?://").expect("valid regex"));

/// Named class of endpoint failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Connection could not be established or was interrupted
    NetworkError,
    /// The server answered with a 4xx status
    Http4XXError,
    /// The server answered with a 5xx status
    Http5XXError,
    /// The response body could not be parsed
    InvalidBodyError,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorClass::NetworkError => "NetworkError",
            ErrorClass::Http4XXError => "Http4XXError",
            ErrorClass::Http5XXError => "Http5XXError",
            ErrorClass::InvalidBodyError => "InvalidBodyError",
        })
    }
}

/// What a workflow does when a step fails with a classified error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExitPolicy {
    /// Abort the workflow
    #[default]
    Fail,
    /// Re-run the failing step, at most `max_attempts` times in total
    Retry {
        /// Total attempts including the first
        max_attempts: u32,
    },
}

impl TryFrom<String> for ExitPolicy {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "fail" => Ok(ExitPolicy::Fail),
            "retry" => Ok(ExitPolicy::Retry {
                max_attempts: DEFAULT_RETRY_ATTEMPTS,
            }),
            other => other
                .strip_prefix("retry(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|n| n.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
                .map(|max_attempts| ExitPolicy::Retry { max_attempts })
                .ok_or_else(|| {
                    format!("invalid exit policy '{other}': expected fail, retry or retry(N)")
                }),
        }
    }
}

impl From<ExitPolicy> for String {
    fn from(policy: ExitPolicy) -> Self {
        match policy {
            ExitPolicy::Fail => "fail".to_string(),
            ExitPolicy::Retry { max_attempts } => format!("retry({max_attempts})"),
        }
    }
}

/// Error class to exit policy mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorHandling(HashMap<ErrorClass, ExitPolicy>);

impl ErrorHandling {
    /// Build from pairs
    pub fn new(policies: impl IntoIterator<Item = (ErrorClass, ExitPolicy)>) -> Self {
        Self(policies.into_iter().collect())
    }

    /// Policy for an error class; unclassified and unmapped errors fail
    pub fn policy_for(&self, class: Option<ErrorClass>) -> ExitPolicy {
        class
            .and_then(|class| self.0.get(&class).copied())
            .unwrap_or(ExitPolicy::Fail)
    }

    /// Whether any class is mapped
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Failure while fetching from an endpoint
#[derive(Error, Debug)]
pub enum EndpointError {
    /// Transport failure
    #[error("network error: {message}")]
    Network {
        /// Description
        message: String,
    },

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code
        status: u16,
        /// Response text or reason
        message: String,
    },

    /// Body could not be decoded as the configured response type
    #[error("invalid response body: {message}")]
    InvalidBody {
        /// Description
        message: String,
    },
}

impl EndpointError {
    /// The error's class, if it has one
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            EndpointError::Network { .. } => Some(ErrorClass::NetworkError),
            EndpointError::Http { status, .. } => match status {
                400..=499 => Some(ErrorClass::Http4XXError),
                500..=599 => Some(ErrorClass::Http5XXError),
                _ => None,
            },
            EndpointError::InvalidBody { .. } => Some(ErrorClass::InvalidBodyError),
        }
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// GET
    #[default]
    #[serde(alias = "GET")]
    Get,
    /// POST
    #[serde(alias = "POST")]
    Post,
}

/// Expected response body format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// JSON document
    #[default]
    Json,
    /// CSV document
    Csv,
}

/// HTTP basic authentication credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuth {
    /// User name
    pub username: String,
    /// Password
    pub password: String,
}

/// Endpoint configuration from `apis/<name>.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Request URL
    pub url: String,

    /// Request method
    #[serde(default)]
    pub method: HttpMethod,

    /// Basic auth credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,

    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Response body format
    #[serde(default)]
    pub response_type: ResponseType,

    /// Columns the response is loaded into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_definition: Option<Vec<Column>>,

    /// Load strategy for the destination table
    #[serde(default)]
    pub load_strategy: LoadOptions,

    /// Error class policies
    #[serde(default)]
    pub error_handling: ErrorHandling,
}

impl EndpointConfig {
    /// Validate the URL, table definition and load options
    pub fn validate(&self) -> Result<()> {
        if !URL.is_match(&self.url) {
            return Err(Error::config(format!(
                "endpoint url '{}' must start with http:// or https://",
                self.url
            )));
        }
        if let Some(table) = self.table("endpoint") {
            table.validate()?;
        }
        self.load_strategy.validate()
    }

    /// Expand `$VAR` / `${VAR}` in the URL, credentials and headers
    pub fn expand_env(mut self) -> Self {
        self.url = expand_env(&self.url);
        if let Some(auth) = self.basic_auth.as_mut() {
            auth.username = expand_env(&auth.username);
            auth.password = expand_env(&auth.password);
        }
        self.headers = self
            .headers
            .into_iter()
            .map(|(name, value)| (expand_env(&name), expand_env(&value)))
            .collect();
        self
    }

    /// The declared table, named `name`
    pub fn table(&self, name: &str) -> Option<Table> {
        self.table_definition
            .as_ref()
            .map(|columns| Table::new("endpoint", name, columns.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("fail", ExitPolicy::Fail)]
    #[case("Retry", ExitPolicy::Retry { max_attempts: 3 })]
    #[case("retry(5)", ExitPolicy::Retry { max_attempts: 5 })]
    fn test_parse_exit_policy(#[case] text: &str, #[case] expected: ExitPolicy) {
        assert_eq!(ExitPolicy::try_from(text.to_string()).unwrap(), expected);
    }

    #[rstest]
    #[case("retry(0)")]
    #[case("retry(x)")]
    #[case("ignore")]
    fn test_invalid_exit_policy(#[case] text: &str) {
        assert!(ExitPolicy::try_from(text.to_string()).is_err());
    }

    #[rstest]
    #[case(EndpointError::Network { message: "reset".into() }, Some(ErrorClass::NetworkError))]
    #[case(EndpointError::Http { status: 404, message: "".into() }, Some(ErrorClass::Http4XXError))]
    #[case(EndpointError::Http { status: 503, message: "".into() }, Some(ErrorClass::Http5XXError))]
    #[case(EndpointError::Http { status: 302, message: "".into() }, None)]
    #[case(EndpointError::InvalidBody { message: "eof".into() }, Some(ErrorClass::InvalidBodyError))]
    fn test_error_class(#[case] error: EndpointError, #[case] expected: Option<ErrorClass>) {
        assert_eq!(error.class(), expected);
    }

    #[test]
    fn test_parse_endpoint() {
        let yaml = r#"
url: https://api.example.com/orders
method: get
headers:
  X-Client: teleport
response_type: csv
table_definition:
  - name: id
    data_type: INTEGER
  - name: total
    data_type: DECIMAL
    options: { PRECISION: 10, SCALE: 2 }
error_handling:
  NetworkError: retry(5)
  Http4XXError: fail
  Http5XXError: retry
"#;
        let endpoint: EndpointConfig = serde_yaml::from_str(yaml).unwrap();
        endpoint.validate().unwrap();
        assert_eq!(endpoint.response_type, ResponseType::Csv);
        assert_eq!(endpoint.table("orders").unwrap().columns.len(), 2);

        let handling = &endpoint.error_handling;
        assert_eq!(
            handling.policy_for(Some(ErrorClass::NetworkError)),
            ExitPolicy::Retry { max_attempts: 5 }
        );
        assert_eq!(
            handling.policy_for(Some(ErrorClass::Http5XXError)),
            ExitPolicy::Retry { max_attempts: 3 }
        );
        assert_eq!(
            handling.policy_for(Some(ErrorClass::InvalidBodyError)),
            ExitPolicy::Fail
        );
        assert_eq!(handling.policy_for(None), ExitPolicy::Fail);
    }

    #[test]
    fn test_unknown_error_class_rejected() {
        let yaml = "url: https://x\nerror_handling:\n  TimeoutError: retry\n";
        assert!(serde_yaml::from_str::<EndpointConfig>(yaml).is_err());
    }

    #[rstest]
    #[case("ftp://example.com")]
    #[case("example.com/api")]
    fn test_invalid_url(#[case] url: &str) {
        let endpoint: EndpointConfig = serde_yaml::from_str(&format!("url: {url}")).unwrap();
        assert!(endpoint.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_expand_env() {
        let path = std::env::var("PATH").unwrap_or_default();
        let endpoint: EndpointConfig = serde_yaml::from_str(
            "url: HTTPS://api.example.com\nheaders:\n  X-Search-Path: \"${PATH}\"\n",
        )
        .unwrap();
        let endpoint = endpoint.expand_env();
        assert_eq!(endpoint.headers["X-Search-Path"], path);
        endpoint.validate().unwrap();
    }
}
