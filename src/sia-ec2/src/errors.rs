// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Errors reported while bootstrapping the instance identity.
//!
//! Only two kinds of errors cross the crate boundary: the identity evidence
//! is unavailable, or no configuration source produced a usable service
//! identity. Everything else is a [StrategyError] that the resolver absorbs,
//! logs, and uses to decide whether to try the next strategy.

use http::StatusCode;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for the identity bootstrap.
///
/// Both variants are fatal: the bootstrap must abort before requesting any
/// credential.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    /// The identity document or its signature could not be obtained.
    ///
    /// Partial evidence is never returned, a document without its signature
    /// is reported with this error too.
    pub fn is_evidence_unavailable(&self) -> bool {
        matches!(self.0, ErrorKind::EvidenceUnavailable(_))
    }

    /// All the configuration strategies failed.
    ///
    /// The [source][std::error::Error::source] of this error is the
    /// [StrategyError] reported by the last strategy.
    pub fn is_config_resolution_failed(&self) -> bool {
        matches!(self.0, ErrorKind::ConfigResolutionFailed(_))
    }

    pub(crate) fn evidence_unavailable<T>(source: T) -> Error
    where
        T: Into<BoxError>,
    {
        Error(ErrorKind::EvidenceUnavailable(source.into()))
    }

    pub(crate) fn config_resolution_failed(source: StrategyError) -> Error {
        Error(ErrorKind::ConfigResolutionFailed(source))
    }
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("cannot obtain the instance identity evidence")]
    EvidenceUnavailable(#[source] BoxError),
    #[error("cannot determine the service identity from any configuration source")]
    ConfigResolutionFailed(#[source] StrategyError),
}

/// The failure of a single configuration strategy.
///
/// These errors are recovered by falling through to the next strategy. They
/// are only visible to applications as the source of a
/// [config resolution][Error::is_config_resolution_failed] error.
///
/// The message includes the underlying cause, these errors have no source.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct StrategyError(StrategyErrorKind);

impl StrategyError {
    /// The configuration file could not be found or read.
    pub fn is_loading(&self) -> bool {
        matches!(self.0, StrategyErrorKind::Loading { .. })
    }

    /// The configuration file could not be parsed.
    pub fn is_parsing(&self) -> bool {
        matches!(self.0, StrategyErrorKind::Parsing(_))
    }

    /// A required setting is missing or has an invalid value.
    pub fn is_missing_setting(&self) -> bool {
        matches!(self.0, StrategyErrorKind::MissingSetting(_))
    }

    /// The strategy produced an account without account, domain or service.
    pub fn is_unusable_account(&self) -> bool {
        matches!(self.0, StrategyErrorKind::UnusableAccount(_))
    }

    /// No local security credentials could be found or used.
    pub fn is_credentials(&self) -> bool {
        matches!(self.0, StrategyErrorKind::Credentials(_))
    }

    /// A role or instance profile ARN did not follow the naming convention.
    pub fn is_arn(&self) -> bool {
        matches!(self.0, StrategyErrorKind::Arn(_))
    }

    /// A request to the instance metadata service failed.
    pub fn is_metadata(&self) -> bool {
        matches!(self.0, StrategyErrorKind::Metadata(_))
    }

    pub(crate) fn loading(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self(StrategyErrorKind::Loading {
            path: path.into(),
            error,
        })
    }

    pub(crate) fn parsing<T>(source: T) -> Self
    where
        T: Into<BoxError>,
    {
        Self(StrategyErrorKind::Parsing(source.into()))
    }

    pub(crate) fn missing_setting<T: Into<String>>(setting: T) -> Self {
        Self(StrategyErrorKind::MissingSetting(setting.into()))
    }

    pub(crate) fn unusable_account<T: Into<String>>(message: T) -> Self {
        Self(StrategyErrorKind::UnusableAccount(message.into()))
    }

    pub(crate) fn credentials<T>(source: T) -> Self
    where
        T: Into<BoxError>,
    {
        Self(StrategyErrorKind::Credentials(source.into()))
    }

    pub(crate) fn not_configured() -> Self {
        Self(StrategyErrorKind::NotConfigured)
    }
}

impl From<ArnError> for StrategyError {
    fn from(value: ArnError) -> Self {
        Self(StrategyErrorKind::Arn(value))
    }
}

impl From<MetadataError> for StrategyError {
    fn from(value: MetadataError) -> Self {
        Self(StrategyErrorKind::Metadata(value))
    }
}

#[derive(thiserror::Error, Debug)]
enum StrategyErrorKind {
    #[error("cannot read the configuration file {}: {error}", .path.display())]
    Loading { path: PathBuf, error: std::io::Error },
    #[error("cannot parse the configuration file: {0}")]
    Parsing(BoxError),
    #[error("missing or invalid setting: {0}")]
    MissingSetting(String),
    #[error("no usable account: {0}")]
    UnusableAccount(String),
    #[error("cannot use the local security credentials: {0}")]
    Credentials(BoxError),
    #[error(transparent)]
    Arn(ArnError),
    #[error(transparent)]
    Metadata(MetadataError),
    #[error("no configuration strategies are available")]
    NotConfigured,
}

/// A request to the instance metadata service failed.
///
/// The message includes the underlying cause, if any.
#[derive(Debug)]
pub struct MetadataError {
    path: String,
    status: Option<StatusCode>,
    is_transient: bool,
    cause: Option<BoxError>,
}

impl MetadataError {
    /// The request path, relative to the metadata endpoint.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The HTTP status returned by the endpoint, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns `true` if a future attempt might succeed.
    ///
    /// The bootstrap never retries. Applications that wrap it in their own
    /// retry loop can use this to stop early.
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub(crate) fn from_send(path: &str, source: reqwest::Error) -> Self {
        Self {
            path: path.to_string(),
            status: None,
            is_transient: source.is_connect() || source.is_timeout(),
            cause: Some(source.into()),
        }
    }

    pub(crate) fn from_status(path: &str, status: StatusCode) -> Self {
        Self {
            path: path.to_string(),
            status: Some(status),
            is_transient: is_retryable(status),
            cause: None,
        }
    }

    pub(crate) fn from_body<T>(path: &str, source: T) -> Self
    where
        T: Into<BoxError>,
    {
        Self {
            path: path.to_string(),
            status: None,
            is_transient: false,
            cause: Some(source.into()),
        }
    }
}

impl Display for MetadataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to fetch {} from the instance metadata service",
            self.path
        )?;
        if let Some(status) = self.status {
            write!(f, ", status={status}")?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MetadataError {}

/// An ARN does not have the expected shape.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("invalid ARN <{arn}>: {reason}")]
pub struct ArnError {
    arn: String,
    reason: &'static str,
}

impl ArnError {
    pub(crate) fn new(arn: &str, reason: &'static str) -> Self {
        Self {
            arn: arn.to_string(),
            reason,
        }
    }
}

pub(crate) fn is_retryable(c: StatusCode) -> bool {
    match c {
        // Internal server errors do not indicate that there is anything wrong
        // with our request, so a later attempt may succeed.
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::REQUEST_TIMEOUT
        | StatusCode::TOO_MANY_REQUESTS => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use test_case::test_case;

    #[test_case(StatusCode::INTERNAL_SERVER_ERROR)]
    #[test_case(StatusCode::SERVICE_UNAVAILABLE)]
    #[test_case(StatusCode::REQUEST_TIMEOUT)]
    #[test_case(StatusCode::TOO_MANY_REQUESTS)]
    fn retryable(c: StatusCode) {
        assert!(is_retryable(c));
        assert!(MetadataError::from_status("/test", c).is_transient());
    }

    #[test_case(StatusCode::NOT_FOUND)]
    #[test_case(StatusCode::UNAUTHORIZED)]
    #[test_case(StatusCode::BAD_REQUEST)]
    #[test_case(StatusCode::BAD_GATEWAY)]
    fn non_retryable(c: StatusCode) {
        assert!(!is_retryable(c));
        assert!(!MetadataError::from_status("/test", c).is_transient());
    }

    #[test]
    fn constructors() {
        let error = Error::evidence_unavailable("test message");
        assert!(error.is_evidence_unavailable(), "{error:?}");
        assert!(!error.is_config_resolution_failed(), "{error:?}");
        let source = error.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("test message"), "{error:?}");

        let error = Error::config_resolution_failed(StrategyError::missing_setting("TEST_VAR"));
        assert!(error.is_config_resolution_failed(), "{error:?}");
        assert!(!error.is_evidence_unavailable(), "{error:?}");
        let source = error
            .source()
            .and_then(|e| e.downcast_ref::<StrategyError>())
            .expect("the source should be the last strategy error");
        assert!(source.is_missing_setting(), "{source:?}");
    }

    #[test]
    fn strategy_error_predicates() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "test-only");
        let error = StrategyError::loading("/test/sia_config", io);
        assert!(error.is_loading(), "{error:?}");
        assert!(error.to_string().contains("/test/sia_config"), "{error}");
        assert!(error.to_string().contains("test-only"), "{error}");

        let error = StrategyError::parsing("test-only");
        assert!(error.is_parsing(), "{error:?}");
        assert_eq!(
            error.to_string(),
            "cannot parse the configuration file: test-only"
        );

        let error = StrategyError::unusable_account("test-only");
        assert!(error.is_unusable_account(), "{error:?}");

        let error = StrategyError::credentials("test-only");
        assert!(error.is_credentials(), "{error:?}");

        let error = StrategyError::from(ArnError::new("arn:bad", "test-only"));
        assert!(error.is_arn(), "{error:?}");
        assert!(error.to_string().contains("arn:bad"), "{error}");

        let error = StrategyError::from(MetadataError::from_status(
            "/latest/meta-data/iam/info",
            StatusCode::NOT_FOUND,
        ));
        assert!(error.is_metadata(), "{error:?}");
        assert!(error.to_string().contains("iam/info"), "{error}");
        assert!(error.to_string().contains("404"), "{error}");
    }

    #[test]
    fn metadata_error_fmt() {
        let error = MetadataError::from_body("/test/path", "test-only-body-error");
        let got = error.to_string();
        assert!(got.contains("/test/path"), "{got}");
        assert!(got.contains("test-only-body-error"), "{got}");
        assert_eq!(error.path(), "/test/path");
        assert!(error.status().is_none(), "{error:?}");
    }

    // Each cause is reported once, either in the message or as the source.
    #[test]
    fn causes_not_repeated() {
        let error = Error::evidence_unavailable(MetadataError::from_body(
            "/test/path",
            "test-only-body-error",
        ));
        let mut messages = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(&error);
        while let Some(e) = current {
            messages.push(e.to_string());
            current = e.source();
        }
        assert_eq!(messages.len(), 2, "{messages:?}");
        let mentions = messages
            .iter()
            .filter(|m| m.contains("test-only-body-error"))
            .count();
        assert_eq!(mentions, 1, "{messages:?}");

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "test-only");
        let error = Error::config_resolution_failed(StrategyError::loading("/test/sia_config", io));
        assert!(!error.to_string().contains("test-only"), "{error}");
        let source = error.source().expect("the strategy error is the source");
        assert!(source.to_string().contains("test-only"), "{source}");
        assert!(source.source().is_none(), "{source:?}");

        let error = StrategyError::from(MetadataError::from_body("/test/path", "test-only"));
        assert!(error.to_string().contains("test-only"), "{error}");
        assert!(error.source().is_none(), "{error:?}");
    }
}
