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

//! Runs the configuration strategies until one finds the service identity.
//!
//! The default cascade is:
//!
//! 1. The configuration file.
//! 2. The `ATHENZ_SIA_*` environment variables.
//! 3. The role name in the local AWS credentials, as reported by STS.
//! 4. The instance profile name.
//!
//! The first strategy that produces a usable account wins. A strategy that
//! fails, or produces an account without account id, domain or service, is
//! logged and the next strategy runs. The most recent [ServiceConfig] any
//! strategy produced, even a failing one, is handed to the next strategy and
//! returned with the winning account. The account itself is returned exactly
//! as the winning strategy produced it.

use crate::Result;
use crate::config::{
    CredsStrategy, EnvSource, EnvStrategy, FileStrategy, Hints, ProfileStrategy,
    ResolutionStrategy, SERVICE_NAME_SUFFIX, ServiceConfig, ServiceConfigAccount,
};
use crate::errors::{Error, StrategyError};
use crate::{meta, sts};
use std::path::PathBuf;

/// Runs an ordered list of [ResolutionStrategy] implementations.
#[derive(Debug)]
pub struct Resolver {
    hints: Hints,
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl Resolver {
    pub fn new(hints: Hints, strategies: Vec<Box<dyn ResolutionStrategy>>) -> Self {
        Self { hints, strategies }
    }

    /// Creates a resolver with the four standard strategies.
    ///
    /// The `ATHENZ_SIA_*` variables are captured when this function runs. The
    /// AWS credentials are only looked up if the credentials strategy runs.
    pub fn default_cascade<P: Into<PathBuf>>(config_file: P, hints: Hints) -> Self {
        let metadata = meta::Client::new(hints.metadata_endpoint.clone());
        let sts = sts::Client::new(hints.use_regional_sts, &hints.region)
            .with_metadata_endpoint(metadata.endpoint());
        let strategies: Vec<Box<dyn ResolutionStrategy>> = vec![
            Box::new(FileStrategy::new(config_file, hints.clone())),
            Box::new(EnvStrategy::new(EnvSource::from_process(), hints.clone())),
            Box::new(CredsStrategy::new(SERVICE_NAME_SUFFIX, sts)),
            Box::new(ProfileStrategy::new(metadata, SERVICE_NAME_SUFFIX)),
        ];
        Self::new(hints, strategies)
    }

    /// Runs the strategies in order and returns the first usable account.
    ///
    /// Fails with a [config resolution][Error::is_config_resolution_failed]
    /// error if no strategy succeeds. The source of that error is the failure
    /// of the last strategy.
    pub async fn resolve(&self) -> Result<(ServiceConfig, ServiceConfigAccount)> {
        let mut config: Option<ServiceConfig> = None;
        let mut last_error = None;
        for (i, strategy) in self.strategies.iter().enumerate() {
            if i != 0 {
                tracing::info!(
                    "trying to determine the service identity from the {}",
                    strategy.name()
                );
            }
            let outcome = strategy.resolve(config.as_ref()).await;
            if outcome.config.is_some() {
                config = outcome.config;
            }
            let account = outcome.account.and_then(|a| {
                if a.is_usable() {
                    Ok(a)
                } else {
                    Err(StrategyError::unusable_account(format!(
                        "the {} produced an account without account id, domain or service",
                        strategy.name()
                    )))
                }
            });
            match account {
                Ok(account) => {
                    let config = config.unwrap_or_else(|| ServiceConfig::from_hints(&self.hints));
                    tracing::info!(
                        "determined service {} in account {} from the {}",
                        account.name,
                        account.account,
                        strategy.name()
                    );
                    return Ok((config, account));
                }
                Err(e) => {
                    tracing::warn!(
                        "unable to determine the service identity from the {}: {e}",
                        strategy.name()
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(Error::config_resolution_failed(
            last_error.unwrap_or_else(StrategyError::not_configured),
        ))
    }
}

/// Determines the service identity using the standard cascade.
///
/// `region` and `account` are usually taken from the instance identity
/// document. They fill in the settings the configuration sources leave empty.
///
/// # Example
/// ```no_run
/// # async fn sample() -> Result<(), sia_ec2::errors::Error> {
/// let (config, account) = sia_ec2::resolver::resolve_config(
///     "/etc/sia/sia_config",
///     None,
///     false,
///     "us-west-2",
///     "123456789012",
/// )
/// .await?;
/// println!("running as {} with ZTS at {}", account.name, config.zts_url);
/// # Ok(()) }
/// ```
pub async fn resolve_config<P: Into<PathBuf>>(
    config_file: P,
    metadata_endpoint: Option<&str>,
    use_regional_sts: bool,
    region: &str,
    account: &str,
) -> Result<(ServiceConfig, ServiceConfigAccount)> {
    let hints = Hints {
        metadata_endpoint: metadata_endpoint.map(str::to_string),
        use_regional_sts,
        region: region.to_string(),
        account: account.to_string(),
    };
    Resolver::default_cascade(config_file, hints).resolve().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyOutcome;
    use pretty_assertions::assert_eq;
    use sia_test_utils::tracing::capture_events;
    use std::error::Error as _;
    use std::sync::{Arc, Mutex};
    use test_case::test_case;

    type TestResult = anyhow::Result<()>;
    type Calls = Arc<Mutex<Vec<(String, Option<ServiceConfig>)>>>;

    #[derive(Debug)]
    struct FakeStrategy {
        name: String,
        config: Option<ServiceConfig>,
        account: Option<ServiceConfigAccount>,
        calls: Calls,
    }

    impl FakeStrategy {
        fn new(name: &str, calls: &Calls) -> Self {
            Self {
                name: name.to_string(),
                config: None,
                account: None,
                calls: calls.clone(),
            }
        }

        fn with_config(mut self, config: ServiceConfig) -> Self {
            self.config = Some(config);
            self
        }

        fn with_account(mut self, account: ServiceConfigAccount) -> Self {
            self.account = Some(account);
            self
        }
    }

    #[async_trait::async_trait]
    impl ResolutionStrategy for FakeStrategy {
        fn name(&self) -> &str {
            &self.name
        }

        async fn resolve(&self, base: Option<&ServiceConfig>) -> StrategyOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((self.name.clone(), base.cloned()));
            let account = self.account.clone().ok_or_else(|| {
                StrategyError::missing_setting(format!("{}-test-failure", self.name))
            });
            StrategyOutcome {
                config: self.config.clone(),
                account,
            }
        }
    }

    fn hints() -> Hints {
        Hints {
            metadata_endpoint: None,
            use_regional_sts: false,
            region: "us-west-2".to_string(),
            account: "123456789012".to_string(),
        }
    }

    fn test_account(service: &str) -> ServiceConfigAccount {
        ServiceConfigAccount::new("123456789012", "sports", service)
    }

    fn names(calls: &Calls) -> Vec<String> {
        calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    #[test_case(false, false, false, false)]
    #[test_case(false, false, false, true)]
    #[test_case(false, false, true, false)]
    #[test_case(false, false, true, true)]
    #[test_case(false, true, false, false)]
    #[test_case(false, true, false, true)]
    #[test_case(false, true, true, false)]
    #[test_case(false, true, true, true)]
    #[test_case(true, false, false, false)]
    #[test_case(true, false, false, true)]
    #[test_case(true, false, true, false)]
    #[test_case(true, false, true, true)]
    #[test_case(true, true, false, false)]
    #[test_case(true, true, false, true)]
    #[test_case(true, true, true, false)]
    #[test_case(true, true, true, true)]
    #[tokio::test]
    async fn first_success_wins(file: bool, env: bool, creds: bool, profile: bool) {
        let calls = Calls::default();
        let outcomes = [("file", file), ("env", env), ("creds", creds), ("profile", profile)];
        let strategies = outcomes
            .iter()
            .map(|(name, ok)| {
                let s = FakeStrategy::new(name, &calls);
                let s = if *ok { s.with_account(test_account(name)) } else { s };
                Box::new(s) as Box<dyn ResolutionStrategy>
            })
            .collect();
        let resolver = Resolver::new(hints(), strategies);
        let got = resolver.resolve().await;

        let winner = outcomes.iter().position(|(_, ok)| *ok);
        match winner {
            Some(w) => {
                let (_, account) = got.expect("some strategy succeeds");
                assert_eq!(account.service, outcomes[w].0);
                let want: Vec<String> = outcomes[..=w].iter().map(|(n, _)| n.to_string()).collect();
                assert_eq!(names(&calls), want);
            }
            None => {
                let err = got.expect_err("all strategies fail");
                assert!(err.is_config_resolution_failed(), "{err:?}");
                assert_eq!(names(&calls).len(), 4);
                let source = err.source().map(|s| s.to_string()).unwrap_or_default();
                assert!(source.contains("profile-test-failure"), "{err:?}");
            }
        }
    }

    #[tokio::test]
    async fn config_carried_forward() -> TestResult {
        let calls = Calls::default();
        let file_config = ServiceConfig {
            version: "1.0.0".to_string(),
            zts_url: "https://zts.example.com".to_string(),
            user: "nobody".to_string(),
            ..ServiceConfig::default()
        };
        let strategies: Vec<Box<dyn ResolutionStrategy>> = vec![
            Box::new(FakeStrategy::new("file", &calls).with_config(file_config.clone())),
            Box::new(FakeStrategy::new("env", &calls)),
            Box::new(FakeStrategy::new("creds", &calls).with_account(test_account("api"))),
            Box::new(FakeStrategy::new("profile", &calls)),
        ];
        let (config, account) = Resolver::new(hints(), strategies).resolve().await?;

        assert_eq!(config, file_config);
        assert_eq!(account, test_account("api"));

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].1, None);
        assert_eq!(calls[1].1.as_ref(), Some(&file_config));
        assert_eq!(calls[2].1.as_ref(), Some(&file_config));
        assert_eq!(calls.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn winner_account_unchanged() -> TestResult {
        let calls = Calls::default();
        let config = ServiceConfig {
            zts_url: "https://file-zts".to_string(),
            user: "file-user".to_string(),
            group: "file-group".to_string(),
            domain: "file-domain".to_string(),
            service: "file-service".to_string(),
            ..ServiceConfig::default()
        };
        let winner = ServiceConfigAccount::new("123456789012", "sports", "api");
        let strategies: Vec<Box<dyn ResolutionStrategy>> = vec![
            Box::new(FakeStrategy::new("file", &calls).with_config(config.clone())),
            Box::new(FakeStrategy::new("profile", &calls).with_account(winner.clone())),
        ];
        let (got_config, got_account) = Resolver::new(hints(), strategies).resolve().await?;
        assert_eq!(got_account, winner);
        assert_eq!(got_config, config);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_resolution_is_stable() -> TestResult {
        let build = |calls: &Calls| {
            let config = ServiceConfig {
                version: "1.0.0".to_string(),
                zts_url: "https://zts.example.com".to_string(),
                ..ServiceConfig::default()
            };
            let strategies: Vec<Box<dyn ResolutionStrategy>> = vec![
                Box::new(FakeStrategy::new("file", calls).with_config(config)),
                Box::new(FakeStrategy::new("env", calls)),
                Box::new(FakeStrategy::new("creds", calls).with_account(test_account("api"))),
            ];
            Resolver::new(hints(), strategies)
        };
        let calls = Calls::default();
        let resolver = build(&calls);
        let first = resolver.resolve().await?;
        let second = resolver.resolve().await?;
        assert_eq!(first, second);

        let fresh = build(&Calls::default()).resolve().await?;
        assert_eq!(first, fresh);
        assert_eq!(names(&calls), vec!["file", "env", "creds", "file", "env", "creds"]);
        Ok(())
    }

    #[tokio::test]
    async fn latest_config_wins() -> TestResult {
        let calls = Calls::default();
        let first = ServiceConfig {
            version: "first".to_string(),
            ..ServiceConfig::default()
        };
        let second = ServiceConfig {
            version: "second".to_string(),
            ..ServiceConfig::default()
        };
        let strategies: Vec<Box<dyn ResolutionStrategy>> = vec![
            Box::new(FakeStrategy::new("file", &calls).with_config(first.clone())),
            Box::new(FakeStrategy::new("env", &calls).with_config(second.clone())),
            Box::new(FakeStrategy::new("creds", &calls)),
            Box::new(FakeStrategy::new("profile", &calls).with_account(test_account("api"))),
        ];
        let (config, _) = Resolver::new(hints(), strategies).resolve().await?;
        assert_eq!(config, second);
        let calls = calls.lock().unwrap();
        assert_eq!(calls[1].1.as_ref(), Some(&first));
        assert_eq!(calls[3].1.as_ref(), Some(&second));
        Ok(())
    }

    #[tokio::test]
    async fn config_from_hints() -> TestResult {
        let calls = Calls::default();
        let strategies: Vec<Box<dyn ResolutionStrategy>> = vec![Box::new(
            FakeStrategy::new("profile", &calls).with_account(test_account("api")),
        )];
        let (config, _) = Resolver::new(hints(), strategies).resolve().await?;
        assert_eq!(config, ServiceConfig::from_hints(&hints()));
        Ok(())
    }

    #[tokio::test]
    async fn unusable_account_falls_through() -> TestResult {
        let calls = Calls::default();
        let strategies: Vec<Box<dyn ResolutionStrategy>> = vec![
            Box::new(FakeStrategy::new("file", &calls).with_account(ServiceConfigAccount::new(
                "", "sports", "api",
            ))),
            Box::new(FakeStrategy::new("env", &calls).with_account(ServiceConfigAccount::default())),
            Box::new(FakeStrategy::new("creds", &calls).with_account(test_account("api"))),
        ];
        let (_, account) = Resolver::new(hints(), strategies).resolve().await?;
        assert_eq!(account, test_account("api"));
        assert_eq!(names(&calls), vec!["file", "env", "creds"]);
        Ok(())
    }

    #[tokio::test]
    async fn last_error_is_source() {
        let calls = Calls::default();
        let strategies: Vec<Box<dyn ResolutionStrategy>> = vec![
            Box::new(FakeStrategy::new("file", &calls)),
            Box::new(FakeStrategy::new("profile", &calls).with_account(ServiceConfigAccount::default())),
        ];
        let err = Resolver::new(hints(), strategies).resolve().await.unwrap_err();
        assert!(err.is_config_resolution_failed(), "{err:?}");
        let source = err
            .source()
            .and_then(|e| e.downcast_ref::<StrategyError>())
            .expect("the source is the last strategy error");
        assert!(source.is_unusable_account(), "{source:?}");
        assert!(source.to_string().contains("profile"), "{source}");
    }

    #[tokio::test]
    async fn no_strategies() {
        let err = Resolver::new(hints(), Vec::new()).resolve().await.unwrap_err();
        assert!(err.is_config_resolution_failed(), "{err:?}");
    }

    #[tokio::test]
    async fn logs_each_failure() -> TestResult {
        let (_guard, events) = capture_events();
        let calls = Calls::default();
        let strategies: Vec<Box<dyn ResolutionStrategy>> = vec![
            Box::new(FakeStrategy::new("file", &calls)),
            Box::new(FakeStrategy::new("env", &calls)),
            Box::new(FakeStrategy::new("creds", &calls).with_account(test_account("api"))),
        ];
        Resolver::new(hints(), strategies).resolve().await?;

        let warnings = events.messages(tracing::Level::WARN);
        assert_eq!(warnings.len(), 2, "{warnings:?}");
        assert!(warnings[0].contains("file-test-failure"), "{warnings:?}");
        assert!(warnings[1].contains("env-test-failure"), "{warnings:?}");
        let infos = events.messages(tracing::Level::INFO);
        assert!(infos.iter().any(|m| m.contains("from the env")), "{infos:?}");
        assert!(infos.iter().any(|m| m.contains("from the creds")), "{infos:?}");
        assert!(
            infos.iter().any(|m| m.contains("sports.api") && m.contains("123456789012")),
            "{infos:?}"
        );
        Ok(())
    }
}
