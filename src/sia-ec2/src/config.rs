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

//! The service configuration model and the strategies that produce it.
//!
//! A [ServiceConfig] holds the process-wide settings, a
//! [ServiceConfigAccount] names the service identity for one AWS account.
//! Each strategy in this module tries one source of configuration:
//!
//! * [FileStrategy]: the JSON configuration file, typically
//!   `/etc/sia/sia_config`.
//! * [EnvStrategy]: the `ATHENZ_SIA_*` environment variables.
//! * [CredsStrategy]: the name of the role in the local AWS credentials.
//! * [ProfileStrategy]: the name of the instance profile.
//!
//! The [resolver][crate::resolver] runs them in that order.

use crate::errors::StrategyError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod creds;
mod env;
mod file;
mod profile;

pub use creds::CredsStrategy;
pub use env::{
    ACCOUNT_ID_VAR, DNS_DOMAINS_VAR, DOMAIN_NAME_VAR, EnvStrategy, GROUP_VAR, REGIONAL_STS_VAR,
    SERVICE_NAME_VAR, USER_VAR, ZTS_URL_VAR,
};
pub use file::FileStrategy;
pub use profile::ProfileStrategy;

/// The suffix in role and instance profile names that marks a service.
pub const SERVICE_NAME_SUFFIX: &str = "-service";

/// The process-wide service configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub version: String,
    pub domain: String,
    pub service: String,
    pub zts_url: String,
    pub dns_domains: Vec<String>,
    pub use_regional_sts: bool,
    pub region: String,
    pub metadata_endpoint: String,
    pub user: String,
    pub group: String,
    /// How often the certificates are refreshed, in minutes.
    pub refresh_interval: u32,
    pub sans_dns_wildcard: bool,
    pub accounts: Vec<ServiceConfigAccount>,
}

/// The service identity for one AWS account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfigAccount {
    pub account: String,
    pub domain: String,
    pub service: String,
    /// The full service name, `<domain>.<service>`.
    pub name: String,
    pub user: String,
    pub group: String,
    pub zts_url: String,
    pub roles: Vec<String>,
}

/// The values known to the caller before any configuration is loaded.
///
/// The region and account usually come from the instance identity document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hints {
    pub metadata_endpoint: Option<String>,
    pub use_regional_sts: bool,
    pub region: String,
    pub account: String,
}

impl ServiceConfig {
    /// Parses the JSON configuration file format.
    ///
    /// Missing fields take their default values, unknown fields are ignored.
    pub fn from_json(contents: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(contents)
    }

    /// The baseline configuration used when no source provides one.
    pub fn from_hints(hints: &Hints) -> Self {
        let mut config = Self::default();
        config.apply_hints(hints);
        config
    }

    /// Fills in the settings the configuration source left empty.
    ///
    /// Values from the configuration source always win. Regional STS is
    /// enabled if either side enables it.
    pub fn apply_hints(&mut self, hints: &Hints) {
        if self.region.is_empty() {
            self.region = hints.region.clone();
        }
        if self.metadata_endpoint.is_empty() {
            if let Some(e) = &hints.metadata_endpoint {
                self.metadata_endpoint = e.clone();
            }
        }
        self.use_regional_sts |= hints.use_regional_sts;
    }

    /// Selects the service identity for `account`.
    ///
    /// With several entries in `accounts`, the one matching `account` wins.
    /// A single entry without an account id, or any single entry when
    /// `account` is empty, is used as-is. A configuration without entries
    /// but with a top-level domain and service describes the hinted account.
    pub fn select_account(&self, account: &str) -> Result<ServiceConfigAccount, StrategyError> {
        let selected = if self.accounts.is_empty() {
            if self.domain.is_empty() || self.service.is_empty() {
                return Err(StrategyError::unusable_account(
                    "the configuration has no accounts and no top-level domain and service",
                ));
            }
            ServiceConfigAccount {
                account: account.to_string(),
                domain: self.domain.clone(),
                service: self.service.clone(),
                ..ServiceConfigAccount::default()
            }
        } else if let Some(found) = self
            .accounts
            .iter()
            .find(|a| !account.is_empty() && a.account == account)
        {
            found.clone()
        } else {
            match self.accounts.as_slice() {
                [single] if account.is_empty() || single.account.is_empty() => {
                    let mut single = single.clone();
                    if single.account.is_empty() {
                        single.account = account.to_string();
                    }
                    single
                }
                _ => {
                    return Err(StrategyError::unusable_account(format!(
                        "no configuration entry for account <{account}>"
                    )));
                }
            }
        };
        let selected = selected.with_defaults(self);
        if !selected.is_usable() {
            return Err(StrategyError::unusable_account(format!(
                "the entry for account <{}> needs an account, a domain and a service",
                selected.account
            )));
        }
        Ok(selected)
    }
}

impl ServiceConfigAccount {
    /// Creates an account entry for `<domain>.<service>` in `account`.
    pub fn new<A, D, S>(account: A, domain: D, service: S) -> Self
    where
        A: Into<String>,
        D: Into<String>,
        S: Into<String>,
    {
        Self {
            account: account.into(),
            domain: domain.into(),
            service: service.into(),
            ..Self::default()
        }
        .with_name()
    }

    /// Returns `true` if the account, domain and service are all known.
    pub fn is_usable(&self) -> bool {
        !self.account.is_empty() && !self.domain.is_empty() && !self.service.is_empty()
    }

    /// Inherits the settings this entry leaves empty from `config`.
    pub fn with_defaults(mut self, config: &ServiceConfig) -> Self {
        fn inherit(field: &mut String, value: &str) {
            if field.is_empty() {
                *field = value.to_string();
            }
        }
        inherit(&mut self.domain, &config.domain);
        inherit(&mut self.service, &config.service);
        inherit(&mut self.user, &config.user);
        inherit(&mut self.group, &config.group);
        inherit(&mut self.zts_url, &config.zts_url);
        self.with_name()
    }

    fn with_name(mut self) -> Self {
        if self.name.is_empty() && !self.domain.is_empty() && !self.service.is_empty() {
            self.name = format!("{}.{}", self.domain, self.service);
        }
        self
    }
}

/// A snapshot of environment variables.
///
/// Strategies read the environment through this type, tests supply the
/// values directly.
#[derive(Clone, Debug, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    /// Captures the environment of the current process.
    ///
    /// Variables whose names or values are not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { vars }
    }

    /// Returns the value of `name`, treating empty values as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// The result of running one strategy.
///
/// A strategy may produce a configuration even when it fails to produce an
/// account, for example a configuration file without an entry for this
/// account. The resolver carries that configuration forward.
#[derive(Debug)]
pub struct StrategyOutcome {
    pub config: Option<ServiceConfig>,
    pub account: Result<ServiceConfigAccount, StrategyError>,
}

impl StrategyOutcome {
    pub fn success(config: Option<ServiceConfig>, account: ServiceConfigAccount) -> Self {
        Self {
            config,
            account: Ok(account),
        }
    }

    pub fn failure(config: Option<ServiceConfig>, error: StrategyError) -> Self {
        Self {
            config,
            account: Err(error),
        }
    }
}

/// One source of service configuration.
#[async_trait::async_trait]
pub trait ResolutionStrategy: std::fmt::Debug + Send + Sync {
    /// A short name for log messages.
    fn name(&self) -> &str;

    /// Tries to produce a service identity.
    ///
    /// `base` is the configuration produced by earlier strategies, if any.
    async fn resolve(&self, base: Option<&ServiceConfig>) -> StrategyOutcome;
}
