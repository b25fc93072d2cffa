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

use super::{EnvSource, Hints, ResolutionStrategy, ServiceConfig, StrategyOutcome};
use crate::config::ServiceConfigAccount;
use crate::errors::StrategyError;

pub const ACCOUNT_ID_VAR: &str = "ATHENZ_SIA_ACCOUNT_ID";
pub const DOMAIN_NAME_VAR: &str = "ATHENZ_SIA_DOMAIN_NAME";
pub const SERVICE_NAME_VAR: &str = "ATHENZ_SIA_SERVICE_NAME";
pub const ZTS_URL_VAR: &str = "ATHENZ_SIA_ZTS_URL";
pub const DNS_DOMAINS_VAR: &str = "ATHENZ_SIA_DNS_DOMAINS";
pub const REGIONAL_STS_VAR: &str = "ATHENZ_SIA_REGIONAL_STS";
pub const USER_VAR: &str = "ATHENZ_SIA_USER";
pub const GROUP_VAR: &str = "ATHENZ_SIA_GROUP";

/// Reads the service identity from `ATHENZ_SIA_*` environment variables.
///
/// The variables are applied on top of the configuration from earlier
/// strategies. `ATHENZ_SIA_DOMAIN_NAME` and `ATHENZ_SIA_SERVICE_NAME` are
/// required, the account defaults to the account hint.
#[derive(Clone, Debug)]
pub struct EnvStrategy {
    env: EnvSource,
    hints: Hints,
}

impl EnvStrategy {
    pub fn new(env: EnvSource, hints: Hints) -> Self {
        Self { env, hints }
    }

    fn overlay(&self, config: &mut ServiceConfig) -> Result<(), StrategyError> {
        if let Some(v) = self.env.get(ZTS_URL_VAR) {
            config.zts_url = v.to_string();
        }
        if let Some(v) = self.env.get(DNS_DOMAINS_VAR) {
            config.dns_domains = v
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = self.env.get(USER_VAR) {
            config.user = v.to_string();
        }
        if let Some(v) = self.env.get(GROUP_VAR) {
            config.group = v.to_string();
        }
        if let Some(v) = self.env.get(REGIONAL_STS_VAR) {
            config.use_regional_sts = v.parse::<bool>().map_err(|_| {
                StrategyError::missing_setting(format!(
                    "{REGIONAL_STS_VAR} must be true or false, got <{v}>"
                ))
            })?;
        }
        Ok(())
    }

    fn account(&self, config: &mut ServiceConfig) -> Result<ServiceConfigAccount, StrategyError> {
        self.overlay(config)?;
        let domain = self
            .env
            .get(DOMAIN_NAME_VAR)
            .ok_or_else(|| StrategyError::missing_setting(DOMAIN_NAME_VAR))?;
        let service = self
            .env
            .get(SERVICE_NAME_VAR)
            .ok_or_else(|| StrategyError::missing_setting(SERVICE_NAME_VAR))?;
        let account = self.env.get(ACCOUNT_ID_VAR).unwrap_or(&self.hints.account);
        if config.domain.is_empty() {
            config.domain = domain.to_string();
        }
        if config.service.is_empty() {
            config.service = service.to_string();
        }
        let account = ServiceConfigAccount::new(account, domain, service).with_defaults(config);
        if !account.is_usable() {
            return Err(StrategyError::unusable_account(format!(
                "set {ACCOUNT_ID_VAR} or provide the account from the identity document"
            )));
        }
        Ok(account)
    }
}

#[async_trait::async_trait]
impl ResolutionStrategy for EnvStrategy {
    fn name(&self) -> &str {
        "environment variables"
    }

    async fn resolve(&self, base: Option<&ServiceConfig>) -> StrategyOutcome {
        let mut config = base
            .cloned()
            .unwrap_or_else(|| ServiceConfig::from_hints(&self.hints));
        let account = self.account(&mut config);
        StrategyOutcome {
            config: Some(config),
            account,
        }
    }
}
