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

use super::{ResolutionStrategy, ServiceConfig, ServiceConfigAccount, StrategyOutcome};
use crate::arn::{ASSUMED_ROLE_PREFIX, RoleArn};
use crate::errors::StrategyError;
use crate::sts;

/// Derives the service identity from the role of the local AWS credentials.
///
/// The role must be named `<domain>.<service><suffix>`, for example
/// `sports.api-service`. The strategy asks STS for the caller identity and
/// parses the assumed-role ARN it returns.
#[derive(Clone, Debug)]
pub struct CredsStrategy {
    suffix: String,
    sts: sts::Client,
}

impl CredsStrategy {
    pub fn new<S: Into<String>>(suffix: S, sts: sts::Client) -> Self {
        Self {
            suffix: suffix.into(),
            sts,
        }
    }

    async fn account(&self) -> Result<ServiceConfigAccount, StrategyError> {
        let identity = self.sts.get_caller_identity().await?;
        let role = RoleArn::parse(&identity.arn, ASSUMED_ROLE_PREFIX, &self.suffix)?;
        Ok(ServiceConfigAccount::new(
            role.account,
            role.domain,
            role.service,
        ))
    }
}

#[async_trait::async_trait]
impl ResolutionStrategy for CredsStrategy {
    fn name(&self) -> &str {
        "security credentials"
    }

    async fn resolve(&self, _base: Option<&ServiceConfig>) -> StrategyOutcome {
        StrategyOutcome {
            config: None,
            account: self.account().await,
        }
    }
}
