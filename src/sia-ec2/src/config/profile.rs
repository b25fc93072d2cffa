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
use crate::arn::{INSTANCE_PROFILE_PREFIX, RoleArn};
use crate::errors::{MetadataError, StrategyError};
use crate::meta;
use serde::Deserialize;

/// Derives the service identity from the instance profile name.
///
/// The profile must be named `<domain>.<service><suffix>`. This is the last
/// resort, it only needs the instance metadata service.
#[derive(Clone, Debug)]
pub struct ProfileStrategy {
    metadata: meta::Client,
    suffix: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IamInfo {
    #[serde(default)]
    instance_profile_arn: Option<String>,
}

impl ProfileStrategy {
    pub fn new<S: Into<String>>(metadata: meta::Client, suffix: S) -> Self {
        Self {
            metadata,
            suffix: suffix.into(),
        }
    }

    async fn account(&self) -> Result<ServiceConfigAccount, StrategyError> {
        let body = self.metadata.get_data(meta::IAM_INFO_PATH).await?;
        let info: IamInfo = serde_json::from_slice(&body)
            .map_err(|e| MetadataError::from_body(meta::IAM_INFO_PATH, e))?;
        let arn = info
            .instance_profile_arn
            .filter(|a| !a.is_empty())
            .ok_or_else(|| StrategyError::missing_setting("InstanceProfileArn"))?;
        let profile = RoleArn::parse(&arn, INSTANCE_PROFILE_PREFIX, &self.suffix)?;
        Ok(ServiceConfigAccount::new(
            profile.account,
            profile.domain,
            profile.service,
        ))
    }
}

#[async_trait::async_trait]
impl ResolutionStrategy for ProfileStrategy {
    fn name(&self) -> &str {
        "instance profile"
    }

    async fn resolve(&self, _base: Option<&ServiceConfig>) -> StrategyOutcome {
        StrategyOutcome {
            config: None,
            account: self.account().await,
        }
    }
}
