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

//! Asks STS who the local AWS credentials belong to.
//!
//! Credentials come from the AWS SDK default chain: the environment, the
//! shared profile files, web identity tokens, the ECS container endpoint, and
//! finally the instance role in the metadata service.

use crate::errors::StrategyError;
use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_sdk_sts::config::retry::RetryConfig;
use aws_sdk_sts::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_sts::error::DisplayErrorContext;

const GLOBAL_ENDPOINT: &str = "https://sts.amazonaws.com";
const GLOBAL_SIGNING_REGION: &str = "us-east-1";

/// The response to `GetCallerIdentity`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub user_id: String,
}

/// A client for the AWS Security Token Service.
///
/// Each call builds a fresh SDK client. Nothing is cached between calls and
/// the SDK retry policy is disabled.
#[derive(Clone, Debug)]
pub struct Client {
    endpoint: String,
    signing_region: String,
    metadata_endpoint: Option<String>,
    credentials: Option<Credentials>,
}

impl Client {
    /// Creates a client for the regional endpoint in `region`, or the global
    /// endpoint.
    ///
    /// The global endpoint is used when `use_regional_sts` is false or the
    /// region is unknown. Requests to it are signed for `us-east-1`.
    pub fn new(use_regional_sts: bool, region: &str) -> Self {
        let (endpoint, signing_region) = if use_regional_sts && !region.is_empty() {
            (format!("https://sts.{region}.amazonaws.com"), region)
        } else {
            (GLOBAL_ENDPOINT.to_string(), GLOBAL_SIGNING_REGION)
        };
        Self {
            endpoint,
            signing_region: signing_region.to_string(),
            metadata_endpoint: None,
            credentials: None,
        }
    }

    /// Sends the requests to `endpoint`, keeping the signing region.
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// The metadata service used by the default credentials chain.
    pub fn with_metadata_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.metadata_endpoint = Some(endpoint.into());
        self
    }

    /// Uses `credentials` instead of the default credentials chain.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn signing_region(&self) -> &str {
        &self.signing_region
    }

    async fn default_chain(&self) -> Result<DefaultCredentialsChain, StrategyError> {
        let mut imds = aws_config::imds::Client::builder();
        if let Some(endpoint) = &self.metadata_endpoint {
            imds = imds.endpoint(endpoint).map_err(StrategyError::credentials)?;
        }
        let chain = DefaultCredentialsChain::builder()
            .region(Region::new(self.signing_region.clone()))
            .imds_client(imds.build())
            .build()
            .await;
        Ok(chain)
    }

    /// Returns the identity of the principal that owns the local credentials.
    pub async fn get_caller_identity(&self) -> Result<CallerIdentity, StrategyError> {
        let config = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.signing_region.clone()))
            .endpoint_url(&self.endpoint)
            .retry_config(RetryConfig::disabled());
        let config = match &self.credentials {
            Some(c) => config.credentials_provider(c.clone()),
            None => config.credentials_provider(self.default_chain().await?),
        };
        let output = aws_sdk_sts::Client::from_conf(config.build())
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| {
                StrategyError::credentials(format!(
                    "GetCallerIdentity failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(CallerIdentity {
            account: output.account().unwrap_or_default().to_string(),
            arn: output.arn().unwrap_or_default().to_string(),
            user_id: output.user_id().unwrap_or_default().to_string(),
        })
    }
}
