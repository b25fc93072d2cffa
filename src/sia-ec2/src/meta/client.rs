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

use crate::errors::MetadataError;
use bytes::Bytes;
use reqwest::{Client as ReqwestClient, RequestBuilder};

/// A client for the EC2 Instance Metadata Service.
///
/// The client prefers [IMDSv2] sessions. Before each data request it asks the
/// service for a session token, and falls back to unauthenticated (IMDSv1)
/// requests when no token is available. The client never retries and never
/// caches tokens or responses.
///
/// [IMDSv2]: https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/instance-metadata-v2-how-it-works.html
#[derive(Clone, Debug)]
pub struct Client {
    endpoint: String,
    inner: ReqwestClient,
    use_session_token: bool,
}

/// Creates [Client] instances.
#[derive(Debug, Default)]
pub struct Builder {
    endpoint: Option<String>,
    disable_session_token: bool,
}

impl Builder {
    /// Sets the metadata service endpoint.
    ///
    /// If not set, the client uses `http://169.254.169.254`. The
    /// `AWS_EC2_METADATA_SERVICE_ENDPOINT` environment variable, when set,
    /// takes precedence over this value.
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Only use IMDSv1 requests, without a session token.
    pub fn disable_session_token(mut self) -> Self {
        self.disable_session_token = true;
        self
    }

    pub fn build(self) -> Client {
        let mut client = Client::new(self.endpoint);
        client.use_session_token = !self.disable_session_token;
        client
    }
}

impl Client {
    /// Creates a new client for the Instance Metadata Service.
    pub fn new(endpoint_override: Option<String>) -> Self {
        let endpoint = Self::resolve_endpoint(endpoint_override);
        let endpoint = endpoint.trim_end_matches('/').to_string();

        Self {
            endpoint,
            inner: ReqwestClient::new(),
            use_session_token: true,
        }
    }

    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The resolved metadata endpoint, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn resolve_endpoint(endpoint_override: Option<String>) -> String {
        let from_env = std::env::var(super::METADATA_ENDPOINT_ENV_VAR)
            .ok()
            .filter(|v| !v.is_empty());
        if let Some(endpoint) = from_env {
            endpoint
        } else if let Some(e) = endpoint_override.filter(|v| !v.is_empty()) {
            e
        } else {
            super::METADATA_ROOT.to_string()
        }
    }

    /// Requests an IMDSv2 session token.
    ///
    /// Any failure, including an unreachable endpoint, is reported as `None`.
    /// The data request that follows reports the real error, if any.
    async fn session_token(&self) -> Option<String> {
        if !self.use_session_token {
            return None;
        }
        let url = format!("{}{}", self.endpoint, super::TOKEN_PATH);
        let response = self
            .inner
            .put(url)
            .header(super::TOKEN_TTL_HEADER, super::TOKEN_TTL_SECONDS)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.text().await.ok().filter(|t| !t.is_empty())
    }

    async fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.endpoint, path);
        let request = self.inner.get(url);
        match self.session_token().await {
            Some(token) => request.header(super::TOKEN_HEADER, token),
            None => request,
        }
    }

    /// Fetches the raw body stored at `path`.
    ///
    /// `path` is relative to the endpoint and must start with `/`, for
    /// example [IDENTITY_DOCUMENT_PATH][super::IDENTITY_DOCUMENT_PATH].
    pub async fn get_data(&self, path: &str) -> Result<Bytes, MetadataError> {
        let response = self
            .get(path)
            .await
            .send()
            .await
            .map_err(|e| MetadataError::from_send(path, e))?;
        if !response.status().is_success() {
            return Err(MetadataError::from_status(path, response.status()));
        }
        response
            .bytes()
            .await
            .map_err(|e| MetadataError::from_body(path, e))
    }

    /// Fetches the body stored at `path` as a UTF-8 string.
    pub async fn get_string(&self, path: &str) -> Result<String, MetadataError> {
        let body = self.get_data(path).await?;
        String::from_utf8(body.to_vec()).map_err(|e| MetadataError::from_body(path, e))
    }
}
