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

//! A fake EC2 instance metadata service for tests.
//!
//! The fake also answers STS `GetCallerIdentity` requests on `/`, so a single
//! endpoint serves both the metadata and the STS client in tests.
//!
//! The AWS SDK credentials chain uses its own metadata client. The fake
//! answers it too: session tokens carry the TTL header the SDK requires,
//! and the `security-credentials-extended` API is reported as unavailable so
//! the SDK falls back to the `security-credentials` paths.

use httptest::{Expectation, Server, matchers::*, responders::*};
use serde_json::{Value, json};
use std::io::Write;
use tempfile::NamedTempFile;

pub const TOKEN_PATH: &str = "/latest/api/token";
pub const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";
pub const SIGNATURE_PATH: &str = "/latest/dynamic/instance-identity/pkcs7";
pub const IAM_INFO_PATH: &str = "/latest/meta-data/iam/info";
pub const SECURITY_CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";
pub const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";

pub const TEST_SESSION_TOKEN: &str = "test-session-token";
pub const TEST_SIGNATURE: &str = "test-pkcs7-signature";

/// Returns an instance identity document with the given fields.
pub fn identity_document(account: &str, region: &str, instance_id: &str) -> Value {
    json!({
        "accountId": account,
        "architecture": "x86_64",
        "availabilityZone": format!("{region}a"),
        "imageId": "ami-0123456789abcdef0",
        "instanceId": instance_id,
        "instanceType": "m5.large",
        "pendingTime": "2026-10-19T00:00:00Z",
        "privateIp": "10.0.0.1",
        "region": region,
        "version": "2017-09-30",
    })
}

/// Returns a `GetCallerIdentity` response in the STS XML format.
pub fn caller_identity_response(account: &str, arn: &str) -> String {
    format!(
        r#"<GetCallerIdentityResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <GetCallerIdentityResult>
    <Arn>{arn}</Arn>
    <UserId>AROAEXAMPLE:test-session</UserId>
    <Account>{account}</Account>
  </GetCallerIdentityResult>
  <ResponseMetadata>
    <RequestId>test-request-id</RequestId>
  </ResponseMetadata>
</GetCallerIdentityResponse>"#
    )
}

/// Returns an STS error response with the given error code.
pub fn sts_error_response(code: &str) -> String {
    format!(
        r#"<ErrorResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <Error>
    <Type>Sender</Type>
    <Code>{code}</Code>
    <Message>test-only error message</Message>
  </Error>
  <RequestId>test-request-id</RequestId>
</ErrorResponse>"#
    )
}

/// Writes `contents` to a new temporary file.
pub fn config_file(contents: &Value) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(contents.to_string().as_bytes())?;
    Ok(file)
}

/// A fake metadata service.
///
/// Every expectation must be met before the fake is dropped, except the
/// IMDSv2 session token requests, which are optional.
pub struct FakeImds {
    server: Server,
}

impl FakeImds {
    /// Starts a fake metadata service that grants session tokens.
    pub fn start() -> Self {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("PUT", TOKEN_PATH))
                .times(0..)
                .respond_with(
                    status_code(200)
                        .insert_header(TOKEN_TTL_HEADER, "21600")
                        .body(TEST_SESSION_TOKEN),
                ),
        );
        Self { server }
    }

    /// The endpoint, for example `http://127.0.0.1:12345`.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.server.addr())
    }

    /// Adds custom expectations.
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Serves `document` and a fixed signature, once each.
    pub fn expect_identity(&self, document: &Value) {
        self.server.expect(
            Expectation::matching(request::method_path("GET", IDENTITY_DOCUMENT_PATH))
                .respond_with(status_code(200).body(document.to_string())),
        );
        self.server.expect(
            Expectation::matching(request::method_path("GET", SIGNATURE_PATH))
                .respond_with(status_code(200).body(TEST_SIGNATURE)),
        );
    }

    /// Answers requests for `path` with `status`, any number of times.
    pub fn expect_failure(&self, path: &'static str, status: u16) {
        self.server.expect(
            Expectation::matching(request::method_path("GET", path))
                .times(0..)
                .respond_with(status_code(status)),
        );
    }

    /// Serves `iam/info` with the given instance profile ARN.
    pub fn expect_instance_profile(&self, arn: &str) {
        self.server.expect(
            Expectation::matching(request::method_path("GET", IAM_INFO_PATH)).respond_with(
                json_encoded(json!({
                    "Code": "Success",
                    "LastUpdated": "2026-10-19T00:00:00Z",
                    "InstanceProfileArn": arn,
                    "InstanceProfileId": "AIPAEXAMPLE",
                })),
            ),
        );
    }

    /// Reports that the instance has no IAM role, any number of times.
    pub fn expect_no_role(&self) {
        self.server.expect(
            Expectation::matching(all_of![
                request::method("GET"),
                request::path(matches("^/latest/meta-data/iam/security-credentials")),
            ])
            .times(0..)
            .respond_with(status_code(404)),
        );
    }

    /// Serves temporary credentials for the instance role `role`.
    pub fn expect_role_credentials(&self, role: &str) {
        self.server.expect(
            Expectation::matching(all_of![
                request::method("GET"),
                request::path(matches("^/latest/meta-data/iam/security-credentials-extended/")),
            ])
            .times(0..)
            .respond_with(status_code(404)),
        );
        self.server.expect(
            Expectation::matching(request::method_path("GET", SECURITY_CREDENTIALS_PATH))
                .times(1..)
                .respond_with(status_code(200).body(role.to_string())),
        );
        let path = format!("{SECURITY_CREDENTIALS_PATH}{role}");
        self.server.expect(
            Expectation::matching(request::method_path("GET", path))
                .times(1..)
                .respond_with(json_encoded(json!({
                    "Code": "Success",
                    "LastUpdated": "2026-10-19T00:00:00Z",
                    "Type": "AWS-HMAC",
                    "AccessKeyId": "test-access-key",
                    "SecretAccessKey": "test-secret",
                    "Token": "test-token",
                    "Expiration": "2099-01-01T00:00:00Z",
                }))),
        );
    }

    /// Answers STS `GetCallerIdentity` with `arn`.
    pub fn expect_caller_identity(&self, account: &str, arn: &str) {
        self.server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/"),
                request::headers(contains(key("authorization"))),
            ])
            .respond_with(
                status_code(200)
                    .insert_header("content-type", "text/xml")
                    .body(caller_identity_response(account, arn)),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn serves_identity() -> anyhow::Result<()> {
        let imds = FakeImds::start();
        let document = identity_document("123456789012", "us-west-2", "i-1234567890abcdef0");
        imds.expect_identity(&document);

        let client = reqwest::Client::new();
        let got = client
            .get(format!("{}{IDENTITY_DOCUMENT_PATH}", imds.endpoint()))
            .send()
            .await?
            .text()
            .await?;
        let got: Value = serde_json::from_str(&got)?;
        assert_eq!(got, document);
        let got = client
            .get(format!("{}{SIGNATURE_PATH}", imds.endpoint()))
            .send()
            .await?
            .text()
            .await?;
        assert_eq!(got, TEST_SIGNATURE);
        Ok(())
    }

    #[tokio::test]
    async fn session_token_has_ttl() -> anyhow::Result<()> {
        let imds = FakeImds::start();
        let response = reqwest::Client::new()
            .put(format!("{}{TOKEN_PATH}", imds.endpoint()))
            .header(TOKEN_TTL_HEADER, "21600")
            .send()
            .await?;
        assert_eq!(
            response
                .headers()
                .get(TOKEN_TTL_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("21600")
        );
        assert_eq!(response.text().await?, TEST_SESSION_TOKEN);
        Ok(())
    }

    #[test]
    fn caller_identity_format() {
        let got = caller_identity_response("123456789012", "arn:aws:sts::123456789012:assumed-role/r/s");
        assert!(got.contains("<Account>123456789012</Account>"), "{got}");
        assert!(got.contains("<Arn>arn:aws:sts::123456789012:assumed-role/r/s</Arn>"), "{got}");
    }

    #[test]
    fn writes_config_file() -> anyhow::Result<()> {
        let contents = json!({"domain": "sports", "service": "api"});
        let file = config_file(&contents)?;
        let got: Value = serde_json::from_slice(&std::fs::read(file.path())?)?;
        assert_eq!(got, contents);
        Ok(())
    }
}
