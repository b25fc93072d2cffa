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

//! A client for the EC2 [Instance Metadata Service] (IMDS).
//!
//! [Instance Metadata Service]: https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/configuring-instance-metadata-service.html

mod client;

pub use client::{Builder, Client};

/// The signed instance identity document.
pub const IDENTITY_DOCUMENT_PATH: &str = "/latest/dynamic/instance-identity/document";
/// The PKCS7 detached signature over [IDENTITY_DOCUMENT_PATH].
pub const SIGNATURE_PATH: &str = "/latest/dynamic/instance-identity/pkcs7";
/// Information about the IAM instance profile attached to the instance.
pub const IAM_INFO_PATH: &str = "/latest/meta-data/iam/info";

pub(crate) const METADATA_ROOT: &str = "http://169.254.169.254";
pub(crate) const METADATA_ENDPOINT_ENV_VAR: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT";
pub(crate) const TOKEN_PATH: &str = "/latest/api/token";
pub(crate) const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
pub(crate) const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
pub(crate) const TOKEN_TTL_SECONDS: &str = "21600";
