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

//! The signed instance identity evidence.
//!
//! EC2 instances can prove which account, region and instance they run on
//! with the [instance identity document] and its detached PKCS7 signature.
//! This module fetches both and extracts the fields needed to request a
//! service identity. The signature is not verified here, the raw bytes are
//! forwarded to the service that issues credentials.
//!
//! [instance identity document]: https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/instance-identity-documents.html

use crate::Result;
use crate::errors::Error;
use crate::meta;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// The fields of the instance identity document used by the bootstrap.
///
/// Missing fields are represented as empty strings. The `pendingTime` is
/// `None` when it is missing or cannot be parsed as an RFC 3339 timestamp.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstanceIdentityDocument {
    pub account_id: String,
    pub region: String,
    pub instance_id: String,
    pub pending_time: Option<DateTime<Utc>>,
}

impl InstanceIdentityDocument {
    /// Decodes the JSON body of an instance identity document.
    ///
    /// The body must be a JSON object.
    pub fn from_slice(document: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        let object: Map<String, Value> = serde_json::from_slice(document)?;
        let fields: DocumentFields = serde_json::from_value(Value::Object(object))?;
        Ok(fields.into())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentFields {
    #[serde(default)]
    account_id: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    instance_id: Option<String>,
    // Any JSON type is accepted, a bad timestamp must not fail the decode.
    #[serde(default)]
    pending_time: Option<Value>,
}

impl From<DocumentFields> for InstanceIdentityDocument {
    fn from(fields: DocumentFields) -> Self {
        let pending_time = fields
            .pending_time
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc));
        Self {
            account_id: fields.account_id.unwrap_or_default(),
            region: fields.region.unwrap_or_default(),
            instance_id: fields.instance_id.unwrap_or_default(),
            pending_time,
        }
    }
}

/// The identity document, its signature, and the decoded document fields.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityEvidence {
    document: Bytes,
    signature: Bytes,
    identity: InstanceIdentityDocument,
}

impl IdentityEvidence {
    /// The raw identity document, exactly as returned by the metadata service.
    pub fn document(&self) -> &Bytes {
        &self.document
    }

    /// The raw PKCS7 signature over [document][IdentityEvidence::document].
    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    pub fn identity(&self) -> &InstanceIdentityDocument {
        &self.identity
    }

    pub fn account_id(&self) -> &str {
        &self.identity.account_id
    }

    pub fn instance_id(&self) -> &str {
        &self.identity.instance_id
    }

    pub fn region(&self) -> &str {
        &self.identity.region
    }

    pub fn pending_time(&self) -> Option<DateTime<Utc>> {
        self.identity.pending_time
    }

    /// Consumes the evidence, returning the document and signature bytes.
    pub fn into_parts(self) -> (Bytes, Bytes, InstanceIdentityDocument) {
        (self.document, self.signature, self.identity)
    }
}

/// Fetches the instance identity document and its signature.
///
/// Both must be available: if either request fails the function returns an
/// error where [is_evidence_unavailable][Error::is_evidence_unavailable] is
/// `true`. The function makes no retry attempts.
///
/// # Example
/// ```no_run
/// # use sia_ec2::{identity, meta};
/// # async fn sample() -> Result<(), sia_ec2::errors::Error> {
/// let client = meta::Client::new(None);
/// let evidence = identity::fetch_identity_evidence(&client).await?;
/// println!("running in {} on {}", evidence.account_id(), evidence.instance_id());
/// # Ok(()) }
/// ```
pub async fn fetch_identity_evidence(client: &meta::Client) -> Result<IdentityEvidence> {
    let document = client
        .get_data(meta::IDENTITY_DOCUMENT_PATH)
        .await
        .map_err(Error::evidence_unavailable)?;
    let signature = client
        .get_data(meta::SIGNATURE_PATH)
        .await
        .map_err(Error::evidence_unavailable)?;
    let identity =
        InstanceIdentityDocument::from_slice(&document).map_err(Error::evidence_unavailable)?;
    Ok(IdentityEvidence {
        document,
        signature,
        identity,
    })
}
