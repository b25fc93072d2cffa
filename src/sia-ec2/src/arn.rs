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

//! Parsers for the [ARN] formats used in the bootstrap.
//!
//! [ARN]: https://docs.aws.amazon.com/IAM/latest/UserGuide/reference-arns.html

use crate::errors::ArnError;

/// The resource prefix for IAM roles.
pub const ROLE_PREFIX: &str = "role/";
/// The resource prefix for IAM instance profiles.
pub const INSTANCE_PROFILE_PREFIX: &str = "instance-profile/";
/// The resource prefix for STS assumed-role sessions.
pub const ASSUMED_ROLE_PREFIX: &str = "assumed-role/";

const ARN_FORMAT: &str = "expected arn:<partition>:<service>:<region>:<account>:<resource>";

struct ArnParts<'a> {
    service: &'a str,
    region: &'a str,
    account: &'a str,
    resource: &'a str,
}

fn split(arn: &str) -> Result<ArnParts<'_>, ArnError> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    match parts.as_slice() {
        ["arn", partition, service, region, account, resource] if !partition.is_empty() => {
            Ok(ArnParts {
                service: *service,
                region: *region,
                account: *account,
                resource: *resource,
            })
        }
        _ => Err(ArnError::new(arn, ARN_FORMAT)),
    }
}

/// An ECS task ARN.
///
/// Both the legacy `task/<task-id>` and the current
/// `task/<cluster>/<task-id>` resource formats are accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskArn {
    pub account: String,
    pub region: String,
    pub cluster: Option<String>,
    pub task_id: String,
}

impl TaskArn {
    pub fn parse(arn: &str) -> Result<Self, ArnError> {
        let parts = split(arn)?;
        if parts.service != "ecs" {
            return Err(ArnError::new(arn, "not an ECS ARN"));
        }
        let resource: Vec<&str> = parts.resource.split('/').collect();
        let (cluster, task_id) = match resource.as_slice() {
            ["task", task_id] => (None, *task_id),
            ["task", cluster, task_id] if !cluster.is_empty() => {
                (Some(cluster.to_string()), *task_id)
            }
            _ => return Err(ArnError::new(arn, "expected task/[<cluster>/]<task-id>")),
        };
        if task_id.is_empty() {
            return Err(ArnError::new(arn, "empty task id"));
        }
        Ok(Self {
            account: parts.account.to_string(),
            region: parts.region.to_string(),
            cluster,
            task_id: task_id.to_string(),
        })
    }
}

/// A role, instance profile, or assumed-role ARN named after a service.
///
/// The name must follow the `<domain>.<service><suffix>` convention, for
/// example `sports.api-service` with the `-service` suffix names the `api`
/// service in the `sports` domain. Domains may contain dots, the service
/// name is everything after the last dot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleArn {
    pub account: String,
    pub domain: String,
    pub service: String,
}

impl RoleArn {
    /// Parses `arn`, requiring the resource to start with `prefix` and the
    /// role or profile name to end with `suffix`.
    ///
    /// For [ASSUMED_ROLE_PREFIX] the name is the first path element, the
    /// session name follows it. For other prefixes the name is the last path
    /// element, IAM paths before it are ignored.
    pub fn parse(arn: &str, prefix: &str, suffix: &str) -> Result<Self, ArnError> {
        let parts = split(arn)?;
        if parts.service != "iam" && parts.service != "sts" {
            return Err(ArnError::new(arn, "not an IAM or STS ARN"));
        }
        if parts.account.is_empty() {
            return Err(ArnError::new(arn, "missing account"));
        }
        let Some(resource) = parts.resource.strip_prefix(prefix) else {
            return Err(ArnError::new(arn, "unexpected resource type"));
        };
        let name = if prefix == ASSUMED_ROLE_PREFIX {
            resource.split('/').next()
        } else {
            resource.rsplit('/').next()
        }
        .unwrap_or_default();
        let name = if suffix.is_empty() {
            name
        } else {
            name.strip_suffix(suffix)
                .ok_or_else(|| ArnError::new(arn, "name does not end with the service suffix"))?
        };
        match name.rsplit_once('.') {
            Some((domain, service)) if !domain.is_empty() && !service.is_empty() => Ok(Self {
                account: parts.account.to_string(),
                domain: domain.to_string(),
                service: service.to_string(),
            }),
            _ => Err(ArnError::new(arn, "expected a <domain>.<service> name")),
        }
    }
}
