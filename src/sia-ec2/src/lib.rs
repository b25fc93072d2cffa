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

//! Service Identity Agent (SIA) for AWS EC2 - Identity Bootstrap
//!
//! This crate runs the first two steps of the Service Identity Agent on an
//! EC2 instance, before any certificate is requested:
//!
//! 1. Collect the evidence that proves which instance this is: the
//!    [instance identity document] and its PKCS7 signature, see
//!    [identity::fetch_identity_evidence]. Instances running ECS tasks also
//!    report the task id, see [ecs::fetch_container_task_id].
//! 2. Determine which service the instance runs as, see
//!    [resolver::resolve_config]. The service identity comes from the first
//!    of these sources that names one: the configuration file, the
//!    `ATHENZ_SIA_*` environment variables, the role of the local AWS
//!    credentials, or the instance profile.
//!
//! Both steps are sequential and never retry. Any failure is fatal for the
//! bootstrap, see [errors::Error].
//!
//! [instance identity document]: https://docs.aws.amazon.com/AWSEC2/latest/UserGuide/instance-identity-documents.html

pub mod arn;
pub mod config;
pub mod ecs;
pub mod errors;
pub mod identity;
pub mod meta;
pub mod resolver;
pub mod sts;

/// A `Result` alias where the `Err` case is `sia_ec2::errors::Error`.
pub type Result<T> = std::result::Result<T, crate::errors::Error>;
