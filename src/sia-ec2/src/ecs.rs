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

//! Detects ECS tasks running on EC2 container instances.
//!
//! The ECS agent publishes the [container metadata file] path in the
//! `ECS_CONTAINER_METADATA_FILE` environment variable. Most instances do not
//! run ECS tasks, and a missing or broken file is never an error for the
//! bootstrap: the task id is simply empty.
//!
//! [container metadata file]: https://docs.aws.amazon.com/AmazonECS/latest/developerguide/container-metadata.html

use crate::arn::TaskArn;
use crate::errors::ArnError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The environment variable with the path of the container metadata file.
pub const ECS_CONTAINER_METADATA_FILE_VAR: &str = "ECS_CONTAINER_METADATA_FILE";

#[derive(Deserialize)]
struct ContainerMetadata {
    #[serde(rename = "TaskARN", default)]
    task_arn: Option<String>,
}

#[derive(thiserror::Error, Debug)]
enum TaskIdError {
    #[error("cannot read the container metadata file: {0}")]
    Read(#[source] std::io::Error),
    #[error("cannot parse the container metadata file: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("the container metadata file has no TaskARN")]
    MissingArn,
    #[error(transparent)]
    Arn(#[from] ArnError),
}

/// Returns the id of the ECS task hosted on this instance, if any.
///
/// Returns an empty string when the instance is not running an ECS task, or
/// when the task id cannot be determined. The function never fails.
pub fn fetch_container_task_id() -> String {
    let path = std::env::var_os(ECS_CONTAINER_METADATA_FILE_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    task_id_from_metadata_file(path.as_deref())
}

/// Returns the ECS task id recorded in the container metadata file at `path`.
///
/// `None` means the instance is not running an ECS task. Like
/// [fetch_container_task_id], this function returns an empty string on any
/// error.
pub fn task_id_from_metadata_file(path: Option<&Path>) -> String {
    let Some(path) = path else {
        tracing::info!("{ECS_CONTAINER_METADATA_FILE_VAR} is not set, not an ECS task on EC2");
        return String::new();
    };
    match read_task_id(path) {
        Ok(task_id) => task_id,
        Err(e) => {
            tracing::warn!(
                "unable to determine the ECS task id from {}: {e}",
                path.display()
            );
            String::new()
        }
    }
}

fn read_task_id(path: &Path) -> Result<String, TaskIdError> {
    let contents = std::fs::read(path).map_err(TaskIdError::Read)?;
    let metadata: ContainerMetadata =
        serde_json::from_slice(&contents).map_err(TaskIdError::Parse)?;
    let task_arn = metadata
        .task_arn
        .filter(|a| !a.is_empty())
        .ok_or(TaskIdError::MissingArn)?;
    let task_arn = TaskArn::parse(&task_arn)?;
    Ok(task_arn.task_id)
}
