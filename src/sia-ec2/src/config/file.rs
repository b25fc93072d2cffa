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

use super::{Hints, ResolutionStrategy, ServiceConfig, StrategyOutcome};
use crate::errors::StrategyError;
use std::path::PathBuf;

/// Reads the service identity from a JSON configuration file.
///
/// The file strategy always runs first and ignores any base configuration.
#[derive(Clone, Debug)]
pub struct FileStrategy {
    path: PathBuf,
    hints: Hints,
}

impl FileStrategy {
    pub fn new<P: Into<PathBuf>>(path: P, hints: Hints) -> Self {
        Self {
            path: path.into(),
            hints,
        }
    }

    fn load(&self) -> Result<ServiceConfig, StrategyError> {
        let contents =
            std::fs::read(&self.path).map_err(|e| StrategyError::loading(&self.path, e))?;
        let mut config = ServiceConfig::from_json(&contents).map_err(StrategyError::parsing)?;
        config.apply_hints(&self.hints);
        Ok(config)
    }
}

#[async_trait::async_trait]
impl ResolutionStrategy for FileStrategy {
    fn name(&self) -> &str {
        "configuration file"
    }

    async fn resolve(&self, _base: Option<&ServiceConfig>) -> StrategyOutcome {
        let config = match self.load() {
            Ok(c) => c,
            Err(e) => return StrategyOutcome::failure(None, e),
        };
        let account = config.select_account(&self.hints.account);
        StrategyOutcome {
            config: Some(config),
            account,
        }
    }
}
