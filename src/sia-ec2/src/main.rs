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

//! Runs the identity bootstrap and prints what it found.

const DESCRIPTION: &str = concat!(
    "Fetches the instance identity document and its signature from the EC2",
    " instance metadata service, detects the ECS task id, and determines the",
    " service identity from the configuration file, the environment, the local",
    " AWS credentials, or the instance profile. Prints a JSON summary on success."
);

use clap::Parser;
use serde::Serialize;
use sia_ec2::{ecs, identity, meta, resolver};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let summary = run(&args).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run(args: &Args) -> anyhow::Result<Summary> {
    tracing::info!("{args:?}");
    let metadata = meta::Client::new(args.metadata_endpoint.clone());
    let evidence = identity::fetch_identity_evidence(&metadata).await?;
    let task_id = ecs::fetch_container_task_id();
    let region = args
        .region
        .clone()
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| evidence.region().to_string());
    let (config, account) = resolver::resolve_config(
        &args.config,
        args.metadata_endpoint.as_deref(),
        args.regional_sts,
        &region,
        evidence.account_id(),
    )
    .await?;

    Ok(Summary {
        account: account.account,
        region,
        instance_id: evidence.instance_id().to_string(),
        pending_time: evidence.pending_time().map(|t| t.to_rfc3339()),
        task_id,
        domain: account.domain,
        service: account.service,
        name: account.name,
        zts_url: account.zts_url,
        use_regional_sts: config.use_regional_sts,
    })
}

/// Bootstraps the service identity of an EC2 instance.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = DESCRIPTION)]
struct Args {
    /// The service configuration file.
    #[arg(long, default_value = "/etc/sia/sia_config")]
    config: PathBuf,

    /// The instance metadata service endpoint.
    ///
    /// The `AWS_EC2_METADATA_SERVICE_ENDPOINT` environment variable, if set,
    /// takes precedence.
    #[arg(long)]
    metadata_endpoint: Option<String>,

    /// Use the regional STS endpoint to look up the role of the local
    /// credentials.
    #[arg(long, default_value_t = false)]
    regional_sts: bool,

    /// The AWS region. Defaults to the region in the instance identity
    /// document.
    #[arg(long)]
    region: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    account: String,
    region: String,
    instance_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending_time: Option<String>,
    task_id: String,
    domain: String,
    service: String,
    name: String,
    zts_url: String,
    use_regional_sts: bool,
}
