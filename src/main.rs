//! infra-helper: JSON HTTP control panel for EC2 provisioning and S3
//! bucket lifecycle.

use anyhow::{Context, Result};
use clap::Parser;
use infra_helper::api::{self, AppState};
use infra_helper::aws::ec2::Ec2Client;
use infra_helper::aws::s3::S3Client;
use infra_helper::aws::ssm::SsmClient;
use infra_helper::aws::AwsContext;
use infra_helper::config;
use infra_helper::provision::AwsProvisionOps;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "infra-helper")]
#[command(about = "EC2 provisioning and S3 bucket lifecycle over a JSON API")]
#[command(version)]
struct Args {
    /// AWS region (default: AWS_REGION, then AWS_DEFAULT_REGION)
    #[arg(long)]
    region: Option<String>,

    /// Port the HTTP API listens on
    #[arg(long, env = "PORT", default_value_t = config::DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let region = args.region.unwrap_or_else(config::default_region);

    info!(region = %region, port = args.port, "Starting infra-helper");

    let ctx = AwsContext::new(&region).await;
    let ec2 = Ec2Client::from_context(&ctx);
    let ssm = SsmClient::from_context(&ctx);
    let s3 = S3Client::from_context(&ctx);
    let provisioner = AwsProvisionOps::new(Ec2Client::from_context(&ctx), ssm);

    let state = Arc::new(AppState {
        s3,
        ec2,
        provisioner,
        region,
    });
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, "HTTP API listening");

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
