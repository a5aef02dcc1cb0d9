//! capstand — the Capstan release controller daemon.
//!
//! Single binary that loads the layered configuration, wires the
//! concrete collaborators (REST pipeline status, kubectl cluster
//! adapter, HTTP advisor, notification sink), and serves the event
//! endpoints.
//!
//! # Usage
//!
//! ```text
//! capstand serve --port 8080 --config capstan.toml
//! ```

mod server;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use capstan_advisor::HttpAdvisor;
use capstan_cluster::{KubectlCluster, ManifestTemplate, RestControlPlane};
use capstan_controller::{DeployHandler, RollbackHandler};
use capstan_core::{CapstanConfig, Settings};
use capstan_notify::AnyNotifier;
use capstan_pipeline::RestPipeline;

#[derive(Parser)]
#[command(name = "capstand", about = "Capstan release controller daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the pipeline and alarm event endpoints.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8080")]
        port: u16,

        /// TOML config file providing the file layer of the settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the target cluster name.
        #[arg(long)]
        cluster_name: Option<String>,

        /// Override the target pipeline name.
        #[arg(long)]
        pipeline_name: Option<String>,

        /// Override the container image repository URL.
        #[arg(long)]
        image_repository_url: Option<String>,

        /// Scratch directory for rendered kubeconfigs.
        #[arg(long, default_value = "/tmp/capstan")]
        scratch_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,capstand=debug,capstan=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            config,
            cluster_name,
            pipeline_name,
            image_repository_url,
            scratch_dir,
        } => {
            serve(
                port,
                config,
                cluster_name,
                pipeline_name,
                image_repository_url,
                scratch_dir,
            )
            .await
        }
    }
}

async fn serve(
    port: u16,
    config_file: Option<PathBuf>,
    cluster_name: Option<String>,
    pipeline_name: Option<String>,
    image_repository_url: Option<String>,
    scratch_dir: PathBuf,
) -> anyhow::Result<()> {
    let mut settings = match &config_file {
        Some(path) => Settings::load_file(path).context("loading config file")?,
        None => Settings::new(),
    };
    if let Some(value) = cluster_name {
        settings = settings.with_override("cluster_name", value);
    }
    if let Some(value) = pipeline_name {
        settings = settings.with_override("pipeline_name", value);
    }
    if let Some(value) = image_repository_url {
        settings = settings.with_override("image_repository_url", value);
    }

    let config = CapstanConfig::load(&settings);

    // Endpoints the adapters dial are needed up front; everything a
    // handler requires per-invocation stays optional and is reported as
    // a configuration error on that invocation instead.
    let control_plane_url = config
        .control_plane_url
        .clone()
        .context("control_plane_url is not configured")?;
    let advisor_url = config
        .advisor_url
        .clone()
        .context("advisor_url is not configured")?;

    let deployment_template = ManifestTemplate::from_file(&config.deployment_manifest)
        .context("loading deployment manifest")?;
    let service_template = ManifestTemplate::from_file(&config.service_manifest)
        .context("loading service manifest")?;

    let deploy = DeployHandler::new(
        config.clone(),
        deployment_template,
        service_template,
        RestPipeline::new(control_plane_url.clone()),
        KubectlCluster::new(
            RestControlPlane::new(control_plane_url.clone()),
            &scratch_dir,
            config.credential_command.clone(),
        ),
        AnyNotifier::from_webhook_url(config.notify_webhook_url.clone()),
    );
    let rollback = RollbackHandler::new(
        config.clone(),
        RestPipeline::new(control_plane_url),
        HttpAdvisor::new(advisor_url, config.advisor_model_id.clone()),
        AnyNotifier::from_webhook_url(config.notify_webhook_url.clone()),
    );

    let router = server::build_router(deploy, rollback);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "event server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
        })
        .await?;

    info!("capstand stopped");
    Ok(())
}
