use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use url::Url;

use crate::auth::Credential;
use crate::config::{Config, ExporterConfig};
use crate::metrics::{MetricSnapshot, SnapshotCache};
use crate::output;
use crate::providers::{AzureDevOpsClient, Collector, WorkerPool};
use crate::scheduler::{RetryPolicy, Scheduler, BACKOFF_UNIT};
use crate::server;

#[derive(Parser)]
#[command(name = "ado-exporter")]
#[command(author, version, about = "Azure DevOps CI/CD metrics exporter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./ado-exporter.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh metrics periodically and serve them over HTTP
    Serve {
        #[command(flatten)]
        azure: AzureArgs,

        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Seconds between refresh cycles
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Run a single collection cycle and print the metrics
    Collect {
        #[command(flatten)]
        azure: AzureArgs,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct AzureArgs {
    /// Service base URL, e.g. https://dev.azure.com
    #[arg(short, long, env = "ADO_URL")]
    url: Option<String>,

    #[arg(short = 'O', long, env = "ADO_ORGANIZATION")]
    organization: Option<String>,

    #[arg(short = 'P', long, env = "ADO_PROJECT")]
    project: Option<String>,

    #[arg(short, long, env = "ADO_PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Most recent builds considered for timeline metrics
    #[arg(short, long)]
    build_limit: Option<usize>,
}

impl AzureArgs {
    /// Merges flags (and their env bindings) over the config file.
    fn resolve(&self, config: Config) -> Result<(Credential, ExporterConfig)> {
        let Config { azure, mut exporter } = config;

        let url = self.url.clone().or(azure.url).unwrap_or_default();
        if !url.is_empty() {
            Url::parse(&url).with_context(|| format!("Invalid Azure DevOps URL: {url}"))?;
        }

        let credential = Credential::new(
            url,
            self.organization.clone().or(azure.organization).unwrap_or_default(),
            self.project.clone().or(azure.project).unwrap_or_default(),
            self.token.clone().or(azure.token).unwrap_or_default(),
        );

        if credential.organization().is_empty() || credential.project().is_empty() {
            warn!("Organization or project is not set; API requests will likely fail");
        }

        if let Some(limit) = self.build_limit {
            exporter.build_limit = limit;
        }

        Ok((credential, exporter))
    }
}

fn build_collector(
    credential: Credential,
    exporter: &ExporterConfig,
) -> Result<Collector<AzureDevOpsClient>> {
    let client = AzureDevOpsClient::new(
        credential,
        Duration::from_secs(exporter.request_timeout_secs),
    )?;

    info!(
        "Exporting metrics for {}/{}",
        client.credential().organization(),
        client.credential().project()
    );

    Ok(Collector::new(client)
        .with_pool(WorkerPool::new(exporter.pool_size))
        .with_build_limit(exporter.build_limit))
}

async fn wait_for_ctrl_c(shutdown: watch::Sender<bool>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
            shutdown.send_replace(true);
        }
        Err(e) => {
            error!("Unable to listen for shutdown signal: {e}");
            // Keep the sender alive so receivers don't treat this as shutdown.
            std::future::pending::<()>().await;
        }
    }
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        Config::load(self.config.as_deref())
    }

    async fn execute_serve(
        &self,
        azure: &AzureArgs,
        port: Option<u16>,
        interval_secs: Option<u64>,
    ) -> Result<()> {
        let (credential, mut exporter) = azure.resolve(self.load_config()?)?;
        if let Some(port) = port {
            exporter.port = port;
        }
        if let Some(secs) = interval_secs {
            exporter.interval_secs = secs;
        }

        let interval = exporter.refresh_interval()?;

        let collector = build_collector(credential, &exporter)?;
        let cache = Arc::new(SnapshotCache::new());
        let scheduler = Arc::new(
            Scheduler::new(collector, Arc::clone(&cache))
                .with_policy(RetryPolicy::new(exporter.max_retries, BACKOFF_UNIT))
                .with_interval(interval),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let router = server::build_router(cache, scheduler.subscribe());

        let refresher = tokio::spawn({
            let scheduler = Arc::clone(&scheduler);
            let shutdown = shutdown_rx.clone();
            async move { scheduler.run(shutdown).await }
        });
        tokio::spawn(wait_for_ctrl_c(shutdown_tx));

        let addr = SocketAddr::from(([0, 0, 0, 0], exporter.port));
        server::serve(addr, router, shutdown_rx)
            .await
            .with_context(|| format!("Server on {addr} failed"))?;

        refresher.await.context("Refresh scheduler panicked")?;
        info!("Shutdown complete");

        Ok(())
    }

    async fn execute_collect(&self, azure: &AzureArgs, output_path: Option<&Path>) -> Result<()> {
        let (credential, exporter) = azure.resolve(self.load_config()?)?;
        let collector = build_collector(credential, &exporter)?;

        let started = Instant::now();
        let lines = collector.collect().await.context("Collection failed")?;
        let snapshot = MetricSnapshot::new(lines, chrono::Utc::now());
        if snapshot.is_empty() {
            warn!("Collection produced no metrics");
        }

        output::write_exposition(&snapshot.render(), output_path)?;
        output::print_collect_summary(snapshot.len(), started.elapsed());

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Serve {
                azure,
                port,
                interval_secs,
            } => self.execute_serve(azure, *port, *interval_secs).await,
            Commands::Collect { azure, output } => {
                self.execute_collect(azure, output.as_deref()).await
            }
        }
    }
}
