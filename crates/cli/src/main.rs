//! k8s-sampler - records deployment resource usage and autoscaling state
//! to CSV for offline analysis

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use sampler_lib::{
    KubeCluster, PodSampler, PodSamplingConfig, PodSelector, Sampler, SamplingConfig, WriteMode,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sample Kubernetes deployment metrics into CSV files
#[derive(Parser)]
#[command(name = "k8s-sampler")]
#[command(
    author,
    version,
    about = "Records deployment CPU/memory usage and autoscaler state for offline analysis",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Namespace of the deployment
    #[arg(long, default_value = "default")]
    namespace: String,

    /// Path to a kubeconfig file; client inference (in-cluster or
    /// ~/.kube/config) when unset
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Seconds to sleep between metrics requests
    #[arg(long, default_value_t = 15)]
    sleep_time: u64,

    /// Total time to observe metrics, in seconds
    #[arg(long, default_value_t = 300)]
    observation_time: u64,

    /// Append to existing output instead of overwriting
    #[arg(long)]
    append: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample namespace-wide averages for one deployment
    Deployment {
        /// The deployment to observe
        #[arg(long)]
        deployment_name: String,

        /// Output CSV file
        #[arg(long, default_value = "deployment_metrics.csv")]
        filename: PathBuf,

        /// Average over every pod in the namespace, not just the
        /// deployment's
        #[arg(long)]
        all_pods: bool,
    },

    /// Sample each pod individually, one CSV per pod
    Pods {
        /// Pod name prefix to select (a deployment name)
        #[arg(long, required_unless_present = "all_pods")]
        deployment_name: Option<String>,

        /// Sample every pod in the namespace
        #[arg(long)]
        all_pods: bool,

        /// Directory for the per-pod CSV files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

/// A fully validated run, derived from the arguments before any cluster
/// connection is attempted
enum RunPlan {
    Aggregate(SamplingConfig),
    PerPod(PodSamplingConfig),
}

fn build_plan(cli: Cli) -> Result<(RunPlan, Option<PathBuf>)> {
    let interval = Duration::from_secs(cli.common.sleep_time);
    let observation = Duration::from_secs(cli.common.observation_time);
    let mode = if cli.common.append {
        WriteMode::Append
    } else {
        WriteMode::Overwrite
    };

    let plan = match cli.command {
        Commands::Deployment {
            deployment_name,
            filename,
            all_pods,
        } => {
            let selector = if all_pods {
                PodSelector::AllPods
            } else {
                PodSelector::Deployment(deployment_name.clone())
            };
            RunPlan::Aggregate(SamplingConfig {
                namespace: cli.common.namespace,
                deployment: deployment_name,
                selector,
                sink_path: filename,
                interval,
                observation,
                mode,
            })
        }
        Commands::Pods {
            deployment_name,
            all_pods,
            output_dir,
        } => {
            let selector = if all_pods {
                PodSelector::AllPods
            } else if let Some(name) = deployment_name {
                PodSelector::Deployment(name)
            } else {
                anyhow::bail!("either provide --deployment-name or use --all-pods")
            };
            RunPlan::PerPod(PodSamplingConfig {
                namespace: cli.common.namespace,
                selector,
                output_dir,
                interval,
                observation,
                mode,
            })
        }
    };

    Ok((plan, cli.common.kubeconfig))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    // Argument problems must surface before any cluster connection is
    // attempted
    let (plan, kubeconfig) = build_plan(Cli::parse())?;

    let client = make_client(kubeconfig.as_deref()).await?;
    let cluster = KubeCluster::new(client);

    // Ctrl-C lets the in-flight iteration finish, then the run flushes
    // and closes its sink
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, finishing current iteration");
                let _ = shutdown_tx.send(());
            }
            Err(e) => warn!(error = %e, "could not listen for interrupts"),
        }
    });

    let summary = match plan {
        RunPlan::Aggregate(config) => Sampler::new(&cluster, config).run(shutdown_rx).await?,
        RunPlan::PerPod(config) => PodSampler::new(&cluster, config).run(shutdown_rx).await?,
    };

    info!(
        iterations = summary.iterations,
        rows_written = summary.rows_written,
        skipped = summary.skipped,
        "sampling run complete"
    );

    Ok(())
}

async fn make_client(kubeconfig: Option<&Path>) -> Result<Client> {
    match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("failed to build client config from kubeconfig")?;
            Client::try_from(config).context("failed to create cluster client")
        }
        None => Client::try_default()
            .await
            .context("failed to create cluster client"),
    }
}
