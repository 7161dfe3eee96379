//! Command-line configuration
//!
//! Parses the command line into the job to run and the settings of the
//! runner and the cluster connection.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use k8srun_client::ClusterConfig;
use k8srun_core::domain::Job;
use k8srun_runner::RunnerConfig;

#[derive(Parser, Debug)]
#[command(name = "k8srun")]
#[command(about = "Run a job as a Kubernetes pod and exit with its exit code", long_about = None)]
pub struct Cli {
    /// Path to the kubeconfig file
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, env = "K8SRUN_CONTEXT")]
    pub context: Option<String>,

    /// Namespace to look up the template in (default: the context's namespace)
    #[arg(short, long, env = "K8SRUN_NAMESPACE")]
    pub namespace: Option<String>,

    /// Pod status poll interval in milliseconds [env: K8SRUN_POLL_INTERVAL_MS]
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Seconds a pod may stay pending before the run fails [env: K8SRUN_START_TIMEOUT_SECS]
    #[arg(long)]
    pub start_timeout_secs: Option<u64>,

    /// Cancel the run and delete the pod after this many seconds
    #[arg(long, env = "K8SRUN_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Instance the template belongs to
    pub instance: String,

    /// Job name; its leading alphanumeric run selects the template
    pub name: String,

    /// Template configuration
    pub config: String,

    /// Arguments passed to the job's container
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// The job described by the positional arguments
    pub fn job(&self) -> Job {
        let job = Job::new(&self.instance, &self.name, &self.config).with_args(self.args.clone());

        match &self.namespace {
            Some(namespace) => job.with_namespace(namespace),
            None => job,
        }
    }

    /// Runner settings, with the command line overriding the environment
    pub fn runner_config(&self) -> Result<RunnerConfig> {
        let mut config = RunnerConfig::from_env()?;

        if let Some(millis) = self.poll_interval_ms {
            config = config.with_poll_interval(Duration::from_millis(millis));
        }
        if let Some(secs) = self.start_timeout_secs {
            config = config.with_start_timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
