use std::path::PathBuf;

use clap::{
    Args,
    Parser,
    Subcommand,
};

#[derive(Parser, Debug)]
#[command(name = "rapiddeploy-step")]
#[command(about = "Run RapidDeploy package builds, deployments and job plans from a build", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Step file (TOML); flags and environment fallbacks override it
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy a package of a project to a target
    Deploy(StepArgs),
    /// Build a deployment package
    Package(StepArgs),
    /// Run a job plan
    JobPlan(StepArgs),
    /// Check that the server answers and the token sees at least one project
    CheckConnection(StepArgs),
    /// Print the projects visible with the token
    ListProjects(StepArgs),
    /// Print the deployment targets of a project
    ListTargets(StepArgs),
    /// Print the packages of a project, optionally for one target
    ListPackages(StepArgs),
    /// Print the job plans as selection labels
    ListJobPlans(StepArgs),
}

impl Command {
    pub fn args(&self) -> &StepArgs {
        match self {
            Command::Deploy(args)
            | Command::Package(args)
            | Command::JobPlan(args)
            | Command::CheckConnection(args)
            | Command::ListProjects(args)
            | Command::ListTargets(args)
            | Command::ListPackages(args)
            | Command::ListJobPlans(args) => args,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct StepArgs {
    /// RapidDeploy server URL
    #[arg(long, env = "RAPIDDEPLOY_SERVER_URL")]
    pub server_url: Option<String>,

    /// Web service authentication token
    #[arg(long, env = "RAPIDDEPLOY_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    /// server.environment[.instance].application
    #[arg(long)]
    pub target: Option<String>,

    /// Package to deploy or build; `latest` or empty picks the newest
    #[arg(long)]
    pub package_name: Option<String>,

    #[arg(long, value_name = "EXT")]
    pub archive_extension: Option<String>,

    /// `[id] description` or a bare job plan id
    #[arg(long)]
    pub job_plan: Option<String>,

    /// Return once the job is submitted
    #[arg(long = "async")]
    pub asynchronous: bool,

    #[arg(long)]
    pub show_individual_logs: bool,

    #[arg(long)]
    pub show_full_log: bool,

    /// With list-packages, only the newest few packages
    #[arg(long)]
    pub recent: bool,
}
