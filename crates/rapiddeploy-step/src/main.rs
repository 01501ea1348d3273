mod cli;
mod interpolation;
mod logging;
mod step_config;

use std::process::ExitCode;

use clap::Parser;
use rapiddeploy_api::schema::{
    connection_schema,
    deploy_schema,
    job_plan_schema,
    package_schema,
    project_lookup_schema,
};
use rapiddeploy_api::DeploymentTarget;
use rapiddeploy_client::{
    BuildEnvironment,
    Console,
    RapidDeployClient,
    StdoutConsole,
    RECENT_PACKAGES_LIMIT,
};
use tokio_util::sync::CancellationToken;

use crate::cli::{
    Cli,
    Command,
};
use crate::step_config::StepConfig;

#[tokio::main]
async fn main() -> ExitCode {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    logging::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            StdoutConsole.println(&format!("Call failed with error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the step succeeded; `Err` is for setup problems only
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let file = match &cli.config {
        Some(path) => StepConfig::load(path)?,
        None => StepConfig::default(),
    };
    let step = file.resolve(cli.command.args());

    let schema = match &cli.command {
        Command::Deploy(_) => deploy_schema(),
        Command::Package(_) => package_schema(),
        Command::JobPlan(_) => job_plan_schema(),
        Command::CheckConnection(_) | Command::ListProjects(_) | Command::ListJobPlans(_) => {
            connection_schema()
        }
        Command::ListTargets(_) | Command::ListPackages(_) => project_lookup_schema(),
    };
    step.validate(&schema)?;

    let (server_url, token) = step.connection();
    let client = RapidDeployClient::connect(server_url, token, &step.client)?;
    let console = StdoutConsole;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, abandoning the wait for the job");
            on_interrupt.cancel();
        }
    });

    let outcome = match &cli.command {
        Command::Deploy(_) => {
            client
                .deploy(
                    &step.deploy_request(),
                    &BuildEnvironment::from_process(),
                    &console,
                    &cancel,
                )
                .await
        }
        Command::Package(_) => {
            client
                .build_package(
                    &step.package_request(),
                    &BuildEnvironment::from_process(),
                    &console,
                    &cancel,
                )
                .await
        }
        Command::JobPlan(_) => {
            client
                .run_job_plan(&step.job_plan_request(), &console, &cancel)
                .await
        }
        Command::CheckConnection(_) => {
            client.check_connection().await?;
            console.println(&format!("Connected to {}", client.endpoint().base_url()));
            return Ok(true);
        }
        Command::ListProjects(_) => {
            client.check_connection().await?;
            for project in client.list_projects().await? {
                console.println(&project);
            }
            return Ok(true);
        }
        Command::ListTargets(_) => {
            for target in client.list_targets(step.project()).await? {
                console.println(&target);
            }
            return Ok(true);
        }
        Command::ListPackages(args) => {
            let packages = if args.recent {
                client
                    .recent_packages(step.project(), RECENT_PACKAGES_LIMIT)
                    .await?
            } else {
                let target = step
                    .target
                    .as_deref()
                    .map(str::parse::<DeploymentTarget>)
                    .transpose()?;
                client.list_packages(step.project(), target.as_ref()).await?
            };
            for package in packages {
                console.println(&package);
            }
            return Ok(true);
        }
        Command::ListJobPlans(_) => {
            for plan in client.list_job_plans().await? {
                console.println(&plan.label());
            }
            return Ok(true);
        }
    };

    tracing::info!(success = outcome.success, "step finished");
    Ok(outcome.success)
}
