//! Operations offered to build steps: submit a job, wait for it and report
//! the outcome, plus the lookups used to fill in step forms.

use std::sync::Arc;

use rapiddeploy_api::schema::CONNECTION_BAD_MESSAGE;
use rapiddeploy_api::{
    BuildPackageRequest,
    DataDictionary,
    DeployError,
    DeployRequest,
    DeployResult,
    DeploymentTarget,
    JobPlan,
    JobPlanOrder,
    JobPlanRequest,
    Outcome,
    ServerEndpoint,
};
use tokio_util::sync::CancellationToken;

use crate::cache::{
    connection_key,
    FormCache,
};
use crate::config::ClientConfig;
use crate::console::Console;
use crate::extract;
use crate::poller::{
    JobPoller,
    LogOptions,
    PollSchedule,
};
use crate::substitution::{
    replace_placeholders,
    BuildEnvironment,
};
use crate::transport::{
    HttpMethod,
    HttpTransport,
    Transport,
};
use crate::urls;

pub const RECENT_PACKAGES_LIMIT: usize = 10;

const NO_JOB_ID_MESSAGE: &str = "Could not retrieve job ID, possibly running asynchronously!";

pub struct RapidDeployClient<T: Transport = HttpTransport> {
    endpoint: ServerEndpoint,
    transport: T,
    schedule: PollSchedule,
    job_plan_order: JobPlanOrder,
    cache: Arc<FormCache>,
}

impl RapidDeployClient<HttpTransport> {
    pub fn connect(server_url: &str, auth_token: &str, config: &ClientConfig) -> DeployResult<Self> {
        let endpoint = ServerEndpoint::new(server_url, auth_token)?;
        let transport = HttpTransport::new(config.request_timeout(), config.connect_timeout())?;
        Ok(Self::with_transport(endpoint, transport, config))
    }
}

impl<T: Transport> RapidDeployClient<T> {
    pub fn with_transport(endpoint: ServerEndpoint, transport: T, config: &ClientConfig) -> Self {
        Self {
            endpoint,
            transport,
            schedule: config.poll_schedule(),
            job_plan_order: config.job_plan_order,
            cache: Arc::new(FormCache::new()),
        }
    }

    /// Shares a lookup cache between clients, e.g. across step invocations
    pub fn with_cache(mut self, cache: Arc<FormCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    pub fn cache(&self) -> &Arc<FormCache> {
        &self.cache
    }

    /// Requests a deployment package build for a project
    pub async fn build_package(
        &self, request: &BuildPackageRequest, env: &BuildEnvironment, console: &dyn Console,
        cancel: &CancellationToken,
    ) -> Outcome {
        let package_name = substitute(request.package_name.as_deref(), env, console);

        console.println("Invoking RapidDeploy deployment package builder...");
        console.println(&format!("  > Server URL: {}", self.endpoint.base_url()));
        console.println(&format!("  > Project: {}", request.project));
        console.println(&format!(
            "  > Package name: {}",
            package_name.as_deref().unwrap_or_default()
        ));
        console.println(&format!(
            "  > Archive extension: {}",
            request.archive_extension
        ));
        console.println(&format!("  > Asynchronous? {}", request.asynchronous));
        console.blank();

        let url = urls::package_create(
            &self.endpoint,
            &request.project,
            package_name.as_deref(),
            &request.archive_extension,
        );
        let result = self
            .submit_and_wait(
                &url,
                None,
                request.asynchronous,
                LogOptions::default(),
                console,
                cancel,
            )
            .await;
        conclude(result, console)
    }

    /// Deploys a package (or the latest one) of a project to a target
    pub async fn deploy(
        &self, request: &DeployRequest, env: &BuildEnvironment, console: &dyn Console,
        cancel: &CancellationToken,
    ) -> Outcome {
        let package_name = substitute(request.package_name.as_deref(), env, console);

        console.println("Retrieving the list of data dictionary items...");
        let dictionary = env.data_dictionary();

        console.println("Invoking RapidDeploy project deploy via path...");
        console.println(&format!("  > Server URL: {}", self.endpoint.base_url()));
        console.println(&format!("  > Project: {}", request.project));
        console.println(&format!("  > Target: {}", request.target));
        console.println(&format!(
            "  > Package: {}",
            package_name.as_deref().unwrap_or_default()
        ));
        console.println(&format!("  > Asynchronous? {}", request.asynchronous));
        console.println(&format!(
            "  > Data dictionary: {}",
            describe_dictionary(&dictionary)
        ));
        console.blank();

        let result: DeployResult<String> = async {
            let target: DeploymentTarget = request.target.parse()?;
            let url = urls::deploy(
                &self.endpoint,
                &request.project,
                &target,
                package_name.as_deref(),
            );
            let body = (!dictionary.is_empty()).then(|| dictionary_xml(&dictionary));
            self.submit_and_wait(
                &url,
                body,
                request.asynchronous,
                LogOptions::default(),
                console,
                cancel,
            )
            .await
        }
        .await;
        conclude(result, console)
    }

    /// Runs a job plan selected as `[id] description` (or a bare id)
    pub async fn run_job_plan(
        &self, request: &JobPlanRequest, console: &dyn Console, cancel: &CancellationToken,
    ) -> Outcome {
        console.println("Invoking RapidDeploy job plan execution via path...");
        console.println(&format!("  > Server URL: {}", self.endpoint.base_url()));
        console.println(&format!("  > Job plan: {}", request.job_plan));
        console.println(&format!("  > Asynchronous? {}", request.asynchronous));
        console.println(&format!(
            "  > Show individual logs? {}",
            request.show_individual_logs
        ));
        console.println(&format!("  > Show full logs? {}", request.show_full_log));
        console.blank();

        let options = LogOptions {
            full_log: request.show_full_log,
            individual_logs: request.show_individual_logs,
        };
        let result: DeployResult<String> = async {
            let job_plan_id = JobPlan::id_from_selection(&request.job_plan)?;
            let url = urls::job_plan_run(&self.endpoint, &job_plan_id);
            self.submit_and_wait(&url, None, request.asynchronous, options, console, cancel)
                .await
        }
        .await;
        conclude(result, console)
    }

    async fn submit_and_wait(
        &self, url: &str, body: Option<String>, asynchronous: bool, options: LogOptions,
        console: &dyn Console, cancel: &CancellationToken,
    ) -> DeployResult<String> {
        let output = self
            .transport
            .send(HttpMethod::Put, url, self.endpoint.auth_token(), body)
            .await?;

        if asynchronous {
            tracing::info!(url, "job submitted asynchronously");
            console.println("RapidDeploy job successfully requested, not waiting for completion.");
            return Ok(output);
        }

        let job_id = extract::extract_job_id(&output)
            .ok_or_else(|| DeployError::JobSubmission(NO_JOB_ID_MESSAGE.to_string()))?;
        tracing::info!(job_id = %job_id, "job submitted");
        console.println(&format!(">>>  RapidDeploy job requested [{job_id}] <<<"));

        let outcome = JobPoller::new(&self.transport, &self.endpoint, self.schedule)
            .wait_for_completion(&job_id, options, console, cancel)
            .await?;

        console.println("RapidDeploy job successfully run. Please check the output.");
        console.blank();
        console.println(&outcome.log);
        Ok(outcome.log)
    }

    async fn get(&self, url: &str) -> DeployResult<String> {
        self.transport
            .send(HttpMethod::Get, url, self.endpoint.auth_token(), None)
            .await
    }

    async fn fetch_projects(&self) -> DeployResult<Vec<String>> {
        let body = self.get(&urls::project_list(&self.endpoint)).await?;
        extract::extract_names(&body, "name")
    }

    pub async fn list_projects(&self) -> DeployResult<Vec<String>> {
        let key = connection_key(&self.endpoint);
        self.cache.projects(&key, || self.fetch_projects()).await
    }

    /// Targets (`server.environment[.instance].application`) of a project
    pub async fn list_targets(&self, project: &str) -> DeployResult<Vec<String>> {
        let body = self.get(&urls::target_list(&self.endpoint, project)).await?;
        extract::extract_names(&body, "span")
    }

    pub async fn list_packages(
        &self, project: &str, target: Option<&DeploymentTarget>,
    ) -> DeployResult<Vec<String>> {
        let body = self
            .get(&urls::package_list(&self.endpoint, project, target))
            .await?;
        Ok(extract::extract_names(&body, "span")?
            .into_iter()
            .filter(|name| !name.starts_with("Deployment"))
            .collect())
    }

    /// The newest packages of a project, at most `limit` of them
    pub async fn recent_packages(&self, project: &str, limit: usize) -> DeployResult<Vec<String>> {
        let mut packages = self.list_packages(project, None).await?;
        packages.truncate(limit);
        Ok(packages)
    }

    /// Job plans in the configured order; `JobPlan::label` gives the selection text
    pub async fn list_job_plans(&self) -> DeployResult<Vec<JobPlan>> {
        let key = connection_key(&self.endpoint);
        let order = self.job_plan_order;
        self.cache
            .job_plans(&key, move || async move {
                let body = self.get(&urls::job_plan_list(&self.endpoint)).await?;
                let mut plans = extract::extract_job_plans(&body)?;
                order.sort(&mut plans);
                Ok(plans)
            })
            .await
    }

    /// Lists projects without the cache; no project at all means the server
    /// or token is not usable.
    pub async fn check_connection(&self) -> DeployResult<()> {
        let projects = self.fetch_projects().await?;
        if projects.is_empty() {
            return Err(DeployError::InvalidConfig(
                CONNECTION_BAD_MESSAGE.to_string(),
            ));
        }
        Ok(())
    }
}

fn substitute(value: Option<&str>, env: &BuildEnvironment, console: &dyn Console) -> Option<String> {
    value.map(|v| {
        if v.trim().is_empty() {
            v.to_string()
        } else {
            replace_placeholders(v, env, console)
        }
    })
}

fn conclude(result: DeployResult<String>, console: &dyn Console) -> Outcome {
    match result {
        Ok(log) => Outcome::succeeded(log),
        Err(e) => {
            tracing::error!(error = %e, "RapidDeploy call failed");
            console.println(&format!("Call failed with error: {e}"));
            Outcome::failed(e)
        }
    }
}

fn describe_dictionary(dictionary: &DataDictionary) -> String {
    let entries: Vec<String> = dictionary
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

/// Request body carrying the data dictionary overrides
pub(crate) fn dictionary_xml(dictionary: &DataDictionary) -> String {
    let mut xml = String::from("<dataDictionary>");
    for (key, value) in dictionary {
        xml.push_str(&format!(
            "<entry><key>{}</key><value>{}</value></entry>",
            quick_xml::escape::escape(key.as_str()),
            quick_xml::escape::escape(value.as_str())
        ));
    }
    xml.push_str("</dataDictionary>");
    xml
}
