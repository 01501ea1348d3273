//! Web service paths on the RapidDeploy server

use rapiddeploy_api::{
    DeploymentTarget,
    JobId,
    ServerEndpoint,
};

fn enc(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Package names left blank or set to `latest` let the server pick the newest package
pub(crate) fn explicit_package(package_name: Option<&str>) -> Option<&str> {
    package_name
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("latest"))
}

pub(crate) fn deploy(
    endpoint: &ServerEndpoint, project: &str, target: &DeploymentTarget, package_name: Option<&str>,
) -> String {
    let target_path = target
        .segments()
        .into_iter()
        .map(enc)
        .collect::<Vec<_>>()
        .join("/");

    let mut url = endpoint.url(&format!(
        "/ws/deployment/{}/runjob/deploy/{}?returnLogFile=true",
        enc(project),
        target_path
    ));
    if let Some(package) = explicit_package(package_name) {
        url.push_str("&packageName=");
        url.push_str(&enc(package));
    }
    url
}

pub(crate) fn package_create(
    endpoint: &ServerEndpoint, project: &str, package_name: Option<&str>, archive_extension: &str,
) -> String {
    // `archiveExension` is the parameter name the server expects
    endpoint.url(&format!(
        "/ws/deployment/{}/package/create?packageName={}&archiveExension={}",
        enc(project),
        enc(package_name.unwrap_or_default().trim()),
        enc(archive_extension)
    ))
}

pub(crate) fn job_plan_run(endpoint: &ServerEndpoint, job_plan_id: &str) -> String {
    endpoint.url(&format!(
        "/ws/deployment/jobplan/{}/run?returnLogFile=true",
        enc(job_plan_id)
    ))
}

pub(crate) fn job_plan_list(endpoint: &ServerEndpoint) -> String {
    endpoint.url("/ws/deployment/jobplan/list")
}

pub(crate) fn job_details(endpoint: &ServerEndpoint, job_id: &JobId) -> String {
    endpoint.url(&format!(
        "/ws/deployment/display/job/{}",
        enc(job_id.as_str())
    ))
}

pub(crate) fn job_log(endpoint: &ServerEndpoint, job_id: &JobId) -> String {
    endpoint.url(&format!(
        "/ws/deployment/showlog/job/{}",
        enc(job_id.as_str())
    ))
}

pub(crate) fn project_list(endpoint: &ServerEndpoint) -> String {
    endpoint.url("/ws/project/list")
}

pub(crate) fn target_list(endpoint: &ServerEndpoint, project: &str) -> String {
    endpoint.url(&format!("/ws/project/{}/list", enc(project)))
}

/// Packages of a project, optionally narrowed to the server/environment/instance of a target
pub(crate) fn package_list(
    endpoint: &ServerEndpoint, project: &str, target: Option<&DeploymentTarget>,
) -> String {
    let mut path = format!("/ws/deployment/{}/package/list", enc(project));
    if let Some(target) = target {
        path.push_str(&format!(
            "/{}/{}",
            enc(&target.server),
            enc(&target.environment)
        ));
        if let Some(instance) = &target.instance {
            path.push('/');
            path.push_str(&enc(instance));
        }
    }
    endpoint.url(&path)
}
