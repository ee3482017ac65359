//! Deployment center form for container deployments

use super::code::{github_repo_url, is_github_repository, merge_site_config, parse_github_repo, DEFAULT_BRANCH};
use super::FormBuilder;
use crate::plan::{ResourceUpdateRequest, UpdatePlan, UpdateStage, UpdateTarget};
use crate::validation::{Check, Condition, FieldRule, ValidationSchema};
use appsvc_core::{Os, Result};
use appsvc_gateway::SiteResourceState;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::LazyLock;
use tracing::warn;

const SERVER_URL_SETTING: &str = "DOCKER_REGISTRY_SERVER_URL";
const USERNAME_SETTING: &str = "DOCKER_REGISTRY_SERVER_USERNAME";
const PASSWORD_SETTING: &str = "DOCKER_REGISTRY_SERVER_PASSWORD";
const ENABLE_CI_SETTING: &str = "DOCKER_ENABLE_CI";
const DOCKER_HUB_URL: &str = "https://index.docker.io";
const ACR_HOST_SUFFIX: &str = ".azurecr.io";
const ACR_API_VERSION: &str = "2017-10-01";
const APP_COMMAND_LINE: &str = "appCommandLine";
const LINUX_FX_VERSION: &str = "linuxFxVersion";
const WINDOWS_FX_VERSION: &str = "windowsFxVersion";
const WEBHOOK_NAME_MAX: usize = 50;

static SERVER_URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/]+/?$").expect("server url regex is valid"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeploymentSource {
    /// The site pulls straight from the registry
    #[default]
    Registry,
    /// A GitHub workflow builds and pushes the image
    GitHubAction,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerOption {
    #[default]
    Docker,
    Compose,
    Kubernetes,
}

impl ContainerOption {
    /// Prefix of the `*FxVersion` site config value
    pub fn fx_prefix(&self) -> &'static str {
        match self {
            Self::Docker => "DOCKER",
            Self::Compose => "COMPOSE",
            Self::Kubernetes => "KUBE",
        }
    }

    fn from_fx_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_uppercase().as_str() {
            "DOCKER" => Some(Self::Docker),
            "COMPOSE" => Some(Self::Compose),
            "KUBE" => Some(Self::Kubernetes),
            _ => None,
        }
    }
}

/// Registry the image is pulled from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "registrySource", rename_all = "camelCase")]
pub enum RegistrySource {
    Acr {
        #[serde(rename = "acrLoginServer", default)]
        login_server: String,
        #[serde(rename = "acrImage", default)]
        image: String,
        #[serde(rename = "acrTag", default)]
        tag: String,
        #[serde(rename = "acrUsername", default)]
        username: String,
        #[serde(rename = "acrPassword", default)]
        password: String,
        /// ARM id of the registry, needed for webhook registration
        #[serde(rename = "acrResourceId", default, skip_serializing_if = "Option::is_none")]
        resource_id: Option<String>,
        #[serde(rename = "acrLocation", default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    PrivateRegistry {
        #[serde(rename = "privateRegistryServerUrl", default)]
        server_url: String,
        #[serde(rename = "privateRegistryImageAndTag", default)]
        image_and_tag: String,
        #[serde(rename = "privateRegistryUsername", default)]
        username: String,
        #[serde(rename = "privateRegistryPassword", default)]
        password: String,
    },
    DockerHub {
        #[serde(rename = "dockerHubImageAndTag", default)]
        image_and_tag: String,
        #[serde(rename = "dockerHubUsername", default)]
        username: String,
        #[serde(rename = "dockerHubPassword", default)]
        password: String,
    },
}

impl Default for RegistrySource {
    fn default() -> Self {
        Self::DockerHub {
            image_and_tag: String::new(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl RegistrySource {
    pub fn server_url(&self) -> String {
        match self {
            Self::Acr { login_server, .. } => format!("https://{}", login_server),
            Self::PrivateRegistry { server_url, .. } => server_url.clone(),
            Self::DockerHub { .. } => DOCKER_HUB_URL.to_string(),
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Self::Acr { username, .. }
            | Self::PrivateRegistry { username, .. }
            | Self::DockerHub { username, .. } => username,
        }
    }

    pub fn password(&self) -> &str {
        match self {
            Self::Acr { password, .. }
            | Self::PrivateRegistry { password, .. }
            | Self::DockerHub { password, .. } => password,
        }
    }

    /// Image reference as written after the `DOCKER|` prefix
    pub fn image_reference(&self) -> String {
        match self {
            Self::Acr {
                login_server,
                image,
                tag,
                ..
            } if tag.is_empty() => format!("{}/{}", login_server, image),
            Self::Acr {
                login_server,
                image,
                tag,
                ..
            } => format!("{}/{}:{}", login_server, image, tag),
            Self::PrivateRegistry {
                server_url,
                image_and_tag,
                ..
            } => format!("{}/{}", registry_host(server_url), image_and_tag),
            Self::DockerHub { image_and_tag, .. } => image_and_tag.clone(),
        }
    }

    /// Registry source for a server URL setting and the image reference
    /// found after the fx prefix
    fn detect(server_url: &str, reference: &str, username: String, password: String) -> Self {
        let host = registry_host(server_url);
        let path = reference
            .strip_prefix(&format!("{}/", host))
            .unwrap_or(reference)
            .to_string();

        if host.ends_with(ACR_HOST_SUFFIX) {
            let (image, tag) = match path.rsplit_once(':') {
                Some((image, tag)) => (image.to_string(), tag.to_string()),
                None => (path.clone(), String::new()),
            };
            Self::Acr {
                login_server: host,
                image,
                tag,
                username,
                password,
                resource_id: None,
                location: None,
            }
        } else if host.is_empty() || server_url.trim_end_matches('/') == DOCKER_HUB_URL {
            Self::DockerHub {
                image_and_tag: path,
                username,
                password,
            }
        } else {
            Self::PrivateRegistry {
                server_url: server_url.to_string(),
                image_and_tag: path,
                username,
                password,
            }
        }
    }
}

/// Lowercased host of a registry URL
fn registry_host(server_url: &str) -> String {
    let lower = server_url.trim().to_lowercase();
    lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower)
        .trim_end_matches('/')
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerFormValues {
    pub deployment_source: DeploymentSource,
    pub option: ContainerOption,
    #[serde(flatten)]
    pub registry: RegistrySource,
    /// Compose or Kubernetes configuration file
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub continuous_deployment: bool,
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub branch: String,
}

impl ContainerFormValues {
    /// Value for the site's `linuxFxVersion` or `windowsFxVersion`
    pub fn fx_version(&self) -> String {
        let payload = match self.option {
            ContainerOption::Docker => self.registry.image_reference(),
            ContainerOption::Compose | ContainerOption::Kubernetes => BASE64.encode(self.config.as_bytes()),
        };
        format!("{}|{}", self.option.fx_prefix(), payload)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerFormBuilder;

impl ContainerFormBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Current app settings with the registry keys replaced.
    ///
    /// A stored server URL naming the same registry is kept as written, and
    /// Docker Hub needs no server URL when the site has none.
    fn app_settings_request(&self, state: &SiteResourceState, values: &ContainerFormValues) -> ResourceUpdateRequest {
        let mut app_settings = state.app_settings.clone();
        let stored_url = app_settings.remove(SERVER_URL_SETTING);
        let stored_ci = app_settings.remove(ENABLE_CI_SETTING);
        for key in [USERNAME_SETTING, PASSWORD_SETTING] {
            app_settings.remove(key);
        }

        if values.deployment_source == DeploymentSource::Registry && values.continuous_deployment {
            let ci = stored_ci
                .filter(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or_else(|| "true".to_string());
            app_settings.insert(ENABLE_CI_SETTING.to_string(), ci);
        }
        let server_url = values.registry.server_url();
        match stored_url {
            Some(stored) if registry_host(&stored) == registry_host(&server_url) => {
                app_settings.insert(SERVER_URL_SETTING.to_string(), stored);
            }
            None if matches!(values.registry, RegistrySource::DockerHub { .. }) => {}
            _ => {
                app_settings.insert(SERVER_URL_SETTING.to_string(), server_url);
            }
        }
        for (key, value) in [
            (USERNAME_SETTING, values.registry.username()),
            (PASSWORD_SETTING, values.registry.password()),
        ] {
            if !value.is_empty() {
                app_settings.insert(key.to_string(), value.to_string());
            }
        }

        ResourceUpdateRequest::put(
            UpdateTarget::AppSettings,
            state.app_settings_id(),
            json!({ "properties": app_settings }),
        )
    }

    fn settings_requests(&self, state: &SiteResourceState, values: &ContainerFormValues) -> Vec<ResourceUpdateRequest> {
        let mut requests = vec![self.app_settings_request(state, values)];
        let fx_key = match state.os {
            Os::Linux => LINUX_FX_VERSION,
            Os::Windows => WINDOWS_FX_VERSION,
        };
        merge_site_config(&mut requests, state, fx_key, json!(values.fx_version()));
        if !values.command.is_empty() || state.site_config.contains_key(APP_COMMAND_LINE) {
            merge_site_config(&mut requests, state, APP_COMMAND_LINE, json!(values.command));
        }
        requests
    }

    /// Registers or removes the ACR push webhook. Needs the registry's ARM id
    /// and location and the site's SCM endpoint.
    fn webhook_request(&self, state: &SiteResourceState, values: &ContainerFormValues) -> Option<ResourceUpdateRequest> {
        let RegistrySource::Acr {
            image,
            tag,
            resource_id: Some(registry_id),
            location,
            ..
        } = &values.registry
        else {
            return None;
        };
        let webhook_id = format!(
            "{}/webhooks/{}?api-version={}",
            registry_id.trim_end_matches('/'),
            webhook_name(state.name()),
            ACR_API_VERSION
        );

        if !values.continuous_deployment {
            return Some(ResourceUpdateRequest::delete(UpdateTarget::RegistryWebhook, webhook_id));
        }

        let Some(scm_uri) = state
            .publishing_credentials
            .as_ref()
            .and_then(|c| c.scm_uri.as_deref())
        else {
            warn!("No SCM endpoint for {}, skipping ACR webhook", state.resource_id);
            return None;
        };
        let Some(location) = location else {
            warn!("No registry location given, skipping ACR webhook");
            return None;
        };

        // A multi-container config has no single repository to scope to
        let scope = match values.option {
            ContainerOption::Docker if !image.is_empty() && !tag.is_empty() => format!("{}:{}", image, tag),
            ContainerOption::Docker => image.clone(),
            ContainerOption::Compose | ContainerOption::Kubernetes => String::new(),
        };

        Some(ResourceUpdateRequest::put(
            UpdateTarget::RegistryWebhook,
            webhook_id,
            json!({
                "location": location,
                "properties": {
                    "serviceUri": format!("{}/docker/hook", scm_uri.trim_end_matches('/')),
                    "customHeaders": {},
                    "actions": ["push"],
                    "status": "enabled",
                    "scope": scope,
                }
            }),
        ))
    }
}

/// Webhook name for a site: `webapp` plus the alphanumeric part of the
/// site name, at most 50 characters
fn webhook_name(site: &str) -> String {
    let mut name: String = "webapp".to_string();
    name.extend(site.chars().filter(char::is_ascii_alphanumeric));
    name.truncate(WEBHOOK_NAME_MAX);
    name
}

impl FormBuilder for ContainerFormBuilder {
    type Values = ContainerFormValues;

    fn generate_form_data(&self, state: &SiteResourceState) -> Result<ContainerFormValues> {
        let fx_key = match state.os {
            Os::Linux => LINUX_FX_VERSION,
            Os::Windows => WINDOWS_FX_VERSION,
        };
        let fx_version = state
            .site_config
            .get(fx_key)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let (option, payload) = fx_version
            .split_once('|')
            .and_then(|(prefix, rest)| ContainerOption::from_fx_prefix(prefix).map(|o| (o, rest)))
            .unwrap_or((ContainerOption::Docker, ""));

        let setting = |key: &str| state.app_settings.get(key).cloned().unwrap_or_default();
        let (reference, config) = match option {
            ContainerOption::Docker => (payload.to_string(), String::new()),
            ContainerOption::Compose | ContainerOption::Kubernetes => {
                let config = BASE64
                    .decode(payload)
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_else(|e| {
                        warn!("Could not decode {} configuration: {}", option.fx_prefix(), e);
                        String::new()
                    });
                (String::new(), config)
            }
        };

        let mut values = ContainerFormValues {
            option,
            registry: RegistrySource::detect(
                &setting(SERVER_URL_SETTING),
                &reference,
                setting(USERNAME_SETTING),
                setting(PASSWORD_SETTING),
            ),
            config,
            command: state
                .site_config
                .get(APP_COMMAND_LINE)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            continuous_deployment: setting(ENABLE_CI_SETTING).eq_ignore_ascii_case("true"),
            ..Default::default()
        };

        if let Some(source_control) = state.source_control.as_ref().filter(|sc| sc.is_github_action) {
            values.deployment_source = DeploymentSource::GitHubAction;
            values.branch = source_control.branch.clone();
            if let Some((org, repo)) = parse_github_repo(&source_control.repo_url) {
                values.org = org;
                values.repo = repo;
            }
        }
        Ok(values)
    }

    fn generate_validation_schema(&self) -> ValidationSchema {
        let acr = Condition::equals("registrySource", "acr");
        let private = Condition::equals("registrySource", "privateRegistry");
        let docker = Condition::equals("option", "docker");
        let github_action = Condition::equals("deploymentSource", "gitHubAction");

        ValidationSchema::new()
            .rule(FieldRule::required("option").check(Check::one_of(&["docker", "compose", "kubernetes"])))
            .rule(
                FieldRule::required("registrySource")
                    .check(Check::one_of(&["acr", "privateRegistry", "dockerHub"])),
            )
            .rule(FieldRule::required_when("acrLoginServer", acr.clone()))
            .rule(FieldRule::required_when(
                "acrImage",
                Condition::All(vec![acr.clone(), docker.clone()]),
            ))
            .rule(FieldRule::required_when("acrUsername", acr.clone()))
            .rule(FieldRule::required_when("acrPassword", acr))
            .rule(
                FieldRule::required_when("privateRegistryServerUrl", private.clone())
                    .check(Check::Pattern(SERVER_URL_PATTERN.clone())),
            )
            .rule(FieldRule::required_when(
                "privateRegistryImageAndTag",
                Condition::All(vec![private, docker.clone()]),
            ))
            .rule(FieldRule::required_when(
                "dockerHubImageAndTag",
                Condition::All(vec![Condition::equals("registrySource", "dockerHub"), docker]),
            ))
            .rule(FieldRule::required_when(
                "config",
                Condition::one_of("option", &["compose", "kubernetes"]),
            ))
            .rule(FieldRule::required_when("org", github_action.clone()))
            .rule(FieldRule::required_when("repo", github_action.clone()))
            .rule(FieldRule::required_when("branch", github_action))
    }

    /// Registry deployments write app settings and site config together,
    /// then register the ACR webhook on a best-effort basis. GitHub Action
    /// deployments register source control first and write settings only
    /// once that succeeded.
    fn to_update_requests(&self, state: &SiteResourceState, values: &ContainerFormValues) -> Result<UpdatePlan> {
        let settings = self.settings_requests(state, values);

        let plan = match values.deployment_source {
            DeploymentSource::Registry => {
                let webhook: Vec<_> = self.webhook_request(state, values).into_iter().collect();
                UpdatePlan::new()
                    .stage(UpdateStage::new("container settings", settings))
                    .stage(UpdateStage::new("registry webhook", webhook).after_previous().best_effort())
            }
            DeploymentSource::GitHubAction => {
                let branch = if values.branch.is_empty() {
                    DEFAULT_BRANCH
                } else {
                    values.branch.as_str()
                };
                // The stored URL is kept while the repository is unchanged
                let repo_url = state
                    .source_control
                    .as_ref()
                    .filter(|sc| is_github_repository(sc, &values.org, &values.repo))
                    .map(|sc| sc.repo_url.clone())
                    .unwrap_or_else(|| github_repo_url(&values.org, &values.repo));
                let source_control = ResourceUpdateRequest::put(
                    UpdateTarget::SourceControl,
                    state.source_control_id(),
                    json!({ "properties": {
                        "repoUrl": repo_url,
                        "branch": branch,
                        "isManualIntegration": false,
                        "isGitHubAction": true,
                        "isMercurial": false,
                    } }),
                );
                UpdatePlan::new()
                    .stage(UpdateStage::new("source control", vec![source_control]))
                    .stage(UpdateStage::new("container settings", settings).after_previous())
            }
        };
        Ok(plan)
    }
}
