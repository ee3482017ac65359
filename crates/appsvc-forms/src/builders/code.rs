//! Deployment center form for code deployments

use super::stack::{detected_runtime, runtime_requests};
use super::FormBuilder;
use crate::plan::{ResourceUpdateRequest, UpdatePlan, UpdateStage, UpdateTarget};
use crate::validation::{Check, Condition, FieldRule, ValidationSchema};
use appsvc_core::Result;
use appsvc_gateway::{SiteResourceState, SourceControlInfo};
use appsvc_stacks::StackResolver;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::LazyLock;

const GITHUB_URI: &str = "https://github.com";
pub(crate) const DEFAULT_BRANCH: &str = "master";
const SCM_TYPE: &str = "scmType";
const PUBLISHING_USER_ID: &str = "/providers/Microsoft.Web/publishingUsers/web";

static ORG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]*$").expect("org regex is valid"));
static REPO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("repo regex is valid"));
static PASSWORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.{8,}$").expect("password regex is valid"));

/// Where the code comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceProvider {
    #[default]
    None,
    GitHub,
    ExternalGit,
    LocalGit,
}

/// What builds it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildProvider {
    #[default]
    None,
    GitHubAction,
    AppServiceBuildService,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFormValues {
    pub source_provider: SourceProvider,
    pub build_provider: BuildProvider,
    pub runtime_stack: String,
    pub runtime_version: String,
    pub org: String,
    pub repo: String,
    pub branch: String,
    /// Clone URL for `ExternalGit`
    pub repo_url: String,
    pub publishing_username: String,
    pub publishing_password: String,
    pub publishing_confirm_password: String,
}

pub struct CodeFormBuilder {
    resolver: StackResolver,
}

impl CodeFormBuilder {
    pub fn new(resolver: StackResolver) -> Self {
        Self { resolver }
    }
}

impl FormBuilder for CodeFormBuilder {
    type Values = CodeFormValues;

    fn generate_form_data(&self, state: &SiteResourceState) -> Result<CodeFormValues> {
        let mut values = CodeFormValues::default();

        if let Some(source_control) = &state.source_control {
            values.branch = source_control.branch.clone();
            values.build_provider = if source_control.is_github_action {
                BuildProvider::GitHubAction
            } else {
                BuildProvider::AppServiceBuildService
            };
            match parse_github_repo(&source_control.repo_url) {
                Some((org, repo)) => {
                    values.source_provider = SourceProvider::GitHub;
                    values.org = org;
                    values.repo = repo;
                }
                None => {
                    values.source_provider = SourceProvider::ExternalGit;
                    values.repo_url = source_control.repo_url.clone();
                }
            }
        } else if state.site_config.get(SCM_TYPE).and_then(Value::as_str) == Some("LocalGit") {
            values.source_provider = SourceProvider::LocalGit;
            values.build_provider = BuildProvider::AppServiceBuildService;
        }

        if let Some(runtime) = detected_runtime(&self.resolver, state) {
            values.runtime_stack = runtime.stack;
            values.runtime_version = runtime.minor;
        }
        Ok(values)
    }

    fn generate_validation_schema(&self) -> ValidationSchema {
        let github_action = Condition::equals("buildProvider", "GitHubAction");
        let github = Condition::equals("sourceProvider", "GitHub");
        let password_set = Condition::present("publishingPassword");

        ValidationSchema::new()
            .rule(FieldRule::required("sourceProvider"))
            .rule(FieldRule::required("buildProvider"))
            .rule(FieldRule::required_unless("runtimeStack", github_action.clone()))
            .rule(FieldRule::required_unless("runtimeVersion", github_action))
            .rule(FieldRule::required_when("org", github.clone()).check(Check::Pattern(ORG_PATTERN.clone())))
            .rule(FieldRule::required_when("repo", github.clone()).check(Check::Pattern(REPO_PATTERN.clone())))
            .rule(FieldRule::required_when(
                "branch",
                Condition::one_of("sourceProvider", &["GitHub", "ExternalGit"]),
            ))
            .rule(FieldRule::required_when("repoUrl", Condition::equals("sourceProvider", "ExternalGit")))
            .rule(FieldRule::required_when("publishingUsername", password_set.clone()))
            .rule(FieldRule::optional("publishingPassword").check(Check::Pattern(PASSWORD_PATTERN.clone())))
            .rule(
                FieldRule::required_when("publishingConfirmPassword", password_set)
                    .check(Check::MatchesField("publishingPassword".into())),
            )
    }

    /// Source control and the publishing user go first. Runtime settings
    /// follow only once they succeeded: the source control API rewrites
    /// the site config object itself and the two writes must not race.
    fn to_update_requests(&self, state: &SiteResourceState, values: &CodeFormValues) -> Result<UpdatePlan> {
        let mut first = Vec::new();
        match values.source_provider {
            SourceProvider::GitHub | SourceProvider::ExternalGit => first.push(source_control_request(state, values)),
            SourceProvider::None | SourceProvider::LocalGit if state.source_control.is_some() => {
                first.push(ResourceUpdateRequest::delete(UpdateTarget::SourceControl, state.source_control_id()))
            }
            SourceProvider::None | SourceProvider::LocalGit => {}
        }
        if !values.publishing_password.is_empty() {
            first.push(ResourceUpdateRequest::put(
                UpdateTarget::PublishingUser,
                PUBLISHING_USER_ID,
                json!({ "properties": {
                    "publishingUserName": values.publishing_username,
                    "publishingPassword": values.publishing_password,
                } }),
            ));
        }

        let mut settings = Vec::new();
        if !values.runtime_stack.is_empty() && !values.runtime_version.is_empty() {
            let runtime = self
                .resolver
                .resolve_minor(state.kind, &values.runtime_stack, &values.runtime_version, state.os)?;
            let runtime_settings = self.resolver.build_runtime_settings_for(&runtime.platform, state.os);
            settings = runtime_requests(state, &runtime_settings);
        }
        if values.source_provider == SourceProvider::LocalGit {
            merge_site_config(&mut settings, state, SCM_TYPE, json!("LocalGit"));
        }

        Ok(UpdatePlan::new()
            .stage(UpdateStage::new("source control", first))
            .stage(UpdateStage::new("runtime settings", settings).after_previous()))
    }
}

pub(crate) fn github_repo_url(org: &str, repo: &str) -> String {
    format!("{}/{}/{}", GITHUB_URI, org, repo)
}

/// `(org, repo)` of a GitHub clone URL
pub(crate) fn parse_github_repo(url: &str) -> Option<(String, String)> {
    let path = url.strip_prefix(GITHUB_URI)?.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (org, repo) = path.split_once('/')?;
    (!org.is_empty() && !repo.is_empty() && !repo.contains('/')).then(|| (org.to_string(), repo.to_string()))
}

/// Source control PUT for the selected repository.
///
/// When the form still points at the loaded repository its stored URL and
/// integration flags are kept, so `.git` suffixes and manual integration
/// survive an untouched save.
fn source_control_request(state: &SiteResourceState, values: &CodeFormValues) -> ResourceUpdateRequest {
    let (repo_url, manual, mercurial) = match state.source_control.as_ref().filter(|sc| same_repository(sc, values)) {
        Some(loaded) => (loaded.repo_url.clone(), loaded.is_manual_integration, loaded.is_mercurial),
        None => match values.source_provider {
            SourceProvider::ExternalGit => (values.repo_url.clone(), true, false),
            _ => (github_repo_url(&values.org, &values.repo), false, false),
        },
    };
    let branch = if values.branch.is_empty() {
        DEFAULT_BRANCH
    } else {
        values.branch.as_str()
    };
    ResourceUpdateRequest::put(
        UpdateTarget::SourceControl,
        state.source_control_id(),
        json!({ "properties": {
            "repoUrl": repo_url,
            "branch": branch,
            "isManualIntegration": manual,
            "isGitHubAction": values.build_provider == BuildProvider::GitHubAction,
            "isMercurial": mercurial,
        } }),
    )
}

/// Whether `loaded` points at the GitHub repository `org/repo`
pub(crate) fn is_github_repository(loaded: &SourceControlInfo, org: &str, repo: &str) -> bool {
    parse_github_repo(&loaded.repo_url).is_some_and(|(o, r)| o == org && r == repo)
}

fn same_repository(loaded: &SourceControlInfo, values: &CodeFormValues) -> bool {
    match values.source_provider {
        SourceProvider::GitHub => is_github_repository(loaded, &values.org, &values.repo),
        SourceProvider::ExternalGit => loaded.repo_url == values.repo_url,
        SourceProvider::None | SourceProvider::LocalGit => false,
    }
}

/// Add a property to the stage's site config PATCH, creating it if needed
pub(crate) fn merge_site_config(requests: &mut Vec<ResourceUpdateRequest>, state: &SiteResourceState, key: &str, value: Value) {
    let existing = requests
        .iter_mut()
        .find(|r| r.target == UpdateTarget::SiteConfig)
        .and_then(|r| r.body.as_mut())
        .and_then(|body| body.get_mut("properties"))
        .and_then(Value::as_object_mut);
    match existing {
        Some(properties) => {
            properties.insert(key.to_string(), value);
        }
        None => requests.push(ResourceUpdateRequest::patch(
            UpdateTarget::SiteConfig,
            state.site_config_id(),
            json!({ "properties": { key: value } }),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_github_repo() {
        assert_eq!(
            parse_github_repo("https://github.com/contoso/web.git"),
            Some(("contoso".to_string(), "web".to_string()))
        );
        assert_eq!(parse_github_repo("https://github.com/contoso"), None);
        assert_eq!(parse_github_repo("https://dev.azure.com/contoso/web"), None);
    }

    #[test]
    fn test_same_repository_ignores_git_suffix() {
        let loaded = SourceControlInfo {
            repo_url: "https://github.com/contoso/web.git".into(),
            ..Default::default()
        };
        let mut values = CodeFormValues {
            source_provider: SourceProvider::GitHub,
            org: "contoso".into(),
            repo: "web".into(),
            ..Default::default()
        };
        assert!(same_repository(&loaded, &values));

        values.repo = "api".into();
        assert!(!same_repository(&loaded, &values));
    }

    #[test]
    fn test_github_repo_url_round_trips() {
        let url = github_repo_url("contoso", "web");
        assert_eq!(parse_github_repo(&url), Some(("contoso".into(), "web".into())));
    }
}
