//! Deployment center code form
//!
//! Tests cover:
//! - Conditional requirements driven by the build and source providers
//! - Agreement between `validate` and the exported JSON Schema
//! - Loading and saving a GitHub Action deployment
//! - Stage ordering of source control and runtime settings

mod common;

use appsvc_core::types::FieldErrorKind;
use appsvc_core::{AppKind, Os};
use appsvc_gateway::SourceControlInfo;
use appsvc_forms::{
    BuildProvider, CodeFormBuilder, CodeFormValues, FormBuilder, SourceProvider, StageGate, UpdateMethod,
    UpdateTarget,
};
use common::*;
use serde_json::{json, Value};
use test_case::test_case;

fn builder() -> CodeFormBuilder {
    CodeFormBuilder::new(resolver())
}

fn error_fields(values: &Value) -> Vec<String> {
    builder()
        .generate_validation_schema()
        .validate(values)
        .into_iter()
        .map(|e| e.field)
        .collect()
}

#[test]
fn test_runtime_optional_for_github_action() {
    let values = json!({
        "sourceProvider": "GitHub",
        "buildProvider": "GitHubAction",
        "runtimeStack": "",
        "runtimeVersion": "",
        "org": "contoso",
        "repo": "web",
        "branch": "main",
    });
    assert!(error_fields(&values).is_empty());
}

#[test]
fn test_runtime_required_for_build_service() {
    let values = json!({
        "sourceProvider": "GitHub",
        "buildProvider": "AppServiceBuildService",
        "runtimeStack": "",
        "runtimeVersion": "",
        "org": "contoso",
        "repo": "web",
        "branch": "main",
    });
    assert_eq!(error_fields(&values), vec!["runtimeStack", "runtimeVersion"]);
}

#[test]
fn test_external_git_needs_repo_url_and_branch() {
    let values = json!({
        "sourceProvider": "ExternalGit",
        "buildProvider": "AppServiceBuildService",
        "runtimeStack": "node",
        "runtimeVersion": "12-lts",
    });
    assert_eq!(error_fields(&values), vec!["branch", "repoUrl"]);
}

#[test]
fn test_publishing_user_only_required_with_password() {
    let base = json!({
        "sourceProvider": "LocalGit",
        "buildProvider": "AppServiceBuildService",
        "runtimeStack": "node",
        "runtimeVersion": "12-lts",
    });
    assert!(error_fields(&base).is_empty());

    let mut with_password = base.clone();
    with_password["publishingPassword"] = json!("hunter2hunter2");
    with_password["publishingConfirmPassword"] = json!("hunter2hunter3");
    let errors = builder().generate_validation_schema().validate(&with_password);
    let summary: Vec<_> = errors.iter().map(|e| (e.field.as_str(), e.kind)).collect();
    assert_eq!(
        summary,
        vec![
            ("publishingUsername", FieldErrorKind::Required),
            ("publishingConfirmPassword", FieldErrorKind::Mismatch),
        ]
    );
}

#[test_case("contoso", true ; "plain org")]
#[test_case("contoso-labs", true ; "hyphenated org")]
#[test_case("-contoso", false ; "leading hyphen")]
#[test_case("con toso", false ; "space")]
fn test_org_pattern(org: &str, valid: bool) {
    let values = json!({
        "sourceProvider": "GitHub",
        "buildProvider": "GitHubAction",
        "org": org,
        "repo": "web",
        "branch": "main",
    });
    assert_eq!(error_fields(&values).is_empty(), valid);
}

#[test_case(json!({ "sourceProvider": "GitHub", "buildProvider": "GitHubAction", "org": "contoso", "repo": "web", "branch": "main" }) ; "github action")]
#[test_case(json!({ "sourceProvider": "GitHub", "buildProvider": "AppServiceBuildService", "org": "contoso", "repo": "web", "branch": "main" }) ; "missing runtime")]
#[test_case(json!({ "sourceProvider": "ExternalGit", "buildProvider": "AppServiceBuildService", "runtimeStack": "node", "runtimeVersion": "12-lts" }) ; "external git without url")]
#[test_case(json!({ "sourceProvider": "LocalGit", "buildProvider": "AppServiceBuildService", "runtimeStack": "node", "runtimeVersion": "12-lts", "publishingPassword": "short" }) ; "short password")]
#[test_case(json!({ "sourceProvider": "GitHub", "buildProvider": "GitHubAction", "org": "-bad", "repo": "web", "branch": "main" }) ; "bad org")]
#[test_case(json!({ "buildProvider": null }) ; "nearly empty")]
fn test_json_schema_agrees_with_validate(values: Value) {
    let schema = builder().generate_validation_schema();
    let validator = jsonschema::validator_for(&schema.to_json_schema()).unwrap();
    assert_eq!(validator.is_valid(&values), schema.validate(&values).is_empty());
}

#[test]
fn test_github_action_site_round_trip_is_noop() {
    let state = github_action_web_app();
    let builder = builder();

    let values = builder.generate_form_data(&state).unwrap();
    assert_eq!(values.source_provider, SourceProvider::GitHub);
    assert_eq!(values.build_provider, BuildProvider::GitHubAction);
    assert_eq!((values.org.as_str(), values.repo.as_str()), ("contoso", "web"));
    assert_eq!(values.branch, "main");
    assert_eq!(values.runtime_stack, "node");
    assert_eq!(values.runtime_version, "12-lts");

    let plan = builder.to_update_requests(&state, &values).unwrap();
    assert!(plan.is_noop_against(&state));
}

#[test]
fn test_runtime_settings_wait_for_source_control() {
    let state = site(AppKind::WebApp, Os::Linux);
    let values = CodeFormValues {
        source_provider: SourceProvider::GitHub,
        build_provider: BuildProvider::AppServiceBuildService,
        runtime_stack: "node".into(),
        runtime_version: "12-lts".into(),
        org: "contoso".into(),
        repo: "web".into(),
        ..Default::default()
    };

    let plan = builder().to_update_requests(&state, &values).unwrap();
    let stages = plan.stages();
    assert_eq!(stages.len(), 2);
    assert_eq!(stages[0].requests[0].target, UpdateTarget::SourceControl);
    assert_eq!(stages[1].gate, StageGate::PreviousSucceeded);
    assert_eq!(stages[1].requests[0].target, UpdateTarget::SiteConfig);

    let source_control = plan.request_for(UpdateTarget::SourceControl).unwrap();
    let properties = source_control.properties().unwrap();
    assert_eq!(properties["repoUrl"], "https://github.com/contoso/web");
    assert_eq!(properties["branch"], "master");
    assert_eq!(properties["isManualIntegration"], false);
}

#[test]
fn test_switching_to_local_git_removes_source_control() {
    let state = github_action_web_app();
    let mut values = builder().generate_form_data(&state).unwrap();
    values.source_provider = SourceProvider::LocalGit;
    values.build_provider = BuildProvider::AppServiceBuildService;
    values.publishing_username = "deployer".into();
    values.publishing_password = "hunter2hunter2".into();
    values.publishing_confirm_password = "hunter2hunter2".into();

    let plan = builder().to_update_requests(&state, &values).unwrap();
    let delete = plan.request_for(UpdateTarget::SourceControl).unwrap();
    assert_eq!(delete.method, UpdateMethod::Delete);
    assert!(plan.request_for(UpdateTarget::PublishingUser).is_some());

    let site_config = plan.request_for(UpdateTarget::SiteConfig).unwrap();
    assert_eq!(site_config.properties().unwrap()["scmType"], "LocalGit");
    assert_eq!(site_config.diff_against(&state), vec!["scmType".to_string()]);
}

#[test]
fn test_git_suffixed_repo_url_round_trip_is_noop() {
    let mut state = github_action_web_app();
    if let Some(source_control) = state.source_control.as_mut() {
        source_control.repo_url = "https://github.com/contoso/web.git".into();
    }
    let builder = builder();

    let values = builder.generate_form_data(&state).unwrap();
    assert_eq!((values.org.as_str(), values.repo.as_str()), ("contoso", "web"));

    let plan = builder.to_update_requests(&state, &values).unwrap();
    assert!(plan.is_noop_against(&state));
}

#[test]
fn test_external_git_keeps_integration_flags() {
    let mut state = github_action_web_app();
    state.source_control = Some(SourceControlInfo {
        repo_url: "https://dev.azure.com/contoso/_git/web".into(),
        branch: "main".into(),
        is_manual_integration: false,
        is_github_action: false,
        is_mercurial: false,
    });
    let builder = builder();

    let values = builder.generate_form_data(&state).unwrap();
    assert_eq!(values.source_provider, SourceProvider::ExternalGit);

    let plan = builder.to_update_requests(&state, &values).unwrap();
    let source_control = plan.request_for(UpdateTarget::SourceControl).unwrap();
    assert_eq!(source_control.properties().unwrap()["isManualIntegration"], false);
    assert!(plan.is_noop_against(&state));
}

#[test]
fn test_changed_repository_gets_a_fresh_url() {
    let mut state = github_action_web_app();
    if let Some(source_control) = state.source_control.as_mut() {
        source_control.repo_url = "https://github.com/contoso/web.git".into();
    }
    let builder = builder();
    let mut values = builder.generate_form_data(&state).unwrap();
    values.repo = "api".into();

    let plan = builder.to_update_requests(&state, &values).unwrap();
    let source_control = plan.request_for(UpdateTarget::SourceControl).unwrap();
    assert_eq!(source_control.properties().unwrap()["repoUrl"], "https://github.com/contoso/api");
    assert_eq!(source_control.diff_against(&state), vec!["repoUrl".to_string()]);
}

#[test]
fn test_unrecognised_runtime_is_left_blank() {
    let mut state = github_action_web_app();
    state.site_config.insert("linuxFxVersion".into(), json!("NODE|6.9"));
    let builder = builder();

    let values = builder.generate_form_data(&state).unwrap();
    assert!(values.runtime_stack.is_empty());
    assert!(values.runtime_version.is_empty());

    let plan = builder.to_update_requests(&state, &values).unwrap();
    assert!(plan.request_for(UpdateTarget::SiteConfig).is_none());
    assert!(plan.is_noop_against(&state));
}
