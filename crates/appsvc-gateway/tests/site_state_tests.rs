//! Loading live site state through the gateway

mod common;

use appsvc_core::{AppKind, Error, Os};
use appsvc_gateway::SiteResourceState;
use common::*;
use serde_json::json;

fn mock_site(gateway: &MockGateway, kind: &str) {
    gateway.mock_ok(
        "GET",
        SITE_ID,
        json!({ "id": SITE_ID, "kind": kind, "location": "West Europe", "properties": {} }),
    );
    gateway.mock_ok(
        "POST",
        &format!("{}/config/appsettings/list", SITE_ID),
        json!({ "properties": { "FUNCTIONS_WORKER_RUNTIME": "node", "WEBSITE_NODE_DEFAULT_VERSION": "~12" } }),
    );
    gateway.mock_ok(
        "GET",
        &format!("{}/config/web", SITE_ID),
        json!({ "properties": { "linuxFxVersion": "", "alwaysOn": true } }),
    );
}

#[tokio::test]
async fn test_load_site_state() {
    let gateway = MockGateway::new();
    mock_site(&gateway, "functionapp");
    gateway.mock_ok(
        "POST",
        &format!("{}/config/publishingcredentials/list", SITE_ID),
        json!({ "properties": { "publishingUserName": "$contoso", "publishingPassword": "pw" } }),
    );

    let state = SiteResourceState::load(&gateway, SITE_ID).await.unwrap();

    assert_eq!(state.kind, AppKind::FunctionApp);
    assert_eq!(state.os, Os::Windows);
    assert_eq!(state.location.as_deref(), Some("West Europe"));
    assert_eq!(state.app_settings["WEBSITE_NODE_DEFAULT_VERSION"], "~12");
    assert_eq!(state.site_config["alwaysOn"], json!(true));
    assert_eq!(state.publishing_credentials.unwrap().username, "$contoso");
    // sourcecontrols/web is unmocked and answers 404
    assert!(state.source_control.is_none());
    assert_eq!(gateway.invocations().len(), 5);
}

#[tokio::test]
async fn test_load_linux_site_with_source_control() {
    let gateway = MockGateway::new();
    mock_site(&gateway, "app,linux");
    gateway.mock_ok(
        "GET",
        &format!("{}/sourcecontrols/web", SITE_ID),
        json!({ "properties": { "repoUrl": "https://github.com/contoso/site", "branch": "main", "isGitHubAction": true } }),
    );

    let state = SiteResourceState::load(&gateway, SITE_ID).await.unwrap();
    assert_eq!(state.kind, AppKind::WebApp);
    assert_eq!(state.os, Os::Linux);
    let source_control = state.source_control.unwrap();
    assert!(source_control.is_github_action);
    assert_eq!(source_control.branch, "main");
    assert!(state.publishing_credentials.is_none());
}

#[tokio::test]
async fn test_required_read_failure_is_upstream_error() {
    let gateway = MockGateway::new();
    mock_site(&gateway, "app");
    gateway.mock_failure("GET", &format!("{}/config/web", SITE_ID), 403, "Forbidden");

    let err = SiteResourceState::load(&gateway, SITE_ID).await.unwrap_err();
    match err {
        Error::UpstreamRequestFailed { target, message } => {
            assert_eq!(target, "siteconfig");
            assert!(message.contains("Forbidden"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
