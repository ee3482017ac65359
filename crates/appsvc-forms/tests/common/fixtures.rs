//! Site state fixtures

#![allow(dead_code)]

use appsvc_core::{AppKind, Os};
use appsvc_gateway::{PublishingCredentials, SiteResourceState, SourceControlInfo};
use appsvc_stacks::{CatalogRegistry, StackResolver};
use serde_json::{json, Value};

pub const SITE_ID: &str = "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Web/sites/contoso-web";
pub const ACR_ID: &str =
    "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.ContainerRegistry/registries/contoso";

pub fn resolver() -> StackResolver {
    let registry = CatalogRegistry::embedded().expect("bundled catalog loads");
    StackResolver::new(registry.catalog("2020-06-01").expect("revision exists"))
}

pub fn site(kind: AppKind, os: Os) -> SiteResourceState {
    SiteResourceState::new(SITE_ID, kind, os)
}

pub fn with_app_settings(mut state: SiteResourceState, settings: &[(&str, &str)]) -> SiteResourceState {
    for (key, value) in settings {
        state.app_settings.insert(key.to_string(), value.to_string());
    }
    state
}

pub fn with_site_config(mut state: SiteResourceState, config: &[(&str, Value)]) -> SiteResourceState {
    for (key, value) in config {
        state.site_config.insert(key.to_string(), value.clone());
    }
    state
}

/// Windows function app running Node 12
pub fn node12_function_app() -> SiteResourceState {
    with_app_settings(
        site(AppKind::FunctionApp, Os::Windows),
        &[
            ("AzureWebJobsStorage", "DefaultEndpointsProtocol=https;AccountName=contoso;AccountKey=abc=="),
            ("FUNCTIONS_WORKER_RUNTIME", "node"),
            ("WEBSITE_NODE_DEFAULT_VERSION", "~12"),
        ],
    )
}

/// Linux web app running Node 12 LTS, deployed by a GitHub workflow
pub fn github_action_web_app() -> SiteResourceState {
    let mut state = with_site_config(
        site(AppKind::WebApp, Os::Linux),
        &[("linuxFxVersion", json!("NODE|12-lts")), ("alwaysOn", json!(true))],
    );
    state.source_control = Some(SourceControlInfo {
        repo_url: "https://github.com/contoso/web".into(),
        branch: "main".into(),
        is_manual_integration: false,
        is_github_action: true,
        is_mercurial: false,
    });
    state
}

/// Linux web app pulling `web:v1` from an Azure Container Registry
pub fn acr_container_app() -> SiteResourceState {
    let mut state = with_app_settings(
        with_site_config(
            site(AppKind::WebApp, Os::Linux),
            &[("linuxFxVersion", json!("DOCKER|contoso.azurecr.io/web:v1"))],
        ),
        &[
            ("DOCKER_REGISTRY_SERVER_URL", "https://contoso.azurecr.io"),
            ("DOCKER_REGISTRY_SERVER_USERNAME", "contoso"),
            ("DOCKER_REGISTRY_SERVER_PASSWORD", "secret"),
            ("DOCKER_ENABLE_CI", "true"),
            ("WEBSITES_ENABLE_APP_SERVICE_STORAGE", "false"),
        ],
    );
    state.publishing_credentials = Some(PublishingCredentials {
        username: "$contoso-web".into(),
        password: "pw".into(),
        scm_uri: Some("https://$contoso-web:pw@contoso-web.scm.azurewebsites.net".into()),
    });
    state
}
