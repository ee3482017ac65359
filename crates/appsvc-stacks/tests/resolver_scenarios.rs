//! Resolver scenarios against the bundled catalog
//!
//! Tests cover:
//! - Concrete resolutions for well-known stacks
//! - Legacy (2020-05-01) revisions resolving through the same model
//! - Default selection and reverse detection

mod common;

use appsvc_core::{AppKind, Error, Os};
use chrono::NaiveDate;
use common::*;
use serde_json::{json, Map};
use std::collections::BTreeMap;
use test_case::test_case;

#[test]
fn test_dotnet_core_31_on_linux() {
    let resolver = resolver(CURRENT_API_VERSION);
    let platform = resolver
        .resolve_platform(AppKind::WebApp, "dotnetCore", "3", "3.1", Os::Linux)
        .unwrap();

    assert_eq!(platform.runtime_version, "DOTNETCORE|3.1");
    assert!(!platform.app_insights_settings.is_supported);
    assert_eq!(
        platform.git_hub_action_settings.supported_version.as_deref(),
        Some("3.1.102")
    );
}

#[test]
fn test_node_12_lts_function_app_on_windows() {
    let resolver = resolver(CURRENT_API_VERSION);
    let platform = resolver
        .resolve_platform(AppKind::FunctionApp, "node", "12", "12 LTS", Os::Windows)
        .unwrap();
    let settings = resolver.build_runtime_settings(platform);

    assert_eq!(settings.app_settings["FUNCTIONS_WORKER_RUNTIME"], "node");
    assert_eq!(settings.app_settings["WEBSITE_NODE_DEFAULT_VERSION"], "~12");
    assert_eq!(settings.runtime_version, "~12");
    assert!(settings.site_config.is_empty());
}

#[test]
fn test_node_12_lts_function_app_on_linux() {
    let resolver = resolver(CURRENT_API_VERSION);
    let platform = resolver
        .resolve_platform(AppKind::FunctionApp, "node", "12", "12 LTS", Os::Linux)
        .unwrap();
    let settings = resolver.build_runtime_settings_for(platform, Os::Linux);

    assert_eq!(settings.site_config["linuxFxVersion"], json!("Node|12"));
    assert_eq!(settings.site_config["Use32BitWorkerProcess"], json!(false));
    assert_eq!(
        platform.end_of_life_date,
        NaiveDate::from_ymd_opt(2022, 5, 1)
    );
}

#[test]
fn test_dotnet_core_21_projected_eol() {
    let resolver = resolver(CURRENT_API_VERSION);
    let platform = resolver
        .resolve_platform(AppKind::WebApp, "dotnetCore", "DotnetCore2", "2.1", Os::Windows)
        .unwrap();
    assert_eq!(
        platform.projected_end_of_life_date,
        NaiveDate::from_ymd_opt(2021, 8, 21)
    );
}

#[test]
fn test_legacy_powershell_resolves() {
    let resolver = resolver(LEGACY_API_VERSION);
    let platform = resolver
        .resolve_platform(AppKind::FunctionApp, "powershell", "7", "7", Os::Windows)
        .unwrap();
    assert_eq!(platform.runtime_version, "~7");
    assert!(platform.app_insights_settings.is_supported);

    let settings = resolver.build_runtime_settings(platform);
    assert_eq!(settings.app_settings["FUNCTIONS_WORKER_RUNTIME"], "powershell");
    assert_eq!(settings.site_config["PowerShellVersion"], json!("~7"));

    let err = resolver
        .resolve_platform(AppKind::FunctionApp, "powershell", "7", "7", Os::Linux)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedOnOs { .. }));
}

#[test]
fn test_legacy_default_is_highest_version() {
    let resolver = resolver(LEGACY_API_VERSION);
    let resolved = resolver
        .default_version(AppKind::FunctionApp, "powershell", Os::Windows)
        .unwrap();
    assert_eq!(resolved.major, "7");
}

#[test_case(AppKind::WebApp, "dotnetCore", Os::Linux, "3.1" ; "dotnet core linux")]
#[test_case(AppKind::WebApp, "node", Os::Linux, "12-lts" ; "node skips hidden lts alias")]
#[test_case(AppKind::WebApp, "php", Os::Windows, "7.3" ; "php windows")]
#[test_case(AppKind::FunctionApp, "node", Os::Windows, "12 LTS" ; "functions node")]
#[test_case(AppKind::FunctionApp, "python", Os::Linux, "3.8" ; "functions python")]
#[test_case(AppKind::FunctionApp, "powershell", Os::Windows, "7.0" ; "functions powershell")]
fn test_default_version(kind: AppKind, stack: &str, os: Os, expected_minor: &str) {
    let resolver = resolver(CURRENT_API_VERSION);
    let resolved = resolver.default_version(kind, stack, os).unwrap();
    assert_eq!(resolved.minor, expected_minor);
    assert!(!resolved.platform.is_deprecated);
    assert!(!resolved.platform.is_hidden);
}

#[test]
fn test_python_function_app_unsupported_on_windows() {
    let resolver = resolver(CURRENT_API_VERSION);
    let err = resolver
        .default_version(AppKind::FunctionApp, "python", Os::Windows)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedOnOs { .. }));
}

#[test]
fn test_resolve_minor_across_majors() {
    let resolver = resolver(CURRENT_API_VERSION);
    let resolved = resolver
        .resolve_minor(AppKind::WebApp, "dotnetCore", "2.1", Os::Linux)
        .unwrap();
    assert_eq!(resolved.major, "DotnetCore2");
    assert_eq!(resolved.platform.runtime_version, "DOTNETCORE|2.1");
}

#[test]
fn test_list_stacks_sorted_and_pruned() {
    let resolver = resolver(CURRENT_API_VERSION);
    let stacks = resolver.list_stacks(AppKind::WebApp, Os::Windows, false);
    let values: Vec<&str> = stacks.iter().map(|s| s.value.as_str()).collect();
    assert_eq!(values, vec!["node", "python", "dotnetCore", "php", "java"]);

    let node = &stacks[0];
    assert!(node.major_versions.iter().all(|m| m.value != "LTS"));
    assert!(node
        .minors()
        .all(|(_, minor)| minor.platforms.linux.is_none()));
}

#[test]
fn test_detect_current_function_app_windows() {
    let resolver = resolver(CURRENT_API_VERSION);
    let app_settings = BTreeMap::from([
        ("FUNCTIONS_WORKER_RUNTIME".to_string(), "node".to_string()),
        ("WEBSITE_NODE_DEFAULT_VERSION".to_string(), "~10".to_string()),
        ("AzureWebJobsStorage".to_string(), "DefaultEndpointsProtocol=https".to_string()),
    ]);
    let detected = resolver
        .detect_current(AppKind::FunctionApp, Os::Windows, &app_settings, &Map::new())
        .unwrap();
    assert_eq!(detected.stack, "node");
    assert_eq!(detected.minor, "10 LTS");
}

#[test]
fn test_detect_current_web_app_linux() {
    let resolver = resolver(CURRENT_API_VERSION);
    let mut site_config = Map::new();
    site_config.insert("linuxFxVersion".into(), json!("dotnetcore|3.1"));
    let detected = resolver
        .detect_current(AppKind::WebApp, Os::Linux, &BTreeMap::new(), &site_config)
        .unwrap();
    assert_eq!((detected.stack.as_str(), detected.major.as_str()), ("dotnetCore", "3"));
}
