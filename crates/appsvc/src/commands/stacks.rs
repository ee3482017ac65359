//! Stack catalog commands

use anyhow::{Context, Result};
use appsvc_core::Os;
use appsvc_stacks::{CatalogRegistry, PlatformSettings, StackDefinition};
use camino::Utf8Path;
use chrono::NaiveDate;
use owo_colors::OwoColorize;
use serde_json::json;
use tabled::{settings::Style, Table, Tabled};

use super::{load_config, load_resolver};
use crate::cli::{
    StacksCommands, StacksDefaultArgs, StacksListArgs, StacksResolveArgs, StacksValidateArgs,
};
use crate::output;

pub async fn run(command: StacksCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match command {
        StacksCommands::List(args) => list(args, config_path).await,
        StacksCommands::Resolve(args) => resolve(args, config_path).await,
        StacksCommands::Default(args) => default(args, config_path).await,
        StacksCommands::Validate(args) => validate(args),
    }
}

#[derive(Tabled)]
struct VersionRow {
    stack: String,
    major: String,
    minor: String,
    #[tabled(rename = "runtime version")]
    runtime_version: String,
    flags: String,
    #[tabled(rename = "end of life")]
    end_of_life: String,
}

fn flags(platform: &PlatformSettings, today: NaiveDate) -> String {
    let mut flags = Vec::new();
    if platform.is_default {
        flags.push("default");
    }
    if platform.is_preview {
        flags.push("preview");
    }
    if platform.is_deprecated {
        flags.push("deprecated");
    }
    if platform.is_hidden {
        flags.push("hidden");
    }
    if platform.is_end_of_life(today) {
        flags.push("eol");
    }
    flags.join(", ")
}

/// One row per minor version, in listing order
fn version_rows(stacks: &[StackDefinition], os: Os, today: NaiveDate) -> Vec<VersionRow> {
    stacks
        .iter()
        .flat_map(|stack| {
            stack.minors().filter_map(move |(major, minor)| {
                minor.platforms.get(os).map(|platform| VersionRow {
                    stack: stack.value.clone(),
                    major: major.value.clone(),
                    minor: minor.value.clone(),
                    runtime_version: platform.runtime_version.clone(),
                    flags: flags(platform, today),
                    end_of_life: platform
                        .end_of_life_date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                })
            })
        })
        .collect()
}

async fn list(args: StacksListArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let catalog = &args.catalog;
    let resolver = load_resolver(
        &config,
        catalog.api_version.as_deref(),
        catalog.remote.then_some(catalog.kind),
    )
    .await?;

    let stacks = resolver.list_stacks(catalog.kind, catalog.os, args.include_hidden);
    if args.json {
        return output::json(&stacks);
    }

    if stacks.is_empty() {
        output::warning(&format!("No {} stacks available on {}", catalog.kind, catalog.os));
        return Ok(());
    }

    output::header(&format!(
        "{} stacks on {} ({})",
        catalog.kind,
        catalog.os,
        resolver.catalog().api_version()
    ));
    let today = chrono::Local::now().date_naive();
    let mut table = Table::new(version_rows(&stacks, catalog.os, today));
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}

async fn resolve(args: StacksResolveArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let catalog = &args.catalog;
    let resolver = load_resolver(
        &config,
        catalog.api_version.as_deref(),
        catalog.remote.then_some(catalog.kind),
    )
    .await?;

    let platform = resolver.resolve_platform(
        catalog.kind,
        &args.stack,
        &args.major,
        &args.minor,
        catalog.os,
    )?;
    let settings = resolver.build_runtime_settings_for(platform, catalog.os);

    if args.json {
        return output::json(&json!({ "platform": platform, "settings": settings }));
    }

    output::header(&format!("{} {} on {}", args.stack, args.minor, catalog.os));
    output::kv("Runtime version", &platform.runtime_version);
    let today = chrono::Local::now().date_naive();
    let flag_list = flags(platform, today);
    if !flag_list.is_empty() {
        output::kv("Flags", &flag_list);
    }
    if let Some(eol) = platform.end_of_life_date {
        let date = eol.to_string();
        if platform.is_end_of_life(today) {
            output::kv("End of life", &date.red().to_string());
        } else {
            output::kv("End of life", &date);
        }
    }
    output::kv(
        "GitHub Actions",
        platform
            .git_hub_action_settings
            .supported_version
            .as_deref()
            .unwrap_or(if platform.git_hub_action_settings.is_supported {
                "supported"
            } else {
                "not supported"
            }),
    );

    if !settings.app_settings.is_empty() {
        output::header("App settings");
        for (key, value) in &settings.app_settings {
            output::kv(key, value);
        }
    }
    if !settings.site_config.is_empty() {
        output::header("Site config");
        for (key, value) in &settings.site_config {
            output::kv(key, &value.to_string());
        }
    }
    Ok(())
}

async fn default(args: StacksDefaultArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let catalog = &args.catalog;
    let resolver = load_resolver(
        &config,
        catalog.api_version.as_deref(),
        catalog.remote.then_some(catalog.kind),
    )
    .await?;

    let resolved = resolver.default_version(catalog.kind, &args.stack, catalog.os)?;
    if args.json {
        return output::json(&json!({
            "stack": resolved.stack,
            "majorVersion": resolved.major,
            "minorVersion": resolved.minor,
            "os": resolved.os,
            "runtimeVersion": resolved.platform.runtime_version,
        }));
    }

    output::success(&format!(
        "{} {} ({}) is the default on {}",
        resolved.stack,
        resolved.minor,
        resolved.platform.runtime_version,
        resolved.os
    ));
    Ok(())
}

fn validate(args: StacksValidateArgs) -> Result<()> {
    let registry = match &args.dir {
        Some(dir) => {
            output::info(&format!("Validating stack catalog in {}", dir));
            CatalogRegistry::from_directory(dir.as_std_path())
                .with_context(|| format!("Stack catalog in {} is invalid", dir))?
        }
        None => {
            output::info("Validating bundled stack catalog");
            CatalogRegistry::embedded().context("Bundled stack catalog is invalid")?
        }
    };

    for api_version in registry.api_versions() {
        let catalog = registry.catalog(api_version)?;
        output::kv(api_version, &format!("{} stacks", catalog.len()));
    }
    output::success("Stack catalog is valid");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use appsvc_core::AppKind;
    use appsvc_stacks::StackResolver;

    fn resolver() -> StackResolver {
        let registry = CatalogRegistry::embedded().unwrap();
        StackResolver::new(registry.catalog("2020-06-01").unwrap())
    }

    #[test]
    fn test_version_rows_follow_listing() {
        let resolver = resolver();
        let stacks = resolver.list_stacks(AppKind::WebApp, Os::Linux, false);
        let today = NaiveDate::from_ymd_opt(2020, 7, 1).unwrap();
        let rows = version_rows(&stacks, Os::Linux, today);

        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| !r.flags.contains("hidden")));
        let node = rows
            .iter()
            .find(|r| r.stack == "node" && r.minor == "12-lts")
            .unwrap();
        assert_eq!(node.runtime_version, "NODE|12-lts");
        assert_eq!(node.end_of_life, "2022-05-01");
    }

    #[test]
    fn test_flags_mark_end_of_life() {
        let platform = PlatformSettings {
            is_default: true,
            end_of_life_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert_eq!(flags(&platform, today), "default, eol");
    }
}
