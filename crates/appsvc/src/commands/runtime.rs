//! Site runtime commands

use anyhow::{Context, Result};
use appsvc_forms::{
    EditingSession, FormBuilder, StackSettingsFormBuilder, StackSettingsValues, UpdateExecutor,
    UpdatePlan,
};
use appsvc_core::AppSvcConfig;
use appsvc_gateway::{ResourceGateway, SiteResourceState};
use camino::Utf8Path;
use serde_json::json;
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

use super::{arm_gateway, load_config, load_resolver};
use crate::cli::{RuntimeCommands, RuntimeSetArgs, RuntimeShowArgs};
use crate::output;

pub async fn run(command: RuntimeCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    match command {
        RuntimeCommands::Show(args) => show(args, config_path).await,
        RuntimeCommands::Set(args) => set(args, config_path).await,
    }
}

#[derive(Tabled)]
struct PlanRow {
    stage: String,
    method: String,
    target: String,
    changes: String,
}

fn plan_rows(plan: &UpdatePlan, state: &SiteResourceState) -> Vec<PlanRow> {
    plan.stages()
        .iter()
        .flat_map(|stage| {
            stage.requests.iter().map(move |request| {
                let changed = request.diff_against(state);
                PlanRow {
                    stage: stage.name.clone(),
                    method: request.method.to_string(),
                    target: request.target.to_string(),
                    changes: if changed.is_empty() {
                        "-".to_string()
                    } else {
                        changed.join(", ")
                    },
                }
            })
        })
        .collect()
}

async fn load_site(
    resource_id: &str,
    config: &AppSvcConfig,
) -> Result<(Arc<dyn ResourceGateway>, SiteResourceState)> {
    let gateway = arm_gateway(config)?;
    let spinner = output::spinner("Loading site configuration...");
    let state = SiteResourceState::load(gateway.as_ref(), resource_id).await;
    spinner.finish_and_clear();
    let state = state.with_context(|| format!("Failed to load {}", resource_id))?;
    Ok((gateway, state))
}

async fn show(args: RuntimeShowArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let resolver = load_resolver(&config, args.api_version.as_deref(), None).await?;
    let (_, state) = load_site(&args.resource_id, &config).await?;

    let builder = StackSettingsFormBuilder::new(resolver);
    let detected = builder
        .resolver()
        .detect_current(state.kind, state.os, &state.app_settings, &state.site_config);
    let suggested = match &detected {
        Some(_) => None,
        None => builder.suggested_runtime(&state)?,
    };

    if args.json {
        return output::json(&json!({
            "resourceId": state.resource_id,
            "kind": state.kind,
            "os": state.os,
            "detected": detected.is_some(),
            "values": builder.generate_form_data(&state)?,
            "suggested": suggested.map(StackSettingsValues::from),
        }));
    }

    output::header(&format!("{} ({} on {})", state.name(), state.kind, state.os));
    match (detected, suggested) {
        (Some(current), _) => {
            output::kv("Stack", &current.stack);
            output::kv("Major version", &current.major);
            output::kv("Minor version", &current.minor);
            output::kv("Runtime version", &current.platform.runtime_version);
        }
        (None, Some(suggested)) => {
            output::warning("Runtime not recognised by the stack catalog");
            output::kv(
                "Suggested",
                &format!("{} {} {}", suggested.stack, suggested.major, suggested.minor),
            );
        }
        (None, None) => output::warning("Runtime not recognised by the stack catalog"),
    }
    Ok(())
}

async fn set(args: RuntimeSetArgs, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let resolver = load_resolver(&config, args.api_version.as_deref(), None).await?;
    let (gateway, state) = load_site(&args.resource_id, &config).await?;

    let mut session = EditingSession::new(StackSettingsFormBuilder::new(resolver));
    session.load(state.clone())?;
    let current = session.values()?.clone();
    if current.stack.is_empty() {
        output::info("Current runtime: not recognised by the stack catalog");
    } else {
        output::info(&format!(
            "Current runtime: {} {} {}",
            current.stack, current.major_version, current.minor_version
        ));
    }

    session.edit(|values| {
        values.stack = args.stack.clone();
        values.major_version = args.major.clone();
        values.minor_version = args.minor.clone();
    })?;

    let plan = session.plan()?;
    if plan.is_noop_against(&state) {
        output::success(&format!(
            "{} already runs {} {}",
            state.name(),
            args.stack,
            args.minor
        ));
        return Ok(());
    }

    output::header("Update plan");
    let mut table = Table::new(plan_rows(&plan, &state));
    table.with(Style::rounded());
    println!("{}", table);

    if args.dry_run {
        output::success("Dry run complete, nothing was changed");
        return Ok(());
    }

    let executor = UpdateExecutor::new(gateway);
    let spinner = output::spinner("Applying runtime settings...");
    let result = session.submit(&executor).await;
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            output::success(&format!(
                "Runtime of {} set to {} {} ({} requests)",
                state.name(),
                args.stack,
                args.minor,
                outcome.succeeded()
            ));
            Ok(())
        }
        Err(e) => {
            for failure in e.request_failures() {
                output::error(&failure.to_string());
            }
            for skipped in e.skipped_requests() {
                output::warning(&skipped.to_string());
            }
            Err(e).context("Runtime update failed")
        }
    }
}
