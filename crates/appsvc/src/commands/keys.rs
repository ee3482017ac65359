//! Function key commands

use anyhow::{Context, Result};
use appsvc_gateway::{FunctionKey, FunctionKeys};
use camino::Utf8Path;
use dialoguer::Confirm;
use tabled::{settings::Style, Table, Tabled};

use super::{arm_gateway, load_config};
use crate::cli::{KeysCommands, KeysCreateArgs, KeysDeleteArgs, KeysHostArgs, KeysListArgs};
use crate::output;

pub async fn run(command: KeysCommands, config_path: Option<&Utf8Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let keys = FunctionKeys::new(arm_gateway(&config)?);

    match command {
        KeysCommands::List(args) => list(&keys, args).await,
        KeysCommands::Create(args) => create(&keys, args).await,
        KeysCommands::Delete(args) => delete(&keys, args).await,
        KeysCommands::Host(args) => host(&keys, args).await,
    }
}

#[derive(Tabled)]
struct KeyRow {
    name: String,
    value: String,
}

/// Keep the first four characters of a key
fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    format!("{}{}", visible, "*".repeat(value.chars().count().saturating_sub(4).min(12)))
}

fn key_table(keys: &[FunctionKey], show_values: bool) -> Table {
    let rows = keys.iter().map(|k| KeyRow {
        name: k.name.clone(),
        value: if show_values {
            k.value.clone()
        } else {
            mask(&k.value)
        },
    });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table
}

async fn list(keys: &FunctionKeys, args: KeysListArgs) -> Result<()> {
    let found = keys
        .list_function_keys(&args.resource_id, &args.function)
        .await
        .with_context(|| format!("Failed to list keys of {}", args.function))?;

    if args.json {
        return output::json(&found);
    }
    if found.is_empty() {
        output::info(&format!("{} has no keys", args.function));
        return Ok(());
    }
    println!("{}", key_table(&found, args.show_values));
    Ok(())
}

async fn create(keys: &FunctionKeys, args: KeysCreateArgs) -> Result<()> {
    let key = keys
        .create_function_key(
            &args.resource_id,
            &args.function,
            &args.name,
            args.value.as_deref(),
        )
        .await
        .with_context(|| format!("Failed to create key {}", args.name))?;

    output::success(&format!("Key {} saved for {}", key.name, args.function));
    output::kv("Value", &key.value);
    Ok(())
}

async fn delete(keys: &FunctionKeys, args: KeysDeleteArgs) -> Result<()> {
    if !args.yes
        && !Confirm::new()
            .with_prompt(format!("Delete key {} of {}?", args.name, args.function))
            .default(false)
            .interact()?
    {
        output::info("Delete cancelled");
        return Ok(());
    }

    keys.delete_function_key(&args.resource_id, &args.function, &args.name)
        .await
        .with_context(|| format!("Failed to delete key {}", args.name))?;
    output::success(&format!("Key {} deleted", args.name));
    Ok(())
}

async fn host(keys: &FunctionKeys, args: KeysHostArgs) -> Result<()> {
    let host_keys = keys
        .list_host_keys(&args.resource_id)
        .await
        .context("Failed to list host keys")?;

    if let Some(master) = &host_keys.master_key {
        output::kv(
            "Master key",
            &if args.show_values {
                master.clone()
            } else {
                mask(master)
            },
        );
    }
    if !host_keys.function_keys.is_empty() {
        output::header("Function keys");
        println!("{}", key_table(&host_keys.function_keys, args.show_values));
    }
    if !host_keys.system_keys.is_empty() {
        output::header("System keys");
        println!("{}", key_table(&host_keys.system_keys, args.show_values));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_keeps_prefix() {
        assert_eq!(mask("abcdefgh"), "abcd****");
        assert_eq!(mask("abc"), "abc");
        assert_eq!(mask(&"x".repeat(60)).len(), 16);
    }
}
