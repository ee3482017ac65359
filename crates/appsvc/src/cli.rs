//! CLI argument parsing with clap

use appsvc_core::{AppKind, Os};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// appsvc - App Service runtime stacks and site settings
#[derive(Parser, Debug)]
#[command(name = "appsvc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a config file (default: ~/.appsvc/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query and validate the runtime stack catalog
    #[command(subcommand)]
    Stacks(StacksCommands),

    /// Inspect and change the runtime of a site
    #[command(subcommand)]
    Runtime(RuntimeCommands),

    /// Manage function keys
    #[command(subcommand)]
    Keys(KeysCommands),
}

/// Catalog selection shared by the stack queries
#[derive(Args, Debug, Clone)]
pub struct CatalogArgs {
    /// App kind (webapp, functionapp)
    #[arg(short, long, default_value = "webapp")]
    pub kind: AppKind,

    /// Hosting OS (windows, linux)
    #[arg(long, default_value = "windows")]
    pub os: Os,

    /// Catalog revision (default: stacks.api-version from config)
    #[arg(long)]
    pub api_version: Option<String>,

    /// Fetch the catalog from the metadata endpoint instead of the bundled copy
    #[arg(long)]
    pub remote: bool,
}

// Stacks commands
#[derive(Subcommand, Debug)]
pub enum StacksCommands {
    /// List the stacks offered for an app kind and OS
    List(StacksListArgs),

    /// Show the platform settings of one minor version
    Resolve(StacksResolveArgs),

    /// Show the version preselected for a stack
    Default(StacksDefaultArgs),

    /// Check a catalog tree against the schemas and catalog invariants
    Validate(StacksValidateArgs),
}

#[derive(Args, Debug)]
pub struct StacksListArgs {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Include hidden versions
    #[arg(long)]
    pub include_hidden: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StacksResolveArgs {
    /// Stack value, e.g. node
    pub stack: String,

    /// Major version value, e.g. 12
    pub major: String,

    /// Minor version value, e.g. 12-lts
    pub minor: String,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StacksDefaultArgs {
    /// Stack value, e.g. python
    pub stack: String,

    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StacksValidateArgs {
    /// Catalog directory laid out as <kind>/<api-version>/*.json
    /// (default: the bundled catalog)
    #[arg(short, long)]
    pub dir: Option<Utf8PathBuf>,
}

// Runtime commands
#[derive(Subcommand, Debug)]
pub enum RuntimeCommands {
    /// Show the runtime a site is configured with
    Show(RuntimeShowArgs),

    /// Change the runtime of a site
    Set(RuntimeSetArgs),
}

#[derive(Args, Debug)]
pub struct RuntimeShowArgs {
    /// ARM resource id of the site
    pub resource_id: String,

    /// Catalog revision (default: stacks.api-version from config)
    #[arg(long)]
    pub api_version: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RuntimeSetArgs {
    /// ARM resource id of the site
    pub resource_id: String,

    /// Stack value, e.g. node
    #[arg(long)]
    pub stack: String,

    /// Major version value
    #[arg(long)]
    pub major: String,

    /// Minor version value
    #[arg(long)]
    pub minor: String,

    /// Catalog revision (default: stacks.api-version from config)
    #[arg(long)]
    pub api_version: Option<String>,

    /// Print the update plan without applying it
    #[arg(long)]
    pub dry_run: bool,
}

// Keys commands
#[derive(Subcommand, Debug)]
pub enum KeysCommands {
    /// List the keys of a function
    List(KeysListArgs),

    /// Create or replace a function key
    Create(KeysCreateArgs),

    /// Delete a function key
    Delete(KeysDeleteArgs),

    /// List the host-level keys of a function app
    Host(KeysHostArgs),
}

#[derive(Args, Debug)]
pub struct KeysListArgs {
    /// ARM resource id of the function app
    pub resource_id: String,

    /// Function name
    pub function: String,

    /// Print key values instead of masking them
    #[arg(long)]
    pub show_values: bool,

    /// Output as JSON (values included)
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct KeysCreateArgs {
    /// ARM resource id of the function app
    pub resource_id: String,

    /// Function name
    pub function: String,

    /// Key name
    pub name: String,

    /// Key value (default: generated by the service)
    #[arg(long)]
    pub value: Option<String>,
}

#[derive(Args, Debug)]
pub struct KeysDeleteArgs {
    /// ARM resource id of the function app
    pub resource_id: String,

    /// Function name
    pub function: String,

    /// Key name
    pub name: String,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct KeysHostArgs {
    /// ARM resource id of the function app
    pub resource_id: String,

    /// Print key values instead of masking them
    #[arg(long)]
    pub show_values: bool,
}
