//! CLI command implementations

pub mod keys;
pub mod runtime;
pub mod stacks;

use anyhow::{bail, Context, Result};
use appsvc_core::config::arm_token;
use appsvc_core::{AppKind, AppSvcConfig, HierarchicalConfigLoader};
use appsvc_gateway::{ArmClient, MetadataClient, ResourceGateway};
use appsvc_stacks::{CatalogRegistry, StackResolver};
use camino::Utf8Path;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load configuration from an explicit file or the default location
pub(crate) fn load_config(path: Option<&Utf8Path>) -> Result<AppSvcConfig> {
    let loader = HierarchicalConfigLoader::new().context("Failed to locate configuration")?;
    let config = match path {
        Some(path) => loader.load_from(path),
        None => loader.load(),
    }
    .context("Failed to load configuration")?;
    Ok(config)
}

/// Catalog registry from `stacks.catalog-dir` or the bundled revisions
pub(crate) fn load_registry(config: &AppSvcConfig) -> Result<CatalogRegistry> {
    match &config.stacks.catalog_dir {
        Some(dir) => {
            debug!("Using stack catalog from {}", dir);
            CatalogRegistry::from_directory(Path::new(dir))
                .with_context(|| format!("Failed to load stack catalog from {}", dir))
        }
        None => CatalogRegistry::embedded().context("Failed to load bundled stack catalog"),
    }
}

/// Resolver over one catalog revision.
///
/// With `remote`, the revision for `kind` is fetched from the metadata
/// endpoint and validated like a bundled one.
pub(crate) async fn load_resolver(
    config: &AppSvcConfig,
    api_version: Option<&str>,
    remote: Option<AppKind>,
) -> Result<StackResolver> {
    let api_version = api_version.unwrap_or(&config.stacks.api_version);

    let registry = match remote {
        Some(kind) => {
            let Some(endpoint) = config.metadata.endpoint.as_deref() else {
                bail!("--remote needs metadata.endpoint (or APPSVC_METADATA_ENDPOINT) to be set");
            };
            let client = MetadataClient::new(endpoint, &config.arm.user_agent, config.arm.timeout_secs)?;
            let document = client
                .get_stacks(kind, api_version)
                .await
                .into_result("stacks")
                .with_context(|| format!("Failed to fetch {} stacks from {}", kind, endpoint))?;

            let mut registry = CatalogRegistry::new()?;
            registry
                .insert_document(kind, api_version, document)
                .context("Metadata endpoint returned an invalid catalog")?;
            registry
        }
        None => load_registry(config)?,
    };

    let catalog = registry.catalog(api_version)?;
    Ok(StackResolver::new(catalog))
}

/// ARM gateway authenticated with `APPSVC_ARM_TOKEN`
pub(crate) fn arm_gateway(config: &AppSvcConfig) -> Result<Arc<dyn ResourceGateway>> {
    let token = arm_token();
    if token.is_none() {
        crate::output::warning("APPSVC_ARM_TOKEN is not set, requests will be anonymous");
    }
    Ok(Arc::new(ArmClient::new(&config.arm, token)?))
}
