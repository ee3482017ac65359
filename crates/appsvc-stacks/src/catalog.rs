//! Stack catalog revisions and the registry that holds them
//!
//! Catalog data is laid out as `<kind>/<api-version>/<stack>.json`, both in
//! the bundled copy compiled into the binary and in an on-disk override
//! directory. Documents fetched from the metadata endpoint can be added at
//! runtime with [`CatalogRegistry::insert_document`].

use crate::document::{parse_stacks, DocumentLayout};
use crate::model::StackDefinition;
use appsvc_core::error::CatalogSegment;
use appsvc_core::{AppKind, Error, Os, Result, SchemaValidator};
use rust_embed::RustEmbed;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Catalog revision using the flat `versions[]` layout
pub const LEGACY_API_VERSION: &str = "2020-05-01";

/// Bundled catalog data
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../embedded/stacks/"]
#[prefix = ""]
struct EmbeddedStacks;

/// One immutable catalog revision
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackCatalog {
    api_version: String,
    stacks: BTreeMap<AppKind, Vec<StackDefinition>>,
}

impl StackCatalog {
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            stacks: BTreeMap::new(),
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Stacks for an app kind, in declaration order
    pub fn stacks(&self, kind: AppKind) -> &[StackDefinition] {
        self.stacks.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a stack by exact value
    pub fn stack(&self, kind: AppKind, value: &str) -> Result<&StackDefinition> {
        self.stacks(kind)
            .iter()
            .find(|s| s.value == value)
            .ok_or_else(|| Error::not_found(CatalogSegment::Stack, value))
    }

    /// Add stacks for a kind. A stack whose value already exists replaces
    /// the earlier definition in place.
    pub fn extend(&mut self, kind: AppKind, stacks: impl IntoIterator<Item = StackDefinition>) {
        let entries = self.stacks.entry(kind).or_default();
        for stack in stacks {
            match entries.iter_mut().find(|s| s.value == stack.value) {
                Some(existing) => *existing = stack,
                None => entries.push(stack),
            }
        }
    }

    /// Number of stacks across all kinds
    pub fn len(&self) -> usize {
        self.stacks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the structural invariants of every stack: major values unique
    /// per stack, minor values unique per major, and at most one minor per
    /// major flagged default for each OS.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        for (kind, stacks) in &self.stacks {
            let mut stack_values = HashSet::new();
            for stack in stacks {
                if !stack_values.insert(stack.value.as_str()) {
                    problems.push(format!("{}: duplicate stack '{}'", kind, stack.value));
                }
                Self::validate_stack(*kind, stack, &mut problems);
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::invalid_catalog(format!(
                "{} ({}):\n  - {}",
                self.api_version,
                problems.len(),
                problems.join("\n  - ")
            )))
        }
    }

    fn validate_stack(kind: AppKind, stack: &StackDefinition, problems: &mut Vec<String>) {
        let mut major_values = HashSet::new();
        for major in &stack.major_versions {
            if !major_values.insert(major.value.as_str()) {
                problems.push(format!(
                    "{}/{}: duplicate major version '{}'",
                    kind, stack.value, major.value
                ));
            }

            let mut minor_values = HashSet::new();
            for minor in &major.minor_versions {
                if !minor_values.insert(minor.value.as_str()) {
                    problems.push(format!(
                        "{}/{} {}: duplicate minor version '{}'",
                        kind, stack.value, major.value, minor.value
                    ));
                }
            }

            for os in Os::ALL {
                let defaults: Vec<&str> = major
                    .minor_versions
                    .iter()
                    .filter(|m| m.platforms.get(os).is_some_and(|p| p.is_default))
                    .map(|m| m.value.as_str())
                    .collect();
                if defaults.len() > 1 {
                    problems.push(format!(
                        "{}/{} {}: {} minor versions flagged default on {} ({})",
                        kind,
                        stack.value,
                        major.value,
                        defaults.len(),
                        os,
                        defaults.join(", ")
                    ));
                }
            }
        }
    }
}

/// Every known catalog revision, keyed by API version
#[derive(Debug)]
pub struct CatalogRegistry {
    revisions: BTreeMap<String, Arc<StackCatalog>>,
    validator: SchemaValidator,
}

impl CatalogRegistry {
    /// Create an empty registry
    pub fn new() -> Result<Self> {
        Ok(Self {
            revisions: BTreeMap::new(),
            validator: SchemaValidator::new()?,
        })
    }

    /// Load the catalog revisions compiled into the binary
    pub fn embedded() -> Result<Self> {
        let mut registry = Self::new()?;

        let mut files: Vec<String> = EmbeddedStacks::iter()
            .map(|f| f.into_owned())
            .filter(|f| f.ends_with(".json"))
            .collect();
        files.sort();

        for file in files {
            let (kind, api_version) = parse_catalog_path(&file)?;
            let content = EmbeddedStacks::get(&file)
                .ok_or_else(|| Error::invalid_catalog(format!("Missing embedded file {}", file)))?;
            let document: Value = serde_json::from_slice(&content.data)?;
            debug!("Loading embedded stacks from {}", file);
            registry.add(kind, &api_version, document)?;
        }

        registry.validate_all()?;
        info!(
            "Loaded {} embedded catalog revision(s)",
            registry.revisions.len()
        );
        Ok(registry)
    }

    /// Load catalog revisions from a directory laid out as
    /// `<kind>/<api-version>/*.json`
    pub fn from_directory(path: &Path) -> Result<Self> {
        let mut registry = Self::new()?;

        for kind_dir in sorted_entries(path)? {
            if !kind_dir.is_dir() {
                continue;
            }
            let kind = dir_name(&kind_dir)?
                .parse::<AppKind>()
                .map_err(Error::invalid_catalog)?;

            for version_dir in sorted_entries(&kind_dir)? {
                if !version_dir.is_dir() {
                    continue;
                }
                let api_version = dir_name(&version_dir)?;

                for file in sorted_entries(&version_dir)? {
                    if !file.extension().is_some_and(|e| e == "json") {
                        continue;
                    }
                    debug!("Loading stacks from {:?}", file);
                    let content = std::fs::read_to_string(&file)?;
                    let document: Value = serde_json::from_str(&content)?;
                    registry.add(kind, &api_version, document).map_err(|e| {
                        Error::invalid_catalog(format!("{}: {}", file.display(), e))
                    })?;
                }
            }
        }

        if registry.revisions.is_empty() {
            return Err(Error::invalid_catalog(format!(
                "No stack documents found under {}",
                path.display()
            )));
        }

        registry.validate_all()?;
        Ok(registry)
    }

    /// Add a stack document (one stack or an array) for `kind` under
    /// `api_version`, validating the affected revision.
    pub fn insert_document(
        &mut self,
        kind: AppKind,
        api_version: &str,
        document: Value,
    ) -> Result<()> {
        let stacks = self.parse(api_version, document)?;
        let mut revision = self
            .revisions
            .get(api_version)
            .map(|c| c.as_ref().clone())
            .unwrap_or_else(|| StackCatalog::new(api_version));
        revision.extend(kind, stacks);
        revision.validate()?;

        debug!("Registered {} stacks for {}", kind, api_version);
        self.revisions
            .insert(api_version.to_string(), Arc::new(revision));
        Ok(())
    }

    fn parse(&self, api_version: &str, document: Value) -> Result<Vec<StackDefinition>> {
        let layout = if api_version == LEGACY_API_VERSION {
            DocumentLayout::Legacy
        } else {
            DocumentLayout::Current
        };
        parse_stacks(&self.validator, layout, document)
    }

    fn add(&mut self, kind: AppKind, api_version: &str, document: Value) -> Result<()> {
        let stacks = self.parse(api_version, document)?;
        let revision = self
            .revisions
            .entry(api_version.to_string())
            .or_insert_with(|| Arc::new(StackCatalog::new(api_version)));
        Arc::make_mut(revision).extend(kind, stacks);
        Ok(())
    }

    fn validate_all(&self) -> Result<()> {
        self.revisions.values().try_for_each(|c| c.validate())
    }

    /// The catalog revision for an API version
    pub fn catalog(&self, api_version: &str) -> Result<Arc<StackCatalog>> {
        self.revisions
            .get(api_version)
            .cloned()
            .ok_or_else(|| Error::unknown_api_version(api_version))
    }

    /// Known API versions, oldest first
    pub fn api_versions(&self) -> Vec<&str> {
        self.revisions.keys().map(String::as_str).collect()
    }
}

/// Split `<kind>/<api-version>/<file>.json`
fn parse_catalog_path(file: &str) -> Result<(AppKind, String)> {
    let mut parts = file.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(api_version), Some(_), None) => {
            let kind = kind.parse::<AppKind>().map_err(Error::invalid_catalog)?;
            Ok((kind, api_version.to_string()))
        }
        _ => Err(Error::invalid_catalog(format!(
            "Unexpected catalog path '{}', expected <kind>/<api-version>/<stack>.json",
            file
        ))),
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn dir_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::invalid_catalog(format!("Invalid catalog path {}", path.display())))
}
