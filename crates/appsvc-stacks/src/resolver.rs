//! Query, filter and resolve functions over one catalog revision
//!
//! Every method is a pure function of the catalog and its arguments.

use crate::catalog::StackCatalog;
use crate::model::{MinorVersion, PlatformSettings, StackDefinition};
use crate::settings::{platform_ops, platform_ops_for, RuntimeSettings};
use crate::version;
use appsvc_core::error::CatalogSegment;
use appsvc_core::{AppKind, Error, Os, Result};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Feature-flag constraints for listing stacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackQuery {
    pub include_hidden: bool,
    pub include_preview: bool,
    pub include_deprecated: bool,
    /// Platforms past their end-of-life date are kept unless this is false
    pub include_end_of_life: bool,
    /// Reference date for the end-of-life check
    pub today: Option<NaiveDate>,
}

impl Default for StackQuery {
    fn default() -> Self {
        Self {
            include_hidden: false,
            include_preview: true,
            include_deprecated: true,
            include_end_of_life: true,
            today: None,
        }
    }
}

impl StackQuery {
    fn admits(&self, platform: &PlatformSettings) -> bool {
        if platform.is_hidden && !self.include_hidden {
            return false;
        }
        if platform.is_preview && !self.include_preview {
            return false;
        }
        if platform.is_deprecated && !self.include_deprecated {
            return false;
        }
        if !self.include_end_of_life {
            if let Some(today) = self.today {
                if platform.is_end_of_life(today) {
                    return false;
                }
            }
        }
        true
    }
}

/// A fully resolved `(stack, major, minor, os)` selection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVersion {
    pub stack: String,
    pub major: String,
    pub minor: String,
    pub os: Os,
    pub platform: PlatformSettings,
}

/// Resolver over an immutable catalog revision
#[derive(Debug, Clone)]
pub struct StackResolver {
    catalog: Arc<StackCatalog>,
}

impl StackResolver {
    pub fn new(catalog: Arc<StackCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &StackCatalog {
        &self.catalog
    }

    /// Stacks offering at least one non-hidden version on `os`
    /// (any version when `include_hidden`), pruned to those versions.
    pub fn list_stacks(&self, kind: AppKind, os: Os, include_hidden: bool) -> Vec<StackDefinition> {
        self.list_stacks_with(
            kind,
            os,
            &StackQuery {
                include_hidden,
                ..Default::default()
            },
        )
    }

    /// [`list_stacks`](Self::list_stacks) with the full set of constraints.
    ///
    /// Stacks, majors and minors are ordered by `sortOrder` when present,
    /// otherwise they keep catalog order. Majors left without any admitted
    /// minor are dropped, as are stacks left without majors.
    pub fn list_stacks_with(
        &self,
        kind: AppKind,
        os: Os,
        query: &StackQuery,
    ) -> Vec<StackDefinition> {
        let mut stacks: Vec<StackDefinition> = self
            .catalog
            .stacks(kind)
            .iter()
            .filter_map(|stack| prune_stack(stack, os, query))
            .collect();
        stacks.sort_by_key(|s| sort_key(s.sort_order));

        debug!(
            "Listed {} {} stacks for {} (include_hidden={})",
            stacks.len(),
            kind,
            os,
            query.include_hidden
        );
        stacks
    }

    /// Exact lookup of a `(stack, major, minor)` key on `os`.
    ///
    /// Hidden platforms resolve; only selection lists skip them.
    pub fn resolve_platform(
        &self,
        kind: AppKind,
        stack: &str,
        major: &str,
        minor: &str,
        os: Os,
    ) -> Result<&PlatformSettings> {
        let definition = self.catalog.stack(kind, stack)?;
        let major_version = definition
            .major(major)
            .ok_or_else(|| Error::not_found(CatalogSegment::MajorVersion, major))?;
        let minor_version = major_version
            .minor(minor)
            .ok_or_else(|| Error::not_found(CatalogSegment::MinorVersion, minor))?;

        minor_version
            .platforms
            .get(os)
            .ok_or_else(|| Error::unsupported_on_os(stack, minor, os))
    }

    /// Look up a minor version by value across all majors of a stack
    pub fn resolve_minor(
        &self,
        kind: AppKind,
        stack: &str,
        minor: &str,
        os: Os,
    ) -> Result<ResolvedVersion> {
        let definition = self.catalog.stack(kind, stack)?;
        let (major_version, minor_version) = definition
            .minors()
            .find(|(_, m)| m.value == minor)
            .ok_or_else(|| Error::not_found(CatalogSegment::MinorVersion, minor))?;

        let platform = minor_version
            .platforms
            .get(os)
            .ok_or_else(|| Error::unsupported_on_os(stack, minor, os))?;

        Ok(ResolvedVersion {
            stack: definition.value.clone(),
            major: major_version.value.clone(),
            minor: minor_version.value.clone(),
            os,
            platform: platform.clone(),
        })
    }

    /// App settings and site config properties carried by the platform's
    /// dictionaries
    pub fn build_runtime_settings(&self, platform: &PlatformSettings) -> RuntimeSettings {
        RuntimeSettings::from_ops(platform.runtime_version.clone(), platform_ops(platform))
    }

    /// As [`build_runtime_settings`](Self::build_runtime_settings), plus the
    /// OS-specific runtime property (`linuxFxVersion` on Linux)
    pub fn build_runtime_settings_for(&self, platform: &PlatformSettings, os: Os) -> RuntimeSettings {
        RuntimeSettings::from_ops(
            platform.runtime_version.clone(),
            platform_ops_for(platform, os),
        )
    }

    /// The version to preselect when the resource has none.
    ///
    /// Candidates are the non-hidden platforms for `os`, ranked in tiers:
    /// default-flagged stable, stable, preview, then deprecated. Within a
    /// tier the highest version wins, then the lower `sortOrder`, then
    /// catalog order.
    pub fn default_version(&self, kind: AppKind, stack: &str, os: Os) -> Result<ResolvedVersion> {
        let definition = self.catalog.stack(kind, stack)?;

        let best = definition
            .minors()
            .enumerate()
            .filter_map(|(index, (major, minor))| {
                minor
                    .platforms
                    .get(os)
                    .filter(|p| p.is_selectable())
                    .map(|platform| (index, major, minor, platform))
            })
            .min_by(|a, b| compare_candidates((a.0, a.2, a.3), (b.0, b.2, b.3)));

        let (_, major, minor, platform) =
            best.ok_or_else(|| Error::unsupported_on_os(stack, "(any version)", os))?;

        trace!(
            "Default {} version for {}: {} {}",
            stack,
            os,
            major.value,
            minor.value
        );

        Ok(ResolvedVersion {
            stack: definition.value.clone(),
            major: major.value.clone(),
            minor: minor.value.clone(),
            os,
            platform: platform.clone(),
        })
    }

    /// Find the catalog version a live resource is configured with.
    ///
    /// On Linux the site's `linuxFxVersion` is compared case-insensitively
    /// with each platform's `runtimeVersion`. On Windows a platform matches
    /// when every key of its dictionaries is present with the same value;
    /// the platform with the most matching keys wins. Platforms without any
    /// dictionary entries cannot be detected on Windows.
    pub fn detect_current(
        &self,
        kind: AppKind,
        os: Os,
        app_settings: &BTreeMap<String, String>,
        site_config: &Map<String, Value>,
    ) -> Option<ResolvedVersion> {
        let candidates = self.catalog.stacks(kind).iter().flat_map(|stack| {
            stack.minors().filter_map(move |(major, minor)| {
                minor
                    .platforms
                    .get(os)
                    .map(|platform| (stack, major, minor, platform))
            })
        });

        let detected = match os {
            Os::Linux => {
                let fx_version = site_config
                    .get(crate::settings::LINUX_FX_VERSION)
                    .and_then(Value::as_str)
                    .filter(|v| !v.is_empty())?;
                candidates
                    .filter(|(_, _, _, p)| p.runtime_version.eq_ignore_ascii_case(fx_version))
                    .min_by_key(|(_, _, _, p)| p.is_hidden)
            }
            Os::Windows => candidates
                .filter_map(|candidate| {
                    windows_match_score(candidate.3, app_settings, site_config)
                        .map(|score| (score, candidate))
                })
                .fold(None, |best: Option<(usize, _)>, (score, candidate)| match best {
                    Some((best_score, _)) if best_score >= score => best,
                    _ => Some((score, candidate)),
                })
                .map(|(_, candidate)| candidate),
        };

        detected.map(|(stack, major, minor, platform)| ResolvedVersion {
            stack: stack.value.clone(),
            major: major.value.clone(),
            minor: minor.value.clone(),
            os,
            platform: platform.clone(),
        })
    }
}

fn sort_key(sort_order: Option<u32>) -> u32 {
    sort_order.unwrap_or(u32::MAX)
}

fn prune_stack(stack: &StackDefinition, os: Os, query: &StackQuery) -> Option<StackDefinition> {
    let mut majors: Vec<_> = stack
        .major_versions
        .iter()
        .filter_map(|major| {
            let mut minors: Vec<MinorVersion> = major
                .minor_versions
                .iter()
                .filter(|minor| minor.platforms.get(os).is_some_and(|p| query.admits(p)))
                .cloned()
                .map(|mut minor| {
                    minor.platforms.retain_os(os);
                    minor
                })
                .collect();
            if minors.is_empty() {
                return None;
            }
            minors.sort_by_key(|m| sort_key(m.sort_order));
            let mut pruned = major.clone();
            pruned.minor_versions = minors;
            Some(pruned)
        })
        .collect();

    if majors.is_empty() {
        return None;
    }
    majors.sort_by_key(|m| sort_key(m.sort_order));

    Some(StackDefinition {
        major_versions: majors,
        ..stack.clone()
    })
}

fn tier(platform: &PlatformSettings) -> u8 {
    match (platform.is_deprecated, platform.is_preview, platform.is_default) {
        (false, false, true) => 0,
        (false, false, false) => 1,
        (false, true, _) => 2,
        (true, _, _) => 3,
    }
}

/// `Less` means `a` is the better default candidate
fn compare_candidates(
    a: (usize, &MinorVersion, &PlatformSettings),
    b: (usize, &MinorVersion, &PlatformSettings),
) -> Ordering {
    let (a_index, a_minor, a_platform) = a;
    let (b_index, b_minor, b_platform) = b;
    tier(a_platform)
        .cmp(&tier(b_platform))
        .then_with(|| version::compare(&b_minor.value, &a_minor.value))
        .then_with(|| sort_key(a_platform.sort_order).cmp(&sort_key(b_platform.sort_order)))
        .then(a_index.cmp(&b_index))
}

/// Number of matching dictionary keys, or `None` when any key differs or the
/// platform has no keys at all
fn windows_match_score(
    platform: &PlatformSettings,
    app_settings: &BTreeMap<String, String>,
    site_config: &Map<String, Value>,
) -> Option<usize> {
    let expected = platform.app_settings_dictionary.len()
        + platform.site_config_properties_dictionary.len();
    if expected == 0 {
        return None;
    }

    let app_settings_match = platform
        .app_settings_dictionary
        .iter()
        .all(|(k, v)| app_settings.get(k).is_some_and(|live| live.eq_ignore_ascii_case(v)));
    let site_config_match = platform
        .site_config_properties_dictionary
        .iter()
        .all(|(k, v)| site_config.get(k).is_some_and(|live| values_match(v, live)));

    (app_settings_match && site_config_match).then_some(expected)
}

/// Site config values compare as text so `"false"` matches `false`
fn values_match(expected: &Value, live: &Value) -> bool {
    fn text(value: &Value) -> String {
        match value {
            Value::String(s) => s.to_lowercase(),
            other => other.to_string(),
        }
    }
    text(expected) == text(live)
}
