//! Operating system and app kind constraints

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hosting operating system of an app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Windows,
    Linux,
}

impl Os {
    /// Both operating systems, in catalog order
    pub const ALL: [Os; 2] = [Os::Windows, Os::Linux];

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Linux => "linux",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" => Ok(Os::Windows),
            "linux" => Ok(Os::Linux),
            other => Err(format!("Unknown OS '{}'. Valid values: windows, linux", other)),
        }
    }
}

/// Kind of App Service resource a catalog applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    #[serde(alias = "app")]
    WebApp,
    FunctionApp,
}

impl AppKind {
    pub const ALL: [AppKind; 2] = [AppKind::WebApp, AppKind::FunctionApp];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppKind::WebApp => "webapp",
            AppKind::FunctionApp => "functionapp",
        }
    }

    /// Derive the app kind and OS from an ARM site `kind` string
    ///
    /// ARM encodes both in a comma separated list such as `functionapp,linux`.
    pub fn from_site_kind(kind: &str) -> (AppKind, Os) {
        let parts: Vec<String> = kind
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .collect();
        let app_kind = if parts.iter().any(|p| p == "functionapp") {
            AppKind::FunctionApp
        } else {
            AppKind::WebApp
        };
        let os = if parts.iter().any(|p| p == "linux") {
            Os::Linux
        } else {
            Os::Windows
        };
        (app_kind, os)
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "webapp" | "app" => Ok(AppKind::WebApp),
            "functionapp" => Ok(AppKind::FunctionApp),
            other => Err(format!(
                "Unknown app kind '{}'. Valid values: webapp, functionapp",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_parse_case_insensitive() {
        assert_eq!("Linux".parse::<Os>().unwrap(), Os::Linux);
        assert_eq!("WINDOWS".parse::<Os>().unwrap(), Os::Windows);
        assert!("macos".parse::<Os>().is_err());
    }

    #[test]
    fn test_os_serde_lowercase() {
        let json = serde_json::to_string(&Os::Linux).unwrap();
        assert_eq!(json, "\"linux\"");
        let os: Os = serde_json::from_str("\"windows\"").unwrap();
        assert_eq!(os, Os::Windows);
    }

    #[test]
    fn test_site_kind_detection() {
        assert_eq!(
            AppKind::from_site_kind("functionapp,linux"),
            (AppKind::FunctionApp, Os::Linux)
        );
        assert_eq!(
            AppKind::from_site_kind("app,linux,container"),
            (AppKind::WebApp, Os::Linux)
        );
        assert_eq!(AppKind::from_site_kind("app"), (AppKind::WebApp, Os::Windows));
        assert_eq!(
            AppKind::from_site_kind("functionapp"),
            (AppKind::FunctionApp, Os::Windows)
        );
    }
}
