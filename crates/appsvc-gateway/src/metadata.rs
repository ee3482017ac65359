//! Client for the portal metadata server
//!
//! The server hands out stack catalogs per app kind and API version, and the
//! binding metadata document used by the function binding editor.

use crate::arm::execute;
use crate::envelope::{GatewayError, GatewayResponse};
use anyhow::{Context, Result};
use appsvc_core::AppKind;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
    base: Url,
}

impl MetadataClient {
    pub fn new(endpoint: &str, user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let mut base = Url::parse(endpoint)
            .with_context(|| format!("Invalid metadata endpoint: {}", endpoint))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build metadata HTTP client")?;
        Ok(Self { http, base })
    }

    pub fn stacks_url(&self, kind: AppKind, api_version: &str) -> Result<Url> {
        let mut url = self
            .base
            .join(&format!("stacks/{}", kind))
            .context("Failed to build stacks URL")?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    pub fn binding_config_url(&self) -> Result<Url> {
        self.base
            .join("api/bindingconfig")
            .context("Failed to build binding config URL")
    }

    /// Fetch the raw stack catalog document for one app kind
    pub async fn get_stacks(&self, kind: AppKind, api_version: &str) -> GatewayResponse<Value> {
        match self.stacks_url(kind, api_version) {
            Ok(url) => self.get(url).await,
            Err(e) => GatewayResponse::failure(GatewayError::new(format!("{:#}", e))),
        }
    }

    /// Fetch the raw binding metadata document
    pub async fn get_binding_config(&self) -> GatewayResponse<Value> {
        match self.binding_config_url() {
            Ok(url) => self.get(url).await,
            Err(e) => GatewayResponse::failure(GatewayError::new(format!("{:#}", e))),
        }
    }

    async fn get(&self, url: Url) -> GatewayResponse<Value> {
        debug!("GET {}", url);
        execute(self.http.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stacks_url() {
        let client = MetadataClient::new("https://functions.azure.com", "appsvc-test", 5).unwrap();
        let url = client.stacks_url(AppKind::FunctionApp, "2020-06-01").unwrap();
        assert_eq!(
            url.as_str(),
            "https://functions.azure.com/stacks/functionapp?api-version=2020-06-01"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let client = MetadataClient::new("https://portal.example.com/metadata", "appsvc-test", 5).unwrap();
        assert_eq!(
            client.binding_config_url().unwrap().as_str(),
            "https://portal.example.com/metadata/api/bindingconfig"
        );
    }
}
