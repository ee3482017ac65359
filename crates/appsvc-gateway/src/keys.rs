//! Function and host key management

use crate::traits::ResourceGateway;
use appsvc_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use urlencoding::encode;

/// A named key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionKey {
    pub name: String,
    pub value: String,
}

/// Keys of the Functions host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostKeys {
    pub master_key: Option<String>,
    pub function_keys: Vec<FunctionKey>,
    pub system_keys: Vec<FunctionKey>,
}

/// Key operations for a function app, issued through a gateway
pub struct FunctionKeys {
    gateway: Arc<dyn ResourceGateway>,
}

impl FunctionKeys {
    pub fn new(gateway: Arc<dyn ResourceGateway>) -> Self {
        Self { gateway }
    }

    /// List the keys of one function
    pub async fn list_function_keys(&self, resource_id: &str, function_name: &str) -> Result<Vec<FunctionKey>> {
        let id = format!("{}/functions/{}/listkeys", resource_id, encode(function_name));
        debug!("Listing keys for function {}", function_name);
        let data = self.gateway.post(&id, None).await.into_result("listkeys")?;
        Ok(keys_from_map(unwrap_properties(&data)))
    }

    /// Create or replace a function key. ARM generates the value when none is given.
    pub async fn create_function_key(
        &self,
        resource_id: &str,
        function_name: &str,
        key_name: &str,
        key_value: Option<&str>,
    ) -> Result<FunctionKey> {
        let id = key_resource_id(resource_id, function_name, key_name);
        let mut properties = Map::new();
        properties.insert("name".into(), json!(key_name));
        if let Some(value) = key_value {
            properties.insert("value".into(), json!(value));
        }
        let body = json!({ "properties": properties });

        let data = self.gateway.put(&id, &body).await.into_result("createkey")?;
        let value = data
            .pointer("/properties/value")
            .or_else(|| data.get("value"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| key_value.map(str::to_string))
            .ok_or_else(|| Error::upstream("createkey", "response did not include the key value"))?;

        info!("Created key {} for function {}", key_name, function_name);
        Ok(FunctionKey {
            name: key_name.to_string(),
            value,
        })
    }

    pub async fn delete_function_key(&self, resource_id: &str, function_name: &str, key_name: &str) -> Result<()> {
        let id = key_resource_id(resource_id, function_name, key_name);
        self.gateway.delete(&id).await.into_result("deletekey")?;
        info!("Deleted key {} from function {}", key_name, function_name);
        Ok(())
    }

    /// Master, function and system keys of the host
    pub async fn list_host_keys(&self, resource_id: &str) -> Result<HostKeys> {
        let id = format!("{}/host/default/listkeys", resource_id);
        let data = self.gateway.post(&id, None).await.into_result("hostkeys")?;
        let data = unwrap_properties(&data);

        let section = |name: &str| {
            data.get(name)
                .map(keys_from_map)
                .unwrap_or_default()
        };
        Ok(HostKeys {
            master_key: data.get("masterKey").and_then(Value::as_str).map(str::to_string),
            function_keys: section("functionKeys"),
            system_keys: section("systemKeys"),
        })
    }
}

/// Function and key names are user input and go into the path percent-encoded
fn key_resource_id(resource_id: &str, function_name: &str, key_name: &str) -> String {
    format!(
        "{}/functions/{}/keys/{}",
        resource_id,
        encode(function_name),
        encode(key_name)
    )
}

fn unwrap_properties(value: &Value) -> &Value {
    match value.get("properties") {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    }
}

/// `{ name: value }` object into a list, sorted by name
fn keys_from_map(value: &Value) -> Vec<FunctionKey> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(name, value)| {
                    value.as_str().map(|v| FunctionKey {
                        name: name.clone(),
                        value: v.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
