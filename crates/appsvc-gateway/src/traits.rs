//! Resource gateway trait

use crate::envelope::GatewayResponse;
use async_trait::async_trait;
use serde_json::Value;

/// Issues requests against ARM-shaped resources.
///
/// Implementations never fail with an `Err`; transport and HTTP errors come
/// back as a failure envelope. Timeouts are the implementation's concern.
#[async_trait]
pub trait ResourceGateway: Send + Sync {
    /// GET a resource
    async fn get(&self, resource_id: &str) -> GatewayResponse<Value>;

    /// PUT (create or replace) a resource
    async fn put(&self, resource_id: &str, body: &Value) -> GatewayResponse<Value>;

    /// PATCH (partial update) a resource
    async fn patch(&self, resource_id: &str, body: &Value) -> GatewayResponse<Value>;

    /// POST an action such as `config/appsettings/list`
    async fn post(&self, resource_id: &str, body: Option<&Value>) -> GatewayResponse<Value>;

    /// DELETE a resource
    async fn delete(&self, resource_id: &str) -> GatewayResponse<Value>;
}
