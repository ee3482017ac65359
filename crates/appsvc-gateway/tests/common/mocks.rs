//! In-memory gateway with canned responses

#![allow(dead_code)]

use appsvc_gateway::{GatewayError, GatewayResponse, ResourceGateway};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Record of a gateway call
#[derive(Clone, Debug)]
pub struct MockInvocation {
    pub method: &'static str,
    pub resource_id: String,
    pub body: Option<Value>,
}

/// Gateway answering from a `"METHOD id"` table; unknown requests get a 404
#[derive(Clone, Default)]
pub struct MockGateway {
    responses: Arc<Mutex<HashMap<String, GatewayResponse<Value>>>>,
    invocations: Arc<Mutex<Vec<MockInvocation>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mock(&self, method: &str, resource_id: &str, response: GatewayResponse<Value>) {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{} {}", method, resource_id), response);
    }

    pub fn mock_ok(&self, method: &str, resource_id: &str, data: Value) {
        self.mock(method, resource_id, GatewayResponse::ok(data));
    }

    pub fn mock_failure(&self, method: &str, resource_id: &str, status: u16, message: &str) {
        self.mock(
            method,
            resource_id,
            GatewayResponse::failure(GatewayError::new(message).with_status(status)),
        );
    }

    pub fn invocations(&self) -> Vec<MockInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn was_called(&self, method: &str, resource_id: &str) -> bool {
        self.invocations()
            .iter()
            .any(|i| i.method == method && i.resource_id == resource_id)
    }

    fn respond(&self, method: &'static str, resource_id: &str, body: Option<&Value>) -> GatewayResponse<Value> {
        self.invocations.lock().unwrap().push(MockInvocation {
            method,
            resource_id: resource_id.to_string(),
            body: body.cloned(),
        });
        self.responses
            .lock()
            .unwrap()
            .get(&format!("{} {}", method, resource_id))
            .cloned()
            .unwrap_or_else(|| GatewayResponse::failure(GatewayError::new("Not Found").with_status(404)))
    }
}

#[async_trait]
impl ResourceGateway for MockGateway {
    async fn get(&self, resource_id: &str) -> GatewayResponse<Value> {
        self.respond("GET", resource_id, None)
    }

    async fn put(&self, resource_id: &str, body: &Value) -> GatewayResponse<Value> {
        self.respond("PUT", resource_id, Some(body))
    }

    async fn patch(&self, resource_id: &str, body: &Value) -> GatewayResponse<Value> {
        self.respond("PATCH", resource_id, Some(body))
    }

    async fn post(&self, resource_id: &str, body: Option<&Value>) -> GatewayResponse<Value> {
        self.respond("POST", resource_id, body)
    }

    async fn delete(&self, resource_id: &str) -> GatewayResponse<Value> {
        self.respond("DELETE", resource_id, None)
    }
}
