//! Common test utilities for appsvc-gateway

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mocks;

pub use mocks::*;

pub const SITE_ID: &str = "/subscriptions/sub-1/resourceGroups/rg/providers/Microsoft.Web/sites/contoso";
