//! Common test utilities for appsvc-forms
//!
//! - A recording mock gateway
//! - Resolvers over the bundled catalog
//! - Site state fixtures

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
