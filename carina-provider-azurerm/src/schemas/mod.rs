//! Azure resource schema definitions

pub mod app_service;
pub mod types;

use carina_core::schema::ResourceSchema;

/// Returns all azurerm schemas
pub fn all_schemas() -> Vec<ResourceSchema> {
    app_service::schemas()
}
