//! Carina provider for Azure App Service
//!
//! Manages App Service certificates and custom hostname bindings through the
//! Azure Resource Manager REST API.

pub mod arm;
pub mod config;
pub mod provider;
pub mod resource_id;
pub mod resources;
pub mod schemas;
pub mod utils;

pub use arm::{StopContext, StopHandle};
pub use config::{AzureEnvironment, ConfigError, ProviderConfig};
pub use provider::AzurermProvider;
