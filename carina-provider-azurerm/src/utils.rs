//! Helpers shared by the resource handlers

use std::sync::LazyLock;

use regex::Regex;

use crate::arm::ArmError;

static RESOURCE_GROUP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-\w\._\(\)]+$").unwrap_or_else(|e| unreachable!("invalid resource group pattern: {e}"))
});

/// Normalize an Azure location (e.g., "West Europe" -> "westeurope")
pub fn normalize_location(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Whether a remote call failed because the object does not exist
pub fn response_was_not_found(err: &ArmError) -> bool {
    err.is_not_found()
}

/// Resource group names: 1-90 characters of alphanumerics, underscores,
/// parentheses, hyphens and periods, not ending in a period
pub fn validate_resource_group_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("resource group name cannot be empty".to_string());
    }
    if name.len() > 90 {
        return Err(format!(
            "resource group name '{}' may not exceed 90 characters in length",
            name
        ));
    }
    if name.ends_with('.') {
        return Err(format!("resource group name '{}' cannot end with a period", name));
    }
    if !RESOURCE_GROUP_NAME.is_match(name) {
        return Err(format!(
            "resource group name '{}' may only contain alphanumeric characters, dash, underscores, parentheses and periods",
            name
        ));
    }
    Ok(())
}
