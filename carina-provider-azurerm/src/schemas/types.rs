//! Azure-specific attribute types

use carina_core::resource::Value;
use carina_core::schema::AttributeType;

use crate::arm::SslState;
use crate::utils::validate_resource_group_name;

/// Resource group name, validated against the ARM naming rules
pub fn resource_group_name() -> AttributeType {
    AttributeType::Custom {
        name: "ResourceGroupName".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) => validate_resource_group_name(s),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Azure location; any spelling that normalizes to a non-empty name
pub fn location() -> AttributeType {
    AttributeType::Custom {
        name: "Location".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) if s.trim().is_empty() => Err("location cannot be empty".to_string()),
            Value::String(_) => Ok(()),
            _ => Err("Expected string".to_string()),
        },
    }
}

/// Base64 text (standard alphabet, padded)
pub fn base64_string() -> AttributeType {
    AttributeType::Custom {
        name: "Base64".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| match value {
            Value::String(s) => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD
                    .decode(s)
                    .map(|_| ())
                    .map_err(|e| format!("invalid base64: {}", e))
            }
            _ => Err("Expected string".to_string()),
        },
    }
}

/// SSL binding mode, matched ignoring case
pub fn ssl_state() -> AttributeType {
    AttributeType::CaseInsensitiveEnum(
        SslState::ALL.iter().map(|s| s.as_str().to_string()).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn validate_resource_group_name_type() {
        let t = resource_group_name();
        assert!(t.validate(&s("rg1")).is_ok());
        assert!(t.validate(&s("rg1.")).is_err());
        assert!(t.validate(&Value::Int(1)).is_err());
    }

    #[test]
    fn validate_location_type() {
        let t = location();
        assert!(t.validate(&s("West Europe")).is_ok());
        assert!(t.validate(&s("  ")).is_err());
    }

    #[test]
    fn validate_base64_type() {
        let t = base64_string();
        assert!(t.validate(&s("cGZ4")).is_ok());
        assert!(t.validate(&s("not base64!")).is_err());
    }

    #[test]
    fn ssl_state_accepts_any_case() {
        let t = ssl_state();
        assert!(t.validate(&s("SniEnabled")).is_ok());
        assert!(t.validate(&s("ipbasedenabled")).is_ok());
        assert!(t.validate(&s("DISABLED")).is_ok());
        assert!(t.validate(&s("Enabled")).is_err());
        assert!(t.values_equal(&s("SniEnabled"), &s("snienabled")));
    }
}
