//! Dashboard authentication configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Shortest HS256 secret accepted in production.
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Settings for verifying agent bearer tokens (HS256 JWT).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Shared signing secret
    #[serde(default)]
    pub jwt_secret: String,

    /// Expected `iss` claim, if any
    pub issuer: Option<String>,

    /// Expected `aud` claim, if any
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.jwt_secret.is_empty() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        if *environment == Environment::Production
            && self.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN
        {
            return Err(ValidationError::JwtSecretTooShort);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_missing_secret() {
        let config = AuthConfig::default();
        assert!(matches!(
            config.validate(&Environment::Development),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_short_secret_allowed_outside_production() {
        let config = AuthConfig {
            jwt_secret: "dev-secret".to_string(),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Development).is_ok());
        assert!(matches!(
            config.validate(&Environment::Production),
            Err(ValidationError::JwtSecretTooShort)
        ));
    }

    #[test]
    fn test_validation_valid_production_config() {
        let config = AuthConfig {
            jwt_secret: "x".repeat(48),
            issuer: Some("concierge-dashboard".to_string()),
            audience: None,
        };
        assert!(config.validate(&Environment::Production).is_ok());
    }
}
