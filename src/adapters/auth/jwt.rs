//! HS256 dashboard token validation.
//!
//! Agents sign in elsewhere; the dashboard presents a JWT signed with the
//! shared secret. `sub` becomes the agent id.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use crate::domain::foundation::{AgentId, AuthError, AuthenticatedAgent};
use crate::ports::AgentTokenValidator;

#[derive(Debug, Clone)]
pub struct JwtValidatorConfig {
    secret: Secret<String>,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
}

impl JwtValidatorConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Secret::new(secret.into()),
            issuer: None,
            audience: None,
            leeway_secs: 30,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct AgentClaims {
    sub: String,
    #[serde(default)]
    name: Option<String>,
}

pub struct JwtAgentValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAgentValidator {
    pub fn new(config: JwtValidatorConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        validation.validate_exp = true;

        // jsonwebtoken only checks iss/aud when present, so a configured
        // issuer or audience must also be a required claim.
        let mut required = vec!["exp", "sub"];
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
            required.push("iss");
        }
        match &config.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                required.push("aud");
            }
            None => validation.validate_aud = false,
        }
        validation.set_required_spec_claims(&required);

        Self {
            decoding_key: DecodingKey::from_secret(config.secret.expose_secret().as_bytes()),
            validation,
        }
    }
}

impl std::fmt::Debug for JwtAgentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAgentValidator")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AgentTokenValidator for JwtAgentValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedAgent, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let data = decode::<AgentClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Token expired");
                        AuthError::TokenExpired
                    }
                    _ => {
                        tracing::warn!("Token validation failed: {}", e);
                        AuthError::InvalidToken
                    }
                }
            },
        )?;

        let id = AgentId::new(&data.claims.sub).map_err(|_| {
            tracing::warn!("Blank subject in agent token");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedAgent::new(id, data.claims.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    const SECRET: &str = "dashboard-secret";

    #[derive(Serialize)]
    struct Claims<'a> {
        sub: &'a str,
        exp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        aud: Option<&'a str>,
    }

    fn sign(claims: &Claims<'_>, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_an_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    fn claims(sub: &str) -> Claims<'_> {
        Claims {
            sub,
            exp: in_an_hour(),
            name: Some("Tolu"),
            iss: None,
            aud: None,
        }
    }

    #[tokio::test]
    async fn valid_token_yields_agent() {
        let validator = JwtAgentValidator::new(JwtValidatorConfig::new(SECRET));
        let agent = validator.validate(&sign(&claims("agent-7"), SECRET)).await.unwrap();
        assert_eq!(agent.id.as_str(), "agent-7");
        assert_eq!(agent.display_name.as_deref(), Some("Tolu"));
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid() {
        let validator = JwtAgentValidator::new(JwtValidatorConfig::new(SECRET));
        let token = sign(&claims("agent-7"), "other-secret");
        assert_eq!(validator.validate(&token).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn expired_token_is_reported() {
        let validator = JwtAgentValidator::new(JwtValidatorConfig::new(SECRET));
        let token = sign(
            &Claims {
                exp: chrono::Utc::now().timestamp() - 3600,
                ..claims("agent-7")
            },
            SECRET,
        );
        assert_eq!(validator.validate(&token).await, Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn issuer_and_audience_are_enforced_when_configured() {
        let validator = JwtAgentValidator::new(
            JwtValidatorConfig::new(SECRET)
                .with_issuer("https://auth.example.com")
                .with_audience("dashboard"),
        );

        let wrong = sign(&claims("agent-7"), SECRET);
        assert_eq!(validator.validate(&wrong).await, Err(AuthError::InvalidToken));

        let right = sign(
            &Claims {
                iss: Some("https://auth.example.com"),
                aud: Some("dashboard"),
                ..claims("agent-7")
            },
            SECRET,
        );
        assert!(validator.validate(&right).await.is_ok());
    }

    #[tokio::test]
    async fn configured_issuer_and_audience_must_be_present() {
        let validator = JwtAgentValidator::new(
            JwtValidatorConfig::new(SECRET)
                .with_issuer("https://auth.example.com")
                .with_audience("dashboard"),
        );

        let no_issuer = sign(&Claims { aud: Some("dashboard"), ..claims("agent-7") }, SECRET);
        assert_eq!(validator.validate(&no_issuer).await, Err(AuthError::InvalidToken));

        let no_audience = sign(
            &Claims { iss: Some("https://auth.example.com"), ..claims("agent-7") },
            SECRET,
        );
        assert_eq!(validator.validate(&no_audience).await, Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn unconfigured_issuer_is_not_required() {
        let validator = JwtAgentValidator::new(JwtValidatorConfig::new(SECRET));
        assert!(validator.validate(&sign(&claims("agent-7"), SECRET)).await.is_ok());
    }

    #[tokio::test]
    async fn blank_token_is_missing_credentials() {
        let validator = JwtAgentValidator::new(JwtValidatorConfig::new(SECRET));
        assert_eq!(validator.validate("").await, Err(AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        let validator = JwtAgentValidator::new(JwtValidatorConfig::new(SECRET));
        assert_eq!(validator.validate("not.a.jwt").await, Err(AuthError::InvalidToken));
    }
}
