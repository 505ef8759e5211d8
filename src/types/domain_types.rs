// src/types/domain_types.rs
//! Domain-specific newtypes for type safety and validation.

use super::ValidationError;
use std::fmt;
use url::Url;

/// API key for Notion API authentication
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Create a new API key with validation
    pub fn new(key: impl Into<String>) -> Result<Self, ValidationError> {
        let key = key.into();

        if key.is_empty() {
            return Err(ValidationError::InvalidApiKey {
                reason: "API key cannot be empty".to_string(),
            });
        }

        if !key.starts_with("secret_") && !key.starts_with("ntn_") {
            return Err(ValidationError::InvalidApiKey {
                reason: "API key must start with 'secret_' or 'ntn_'".to_string(),
            });
        }

        if key.len() < 20 {
            return Err(ValidationError::InvalidApiKey {
                reason: "API key is too short".to_string(),
            });
        }

        Ok(Self(key))
    }

    /// Get the API key as a string reference
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ApiKey {
    /// The first ten characters, enough to tell keys apart in logs.
    fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(10).collect();
        format!("{}...", prefix)
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.redacted()).finish()
    }
}

/// Validated base URL of an HTTP service (the Supabase project, for instance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

impl ValidatedUrl {
    pub fn parse(url: &str) -> Result<Self, ValidationError> {
        match Url::parse(url) {
            Ok(parsed_url) => {
                if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
                    return Err(ValidationError::InvalidUrl {
                        url: url.to_string(),
                        reason: "Only HTTP and HTTPS URLs are supported".to_string(),
                    });
                }
                Ok(Self(parsed_url))
            }
            Err(e) => Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Where a plan's Notion credential comes from.
///
/// Plan rows carry either the integration token itself, a pointer of the
/// form `env:VAR_NAME`, or nothing (the process-wide default applies).
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialRef {
    Default,
    Literal(String),
    Env(String),
}

impl CredentialRef {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Default,
            Some(value) => match value.strip_prefix("env:") {
                Some(var) => Self::Env(var.trim().to_string()),
                None => Self::Literal(value.to_string()),
            },
        }
    }

    /// Resolves the reference into a validated key.
    ///
    /// `lookup` reads environment variables; it is a parameter so the job
    /// runner can be driven without touching the real process environment.
    pub fn resolve<F>(&self, default: Option<&ApiKey>, lookup: F) -> Result<ApiKey, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Self::Default => default
                .cloned()
                .ok_or_else(|| "no credential on the plan and NOTION_API_KEY is not set".to_string()),
            Self::Literal(token) => ApiKey::new(token.clone()).map_err(|e| e.to_string()),
            Self::Env(var) => {
                let token = lookup(var)
                    .ok_or_else(|| format!("environment variable {} is not set", var))?;
                ApiKey::new(token).map_err(|e| format!("{} (from {})", e, var))
            }
        }
    }
}

impl fmt::Debug for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Literal(_) => write!(f, "Literal(<redacted>)"),
            Self::Env(var) => write!(f, "Env({})", var),
        }
    }
}
