//! Provider configuration parsed from environment variables.

pub const DEFAULT_PLAID_PRODUCTS: &str = "auth,transactions";
pub const DEFAULT_PLAID_COUNTRY_CODES: &str = "US";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("config parse failed: {0}")]
    Parse(String),
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing(_) => "E_CONFIG_MISSING",
            Self::Parse(_) => "E_CONFIG_PARSE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaidEnvironment {
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaidConfig {
    pub client_id: String,
    pub secret: String,
    pub environment: PlaidEnvironment,
    pub products: Vec<String>,
    pub country_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub appwrite: AppwriteConfig,
    pub plaid: PlaidConfig,
    pub timeouts: ProviderTimeouts,
}

impl ProviderConfig {
    /// Build typed provider config from environment variables.
    ///
    /// Required:
    /// - `APPWRITE_ENDPOINT` (e.g. `https://cloud.appwrite.io/v1`)
    /// - `APPWRITE_PROJECT_ID`
    /// - `PLAID_CLIENT_ID`
    /// - `PLAID_SECRET`
    ///
    /// Optional:
    /// - `PLAID_ENV`: `sandbox` (default), `development`, or `production`
    /// - `PLAID_PRODUCTS`: comma list, default `auth,transactions`
    /// - `PLAID_COUNTRY_CODES`: comma list, default `US`
    /// - `PROVIDER_REQUEST_TIMEOUT_SECS`: default 120
    /// - `PROVIDER_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an absent required variable and
    /// [`ConfigError::Parse`] for an unknown `PLAID_ENV`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let appwrite = AppwriteConfig {
            endpoint: required("APPWRITE_ENDPOINT")?.trim_end_matches('/').to_string(),
            project_id: required("APPWRITE_PROJECT_ID")?,
        };

        let plaid = PlaidConfig {
            client_id: required("PLAID_CLIENT_ID")?,
            secret: required("PLAID_SECRET")?,
            environment: parse_environment(std::env::var("PLAID_ENV").ok().as_deref())?,
            products: split_list(&std::env::var("PLAID_PRODUCTS").unwrap_or_else(|_| DEFAULT_PLAID_PRODUCTS.into())),
            country_codes: split_list(
                &std::env::var("PLAID_COUNTRY_CODES").unwrap_or_else(|_| DEFAULT_PLAID_COUNTRY_CODES.into()),
            ),
        };

        let timeouts = ProviderTimeouts {
            request_secs: env_parse_u64("PROVIDER_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("PROVIDER_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { appwrite, plaid, timeouts })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_environment(raw: Option<&str>) -> Result<PlaidEnvironment, ConfigError> {
    match raw.unwrap_or("sandbox") {
        "sandbox" => Ok(PlaidEnvironment::Sandbox),
        "development" => Ok(PlaidEnvironment::Development),
        "production" => Ok(PlaidEnvironment::Production),
        other => Err(ConfigError::Parse(format!("unknown PLAID_ENV: {other}"))),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
