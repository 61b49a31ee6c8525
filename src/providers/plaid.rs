//! Plaid bank-link provider.
//!
//! Thin HTTP wrapper for `/link/token/create` and
//! `/item/public_token/exchange`. Pure parsing in `parse_*` for testability.

use std::time::Duration;

use super::BankLinkProvider;
use super::types::{AccessCredential, LinkToken, ProviderError, PublicToken, UserIdentity};
use crate::config::{PlaidConfig, ProviderTimeouts};

const CLIENT_NAME: &str = "Horizon";
const LANGUAGE: &str = "en";

// =============================================================================
// CLIENT
// =============================================================================

pub struct PlaidBankLink {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    secret: String,
    products: Vec<String>,
    country_codes: Vec<String>,
}

impl PlaidBankLink {
    /// Build a client for the configured Plaid environment.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &PlaidConfig, timeouts: ProviderTimeouts) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ProviderError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.environment.base_url().to_string(),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
            products: config.products.clone(),
            country_codes: config.country_codes.clone(),
        })
    }

    async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    ProviderError::Unavailable(e.to_string())
                } else {
                    ProviderError::Request(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if status != 200 {
            return Err(parse_error(status, &text));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl BankLinkProvider for PlaidBankLink {
    async fn create_link_token(&self, user: &UserIdentity) -> Result<LinkToken, ProviderError> {
        let body = LinkTokenRequest {
            client_id: &self.client_id,
            secret: &self.secret,
            client_name: CLIENT_NAME,
            user: LinkUser { client_user_id: &user.id },
            products: &self.products,
            country_codes: &self.country_codes,
            language: LANGUAGE,
        };
        let text = self.post("/link/token/create", &body).await?;
        parse_link_token(&text)
    }

    async fn exchange_public_token(
        &self,
        public_token: PublicToken,
        _user: &UserIdentity,
    ) -> Result<AccessCredential, ProviderError> {
        let public_token = public_token.into_inner();
        let body = ExchangeRequest { client_id: &self.client_id, secret: &self.secret, public_token: &public_token };
        let text = self.post("/item/public_token/exchange", &body).await?;
        parse_exchange(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
struct LinkTokenRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    client_name: &'a str,
    user: LinkUser<'a>,
    products: &'a [String],
    country_codes: &'a [String],
    language: &'a str,
}

#[derive(serde::Serialize)]
struct LinkUser<'a> {
    client_user_id: &'a str,
}

#[derive(serde::Serialize)]
struct ExchangeRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    public_token: &'a str,
}

#[derive(serde::Deserialize)]
struct LinkTokenResponse {
    link_token: String,
}

#[derive(serde::Deserialize)]
struct ExchangeResponse {
    access_token: String,
    item_id: String,
}

#[derive(serde::Deserialize)]
struct ApiError {
    error_code: String,
    #[serde(default)]
    error_message: String,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_link_token(json: &str) -> Result<LinkToken, ProviderError> {
    let api: LinkTokenResponse = serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(LinkToken::new(api.link_token))
}

fn parse_exchange(json: &str) -> Result<AccessCredential, ProviderError> {
    let api: ExchangeResponse = serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(AccessCredential { access_token: api.access_token, item_id: api.item_id })
}

fn parse_error(status: u16, body: &str) -> ProviderError {
    if matches!(status, 502..=504) {
        return ProviderError::Unavailable(format!("status {status}"));
    }
    let body = match serde_json::from_str::<ApiError>(body) {
        Ok(api) if api.error_message.is_empty() => api.error_code,
        Ok(api) => format!("{}: {}", api.error_code, api.error_message),
        Err(_) => body.to_string(),
    };
    ProviderError::Rejected { status, body }
}

#[cfg(test)]
#[path = "plaid_test.rs"]
mod tests;
