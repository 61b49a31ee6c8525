//! Appwrite identity provider.
//!
//! Thin HTTP wrapper over the Account API: `POST /account` to register and
//! `POST /account/sessions/email` to sign in. Response parsing lives in pure
//! functions for testability.

use std::time::Duration;

use uuid::Uuid;

use super::IdentityProvider;
use super::types::{ProviderError, UserIdentity};
use crate::config::{AppwriteConfig, ProviderTimeouts};
use crate::services::schema::CredentialForm;

// =============================================================================
// CLIENT
// =============================================================================

pub struct AppwriteIdentity {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
}

impl AppwriteIdentity {
    /// Build a client for the configured Appwrite project.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &AppwriteConfig, timeouts: ProviderTimeouts) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ProviderError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint: config.endpoint.clone(), project_id: config.project_id.clone() })
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}{path}", self.endpoint))
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Response-Format", "1.5.0")
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        if !(200..300).contains(&status) {
            return Err(status_error(status, text));
        }
        Ok(text)
    }

    async fn create_email_session(&self, email: &str, password: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let text = self.post("/account/sessions/email", &body).await?;
        parse_session(&text)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for AppwriteIdentity {
    async fn create_account(&self, form: &CredentialForm) -> Result<UserIdentity, ProviderError> {
        let body = serde_json::json!({
            "userId": Uuid::new_v4().simple().to_string(),
            "email": form.email,
            "password": form.password,
            "name": display_name(form),
        });
        let text = self.post("/account", &body).await?;
        let user = parse_user(&text)?;

        // Registration alone does not sign the user in. The account now
        // exists, so a resubmit would only hit DuplicateAccount.
        self.create_email_session(&form.email, &form.password)
            .await
            .map_err(session_after_sign_up)?;
        Ok(user)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<UserIdentity, ProviderError> {
        let user_id = self.create_email_session(email, password).await?;
        Ok(UserIdentity { id: user_id, email: email.to_string(), name: None })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Deserialize)]
struct ApiUser {
    #[serde(rename = "$id")]
    id: String,
    email: String,
    #[serde(default)]
    name: String,
}

#[derive(serde::Deserialize)]
struct ApiSession {
    #[serde(rename = "userId")]
    user_id: String,
}

// =============================================================================
// PARSING
// =============================================================================

fn display_name(form: &CredentialForm) -> String {
    format!("{} {}", form.first_name.trim(), form.last_name.trim())
        .trim()
        .to_string()
}

fn parse_user(json: &str) -> Result<UserIdentity, ProviderError> {
    let api: ApiUser = serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let name = Some(api.name).filter(|n| !n.trim().is_empty());
    Ok(UserIdentity { id: api.id, email: api.email, name })
}

fn parse_session(json: &str) -> Result<String, ProviderError> {
    let api: ApiSession = serde_json::from_str(json).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(api.user_id)
}

fn session_after_sign_up(e: ProviderError) -> ProviderError {
    ProviderError::SignInRequired(e.to_string())
}

fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        401 => ProviderError::InvalidCredentials,
        409 => ProviderError::DuplicateAccount,
        502..=504 => ProviderError::Unavailable(format!("status {status}")),
        _ => ProviderError::Rejected { status, body },
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_connect() || e.is_timeout() {
        ProviderError::Unavailable(e.to_string())
    } else {
        ProviderError::Request(e.to_string())
    }
}

#[cfg(test)]
#[path = "appwrite_test.rs"]
mod tests;
