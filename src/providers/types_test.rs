use super::*;

// =============================================================================
// ProviderError codes
// =============================================================================

#[test]
fn auth_errors_are_not_retryable() {
    assert!(!ProviderError::InvalidCredentials.retryable());
    assert!(!ProviderError::DuplicateAccount.retryable());
    assert_eq!(ProviderError::InvalidCredentials.error_code(), "E_INVALID_CREDENTIALS");
    assert_eq!(ProviderError::DuplicateAccount.error_code(), "E_DUPLICATE_ACCOUNT");
    assert!(!ProviderError::SignInRequired("down".into()).retryable());
}

#[test]
fn transport_errors_are_retryable() {
    assert!(ProviderError::Unavailable("down".into()).retryable());
    assert!(ProviderError::Request("reset".into()).retryable());
}

#[test]
fn rejected_retryable_only_for_throttle_and_server_errors() {
    let throttled = ProviderError::Rejected { status: 429, body: String::new() };
    let server = ProviderError::Rejected { status: 503, body: String::new() };
    let client = ProviderError::Rejected { status: 400, body: String::new() };
    assert!(throttled.retryable());
    assert!(server.retryable());
    assert!(!client.retryable());
}

#[test]
fn rejected_display_includes_status() {
    let err = ProviderError::Rejected { status: 400, body: "bad".into() };
    assert_eq!(err.to_string(), "provider rejected request: status 400");
}

// =============================================================================
// Tokens
// =============================================================================

#[test]
fn public_token_into_inner_returns_raw_value() {
    let token = PublicToken::new("public-sandbox-1");
    assert_eq!(token.as_str(), "public-sandbox-1");
    assert_eq!(token.into_inner(), "public-sandbox-1");
}

#[test]
fn user_identity_omits_missing_name() {
    let user = UserIdentity { id: "u1".into(), email: "a@b.com".into(), name: None };
    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("name").is_none());
    assert_eq!(json["email"], "a@b.com");
}
