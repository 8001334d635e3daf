use super::*;
use crate::config::HttpTimeouts;

const USER_ID: &str = "6f1d1c4e-8f5b-4a65-9a43-0d2b1b6c7e11";

fn test_config() -> AuthConfig {
    AuthConfig {
        url: "https://project.example.test/".into(),
        anon_key: "anon".into(),
        timeouts: HttpTimeouts::default(),
    }
}

fn session_json() -> String {
    serde_json::json!({
        "access_token": "at-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "rt-1",
        "user": { "id": USER_ID, "email": "a@x.com", "aud": "authenticated" }
    })
    .to_string()
}

// =============================================================================
// parse_session / parse_sign_up
// =============================================================================

#[test]
fn parse_session_computes_expiry_from_expires_in() {
    let session = parse_session(&session_json(), 1_000).unwrap();
    assert_eq!(session.identity.id.to_string(), USER_ID);
    assert_eq!(session.identity.email.as_deref(), Some("a@x.com"));
    assert_eq!(session.access_token, "at-1");
    assert_eq!(session.refresh_token.as_deref(), Some("rt-1"));
    assert_eq!(session.expires_at, Some(4_600));
}

#[test]
fn parse_session_prefers_explicit_expires_at() {
    let json = serde_json::json!({
        "access_token": "at",
        "expires_in": 3600,
        "expires_at": 42,
        "user": { "id": USER_ID }
    })
    .to_string();
    let session = parse_session(&json, 1_000).unwrap();
    assert_eq!(session.expires_at, Some(42));
    assert_eq!(session.identity.email, None);
}

#[test]
fn parse_session_rejects_missing_token() {
    let json = serde_json::json!({ "user": { "id": USER_ID } }).to_string();
    assert!(matches!(parse_session(&json, 0), Err(ProviderError::Decode(_))));
}

#[test]
fn parse_sign_up_with_session() {
    let (identity, session) = parse_sign_up(&session_json(), 0).unwrap();
    assert_eq!(identity.id.to_string(), USER_ID);
    assert_eq!(session.unwrap().identity, identity);
}

#[test]
fn parse_sign_up_bare_user_has_no_session() {
    let json = serde_json::json!({ "id": USER_ID, "email": "a@x.com", "confirmation_sent_at": "2024-01-01T00:00:00Z" })
        .to_string();
    let (identity, session) = parse_sign_up(&json, 0).unwrap();
    assert_eq!(identity.email.as_deref(), Some("a@x.com"));
    assert!(session.is_none());
}

// =============================================================================
// parse_error
// =============================================================================

#[test]
fn parse_error_duplicate_by_code() {
    let body = r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#;
    assert!(matches!(parse_error(422, body), ProviderError::DuplicateIdentity));
}

#[test]
fn parse_error_duplicate_by_message() {
    let body = r#"{"msg":"A user with this email address has already been registered"}"#;
    // "already been registered" is not one of the recognized phrases.
    assert!(matches!(parse_error(400, body), ProviderError::Api { status: 400, .. }));

    let body = r#"{"message":"User already registered"}"#;
    assert!(matches!(parse_error(400, body), ProviderError::DuplicateIdentity));
}

#[test]
fn parse_error_invalid_grant() {
    let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
    assert!(matches!(parse_error(400, body), ProviderError::InvalidCredentials));
}

#[test]
fn parse_error_non_json_body_kept_as_message() {
    let err = parse_error(502, "  bad gateway \n");
    assert!(matches!(err, ProviderError::Api { status: 502, ref message } if message == "bad gateway"));
}

// =============================================================================
// GoTrueClient local session handling
// =============================================================================

#[tokio::test]
async fn new_client_has_no_session() {
    let client = GoTrueClient::new(&test_config()).unwrap();
    assert_eq!(client.base_url, "https://project.example.test/auth/v1");
    assert!(client.current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn with_session_restores_session() {
    let session = parse_session(&session_json(), 0).unwrap();
    let client = GoTrueClient::new(&test_config())
        .unwrap()
        .with_session(session.clone());
    assert_eq!(client.current_session().await.unwrap(), Some(session));
}

#[tokio::test]
async fn sign_out_without_session_is_noop() {
    let client = GoTrueClient::new(&test_config()).unwrap();
    let mut rx = client.subscribe();
    client.sign_out().await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn refresh_without_session_errors() {
    let client = GoTrueClient::new(&test_config()).unwrap();
    assert!(matches!(client.refresh_session().await, Err(ProviderError::NoSession)));
}
