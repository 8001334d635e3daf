use super::*;

fn jane() -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        email: "a@x.com".into(),
        first_name: "Jane".into(),
        last_name: "Doe".into(),
        created_at: time::macros::datetime!(2024-03-01 12:00 UTC),
    }
}

#[test]
fn normalize_email_accepts_basic_address() {
    assert_eq!(normalize_email("  Jane@Example.com "), Some("jane@example.com".to_owned()));
}

#[test]
fn normalize_email_rejects_invalid_values() {
    assert_eq!(normalize_email(""), None);
    assert_eq!(normalize_email("jane"), None);
    assert_eq!(normalize_email("@example.com"), None);
    assert_eq!(normalize_email("jane@"), None);
    assert_eq!(normalize_email("a@b@c"), None);
}

#[test]
fn profile_update_is_empty_only_without_fields() {
    assert!(ProfileUpdate::default().is_empty());
    assert!(!ProfileUpdate { first_name: Some("Janet".into()), last_name: None }.is_empty());
    assert!(!ProfileUpdate { first_name: None, last_name: Some(String::new()) }.is_empty());
}

#[test]
fn display_name_falls_back_to_email() {
    assert_eq!(display_name(&jane()), "Jane Doe");
    let blank = UserProfile { first_name: " ".into(), last_name: String::new(), ..jane() };
    assert_eq!(display_name(&blank), "a@x.com");
}

#[test]
fn profile_serializes_created_at_as_rfc3339() {
    let json = serde_json::to_value(jane()).unwrap();
    assert_eq!(json["created_at"], "2024-03-01T12:00:00Z");
    assert_eq!(json["first_name"], "Jane");
    let restored: UserProfile = serde_json::from_value(json).unwrap();
    assert_eq!(restored.created_at, jane().created_at);
}
