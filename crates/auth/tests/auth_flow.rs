//! Auth flow integration tests against Postgres.
//! Run with: DATABASE_URL=... cargo test -p quill-auth -- --ignored

#![allow(clippy::unwrap_used, reason = "integration test code")]

use quill_auth::{AuthError, AuthService};
use quill_storage::Store;

async fn create_store() -> Store {
    let url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    Store::connect(&url).await.expect("failed to connect to PostgreSQL")
}

fn service() -> AuthService {
    AuthService::new("test-secret".into(), 24)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore]
async fn register_login_authenticate_logout() {
    let store = create_store().await;
    let auth = service();
    let username = unique("flow");

    let mut tx = store.begin().await.unwrap();
    let user = auth.register(&mut tx, &username, None, "pw12").await.unwrap();
    let issued = auth.login(&mut tx, &username, "pw12", Some("tests"), None).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(issued.user_id, user.id);
    assert!(issued.expires_in > 0);

    let mut tx = store.begin().await.unwrap();
    let resolved = auth.authenticate(&mut tx, &issued.access_token).await.unwrap();
    assert_eq!(resolved.id, user.id);

    assert!(auth.logout(&mut tx, &issued.access_token).await.unwrap());
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = auth.authenticate(&mut tx, &issued.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken), "revoked token must stop authenticating");
}

#[tokio::test]
#[ignore]
async fn short_username_and_password_rejected() {
    let store = create_store().await;
    let auth = service();

    let mut tx = store.begin().await.unwrap();
    let err = auth.register(&mut tx, "ab", None, "pw12").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
    let err = auth.register(&mut tx, &unique("ok"), None, "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
}

#[tokio::test]
#[ignore]
async fn duplicate_username_conflicts() {
    let store = create_store().await;
    let auth = service();
    let username = unique("dup");

    let mut tx = store.begin().await.unwrap();
    auth.register(&mut tx, &username, None, "pw12").await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = auth.register(&mut tx, &username, None, "pw12").await.unwrap_err();
    assert!(matches!(err, AuthError::Conflict(_)));
}

#[tokio::test]
#[ignore]
async fn token_signed_with_other_secret_rejected() {
    let store = create_store().await;
    let auth = service();
    let other = AuthService::new("other-secret".into(), 24);
    let username = unique("sig");

    let mut tx = store.begin().await.unwrap();
    auth.register(&mut tx, &username, None, "pw12").await.unwrap();
    let issued = auth.login(&mut tx, &username, "pw12", None, None).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = other.authenticate(&mut tx, &issued.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}
