//! Tests for the account domain over the in-memory store

use chrono::Utc;
use futures::future::join_all;

use core_kernel::memory::{MemoryScope, MemoryStore};
use core_kernel::schema::{QuerySchema, WhereSchema};
use core_kernel::{
    EnumCondition, EnumFilter, FindMany, OrderBy, Repository, RepositoryError, Schema, Select,
    Transactional, WhereExpression,
};
use domain_account::{authenticate, by_email, Email, HmacDigest, NewUser, Role, User, UserChanges};

const SECRET: &str = "test-secret-test-secret-test-secret";

fn email(raw: &str) -> Email {
    Email::new(raw).into_result().unwrap()
}

fn digest() -> HmacDigest {
    HmacDigest::new(SECRET).into_result().unwrap()
}

async fn seeded() -> MemoryStore {
    let store = MemoryStore::new();
    let users = store.repository::<User>();
    users
        .create_many(vec![
            NewUser::new(email("ada@example.com"), "Ada").role(Role::Admin),
            NewUser::new(email("grace@example.com"), "Grace"),
            NewUser::new(email("linus@example.org"), "Linus").role(Role::Viewer),
        ])
        .await
        .unwrap();
    store
}

// ============================================================================
// Repository Tests
// ============================================================================

mod repository_tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = seeded().await;
        let error = store
            .repository::<User>()
            .create_one(NewUser::new(email("ADA@example.com"), "Ada again"), None)
            .await
            .unwrap_err();

        assert!(error.is_conflict());
        assert_eq!(error.to_domain_error().unwrap().status_code(), 409);
    }

    #[tokio::test]
    async fn test_filter_by_role_from_json() {
        let store = seeded().await;
        let query = QuerySchema::<User>::default()
            .parse(&serde_json::json!({
                "where": { "role": { "in": ["admin", "viewer"] } },
                "orderBy": { "display_name": "desc" }
            }))
            .unwrap();

        let users = store.repository::<User>().find_many(query).await.unwrap();
        let names: Vec<&str> = users.iter().map(|u| u.display_name.as_str()).collect();
        assert_eq!(names, vec!["Linus", "Ada"]);
    }

    #[tokio::test]
    async fn test_select_keeps_required_fields() {
        let store = MemoryStore::new();
        let users = store.repository::<User>();
        users
            .create_one(NewUser::new(email("key@example.com"), "Key").api_key(&digest(), "k-1"), None)
            .await
            .unwrap();

        let narrowed = users
            .find_one(by_email(&email("key@example.com")), Some(Select::fields(["id"])))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(narrowed.api_key_digest, None);
        assert_eq!(narrowed.last_login_at, None);
        assert_eq!(narrowed.email.as_str(), "key@example.com");
    }

    #[tokio::test]
    async fn test_null_digest_filter_is_rejected_not_widened() {
        let schema = WhereSchema::<User>::new();
        for input in [
            serde_json::json!({ "api_key_digest": { "equals": null } }),
            serde_json::json!({ "last_login_at": { "not": { "equals": null } } }),
        ] {
            let error = schema.parse(&input).unwrap_err();
            assert_eq!(error.error_code(), "com-1000");
            assert_eq!(error.status_code(), 400);
        }
    }

    #[tokio::test]
    async fn test_email_domain_filter() {
        let store = seeded().await;
        let filter = WhereSchema::<User>::new()
            .parse(&serde_json::json!({ "email": { "endsWith": "@example.com" } }))
            .unwrap();
        assert_eq!(store.repository::<User>().count_many(filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_record_login() {
        let store = seeded().await;
        let users = store.repository::<User>();
        let ada = users.find_one(by_email(&email("ada@example.com")), None).await.unwrap().unwrap();

        let now = Utc::now();
        let updated = users
            .update_one(by_email(&ada.email), UserChanges::default().login(ada.login_count, now), None)
            .await
            .unwrap();
        assert_eq!(updated.login_count, 1);
        assert_eq!(updated.last_login_at, Some(now));
    }

    #[tokio::test]
    async fn test_upsert_by_email() {
        let store = seeded().await;
        let users = store.repository::<User>();

        let upserted = users
            .upsert_one(
                by_email(&email("grace@example.com")),
                NewUser::new(email("grace@example.com"), "Grace"),
                UserChanges::default().role(Role::Admin),
                None,
            )
            .await
            .unwrap();
        assert_eq!(upserted.role, Role::Admin);

        let admins = WhereExpression::new().field("role", EnumFilter::new(EnumCondition::default().equals("admin")));
        assert_eq!(users.count_many(admins).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_leave_one_row() {
        let store = MemoryStore::new();
        let attempts = (0..16).map(|i| {
            let users = store.repository::<User>();
            async move {
                users
                    .upsert_one(
                        by_email(&email("race@example.com")),
                        NewUser::new(email("race@example.com"), format!("racer {i}")),
                        UserChanges::default().display_name(format!("racer {i}")),
                        None,
                    )
                    .await
            }
        });
        let handles: Vec<_> = attempts.map(tokio::spawn).collect();

        for outcome in join_all(handles).await {
            outcome.unwrap().unwrap();
        }
        assert_eq!(store.rows::<User>().await.len(), 1);
    }

    #[tokio::test]
    async fn test_find_then_create_emulation_duplicates_rows() {
        // Find-then-create keyed on a non-unique column: both callers see
        // no row, then both insert
        let store = MemoryStore::new();
        let users = store.repository::<User>();
        let by_name = || {
            WhereSchema::<User>::new()
                .parse(&serde_json::json!({ "display_name": { "equals": "Shared" } }))
                .unwrap()
        };

        let first_look = users.find_one(by_name(), None).await.unwrap();
        let second_look = users.find_one(by_name(), None).await.unwrap();
        assert!(first_look.is_none() && second_look.is_none());

        users.create_one(NewUser::new(email("one@example.com"), "Shared"), None).await.unwrap();
        users.create_one(NewUser::new(email("two@example.com"), "Shared"), None).await.unwrap();
        assert_eq!(users.count_many(by_name()).await.unwrap(), 2);

        // The native upsert refuses a non-unique key instead
        let error = users
            .upsert_one(by_name(), NewUser::new(email("three@example.com"), "Shared"), UserChanges::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(error, RepositoryError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_no_row() {
        let store = seeded().await;
        let result = store
            .transaction(|scope: &MemoryScope| {
                Box::pin(async move {
                    let users = scope.repository::<User>();
                    users.create_one(NewUser::new(email("temp@example.com"), "Temp"), None).await?;
                    // Duplicate email aborts the whole transaction
                    users.create_one(NewUser::new(email("ada@example.com"), "Dup"), None).await?;
                    Ok::<_, RepositoryError>(())
                })
            })
            .await;

        assert!(result.unwrap_err().is_conflict());
        let temp = store
            .repository::<User>()
            .find_one(by_email(&email("temp@example.com")), None)
            .await
            .unwrap();
        assert!(temp.is_none());
    }

    #[tokio::test]
    async fn test_default_listing_window() {
        let store = MemoryStore::new();
        let users = store.repository::<User>();
        let many: Vec<NewUser> = (0..15)
            .map(|i| NewUser::new(email(&format!("user{i}@example.com")), format!("User {i:02}")))
            .collect();
        assert_eq!(users.create_many(many).await.unwrap(), 15);

        let query = QuerySchema::<User>::default()
            .parse(&serde_json::json!({ "page": 2 }))
            .unwrap()
            .order_by(OrderBy::asc("display_name"));
        let page = users.find_many(query).await.unwrap();
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].display_name, "User 10");

        let everything = users.find_many(FindMany::new()).await.unwrap();
        assert_eq!(everything.len(), 15);
    }
}

// ============================================================================
// API Key Tests
// ============================================================================

mod api_key_tests {
    use super::*;

    #[tokio::test]
    async fn test_authenticate_with_issued_key() {
        let store = MemoryStore::new();
        let digest = digest();
        let users = store.repository::<User>();
        users
            .create_one(NewUser::new(email("bot@example.com"), "Bot").api_key(&digest, "ak_1"), None)
            .await
            .unwrap();

        let user = authenticate(&users, &digest, "ak_1").await.unwrap();
        assert_eq!(user.display_name, "Bot");
        assert!(user.verify_api_key(&digest, "ak_1"));
    }

    #[tokio::test]
    async fn test_unknown_or_revoked_key_is_unauthorized() {
        let store = MemoryStore::new();
        let digest = digest();
        let users = store.repository::<User>();
        let bot = users
            .create_one(NewUser::new(email("bot@example.com"), "Bot").api_key(&digest, "ak_1"), None)
            .await
            .unwrap();

        let error = authenticate(&users, &digest, "ak_2").await.unwrap_err();
        assert!(error.is_unauthorized());
        assert!(!matches!(error, RepositoryError::Invalid(_)));
        assert_eq!(error.to_domain_error().unwrap().status_code(), 401);

        users
            .update_one(by_email(&bot.email), UserChanges::default().revoke_api_key(), None)
            .await
            .unwrap();
        assert!(authenticate(&users, &digest, "ak_1").await.is_err());
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_authenticate() {
        let store = MemoryStore::new();
        let digest = digest();
        let users = store.repository::<User>();
        let bot = users
            .create_one(NewUser::new(email("bot@example.com"), "Bot").api_key(&digest, "ak_1"), None)
            .await
            .unwrap();
        users
            .update_one(by_email(&bot.email), UserChanges::default().active(false), None)
            .await
            .unwrap();

        let error = authenticate(&users, &digest, "ak_1").await.unwrap_err();
        assert!(matches!(error, RepositoryError::Unauthorized(_)));
        assert_eq!(error.to_domain_error().unwrap().error_code(), "com-1003");
    }
}
