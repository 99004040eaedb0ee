//! Postgres-backed repository tests.
//!
//! These need a reachable database and are ignored by default. Run with
//! `DATABASE_URL=... cargo test -- --ignored`.

use chrono::{TimeDelta, Utc};
use sqlx::PgPool;
use til_glossary::{
    error::StoreError,
    models::{NewAcronym, NewUser, Token, User},
    relations,
    repository::{PostgresRepository, Repository},
};
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        let ctx = DbTestContext { pool };
        ctx.repository()
            .migrate()
            .await
            .expect("Failed to run database migrations.");
        ctx
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Creates a user with a unique login name so tests can share one database.
async fn create_test_user(repo: &PostgresRepository, label: &str) -> User {
    repo.create_user(NewUser {
        name: format!("Test {label}"),
        username: format!("{label}-{}", Uuid::new_v4().simple()),
        password_hash: "not-a-real-hash".to_string(),
    })
    .await
    .expect("Failed to create test user")
}

fn new_acronym(short: &str, long: &str, creator_id: Uuid) -> NewAcronym {
    NewAcronym {
        short: short.to_string(),
        long: long.to_string(),
        creator_id,
    }
}

// --- Tests ---

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_get_acronym() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, "creator").await;

    let created = repo
        .create_acronym(new_acronym("OMG", "Oh My God", user.id))
        .await
        .unwrap();

    assert_eq!(repo.get_acronym(created.id).await.unwrap(), created);
    assert_eq!(relations::creator_of(&repo, &created).await.unwrap(), user);
    assert!(
        repo.get_acronyms_by_creator(user.id)
            .await
            .unwrap()
            .contains(&created)
    );
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_constraints_are_reported() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, "dup").await;

    let duplicate = repo
        .create_user(NewUser {
            name: "Other".to_string(),
            username: user.username.clone(),
            password_hash: "x".to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(StoreError::ConstraintViolation(_))));

    let orphan = repo
        .create_acronym(new_acronym("X", "Nobody's", Uuid::new_v4()))
        .await;
    assert!(matches!(orphan, Err(StoreError::ConstraintViolation(_))));

    let category = repo.create_category("Constraint".to_string()).await.unwrap();
    let dangling_pivot = repo.create_pivot(i64::MAX, category.id).await;
    assert!(matches!(
        dangling_pivot,
        Err(StoreError::ConstraintViolation(_))
    ));
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_update_and_delete_acronym() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let alice = create_test_user(&repo, "alice").await;
    let bob = create_test_user(&repo, "bob").await;

    let created = repo
        .create_acronym(new_acronym("BRB", "Be Right Back", alice.id))
        .await
        .unwrap();

    let updated = repo
        .update_acronym(created.id, new_acronym("BRB", "Be Right Back!", bob.id))
        .await
        .unwrap();
    assert_eq!(updated.creator_id, bob.id);

    assert!(matches!(
        repo.update_acronym(i64::MAX, new_acronym("A", "B", bob.id)).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        repo.update_acronym(created.id, new_acronym("A", "B", Uuid::new_v4()))
            .await,
        Err(StoreError::ConstraintViolation(_))
    ));

    repo.delete_acronym(created.id).await.unwrap();
    assert!(matches!(
        repo.get_acronym(created.id).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        repo.delete_acronym(created.id).await,
        Err(StoreError::NotFound { .. })
    ));
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_exact_search() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, "search").await;

    let marker = format!("ZZ{}", Uuid::new_v4().simple());
    let created = repo
        .create_acronym(new_acronym(&marker, "Rolling On the Floor Laughing", user.id))
        .await
        .unwrap();

    assert_eq!(repo.search_acronyms(&marker).await.unwrap(), vec![created]);
    assert!(repo.search_acronyms(&marker[..10]).await.unwrap().is_empty());
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_pivots_and_cascades() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, "tagger").await;

    let acronym = repo
        .create_acronym(new_acronym("TIL", "Today I Learned", user.id))
        .await
        .unwrap();
    let category = repo.create_category("Internet".to_string()).await.unwrap();

    let first = relations::tag(&repo, &acronym, &category).await.unwrap();
    let second = relations::tag(&repo, &acronym, &category).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(repo.get_pivots_for_acronym(acronym.id).await.unwrap().len(), 2);
    assert_eq!(
        relations::categories_of(&repo, &acronym).await.unwrap(),
        vec![category.clone()]
    );

    repo.delete_pivot(first.id).await.unwrap();
    assert_eq!(repo.get_pivot(second.id).await.unwrap(), second);

    repo.delete_category(category.id).await.unwrap();
    assert!(matches!(
        repo.get_pivot(second.id).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(relations::categories_of(&repo, &acronym).await.unwrap().is_empty());
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_deleting_user_keeps_acronyms_and_drops_tokens() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, "leaver").await;

    let acronym = repo
        .create_acronym(new_acronym("AFK", "Away From Keyboard", user.id))
        .await
        .unwrap();
    let token = repo
        .create_token(Token {
            id: Uuid::new_v4(),
            value: format!("token-{}", Uuid::new_v4()),
            user_id: user.id,
            expires_at: Utc::now() + TimeDelta::hours(1),
        })
        .await
        .unwrap();

    repo.delete_user(user.id).await.unwrap();

    let orphan = repo.get_acronym(acronym.id).await.unwrap();
    assert_eq!(orphan.creator_id, user.id);
    assert!(matches!(
        relations::creator_of(&repo, &orphan).await,
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        repo.get_token(token.id).await,
        Err(StoreError::NotFound { .. })
    ));
}
