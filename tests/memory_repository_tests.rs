use chrono::{TimeDelta, Utc};
use til_glossary::{
    MemoryRepository,
    error::StoreError,
    models::{NewAcronym, NewUser, Token, User},
    relations,
    repository::Repository,
};
use uuid::Uuid;

// --- Fixtures ---

async fn create_test_user(repo: &MemoryRepository, username: &str) -> User {
    repo.create_user(NewUser {
        name: format!("Test {username}"),
        username: username.to_string(),
        password_hash: "not-a-real-hash".to_string(),
    })
    .await
    .unwrap()
}

fn new_acronym(short: &str, long: &str, creator_id: Uuid) -> NewAcronym {
    NewAcronym {
        short: short.to_string(),
        long: long.to_string(),
        creator_id,
    }
}

// --- Users ---

#[tokio::test]
async fn test_create_and_fetch_user() {
    let repo = MemoryRepository::new();
    let user = create_test_user(&repo, "jane").await;

    assert_eq!(repo.get_user(user.id).await.unwrap(), user);
    assert_eq!(repo.get_user_by_username("jane").await.unwrap(), user);
    assert!(matches!(
        repo.get_user(Uuid::new_v4()).await,
        Err(StoreError::NotFound { entity: "user", .. })
    ));
}

#[tokio::test]
async fn test_username_is_unique() {
    let repo = MemoryRepository::new();
    let jane = create_test_user(&repo, "jane").await;
    let other = create_test_user(&repo, "other").await;

    let duplicate = repo
        .create_user(NewUser {
            name: "Another Jane".to_string(),
            username: "jane".to_string(),
            password_hash: "x".to_string(),
        })
        .await;
    assert!(matches!(duplicate, Err(StoreError::ConstraintViolation(_))));

    let rename = repo
        .update_user(
            other.id,
            NewUser {
                name: other.name.clone(),
                username: "jane".to_string(),
                password_hash: other.password_hash.clone(),
            },
        )
        .await;
    assert!(matches!(rename, Err(StoreError::ConstraintViolation(_))));

    // Keeping one's own username is not a conflict.
    let same = repo
        .update_user(
            jane.id,
            NewUser {
                name: "Jane Doe".to_string(),
                username: "jane".to_string(),
                password_hash: jane.password_hash.clone(),
            },
        )
        .await
        .unwrap();
    assert_eq!(same.name, "Jane Doe");
    assert_eq!(repo.get_all_users().await.unwrap().len(), 2);
}

// --- Acronyms ---

#[tokio::test]
async fn test_acronym_requires_existing_creator() {
    let repo = MemoryRepository::new();

    let result = repo
        .create_acronym(new_acronym("OMG", "Oh My God", Uuid::new_v4()))
        .await;

    assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    assert!(repo.get_all_acronyms().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_acronym_crud() {
    let repo = MemoryRepository::new();
    let jane = create_test_user(&repo, "jane").await;

    let first = repo
        .create_acronym(new_acronym("OMG", "Oh My God", jane.id))
        .await
        .unwrap();
    let second = repo
        .create_acronym(new_acronym("BRB", "Be Right Back", jane.id))
        .await
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(repo.get_acronym(first.id).await.unwrap(), first);

    let updated = repo
        .update_acronym(first.id, new_acronym("OMG", "Oh My Gosh", jane.id))
        .await
        .unwrap();
    assert_eq!(updated.id, first.id);
    assert_eq!(updated.long, "Oh My Gosh");

    let missing = repo
        .update_acronym(999, new_acronym("X", "Y", jane.id))
        .await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));

    let bad_creator = repo
        .update_acronym(first.id, new_acronym("OMG", "Oh My God", Uuid::new_v4()))
        .await;
    assert!(matches!(bad_creator, Err(StoreError::ConstraintViolation(_))));

    repo.delete_acronym(first.id).await.unwrap();
    assert!(matches!(
        repo.delete_acronym(first.id).await,
        Err(StoreError::NotFound { .. })
    ));
    assert_eq!(repo.get_all_acronyms().await.unwrap(), vec![second]);
}

#[tokio::test]
async fn test_search_matches_whole_fields_only() {
    let repo = MemoryRepository::new();
    let jane = create_test_user(&repo, "jane").await;
    repo.create_acronym(new_acronym("ROFL", "Rolling On the Floor Laughing", jane.id))
        .await
        .unwrap();

    assert_eq!(repo.search_acronyms("ROFL").await.unwrap().len(), 1);
    assert_eq!(
        repo.search_acronyms("Rolling On the Floor Laughing")
            .await
            .unwrap()
            .len(),
        1
    );
    assert!(repo.search_acronyms("Floor").await.unwrap().is_empty());
    assert!(repo.search_acronyms("rofl").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleting_user_orphans_acronyms() {
    let repo = MemoryRepository::new();
    let jane = create_test_user(&repo, "jane").await;
    let acronym = repo
        .create_acronym(new_acronym("IRL", "In Real Life", jane.id))
        .await
        .unwrap();

    repo.delete_user(jane.id).await.unwrap();

    let orphan = repo.get_acronym(acronym.id).await.unwrap();
    assert_eq!(orphan.creator_id, jane.id);
    assert!(matches!(
        relations::creator_of(&repo, &orphan).await,
        Err(StoreError::NotFound { entity: "user", .. })
    ));
}

// --- Categories & Pivots ---

#[tokio::test]
async fn test_duplicate_pivots_are_independent() {
    let repo = MemoryRepository::new();
    let jane = create_test_user(&repo, "jane").await;
    let acronym = repo
        .create_acronym(new_acronym("TIL", "Today I Learned", jane.id))
        .await
        .unwrap();
    let category = repo.create_category("Internet".to_string()).await.unwrap();

    let first = relations::tag(&repo, &acronym, &category).await.unwrap();
    let second = relations::tag(&repo, &acronym, &category).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(first.acronym_id, acronym.id);
    assert_eq!(first.category_id, category.id);

    assert_eq!(
        relations::categories_of(&repo, &acronym).await.unwrap(),
        vec![category.clone()]
    );

    repo.delete_pivot(first.id).await.unwrap();
    assert_eq!(repo.get_pivot(second.id).await.unwrap(), second);
    assert_eq!(
        relations::acronyms_in(&repo, &category).await.unwrap(),
        vec![acronym]
    );

    repo.delete_pivot(second.id).await.unwrap();
    assert!(relations::acronyms_in(&repo, &category).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pivot_requires_both_ends() {
    let repo = MemoryRepository::new();
    let jane = create_test_user(&repo, "jane").await;
    let acronym = repo
        .create_acronym(new_acronym("TIL", "Today I Learned", jane.id))
        .await
        .unwrap();
    let category = repo.create_category("Internet".to_string()).await.unwrap();

    assert!(matches!(
        repo.create_pivot(acronym.id, 999).await,
        Err(StoreError::ConstraintViolation(_))
    ));
    assert!(matches!(
        repo.create_pivot(999, category.id).await,
        Err(StoreError::ConstraintViolation(_))
    ));
}

#[tokio::test]
async fn test_deleting_acronym_or_category_removes_pivots() {
    let repo = MemoryRepository::new();
    let jane = create_test_user(&repo, "jane").await;
    let kept = repo
        .create_acronym(new_acronym("TIL", "Today I Learned", jane.id))
        .await
        .unwrap();
    let doomed = repo
        .create_acronym(new_acronym("AFAIK", "As Far As I Know", jane.id))
        .await
        .unwrap();
    let internet = repo.create_category("Internet".to_string()).await.unwrap();
    let slang = repo.create_category("Slang".to_string()).await.unwrap();

    relations::tag(&repo, &kept, &internet).await.unwrap();
    relations::tag(&repo, &kept, &slang).await.unwrap();
    let gone = relations::tag(&repo, &doomed, &internet).await.unwrap();

    repo.delete_acronym(doomed.id).await.unwrap();
    assert!(matches!(
        repo.get_pivot(gone.id).await,
        Err(StoreError::NotFound { .. })
    ));
    assert_eq!(
        relations::acronyms_in(&repo, &internet).await.unwrap(),
        vec![kept.clone()]
    );

    repo.delete_category(slang.id).await.unwrap();
    assert_eq!(
        relations::categories_of(&repo, &kept).await.unwrap(),
        vec![internet.clone()]
    );

    let renamed = repo
        .update_category(internet.id, "Web".to_string())
        .await
        .unwrap();
    assert_eq!(renamed.name, "Web");
    assert!(matches!(
        repo.update_category(slang.id, "Gone".to_string()).await,
        Err(StoreError::NotFound { entity: "category", .. })
    ));
}

// --- Tokens ---

#[tokio::test]
async fn test_tokens_follow_their_owner() {
    let repo = MemoryRepository::new();
    let jane = create_test_user(&repo, "jane").await;

    let token = Token {
        id: Uuid::new_v4(),
        value: "opaque-token-value".to_string(),
        user_id: jane.id,
        expires_at: Utc::now() + TimeDelta::hours(1),
    };
    repo.create_token(token.clone()).await.unwrap();
    assert_eq!(repo.get_token(token.id).await.unwrap(), token);

    let orphan = Token {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        value: "another-value".to_string(),
        ..token.clone()
    };
    assert!(matches!(
        repo.create_token(orphan).await,
        Err(StoreError::ConstraintViolation(_))
    ));

    repo.delete_user(jane.id).await.unwrap();
    assert!(matches!(
        repo.get_token(token.id).await,
        Err(StoreError::NotFound { .. })
    ));
}
