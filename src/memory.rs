use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Acronym, AcronymCategoryPivot, Category, NewAcronym, NewUser, Token, User,
};
use crate::repository::Repository;

/// MemoryRepository
///
/// An in-process `Repository` used for local runs without `DATABASE_URL` and
/// for tests. It enforces the same rules as the Postgres schema: unique login
/// names, creator existence at write time, foreign keys on pivots and tokens,
/// pivot cleanup when an acronym or category goes away, and no cascade from
/// users to acronyms.
///
/// A single lock guards all tables, so each operation is atomic.
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    acronyms: BTreeMap<i64, Acronym>,
    categories: BTreeMap<i64, Category>,
    // Insertion-ordered; duplicates of the same pair are allowed.
    pivots: Vec<AcronymCategoryPivot>,
    tokens: HashMap<Uuid, Token>,
    next_acronym_id: i64,
    next_category_id: i64,
}

impl MemoryState {
    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn require_creator(&self, creator_id: Uuid) -> Result<(), StoreError> {
        if self.users.contains_key(&creator_id) {
            Ok(())
        } else {
            Err(StoreError::ConstraintViolation(format!(
                "creator {creator_id} does not exist"
            )))
        }
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.username_taken(&user.username, None) {
            return Err(StoreError::ConstraintViolation(format!(
                "username {} is already taken",
                user.username
            )));
        }
        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            username: user.username,
            password_hash: user.password_hash,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> Result<User, StoreError> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, StoreError> {
        self.state
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", username))
    }

    async fn get_all_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.state.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Err(StoreError::not_found("user", id));
        }
        if state.username_taken(&user.username, Some(id)) {
            return Err(StoreError::ConstraintViolation(format!(
                "username {} is already taken",
                user.username
            )));
        }
        let updated = User {
            id,
            name: user.name,
            username: user.username,
            password_hash: user.password_hash,
        };
        state.users.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Err(StoreError::not_found("user", id));
        }
        // Tokens reference users with ON DELETE CASCADE; acronyms do not.
        state.tokens.retain(|_, t| t.user_id != id);
        Ok(())
    }

    async fn create_acronym(&self, acronym: NewAcronym) -> Result<Acronym, StoreError> {
        let mut state = self.state.write().await;
        state.require_creator(acronym.creator_id)?;
        state.next_acronym_id += 1;
        let created = Acronym {
            id: state.next_acronym_id,
            short: acronym.short,
            long: acronym.long,
            creator_id: acronym.creator_id,
        };
        state.acronyms.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_acronym(&self, id: i64) -> Result<Acronym, StoreError> {
        self.state
            .read()
            .await
            .acronyms
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("acronym", id))
    }

    async fn get_all_acronyms(&self) -> Result<Vec<Acronym>, StoreError> {
        Ok(self.state.read().await.acronyms.values().cloned().collect())
    }

    async fn search_acronyms(&self, term: &str) -> Result<Vec<Acronym>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .acronyms
            .values()
            .filter(|a| a.short == term || a.long == term)
            .cloned()
            .collect())
    }

    async fn update_acronym(&self, id: i64, acronym: NewAcronym) -> Result<Acronym, StoreError> {
        let mut state = self.state.write().await;
        if !state.acronyms.contains_key(&id) {
            return Err(StoreError::not_found("acronym", id));
        }
        state.require_creator(acronym.creator_id)?;
        let updated = Acronym {
            id,
            short: acronym.short,
            long: acronym.long,
            creator_id: acronym.creator_id,
        };
        state.acronyms.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_acronym(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.acronyms.remove(&id).is_none() {
            return Err(StoreError::not_found("acronym", id));
        }
        state.pivots.retain(|p| p.acronym_id != id);
        Ok(())
    }

    async fn get_acronyms_by_creator(&self, user_id: Uuid) -> Result<Vec<Acronym>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .acronyms
            .values()
            .filter(|a| a.creator_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_category(&self, name: String) -> Result<Category, StoreError> {
        let mut state = self.state.write().await;
        state.next_category_id += 1;
        let created = Category {
            id: state.next_category_id,
            name,
        };
        state.categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_category(&self, id: i64) -> Result<Category, StoreError> {
        self.state
            .read()
            .await
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("category", id))
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.state.read().await.categories.values().cloned().collect())
    }

    async fn update_category(&self, id: i64, name: String) -> Result<Category, StoreError> {
        let mut state = self.state.write().await;
        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("category", id))?;
        category.name = name;
        Ok(category.clone())
    }

    async fn delete_category(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.categories.remove(&id).is_none() {
            return Err(StoreError::not_found("category", id));
        }
        state.pivots.retain(|p| p.category_id != id);
        Ok(())
    }

    async fn create_pivot(
        &self,
        acronym_id: i64,
        category_id: i64,
    ) -> Result<AcronymCategoryPivot, StoreError> {
        let mut state = self.state.write().await;
        if !state.acronyms.contains_key(&acronym_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "acronym {acronym_id} does not exist"
            )));
        }
        if !state.categories.contains_key(&category_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "category {category_id} does not exist"
            )));
        }
        let pivot = AcronymCategoryPivot {
            id: Uuid::new_v4(),
            acronym_id,
            category_id,
        };
        state.pivots.push(pivot.clone());
        Ok(pivot)
    }

    async fn get_pivot(&self, id: Uuid) -> Result<AcronymCategoryPivot, StoreError> {
        self.state
            .read()
            .await
            .pivots
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("pivot", id))
    }

    async fn get_pivots_for_acronym(
        &self,
        acronym_id: i64,
    ) -> Result<Vec<AcronymCategoryPivot>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .pivots
            .iter()
            .filter(|p| p.acronym_id == acronym_id)
            .cloned()
            .collect())
    }

    async fn delete_pivot(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let before = state.pivots.len();
        state.pivots.retain(|p| p.id != id);
        if state.pivots.len() == before {
            return Err(StoreError::not_found("pivot", id));
        }
        Ok(())
    }

    async fn get_categories_for_acronym(
        &self,
        acronym_id: i64,
    ) -> Result<Vec<Category>, StoreError> {
        let state = self.state.read().await;
        let mut ids: Vec<i64> = state
            .pivots
            .iter()
            .filter(|p| p.acronym_id == acronym_id)
            .map(|p| p.category_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids
            .iter()
            .filter_map(|id| state.categories.get(id).cloned())
            .collect())
    }

    async fn get_acronyms_for_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<Acronym>, StoreError> {
        let state = self.state.read().await;
        let mut ids: Vec<i64> = state
            .pivots
            .iter()
            .filter(|p| p.category_id == category_id)
            .map(|p| p.acronym_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids
            .iter()
            .filter_map(|id| state.acronyms.get(id).cloned())
            .collect())
    }

    async fn create_token(&self, token: Token) -> Result<Token, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&token.user_id) {
            return Err(StoreError::ConstraintViolation(format!(
                "user {} does not exist",
                token.user_id
            )));
        }
        if state.tokens.values().any(|t| t.value == token.value) {
            return Err(StoreError::ConstraintViolation(
                "token value already exists".to_string(),
            ));
        }
        state.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn get_token(&self, id: Uuid) -> Result<Token, StoreError> {
        self.state
            .read()
            .await
            .tokens
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("token", id))
    }
}
