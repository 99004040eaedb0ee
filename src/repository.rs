use crate::error::StoreError;
use crate::models::{
    Acronym, AcronymCategoryPivot, Category, NewAcronym, NewUser, Token, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The Entity Store contract: CRUD primitives per entity type plus the
/// relational queries the relationship resolver is built on. Handlers and the
/// command layer only ever see `Arc<dyn Repository>`, so the Postgres and
/// in-memory implementations are interchangeable.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn get_user(&self, id: Uuid) -> Result<User, StoreError>;
    async fn get_user_by_username(&self, username: &str) -> Result<User, StoreError>;
    async fn get_all_users(&self) -> Result<Vec<User>, StoreError>;
    async fn update_user(&self, id: Uuid, user: NewUser) -> Result<User, StoreError>;
    // Does not touch the user's acronyms; their creator reference is left dangling.
    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

    // --- Acronyms ---
    // Fails with ConstraintViolation when creator_id names no user.
    async fn create_acronym(&self, acronym: NewAcronym) -> Result<Acronym, StoreError>;
    async fn get_acronym(&self, id: i64) -> Result<Acronym, StoreError>;
    async fn get_all_acronyms(&self) -> Result<Vec<Acronym>, StoreError>;
    // Exact match on either the short or the long form.
    async fn search_acronyms(&self, term: &str) -> Result<Vec<Acronym>, StoreError>;
    async fn update_acronym(&self, id: i64, acronym: NewAcronym) -> Result<Acronym, StoreError>;
    // Removes the acronym's pivot rows along with it.
    async fn delete_acronym(&self, id: i64) -> Result<(), StoreError>;
    async fn get_acronyms_by_creator(&self, user_id: Uuid) -> Result<Vec<Acronym>, StoreError>;

    // --- Categories ---
    async fn create_category(&self, name: String) -> Result<Category, StoreError>;
    async fn get_category(&self, id: i64) -> Result<Category, StoreError>;
    async fn get_all_categories(&self) -> Result<Vec<Category>, StoreError>;
    async fn update_category(&self, id: i64, name: String) -> Result<Category, StoreError>;
    // Removes the category's pivot rows along with it.
    async fn delete_category(&self, id: i64) -> Result<(), StoreError>;

    // --- Pivots ---
    // Not idempotent: every call inserts a fresh row.
    async fn create_pivot(
        &self,
        acronym_id: i64,
        category_id: i64,
    ) -> Result<AcronymCategoryPivot, StoreError>;
    async fn get_pivot(&self, id: Uuid) -> Result<AcronymCategoryPivot, StoreError>;
    async fn get_pivots_for_acronym(
        &self,
        acronym_id: i64,
    ) -> Result<Vec<AcronymCategoryPivot>, StoreError>;
    async fn delete_pivot(&self, id: Uuid) -> Result<(), StoreError>;
    // Distinct categories reachable through the acronym's pivots.
    async fn get_categories_for_acronym(&self, acronym_id: i64)
    -> Result<Vec<Category>, StoreError>;
    // Distinct acronyms reachable through the category's pivots.
    async fn get_acronyms_for_category(&self, category_id: i64)
    -> Result<Vec<Acronym>, StoreError>;

    // --- Tokens ---
    async fn create_token(&self, token: Token) -> Result<Token, StoreError>;
    async fn get_token(&self, id: Uuid) -> Result<Token, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the store handle across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const ACRONYM_COLUMNS: &str = "id, short, long, creator_id";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. All statements are
/// parameterized; multi-statement writes run inside a transaction.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, username, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, username, password_hash",
        )
        .bind(Uuid::new_v4())
        .bind(user.name)
        .bind(user.username)
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, username, password_hash FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT id, name, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("user", username))
    }

    async fn get_all_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, username, password_hash FROM users ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET name = $2, username = $3, password_hash = $4 WHERE id = $1 \
             RETURNING id, name, username, password_hash",
        )
        .bind(id)
        .bind(user.name)
        .bind(user.username)
        .bind(user.password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("user", id))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", id));
        }
        Ok(())
    }

    /// create_acronym
    ///
    /// `creator_id` carries no database foreign key (acronyms outlive their
    /// creators), so existence is checked in the same statement: the insert
    /// only happens when the user row is present.
    async fn create_acronym(&self, acronym: NewAcronym) -> Result<Acronym, StoreError> {
        let query = format!(
            "INSERT INTO acronyms (short, long, creator_id) \
             SELECT $1, $2, $3 WHERE EXISTS (SELECT 1 FROM users WHERE id = $3) \
             RETURNING {ACRONYM_COLUMNS}"
        );
        sqlx::query_as::<_, Acronym>(&query)
            .bind(&acronym.short)
            .bind(&acronym.long)
            .bind(acronym.creator_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                StoreError::ConstraintViolation(format!(
                    "creator {} does not exist",
                    acronym.creator_id
                ))
            })
    }

    async fn get_acronym(&self, id: i64) -> Result<Acronym, StoreError> {
        let query = format!("SELECT {ACRONYM_COLUMNS} FROM acronyms WHERE id = $1");
        sqlx::query_as::<_, Acronym>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("acronym", id))
    }

    async fn get_all_acronyms(&self) -> Result<Vec<Acronym>, StoreError> {
        let query = format!("SELECT {ACRONYM_COLUMNS} FROM acronyms ORDER BY id");
        let acronyms = sqlx::query_as::<_, Acronym>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(acronyms)
    }

    async fn search_acronyms(&self, term: &str) -> Result<Vec<Acronym>, StoreError> {
        let query = format!(
            "SELECT {ACRONYM_COLUMNS} FROM acronyms WHERE short = $1 OR long = $1 ORDER BY id"
        );
        let acronyms = sqlx::query_as::<_, Acronym>(&query)
            .bind(term)
            .fetch_all(&self.pool)
            .await?;
        Ok(acronyms)
    }

    /// update_acronym
    ///
    /// Full replace guarded by the same creator existence check as the
    /// insert. When nothing is updated, a follow-up lookup inside the
    /// transaction tells a missing acronym apart from a missing creator.
    async fn update_acronym(&self, id: i64, acronym: NewAcronym) -> Result<Acronym, StoreError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            "UPDATE acronyms SET short = $2, long = $3, creator_id = $4 \
             WHERE id = $1 AND EXISTS (SELECT 1 FROM users WHERE id = $4) \
             RETURNING {ACRONYM_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Acronym>(&query)
            .bind(id)
            .bind(&acronym.short)
            .bind(&acronym.long)
            .bind(acronym.creator_id)
            .fetch_optional(&mut *tx)
            .await?;

        let result = match updated {
            Some(row) => Ok(row),
            None => {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM acronyms WHERE id = $1)")
                        .bind(id)
                        .fetch_one(&mut *tx)
                        .await?;
                if exists {
                    Err(StoreError::ConstraintViolation(format!(
                        "creator {} does not exist",
                        acronym.creator_id
                    )))
                } else {
                    Err(StoreError::not_found("acronym", id))
                }
            }
        };

        tx.commit().await?;
        result
    }

    async fn delete_acronym(&self, id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM acronym_category_pivots WHERE acronym_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM acronyms WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StoreError::not_found("acronym", id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_acronyms_by_creator(&self, user_id: Uuid) -> Result<Vec<Acronym>, StoreError> {
        let query = format!("SELECT {ACRONYM_COLUMNS} FROM acronyms WHERE creator_id = $1 ORDER BY id");
        let acronyms = sqlx::query_as::<_, Acronym>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(acronyms)
    }

    async fn create_category(&self, name: String) -> Result<Category, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_category(&self, id: i64) -> Result<Category, StoreError> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found("category", id))
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>, StoreError> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    async fn update_category(&self, id: i64, name: String) -> Result<Category, StoreError> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("category", id))
    }

    async fn delete_category(&self, id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM acronym_category_pivots WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category", id));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn create_pivot(
        &self,
        acronym_id: i64,
        category_id: i64,
    ) -> Result<AcronymCategoryPivot, StoreError> {
        // Both columns are real foreign keys, so a dangling id is a ConstraintViolation.
        let pivot = sqlx::query_as::<_, AcronymCategoryPivot>(
            "INSERT INTO acronym_category_pivots (id, acronym_id, category_id) \
             VALUES ($1, $2, $3) RETURNING id, acronym_id, category_id",
        )
        .bind(Uuid::new_v4())
        .bind(acronym_id)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(pivot)
    }

    async fn get_pivot(&self, id: Uuid) -> Result<AcronymCategoryPivot, StoreError> {
        sqlx::query_as::<_, AcronymCategoryPivot>(
            "SELECT id, acronym_id, category_id FROM acronym_category_pivots WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("pivot", id))
    }

    async fn get_pivots_for_acronym(
        &self,
        acronym_id: i64,
    ) -> Result<Vec<AcronymCategoryPivot>, StoreError> {
        let pivots = sqlx::query_as::<_, AcronymCategoryPivot>(
            "SELECT id, acronym_id, category_id FROM acronym_category_pivots WHERE acronym_id = $1",
        )
        .bind(acronym_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(pivots)
    }

    async fn delete_pivot(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM acronym_category_pivots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("pivot", id));
        }
        Ok(())
    }

    async fn get_categories_for_acronym(
        &self,
        acronym_id: i64,
    ) -> Result<Vec<Category>, StoreError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT DISTINCT c.id, c.name
            FROM categories c
            JOIN acronym_category_pivots p ON p.category_id = c.id
            WHERE p.acronym_id = $1
            ORDER BY c.id
            "#,
        )
        .bind(acronym_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn get_acronyms_for_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<Acronym>, StoreError> {
        let acronyms = sqlx::query_as::<_, Acronym>(
            r#"
            SELECT DISTINCT a.id, a.short, a.long, a.creator_id
            FROM acronyms a
            JOIN acronym_category_pivots p ON p.acronym_id = a.id
            WHERE p.category_id = $1
            ORDER BY a.id
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(acronyms)
    }

    async fn create_token(&self, token: Token) -> Result<Token, StoreError> {
        let created = sqlx::query_as::<_, Token>(
            "INSERT INTO tokens (id, value, user_id, expires_at) VALUES ($1, $2, $3, $4) \
             RETURNING id, value, user_id, expires_at",
        )
        .bind(token.id)
        .bind(token.value)
        .bind(token.user_id)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn get_token(&self, id: Uuid) -> Result<Token, StoreError> {
        sqlx::query_as::<_, Token>(
            "SELECT id, value, user_id, expires_at FROM tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("token", id))
    }
}
