use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, StoreError},
    models::{Token, User},
    password,
    repository::{Repository, RepositoryState},
};

/// Identity
///
/// The user a request acts on behalf of, as resolved by token or session
/// authentication. Mutating commands take an `Identity` and use it for
/// attribution; request bodies never name a creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    user_id: Uuid,
}

impl Identity {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

/// Claims
///
/// Payload of an API token. `jti` is the id of the persisted [`Token`] row, so
/// a token stops working once its row is gone even if the signature is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the id of the token's owner.
    pub sub: Uuid,
    /// Token id: primary key of the `tokens` row.
    pub jti: Uuid,
    /// Expiration time (seconds since the epoch).
    pub exp: usize,
    /// Issued at (seconds since the epoch).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of a token-authenticated API request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub username: String,
}

impl AuthUser {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id)
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        AuthUser {
            id: user.id,
            name: user.name,
            username: user.username,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument on token-gated routes:
/// 1. Reads the `Authorization: Bearer <token>` header.
/// 2. Verifies the JWT signature and expiry.
/// 3. Loads the token row named by `jti` and checks it belongs to `sub`.
/// 4. Loads the owning user.
///
/// Rejection: `AppError::Unauthenticated` (401) on any failure, before the
/// handler body runs.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthenticated("missing bearer token".to_string()))?;

        let user = resolve_token(repo.as_ref(), &config, token).await?;
        Ok(AuthUser::from(user))
    }
}

/// Extracts the raw token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// resolve_token
///
/// Maps a presented token string to exactly one user, or fails with
/// `Unauthenticated`. Store failures other than `NotFound` stay internal
/// errors so an outage is not reported as bad credentials.
pub async fn resolve_token(
    store: &dyn Repository,
    config: &AppConfig,
    token: &str,
) -> Result<User, AppError> {
    let decoding_key = DecodingKey::from_secret(config.token_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| AppError::Unauthenticated(format!("token rejected: {e}")))?
        .claims;

    let stored = match store.get_token(claims.jti).await {
        Ok(stored) => stored,
        Err(StoreError::NotFound { .. }) => {
            return Err(AppError::Unauthenticated(format!(
                "token {} is not on record",
                claims.jti
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if stored.value != token || stored.user_id != claims.sub {
        return Err(AppError::Unauthenticated(format!(
            "token {} does not belong to its subject",
            claims.jti
        )));
    }

    match store.get_user(claims.sub).await {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound { .. }) => Err(AppError::Unauthenticated(format!(
            "token owner {} no longer exists",
            claims.sub
        ))),
        Err(e) => Err(e.into()),
    }
}

/// issue_token
///
/// Signs a new token for `user` and persists it. The returned `value` is what
/// the client sends back as its bearer credential.
pub async fn issue_token(
    store: &dyn Repository,
    config: &AppConfig,
    user: &User,
) -> Result<Token, AppError> {
    let now = Utc::now();
    let expires_at = TimeDelta::try_seconds(config.token_ttl_secs)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal("token lifetime out of range".to_string()))?;

    let id = Uuid::new_v4();
    let claims = Claims {
        sub: user.id,
        jti: id,
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };

    let encoding_key = EncodingKey::from_secret(config.token_secret.as_bytes());
    let value = encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    let token = store
        .create_token(Token {
            id,
            value,
            user_id: user.id,
            expires_at,
        })
        .await?;

    tracing::info!(user_id = %user.id, token_id = %token.id, "issued api token");
    Ok(token)
}

/// authenticate_credentials
///
/// Verifies a login name and password against the stored hash. Unknown users
/// and wrong passwords fail identically. Hash verification runs on the
/// blocking pool.
pub async fn authenticate_credentials(
    store: &dyn Repository,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = match store.get_user_by_username(username).await {
        Ok(user) => user,
        Err(StoreError::NotFound { .. }) => {
            return Err(AppError::Unauthenticated(format!(
                "unknown user {username}"
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let candidate = password.to_owned();
    let stored_hash = user.password_hash.clone();
    let verified =
        tokio::task::spawn_blocking(move || password::verify_password(&candidate, &stored_hash))
            .await
            .map_err(|e| AppError::Internal(format!("password verification aborted: {e}")))?;

    if verified {
        Ok(user)
    } else {
        Err(AppError::Unauthenticated(format!(
            "wrong password for {username}"
        )))
    }
}
