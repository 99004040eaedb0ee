//! Browser sessions for the web surface.
//!
//! Sessions live server-side in a [`SessionStore`]; the browser only holds an
//! opaque session id in an HttpOnly cookie. A request is either `Anonymous`
//! or `Authenticated` as some user; nothing in between.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::{
    auth::{self, Identity},
    error::AppError,
    models::User,
    repository::{Repository, RepositoryState},
};

pub const SESSION_COOKIE_NAME: &str = "til_session";

/// Where gated pages send anonymous visitors.
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone)]
pub struct SessionData {
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// SessionState
///
/// What a request's session cookie resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Uuid),
}

/// SessionStore
///
/// In-memory session table keyed by session id. Entries older than the
/// configured lifetime are treated as absent and dropped on access.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    ttl: TimeDelta,
}

impl SessionStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl: TimeDelta::try_seconds(ttl_secs).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Starts a session for `user_id` and returns its id. Expired entries are
    /// swept first, so abandoned sessions don't accumulate.
    pub fn create(&self, user_id: Uuid) -> String {
        self.purge_expired();
        let session_id = Uuid::new_v4().simple().to_string();
        let data = SessionData {
            user_id,
            created_at: Utc::now(),
        };

        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session_id.clone(), data);
        }

        session_id
    }

    pub fn get(&self, session_id: &str) -> Option<SessionData> {
        let data = self.sessions.read().ok()?.get(session_id).cloned()?;
        if self.is_expired(&data) {
            self.destroy(session_id);
            return None;
        }
        Some(data)
    }

    pub fn destroy(&self, session_id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(session_id);
        }
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        let now = Utc::now();
        let ttl = self.ttl;
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.retain(|_, data| now.signed_duration_since(data.created_at) < ttl);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, data: &SessionData) -> bool {
        Utc::now().signed_duration_since(data.created_at) >= self.ttl
    }
}

/// Resolves the session cookie in `jar`, if any, against the store.
pub fn session_state(jar: &CookieJar, sessions: &SessionStore) -> SessionState {
    jar.get(SESSION_COOKIE_NAME)
        .and_then(|cookie| sessions.get(cookie.value()))
        .map(|data| SessionState::Authenticated(data.user_id))
        .unwrap_or(SessionState::Anonymous)
}

pub fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// log_in
///
/// Verifies the credentials and, on success, binds a new server-side session
/// to the user and adds its cookie to `jar`. On failure nothing changes.
pub async fn log_in(
    store: &dyn Repository,
    sessions: &SessionStore,
    jar: CookieJar,
    username: &str,
    password: &str,
    secure_cookie: bool,
) -> Result<(User, CookieJar), AppError> {
    let user = auth::authenticate_credentials(store, username, password).await?;
    let session_id = sessions.create(user.id);
    tracing::info!(user_id = %user.id, "web session established");
    Ok((user, jar.add(session_cookie(session_id, secure_cookie))))
}

/// Ends the session named by the cookie in `jar` and clears the cookie.
pub fn log_out(sessions: &SessionStore, jar: CookieJar) -> CookieJar {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        sessions.destroy(cookie.value());
    }
    let mut removal = Cookie::from(SESSION_COOKIE_NAME);
    removal.set_path("/");
    jar.remove(removal)
}

/// SessionUser
///
/// The resolved identity of a session-authenticated web request. Extraction
/// fails with a redirect to the login page, which is the only signal an
/// anonymous visitor gets.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub username: String,
}

impl SessionUser {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id)
    }
}

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    SessionStore: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let sessions = SessionStore::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let user_id = match session_state(&jar, &sessions) {
            SessionState::Authenticated(user_id) => user_id,
            SessionState::Anonymous => return Err(Redirect::to(LOGIN_PATH)),
        };

        match repo.get_user(user_id).await {
            Ok(user) => Ok(SessionUser {
                id: user.id,
                name: user.name,
                username: user.username,
            }),
            Err(e) => {
                // The user behind the session is gone (or unreachable); start over.
                tracing::warn!(%user_id, "session user could not be loaded: {}", e);
                if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
                    sessions.destroy(cookie.value());
                }
                Err(Redirect::to(LOGIN_PATH))
            }
        }
    }
}
