use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use til_glossary::{
    AppState, MemoryRepository, PlainHtmlRenderer, SessionStore,
    auth::{self, AuthUser, Claims},
    config::AppConfig,
    error::AppError,
    models::{NewUser, User},
    password,
    repository::Repository,
    session::{self, SESSION_COOKIE_NAME, SessionState, SessionUser},
};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_TOKEN_SECRET: &str = "test-secret-value-1234567890";

fn create_app_state(repo: Arc<MemoryRepository>) -> AppState {
    let config = AppConfig {
        token_secret: TEST_TOKEN_SECRET.to_string(),
        ..AppConfig::default()
    };

    AppState {
        repo,
        sessions: SessionStore::new(3600),
        views: Arc::new(PlainHtmlRenderer),
        config,
    }
}

async fn seed_user(repo: &MemoryRepository, username: &str, password: &str) -> User {
    repo.create_user(NewUser {
        name: format!("{username} tester"),
        username: username.to_string(),
        password_hash: password::hash_password(password).unwrap(),
    })
    .await
    .unwrap()
}

/// Signs arbitrary claims with `secret`, bypassing `issue_token`.
fn sign(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn parts_with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

// --- Token Authentication ---

#[tokio::test]
async fn test_auth_success_with_issued_token() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "jane", "secret").await;
    let app_state = create_app_state(repo.clone());

    let token = auth::issue_token(repo.as_ref(), &app_state.config, &user)
        .await
        .unwrap();
    assert_eq!(token.user_id, user.id);
    assert!(token.expires_at > Utc::now());

    let mut parts = parts_with_bearer(&token.value);
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .expect("issued token should authenticate");

    assert_eq!(auth_user.id, user.id);
    assert_eq!(auth_user.username, "jane");
    assert_eq!(auth_user.identity().user_id(), user.id);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Arc::new(MemoryRepository::new()));
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    let err = auth_user.unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
    assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_garbage_token() {
    let app_state = create_app_state(Arc::new(MemoryRepository::new()));
    let mut parts = parts_with_bearer("not-a-token");

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(auth_user, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_auth_failure_with_non_bearer_scheme() {
    let app_state = create_app_state(Arc::new(MemoryRepository::new()));
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_static("Basic amFuZTpzZWNyZXQ="),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(auth_user, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_auth_failure_with_expired_token() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "jane", "secret").await;
    let app_state = create_app_state(repo);

    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.id,
        jti: Uuid::new_v4(),
        iat: now - 7200,
        // Well past the default validation leeway.
        exp: now - 3600,
    };
    let mut parts = parts_with_bearer(&sign(&claims, TEST_TOKEN_SECRET));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(auth_user, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_auth_failure_with_foreign_signature() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "jane", "secret").await;
    let app_state = create_app_state(repo);

    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.id,
        jti: Uuid::new_v4(),
        iat: now,
        exp: now + 3600,
    };
    let mut parts = parts_with_bearer(&sign(&claims, "some-other-secret"));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(auth_user, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_auth_failure_with_unrecorded_token() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "jane", "secret").await;
    let app_state = create_app_state(repo);

    // Correctly signed, but no token row carries this jti.
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user.id,
        jti: Uuid::new_v4(),
        iat: now,
        exp: now + 3600,
    };
    let mut parts = parts_with_bearer(&sign(&claims, TEST_TOKEN_SECRET));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(auth_user, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_auth_failure_with_subject_swapped() {
    let repo = Arc::new(MemoryRepository::new());
    let jane = seed_user(&repo, "jane", "secret").await;
    let mallory = seed_user(&repo, "mallory", "secret").await;
    let app_state = create_app_state(repo.clone());

    let token = auth::issue_token(repo.as_ref(), &app_state.config, &jane)
        .await
        .unwrap();

    // Re-sign jane's token id under mallory's subject.
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: mallory.id,
        jti: token.id,
        iat: now,
        exp: now + 3600,
    };
    let mut parts = parts_with_bearer(&sign(&claims, TEST_TOKEN_SECRET));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(auth_user, Err(AppError::Unauthenticated(_))));
}

#[tokio::test]
async fn test_auth_failure_after_owner_deleted() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "jane", "secret").await;
    let app_state = create_app_state(repo.clone());

    let token = auth::issue_token(repo.as_ref(), &app_state.config, &user)
        .await
        .unwrap();
    repo.delete_user(user.id).await.unwrap();

    let mut parts = parts_with_bearer(&token.value);
    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(auth_user, Err(AppError::Unauthenticated(_))));
}

// --- Credential Verification ---

#[tokio::test]
async fn test_authenticate_credentials() {
    let repo = MemoryRepository::new();
    let user = seed_user(&repo, "jane", "secret").await;

    let ok = auth::authenticate_credentials(&repo, "jane", "secret")
        .await
        .unwrap();
    assert_eq!(ok.id, user.id);

    let wrong = auth::authenticate_credentials(&repo, "jane", "wrong").await;
    assert!(matches!(wrong, Err(AppError::Unauthenticated(_))));

    let unknown = auth::authenticate_credentials(&repo, "nobody", "secret").await;
    assert!(matches!(unknown, Err(AppError::Unauthenticated(_))));
}

// --- Browser Sessions ---

#[tokio::test]
async fn test_session_login_and_logout() {
    let repo = MemoryRepository::new();
    let user = seed_user(&repo, "jane", "secret").await;
    let sessions = SessionStore::new(3600);

    let (logged_in, jar) = session::log_in(
        &repo,
        &sessions,
        CookieJar::new(),
        "jane",
        "secret",
        false,
    )
    .await
    .unwrap();

    assert_eq!(logged_in.id, user.id);
    let cookie = jar.get(SESSION_COOKIE_NAME).expect("session cookie set");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(
        session::session_state(&jar, &sessions),
        SessionState::Authenticated(user.id)
    );
    assert_eq!(sessions.len(), 1);

    let jar = session::log_out(&sessions, jar);
    assert_eq!(session::session_state(&jar, &sessions), SessionState::Anonymous);
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_session_login_wrong_password() {
    let repo = MemoryRepository::new();
    seed_user(&repo, "jane", "secret").await;
    let sessions = SessionStore::new(3600);

    let result = session::log_in(
        &repo,
        &sessions,
        CookieJar::new(),
        "jane",
        "not-the-password",
        false,
    )
    .await;

    assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_session_expires() {
    let sessions = SessionStore::new(0);
    let session_id = sessions.create(Uuid::new_v4());

    assert!(sessions.get(&session_id).is_none());
    assert!(sessions.is_empty(), "expired session should be dropped on access");

    let other = sessions.create(Uuid::new_v4());
    sessions.purge_expired();
    assert!(sessions.get(&other).is_none());
}

#[tokio::test]
async fn test_session_user_extractor() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "jane", "secret").await;
    let app_state = create_app_state(repo);

    // Anonymous: redirected to the login page.
    let mut parts = get_request_parts(Method::GET, "/acronyms/create".parse().unwrap());
    let rejected = SessionUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err()
        .into_response();
    assert!(rejected.status().is_redirection());
    assert_eq!(rejected.headers()[header::LOCATION], "/login");

    // With a live session cookie.
    let session_id = app_state.sessions.create(user.id);
    let mut parts = get_request_parts(Method::GET, "/acronyms/create".parse().unwrap());
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_str(&format!("{SESSION_COOKIE_NAME}={session_id}")).unwrap(),
    );
    let session_user = SessionUser::from_request_parts(&mut parts, &app_state)
        .await
        .expect("live session should resolve");
    assert_eq!(session_user.id, user.id);
    assert_eq!(session_user.identity().user_id(), user.id);
}
