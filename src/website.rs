//! Server-rendered pages.
//!
//! Handlers here gather a page context from the glossary surface and hand it
//! to the [`ViewRenderer`](crate::views::ViewRenderer). Identity comes from
//! the browser session, never from a bearer token.

use axum::{
    Form,
    extract::{Path, Query, State, rejection::FormRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, StoreError},
    glossary,
    models::AcronymInput,
    relations,
    session::{self, LOGIN_PATH, SessionState, SessionUser},
    views::{
        AcronymContext, AcronymFormContext, AllCategoriesContext, AllUsersContext,
        CategoryContext, IndexContext, LoginContext, UserContext, escape_html, non_empty,
        render_page,
    },
};

/// WebError
///
/// The page-level counterpart of [`AppError`]. Browsers get an HTML error
/// page instead of a JSON envelope, and an unauthenticated request is sent to
/// the login page.
#[derive(Debug)]
pub struct WebError(pub AppError);

impl From<AppError> for WebError {
    fn from(err: AppError) -> Self {
        WebError(err)
    }
}

impl From<StoreError> for WebError {
    fn from(err: StoreError) -> Self {
        WebError(err.into())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status == StatusCode::UNAUTHORIZED {
            return Redirect::to(LOGIN_PATH).into_response();
        }

        if status.is_server_error() {
            tracing::error!("page failed: {}", self.0);
        } else {
            tracing::debug!("page rejected: {}", self.0);
        }

        let body = format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{status} | Acronyms</title></head>\n\
             <body>\n<h1>{status}</h1>\n<p>{}</p>\n</body>\n</html>\n",
            escape_html(&self.0.reason()),
        );
        (status, Html(body)).into_response()
    }
}

type PageResult = Result<Html<String>, WebError>;

fn form_body<T>(form: Result<Form<T>, FormRejection>) -> Result<T, WebError> {
    form.map(|Form(body)| body)
        .map_err(|rejection| WebError(AppError::Validation(rejection.body_text())))
}

// --- Public Pages ---

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> PageResult {
    let acronyms = glossary::list_acronyms(state.repo.as_ref()).await?;
    let context = IndexContext {
        title: "Home page".to_string(),
        acronyms: non_empty(acronyms),
        user_logged_in: session::session_state(&jar, &state.sessions) != SessionState::Anonymous,
    };
    Ok(render_page(state.views.as_ref(), "index", &context)?)
}

/// Acronym detail. A creator that has since been deleted is shown as absent
/// rather than failing the page.
pub async fn acronym_page(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    let store = state.repo.as_ref();
    let acronym = store.get_acronym(id).await?;

    let creator = match relations::creator_of(store, &acronym).await {
        Ok(user) => Some(user.into()),
        Err(StoreError::NotFound { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    let categories = relations::categories_of(store, &acronym).await?;

    let context = AcronymContext {
        title: acronym.long.clone(),
        acronym,
        creator,
        categories: non_empty(categories),
    };
    Ok(render_page(state.views.as_ref(), "acronym", &context)?)
}

pub async fn all_users_page(State(state): State<AppState>) -> PageResult {
    let users = glossary::list_users(state.repo.as_ref()).await?;
    let context = AllUsersContext {
        title: "All Users".to_string(),
        users: non_empty(users),
    };
    Ok(render_page(state.views.as_ref(), "allUsers", &context)?)
}

pub async fn user_page(State(state): State<AppState>, Path(id): Path<Uuid>) -> PageResult {
    let store = state.repo.as_ref();
    let user = glossary::get_user(store, id).await?;
    let acronyms = glossary::get_acronyms_of_user(store, id).await?;
    let context = UserContext {
        title: user.name.clone(),
        user,
        acronyms: non_empty(acronyms),
    };
    Ok(render_page(state.views.as_ref(), "user", &context)?)
}

pub async fn all_categories_page(State(state): State<AppState>) -> PageResult {
    let categories = glossary::list_categories(state.repo.as_ref()).await?;
    let context = AllCategoriesContext {
        title: "All Categories".to_string(),
        categories: non_empty(categories),
    };
    Ok(render_page(state.views.as_ref(), "allCategories", &context)?)
}

pub async fn category_page(State(state): State<AppState>, Path(id): Path<i64>) -> PageResult {
    let store = state.repo.as_ref();
    let category = glossary::get_category(store, id).await?;
    let acronyms = glossary::get_acronyms_of_category(store, id).await?;
    let context = CategoryContext {
        title: category.name.clone(),
        category,
        acronyms: non_empty(acronyms),
    };
    Ok(render_page(state.views.as_ref(), "category", &context)?)
}

// --- Login / Logout ---

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login_page(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> PageResult {
    let context = LoginContext {
        title: "Log In".to_string(),
        login_error: query.error.unwrap_or(false),
    };
    Ok(render_page(state.views.as_ref(), "login", &context)?)
}

/// Bad credentials send the browser back to the login page with the error
/// flag set; nothing about which part was wrong is revealed.
pub async fn login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, WebError> {
    let form = form_body(form)?;
    let outcome = session::log_in(
        state.repo.as_ref(),
        &state.sessions,
        jar.clone(),
        &form.username,
        &form.password,
        state.config.cookie_secure,
    )
    .await;

    match outcome {
        Ok((_, jar)) => Ok((jar, Redirect::to("/")).into_response()),
        Err(AppError::Unauthenticated(reason)) => {
            tracing::debug!("web login rejected: {}", reason);
            Ok((jar, Redirect::to("/login?error=true")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    (session::log_out(&state.sessions, jar), Redirect::to("/"))
}

// --- Session-Gated Pages ---

pub async fn create_acronym_page(_user: SessionUser, State(state): State<AppState>) -> PageResult {
    let context = AcronymFormContext {
        title: "Create An Acronym".to_string(),
        acronym: None,
        editing: false,
    };
    Ok(render_page(state.views.as_ref(), "createAcronym", &context)?)
}

pub async fn create_acronym_post(
    user: SessionUser,
    State(state): State<AppState>,
    form: Result<Form<AcronymInput>, FormRejection>,
) -> Result<Redirect, WebError> {
    let input = form_body(form)?;
    let acronym = glossary::create_acronym(state.repo.as_ref(), input, user.identity()).await?;
    Ok(Redirect::to(&format!("/acronyms/{}", acronym.id)))
}

pub async fn edit_acronym_page(
    _user: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> PageResult {
    let acronym = glossary::get_acronym(state.repo.as_ref(), id).await?;
    let context = AcronymFormContext {
        title: "Edit Acronym".to_string(),
        acronym: Some(acronym),
        editing: true,
    };
    Ok(render_page(state.views.as_ref(), "createAcronym", &context)?)
}

pub async fn edit_acronym_post(
    user: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    form: Result<Form<AcronymInput>, FormRejection>,
) -> Result<Redirect, WebError> {
    let input = form_body(form)?;
    let acronym = glossary::update_acronym(state.repo.as_ref(), id, input, user.identity()).await?;
    Ok(Redirect::to(&format!("/acronyms/{}", acronym.id)))
}

pub async fn delete_acronym_post(
    user: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect, WebError> {
    glossary::delete_acronym(state.repo.as_ref(), id, user.identity()).await?;
    Ok(Redirect::to("/"))
}
