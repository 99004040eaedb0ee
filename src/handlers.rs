use crate::{
    AppState,
    auth::{self, AuthUser},
    error::AppError,
    glossary,
    models::{
        Acronym, AcronymInput, Category, CategoryInput, CreateUserRequest, PublicUser,
        SearchQuery, Token,
    },
};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
    typed_header::TypedHeaderRejection,
};
use uuid::Uuid;

/// Unwraps a JSON body, reporting malformed or incomplete payloads as a
/// validation failure (400) instead of axum's default rejection.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

/// Same for path segments, so `/api/acronyms/abc` answers with the JSON
/// error envelope.
fn path_param<T>(param: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    param
        .map(|Path(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

// --- Acronyms: Reads ---

/// get_acronyms
///
/// [Public Route] Lists every acronym. Order is not part of the contract.
#[utoipa::path(
    get,
    path = "/api/acronyms",
    responses((status = 200, description = "All acronyms", body = [Acronym]))
)]
pub async fn get_acronyms(State(state): State<AppState>) -> Result<Json<Vec<Acronym>>, AppError> {
    Ok(Json(glossary::list_acronyms(state.repo.as_ref()).await?))
}

/// get_acronym
///
/// [Public Route] Retrieves a single acronym by id.
#[utoipa::path(
    get,
    path = "/api/acronyms/{id}",
    params(("id" = i64, Path, description = "Acronym ID")),
    responses(
        (status = 200, description = "Found", body = Acronym),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_acronym(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Acronym>, AppError> {
    let id = path_param(id)?;
    Ok(Json(glossary::get_acronym(state.repo.as_ref(), id).await?))
}

/// search_acronyms
///
/// [Public Route] Exact-match search on the short or long form. A missing
/// `term` is a 400.
#[utoipa::path(
    get,
    path = "/api/acronyms/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matches", body = [Acronym]),
        (status = 400, description = "Missing search term")
    )
)]
pub async fn search_acronyms(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Acronym>>, AppError> {
    let matches = glossary::search_acronyms(state.repo.as_ref(), query.term.as_deref()).await?;
    Ok(Json(matches))
}

/// get_acronym_creator
///
/// [Public Route] The user recorded as the acronym's creator. 404 when either
/// the acronym or its creator no longer exists.
#[utoipa::path(
    get,
    path = "/api/acronyms/{id}/creator",
    params(("id" = i64, Path, description = "Acronym ID")),
    responses(
        (status = 200, description = "Creator", body = PublicUser),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_acronym_creator(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let id = path_param(id)?;
    Ok(Json(glossary::get_creator_of(state.repo.as_ref(), id).await?))
}

/// get_acronym_categories
///
/// [Public Route] Categories the acronym is tagged with.
#[utoipa::path(
    get,
    path = "/api/acronyms/{id}/categories",
    params(("id" = i64, Path, description = "Acronym ID")),
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn get_acronym_categories(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Category>>, AppError> {
    let id = path_param(id)?;
    Ok(Json(glossary::get_categories_of(state.repo.as_ref(), id).await?))
}

/// add_acronym_category
///
/// [Public Route] Tags an acronym with a category. Requires no token; calling
/// it twice links the pair twice.
#[utoipa::path(
    post,
    path = "/api/acronyms/{id}/category/{category_id}",
    params(
        ("id" = i64, Path, description = "Acronym ID"),
        ("category_id" = i64, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Tagged"),
        (status = 404, description = "Acronym or category not found")
    )
)]
pub async fn add_acronym_category(
    State(state): State<AppState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let (id, category_id) = path_param(ids)?;
    glossary::tag_acronym(state.repo.as_ref(), id, category_id).await?;
    Ok(StatusCode::OK)
}

// --- Acronyms: Commands ---

/// create_acronym
///
/// [Token Route] Creates an acronym attributed to the token's owner.
#[utoipa::path(
    post,
    path = "/api/acronyms",
    request_body = AcronymInput,
    responses(
        (status = 200, description = "Created", body = Acronym),
        (status = 400, description = "Invalid body"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn create_acronym(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<AcronymInput>, JsonRejection>,
) -> Result<Json<Acronym>, AppError> {
    let input = json_body(payload)?;
    let acronym = glossary::create_acronym(state.repo.as_ref(), input, user.identity()).await?;
    Ok(Json(acronym))
}

/// update_acronym
///
/// [Token Route] Replaces an acronym's forms. The token's owner becomes the
/// acronym's creator.
#[utoipa::path(
    put,
    path = "/api/acronyms/{id}",
    params(("id" = i64, Path, description = "Acronym ID")),
    request_body = AcronymInput,
    responses(
        (status = 200, description = "Updated", body = Acronym),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer" = []))
)]
pub async fn update_acronym(
    user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AcronymInput>, JsonRejection>,
) -> Result<Json<Acronym>, AppError> {
    let id = path_param(id)?;
    let input = json_body(payload)?;
    let acronym = glossary::update_acronym(state.repo.as_ref(), id, input, user.identity()).await?;
    Ok(Json(acronym))
}

/// delete_acronym
///
/// [Token Route] Deletes an acronym. There is no ownership check: any
/// authenticated user may delete any acronym.
#[utoipa::path(
    delete,
    path = "/api/acronyms/{id}",
    params(("id" = i64, Path, description = "Acronym ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_acronym(
    user: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = path_param(id)?;
    glossary::delete_acronym(state.repo.as_ref(), id, user.identity()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Users ---

#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "All users", body = [PublicUser]))
)]
pub async fn get_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, AppError> {
    Ok(Json(glossary::list_users(state.repo.as_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = PublicUser),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let id = path_param(id)?;
    Ok(Json(glossary::get_user(state.repo.as_ref(), id).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/acronyms",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Acronyms created by the user", body = [Acronym]))
)]
pub async fn get_user_acronyms(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<Acronym>>, AppError> {
    let id = path_param(id)?;
    Ok(Json(glossary::get_acronyms_of_user(state.repo.as_ref(), id).await?))
}

/// create_user
///
/// [Token Route] Registers a new user. The response is the public projection,
/// without the password hash.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Created", body = PublicUser),
        (status = 409, description = "Username taken")
    ),
    security(("bearer" = []))
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, AppError> {
    let request = json_body(payload)?;
    let created = glossary::create_user(state.repo.as_ref(), request, user.identity()).await?;
    Ok(Json(created))
}

/// login
///
/// [Public Route] Exchanges HTTP Basic credentials for an API token.
#[utoipa::path(
    post,
    path = "/api/users/login",
    responses(
        (status = 200, description = "Token issued", body = Token),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    credentials: Result<TypedHeader<Authorization<Basic>>, TypedHeaderRejection>,
) -> Result<Json<Token>, AppError> {
    let TypedHeader(credentials) = credentials
        .map_err(|_| AppError::Unauthenticated("missing basic credentials".to_string()))?;

    let user = auth::authenticate_credentials(
        state.repo.as_ref(),
        credentials.username(),
        credentials.password(),
    )
    .await?;

    let token = auth::issue_token(state.repo.as_ref(), &state.config, &user).await?;
    Ok(Json(token))
}

// --- Categories ---

#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(glossary::list_categories(state.repo.as_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Category>, AppError> {
    let id = path_param(id)?;
    Ok(Json(glossary::get_category(state.repo.as_ref(), id).await?))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/acronyms",
    params(("id" = i64, Path, description = "Category ID")),
    responses((status = 200, description = "Acronyms in the category", body = [Acronym]))
)]
pub async fn get_category_acronyms(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Acronym>>, AppError> {
    let id = path_param(id)?;
    Ok(Json(
        glossary::get_acronyms_of_category(state.repo.as_ref(), id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Created", body = Category),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> Result<Json<Category>, AppError> {
    let input = json_body(payload)?;
    let category = glossary::create_category(state.repo.as_ref(), input, user.identity()).await?;
    Ok(Json(category))
}
