use crate::{metrics, ApiError, ApiResult, AppState};
use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, State},
    http::{Method, StatusCode},
    Extension, Json,
};
use chrono::{SecondsFormat, Utc};
use numthread_core::{
    AuthContext, AuthEvent, AuthLogger, Author, CreateDiscussionRequest, CreateOperationRequest,
    CredentialsRequest, Discussion, DiscussionWithOperations, NumthreadError, Operation, TreeStats, User,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

pub const SERVICE_NAME: &str = "Number Discussion API";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: i64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: (now - state.started_at).num_seconds(),
    })
}

pub async fn prometheus_metrics() -> ApiResult<String> {
    metrics::render().map_err(|e| ApiError::Internal(e.to_string()))
}

// -------- Auth --------

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(request) = payload?;
    let credentials = request
        .into_registration()
        .map_err(NumthreadError::from)?;

    // Cheap pre-check so a taken name does not cost a hash.
    if state
        .store
        .find_user_by_username(&credentials.username)
        .is_some()
    {
        return Err(NumthreadError::UsernameTaken.into());
    }

    let passwords = state.passwords.clone();
    let password = credentials.password;
    let password_hash = tokio::task::spawn_blocking(move || passwords.hash(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let user = state
        .store
        .create_user(credentials.username, password_hash)?;

    metrics::USERS_REGISTERED_TOTAL.inc();
    AuthLogger::log_event(AuthEvent::Registered {
        user_id: user.id,
        username: user.username.clone(),
    });

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(request) = payload?;
    let credentials = request.into_credentials().map_err(NumthreadError::from)?;

    let Some(user) = state.store.find_user_by_username(&credentials.username) else {
        return Err(login_failed(&credentials.username, "unknown user"));
    };

    if !verify_password(&state, &user, credentials.password).await? {
        return Err(login_failed(&credentials.username, "wrong password"));
    }

    let token = state.jwt.create_token(&user)?;

    metrics::record_login(true);
    AuthLogger::log_event(AuthEvent::LoginSucceeded {
        user_id: user.id,
        username: user.username.clone(),
    });

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}

async fn verify_password(state: &AppState, user: &User, password: String) -> ApiResult<bool> {
    let passwords = state.passwords.clone();
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || passwords.verify(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(valid)
}

fn login_failed(username: &str, reason: &str) -> ApiError {
    metrics::record_login(false);
    AuthLogger::log_event(AuthEvent::LoginFailed {
        username: username.to_string(),
        reason: reason.to_string(),
    });
    NumthreadError::InvalidCredentials.into()
}

// -------- Discussions --------

pub async fn list_discussions(State(state): State<AppState>) -> Json<Vec<DiscussionWithOperations>> {
    Json(state.store.all_discussions_with_operations())
}

pub async fn create_discussion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateDiscussionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Discussion>)> {
    let Json(request) = payload?;
    let starting_number = request.starting_number().map_err(NumthreadError::from)?;

    let discussion = state
        .store
        .create_discussion(starting_number, &Author::from(&auth));

    metrics::DISCUSSIONS_CREATED_TOTAL.inc();
    tracing::info!(
        discussion_id = %discussion.id,
        user_id = %auth.user_id,
        starting_number,
        "Discussion created"
    );

    Ok((StatusCode::CREATED, Json(discussion)))
}

pub async fn get_discussion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DiscussionWithOperations>> {
    let id = Uuid::parse_str(&id).map_err(|_| NumthreadError::DiscussionNotFound)?;
    let discussion = state
        .store
        .discussion_with_operations(id)
        .ok_or(NumthreadError::DiscussionNotFound)?;

    let stats = TreeStats::of(&discussion.operations);
    tracing::debug!(
        discussion_id = %id,
        operations = stats.operation_count,
        depth = stats.max_depth,
        leaves = stats.leaf_count,
        "Discussion tree served"
    );

    Ok(Json(discussion))
}

// -------- Operations --------

pub async fn create_operation(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateOperationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Operation>)> {
    let Json(request) = payload?;
    let new_operation = request.into_new_operation()?;

    let operation = state
        .store
        .create_operation(new_operation, &Author::from(&auth))?;

    metrics::OPERATIONS_CREATED_TOTAL
        .with_label_values(&[operation.operation_type.as_str()])
        .inc();
    tracing::info!(
        operation_id = %operation.id,
        discussion_id = %operation.discussion_id,
        user_id = %auth.user_id,
        "Operation created: {}",
        operation
    );

    Ok((StatusCode::CREATED, Json(operation)))
}

pub async fn list_operations(
    State(state): State<AppState>,
    Path(discussion_id): Path<String>,
) -> ApiResult<Json<Vec<Operation>>> {
    let discussion_id =
        Uuid::parse_str(&discussion_id).map_err(|_| NumthreadError::DiscussionNotFound)?;
    if state.store.find_discussion(discussion_id).is_none() {
        return Err(NumthreadError::DiscussionNotFound.into());
    }

    Ok(Json(state.store.operations_for_discussion(discussion_id)))
}

pub async fn get_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Operation>> {
    let id = Uuid::parse_str(&id).map_err(|_| NumthreadError::OperationNotFound)?;
    state
        .store
        .find_operation(id)
        .map(Json)
        .ok_or_else(|| NumthreadError::OperationNotFound.into())
}

pub async fn route_not_found(
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> (StatusCode, Json<Value>) {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "path": path,
            "method": method.as_str(),
        })),
    )
}
