// src/handlers/settings.rs

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_rls_transaction,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::settings::{
        ChangePasswordPayload, CreateFeedbackPayload, Feedback, ProfileResponse, UpdateFeedbackStatusPayload,
        UpdateProfilePayload,
    },
};

// GET /api/user/settings/profile
#[utoipa::path(
    get,
    path = "/api/user/settings/profile",
    tag = "Settings",
    responses((status = 200, description = "Perfil do usuário", body = ProfileResponse)),
    security(("api_jwt" = []))
)]
pub async fn get_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let profile = app_state
        .settings_service
        .get_profile(&mut tx, &current.user)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(profile)))
}

// PUT /api/user/settings/profile
#[utoipa::path(
    put,
    path = "/api/user/settings/profile",
    tag = "Settings",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Perfil atualizado", body = ProfileResponse),
        (status = 409, description = "E-mail já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    payload: Result<Json<UpdateProfilePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let profile = app_state
        .settings_service
        .update_profile(&mut tx, &current.user, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::OK, Json(profile)))
}

// POST /api/user/settings/change-password
#[utoipa::path(
    post,
    path = "/api/user/settings/change-password",
    tag = "Settings",
    request_body = ChangePasswordPayload,
    responses(
        (status = 204, description = "Senha alterada; demais sessões encerradas"),
        (status = 400, description = "Senha atual incorreta ou nova senha fraca")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    payload: Result<Json<ChangePasswordPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    app_state
        .settings_service
        .change_password(&mut tx, &current.user, current.session_id, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

// --- Feedback ---

// GET /api/user/settings/feedback
#[utoipa::path(
    get,
    path = "/api/user/settings/feedback",
    tag = "Settings",
    responses((status = 200, description = "Feedbacks visíveis ao usuário", body = Vec<Feedback>)),
    security(("api_jwt" = []))
)]
pub async fn list_feedback(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let feedback = app_state
        .settings_service
        .list_feedback(&mut tx, &current.user)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(feedback)))
}

// POST /api/user/settings/feedback
#[utoipa::path(
    post,
    path = "/api/user/settings/feedback",
    tag = "Settings",
    request_body = CreateFeedbackPayload,
    responses((status = 201, description = "Feedback enviado", body = Feedback)),
    security(("api_jwt" = []))
)]
pub async fn create_feedback(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    payload: Result<Json<CreateFeedbackPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let feedback = app_state
        .settings_service
        .create_feedback(&mut tx, &current.user, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

// PUT /api/user/settings/feedback/{id}/status
#[utoipa::path(
    put,
    path = "/api/user/settings/feedback/{id}/status",
    tag = "Settings",
    params(("id" = Uuid, Path, description = "ID do feedback")),
    request_body = UpdateFeedbackStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Feedback),
        (status = 403, description = "Apenas suporte")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_feedback_status(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateFeedbackStatusPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let feedback = app_state
        .settings_service
        .update_feedback_status(&mut tx, &current.user, id, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::OK, Json(feedback)))
}

// DELETE /api/user/settings/feedback/{id}
#[utoipa::path(
    delete,
    path = "/api/user/settings/feedback/{id}",
    tag = "Settings",
    params(("id" = Uuid, Path, description = "ID do feedback")),
    responses(
        (status = 204, description = "Feedback excluído"),
        (status = 403, description = "Feedback de outro usuário")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_feedback(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    app_state
        .settings_service
        .delete_feedback(&mut tx, &current.user, id)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}
