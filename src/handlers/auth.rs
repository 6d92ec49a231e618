// src/handlers/auth.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::{AuthResponse, CurrentUserResponse, LoginUserPayload},
};

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login bem-sucedido", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 401, description = "Credenciais inválidas"),
        (status = 403, description = "Conta desativada")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    locale: Locale,
    payload: Result<Json<LoginUserPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    payload
        .validate()
        .map_err(|e| AppError::from(e).to_api_error(&locale, &app_state.i18n_store))?;

    let response = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(response)))
}

// GET /api/auth/user
#[utoipa::path(
    get,
    path = "/api/auth/user",
    tag = "Auth",
    responses(
        (status = 200, description = "Usuário da sessão atual", body = CurrentUserResponse),
        (status = 401, description = "Token inválido ou expirado")
    ),
    security(("api_jwt" = []))
)]
pub async fn current_user(current: AuthenticatedUser) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse::from(&current.user))
}

// POST /api/auth/logout
// Rota pública: a sessão pode já estar revogada ou expirada
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Sessão encerrada (também quando já estava encerrada)"),
        (status = 401, description = "Token ausente ou com assinatura inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    locale: Locale,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() else {
        return Err(to_api(AppError::InvalidToken));
    };

    app_state
        .auth_service
        .logout(bearer.token())
        .await
        .map_err(to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
