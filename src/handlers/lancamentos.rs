// src/handlers/lancamentos.rs

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
    models::indicators::{CreatedResponse, Lancamento, LancamentoPayload, UpdateLancamentoPayload},
};

// POST /api/lancamentos/{slug}
// O segmento é o slug do indicador no POST e o id do lançamento nos demais métodos.
#[utoipa::path(
    post,
    path = "/api/lancamentos/{slug}",
    tag = "Lançamentos",
    params(("slug" = String, Path, description = "Slug do indicador, ex.: ocorrencia_aero")),
    request_body = LancamentoPayload,
    responses(
        (status = 201, description = "Lançamento registrado", body = CreatedResponse),
        (status = 400, description = "Campos inválidos"),
        (status = 403, description = "Base/equipe fora do escopo"),
        (status = 404, description = "Indicador desconhecido")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_lancamento(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(slug): Path<String>,
    payload: Result<Json<LancamentoPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let lancamento = app_state
        .indicator_service
        .submit(&mut tx, &current.user, &slug, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: lancamento.id })))
}

// GET /api/lancamentos/{id}
#[utoipa::path(
    get,
    path = "/api/lancamentos/{id}",
    tag = "Lançamentos",
    params(("id" = Uuid, Path, description = "ID do lançamento")),
    responses(
        (status = 200, description = "Lançamento", body = Lancamento),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Lançamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lancamento(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let lancamento = app_state
        .indicator_service
        .get(&mut tx, &current.user, id)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(lancamento)))
}

// PUT /api/lancamentos/{id}
#[utoipa::path(
    put,
    path = "/api/lancamentos/{id}",
    tag = "Lançamentos",
    params(("id" = Uuid, Path, description = "ID do lançamento")),
    request_body = UpdateLancamentoPayload,
    responses(
        (status = 200, description = "Lançamento atualizado", body = Lancamento),
        (status = 403, description = "Fora do escopo ou da janela de edição"),
        (status = 409, description = "Registro alterado por outro usuário")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lancamento(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateLancamentoPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let lancamento = app_state
        .indicator_service
        .update(&mut tx, &current.user, id, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::OK, Json(lancamento)))
}

// DELETE /api/lancamentos/{id}
#[utoipa::path(
    delete,
    path = "/api/lancamentos/{id}",
    tag = "Lançamentos",
    params(("id" = Uuid, Path, description = "ID do lançamento")),
    responses(
        (status = 204, description = "Lançamento excluído"),
        (status = 403, description = "Fora do escopo ou da janela de edição"),
        (status = 404, description = "Lançamento não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lancamento(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    app_state
        .indicator_service
        .delete(&mut tx, &current.user, id)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}
