// src/handlers/directory.rs

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
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
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermDirectoryWrite, RequirePermission},
    },
    models::directory::{
        Base, BatchCreateColaboradoresPayload, BatchDeletePayload, BatchResult, Colaborador, ColaboradorFilters,
        CreateBasePayload, CreateColaboradorPayload, CreateEquipePayload, Equipe, EquipeFilters, UpdateBasePayload,
        UpdateColaboradorPayload, UpdateEquipePayload,
    },
};

// =============================================================================
//  BASES
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/bases",
    tag = "Directory",
    responses((status = 200, description = "Bases", body = Vec<Base>)),
    security(("api_jwt" = []))
)]
pub async fn list_bases(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let bases = app_state
        .directory_service
        .list_bases(&mut tx, &current.user)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(bases)))
}

#[utoipa::path(
    get,
    path = "/api/bases/{id}",
    tag = "Directory",
    params(("id" = Uuid, Path, description = "ID da base")),
    responses(
        (status = 200, description = "Base", body = Base),
        (status = 404, description = "Base não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_base(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let base = app_state
        .directory_service
        .get_base(&mut tx, &current.user, id)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(base)))
}

#[utoipa::path(
    post,
    path = "/api/bases",
    tag = "Directory",
    request_body = CreateBasePayload,
    responses(
        (status = 201, description = "Base criada", body = Base),
        (status = 409, description = "Nome já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_base(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    _guard: RequirePermission<PermDirectoryWrite>,
    payload: Result<Json<CreateBasePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let base = app_state
        .directory_service
        .create_base(&mut tx, &current.user, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::CREATED, Json(base)))
}

#[utoipa::path(
    put,
    path = "/api/bases/{id}",
    tag = "Directory",
    params(("id" = Uuid, Path, description = "ID da base")),
    request_body = UpdateBasePayload,
    responses((status = 200, description = "Base atualizada", body = Base)),
    security(("api_jwt" = []))
)]
pub async fn update_base(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    _guard: RequirePermission<PermDirectoryWrite>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateBasePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let base = app_state
        .directory_service
        .update_base(&mut tx, &current.user, id, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::OK, Json(base)))
}

#[utoipa::path(
    delete,
    path = "/api/bases/{id}",
    tag = "Directory",
    params(("id" = Uuid, Path, description = "ID da base")),
    responses(
        (status = 204, description = "Base excluída"),
        (status = 409, description = "Base possui equipes, colaboradores ou lançamentos")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_base(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    _guard: RequirePermission<PermDirectoryWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    app_state
        .directory_service
        .delete_base(&mut tx, &current.user, id)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  EQUIPES
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/equipes",
    tag = "Directory",
    params(EquipeFilters),
    responses((status = 200, description = "Equipes", body = Vec<Equipe>)),
    security(("api_jwt" = []))
)]
pub async fn list_equipes(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    query: Result<Query<EquipeFilters>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(filters) = query?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let equipes = app_state
        .directory_service
        .list_equipes(&mut tx, &current.user, filters.base_id)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(equipes)))
}

#[utoipa::path(
    get,
    path = "/api/equipes/{id}",
    tag = "Directory",
    params(("id" = Uuid, Path, description = "ID da equipe")),
    responses(
        (status = 200, description = "Equipe", body = Equipe),
        (status = 404, description = "Equipe não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_equipe(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let equipe = app_state
        .directory_service
        .get_equipe(&mut tx, &current.user, id)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(equipe)))
}

#[utoipa::path(
    post,
    path = "/api/equipes",
    tag = "Directory",
    request_body = CreateEquipePayload,
    responses(
        (status = 201, description = "Equipe criada", body = Equipe),
        (status = 409, description = "Base inexistente ou nome repetido na base")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_equipe(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    _guard: RequirePermission<PermDirectoryWrite>,
    payload: Result<Json<CreateEquipePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let equipe = app_state
        .directory_service
        .create_equipe(&mut tx, &current.user, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::CREATED, Json(equipe)))
}

#[utoipa::path(
    put,
    path = "/api/equipes/{id}",
    tag = "Directory",
    params(("id" = Uuid, Path, description = "ID da equipe")),
    request_body = UpdateEquipePayload,
    responses((status = 200, description = "Equipe atualizada", body = Equipe)),
    security(("api_jwt" = []))
)]
pub async fn update_equipe(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    _guard: RequirePermission<PermDirectoryWrite>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateEquipePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let equipe = app_state
        .directory_service
        .update_equipe(&mut tx, &current.user, id, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::OK, Json(equipe)))
}

#[utoipa::path(
    delete,
    path = "/api/equipes/{id}",
    tag = "Directory",
    params(("id" = Uuid, Path, description = "ID da equipe")),
    responses(
        (status = 204, description = "Equipe excluída"),
        (status = 409, description = "Equipe possui colaboradores, usuários ou lançamentos")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_equipe(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    _guard: RequirePermission<PermDirectoryWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    app_state
        .directory_service
        .delete_equipe(&mut tx, &current.user, id)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  COLABORADORES (escopo por base/equipe aplicado no serviço)
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/colaboradores",
    tag = "Directory",
    params(ColaboradorFilters),
    responses(
        (status = 200, description = "Colaboradores visíveis ao usuário", body = Vec<Colaborador>),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_colaboradores(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    query: Result<Query<ColaboradorFilters>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(filters) = query?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let colaboradores = app_state
        .directory_service
        .list_colaboradores(&mut tx, &current.user, &filters)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(colaboradores)))
}

#[utoipa::path(
    get,
    path = "/api/colaboradores/{id}",
    tag = "Directory",
    params(("id" = Uuid, Path, description = "ID do colaborador")),
    responses(
        (status = 200, description = "Colaborador", body = Colaborador),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Colaborador não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_colaborador(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let colaborador = app_state
        .directory_service
        .get_colaborador(&mut tx, &current.user, id)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(colaborador)))
}

#[utoipa::path(
    post,
    path = "/api/colaboradores",
    tag = "Directory",
    request_body = CreateColaboradorPayload,
    responses(
        (status = 201, description = "Colaborador criado", body = Colaborador),
        (status = 403, description = "Fora do escopo"),
        (status = 409, description = "Equipe não pertence à base")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_colaborador(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    payload: Result<Json<CreateColaboradorPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let colaborador = app_state
        .directory_service
        .create_colaborador(&mut tx, &current.user, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::CREATED, Json(colaborador)))
}

#[utoipa::path(
    post,
    path = "/api/colaboradores/batch",
    tag = "Directory",
    request_body = BatchCreateColaboradoresPayload,
    responses(
        (status = 201, description = "Todos os colaboradores criados", body = BatchResult),
        (status = 400, description = "Linhas inválidas em `colaboradores[i].campo`; nada foi gravado")
    ),
    security(("api_jwt" = []))
)]
pub async fn batch_create_colaboradores(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    payload: Result<Json<BatchCreateColaboradoresPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let result = app_state
        .directory_service
        .batch_create_colaboradores(&mut tx, &current.user, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    put,
    path = "/api/colaboradores/{id}",
    tag = "Directory",
    params(("id" = Uuid, Path, description = "ID do colaborador")),
    request_body = UpdateColaboradorPayload,
    responses(
        (status = 200, description = "Colaborador atualizado", body = Colaborador),
        (status = 403, description = "Fora do escopo"),
        (status = 404, description = "Colaborador não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_colaborador(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateColaboradorPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let colaborador = app_state
        .directory_service
        .update_colaborador(&mut tx, &current.user, id, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::OK, Json(colaborador)))
}

#[utoipa::path(
    delete,
    path = "/api/colaboradores/{id}",
    tag = "Directory",
    params(("id" = Uuid, Path, description = "ID do colaborador")),
    responses(
        (status = 204, description = "Colaborador excluído"),
        (status = 409, description = "Colaborador possui lançamentos")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_colaborador(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    app_state
        .directory_service
        .delete_colaborador(&mut tx, &current.user, id)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/colaboradores/batch-delete",
    tag = "Directory",
    request_body = BatchDeletePayload,
    responses(
        (status = 200, description = "Colaboradores excluídos", body = BatchResult),
        (status = 404, description = "Algum id não existe; nada foi excluído")
    ),
    security(("api_jwt" = []))
)]
pub async fn batch_delete_colaboradores(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    payload: Result<Json<BatchDeletePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let result = app_state
        .directory_service
        .batch_delete_colaboradores(&mut tx, &current.user, payload)
        .await
        .map_err(to_api)?;
    tx.commit().await.map_err(|e| to_api(e.into()))?;

    Ok((StatusCode::OK, Json(result)))
}
