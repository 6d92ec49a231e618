// src/handlers/history.rs

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use crate::{
    common::{
        db_utils::begin_rls_transaction,
        error::{ApiError, AppError},
        pagination::Page,
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::indicators::{HistoryQuery, HistoryRecord, IndicatorInfo},
};

// GET /api/indicadores
#[utoipa::path(
    get,
    path = "/api/indicadores",
    tag = "Lançamentos",
    responses((status = 200, description = "Catálogo de indicadores", body = Vec<IndicatorInfo>)),
    security(("api_jwt" = []))
)]
pub async fn list_indicadores(State(app_state): State<AppState>, _current: AuthenticatedUser) -> Json<Vec<IndicatorInfo>> {
    Json(app_state.indicator_service.catalogue())
}

// GET /api/history
#[utoipa::path(
    get,
    path = "/api/history",
    tag = "Histórico",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Lançamentos visíveis, mais recentes primeiro", body = Page<HistoryRecord>),
        (status = 400, description = "Filtro inválido"),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_history(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let page = app_state
        .indicator_service
        .history(&mut tx, &current.user, &query)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/history/export
#[utoipa::path(
    get,
    path = "/api/history/export",
    tag = "Histórico",
    params(HistoryQuery),
    responses(
        (status = 200, description = "CSV com os mesmos filtros do histórico", content_type = "text/csv", body = String),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn export_history(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let csv = app_state
        .indicator_service
        .export_csv(&mut tx, &current.user, &query)
        .await
        .map_err(to_api)?;

    let disposition = format!(
        "attachment; filename=\"lancamentos-{}.csv\"",
        Utc::now().format("%Y%m%d-%H%M%S")
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
