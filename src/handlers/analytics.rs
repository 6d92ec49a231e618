// src/handlers/analytics.rs

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::{
        db_utils::begin_rls_transaction,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermAnalyticsRead, RequirePermission},
    },
    models::analytics::{AnalyticsQuery, ComplianceQuery, ComplianceReport, DashboardAnalytics},
};

// GET /api/analytics/dashboard
#[utoipa::path(
    get,
    path = "/api/analytics/dashboard",
    tag = "Analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "KPIs, séries, ranking e alertas do período", body = DashboardAnalytics),
        (status = 400, description = "Período inválido"),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    _guard: RequirePermission<PermAnalyticsRead>,
    query: Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let dashboard = app_state
        .analytics_service
        .dashboard(&mut tx, &current.user, &query)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(dashboard)))
}

// GET /api/analytics/compliance
#[utoipa::path(
    get,
    path = "/api/analytics/compliance",
    tag = "Analytics",
    params(ComplianceQuery),
    responses(
        (status = 200, description = "Conformidade de envio por base", body = ComplianceReport),
        (status = 403, description = "Filtro fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_compliance(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    _guard: RequirePermission<PermAnalyticsRead>,
    query: Result<Query<ComplianceQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let report = app_state
        .analytics_service
        .compliance(&mut tx, &current.user, &query)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(report)))
}
