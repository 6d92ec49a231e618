// src/handlers/audit.rs

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
        pagination::Page,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermAuditRead, RequirePermission},
    },
    models::audit::{AuditQuery, AuditRecord},
};

// GET /api/audit
#[utoipa::path(
    get,
    path = "/api/audit",
    tag = "Audit",
    params(AuditQuery),
    responses(
        (status = 200, description = "Registros de auditoria, mais recentes primeiro", body = Page<AuditRecord>),
        (status = 403, description = "Apenas Gerente Geral")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_audit(
    State(app_state): State<AppState>,
    locale: Locale,
    current: AuthenticatedUser,
    _guard: RequirePermission<PermAuditRead>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let mut tx = begin_rls_transaction(&app_state, &current.user).await.map_err(to_api)?;
    let page = app_state
        .audit_service
        .query(&mut tx, &query)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::OK, Json(page)))
}
