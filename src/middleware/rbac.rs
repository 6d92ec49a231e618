// src/middleware/rbac.rs

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};
use serde_json::json;
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::audit::{AuditOutcome, NewAuditRecord},
    services::access::{authorize, Operation, Resource},
};

/// 1. O Trait que define o que é uma Permissão: um par (recurso, operação) da matriz
pub trait PermissionDef: Send + Sync + 'static {
    fn resource() -> Resource;
    fn operation() -> Operation;
}

/// 2. O Extractor (Guardião). Barra a requisição antes do handler.
pub struct RequirePermission<T>(pub PhantomData<T>);

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        // A. Extrai Usuário (o auth_guard já rodou)
        let Some(current) = parts.extensions.get::<AuthenticatedUser>() else {
            return Err(AppError::InvalidToken.to_api_error(&locale, &app_state.i18n_store));
        };

        // B. Consulta a matriz
        let (resource, operation) = (T::resource(), T::operation());
        if authorize(current.user.role, resource, operation).is_allowed() {
            return Ok(RequirePermission(PhantomData));
        }

        // C. Negado: registra e devolve 403 sem dados
        tracing::warn!(
            "🚫 Acesso negado: usuário {} ({}) em {} {:?} {}",
            current.user.id,
            current.user.role.as_str(),
            parts.method,
            operation,
            parts.uri.path()
        );
        app_state
            .audit_service
            .record_detached(
                NewAuditRecord::new(Some(current.user.id), &format!("{}.{:?}", resource.as_str(), operation).to_lowercase(), resource.as_str())
                    .outcome(AuditOutcome::Denied)
                    .detail(json!({ "path": parts.uri.path(), "method": parts.method.as_str() })),
            )
            .await;

        Err(AppError::denied(resource.as_str(), None).to_api_error(&locale, &app_state.i18n_store))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermUsersRead;
impl PermissionDef for PermUsersRead {
    fn resource() -> Resource { Resource::Users }
    fn operation() -> Operation { Operation::Read }
}

pub struct PermUsersWrite;
impl PermissionDef for PermUsersWrite {
    fn resource() -> Resource { Resource::Users }
    fn operation() -> Operation { Operation::Create }
}

pub struct PermDirectoryWrite;
impl PermissionDef for PermDirectoryWrite {
    fn resource() -> Resource { Resource::Bases }
    fn operation() -> Operation { Operation::Create }
}

pub struct PermAuditRead;
impl PermissionDef for PermAuditRead {
    fn resource() -> Resource { Resource::Audit }
    fn operation() -> Operation { Operation::Read }
}

pub struct PermAnalyticsRead;
impl PermissionDef for PermAnalyticsRead {
    fn resource() -> Resource { Resource::Analytics }
    fn operation() -> Operation { Operation::Read }
}
