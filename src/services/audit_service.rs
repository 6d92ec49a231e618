// src/services/audit_service.rs

use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::{Page, PageRequest}},
    db::{audit_repo::AuditFilter, AuditRepository},
    models::audit::{AuditQuery, AuditRecord, NewAuditRecord},
};

#[derive(Clone)]
pub struct AuditService {
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl AuditService {
    pub fn new(audit_repo: AuditRepository, pool: PgPool) -> Self {
        Self { audit_repo, pool }
    }

    /// Grava dentro da transação da operação: some junto se ela for desfeita.
    pub async fn record(&self, conn: &mut PgConnection, record: NewAuditRecord) -> Result<(), AppError> {
        self.audit_repo.insert(conn, &record).await
    }

    /// Grava fora de qualquer transação (negações e recusas, cuja transação é descartada).
    /// Falhas aqui só vão para o log.
    pub async fn record_detached(&self, record: NewAuditRecord) {
        if let Err(e) = self.audit_repo.insert(&self.pool, &record).await {
            tracing::error!(
                "🔥 Falha ao gravar auditoria ({} {}): {}",
                record.action,
                record.target_entity,
                e
            );
        }
    }

    pub async fn record_failure(&self, record: NewAuditRecord, err: &AppError) {
        let outcome = err.audit_outcome();
        let record = record
            .outcome(outcome)
            .detail(json!({ "error": err.to_string() }));
        self.record_detached(record).await;
    }

    /// Fecha uma operação mutável: sucesso é gravado na mesma transação,
    /// erro é gravado à parte e devolvido sem alteração.
    pub async fn track<T, F>(
        &self,
        conn: &mut PgConnection,
        record: NewAuditRecord,
        result: Result<T, AppError>,
        target: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(&T) -> Option<Uuid>,
    {
        match result {
            Ok(value) => {
                let target_id = target(&value).or(record.target_id);
                self.record(conn, record.target(target_id)).await?;
                Ok(value)
            }
            Err(err) => {
                if let AppError::AccessDenied { resource, target_id } = &err {
                    tracing::warn!(
                        "🚫 Acesso negado: usuário {:?} em {} ({:?})",
                        record.actor_user_id,
                        resource,
                        target_id
                    );
                }
                let target_id = match &err {
                    AppError::AccessDenied { target_id, .. } => target_id.or(record.target_id),
                    _ => record.target_id,
                };
                self.record_failure(record.target(target_id), &err).await;
                Err(err)
            }
        }
    }

    pub async fn query(&self, conn: &mut PgConnection, query: &AuditQuery) -> Result<Page<AuditRecord>, AppError> {
        let filter = AuditFilter::from(query);
        let page = PageRequest::new(query.page, query.page_size);

        let total = self.audit_repo.count(&mut *conn, &filter).await?;
        let records = self.audit_repo.list(&mut *conn, &filter, page).await?;

        Ok(Page::new(records, total, page))
    }
}
