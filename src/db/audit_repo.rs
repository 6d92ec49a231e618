// src/db/audit_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    models::audit::{AuditOutcome, AuditRecord, AuditQuery, NewAuditRecord},
};

/// Filtros da trilha de auditoria já interpretados.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub actor: Option<Uuid>,
    pub action: Option<String>,
    pub target_entity: Option<String>,
    pub outcome: Option<AuditOutcome>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl From<&AuditQuery> for AuditFilter {
    fn from(q: &AuditQuery) -> Self {
        Self {
            actor: q.actor,
            action: q.action.clone().filter(|a| !a.trim().is_empty()),
            target_entity: q.target_entity.clone().filter(|t| !t.trim().is_empty()),
            outcome: q.outcome,
            from: q.from,
            to: q.to,
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AuditFilter) {
    if let Some(actor) = filter.actor {
        qb.push(" AND a.actor_user_id = ").push_bind(actor);
    }
    if let Some(action) = &filter.action {
        qb.push(" AND a.action = ").push_bind(action.clone());
    }
    if let Some(entity) = &filter.target_entity {
        qb.push(" AND a.target_entity = ").push_bind(entity.clone());
    }
    if let Some(outcome) = filter.outcome {
        qb.push(" AND a.outcome = ").push_bind(outcome);
    }
    if let Some(from) = filter.from {
        qb.push(" AND a.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        qb.push(" AND a.created_at <= ").push_bind(to);
    }
}

// Somente inserção e leitura: o banco recusa UPDATE/DELETE na tabela
#[derive(Clone, Default)]
pub struct AuditRepository;

impl AuditRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(&self, executor: E, record: &NewAuditRecord) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_log (actor_user_id, action, target_entity, target_id, outcome, detail)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.actor_user_id)
        .bind(&record.action)
        .bind(&record.target_entity)
        .bind(record.target_id)
        .bind(record.outcome)
        .bind(&record.detail)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn count<'e, E>(&self, executor: E, filter: &AuditFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM audit_log a WHERE TRUE");
        push_filters(&mut qb, filter);
        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn list<'e, E>(&self, executor: E, filter: &AuditFilter, page: PageRequest) -> Result<Vec<AuditRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT a.id, a.actor_user_id, a.action, a.target_entity, a.target_id, a.outcome, a.detail, a.created_at \
             FROM audit_log a WHERE TRUE",
        );
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(page.page_size)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let records = qb.build_query_as::<AuditRecord>().fetch_all(executor).await?;
        Ok(records)
    }
}
