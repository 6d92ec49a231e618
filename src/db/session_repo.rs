// src/db/session_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::Session};

// Sessões do lado do servidor: o `sid` do JWT aponta para uma linha daqui
#[derive(Clone, Default)]
pub struct SessionRepository;

impl SessionRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, created_at, expires_at, revoked_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(session)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Session>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, user_id, created_at, expires_at, revoked_at FROM sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(session)
    }

    /// Revoga uma sessão. Idempotente: `false` se já estava revogada.
    pub async fn revoke<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoga todas as sessões ativas do usuário, exceto `keep` (se informada).
    pub async fn revoke_all_for_user<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        keep: Option<Uuid>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET revoked_at = NOW()
            WHERE user_id = $1 AND revoked_at IS NULL AND ($2::uuid IS NULL OR id <> $2)
            "#,
        )
        .bind(user_id)
        .bind(keep)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
