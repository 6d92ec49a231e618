// src/db/directory_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_constraint_error, error::AppError},
    models::directory::{Base, Colaborador, ColaboradorFilters, CreateColaboradorPayload, Equipe},
    services::access::Scope,
};

const COLABORADOR_COLUMNS: &str =
    "c.id, c.nome, c.email, c.base_id, c.equipe_id, c.funcao, c.ativo, c.created_at, c.updated_at";

/// Bases, equipes e colaboradores. Colaboradores passam pela política RLS;
/// as consultas também aplicam o [`Scope`] explicitamente.
#[derive(Clone, Default)]
pub struct DirectoryRepository;

impl DirectoryRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  BASES
    // =========================================================================

    pub async fn list_bases<'e, E>(&self, executor: E) -> Result<Vec<Base>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bases = sqlx::query_as::<_, Base>(
            "SELECT id, nome, localizacao, created_at FROM bases ORDER BY nome ASC, id ASC",
        )
        .fetch_all(executor)
        .await?;
        Ok(bases)
    }

    pub async fn find_base<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Base>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let base = sqlx::query_as::<_, Base>("SELECT id, nome, localizacao, created_at FROM bases WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(base)
    }

    pub async fn create_base<'e, E>(
        &self,
        executor: E,
        nome: &str,
        localizacao: Option<&str>,
    ) -> Result<Base, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Base>(
            r#"
            INSERT INTO bases (nome, localizacao)
            VALUES ($1, $2)
            RETURNING id, nome, localizacao, created_at
            "#,
        )
        .bind(nome.trim())
        .bind(localizacao)
        .fetch_one(executor)
        .await
        .map_err(map_constraint_error)
    }

    pub async fn update_base<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        nome: &str,
        localizacao: Option<&str>,
    ) -> Result<Option<Base>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Base>(
            r#"
            UPDATE bases SET nome = $2, localizacao = $3
            WHERE id = $1
            RETURNING id, nome, localizacao, created_at
            "#,
        )
        .bind(id)
        .bind(nome.trim())
        .bind(localizacao)
        .fetch_optional(executor)
        .await
        .map_err(map_constraint_error)
    }

    /// Remove a base. Dependentes bloqueiam a exclusão (ON DELETE RESTRICT).
    pub async fn delete_base<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM bases WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(map_constraint_error)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  EQUIPES
    // =========================================================================

    pub async fn list_equipes<'e, E>(&self, executor: E, base_id: Option<Uuid>) -> Result<Vec<Equipe>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let equipes = sqlx::query_as::<_, Equipe>(
            r#"
            SELECT id, nome, base_id, created_at FROM equipes
            WHERE ($1::uuid IS NULL OR base_id = $1)
            ORDER BY nome ASC, id ASC
            "#,
        )
        .bind(base_id)
        .fetch_all(executor)
        .await?;
        Ok(equipes)
    }

    pub async fn find_equipe<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Equipe>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let equipe = sqlx::query_as::<_, Equipe>("SELECT id, nome, base_id, created_at FROM equipes WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(equipe)
    }

    /// `(equipe_id, base_id)` das equipes informadas. Ids desconhecidos ficam de fora.
    pub async fn equipe_bases<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<(Uuid, Uuid)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pairs = sqlx::query_as::<_, (Uuid, Uuid)>("SELECT id, base_id FROM equipes WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(pairs)
    }

    pub async fn create_equipe<'e, E>(&self, executor: E, nome: &str, base_id: Uuid) -> Result<Equipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Equipe>(
            r#"
            INSERT INTO equipes (nome, base_id)
            VALUES ($1, $2)
            RETURNING id, nome, base_id, created_at
            "#,
        )
        .bind(nome.trim())
        .bind(base_id)
        .fetch_one(executor)
        .await
        .map_err(map_constraint_error)
    }

    pub async fn update_equipe<'e, E>(&self, executor: E, id: Uuid, nome: &str) -> Result<Option<Equipe>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Equipe>(
            "UPDATE equipes SET nome = $2 WHERE id = $1 RETURNING id, nome, base_id, created_at",
        )
        .bind(id)
        .bind(nome.trim())
        .fetch_optional(executor)
        .await
        .map_err(map_constraint_error)
    }

    pub async fn delete_equipe<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM equipes WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(map_constraint_error)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  COLABORADORES
    // =========================================================================

    pub async fn list_colaboradores<'e, E>(
        &self,
        executor: E,
        scope: &Scope,
        filters: &ColaboradorFilters,
    ) -> Result<Vec<Colaborador>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM colaboradores c WHERE TRUE",
            COLABORADOR_COLUMNS
        ));
        scope.push_predicate(&mut qb, "c");

        if let Some(base_id) = filters.base_id {
            qb.push(" AND c.base_id = ").push_bind(base_id);
        }
        if let Some(equipe_id) = filters.equipe_id {
            qb.push(" AND c.equipe_id = ").push_bind(equipe_id);
        }
        if let Some(ativo) = filters.ativo {
            qb.push(" AND c.ativo = ").push_bind(ativo);
        }
        qb.push(" ORDER BY c.nome ASC, c.id ASC");

        let colaboradores = qb.build_query_as::<Colaborador>().fetch_all(executor).await?;
        Ok(colaboradores)
    }

    pub async fn find_colaborador<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Colaborador>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let colaborador = sqlx::query_as::<_, Colaborador>(&format!(
            "SELECT {} FROM colaboradores c WHERE c.id = $1",
            COLABORADOR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(colaborador)
    }

    /// Lotação `(base, equipe)` do colaborador, visível mesmo fora do escopo RLS.
    /// Permite responder 403 (existe, mas não é seu) em vez de 404.
    pub async fn colaborador_scope<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<(Uuid, Uuid)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let scope = sqlx::query_as::<_, (Uuid, Uuid)>("SELECT scope_base, scope_equipe FROM colaborador_scope($1)")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(scope)
    }

    pub async fn create_colaborador<'e, E>(
        &self,
        executor: E,
        payload: &CreateColaboradorPayload,
    ) -> Result<Colaborador, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Colaborador>(
            r#"
            INSERT INTO colaboradores (nome, email, base_id, equipe_id, funcao)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, nome, email, base_id, equipe_id, funcao, ativo, created_at, updated_at
            "#,
        )
        .bind(payload.nome.trim())
        .bind(payload.email.as_deref().map(str::trim))
        .bind(payload.base_id)
        .bind(payload.equipe_id)
        .bind(payload.funcao.as_deref())
        .fetch_one(executor)
        .await
        .map_err(map_constraint_error)
    }

    /// Grava o estado final do colaborador (já mesclado pelo serviço).
    pub async fn update_colaborador<'e, E>(&self, executor: E, colaborador: &Colaborador) -> Result<Option<Colaborador>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Colaborador>(
            r#"
            UPDATE colaboradores
            SET nome = $2, email = $3, base_id = $4, equipe_id = $5, funcao = $6, ativo = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, nome, email, base_id, equipe_id, funcao, ativo, created_at, updated_at
            "#,
        )
        .bind(colaborador.id)
        .bind(colaborador.nome.trim())
        .bind(colaborador.email.as_deref())
        .bind(colaborador.base_id)
        .bind(colaborador.equipe_id)
        .bind(colaborador.funcao.as_deref())
        .bind(colaborador.ativo)
        .fetch_optional(executor)
        .await
        .map_err(map_constraint_error)
    }

    pub async fn delete_colaborador<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM colaboradores WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(map_constraint_error)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_colaboradores<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM colaboradores WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await
            .map_err(map_constraint_error)?;
        Ok(result.rows_affected())
    }
}
