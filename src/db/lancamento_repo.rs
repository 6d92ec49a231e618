// src/db/lancamento_repo.rs

use chrono::NaiveDate;
use serde_json::Value;
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::map_constraint_error,
        error::AppError,
        pagination::{HistoryCursor, PageRequest},
    },
    models::{
        analytics::{AnalyticsRow, ComplianceStat},
        indicators::{HistoryFilter, IndicatorType, Lancamento, LancamentoRow},
    },
    services::access::Scope,
};

const LANCAMENTO_COLUMNS: &str = "id, indicator_type, data_referencia, conteudo, user_id, base_id, equipe_id, \
     colaborador_id, created_at, updated_at";

const HISTORY_SELECT: &str = r#"
    SELECT
        l.id, l.indicator_type, l.data_referencia, l.conteudo,
        l.user_id, u.nome AS user_nome,
        l.base_id, b.nome AS base_nome,
        l.equipe_id, e.nome AS equipe_nome,
        l.colaborador_id, l.created_at, l.updated_at
    FROM lancamentos l
    JOIN users u ON u.id = l.user_id
    JOIN bases b ON b.id = l.base_id
    JOIN equipes e ON e.id = l.equipe_id
    WHERE TRUE
"#;

/// Limite de linhas de uma exportação CSV.
pub const EXPORT_LIMIT: i64 = 10_000;

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &Scope, filter: &HistoryFilter) {
    scope.push_predicate(qb, "l");

    if let Some(indicator) = filter.indicator {
        qb.push(" AND l.indicator_type = ").push_bind(indicator);
    }
    if let Some(start) = filter.period_start {
        qb.push(" AND l.data_referencia >= ").push_bind(start);
    }
    if let Some(end) = filter.period_end {
        qb.push(" AND l.data_referencia <= ").push_bind(end);
    }
    if let Some(base_id) = filter.base_id {
        qb.push(" AND l.base_id = ").push_bind(base_id);
    }
    if let Some(equipe_id) = filter.equipe_id {
        qb.push(" AND l.equipe_id = ").push_bind(equipe_id);
    }
    if let Some(colaborador_id) = filter.colaborador_id {
        qb.push(" AND l.colaborador_id = ").push_bind(colaborador_id);
    }
}

// Lançamentos de indicadores. Vários lançamentos iguais no mesmo dia são linhas distintas.
#[derive(Clone, Default)]
pub struct LancamentoRepository;

impl LancamentoRepository {
    pub fn new() -> Self {
        Self
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        indicator: IndicatorType,
        data_referencia: NaiveDate,
        base_id: Uuid,
        equipe_id: Uuid,
        colaborador_id: Option<Uuid>,
        conteudo: &Value,
    ) -> Result<Lancamento, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lancamento>(&format!(
            r#"
            INSERT INTO lancamentos
                (indicator_type, data_referencia, conteudo, user_id, base_id, equipe_id, colaborador_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            LANCAMENTO_COLUMNS
        ))
        .bind(indicator)
        .bind(data_referencia)
        .bind(conteudo)
        .bind(user_id)
        .bind(base_id)
        .bind(equipe_id)
        .bind(colaborador_id)
        .fetch_one(executor)
        .await
        .map_err(map_constraint_error)
    }

    /// Lê o lançamento travando a linha até o fim da transação.
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Lancamento>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lancamento = sqlx::query_as::<_, Lancamento>(&format!(
            "SELECT {} FROM lancamentos WHERE id = $1 FOR UPDATE",
            LANCAMENTO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(lancamento)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Lancamento>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lancamento = sqlx::query_as::<_, Lancamento>(&format!(
            "SELECT {} FROM lancamentos WHERE id = $1",
            LANCAMENTO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(lancamento)
    }

    /// Lotação do lançamento fora do filtro RLS (para distinguir 403 de 404).
    pub async fn lancamento_scope<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<(Uuid, Uuid)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let scope = sqlx::query_as::<_, (Uuid, Uuid)>("SELECT scope_base, scope_equipe FROM lancamento_scope($1)")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(scope)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        data_referencia: NaiveDate,
        colaborador_id: Option<Uuid>,
        conteudo: &Value,
    ) -> Result<Option<Lancamento>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lancamento>(&format!(
            r#"
            UPDATE lancamentos
            SET data_referencia = $2, colaborador_id = $3, conteudo = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LANCAMENTO_COLUMNS
        ))
        .bind(id)
        .bind(data_referencia)
        .bind(colaborador_id)
        .bind(conteudo)
        .fetch_optional(executor)
        .await
        .map_err(map_constraint_error)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM lancamentos WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(map_constraint_error)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  HISTÓRICO
    // =========================================================================

    pub async fn count_history<'e, E>(&self, executor: E, scope: &Scope, filter: &HistoryFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM lancamentos l WHERE TRUE");
        push_filters(&mut qb, scope, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    /// Página do histórico em `(data_referencia DESC, id DESC)`.
    /// Com cursor, a página começa logo depois dele (estável sob inserções);
    /// sem cursor, usa OFFSET a partir do número da página.
    pub async fn history_page<'e, E>(
        &self,
        executor: E,
        scope: &Scope,
        filter: &HistoryFilter,
        page: PageRequest,
        cursor: Option<HistoryCursor>,
    ) -> Result<Vec<LancamentoRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(HISTORY_SELECT);
        push_filters(&mut qb, scope, filter);

        if let Some(cursor) = cursor {
            qb.push(" AND (l.data_referencia, l.id) < (")
                .push_bind(cursor.date)
                .push(", ")
                .push_bind(cursor.id)
                .push(")");
        }

        qb.push(" ORDER BY l.data_referencia DESC, l.id DESC LIMIT ")
            .push_bind(page.page_size);
        if cursor.is_none() {
            qb.push(" OFFSET ").push_bind(page.offset());
        }

        let rows = qb.build_query_as::<LancamentoRow>().fetch_all(executor).await?;
        Ok(rows)
    }

    pub async fn export_rows<'e, E>(&self, executor: E, scope: &Scope, filter: &HistoryFilter) -> Result<Vec<LancamentoRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(HISTORY_SELECT);
        push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY l.data_referencia DESC, l.id DESC LIMIT ")
            .push_bind(EXPORT_LIMIT);

        let rows = qb.build_query_as::<LancamentoRow>().fetch_all(executor).await?;
        Ok(rows)
    }

    // =========================================================================
    //  ANALYTICS
    // =========================================================================

    pub async fn analytics_rows<'e, E>(&self, executor: E, scope: &Scope, filter: &HistoryFilter) -> Result<Vec<AnalyticsRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT l.id, l.indicator_type, l.data_referencia, l.base_id, b.nome AS base_nome,
                   l.equipe_id, l.conteudo
            FROM lancamentos l
            JOIN bases b ON b.id = l.base_id
            WHERE TRUE
            "#,
        );
        push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY l.data_referencia ASC, l.id ASC");

        let rows = qb.build_query_as::<AnalyticsRow>().fetch_all(executor).await?;
        Ok(rows)
    }

    /// Resumo por (base, indicador) até a data de referência, para o relatório de aderência.
    pub async fn compliance_stats<'e, E>(
        &self,
        executor: E,
        scope: &Scope,
        base_id: Option<Uuid>,
        equipe_id: Option<Uuid>,
        reference: NaiveDate,
    ) -> Result<Vec<ComplianceStat>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT l.base_id, l.indicator_type, MAX(l.data_referencia) AS last_date, COALESCE(BOOL_OR(l.data_referencia = ");
        qb.push_bind(reference)
            .push("), FALSE) AS on_date, COALESCE(BOOL_OR(l.data_referencia >= date_trunc('month', ")
            .push_bind(reference)
            .push("::date)::date), FALSE) AS in_month FROM lancamentos l WHERE l.data_referencia <= ")
            .push_bind(reference);

        let filter = HistoryFilter {
            base_id,
            equipe_id,
            ..Default::default()
        };
        push_filters(&mut qb, scope, &filter);
        qb.push(" GROUP BY l.base_id, l.indicator_type");

        let stats = qb.build_query_as::<ComplianceStat>().fetch_all(executor).await?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_filters_render_in_order() {
        let base = Uuid::new_v4();
        let equipe = Uuid::new_v4();
        let filter = HistoryFilter {
            indicator: Some(IndicatorType::Taf),
            period_start: NaiveDate::from_ymd_opt(2025, 1, 1),
            colaborador_id: Some(Uuid::new_v4()),
            ..Default::default()
        };

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT 1 FROM lancamentos l WHERE TRUE");
        push_filters(&mut qb, &Scope::Team { base, equipe }, &filter);

        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM lancamentos l WHERE TRUE AND l.base_id = $1 AND l.equipe_id = $2 \
             AND l.indicator_type = $3 AND l.data_referencia >= $4 AND l.colaborador_id = $5"
        );
    }
}
