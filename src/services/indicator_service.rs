// src/services/indicator_service.rs

use chrono::{NaiveDate, Utc};
use serde_json::json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::{
        error::{AppError, FieldErrors},
        pagination::{HistoryCursor, Page, PageRequest},
    },
    db::{DirectoryRepository, LancamentoRepository},
    models::{
        audit::NewAuditRecord,
        auth::User,
        indicators::{
            HistoryFilter, HistoryQuery, HistoryRecord, IndicatorInfo, IndicatorType, Lancamento,
            LancamentoPayload, LancamentoRow, UpdateLancamentoPayload,
        },
    },
    services::{
        access::{self, Operation, Resource},
        audit_service::AuditService,
        indicator_schema::{parse_data_referencia, parse_date, validate_conteudo},
    },
};

// --- Filtros do histórico ---

/// Interpreta os filtros textuais do histórico. Slug ou data inválidos viram erro de campo.
pub fn parse_history_filter(query: &HistoryQuery) -> Result<HistoryFilter, AppError> {
    let mut errors = FieldErrors::new();

    let indicator = match query.indicator.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(slug) => {
            let parsed = IndicatorType::from_slug(slug);
            if parsed.is_none() {
                errors.add("indicator", "Indicador desconhecido.");
            }
            parsed
        }
        None => None,
    };

    let mut date = |field: &str, raw: Option<&str>| match raw.filter(|s| !s.trim().is_empty()) {
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.add(field, "Data inválida (use AAAA-MM-DD).");
            }
            parsed
        }
        None => None,
    };
    let period_start = date("periodStart", query.period_start.as_deref());
    let period_end = date("periodEnd", query.period_end.as_deref());

    if let (Some(start), Some(end)) = (period_start, period_end) {
        if start > end {
            errors.add("periodEnd", "O fim do período deve ser posterior ao início.");
        }
    }
    errors.into_result()?;

    Ok(HistoryFilter {
        indicator,
        period_start,
        period_end,
        base_id: query.base,
        equipe_id: query.equipe,
        colaborador_id: query.colaborador,
    })
}

// --- CSV ---

const CSV_HEADER: &str = "id,data_referencia,indicador,base,equipe,responsavel,colaborador_id,conteudo,criado_em";

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Uma linha por lançamento; o conteúdo vai como JSON compacto.
pub fn to_csv(rows: &[LancamentoRow]) -> String {
    let mut out = String::with_capacity(64 * (rows.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");

    for row in rows {
        let fields = [
            row.id.to_string(),
            row.data_referencia.format("%Y-%m-%d").to_string(),
            row.indicator_type.name().to_string(),
            row.base_nome.clone(),
            row.equipe_nome.clone(),
            row.user_nome.clone(),
            row.colaborador_id.map(|id| id.to_string()).unwrap_or_default(),
            row.conteudo.to_string(),
            row.created_at.to_rfc3339(),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push_str("\r\n");
    }
    out
}

// Lançamentos de indicadores: envio, histórico, edição e exclusão
#[derive(Clone)]
pub struct IndicatorService {
    lancamento_repo: LancamentoRepository,
    directory_repo: DirectoryRepository,
    audit_service: AuditService,
    edit_window_days: Option<i64>,
}

impl IndicatorService {
    pub fn new(
        lancamento_repo: LancamentoRepository,
        directory_repo: DirectoryRepository,
        audit_service: AuditService,
        edit_window_days: Option<i64>,
    ) -> Self {
        Self {
            lancamento_repo,
            directory_repo,
            audit_service,
            edit_window_days,
        }
    }

    pub fn catalogue(&self) -> Vec<IndicatorInfo> {
        IndicatorType::ALL.into_iter().map(IndicatorInfo::from).collect()
    }

    // =========================================================================
    //  ENVIO
    // =========================================================================

    pub async fn submit(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        slug: &str,
        payload: LancamentoPayload,
    ) -> Result<Lancamento, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "lancamentos.create", "lancamentos")
            .detail(json!({ "indicator": slug, "dataReferencia": payload.data_referencia }));
        let result = self.submit_inner(&mut *conn, actor, slug, &payload).await;
        self.audit_service.track(conn, record, result, |l| Some(l.id)).await
    }

    async fn submit_inner(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        slug: &str,
        payload: &LancamentoPayload,
    ) -> Result<Lancamento, AppError> {
        let indicator =
            IndicatorType::from_slug(slug).ok_or_else(|| AppError::ResourceNotFound("indicadores".into()))?;
        let scope = access::check(actor, Resource::Lancamentos, Operation::Create)?;

        // 1. Lotação: a informada ou a do próprio usuário
        let base_id = payload.base_id.or(actor.base_id);
        let equipe_id = payload.equipe_id.or(actor.equipe_id);
        if let (Some(base), Some(equipe)) = (base_id, equipe_id) {
            if !scope.permits(base, equipe) {
                return Err(AppError::denied(Resource::Lancamentos.as_str(), Some(equipe)));
            }
        }

        // 2. Data e conteúdo, acumulando todos os erros
        let mut errors = FieldErrors::new();
        let date = parse_data_referencia(&payload.data_referencia)
            .map_err(|e| errors.merge_prefixed("", e))
            .ok();
        let conteudo = validate_conteudo(indicator, &payload.conteudo)
            .map_err(|e| errors.merge_prefixed("", e))
            .ok();
        if base_id.is_none() {
            errors.add("baseId", "Informe a base do lançamento.");
        }
        if equipe_id.is_none() {
            errors.add("equipeId", "Informe a equipe do lançamento.");
        }

        let (Some(date), Some(conteudo), Some(base_id), Some(equipe_id)) = (date, conteudo, base_id, equipe_id) else {
            return Err(AppError::ValidationError(errors));
        };

        // 3. Vínculos: equipe na base, colaborador na equipe
        let pairs = self.directory_repo.equipe_bases(&mut *conn, &[equipe_id]).await?;
        if !pairs.iter().any(|(_, b)| *b == base_id) {
            errors.add("equipeId", "A equipe não pertence à base informada.");
        }
        self.check_colaborador(&mut *conn, payload.colaborador_id, base_id, equipe_id, &mut errors)
            .await?;
        errors.into_result()?;

        let lancamento = self
            .lancamento_repo
            .insert(
                &mut *conn,
                actor.id,
                indicator,
                date,
                base_id,
                equipe_id,
                payload.colaborador_id,
                &conteudo,
            )
            .await?;

        tracing::info!(
            "📝 Lançamento {} registrado: {} em {}",
            lancamento.id,
            indicator.slug(),
            date
        );
        Ok(lancamento)
    }

    // =========================================================================
    //  LEITURA, EDIÇÃO E EXCLUSÃO
    // =========================================================================

    /// Existe mas fora do escopo = 403; inexistente = 404.
    async fn locate(&self, conn: &mut PgConnection, actor: &User, operation: Operation, id: Uuid) -> Result<(Uuid, Uuid), AppError> {
        let (base_id, equipe_id) = self
            .lancamento_repo
            .lancamento_scope(conn, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("lancamentos".into()))?;
        access::check_row(actor, Resource::Lancamentos, operation, id, base_id, equipe_id)?;
        Ok((base_id, equipe_id))
    }

    pub async fn get(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<Lancamento, AppError> {
        self.locate(&mut *conn, actor, Operation::Read, id).await?;
        self.lancamento_repo
            .find(conn, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("lancamentos".into()))
    }

    pub async fn update(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        id: Uuid,
        payload: UpdateLancamentoPayload,
    ) -> Result<Lancamento, AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "lancamentos.update", "lancamentos").target(Some(id));
        let result = self.update_inner(&mut *conn, actor, id, &payload).await;
        self.audit_service.track(conn, record, result, |l| Some(l.id)).await
    }

    async fn update_inner(
        &self,
        conn: &mut PgConnection,
        actor: &User,
        id: Uuid,
        payload: &UpdateLancamentoPayload,
    ) -> Result<Lancamento, AppError> {
        let (base_id, equipe_id) = self.locate(&mut *conn, actor, Operation::Update, id).await?;
        let current = self
            .lancamento_repo
            .find_for_update(&mut *conn, id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("lancamentos".into()))?;

        let today = Utc::now().date_naive();
        self.ensure_modifiable(actor, Operation::Update, &current, today)?;

        // Controle otimista: só quando o cliente informa a versão que leu
        if let Some(expected) = payload.expected_updated_at {
            if expected != current.updated_at {
                return Err(AppError::Conflict("lancamentos".into()));
            }
        }

        let mut errors = FieldErrors::new();
        let date = match payload.data_referencia.as_deref() {
            Some(raw) => parse_data_referencia(raw).map_err(|e| errors.merge_prefixed("", e)).ok(),
            None => Some(current.data_referencia),
        };
        let conteudo = match &payload.conteudo {
            Some(raw) => validate_conteudo(current.indicator_type, raw)
                .map_err(|e| errors.merge_prefixed("", e))
                .ok(),
            None => Some(current.conteudo.clone()),
        };
        let colaborador_id = payload.colaborador_id.or(current.colaborador_id);
        self.check_colaborador(&mut *conn, payload.colaborador_id, base_id, equipe_id, &mut errors)
            .await?;

        let (Some(date), Some(conteudo)) = (date, conteudo) else {
            return Err(AppError::ValidationError(errors));
        };
        errors.into_result()?;

        // A nova data também precisa caber na janela de edição
        if !access::can_modify_lancamento(actor, Operation::Update, base_id, equipe_id, date, today, self.edit_window_days) {
            return Err(AppError::denied(Resource::Lancamentos.as_str(), Some(id)));
        }

        self.lancamento_repo
            .update(&mut *conn, id, date, colaborador_id, &conteudo)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("lancamentos".into()))
    }

    pub async fn delete(&self, conn: &mut PgConnection, actor: &User, id: Uuid) -> Result<(), AppError> {
        let record = NewAuditRecord::new(Some(actor.id), "lancamentos.delete", "lancamentos").target(Some(id));
        let result: Result<(), AppError> = async {
            self.locate(&mut *conn, actor, Operation::Delete, id).await?;
            let current = self
                .lancamento_repo
                .find_for_update(&mut *conn, id)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("lancamentos".into()))?;
            self.ensure_modifiable(actor, Operation::Delete, &current, Utc::now().date_naive())?;

            if !self.lancamento_repo.delete(&mut *conn, id).await? {
                return Err(AppError::ResourceNotFound("lancamentos".into()));
            }
            Ok(())
        }
        .await;
        self.audit_service.track(conn, record, result, |_| None).await
    }

    fn ensure_modifiable(&self, actor: &User, operation: Operation, current: &Lancamento, today: NaiveDate) -> Result<(), AppError> {
        let allowed = access::can_modify_lancamento(
            actor,
            operation,
            current.base_id,
            current.equipe_id,
            current.data_referencia,
            today,
            self.edit_window_days,
        );
        if allowed {
            Ok(())
        } else {
            Err(AppError::denied(Resource::Lancamentos.as_str(), Some(current.id)))
        }
    }

    /// O colaborador, quando informado, precisa ser da mesma equipe do lançamento.
    async fn check_colaborador(
        &self,
        conn: &mut PgConnection,
        colaborador_id: Option<Uuid>,
        base_id: Uuid,
        equipe_id: Uuid,
        errors: &mut FieldErrors,
    ) -> Result<(), AppError> {
        let Some(colaborador_id) = colaborador_id else {
            return Ok(());
        };
        match self.directory_repo.colaborador_scope(conn, colaborador_id).await? {
            None => errors.add("colaboradorId", "Colaborador não encontrado."),
            Some(placement) if placement != (base_id, equipe_id) => {
                errors.add("colaboradorId", "O colaborador não pertence à equipe do lançamento.")
            }
            Some(_) => {}
        }
        Ok(())
    }

    // =========================================================================
    //  HISTÓRICO
    // =========================================================================

    pub async fn history(&self, conn: &mut PgConnection, actor: &User, query: &HistoryQuery) -> Result<Page<HistoryRecord>, AppError> {
        let scope = access::check(actor, Resource::Lancamentos, Operation::Read)?;
        let filter = parse_history_filter(query)?;
        scope.ensure_filter(Resource::Lancamentos, filter.base_id, filter.equipe_id)?;

        let page = PageRequest::new(query.page, query.page_size);
        let cursor = query
            .cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(HistoryCursor::decode)
            .transpose()?;

        let total = self.lancamento_repo.count_history(&mut *conn, &scope, &filter).await?;
        let rows = self
            .lancamento_repo
            .history_page(&mut *conn, &scope, &filter, page, cursor)
            .await?;

        // Página cheia: pode haver mais registros depois da última linha
        let next_cursor = match rows.last() {
            Some(last) if rows.len() as i64 == page.page_size => Some(
                HistoryCursor {
                    date: last.data_referencia,
                    id: last.id,
                }
                .encode(),
            ),
            _ => None,
        };

        let today = Utc::now().date_naive();
        let records = rows.into_iter().map(|row| self.to_record(actor, row, today)).collect();

        Ok(Page::new(records, total, page).with_cursor(next_cursor))
    }

    pub async fn export_csv(&self, conn: &mut PgConnection, actor: &User, query: &HistoryQuery) -> Result<String, AppError> {
        let scope = access::check(actor, Resource::Lancamentos, Operation::Read)?;
        let filter = parse_history_filter(query)?;
        scope.ensure_filter(Resource::Lancamentos, filter.base_id, filter.equipe_id)?;

        let rows = self.lancamento_repo.export_rows(conn, &scope, &filter).await?;
        tracing::info!("📤 Exportação CSV com {} lançamentos", rows.len());
        Ok(to_csv(&rows))
    }

    fn to_record(&self, actor: &User, row: LancamentoRow, today: NaiveDate) -> HistoryRecord {
        let can = |operation| {
            access::can_modify_lancamento(
                actor,
                operation,
                row.base_id,
                row.equipe_id,
                row.data_referencia,
                today,
                self.edit_window_days,
            )
        };
        let can_edit = can(Operation::Update);
        let can_delete = can(Operation::Delete);

        HistoryRecord {
            id: row.id,
            indicator: row.indicator_type,
            indicator_name: row.indicator_type.name(),
            date: row.data_referencia,
            base_id: row.base_id,
            base_nome: row.base_nome,
            equipe_id: row.equipe_id,
            equipe_nome: row.equipe_nome,
            colaborador_id: row.colaborador_id,
            user_id: row.user_id,
            user_nome: row.user_nome,
            conteudo: row.conteudo,
            created_at: row.created_at,
            updated_at: row.updated_at,
            can_edit,
            can_delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_filter_accepts_slug_and_dates() {
        let base = Uuid::new_v4();
        let query = HistoryQuery {
            indicator: Some("tempo-resposta".into()),
            period_start: Some("2025-01-01".into()),
            period_end: Some("2025-01-31".into()),
            base: Some(base),
            ..Default::default()
        };
        let filter = parse_history_filter(&query).unwrap();
        assert_eq!(filter.indicator, Some(IndicatorType::TempoResposta));
        assert_eq!(filter.period_start, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filter.base_id, Some(base));
        assert_eq!(filter.equipe_id, None);
    }

    #[test]
    fn history_filter_reports_every_bad_field() {
        let query = HistoryQuery {
            indicator: Some("nao-existe".into()),
            period_start: Some("2025-02-30".into()),
            ..Default::default()
        };
        match parse_history_filter(&query) {
            Err(AppError::ValidationError(errors)) => {
                assert!(errors.contains("indicator"));
                assert!(errors.contains("periodStart"));
            }
            other => panic!("esperava ValidationError, veio {:?}", other),
        }
    }

    #[test]
    fn history_filter_rejects_inverted_period() {
        let query = HistoryQuery {
            period_start: Some("2025-03-01".into()),
            period_end: Some("2025-02-01".into()),
            ..Default::default()
        };
        assert!(matches!(parse_history_filter(&query), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn empty_filters_are_ignored() {
        let query = HistoryQuery {
            indicator: Some(String::new()),
            period_end: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(parse_history_filter(&query).unwrap(), HistoryFilter::default());
    }

    #[test]
    fn csv_escapes_commas_quotes_and_json() {
        let row = LancamentoRow {
            id: Uuid::nil(),
            indicator_type: IndicatorType::ControleTrocas,
            data_referencia: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            conteudo: json!({ "qtd_trocas": 3 }),
            user_id: Uuid::nil(),
            user_nome: "Silva, \"Chefe\"".into(),
            base_id: Uuid::nil(),
            base_nome: "Goiânia".into(),
            equipe_id: Uuid::nil(),
            equipe_nome: "Alfa".into(),
            colaborador_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let csv = to_csv(&[row]);
        let mut lines = csv.split("\r\n");
        assert_eq!(lines.next(), Some(CSV_HEADER));

        let line = lines.next().unwrap();
        assert!(line.starts_with("00000000-0000-0000-0000-000000000000,2025-03-14,Controle de Trocas,Goiânia,Alfa,"));
        assert!(line.contains("\"Silva, \"\"Chefe\"\"\""));
        assert!(line.contains("\"{\"\"qtd_trocas\"\":3}\""));
    }
}
