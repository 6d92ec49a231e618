// src/services/analytics_service.rs

use chrono::{Datelike, Months, NaiveDate, Utc};
use sqlx::PgConnection;

use crate::{
    common::error::{AppError, FieldErrors},
    db::{DirectoryRepository, LancamentoRepository},
    models::{
        analytics::{AnalyticsQuery, ComplianceQuery, ComplianceReport, DashboardAnalytics, Period},
        auth::User,
        indicators::HistoryFilter,
    },
    services::{
        access::{self, Operation, Resource},
        analytics,
        indicator_schema::parse_date,
    },
};

/// Maior intervalo aceito pelo painel.
pub const MAX_PERIOD_MONTHS: u32 = 12;

fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    first_day_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .unwrap_or(date)
}

/// Resolve o período do painel: `periodo=YYYY-MM`, ou `periodStart`/`periodEnd`,
/// ou o mês corrente. Intervalos acima de 12 meses são recusados.
pub fn resolve_period(query: &AnalyticsQuery, today: NaiveDate) -> Result<Period, AppError> {
    let mut errors = FieldErrors::new();
    let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(periodo) = non_empty(&query.periodo) {
        let Some(start) = parse_date(&format!("{}-01", periodo)) else {
            return Err(AppError::field("periodo", "Período inválido (use AAAA-MM)."));
        };
        return Ok(Period {
            start,
            end: last_day_of_month(start),
        });
    }

    let mut date = |field: &str, raw: Option<String>| match raw {
        Some(raw) => {
            let parsed = parse_date(&raw);
            if parsed.is_none() {
                errors.add(field, "Data inválida (use AAAA-MM-DD).");
            }
            parsed
        }
        None => None,
    };
    let start = date("periodStart", non_empty(&query.period_start));
    let end = date("periodEnd", non_empty(&query.period_end));
    errors.into_result()?;

    let period = match (start, end) {
        (None, None) => Period {
            start: first_day_of_month(today),
            end: last_day_of_month(today),
        },
        (Some(start), None) => Period { start, end: today.max(start) },
        (None, Some(end)) => Period {
            start: first_day_of_month(end),
            end,
        },
        (Some(start), Some(end)) => Period { start, end },
    };

    if period.start > period.end {
        return Err(AppError::field("periodEnd", "O fim do período deve ser posterior ao início."));
    }
    let limit = period.start.checked_add_months(Months::new(MAX_PERIOD_MONTHS));
    if limit.is_none_or(|limit| period.end > limit) {
        return Err(AppError::field("periodEnd", "O período não pode passar de 12 meses."));
    }
    Ok(period)
}

/// Lista `a,b,c` de slugs; vazia = sem filtro.
fn parse_tipos(raw: Option<&str>) -> Option<Vec<String>> {
    let tipos: Vec<String> = raw?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!tipos.is_empty()).then_some(tipos)
}

#[derive(Clone)]
pub struct AnalyticsService {
    lancamento_repo: LancamentoRepository,
    directory_repo: DirectoryRepository,
}

impl AnalyticsService {
    pub fn new(lancamento_repo: LancamentoRepository, directory_repo: DirectoryRepository) -> Self {
        Self {
            lancamento_repo,
            directory_repo,
        }
    }

    pub async fn dashboard(&self, conn: &mut PgConnection, actor: &User, query: &AnalyticsQuery) -> Result<DashboardAnalytics, AppError> {
        let scope = access::check(actor, Resource::Analytics, Operation::Read)?;
        scope.ensure_filter(Resource::Analytics, query.base, query.equipe)?;

        let period = resolve_period(query, Utc::now().date_naive())?;
        let filter = HistoryFilter {
            indicator: None,
            period_start: Some(period.start),
            period_end: Some(period.end),
            base_id: query.base,
            equipe_id: query.equipe,
            colaborador_id: query.colaborador,
        };

        let rows = self.lancamento_repo.analytics_rows(conn, &scope, &filter).await?;
        let tipos = parse_tipos(query.tipos_ocorrencia.as_deref());

        tracing::debug!("📊 Painel: {} lançamentos entre {} e {}", rows.len(), period.start, period.end);
        Ok(analytics::compute(&rows, period, tipos.as_deref()))
    }

    pub async fn compliance(&self, conn: &mut PgConnection, actor: &User, query: &ComplianceQuery) -> Result<ComplianceReport, AppError> {
        let scope = access::check(actor, Resource::Analytics, Operation::Read)?;
        scope.ensure_filter(Resource::Analytics, query.base, query.equipe)?;

        let reference_date = match query.date.as_deref().filter(|d| !d.trim().is_empty()) {
            Some(raw) => parse_date(raw).ok_or_else(|| AppError::field("date", "Data inválida (use AAAA-MM-DD)."))?,
            None => Utc::now().date_naive(),
        };

        let bases: Vec<(uuid::Uuid, String)> = self
            .directory_repo
            .list_bases(&mut *conn)
            .await?
            .into_iter()
            .filter(|b| scope.permits_base(b.id) && query.base.is_none_or(|id| id == b.id))
            .map(|b| (b.id, b.nome))
            .collect();

        let stats = self
            .lancamento_repo
            .compliance_stats(&mut *conn, &scope, query.base, query.equipe, reference_date)
            .await?;

        Ok(analytics::compliance(&bases, &stats, reference_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn defaults_to_current_month() {
        let period = resolve_period(&AnalyticsQuery::default(), d(2024, 2, 10)).unwrap();
        assert_eq!(period, Period { start: d(2024, 2, 1), end: d(2024, 2, 29) });
    }

    #[test]
    fn periodo_selects_whole_month() {
        let query = AnalyticsQuery {
            periodo: Some("2025-04".into()),
            ..Default::default()
        };
        let period = resolve_period(&query, d(2025, 6, 1)).unwrap();
        assert_eq!(period, Period { start: d(2025, 4, 1), end: d(2025, 4, 30) });

        let bad = AnalyticsQuery {
            periodo: Some("2025-13".into()),
            ..Default::default()
        };
        assert!(matches!(resolve_period(&bad, d(2025, 6, 1)), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn explicit_range_up_to_twelve_months() {
        let ok = AnalyticsQuery {
            period_start: Some("2024-01-01".into()),
            period_end: Some("2025-01-01".into()),
            ..Default::default()
        };
        assert!(resolve_period(&ok, d(2025, 6, 1)).is_ok());

        let too_long = AnalyticsQuery {
            period_start: Some("2024-01-01".into()),
            period_end: Some("2025-01-02".into()),
            ..Default::default()
        };
        assert!(matches!(resolve_period(&too_long, d(2025, 6, 1)), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn rejects_inverted_or_malformed_range() {
        let inverted = AnalyticsQuery {
            period_start: Some("2025-03-01".into()),
            period_end: Some("2025-02-01".into()),
            ..Default::default()
        };
        assert!(resolve_period(&inverted, d(2025, 6, 1)).is_err());

        let malformed = AnalyticsQuery {
            period_start: Some("01/03/2025".into()),
            ..Default::default()
        };
        assert!(resolve_period(&malformed, d(2025, 6, 1)).is_err());
    }

    #[test]
    fn tipos_list_ignores_blanks() {
        assert_eq!(parse_tipos(None), None);
        assert_eq!(parse_tipos(Some(" , ")), None);
        assert_eq!(
            parse_tipos(Some("ocorrencia_aero, Incêndios Florestais")),
            Some(vec!["ocorrencia_aero".to_string(), "Incêndios Florestais".to_string()])
        );
    }
}
