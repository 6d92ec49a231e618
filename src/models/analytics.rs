// src/models/analytics.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::indicators::{ComplianceGroup, IndicatorType};

// GET /api/analytics/dashboard
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    #[serde(alias = "base_id")]
    pub base: Option<Uuid>,
    #[serde(alias = "equipe_id")]
    pub equipe: Option<Uuid>,
    #[serde(alias = "colaborador_id")]
    pub colaborador: Option<Uuid>,
    /// Mês de referência `YYYY-MM`.
    pub periodo: Option<String>,
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    /// Lista de slugs separada por vírgula.
    pub tipos_ocorrencia: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_lancamentos: u64,
    /// Ocorrências aeronáuticas + não aeronáuticas.
    pub volume_operacional: u64,
    pub tempo_medio_resposta_segundos: Decimal,
    pub horas_treinamento: Decimal,
    pub taf_avaliados: u64,
    pub taf_reprovados: u64,
    pub bases_com_alerta: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    pub lancamentos: Vec<SeriesPoint>,
    pub ocorrencias: Vec<SeriesPoint>,
    pub horas_treinamento: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub posicao: u32,
    pub base_id: Uuid,
    pub base_nome: String,
    pub ocorrencias: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critico,
    Atencao,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub severity: AlertSeverity,
    pub base_id: Uuid,
    pub base_nome: String,
    pub indicator: IndicatorType,
    pub date: NaiveDate,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAnalytics {
    pub period: Period,
    pub kpis: Kpis,
    pub charts: Charts,
    pub ranking: Vec<RankingEntry>,
    pub alerts: Vec<Alert>,
}

// GET /api/analytics/compliance
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ComplianceQuery {
    #[serde(alias = "base_id")]
    pub base: Option<Uuid>,
    #[serde(alias = "equipe_id")]
    pub equipe: Option<Uuid>,
    /// Data de referência `YYYY-MM-DD` (padrão: hoje).
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceEntry {
    pub base_id: Uuid,
    pub base_nome: String,
    pub indicator: IndicatorType,
    pub grupo: ComplianceGroup,
    /// `None` para indicadores eventuais (grupo B).
    pub compliant: Option<bool>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub reference_date: NaiveDate,
    pub compliant_count: u64,
    pub required_count: u64,
    pub entries: Vec<ComplianceEntry>,
}

/// Linha mínima lida para agregação.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalyticsRow {
    pub id: Uuid,
    pub indicator_type: IndicatorType,
    pub data_referencia: NaiveDate,
    pub base_id: Uuid,
    pub base_nome: String,
    pub equipe_id: Uuid,
    pub conteudo: serde_json::Value,
}

/// Resumo por (base, indicador) até a data de referência.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ComplianceStat {
    pub base_id: Uuid,
    pub indicator_type: IndicatorType,
    pub last_date: Option<NaiveDate>,
    pub on_date: bool,
    pub in_month: bool,
}
