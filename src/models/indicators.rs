// src/models/indicators.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// Mapeia o ENUM 'indicator_type' do Postgres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "indicator_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IndicatorType {
    AtividadesAcessorias,
    Treinamento,
    OcorrenciaAero,
    OcorrenciaNaoAero,
    Taf,
    ProvaTeorica,
    InspecaoViaturas,
    TempoTpEpr,
    TempoResposta,
    Estoque,
    ControleTrocas,
    VerificacaoTp,
    HigienizacaoTp,
    ControleEpi,
}

/// Regra de aderência de cada indicador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ComplianceGroup {
    /// Lançamento diário obrigatório.
    A,
    /// Eventual: só se acompanha a última data.
    B,
    /// Ao menos um lançamento por mês.
    C,
}

impl ComplianceGroup {
    pub fn periodicidade(&self) -> &'static str {
        match self {
            ComplianceGroup::A => "diario",
            ComplianceGroup::B => "eventual",
            ComplianceGroup::C => "mensal",
        }
    }
}

impl IndicatorType {
    pub const ALL: [IndicatorType; 14] = [
        IndicatorType::AtividadesAcessorias,
        IndicatorType::Treinamento,
        IndicatorType::OcorrenciaAero,
        IndicatorType::OcorrenciaNaoAero,
        IndicatorType::Taf,
        IndicatorType::ProvaTeorica,
        IndicatorType::InspecaoViaturas,
        IndicatorType::TempoTpEpr,
        IndicatorType::TempoResposta,
        IndicatorType::Estoque,
        IndicatorType::ControleTrocas,
        IndicatorType::VerificacaoTp,
        IndicatorType::HigienizacaoTp,
        IndicatorType::ControleEpi,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            IndicatorType::AtividadesAcessorias => "atividades_acessorias",
            IndicatorType::Treinamento => "treinamento",
            IndicatorType::OcorrenciaAero => "ocorrencia_aero",
            IndicatorType::OcorrenciaNaoAero => "ocorrencia_nao_aero",
            IndicatorType::Taf => "taf",
            IndicatorType::ProvaTeorica => "prova_teorica",
            IndicatorType::InspecaoViaturas => "inspecao_viaturas",
            IndicatorType::TempoTpEpr => "tempo_tp_epr",
            IndicatorType::TempoResposta => "tempo_resposta",
            IndicatorType::Estoque => "estoque",
            IndicatorType::ControleTrocas => "controle_trocas",
            IndicatorType::VerificacaoTp => "verificacao_tp",
            IndicatorType::HigienizacaoTp => "higienizacao_tp",
            IndicatorType::ControleEpi => "controle_epi",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorType::AtividadesAcessorias => "Atividades Acessórias",
            IndicatorType::Treinamento => "PTR-BA - Horas treinamento diário",
            IndicatorType::OcorrenciaAero => "Ocorrência Aeronáutica",
            IndicatorType::OcorrenciaNaoAero => "Ocorrência Não Aeronáutica",
            IndicatorType::Taf => "Teste de Aptidão Física (TAF)",
            IndicatorType::ProvaTeorica => "Prova Teórica",
            IndicatorType::InspecaoViaturas => "Inspeção de Viaturas",
            IndicatorType::TempoTpEpr => "Tempo de TP/EPR",
            IndicatorType::TempoResposta => "Tempo Resposta",
            IndicatorType::Estoque => "Controle de Estoque",
            IndicatorType::ControleTrocas => "Controle de Trocas",
            IndicatorType::VerificacaoTp => "Verificação de TP",
            IndicatorType::HigienizacaoTp => "Higienização de TP",
            IndicatorType::ControleEpi => "Controle de EPI",
        }
    }

    pub fn compliance_group(&self) -> ComplianceGroup {
        match self {
            IndicatorType::AtividadesAcessorias | IndicatorType::Treinamento => ComplianceGroup::A,
            IndicatorType::OcorrenciaAero | IndicatorType::OcorrenciaNaoAero | IndicatorType::Taf => {
                ComplianceGroup::B
            }
            _ => ComplianceGroup::C,
        }
    }

    pub fn is_ocorrencia(&self) -> bool {
        matches!(self, IndicatorType::OcorrenciaAero | IndicatorType::OcorrenciaNaoAero)
    }

    /// Aceita o slug com `_` ou `-` (`ocorrencia-aero` == `ocorrencia_aero`).
    pub fn from_slug(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|t| t.slug() == normalized)
    }
}

// Linha da tabela 'lancamentos'
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lancamento {
    pub id: Uuid,
    pub indicator_type: IndicatorType,
    pub data_referencia: NaiveDate,
    pub conteudo: Value,
    pub user_id: Uuid,
    pub base_id: Uuid,
    pub equipe_id: Uuid,
    pub colaborador_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// POST /api/lancamentos/{slug}
// A data chega como texto para que datas impossíveis virem erro de campo.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LancamentoPayload {
    #[serde(alias = "data_referencia", alias = "date")]
    #[schema(example = "2025-03-14")]
    pub data_referencia: String,
    #[serde(alias = "base_id")]
    pub base_id: Option<Uuid>,
    #[serde(alias = "equipe_id")]
    pub equipe_id: Option<Uuid>,
    #[serde(alias = "colaborador_id")]
    pub colaborador_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub conteudo: Value,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLancamentoPayload {
    #[serde(alias = "data_referencia")]
    pub data_referencia: Option<String>,
    #[serde(alias = "colaborador_id")]
    pub colaborador_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub conteudo: Option<Value>,
    /// Quando presente, a alteração só é aplicada se o registro não mudou desde a leitura.
    #[serde(alias = "expected_updated_at")]
    pub expected_updated_at: Option<DateTime<Utc>>,
}

// GET /api/history
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Slug do indicador.
    pub indicator: Option<String>,
    /// `YYYY-MM-DD`
    pub period_start: Option<String>,
    /// `YYYY-MM-DD`
    pub period_end: Option<String>,
    #[serde(alias = "base_id")]
    pub base: Option<Uuid>,
    #[serde(alias = "equipe_id")]
    pub equipe: Option<Uuid>,
    #[serde(alias = "colaborador_id")]
    pub colaborador: Option<Uuid>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Cursor opaco devolvido em `nextCursor`.
    pub cursor: Option<String>,
}

/// Filtros do histórico já interpretados.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HistoryFilter {
    pub indicator: Option<IndicatorType>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub base_id: Option<Uuid>,
    pub equipe_id: Option<Uuid>,
    pub colaborador_id: Option<Uuid>,
}

/// Linha do histórico com os nomes já resolvidos.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LancamentoRow {
    pub id: Uuid,
    pub indicator_type: IndicatorType,
    pub data_referencia: NaiveDate,
    pub conteudo: Value,
    pub user_id: Uuid,
    pub user_nome: String,
    pub base_id: Uuid,
    pub base_nome: String,
    pub equipe_id: Uuid,
    pub equipe_nome: String,
    pub colaborador_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: Uuid,
    pub indicator: IndicatorType,
    pub indicator_name: &'static str,
    pub date: NaiveDate,
    pub base_id: Uuid,
    pub base_nome: String,
    pub equipe_id: Uuid,
    pub equipe_nome: String,
    pub colaborador_id: Option<Uuid>,
    pub user_id: Uuid,
    pub user_nome: String,
    #[schema(value_type = Object)]
    pub conteudo: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: Uuid,
}

// GET /api/indicadores
#[derive(Debug, Serialize, ToSchema)]
pub struct IndicatorInfo {
    pub slug: &'static str,
    pub nome: &'static str,
    pub grupo: ComplianceGroup,
    pub periodicidade: &'static str,
}

impl From<IndicatorType> for IndicatorInfo {
    fn from(t: IndicatorType) -> Self {
        let grupo = t.compliance_group();
        Self {
            slug: t.slug(),
            nome: t.name(),
            grupo,
            periodicidade: grupo.periodicidade(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_round_trip_and_accept_dashes() {
        for t in IndicatorType::ALL {
            assert_eq!(IndicatorType::from_slug(t.slug()), Some(t));
        }
        assert_eq!(IndicatorType::from_slug("ocorrencia-nao-aero"), Some(IndicatorType::OcorrenciaNaoAero));
        assert_eq!(IndicatorType::from_slug("TAF"), Some(IndicatorType::Taf));
        assert_eq!(IndicatorType::from_slug("inexistente"), None);
    }

    #[test]
    fn slug_matches_serde_name() {
        for t in IndicatorType::ALL {
            assert_eq!(serde_json::to_value(t).unwrap(), Value::String(t.slug().to_string()));
        }
    }

    #[test]
    fn compliance_groups() {
        assert_eq!(IndicatorType::Treinamento.compliance_group(), ComplianceGroup::A);
        assert_eq!(IndicatorType::Taf.compliance_group(), ComplianceGroup::B);
        assert_eq!(IndicatorType::Estoque.compliance_group(), ComplianceGroup::C);
    }
}
