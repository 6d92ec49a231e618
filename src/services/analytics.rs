// src/services/analytics.rs

//! Agregação dos lançamentos para o painel. Funções puras: recebem as linhas
//! já filtradas pelo escopo do usuário e devolvem KPIs, séries e ranking.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::models::analytics::{
    Alert, AlertSeverity, AnalyticsRow, Charts, ComplianceEntry, ComplianceReport, ComplianceStat,
    DashboardAnalytics, Kpis, Period, RankingEntry, SeriesPoint,
};
use crate::models::indicators::{ComplianceGroup, IndicatorType};
use crate::services::indicator_schema::{parse_hh_mm, parse_mm_ss};

pub const MAX_ALERTS: usize = 10;

// Itens de estoque: (rótulo, campo atual, campo exigido)
const ESTOQUE_ITENS: [(&str, &str, &str); 3] = [
    ("Pó Químico", "po_quimico_atual", "po_quimico_exigido"),
    ("LGE", "lge_atual", "lge_exigido"),
    ("Nitrogênio", "nitrogenio_atual", "nitrogenio_exigido"),
];

fn items<'a>(conteudo: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    conteudo
        .get(key)
        .and_then(Value::as_array)
        .map(|v| v.as_slice())
        .unwrap_or_default()
        .iter()
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn minutes_to_hours(minutes: u64) -> Decimal {
    (Decimal::from(minutes) / Decimal::from(60)).round_dp(2)
}

/// Uma ocorrência passa no filtro se o slug do indicador ou o `tipo_ocorrencia`
/// do conteúdo estiver na lista. Lançamentos que não são ocorrência não são afetados.
fn matches_tipos(row: &AnalyticsRow, tipos: Option<&[String]>) -> bool {
    let Some(tipos) = tipos.filter(|t| !t.is_empty()) else {
        return true;
    };
    if !row.indicator_type.is_ocorrencia() {
        return true;
    }
    let slug = row.indicator_type.slug();
    let tipo = str_field(&row.conteudo, "tipo_ocorrencia");
    tipos
        .iter()
        .any(|t| t == slug || Some(t.as_str()) == tipo || IndicatorType::from_slug(t) == Some(row.indicator_type))
}

fn series(map: BTreeMap<NaiveDate, Decimal>) -> Vec<SeriesPoint> {
    // BTreeMap já entrega as datas em ordem crescente
    map.into_iter().map(|(date, value)| SeriesPoint { date, value }).collect()
}

fn alerts_for(row: &AnalyticsRow) -> Vec<Alert> {
    let alert = |severity, message: String| Alert {
        severity,
        base_id: row.base_id,
        base_nome: row.base_nome.clone(),
        indicator: row.indicator_type,
        date: row.data_referencia,
        message,
    };

    match row.indicator_type {
        IndicatorType::Estoque => ESTOQUE_ITENS
            .iter()
            .filter_map(|(rotulo, atual, exigido)| {
                let atual = row.conteudo.get(*atual).and_then(Value::as_f64)?;
                let exigido = row.conteudo.get(*exigido).and_then(Value::as_f64)?;
                (atual < exigido).then(|| {
                    alert(
                        AlertSeverity::Critico,
                        format!("Estoque crítico de {}: {} de {} exigido", rotulo, atual, exigido),
                    )
                })
            })
            .collect(),
        IndicatorType::InspecaoViaturas => items(&row.conteudo, "inspecoes")
            .filter(|i| i.get("qtd_nao_conforme").and_then(Value::as_i64).unwrap_or(0) > 0)
            .map(|i| {
                let viatura = str_field(i, "viatura").unwrap_or("?");
                alert(AlertSeverity::Critico, format!("Viatura {} Não Conforme", viatura))
            })
            .collect(),
        IndicatorType::Taf => {
            let reprovados = items(&row.conteudo, "avaliados")
                .filter(|a| str_field(a, "status") == Some("Reprovado"))
                .count();
            if reprovados > 0 {
                vec![alert(
                    AlertSeverity::Atencao,
                    format!("{} reprovado(s) no TAF", reprovados),
                )]
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

/// Calcula o painel a partir das linhas do período. Lançamentos do mesmo dia
/// são somados, nunca substituídos.
pub fn compute(rows: &[AnalyticsRow], period: Period, tipos_ocorrencia: Option<&[String]>) -> DashboardAnalytics {
    let mut kpis = Kpis::default();

    let mut por_dia: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    let mut ocorrencias_dia: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    let mut horas_dia: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    let mut ocorrencias_base: HashMap<Uuid, (String, u64)> = HashMap::new();

    let mut tempo_resposta_total: u64 = 0;
    let mut tempo_resposta_qtd: u64 = 0;
    let mut minutos_treinamento: u64 = 0;
    let mut alerts: Vec<Alert> = Vec::new();

    for row in rows.iter().filter(|r| matches_tipos(r, tipos_ocorrencia)) {
        kpis.total_lancamentos += 1;
        *por_dia.entry(row.data_referencia).or_default() += Decimal::ONE;

        match row.indicator_type {
            t if t.is_ocorrencia() => {
                kpis.volume_operacional += 1;
                *ocorrencias_dia.entry(row.data_referencia).or_default() += Decimal::ONE;
                ocorrencias_base
                    .entry(row.base_id)
                    .or_insert_with(|| (row.base_nome.clone(), 0))
                    .1 += 1;
            }
            IndicatorType::TempoResposta => {
                for segundos in items(&row.conteudo, "afericoes")
                    .filter_map(|a| str_field(a, "tempo"))
                    .filter_map(|t| parse_mm_ss(t, 4))
                {
                    tempo_resposta_total += u64::from(segundos);
                    tempo_resposta_qtd += 1;
                }
            }
            IndicatorType::Treinamento => {
                let minutos: u64 = items(&row.conteudo, "participantes")
                    .filter_map(|p| str_field(p, "horas"))
                    .filter_map(parse_hh_mm)
                    .map(u64::from)
                    .sum();
                minutos_treinamento += minutos;
                *horas_dia.entry(row.data_referencia).or_default() += minutos;
            }
            IndicatorType::Taf => {
                for avaliado in items(&row.conteudo, "avaliados") {
                    kpis.taf_avaliados += 1;
                    if str_field(avaliado, "status") == Some("Reprovado") {
                        kpis.taf_reprovados += 1;
                    }
                }
            }
            _ => {}
        }

        alerts.extend(alerts_for(row));
    }

    if tempo_resposta_qtd > 0 {
        kpis.tempo_medio_resposta_segundos =
            (Decimal::from(tempo_resposta_total) / Decimal::from(tempo_resposta_qtd)).round_dp(2);
    }
    kpis.horas_treinamento = minutes_to_hours(minutos_treinamento);
    kpis.bases_com_alerta = alerts
        .iter()
        .filter(|a| a.severity == AlertSeverity::Critico)
        .map(|a| a.base_id)
        .collect::<BTreeSet<_>>()
        .len() as u64;

    // Ranking: mais ocorrências primeiro, empate pelo id da base
    let mut ranking: Vec<(Uuid, String, u64)> = ocorrencias_base
        .into_iter()
        .map(|(id, (nome, qtd))| (id, nome, qtd))
        .collect();
    ranking.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
    let ranking = ranking
        .into_iter()
        .enumerate()
        .map(|(i, (base_id, base_nome, ocorrencias))| RankingEntry {
            posicao: i as u32 + 1,
            base_id,
            base_nome,
            ocorrencias,
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then(b.date.cmp(&a.date))
            .then(a.base_nome.cmp(&b.base_nome))
            .then(a.base_id.cmp(&b.base_id))
            .then(a.message.cmp(&b.message))
    });
    alerts.truncate(MAX_ALERTS);

    let charts = Charts {
        lancamentos: series(por_dia),
        ocorrencias: series(ocorrencias_dia),
        horas_treinamento: series(
            horas_dia.into_iter().map(|(d, m)| (d, minutes_to_hours(m))).collect(),
        ),
    };

    DashboardAnalytics {
        period,
        kpis,
        charts,
        ranking,
        alerts,
    }
}

// =============================================================================
//  ADERÊNCIA
// =============================================================================

/// Monta o relatório de aderência: uma entrada por (base, indicador).
/// Grupo A exige lançamento na data, grupo C no mês; grupo B só informa a última data.
pub fn compliance(bases: &[(Uuid, String)], stats: &[ComplianceStat], reference_date: NaiveDate) -> ComplianceReport {
    let index: HashMap<(Uuid, IndicatorType), &ComplianceStat> =
        stats.iter().map(|s| ((s.base_id, s.indicator_type), s)).collect();

    let mut entries = Vec::with_capacity(bases.len() * IndicatorType::ALL.len());
    for (base_id, base_nome) in bases {
        for indicator in IndicatorType::ALL {
            let stat = index.get(&(*base_id, indicator));
            let grupo = indicator.compliance_group();
            let compliant = match grupo {
                ComplianceGroup::A => Some(stat.is_some_and(|s| s.on_date)),
                ComplianceGroup::C => Some(stat.is_some_and(|s| s.in_month)),
                ComplianceGroup::B => None,
            };
            entries.push(ComplianceEntry {
                base_id: *base_id,
                base_nome: base_nome.clone(),
                indicator,
                grupo,
                compliant,
                last_date: stat.and_then(|s| s.last_date),
            });
        }
    }

    ComplianceReport {
        reference_date,
        compliant_count: entries.iter().filter(|e| e.compliant == Some(true)).count() as u64,
        required_count: entries.iter().filter(|e| e.compliant.is_some()).count() as u64,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn period() -> Period {
        Period { start: date(1), end: date(31) }
    }

    fn row(indicator: IndicatorType, day: u32, base_id: Uuid, conteudo: Value) -> AnalyticsRow {
        AnalyticsRow {
            id: Uuid::new_v4(),
            indicator_type: indicator,
            data_referencia: date(day),
            base_id,
            base_nome: format!("Base {}", &base_id.to_string()[..4]),
            equipe_id: Uuid::nil(),
            conteudo,
        }
    }

    fn aero() -> Value {
        json!({ "tipo_ocorrencia": "Emergência aeronáutica", "acao": "Posicionamento" })
    }

    #[test]
    fn same_day_entries_are_all_counted() {
        let base = Uuid::new_v4();
        let rows = vec![
            row(IndicatorType::OcorrenciaAero, 10, base, aero()),
            row(IndicatorType::OcorrenciaAero, 10, base, aero()),
        ];

        let result = compute(&rows, period(), None);

        assert_eq!(result.kpis.total_lancamentos, 2);
        assert_eq!(result.kpis.volume_operacional, 2);
        assert_eq!(result.charts.ocorrencias, vec![SeriesPoint { date: date(10), value: Decimal::from(2) }]);
        assert_eq!(result.ranking.len(), 1);
        assert_eq!(result.ranking[0].ocorrencias, 2);
    }

    #[test]
    fn series_are_sorted_by_date() {
        let base = Uuid::new_v4();
        let rows = vec![
            row(IndicatorType::Treinamento, 20, base, json!({ "participantes": [{ "nome": "A", "horas": "01:30" }] })),
            row(IndicatorType::Treinamento, 5, base, json!({ "participantes": [{ "nome": "B", "horas": "00:45" }] })),
            row(IndicatorType::OcorrenciaAero, 12, base, aero()),
        ];

        let result = compute(&rows, period(), None);

        for serie in [&result.charts.lancamentos, &result.charts.ocorrencias, &result.charts.horas_treinamento] {
            assert!(serie.windows(2).all(|w| w[0].date <= w[1].date));
        }
        assert_eq!(result.kpis.horas_treinamento, Decimal::new(225, 2));
        assert_eq!(result.charts.horas_treinamento[0].value, Decimal::new(75, 2));
    }

    #[test]
    fn ranking_ties_are_broken_by_base_id() {
        let (a, b) = {
            let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
            if x < y { (x, y) } else { (y, x) }
        };
        let c = Uuid::new_v4();
        let rows = vec![
            row(IndicatorType::OcorrenciaAero, 1, b, aero()),
            row(IndicatorType::OcorrenciaAero, 2, a, aero()),
            row(IndicatorType::OcorrenciaNaoAero, 3, c, json!({ "tipo_ocorrencia": "Incêndios Florestais" })),
            row(IndicatorType::OcorrenciaNaoAero, 4, c, json!({ "tipo_ocorrencia": "Incêndios Florestais" })),
        ];

        let ranking = compute(&rows, period(), None).ranking;

        assert_eq!(ranking[0].base_id, c);
        assert_eq!(ranking[1].base_id, a);
        assert_eq!(ranking[2].base_id, b);
        assert_eq!(ranking.iter().map(|r| r.posicao).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn kpis_from_content() {
        let base = Uuid::new_v4();
        let rows = vec![
            row(IndicatorType::TempoResposta, 3, base, json!({ "afericoes": [{ "tempo": "02:00" }, { "tempo": "03:01" }] })),
            row(IndicatorType::Taf, 4, base, json!({ "avaliados": [{ "status": "Aprovado" }, { "status": "Reprovado" }] })),
            row(IndicatorType::Estoque, 5, base, json!({ "lge_atual": 10.0, "lge_exigido": 20.0 })),
        ];

        let result = compute(&rows, period(), None);

        assert_eq!(result.kpis.tempo_medio_resposta_segundos, Decimal::new(1505, 1));
        assert_eq!(result.kpis.taf_avaliados, 2);
        assert_eq!(result.kpis.taf_reprovados, 1);
        assert_eq!(result.kpis.bases_com_alerta, 1);
        assert_eq!(result.alerts.len(), 2);
        assert_eq!(result.alerts[0].severity, AlertSeverity::Critico);
    }

    #[test]
    fn empty_input_gives_zeroed_kpis() {
        let result = compute(&[], period(), None);
        assert_eq!(result.kpis, Kpis::default());
        assert!(result.ranking.is_empty());
        assert!(result.charts.lancamentos.is_empty());
    }

    #[test]
    fn tipos_ocorrencia_filters_only_occurrences() {
        let base = Uuid::new_v4();
        let rows = vec![
            row(IndicatorType::OcorrenciaAero, 1, base, aero()),
            row(IndicatorType::OcorrenciaNaoAero, 1, base, json!({ "tipo_ocorrencia": "Incêndios Florestais" })),
            row(IndicatorType::ControleTrocas, 1, base, json!({ "qtd_trocas": 2 })),
        ];

        let filtro = vec!["Incêndios Florestais".to_string()];
        let result = compute(&rows, period(), Some(&filtro));
        assert_eq!(result.kpis.volume_operacional, 1);
        assert_eq!(result.kpis.total_lancamentos, 2);

        let filtro = vec!["ocorrencia-aero".to_string()];
        assert_eq!(compute(&rows, period(), Some(&filtro)).kpis.volume_operacional, 1);
    }

    #[test]
    fn alerts_are_capped() {
        let base = Uuid::new_v4();
        let inspecoes: Vec<Value> = (1..=6)
            .map(|i| json!({ "viatura": format!("CCI 0{}", i), "qtd_inspecoes": 1, "qtd_nao_conforme": 1 }))
            .collect();
        let rows = vec![
            row(IndicatorType::InspecaoViaturas, 1, base, json!({ "inspecoes": inspecoes.clone() })),
            row(IndicatorType::InspecaoViaturas, 2, base, json!({ "inspecoes": inspecoes })),
        ];

        assert_eq!(compute(&rows, period(), None).alerts.len(), MAX_ALERTS);
    }

    #[test]
    fn compliance_by_group() {
        let base = Uuid::new_v4();
        let stats = vec![
            ComplianceStat {
                base_id: base,
                indicator_type: IndicatorType::Treinamento,
                last_date: Some(date(14)),
                on_date: true,
                in_month: true,
            },
            ComplianceStat {
                base_id: base,
                indicator_type: IndicatorType::AtividadesAcessorias,
                last_date: Some(date(13)),
                on_date: false,
                in_month: true,
            },
            ComplianceStat {
                base_id: base,
                indicator_type: IndicatorType::Estoque,
                last_date: Some(date(2)),
                on_date: false,
                in_month: true,
            },
        ];

        let report = compliance(&[(base, "Base X".into())], &stats, date(14));
        let entry = |t: IndicatorType| report.entries.iter().find(|e| e.indicator == t).unwrap();

        assert_eq!(report.entries.len(), IndicatorType::ALL.len());
        assert_eq!(entry(IndicatorType::Treinamento).compliant, Some(true));
        assert_eq!(entry(IndicatorType::AtividadesAcessorias).compliant, Some(false));
        assert_eq!(entry(IndicatorType::Estoque).compliant, Some(true));
        assert_eq!(entry(IndicatorType::Taf).compliant, None);
        assert_eq!(entry(IndicatorType::ControleEpi).compliant, Some(false));
        assert_eq!(report.compliant_count, 2);
        // 2 do grupo A + 9 do grupo C
        assert_eq!(report.required_count, 11);
    }
}
