// src/services/indicator_schema.rs

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::{common::error::FieldErrors, models::indicators::IndicatorType};

pub const ATIVIDADE_NAO_PREVISTA: &str = "atividade não prevista";

pub const TIPOS_ATIVIDADE: [&str; 7] = [
    "Inspeção de extintores e mangueiras",
    "Inspeção de pista",
    "Inspeção de fauna",
    "Derramamento de combustível",
    "Acompanhamento de serviços",
    "inspeção área de cessionários",
    ATIVIDADE_NAO_PREVISTA,
];

pub const TIPOS_OCORRENCIA_NAO_AERO: [&str; 9] = [
    "Incêndios ou Vazamentos de Combustíveis no PAA",
    "Condições de Baixa Visibilidade",
    "Atendimento a Aeronave Presidencial",
    "Incêndio em Instalações Aeroportuárias",
    "Ocorrências com Artigos Perigosos",
    "Remoção de Animais e Dispersão de Avifauna",
    "Incêndios Florestais",
    "Emergências Médicas em Geral",
    "Iluminação de Emergência em Pista",
];

pub const VIATURAS: [&str; 14] = [
    "CCI 01", "CCI 02", "CCI 03", "CCI 04", "CCI 05", "CCI 06",
    "CRS 01", "CRS 02", "CRS 03",
    "CCI RT 01", "CCI RT 02", "CCI RT 03",
    "CA 01", "CA 02",
];

const EMERGENCIA_AERONAUTICA: &str = "Emergência aeronáutica";

// =============================================================================
//  FORMATOS DE DATA E HORA
// =============================================================================

/// `YYYY-MM-DD` estrito; datas inexistentes (ex: 2025-02-30) são recusadas.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

pub fn parse_data_referencia(raw: &str) -> Result<NaiveDate, FieldErrors> {
    parse_date(raw).ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.add("dataReferencia", "Data inválida (use AAAA-MM-DD com uma data existente).");
        errors
    })
}

fn two_digits(s: &str) -> Option<u32> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// `HH:mm` em minutos desde 00:00.
pub fn parse_hh_mm(value: &str) -> Option<u32> {
    let (h, m) = value.split_once(':')?;
    let (h, m) = (two_digits(h)?, two_digits(m)?);
    (h <= 23 && m <= 59).then_some(h * 60 + m)
}

/// `mm:ss` em segundos, com minutos limitados a `max_minutes`.
pub fn parse_mm_ss(value: &str, max_minutes: u32) -> Option<u32> {
    let (m, s) = value.split_once(':')?;
    let (m, s) = (two_digits(m)?, two_digits(s)?);
    (m <= 59 && s <= 59 && m <= max_minutes).then_some(m * 60 + s)
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn hh_mm(value: &str) -> Result<(), ValidationError> {
    parse_hh_mm(value)
        .map(|_| ())
        .ok_or_else(|| invalid("hh_mm", "Formato inválido (HH:mm)"))
}

fn mm_ss_59(value: &str) -> Result<(), ValidationError> {
    parse_mm_ss(value, 59)
        .map(|_| ())
        .ok_or_else(|| invalid("mm_ss", "Formato inválido (mm:ss, máx 59:59)"))
}

fn mm_ss_4(value: &str) -> Result<(), ValidationError> {
    parse_mm_ss(value, 4)
        .map(|_| ())
        .ok_or_else(|| invalid("mm_ss", "Formato inválido (mm:ss, máx 04:59)"))
}

fn tipo_atividade(value: &str) -> Result<(), ValidationError> {
    if TIPOS_ATIVIDADE.contains(&value) {
        Ok(())
    } else {
        Err(invalid("one_of", "Selecione o tipo de atividade"))
    }
}

fn tipo_ocorrencia_nao_aero(value: &str) -> Result<(), ValidationError> {
    if TIPOS_OCORRENCIA_NAO_AERO.contains(&value) {
        Ok(())
    } else {
        Err(invalid("one_of", "Selecione o tipo de ocorrência"))
    }
}

fn emergencia_aeronautica(value: &str) -> Result<(), ValidationError> {
    if value == EMERGENCIA_AERONAUTICA {
        Ok(())
    } else {
        Err(invalid("literal", "Tipo de ocorrência deve ser \"Emergência aeronáutica\""))
    }
}

fn acao_aero(value: &str) -> Result<(), ValidationError> {
    if matches!(value, "Posicionamento" | "Intervenção") {
        Ok(())
    } else {
        Err(invalid("one_of", "Ação deve ser Posicionamento ou Intervenção"))
    }
}

fn viatura(value: &str) -> Result<(), ValidationError> {
    if VIATURAS.contains(&value) {
        Ok(())
    } else {
        Err(invalid("one_of", "Viatura desconhecida"))
    }
}

// =============================================================================
//  REGRAS DERIVADAS
// =============================================================================

/// Status e nota do TAF pela idade e pelo tempo de prova.
pub fn taf_result(idade: i64, tempo_segundos: u32) -> (&'static str, Option<u8>) {
    let limites: [u32; 4] = if idade < 40 { [120, 140, 160, 180] } else { [180, 200, 220, 240] };
    for (limite, nota) in limites.into_iter().zip([10u8, 9, 8, 7]) {
        if tempo_segundos <= limite {
            return ("Aprovado", Some(nota));
        }
    }
    ("Reprovado", None)
}

pub fn prova_teorica_status(nota: f64) -> &'static str {
    if nota >= 8.0 { "Aprovado" } else { "Reprovado" }
}

pub fn tp_epr_status(tempo_segundos: u32) -> &'static str {
    if tempo_segundos <= 59 { "Aprovado" } else { "Reprovado" }
}

fn percentage(entregue: i64, previsto: i64) -> i64 {
    if previsto <= 0 {
        0
    } else {
        ((entregue as f64 / previsto as f64) * 100.0).round() as i64
    }
}

// =============================================================================
//  ESQUEMAS POR INDICADOR
// =============================================================================

trait Conteudo: DeserializeOwned + Serialize + Validate {
    /// Regras entre campos que o derive não expressa.
    fn check(&self, _errors: &mut FieldErrors) {}
    /// Campos calculados no servidor (status, notas, percentuais).
    fn derive(&mut self) {}
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct AtividadesAcessorias {
    #[serde(default)]
    #[validate(custom(function = "tipo_atividade"))]
    tipo_atividade: String,
    #[validate(range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    qtd_equipamentos: Option<i64>,
    #[validate(range(min = 1, message = "Informe ao menos 1 bombeiro"))]
    qtd_bombeiros: Option<i64>,
    #[validate(custom(function = "hh_mm"))]
    tempo_gasto: Option<String>,
}

impl Conteudo for AtividadesAcessorias {
    fn check(&self, errors: &mut FieldErrors) {
        if self.tipo_atividade == ATIVIDADE_NAO_PREVISTA {
            return;
        }
        let obrigatorio = "Obrigatório para este tipo de atividade";
        if self.qtd_equipamentos.is_none() {
            errors.add("qtd_equipamentos", obrigatorio);
        }
        if self.qtd_bombeiros.is_none() {
            errors.add("qtd_bombeiros", obrigatorio);
        }
        if self.tempo_gasto.as_deref().is_none_or(str::is_empty) {
            errors.add("tempo_gasto", obrigatorio);
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct Participante {
    #[serde(default)]
    #[validate(length(min = 1, message = "Nome é obrigatório"))]
    nome: String,
    #[serde(default)]
    #[validate(custom(function = "hh_mm"))]
    horas: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct Treinamento {
    #[serde(default)]
    #[validate(length(min = 1, message = "Adicione pelo menos um participante"), nested)]
    participantes: Vec<Participante>,
}

impl Conteudo for Treinamento {}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct OcorrenciaAero {
    #[serde(default = "default_emergencia")]
    #[validate(custom(function = "emergencia_aeronautica"))]
    tipo_ocorrencia: String,
    #[serde(default)]
    #[validate(custom(function = "acao_aero"))]
    acao: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Local é obrigatório"))]
    local: String,
    #[serde(default)]
    #[validate(custom(function = "hh_mm"))]
    hora_acionamento: String,
    #[serde(default)]
    #[validate(custom(function = "mm_ss_59"))]
    tempo_chegada_1_cci: String,
    #[serde(default)]
    #[validate(custom(function = "mm_ss_59"))]
    tempo_chegada_ult_cci: String,
    #[serde(default)]
    #[validate(custom(function = "hh_mm"))]
    termino_ocorrencia: String,
}

fn default_emergencia() -> String {
    EMERGENCIA_AERONAUTICA.to_string()
}

impl Conteudo for OcorrenciaAero {}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct OcorrenciaNaoAero {
    #[serde(default)]
    #[validate(custom(function = "tipo_ocorrencia_nao_aero"))]
    tipo_ocorrencia: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Local é obrigatório"))]
    local: String,
    #[serde(default)]
    #[validate(custom(function = "hh_mm"))]
    hora_acionamento: String,
    #[serde(default)]
    #[validate(custom(function = "hh_mm"))]
    hora_chegada: String,
    #[serde(default)]
    #[validate(custom(function = "hh_mm"))]
    hora_termino: String,
    #[serde(default, skip_deserializing)]
    duracao_total: Option<String>,
    #[validate(length(max = 2000, message = "Observações devem ter no máximo 2000 caracteres"))]
    observacoes: Option<String>,
}

impl Conteudo for OcorrenciaNaoAero {
    fn derive(&mut self) {
        // Ocorrência que atravessa a meia-noite
        if let (Some(inicio), Some(fim)) = (parse_hh_mm(&self.hora_acionamento), parse_hh_mm(&self.hora_termino)) {
            let minutos = (fim + 24 * 60 - inicio) % (24 * 60);
            self.duracao_total = Some(format!("{:02}:{:02}", minutos / 60, minutos % 60));
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct AvaliadoTaf {
    #[serde(default)]
    #[validate(length(min = 1, message = "Nome é obrigatório"))]
    nome: String,
    #[validate(required(message = "Idade é obrigatória"), range(min = 1, message = "Idade deve ser maior que 0"))]
    idade: Option<i64>,
    #[serde(default)]
    #[validate(custom(function = "mm_ss_4"))]
    tempo: String,
    #[serde(default, skip_deserializing)]
    status: Option<String>,
    #[serde(default, skip_deserializing)]
    nota: Option<u8>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct Taf {
    #[serde(default)]
    #[validate(length(min = 1, message = "Adicione pelo menos um avaliado"), nested)]
    avaliados: Vec<AvaliadoTaf>,
}

impl Conteudo for Taf {
    fn derive(&mut self) {
        for avaliado in &mut self.avaliados {
            if let (Some(idade), Some(segundos)) = (avaliado.idade, parse_mm_ss(&avaliado.tempo, 4)) {
                let (status, nota) = taf_result(idade, segundos);
                avaliado.status = Some(status.to_string());
                avaliado.nota = nota;
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct AvaliadoProva {
    #[serde(default)]
    #[validate(length(min = 1, message = "Nome é obrigatório"))]
    nome: String,
    #[validate(required(message = "Nota é obrigatória"), range(min = 0.0, max = 10.0, message = "A nota deve estar entre 0 e 10"))]
    nota: Option<f64>,
    #[serde(default, skip_deserializing)]
    status: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct ProvaTeorica {
    #[serde(default)]
    #[validate(length(min = 1, message = "Adicione pelo menos um avaliado"), nested)]
    avaliados: Vec<AvaliadoProva>,
}

impl Conteudo for ProvaTeorica {
    fn derive(&mut self) {
        for avaliado in &mut self.avaliados {
            if let Some(nota) = avaliado.nota {
                avaliado.status = Some(prova_teorica_status(nota).to_string());
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct Inspecao {
    #[serde(default)]
    #[validate(custom(function = "viatura"))]
    viatura: String,
    #[validate(required(message = "Quantidade é obrigatória"), range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    qtd_inspecoes: Option<i64>,
    #[validate(required(message = "Quantidade é obrigatória"), range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    qtd_nao_conforme: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct InspecaoViaturas {
    #[serde(default)]
    #[validate(length(min = 1, message = "Adicione pelo menos uma inspeção"), nested)]
    inspecoes: Vec<Inspecao>,
}

impl Conteudo for InspecaoViaturas {}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct AvaliadoTpEpr {
    #[serde(default)]
    #[validate(length(min = 1, message = "Nome é obrigatório"))]
    nome: String,
    #[serde(default)]
    #[validate(custom(function = "mm_ss_4"))]
    tempo: String,
    #[serde(default, skip_deserializing)]
    status: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct TempoTpEpr {
    #[serde(default)]
    #[validate(length(min = 1, message = "Adicione pelo menos um avaliado"), nested)]
    avaliados: Vec<AvaliadoTpEpr>,
}

impl Conteudo for TempoTpEpr {
    fn derive(&mut self) {
        for avaliado in &mut self.avaliados {
            if let Some(segundos) = parse_mm_ss(&avaliado.tempo, 4) {
                avaliado.status = Some(tp_epr_status(segundos).to_string());
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct Afericao {
    #[serde(default)]
    #[validate(length(min = 1, message = "Viatura é obrigatória"))]
    viatura: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Motorista é obrigatório"))]
    motorista: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Local é obrigatório"))]
    local: String,
    #[serde(default)]
    #[validate(custom(function = "mm_ss_4"))]
    tempo: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct TempoResposta {
    #[serde(default)]
    #[validate(length(min = 1, message = "Adicione pelo menos uma aferição"), nested)]
    afericoes: Vec<Afericao>,
}

impl Conteudo for TempoResposta {}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct Estoque {
    #[validate(range(min = 0.0, message = "Quantidade deve ser maior ou igual a 0"))]
    po_quimico_atual: Option<f64>,
    #[validate(range(min = 0.0, message = "Quantidade deve ser maior ou igual a 0"))]
    po_quimico_exigido: Option<f64>,
    #[validate(range(min = 0.0, message = "Quantidade deve ser maior ou igual a 0"))]
    lge_atual: Option<f64>,
    #[validate(range(min = 0.0, message = "Quantidade deve ser maior ou igual a 0"))]
    lge_exigido: Option<f64>,
    #[validate(range(min = 0.0, message = "Quantidade deve ser maior ou igual a 0"))]
    nitrogenio_atual: Option<f64>,
    #[validate(range(min = 0.0, message = "Quantidade deve ser maior ou igual a 0"))]
    nitrogenio_exigido: Option<f64>,
}

impl Conteudo for Estoque {}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct ControleTrocas {
    #[validate(range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    qtd_trocas: Option<i64>,
}

impl Conteudo for ControleTrocas {}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct VerificacaoTp {
    #[validate(required(message = "Quantidade é obrigatória"), range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    qtd_conformes: Option<i64>,
    #[validate(required(message = "Quantidade é obrigatória"), range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    qtd_verificados: Option<i64>,
    #[validate(required(message = "Quantidade é obrigatória"), range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    qtd_total_equipe: Option<i64>,
}

impl Conteudo for VerificacaoTp {}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct HigienizacaoTp {
    #[validate(required(message = "Quantidade é obrigatória"), range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    qtd_higienizados_mes: Option<i64>,
    #[validate(required(message = "Quantidade é obrigatória"), range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    qtd_total_sci: Option<i64>,
}

impl Conteudo for HigienizacaoTp {}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct ColaboradorEpi {
    #[serde(default)]
    #[validate(length(min = 1, message = "Nome é obrigatório"))]
    nome: String,
    #[validate(range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    epi_entregue: Option<i64>,
    #[validate(range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    epi_previsto: Option<i64>,
    #[validate(range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    unif_entregue: Option<i64>,
    #[validate(range(min = 0, message = "Quantidade deve ser maior ou igual a 0"))]
    unif_previsto: Option<i64>,
    #[serde(default, skip_deserializing)]
    total_epi_pct: Option<i64>,
    #[serde(default, skip_deserializing)]
    total_unif_pct: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
struct ControleEpi {
    #[serde(default)]
    #[validate(length(min = 1, message = "Adicione pelo menos um colaborador"), nested)]
    colaboradores: Vec<ColaboradorEpi>,
}

impl Conteudo for ControleEpi {
    fn derive(&mut self) {
        for c in &mut self.colaboradores {
            c.total_epi_pct = Some(percentage(c.epi_entregue.unwrap_or(0), c.epi_previsto.unwrap_or(0)));
            c.total_unif_pct = Some(percentage(c.unif_entregue.unwrap_or(0), c.unif_previsto.unwrap_or(0)));
        }
    }
}

// =============================================================================
//  ENTRADA PÚBLICA
// =============================================================================

const PREFIX: &str = "conteudo";

fn run<T: Conteudo>(conteudo: &Value) -> Result<Value, FieldErrors> {
    let structure_error = |message: String| {
        let mut errors = FieldErrors::new();
        errors.add(PREFIX, message);
        errors
    };

    if !conteudo.is_object() {
        return Err(structure_error("O conteúdo deve ser um objeto JSON.".into()));
    }

    let mut parsed: T = serde_json::from_value(conteudo.clone())
        .map_err(|e| structure_error(format!("Estrutura inválida: {}", e)))?;

    let mut errors = FieldErrors::new();
    if let Err(e) = parsed.validate() {
        errors.merge_prefixed(PREFIX, e.into());
    }
    let mut extra = FieldErrors::new();
    parsed.check(&mut extra);
    errors.merge_prefixed(PREFIX, extra);

    if !errors.is_empty() {
        return Err(errors);
    }

    parsed.derive();
    serde_json::to_value(parsed).map_err(|e| structure_error(e.to_string()))
}

/// Valida o conteúdo do indicador e devolve a versão normalizada,
/// já com os campos calculados. Erros vêm com o caminho completo
/// (ex: `conteudo.avaliados[0].tempo`).
pub fn validate_conteudo(indicator: IndicatorType, conteudo: &Value) -> Result<Value, FieldErrors> {
    match indicator {
        IndicatorType::AtividadesAcessorias => run::<AtividadesAcessorias>(conteudo),
        IndicatorType::Treinamento => run::<Treinamento>(conteudo),
        IndicatorType::OcorrenciaAero => run::<OcorrenciaAero>(conteudo),
        IndicatorType::OcorrenciaNaoAero => run::<OcorrenciaNaoAero>(conteudo),
        IndicatorType::Taf => run::<Taf>(conteudo),
        IndicatorType::ProvaTeorica => run::<ProvaTeorica>(conteudo),
        IndicatorType::InspecaoViaturas => run::<InspecaoViaturas>(conteudo),
        IndicatorType::TempoTpEpr => run::<TempoTpEpr>(conteudo),
        IndicatorType::TempoResposta => run::<TempoResposta>(conteudo),
        IndicatorType::Estoque => run::<Estoque>(conteudo),
        IndicatorType::ControleTrocas => run::<ControleTrocas>(conteudo),
        IndicatorType::VerificacaoTp => run::<VerificacaoTp>(conteudo),
        IndicatorType::HigienizacaoTp => run::<HigienizacaoTp>(conteudo),
        IndicatorType::ControleEpi => run::<ControleEpi>(conteudo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_impossible_dates() {
        assert!(parse_date("2025-02-30").is_none());
        assert!(parse_date("2025-2-3").is_none());
        assert!(parse_date("14/03/2025").is_none());
        assert_eq!(parse_date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert!(parse_data_referencia("2025-13-01").unwrap_err().contains("dataReferencia"));
    }

    #[test]
    fn time_formats() {
        assert_eq!(parse_hh_mm("23:59"), Some(23 * 60 + 59));
        assert_eq!(parse_hh_mm("24:00"), None);
        assert_eq!(parse_hh_mm("7:30"), None);
        assert_eq!(parse_mm_ss("04:59", 4), Some(299));
        assert_eq!(parse_mm_ss("05:00", 4), None);
        assert_eq!(parse_mm_ss("59:59", 59), Some(3599));
        assert_eq!(parse_mm_ss("10:60", 59), None);
    }

    #[test]
    fn taf_derives_status_and_reports_nested_paths() {
        let ok = validate_conteudo(
            IndicatorType::Taf,
            &json!({ "avaliados": [{ "nome": "Ana", "idade": 35, "tempo": "02:10" }] }),
        )
        .unwrap();
        assert_eq!(ok["avaliados"][0]["status"], "Aprovado");
        assert_eq!(ok["avaliados"][0]["nota"], 9);

        let errors = validate_conteudo(
            IndicatorType::Taf,
            &json!({ "avaliados": [
                { "nome": "Ana", "idade": 35, "tempo": "02:10" },
                { "nome": "Bruno", "idade": 45, "tempo": "25:99" }
            ] }),
        )
        .unwrap_err();
        assert!(errors.contains("conteudo.avaliados[1].tempo"));
        assert!(!errors.contains("conteudo.avaliados[0].tempo"));
    }

    #[test]
    fn taf_table_by_age() {
        assert_eq!(taf_result(30, 120), ("Aprovado", Some(10)));
        assert_eq!(taf_result(30, 181), ("Reprovado", None));
        assert_eq!(taf_result(40, 181), ("Aprovado", Some(9)));
        assert_eq!(taf_result(50, 241), ("Reprovado", None));
    }

    #[test]
    fn atividade_nao_prevista_skips_required_fields() {
        assert!(validate_conteudo(
            IndicatorType::AtividadesAcessorias,
            &json!({ "tipo_atividade": ATIVIDADE_NAO_PREVISTA }),
        )
        .is_ok());

        let errors = validate_conteudo(
            IndicatorType::AtividadesAcessorias,
            &json!({ "tipo_atividade": "Inspeção de pista", "qtd_bombeiros": 2 }),
        )
        .unwrap_err();
        assert!(errors.contains("conteudo.qtd_equipamentos"));
        assert!(errors.contains("conteudo.tempo_gasto"));
        assert!(!errors.contains("conteudo.qtd_bombeiros"));
    }

    #[test]
    fn ocorrencia_aero_validates_times() {
        let payload = json!({
            "acao": "Intervenção",
            "local": "Cabeceira 14",
            "hora_acionamento": "10:15",
            "tempo_chegada_1_cci": "02:30",
            "tempo_chegada_ult_cci": "03:10",
            "termino_ocorrencia": "11:00"
        });
        let ok = validate_conteudo(IndicatorType::OcorrenciaAero, &payload).unwrap();
        assert_eq!(ok["tipo_ocorrencia"], "Emergência aeronáutica");

        let mut bad = payload.clone();
        bad["hora_acionamento"] = json!("25:61");
        let errors = validate_conteudo(IndicatorType::OcorrenciaAero, &bad).unwrap_err();
        assert!(errors.contains("conteudo.hora_acionamento"));
    }

    #[test]
    fn ocorrencia_nao_aero_duration_crosses_midnight() {
        let ok = validate_conteudo(
            IndicatorType::OcorrenciaNaoAero,
            &json!({
                "tipo_ocorrencia": "Incêndios Florestais",
                "local": "Setor norte",
                "hora_acionamento": "23:30",
                "hora_chegada": "23:40",
                "hora_termino": "00:45"
            }),
        )
        .unwrap();
        assert_eq!(ok["duracao_total"], "01:15");
    }

    #[test]
    fn rejects_wrong_shapes_without_coercion() {
        let errors = validate_conteudo(IndicatorType::ControleTrocas, &json!({ "qtd_trocas": "3" })).unwrap_err();
        assert!(errors.contains("conteudo"));

        let errors = validate_conteudo(IndicatorType::Treinamento, &json!([])).unwrap_err();
        assert!(errors.contains("conteudo"));

        let errors = validate_conteudo(IndicatorType::Treinamento, &json!({})).unwrap_err();
        assert!(errors.contains("conteudo.participantes"));
    }

    #[test]
    fn epi_percentages_are_computed() {
        let ok = validate_conteudo(
            IndicatorType::ControleEpi,
            &json!({ "colaboradores": [{ "nome": "Ana", "epi_entregue": 3, "epi_previsto": 4 }] }),
        )
        .unwrap();
        assert_eq!(ok["colaboradores"][0]["total_epi_pct"], 75);
        assert_eq!(ok["colaboradores"][0]["total_unif_pct"], 0);
    }
}
