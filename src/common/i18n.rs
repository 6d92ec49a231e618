// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

pub const DEFAULT_LANG: &str = "pt";
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["pt", "en"];

// (chave, pt, en)
const MESSAGES: &[(&str, &str, &str)] = &[
    ("validation", "Um ou mais campos são inválidos.", "One or more fields are invalid."),
    ("email_exists", "Este e-mail já está em uso.", "This e-mail is already in use."),
    ("unique_violation", "Já existe um registro com esses dados.", "A record with this data already exists."),
    ("invalid_credentials", "E-mail ou senha inválidos.", "Invalid e-mail or password."),
    ("account_inactive", "Conta desativada. Procure o Gerente Geral.", "Account disabled. Contact your manager."),
    ("invalid_token", "Token de autenticação inválido ou ausente.", "Missing or invalid authentication token."),
    ("expired_token", "Sessão expirada. Faça login novamente.", "Session expired. Please log in again."),
    ("access_denied", "Acesso negado", "Access denied"),
    ("user_not_found", "Usuário não encontrado.", "User not found."),
    ("not_found", "Registro não encontrado.", "Record not found."),
    ("referential_integrity", "Operação bloqueada: existem registros dependentes ou vínculos inconsistentes.", "Operation blocked: dependent records or inconsistent references."),
    ("conflict", "O registro foi alterado por outro usuário. Recarregue e tente novamente.", "The record was changed by someone else. Reload and try again."),
    ("timeout", "Serviço temporariamente indisponível. Tente novamente.", "Service temporarily unavailable. Please retry."),
    ("internal", "Ocorreu um erro inesperado.", "An unexpected error occurred."),
];

/// Catálogo de mensagens por idioma.
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

static GLOBAL: LazyLock<I18nStore> = LazyLock::new(I18nStore::new);

impl I18nStore {
    pub fn new() -> Self {
        let mut messages: HashMap<&'static str, HashMap<&'static str, &'static str>> = HashMap::new();
        for (key, pt, en) in MESSAGES {
            messages.entry("pt").or_default().insert(*key, *pt);
            messages.entry("en").or_default().insert(*key, *en);
        }
        Self { messages }
    }

    pub fn global() -> &'static I18nStore {
        &GLOBAL
    }

    /// Idiomas desconhecidos caem no português; chaves desconhecidas voltam como estão.
    pub fn translate<'a>(&'a self, lang: &str, key: &'a str) -> &'a str {
        let lookup = |l: &str| -> Option<&'a str> { self.messages.get(l).and_then(|m| m.get(key)).copied() };
        lookup(lang).or_else(|| lookup(DEFAULT_LANG)).unwrap_or(key)
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

pub fn fallback_message(key: &str) -> String {
    I18nStore::global().translate(DEFAULT_LANG, key).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_and_falls_back_to_portuguese() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "access_denied"), "Access denied");
        assert_eq!(store.translate("es", "access_denied"), "Acesso negado");
        assert_eq!(store.translate("pt", "chave_inexistente"), "chave_inexistente");
    }
}
