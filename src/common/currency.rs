// src/common/currency.rs

use rusty_money::iso;

/// Resultado da normalização de uma moeda pedida num filtro.
/// Com código resolvido, o código decide; o símbolo só vale para ingressos
/// gravados sem código ("$" é USD, CAD, AUD...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyMatch {
    pub code: Option<String>,
    pub symbol: String,
}

impl CurrencyMatch {
    pub fn matches(&self, code: &str, symbol: &str) -> bool {
        match self.code.as_deref() {
            Some(wanted) if !code.is_empty() => wanted.eq_ignore_ascii_case(code),
            _ => self.symbol == symbol,
        }
    }
}

/// Símbolo de um código ISO (ex: "BRL" -> "R$"). Tabela somente leitura.
pub fn symbol_for(code: &str) -> Option<&'static str> {
    iso::find(&code.to_ascii_uppercase()).map(|currency| currency.symbol)
}

/// Aceita tanto um código ("usd") quanto um símbolo ("$").
pub fn resolve(input: &str) -> CurrencyMatch {
    let trimmed = input.trim();
    let upper = trimmed.to_ascii_uppercase();

    match iso::find(&upper) {
        Some(currency) => CurrencyMatch {
            code: Some(currency.iso_alpha_code.to_string()),
            symbol: currency.symbol.to_string(),
        },
        // Não é um código conhecido: tratamos como símbolo.
        None => CurrencyMatch {
            code: None,
            symbol: trimmed.to_string(),
        },
    }
}
