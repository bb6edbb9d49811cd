// src/services/status_options.rs
//
// Tabela declarativa status -> peso (`decrease_stock_by`) por provedor.
// Pesos inválidos são descartados na carga, nunca no momento do ajuste.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    common::hooks::{Hooks, RawStatusOption, StatusOptionsInput},
    models::ticket::TicketProvider,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOption {
    pub status: String,
    pub decrease_stock_by: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusOptions {
    by_provider: HashMap<TicketProvider, Vec<StatusOption>>,
}

pub fn default_options(provider: TicketProvider) -> Vec<RawStatusOption> {
    match provider {
        TicketProvider::Rsvp => vec![RawStatusOption::new("yes", 1), RawStatusOption::new("no", 0)],
        TicketProvider::Commerce => vec![
            RawStatusOption::new("completed", 1),
            RawStatusOption::new("pending", 1),
            RawStatusOption::new("refunded", 0),
            RawStatusOption::new("cancelled", 0),
            RawStatusOption::new("failed", 0),
        ],
    }
}

fn prune(provider: TicketProvider, raw: Vec<RawStatusOption>) -> Vec<StatusOption> {
    let mut options: Vec<StatusOption> = Vec::with_capacity(raw.len());

    for option in raw {
        let weight = option.decrease_stock_by.as_i64().filter(|w| *w >= 0);
        let Some(decrease_stock_by) = weight else {
            tracing::warn!(
                provider = %provider,
                status = %option.status,
                weight = %option.decrease_stock_by,
                "opção de status descartada: peso precisa ser inteiro não negativo"
            );
            continue;
        };

        // Entrada posterior com o mesmo status substitui a anterior
        match options.iter_mut().find(|o| o.status == option.status) {
            Some(existing) => existing.decrease_stock_by = decrease_stock_by,
            None => options.push(StatusOption {
                status: option.status,
                decrease_stock_by,
            }),
        }
    }

    options
}

impl StatusOptions {
    /// Padrões + opções extras de RSVP (configuração) + filtro de hooks, já podados.
    pub fn load(extra_rsvp: &[RawStatusOption], hooks: &Hooks) -> Self {
        let mut by_provider = HashMap::new();

        for provider in TicketProvider::ALL {
            let mut options = default_options(provider);
            if provider == TicketProvider::Rsvp {
                options.extend(extra_rsvp.iter().cloned());
            }

            let filtered = hooks
                .stock_status_options
                .apply(StatusOptionsInput { provider, options });
            by_provider.insert(provider, prune(provider, filtered.options));
        }

        Self { by_provider }
    }

    pub fn options(&self, provider: TicketProvider) -> &[StatusOption] {
        self.by_provider
            .get(&provider)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Status desconhecido não consome estoque.
    pub fn weight(&self, provider: TicketProvider, status: &str) -> i64 {
        self.options(provider)
            .iter()
            .find(|o| o.status == status)
            .map_or(0, |o| o.decrease_stock_by)
    }

    /// Delta assinado de vendas para uma troca de status.
    pub fn delta(&self, provider: TicketProvider, old: &str, new: &str, quantity: i64) -> i64 {
        if old == new {
            return 0;
        }
        (self.weight(provider, new) - self.weight(provider, old)).saturating_mul(quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_cover_both_providers() {
        let options = StatusOptions::load(&[], &Hooks::default());
        assert_eq!(options.delta(TicketProvider::Rsvp, "no", "yes", 1), 1);
        assert_eq!(options.delta(TicketProvider::Rsvp, "yes", "no", 1), -1);
        assert_eq!(options.delta(TicketProvider::Commerce, "pending", "completed", 3), 0);
        assert_eq!(options.delta(TicketProvider::Commerce, "completed", "refunded", 2), -2);
    }

    #[test]
    fn invalid_weights_are_pruned_at_load() {
        let extra = vec![
            RawStatusOption::new("going-plus-one", 2),
            RawStatusOption::new("negative", -1),
            RawStatusOption::new("fraction", json!(1.5)),
            RawStatusOption::new("text", json!("2")),
        ];
        let options = StatusOptions::load(&extra, &Hooks::default());

        let statuses: Vec<&str> = options
            .options(TicketProvider::Rsvp)
            .iter()
            .map(|o| o.status.as_str())
            .collect();
        assert_eq!(statuses, vec!["yes", "no", "going-plus-one"]);
        assert_eq!(options.delta(TicketProvider::Rsvp, "no", "going-plus-one", 1), 2);
    }

    #[test]
    fn hook_can_rewrite_the_table() {
        let mut hooks = Hooks::default();
        hooks.stock_status_options.add(10, |mut input: StatusOptionsInput| {
            if input.provider == TicketProvider::Commerce {
                input.options.push(RawStatusOption::new("on-hold", 1));
            }
            input
        });

        let options = StatusOptions::load(&[], &hooks);
        assert_eq!(options.weight(TicketProvider::Commerce, "on-hold"), 1);
        assert_eq!(options.weight(TicketProvider::Rsvp, "on-hold"), 0);
    }
}
