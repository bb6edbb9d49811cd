// src/models/query.rs

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    common::{currency::CurrencyMatch, error::AppError},
    models::ticket::TicketProvider,
};

/// Operadores de comparação de custo aceitos no filtro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostOperator {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Between,
}

impl CostOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CostOperator::Eq => "=",
            CostOperator::Lt => "<",
            CostOperator::Gt => ">",
            CostOperator::Le => "<=",
            CostOperator::Ge => ">=",
            CostOperator::Ne => "<>",
            CostOperator::Between => "BETWEEN",
        }
    }
}

impl FromStr for CostOperator {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "=" | "==" => Ok(CostOperator::Eq),
            "<" => Ok(CostOperator::Lt),
            ">" => Ok(CostOperator::Gt),
            "<=" => Ok(CostOperator::Le),
            ">=" => Ok(CostOperator::Ge),
            "!=" | "<>" => Ok(CostOperator::Ne),
            "BETWEEN" => Ok(CostOperator::Between),
            _ => Err(AppError::InvalidCostOperator(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostFilter {
    pub operator: CostOperator,
    pub value: Decimal,
    /// Limite superior, só para BETWEEN.
    pub upper: Option<Decimal>,
}

impl CostFilter {
    pub fn new(operator: CostOperator, value: Decimal) -> Self {
        Self { operator, value, upper: None }
    }

    pub fn between(low: Decimal, high: Decimal) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        Self {
            operator: CostOperator::Between,
            value: low,
            upper: Some(high),
        }
    }

    pub fn matches(&self, cost: Decimal) -> bool {
        match self.operator {
            CostOperator::Eq => cost == self.value,
            CostOperator::Lt => cost < self.value,
            CostOperator::Gt => cost > self.value,
            CostOperator::Le => cost <= self.value,
            CostOperator::Ge => cost >= self.value,
            CostOperator::Ne => cost != self.value,
            CostOperator::Between => {
                let upper = self.upper.unwrap_or(self.value);
                self.value <= cost && cost <= upper
            }
        }
    }
}

/// Consulta de ingressos antes da resolução dos hooks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketQuery {
    pub event_ids: Option<Vec<Uuid>>,
    pub provider: Option<TicketProvider>,
    pub cost: Option<CostFilter>,
    pub currency: Option<String>,
    pub attendee_id: Option<Uuid>,
    pub attendee_user_id: Option<Uuid>,
}

impl TicketQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_event(event_id: Uuid) -> Self {
        Self::new().events(vec![event_id])
    }

    pub fn events(mut self, event_ids: Vec<Uuid>) -> Self {
        self.event_ids = Some(event_ids);
        self
    }

    pub fn provider(mut self, provider: TicketProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn cost(mut self, filter: CostFilter) -> Self {
        self.cost = Some(filter);
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn attendee(mut self, attendee_id: Uuid) -> Self {
        self.attendee_id = Some(attendee_id);
        self
    }

    pub fn attendee_user(mut self, user_id: Uuid) -> Self {
        self.attendee_user_id = Some(user_id);
        self
    }
}

/// Consulta pronta para o store: IDs de evento remapeados e moeda normalizada.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTicketQuery {
    pub event_ids: Option<Vec<Uuid>>,
    pub provider: Option<TicketProvider>,
    pub cost: Option<CostFilter>,
    pub currency: Option<CurrencyMatch>,
    pub attendee_id: Option<Uuid>,
    pub attendee_user_id: Option<Uuid>,
}

/// Parâmetros de filtro vindos da query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketListParams {
    pub provider: Option<TicketProvider>,
    pub cost_op: Option<String>,
    pub cost: Option<Decimal>,
    pub cost_max: Option<Decimal>,
    pub currency: Option<String>,
    pub attendee_id: Option<Uuid>,
    pub attendee_user_id: Option<Uuid>,
}

impl TicketListParams {
    pub fn into_query(self, event_ids: Option<Vec<Uuid>>) -> Result<TicketQuery, AppError> {
        let cost = match (self.cost_op.as_deref(), self.cost) {
            (_, None) => None,
            (None, Some(value)) => Some(CostFilter::new(CostOperator::Eq, value)),
            (Some(raw), Some(value)) => match raw.parse::<CostOperator>()? {
                CostOperator::Between => {
                    let upper = self.cost_max.ok_or_else(|| AppError::InvalidFieldValue {
                        field: "costMax".into(),
                        reason: "BETWEEN exige costMax".into(),
                    })?;
                    Some(CostFilter::between(value, upper))
                }
                operator => Some(CostFilter::new(operator, value)),
            },
        };

        Ok(TicketQuery {
            event_ids,
            provider: self.provider,
            cost,
            currency: self.currency,
            attendee_id: self.attendee_id,
            attendee_user_id: self.attendee_user_id,
        })
    }
}
