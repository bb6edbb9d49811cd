// src/models/fields.rs
//
// Nomes de campo duráveis. Outros componentes e integrações leem/escrevem por
// estas chaves, então elas só podem ser acrescentadas, nunca renomeadas.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::{
    common::error::AppError,
    models::{
        attendee::Attendee,
        ticket::{GlobalStockMode, TicketChanges, TicketSnapshot},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketField {
    EventId,
    Provider,
    Name,
    Description,
    Price,
    CurrencyCode,
    CurrencySymbol,
    MenuOrder,
    StartDate,
    EndDate,
    Capacity,
    Sales,
    Stock,
    ManageStock,
    GlobalStockMode,
}

impl TicketField {
    pub const ALL: [TicketField; 15] = [
        TicketField::EventId,
        TicketField::Provider,
        TicketField::Name,
        TicketField::Description,
        TicketField::Price,
        TicketField::CurrencyCode,
        TicketField::CurrencySymbol,
        TicketField::MenuOrder,
        TicketField::StartDate,
        TicketField::EndDate,
        TicketField::Capacity,
        TicketField::Sales,
        TicketField::Stock,
        TicketField::ManageStock,
        TicketField::GlobalStockMode,
    ];

    pub fn meta_key(&self) -> &'static str {
        match self {
            TicketField::EventId => "_event_id",
            TicketField::Provider => "_provider",
            TicketField::Name => "_name",
            TicketField::Description => "_description",
            TicketField::Price => "_price",
            TicketField::CurrencyCode => "_currency_code",
            TicketField::CurrencySymbol => "_currency_symbol",
            TicketField::MenuOrder => "_menu_order",
            TicketField::StartDate => "_ticket_start_date",
            TicketField::EndDate => "_ticket_end_date",
            TicketField::Capacity => "_capacity",
            TicketField::Sales => "total_sales",
            TicketField::Stock => "_stock",
            TicketField::ManageStock => "_manage_stock",
            TicketField::GlobalStockMode => "_global_stock_mode",
        }
    }

    /// Vendas e estoque só mudam pelo motor de ajuste; dono e canal são fixos.
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            TicketField::Sales | TicketField::Stock | TicketField::EventId | TicketField::Provider
        )
    }

    /// Acumula `value` em `changes`, validando o tipo.
    pub fn assign(&self, changes: &mut TicketChanges, value: Value) -> Result<(), AppError> {
        let key = self.meta_key();
        if self.is_protected() {
            return Err(AppError::ProtectedField(key.to_string()));
        }
        match self {
            TicketField::Name => changes.name = Some(required_string(key, value)?),
            TicketField::Description => changes.description = Some(optional_string(key, value)?),
            TicketField::Price => changes.price = Some(decimal(key, value)?),
            TicketField::CurrencyCode => changes.currency_code = Some(required_string(key, value)?),
            TicketField::CurrencySymbol => {
                changes.currency_symbol = Some(required_string(key, value)?)
            }
            TicketField::MenuOrder => {
                let order = integer(key, value)?;
                changes.menu_order = Some(i32::try_from(order).map_err(|_| invalid(key, "fora do intervalo"))?);
            }
            TicketField::StartDate => changes.start_date = Some(timestamp(key, value)?),
            TicketField::EndDate => changes.end_date = Some(timestamp(key, value)?),
            TicketField::Capacity => {
                let capacity = integer(key, value)?;
                if capacity < -1 {
                    return Err(invalid(key, "use -1 para ilimitado"));
                }
                changes.capacity = Some(capacity);
            }
            TicketField::ManageStock => {
                changes.manage_stock = Some(value.as_bool().ok_or_else(|| invalid(key, "esperado booleano"))?)
            }
            TicketField::GlobalStockMode => {
                let raw = value.as_str().ok_or_else(|| invalid(key, "esperado texto"))?;
                changes.global_stock_mode = Some(raw.parse::<GlobalStockMode>()?);
            }
            // recusados acima
            TicketField::EventId | TicketField::Provider | TicketField::Sales | TicketField::Stock => {}
        }
        Ok(())
    }
}

impl FromStr for TicketField {
    type Err = AppError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        TicketField::ALL
            .into_iter()
            .find(|field| field.meta_key() == key)
            .ok_or_else(|| AppError::UnknownField(key.to_string()))
    }
}

impl TicketSnapshot {
    pub fn field(&self, field: TicketField) -> Value {
        match field {
            TicketField::EventId => json!(self.event_id),
            TicketField::Provider => json!(self.provider),
            TicketField::Name => json!(self.name),
            TicketField::Description => json!(self.description),
            TicketField::Price => json!(self.price),
            TicketField::CurrencyCode => json!(self.currency_code),
            TicketField::CurrencySymbol => json!(self.currency_symbol),
            TicketField::MenuOrder => json!(self.menu_order),
            TicketField::StartDate => json!(self.start_date),
            TicketField::EndDate => json!(self.end_date),
            TicketField::Capacity => json!(self.capacity),
            TicketField::Sales => json!(self.sales),
            TicketField::Stock => json!(self.stock),
            TicketField::ManageStock => json!(self.manage_stock),
            TicketField::GlobalStockMode => json!(self.global_stock_mode),
        }
    }
}

// ---
// Participante
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttendeeField {
    Ticket,
    Event,
    FullName,
    Email,
    SecurityCode,
    Status,
    Checkin,
    CheckinDetails,
    QrStatus,
    TicketSent,
    UserId,
    ActivityLog,
    DeletedProductName,
    Optout,
}

impl AttendeeField {
    pub const ALL: [AttendeeField; 14] = [
        AttendeeField::Ticket,
        AttendeeField::Event,
        AttendeeField::FullName,
        AttendeeField::Email,
        AttendeeField::SecurityCode,
        AttendeeField::Status,
        AttendeeField::Checkin,
        AttendeeField::CheckinDetails,
        AttendeeField::QrStatus,
        AttendeeField::TicketSent,
        AttendeeField::UserId,
        AttendeeField::ActivityLog,
        AttendeeField::DeletedProductName,
        AttendeeField::Optout,
    ];

    pub fn meta_key(&self) -> &'static str {
        match self {
            AttendeeField::Ticket => "_tribe_rsvp_product",
            AttendeeField::Event => "_tribe_rsvp_event",
            AttendeeField::FullName => "_tribe_tickets_full_name",
            AttendeeField::Email => "_tribe_tickets_email",
            AttendeeField::SecurityCode => "_tribe_tickets_security_code",
            AttendeeField::Status => "_tribe_rsvp_status",
            AttendeeField::Checkin => "_tribe_rsvp_checkin",
            AttendeeField::CheckinDetails => "_tribe_rsvp_checkin_details",
            AttendeeField::QrStatus => "_tribe_qr_status",
            AttendeeField::TicketSent => "_tribe_attendee_ticket_sent",
            AttendeeField::UserId => "_tribe_tickets_attendee_user_id",
            AttendeeField::ActivityLog => "_tribe_attendee_activity_log",
            AttendeeField::DeletedProductName => "_tribe_deleted_product_name",
            AttendeeField::Optout => "_tribe_tickets_optout",
        }
    }
}

impl FromStr for AttendeeField {
    type Err = AppError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        AttendeeField::ALL
            .into_iter()
            .find(|field| field.meta_key() == key)
            .ok_or_else(|| AppError::UnknownField(key.to_string()))
    }
}

impl Attendee {
    pub fn field(&self, field: AttendeeField) -> Value {
        match field {
            AttendeeField::Ticket => json!(self.ticket_id),
            AttendeeField::Event => json!(self.event_id),
            AttendeeField::FullName => json!(self.full_name),
            AttendeeField::Email => json!(self.email),
            AttendeeField::SecurityCode => json!(self.security_code),
            AttendeeField::Status => json!(self.status),
            AttendeeField::Checkin => json!(self.checked_in),
            AttendeeField::CheckinDetails => json!(self.checkin_details),
            AttendeeField::QrStatus => json!(self.qr_status),
            AttendeeField::TicketSent => json!(self.ticket_sent),
            AttendeeField::UserId => json!(self.user_id),
            AttendeeField::ActivityLog => json!(self.activity_log),
            AttendeeField::DeletedProductName => json!(self.deleted_product_name),
            AttendeeField::Optout => json!(self.optout),
        }
    }
}

// --- Conversões de valor ---

fn invalid(key: &str, reason: &str) -> AppError {
    AppError::InvalidFieldValue {
        field: key.to_string(),
        reason: reason.to_string(),
    }
}

fn required_string(key: &str, value: Value) -> Result<String, AppError> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(invalid(key, "esperado texto não vazio")),
    }
}

fn optional_string(key: &str, value: Value) -> Result<Option<String>, AppError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        _ => Err(invalid(key, "esperado texto ou null")),
    }
}

fn integer(key: &str, value: Value) -> Result<i64, AppError> {
    match &value {
        Value::Number(number) => number.as_i64().ok_or_else(|| invalid(key, "esperado inteiro")),
        Value::String(text) => text.trim().parse().map_err(|_| invalid(key, "esperado inteiro")),
        _ => Err(invalid(key, "esperado inteiro")),
    }
}

fn decimal(key: &str, value: Value) -> Result<Decimal, AppError> {
    let parsed = match &value {
        Value::String(text) => text.trim().parse::<Decimal>().ok(),
        Value::Number(number) => number.to_string().parse::<Decimal>().ok(),
        _ => None,
    };
    match parsed {
        Some(price) if !price.is_sign_negative() => Ok(price),
        Some(_) => Err(invalid(key, "o valor não pode ser negativo")),
        None => Err(invalid(key, "esperado decimal")),
    }
}

fn timestamp(key: &str, value: Value) -> Result<Option<DateTime<Utc>>, AppError> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => DateTime::parse_from_rfc3339(&text)
            .map(|date| Some(date.with_timezone(&Utc)))
            .map_err(|_| invalid(key, "esperado data RFC 3339")),
        _ => Err(invalid(key, "esperado data RFC 3339 ou null")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_keys_round_trip_through_from_str() {
        for field in TicketField::ALL {
            assert_eq!(field.meta_key().parse::<TicketField>().ok(), Some(field));
        }
        for field in AttendeeField::ALL {
            assert_eq!(field.meta_key().parse::<AttendeeField>().ok(), Some(field));
        }
    }

    #[test]
    fn sales_and_stock_cannot_be_assigned_directly() {
        let mut changes = TicketChanges::default();
        let result = TicketField::Stock.assign(&mut changes, json!(5));
        assert!(matches!(result, Err(AppError::ProtectedField(key)) if key == "_stock"));
        assert!(TicketField::Sales.assign(&mut changes, json!(5)).is_err());
        assert!(changes.is_empty());
    }

    #[test]
    fn every_protected_field_is_refused() {
        let mut changes = TicketChanges::default();
        for field in TicketField::ALL.into_iter().filter(TicketField::is_protected) {
            assert!(matches!(
                field.assign(&mut changes, json!("x")),
                Err(AppError::ProtectedField(_))
            ));
        }
        assert!(changes.is_empty());
        assert!(!TicketField::Capacity.is_protected());
    }

    #[test]
    fn capacity_accepts_unlimited_sentinel_and_numeric_strings() {
        let mut changes = TicketChanges::default();
        TicketField::Capacity.assign(&mut changes, json!(-1)).ok();
        assert_eq!(changes.capacity, Some(-1));
        TicketField::Capacity.assign(&mut changes, json!("25")).ok();
        assert_eq!(changes.capacity, Some(25));
        assert!(TicketField::Capacity.assign(&mut changes, json!(-4)).is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut changes = TicketChanges::default();
        assert!(TicketField::Price.assign(&mut changes, json!("-1.00")).is_err());
        TicketField::Price.assign(&mut changes, json!("12.50")).ok();
        assert_eq!(changes.price, Some(Decimal::new(1250, 2)));
    }
}
