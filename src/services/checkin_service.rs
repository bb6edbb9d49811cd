// src/services/checkin_service.rs
//
// Máquina de estados do check-in: não-checado <-> checado.
// Flag, detalhes e QR mudam sempre juntos (um statement no store).

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        hooks::{Hooks, TicketNotice},
    },
    db::AttendeeStore,
    models::attendee::{ActivityLogEntry, Attendee, CheckinDetails, CheckinSource},
    services::capability::CapabilityChecker,
};

#[derive(Clone)]
pub struct CheckinService {
    attendees: Arc<dyn AttendeeStore>,
    capabilities: Arc<dyn CapabilityChecker>,
    hooks: Arc<Hooks>,
}

impl CheckinService {
    pub fn new(
        attendees: Arc<dyn AttendeeStore>,
        capabilities: Arc<dyn CapabilityChecker>,
        hooks: Arc<Hooks>,
    ) -> Self {
        Self {
            attendees,
            capabilities,
            hooks,
        }
    }

    /// Participante existente e gerenciável pelo ator; `None` caso contrário.
    async fn authorized(&self, attendee_id: Uuid, actor: Option<Uuid>) -> Result<Option<Uuid>, AppError> {
        let Some(attendee) = self.attendees.find_attendee(attendee_id).await? else {
            return Ok(None);
        };
        if !self.capabilities.can_manage_event(actor, attendee.event_id).await? {
            tracing::info!(%attendee_id, ?actor, "check-in negado: sem permissão no evento");
            return Ok(None);
        }
        Ok(Some(attendee.id))
    }

    pub async fn checkin(
        &self,
        attendee_id: Uuid,
        via_qr: bool,
        actor: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let Some(id) = self.authorized(attendee_id, actor).await? else {
            return Ok(false);
        };

        let details = CheckinDetails {
            date: Utc::now(),
            source: if via_qr { CheckinSource::App } else { CheckinSource::Site },
            author: actor,
        };
        let Some(record) = self.attendees.mark_checked_in(id, &details, via_qr).await? else {
            return Ok(false);
        };

        let attendee = Attendee::try_from(record)?;
        tracing::info!(%attendee_id, via_qr, "check-in registrado");
        self.hooks.notify(TicketNotice::CheckedIn { attendee, via_qr });
        Ok(true)
    }

    pub async fn uncheckin(&self, attendee_id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        let Some(id) = self.authorized(attendee_id, actor).await? else {
            return Ok(false);
        };
        let Some(record) = self.attendees.clear_checkin(id).await? else {
            return Ok(false);
        };

        let attendee = Attendee::try_from(record)?;
        tracing::info!(%attendee_id, "check-in revertido");
        self.hooks.notify(TicketNotice::CheckinReverted { attendee });
        Ok(true)
    }

    /// Primeiro envio grava 1: ausente conta como 0.
    pub async fn update_ticket_sent_counter(&self, attendee_id: Uuid) -> Result<Option<i64>, AppError> {
        self.attendees.increment_ticket_sent(attendee_id).await
    }

    pub async fn update_attendee_activity_log(
        &self,
        attendee_id: Uuid,
        entry: ActivityLogEntry,
    ) -> Result<bool, AppError> {
        let entry = self.hooks.attendee_activity_entry.apply(entry);
        self.attendees.append_activity(attendee_id, &entry).await
    }
}
