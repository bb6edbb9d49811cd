// src/services/attendee_service.rs

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AttendeeStore,
    models::{
        attendee::{Attendee, AttendeeChanges, AttendeeScope, NewAttendee, StatusCount},
        fields::AttendeeField,
    },
};

/// Código de segurança opaco. A unicidade é garantida pelo banco.
pub fn generate_security_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    raw[..12].to_string()
}

#[derive(Clone)]
pub struct AttendeeService {
    attendees: Arc<dyn AttendeeStore>,
}

impl AttendeeService {
    pub fn new(attendees: Arc<dyn AttendeeStore>) -> Self {
        Self { attendees }
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Attendee>, AppError> {
        self.attendees
            .find_attendee(id)
            .await?
            .map(Attendee::try_from)
            .transpose()
    }

    pub async fn list(&self, scope: AttendeeScope) -> Result<Vec<Attendee>, AppError> {
        self.attendees
            .list_attendees(scope)
            .await?
            .into_iter()
            .map(Attendee::try_from)
            .collect()
    }

    pub async fn get_field(&self, id: Uuid, key: &str) -> Result<Option<Value>, AppError> {
        let field: AttendeeField = key.parse()?;
        Ok(self.find(id).await?.map(|a| a.field(field)))
    }

    /// Insere o lote inteiro ou nada.
    pub async fn create_batch(&self, attendees: &[NewAttendee]) -> Result<Vec<Attendee>, AppError> {
        if attendees.is_empty() {
            return Ok(Vec::new());
        }
        let created = self
            .attendees
            .insert_attendees(attendees)
            .await?
            .into_iter()
            .map(Attendee::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(count = created.len(), "participantes criados");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: &AttendeeChanges,
    ) -> Result<Option<Attendee>, AppError> {
        self.attendees
            .update_attendee(id, changes)
            .await?
            .map(Attendee::try_from)
            .transpose()
    }

    /// Uma escrita para todos os participantes do escopo.
    pub async fn bulk_update(
        &self,
        scope: AttendeeScope,
        changes: &AttendeeChanges,
    ) -> Result<u64, AppError> {
        let affected = self.attendees.bulk_update(scope, changes).await?;
        tracing::debug!(?scope, affected, "atualização em lote de participantes");
        Ok(affected)
    }

    pub async fn status_counts(&self, scope: AttendeeScope) -> Result<Vec<StatusCount>, AppError> {
        self.attendees.status_counts(scope).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<Attendee>, AppError> {
        self.attendees
            .delete_attendee(id)
            .await?
            .map(Attendee::try_from)
            .transpose()
    }
}
