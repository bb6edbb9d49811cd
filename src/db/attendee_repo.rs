// src/db/attendee_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AttendeeStore,
    models::attendee::{
        ActivityLogEntry, AttendeeChanges, AttendeeRecord, AttendeeScope, CheckinDetails,
        NewAttendee, StatusCount,
    },
};

// Coluna que delimita o escopo: ingresso ou evento.
fn scope_column(scope: AttendeeScope) -> (&'static str, Uuid) {
    match scope {
        AttendeeScope::Ticket(id) => ("ticket_id", id),
        AttendeeScope::Event(id) => ("event_id", id),
    }
}

#[derive(Clone)]
pub struct AttendeeRepository {
    pool: PgPool,
}

impl AttendeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_attendee<'e, E>(
        &self,
        executor: E,
        attendee: &NewAttendee,
    ) -> Result<AttendeeRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, AttendeeRecord>(
            r#"
            INSERT INTO attendees (
                ticket_id, event_id, provider, full_name, email,
                security_code, status, user_id, optout
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(attendee.ticket_id)
        .bind(attendee.event_id)
        .bind(attendee.provider.as_str())
        .bind(&attendee.full_name)
        .bind(&attendee.email)
        .bind(&attendee.security_code)
        .bind(&attendee.status)
        .bind(attendee.user_id)
        .bind(attendee.optout)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DuplicateSecurityCode;
                }
            }
            e.into()
        })
    }
}

#[async_trait]
impl AttendeeStore for AttendeeRepository {
    async fn insert_attendees(
        &self,
        attendees: &[NewAttendee],
    ) -> Result<Vec<AttendeeRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut created = Vec::with_capacity(attendees.len());
        for attendee in attendees {
            // Qualquer erro aqui derruba a transação inteira (drop = rollback)
            created.push(self.insert_attendee(&mut *tx, attendee).await?);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn find_attendee(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError> {
        let attendee = sqlx::query_as::<_, AttendeeRecord>("SELECT * FROM attendees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attendee)
    }

    async fn list_attendees(&self, scope: AttendeeScope) -> Result<Vec<AttendeeRecord>, AppError> {
        let (column, id) = scope_column(scope);
        let sql = format!("SELECT * FROM attendees WHERE {column} = $1 ORDER BY created_at ASC");
        let attendees = sqlx::query_as::<_, AttendeeRecord>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(attendees)
    }

    async fn update_attendee(
        &self,
        id: Uuid,
        changes: &AttendeeChanges,
    ) -> Result<Option<AttendeeRecord>, AppError> {
        let attendee = sqlx::query_as::<_, AttendeeRecord>(
            r#"
            UPDATE attendees
            SET status = COALESCE($2, status),
                optout = COALESCE($3, optout),
                deleted_product_name = COALESCE($4, deleted_product_name),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.status)
        .bind(changes.optout)
        .bind(&changes.deleted_product_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attendee)
    }

    async fn bulk_update(
        &self,
        scope: AttendeeScope,
        changes: &AttendeeChanges,
    ) -> Result<u64, AppError> {
        if changes.is_empty() {
            return Ok(0);
        }
        let (column, id) = scope_column(scope);
        let sql = format!(
            r#"
            UPDATE attendees
            SET status = COALESCE($2, status),
                optout = COALESCE($3, optout),
                deleted_product_name = COALESCE($4, deleted_product_name),
                updated_at = NOW()
            WHERE {column} = $1
            "#
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(&changes.status)
            .bind(changes.optout)
            .bind(&changes.deleted_product_name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn status_counts(&self, scope: AttendeeScope) -> Result<Vec<StatusCount>, AppError> {
        let (column, id) = scope_column(scope);
        let sql = format!(
            "SELECT status, COUNT(*) AS total FROM attendees WHERE {column} = $1 GROUP BY status ORDER BY status ASC"
        );
        let counts = sqlx::query_as::<_, StatusCount>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
        Ok(counts)
    }

    async fn mark_checked_in(
        &self,
        id: Uuid,
        details: &CheckinDetails,
        via_qr: bool,
    ) -> Result<Option<AttendeeRecord>, AppError> {
        let attendee = sqlx::query_as::<_, AttendeeRecord>(
            r#"
            UPDATE attendees
            SET checked_in = TRUE, checkin_details = $2, qr_status = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(details))
        .bind(via_qr.then_some(true))
        .fetch_optional(&self.pool)
        .await?;
        Ok(attendee)
    }

    async fn clear_checkin(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError> {
        let attendee = sqlx::query_as::<_, AttendeeRecord>(
            r#"
            UPDATE attendees
            SET checked_in = FALSE, checkin_details = NULL, qr_status = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attendee)
    }

    async fn increment_ticket_sent(&self, id: Uuid) -> Result<Option<i64>, AppError> {
        // Ausente/nulo conta como 0: o primeiro envio grava 1
        let sent = sqlx::query_scalar::<_, i64>(
            "UPDATE attendees SET ticket_sent = COALESCE(ticket_sent, 0) + 1 WHERE id = $1 RETURNING ticket_sent",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sent)
    }

    async fn append_activity(&self, id: Uuid, entry: &ActivityLogEntry) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE attendees
            SET activity_log = activity_log || jsonb_build_array($2::jsonb), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(entry))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_attendee(&self, id: Uuid) -> Result<Option<AttendeeRecord>, AppError> {
        let attendee =
            sqlx::query_as::<_, AttendeeRecord>("DELETE FROM attendees WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(attendee)
    }
}
