// src/db/event_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::EventStore,
    models::event::{EventRecord, EventStockPool, EventTicketPresence},
};

// Repositório de eventos e do estoque compartilhado (tabelas 'events' e 'event_stock_pools')
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn fetch_pool<'e, E>(
        &self,
        executor: E,
        event_id: Uuid,
    ) -> Result<Option<EventStockPool>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pool = sqlx::query_as::<_, EventStockPool>(
            "SELECT * FROM event_stock_pools WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(executor)
        .await?;
        Ok(pool)
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn insert_event(
        &self,
        title: &str,
        author_id: Option<Uuid>,
    ) -> Result<EventRecord, AppError> {
        let event = sqlx::query_as::<_, EventRecord>(
            "INSERT INTO events (title, author_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(title)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRecord>, AppError> {
        let event = sqlx::query_as::<_, EventRecord>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn rename_event(&self, id: Uuid, title: &str) -> Result<Option<EventRecord>, AppError> {
        let event = sqlx::query_as::<_, EventRecord>(
            "UPDATE events SET title = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn find_pool(&self, event_id: Uuid) -> Result<Option<EventStockPool>, AppError> {
        self.fetch_pool(&self.pool, event_id).await
    }

    async fn find_pools(&self, event_ids: &[Uuid]) -> Result<Vec<EventStockPool>, AppError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        let pools = sqlx::query_as::<_, EventStockPool>(
            "SELECT * FROM event_stock_pools WHERE event_id = ANY($1)",
        )
        .bind(event_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(pools)
    }

    async fn configure_pool(
        &self,
        event_id: Uuid,
        enabled: bool,
        capacity: i64,
    ) -> Result<EventStockPool, AppError> {
        // Upsert. Pool ligado mantém as vendas acumuladas; pool novo ou religado
        // parte das vendas dos ingressos que o consomem (feitas com ele desligado).
        let pool = sqlx::query_as::<_, EventStockPool>(
            r#"
            WITH shared AS (
                SELECT COALESCE(SUM(total_sales), 0)::BIGINT AS sales
                FROM tickets
                WHERE event_id = $1
                  AND deleted_at IS NULL
                  AND global_stock_mode IN ('global', 'capped')
                  AND manage_stock
                  AND capacity >= 0
            )
            INSERT INTO event_stock_pools (event_id, enabled, capacity, sales, stock)
            SELECT $1, $2, $3, shared.sales, GREATEST($3 - shared.sales, 0)
            FROM shared
            ON CONFLICT (event_id) DO UPDATE
            SET enabled = EXCLUDED.enabled,
                capacity = EXCLUDED.capacity,
                sales = CASE
                    WHEN event_stock_pools.enabled THEN event_stock_pools.sales
                    ELSE EXCLUDED.sales
                END,
                stock = GREATEST(
                    EXCLUDED.capacity - CASE
                        WHEN event_stock_pools.enabled THEN event_stock_pools.sales
                        ELSE EXCLUDED.sales
                    END,
                    0
                ),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(enabled)
        .bind(capacity)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(%event_id, enabled, capacity, "estoque compartilhado configurado");
        Ok(pool)
    }

    async fn ticket_presence(
        &self,
        event_ids: &[Uuid],
    ) -> Result<Vec<EventTicketPresence>, AppError> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        let presence = sqlx::query_as::<_, EventTicketPresence>(
            r#"
            SELECT
                e.id AS event_id,
                (SELECT COUNT(*) FROM tickets t
                  WHERE t.event_id = e.id AND t.deleted_at IS NULL AND t.provider = 'commerce') AS tickets,
                (SELECT COUNT(*) FROM tickets t
                  WHERE t.event_id = e.id AND t.deleted_at IS NULL AND t.provider = 'rsvp') AS rsvps,
                (SELECT COUNT(*) FROM attendees a WHERE a.event_id = e.id) AS attendees
            FROM events e
            WHERE e.id = ANY($1)
            "#,
        )
        .bind(event_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(presence)
    }
}
