// src/db/ticket_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TicketStore,
    models::{
        query::{CostOperator, ResolvedTicketQuery},
        stock::{
            AdjustmentOutcome, AdjustmentRequest, PoolCounters, SalesAdjustment, StockCounters,
        },
        ticket::{pool_transfer, GlobalStockMode, NewTicket, TicketChanges, TicketRecord},
    },
};

// ---
// Statements do motor de ajuste
// ---
// Ambos calculam a partir da linha atual (travada pelo FOR UPDATE do CTE):
//   sales' = max(sales + delta, 0), applied = sales' - sales,
//   stock' = clamp(stock - applied, 0, capacity) quando gerenciado e finito.
// É a mesma regra de `StockCounters::apply`.

const ADJUST_TICKET_SQL: &str = r#"
    WITH current AS (
        SELECT id, total_sales, stock
        FROM tickets
        WHERE id = $1 AND deleted_at IS NULL
        FOR UPDATE
    )
    UPDATE tickets t
    SET total_sales = GREATEST(current.total_sales + $2, 0),
        stock = CASE
            WHEN t.manage_stock AND t.capacity >= 0 THEN
                LEAST(
                    GREATEST(
                        current.stock - (GREATEST(current.total_sales + $2, 0) - current.total_sales),
                        0
                    ),
                    t.capacity
                )
            ELSE t.stock
        END,
        updated_at = NOW()
    FROM current
    WHERE t.id = current.id
      AND (
          NOT $3::boolean
          OR NOT t.manage_stock
          OR t.capacity IS NULL
          OR t.capacity < 0
          OR (
              t.global_stock_mode = 'global'
              AND EXISTS (
                  SELECT 1 FROM event_stock_pools p
                  WHERE p.event_id = t.event_id AND p.enabled
              )
          )
          OR current.stock >= $2
      )
    RETURNING t.event_id, t.global_stock_mode, t.capacity, t.manage_stock,
              t.total_sales, t.stock,
              current.total_sales AS previous_sales, current.stock AS previous_stock
"#;

const ADJUST_POOL_SQL: &str = r#"
    WITH current AS (
        SELECT event_id, sales, stock
        FROM event_stock_pools
        WHERE event_id = $1 AND enabled
        FOR UPDATE
    )
    UPDATE event_stock_pools p
    SET sales = GREATEST(current.sales + $2, 0),
        stock = LEAST(
            GREATEST(current.stock - (GREATEST(current.sales + $2, 0) - current.sales), 0),
            p.capacity
        ),
        updated_at = NOW()
    FROM current
    WHERE p.event_id = current.event_id
      AND (NOT $3::boolean OR current.stock >= $2)
    RETURNING p.event_id, p.capacity, p.sales, p.stock,
              current.sales AS previous_sales, current.stock AS previous_stock
"#;

#[derive(Debug, FromRow)]
struct AdjustedTicketRow {
    event_id: Uuid,
    global_stock_mode: String,
    capacity: Option<i64>,
    manage_stock: bool,
    total_sales: i64,
    stock: i64,
    previous_sales: i64,
    previous_stock: i64,
}

#[derive(Debug, FromRow)]
struct AdjustedPoolRow {
    event_id: Uuid,
    capacity: i64,
    sales: i64,
    stock: i64,
    previous_sales: i64,
    previous_stock: i64,
}

#[derive(Debug, FromRow)]
struct PoolStateRow {
    enabled: bool,
    stock: i64,
}

#[derive(Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leitura
    // ---

    pub async fn fetch_ticket<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<TicketRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ticket = sqlx::query_as::<_, TicketRecord>(
            "SELECT * FROM tickets WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(ticket)
    }

    async fn lock_ticket<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<TicketRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ticket = sqlx::query_as::<_, TicketRecord>(
            "SELECT * FROM tickets WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(ticket)
    }

    // ---
    // Escrita
    // ---

    async fn write_ticket<'e, E>(
        &self,
        executor: E,
        record: &TicketRecord,
    ) -> Result<TicketRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ticket = sqlx::query_as::<_, TicketRecord>(
            r#"
            UPDATE tickets
            SET name = $2, description = $3, price = $4,
                currency_code = $5, currency_symbol = $6, menu_order = $7,
                start_date = $8, end_date = $9, capacity = $10,
                stock = $11, manage_stock = $12, global_stock_mode = $13,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.price)
        .bind(&record.currency_code)
        .bind(&record.currency_symbol)
        .bind(record.menu_order)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.capacity)
        .bind(record.stock)
        .bind(record.manage_stock)
        .bind(&record.global_stock_mode)
        .fetch_one(executor)
        .await?;
        Ok(ticket)
    }

    async fn pool_state<'e, E>(
        &self,
        executor: E,
        event_id: Uuid,
    ) -> Result<Option<PoolStateRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let state = sqlx::query_as::<_, PoolStateRow>(
            "SELECT enabled, stock FROM event_stock_pools WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(executor)
        .await?;
        Ok(state)
    }
}

#[async_trait]
impl TicketStore for TicketRepository {
    async fn find_ticket(&self, id: Uuid) -> Result<Option<TicketRecord>, AppError> {
        self.fetch_ticket(&self.pool, id).await
    }

    async fn insert_ticket(&self, ticket: &NewTicket) -> Result<TicketRecord, AppError> {
        let record = sqlx::query_as::<_, TicketRecord>(
            r#"
            INSERT INTO tickets (
                event_id, provider, name, description, price,
                currency_code, currency_symbol, menu_order, start_date, end_date,
                capacity, total_sales, stock, manage_stock, global_stock_mode
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(ticket.event_id)
        .bind(ticket.provider.as_str())
        .bind(&ticket.name)
        .bind(&ticket.description)
        .bind(ticket.price)
        .bind(&ticket.currency_code)
        .bind(&ticket.currency_symbol)
        .bind(ticket.menu_order)
        .bind(ticket.start_date)
        .bind(ticket.end_date)
        .bind(ticket.capacity)
        .bind(ticket.initial_stock())
        .bind(ticket.manage_stock)
        .bind(ticket.global_stock_mode.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(ticket_id = %record.id, event_id = %record.event_id, "ingresso criado");
        Ok(record)
    }

    async fn update_ticket(
        &self,
        id: Uuid,
        changes: &TicketChanges,
    ) -> Result<Option<TicketRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Trava a linha: o estoque recalculado usa as vendas atuais
        let Some(mut record) = self.lock_ticket(&mut *tx, id).await? else {
            return Ok(None);
        };
        let shared_before = record.shares_pool();

        // 2. Aplica e grava tudo numa escrita só
        changes.apply_to(&mut record);
        let saved = self.write_ticket(&mut *tx, &record).await?;

        // 3. Entrou ou saiu do pool: as vendas acompanham, no mesmo statement do motor
        let transfer = pool_transfer(shared_before, &saved);
        if transfer != 0 {
            sqlx::query(ADJUST_POOL_SQL)
                .bind(saved.event_id)
                .bind(transfer)
                .bind(false)
                .execute(&mut *tx)
                .await?;
            tracing::info!(ticket_id = %id, transfer, "vendas transferidas para o pool do evento");
        }

        tx.commit().await?;
        Ok(Some(saved))
    }

    async fn soft_delete_ticket(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE tickets SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tickets(
        &self,
        query: &ResolvedTicketQuery,
    ) -> Result<Vec<TicketRecord>, AppError> {
        if query.event_ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT t.* FROM tickets t WHERE t.deleted_at IS NULL");

        if let Some(event_ids) = &query.event_ids {
            builder.push(" AND t.event_id = ANY(");
            builder.push_bind(event_ids.clone());
            builder.push(")");
        }

        if let Some(provider) = query.provider {
            builder.push(" AND t.provider = ");
            builder.push_bind(provider.as_str());
        }

        if let Some(cost) = &query.cost {
            // RSVP não tem preço: conta como 0
            builder.push(" AND (CASE WHEN t.provider = 'rsvp' THEN 0 ELSE t.price END) ");
            match (cost.operator, cost.upper) {
                (CostOperator::Between, upper) => {
                    builder.push("BETWEEN ");
                    builder.push_bind(cost.value);
                    builder.push(" AND ");
                    builder.push_bind(upper.unwrap_or(cost.value));
                }
                (operator, _) => {
                    builder.push(operator.as_sql());
                    builder.push(" ");
                    builder.push_bind(cost.value);
                }
            }
        }

        if let Some(currency) = &query.currency {
            match &currency.code {
                // Código conhecido: o símbolo só vale para ingressos sem código gravado
                Some(code) => {
                    builder.push(" AND (UPPER(t.currency_code) = ");
                    builder.push_bind(code.to_ascii_uppercase());
                    builder.push(" OR (t.currency_code = '' AND t.currency_symbol = ");
                    builder.push_bind(currency.symbol.clone());
                    builder.push("))");
                }
                None => {
                    builder.push(" AND t.currency_symbol = ");
                    builder.push_bind(currency.symbol.clone());
                }
            }
        }

        if let Some(attendee_id) = query.attendee_id {
            builder.push(
                " AND EXISTS (SELECT 1 FROM attendees a WHERE a.ticket_id = t.id AND a.id = ",
            );
            builder.push_bind(attendee_id);
            builder.push(")");
        }

        if let Some(user_id) = query.attendee_user_id {
            builder.push(
                " AND EXISTS (SELECT 1 FROM attendees a WHERE a.ticket_id = t.id AND a.user_id = ",
            );
            builder.push_bind(user_id);
            builder.push(")");
        }

        builder.push(" ORDER BY t.menu_order ASC, t.created_at ASC");

        let tickets = builder
            .build_query_as::<TicketRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(tickets)
    }

    async fn adjust_sales(
        &self,
        id: Uuid,
        request: AdjustmentRequest,
    ) -> Result<AdjustmentOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Ingresso: um único statement, com a guarda de admissão quando pedida
        let adjusted = sqlx::query_as::<_, AdjustedTicketRow>(ADJUST_TICKET_SQL)
            .bind(id)
            .bind(request.delta)
            .bind(request.guarded)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = adjusted else {
            // Não atualizou: ou não existe, ou a guarda recusou
            let current = self.fetch_ticket(&mut *tx, id).await?;
            tx.rollback().await?;
            return Ok(match current {
                None => AdjustmentOutcome::NotFound,
                Some(ticket) => AdjustmentOutcome::Rejected { available: ticket.stock },
            });
        };

        let before = StockCounters {
            sales: row.previous_sales,
            stock: row.previous_stock,
            capacity: row.capacity,
            managed: row.manage_stock,
        };
        let ticket_delta = before.apply(request.delta);

        let mut adjustment = SalesAdjustment {
            ticket_id: id,
            sales: row.total_sales,
            stock: row.stock,
            applied: ticket_delta.applied,
            saturated: ticket_delta.saturated,
            pool: None,
        };

        // 2. Pool do evento, na mesma transação, com o delta efetivamente aplicado.
        // Ingresso ilimitado não consome o pool.
        if GlobalStockMode::from_stored(&row.global_stock_mode).uses_pool() && before.is_bounded() {
            let pool_row = sqlx::query_as::<_, AdjustedPoolRow>(ADJUST_POOL_SQL)
                .bind(row.event_id)
                .bind(ticket_delta.applied)
                .bind(request.guarded)
                .fetch_optional(&mut *tx)
                .await?;

            match pool_row {
                Some(pool) => {
                    let pool_before = StockCounters {
                        sales: pool.previous_sales,
                        stock: pool.previous_stock,
                        capacity: Some(pool.capacity),
                        managed: true,
                    };
                    adjustment.saturated |= pool_before.apply(ticket_delta.applied).saturated;
                    adjustment.pool = Some(PoolCounters {
                        event_id: pool.event_id,
                        sales: pool.sales,
                        stock: pool.stock,
                    });
                }
                None => {
                    if let Some(state) = self.pool_state(&mut *tx, row.event_id).await? {
                        if state.enabled && request.guarded {
                            tx.rollback().await?;
                            tracing::debug!(ticket_id = %id, available = state.stock, "pool sem estoque");
                            return Ok(AdjustmentOutcome::Rejected { available: state.stock });
                        }
                    }
                    // Pool ausente ou desligado: o ingresso vale pelos próprios contadores
                }
            }
        }

        tx.commit().await?;
        Ok(AdjustmentOutcome::Applied(adjustment))
    }
}
