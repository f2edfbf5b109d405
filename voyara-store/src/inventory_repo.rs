use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, PgPool, Postgres};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;
use voyara_core::repository::InventoryRepository;
use voyara_core::{
    Allocation, CoreError, CoreResult, DateRange, Hold, InventoryUnit, RequestStatus,
    ServiceRequest, UnitAvailability,
};

use crate::request_repo::update_status;
use crate::storage_error;

/// Capacities live in `inventory_units` (one row per entity and occupancy
/// tier, NULL occupancy for pooled seats/vehicles); holds live in `allocations`.
pub struct PgInventoryRepository {
    pool: PgPool,
}

impl PgInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AllocationRow {
    id: Uuid,
    request_id: Uuid,
    entity_id: Uuid,
    occupancy: Option<i32>,
    quantity: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<AllocationRow> for Allocation {
    fn from(row: AllocationRow) -> Self {
        Allocation {
            id: row.id,
            request_id: row.request_id,
            entity_id: row.entity_id,
            unit: to_unit(row.occupancy),
            quantity: row.quantity.max(0) as u32,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
        }
    }
}

fn to_unit(occupancy: Option<i32>) -> InventoryUnit {
    InventoryUnit::from_occupancy(occupancy.map(|o| o.max(0) as u32))
}

fn occupancy_param(unit: InventoryUnit) -> Option<i32> {
    unit.occupancy().map(|o| o as i32)
}

// A same-day hold still blocks its day, hence the GREATEST(..., start + 1).
async fn unit_availability<'e, E>(
    executor: E,
    entity_id: Uuid,
    range: DateRange,
) -> Result<Vec<UnitAvailability>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let rows: Vec<(Option<i32>, i32, i64)> = sqlx::query_as(
        r#"
        SELECT u.occupancy, u.total, COALESCE(SUM(a.quantity), 0)::BIGINT AS held
        FROM inventory_units u
        LEFT JOIN allocations a
            ON a.entity_id = u.entity_id
           AND a.occupancy IS NOT DISTINCT FROM u.occupancy
           AND a.start_date < $3
           AND $2 < GREATEST(a.end_date, a.start_date + 1)
        WHERE u.entity_id = $1
        GROUP BY u.occupancy, u.total
        "#,
    )
    .bind(entity_id)
    .bind(range.start)
    .bind(range.exclusive_end())
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(occupancy, total, held)| UnitAvailability {
            unit: to_unit(occupancy),
            available: (i64::from(total) - held).max(0) as u32,
        })
        .collect())
}

const ALLOCATION_COLUMNS: &str =
    "id, request_id, entity_id, occupancy, quantity, start_date, end_date, created_at";

#[async_trait]
impl InventoryRepository for PgInventoryRepository {
    async fn availability(
        &self,
        entity_id: Uuid,
        range: DateRange,
    ) -> CoreResult<Option<Vec<UnitAvailability>>> {
        let units = unit_availability(&self.pool, entity_id, range)
            .await
            .map_err(storage_error)?;
        if units.is_empty() {
            return Ok(None);
        }
        Ok(Some(units))
    }

    async fn hold(&self, request_id: Uuid, holds: &[Hold]) -> CoreResult<Vec<Allocation>> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let mut demand: BTreeMap<(Uuid, InventoryUnit), (u32, DateRange)> = BTreeMap::new();
        for hold in holds {
            let entry = demand.entry((hold.entity_id, hold.unit)).or_insert((0, hold.range));
            entry.0 += hold.quantity;
        }

        // Serialise concurrent holds on the same entities
        let entity_ids: Vec<Uuid> = demand.keys().map(|(entity_id, _)| *entity_id).collect();
        sqlx::query("SELECT entity_id FROM inventory_units WHERE entity_id = ANY($1) FOR UPDATE")
            .bind(&entity_ids)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        let (already_held,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM allocations WHERE request_id = $1")
                .bind(request_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(storage_error)?;
        if already_held > 0 {
            return Err(CoreError::Conflict(format!(
                "inventory already held for request {}",
                request_id
            )));
        }

        for ((entity_id, unit), (quantity, range)) in &demand {
            let units = unit_availability(&mut *tx, *entity_id, *range)
                .await
                .map_err(storage_error)?;
            let Some(line) = units.iter().find(|u| u.unit == *unit) else {
                return Err(CoreError::NotFound(format!("Inventory for {}", entity_id)));
            };
            if line.available < *quantity {
                return Err(CoreError::InsufficientInventory {
                    requested: *quantity,
                    available: line.available,
                });
            }
        }

        let now = Utc::now();
        let mut allocations = Vec::with_capacity(holds.len());
        for hold in holds.iter().filter(|h| h.quantity > 0) {
            let allocation = Allocation::from_hold(request_id, hold, now);
            sqlx::query(
                r#"
                INSERT INTO allocations (id, request_id, entity_id, occupancy, quantity, start_date, end_date, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(allocation.id)
            .bind(allocation.request_id)
            .bind(allocation.entity_id)
            .bind(occupancy_param(allocation.unit))
            .bind(allocation.quantity as i32)
            .bind(allocation.start_date)
            .bind(allocation.end_date)
            .bind(allocation.created_at)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
            allocations.push(allocation);
        }

        tx.commit().await.map_err(storage_error)?;
        info!("Held {} allocation line(s) for request {}", allocations.len(), request_id);
        Ok(allocations)
    }

    async fn release(&self, request_id: Uuid) -> CoreResult<Vec<Allocation>> {
        let sql = format!(
            "DELETE FROM allocations WHERE request_id = $1 RETURNING {}",
            ALLOCATION_COLUMNS
        );
        let rows: Vec<AllocationRow> = sqlx::query_as(&sql)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(rows.into_iter().map(Allocation::from).collect())
    }

    async fn release_with_transition(
        &self,
        request: &ServiceRequest,
        expected: RequestStatus,
    ) -> CoreResult<Vec<Allocation>> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        update_status(&mut *tx, request, expected).await?;

        let sql = format!(
            "DELETE FROM allocations WHERE request_id = $1 RETURNING {}",
            ALLOCATION_COLUMNS
        );
        let rows: Vec<AllocationRow> = sqlx::query_as(&sql)
            .bind(request.id)
            .fetch_all(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(rows.into_iter().map(Allocation::from).collect())
    }

    async fn allocations_for(&self, request_id: Uuid) -> CoreResult<Vec<Allocation>> {
        let sql = format!(
            "SELECT {} FROM allocations WHERE request_id = $1 ORDER BY occupancy DESC NULLS LAST",
            ALLOCATION_COLUMNS
        );
        let rows: Vec<AllocationRow> = sqlx::query_as(&sql)
            .bind(request_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(rows.into_iter().map(Allocation::from).collect())
    }
}
