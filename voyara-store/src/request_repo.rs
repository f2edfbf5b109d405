use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use voyara_core::repository::{RequestFilter, ServiceRequestRepository};
use voyara_core::{CoreError, CoreResult, RequestMetadata, RequestStatus, ServiceRequest};

use crate::storage_error;

const REQUEST_COLUMNS: &str = "id, agent_id, provider_id, provider_type, entity_id, package_id, status, \
     requested_quantity, start_date, end_date, metadata, auto_approved, expires_at, decided_at, \
     decided_by, rejection_reason, created_at, updated_at";

pub struct PgServiceRequestRepository {
    pool: PgPool,
}

impl PgServiceRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ServiceRequestRow {
    id: Uuid,
    agent_id: Uuid,
    provider_id: Uuid,
    provider_type: String,
    entity_id: Uuid,
    package_id: Option<Uuid>,
    status: String,
    requested_quantity: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    metadata: Option<Value>,
    auto_approved: bool,
    expires_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<Uuid>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ServiceRequestRow> for ServiceRequest {
    type Error = CoreError;

    fn try_from(row: ServiceRequestRow) -> Result<Self, Self::Error> {
        let metadata: RequestMetadata = match row.metadata {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| CoreError::Storage(format!("bad metadata on request {}: {}", row.id, e)))?,
            None => RequestMetadata::default(),
        };

        Ok(ServiceRequest {
            id: row.id,
            agent_id: row.agent_id,
            provider_id: row.provider_id,
            provider_type: row.provider_type.parse().map_err(CoreError::Storage)?,
            entity_id: row.entity_id,
            package_id: row.package_id,
            status: row.status.parse().map_err(CoreError::Storage)?,
            requested_quantity: u32::try_from(row.requested_quantity)
                .map_err(|_| CoreError::Storage(format!("negative quantity on request {}", row.id)))?,
            start_date: row.start_date,
            end_date: row.end_date,
            metadata,
            auto_approved: row.auto_approved,
            expires_at: row.expires_at,
            decided_at: row.decided_at,
            decided_by: row.decided_by,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn quantity_param(quantity: u32) -> CoreResult<i32> {
    i32::try_from(quantity).map_err(|_| CoreError::Storage(format!("quantity {} out of range", quantity)))
}

/// Compare-and-set on the status column; shared with the inventory
/// transaction that releases allocations.
pub(crate) async fn update_status<'e, E>(
    executor: E,
    request: &ServiceRequest,
    expected: RequestStatus,
) -> CoreResult<()>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE service_requests
        SET status = $2, auto_approved = $3, decided_at = $4, decided_by = $5,
            rejection_reason = $6, updated_at = $7
        WHERE id = $1 AND status = $8
        "#,
    )
    .bind(request.id)
    .bind(request.status.as_str())
    .bind(request.auto_approved)
    .bind(request.decided_at)
    .bind(request.decided_by)
    .bind(request.rejection_reason.as_deref())
    .bind(request.updated_at)
    .bind(expected.as_str())
    .execute(executor)
    .await
    .map_err(storage_error)?;

    if result.rows_affected() == 0 {
        return Err(CoreError::Conflict(format!(
            "request {} is no longer {}",
            request.id, expected
        )));
    }
    Ok(())
}

#[async_trait]
impl ServiceRequestRepository for PgServiceRequestRepository {
    async fn insert(&self, request: &ServiceRequest) -> CoreResult<()> {
        let metadata = serde_json::to_value(&request.metadata)
            .map_err(|e| CoreError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO service_requests (id, agent_id, provider_id, provider_type, entity_id, package_id, status,
                requested_quantity, start_date, end_date, metadata, auto_approved, expires_at, decided_at,
                decided_by, rejection_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(request.id)
        .bind(request.agent_id)
        .bind(request.provider_id)
        .bind(request.provider_type.as_str())
        .bind(request.entity_id)
        .bind(request.package_id)
        .bind(request.status.as_str())
        .bind(quantity_param(request.requested_quantity)?)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(metadata)
        .bind(request.auto_approved)
        .bind(request.expires_at)
        .bind(request.decided_at)
        .bind(request.decided_by)
        .bind(request.rejection_reason.as_deref())
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<ServiceRequest>> {
        let sql = format!("SELECT {} FROM service_requests WHERE id = $1", REQUEST_COLUMNS);
        let row: Option<ServiceRequestRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(ServiceRequest::try_from).transpose()
    }

    async fn list(&self, filter: &RequestFilter) -> CoreResult<Vec<ServiceRequest>> {
        let sql = format!(
            "SELECT {} FROM service_requests \
             WHERE ($1::uuid IS NULL OR agent_id = $1) \
               AND ($2::uuid IS NULL OR provider_id = $2) \
               AND ($3::text IS NULL OR status = $3) \
             ORDER BY created_at DESC",
            REQUEST_COLUMNS
        );
        let rows: Vec<ServiceRequestRow> = sqlx::query_as(&sql)
            .bind(filter.agent_id)
            .bind(filter.provider_id)
            .bind(filter.status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter().map(ServiceRequest::try_from).collect()
    }

    async fn save_transition(&self, request: &ServiceRequest, expected: RequestStatus) -> CoreResult<()> {
        update_status(&self.pool, request, expected).await
    }

    async fn list_overdue(&self, now: DateTime<Utc>, limit: u32) -> CoreResult<Vec<ServiceRequest>> {
        let sql = format!(
            "SELECT {} FROM service_requests \
             WHERE status = 'pending' AND expires_at <= $1 \
             ORDER BY expires_at \
             LIMIT $2",
            REQUEST_COLUMNS
        );
        let rows: Vec<ServiceRequestRow> = sqlx::query_as(&sql)
            .bind(now)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.into_iter().map(ServiceRequest::try_from).collect()
    }
}
