use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use voyara_core::repository::AdRepository;
use voyara_core::{Ad, AdInteraction, CoreError, CoreResult};

use crate::storage_error;

pub struct PgAdRepository {
    pool: PgPool,
}

impl PgAdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AdRow {
    id: Uuid,
    placement: String,
    title: String,
    image_url: Option<String>,
    target_url: String,
    is_active: bool,
    impressions: i64,
    clicks: i64,
}

impl From<AdRow> for Ad {
    fn from(row: AdRow) -> Self {
        Ad {
            id: row.id,
            placement: row.placement,
            title: row.title,
            image_url: row.image_url,
            target_url: row.target_url,
            is_active: row.is_active,
            impressions: row.impressions,
            clicks: row.clicks,
        }
    }
}

fn counter_column(interaction: AdInteraction) -> &'static str {
    match interaction {
        AdInteraction::Impression => "impressions",
        AdInteraction::Click => "clicks",
    }
}

#[async_trait]
impl AdRepository for PgAdRepository {
    async fn active_ads(&self, placement: &str, limit: u32) -> CoreResult<Vec<Ad>> {
        let rows: Vec<AdRow> = sqlx::query_as(
            r#"
            SELECT id, placement, title, image_url, target_url, is_active, impressions, clicks
            FROM ads
            WHERE placement = $1 AND is_active = TRUE
            ORDER BY impressions ASC, id
            LIMIT $2
            "#,
        )
        .bind(placement)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(Ad::from).collect())
    }

    async fn record(&self, ad_id: Uuid, interaction: AdInteraction) -> CoreResult<Ad> {
        let column = counter_column(interaction);
        let sql = format!(
            "UPDATE ads SET {col} = {col} + 1 \
             WHERE id = $1 AND is_active = TRUE \
             RETURNING id, placement, title, image_url, target_url, is_active, impressions, clicks",
            col = column
        );
        let row: Option<AdRow> = sqlx::query_as(&sql)
            .bind(ad_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(Ad::from)
            .ok_or_else(|| CoreError::NotFound(format!("Ad {}", ad_id)))
    }
}
