use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use voyara_core::repository::{EntityDirectory, PackageDirectory};
use voyara_core::{CoreResult, ProviderType, ServiceEntity};

use crate::storage_error;

/// Read-only view over the marketplace tables owned elsewhere.
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entity_table(provider_type: ProviderType) -> &'static str {
    match provider_type {
        ProviderType::Hotel => "hotels",
        ProviderType::Flight => "flights",
        ProviderType::Transport => "transports",
    }
}

#[async_trait]
impl EntityDirectory for PgDirectory {
    async fn find_entity(
        &self,
        provider_type: ProviderType,
        entity_id: Uuid,
    ) -> CoreResult<Option<ServiceEntity>> {
        let sql = format!(
            "SELECT id, user_id, name FROM {} WHERE id = $1",
            entity_table(provider_type)
        );
        let row: Option<(Uuid, Uuid, String)> = sqlx::query_as(&sql)
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.map(|(id, provider_id, name)| ServiceEntity {
            id,
            provider_type,
            provider_id,
            name,
        }))
    }
}

#[async_trait]
impl PackageDirectory for PgDirectory {
    async fn package_owner(&self, package_id: Uuid) -> CoreResult<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT user_id FROM packages WHERE id = $1")
            .bind(package_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.map(|(owner,)| owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_tables() {
        assert_eq!(entity_table(ProviderType::Hotel), "hotels");
        assert_eq!(entity_table(ProviderType::Flight), "flights");
        assert_eq!(entity_table(ProviderType::Transport), "transports");
    }
}
