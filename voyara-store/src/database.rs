use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;
use serde_json::Value;

use crate::app_config::BusinessRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        info!("Connected to Postgres (max {} connections)", max_connections);
        Ok(Self { pool })
    }

    /// Overlays `business_rules` table rows (`{"value": ...}`) on the file config.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<(String, Value)> = sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        Ok(apply_rule_overrides(defaults, rows))
    }
}

fn apply_rule_overrides(defaults: BusinessRules, rows: Vec<(String, Value)>) -> BusinessRules {
    let mut rules = defaults;

    for (key, value) in rows {
        let Some(v) = value.get("value") else {
            continue;
        };
        match key.as_str() {
            "request_ttl_hours" => {
                if let Some(u) = v.as_u64() {
                    rules.request_ttl_hours = u;
                }
            }
            "expiry_sweep_seconds" => {
                if let Some(u) = v.as_u64() {
                    rules.expiry_sweep_seconds = u;
                }
            }
            "default_room_occupancy" => {
                if let Some(u) = v.as_u64().and_then(|u| u32::try_from(u).ok()) {
                    if u > 0 {
                        rules.default_room_occupancy = u;
                    }
                }
            }
            _ => {}
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_overrides() {
        let rows = vec![
            ("request_ttl_hours".to_string(), json!({"value": 24})),
            ("default_room_occupancy".to_string(), json!({"value": 0})),
            ("expiry_sweep_seconds".to_string(), json!({"other": 5})),
            ("unknown".to_string(), json!({"value": 1})),
        ];

        let rules = apply_rule_overrides(BusinessRules::default(), rows);
        assert_eq!(rules.request_ttl_hours, 24);
        // Zero occupancy is ignored
        assert_eq!(rules.default_room_occupancy, 3);
        assert_eq!(rules.expiry_sweep_seconds, 60);
    }
}
