use chrono::Utc;
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use crate::approval::ApprovalService;

const SWEEP_BATCH: u32 = 200;

/// Runs one sweep: keeps expiring batches until a batch comes back short.
pub async fn sweep_once(approval: &ApprovalService) -> usize {
    let mut total = 0;
    loop {
        match approval.expire_overdue(Utc::now(), SWEEP_BATCH).await {
            Ok(expired) => {
                total += expired;
                if expired < SWEEP_BATCH as usize {
                    return total;
                }
            }
            Err(e) => {
                error!("Expiry sweep failed: {}", e);
                return total;
            }
        }
    }
}

pub async fn start_expiry_sweeper(approval: Arc<ApprovalService>, every_seconds: u64) {
    let mut ticker = interval(Duration::from_secs(every_seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Expiry sweeper started, running every {}s", every_seconds.max(1));

    loop {
        ticker.tick().await;
        sweep_once(&approval).await;
    }
}
