// src/services/sweeper.rs

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{services::attempt, store::Store};

/// Rows read per page of a sweep.
const SWEEP_PAGE: i64 = 100;

/// Periodically auto-submits attempts whose owners never came back.
/// Returns `None` when `interval_secs` is 0.
pub fn spawn(store: Arc<dyn Store>, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        tracing::info!("Attempt sweeper disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match attempt::sweep_expired(store.as_ref(), Utc::now(), SWEEP_PAGE).await {
                Ok(0) => {}
                Ok(closed) => tracing::info!(closed, "auto-submitted expired attempts"),
                Err(e) => tracing::error!("attempt sweep failed: {:?}", e),
            }
        }
    }))
}
