use crate::{Data, Error};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use tracing::{error, info};

use super::TaskHandler;

/// Drives the rotation engine's refresh cycle: sleep until the current
/// window's end boundary, refresh, notify, repeat. The delay is recomputed
/// from the freshly applied window every cycle — a one-shot timer re-armed
/// each time, never a fixed interval, because rotation periods are not
/// evenly spaced.
pub struct RotationRefreshTask;

impl RotationRefreshTask {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskHandler for RotationRefreshTask {
    fn name(&self) -> &'static str {
        "rotation_refresh"
    }

    async fn run(&mut self, _ctx: &serenity::Context, data: Data) -> Result<(), Error> {
        loop {
            let delay = data.rotations.next_refresh_delay().await;
            info!("Next rotation refresh in {}s", delay.as_secs());
            tokio::time::sleep(delay).await;

            // A failed fetch keeps the stale in-memory state; the recomputed
            // delay above then bottoms out at the retry floor.
            if let Err(e) = data.rotations.refresh_and_notify().await {
                error!("Rotation refresh failed: {}", e);
            }
        }
    }
}
