use crate::protocol::{Broadcast, Outbound, publish};
use chrono::Utc;
use fx_strength::StrengthService;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::broadcast,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, error, info};

/// Recompute strengths every `period` and broadcast the results.
///
/// Real-time strengths go out on every tick, the dashboard whenever
/// [`StrengthService::tick`] reports it due.
pub fn spawn_driver(
    service: Arc<StrengthService>,
    tx: broadcast::Sender<Broadcast>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(?period, "Starting strength update loop");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let tick = service.tick(Utc::now().timestamp_millis());

            let mut outbound = vec![Outbound::StrengthUpdate(tick.strengths)];
            if let Some(dashboard) = tick.dashboard {
                debug!(at = dashboard.at, "Emitting dashboard update");
                outbound.push(Outbound::DashboardUpdate(dashboard));
            }

            for message in &outbound {
                if let Err(e) = publish(&tx, message) {
                    error!("Failed to broadcast {:?}: {}", message.topic(), e);
                }
            }
        }
    })
}
