use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::engine::Engine;

/// Background task that periodically reverts expired reservations, so the
/// registry stays current between reads.
pub async fn run_reaper(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let now = engine.now_ms();
        for slot in engine.sweep_expired(now).await {
            info!("reaped expired reservation on {slot}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::ManualClock;
    use crate::model::*;
    use crate::notify::NotifyHub;

    #[tokio::test]
    async fn reaper_frees_expired_reservations() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let config = EngineConfig::from_ids(["A1", "A2"], 20).unwrap();
        let engine = Arc::new(
            Engine::with_clock(config, Arc::new(NotifyHub::new()), clock.clone()).unwrap(),
        );

        engine.request_reservation("A1", Some(1)).await.unwrap();
        engine.request_reservation("A2", Some(30)).await.unwrap();
        let mut feed = engine.subscribe("A1").unwrap();

        let task = tokio::spawn(run_reaper(engine.clone(), Duration::from_millis(10)));
        clock.advance(MINUTE_MS + 1_000);

        let event = tokio::time::timeout(Duration::from_secs(2), feed.recv())
            .await
            .expect("reaper did not run")
            .unwrap();
        assert!(matches!(event, Event::ReservationExpired { .. }));
        task.abort();

        assert_eq!(engine.timer_entry("A1"), None);
        assert!(engine.timer_entry("A2").is_some());
    }
}
