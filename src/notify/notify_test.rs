use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;
use tokio::time::Instant;

use crate::Coalescer;
use crate::NotificationHub;
use crate::NotifyConfig;

type Fires<T> = Arc<Mutex<Vec<(T, Duration)>>>;

fn recording_observer<T: Send + 'static>(
    started: Instant,
    fires: &Fires<T>,
) -> Arc<dyn Fn(T) + Send + Sync> {
    let fires = fires.clone();
    Arc::new(move |value| {
        fires.lock().push((value, started.elapsed()));
    })
}

/// A burst of three dispatches at t=0/10/20ms yields exactly one publish at
/// ~t=100ms carrying the latest value.
#[tokio::test(start_paused = true)]
async fn test_burst_collapses_to_latest_value() {
    let started = Instant::now();
    let fires: Fires<u32> = Arc::new(Mutex::new(Vec::new()));
    let coalescer = Coalescer::new(&NotifyConfig::default(), recording_observer(started, &fires));

    coalescer.dispatch(1);
    sleep(Duration::from_millis(10)).await;
    coalescer.dispatch(2);
    sleep(Duration::from_millis(10)).await;
    coalescer.dispatch(3);

    sleep(Duration::from_millis(300)).await;

    let fires = fires.lock();
    assert_eq!(fires.len(), 1, "burst must collapse to one publish");
    let (value, at) = &fires[0];
    assert_eq!(*value, 3);
    assert!(*at >= Duration::from_millis(100) && *at < Duration::from_millis(130), "fired at {at:?}");
}

/// Continuous triggering cannot starve observers: the throttle ceiling
/// guarantees a publish per window.
#[tokio::test(start_paused = true)]
async fn test_throttle_ceiling_under_continuous_triggering() {
    let started = Instant::now();
    let fires: Fires<u32> = Arc::new(Mutex::new(Vec::new()));
    let coalescer = Coalescer::new(&NotifyConfig::default(), recording_observer(started, &fires));

    // Re-trigger every 60ms, always inside the 100ms debounce window
    for value in 0u32..6 {
        coalescer.dispatch(value);
        sleep(Duration::from_millis(60)).await;
    }
    sleep(Duration::from_millis(500)).await;

    let fires = fires.lock();
    assert_eq!(fires.len(), 2, "expected one publish per throttle window: {fires:?}");

    let (value, at) = &fires[0];
    assert_eq!(*value, 3, "first window publishes the latest value at its ceiling");
    assert!(*at >= Duration::from_millis(200) && *at < Duration::from_millis(230), "fired at {at:?}");

    let (value, at) = &fires[1];
    assert_eq!(*value, 5);
    assert!(*at >= Duration::from_millis(400) && *at < Duration::from_millis(430), "fired at {at:?}");
}

#[tokio::test(start_paused = true)]
async fn test_single_dispatch_fires_after_debounce() {
    let started = Instant::now();
    let fires: Fires<&'static str> = Arc::new(Mutex::new(Vec::new()));
    let coalescer = Coalescer::new(&NotifyConfig::default(), recording_observer(started, &fires));

    coalescer.dispatch("ping");
    sleep(Duration::from_millis(300)).await;

    let fires = fires.lock();
    assert_eq!(fires.len(), 1);
    assert!(fires[0].1 >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_dispose_drops_pending_publish() {
    let started = Instant::now();
    let fires: Fires<u32> = Arc::new(Mutex::new(Vec::new()));
    let coalescer = Coalescer::new(&NotifyConfig::default(), recording_observer(started, &fires));

    coalescer.dispatch(1);
    coalescer.dispose();
    coalescer.dispose(); // idempotent

    sleep(Duration::from_millis(300)).await;
    assert!(fires.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hub_coalesces_per_observer_pair() {
    let started = Instant::now();
    let hub: NotificationHub<&'static str, u32> = NotificationHub::new(NotifyConfig::default());

    let first: Fires<u32> = Arc::new(Mutex::new(Vec::new()));
    let second: Fires<u32> = Arc::new(Mutex::new(Vec::new()));
    hub.subscribe("resource", "observer-1", recording_observer(started, &first));
    hub.subscribe("resource", "observer-2", recording_observer(started, &second));
    assert_eq!(hub.subscription_count(), 2);

    for value in 0u32..3 {
        hub.publish(&"resource", value);
    }
    // A publish for another kind never reaches these observers
    hub.publish(&"health", 99);

    sleep(Duration::from_millis(300)).await;

    assert_eq!(first.lock().len(), 1);
    assert_eq!(first.lock()[0].0, 2);
    assert_eq!(second.lock().len(), 1);
    assert_eq!(second.lock()[0].0, 2);
}

#[tokio::test(start_paused = true)]
async fn test_hub_unsubscribe_stops_delivery() {
    let started = Instant::now();
    let hub: NotificationHub<&'static str, u32> = NotificationHub::new(NotifyConfig::default());

    let fires: Fires<u32> = Arc::new(Mutex::new(Vec::new()));
    hub.subscribe("resource", "observer-1", recording_observer(started, &fires));
    hub.unsubscribe(&"resource", "observer-1");
    assert_eq!(hub.subscription_count(), 0);

    hub.publish(&"resource", 1);
    sleep(Duration::from_millis(300)).await;
    assert!(fires.lock().is_empty());
}
