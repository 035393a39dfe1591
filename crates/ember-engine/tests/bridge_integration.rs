//! Integration tests for the cross-thread task dispatch bridge

use ember_engine::{BridgeConfig, NotifyWakeup, PeerState, TaskBridge};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn new_bridge() -> (TaskBridge, Arc<NotifyWakeup>) {
    let wakeup = Arc::new(NotifyWakeup::new());
    let bridge = TaskBridge::new(wakeup.clone());
    (bridge, wakeup)
}

/// Poll `condition` until it holds or two seconds pass.
fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[test]
fn test_continuation_runs_after_work_exactly_once() {
    let (bridge, wakeup) = new_bridge();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let log = order.clone();
    bridge.submit(move |completer| {
        log.lock().push("work");
        let log = log.clone();
        completer.complete(move || {
            log.lock().push("continuation");
        });
    });

    assert!(wakeup.wait_for(Duration::from_secs(2)));
    bridge.drain();
    bridge.drain();

    // Strictly after the work, exactly once even with a redundant drain.
    assert_eq!(*order.lock(), vec!["work", "continuation"]);
}

#[test]
fn test_continuations_preserve_submission_order() {
    let (bridge, _wakeup) = new_bridge();
    let received: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

    for index in 0..10 {
        let received = received.clone();
        bridge.submit(move |completer| {
            let received = received.clone();
            completer.complete(move || {
                received.lock().push(index);
            });
        });
    }

    assert!(wait_until(|| bridge.pending_results() == 10));
    bridge.drain();
    assert_eq!(*received.lock(), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_no_submission_lost_under_concurrent_producers() {
    let (bridge, wakeup) = new_bridge();
    let bridge = Arc::new(bridge);
    let delivered = Arc::new(AtomicUsize::new(0));

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let bridge = bridge.clone();
            let delivered = delivered.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let delivered = delivered.clone();
                    bridge.submit(move |completer| {
                        let delivered = delivered.clone();
                        completer.complete(move || {
                            delivered.fetch_add(1, Ordering::Relaxed);
                        });
                    });
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while delivered.load(Ordering::Relaxed) < 200 && Instant::now() < deadline {
        wakeup.wait_for(Duration::from_millis(10));
        bridge.drain();
    }

    // Nothing lost, nothing duplicated.
    assert_eq!(delivered.load(Ordering::Relaxed), 200);
    bridge.drain();
    assert_eq!(delivered.load(Ordering::Relaxed), 200);
}

#[test]
fn test_worker_survives_failing_item() {
    let (bridge, wakeup) = new_bridge();

    bridge.submit(|_completer| {
        panic!("deliberate test panic");
    });

    let succeeded = Arc::new(AtomicUsize::new(0));
    let counter = succeeded.clone();
    bridge.submit(move |completer| {
        let counter = counter.clone();
        completer.complete(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
    });

    assert!(wakeup.wait_for(Duration::from_secs(2)));
    bridge.drain();
    assert!(bridge.is_running());
    assert_eq!(succeeded.load(Ordering::Relaxed), 1);
}

#[test]
fn test_no_deliveries_after_shutdown() {
    let (mut bridge, _wakeup) = new_bridge();
    let delivered = Arc::new(AtomicUsize::new(0));

    bridge.stop();
    assert!(!bridge.is_running());

    let counter = delivered.clone();
    bridge.submit(move |completer| {
        let counter = counter.clone();
        completer.complete(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
    });

    thread::sleep(Duration::from_millis(50));
    bridge.drain();
    assert_eq!(delivered.load(Ordering::Relaxed), 0);
}

#[test]
fn test_destruction_waits_for_current_item() {
    let (bridge, _wakeup) = new_bridge();
    let finished = Arc::new(AtomicUsize::new(0));

    let counter = finished.clone();
    bridge.submit(move |_completer| {
        thread::sleep(Duration::from_millis(200));
        counter.fetch_add(1, Ordering::Relaxed);
    });

    // Let the worker pick the item up, then destroy the bridge.
    thread::sleep(Duration::from_millis(50));
    drop(bridge);

    // Drop blocked until the worker finished its current item.
    assert_eq!(finished.load(Ordering::Relaxed), 1);
}

#[test]
fn test_stop_abandons_worker_after_timeout() {
    let wakeup = Arc::new(NotifyWakeup::new());
    let mut bridge = TaskBridge::with_config(
        BridgeConfig {
            poll_interval: Duration::from_millis(1),
            shutdown_timeout: Duration::from_millis(50),
        },
        wakeup,
    );

    bridge.submit(|_completer| {
        thread::sleep(Duration::from_millis(500));
    });
    thread::sleep(Duration::from_millis(20));

    let start = Instant::now();
    bridge.stop();
    assert!(start.elapsed() < Duration::from_millis(400));
    assert!(!bridge.is_running());
}

#[test]
fn test_continuation_rechecks_peer_liveness() {
    let (bridge, wakeup) = new_bridge();
    let peer = PeerState::new();
    let outcome: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let handle = peer.handle();
    let log = outcome.clone();
    bridge.submit(move |completer| {
        // Blocking work runs while the peer is still connected...
        let handle = handle.clone();
        let log = log.clone();
        completer.complete(move || {
            if handle.is_connected() {
                log.lock().push("sent");
            } else {
                log.lock().push("dropped");
            }
        });
    });

    assert!(wakeup.wait_for(Duration::from_secs(2)));
    // ...but disconnects before the continuation is drained.
    peer.disconnect();
    bridge.drain();

    assert_eq!(*outcome.lock(), vec!["dropped"]);
}
