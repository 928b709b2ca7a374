use std::sync::Arc;
use std::time::Duration;

use dynavar::{Sample, ValueKind};
use dynavar_sim::{poll_once, spawn_poller, SharedDriver};
use parking_lot::Mutex;

mod common;

#[test]
fn counter_runs_only_while_subscribed() {
    let (mut driver, log) = common::monitored(&[ValueKind::Int64]);
    let count = driver.resolve_binding("COUNT").unwrap();

    poll_once(&mut driver);
    assert_eq!(driver.read_int64(count).unwrap(), 0);
    assert!(!driver.device().counting());

    driver.subscribe(count).unwrap();
    assert!(driver.device().counting());
    poll_once(&mut driver);
    poll_once(&mut driver);
    poll_once(&mut driver);
    assert_eq!(
        log.delivered(count),
        [Sample::Int64(1), Sample::Int64(2), Sample::Int64(3)]
    );

    driver.unsubscribe(count).unwrap();
    assert!(!driver.device().counting());
    poll_once(&mut driver);
    assert_eq!(driver.read_int64(count).unwrap(), 3);
    assert_eq!(log.delivered(count).len(), 3);
}

#[test]
fn wave_streams_only_with_listener() {
    let (mut driver, log) = common::monitored(&[ValueKind::Float32Array]);
    let wave = driver.resolve_binding("WAVE saw").unwrap();

    poll_once(&mut driver);
    assert!(log.delivered(wave).is_empty());

    driver.subscribe(wave).unwrap();
    assert!(driver.device().streaming());
    poll_once(&mut driver);
    poll_once(&mut driver);

    let waves = log.delivered(wave);
    assert_eq!(waves.len(), 2);
    let Sample::Float32Array(first) = &waves[0] else {
        panic!("expected a waveform sample");
    };
    let Sample::Float32Array(second) = &waves[1] else {
        panic!("expected a waveform sample");
    };
    assert_eq!(first.len(), driver.device().layout().waveform_len);
    // The generator advanced between ticks.
    assert_ne!(first, second);

    driver.unsubscribe(wave).unwrap();
    assert!(!driver.device().streaming());
    poll_once(&mut driver);
    assert_eq!(log.delivered(wave).len(), 2);
}

#[test]
fn channel_updates_sweep_through_cache() {
    let (mut driver, log) = common::monitored(&[ValueKind::Float64]);
    let chan = driver.resolve_binding("CHAN 3").unwrap();
    driver.write_float64(chan, 4.25).unwrap();

    driver.subscribe(chan).unwrap();
    poll_once(&mut driver);
    assert_eq!(log.delivered(chan), [Sample::Float64(4.25)]);
    assert_eq!(driver.cached(chan), Some(Sample::Float64(4.25)));
}

#[test]
fn spawned_poller_stops_on_request() {
    let (mut driver, log) = common::monitored(&[ValueKind::Int64]);
    let count = driver.resolve_binding("COUNT").unwrap();
    driver.subscribe(count).unwrap();

    let shared: SharedDriver = Arc::new(Mutex::new(driver));
    let mut handle = spawn_poller(shared.clone(), Duration::from_millis(2)).unwrap();
    std::thread::sleep(Duration::from_millis(60));
    handle.stop();
    handle.join().unwrap();

    let deliveries = log.delivered(count).len();
    assert!(deliveries > 0, "poller never delivered");
    let mut driver = shared.lock();
    assert!(driver.read_int64(count).unwrap() > 0);
    // Stopped for real: no more ticks arrive.
    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(log.delivered(count).len(), deliveries);
}
