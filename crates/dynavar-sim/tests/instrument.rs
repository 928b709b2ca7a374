use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use dynavar::{
    Alarm, AlarmCondition, AlarmSeverity, BindingError, DeviceStatus, DispatchError, DriverOpts,
};
use dynavar_sim::{build_driver, SimDevice, SimLayout, WaveShape, WaveState};

mod common;

#[test]
fn accumulator_ops_share_one_device_total() {
    let mut driver = common::driver();
    let set = driver.resolve_binding("SUM set").unwrap();
    let add = driver.resolve_binding("SUM add").unwrap();
    let current = driver.resolve_binding("SUM").unwrap();
    assert_ne!(set, add);
    assert_ne!(add, current);

    driver.write_int32(set, 5).unwrap();
    driver.write_int32(add, 3).unwrap();
    driver.write_int32(add, 3).unwrap();
    assert_eq!(driver.read_int32(current).unwrap(), 11);
    assert_eq!(driver.device().sum(), 11);

    let reset = driver.resolve_binding("SUM reset").unwrap();
    driver.write_int32(reset, 0).unwrap();
    assert_eq!(driver.read_int32(current).unwrap(), 0);
}

#[test]
fn sum_op_spelling_is_case_insensitive() {
    let mut driver = common::driver();
    let lower = driver.resolve_binding("SUM add").unwrap();
    let upper = driver.resolve_binding("SUM ADD").unwrap();
    assert_eq!(lower, upper);
    let bare = driver.resolve_binding("SUM").unwrap();
    let spelled = driver.resolve_binding("SUM current").unwrap();
    assert_eq!(bare, spelled);
}

#[test]
fn bare_accumulator_endpoint_refuses_writes() {
    let mut driver = common::driver();
    let current = driver.resolve_binding("SUM").unwrap();
    let err = driver.write_int32(current, 1).unwrap_err();
    assert_eq!(
        err,
        DispatchError::DeviceFailure {
            status: DeviceStatus::Error
        }
    );
    assert_eq!(
        driver.alarm(current),
        Some(Alarm::new(
            AlarmCondition::WriteAccess,
            AlarmSeverity::Major
        ))
    );
    // The refused value never reached the parameter cache.
    assert_eq!(driver.cached(current), None);
}

#[test]
fn zero_padded_channels_fold_together() {
    let mut driver = common::driver();
    let plain = driver.resolve_binding("CHAN 2").unwrap();
    let padded = driver.resolve_binding("CHAN 02").unwrap();
    assert_eq!(plain, padded);

    driver.write_float64(plain, 21.5).unwrap();
    assert_eq!(driver.read_float64(padded).unwrap(), 21.5);
}

#[test]
fn channel_addresses_are_validated_at_resolve_time() {
    let mut driver = common::driver();
    let err = driver.resolve_binding("CHAN 99").unwrap_err();
    let BindingError::AddressRejected { reason, .. } = err else {
        panic!("expected an address rejection");
    };
    assert!(reason.reason().contains("out of range"));

    assert!(driver.resolve_binding("CHAN").is_err());
    assert!(driver.resolve_binding("CHAN two").is_err());
    assert!(driver.resolve_binding("BOGUS 1").is_err());
}

#[test]
fn port_argument_defaults_to_zero() {
    let mut driver = common::driver();
    let bare = driver.resolve_binding("PORT").unwrap();
    let explicit = driver.resolve_binding("PORT 0").unwrap();
    assert_eq!(bare, explicit);
    assert!(driver.resolve_binding("PORT 1").is_err());

    driver
        .write_uint32_digital(bare, 0x000A_AAAA, 0xFFFF_FFFF)
        .unwrap();
    // Only the bits inside the configured port width stick.
    assert_eq!(driver.device().port_bits(), 0xAAAA);
    assert_eq!(
        driver.read_uint32_digital(explicit, 0xFFFF_FFFF).unwrap(),
        0xAAAA
    );
    assert_eq!(driver.read_uint32_digital(bare, 0x00F0).unwrap(), 0x00A0);
}

#[test]
fn message_clamps_to_capacity() {
    let layout = SimLayout {
        message_capacity: 5,
        ..SimLayout::default()
    };
    let mut driver = common::driver_with_layout(layout);
    let msg = driver.resolve_binding("MSG").unwrap();
    driver.write_octet(msg, "hello world").unwrap();
    assert_eq!(driver.device().message(), "hello");

    let mut buf = [0_u8; 16];
    let len = driver.read_octet(msg, &mut buf).unwrap();
    assert_eq!(&buf[..len], b"hello");
}

#[test]
fn wave_payload_tracks_shape_and_reads() {
    let mut driver = common::driver();
    let wave = driver.resolve_binding("WAVE saw").unwrap();

    let mut buf = [0.0_f32; 16];
    let copied = driver.read_float32_array(wave, &mut buf).unwrap();
    assert_eq!(copied, 16);
    driver.read_float32_array(wave, &mut buf).unwrap();

    let state = driver
        .variable(wave)
        .and_then(|var| var.payload::<WaveState>())
        .expect("wave variable carries generator state");
    assert_eq!(state.shape, WaveShape::Saw);
    assert_eq!(state.reads, 2);
}

#[test]
fn history_round_trips_and_clamps() {
    let layout = SimLayout {
        history_capacity: 2,
        ..SimLayout::default()
    };
    let mut driver = common::driver_with_layout(layout);
    let hist = driver.resolve_binding("HIST").unwrap();

    driver.write_int32_array(hist, &[1, 2, 3]).unwrap();
    assert_eq!(driver.device().history(), [1, 2]);

    let mut buf = [0_i32; 8];
    let copied = driver.read_int32_array(hist, &mut buf).unwrap();
    assert_eq!(copied, 2);
    assert_eq!(&buf[..copied], [1, 2]);
}

#[test]
fn init_hook_runs_once() {
    let runs = Arc::new(AtomicU32::new(0));
    let hook_runs = runs.clone();
    let opts = DriverOpts::new().init_hook(move |_| {
        hook_runs.fetch_add(1, Ordering::SeqCst);
    });
    let mut driver = build_driver("sim0", SimDevice::new(SimLayout::default()), opts).unwrap();
    driver.complete_init();
    driver.complete_init();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
