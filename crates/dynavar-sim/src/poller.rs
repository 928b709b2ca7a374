//! Background polling of the simulated instrument.
//!
//! Each poll advances the instrument one tick, refreshes every variable
//! with interrupt listeners and sweeps the pending updates out to the host
//! sinks. The parameter cache keeps record reads coherent between polls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dynavar::{Alarm, Driver, ValueKind};
use parking_lot::Mutex;
use tracing::debug;

use crate::address::ChannelAddress;
use crate::device::{SimDevice, WaveState};

/// Driver shared between record dispatch and the poller thread.
pub type SharedDriver = Arc<Mutex<Driver<SimDevice>>>;

/// Advance the instrument one tick and refresh every subscribed variable.
pub fn poll_once(driver: &mut Driver<SimDevice>) {
    driver.device_mut().advance();
    for info in driver.interrupt_variables() {
        let index = info.index();
        match info.kind() {
            ValueKind::Int64 => {
                let value = driver.device().counter();
                let _ = driver.post_int64(index, value, Alarm::NONE);
            }
            ValueKind::Float64 => {
                let Some(value) = driver
                    .variable(index)
                    .and_then(|var| var.address_as::<ChannelAddress>())
                    .and_then(|address| driver.device().channel(address.0))
                else {
                    continue;
                };
                let _ = driver.post_float64(index, value, Alarm::NONE);
            }
            ValueKind::Float32Array => {
                let Some(shape) = driver
                    .variable(index)
                    .and_then(|var| var.payload::<WaveState>())
                    .map(|state| state.shape)
                else {
                    continue;
                };
                let wave = driver.device().render_wave(shape);
                let _ = driver.push_float32_array(index, &wave, Alarm::NONE);
            }
            _ => {}
        }
    }
    driver.post_updates();
}

/// Handle to the background poller thread.
#[derive(Debug)]
pub struct PollerHandle {
    stop: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl PollerHandle {
    /// Signal the poller thread to stop.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Join the poller thread.
    pub fn join(&mut self) -> thread::Result<()> {
        if let Some(join) = self.join.take() {
            return join.join();
        }
        Ok(())
    }
}

/// Spawn a thread polling the driver at a fixed period until stopped.
pub fn spawn_poller(driver: SharedDriver, period: Duration) -> std::io::Result<PollerHandle> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_thread = stop.clone();
    let join = thread::Builder::new()
        .name("dynavar-sim-poller".into())
        .spawn(move || {
            debug!(?period, "poller running");
            while !stop_thread.load(Ordering::SeqCst) {
                poll_once(&mut driver.lock());
                thread::sleep(period);
            }
            debug!("poller stopped");
        })?;
    Ok(PollerHandle {
        stop,
        join: Some(join),
    })
}
