#![allow(dead_code)]

use dynavar::harness::{RecordingSink, SinkLog};
use dynavar::{Driver, DriverOpts, ValueKind};
use dynavar_sim::{build_driver, SimDevice, SimLayout};

pub fn driver() -> Driver<SimDevice> {
    driver_with_layout(SimLayout::default())
}

pub fn driver_with_layout(layout: SimLayout) -> Driver<SimDevice> {
    build_driver("sim0", SimDevice::new(layout), DriverOpts::new()).unwrap()
}

/// Driver with a recording sink attached for each of the given kinds.
pub fn monitored(kinds: &[ValueKind]) -> (Driver<SimDevice>, SinkLog) {
    let log = SinkLog::new();
    let mut opts = DriverOpts::new();
    for kind in kinds {
        opts = opts.interrupt_sink(*kind, Box::new(RecordingSink::new(log.clone())));
    }
    let driver = build_driver("sim0", SimDevice::new(SimLayout::default()), opts).unwrap();
    (driver, log)
}
