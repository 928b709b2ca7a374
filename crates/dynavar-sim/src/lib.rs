//! `dynavar-sim` - simulated instrument driver built on the `dynavar`
//! binding layer.
//!
//! The instrument bundles the cases a real device driver runs into: bounds
//! checked channel addresses, write-op endpoints sharing one accumulator,
//! a counter that only runs while someone listens, a masked digital port, a
//! clamped message buffer, a streamed waveform and an array history. The
//! binary demos a full resolve/dispatch/subscribe round against it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Device addresses for the simulated instrument.
pub mod address;
/// Instrument layout configuration loading.
pub mod config;
/// The simulated instrument and its driver wiring.
pub mod device;
/// Background polling of the simulated instrument.
pub mod poller;

pub use address::{
    ChannelAddress, CounterAddress, HistoryAddress, MessageAddress, PortAddress, SumAddress,
    SumOp, WaveAddress, WaveShape,
};
pub use config::{LayoutError, SimLayout};
pub use device::{build_driver, SimDevice, WaveState};
pub use poller::{poll_once, spawn_poller, PollerHandle, SharedDriver};
