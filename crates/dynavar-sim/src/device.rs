//! The simulated instrument and its driver wiring.
//!
//! The instrument has a bank of analog channels, one digital port, a
//! free-running tick counter, a saturating accumulator, a message buffer, a
//! waveform generator and a sample history. [`build_driver`] registers one
//! function per subsystem and hands back a ready [`Driver`].

use dynavar::{
    Ack, Alarm, AlarmCondition, AlarmSeverity, ArrayHandlers, DeviceAddress, DeviceError,
    DeviceStatus, DeviceSupport, DigitalHandlers, Driver, DriverOpts, InterruptEdge,
    OctetHandlers, ReadResult, RegisterError, Rejection, ScalarHandlers, Variable, WriteResult,
};
use smol_str::SmolStr;

use crate::address::{
    ChannelAddress, CounterAddress, HistoryAddress, MessageAddress, PortAddress, SumAddress,
    SumOp, WaveAddress, WaveShape,
};
use crate::config::SimLayout;

/// Per-variable waveform generator state, carried as a variable payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveState {
    /// Shape resolved from the binding arguments.
    pub shape: WaveShape,
    /// Reads served through this variable.
    pub reads: u64,
}

/// State of the simulated instrument.
#[derive(Debug)]
pub struct SimDevice {
    layout: SimLayout,
    channels: Vec<f64>,
    port_bits: u32,
    counter: i64,
    counting: bool,
    streaming: bool,
    sum: i32,
    message: String,
    history: Vec<i32>,
    tick: u64,
}

impl SimDevice {
    /// Instrument with the given layout, all state zeroed.
    #[must_use]
    pub fn new(layout: SimLayout) -> Self {
        let channels = vec![0.0; layout.channels as usize];
        Self {
            layout,
            channels,
            port_bits: 0,
            counter: 0,
            counting: false,
            streaming: false,
            sum: 0,
            message: String::new(),
            history: Vec::new(),
            tick: 0,
        }
    }

    /// Advance the simulation clock one tick. The counter only runs while a
    /// listener is attached.
    pub fn advance(&mut self) {
        self.tick += 1;
        if self.counting {
            self.counter += 1;
        }
    }

    /// The instrument layout.
    #[must_use]
    pub fn layout(&self) -> &SimLayout {
        &self.layout
    }

    /// Current tick count.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current counter value.
    #[must_use]
    pub fn counter(&self) -> i64 {
        self.counter
    }

    /// Whether the counter is running.
    #[must_use]
    pub fn counting(&self) -> bool {
        self.counting
    }

    /// Whether the waveform generator has listeners.
    #[must_use]
    pub fn streaming(&self) -> bool {
        self.streaming
    }

    /// Current accumulator total.
    #[must_use]
    pub fn sum(&self) -> i32 {
        self.sum
    }

    /// Current digital port bits.
    #[must_use]
    pub fn port_bits(&self) -> u32 {
        self.port_bits
    }

    /// Current message buffer contents.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Value of one analog channel.
    #[must_use]
    pub fn channel(&self, number: u32) -> Option<f64> {
        self.channels.get(number as usize).copied()
    }

    /// Current history buffer contents.
    #[must_use]
    pub fn history(&self) -> &[i32] {
        &self.history
    }

    /// Render one waveform period for the current tick.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn render_wave(&self, shape: WaveShape) -> Vec<f32> {
        let len = self.layout.waveform_len;
        (0..len)
            .map(|i| {
                let step = (i as u64 + self.tick) % len as u64;
                let x = step as f32 / len as f32;
                match shape {
                    WaveShape::Sine => (x * std::f32::consts::TAU).sin(),
                    WaveShape::Saw => 2.0 * x - 1.0,
                }
            })
            .collect()
    }
}

impl DeviceSupport for SimDevice {
    fn parse_address(
        &self,
        function: &str,
        arguments: &[SmolStr],
    ) -> Result<Box<dyn DeviceAddress>, Rejection> {
        match function {
            "CHAN" => {
                let [token] = arguments else {
                    return Err(Rejection::new("CHAN expects exactly one channel number"));
                };
                let number: u32 = token.parse().map_err(|_| {
                    Rejection::new(format!("CHAN expects a channel number, got '{token}'"))
                })?;
                if number >= self.layout.channels {
                    return Err(Rejection::new(format!(
                        "channel {number} out of range, instrument has {}",
                        self.layout.channels
                    )));
                }
                Ok(Box::new(ChannelAddress(number)))
            }
            "PORT" => {
                let number = match arguments {
                    [] => 0,
                    [token] => token.parse().map_err(|_| {
                        Rejection::new(format!("PORT expects a port number, got '{token}'"))
                    })?,
                    _ => return Err(Rejection::new("PORT expects at most one port number")),
                };
                if number != 0 {
                    return Err(Rejection::new(format!(
                        "instrument has only port 0, got {number}"
                    )));
                }
                Ok(Box::new(PortAddress(number)))
            }
            "COUNT" => {
                expect_no_args(function, arguments)?;
                Ok(Box::new(CounterAddress))
            }
            "SUM" => {
                let op = match arguments {
                    [] => SumOp::Current,
                    [token] => SumOp::parse(token).ok_or_else(|| {
                        Rejection::new(format!("unknown accumulator op '{token}'"))
                    })?,
                    _ => return Err(Rejection::new("SUM expects at most one op")),
                };
                Ok(Box::new(SumAddress(op)))
            }
            "WAVE" => {
                let shape = match arguments {
                    [] => WaveShape::Sine,
                    [token] => WaveShape::parse(token).ok_or_else(|| {
                        Rejection::new(format!("unknown waveform shape '{token}'"))
                    })?,
                    _ => return Err(Rejection::new("WAVE expects at most one shape")),
                };
                Ok(Box::new(WaveAddress(shape)))
            }
            "MSG" => {
                expect_no_args(function, arguments)?;
                Ok(Box::new(MessageAddress))
            }
            "HIST" => {
                expect_no_args(function, arguments)?;
                Ok(Box::new(HistoryAddress))
            }
            _ => Err(Rejection::new(format!("unknown function '{function}'"))),
        }
    }

    fn init_variable(&mut self, variable: &mut Variable) -> Result<(), Rejection> {
        if let Some(&WaveAddress(shape)) = variable.address_as::<WaveAddress>() {
            variable.set_payload(WaveState { shape, reads: 0 });
        }
        Ok(())
    }
}

/// Build a driver for one simulated instrument with all functions registered.
pub fn build_driver(
    port: impl Into<SmolStr>,
    device: SimDevice,
    opts: DriverOpts<SimDevice>,
) -> Result<Driver<SimDevice>, RegisterError> {
    let mut driver = Driver::new(port, device, opts);
    driver.register_float64(
        "CHAN",
        ScalarHandlers::new().read(read_channel).write(write_channel),
    )?;
    driver.register_int32("SUM", ScalarHandlers::new().read(read_sum).write(write_sum))?;
    driver.register_int64(
        "COUNT",
        ScalarHandlers::new()
            .read(read_counter)
            .write(write_counter)
            .interrupt(counter_interrupt),
    )?;
    driver.register_uint32_digital(
        "PORT",
        DigitalHandlers::new().read(read_port).write(write_port),
    )?;
    driver.register_octet(
        "MSG",
        OctetHandlers::new().read(read_message).write(write_message),
    )?;
    driver.register_float32_array(
        "WAVE",
        ArrayHandlers::new().read(read_wave).interrupt(wave_interrupt),
    )?;
    driver.register_int32_array(
        "HIST",
        ArrayHandlers::new().read(read_history).write(write_history),
    )?;
    Ok(driver)
}

fn internal_error() -> DeviceError {
    DeviceError::new(DeviceStatus::Error)
}

fn expect_no_args(function: &str, arguments: &[SmolStr]) -> Result<(), Rejection> {
    if arguments.is_empty() {
        Ok(())
    } else {
        Err(Rejection::new(format!("'{function}' takes no arguments")))
    }
}

fn channel_of(variable: &Variable) -> Result<usize, DeviceError> {
    variable
        .address_as::<ChannelAddress>()
        .map(|address| address.0 as usize)
        .ok_or_else(internal_error)
}

fn read_channel(device: &mut SimDevice, variable: &mut Variable) -> ReadResult<f64> {
    let channel = channel_of(variable)?;
    let value = device
        .channels
        .get(channel)
        .copied()
        .ok_or_else(internal_error)?;
    Ok(value.into())
}

fn write_channel(device: &mut SimDevice, variable: &mut Variable, value: f64) -> WriteResult {
    let channel = channel_of(variable)?;
    let slot = device
        .channels
        .get_mut(channel)
        .ok_or_else(internal_error)?;
    *slot = value;
    Ok(Ack::new())
}

fn read_sum(device: &mut SimDevice, _variable: &mut Variable) -> ReadResult<i32> {
    Ok(device.sum.into())
}

fn write_sum(device: &mut SimDevice, variable: &mut Variable, value: i32) -> WriteResult {
    let &SumAddress(op) = variable
        .address_as::<SumAddress>()
        .ok_or_else(internal_error)?;
    match op {
        SumOp::Set => device.sum = value,
        SumOp::Add => device.sum = device.sum.saturating_add(value),
        SumOp::Reset => device.sum = 0,
        SumOp::Current => {
            // The bare accumulator endpoint is a read-only view.
            return Err(DeviceError::new(DeviceStatus::Error)
                .with_alarm(Alarm::new(AlarmCondition::WriteAccess, AlarmSeverity::Major)));
        }
    }
    Ok(Ack::new())
}

fn read_counter(device: &mut SimDevice, _variable: &mut Variable) -> ReadResult<i64> {
    Ok(device.counter.into())
}

fn write_counter(device: &mut SimDevice, _variable: &mut Variable, value: i64) -> WriteResult {
    device.counter = value;
    Ok(Ack::new())
}

fn counter_interrupt(device: &mut SimDevice, _variable: &mut Variable, edge: InterruptEdge) {
    device.counting = edge == InterruptEdge::FirstUser;
}

fn read_port(device: &mut SimDevice, _variable: &mut Variable, mask: u32) -> ReadResult<u32> {
    Ok((device.port_bits & mask).into())
}

fn write_port(
    device: &mut SimDevice,
    _variable: &mut Variable,
    value: u32,
    mask: u32,
) -> WriteResult {
    let merged = (device.port_bits & !mask) | (value & mask);
    device.port_bits = merged & device.layout.port_mask();
    Ok(Ack::new())
}

fn read_message(device: &mut SimDevice, _variable: &mut Variable) -> ReadResult<String> {
    Ok(device.message.clone().into())
}

fn write_message(device: &mut SimDevice, _variable: &mut Variable, text: &str) -> WriteResult {
    device.message = text.chars().take(device.layout.message_capacity).collect();
    Ok(Ack::new())
}

fn read_wave(
    device: &mut SimDevice,
    variable: &mut Variable,
    _capacity: usize,
) -> ReadResult<Vec<f32>> {
    let state = variable
        .payload_mut::<WaveState>()
        .ok_or_else(internal_error)?;
    state.reads += 1;
    let shape = state.shape;
    Ok(device.render_wave(shape).into())
}

fn wave_interrupt(device: &mut SimDevice, _variable: &mut Variable, edge: InterruptEdge) {
    device.streaming = edge == InterruptEdge::FirstUser;
}

fn read_history(
    device: &mut SimDevice,
    _variable: &mut Variable,
    _capacity: usize,
) -> ReadResult<Vec<i32>> {
    Ok(device.history.clone().into())
}

fn write_history(device: &mut SimDevice, _variable: &mut Variable, values: &[i32]) -> WriteResult {
    device.history = values
        .iter()
        .copied()
        .take(device.layout.history_capacity)
        .collect();
    Ok(Ack::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> SimDevice {
        SimDevice::new(SimLayout::default())
    }

    #[test]
    fn channel_addresses_are_bounds_checked() {
        let device = device();
        let err = device
            .parse_address("CHAN", &["99".into()])
            .map(|_| ())
            .unwrap_err();
        assert!(err.reason().contains("out of range"));
        assert!(device.parse_address("CHAN", &["7".into()]).is_ok());
    }

    #[test]
    fn bare_sum_means_current() {
        let device = device();
        let address = device.parse_address("SUM", &[]).unwrap();
        assert!(address.matches(&SumAddress(SumOp::Current)));
        let address = device.parse_address("SUM", &["ADD".into()]).unwrap();
        assert!(address.matches(&SumAddress(SumOp::Add)));
    }

    #[test]
    fn counter_runs_only_while_listened_to() {
        let mut device = device();
        device.advance();
        assert_eq!(device.counter(), 0);
        device.counting = true;
        device.advance();
        device.advance();
        assert_eq!(device.counter(), 2);
        assert_eq!(device.tick(), 3);
    }

    #[test]
    fn wave_period_matches_layout() {
        let device = device();
        let wave = device.render_wave(WaveShape::Saw);
        assert_eq!(wave.len(), device.layout().waveform_len);
        assert!((wave[0] + 1.0).abs() < 1e-6);
    }
}
