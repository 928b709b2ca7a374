//! Device addresses for the simulated instrument.
//!
//! Each address type carries the fully parsed meaning of a binding, so two
//! spellings of the same endpoint (`CHAN 7` and `CHAN 07`, or a bare `SUM`
//! and `SUM current`) collapse onto one variable.

use std::any::Any;

use dynavar::DeviceAddress;

macro_rules! impl_device_address {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl DeviceAddress for $ty {
                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn matches(&self, other: &dyn DeviceAddress) -> bool {
                    other.as_any().downcast_ref::<$ty>() == Some(self)
                }
            }
        )+
    };
}

/// One analog channel, by zero-based number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAddress(pub u32);

/// The digital I/O port. The instrument has exactly one, so a bare `PORT`
/// binding selects port zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortAddress(pub u32);

/// The free-running tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterAddress;

/// What a write to an accumulator endpoint does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SumOp {
    /// Read-only view of the running total.
    Current,
    /// Replace the total.
    Set,
    /// Add the written value to the total.
    Add,
    /// Clear the total back to zero.
    Reset,
}

impl SumOp {
    pub(crate) fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "current" => Some(Self::Current),
            "set" => Some(Self::Set),
            "add" => Some(Self::Add),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

/// One accumulator endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumAddress(pub SumOp);

/// Waveform generator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveShape {
    /// One sine period across the waveform buffer.
    Sine,
    /// Rising ramp from -1 to 1.
    Saw,
}

impl WaveShape {
    pub(crate) fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "sine" => Some(Self::Sine),
            "saw" => Some(Self::Saw),
            _ => None,
        }
    }
}

/// One waveform generator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveAddress(pub WaveShape);

/// The instrument message buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageAddress;

/// The sample history buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryAddress;

impl_device_address!(
    ChannelAddress,
    PortAddress,
    CounterAddress,
    SumAddress,
    WaveAddress,
    MessageAddress,
    HistoryAddress,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_compares_parsed_meaning() {
        assert!(ChannelAddress(7).matches(&ChannelAddress(7)));
        assert!(!ChannelAddress(7).matches(&ChannelAddress(8)));
        assert!(!ChannelAddress(0).matches(&PortAddress(0)));
        assert!(SumAddress(SumOp::Current).matches(&SumAddress(SumOp::Current)));
        assert!(!SumAddress(SumOp::Current).matches(&SumAddress(SumOp::Add)));
    }

    #[test]
    fn op_tokens_are_case_insensitive() {
        assert_eq!(SumOp::parse("ADD"), Some(SumOp::Add));
        assert_eq!(SumOp::parse("Reset"), Some(SumOp::Reset));
        assert_eq!(SumOp::parse("bogus"), None);
        assert_eq!(WaveShape::parse("SINE"), Some(WaveShape::Sine));
        assert_eq!(WaveShape::parse("triangle"), None);
    }
}
