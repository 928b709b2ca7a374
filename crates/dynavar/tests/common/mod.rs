#![allow(dead_code)]

use std::any::Any;

use dynavar::{
    DeviceAddress, DeviceSupport, Driver, DriverOpts, InterruptEdge, Rejection, Variable,
};
use smol_str::SmolStr;

/// Address carrying a numeric argument; `F 7` and `F 07` compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumAddress {
    pub function: SmolStr,
    pub number: u32,
}

impl DeviceAddress for NumAddress {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn matches(&self, other: &dyn DeviceAddress) -> bool {
        other.as_any().downcast_ref::<NumAddress>() == Some(self)
    }
}

/// Address carrying the raw argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAddress {
    pub function: SmolStr,
    pub tag: SmolStr,
}

impl DeviceAddress for TagAddress {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn matches(&self, other: &dyn DeviceAddress) -> bool {
        other.as_any().downcast_ref::<TagAddress>() == Some(self)
    }
}

/// Scratch device used by the driver tests.
///
/// Address policy: the function `BAD` refuses address parsing, `VETO`
/// refuses variable setup. Everything else resolves to a [`NumAddress`]
/// when the first argument parses as an integer and a [`TagAddress`]
/// otherwise.
#[derive(Debug, Default)]
pub struct Rig {
    pub i32_cell: i32,
    pub i64_cell: i64,
    pub f64_cell: f64,
    pub bits: u32,
    pub text: String,
    pub hook_log: Vec<(SmolStr, InterruptEdge)>,
}

impl DeviceSupport for Rig {
    fn parse_address(
        &self,
        function: &str,
        arguments: &[SmolStr],
    ) -> Result<Box<dyn DeviceAddress>, Rejection> {
        if function == "BAD" {
            return Err(Rejection::new("bad address"));
        }
        if let Some(first) = arguments.first() {
            if let Ok(number) = first.parse::<u32>() {
                return Ok(Box::new(NumAddress {
                    function: function.into(),
                    number,
                }));
            }
        }
        Ok(Box::new(TagAddress {
            function: function.into(),
            tag: arguments
                .iter()
                .map(SmolStr::as_str)
                .collect::<Vec<_>>()
                .join(" ")
                .into(),
        }))
    }

    fn init_variable(&mut self, variable: &mut Variable) -> Result<(), Rejection> {
        if variable.function() == "VETO" {
            return Err(Rejection::new("vetoed"));
        }
        Ok(())
    }
}

pub fn driver() -> Driver<Rig> {
    Driver::new("rig0", Rig::default(), DriverOpts::new())
}

pub fn driver_with(opts: DriverOpts<Rig>) -> Driver<Rig> {
    Driver::new("rig0", Rig::default(), opts)
}
