//! Instrument layout configuration loading.

use std::path::Path;

use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors from loading or validating a layout file.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The file could not be read or parsed as TOML.
    #[error("layout config: {0}")]
    Unreadable(SmolStr),
    /// The parsed values describe an instrument we cannot build.
    #[error("invalid layout: {0}")]
    Invalid(SmolStr),
}

/// Dimensions of the simulated instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimLayout {
    /// Number of analog channels.
    pub channels: u32,
    /// Samples per rendered waveform period.
    pub waveform_len: usize,
    /// Usable bits of the digital port, starting from bit zero.
    pub port_width: u32,
    /// Maximum message length in characters.
    pub message_capacity: usize,
    /// Maximum retained history samples.
    pub history_capacity: usize,
}

impl Default for SimLayout {
    fn default() -> Self {
        Self {
            channels: 8,
            waveform_len: 64,
            port_width: 16,
            message_capacity: 80,
            history_capacity: 32,
        }
    }
}

impl SimLayout {
    /// Loads a layout from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|err| LayoutError::Unreadable(format!("layout.toml: {err}").into()))?;
        Self::from_toml_str(&text)
    }

    /// Parses a layout from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, LayoutError> {
        let raw: LayoutToml = toml::from_str(text)
            .map_err(|err| LayoutError::Unreadable(format!("layout.toml: {err}").into()))?;
        raw.into_layout()
    }

    /// Mask selecting the usable port bits.
    #[must_use]
    pub fn port_mask(&self) -> u32 {
        if self.port_width >= 32 {
            u32::MAX
        } else {
            (1 << self.port_width) - 1
        }
    }

    fn validate(&self) -> Result<(), LayoutError> {
        if self.channels == 0 || self.channels > 256 {
            return Err(invalid(format!(
                "instrument.channels must be 1..=256, got {}",
                self.channels
            )));
        }
        if self.waveform_len == 0 || self.waveform_len > 4096 {
            return Err(invalid(format!(
                "instrument.waveform_len must be 1..=4096, got {}",
                self.waveform_len
            )));
        }
        if self.port_width == 0 || self.port_width > 32 {
            return Err(invalid(format!(
                "instrument.port_width must be 1..=32, got {}",
                self.port_width
            )));
        }
        if self.message_capacity == 0 {
            return Err(invalid("instrument.message_capacity must be nonzero".into()));
        }
        if self.history_capacity == 0 {
            return Err(invalid("instrument.history_capacity must be nonzero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct LayoutToml {
    instrument: Option<InstrumentSection>,
}

#[derive(Debug, Deserialize)]
struct InstrumentSection {
    channels: Option<u32>,
    waveform_len: Option<usize>,
    port_width: Option<u32>,
    message_capacity: Option<usize>,
    history_capacity: Option<usize>,
}

impl LayoutToml {
    fn into_layout(self) -> Result<SimLayout, LayoutError> {
        let defaults = SimLayout::default();
        let Some(section) = self.instrument else {
            return Ok(defaults);
        };
        let layout = SimLayout {
            channels: section.channels.unwrap_or(defaults.channels),
            waveform_len: section.waveform_len.unwrap_or(defaults.waveform_len),
            port_width: section.port_width.unwrap_or(defaults.port_width),
            message_capacity: section.message_capacity.unwrap_or(defaults.message_capacity),
            history_capacity: section.history_capacity.unwrap_or(defaults.history_capacity),
        };
        layout.validate()?;
        Ok(layout)
    }
}

fn invalid(message: String) -> LayoutError {
    LayoutError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let layout = SimLayout::from_toml_str("").unwrap();
        assert_eq!(layout, SimLayout::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let layout = SimLayout::from_toml_str(
            "[instrument]\nchannels = 4\nport_width = 8\n",
        )
        .unwrap();
        assert_eq!(layout.channels, 4);
        assert_eq!(layout.port_width, 8);
        assert_eq!(layout.waveform_len, SimLayout::default().waveform_len);
        assert_eq!(layout.port_mask(), 0xFF);
    }

    #[test]
    fn full_width_port_mask_covers_all_bits() {
        let layout = SimLayout {
            port_width: 32,
            ..SimLayout::default()
        };
        assert_eq!(layout.port_mask(), u32::MAX);
    }

    #[test]
    fn out_of_range_dimensions_are_rejected() {
        let err = SimLayout::from_toml_str("[instrument]\nchannels = 0\n").unwrap_err();
        expect!["invalid layout: instrument.channels must be 1..=256, got 0"]
            .assert_eq(&err.to_string());

        let err = SimLayout::from_toml_str("[instrument]\nport_width = 33\n").unwrap_err();
        expect!["invalid layout: instrument.port_width must be 1..=32, got 33"]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = SimLayout::from_toml_str("instrument = \"yes\"").unwrap_err();
        assert!(matches!(err, LayoutError::Unreadable(_)));
    }
}
