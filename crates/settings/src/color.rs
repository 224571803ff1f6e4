use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 主視窗預設背景色。 / Default background of the main window, `0xRRGGBBAA`.
pub const DEFAULT_BG_COLOR: u32 = 0x0a0a_0aff;

/// RGBA 顏色。 / An RGBA colour, persisted with upper-case channel keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    #[serde(rename = "R")]
    pub r: u8,
    #[serde(rename = "G")]
    pub g: u8,
    #[serde(rename = "B")]
    pub b: u8,
    #[serde(rename = "A")]
    pub a: u8,
}

impl Rgba {
    /// 由 `0xRRGGBBAA` 數值建立顏色。 / Builds a colour from a packed `0xRRGGBBAA` value.
    pub fn from_packed(value: u32) -> Self {
        let [r, g, b, a] = value.to_be_bytes();
        Self { r, g, b, a }
    }

    pub fn packed(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    /// 解析十六進位字串。 / Parses `RRGGBB` or `RRGGBBAA`, optionally prefixed by `0x` or `#`.
    pub fn from_hex(input: &str) -> Result<Self, ColorParseError> {
        let trimmed = input.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .or_else(|| trimmed.strip_prefix('#'))
            .unwrap_or(trimmed);
        if hex.len() != 6 && hex.len() != 8 {
            return Err(ColorParseError::InvalidLength);
        }
        let mut rgba = [0u8, 0, 0, 0xff];
        for (i, channel) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
            let start = i * 2;
            let slice = hex.get(start..start + 2).ok_or(ColorParseError::InvalidHex)?;
            *channel = u8::from_str_radix(slice, 16).map_err(|_| ColorParseError::InvalidHex)?;
        }
        let [r, g, b, a] = rgba;
        Ok(Self { r, g, b, a })
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::from_packed(DEFAULT_BG_COLOR)
    }
}

impl FromStr for Rgba {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.packed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorParseError {
    InvalidLength,
    InvalidHex,
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorParseError::InvalidLength => write!(f, "expected 6 or 8 hexadecimal digits"),
            ColorParseError::InvalidHex => write!(f, "invalid hexadecimal digit"),
        }
    }
}

impl std::error::Error for ColorParseError {}
